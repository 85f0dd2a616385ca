use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SweepConfig {
    pub device: DeviceConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DeviceConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    pub control_timeout_ms: u64,
    pub output_timeout_ms: u64,
    /// Input reads cover a whole acquisition and may legitimately take
    /// far longer than ordinary USB transfers.
    pub input_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub log_level: String,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            // MCC USB-1608GX-2AO
            vendor_id: 0x09db,
            product_id: 0x0112,
            control_timeout_ms: 1_000,
            output_timeout_ms: 1_000,
            input_timeout_ms: 20_000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Load configuration from file with layered fallbacks
pub fn load_config(config_path: Option<&Path>) -> Result<SweepConfig, ConfigError> {
    let mut builder = Config::builder().add_source(Config::try_from(&SweepConfig::default())?);

    if let Some(path) = config_path {
        if path.exists() {
            builder = builder.add_source(File::from(path));
        } else {
            return Err(ConfigError::Message(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
    } else if Path::new("config.toml").exists() {
        builder = builder.add_source(File::with_name("config.toml"));
    }

    // Add environment variable overrides with prefix "MCC_SWEEP_"
    builder = builder.add_source(
        Environment::with_prefix("MCC_SWEEP")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize::<SweepConfig>()
}

/// Load configuration with better error handling and defaults
pub fn load_config_or_default(config_path: Option<&Path>) -> SweepConfig {
    match load_config(config_path) {
        Ok(config) => {
            log::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            log::warn!("Failed to load config ({}), using defaults", e);
            SweepConfig::default()
        }
    }
}
