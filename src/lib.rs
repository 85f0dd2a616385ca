pub mod codec;
pub mod config;
pub mod daq;
pub mod error;
pub mod types;
pub mod waveform;

pub use codec::{
    counts_to_volts, counts_to_volts_in, scan_to_volts, volts_to_counts, FULL_SCALE_VOLTS,
    MAX_CODE,
};
pub use config::{load_config, load_config_or_default, DeviceConfig, LoggingConfig, SweepConfig};
pub use daq::{DaqDevice, DaqDeviceBuilder, RusbTransport, UsbTransport};
pub use error::DaqError;
pub use types::{
    validate_channel_list, AnalogRange, ChannelSpec, InputMode, OutputChannel, RampShape,
    ScanRequest, MAX_INPUT_CHANNELS, MAX_TRANSFER_SAMPLES,
};
pub use waveform::{generate_signal, generate_triangle, integer_slope, Waveform};
