use std::time::Duration;

use crate::codec::FULL_SCALE_VOLTS;
use crate::error::DaqError;

/// Hard ceiling on the number of 16 bit samples one bulk transfer may move
/// without the bus stuttering. Applies to the output FIFO priming transfer
/// and to the total input readback alike.
pub const MAX_TRANSFER_SAMPLES: usize = 2560;

/// Number of analog input channels on the USB-1608G.
pub const MAX_INPUT_CHANNELS: usize = 16;

/// Shape of a generated output ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampShape {
    /// Downward slope, high to low.
    Descent = 1,
    /// Upward slope, low to high.
    Ascent = 2,
    /// Descent followed by ascent. Deliberate stub: `generate_signal`
    /// rejects it with `NotImplemented`; only the triangle generator
    /// produces this shape today.
    Dip = 3,
}

/// Bipolar input range (gain) selection per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalogRange {
    #[default]
    Bipolar10V,
    Bipolar5V,
    Bipolar2V,
    Bipolar1V,
}

impl AnalogRange {
    /// Symmetric full-scale voltage this range maps onto the code span.
    pub fn full_scale_volts(self) -> f64 {
        match self {
            AnalogRange::Bipolar10V => 10.0,
            AnalogRange::Bipolar5V => 5.0,
            AnalogRange::Bipolar2V => 2.0,
            AnalogRange::Bipolar1V => 1.0,
        }
    }
}

/// Input wiring mode of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    SingleEnded,
    Differential,
}

/// Analog output channel of the 2AO variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputChannel {
    #[default]
    Channel0,
    Channel1,
}

/// One entry of an input scan list: which channel to digitize and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSpec {
    pub channel: u8,
    pub range: AnalogRange,
    pub mode: InputMode,
}

impl ChannelSpec {
    /// Single-ended ±10 V spec for the given channel number.
    pub fn new(channel: u8) -> Self {
        Self {
            channel,
            range: AnalogRange::default(),
            mode: InputMode::default(),
        }
    }

    pub fn with_range(mut self, range: AnalogRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_mode(mut self, mode: InputMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Check a scan list against the device limits.
///
/// The device cycles through the list once per pacer tick, so the list
/// must be non-empty and no longer than the channel count; every entry
/// must name an existing channel.
pub fn validate_channel_list(channels: &[ChannelSpec]) -> Result<(), DaqError> {
    if channels.is_empty() {
        return Err(DaqError::Value("channel list is empty".into()));
    }
    if channels.len() > MAX_INPUT_CHANNELS {
        return Err(DaqError::Value(format!(
            "channel list has {} entries, device supports {}",
            channels.len(),
            MAX_INPUT_CHANNELS
        )));
    }
    for spec in channels {
        if usize::from(spec.channel) >= MAX_INPUT_CHANNELS {
            return Err(DaqError::Value(format!(
                "channel {} out of range 0..{}",
                spec.channel, MAX_INPUT_CHANNELS
            )));
        }
    }
    Ok(())
}

/// Everything `fetch_scan` needs for one sweep-and-acquire run.
///
/// The generated ramp centers around `offset_volts` with the given
/// peak-to-peak amplitude; input channels are digitized at the matched
/// rate for the whole sweep.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub offset_volts: f64,
    pub amplitude_volts: f64,
    pub duration: Duration,
    pub shape: RampShape,
    pub channels: Vec<ChannelSpec>,
    pub samples_per_channel: usize,
    /// Samples held at the offset code before the active ramp begins, so
    /// the output has settled when the slope starts.
    pub settling_samples: usize,
    pub output_channel: OutputChannel,
}

impl ScanRequest {
    pub fn new(
        offset_volts: f64,
        amplitude_volts: f64,
        duration: Duration,
        shape: RampShape,
        channels: Vec<ChannelSpec>,
        samples_per_channel: usize,
    ) -> Self {
        Self {
            offset_volts,
            amplitude_volts,
            duration,
            shape,
            channels,
            samples_per_channel,
            settling_samples: 0,
            output_channel: OutputChannel::default(),
        }
    }

    /// Hardware pacer rate matching `samples_per_channel` over `duration`.
    pub fn sample_rate(&self) -> f64 {
        self.samples_per_channel as f64 / self.duration.as_secs_f64()
    }

    /// Validate the transfer-size and channel invariants.
    ///
    /// Voltage-range invariants are owned by the waveform generator and
    /// checked there, before any device I/O either way.
    pub fn validate(&self) -> Result<(), DaqError> {
        validate_channel_list(&self.channels)?;
        if self.duration.is_zero() {
            return Err(DaqError::Value("scan duration must be positive".into()));
        }
        if self.samples_per_channel == 0 {
            return Err(DaqError::Value("sample count must be positive".into()));
        }
        if self.samples_per_channel > MAX_TRANSFER_SAMPLES {
            return Err(DaqError::Value(format!(
                "{} samples per channel exceeds the {} sample transfer limit",
                self.samples_per_channel, MAX_TRANSFER_SAMPLES
            )));
        }
        let total = self.samples_per_channel * self.channels.len();
        if total > MAX_TRANSFER_SAMPLES {
            return Err(DaqError::Value(format!(
                "{total} total readings exceed the {MAX_TRANSFER_SAMPLES} sample transfer limit"
            )));
        }
        let reach = self.amplitude_volts.abs() / 2.0;
        if self.offset_volts + reach > FULL_SCALE_VOLTS
            || self.offset_volts - reach < -FULL_SCALE_VOLTS
        {
            return Err(DaqError::Value(format!(
                "ramp {} V ± {} V leaves the ±{} V output range",
                self.offset_volts, reach, FULL_SCALE_VOLTS
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(samples: usize, n_channels: usize) -> ScanRequest {
        let channels = (0..n_channels as u8).map(ChannelSpec::new).collect();
        ScanRequest::new(
            0.0,
            2.0,
            Duration::from_secs(1),
            RampShape::Descent,
            channels,
            samples,
        )
    }

    #[test]
    fn test_channel_list_limits() {
        assert!(validate_channel_list(&[]).is_err());
        let too_many: Vec<_> = (0..17).map(|_| ChannelSpec::new(0)).collect();
        assert!(validate_channel_list(&too_many).is_err());
        assert!(validate_channel_list(&[ChannelSpec::new(16)]).is_err());
        assert!(validate_channel_list(&[ChannelSpec::new(15)]).is_ok());
    }

    #[test]
    fn test_request_transfer_limits() {
        assert!(request(1000, 2).validate().is_ok());
        assert!(request(3000, 1).validate().is_err());
        // Per-channel count fits, product does not.
        assert!(request(2000, 2).validate().is_err());
        assert!(request(0, 1).validate().is_err());
    }

    #[test]
    fn test_request_voltage_reach() {
        let mut req = request(100, 1);
        req.offset_volts = 9.0;
        req.amplitude_volts = 4.0;
        assert!(req.validate().is_err());
        req.amplitude_volts = 2.0;
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_sample_rate_matches_duration() {
        let req = request(1000, 2);
        assert_eq!(req.sample_rate(), 1000.0);
    }
}
