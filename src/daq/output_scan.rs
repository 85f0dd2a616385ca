use std::time::Duration;

use log::debug;

use super::device::DaqDevice;
use super::protocol;
use super::transport::UsbTransport;
use crate::error::DaqError;
use crate::types::{OutputChannel, MAX_TRANSFER_SAMPLES};
use crate::waveform::{generate_triangle, Waveform};

impl<T: UsbTransport> DaqDevice<T> {
    /// Emit a waveform once through the hardware-paced output engine.
    ///
    /// The engine starts consuming its FIFO the instant the start command
    /// lands, so the FIFO is primed with the whole waveform first; the
    /// scan is started with the exact sample count (never continuous
    /// mode), so the engine halts itself after draining the FIFO and no
    /// explicit stop is needed afterwards.
    ///
    /// # Arguments
    /// * `waveform` - Output codes to emit, at most one bulk transfer long
    /// * `sample_rate` - Pacer rate in Hz
    /// * `channel` - Which analog output emits the waveform
    ///
    /// # Errors
    /// [`DaqError::Value`] before any device I/O if the waveform or rate
    /// is invalid; [`DaqError::Connection`] if the FIFO priming transfer
    /// comes up short.
    ///
    /// # Examples
    /// ```no_run
    /// use mcc_sweep::{generate_signal, DaqDevice, OutputChannel, RampShape};
    ///
    /// let mut daq = DaqDevice::open()?;
    /// let wave = generate_signal(RampShape::Ascent, 1000, 0, 2.0, 0.0)?;
    /// daq.output_signal(&wave, 1000.0, OutputChannel::Channel0)?;
    /// # Ok::<(), mcc_sweep::DaqError>(())
    /// ```
    pub fn output_signal(
        &mut self,
        waveform: &Waveform,
        sample_rate: f64,
        channel: OutputChannel,
    ) -> Result<(), DaqError> {
        if waveform.is_empty() || waveform.len() > MAX_TRANSFER_SAMPLES {
            return Err(DaqError::Value(format!(
                "waveform of {} samples does not fit one transfer of at most {} samples",
                waveform.len(),
                MAX_TRANSFER_SAMPLES
            )));
        }
        if !(sample_rate > 0.0) {
            return Err(DaqError::Value(format!(
                "output sample rate {sample_rate} Hz must be positive"
            )));
        }

        // A previous scan may still be running; stopping is idempotent.
        self.command(protocol::AOUT_SCAN_STOP, &[])?;
        self.command(protocol::AOUT_CLR_FIFO, &[])?;

        let bytes = protocol::pack_samples(waveform.samples());
        let written = self.bulk_out(&bytes)?;
        if written != bytes.len() {
            return Err(DaqError::Connection(format!(
                "output FIFO primed with {written} of {} bytes",
                bytes.len()
            )));
        }

        let payload =
            protocol::aout_scan_start_payload(waveform.len() as u32, sample_rate, channel);
        self.command(protocol::AOUT_SCAN_START, &payload)?;
        debug!(
            "output scan started: {} samples at {sample_rate} Hz on {channel:?}",
            waveform.len()
        );
        Ok(())
    }

    /// Emit one full-length triangle sweep over `duration`.
    ///
    /// Convenience wrapper for manual alignment work: a V-shaped ramp
    /// spanning `[min_volts, max_volts]` on output channel 0.
    pub fn triangle_once(
        &mut self,
        duration: Duration,
        min_volts: f64,
        max_volts: f64,
    ) -> Result<(), DaqError> {
        if duration.is_zero() {
            return Err(DaqError::Value("triangle duration must be positive".into()));
        }
        let waveform = generate_triangle(MAX_TRANSFER_SAMPLES, min_volts, max_volts);
        let rate = waveform.len() as f64 / duration.as_secs_f64();
        self.output_signal(&waveform, rate, OutputChannel::Channel0)
    }
}
