use log::info;
use ndarray::Array2;

use super::device::DaqDevice;
use super::transport::UsbTransport;
use crate::error::DaqError;
use crate::types::ScanRequest;
use crate::waveform::generate_signal;

impl<T: UsbTransport> DaqDevice<T> {
    /// Sweep the output voltage once and digitize the inputs while it runs.
    ///
    /// Three sequential phases, no branching back:
    ///
    /// 1. **Generate** the output waveform from the request; an invalid
    ///    request fails here, before any device I/O.
    /// 2. **Emit**: prime and start the output engine at
    ///    `samples_per_channel / duration` Hz. On failure the input engine
    ///    is never touched.
    /// 3. **Acquire**: immediately start the matched input scan on the
    ///    requested channels, same rate and sample count, and block until
    ///    the readback completes.
    ///
    /// Both engines run on their own pacer clocks once started; issuing
    /// the two start commands back to back is the closest available
    /// approximation of synchronization, since nothing in this design
    /// ties them to a common hardware trigger. The residual skew is one
    /// host round-trip.
    ///
    /// # Returns
    /// Raw digital codes shaped `(samples_per_channel, channels.len())`;
    /// convert with [`crate::codec::scan_to_volts`] when physical units
    /// are wanted.
    ///
    /// # Errors
    /// [`DaqError::Value`] / [`DaqError::NotImplemented`] from validation
    /// or waveform generation; [`DaqError::Connection`] or
    /// [`DaqError::Timeout`] from either engine, propagated unchanged.
    ///
    /// # Examples
    /// ```no_run
    /// use std::time::Duration;
    /// use mcc_sweep::{ChannelSpec, DaqDevice, RampShape, ScanRequest};
    ///
    /// let mut daq = DaqDevice::open()?;
    /// let request = ScanRequest::new(
    ///     0.0,
    ///     10.0,
    ///     Duration::from_secs(1),
    ///     RampShape::Descent,
    ///     vec![ChannelSpec::new(0), ChannelSpec::new(1)],
    ///     1000,
    /// );
    /// let codes = daq.fetch_scan(&request)?;
    /// assert_eq!(codes.dim(), (1000, 2));
    /// # Ok::<(), mcc_sweep::DaqError>(())
    /// ```
    pub fn fetch_scan(&mut self, request: &ScanRequest) -> Result<Array2<u16>, DaqError> {
        request.validate()?;
        let waveform = generate_signal(
            request.shape,
            request.samples_per_channel,
            request.settling_samples,
            request.amplitude_volts,
            request.offset_volts,
        )?;
        let rate = request.sample_rate();

        self.output_signal(&waveform, rate, request.output_channel)?;
        let readings = self.sample_channels(request.samples_per_channel, rate, &request.channels)?;

        info!(
            "sweep complete: {:?} ramp of {} V around {} V, {} readings on {} channels",
            request.shape,
            request.amplitude_volts,
            request.offset_volts,
            readings.nrows(),
            readings.ncols()
        );
        Ok(readings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::daq::device::DaqDeviceBuilder;
    use crate::daq::protocol;
    use crate::daq::transport::mock::{MockTransport, Op};
    use crate::types::{ChannelSpec, RampShape};

    fn device(transport: MockTransport) -> DaqDevice<MockTransport> {
        DaqDeviceBuilder::default().with_transport(transport)
    }

    fn request(samples: usize) -> ScanRequest {
        ScanRequest::new(
            0.0,
            10.0,
            Duration::from_secs(1),
            RampShape::Descent,
            vec![ChannelSpec::new(0), ChannelSpec::new(1)],
            samples,
        )
    }

    #[test]
    fn test_fetch_scan_end_to_end() {
        let mut transport = MockTransport::default();
        transport
            .bulk_responses
            .push_back(vec![0u8; 2 * 1000 * 2]);
        let mut daq = device(transport);

        let readings = daq.fetch_scan(&request(1000)).unwrap();
        assert_eq!(readings.dim(), (1000, 2));

        // Output engine is primed and started before the input engine is
        // even configured.
        let ops = &daq.transport().ops;
        let start_out = ops
            .iter()
            .position(|op| matches!(op, Op::ControlOut { request, .. } if *request == protocol::AOUT_SCAN_START))
            .expect("output scan started");
        let config_in = ops
            .iter()
            .position(|op| matches!(op, Op::ControlOut { request, .. } if *request == protocol::AIN_CONFIG))
            .expect("input scan configured");
        assert!(start_out < config_in);
    }

    #[test]
    fn test_short_readback_propagates_connection_error() {
        let mut transport = MockTransport::default();
        // One byte short of the 2 * 1000 * 2 expected.
        transport
            .bulk_responses
            .push_back(vec![0u8; 2 * 1000 * 2 - 1]);
        let mut daq = device(transport);
        assert!(matches!(
            daq.fetch_scan(&request(1000)),
            Err(DaqError::Connection(_))
        ));
    }

    #[test]
    fn test_invalid_request_touches_no_engine() {
        let mut daq = device(MockTransport::default());
        let mut req = request(100);
        req.offset_volts = 9.0;
        req.amplitude_volts = 4.0;
        assert!(matches!(daq.fetch_scan(&req), Err(DaqError::Value(_))));
        assert!(daq.transport().ops.is_empty());
    }

    #[test]
    fn test_output_failure_leaves_input_untouched() {
        let mut transport = MockTransport::default();
        transport.short_write = Some(1);
        let mut daq = device(transport);
        assert!(matches!(
            daq.fetch_scan(&request(1000)),
            Err(DaqError::Connection(_))
        ));
        assert!(!daq.transport().ops.iter().any(|op| matches!(
            op,
            Op::ControlOut { request, .. }
                if *request == protocol::AIN_SCAN_STOP || *request == protocol::AIN_SCAN_START
        )));
    }

    #[test]
    fn test_dip_request_is_rejected_before_io() {
        let mut daq = device(MockTransport::default());
        let mut req = request(1000);
        req.shape = RampShape::Dip;
        assert!(matches!(
            daq.fetch_scan(&req),
            Err(DaqError::NotImplemented(_))
        ));
        assert!(daq.transport().ops.is_empty());
    }
}
