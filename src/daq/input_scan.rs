use log::debug;
use ndarray::Array2;

use super::device::DaqDevice;
use super::protocol;
use super::transport::UsbTransport;
use crate::error::DaqError;
use crate::types::{validate_channel_list, ChannelSpec, MAX_TRANSFER_SAMPLES};

impl<T: UsbTransport> DaqDevice<T> {
    /// Digitize one or more input channels at a fixed hardware pace.
    ///
    /// Any running input scan is stopped and its FIFO cleared, the
    /// channel configuration is pushed (the protocol layer flags the last
    /// list entry as terminal), and a scan of
    /// `n_samples * channels.len()` conversions is started at `frequency`
    /// Hz. The blocking readback uses the session's input timeout, which
    /// is far above the usual USB timeout: slow acquisitions legitimately
    /// take that long.
    ///
    /// # Arguments
    /// * `n_samples` - Conversions per channel
    /// * `frequency` - Pacer rate in Hz
    /// * `channels` - Scan list, cycled once per pacer tick
    ///
    /// # Returns
    /// Raw digital codes shaped `(n_samples, channels.len())`. Voltage
    /// conversion is a separate step, see [`crate::codec::scan_to_volts`].
    ///
    /// # Errors
    /// [`DaqError::Value`] before any device I/O on an invalid request;
    /// [`DaqError::Connection`] if the readback byte count does not match
    /// the request — partial data is flagged, never silently truncated.
    ///
    /// # Examples
    /// ```no_run
    /// use mcc_sweep::{ChannelSpec, DaqDevice};
    ///
    /// let mut daq = DaqDevice::open()?;
    /// let codes = daq.sample_channels(500, 1000.0, &[ChannelSpec::new(0)])?;
    /// assert_eq!(codes.dim(), (500, 1));
    /// # Ok::<(), mcc_sweep::DaqError>(())
    /// ```
    pub fn sample_channels(
        &mut self,
        n_samples: usize,
        frequency: f64,
        channels: &[ChannelSpec],
    ) -> Result<Array2<u16>, DaqError> {
        validate_channel_list(channels)?;
        if n_samples == 0 || n_samples > MAX_TRANSFER_SAMPLES {
            return Err(DaqError::Value(format!(
                "{n_samples} samples per channel outside 1..={MAX_TRANSFER_SAMPLES}"
            )));
        }
        let total = n_samples * channels.len();
        if total > MAX_TRANSFER_SAMPLES {
            return Err(DaqError::Value(format!(
                "{total} total readings exceed the {MAX_TRANSFER_SAMPLES} sample transfer limit"
            )));
        }
        if !(frequency > 0.0) {
            return Err(DaqError::Value(format!(
                "input sample rate {frequency} Hz must be positive"
            )));
        }

        self.command(protocol::AIN_SCAN_STOP, &[])?;
        self.command(protocol::AIN_CLR_FIFO, &[])?;
        self.command(protocol::AIN_CONFIG, &protocol::encode_scan_list(channels))?;
        self.command(
            protocol::AIN_SCAN_START,
            &protocol::ain_scan_start_payload(total as u32, frequency),
        )?;

        let mut bytes = vec![0u8; 2 * total];
        let read = self.bulk_in(&mut bytes)?;
        if read != bytes.len() {
            return Err(DaqError::Connection(format!(
                "input scan returned {read} of {} bytes",
                bytes.len()
            )));
        }
        debug!(
            "input scan complete: {n_samples} samples on {} channels at {frequency} Hz",
            channels.len()
        );

        Array2::from_shape_vec((n_samples, channels.len()), protocol::unpack_samples(&bytes))
            .map_err(|e| DaqError::Value(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daq::device::DaqDeviceBuilder;
    use crate::daq::transport::mock::{MockTransport, Op};
    use crate::types::AnalogRange;

    fn device(transport: MockTransport) -> DaqDevice<MockTransport> {
        DaqDeviceBuilder::default().with_transport(transport)
    }

    fn readings(n: usize) -> Vec<u8> {
        protocol::pack_samples(&(0..n as u16).collect::<Vec<_>>())
    }

    #[test]
    fn test_readback_shape_and_order() {
        let mut transport = MockTransport::default();
        transport.bulk_responses.push_back(readings(6));
        let mut daq = device(transport);
        let channels = [ChannelSpec::new(0), ChannelSpec::new(1)];
        let codes = daq.sample_channels(3, 1000.0, &channels).unwrap();
        assert_eq!(codes.dim(), (3, 2));
        // Channel cycle is the fast axis.
        assert_eq!(codes[(0, 0)], 0);
        assert_eq!(codes[(0, 1)], 1);
        assert_eq!(codes[(2, 1)], 5);
    }

    #[test]
    fn test_configure_then_start_then_read() {
        let mut transport = MockTransport::default();
        transport.bulk_responses.push_back(readings(4));
        let mut daq = device(transport);
        let channels = [ChannelSpec::new(2).with_range(AnalogRange::Bipolar5V)];
        daq.sample_channels(4, 500.0, &channels).unwrap();

        let ops = &daq.transport().ops;
        assert_eq!(ops.len(), 5);
        assert_eq!(
            ops[0],
            Op::ControlOut {
                request: protocol::AIN_SCAN_STOP,
                data: vec![]
            }
        );
        assert_eq!(
            ops[1],
            Op::ControlOut {
                request: protocol::AIN_CLR_FIFO,
                data: vec![]
            }
        );
        assert_eq!(
            ops[2],
            Op::ControlOut {
                request: protocol::AIN_CONFIG,
                data: protocol::encode_scan_list(&channels)
            }
        );
        match &ops[3] {
            Op::ControlOut { request, data } => {
                assert_eq!(*request, protocol::AIN_SCAN_START);
                assert_eq!(&data[0..4], &4u32.to_le_bytes());
            }
            other => panic!("expected scan start, got {other:?}"),
        }
        assert_eq!(
            ops[4],
            Op::BulkRead {
                endpoint: protocol::EP_AIN,
                requested: 8
            }
        );
    }

    #[test]
    fn test_short_read_is_flagged_not_truncated() {
        let mut transport = MockTransport::default();
        transport.bulk_responses.push_back(readings(3));
        let mut daq = device(transport);
        let channels = [ChannelSpec::new(0), ChannelSpec::new(1)];
        let result = daq.sample_channels(3, 1000.0, &channels);
        assert!(matches!(result, Err(DaqError::Connection(_))));
    }

    #[test]
    fn test_oversized_request_issues_no_io() {
        let mut daq = device(MockTransport::default());
        let channels = [ChannelSpec::new(0), ChannelSpec::new(1)];
        assert!(matches!(
            daq.sample_channels(2000, 1000.0, &channels),
            Err(DaqError::Value(_))
        ));
        assert!(daq.transport().ops.is_empty());
    }
}
