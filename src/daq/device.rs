//! The device session: one open DAQ, one operation in flight.

use std::time::Duration;

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, warn};

use super::protocol;
use super::transport::{RusbTransport, UsbTransport};
use crate::config::DeviceConfig;
use crate::error::DaqError;

/// An open DAQ device.
///
/// `DaqDevice` is the explicit session object around the shared device
/// handle: every scan operation takes `&mut self`, so the type system
/// already enforces that at most one orchestration runs per session.
/// Callers that share a device across threads wrap it in their own mutex.
///
/// Starting a new output or input scan implicitly stops and clears any
/// previous one ("last writer wins"), so a session left in an unknown
/// state after a [`DaqError::Connection`] or [`DaqError::Timeout`] is
/// recovered by simply issuing the next scan.
///
/// # Examples
/// ```no_run
/// use mcc_sweep::DaqDevice;
///
/// let mut daq = DaqDevice::open()?;
/// assert!(daq.ping());
/// # Ok::<(), mcc_sweep::DaqError>(())
/// ```
pub struct DaqDevice<T> {
    transport: T,
    control_timeout: Duration,
    output_timeout: Duration,
    input_timeout: Duration,
}

impl DaqDevice<RusbTransport> {
    /// Open the first matching device with default timeouts.
    pub fn open() -> Result<Self, DaqError> {
        Self::builder().open()
    }

    pub fn builder() -> DaqDeviceBuilder {
        DaqDeviceBuilder::default()
    }
}

impl<T: UsbTransport> DaqDevice<T> {
    /// Read the device status word.
    pub fn status(&mut self) -> Result<u16, DaqError> {
        let mut buf = [0u8; 2];
        let n = self
            .transport
            .control_in(protocol::STATUS, 0, 0, &mut buf, self.control_timeout)?;
        if n != buf.len() {
            return Err(DaqError::Connection(format!(
                "status query returned {n} of {} bytes",
                buf.len()
            )));
        }
        Ok(LittleEndian::read_u16(&buf))
    }

    /// The DAQ talks to us and reports normal operating mode.
    pub fn ping(&mut self) -> bool {
        match self.status() {
            Ok(status) => status == protocol::STATUS_NORMAL,
            Err(e) => {
                warn!("DAQ ping failed: {e}");
                false
            }
        }
    }

    /// Blink the device LED, useful to identify one DAQ among several.
    pub fn blink(&mut self, count: u8) -> Result<(), DaqError> {
        self.command(protocol::BLINK_LED, &[count])
    }

    /// Read the factory serial number.
    pub fn serial_number(&mut self) -> Result<String, DaqError> {
        let mut buf = [0u8; protocol::SERIAL_LEN];
        let n = self
            .transport
            .control_in(protocol::SERIAL, 0, 0, &mut buf, self.control_timeout)?;
        Ok(String::from_utf8_lossy(&buf[..n]).trim_end_matches('\0').to_string())
    }

    /// Issue a vendor command with an optional payload.
    pub(crate) fn command(&mut self, request: u8, data: &[u8]) -> Result<(), DaqError> {
        debug!("command {request:#04x} ({} payload bytes)", data.len());
        self.transport
            .control_out(request, 0, 0, data, self.control_timeout)
    }

    /// Push bytes into the output FIFO over the bulk pipe.
    pub(crate) fn bulk_out(&mut self, bytes: &[u8]) -> Result<usize, DaqError> {
        self.transport
            .bulk_write(protocol::EP_AOUT, bytes, self.output_timeout)
    }

    /// Blocking read from the input stream with the generous input timeout.
    pub(crate) fn bulk_in(&mut self, buf: &mut [u8]) -> Result<usize, DaqError> {
        self.transport
            .bulk_read(protocol::EP_AIN, buf, self.input_timeout)
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }
}

/// Builder for [`DaqDevice`] sessions.
///
/// # Examples
/// ```no_run
/// use std::time::Duration;
/// use mcc_sweep::DaqDevice;
///
/// let mut daq = DaqDevice::builder()
///     .input_timeout(Duration::from_secs(60))
///     .open()?;
/// # Ok::<(), mcc_sweep::DaqError>(())
/// ```
pub struct DaqDeviceBuilder {
    vendor_id: u16,
    product_id: u16,
    control_timeout: Duration,
    output_timeout: Duration,
    input_timeout: Duration,
}

impl Default for DaqDeviceBuilder {
    fn default() -> Self {
        let defaults = DeviceConfig::default();
        Self {
            vendor_id: defaults.vendor_id,
            product_id: defaults.product_id,
            control_timeout: Duration::from_millis(defaults.control_timeout_ms),
            output_timeout: Duration::from_millis(defaults.output_timeout_ms),
            input_timeout: Duration::from_millis(defaults.input_timeout_ms),
        }
    }
}

impl DaqDeviceBuilder {
    /// Apply a loaded [`DeviceConfig`] wholesale.
    pub fn config(mut self, config: &DeviceConfig) -> Self {
        self.vendor_id = config.vendor_id;
        self.product_id = config.product_id;
        self.control_timeout = Duration::from_millis(config.control_timeout_ms);
        self.output_timeout = Duration::from_millis(config.output_timeout_ms);
        self.input_timeout = Duration::from_millis(config.input_timeout_ms);
        self
    }

    pub fn vendor_id(mut self, vendor_id: u16) -> Self {
        self.vendor_id = vendor_id;
        self
    }

    pub fn product_id(mut self, product_id: u16) -> Self {
        self.product_id = product_id;
        self
    }

    pub fn control_timeout(mut self, timeout: Duration) -> Self {
        self.control_timeout = timeout;
        self
    }

    pub fn output_timeout(mut self, timeout: Duration) -> Self {
        self.output_timeout = timeout;
        self
    }

    pub fn input_timeout(mut self, timeout: Duration) -> Self {
        self.input_timeout = timeout;
        self
    }

    /// Open the device over libusb.
    pub fn open(self) -> Result<DaqDevice<RusbTransport>, DaqError> {
        let transport = RusbTransport::open(self.vendor_id, self.product_id)?;
        Ok(self.with_transport(transport))
    }

    /// Build a session over an arbitrary transport implementation.
    pub fn with_transport<T: UsbTransport>(self, transport: T) -> DaqDevice<T> {
        DaqDevice {
            transport,
            control_timeout: self.control_timeout,
            output_timeout: self.output_timeout,
            input_timeout: self.input_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daq::transport::mock::{MockTransport, Op};

    fn device(transport: MockTransport) -> DaqDevice<MockTransport> {
        DaqDeviceBuilder::default().with_transport(transport)
    }

    #[test]
    fn test_ping_checks_normal_mode() {
        let mut transport = MockTransport::default();
        transport.control_responses.push_back(vec![0x60, 0x01]);
        transport.control_responses.push_back(vec![0x62, 0x01]);
        let mut daq = device(transport);
        assert!(daq.ping());
        // Any other status word (here: input scan running) is unhealthy.
        assert!(!daq.ping());
    }

    #[test]
    fn test_short_status_read_is_a_connection_error() {
        let mut transport = MockTransport::default();
        transport.control_responses.push_back(vec![0x60]);
        let mut daq = device(transport);
        assert!(matches!(daq.status(), Err(DaqError::Connection(_))));
    }

    #[test]
    fn test_serial_number_trims_padding() {
        let mut transport = MockTransport::default();
        transport
            .control_responses
            .push_back(b"01ABCD\0\0".to_vec());
        let mut daq = device(transport);
        assert_eq!(daq.serial_number().unwrap(), "01ABCD");
        assert_eq!(
            daq.transport().ops,
            vec![Op::ControlIn {
                request: protocol::SERIAL
            }]
        );
    }

    #[test]
    fn test_blink_payload() {
        let mut daq = device(MockTransport::default());
        daq.blink(3).unwrap();
        assert_eq!(
            daq.transport().ops,
            vec![Op::ControlOut {
                request: protocol::BLINK_LED,
                data: vec![3]
            }]
        );
    }
}
