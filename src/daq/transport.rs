//! USB transport seam between the scan engines and the bus.
//!
//! The device layer talks to [`UsbTransport`] only, so everything above
//! this module runs unmodified against the libusb-backed transport or the
//! mock used by the tests.

use std::time::Duration;

use log::debug;
use rusb::{Context, DeviceHandle, UsbContext};

use crate::error::DaqError;

const VENDOR_REQUEST_OUT: u8 = 0x40; // host-to-device | vendor | device
const VENDOR_REQUEST_IN: u8 = 0xc0;

/// Low-level transfer primitives of one open device.
///
/// Every call carries an explicit timeout; an elapsed timeout surfaces as
/// [`DaqError::Timeout`] so callers can tell a stalled engine from a
/// broken pipe.
pub trait UsbTransport {
    fn control_out(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> Result<(), DaqError>;

    fn control_in(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        data: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, DaqError>;

    fn bulk_write(&mut self, endpoint: u8, data: &[u8], timeout: Duration)
        -> Result<usize, DaqError>;

    fn bulk_read(
        &mut self,
        endpoint: u8,
        data: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, DaqError>;
}

fn map_usb_error(err: rusb::Error, timeout: Duration) -> DaqError {
    match err {
        rusb::Error::Timeout => DaqError::Timeout(timeout),
        other => DaqError::Usb(other),
    }
}

/// Production transport over libusb.
pub struct RusbTransport {
    handle: DeviceHandle<Context>,
}

impl RusbTransport {
    /// Find the device by vendor/product id and claim its interface.
    pub fn open(vendor_id: u16, product_id: u16) -> Result<Self, DaqError> {
        let context = Context::new()?;
        let mut handle = context
            .open_device_with_vid_pid(vendor_id, product_id)
            .ok_or(DaqError::DeviceNotFound)?;
        let _ = handle.set_auto_detach_kernel_driver(true);
        handle.claim_interface(0)?;
        debug!("claimed USB device {vendor_id:04x}:{product_id:04x}");
        Ok(Self { handle })
    }
}

impl UsbTransport for RusbTransport {
    fn control_out(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> Result<(), DaqError> {
        self.handle
            .write_control(VENDOR_REQUEST_OUT, request, value, index, data, timeout)
            .map(drop)
            .map_err(|e| map_usb_error(e, timeout))
    }

    fn control_in(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        data: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, DaqError> {
        self.handle
            .read_control(VENDOR_REQUEST_IN, request, value, index, data, timeout)
            .map_err(|e| map_usb_error(e, timeout))
    }

    fn bulk_write(
        &mut self,
        endpoint: u8,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, DaqError> {
        self.handle
            .write_bulk(endpoint, data, timeout)
            .map_err(|e| map_usb_error(e, timeout))
    }

    fn bulk_read(
        &mut self,
        endpoint: u8,
        data: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, DaqError> {
        self.handle
            .read_bulk(endpoint, data, timeout)
            .map_err(|e| map_usb_error(e, timeout))
    }
}
