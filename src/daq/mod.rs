pub mod device;
pub mod input_scan;
pub mod output_scan;
pub mod protocol;
pub mod sweep;
pub mod transport;

// Re-export the main types from the device layer
pub use device::{DaqDevice, DaqDeviceBuilder};
pub use transport::{RusbTransport, UsbTransport};
