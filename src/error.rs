use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DaqError {
    #[error("value error: {0}")]
    Value(String),
    #[error("connection error: {0}")]
    Connection(String),
    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("no matching DAQ device found on the bus")]
    DeviceNotFound,
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("type error: {0}")]
    Type(String),
}
