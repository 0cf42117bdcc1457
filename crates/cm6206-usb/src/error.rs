//! USB error types.

use thiserror::Error;

/// Error reported by a USB operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsbError {
    #[error("Exclusive access and device already open")]
    ExclusiveAccess,

    #[error("Pipe has stalled, error needs to be cleared")]
    PipeStalled,

    #[error("Permission denied - check udev rules")]
    PermissionDenied,

    #[error("No such device")]
    NoDevice,

    #[error("Entity not found")]
    NotFound,

    #[error("Device not open")]
    NotOpen,

    #[error("I/O timeout")]
    Timeout,

    #[error("Short transfer: {actual} of {expected} bytes")]
    ShortTransfer { expected: usize, actual: usize },

    #[error("Hotplug notifications are not supported by this libusb")]
    HotplugUnsupported,

    #[error("USB error: {0}")]
    Other(String),
}

impl From<rusb::Error> for UsbError {
    fn from(err: rusb::Error) -> Self {
        match err {
            rusb::Error::Busy => Self::ExclusiveAccess,
            rusb::Error::Pipe => Self::PipeStalled,
            rusb::Error::Access => Self::PermissionDenied,
            rusb::Error::NoDevice => Self::NoDevice,
            rusb::Error::NotFound => Self::NotFound,
            rusb::Error::Timeout => Self::Timeout,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Result type for USB operations.
pub type UsbResult<T> = Result<T, UsbError>;

/// Failure that ends the activation pass for one device.
///
/// Other devices and later events are not affected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PassError {
    #[error("unable to create device object: {0}")]
    CreateDevice(UsbError),

    #[error("unable to open device after {attempts} attempts: {source}")]
    Open { attempts: u32, source: UsbError },

    #[error("unable to obtain the number of configurations: {0}")]
    ConfigurationCount(UsbError),

    #[error("device reports no configurations")]
    NoConfiguration,

    #[error("unable to get config descriptor for index 0: {0}")]
    ConfigDescriptor(UsbError),

    #[error("unable to set the configuration: {0}")]
    SetConfiguration(UsbError),

    #[error("unable to enumerate interfaces: {0}")]
    Interfaces(UsbError),

    #[error("control interface missing, device has {0} interface(s)")]
    NoControlInterface(usize),

    #[error("unable to create interface object: {0}")]
    CreateInterface(UsbError),

    #[error("unable to open/seize interface: {0}")]
    OpenInterface(UsbError),
}
