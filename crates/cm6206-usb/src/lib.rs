//! CM6206 Enabler USB layer.
//!
//! Finds CM6206 adapters on the bus, gets at their control interface and
//! sends the register writes that switch the outputs on. In persistent mode
//! a [`Session`] repeats this whenever an adapter appears or the system
//! wakes up.
//!
//! The activation pipeline is written against the traits in [`backend`];
//! [`rusb_backend`] implements them on top of libusb.

pub mod acquirer;
pub mod backend;
pub mod error;
pub mod hotplug;
pub mod locator;
pub mod rusb_backend;
pub mod sequencer;
pub mod session;
pub mod writer;

#[cfg(test)]
mod mock;

pub use acquirer::{Access, with_control_interface};
pub use backend::{BusDevice, DeviceKey, DeviceObject, InterfaceObject, UsbBus};
pub use error::{PassError, UsbError, UsbResult};
pub use hotplug::{HotplugEvent, HotplugMonitor};
pub use locator::{CONTROL_INTERFACE_POSITION, activate_all, activate_device};
pub use rusb_backend::{RusbBus, RusbDevice};
pub use sequencer::activate;
pub use session::{
    Disposition, PowerControl, PowerEvent, Session, SessionEvent, SessionState, WatchedDevice,
};
pub use writer::write_register;
