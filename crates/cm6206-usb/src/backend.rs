//! Bus, device and interface abstractions the activation pipeline runs on.
//!
//! Each level hands out the next one: a [`UsbBus`] lists [`BusDevice`]s, a
//! bus device creates a [`DeviceObject`] (the open/configure side of one
//! device) and a device object lends out [`InterfaceObject`]s.
//!
//! Objects that have a `release` method must be released exactly once, and
//! closed before that only if they were opened.

use std::fmt;

use cm6206_core::{ControlSetup, TargetIdentity};

use crate::error::UsbResult;

/// Position of a device on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceKey {
    /// Bus number
    pub bus: u8,
    /// Device address on that bus
    pub address: u8,
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}-{:03}", self.bus, self.address)
    }
}

/// Source of devices matching a vendor/product pair.
pub trait UsbBus {
    /// Device reference type.
    type Device: BusDevice;

    /// List every currently attached device with the given identity, in bus order.
    ///
    /// # Errors
    /// Returns an error if the bus cannot be enumerated at all.
    fn matching_devices(&self, target: TargetIdentity) -> UsbResult<Vec<Self::Device>>;
}

/// A reference to one attached device.
pub trait BusDevice {
    /// Device object type created from this reference.
    type Object: DeviceObject;

    /// Bus position, stable while the device stays attached.
    fn key(&self) -> DeviceKey;

    /// Name to show in diagnostics.
    fn display_name(&self) -> String;

    /// Create the object used to open and configure the device.
    ///
    /// # Errors
    /// Returns an error if the device cannot be bridged.
    fn create_object(&self) -> UsbResult<Self::Object>;
}

/// Open/configure side of a device.
pub trait DeviceObject {
    /// Interface object lent out by [`DeviceObject::interface`].
    type Interface<'a>: InterfaceObject
    where
        Self: 'a;

    /// Open the device.
    ///
    /// # Errors
    /// Returns an error if the device is not ready or not accessible.
    fn open(&mut self) -> UsbResult<()>;

    /// Number of configurations the device offers.
    ///
    /// # Errors
    /// Returns an error if the descriptor cannot be read.
    fn configuration_count(&self) -> UsbResult<u8>;

    /// `bConfigurationValue` of the configuration descriptor at `index`.
    ///
    /// # Errors
    /// Returns an error if the descriptor cannot be read.
    fn configuration_value(&self, index: u8) -> UsbResult<u8>;

    /// Make `value` the active configuration.
    ///
    /// # Errors
    /// Returns an error if the device rejects the configuration.
    fn set_configuration(&mut self, value: u8) -> UsbResult<()>;

    /// Interface numbers of the active configuration, in descriptor order.
    ///
    /// # Errors
    /// Returns an error if the active configuration cannot be read.
    fn interface_numbers(&self) -> UsbResult<Vec<u8>>;

    /// Create the object for interface `number`.
    ///
    /// # Errors
    /// Returns an error if the interface does not exist or the device is not open.
    fn interface(&mut self, number: u8) -> UsbResult<Self::Interface<'_>>;

    /// Close a device opened with [`DeviceObject::open`].
    ///
    /// # Errors
    /// Returns an error if closing fails; the object must still be released.
    fn close(&mut self) -> UsbResult<()>;

    /// Release the object.
    ///
    /// # Errors
    /// Returns an error if the platform reports a failed release.
    fn release(self) -> UsbResult<()>
    where
        Self: Sized;
}

/// Access to one interface of an open device.
pub trait InterfaceObject {
    /// Interface number.
    fn number(&self) -> u8;

    /// Open the interface exclusively.
    ///
    /// # Errors
    /// Returns an error if the interface is in use or not accessible.
    fn open(&mut self) -> UsbResult<()>;

    /// Open the interface, taking it away from its current holder if the
    /// platform permits.
    ///
    /// # Errors
    /// Returns [`crate::UsbError::ExclusiveAccess`] if the holder keeps it.
    fn open_seize(&mut self) -> UsbResult<()>;

    /// Issue an OUT control transfer on the default pipe, returning the
    /// number of bytes written.
    ///
    /// # Errors
    /// Returns an error if the transfer fails.
    fn control_out(&mut self, setup: &ControlSetup, data: &[u8]) -> UsbResult<usize>;

    /// Clear a stall on the default pipe.
    ///
    /// # Errors
    /// Returns an error if the halt cannot be cleared.
    fn clear_pipe_stall(&mut self) -> UsbResult<()>;

    /// Close an interface opened with [`InterfaceObject::open`] or
    /// [`InterfaceObject::open_seize`].
    ///
    /// # Errors
    /// Returns an error if closing fails; the object must still be released.
    fn close(&mut self) -> UsbResult<()>;

    /// Release the object.
    ///
    /// # Errors
    /// Returns an error if the platform reports a failed release.
    fn release(self) -> UsbResult<()>
    where
        Self: Sized;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_key_display() {
        assert_eq!(DeviceKey { bus: 1, address: 14 }.to_string(), "001-014");
    }
}
