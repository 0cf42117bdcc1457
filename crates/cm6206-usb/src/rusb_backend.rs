//! libusb implementation of the backend traits.

use std::time::Duration;

use cm6206_core::{ControlSetup, TargetIdentity};
use rusb::{Context, Device, DeviceDescriptor, DeviceHandle, UsbContext};
use tracing::debug;

use crate::backend::{BusDevice, DeviceKey, DeviceObject, InterfaceObject, UsbBus};
use crate::error::{UsbError, UsbResult};

/// Timeout for control transfers on the default pipe.
const CONTROL_TIMEOUT: Duration = Duration::from_secs(1);
/// Timeout for reading the product string.
const STRING_TIMEOUT: Duration = Duration::from_millis(200);
/// The default control pipe.
const DEFAULT_PIPE: u8 = 0;

/// The USB bus, seen through a libusb context.
#[derive(Debug, Clone)]
pub struct RusbBus {
    context: Context,
}

impl RusbBus {
    /// Create a new libusb context.
    ///
    /// # Errors
    /// Returns an error if libusb cannot be initialised.
    pub fn new() -> UsbResult<Self> {
        Ok(Self { context: Context::new()? })
    }

    /// The underlying context, e.g. for hotplug registration.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }
}

impl UsbBus for RusbBus {
    type Device = RusbDevice;

    fn matching_devices(&self, target: TargetIdentity) -> UsbResult<Vec<RusbDevice>> {
        let devices = self.context.devices()?;
        Ok(devices
            .iter()
            .filter(|device| {
                device
                    .device_descriptor()
                    .is_ok_and(|desc| target.matches(desc.vendor_id(), desc.product_id()))
            })
            .map(RusbDevice::new)
            .collect())
    }
}

/// An attached device reference.
#[derive(Debug, Clone)]
pub struct RusbDevice {
    device: Device<Context>,
}

impl RusbDevice {
    /// Wrap a libusb device reference.
    #[must_use]
    pub fn new(device: Device<Context>) -> Self {
        Self { device }
    }

    fn product_string(&self) -> Option<String> {
        let desc = self.device.device_descriptor().ok()?;
        let handle = self.device.open().ok()?;
        let language = handle.read_languages(STRING_TIMEOUT).ok()?.into_iter().next()?;
        handle.read_product_string(language, &desc, STRING_TIMEOUT).ok()
    }
}

impl BusDevice for RusbDevice {
    type Object = RusbDeviceObject;

    fn key(&self) -> DeviceKey {
        DeviceKey { bus: self.device.bus_number(), address: self.device.address() }
    }

    fn display_name(&self) -> String {
        self.product_string().unwrap_or_else(|| {
            let ids = self
                .device
                .device_descriptor()
                .map(|d| format!("{:04x}:{:04x}", d.vendor_id(), d.product_id()))
                .unwrap_or_else(|_| "????:????".to_string());
            format!("USB device {ids} at {}", self.key())
        })
    }

    fn create_object(&self) -> UsbResult<RusbDeviceObject> {
        let descriptor = self.device.device_descriptor()?;
        Ok(RusbDeviceObject { device: self.device.clone(), descriptor, handle: None })
    }
}

/// Open/configure side of a libusb device.
pub struct RusbDeviceObject {
    device: Device<Context>,
    descriptor: DeviceDescriptor,
    handle: Option<DeviceHandle<Context>>,
}

impl RusbDeviceObject {
    fn handle_mut(&mut self) -> UsbResult<&mut DeviceHandle<Context>> {
        self.handle.as_mut().ok_or(UsbError::NotOpen)
    }
}

impl DeviceObject for RusbDeviceObject {
    type Interface<'a>
        = RusbInterface<'a>
    where
        Self: 'a;

    fn open(&mut self) -> UsbResult<()> {
        if self.handle.is_none() {
            self.handle = Some(self.device.open()?);
        }
        Ok(())
    }

    fn configuration_count(&self) -> UsbResult<u8> {
        Ok(self.descriptor.num_configurations())
    }

    fn configuration_value(&self, index: u8) -> UsbResult<u8> {
        Ok(self.device.config_descriptor(index)?.number())
    }

    fn set_configuration(&mut self, value: u8) -> UsbResult<()> {
        let handle = self.handle_mut()?;
        // Re-selecting the active configuration fails while a kernel driver
        // is bound to any interface.
        if handle.active_configuration()? == value {
            debug!(configuration = value, "Configuration already active");
            return Ok(());
        }
        handle.set_active_configuration(value)?;
        Ok(())
    }

    fn interface_numbers(&self) -> UsbResult<Vec<u8>> {
        let config = self.device.active_config_descriptor()?;
        Ok(config.interfaces().map(|interface| interface.number()).collect())
    }

    fn interface(&mut self, number: u8) -> UsbResult<RusbInterface<'_>> {
        if !self.interface_numbers()?.contains(&number) {
            return Err(UsbError::NotFound);
        }
        let handle = self.handle_mut()?;
        Ok(RusbInterface { handle, number })
    }

    fn close(&mut self) -> UsbResult<()> {
        // libusb closes the handle when it is dropped.
        self.handle.take().map(drop).ok_or(UsbError::NotOpen)
    }

    fn release(self) -> UsbResult<()> {
        Ok(())
    }
}

/// One interface of an open libusb device.
pub struct RusbInterface<'a> {
    handle: &'a mut DeviceHandle<Context>,
    number: u8,
}

impl InterfaceObject for RusbInterface<'_> {
    fn number(&self) -> u8 {
        self.number
    }

    fn open(&mut self) -> UsbResult<()> {
        self.handle.claim_interface(self.number)?;
        Ok(())
    }

    fn open_seize(&mut self) -> UsbResult<()> {
        // A bound kernel driver (snd-usb-audio, usbhid) is never detached:
        // unbinding it would tear down the sound card being enabled.
        if self.handle.kernel_driver_active(self.number).unwrap_or(false) {
            return Err(UsbError::ExclusiveAccess);
        }
        self.handle.claim_interface(self.number)?;
        Ok(())
    }

    fn control_out(&mut self, setup: &ControlSetup, data: &[u8]) -> UsbResult<usize> {
        Ok(self.handle.write_control(
            setup.request_type,
            setup.request,
            setup.value,
            setup.index,
            data,
            CONTROL_TIMEOUT,
        )?)
    }

    fn clear_pipe_stall(&mut self) -> UsbResult<()> {
        self.handle.clear_halt(DEFAULT_PIPE)?;
        Ok(())
    }

    fn close(&mut self) -> UsbResult<()> {
        self.handle.release_interface(self.number)?;
        Ok(())
    }

    fn release(self) -> UsbResult<()> {
        Ok(())
    }
}
