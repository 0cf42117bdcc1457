//! Finding, opening and configuring CM6206 devices.

use std::thread;

use cm6206_core::{ActivationOutcome, Settings, Timing};
use tracing::{debug, error, info, warn};

use crate::acquirer::with_control_interface;
use crate::backend::{BusDevice, DeviceObject, UsbBus};
use crate::error::{PassError, UsbError, UsbResult};
use crate::sequencer::activate;

/// Position of the control interface among the device's interfaces.
///
/// Purely positional: the CM6206 descriptor layout puts the interface that
/// accepts the register writes second. Nothing checks its class or protocol,
/// so a chip revision with a different layout would be driven wrongly.
pub const CONTROL_INTERFACE_POSITION: usize = 1;

/// Activate every attached device matching the configured target.
///
/// Returns the number of devices found. Devices whose pass fails are
/// reported and skipped.
///
/// # Errors
/// Returns an error only if the bus cannot be enumerated.
pub fn activate_all<B: UsbBus>(bus: &B, settings: &Settings) -> UsbResult<usize> {
    let devices = bus.matching_devices(settings.target)?;

    for device in &devices {
        if settings.verbose {
            info!(device = %device.key(), "CM6206 found");
        }
        if let Err(e) = activate_device(device, settings) {
            error!(device = %device.key(), error = %e, "Activation pass failed");
        }
    }

    if devices.is_empty() && settings.verbose {
        info!("No CM6206 device found on the USB bus.");
    }

    Ok(devices.len())
}

/// Run one full activation pass against `device`.
///
/// The device object is closed (if it was opened) and released on every
/// path; close and release failures are logged only.
///
/// # Errors
/// Returns the [`PassError`] that ended the pass early.
pub fn activate_device<D: BusDevice>(device: &D, settings: &Settings) -> Result<ActivationOutcome, PassError> {
    let key = device.key();
    let mut object = device.create_object().map_err(PassError::CreateDevice)?;

    let mut opened = false;
    let result = open_and_activate(&mut object, &mut opened, settings);

    if opened && let Err(e) = object.close() {
        error!(device = %key, error = %e, "Error closing device");
    }
    if let Err(e) = object.release() {
        error!(device = %key, error = %e, "Error releasing device");
    }

    if let Err(e) = &result {
        error!(device = %key, error = %e, "Giving up on device");
    }
    result
}

fn open_and_activate<O: DeviceObject>(
    object: &mut O,
    opened: &mut bool,
    settings: &Settings,
) -> Result<ActivationOutcome, PassError> {
    open_with_retry(object, &settings.timing)?;
    *opened = true;

    let configurations = object.configuration_count().map_err(PassError::ConfigurationCount)?;
    if configurations == 0 {
        return Err(PassError::NoConfiguration);
    }
    debug!(configurations, "Found configurations");

    let value = object.configuration_value(0).map_err(PassError::ConfigDescriptor)?;
    object.set_configuration(value).map_err(PassError::SetConfiguration)?;

    let numbers = object.interface_numbers().map_err(PassError::Interfaces)?;
    for number in &numbers {
        debug!(interface = number, "Found interface");
    }
    let Some(&control) = numbers.get(CONTROL_INTERFACE_POSITION) else {
        return Err(PassError::NoControlInterface(numbers.len()));
    };

    let interface = object.interface(control).map_err(PassError::CreateInterface)?;
    with_control_interface(interface, settings, |interface| activate(interface, settings))
}

/// Open the device, pausing between attempts, until it opens or the
/// attempts run out.
fn open_with_retry<O: DeviceObject>(object: &mut O, timing: &Timing) -> Result<(), PassError> {
    let attempts = timing.open_attempts;
    let mut last_error = UsbError::NoDevice;

    for attempt in 1..=attempts {
        match object.open() {
            Ok(()) => return Ok(()),
            Err(e) => {
                let left = attempts - attempt;
                warn!(attempts_left = left, error = %e, "Trying to open device");
                last_error = e;
                if left > 0 {
                    thread::sleep(timing.open_retry_delay);
                }
            }
        }
    }

    Err(PassError::Open { attempts, source: last_error })
}
