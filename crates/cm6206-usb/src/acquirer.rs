//! Scoped access to the chip's control interface.
//!
//! Opening the interface exclusively is attempted first, then seizing it. A
//! platform audio driver usually holds the interface already; the chip takes
//! register writes regardless of who owns the streaming side, so that case
//! carries on without exclusive access instead of giving up.

use cm6206_core::Settings;
use tracing::{debug, error, info};

use crate::backend::InterfaceObject;
use crate::error::{PassError, UsbError};

/// How the interface was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Opened (or seized) by us; closed again on the way out
    Exclusive,
    /// Held by another driver; used without opening, never closed
    BestEffort,
}

/// Open `interface`, run `f` on it and tear it down.
///
/// The interface is closed only if it was opened and released on every
/// path. Close and release failures are logged, not returned.
///
/// # Errors
/// Returns [`PassError::OpenInterface`] if seizing fails for any reason other
/// than exclusive access; `f` is not run in that case.
pub fn with_control_interface<I, R>(
    mut interface: I,
    settings: &Settings,
    f: impl FnOnce(&mut I) -> R,
) -> Result<R, PassError>
where
    I: InterfaceObject,
{
    let number = interface.number();
    let access = acquire(&mut interface, settings);
    let opened = access == Ok(Access::Exclusive);
    let result = access.map(|_| f(&mut interface));

    if opened
        && let Err(e) = interface.close()
    {
        error!(interface = number, error = %e, "Unable to close interface");
    }
    if let Err(e) = interface.release() {
        error!(interface = number, error = %e, "Unable to release interface");
    }

    result
}

fn acquire<I: InterfaceObject>(interface: &mut I, settings: &Settings) -> Result<Access, PassError> {
    match interface.open() {
        Ok(()) => return Ok(Access::Exclusive),
        Err(e) => debug!(interface = interface.number(), error = %e, "Interface open failed, seizing"),
    }

    match interface.open_seize() {
        Ok(()) => Ok(Access::Exclusive),
        Err(UsbError::ExclusiveAccess) => {
            if settings.verbose {
                info!(interface = interface.number(), "Interface held by system driver (expected)");
                info!("Continuing without exclusive access (control requests still work)");
            }
            Ok(Access::BestEffort)
        }
        Err(e) => {
            error!(interface = interface.number(), error = %e, "Unable to open/seize interface");
            Err(PassError::OpenInterface(e))
        }
    }
}
