//! Single register write.

use cm6206_core::encode_payload;
use cm6206_core::register::{PAYLOAD_LEN, REGISTER_WRITE};
use tracing::{debug, error};

use crate::backend::InterfaceObject;
use crate::error::{UsbError, UsbResult};

/// Write `value` to CM6206 register `register` through `interface`.
///
/// A stalled default pipe is cleared before the failure is returned; a
/// failure to clear it is only logged.
///
/// # Errors
/// Returns the transfer error, or [`UsbError::ShortTransfer`] if the chip
/// accepted fewer than four bytes.
pub fn write_register<I: InterfaceObject>(interface: &mut I, register: u8, value: u16) -> UsbResult<()> {
    let payload = encode_payload(register, value);
    let result = match interface.control_out(&REGISTER_WRITE, &payload) {
        Ok(written) if written == PAYLOAD_LEN => Ok(()),
        Ok(written) => Err(UsbError::ShortTransfer { expected: PAYLOAD_LEN, actual: written }),
        Err(e) => Err(e),
    };

    if let Err(e) = &result {
        error!(register, value, error = %e, "Register write failed");
        if *e == UsbError::PipeStalled
            && let Err(clear) = interface.clear_pipe_stall()
        {
            debug!(error = %clear, "Could not clear pipe stall");
        }
    }

    result
}
