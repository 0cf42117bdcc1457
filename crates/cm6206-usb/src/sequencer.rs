//! The register writes that switch the CM6206 outputs on.

use cm6206_core::{ACTIVATION_SEQUENCE, ActivationOutcome, Settings};
use tracing::{error, info, warn};

use crate::backend::InterfaceObject;
use crate::writer::write_register;

/// Send the whole activation sequence through `interface`.
///
/// Every command is attempted exactly once, whatever happened to the ones
/// before it. The returned outcome has one entry per command.
pub fn activate<I: InterfaceObject>(interface: &mut I, settings: &Settings) -> ActivationOutcome {
    let total = ACTIVATION_SEQUENCE.len();
    let mut outcome = ActivationOutcome::new();

    for (step, command) in (1..).zip(ACTIVATION_SEQUENCE.iter()) {
        let succeeded = write_register(interface, command.register, command.value).is_ok();
        if succeeded {
            if settings.verbose {
                info!("  [{step}/{total}] {}: OK", command.label);
            }
        } else {
            error!("  [{step}/{total}] {}: FAILED", command.label);
        }
        outcome.record(command.register, succeeded);
    }

    if outcome.is_complete() {
        info!("{}", outcome.summary(settings.verbose));
    } else {
        warn!("{}", outcome.summary(settings.verbose));
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BusDevice, DeviceObject};
    use crate::error::UsbError;
    use crate::mock::{MockDevice, Script, new_log, writes};

    fn run(script: Script) -> (ActivationOutcome, Vec<(u8, u16)>) {
        let log = new_log();
        let device = MockDevice::with_script(1, script, &log);
        let mut object = device.create_object().expect("object");
        let mut interface = object.interface(1).expect("interface");
        let outcome = activate(&mut interface, &Settings::default());
        drop(interface);
        (outcome, writes(&log, 1))
    }

    #[test]
    fn test_all_commands_in_order() {
        let (outcome, writes) = run(Script::default());

        assert_eq!(writes, vec![(0x00, 0xa004), (0x01, 0x2000), (0x02, 0x8004)]);
        assert!(outcome.is_complete());
        assert_eq!(outcome.succeeded(), 3);
    }

    #[test]
    fn test_first_stall_does_not_block_the_rest() {
        let script = Script { control_errors: vec![Some(UsbError::PipeStalled)], ..Script::default() };
        let (outcome, writes) = run(script);

        assert_eq!(writes.len(), 3);
        assert_eq!(outcome.succeeded(), 2);
        assert_eq!(outcome.to_string(), "Only 2/3 commands succeeded");
        assert!(!outcome.results()[0].succeeded);
    }

    #[test]
    fn test_every_command_failing_still_attempts_all() {
        let script = Script {
            control_errors: vec![Some(UsbError::Timeout), Some(UsbError::NoDevice), Some(UsbError::Timeout)],
            ..Script::default()
        };
        let (outcome, writes) = run(script);

        assert_eq!(writes, vec![(0x00, 0xa004), (0x01, 0x2000), (0x02, 0x8004)]);
        assert_eq!(outcome.succeeded(), 0);
    }
}
