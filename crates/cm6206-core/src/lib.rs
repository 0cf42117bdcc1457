//! CM6206 Enabler Core - domain model shared by the USB layer and the binary.
//!
//! This crate knows what has to be sent to the chip and how the outcome is
//! summarised, but performs no I/O itself.

pub mod error;
pub mod outcome;
pub mod register;
pub mod settings;
pub mod target;

pub use error::{Error, Result};
pub use outcome::{ActivationOutcome, CommandResult};
pub use register::{ACTIVATION_SEQUENCE, ControlSetup, RegisterCommand, encode_payload};
pub use settings::{RunMode, Settings, Timing};
pub use target::{CM6206, TargetIdentity};
