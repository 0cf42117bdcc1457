//! Startup-configured settings shared by every component.
//!
//! A [`Settings`] value is built once in `main` from the command line and the
//! config file, then handed out by reference. Nothing mutates it afterwards.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::target::{CM6206, TargetIdentity};

/// How the process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Activate every present device once and exit
    #[default]
    OneShot,
    /// Keep running and react to attach, detach and wake events
    Persistent,
}

/// Fixed delays and retry bounds of the activation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Device open attempts before giving up
    pub open_attempts: u32,
    /// Pause between two device open attempts
    pub open_retry_delay: Duration,
    /// Pause between a device arriving and activating it
    pub settle_delay: Duration,
    /// Pause between wake-from-sleep and the re-activation pass
    pub wake_delay: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            open_attempts: 20,
            open_retry_delay: Duration::from_secs(1),
            settle_delay: Duration::from_secs(1),
            wake_delay: Duration::from_secs(1),
        }
    }
}

impl Timing {
    /// Timing without any pauses, for exercising the pipeline quickly.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            open_retry_delay: Duration::ZERO,
            settle_delay: Duration::ZERO,
            wake_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Check the values are usable.
    ///
    /// # Errors
    /// Returns an error if no open attempt would ever be made.
    pub fn validate(&self) -> Result<()> {
        if self.open_attempts == 0 {
            return Err(Error::InvalidSetting("open_attempts must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Process-wide settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Device to activate
    pub target: TargetIdentity,
    /// Emit non-essential diagnostics
    pub verbose: bool,
    /// One-shot or persistent
    pub mode: RunMode,
    /// Delays and retry bounds
    pub timing: Timing,
}

impl Settings {
    /// Build settings for the CM6206.
    ///
    /// # Errors
    /// Returns an error if `timing` is invalid.
    pub fn new(mode: RunMode, verbose: bool, timing: Timing) -> Result<Self> {
        timing.validate()?;
        Ok(Self { target: CM6206, verbose, mode, timing })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self { target: CM6206, verbose: true, mode: RunMode::OneShot, timing: Timing::default() }
    }
}
