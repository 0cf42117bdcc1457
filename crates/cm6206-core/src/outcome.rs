//! Outcome of one activation pass.

use std::fmt;

/// Result of a single register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandResult {
    /// Register that was written
    pub register: u8,
    /// Whether the control transfer succeeded
    pub succeeded: bool,
}

/// Per-command results of one pass, in the order the commands were attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationOutcome {
    results: Vec<CommandResult>,
}

impl ActivationOutcome {
    /// Create an empty outcome.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the result of one command.
    pub fn record(&mut self, register: u8, succeeded: bool) {
        self.results.push(CommandResult { register, succeeded });
    }

    /// Number of commands that succeeded.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.succeeded).count()
    }

    /// Number of commands attempted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// True when every attempted command succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.results.is_empty() && self.succeeded() == self.total()
    }

    /// The recorded results.
    #[must_use]
    pub fn results(&self) -> &[CommandResult] {
        &self.results
    }

    /// One-line summary for the diagnostic stream.
    #[must_use]
    pub fn summary(&self, verbose: bool) -> String {
        match (self.is_complete(), verbose) {
            (true, true) => format!(
                "Successfully sent all CM6206 activation commands ({}/{})",
                self.succeeded(),
                self.total()
            ),
            (true, false) => "Successfully sent CM6206 activation commands".to_string(),
            (false, _) => self.to_string(),
        }
    }
}

impl fmt::Display for ActivationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_complete() {
            write!(f, "all {} commands succeeded", self.total())
        } else {
            write!(f, "Only {}/{} commands succeeded", self.succeeded(), self.total())
        }
    }
}
