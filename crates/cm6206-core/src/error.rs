//! Error types for the CM6206 core.

use thiserror::Error;

/// Core error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid setting: {0}")]
    InvalidSetting(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
