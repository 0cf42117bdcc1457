//! Optional configuration file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use cm6206_core::Timing;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Configuration file contents.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Process settings
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// Activation pipeline delays
    #[serde(default)]
    pub timing: TimingConfig,
}

/// Process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Default log filter, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self { log_level: default_log_level() }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Delays in milliseconds, retry bounds in attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_open_attempts")]
    pub open_attempts: u32,
    #[serde(default = "default_delay_ms")]
    pub open_retry_ms: u64,
    #[serde(default = "default_delay_ms")]
    pub settle_ms: u64,
    #[serde(default = "default_delay_ms")]
    pub wake_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            open_attempts: default_open_attempts(),
            open_retry_ms: default_delay_ms(),
            settle_ms: default_delay_ms(),
            wake_delay_ms: default_delay_ms(),
        }
    }
}

fn default_open_attempts() -> u32 {
    20
}

fn default_delay_ms() -> u64 {
    1000
}

impl TimingConfig {
    /// Convert to the pipeline's timing values.
    #[must_use]
    pub fn to_timing(&self) -> Timing {
        Timing {
            open_attempts: self.open_attempts,
            open_retry_delay: Duration::from_millis(self.open_retry_ms),
            settle_delay: Duration::from_millis(self.settle_ms),
            wake_delay: Duration::from_millis(self.wake_delay_ms),
        }
    }
}

/// Where the configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults(PathBuf),
}

/// Load configuration from file or defaults.
///
/// Nothing is logged here since logging is configured from the result.
pub fn load_config() -> Result<(Config, ConfigSource)> {
    let config_path = config_path()?;
    match load_config_from(&config_path)? {
        Some(config) => Ok((config, ConfigSource::File(config_path))),
        None => Ok((Config::default(), ConfigSource::Defaults(config_path))),
    }
}

/// Read `path`, returning `None` if it does not exist.
pub fn load_config_from(path: &Path) -> Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {path:?}"))?;
    let config: Config =
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {path:?}"))?;
    Ok(Some(config))
}

/// Get the configuration file path.
fn config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "cm6206", "cm6206-enabler")
        .context("Could not determine config directory")?;
    Ok(dirs.config_dir().join("config.toml"))
}
