//! Supervisor configuration parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::fpm::probe::ReadinessTiming;
use crate::{AppError, Result};

/// File name of the rendered worker config when none is configured.
pub const DEFAULT_CONFIG_FILE_NAME: &str = "php-fpm.conf";

/// Readiness probe timing, in milliseconds.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ReadinessConfig {
    /// Delay between connection attempts.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Ceiling for the worker to accept a connection.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    2
}

fn default_timeout_ms() -> u64 {
    4000
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl ReadinessConfig {
    /// Convert to probe timing.
    #[must_use]
    pub fn timing(&self) -> ReadinessTiming {
        ReadinessTiming {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

/// Supervisor configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SupervisorConfig {
    /// Path to the php-fpm executable.
    pub executable: PathBuf,
    /// Directory holding the pid file, error log, and default socket.
    pub data_dir: PathBuf,
    /// Where to write the rendered worker config.
    #[serde(default)]
    pub config_file: Option<PathBuf>,
    /// Listen specification overriding the data-dir socket.
    #[serde(default)]
    pub listen: Option<String>,
    /// Readiness probe timing.
    #[serde(default)]
    pub readiness: ReadinessConfig,
}

impl SupervisorConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Path of the rendered worker config.
    #[must_use]
    pub fn config_file_path(&self) -> PathBuf {
        self.config_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join(DEFAULT_CONFIG_FILE_NAME))
    }

    fn validate(&self) -> Result<()> {
        if self.executable.as_os_str().is_empty() {
            return Err(AppError::Config("executable must not be empty".into()));
        }

        if self.data_dir.as_os_str().is_empty() {
            return Err(AppError::Config("data_dir must not be empty".into()));
        }

        if self.listen.as_deref().is_some_and(str::is_empty) {
            return Err(AppError::Config("listen must not be empty when set".into()));
        }

        let readiness = &self.readiness;
        if readiness.poll_interval_ms == 0 || readiness.timeout_ms == 0 {
            return Err(AppError::Config(
                "readiness intervals must be greater than zero".into(),
            ));
        }

        if readiness.poll_interval_ms >= readiness.timeout_ms {
            return Err(AppError::Config(format!(
                "readiness poll_interval_ms ({}) must be shorter than timeout_ms ({})",
                readiness.poll_interval_ms, readiness.timeout_ms
            )));
        }

        Ok(())
    }
}
