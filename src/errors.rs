//! Error types shared across the crate.

use std::fmt::{Display, Formatter};

/// Shared result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Failure modes of configuring, launching, and stopping a worker.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// The worker process or one of its standard streams could not be created.
    Spawn(String),
    /// The worker did not accept a connection within the readiness ceiling.
    Timeout(String),
    /// Delivering the stop signal to the worker failed.
    Signal(String),
    /// Reaping the worker process failed.
    Wait(String),
    /// A lifecycle call was made without a live process handle.
    NotRunning(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Spawn(msg) => write!(f, "spawn: {msg}"),
            Self::Timeout(msg) => write!(f, "timeout: {msg}"),
            Self::Signal(msg) => write!(f, "signal: {msg}"),
            Self::Wait(msg) => write!(f, "wait: {msg}"),
            Self::NotRunning(msg) => write!(f, "not running: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
