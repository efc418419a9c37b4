#![forbid(unsafe_code)]

//! Supervise a single php-fpm worker: render its config, launch it in the
//! foreground, wait until it accepts connections, and stop it gracefully.

pub mod config;
pub mod errors;
pub mod fpm;

pub use config::SupervisorConfig;
pub use errors::{AppError, Result};
pub use fpm::process::{FpmProcess, ProcessState};
