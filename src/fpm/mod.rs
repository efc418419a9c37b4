//! php-fpm worker supervision.
//!
//! Covers listen-address resolution, rendering of the worker's ini config,
//! the process lifecycle, readiness probing, and output forwarding.

pub mod address;
pub mod ini;
pub mod output;
pub mod probe;
pub mod process;
