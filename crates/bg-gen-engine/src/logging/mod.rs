//! Logging utilities.
//!
//! This module centralizes logger initialization. Every diagnostic of the
//! program goes through the `log` facade and ends up on stderr.

mod init;

pub use init::{init_logging, LoggingConfig};
