//! bg-gen: one window, one full-screen background.
//!
//! The three binaries differ only in the [`Variant`] they launch.

pub mod app;
pub mod config;

use std::process::ExitCode;

use bg_gen_engine::logging::{init_logging, LoggingConfig};

pub use config::{BackgroundConfig, Variant};

/// Runs `variant` to completion and maps the outcome to a process exit code.
pub fn launch(variant: Variant) -> ExitCode {
    init_logging(LoggingConfig::default());

    match app::run(BackgroundConfig::for_variant(variant)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
