//! bg-gen engine crate.
//!
//! This crate owns the platform + GPU runtime pieces and the background
//! renderer shared by the `bg-gen` binaries.

pub mod core;
pub mod coords;
pub mod device;
pub mod logging;
pub mod render;
pub mod window;
