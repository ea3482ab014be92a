//! Configuration and constants
//!
//! - [`defaults`] - Default values used when no configuration overrides them
//! - [`files`] - Well-known file and directory names

pub mod defaults;
pub mod files;
