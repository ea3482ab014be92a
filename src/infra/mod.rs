//! Infrastructure layer
//!
//! Handles all I/O operations: filesystem, external processes and the
//! host's package tools.

pub mod dirs;
pub mod filesystem;
pub mod host_packer;
pub mod process;
pub mod shell;
