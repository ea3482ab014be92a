//! Multipack - dependency-aware multi-distribution package builder
//!
//! This library builds a set of interdependent packages into native
//! artifacts for several Linux distributions, either one by one in
//! declared order or batch by batch on a worker pool.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Dependency graph, scheduling and orchestration
//! - [`infra`] - Infrastructure layer (filesystem, processes, host tools)
//! - [`config`] - Configuration and constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;

#[cfg(test)]
pub mod test_utils;
