//! Core business logic module
//!
//! # Submodules
//!
//! - [`descriptor`] - Package file parsing and descriptors
//! - [`project`] - Project loading and preparation
//! - [`resolver`] - Dependency graph, popularity and build batches
//! - [`classifier`] - Runtime dependency classification
//! - [`range`] - `--from`/`--to` package window
//! - [`builder`] - Build orchestration
//! - [`pool`] - Bounded worker pool
//! - [`stage`] - Build stages and the stage runner seam
//! - [`packer`] - Package formats and the packer seam
//! - [`config`] - Per-run build configuration
//! - [`global_config`] - Global configuration management

pub mod builder;
pub mod classifier;
pub mod config;
pub mod descriptor;
pub mod global_config;
pub mod packer;
pub mod pool;
pub mod project;
pub mod range;
pub mod resolver;
pub mod stage;
