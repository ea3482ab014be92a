//! Default configuration values

/// Default package release when a package file omits it
pub const DEFAULT_RELEASE: u32 = 1;

/// Architecture keyword meaning "builds on every host"
pub const ARCH_ANY: &str = "any";

/// Maintainer written into generated package metadata
pub const DEFAULT_MAINTAINER: &str = "multipack <multipack@localhost>";

/// Minimum proptest iterations
pub const MIN_PROPTEST_ITERATIONS: u32 = 100;
