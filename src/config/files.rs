//! Well-known file and directory names

/// Multi-package project file
pub const PROJECT_FILE: &str = "multipack.json";

/// Per-package descriptor file
pub const PACKAGE_FILE: &str = "package.toml";

/// Global configuration file inside the config directory
pub const GLOBAL_CONFIG_FILE: &str = "config.toml";

/// Source directory inside a package's start directory
pub const SOURCE_SUBDIR: &str = "src";

/// Package staging directory inside a package's start directory
pub const PACKAGE_SUBDIR: &str = "pkg";

/// Cross-compilation staging root inside the build directory
pub const STAGING_SUBDIR: &str = "staging";

/// Artifacts never copied from a package home into its build copy
pub const ARTIFACT_EXTENSIONS: &[&str] = &[".apk", ".deb", ".pkg.tar.zst", ".rpm"];
