//! Output formatting and progress indicators
//!
//! This module provides utilities for displaying progress bars,
//! status messages and errors to the user.

use std::sync::OnceLock;

use indicatif::{ProgressBar, ProgressStyle};

use crate::error::{BuildError, MultipackError, RangeError, ResolverError};

static OUTPUT: OnceLock<OutputConfig> = OnceLock::new();

/// How much the CLI prints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputConfig {
    /// Only errors are printed
    pub quiet: bool,
    /// Results are printed as JSON
    pub json: bool,
    /// Verbosity level (`-v` count)
    pub verbose: u8,
}

impl OutputConfig {
    /// Create from the global CLI flags
    pub fn new(quiet: bool, json: bool, verbose: u8) -> Self {
        Self {
            quiet,
            json,
            verbose,
        }
    }

    /// Make this configuration visible to every command
    pub fn apply_global(self) {
        let _ = OUTPUT.set(self);
    }

    /// Configuration applied by [`Self::apply_global`], or the default
    pub fn current() -> Self {
        OUTPUT.get().copied().unwrap_or_default()
    }

    /// Default tracing directive for this verbosity
    pub fn log_directive(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }

    /// Whether human-readable progress should be drawn
    pub fn show_progress(&self) -> bool {
        !self.quiet && !self.json
    }
}

/// Print a success line unless quiet
pub fn success(message: &str) {
    if OutputConfig::current().show_progress() {
        println!("{} {message}", status::SUCCESS);
    }
}

/// Print an informational line unless quiet
pub fn info(message: &str) {
    if OutputConfig::current().show_progress() {
        println!("{} {message}", status::INFO);
    }
}

/// Print a warning to stderr unless quiet
pub fn warning(message: &str) {
    if !OutputConfig::current().quiet {
        eprintln!("{} {message}", status::WARNING);
    }
}

/// Print an error and its causes to stderr
pub fn display_error(error: &anyhow::Error) {
    eprintln!("{} Error: {error}", status::ERROR);
    for cause in error.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }
    if let Some(hint) = suggestion(error) {
        eprintln!("  hint: {hint}");
    }
}

/// Suggested fix for well-known failures
pub fn suggestion(error: &anyhow::Error) -> Option<&'static str> {
    for cause in error.chain() {
        if let Some(e) = cause.downcast_ref::<MultipackError>() {
            return match e {
                MultipackError::Range(RangeError::PackageNotFound { .. }) => {
                    Some("check the --from/--to names against the package names in package.toml")
                }
                MultipackError::Range(RangeError::InvalidOrder { .. }) => {
                    Some("--from must be declared before --to in multipack.json")
                }
                MultipackError::Resolver(ResolverError::CircularDependency { .. }) => {
                    Some("run 'multipack order' to inspect the dependency graph")
                }
                MultipackError::Build(BuildError::StageFailed { .. }) => {
                    Some("re-run with -vv to see the stage output")
                }
                MultipackError::Project(_) => {
                    Some("a project needs a multipack.json or a package.toml")
                }
                _ => None,
            };
        }
    }
    None
}

/// Create a spinner for operations with unknown duration
pub fn create_spinner(message: &str) -> ProgressBar {
    if !OutputConfig::current().show_progress() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.blue} {msg}")
            .expect("Invalid spinner template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";

    /// Info prefix (blue circle)
    pub const INFO: &str = "ℹ";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_directive() {
        assert_eq!(OutputConfig::new(false, false, 0).log_directive(), "warn");
        assert_eq!(OutputConfig::new(false, false, 1).log_directive(), "info");
        assert_eq!(OutputConfig::new(false, false, 3).log_directive(), "debug");
        assert_eq!(OutputConfig::new(true, false, 2).log_directive(), "error");
    }

    #[test]
    fn test_json_hides_progress() {
        assert!(!OutputConfig::new(false, true, 0).show_progress());
        assert!(OutputConfig::new(false, false, 0).show_progress());
    }

    #[test]
    fn test_suggestion_for_range_error() {
        let error = anyhow::Error::new(MultipackError::Range(RangeError::PackageNotFound {
            name: "x".to_string(),
        }));
        assert!(suggestion(&error).is_some_and(|hint| hint.contains("--from")));
    }
}
