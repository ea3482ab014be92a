//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod build;
pub mod order;
pub mod zap;

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Subcommand;

use crate::core::packer::KNOWN_DISTROS;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build every package of a project
    Build {
        /// Target distribution, optionally with a release (e.g. ubuntu-jammy)
        target: String,

        /// Project directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Build dependency batches concurrently
        #[arg(short, long)]
        parallel: bool,

        /// Maximum number of concurrent builds
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Remove source directories before building
        #[arg(short, long)]
        clean: bool,

        /// Prepare directories only; skip stages, packaging and installs
        #[arg(long)]
        no_build: bool,

        /// Do not install make dependencies
        #[arg(long)]
        skip_make_deps: bool,

        /// Do not refresh the host index or install external runtime dependencies
        #[arg(long)]
        skip_sync_deps: bool,

        /// Remove every package's build copy before building
        #[arg(long)]
        zap: bool,

        /// First package to build
        #[arg(long, value_name = "PACKAGE")]
        from: Option<String>,

        /// Last package to build
        #[arg(long, value_name = "PACKAGE")]
        to: Option<String>,

        /// Cross-compilation target architecture
        #[arg(long, value_name = "ARCH")]
        target_arch: Option<String>,
    },

    /// Show the build batches of a project
    Order {
        /// Project directory
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Remove build copies and sources of every package
    Zap {
        /// Target distribution, optionally with a release
        target: String,

        /// Project directory
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

impl Commands {
    /// Execute the command
    pub async fn run(self) -> Result<()> {
        match self {
            Self::Build {
                target,
                path,
                parallel,
                jobs,
                clean,
                no_build,
                skip_make_deps,
                skip_sync_deps,
                zap,
                from,
                to,
                target_arch,
            } => {
                let options = build::BuildOptions {
                    target,
                    parallel,
                    jobs,
                    clean,
                    no_build,
                    skip_make_deps,
                    skip_sync_deps,
                    zap,
                    from,
                    to,
                    target_arch,
                };
                build::execute(&path, options).await
            }
            Self::Order { path } => order::execute(&path),
            Self::Zap { target, path } => zap::execute(&path, &target),
        }
    }
}

/// Split `distro[-release]` into its parts
///
/// Distribution names may contain dashes (`opensuse-leap`), so the longest
/// known distribution prefix wins.
pub fn parse_target(target: &str) -> Result<(String, Option<String>)> {
    let distro = KNOWN_DISTROS
        .iter()
        .filter(|distro| {
            target == **distro
                || target
                    .strip_prefix(**distro)
                    .is_some_and(|rest| rest.starts_with('-'))
        })
        .max_by_key(|distro| distro.len());

    let Some(distro) = distro else {
        bail!(
            "Unknown distribution '{target}' (supported: {})",
            KNOWN_DISTROS.join(", ")
        );
    };

    let release = target
        .get(distro.len() + 1..)
        .filter(|release| !release.is_empty())
        .map(str::to_string);

    Ok(((*distro).to_string(), release))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_distro() {
        assert_eq!(parse_target("arch").unwrap(), ("arch".to_string(), None));
    }

    #[test]
    fn test_parse_distro_with_release() {
        assert_eq!(
            parse_target("ubuntu-jammy").unwrap(),
            ("ubuntu".to_string(), Some("jammy".to_string()))
        );
    }

    #[test]
    fn test_parse_dashed_distro() {
        assert_eq!(
            parse_target("opensuse-leap").unwrap(),
            ("opensuse-leap".to_string(), None)
        );
        assert_eq!(
            parse_target("opensuse-leap-15.6").unwrap(),
            ("opensuse-leap".to_string(), Some("15.6".to_string()))
        );
    }

    #[test]
    fn test_parse_unknown_distro() {
        assert!(parse_target("beos").is_err());
        assert!(parse_target("archlinux").is_err());
    }
}
