//! Zap command implementation
//!
//! Implements `multipack zap` to deep-clean a project's build directories.

use std::path::Path;

use anyhow::Result;

use crate::cli::commands::parse_target;
use crate::cli::output;
use crate::core::config::BuildConfig;
use crate::core::project::Project;
use crate::error::MultipackError;

/// Execute the zap command
pub fn execute(project_dir: &Path, target: &str) -> Result<()> {
    let (distro, release) = parse_target(target)?;
    let config = BuildConfig::new(distro).with_release(release);

    let project = Project::load(project_dir).map_err(MultipackError::from)?;
    let packages = project.populate(&config)?;
    project
        .clean(&packages, true, true)
        .map_err(MultipackError::from)?;

    tracing::info!(project = %project.name, packages = packages.len(), "project zapped");
    output::success(&format!("Cleaned {} packages", packages.len()));
    Ok(())
}
