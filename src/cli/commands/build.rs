//! Build command implementation
//!
//! Implements `multipack build` to prepare a project and build its packages.

use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::commands::parse_target;
use crate::cli::output::{self, create_spinner, OutputConfig};
use crate::core::builder::{BuildOrchestrator, BuildReport};
use crate::core::config::BuildConfig;
use crate::core::global_config::GlobalConfig;
use crate::core::project::{self, Project};
use crate::error::MultipackError;
use crate::infra::dirs::MultipackDirs;
use crate::infra::host_packer::HostPacker;
use crate::infra::shell::ShellStageRunner;

/// Build options
#[derive(Debug, Default)]
pub struct BuildOptions {
    /// `distro[-release]`
    pub target: String,
    /// Build batches concurrently
    pub parallel: bool,
    /// Maximum concurrent builds
    pub jobs: Option<usize>,
    /// Remove source directories first
    pub clean: bool,
    /// Dry run
    pub no_build: bool,
    /// Skip make dependencies
    pub skip_make_deps: bool,
    /// Skip host sync and external runtime dependencies
    pub skip_sync_deps: bool,
    /// Remove build copies first
    pub zap: bool,
    /// First package
    pub from: Option<String>,
    /// Last package
    pub to: Option<String>,
    /// Cross-compilation target
    pub target_arch: Option<String>,
}

/// Assemble the run configuration: CLI flags over global defaults
pub fn build_config(options: &BuildOptions, global: &GlobalConfig) -> Result<BuildConfig> {
    let (distro, release) = parse_target(&options.target)?;
    let defaults = BuildConfig::from_global(distro, global);
    let (parallel, skip_make_deps, skip_sync_deps) = (
        options.parallel || defaults.parallel,
        options.skip_make_deps || defaults.skip_make_deps,
        options.skip_sync_deps || defaults.skip_sync_deps,
    );

    let mut config = defaults
        .with_release(release)
        .with_parallel(parallel)
        .with_clean_build(options.clean)
        .with_no_build(options.no_build)
        .with_skip_make_deps(skip_make_deps)
        .with_skip_sync_deps(skip_sync_deps)
        .with_zap(options.zap)
        .with_range(options.from.clone(), options.to.clone())
        .with_target_arch(options.target_arch.clone());

    if let Some(jobs) = options.jobs {
        config = config.with_jobs(jobs);
    }
    Ok(config)
}

/// Execute the build command
pub async fn execute(project_dir: &Path, options: BuildOptions) -> Result<()> {
    let dirs = MultipackDirs::new();
    let global = GlobalConfig::load(&dirs).with_context(|| "Failed to load global configuration")?;
    let mut config = build_config(&options, &global)?;

    let project = Project::load(project_dir).map_err(MultipackError::from)?;
    if project.is_single() && !config.range().is_unbounded() {
        output::warning("--from/--to are ignored for single-package projects");
        config = config.with_range(None, None);
    }

    tracing::info!(
        project = %project.name,
        distro = %config.distro,
        release = ?config.release,
        parallel = config.parallel,
        "build starting"
    );

    let packer = HostPacker::for_distro(&config.distro).map_err(MultipackError::from)?;

    let spinner = create_spinner("Preparing project...");
    let packages = project::prepare(&project, &config, &packer).await;
    spinner.finish_and_clear();
    let packages = packages?;

    let spinner = create_spinner(&format!("Building {} packages...", packages.len()));
    let orchestrator = BuildOrchestrator::new(
        ShellStageRunner::new(),
        packer,
        config,
        project.output.clone(),
        project.build_dir.clone(),
    );
    let report = orchestrator.run(&packages).await;
    spinner.finish_and_clear();
    let report = report?;

    print_report(&report, orchestrator.output())
}

fn print_report(report: &BuildReport, output_dir: &Path) -> Result<()> {
    if OutputConfig::current().json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    output::success("Build complete!");
    output::info(&format!("Packages processed: {}", report.processed.len()));
    if !report.packaged.is_empty() {
        output::info(&format!(
            "Packages built: {} ({})",
            report.packaged.len(),
            output_dir.display()
        ));
    }
    if !report.installed.is_empty() {
        output::info(&format!("Installed: {}", report.installed.join(", ")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::global_config::BuildDefaults;

    #[test]
    fn test_cli_flags_override_defaults() {
        let options = BuildOptions {
            target: "debian-bookworm".to_string(),
            jobs: Some(2),
            from: Some("a".to_string()),
            ..BuildOptions::default()
        };
        let global = GlobalConfig {
            build: BuildDefaults {
                parallel: Some(true),
                jobs: Some(8),
                ..BuildDefaults::default()
            },
        };

        let config = build_config(&options, &global).unwrap();
        assert_eq!(config.distro, "debian");
        assert_eq!(config.release.as_deref(), Some("bookworm"));
        assert!(config.parallel);
        assert_eq!(config.jobs, 2);
        assert_eq!(config.from_pkg.as_deref(), Some("a"));
    }

    #[test]
    fn test_unknown_target_is_rejected() {
        let options = BuildOptions {
            target: "templeos".to_string(),
            ..BuildOptions::default()
        };
        assert!(build_config(&options, &GlobalConfig::default()).is_err());
    }
}
