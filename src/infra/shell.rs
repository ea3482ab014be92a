//! Shell stage runner
//!
//! Runs a package's stage scripts with bash inside its source directory.

use std::future::Future;

use crate::core::descriptor::PackageDescriptor;
use crate::core::stage::{BuildStage, StageRunner};
use crate::error::BuildError;
use crate::infra::filesystem;
use crate::infra::process::HostCommand;

/// Shell used for stage scripts
const SHELL: &str = "bash";

/// [`StageRunner`] backed by `bash -e -x -c`
#[derive(Debug, Clone, Default)]
pub struct ShellStageRunner;

impl ShellStageRunner {
    /// Create a runner
    pub fn new() -> Self {
        Self
    }

    fn init_dirs(package: &PackageDescriptor) -> Result<(), BuildError> {
        for dir in [&package.dirs.source_dir, &package.dirs.package_dir] {
            filesystem::create_dir_all(dir).map_err(|e| BuildError::StageFailed {
                package: package.name.clone(),
                stage: BuildStage::Prepare.to_string(),
                error: e.to_string(),
            })?;
        }
        Ok(())
    }

    async fn run_stage(package: &PackageDescriptor, stage: BuildStage) -> Result<(), BuildError> {
        let Some(script) = stage.script(package) else {
            return Ok(());
        };

        tracing::info!(package = %package.name, stage = %stage, "running stage");

        let dirs = &package.dirs;
        let mut command = HostCommand::new(SHELL)
            .args(["-e", "-x", "-c", script])
            .current_dir(&dirs.source_dir)
            .env("pkgname", &package.name)
            .env("pkgver", &package.version)
            .env("pkgrel", package.release.to_string())
            .env("srcdir", &dirs.source_dir)
            .env("pkgdir", &dirs.package_dir)
            .env("startdir", &dirs.start_dir);

        if package.is_cross_compiling() {
            if let Some(target) = package.target_arch.as_deref() {
                command = command.env("CARCH", target).env("TARGET_ARCH", target);
            }
        }

        command
            .run()
            .await
            .map(|_| ())
            .map_err(|e| BuildError::StageFailed {
                package: package.name.clone(),
                stage: stage.to_string(),
                error: e.to_string(),
            })
    }
}

impl StageRunner for ShellStageRunner {
    fn compile(
        &self,
        package: &PackageDescriptor,
        dry_run: bool,
    ) -> impl Future<Output = Result<(), BuildError>> + Send {
        async move {
            Self::init_dirs(package)?;
            if dry_run {
                tracing::debug!(package = %package.name, "dry run, stages skipped");
                return Ok(());
            }
            for stage in BuildStage::ALL {
                Self::run_stage(package, stage).await?;
            }
            Ok(())
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::descriptor::{PackageDirs, Stages};
    use std::path::Path;
    use tempfile::TempDir;

    fn package(root: &Path, stages: Stages) -> PackageDescriptor {
        let mut pkg = PackageDescriptor::new("hello");
        pkg.version = "1.2".to_string();
        pkg.dirs = PackageDirs::new("hello", root, &root.join("build"));
        pkg.stages = stages;
        pkg
    }

    #[tokio::test]
    async fn test_dry_run_only_creates_dirs() {
        let dir = TempDir::new().unwrap();
        let pkg = package(
            dir.path(),
            Stages {
                build: Some("touch should-not-exist".to_string()),
                ..Stages::default()
            },
        );

        ShellStageRunner::new().compile(&pkg, true).await.unwrap();

        assert!(pkg.dirs.source_dir.is_dir());
        assert!(pkg.dirs.package_dir.is_dir());
        assert!(!pkg.dirs.source_dir.join("should-not-exist").exists());
    }

    #[tokio::test]
    async fn test_stages_see_package_env() {
        if !crate::infra::process::is_available(SHELL) {
            return;
        }
        let dir = TempDir::new().unwrap();
        let pkg = package(
            dir.path(),
            Stages {
                build: Some("echo \"$pkgname-$pkgver\" > built".to_string()),
                package: Some("cp built \"$pkgdir/\"".to_string()),
                ..Stages::default()
            },
        );

        ShellStageRunner::new().compile(&pkg, false).await.unwrap();

        let content = std::fs::read_to_string(pkg.dirs.package_dir.join("built")).unwrap();
        assert_eq!(content.trim(), "hello-1.2");
    }

    #[tokio::test]
    async fn test_failing_stage_is_reported() {
        if !crate::infra::process::is_available(SHELL) {
            return;
        }
        let dir = TempDir::new().unwrap();
        let pkg = package(
            dir.path(),
            Stages {
                prepare: Some("exit 2".to_string()),
                ..Stages::default()
            },
        );

        let err = ShellStageRunner::new().compile(&pkg, false).await.unwrap_err();
        match err {
            BuildError::StageFailed { package, stage, .. } => {
                assert_eq!(package, "hello");
                assert_eq!(stage, "prepare");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
