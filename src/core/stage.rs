//! Build stages
//!
//! The [`StageRunner`] trait is the seam between the scheduler and
//! whatever executes a package's prepare/build/package scripts.

use std::future::Future;

use crate::core::descriptor::PackageDescriptor;
use crate::error::BuildError;

/// One of the three package stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildStage {
    /// Patch and configure sources
    Prepare,
    /// Compile
    Build,
    /// Install into the package directory
    Package,
}

impl BuildStage {
    /// All stages in execution order
    pub const ALL: [BuildStage; 3] = [Self::Prepare, Self::Build, Self::Package];

    /// Script body for this stage, if the package defines one
    pub fn script(self, package: &PackageDescriptor) -> Option<&str> {
        let script = match self {
            Self::Prepare => package.stages.prepare.as_deref(),
            Self::Build => package.stages.build.as_deref(),
            Self::Package => package.stages.package.as_deref(),
        };
        script.filter(|body| !body.trim().is_empty())
    }

    /// Stage name as shown to users
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::Build => "build",
            Self::Package => "package",
        }
    }
}

impl std::fmt::Display for BuildStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Executes a package's stages
///
/// With `dry_run` set only the working directories are prepared; no stage
/// script runs. Failures are reported as [`BuildError::StageFailed`].
pub trait StageRunner: Send + Sync + 'static {
    /// Run prepare, build and package for `package`
    fn compile(
        &self,
        package: &PackageDescriptor,
        dry_run: bool,
    ) -> impl Future<Output = Result<(), BuildError>> + Send;
}
