//! Internal dependency classification
//!
//! Decides which packages must be installed on the build host as soon as
//! they are built. The classification is computed once per run over the
//! whole project, independent of range filtering and batch boundaries.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::core::descriptor::{DependencyRef, PackageDescriptor};

/// Names of packages that other packages of the project depend on
///
/// Runtime and build edges are tracked apart; both force an install.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InternalDependencies {
    runtime: HashSet<String>,
    build: HashSet<String>,
}

impl InternalDependencies {
    /// Classify over the full (unfiltered) project set
    pub fn from_descriptors<D: AsRef<PackageDescriptor>>(packages: &[D]) -> Self {
        let known: HashSet<&str> = packages.iter().map(|p| p.as_ref().name.as_str()).collect();
        let runtime = packages
            .iter()
            .flat_map(|p| p.as_ref().runtime_dependency_names())
            .filter(|name| known.contains(name))
            .map(str::to_string)
            .collect();
        let build = packages
            .iter()
            .flat_map(|p| p.as_ref().build_dependency_names())
            .filter(|name| known.contains(name))
            .map(str::to_string)
            .collect();
        Self { runtime, build }
    }

    /// Whether `name` is a runtime dependency of another package
    pub fn is_runtime_dependency(&self, name: &str) -> bool {
        self.runtime.contains(name)
    }

    /// Whether `name` is a build dependency of another package
    pub fn is_build_dependency(&self, name: &str) -> bool {
        self.build.contains(name)
    }

    /// Whether another package of the project depends on `name` at all
    pub fn is_internal_dependency(&self, name: &str) -> bool {
        self.is_runtime_dependency(name) || self.is_build_dependency(name)
    }

    /// Whether `package` has to be installed right after it is built
    pub fn needs_install(&self, package: &PackageDescriptor) -> bool {
        package.must_install_after_build || self.is_internal_dependency(&package.name)
    }

    /// Sorted names of every internal dependency
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .runtime
            .union(&self.build)
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }
}

/// Why a package is (or is not) installed after its build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallReason {
    /// Marked with `install = true`
    Explicit,
    /// Another package needs it at runtime
    RuntimeDependency,
    /// Another package needs it to build
    BuildDependency,
    /// Built only
    BuildOnly,
}

impl std::fmt::Display for InstallReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Explicit => write!(f, "installed after build (explicitly marked)"),
            Self::RuntimeDependency => write!(f, "installed after build (runtime dependency)"),
            Self::BuildDependency => write!(f, "installed after build (build dependency)"),
            Self::BuildOnly => write!(f, "build only"),
        }
    }
}

/// Dependency report for a single package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageAnalysis {
    /// Package name
    pub name: String,
    /// `name-version-release`
    pub full_version: String,
    /// Runtime dependencies provided by the project
    pub internal_runtime: Vec<String>,
    /// Runtime dependencies expected from the host
    pub external_runtime: Vec<String>,
    /// Build dependencies provided by the project
    pub internal_build: Vec<String>,
    /// Build dependencies expected from the host
    pub external_build: Vec<String>,
    /// Install decision
    pub install: InstallReason,
}

/// Split every package's dependencies into internal and external ones
pub fn analyze<D: AsRef<PackageDescriptor>>(
    packages: &[D],
    internal: &InternalDependencies,
) -> Vec<PackageAnalysis> {
    let known: BTreeSet<&str> = packages.iter().map(|p| p.as_ref().name.as_str()).collect();
    let split = |deps: &[String]| -> (Vec<String>, Vec<String>) {
        deps.iter()
            .filter(|dep| !DependencyRef::parse(dep).name.is_empty())
            .cloned()
            .partition(|dep| known.contains(DependencyRef::parse(dep).name))
    };

    packages
        .iter()
        .map(|pkg| {
            let pkg = pkg.as_ref();
            let (internal_runtime, external_runtime) = split(&pkg.runtime_depends);
            let (internal_build, external_build) = split(&pkg.build_depends);
            let install = if pkg.must_install_after_build {
                InstallReason::Explicit
            } else if internal.is_runtime_dependency(&pkg.name) {
                InstallReason::RuntimeDependency
            } else if internal.is_build_dependency(&pkg.name) {
                InstallReason::BuildDependency
            } else {
                InstallReason::BuildOnly
            };
            PackageAnalysis {
                name: pkg.name.clone(),
                full_version: pkg.full_version(),
                internal_runtime,
                external_runtime,
                internal_build,
                external_build,
                install,
            }
        })
        .collect()
}

/// Emit the dependency analysis at debug level
pub fn log_analysis(report: &[PackageAnalysis]) {
    tracing::debug!("dependency analysis starting");
    for entry in report {
        tracing::debug!(
            package = %entry.full_version,
            internal_runtime = ?entry.internal_runtime,
            external_runtime = ?entry.external_runtime,
            internal_build = ?entry.internal_build,
            external_build = ?entry.external_build,
            install = %entry.install,
        );
    }
    tracing::debug!("dependency analysis complete");
}
