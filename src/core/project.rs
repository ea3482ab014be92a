//! Project loading and preparation
//!
//! A project is either a `multipack.json` listing package directories or
//! a single directory holding a `package.toml`. Preparation turns it into
//! the list of parsed descriptors the orchestrator consumes, with every
//! package copied into its build directory and host dependencies installed.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::files::{PACKAGE_FILE, PROJECT_FILE};
use crate::core::config::BuildConfig;
use crate::core::descriptor::{parse_descriptor, DependencyRef, PackageDescriptor};
use crate::core::packer::Packer;
use crate::error::{FilesystemError, MultipackError, ProjectError};
use crate::infra::filesystem;

/// On-disk `multipack.json` layout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    /// Project name
    pub name: String,
    /// Project description
    #[serde(default)]
    pub description: String,
    /// Where package working copies are created
    pub build_dir: String,
    /// Where artifacts are written
    pub output: String,
    /// Package directories, in build order
    pub projects: Vec<ProjectEntry>,
}

/// One package directory of a project
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectEntry {
    /// Directory name relative to the project root
    pub name: String,
    /// Install the package right after it is built
    #[serde(default)]
    pub install: bool,
}

impl ProjectFile {
    /// Parse project file content
    pub fn from_json(content: &str, path: &Path) -> Result<Self, ProjectError> {
        serde_json::from_str(content).map_err(|e| ProjectError::ParseError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Check required fields and entry names
    pub fn validate(&self) -> Result<(), ProjectError> {
        let required = [
            ("name", &self.name),
            ("buildDir", &self.build_dir),
            ("output", &self.output),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ProjectError::Invalid {
                    message: format!("'{field}' is required"),
                });
            }
        }
        if self.projects.is_empty() {
            return Err(ProjectError::Invalid {
                message: "'projects' must list at least one package".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for entry in &self.projects {
            if entry.name.trim().is_empty() {
                return Err(ProjectError::Invalid {
                    message: "project entry without a name".to_string(),
                });
            }
            if entry.name.starts_with('.') {
                return Err(ProjectError::Invalid {
                    message: format!("project entry '{}' must not start with '.'", entry.name),
                });
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(ProjectError::DuplicatePackage {
                    name: entry.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// A loaded project with resolved directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    /// Directory the project was loaded from
    pub root: PathBuf,
    /// Project name
    pub name: String,
    /// Project description
    pub description: String,
    /// Build directory (absolute or relative to the working directory)
    pub build_dir: PathBuf,
    /// Artifact directory
    pub output: PathBuf,
    /// Package entries in declared order
    pub entries: Vec<ProjectEntry>,
    single: bool,
}

impl Project {
    /// Load the project rooted at `root`
    ///
    /// `multipack.json` takes precedence; a bare `package.toml` makes a
    /// single-package project built in place.
    pub fn load(root: &Path) -> Result<Self, ProjectError> {
        let project_path = root.join(PROJECT_FILE);
        if project_path.is_file() {
            tracing::info!(path = %project_path.display(), "multi-package project found");
            let content =
                std::fs::read_to_string(&project_path).map_err(|e| ProjectError::ReadError {
                    path: project_path.clone(),
                    error: e.to_string(),
                })?;
            let file = ProjectFile::from_json(&content, &project_path)?;
            file.validate()?;
            return Ok(Self::from_file(root, file));
        }

        if root.join(PACKAGE_FILE).is_file() {
            tracing::info!(path = %root.display(), "single-package project found");
            return Ok(Self::single(root));
        }

        Err(ProjectError::NotFound {
            path: root.to_path_buf(),
        })
    }

    fn from_file(root: &Path, file: ProjectFile) -> Self {
        Self {
            root: root.to_path_buf(),
            build_dir: resolve(root, &file.build_dir),
            output: resolve(root, &file.output),
            name: file.name,
            description: file.description,
            entries: file.projects,
            single: false,
        }
    }

    fn single(root: &Path) -> Self {
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            root: root.to_path_buf(),
            name,
            description: String::new(),
            build_dir: root.to_path_buf(),
            output: root.to_path_buf(),
            entries: vec![ProjectEntry {
                name: String::new(),
                install: false,
            }],
            single: true,
        }
    }

    /// Whether this is a single-package project
    pub fn is_single(&self) -> bool {
        self.single
    }

    /// Parse every package file of the project
    ///
    /// The entry's `install` flag is merged into the descriptor and the
    /// cross-compilation target from `config` is recorded.
    pub fn populate(&self, config: &BuildConfig) -> Result<Vec<Arc<PackageDescriptor>>, MultipackError> {
        let mut names = HashSet::new();
        let mut packages = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            let (home, start_dir) = if self.single {
                (self.root.clone(), self.root.clone())
            } else {
                (self.root.join(&entry.name), self.build_dir.join(&entry.name))
            };

            let mut package =
                parse_descriptor(&config.distro, config.release.as_deref(), &start_dir, &home)?;
            package.must_install_after_build |= entry.install;
            package.target_arch = config.target_arch.clone();

            if !names.insert(package.name.clone()) {
                return Err(ProjectError::DuplicatePackage { name: package.name }.into());
            }
            packages.push(Arc::new(package));
        }

        Ok(packages)
    }

    /// Remove source directories (`clean_build`) and build copies (`zap`)
    ///
    /// Build copies of a single-package project are its own directory and
    /// are never removed.
    pub fn clean(
        &self,
        packages: &[Arc<PackageDescriptor>],
        clean_build: bool,
        zap: bool,
    ) -> Result<(), FilesystemError> {
        for package in packages {
            if clean_build {
                tracing::debug!(package = %package.name, "removing source directory");
                filesystem::remove_dir_all(&package.dirs.source_dir)?;
            }
            if zap && !self.single {
                tracing::debug!(package = %package.name, "removing build copy");
                filesystem::remove_dir_all(&package.dirs.start_dir)?;
            }
        }
        Ok(())
    }

    /// Copy every package home into its build copy
    pub fn copy_packages(&self, packages: &[Arc<PackageDescriptor>]) -> Result<(), FilesystemError> {
        for package in packages {
            filesystem::create_dir_all(&package.dirs.start_dir)?;
            filesystem::create_dir_all(&package.dirs.package_dir)?;
            if !self.single {
                let copied = filesystem::copy_tree(&package.dirs.home, &package.dirs.start_dir)?;
                tracing::debug!(package = %package.name, files = copied, "package copied");
            }
        }
        Ok(())
    }
}

fn resolve(root: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Every make dependency of the project, in declared order without repeats
pub fn make_depends(packages: &[Arc<PackageDescriptor>]) -> Vec<String> {
    let mut seen = HashSet::new();
    packages
        .iter()
        .flat_map(|p| p.build_dependency_names())
        .filter(|name| seen.insert(*name))
        .map(str::to_string)
        .collect()
}

/// Runtime dependencies not provided by the project itself
pub fn external_runtime_depends(packages: &[Arc<PackageDescriptor>]) -> Vec<String> {
    let internal: HashSet<&str> = packages.iter().map(|p| p.name.as_str()).collect();
    let mut seen = HashSet::new();
    packages
        .iter()
        .flat_map(|p| p.runtime_dependency_names())
        .filter(|name| !internal.contains(name) && seen.insert(*name))
        .map(str::to_string)
        .collect()
}

/// Whether `dependency` names a package of the project
pub fn is_internal(packages: &[Arc<PackageDescriptor>], dependency: &str) -> bool {
    let name = DependencyRef::parse(dependency).name;
    packages.iter().any(|p| p.name == name)
}

/// Load, clean, copy and install host dependencies for a build run
pub async fn prepare<P: Packer>(
    project: &Project,
    config: &BuildConfig,
    packer: &P,
) -> Result<Vec<Arc<PackageDescriptor>>, MultipackError> {
    filesystem::create_dir_all(&project.build_dir)?;

    if !config.skip_sync_deps {
        packer.update().await?;
    }

    let packages = project.populate(config)?;
    tracing::info!(project = %project.name, packages = packages.len(), "project loaded");

    if config.clean_build || config.zap {
        project.clean(&packages, config.clean_build, config.zap)?;
    }
    project.copy_packages(&packages)?;

    if !config.skip_make_deps {
        let depends = make_depends(&packages);
        // in-set make dependencies are installed by the orchestrator once built
        let depends: Vec<String> = depends
            .into_iter()
            .filter(|dep| !is_internal(&packages, dep))
            .collect();
        if !depends.is_empty() {
            tracing::info!(count = depends.len(), "installing make dependencies");
            packer.prepare(&depends).await?;
        }
    }

    if !config.skip_sync_deps {
        let depends = external_runtime_depends(&packages);
        if !depends.is_empty() {
            tracing::info!(count = depends.len(), dependencies = ?depends, "installing external runtime dependencies");
            packer.prepare(&depends).await?;
        }
    }

    Ok(packages)
}
