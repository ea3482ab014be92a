//! Package descriptor handling
//!
//! Parses `package.toml` files into [`PackageDescriptor`] values and
//! provides the dependency-string parsing shared by the graph, the
//! classifier and the external dependency collection.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::defaults::{ARCH_ANY, DEFAULT_RELEASE};
use crate::config::files::{PACKAGE_FILE, PACKAGE_SUBDIR, SOURCE_SUBDIR};
use crate::error::DescriptorError;

/// A dependency entry split into its name and optional constraint
///
/// Only the leading whitespace-separated token is significant to the
/// scheduler; everything after it is carried as an opaque constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRef<'a> {
    /// Package name
    pub name: &'a str,
    /// Version constraint, if any (never enforced)
    pub constraint: Option<&'a str>,
}

impl<'a> DependencyRef<'a> {
    /// Parse a dependency string such as `"zlib"` or `"zlib >= 1.2"`.
    ///
    /// Never fails: a blank entry yields an empty name, which matches no package.
    pub fn parse(entry: &'a str) -> Self {
        let trimmed = entry.trim();
        match trimmed.split_once(char::is_whitespace) {
            Some((name, rest)) => {
                let rest = rest.trim();
                Self {
                    name,
                    constraint: (!rest.is_empty()).then_some(rest),
                }
            }
            None => Self {
                name: trimmed,
                constraint: None,
            },
        }
    }
}

/// Shell bodies for the three build stages
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stages {
    /// Runs first, inside the source directory
    #[serde(default)]
    pub prepare: Option<String>,
    /// Compiles the sources
    #[serde(default)]
    pub build: Option<String>,
    /// Populates the package directory
    #[serde(default)]
    pub package: Option<String>,
}

/// Filesystem locations used while building one package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageDirs {
    /// Directory the package definition was read from
    pub home: PathBuf,
    /// Working copy inside the build directory
    pub start_dir: PathBuf,
    /// Sources are fetched and built here
    pub source_dir: PathBuf,
    /// Files to be packaged are installed here
    pub package_dir: PathBuf,
}

impl PackageDirs {
    /// Derive the standard layout for `name` rooted at `start_dir`
    pub fn new(name: &str, home: &Path, start_dir: &Path) -> Self {
        Self {
            home: home.to_path_buf(),
            start_dir: start_dir.to_path_buf(),
            source_dir: start_dir.join(SOURCE_SUBDIR),
            package_dir: start_dir.join(PACKAGE_SUBDIR).join(name),
        }
    }
}

/// One package's metadata and dependency lists
///
/// Immutable once parsed, apart from the architecture fields which are
/// resolved once during population.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageDescriptor {
    /// Package name, unique within a run
    pub name: String,
    /// Upstream version (display only)
    pub version: String,
    /// Package release (display only)
    pub release: u32,
    /// Short description
    pub description: String,
    /// Runtime dependencies (`name` or `name <constraint>`)
    pub runtime_depends: Vec<String>,
    /// Build-time dependencies, same shape as `runtime_depends`
    pub build_depends: Vec<String>,
    /// Install this package as soon as it is built
    pub must_install_after_build: bool,
    /// Architecture the package builds for on this host
    pub arch: String,
    /// Cross-compilation target, when set
    pub target_arch: Option<String>,
    /// Target distribution
    pub distro: String,
    /// Target distribution release (codename)
    pub codename: Option<String>,
    /// Stage scripts
    pub stages: Stages,
    /// Build directories
    pub dirs: PackageDirs,
}

impl PackageDescriptor {
    /// Create a descriptor with only a name and version `0`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: "0".to_string(),
            release: DEFAULT_RELEASE,
            arch: ARCH_ANY.to_string(),
            ..Self::default()
        }
    }

    /// Set runtime dependencies
    #[must_use]
    pub fn with_depends<I, S>(mut self, depends: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.runtime_depends = depends.into_iter().map(Into::into).collect();
        self
    }

    /// Set build dependencies
    #[must_use]
    pub fn with_makedepends<I, S>(mut self, depends: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.build_depends = depends.into_iter().map(Into::into).collect();
        self
    }

    /// Request installation right after build
    #[must_use]
    pub fn install_after_build(mut self, install: bool) -> Self {
        self.must_install_after_build = install;
        self
    }

    /// Set the cross-compilation target
    #[must_use]
    pub fn with_target_arch(mut self, target_arch: Option<String>) -> Self {
        self.target_arch = target_arch;
        self
    }

    /// Names (leading tokens) of the runtime dependencies
    pub fn runtime_dependency_names(&self) -> impl Iterator<Item = &str> {
        self.runtime_depends
            .iter()
            .map(|dep| DependencyRef::parse(dep).name)
            .filter(|name| !name.is_empty())
    }

    /// Names (leading tokens) of the build dependencies
    pub fn build_dependency_names(&self) -> impl Iterator<Item = &str> {
        self.build_depends
            .iter()
            .map(|dep| DependencyRef::parse(dep).name)
            .filter(|name| !name.is_empty())
    }

    /// `name-version-release`
    pub fn full_version(&self) -> String {
        format!("{}-{}-{}", self.name, self.version, self.release)
    }

    /// Whether the build targets a foreign architecture
    pub fn is_cross_compiling(&self) -> bool {
        self.target_arch
            .as_deref()
            .is_some_and(|target| target != host_arch())
    }
}

impl AsRef<PackageDescriptor> for PackageDescriptor {
    fn as_ref(&self) -> &PackageDescriptor {
        self
    }
}

/// On-disk `package.toml` layout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageFile {
    /// Package metadata
    pub package: PackageSection,

    /// Stage scripts
    #[serde(default)]
    pub stages: Stages,
}

/// `[package]` table of `package.toml`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageSection {
    /// Package name
    pub name: String,

    /// Package version
    #[serde(default)]
    pub version: String,

    /// Package release
    #[serde(default = "default_release")]
    pub release: u32,

    /// Description
    #[serde(default)]
    pub description: String,

    /// Supported architectures (`any` for all)
    #[serde(default = "default_arch")]
    pub arch: Vec<String>,

    /// Runtime dependencies
    #[serde(default)]
    pub depends: Vec<String>,

    /// Build dependencies
    #[serde(default)]
    pub makedepends: Vec<String>,

    /// Install right after build
    #[serde(default)]
    pub install: bool,
}

fn default_release() -> u32 {
    DEFAULT_RELEASE
}

fn default_arch() -> Vec<String> {
    vec![ARCH_ANY.to_string()]
}

impl PackageFile {
    /// Parse package file content
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, DescriptorError> {
        toml::from_str(content).map_err(|e| DescriptorError::ParseError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Validate mandatory items
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if !is_valid_package_name(&self.package.name) {
            return Err(DescriptorError::InvalidName {
                name: self.package.name.clone(),
            });
        }
        if self.package.version.trim().is_empty() {
            return Err(DescriptorError::MissingField {
                package: self.package.name.clone(),
                field: "version".to_string(),
            });
        }
        Ok(())
    }
}

/// Check a package name against the naming rules shared by all formats
pub fn is_valid_package_name(name: &str) -> bool {
    static NAME_RE: OnceLock<Regex> = OnceLock::new();
    NAME_RE
        .get_or_init(|| Regex::new(r"^[a-z0-9@_+][a-z0-9@._+-]*$").expect("Invalid name pattern"))
        .is_match(name)
}

/// Host architecture in package-manager spelling
pub fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86" => "i686",
        "arm" => "armv7h",
        other => other,
    }
}

/// Resolve the architecture a package builds for on this host
pub fn compute_architecture(name: &str, supported: &[String]) -> Result<String, DescriptorError> {
    if supported.iter().any(|arch| arch == ARCH_ANY) {
        return Ok(ARCH_ANY.to_string());
    }
    let host = host_arch();
    if supported.iter().any(|arch| arch == host) {
        return Ok(host.to_string());
    }
    Err(DescriptorError::UnsupportedArch {
        package: name.to_string(),
        arch: host.to_string(),
        supported: supported.to_vec(),
    })
}

/// Parse the package definition found in `home`
///
/// `start_dir` is the working copy the package will be built in. The
/// returned descriptor has its architecture resolved.
pub fn parse_descriptor(
    distro: &str,
    release: Option<&str>,
    start_dir: &Path,
    home: &Path,
) -> Result<PackageDescriptor, DescriptorError> {
    let path = home.join(PACKAGE_FILE);
    if !path.is_file() {
        return Err(DescriptorError::NotFound { path });
    }
    let content = std::fs::read_to_string(&path).map_err(|e| DescriptorError::ReadError {
        path: path.clone(),
        error: e.to_string(),
    })?;

    let file = PackageFile::from_toml(&content, &path)?;
    file.validate()?;

    let arch = compute_architecture(&file.package.name, &file.package.arch)?;
    let dirs = PackageDirs::new(&file.package.name, home, start_dir);

    tracing::debug!(
        package = %file.package.name,
        version = %file.package.version,
        arch = %arch,
        "parsed package file"
    );

    Ok(PackageDescriptor {
        name: file.package.name,
        version: file.package.version,
        release: file.package.release,
        description: file.package.description,
        runtime_depends: file.package.depends,
        build_depends: file.package.makedepends,
        must_install_after_build: file.package.install,
        arch,
        target_arch: None,
        distro: distro.to_string(),
        codename: release.map(str::to_string),
        stages: file.stages,
        dirs,
    })
}
