//! Error types for multipack
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Project file errors
#[derive(Error, Debug)]
pub enum ProjectError {
    /// Neither a project file nor a package file was found
    #[error("No multipack.json or package.toml found in '{path}'")]
    NotFound { path: PathBuf },

    /// Project file could not be read
    #[error("Failed to read project file '{path}': {error}")]
    ReadError { path: PathBuf, error: String },

    /// Project file is not valid JSON
    #[error("Failed to parse project file '{path}': {error}")]
    ParseError { path: PathBuf, error: String },

    /// Project file failed validation
    #[error("Invalid project file: {message}")]
    Invalid { message: String },

    /// Two entries resolve to the same package name
    #[error("Package '{name}' is declared more than once")]
    DuplicatePackage { name: String },
}

/// Package descriptor errors
#[derive(Error, Debug)]
pub enum DescriptorError {
    /// Descriptor file missing
    #[error("Package file not found: {path}")]
    NotFound { path: PathBuf },

    /// Descriptor file could not be read
    #[error("Failed to read package file '{path}': {error}")]
    ReadError { path: PathBuf, error: String },

    /// Descriptor is not valid TOML
    #[error("Failed to parse package file '{path}': {error}")]
    ParseError { path: PathBuf, error: String },

    /// Invalid package name
    #[error("Invalid package name '{name}'")]
    InvalidName { name: String },

    /// Missing required field
    #[error("Package '{package}' is missing required field '{field}'")]
    MissingField { package: String, field: String },

    /// Host architecture is not listed by the package
    #[error("Package '{package}' does not support architecture '{arch}' (supported: {supported:?})")]
    UnsupportedArch {
        package: String,
        arch: String,
        supported: Vec<String>,
    },
}

/// Dependency resolution errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolverError {
    /// Circular dependency detected; lists `name(in-degree)` of every stuck package
    #[error("Circular dependency detected among: {}", remaining.join(", "))]
    CircularDependency { remaining: Vec<String> },
}

/// Range filter errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    /// Boundary package is not part of the project
    #[error("Package '{name}' not found in project")]
    PackageNotFound { name: String },

    /// `from` is declared after `to`
    #[error("Invalid package order: '{from}' should be built before '{to}'")]
    InvalidOrder { from: String, to: String },
}

/// Build errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A prepare/build/package stage failed
    #[error("Stage '{stage}' failed for package '{package}': {error}")]
    StageFailed {
        package: String,
        stage: String,
        error: String,
    },

    /// Artifact creation failed
    #[error("Packaging failed for package '{package}': {error}")]
    PackagingFailed { package: String, error: String },

    /// Installing (or extracting) the built artifact failed
    #[error("Install failed for package '{package}': {error}")]
    InstallFailed { package: String, error: String },

    /// A worker task aborted without reporting a result
    #[error("Build worker aborted: {error}")]
    WorkerAborted { error: String },
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to remove directory
    #[error("Failed to remove directory '{path}': {error}")]
    RemoveDir { path: PathBuf, error: String },

    /// Failed to write file
    #[error("Failed to write file '{path}': {error}")]
    WriteFile { path: PathBuf, error: String },

    /// Failed to copy file
    #[error("Failed to copy '{from}' to '{to}': {error}")]
    CopyFile {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },
}

/// External process errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    /// Program is not on PATH
    #[error("Command '{program}' not found in PATH")]
    NotFound { program: String },

    /// Program could not be spawned
    #[error("Failed to spawn '{program}': {error}")]
    SpawnFailed { program: String, error: String },

    /// Program exited unsuccessfully
    #[error("'{program}' exited with status {status}: {stderr}")]
    Failed {
        program: String,
        status: i32,
        stderr: String,
    },
}

/// Host packer errors
#[derive(Error, Debug)]
pub enum PackerError {
    /// Distribution has no known package format
    #[error("Unsupported distribution '{distro}'")]
    UnsupportedDistro { distro: String },

    /// Host tool failed
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// Metadata file could not be written
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// Top-level multipack error type
#[derive(Error, Debug)]
pub enum MultipackError {
    /// Project error
    #[error("Project error: {0}")]
    Project(#[from] ProjectError),

    /// Descriptor error
    #[error("Package error: {0}")]
    Descriptor(#[from] DescriptorError),

    /// Resolver error
    #[error("Resolver error: {0}")]
    Resolver(#[from] ResolverError),

    /// Range error
    #[error("Range error: {0}")]
    Range(#[from] RangeError),

    /// Build error
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Packer error
    #[error("Packer error: {0}")]
    Packer(#[from] PackerError),

    /// Filesystem error
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] FilesystemError),
}
