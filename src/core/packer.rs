//! Package formats and the packer seam
//!
//! Each supported distribution maps to one [`PackageFormat`]. The format
//! knows how the host installs an artifact, how the artifact is named and
//! how architectures are spelled. The [`Packer`] trait is what the
//! orchestrator calls to produce and install artifacts.

use std::future::Future;
use std::path::{Path, PathBuf};

use crate::config::defaults::ARCH_ANY;
use crate::core::descriptor::PackageDescriptor;
use crate::error::PackerError;

/// Artifact format of a distribution family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageFormat {
    /// Debian and derivatives (`.deb`)
    Deb,
    /// Fedora, RHEL, openSUSE and derivatives (`.rpm`)
    Rpm,
    /// Alpine (`.apk`)
    Apk,
    /// Arch Linux (`.pkg.tar.zst`)
    Pacman,
}

/// Distributions accepted on the command line
pub const KNOWN_DISTROS: &[&str] = &[
    "almalinux",
    "alpine",
    "amzn",
    "arch",
    "centos",
    "debian",
    "fedora",
    "linuxmint",
    "ol",
    "opensuse-leap",
    "pop",
    "rhel",
    "rocky",
    "ubuntu",
];

impl PackageFormat {
    /// Format used by `distro`
    pub fn for_distro(distro: &str) -> Result<Self, PackerError> {
        match distro {
            "debian" | "ubuntu" | "linuxmint" | "pop" => Ok(Self::Deb),
            "fedora" | "rhel" | "centos" | "rocky" | "almalinux" | "amzn" | "ol"
            | "opensuse-leap" => Ok(Self::Rpm),
            "alpine" => Ok(Self::Apk),
            "arch" => Ok(Self::Pacman),
            _ => Err(PackerError::UnsupportedDistro {
                distro: distro.to_string(),
            }),
        }
    }

    /// Artifact file extension, including the leading dot
    pub fn extension(self) -> &'static str {
        match self {
            Self::Deb => ".deb",
            Self::Rpm => ".rpm",
            Self::Apk => ".apk",
            Self::Pacman => ".pkg.tar.zst",
        }
    }

    /// Host package manager binary
    pub fn install_command(self) -> &'static str {
        match self {
            Self::Deb => "apt-get",
            Self::Rpm => "dnf",
            Self::Apk => "apk",
            Self::Pacman => "pacman",
        }
    }

    /// Arguments to install a local artifact
    pub fn install_args(self) -> &'static [&'static str] {
        match self {
            Self::Deb => &["--allow-downgrades", "--assume-yes", "install"],
            Self::Rpm => &["-y", "install"],
            Self::Apk => &["add", "--allow-untrusted"],
            Self::Pacman => &["-U", "--noconfirm"],
        }
    }

    /// Arguments to install packages from the host repositories
    pub fn repo_install_args(self) -> &'static [&'static str] {
        match self {
            Self::Pacman => &["-S", "--noconfirm", "--needed"],
            other => other.install_args(),
        }
    }

    /// Arguments to refresh the package index; empty when not needed
    pub fn update_args(self) -> &'static [&'static str] {
        match self {
            Self::Deb | Self::Apk => &["update"],
            Self::Pacman => &["-Sy"],
            Self::Rpm => &[],
        }
    }

    /// Format spelling of a canonical architecture
    pub fn map_arch(self, arch: &str) -> String {
        let mapped = match (self, arch) {
            (Self::Deb, ARCH_ANY) => "all",
            (Self::Rpm, ARCH_ANY) => "noarch",
            (Self::Apk, ARCH_ANY) => "noarch",
            (Self::Deb, "x86_64") => "amd64",
            (Self::Deb, "i686") => "i386",
            (Self::Deb, "aarch64") => "arm64",
            (Self::Deb, "armv7h") => "armhf",
            (Self::Apk, "i686") => "x86",
            (Self::Apk, "armv7h") => "armv7",
            (Self::Rpm, "armv7h") => "armv7hl",
            _ => arch,
        };
        mapped.to_string()
    }

    /// Artifact file name for `package` built for `arch`
    pub fn artifact_name(self, package: &PackageDescriptor, arch: &str) -> String {
        let arch = self.map_arch(arch);
        let (name, version, release) = (&package.name, &package.version, package.release);
        match self {
            Self::Deb => format!("{name}_{version}-{release}_{arch}.deb"),
            Self::Rpm => format!("{name}-{version}-{release}.{arch}.rpm"),
            Self::Apk => format!("{name}-{version}-r{release}.apk"),
            Self::Pacman => format!("{name}-{version}-{release}-{arch}.pkg.tar.zst"),
        }
    }

    /// Path of the artifact for `package` inside `output`
    pub fn artifact_path(self, package: &PackageDescriptor, output: &Path) -> PathBuf {
        output.join(self.artifact_name(package, &package.arch))
    }
}

impl std::fmt::Display for PackageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deb => write!(f, "deb"),
            Self::Rpm => write!(f, "rpm"),
            Self::Apk => write!(f, "apk"),
            Self::Pacman => write!(f, "pacman"),
        }
    }
}

/// Produces and installs package artifacts on the build host
pub trait Packer: Send + Sync + 'static {
    /// Turn the populated package directory into an artifact in `output`
    fn build_package(
        &self,
        package: &PackageDescriptor,
        output: &Path,
    ) -> impl Future<Output = Result<PathBuf, PackerError>> + Send;

    /// Install the artifact previously written to `output`
    fn install(
        &self,
        package: &PackageDescriptor,
        output: &Path,
    ) -> impl Future<Output = Result<(), PackerError>> + Send;

    /// Install natively, or extract into the staging tree when cross-compiling
    fn install_or_extract(
        &self,
        package: &PackageDescriptor,
        output: &Path,
        build_dir: &Path,
        target_arch: &str,
    ) -> impl Future<Output = Result<(), PackerError>> + Send;

    /// Refresh the host package index
    fn update(&self) -> impl Future<Output = Result<(), PackerError>> + Send;

    /// Install `depends` from the host repositories
    fn prepare(&self, depends: &[String]) -> impl Future<Output = Result<(), PackerError>> + Send;
}
