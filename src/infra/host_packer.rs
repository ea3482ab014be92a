//! Host packer
//!
//! [`Packer`] implementation that builds artifacts with the host's own
//! tooling (`dpkg-deb`, `rpmbuild`, `tar`) and installs them with the
//! host package manager.

use std::future::Future;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::defaults::DEFAULT_MAINTAINER;
use crate::config::files::STAGING_SUBDIR;
use crate::core::descriptor::{host_arch, DependencyRef, PackageDescriptor};
use crate::core::packer::{PackageFormat, Packer};
use crate::error::PackerError;
use crate::infra::filesystem;
use crate::infra::process::HostCommand;

/// Packer driving the host's package tools
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostPacker {
    format: PackageFormat,
}

impl HostPacker {
    /// Packer for `distro`
    pub fn for_distro(distro: &str) -> Result<Self, PackerError> {
        Ok(Self {
            format: PackageFormat::for_distro(distro)?,
        })
    }

    /// Packer for an explicit format
    pub fn new(format: PackageFormat) -> Self {
        Self { format }
    }

    /// Artifact format
    pub fn format(&self) -> PackageFormat {
        self.format
    }

    /// Staging tree for cross-compiled packages
    pub fn staging_dir(build_dir: &Path, target_arch: &str) -> PathBuf {
        build_dir.join(STAGING_SUBDIR).join(target_arch)
    }

    async fn package_deb(&self, package: &PackageDescriptor, artifact: &Path) -> Result<(), PackerError> {
        let root = &package.dirs.package_dir;
        let control = deb_control(package, &self.format.map_arch(&package.arch), installed_size(root));
        filesystem::write_file(&root.join("DEBIAN").join("control"), &control)?;

        HostCommand::new("dpkg-deb")
            .args(["--build", "--root-owner-group"])
            .arg(root)
            .arg(artifact)
            .run()
            .await?;
        Ok(())
    }

    async fn package_rpm(&self, package: &PackageDescriptor, output: &Path) -> Result<(), PackerError> {
        let root = &package.dirs.package_dir;
        let spec_path = package.dirs.start_dir.join(format!("{}.spec", package.name));
        let spec = rpm_spec(package, &self.format.map_arch(&package.arch), &list_files(root));
        filesystem::write_file(&spec_path, &spec)?;

        HostCommand::new("rpmbuild")
            .args(["-bb", "--noclean", "--buildroot"])
            .arg(root)
            .arg("--define")
            .arg(format!("_rpmdir {}", output.display()))
            .arg("--define")
            .arg("_build_name_fmt %%{NAME}-%%{VERSION}-%%{RELEASE}.%%{ARCH}.rpm")
            .arg(&spec_path)
            .run()
            .await?;
        Ok(())
    }

    async fn package_tarball(&self, package: &PackageDescriptor, artifact: &Path) -> Result<(), PackerError> {
        let root = &package.dirs.package_dir;
        let info = pkginfo(
            package,
            &self.format.map_arch(&package.arch),
            installed_size(root),
        );
        filesystem::write_file(&root.join(".PKGINFO"), &info)?;

        let compress = match self.format {
            PackageFormat::Pacman => "--zstd",
            _ => "--gzip",
        };
        HostCommand::new("tar")
            .args([compress, "-cf"])
            .arg(artifact)
            .arg("-C")
            .arg(root)
            .arg(".")
            .run()
            .await?;
        Ok(())
    }

    async fn extract(&self, artifact: &Path, staging: &Path) -> Result<(), PackerError> {
        filesystem::create_dir_all(staging)?;
        match self.format {
            PackageFormat::Deb => {
                HostCommand::new("dpkg-deb")
                    .arg("-x")
                    .arg(artifact)
                    .arg(staging)
                    .run()
                    .await?;
            }
            PackageFormat::Rpm => {
                HostCommand::new("sh")
                    .arg("-c")
                    .arg(format!("rpm2cpio '{}' | cpio -idm", artifact.display()))
                    .current_dir(staging)
                    .run()
                    .await?;
            }
            PackageFormat::Apk | PackageFormat::Pacman => {
                HostCommand::new("tar")
                    .arg("-xf")
                    .arg(artifact)
                    .arg("-C")
                    .arg(staging)
                    .run()
                    .await?;
            }
        }
        Ok(())
    }
}

impl Packer for HostPacker {
    fn build_package(
        &self,
        package: &PackageDescriptor,
        output: &Path,
    ) -> impl Future<Output = Result<PathBuf, PackerError>> + Send {
        async move {
            filesystem::create_dir_all(output)?;
            let artifact = self.format.artifact_path(package, output);

            tracing::info!(
                package = %package.name,
                version = %package.version,
                release = package.release,
                format = %self.format,
                "building resulting package"
            );

            match self.format {
                PackageFormat::Deb => self.package_deb(package, &artifact).await?,
                PackageFormat::Rpm => self.package_rpm(package, output).await?,
                PackageFormat::Apk | PackageFormat::Pacman => {
                    self.package_tarball(package, &artifact).await?;
                }
            }

            if let Err(e) = filesystem::remove_dir_all(&package.dirs.package_dir) {
                tracing::warn!(path = %package.dirs.package_dir.display(), error = %e, "failed to remove package directory");
            }
            Ok(artifact)
        }
    }

    fn install(
        &self,
        package: &PackageDescriptor,
        output: &Path,
    ) -> impl Future<Output = Result<(), PackerError>> + Send {
        let artifact = self.format.artifact_path(package, output);
        async move {
            HostCommand::new(self.format.install_command())
                .args(self.format.install_args())
                .arg(&artifact)
                .run()
                .await?;
            Ok(())
        }
    }

    fn install_or_extract(
        &self,
        package: &PackageDescriptor,
        output: &Path,
        build_dir: &Path,
        target_arch: &str,
    ) -> impl Future<Output = Result<(), PackerError>> + Send {
        async move {
            if target_arch == host_arch() {
                return self.install(package, output).await;
            }
            let artifact = self.format.artifact_path(package, output);
            let staging = Self::staging_dir(build_dir, target_arch);
            tracing::info!(
                package = %package.name,
                staging = %staging.display(),
                "extracting cross-compiled package"
            );
            self.extract(&artifact, &staging).await
        }
    }

    fn update(&self) -> impl Future<Output = Result<(), PackerError>> + Send {
        async move {
            let args = self.format.update_args();
            if args.is_empty() {
                return Ok(());
            }
            HostCommand::new(self.format.install_command())
                .args(args)
                .run()
                .await?;
            Ok(())
        }
    }

    fn prepare(&self, depends: &[String]) -> impl Future<Output = Result<(), PackerError>> + Send {
        let names: Vec<String> = depends
            .iter()
            .map(|dep| DependencyRef::parse(dep).name.to_string())
            .filter(|name| !name.is_empty())
            .collect();
        async move {
            if names.is_empty() {
                return Ok(());
            }
            HostCommand::new(self.format.install_command())
                .args(self.format.repo_install_args())
                .args(&names)
                .run()
                .await?;
            Ok(())
        }
    }
}

/// Files under `root`, as absolute paths inside the package
fn list_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| !entry.file_type().is_dir())
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(root)
                .ok()
                .map(|rel| format!("/{}", rel.display()))
        })
        .collect();
    files.sort();
    files
}

/// Total size of regular files under `root`, in KiB
fn installed_size(root: &Path) -> u64 {
    let bytes: u64 = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum();
    bytes.div_ceil(1024)
}

/// `DEBIAN/control` for `package`
pub fn deb_control(package: &PackageDescriptor, arch: &str, size_kib: u64) -> String {
    let mut control = format!(
        "Package: {}\nVersion: {}-{}\nArchitecture: {}\nMaintainer: {}\nInstalled-Size: {}\n",
        package.name, package.version, package.release, arch, DEFAULT_MAINTAINER, size_kib
    );
    let depends: Vec<String> = package
        .runtime_depends
        .iter()
        .map(|dep| DependencyRef::parse(dep))
        .filter(|dep| !dep.name.is_empty())
        .map(|dep| match dep.constraint {
            Some(constraint) => format!("{} ({})", dep.name, constraint),
            None => dep.name.to_string(),
        })
        .collect();
    if !depends.is_empty() {
        control.push_str(&format!("Depends: {}\n", depends.join(", ")));
    }
    let description = if package.description.is_empty() {
        &package.name
    } else {
        &package.description
    };
    control.push_str(&format!("Description: {description}\n"));
    control
}

/// `.PKGINFO` shared by apk and pacman
pub fn pkginfo(package: &PackageDescriptor, arch: &str, size_kib: u64) -> String {
    let mut info = format!(
        "pkgname = {}\npkgver = {}-{}\npkgdesc = {}\narch = {}\nsize = {}\npackager = {}\n",
        package.name,
        package.version,
        package.release,
        package.description,
        arch,
        size_kib * 1024,
        DEFAULT_MAINTAINER
    );
    for dep in package.runtime_depends.iter().map(|d| DependencyRef::parse(d)) {
        if dep.name.is_empty() {
            continue;
        }
        let constraint: String = dep.constraint.unwrap_or_default().split_whitespace().collect();
        info.push_str(&format!("depend = {}{}\n", dep.name, constraint));
    }
    info
}

/// Minimal binary-only spec file for `rpmbuild -bb`
pub fn rpm_spec(package: &PackageDescriptor, arch: &str, files: &[String]) -> String {
    let summary = if package.description.is_empty() {
        &package.name
    } else {
        &package.description
    };
    let mut spec = format!(
        "Name: {}\nVersion: {}\nRelease: {}\nSummary: {}\nLicense: Unknown\nBuildArch: {}\n",
        package.name, package.version, package.release, summary, arch
    );
    for dep in package.runtime_depends.iter().map(|d| DependencyRef::parse(d)) {
        if dep.name.is_empty() {
            continue;
        }
        match dep.constraint {
            Some(constraint) => spec.push_str(&format!("Requires: {} {}\n", dep.name, constraint)),
            None => spec.push_str(&format!("Requires: {}\n", dep.name)),
        }
    }
    spec.push_str(&format!("\n%description\n{summary}\n\n%files\n"));
    for file in files {
        spec.push_str(&format!("\"{file}\"\n"));
    }
    spec
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn package() -> PackageDescriptor {
        let mut pkg = PackageDescriptor::new("hello").with_depends(["libfoo >= 1.2", "zlib"]);
        pkg.version = "2.0".to_string();
        pkg.description = "Greets".to_string();
        pkg
    }

    #[test]
    fn test_deb_control() {
        let control = deb_control(&package(), "amd64", 12);
        assert!(control.contains("Package: hello\n"));
        assert!(control.contains("Version: 2.0-1\n"));
        assert!(control.contains("Architecture: amd64\n"));
        assert!(control.contains("Depends: libfoo (>= 1.2), zlib\n"));
        assert!(control.ends_with("Description: Greets\n"));
    }

    #[test]
    fn test_pkginfo_depends() {
        let info = pkginfo(&package(), "x86_64", 1);
        assert!(info.contains("pkgver = 2.0-1\n"));
        assert!(info.contains("size = 1024\n"));
        assert!(info.contains("depend = libfoo>=1.2\n"));
        assert!(info.contains("depend = zlib\n"));
    }

    #[test]
    fn test_rpm_spec_lists_files() {
        let files = vec!["/usr/bin/hello".to_string()];
        let spec = rpm_spec(&package(), "noarch", &files);
        assert!(spec.contains("BuildArch: noarch\n"));
        assert!(spec.contains("Requires: libfoo >= 1.2\n"));
        assert!(spec.contains("%files\n\"/usr/bin/hello\"\n"));
    }

    #[test]
    fn test_list_files_and_size() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("usr/bin")).unwrap();
        std::fs::write(dir.path().join("usr/bin/hello"), vec![0u8; 1500]).unwrap();

        assert_eq!(list_files(dir.path()), vec!["/usr/bin/hello"]);
        assert_eq!(installed_size(dir.path()), 2);
    }

    #[test]
    fn test_staging_dir() {
        let staging = HostPacker::staging_dir(Path::new("/build"), "aarch64");
        assert_eq!(staging, PathBuf::from("/build/staging/aarch64"));
    }

    #[tokio::test]
    async fn test_prepare_without_depends_is_noop() {
        let packer = HostPacker::new(PackageFormat::Deb);
        assert!(packer.prepare(&[String::new()]).await.is_ok());
    }

    #[tokio::test]
    async fn test_rpm_update_is_noop() {
        let packer = HostPacker::for_distro("fedora").unwrap();
        assert!(packer.update().await.is_ok());
    }
}
