//! Filesystem operations
//!
//! Handles file and directory operations.

use std::path::Path;

use walkdir::WalkDir;

use crate::config::files::ARTIFACT_EXTENSIONS;
use crate::error::FilesystemError;

/// Create a directory and all parent directories
pub fn create_dir_all(path: &Path) -> Result<(), FilesystemError> {
    std::fs::create_dir_all(path).map_err(|e| FilesystemError::CreateDir {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Remove a directory and all its contents
pub fn remove_dir_all(path: &Path) -> Result<(), FilesystemError> {
    if path.exists() {
        std::fs::remove_dir_all(path).map_err(|e| FilesystemError::RemoveDir {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
    }
    Ok(())
}

/// Write content to a file
pub fn write_file(path: &Path, content: &str) -> Result<(), FilesystemError> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    std::fs::write(path, content).map_err(|e| FilesystemError::WriteFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Whether `path` names a built package artifact
pub fn is_artifact(path: &Path) -> bool {
    let name = path.to_string_lossy();
    ARTIFACT_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// Copy the tree under `from` into `to`
///
/// Symlinks and package artifacts are skipped. Existing files are
/// overwritten. Returns the number of files copied.
pub fn copy_tree(from: &Path, to: &Path) -> Result<usize, FilesystemError> {
    create_dir_all(to)?;
    let mut copied = 0;

    let walker = WalkDir::new(from).follow_links(false).min_depth(1);
    for entry in walker {
        let entry = entry.map_err(|e| FilesystemError::CopyFile {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            error: e.to_string(),
        })?;
        let file_type = entry.file_type();
        if file_type.is_symlink() || is_artifact(entry.path()) {
            continue;
        }

        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let target = to.join(relative);

        if file_type.is_dir() {
            create_dir_all(&target)?;
        } else {
            std::fs::copy(entry.path(), &target).map_err(|e| FilesystemError::CopyFile {
                from: entry.path().to_path_buf(),
                to: target.clone(),
                error: e.to_string(),
            })?;
            copied += 1;
        }
    }

    Ok(copied)
}
