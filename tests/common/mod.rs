//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Test project context
///
/// Creates a temporary directory for test projects and provides
/// utilities for setting up test scenarios.
pub struct TestProject {
    /// Temporary directory for the test project
    pub dir: TempDir,
}

impl TestProject {
    /// Create a new test project in a temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Get the path to the test project directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Create a file in the test project
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Check if a file exists in the test project
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Write `multipack.json` listing `entries` as `(directory, install)`
    pub fn write_project(&self, entries: &[(&str, bool)]) {
        let projects: Vec<String> = entries
            .iter()
            .map(|(name, install)| format!(r#"{{"name": "{name}", "install": {install}}}"#))
            .collect();
        self.create_file(
            "multipack.json",
            &format!(
                r#"{{
  "name": "test-project",
  "description": "A test project",
  "buildDir": "build",
  "output": "output",
  "projects": [{}]
}}"#,
                projects.join(", ")
            ),
        );
    }

    /// Write `<dir>/package.toml`
    pub fn write_package(&self, dir: &str, name: &str, depends: &[&str], makedepends: &[&str]) {
        self.create_file(&format!("{dir}/package.toml"), &package_toml(name, depends, makedepends));
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a minimal `package.toml`
pub fn package_toml(name: &str, depends: &[&str], makedepends: &[&str]) -> String {
    let list = |items: &[&str]| {
        items
            .iter()
            .map(|item| format!("\"{item}\""))
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        r#"[package]
name = "{name}"
version = "1.0.0"
description = "Test package {name}"
arch = ["any"]
depends = [{}]
makedepends = [{}]

[stages]
build = "true"
"#,
        list(depends),
        list(makedepends)
    )
}

/// Run the multipack binary inside `project` with an isolated config dir
pub fn run_multipack(project: &TestProject, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_multipack"))
        .current_dir(project.path())
        .env("MULTIPACK_CONFIG_DIR", project.path().join(".config"))
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("Failed to execute multipack")
}

/// Sample three-package project: `app` needs `libfoo` at runtime and `tool` to build
pub fn sample_project() -> TestProject {
    let project = TestProject::new();
    project.write_project(&[("libfoo", false), ("tool", false), ("app", true)]);
    project.write_package("libfoo", "libfoo", &["zlib"], &[]);
    project.write_package("tool", "tool", &[], &[]);
    project.write_package("app", "app", &["libfoo >= 1.0"], &["tool"]);
    project
}
