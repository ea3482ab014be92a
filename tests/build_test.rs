//! Integration tests for `multipack build` and `multipack zap`
//!
//! All runs use `--no-build --skip-sync-deps --skip-make-deps` so nothing
//! touches the host package manager.

mod common;

use common::{package_toml, run_multipack, sample_project, TestProject};
use predicates::prelude::*;

const DRY_RUN: &[&str] = &["--no-build", "--skip-sync-deps", "--skip-make-deps"];

fn build(project: &TestProject, extra: &[&str]) -> std::process::Output {
    let mut args = vec!["build", "arch", "."];
    args.extend_from_slice(DRY_RUN);
    args.extend_from_slice(extra);
    run_multipack(project, &args)
}

fn report(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("build --json prints a JSON report")
}

#[test]
fn test_dry_run_prepares_build_copies() {
    let project = sample_project();
    project.create_file("libfoo/old-1.0-1-any.pkg.tar.zst", "stale artifact");

    let output = build(&project, &[]);
    assert!(
        output.status.success(),
        "build failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(predicate::str::contains("Build complete").eval(&stdout));
    assert!(predicate::str::contains("Packages processed: 3").eval(&stdout));

    assert!(project.file_exists("build/libfoo/package.toml"));
    assert!(project.file_exists("build/libfoo/src"));
    assert!(project.file_exists("build/app/pkg/app"));
    assert!(!project.file_exists("build/libfoo/old-1.0-1-any.pkg.tar.zst"));
}

#[test]
fn test_sequential_json_report_keeps_declared_order() {
    let project = sample_project();

    let output = build(&project, &["--json"]);
    assert!(output.status.success());

    let report = report(&output);
    assert_eq!(report["processed"], serde_json::json!(["libfoo", "tool", "app"]));
    assert_eq!(report["packaged"], serde_json::json!([]));
    assert_eq!(report["batches"], serde_json::json!([]));
}

#[test]
fn test_parallel_json_report_has_batches() {
    let project = sample_project();

    let output = build(&project, &["--parallel", "--jobs", "2", "--json"]);
    assert!(
        output.status.success(),
        "build failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report = report(&output);
    let batches = report["batches"].as_array().unwrap();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0]["packages"], serde_json::json!(["libfoo", "tool"]));
    assert_eq!(batches[1]["packages"], serde_json::json!(["app"]));
    assert_eq!(report["processed"].as_array().unwrap().len(), 3);
}

#[test]
fn test_range_limits_processed_packages() {
    let project = sample_project();

    let output = build(&project, &["--from", "tool", "--to", "app", "--json"]);
    assert!(output.status.success());
    assert_eq!(report(&output)["processed"], serde_json::json!(["tool", "app"]));
}

#[test]
fn test_unknown_range_package_fails_before_building() {
    let project = sample_project();

    let output = build(&project, &["--from", "ghost"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("'ghost' not found"), "stderr: {stderr}");
    assert!(!project.file_exists("build/libfoo/src"));
}

#[test]
fn test_reversed_range_fails() {
    let project = sample_project();

    let output = build(&project, &["--from", "app", "--to", "libfoo"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid package order"));
}

#[test]
fn test_unknown_distribution_fails() {
    let project = sample_project();

    let output = run_multipack(&project, &["build", "beos", ".", "--no-build"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown distribution"));
}

#[test]
fn test_missing_project_file_fails() {
    let project = TestProject::new();

    let output = build(&project, &[]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No multipack.json or package.toml"));
}

#[test]
fn test_invalid_package_name_fails() {
    let project = TestProject::new();
    project.write_project(&[("bad", false)]);
    project.write_package("bad", "Bad_Name", &[], &[]);

    let output = build(&project, &[]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid package name"));
}

#[test]
fn test_single_package_project_builds_in_place() {
    let project = TestProject::new();
    project.create_file("package.toml", &package_toml("solo", &[], &[]));

    let output = build(&project, &["--json"]);
    assert!(output.status.success());
    assert_eq!(report(&output)["processed"], serde_json::json!(["solo"]));
    assert!(project.file_exists("src"));
    assert!(project.file_exists("pkg/solo"));
    assert!(!project.file_exists("build"));
}

#[test]
fn test_zap_removes_build_copies() {
    let project = sample_project();
    assert!(build(&project, &[]).status.success());
    assert!(project.file_exists("build/app"));

    let output = run_multipack(&project, &["zap", "arch", "."]);
    assert!(
        output.status.success(),
        "zap failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(!project.file_exists("build/app"));
    assert!(!project.file_exists("build/libfoo"));
    assert!(project.file_exists("app/package.toml"));
}

#[test]
fn test_global_config_enables_parallel_mode() {
    let project = sample_project();
    project.create_file(".config/config.toml", "[build]\nparallel = true\n");

    let output = build(&project, &["--json"]);
    assert!(output.status.success());
    assert_eq!(report(&output)["batches"].as_array().unwrap().len(), 2);
}
