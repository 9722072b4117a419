use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// Default invocation with --dry-run requests 10 reports and touches nothing.
#[test]
fn test_default_count_dry_run() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("downloads");

    cargo_bin_cmd!("disclosure-archiver")
        .args(["--dry-run", "-o"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "[DRY RUN] Would request 10 report(s) from https://hackerone.com/graphql",
        ));

    assert!(!out.exists());
}

/// Positional count and base URL flow into the plan.
#[test]
fn test_custom_count_and_base_url_dry_run() {
    cargo_bin_cmd!("disclosure-archiver")
        .args(["3", "--base-url", "http://localhost:8080/", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "[DRY RUN] Would request 3 report(s) from http://localhost:8080/graphql",
        ));
}

/// Repeated --allow-content-type replaces the default set.
#[test]
fn test_allowed_content_types_override() {
    cargo_bin_cmd!("disclosure-archiver")
        .args([
            "--allow-content-type",
            "text/plain",
            "--allow-content-type",
            "text/markdown",
            "--dry-run",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("text/plain, text/markdown"))
        .stdout(predicate::str::contains("text/x-diff").not());
}

/// Zero is not a positive integer.
#[test]
fn test_zero_count_is_rejected() {
    cargo_bin_cmd!("disclosure-archiver")
        .args(["0", "--dry-run"])
        .assert()
        .failure();
}

#[test]
fn test_non_numeric_count_is_rejected() {
    cargo_bin_cmd!("disclosure-archiver")
        .args(["many", "--dry-run"])
        .assert()
        .failure();
}
