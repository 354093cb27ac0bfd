//! CLI integration tests using the REAL opkg binary

mod common;

use common::TestWorkspace;
use predicates::prelude::*;

#[test]
fn test_help_output() {
    let workspace = TestWorkspace::new();
    workspace
        .cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("uninstall"))
        .stdout(predicate::str::contains("save"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn test_install_for_platform() {
    let workspace = TestWorkspace::new();
    let package = workspace.write_package("@acme/tools", &[("commands/review.md", "review")]);

    workspace
        .cmd()
        .arg("install")
        .arg(&package)
        .args(["--for", "claude"])
        .assert()
        .success()
        .stdout(predicate::str::contains("installed"))
        .stdout(predicate::str::contains("@acme/tools"))
        .stdout(predicate::str::contains("claude: 1 file processed, 1 written"));

    assert_eq!(workspace.read_file(".claude/commands/review.md"), "review");
    assert!(workspace.file_exists(".opkg/opkg.index.yaml"));
}

#[test]
fn test_install_dry_run() {
    let workspace = TestWorkspace::new();
    let package = workspace.write_package("tools", &[("commands/review.md", "review")]);

    workspace
        .cmd()
        .arg("install")
        .arg(&package)
        .args(["--for", "claude", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("would install"));

    assert!(!workspace.file_exists(".claude/commands/review.md"));
}

#[test]
fn test_install_unknown_platform_fails() {
    let workspace = TestWorkspace::new();
    let package = workspace.write_package("tools", &[("commands/review.md", "review")]);

    workspace
        .cmd()
        .arg("install")
        .arg(&package)
        .args(["--for", "vim"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Platform not supported: vim"));
}

#[test]
fn test_install_without_detected_platforms_fails() {
    let workspace = TestWorkspace::new();
    let package = workspace.write_package("tools", &[("commands/review.md", "review")]);

    workspace
        .cmd()
        .arg("install")
        .arg(&package)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No platforms detected"));
}

#[test]
fn test_install_partial_failure_exit_code() {
    let workspace = TestWorkspace::new();
    let broken = workspace.write_package("broken", &[("mcp.jsonc", "{ not json")]);
    let good = workspace.write_package("good", &[("commands/review.md", "review")]);

    workspace
        .cmd()
        .arg("install")
        .arg(&broken)
        .arg(&good)
        .args(["--for", "claude"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("failed"))
        .stdout(predicate::str::contains("mcp.jsonc"))
        .stderr(predicate::str::contains("1 of 2 package installs failed"));

    assert!(workspace.file_exists(".claude/commands/review.md"));
}

#[test]
fn test_status_empty_workspace() {
    let workspace = TestWorkspace::new();
    workspace
        .cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No packages installed."));
}

#[test]
fn test_status_and_save_after_edit() {
    let workspace = TestWorkspace::new();
    let package = workspace.write_package("tools", &[("commands/review.md", "review"), ("rules/style.md", "style")]);
    workspace
        .cmd()
        .arg("install")
        .arg(&package)
        .args(["--for", "claude"])
        .assert()
        .success();

    workspace
        .cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 clean target(s)"));

    workspace.write_file(".claude/commands/review.md", "review, edited");

    workspace
        .cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("modified"))
        .stdout(predicate::str::contains(".claude/commands/review.md"));

    workspace
        .cmd()
        .args(["save", "tools", "--apply"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 modified target(s)"))
        .stdout(predicate::str::contains("saved commands/review.md"));
    assert_eq!(
        std::fs::read_to_string(package.join("commands/review.md")).unwrap(),
        "review, edited"
    );

    workspace
        .cmd()
        .args(["save", "tools"])
        .assert()
        .success()
        .stdout(predicate::str::contains("has no workspace edits"));
}

#[test]
fn test_uninstall_removes_files() {
    let workspace = TestWorkspace::new();
    let package = workspace.write_package("tools", &[("commands/review.md", "review")]);
    workspace
        .cmd()
        .arg("install")
        .arg(&package)
        .args(["--for", "claude"])
        .assert()
        .success();

    workspace
        .cmd()
        .args(["uninstall", "tools"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Uninstalled"))
        .stdout(predicate::str::contains("removed .claude/commands/review.md"));

    assert!(!workspace.file_exists(".claude/commands/review.md"));
    workspace
        .cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No packages installed."));
}

#[test]
fn test_uninstall_unknown_package_fails() {
    let workspace = TestWorkspace::new();
    workspace
        .cmd()
        .args(["uninstall", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Package 'nope' is not installed"));
}

#[test]
fn test_workspace_flag() {
    let workspace = TestWorkspace::new();
    let package = workspace.write_package("tools", &[("commands/review.md", "review")]);

    workspace
        .cmd()
        .current_dir(workspace.temp.path())
        .arg("-w")
        .arg(&workspace.path)
        .arg("install")
        .arg(&package)
        .args(["--for", "cursor"])
        .assert()
        .success();

    assert!(workspace.file_exists(".cursor/commands/review.md"));
}
