//! Uninstall integration tests: files, sections and keys are removed only
//! as far as the package owns them

mod common;

use common::{TestWorkspace, for_platforms};
use opkg::OpkgError;
use opkg::index::WorkspaceIndex;
use opkg::operations::{UninstallOperation, UninstallOptions};

fn uninstall(workspace: &TestWorkspace, name: &str, dry_run: bool) -> opkg::index::uninstall::UninstallReport {
    let mut ws = workspace.open();
    UninstallOperation::new(&mut ws, UninstallOptions { dry_run })
        .execute(name)
        .expect("uninstall failed")
}

#[test]
fn test_uninstall_keeps_other_packages_keys() {
    let workspace = TestWorkspace::new();
    let a = workspace.write_package("a", &[("mcp.jsonc", r#"{"mcpServers":{"server1":{"command":"a"}}}"#)]);
    let b = workspace.write_package("b", &[("mcp.jsonc", r#"{"mcpServers":{"server2":{"command":"b"}}}"#)]);
    workspace.write_file(".opencode/opencode.json", r#"{"theme":"dark"}"#);
    workspace.install(&[&a, &b], for_platforms(&["opencode"]));

    let report = uninstall(&workspace, "a", false);

    assert_eq!(report.rewritten, vec![".opencode/opencode.json".to_string()]);
    let config = workspace.read_json(".opencode/opencode.json");
    assert!(config["mcp"].get("server1").is_none());
    assert_eq!(config["mcp"]["server2"]["command"], "b");
    assert_eq!(config["theme"], "dark");

    let index = WorkspaceIndex::load(&workspace.path).unwrap();
    assert!(index.get("a").is_none());
    assert!(index.get("b").is_some());
}

#[test]
fn test_uninstall_last_package_deletes_emptied_files() {
    let workspace = TestWorkspace::new();
    let package = workspace.write_package(
        "tools",
        &[
            ("commands/ops/deploy.md", "deploy"),
            ("AGENTS.md", "Be concise."),
            ("mcp.jsonc", r#"{"mcpServers":{"s":{"command":"x"}}}"#),
        ],
    );
    workspace.install(&[&package], for_platforms(&["claude"]));
    assert!(workspace.file_exists("CLAUDE.md"));
    assert!(workspace.file_exists(".mcp.json"));

    let report = uninstall(&workspace, "tools", false);

    assert!(!workspace.file_exists(".claude/commands/ops/deploy.md"));
    assert!(!workspace.file_exists(".claude/commands/ops"));
    assert!(!workspace.file_exists(".claude/commands"));
    assert!(workspace.file_exists(".claude"));
    assert!(!workspace.file_exists("CLAUDE.md"));
    assert!(!workspace.file_exists(".mcp.json"));
    assert_eq!(report.removed.len(), 3);
    assert!(report.pruned.contains(&".claude/commands".to_string()));
}

#[test]
fn test_uninstall_keeps_user_content_in_root_file() {
    let workspace = TestWorkspace::new();
    workspace.write_file("CLAUDE.md", "# My project\n");
    let package = workspace.write_package("tools", &[("AGENTS.md", "Be concise.")]);
    workspace.install(&[&package], for_platforms(&["claude"]));

    uninstall(&workspace, "tools", false);

    let content = workspace.read_file("CLAUDE.md");
    assert!(content.contains("# My project"));
    assert!(!content.contains("opkg:begin"));
}

#[test]
fn test_uninstall_leaves_file_taken_over_by_another_package() {
    let workspace = TestWorkspace::new();
    let a = workspace.write_package("a", &[("commands/deploy.md", "deploy from a"), ("commands/a.md", "a")]);
    let b = workspace.write_package("b", &[("commands/deploy.md", "deploy from b")]);
    workspace.install(&[&a, &b], for_platforms(&["claude"]));

    let report = uninstall(&workspace, "a", false);

    assert_eq!(report.removed, vec![".claude/commands/a.md".to_string()]);
    assert_eq!(workspace.read_file(".claude/commands/deploy.md"), "deploy from b");
}

#[test]
fn test_uninstall_dry_run_changes_nothing() {
    let workspace = TestWorkspace::new();
    let package = workspace.write_package("tools", &[("commands/review.md", "review")]);
    workspace.install(&[&package], for_platforms(&["claude"]));

    let report = uninstall(&workspace, "tools", true);

    assert_eq!(report.removed, vec![".claude/commands/review.md".to_string()]);
    assert!(workspace.file_exists(".claude/commands/review.md"));
    assert!(WorkspaceIndex::load(&workspace.path).unwrap().get("tools").is_some());
}

#[test]
fn test_uninstall_reports_missing_targets() {
    let workspace = TestWorkspace::new();
    let package = workspace.write_package("tools", &[("commands/review.md", "review")]);
    workspace.install(&[&package], for_platforms(&["claude"]));
    std::fs::remove_file(workspace.path.join(".claude/commands/review.md")).unwrap();

    let report = uninstall(&workspace, "tools", false);

    assert_eq!(report.missing, vec![".claude/commands/review.md".to_string()]);
    assert!(WorkspaceIndex::load(&workspace.path).unwrap().get("tools").is_none());
}

#[test]
fn test_uninstall_unknown_package() {
    let workspace = TestWorkspace::new();
    let mut ws = workspace.open();
    let err = UninstallOperation::new(&mut ws, UninstallOptions::default())
        .execute("nope")
        .unwrap_err();
    assert!(matches!(err, OpkgError::PackageNotInstalled { ref name } if name == "nope"));
}

#[test]
fn test_uninstall_leaves_unrelated_empty_dirs() {
    let workspace = TestWorkspace::new();
    let package = workspace.write_package("tools", &[("commands/review.md", "review")]);
    workspace.install(&[&package], for_platforms(&["claude"]));
    std::fs::create_dir_all(workspace.path.join(".claude/hooks")).unwrap();

    let report = uninstall(&workspace, "tools", false);

    assert_eq!(report.pruned, vec![".claude/commands".to_string()]);
    assert!(workspace.file_exists(".claude/hooks"));
}
