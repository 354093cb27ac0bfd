//! Status and save integration tests: detecting workspace edits and
//! writing them back into the package

mod common;

use common::{TestWorkspace, for_platforms};
use opkg::index::save::{ChangeState, SaveOptions};
use opkg::operations::{SaveOperation, StatusOperation};

fn states(workspace: &TestWorkspace) -> Vec<(String, ChangeState)> {
    let ws = workspace.open();
    StatusOperation::new(&ws)
        .execute()
        .into_iter()
        .flat_map(|p| p.mappings)
        .map(|m| (m.target, m.state))
        .collect()
}

fn save(workspace: &TestWorkspace, name: &str, apply: bool) -> opkg::index::save::SaveReport {
    let ws = workspace.open();
    let options = SaveOptions {
        apply,
        ..SaveOptions::default()
    };
    SaveOperation::new(&ws, options).execute(name).expect("save failed")
}

fn tools_package(workspace: &TestWorkspace) -> std::path::PathBuf {
    workspace.write_package(
        "tools",
        &[
            ("commands/review.md", "# Review\n"),
            ("AGENTS.md", "Be concise."),
            ("mcp.jsonc", r#"{"mcpServers":{"s":{"command":"x"}}}"#),
        ],
    )
}

#[test]
fn test_fresh_install_is_clean() {
    let workspace = TestWorkspace::new();
    let package = tools_package(&workspace);
    workspace.install(&[&package], for_platforms(&["claude"]));

    let states = states(&workspace);
    assert_eq!(states.len(), 3);
    assert!(states.iter().all(|(_, state)| *state == ChangeState::Clean), "{states:?}");

    let report = save(&workspace, "tools", false);
    assert!(report.pending.is_empty());
}

#[test]
fn test_status_reports_modified_and_missing() {
    let workspace = TestWorkspace::new();
    let package = tools_package(&workspace);
    workspace.install(&[&package], for_platforms(&["claude"]));

    workspace.write_file(".claude/commands/review.md", "# Review\n\nEdited.\n");
    std::fs::remove_file(workspace.path.join(".mcp.json")).unwrap();

    let states = states(&workspace);
    let state_of = |target: &str| states.iter().find(|(t, _)| t == target).map(|(_, s)| *s);
    assert_eq!(state_of(".claude/commands/review.md"), Some(ChangeState::Modified));
    assert_eq!(state_of(".mcp.json"), Some(ChangeState::Missing));
    assert_eq!(state_of("CLAUDE.md"), Some(ChangeState::Clean));
}

#[test]
fn test_edits_outside_owned_keys_stay_clean() {
    let workspace = TestWorkspace::new();
    let package = tools_package(&workspace);
    workspace.install(&[&package], for_platforms(&["claude"]));

    let mut config = workspace.read_json(".mcp.json");
    config["mcpServers"]["mine"] = serde_json::json!({ "command": "hand-written" });
    workspace.write_file(".mcp.json", &config.to_string());
    let claude_md = workspace.read_file("CLAUDE.md");
    workspace.write_file("CLAUDE.md", &format!("# Notes\n\n{claude_md}"));

    assert!(save(&workspace, "tools", false).pending.is_empty());
}

#[test]
fn test_save_apply_writes_edits_back() {
    let workspace = TestWorkspace::new();
    let package = tools_package(&workspace);
    workspace.install(&[&package], for_platforms(&["claude"]));

    workspace.write_file(".claude/commands/review.md", "# Review\n\nCheck tests too.\n");
    let mut config = workspace.read_json(".mcp.json");
    config["mcpServers"]["s"]["command"] = serde_json::json!("y");
    workspace.write_file(".mcp.json", &config.to_string());

    let report = save(&workspace, "tools", true);

    assert_eq!(report.pending.len(), 2);
    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(
        std::fs::read_to_string(package.join("commands/review.md")).unwrap(),
        "# Review\n\nCheck tests too.\n"
    );
    let source: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(package.join("mcp.jsonc")).unwrap()).unwrap();
    assert_eq!(source["mcpServers"]["s"]["command"], "y");

    assert!(save(&workspace, "tools", false).pending.is_empty());
}

#[test]
fn test_save_apply_writes_section_back() {
    let workspace = TestWorkspace::new();
    let package = tools_package(&workspace);
    workspace.install(&[&package], for_platforms(&["claude"]));

    let edited = workspace.read_file("CLAUDE.md").replace("Be concise.", "Be concise and kind.");
    workspace.write_file("CLAUDE.md", &edited);

    let report = save(&workspace, "tools", true);

    assert_eq!(report.applied, vec!["AGENTS.md".to_string()]);
    let source = std::fs::read_to_string(package.join("AGENTS.md")).unwrap();
    assert_eq!(source.trim(), "Be concise and kind.");
}

#[test]
fn test_save_with_unknown_package_fails() {
    let workspace = TestWorkspace::new();
    let ws = workspace.open();
    assert!(SaveOperation::new(&ws, SaveOptions::default()).execute("nope").is_err());
}
