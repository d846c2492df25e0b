//! CLI integration tests
//!
//! Tests the command-line interface using assert_cmd

mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use common::SyncFixture;
use persona_sync::store::User;

/// The binary, isolated from any config in the caller's home or cwd
fn sync_cmd(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("persona-sync").unwrap();
    cmd.env_remove("PERSONA_SYNC_CONFIG")
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .current_dir(home.path());
    cmd
}

fn mixed_users() -> Vec<User> {
    let mut users = common::holders("editor", 3);
    users.push(User::new(10, "writer").with_personas(["author"]));
    users.push(User::new(11, "both").with_personas(["author", "editor"]));
    users
}

// ─────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_help_flag() {
    let home = TempDir::new().unwrap();
    sync_cmd(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("resync"))
        .stdout(predicate::str::contains("members"))
        .stdout(predicate::str::contains("persona"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_command() {
    let home = TempDir::new().unwrap();
    sync_cmd(&home)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("persona-sync"))
        .stdout(predicate::str::contains("Git Hash"));
}

#[test]
fn test_unknown_command() {
    let home = TempDir::new().unwrap();
    sync_cmd(&home)
        .arg("unknown-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

// ─────────────────────────────────────────────────────────────────
// Resync Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_resync_recomputes_roles_on_disk() {
    let fixture = SyncFixture::new(&mixed_users());

    fixture
        .cmd()
        .args(["resync", "editor", "--chunk-size", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Resync of persona 'editor' completed"))
        .stdout(predicate::str::contains("Saved:    4"))
        .stdout(predicate::str::contains("Chunks:   2/2"));

    let mut roles = fixture.user(1).roles;
    roles.sort();
    assert_eq!(roles, vec!["content_editor", "reviewer"]);

    let mut roles = fixture.user(11).roles;
    roles.sort();
    assert_eq!(roles, vec!["content_editor", "reviewer", "writer"]);

    // Not a holder, never re-saved
    assert!(fixture.user(10).roles.is_empty());
}

#[test]
fn test_resync_json_report() {
    let fixture = SyncFixture::new(&common::holders("editor", 5));

    let output = fixture
        .cmd()
        .args(["resync", "editor", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["persona_id"], "editor");
    assert_eq!(report["saved"], 5);
    assert_eq!(report["chunks"], 1);
    assert_eq!(report["failures"].as_array().unwrap().len(), 0);
}

#[test]
fn test_resync_uses_configured_chunk_size() {
    let fixture = SyncFixture::new(&common::holders("editor", 7));
    fixture.write_config("chunk_size = 3");

    fixture
        .cmd()
        .args(["resync", "editor"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Chunks:   3/3"));
}

#[test]
fn test_resync_dry_run_leaves_store_untouched() {
    let fixture = SyncFixture::new(&common::holders("editor", 5));

    fixture
        .cmd()
        .args(["resync", "editor", "--dry-run", "--chunk-size", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("5 user(s) in 3 chunk(s)"))
        .stdout(predicate::str::contains("chunk 3: 5"));

    assert!(fixture.read_users().iter().all(|u| u.roles.is_empty()));
}

#[test]
fn test_resync_without_holders() {
    let fixture = SyncFixture::new(&common::holders("author", 2));

    fixture
        .cmd()
        .args(["resync", "editor"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Users:    0"));
}

#[test]
fn test_resync_zero_chunk_size() {
    let fixture = SyncFixture::new(&common::holders("editor", 2));

    fixture
        .cmd()
        .args(["resync", "editor", "--chunk-size", "0"])
        .assert()
        .code(10)
        .stderr(predicate::str::contains("E102"));
}

#[test]
fn test_resync_unknown_persona() {
    let fixture = SyncFixture::new(&common::holders("editor", 2));

    fixture
        .cmd()
        .args(["resync", "ghost"])
        .assert()
        .code(60)
        .stderr(predicate::str::contains("ghost"));
}

#[test]
fn test_resync_missing_users_file() {
    let fixture = SyncFixture::new(&[]);
    std::fs::remove_file(&fixture.users_path).unwrap();

    fixture
        .cmd()
        .args(["resync", "editor"])
        .assert()
        .code(20);
}

#[test]
fn test_users_file_override_expands_tilde() {
    let fixture = SyncFixture::new(&common::holders("editor", 2));
    std::fs::create_dir(fixture.dir().join("elsewhere")).unwrap();
    std::fs::rename(&fixture.users_path, fixture.dir().join("elsewhere/users.json")).unwrap();

    fixture
        .cmd()
        .env("HOME", fixture.dir())
        .args(["--users-file", "~/elsewhere/users.json", "members", "editor"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1\tuser1"));
}

// ─────────────────────────────────────────────────────────────────
// Read-only Commands
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_members_lists_holders() {
    let fixture = SyncFixture::new(&mixed_users());

    fixture
        .cmd()
        .args(["members", "author"])
        .assert()
        .success()
        .stdout(predicate::str::contains("10\twriter"))
        .stdout(predicate::str::contains("11\tboth"))
        .stdout(predicate::str::contains("user1").not());
}

#[test]
fn test_roles_for_user() {
    let fixture = SyncFixture::new(&mixed_users());

    fixture
        .cmd()
        .args(["roles", "11"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Personas: author, editor"))
        .stdout(predicate::str::contains("- writer"))
        .stdout(predicate::str::contains("- content_editor"));
}

#[test]
fn test_roles_unknown_user() {
    let fixture = SyncFixture::new(&mixed_users());

    fixture.cmd().args(["roles", "404"]).assert().code(40);
}

#[test]
fn test_persona_list_ordered_by_label() {
    let fixture = SyncFixture::new(&[]);

    let output = fixture.cmd().args(["persona", "list"]).output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let ids: Vec<&str> = stdout
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .collect();
    assert_eq!(ids, vec!["auditor", "author", "editor"]);
}

#[test]
fn test_persona_show() {
    let fixture = SyncFixture::new(&[]);

    fixture
        .cmd()
        .args(["persona", "show", "editor"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Editor (editor)"))
        .stdout(predicate::str::contains("- reviewer"));
}

// ─────────────────────────────────────────────────────────────────
// Config Command Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_show_default() {
    let home = TempDir::new().unwrap();
    sync_cmd(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[batch]"))
        .stdout(predicate::str::contains("chunk_size = 20"))
        .stdout(predicate::str::contains("[storage]"))
        .stdout(predicate::str::contains("[logging]"));
}

#[test]
fn test_config_validate_nonexistent_file() {
    let home = TempDir::new().unwrap();
    sync_cmd(&home)
        .args(["config", "validate", "--config", "/nonexistent/path/config.toml"])
        .assert()
        .code(10)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_config_init_help() {
    let home = TempDir::new().unwrap();
    sync_cmd(&home)
        .args(["config", "init", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--path"))
        .stdout(predicate::str::contains("--force"));
}

// ─────────────────────────────────────────────────────────────────
// Verbosity Flag Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_verbose_resync_keeps_stdout_clean() {
    let fixture = SyncFixture::new(&common::holders("editor", 2));

    let output = fixture
        .cmd()
        .args(["-vv", "resync", "editor", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    // Logs go to stderr; stdout is only the report
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["saved"], 2);
}

#[test]
fn test_quiet_flag() {
    let fixture = SyncFixture::new(&common::holders("editor", 2));

    fixture
        .cmd()
        .args(["--quiet", "resync", "editor"])
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}
