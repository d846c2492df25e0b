//! Configuration system tests
//!
//! Tests configuration loading, validation, and environment overrides

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use persona_sync::batch::{DriverKind, FailurePolicy};
use persona_sync::config::{self, SyncConfig};

/// Test fixture for configuration testing
struct ConfigFixture {
    temp_dir: TempDir,
    config_path: PathBuf,
}

impl ConfigFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        Self {
            temp_dir,
            config_path,
        }
    }

    fn write_config(&self, content: &str) {
        fs::write(&self.config_path, content).unwrap();
    }

    fn path(&self) -> &str {
        self.config_path.to_str().unwrap()
    }

    /// The binary with HOME pointed at the fixture directory
    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("persona-sync").unwrap();
        cmd.env_remove("PERSONA_SYNC_CONFIG")
            .env("HOME", self.temp_dir.path())
            .env("XDG_CONFIG_HOME", self.temp_dir.path().join(".config"))
            .current_dir(self.temp_dir.path());
        cmd
    }

    fn validate(&self) -> assert_cmd::assert::Assert {
        self.cmd()
            .args(["config", "validate", "--config", self.path()])
            .assert()
    }
}

// ─────────────────────────────────────────────────────────────────
// Valid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_empty_config_uses_defaults() {
    let fixture = ConfigFixture::new();
    fixture.write_config("");

    fixture
        .validate()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));

    let config = SyncConfig::load(Some(fixture.path())).unwrap();
    assert_eq!(config.batch.chunk_size, 20);
    assert_eq!(config.batch.finish_url, "/admin/people/personas");
}

#[test]
fn test_full_config() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[batch]
chunk_size = 50
driver = "interactive"
failure_policy = "halt"
finish_url = "/people"

[storage]
users_file = "/srv/sync/users.json"
personas_file = "/srv/sync/personas.toml"

[logging]
level = "debug"
max_files = 3
json_format = true
"#,
    );

    fixture.validate().success();

    let config = SyncConfig::load(Some(fixture.path())).unwrap();
    assert_eq!(config.batch.chunk_size, 50);
    assert_eq!(config.batch.driver, DriverKind::Interactive);
    assert_eq!(config.batch.failure_policy, FailurePolicy::Halt);
    assert_eq!(config.batch.finish_url, "/people");
    assert_eq!(config.users_file(), PathBuf::from("/srv/sync/users.json"));
    assert_eq!(config.logging.max_files, 3);
    assert!(config.logging.json_format);
}

#[test]
fn test_config_show_custom() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[batch]\nchunk_size = 7\n");

    fixture
        .cmd()
        .args(["config", "show", "--config", fixture.path()])
        .assert()
        .success()
        .stdout(predicate::str::contains("chunk_size = 7"))
        .stdout(predicate::str::contains("failure_policy = \"continue\""));
}

// ─────────────────────────────────────────────────────────────────
// Invalid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_zero_chunk_size() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[batch]\nchunk_size = 0\n");

    fixture
        .validate()
        .code(10)
        .stderr(predicate::str::contains("E102"))
        .stderr(predicate::str::contains("positive integer"));
}

#[test]
fn test_finish_url_must_be_a_path() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[batch]\nfinish_url = \"admin/people\"\n");

    fixture
        .validate()
        .code(10)
        .stderr(predicate::str::contains("must be a path"));
}

#[test]
fn test_invalid_log_level() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[logging]\nlevel = \"chatty\"\n");

    fixture
        .validate()
        .code(10)
        .stderr(predicate::str::contains("Invalid log level"));
}

#[test]
fn test_unknown_driver() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[batch]\ndriver = \"web\"\n");

    fixture
        .validate()
        .code(10)
        .stderr(predicate::str::contains("E101"));
}

#[test]
fn test_malformed_toml() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[batch\nchunk_size = ");

    fixture
        .validate()
        .failure()
        .stderr(predicate::str::contains("Failed to parse configuration"));
}

// ─────────────────────────────────────────────────────────────────
// Config Init Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_config_init_creates_file() {
    let fixture = ConfigFixture::new();
    let target = fixture.temp_dir.path().join("nested").join("persona-sync.toml");

    fixture
        .cmd()
        .args(["config", "init", "--path", target.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration file created"));

    let content = fs::read_to_string(&target).unwrap();
    assert!(content.contains("[batch]"));
    assert!(content.contains("chunk_size = 20"));
}

#[test]
fn test_config_init_refuses_overwrite() {
    let fixture = ConfigFixture::new();
    fixture.write_config("# keep me\n");

    fixture
        .cmd()
        .args(["config", "init", "--path", fixture.path()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(fs::read_to_string(&fixture.config_path).unwrap(), "# keep me\n");
}

#[test]
fn test_config_init_force_overwrite() {
    let fixture = ConfigFixture::new();
    fixture.write_config("# old\n");

    fixture
        .cmd()
        .args(["config", "init", "--force", "--path", fixture.path()])
        .assert()
        .success();

    let content = fs::read_to_string(&fixture.config_path).unwrap();
    assert!(content.contains("failure_policy = \"continue\""));
}

#[test]
fn test_init_config_default_location_under_home() {
    let path = config::default_config_path();
    assert!(path.ends_with(".persona-sync/config.toml"));
}

// ─────────────────────────────────────────────────────────────────
// Environment Override Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_env_override_chunk_size() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[batch]\nchunk_size = 5\n");

    fixture
        .cmd()
        .env("PERSONA_SYNC_CHUNK_SIZE", "12")
        .env("PERSONA_SYNC_FAILURE_POLICY", "halt")
        .args(["config", "show", "--config", fixture.path()])
        .assert()
        .success()
        .stdout(predicate::str::contains("chunk_size = 12"))
        .stdout(predicate::str::contains("failure_policy = \"halt\""));
}

#[test]
fn test_env_override_is_validated() {
    let fixture = ConfigFixture::new();
    fixture.write_config("");

    fixture
        .cmd()
        .env("PERSONA_SYNC_CHUNK_SIZE", "0")
        .args(["config", "validate", "--config", fixture.path()])
        .assert()
        .code(10);
}

#[test]
fn test_config_path_from_env() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[batch]\nchunk_size = 9\n");

    fixture
        .cmd()
        .env("PERSONA_SYNC_CONFIG", fixture.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("chunk_size = 9"));
}

#[test]
fn test_config_discovered_in_working_directory() {
    let fixture = ConfigFixture::new();
    fs::write(
        fixture.temp_dir.path().join("persona-sync.toml"),
        "[batch]\nchunk_size = 33\n",
    )
    .unwrap();

    fixture
        .cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("chunk_size = 33"));
}

#[test]
fn test_tilde_expansion() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[storage]\nusers_file = \"~/data/users.json\"\n");

    let home = fixture.temp_dir.path().to_str().unwrap().to_string();
    fixture
        .cmd()
        .args(["config", "show", "--config", fixture.path()])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("{}/data/users.json", home)));
}
