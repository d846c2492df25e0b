//! Common test utilities and fixtures
//!
//! Builders for users, a persona catalog and an on-disk workspace the
//! binary can be pointed at.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use tempfile::TempDir;

use persona_sync::persona::PersonaRegistry;
use persona_sync::store::User;

/// Catalog used across the integration tests
pub const CATALOG: &str = r#"
[[persona]]
id = "editor"
label = "Editor"
roles = ["content_editor", "reviewer"]

[[persona]]
id = "author"
label = "Author"
roles = ["writer", "reviewer"]

[[persona]]
id = "auditor"
label = "Auditor"
roles = ["read_only"]
"#;

pub fn registry() -> PersonaRegistry {
    PersonaRegistry::from_toml_str(CATALOG).unwrap()
}

/// Users `1..=n` holding only `persona`, with no roles applied yet.
pub fn holders(persona: &str, n: u64) -> Vec<User> {
    (1..=n)
        .map(|uid| User::new(uid, format!("user{}", uid)).with_personas([persona]))
        .collect()
}

/// Temp directory holding a catalog, a user file and a config that points at both
pub struct SyncFixture {
    temp_dir: TempDir,
    pub users_path: PathBuf,
    pub personas_path: PathBuf,
    pub config_path: PathBuf,
}

impl SyncFixture {
    pub fn new(users: &[User]) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let users_path = temp_dir.path().join("users.json");
        let personas_path = temp_dir.path().join("personas.toml");
        let config_path = temp_dir.path().join("persona-sync.toml");

        fs::write(&personas_path, CATALOG).unwrap();
        fs::write(&users_path, serde_json::to_string_pretty(users).unwrap()).unwrap();

        let fixture = Self {
            temp_dir,
            users_path,
            personas_path,
            config_path,
        };
        fixture.write_config("");
        fixture
    }

    /// Write the config file; `batch` is placed under the `[batch]` table.
    pub fn write_config(&self, batch: &str) {
        let content = format!(
            "[batch]\n{}\n\n[storage]\nusers_file = '{}'\npersonas_file = '{}'\n\n[logging]\nlevel = \"warn\"\n",
            batch,
            self.users_path.display(),
            self.personas_path.display(),
        );
        fs::write(&self.config_path, content).unwrap();
    }

    pub fn config(&self) -> &str {
        self.config_path.to_str().unwrap()
    }

    pub fn dir(&self) -> &std::path::Path {
        self.temp_dir.path()
    }

    /// Users as currently stored on disk.
    pub fn read_users(&self) -> Vec<User> {
        let content = fs::read_to_string(&self.users_path).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    pub fn user(&self, uid: u64) -> User {
        self.read_users()
            .into_iter()
            .find(|u| u.uid == uid)
            .unwrap()
    }

    /// The binary, pointed at this fixture's config.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("persona-sync").unwrap();
        cmd.env_remove("PERSONA_SYNC_CONFIG")
            .env_remove("RUST_LOG")
            .current_dir(self.dir())
            .arg("--config")
            .arg(self.config());
        cmd
    }
}
