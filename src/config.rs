//! Configuration system for persona-sync
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (PERSONA_SYNC_* prefix)
//! 3. Configuration file (TOML)
//! 4. Default values

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::batch::{DriverKind, FailurePolicy, DEFAULT_CHUNK_SIZE, DEFAULT_FINISH_URL};
use crate::error::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Batch resync settings
    pub batch: BatchSettings,

    /// User and persona data files
    pub storage: StorageSettings,

    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Batch resync settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Users saved per chunk operation
    pub chunk_size: usize,

    /// Execution strategy: headless or interactive
    pub driver: DriverKind,

    /// What to do after a chunk fails: continue or halt
    pub failure_policy: FailurePolicy,

    /// Where interactive runs redirect when finished
    pub finish_url: String,
}

/// Storage path settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// JSON array of user records
    pub users_file: String,

    /// TOML persona catalog
    pub personas_file: String,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Maximum log file size in MB before rotation
    pub max_file_size_mb: u64,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            driver: DriverKind::Headless,
            failure_policy: FailurePolicy::Continue,
            finish_url: DEFAULT_FINISH_URL.to_string(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            users_file: "~/.persona-sync/users.json".to_string(),
            personas_file: "~/.persona-sync/personas.toml".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_file_size_mb: 100,
            max_files: 5,
            json_format: false,
        }
    }
}

impl SyncConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = Self::find_config_file(config_path)? {
            debug!(path = %path.display(), "Loading configuration file");
            config = Self::from_file(&path)?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        config.apply_env_overrides();
        config.expand_paths();
        config.validate()?;

        Ok(config)
    }

    /// Parse a configuration file without overrides or validation.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse {
            message: format!("{}: {}", path.display(), e.message()),
            source: Some(e),
        })
    }

    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::config_not_found(path));
        }

        let search_paths = [
            PathBuf::from("persona-sync.toml"),
            dirs::config_dir()
                .map(|p| p.join("persona-sync").join("config.toml"))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|p| p.join(".persona-sync").join("config.toml"))
                .unwrap_or_default(),
        ];

        for path in &search_paths {
            if !path.as_os_str().is_empty() && path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Batch settings
        if let Ok(val) = std::env::var("PERSONA_SYNC_CHUNK_SIZE") {
            if let Ok(n) = val.parse() {
                self.batch.chunk_size = n;
            }
        }
        if let Ok(val) = std::env::var("PERSONA_SYNC_DRIVER") {
            if let Ok(kind) = val.parse() {
                self.batch.driver = kind;
            }
        }
        if let Ok(val) = std::env::var("PERSONA_SYNC_FAILURE_POLICY") {
            if let Ok(policy) = val.parse() {
                self.batch.failure_policy = policy;
            }
        }
        if let Ok(val) = std::env::var("PERSONA_SYNC_FINISH_URL") {
            self.batch.finish_url = val;
        }

        // Storage settings
        if let Ok(val) = std::env::var("PERSONA_SYNC_USERS_FILE") {
            self.storage.users_file = val;
        }
        if let Ok(val) = std::env::var("PERSONA_SYNC_PERSONAS_FILE") {
            self.storage.personas_file = val;
        }

        // Logging settings
        if let Ok(val) = std::env::var("PERSONA_SYNC_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("PERSONA_SYNC_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Ok(val) = std::env::var("PERSONA_SYNC_LOG_JSON") {
            self.logging.json_format = val.to_lowercase() == "true" || val == "1";
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        self.storage.users_file = expand_path(&self.storage.users_file);
        self.storage.personas_file = expand_path(&self.storage.personas_file);

        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.batch.chunk_size == 0 {
            return Err(Error::config_field_invalid(
                "batch.chunk_size",
                "Chunk size must be a positive integer",
            ));
        }

        if self.batch.finish_url.is_empty() {
            return Err(Error::config_field_invalid(
                "batch.finish_url",
                "Finish URL cannot be empty",
            ));
        }
        if !self.batch.finish_url.starts_with('/') {
            return Err(Error::config_field_invalid(
                "batch.finish_url",
                format!("Finish URL '{}' must be a path starting with /", self.batch.finish_url),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        Ok(())
    }

    /// Apply storage paths given on the command line, expanding them like file values.
    pub fn override_storage(&mut self, users_file: Option<&str>, personas_file: Option<&str>) {
        if let Some(path) = users_file {
            self.storage.users_file = expand_path(path);
        }
        if let Some(path) = personas_file {
            self.storage.personas_file = expand_path(path);
        }
    }

    pub fn users_file(&self) -> PathBuf {
        PathBuf::from(&self.storage.users_file)
    }

    pub fn personas_file(&self) -> PathBuf {
        PathBuf::from(&self.storage.personas_file)
    }
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Default location written by `config init`
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".persona-sync")
        .join("config.toml")
}

/// Initialize a new configuration file, returning where it was written.
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(default_config_path);

    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::IoWrite {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }

    fs::write(&config_path, generate_default_config()).map_err(|e| Error::IoWrite {
        path: config_path.clone(),
        source: e,
    })?;

    Ok(config_path)
}

/// Generate default configuration content with comments
pub fn generate_default_config() -> String {
    r#"# persona-sync configuration

[batch]
# Users saved per chunk operation
chunk_size = 20

# Execution strategy: "headless" runs every chunk in one call,
# "interactive" yields between chunks and redirects when done
driver = "headless"

# After a failed chunk: "continue" with the remaining chunks or "halt"
failure_policy = "continue"

# Listing view that interactive runs return to
finish_url = "/admin/people/personas"

[storage]
# JSON array of user records
users_file = "~/.persona-sync/users.json"

# Persona catalog ([[persona]] tables)
personas_file = "~/.persona-sync/personas.toml"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (comment out to disable file logging)
# file = "~/.persona-sync/logs/persona-sync.log"

# Maximum log file size in MB before rotation
max_file_size_mb = 100

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging
json_format = false
"#
    .to_string()
}
