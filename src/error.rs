//! Error types for persona-sync
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - User-friendly messages with suggestions
//! - Exit codes for the CLI
//!
//! Setup errors (configuration, the initial membership query) are fail-fast.
//! Per-user save errors are collected by the batch run instead of propagated.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::store::UserId;

/// Result type alias for persona-sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoPermission = 202,
    IoNotFound = 203,
    Serialization = 204,

    // Query errors (3xx)
    QueryFailed = 300,

    // Persistence errors (4xx)
    PersistenceFailed = 400,
    UserNotFound = 401,

    // Persona errors (5xx)
    PersonaNotFound = 500,
    PersonaInvalid = 501,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI (maps to 1-125 range)
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10, // Config errors
            200..=299 => 20, // IO errors
            300..=399 => 30, // Query errors
            400..=499 => 40, // Persistence errors
            500..=599 => 60, // Persona errors
            900..=999 => 90, // Internal errors
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// Configuration validation error (includes a rejected chunk size)
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    /// Generic configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    /// File read error
    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File write error
    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Store Errors
    // ─────────────────────────────────────────────────────────────

    /// Looking up the users that hold a persona failed
    #[error("Failed to query users for persona '{persona_id}': {message}")]
    Query { persona_id: String, message: String },

    /// Saving a single user failed
    #[error("Failed to save user {uid}: {message}")]
    Persistence { uid: UserId, message: String },

    /// User does not exist in the store
    #[error("User not found: {uid}")]
    UserNotFound { uid: UserId },

    // ─────────────────────────────────────────────────────────────
    // Persona Errors
    // ─────────────────────────────────────────────────────────────

    /// Persona not found in the catalog
    #[error("Persona not found: {name}")]
    PersonaNotFound { name: String },

    /// Persona definition is malformed
    #[error("Invalid persona '{name}': {reason}")]
    PersonaInvalid { name: String, reason: String },

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    // ─────────────────────────────────────────────────────────────
    // Error Classification
    // ─────────────────────────────────────────────────────────────

    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,
            Error::Config(_) => ErrorCode::ConfigValidation,

            Error::IoRead { .. } => ErrorCode::IoRead,
            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
                _ => ErrorCode::IoRead,
            },
            Error::Toml(_) => ErrorCode::ConfigParseError,
            Error::Json(_) => ErrorCode::Serialization,

            Error::Query { .. } => ErrorCode::QueryFailed,
            Error::Persistence { .. } => ErrorCode::PersistenceFailed,
            Error::UserNotFound { .. } => ErrorCode::UserNotFound,

            Error::PersonaNotFound { .. } => ErrorCode::PersonaNotFound,
            Error::PersonaInvalid { .. } => ErrorCode::PersonaInvalid,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Check if the error is retryable
    ///
    /// A retried resync recomputes roles from scratch, so store failures are
    /// always safe to retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Query { .. }
                | Error::Persistence { .. }
                | Error::Io(_)
                | Error::IoRead { .. }
                | Error::IoWrite { .. }
        )
    }

    /// Check if the error is fatal (the command should exit)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ConfigNotFound { .. }
                | Error::ConfigParse { .. }
                | Error::ConfigValidation { .. }
                | Error::Config(_)
                | Error::Internal(_)
        )
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Friendly Messages
    // ─────────────────────────────────────────────────────────────

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'persona-sync config init' to create a default configuration file."
            ),
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'persona-sync config validate' to see details."
            ),
            Error::ConfigValidation { .. } => Some(
                "Review the configuration values. 'chunk_size' must be a positive integer."
            ),

            Error::Query { .. } => Some(
                "The user store could not be queried. No users were modified; rerun the resync once the store is reachable."
            ),
            Error::Persistence { .. } => Some(
                "Some users were not re-saved. Rerunning the resync for the same persona is safe."
            ),
            Error::UserNotFound { .. } => Some(
                "Check the user id. Run 'persona-sync members <persona>' to list users holding a persona."
            ),

            Error::PersonaNotFound { .. } => Some(
                "Run 'persona-sync persona list' to see the personas defined in the catalog."
            ),
            Error::PersonaInvalid { .. } => Some(
                "Persona ids may only contain lowercase letters, digits and underscores, and need a label."
            ),

            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let code = self.code();
        let suggestion = self.suggestion();

        let mut output = format!(
            "\x1b[31mError [{}]\x1b[0m: {}\n",
            code.as_str(),
            self
        );

        if let Some(hint) = suggestion {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        let code = self.code();
        format!("[{}] {}", code.as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors (for ergonomic error creation)
// ─────────────────────────────────────────────────────────────────

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Error::ConfigNotFound {
            path: path.into(),
            source: None,
        }
    }

    /// Create a config validation error
    pub fn config_validation(message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a config validation error with field name
    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a query error
    pub fn query(persona_id: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Query {
            persona_id: persona_id.into(),
            message: message.into(),
        }
    }

    /// Create a persistence error
    pub fn persistence(uid: UserId, message: impl Into<String>) -> Self {
        Error::Persistence {
            uid,
            message: message.into(),
        }
    }

    /// Create a persona not found error
    pub fn persona_not_found(name: impl Into<String>) -> Self {
        Error::PersonaNotFound { name: name.into() }
    }

    /// Create an invalid persona error
    pub fn persona_invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::PersonaInvalid {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
