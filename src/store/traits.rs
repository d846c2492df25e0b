//! Store trait definitions
//!
//! The user store is owned by the host system. These traits are the only
//! surface the batch engine and the role resolver see of it.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::persona::{Persona, PersonaId, RoleId};

/// Numeric user identifier.
pub type UserId = u64;

// ─────────────────────────────────────────────────────────────────
// User
// ─────────────────────────────────────────────────────────────────

/// A user account as far as personas are concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uid: UserId,

    pub name: String,

    /// Persona membership field
    #[serde(default)]
    pub personas: Vec<PersonaId>,

    /// Roles currently applied to the account
    #[serde(default)]
    pub roles: Vec<RoleId>,
}

impl User {
    pub fn new(uid: UserId, name: impl Into<String>) -> Self {
        Self {
            uid,
            name: name.into(),
            personas: Vec::new(),
            roles: Vec::new(),
        }
    }

    /// Builder: attach personas by id.
    pub fn with_personas<I, P>(mut self, personas: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PersonaId>,
    {
        self.personas.extend(personas.into_iter().map(Into::into));
        self
    }

    /// Whether the membership field contains `persona_id`.
    pub fn references(&self, persona_id: &str) -> bool {
        self.personas.iter().any(|p| p == persona_id)
    }
}

// ─────────────────────────────────────────────────────────────────
// Ports
// ─────────────────────────────────────────────────────────────────

/// Access to the host's user storage.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Ids of users whose persona field contains `persona_id`.
    ///
    /// Must be stable across calls on unchanged data and free of duplicates.
    async fn query_user_ids_by_persona(&self, persona_id: &str) -> Result<Vec<UserId>>;

    /// Load users by id. Ids that do not resolve are absent from the result.
    async fn load_users(&self, ids: &[UserId]) -> Result<BTreeMap<UserId, User>>;

    /// Persist a user, triggering whatever the store does on save.
    async fn save_user(&self, user: &User) -> Result<()>;
}

/// Read access to persona definitions.
pub trait PersonaLookup: Send + Sync {
    /// Resolve persona ids. Ids that do not resolve are skipped.
    fn load_personas(&self, ids: &[PersonaId]) -> Vec<Persona>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_references() {
        let user = User::new(1, "alice").with_personas(["editor", "author"]);
        assert!(user.references("editor"));
        assert!(!user.references("admin"));
    }

    #[test]
    fn test_user_json_defaults() {
        let user: User = serde_json::from_str(r#"{"uid": 3, "name": "carol"}"#).unwrap();
        assert!(user.personas.is_empty());
        assert!(user.roles.is_empty());
    }
}
