//! Core types for the persona system.
//!
//! A persona is a named bundle of role identifiers. Users reference personas,
//! and the roles a user holds are derived from the personas they reference.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Machine name of a persona (e.g. `editor`).
pub type PersonaId = String;

/// Machine name of a role native to the host user system (e.g. `content_editor`).
pub type RoleId = String;

/// Roles every account holds implicitly. Personas may not grant them.
pub const RESERVED_ROLES: &[&str] = &["anonymous", "authenticated"];

// ─────────────────────────────────────────────────────────────────
// Persona
// ─────────────────────────────────────────────────────────────────

/// A named bundle of roles.
///
/// `roles` keeps insertion order and never holds duplicates when mutated
/// through [`Persona::add_role`]. Definitions read from disk may still carry
/// blank or repeated entries, which [`Persona::roles`] filters out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    id: PersonaId,
    label: String,
    #[serde(default)]
    roles: Vec<RoleId>,
}

impl Persona {
    /// Create a persona with no roles.
    pub fn new(id: impl Into<PersonaId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            roles: Vec::new(),
        }
    }

    /// Builder: add each role in order, skipping ones already present.
    pub fn with_roles<I, R>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<RoleId>,
    {
        for role in roles {
            self.add_role(role);
        }
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) -> &mut Self {
        self.label = label.into();
        self
    }

    /// Roles of this persona in first-seen order, without blanks or repeats.
    pub fn roles(&self) -> Vec<RoleId> {
        let mut seen = HashSet::new();
        self.roles
            .iter()
            .filter(|r| !r.trim().is_empty() && seen.insert(r.as_str()))
            .cloned()
            .collect()
    }

    /// Whether the persona grants `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Append `role` unless it is already present.
    pub fn add_role(&mut self, role: impl Into<RoleId>) -> &mut Self {
        let role = role.into();
        if !self.has_role(&role) {
            self.roles.push(role);
        }
        self
    }

    /// Remove every occurrence of `role`. Absent roles are ignored.
    pub fn remove_role(&mut self, role: &str) -> &mut Self {
        self.roles.retain(|r| r != role);
        self
    }

    /// Check the id is a machine name and the label is present.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::persona_invalid(&self.label, "Persona id must not be empty"));
        }

        if !self
            .id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(Error::persona_invalid(
                &self.id,
                "Persona id may only contain lowercase letters, digits and underscores",
            ));
        }

        if self.label.trim().is_empty() {
            return Err(Error::persona_invalid(&self.id, "Label must not be empty"));
        }

        if let Some(role) = self.roles.iter().find(|r| RESERVED_ROLES.contains(&r.as_str())) {
            return Err(Error::persona_invalid(
                &self.id,
                format!("Role '{}' is implied for every account and cannot be granted", role),
            ));
        }

        Ok(())
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label, self.id)
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
