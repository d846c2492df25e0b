//! Role resolution from a user's persona references.
//!
//! Roles are always recomputed from the current persona references rather
//! than tracked incrementally, so a re-save is enough to propagate a change
//! to a persona's role set.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::store::{PersonaLookup, User};

use super::types::{Persona, PersonaId, RoleId};

/// Computes the roles a user should hold from the personas they reference.
#[derive(Clone)]
pub struct PersonaRoleResolver {
    personas: Arc<dyn PersonaLookup>,
}

impl PersonaRoleResolver {
    pub fn new(personas: Arc<dyn PersonaLookup>) -> Self {
        Self { personas }
    }

    /// Personas referenced by `user` that still resolve.
    pub fn personas_of(&self, user: &User) -> Vec<Persona> {
        self.personas.load_personas(&user.personas)
    }

    /// De-duplicated union of the roles of every resolvable persona of `user`.
    ///
    /// Stale references contribute nothing. The returned order is not
    /// significant.
    pub fn roles_from_user(&self, user: &User) -> Vec<RoleId> {
        self.personas_of(user)
            .iter()
            .flat_map(|p| p.roles())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Whether `persona_id` is among the user's persona references.
    pub fn has_persona(&self, user: &User, persona_id: &str) -> bool {
        user.references(persona_id)
    }

    /// Recompute `user.roles` from personas. Returns true when the set changed.
    pub fn sync_roles(&self, user: &mut User) -> bool {
        let roles = self.roles_from_user(user);
        let before: BTreeSet<&RoleId> = user.roles.iter().collect();
        let after: BTreeSet<&RoleId> = roles.iter().collect();
        let changed = before != after;

        if changed {
            debug!(uid = user.uid, roles = ?roles, "Persona roles changed");
        }
        user.roles = roles;
        changed
    }
}

/// Ids of a list of personas, in order.
pub fn persona_ids(personas: &[Persona]) -> Vec<PersonaId> {
    personas.iter().map(|p| p.id().to_string()).collect()
}
