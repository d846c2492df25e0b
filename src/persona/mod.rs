//! Persona system: named bundles of roles attached to user accounts.
//!
//! A user's roles are derived from the personas they reference. When a
//! persona's role set changes, the batch engine re-saves every user holding
//! it so the derived roles are recomputed.

pub mod registry;
pub mod resolver;
pub mod types;

pub use registry::PersonaRegistry;
pub use resolver::{persona_ids, PersonaRoleResolver};
pub use types::{Persona, PersonaId, RoleId, RESERVED_ROLES};
