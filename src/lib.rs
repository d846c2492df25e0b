//! persona-sync
//!
//! Personas are named bundles of roles attached to user accounts. A user's
//! roles are the union of the roles of the personas they hold. When a
//! persona's role set changes, [`batch::BatchEngine`] re-saves every holder
//! in fixed-size chunks so the derived roles are recomputed.

pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod persona;
pub mod store;
pub mod version;

pub use batch::{BatchEngine, BatchReport, ProcessOutcome};
pub use config::SyncConfig;
pub use error::{Error, Result};
pub use persona::{Persona, PersonaRegistry, PersonaRoleResolver};
pub use store::{InMemoryUserStore, JsonFileUserStore, User, UserStore};
