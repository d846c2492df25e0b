//! User store module
//!
//! Defines the ports the batch engine consumes and two implementations:
//! - `InMemoryUserStore` for tests and embedding
//! - `JsonFileUserStore` for the command-line runner

mod file;
mod memory;
mod traits;

pub use file::JsonFileUserStore;
pub use memory::InMemoryUserStore;
pub use traits::{PersonaLookup, User, UserId, UserStore};
