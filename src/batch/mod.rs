//! Batch resync module
//!
//! Propagates a persona's role changes to its users:
//! - Building a chunked plan from the users holding the persona
//! - Stepping through chunk operations with progress tracking
//! - Driving runs headless or interactively
//! - Recording run outcomes

mod context;
mod driver;
mod engine;
mod plan;
mod run;
mod tracker;

pub use context::*;
pub use driver::*;
pub use engine::*;
pub use plan::*;
pub use run::*;
pub use tracker::*;
