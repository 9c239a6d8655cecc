//! Project Persistence Module
//!
//! Saves and loads a project snapshot (assets plus one sequence) as
//! pretty-printed JSON.

mod snapshot;

pub use snapshot::*;
