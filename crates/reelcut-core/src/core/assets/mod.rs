//! Asset Module
//!
//! Asset model for media referenced by clips. Assets are owned by the
//! import layer; the export engine only borrows them for one export.

mod models;
pub use models::*;
