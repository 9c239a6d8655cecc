//! Timeline Module
//!
//! Track/Clip/Sequence model and placement rules.

mod models;
pub use models::*;
