//! Reelcut Core Engine
//!
//! Core export engine module.
//! Handles timeline modeling, composition, audio mixdown, codec
//! negotiation, and the render-encode loop.

pub mod assets;
pub mod audio;
pub mod codec;
pub mod compose;
pub mod media;
pub mod project;
pub mod render;
pub mod timeline;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;

#[cfg(test)]
mod tests_export;
