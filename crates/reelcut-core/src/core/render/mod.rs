//! Render/Export Module
//!
//! Drives one export end-to-end: audio mixdown, codec negotiation,
//! the frame render/encode loop, and muxer finalization.

mod export;

pub use export::*;
