//! Reelcut Core Library
//!
//! Headless timeline composition and export engine.
//! This library contains the timeline model, the per-instant composition
//! builder, the audio mixdown engine, codec negotiation, and the
//! render-encode loop that drives one export end to end.
//!
//! The interactive UI, asset import, and the actual decode/encode/render
//! primitives are external collaborators: the engine consumes them through
//! the traits in [`core::media`].

pub mod core;
