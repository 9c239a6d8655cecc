//! Audio Mixdown Module
//!
//! Pre-mixes the whole timeline's audio into one PCM buffer before any
//! video frame is rendered.

mod mixdown;

pub use mixdown::*;
