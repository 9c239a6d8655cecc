//! Media collaborator error types.

use thiserror::Error;

/// Errors surfaced by source/surface/encoder implementations
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Failed to open source: {0}")]
    OpenFailed(String),

    #[error("Audio decode failed: {0}")]
    AudioDecode(String),

    #[error("Frame render failed: {0}")]
    Render(String),

    #[error("Encoder rejected input: {0}")]
    Encode(String),

    #[error("Muxer finalize failed: {0}")]
    Finalize(String),
}
