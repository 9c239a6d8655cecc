//! Media Collaborator Module
//!
//! Interfaces to the external decode/render/encode primitives. The engine
//! never rasterizes or encodes anything itself: loaded sources, the
//! render surface, and the encoder/muxer pair are supplied by the
//! embedding application through the traits defined here.

mod error;
mod frame;
mod traits;

pub use error::*;
pub use frame::*;
pub use traits::*;
