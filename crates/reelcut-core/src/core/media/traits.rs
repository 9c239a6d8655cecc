//! Collaborator trait seams.
//!
//! One export owns every value created through these traits exclusively:
//! sources are opened once at export start, the surface and encoder are
//! bound to the negotiated format, and all of them are disposed
//! unconditionally when the export ends.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::core::{
    assets::Asset,
    codec::{AudioCodec, Container, NegotiatedFormat, VideoCodec},
    compose::CompositionLayer,
    media::{MediaError, MixdownBuffer, VideoFrame},
    AssetId, Color, Size2D, TimeRange, TimeSec,
};

// =============================================================================
// Loaded Sources
// =============================================================================

/// Export-scoped handle bound to one asset.
///
/// Opened lazily at export start, disposed unconditionally at export end.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Source duration in seconds
    fn duration_sec(&self) -> TimeSec;

    /// Pixel dimensions, for visual sources
    fn dimensions(&self) -> Option<Size2D>;

    /// Whether the source exposes a decodable audio stream
    fn has_audio(&self) -> bool;

    /// Decodes interleaved f32 samples for a source-time window,
    /// resampled to the requested rate/channel layout.
    async fn decode_audio(
        &self,
        window: TimeRange,
        sample_rate: u32,
        channels: u16,
    ) -> Result<Vec<f32>, MediaError>;

    /// Releases decoder state. Must be idempotent.
    async fn dispose(&mut self);
}

/// Opens export-scoped sources from assets
#[async_trait]
pub trait SourceLoader: Send + Sync {
    async fn open(&self, asset: &Asset) -> Result<Box<dyn MediaSource>, MediaError>;
}

/// Map of loaded sources keyed by asset ID, owned by one export
#[derive(Default)]
pub struct SourceMap {
    sources: HashMap<AssetId, Box<dyn MediaSource>>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, asset_id: AssetId, source: Box<dyn MediaSource>) {
        self.sources.insert(asset_id, source);
    }

    pub fn get(&self, asset_id: &str) -> Option<&dyn MediaSource> {
        self.sources.get(asset_id).map(|s| s.as_ref())
    }

    pub fn contains(&self, asset_id: &str) -> bool {
        self.sources.contains_key(asset_id)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Disposes every source exactly once and empties the map
    pub async fn dispose_all(&mut self) {
        for (_, mut source) in self.sources.drain() {
            source.dispose().await;
        }
    }
}

// =============================================================================
// Render Surface
// =============================================================================

/// Off-screen render surface that rasterizes a composition into a frame.
///
/// The surface may parallelize internally; the engine calls it for one
/// frame at a time, in increasing timestamp order.
#[async_trait]
pub trait RenderSurface: Send {
    async fn render(
        &mut self,
        layers: &[CompositionLayer],
        background: Color,
        sources: &SourceMap,
    ) -> Result<VideoFrame, MediaError>;

    /// Releases the surface. Must be idempotent.
    async fn dispose(&mut self);
}

/// Creates export-scoped render surfaces
#[async_trait]
pub trait RenderBackend: Send + Sync {
    async fn create_surface(&self, size: Size2D) -> Result<Box<dyn RenderSurface>, MediaError>;
}

// =============================================================================
// Encoder / Muxer
// =============================================================================

/// Capability oracle consulted during codec negotiation
pub trait EncoderCapabilities: Send + Sync {
    /// Whether the backend can encode this video codec into this
    /// container at the given resolution
    fn can_encode_video(&self, container: Container, codec: VideoCodec, size: Size2D) -> bool;

    /// Whether the backend can encode this audio codec into this
    /// container at the given rate/channel layout
    fn can_encode_audio(
        &self,
        container: Container,
        codec: AudioCodec,
        sample_rate: u32,
        channels: u16,
    ) -> bool;
}

/// Encoder/muxer pair bound to one negotiated format.
///
/// `encode_frame` suspends until the encoder can accept the frame; the
/// engine never enqueues faster than the encoder drains. Frames arrive
/// in strictly increasing presentation order.
#[async_trait]
pub trait MediaEncoder: Send {
    /// Submits the whole mixdown to the audio track
    async fn submit_audio(&mut self, buffer: &MixdownBuffer) -> Result<(), MediaError>;

    /// Closes the audio track so the muxer can finish audio framing
    /// independent of video progress
    async fn close_audio(&mut self) -> Result<(), MediaError>;

    /// Encodes one video frame; awaiting honors encoder backpressure
    async fn encode_frame(
        &mut self,
        frame: VideoFrame,
        pts_sec: TimeSec,
        duration_sec: TimeSec,
        keyframe: bool,
    ) -> Result<(), MediaError>;

    /// Closes the video track
    async fn close_video(&mut self) -> Result<(), MediaError>;

    /// Finalizes the muxer and returns the container bytes
    async fn finalize(&mut self) -> Result<Vec<u8>, MediaError>;

    /// Releases encoder/muxer resources. Must be idempotent; called on
    /// success, failure, and cancellation alike.
    async fn dispose(&mut self);
}

/// Creates encoders and answers capability queries
#[async_trait]
pub trait EncoderFactory: EncoderCapabilities {
    async fn create(
        &self,
        format: &NegotiatedFormat,
        size: Size2D,
        fps: f64,
        audio: Option<(u32, u16)>,
    ) -> Result<Box<dyn MediaEncoder>, MediaError>;
}
