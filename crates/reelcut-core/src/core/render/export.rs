//! Export engine.
//!
//! One export is one long-lived async task. Frames are rendered and
//! encoded strictly in increasing timestamp order; the only concurrency
//! is inside the audio mixdown and whatever the collaborators do
//! internally. Every resource acquired by an export is disposed
//! unconditionally when it ends, on success, failure, and cancellation
//! alike.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::core::{
    assets::Asset,
    audio::mix_sequence_audio,
    codec::{negotiate, Container},
    compose::{build_composition, FitMode},
    media::{
        EncodedOutput, EncoderFactory, MediaEncoder, MediaError, MixdownBuffer, RenderBackend,
        RenderSurface, SourceLoader, SourceMap,
    },
    timeline::Sequence,
    Color, Size2D, TimeSec,
};

/// Keyframe cadence in output seconds
const KEYFRAME_INTERVAL_SEC: f64 = 5.0;

/// Frames between cooperative yields back to the scheduler
const YIELD_EVERY_FRAMES: u64 = 8;

// =============================================================================
// Errors
// =============================================================================

/// Typed export failure. Partial output is never returned alongside one
/// of these; a failed export discards everything it produced.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("No encodable container/codec combination for this export")]
    NoEncodableFormat,

    #[error("Source decode failed: {0}")]
    SourceDecode(String),

    #[error("Frame render failed: {0}")]
    Render(String),

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Export cancelled")]
    Cancelled,
}

impl From<MediaError> for ExportError {
    fn from(error: MediaError) -> Self {
        match error {
            MediaError::OpenFailed(msg) => Self::SourceDecode(msg),
            // During the frame loop there is no fallback clip to skip, so
            // a decode failure is a render failure
            MediaError::AudioDecode(msg) | MediaError::Render(msg) => Self::Render(msg),
            MediaError::Encode(msg) | MediaError::Finalize(msg) => Self::Encode(msg),
        }
    }
}

// =============================================================================
// Abort Signal and Progress
// =============================================================================

/// Caller-owned cooperative cancellation flag.
///
/// Polled at the start of mixdown and negotiation and at every frame
/// boundary; in-flight decode/encode calls are allowed to complete.
#[derive(Clone, Debug, Default)]
pub struct AbortSignal {
    flag: Arc<AtomicBool>,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Safe to call from any thread, any number
    /// of times.
    pub fn abort(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn aborted(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Export state machine phase
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExportPhase {
    MixingAudio,
    NegotiatingCodecs,
    Rendering,
    Finalizing,
    Done,
}

/// Progress snapshot delivered to the caller
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportProgress {
    pub phase: ExportPhase,
    /// Index of the frame just encoded; 0 outside the rendering phase
    pub frame: u64,
    pub total_frames: u64,
    /// Completed fraction in `[0, 1]`
    pub fraction: f64,
}

// =============================================================================
// Options
// =============================================================================

/// Per-export options supplied by the caller
pub struct ExportOptions {
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// Output frame rate
    pub fps: f64,
    /// Canvas background behind the bottom layer
    pub background: Color,
    /// How source pixels map onto the output canvas
    pub fit: FitMode,
    /// Preferred container; `None` uses the default priority order
    pub container: Option<Container>,
    /// Base name for the suggested output file, without extension
    pub file_name_base: String,
    /// Cooperative cancellation flag owned by the caller
    pub abort: AbortSignal,
    /// Progress channel; dropped receivers are ignored
    pub progress: Option<mpsc::UnboundedSender<ExportProgress>>,
}

impl ExportOptions {
    pub fn new(width: u32, height: u32, fps: f64, file_name_base: &str) -> Self {
        Self {
            width,
            height,
            fps,
            background: Color::black(),
            fit: FitMode::Contain,
            container: None,
            file_name_base: file_name_base.to_string(),
            abort: AbortSignal::new(),
            progress: None,
        }
    }

    fn size(&self) -> Size2D {
        Size2D::new(self.width, self.height)
    }

    fn emit(&self, progress: ExportProgress) {
        if let Some(tx) = &self.progress {
            let _ = tx.send(progress);
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Drives exports against caller-supplied media collaborators
pub struct ExportEngine {
    loader: Arc<dyn SourceLoader>,
    renderer: Arc<dyn RenderBackend>,
    encoders: Arc<dyn EncoderFactory>,
}

impl ExportEngine {
    pub fn new(
        loader: Arc<dyn SourceLoader>,
        renderer: Arc<dyn RenderBackend>,
        encoders: Arc<dyn EncoderFactory>,
    ) -> Self {
        Self {
            loader,
            renderer,
            encoders,
        }
    }

    /// Exports the sequence to a single muxed artifact.
    ///
    /// The sequence and assets are treated as an immutable snapshot for
    /// the duration of the call. Fails before acquiring any resource if
    /// the timeline is empty or violates the non-overlap invariant.
    pub async fn export(
        &self,
        sequence: &Sequence,
        assets: &[Asset],
        options: ExportOptions,
    ) -> Result<EncodedOutput, ExportError> {
        sequence
            .validate()
            .map_err(|e| ExportError::Validation(e.to_string()))?;
        let total_duration = sequence.duration();
        if total_duration <= 0.0 {
            return Err(ExportError::Validation(
                "timeline has zero duration".to_string(),
            ));
        }
        if options.width == 0 || options.height == 0 || options.fps <= 0.0 {
            return Err(ExportError::Validation(format!(
                "invalid output format: {}x{} @ {} fps",
                options.width, options.height, options.fps
            )));
        }

        let mut sources = SourceMap::new();
        let mut surface: Option<Box<dyn RenderSurface>> = None;
        let mut encoder: Option<Box<dyn MediaEncoder>> = None;

        let result = self
            .run(
                sequence,
                assets,
                &options,
                total_duration,
                &mut sources,
                &mut surface,
                &mut encoder,
            )
            .await;

        // Unconditional disposal, each resource exactly once
        sources.dispose_all().await;
        if let Some(mut s) = surface.take() {
            s.dispose().await;
        }
        if let Some(mut e) = encoder.take() {
            e.dispose().await;
        }

        if result.is_ok() {
            options.emit(ExportProgress {
                phase: ExportPhase::Done,
                frame: 0,
                total_frames: 0,
                fraction: 1.0,
            });
        }
        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn run(
        &self,
        sequence: &Sequence,
        assets: &[Asset],
        options: &ExportOptions,
        total_duration: TimeSec,
        sources: &mut SourceMap,
        surface: &mut Option<Box<dyn RenderSurface>>,
        encoder: &mut Option<Box<dyn MediaEncoder>>,
    ) -> Result<EncodedOutput, ExportError> {
        let size = options.size();

        self.load_sources(sequence, assets, sources).await?;

        // -- MixingAudio --------------------------------------------------
        if options.abort.aborted() {
            return Err(ExportError::Cancelled);
        }
        options.emit(ExportProgress {
            phase: ExportPhase::MixingAudio,
            frame: 0,
            total_frames: 0,
            fraction: 0.0,
        });
        let mixdown: Option<MixdownBuffer> = mix_sequence_audio(
            sequence,
            sources,
            sequence.format.audio_sample_rate,
            sequence.format.audio_channels,
        )
        .await;

        // -- NegotiatingCodecs --------------------------------------------
        if options.abort.aborted() {
            return Err(ExportError::Cancelled);
        }
        options.emit(ExportProgress {
            phase: ExportPhase::NegotiatingCodecs,
            frame: 0,
            total_frames: 0,
            fraction: 0.0,
        });
        let format = negotiate(
            self.encoders.as_ref(),
            size,
            mixdown.is_some(),
            options.container,
        )
        .ok_or(ExportError::NoEncodableFormat)?;
        info!(
            container = format.container.extension(),
            video = ?format.video_codec,
            audio = ?format.audio_codec,
            "export format negotiated"
        );

        let audio_params = format
            .audio_codec
            .map(|_| (sequence.format.audio_sample_rate, sequence.format.audio_channels));
        let created_encoder = encoder.insert(
            self.encoders
                .create(&format, size, options.fps, audio_params)
                .await?,
        );

        // Whole mixdown goes in up front so audio framing finishes
        // independent of video progress
        if let (Some(buffer), Some(_)) = (&mixdown, format.audio_codec) {
            created_encoder.submit_audio(buffer).await?;
            created_encoder.close_audio().await?;
        }

        // -- Rendering ----------------------------------------------------
        // An audio-only format carries no video codec; the frame loop and
        // render surface are skipped entirely
        let mut frame_count = 0u64;
        if format.video_codec.is_some() {
            let created_surface = surface.insert(self.renderer.create_surface(size).await?);

            frame_count = (total_duration * options.fps).ceil() as u64;
            let keyframe_interval = ((options.fps * KEYFRAME_INTERVAL_SEC).round() as u64).max(1);
            let frame_duration = 1.0 / options.fps;

            for i in 0..frame_count {
                if options.abort.aborted() {
                    return Err(ExportError::Cancelled);
                }

                let t = i as f64 / options.fps;
                let layers = build_composition(t, sequence, sources, size, options.fit);
                let frame = created_surface
                    .render(&layers, options.background, sources)
                    .await?;

                // Awaiting acceptance honors encoder backpressure
                created_encoder
                    .encode_frame(frame, t, frame_duration, i % keyframe_interval == 0)
                    .await?;

                options.emit(ExportProgress {
                    phase: ExportPhase::Rendering,
                    frame: i,
                    total_frames: frame_count,
                    fraction: i as f64 / frame_count as f64,
                });

                // Keep long exports cooperative without stalling the encoder
                if (i + 1) % YIELD_EVERY_FRAMES == 0 {
                    tokio::task::yield_now().await;
                }
            }
        }

        // -- Finalizing ---------------------------------------------------
        options.emit(ExportProgress {
            phase: ExportPhase::Finalizing,
            frame: frame_count,
            total_frames: frame_count,
            fraction: 1.0,
        });
        if format.video_codec.is_some() {
            created_encoder.close_video().await?;
        }
        let bytes = created_encoder.finalize().await?;

        info!(
            frames = frame_count,
            bytes = bytes.len(),
            "export finalized"
        );
        Ok(EncodedOutput {
            bytes,
            suggested_file_name: format!(
                "{}.{}",
                options.file_name_base,
                format.container.extension()
            ),
            mime_type: format.container.mime_type().to_string(),
        })
    }

    /// Opens a source for every asset referenced by some clip.
    ///
    /// An open failure is fatal for visual assets (the frame loop has no
    /// fallback) but only logged for audio assets, which the mixdown
    /// skips the same way it skips decode failures.
    async fn load_sources(
        &self,
        sequence: &Sequence,
        assets: &[Asset],
        sources: &mut SourceMap,
    ) -> Result<(), ExportError> {
        for asset in assets {
            let referenced = sequence
                .tracks
                .iter()
                .flat_map(|t| t.clips.iter())
                .any(|c| c.asset_id.as_deref() == Some(asset.id.as_str()));
            if !referenced || sources.contains(&asset.id) {
                continue;
            }
            match self.loader.open(asset).await {
                Ok(source) => sources.insert(asset.id.clone(), source),
                Err(error) if asset.kind.is_visual() => {
                    return Err(ExportError::SourceDecode(error.to_string()));
                }
                Err(error) => {
                    warn!(asset_id = %asset.id, %error, "skipping unopenable audio asset");
                }
            }
        }
        Ok(())
    }
}
