//! End-to-end export engine tests against recording stub collaborators.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::{
    assets::{Asset, AudioInfo, VideoInfo},
    codec::{AudioCodec, Container, NegotiatedFormat, VideoCodec},
    compose::CompositionLayer,
    media::{
        EncoderCapabilities, EncoderFactory, MediaEncoder, MediaError, MediaSource, MixdownBuffer,
        RenderBackend, RenderSurface, SourceLoader, SourceMap, VideoFrame,
    },
    render::{AbortSignal, ExportEngine, ExportError, ExportOptions, ExportPhase, ExportProgress},
    timeline::{Clip, Medium, Sequence, SequenceFormat, Track},
    Color, Size2D, TimeRange, TimeSec,
};

// =============================================================================
// Recording Stubs
// =============================================================================

/// Shared call recorder for every stub in one export
#[derive(Default)]
struct Recorder {
    sources_opened: AtomicUsize,
    sources_disposed: AtomicUsize,
    surfaces_created: AtomicUsize,
    surfaces_disposed: AtomicUsize,
    encoders_created: AtomicUsize,
    encoders_disposed: AtomicUsize,
    capability_queries: AtomicUsize,
    audio_submissions: AtomicUsize,
    audio_closes: AtomicUsize,
    video_closes: AtomicUsize,
    finalizations: AtomicUsize,
    /// (pts, keyframe) per encoded frame, in submission order
    frames: Mutex<Vec<(TimeSec, bool)>>,
}

impl Recorder {
    fn frames(&self) -> Vec<(TimeSec, bool)> {
        self.frames.lock().unwrap().clone()
    }
}

struct StubSource {
    recorder: Arc<Recorder>,
    duration: TimeSec,
    size: Option<Size2D>,
    audio: bool,
}

#[async_trait]
impl MediaSource for StubSource {
    fn duration_sec(&self) -> TimeSec {
        self.duration
    }

    fn dimensions(&self) -> Option<Size2D> {
        self.size
    }

    fn has_audio(&self) -> bool {
        self.audio
    }

    async fn decode_audio(
        &self,
        window: TimeRange,
        sample_rate: u32,
        channels: u16,
    ) -> Result<Vec<f32>, MediaError> {
        let frames = (window.duration() * sample_rate as f64).round() as usize;
        Ok(vec![0.1; frames * channels as usize])
    }

    async fn dispose(&mut self) {
        self.recorder.sources_disposed.fetch_add(1, Ordering::SeqCst);
    }
}

struct StubLoader {
    recorder: Arc<Recorder>,
    fail_open: bool,
}

#[async_trait]
impl SourceLoader for StubLoader {
    async fn open(&self, asset: &Asset) -> Result<Box<dyn MediaSource>, MediaError> {
        if self.fail_open {
            return Err(MediaError::OpenFailed(format!("no such file: {}", asset.uri)));
        }
        self.recorder.sources_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubSource {
            recorder: self.recorder.clone(),
            duration: asset.duration_sec,
            size: asset.video.as_ref().map(|v| Size2D::new(v.width, v.height)),
            audio: asset.has_audio(),
        }))
    }
}

struct StubSurface {
    recorder: Arc<Recorder>,
    size: Size2D,
}

#[async_trait]
impl RenderSurface for StubSurface {
    async fn render(
        &mut self,
        _layers: &[CompositionLayer],
        _background: Color,
        _sources: &SourceMap,
    ) -> Result<VideoFrame, MediaError> {
        Ok(VideoFrame::new(self.size))
    }

    async fn dispose(&mut self) {
        self.recorder.surfaces_disposed.fetch_add(1, Ordering::SeqCst);
    }
}

struct StubBackend {
    recorder: Arc<Recorder>,
}

#[async_trait]
impl RenderBackend for StubBackend {
    async fn create_surface(&self, size: Size2D) -> Result<Box<dyn RenderSurface>, MediaError> {
        self.recorder.surfaces_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubSurface {
            recorder: self.recorder.clone(),
            size,
        }))
    }
}

struct StubEncoder {
    recorder: Arc<Recorder>,
    /// Fails `encode_frame` at this frame index when set
    fail_at: Option<usize>,
    /// Fires this abort signal after encoding this many frames
    abort_after: Option<(usize, AbortSignal)>,
}

#[async_trait]
impl MediaEncoder for StubEncoder {
    async fn submit_audio(&mut self, _buffer: &MixdownBuffer) -> Result<(), MediaError> {
        self.recorder.audio_submissions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close_audio(&mut self) -> Result<(), MediaError> {
        self.recorder.audio_closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn encode_frame(
        &mut self,
        _frame: VideoFrame,
        pts_sec: TimeSec,
        _duration_sec: TimeSec,
        keyframe: bool,
    ) -> Result<(), MediaError> {
        let mut frames = self.recorder.frames.lock().unwrap();
        if self.fail_at == Some(frames.len()) {
            return Err(MediaError::Encode("simulated encoder rejection".into()));
        }
        frames.push((pts_sec, keyframe));
        if let Some((after, abort)) = &self.abort_after {
            if frames.len() == *after {
                abort.abort();
            }
        }
        Ok(())
    }

    async fn close_video(&mut self) -> Result<(), MediaError> {
        self.recorder.video_closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn finalize(&mut self) -> Result<Vec<u8>, MediaError> {
        self.recorder.finalizations.fetch_add(1, Ordering::SeqCst);
        Ok(b"muxed".to_vec())
    }

    async fn dispose(&mut self) {
        self.recorder.encoders_disposed.fetch_add(1, Ordering::SeqCst);
    }
}

struct StubFactory {
    recorder: Arc<Recorder>,
    /// Containers with audio codec support; video support is universal
    audio_containers: Vec<Container>,
    fail_at: Option<usize>,
    abort_after: Option<(usize, AbortSignal)>,
}

impl StubFactory {
    fn full(recorder: Arc<Recorder>) -> Self {
        Self {
            recorder,
            audio_containers: vec![Container::Mp4, Container::Webm],
            fail_at: None,
            abort_after: None,
        }
    }
}

impl EncoderCapabilities for StubFactory {
    fn can_encode_video(&self, container: Container, codec: VideoCodec, _size: Size2D) -> bool {
        self.recorder.capability_queries.fetch_add(1, Ordering::SeqCst);
        container.video_codecs().contains(&codec)
    }

    fn can_encode_audio(
        &self,
        container: Container,
        codec: AudioCodec,
        _sample_rate: u32,
        _channels: u16,
    ) -> bool {
        self.recorder.capability_queries.fetch_add(1, Ordering::SeqCst);
        self.audio_containers.contains(&container) && container.audio_codecs().contains(&codec)
    }
}

#[async_trait]
impl EncoderFactory for StubFactory {
    async fn create(
        &self,
        _format: &NegotiatedFormat,
        _size: Size2D,
        _fps: f64,
        _audio: Option<(u32, u16)>,
    ) -> Result<Box<dyn MediaEncoder>, MediaError> {
        self.recorder.encoders_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubEncoder {
            recorder: self.recorder.clone(),
            fail_at: self.fail_at,
            abort_after: self.abort_after.clone(),
        }))
    }
}

// =============================================================================
// Fixtures
// =============================================================================

fn engine_with(factory: StubFactory, recorder: &Arc<Recorder>) -> ExportEngine {
    ExportEngine::new(
        Arc::new(StubLoader {
            recorder: recorder.clone(),
            fail_open: false,
        }),
        Arc::new(StubBackend {
            recorder: recorder.clone(),
        }),
        Arc::new(factory),
    )
}

/// One video track, one 10 second clip starting at 0
fn ten_second_timeline(with_audio: bool) -> (Sequence, Vec<Asset>) {
    let mut asset = Asset::new_video("clip.mp4", "file:///clip.mp4", 10.0, VideoInfo::default());
    if with_audio {
        asset.audio = Some(AudioInfo::default());
    } else {
        asset.audio = None;
    }

    let mut track = Track::new_video("V1");
    track
        .add_clip(
            Clip::new("clip", Medium::Video, &asset.id)
                .with_trim(0.0, 10.0)
                .place_at(0.0),
        )
        .unwrap();

    let mut seq = Sequence::new("main", SequenceFormat::hd_1080());
    seq.add_track(track);
    (seq, vec![asset])
}

fn options_30fps() -> ExportOptions {
    ExportOptions::new(1280, 720, 30.0, "out")
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_ten_seconds_at_30fps_encodes_300_frames() {
    let recorder = Arc::new(Recorder::default());
    let engine = engine_with(StubFactory::full(recorder.clone()), &recorder);
    let (seq, assets) = ten_second_timeline(false);

    let output = engine.export(&seq, &assets, options_30fps()).await.unwrap();

    let frames = recorder.frames();
    assert_eq!(frames.len(), 300);
    assert_eq!(frames[0].0, 0.0);
    assert!((frames[299].0 - 9.9667).abs() < 1e-3);

    assert_eq!(output.bytes, b"muxed");
    assert_eq!(output.suggested_file_name, "out.mp4");
    assert_eq!(output.mime_type, "video/mp4");
    assert_eq!(recorder.video_closes.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.finalizations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_keyframe_cadence_every_five_seconds() {
    let recorder = Arc::new(Recorder::default());
    let engine = engine_with(StubFactory::full(recorder.clone()), &recorder);
    let (seq, assets) = ten_second_timeline(false);

    engine.export(&seq, &assets, options_30fps()).await.unwrap();

    // 30 fps * 5 s = every 150th frame
    for (i, (_, keyframe)) in recorder.frames().iter().enumerate() {
        assert_eq!(*keyframe, i % 150 == 0, "frame {i}");
    }
}

#[tokio::test]
async fn test_audio_submitted_and_closed_once() {
    let recorder = Arc::new(Recorder::default());
    let engine = engine_with(StubFactory::full(recorder.clone()), &recorder);
    let (seq, assets) = ten_second_timeline(true);

    engine.export(&seq, &assets, options_30fps()).await.unwrap();

    assert_eq!(recorder.audio_submissions.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.audio_closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_silent_timeline_submits_no_audio() {
    let recorder = Arc::new(Recorder::default());
    let engine = engine_with(StubFactory::full(recorder.clone()), &recorder);
    let (seq, assets) = ten_second_timeline(false);

    engine.export(&seq, &assets, options_30fps()).await.unwrap();

    assert_eq!(recorder.audio_submissions.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.audio_closes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_audio_dropped_when_no_audio_codec() {
    let recorder = Arc::new(Recorder::default());
    let factory = StubFactory {
        recorder: recorder.clone(),
        audio_containers: vec![],
        fail_at: None,
        abort_after: None,
    };
    let engine = engine_with(factory, &recorder);
    let (seq, assets) = ten_second_timeline(true);

    // Negotiation drops audio; the mixdown is never submitted
    let output = engine.export(&seq, &assets, options_30fps()).await.unwrap();
    assert_eq!(output.mime_type, "video/mp4");
    assert_eq!(recorder.audio_submissions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_preferred_container_sets_extension() {
    let recorder = Arc::new(Recorder::default());
    let engine = engine_with(StubFactory::full(recorder.clone()), &recorder);
    let (seq, assets) = ten_second_timeline(false);

    let mut options = options_30fps();
    options.container = Some(Container::Webm);
    let output = engine.export(&seq, &assets, options).await.unwrap();

    assert_eq!(output.suggested_file_name, "out.webm");
    assert_eq!(output.mime_type, "video/webm");
}

#[tokio::test]
async fn test_pre_aborted_export_cancels_and_disposes_once() {
    let recorder = Arc::new(Recorder::default());
    let engine = engine_with(StubFactory::full(recorder.clone()), &recorder);
    let (seq, assets) = ten_second_timeline(true);

    let options = {
        let mut o = options_30fps();
        o.abort.abort();
        o
    };
    let err = engine.export(&seq, &assets, options).await.unwrap_err();
    assert!(matches!(err, ExportError::Cancelled));

    // Sources were acquired before the first abort poll; nothing else was
    assert_eq!(recorder.sources_opened.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.sources_disposed.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.surfaces_created.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.encoders_created.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.finalizations.load(Ordering::SeqCst), 0);
    assert!(recorder.frames().is_empty());
}

#[tokio::test]
async fn test_zero_duration_fails_before_any_resource() {
    let recorder = Arc::new(Recorder::default());
    let engine = engine_with(StubFactory::full(recorder.clone()), &recorder);
    let seq = Sequence::new("empty", SequenceFormat::hd_1080());

    let err = engine.export(&seq, &[], options_30fps()).await.unwrap_err();
    assert!(matches!(err, ExportError::Validation(_)));

    assert_eq!(recorder.sources_opened.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.capability_queries.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.surfaces_created.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.encoders_created.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_abort_mid_render_stops_loop_and_disposes() {
    let recorder = Arc::new(Recorder::default());
    let abort = AbortSignal::new();
    let factory = StubFactory {
        recorder: recorder.clone(),
        audio_containers: vec![Container::Mp4, Container::Webm],
        fail_at: None,
        abort_after: Some((6, abort.clone())),
    };
    let engine = engine_with(factory, &recorder);
    let (seq, assets) = ten_second_timeline(false);

    let mut options = options_30fps();
    options.abort = abort;
    let err = engine.export(&seq, &assets, options).await.unwrap_err();
    assert!(matches!(err, ExportError::Cancelled));

    // The abort fired after frame 6; the next boundary poll stopped the loop
    assert_eq!(recorder.frames().len(), 6);
    assert_eq!(recorder.finalizations.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.sources_disposed.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.surfaces_disposed.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.encoders_disposed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_encoder_failure_aborts_and_disposes() {
    let recorder = Arc::new(Recorder::default());
    let factory = StubFactory {
        recorder: recorder.clone(),
        audio_containers: vec![Container::Mp4, Container::Webm],
        fail_at: Some(10),
        abort_after: None,
    };
    let engine = engine_with(factory, &recorder);
    let (seq, assets) = ten_second_timeline(false);

    let err = engine.export(&seq, &assets, options_30fps()).await.unwrap_err();
    assert!(matches!(err, ExportError::Encode(_)));

    assert_eq!(recorder.frames().len(), 10);
    assert_eq!(recorder.finalizations.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.sources_disposed.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.surfaces_disposed.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.encoders_disposed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_successful_export_disposes_everything_once() {
    let recorder = Arc::new(Recorder::default());
    let engine = engine_with(StubFactory::full(recorder.clone()), &recorder);
    let (seq, assets) = ten_second_timeline(true);

    engine.export(&seq, &assets, options_30fps()).await.unwrap();

    assert_eq!(recorder.sources_disposed.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.surfaces_disposed.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.encoders_disposed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_progress_phases_and_final_fraction() {
    let recorder = Arc::new(Recorder::default());
    let engine = engine_with(StubFactory::full(recorder.clone()), &recorder);
    let (seq, assets) = ten_second_timeline(true);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut options = options_30fps();
    options.progress = Some(tx);
    engine.export(&seq, &assets, options).await.unwrap();

    let mut events: Vec<ExportProgress> = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    assert_eq!(events[0].phase, ExportPhase::MixingAudio);
    assert_eq!(events[1].phase, ExportPhase::NegotiatingCodecs);
    assert!(events
        .iter()
        .any(|e| e.phase == ExportPhase::Rendering && e.total_frames == 300));
    assert_eq!(events[events.len() - 2].phase, ExportPhase::Finalizing);

    let last = events[events.len() - 1];
    assert_eq!(last.phase, ExportPhase::Done);
    assert_eq!(last.fraction, 1.0);

    // Fractions never go backwards within the rendering phase
    let rendering: Vec<f64> = events
        .iter()
        .filter(|e| e.phase == ExportPhase::Rendering)
        .map(|e| e.fraction)
        .collect();
    assert!(rendering.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_wav_preference_exports_audio_only() {
    let recorder = Arc::new(Recorder::default());
    let factory = StubFactory {
        recorder: recorder.clone(),
        audio_containers: vec![Container::Mp4, Container::Webm, Container::Wav],
        fail_at: None,
        abort_after: None,
    };
    let engine = engine_with(factory, &recorder);
    let (seq, assets) = ten_second_timeline(true);

    let mut options = options_30fps();
    options.container = Some(Container::Wav);
    let output = engine.export(&seq, &assets, options).await.unwrap();

    assert_eq!(output.suggested_file_name, "out.wav");
    assert_eq!(output.mime_type, "audio/wav");

    // No frame loop, no surface; audio submitted and muxed
    assert!(recorder.frames().is_empty());
    assert_eq!(recorder.surfaces_created.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.audio_submissions.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.audio_closes.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.video_closes.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.finalizations.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.sources_disposed.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.encoders_disposed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_wav_preference_on_silent_timeline_falls_back() {
    let recorder = Arc::new(Recorder::default());
    let factory = StubFactory {
        recorder: recorder.clone(),
        audio_containers: vec![Container::Mp4, Container::Wav],
        fail_at: None,
        abort_after: None,
    };
    let engine = engine_with(factory, &recorder);
    let (seq, assets) = ten_second_timeline(false);

    let mut options = options_30fps();
    options.container = Some(Container::Wav);
    let output = engine.export(&seq, &assets, options).await.unwrap();

    // Nothing to put in a wav; negotiation falls back to silent video
    assert_eq!(output.suggested_file_name, "out.mp4");
    assert_eq!(recorder.frames().len(), 300);
    assert_eq!(recorder.audio_submissions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unopenable_visual_source_is_fatal() {
    let recorder = Arc::new(Recorder::default());
    let engine = ExportEngine::new(
        Arc::new(StubLoader {
            recorder: recorder.clone(),
            fail_open: true,
        }),
        Arc::new(StubBackend {
            recorder: recorder.clone(),
        }),
        Arc::new(StubFactory::full(recorder.clone())),
    );
    let (seq, assets) = ten_second_timeline(false);

    let err = engine.export(&seq, &assets, options_30fps()).await.unwrap_err();
    assert!(matches!(err, ExportError::SourceDecode(_)));

    // Failed before negotiation and before any encoder resource existed
    assert_eq!(recorder.capability_queries.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.surfaces_created.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.encoders_created.load(Ordering::SeqCst), 0);
    assert!(recorder.frames().is_empty());
}

#[tokio::test]
async fn test_fractional_duration_rounds_frame_count_up() {
    let recorder = Arc::new(Recorder::default());
    let engine = engine_with(StubFactory::full(recorder.clone()), &recorder);

    let mut asset = Asset::new_video("c.mp4", "file:///c.mp4", 5.0, VideoInfo::default());
    asset.audio = None;
    let mut track = Track::new_video("V1");
    track
        .add_clip(
            Clip::new("c", Medium::Video, &asset.id)
                .with_trim(0.0, 1.05)
                .place_at(0.0),
        )
        .unwrap();
    let mut seq = Sequence::new("main", SequenceFormat::hd_1080());
    seq.add_track(track);

    engine.export(&seq, &[asset], options_30fps()).await.unwrap();

    // ceil(1.05 * 30) = 32
    assert_eq!(recorder.frames().len(), 32);
}
