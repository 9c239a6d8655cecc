//! Timeline Model Definitions
//!
//! Defines Sequence, Track, Clip and related types for timeline editing.
//! The export engine treats these as an immutable snapshot: only the
//! owning UI layer mutates them, and never during an export.

use serde::{Deserialize, Serialize};

use crate::core::{AssetId, ClipId, CoreError, CoreResult, Ratio, SequenceId, Size2D, TimeSec, TrackId};

// =============================================================================
// Medium
// =============================================================================

/// Medium of a track or clip.
///
/// A closed tagged variant; all medium dispatch is exhaustive matching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Medium {
    Video,
    Audio,
    Image,
}

impl Medium {
    /// Returns true for media that contribute visual layers
    pub fn is_visual(&self) -> bool {
        matches!(self, Medium::Video | Medium::Image)
    }

    /// Returns true for media that may carry a decodable audio stream.
    /// Video counts: audio embedded in video clips joins the mixdown.
    pub fn may_have_audio(&self) -> bool {
        matches!(self, Medium::Video | Medium::Audio)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Medium::Video => "video",
            Medium::Audio => "audio",
            Medium::Image => "image",
        }
    }
}

// =============================================================================
// Sequence Format
// =============================================================================

/// Sequence format specification
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceFormat {
    /// Canvas size
    pub canvas: Size2D,
    /// Frame rate
    pub fps: Ratio,
    /// Audio sample rate in Hz
    pub audio_sample_rate: u32,
    /// Number of audio channels
    pub audio_channels: u16,
}

impl SequenceFormat {
    /// Creates a format for landscape HD (1920x1080, 30fps)
    pub fn hd_1080() -> Self {
        Self {
            canvas: Size2D::new(1920, 1080),
            fps: Ratio::new(30, 1),
            audio_sample_rate: 48000,
            audio_channels: 2,
        }
    }

    /// Creates a format for vertical HD (1080x1920, 30fps)
    pub fn vertical_1080() -> Self {
        Self {
            canvas: Size2D::new(1080, 1920),
            fps: Ratio::new(30, 1),
            audio_sample_rate: 48000,
            audio_channels: 2,
        }
    }
}

impl Default for SequenceFormat {
    fn default() -> Self {
        Self::hd_1080()
    }
}

// =============================================================================
// Clip Range and Placement
// =============================================================================

/// Trim window within the source asset: `[trim_start, trim_end)` in
/// source seconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipRange {
    /// Start of the consumed source window (seconds)
    pub trim_start_sec: TimeSec,
    /// End of the consumed source window (seconds)
    pub trim_end_sec: TimeSec,
}

impl ClipRange {
    pub fn new(trim_start: TimeSec, trim_end: TimeSec) -> Self {
        Self {
            trim_start_sec: trim_start,
            trim_end_sec: trim_end,
        }
    }

    /// Returns the source duration the window consumes
    pub fn duration(&self) -> TimeSec {
        self.trim_end_sec - self.trim_start_sec
    }
}

impl Default for ClipRange {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Clip placement on the timeline: occupies
/// `[timeline_in, timeline_in + duration)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipPlace {
    /// Start time on timeline (seconds)
    pub timeline_in_sec: TimeSec,
    /// Duration on timeline (seconds) - may differ from the trim window
    /// due to speed
    pub duration_sec: TimeSec,
}

impl ClipPlace {
    pub fn new(timeline_in: TimeSec, duration: TimeSec) -> Self {
        Self {
            timeline_in_sec: timeline_in,
            duration_sec: duration,
        }
    }

    /// Returns the end time on timeline
    pub fn timeline_out_sec(&self) -> TimeSec {
        self.timeline_in_sec + self.duration_sec
    }

    /// Checks if this placement overlaps with another
    pub fn overlaps(&self, other: &ClipPlace) -> bool {
        self.timeline_in_sec < other.timeline_out_sec()
            && self.timeline_out_sec() > other.timeline_in_sec
    }

    /// Checks if a time point is within the half-open occupied interval
    pub fn contains(&self, time_sec: TimeSec) -> bool {
        time_sec >= self.timeline_in_sec && time_sec < self.timeline_out_sec()
    }
}

impl Default for ClipPlace {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

// =============================================================================
// Transform and Filters
// =============================================================================

/// 2D transform for clips
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    /// Horizontal offset in output pixels
    pub x: f64,
    /// Vertical offset in output pixels
    pub y: f64,
    /// Horizontal scale (1.0 = 100%)
    pub scale_x: f64,
    /// Vertical scale (1.0 = 100%)
    pub scale_y: f64,
    /// Rotation in degrees
    pub rotation_deg: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation_deg: 0.0,
        }
    }
}

/// Per-clip filter set applied by the compositor
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSet {
    /// Opacity (0.0 - 1.0)
    pub opacity: f64,
    /// Brightness offset (0.0 = neutral)
    pub brightness: f64,
    /// Contrast multiplier (1.0 = neutral)
    pub contrast: f64,
    /// Saturation multiplier (1.0 = neutral)
    pub saturation: f64,
    /// Hue rotation in degrees
    pub hue_deg: f64,
    /// Blur radius in pixels
    pub blur_px: f64,
}

impl Default for FilterSet {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            brightness: 0.0,
            contrast: 1.0,
            saturation: 1.0,
            hue_deg: 0.0,
            blur_px: 0.0,
        }
    }
}

// =============================================================================
// Clip
// =============================================================================

/// Clip (bounded placement of a media asset on the timeline)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    pub id: ClipId,
    pub name: String,
    pub kind: Medium,
    /// Weak reference to the backing asset; `None` for clips whose asset
    /// was removed from the project
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<AssetId>,
    /// Trim window within the source asset
    pub range: ClipRange,
    /// Placement on the timeline
    pub place: ClipPlace,
    pub transform: Transform,
    pub filters: FilterSet,
}

impl Clip {
    /// Creates a new clip over an asset with the trim window mapped 1:1
    /// onto the timeline
    pub fn new(name: &str, kind: Medium, asset_id: &str) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            name: name.to_string(),
            kind,
            asset_id: Some(asset_id.to_string()),
            range: ClipRange::default(),
            place: ClipPlace::default(),
            transform: Transform::default(),
            filters: FilterSet::default(),
        }
    }

    /// Sets the trim window and matches the timeline duration to it (1x speed)
    pub fn with_trim(mut self, trim_start: TimeSec, trim_end: TimeSec) -> Self {
        self.range = ClipRange::new(trim_start, trim_end);
        self.place.duration_sec = self.range.duration();
        self
    }

    /// Places the clip at a specific timeline position
    pub fn place_at(mut self, timeline_in: TimeSec) -> Self {
        self.place.timeline_in_sec = timeline_in;
        self
    }

    /// Overrides the timeline duration, implying a speed change
    pub fn with_duration(mut self, duration: TimeSec) -> Self {
        self.place.duration_sec = duration;
        self
    }

    /// Returns the timeline end position
    pub fn timeline_end(&self) -> TimeSec {
        self.place.timeline_out_sec()
    }

    /// Checks if this clip covers the given timeline position
    pub fn contains_time(&self, time_sec: TimeSec) -> bool {
        self.place.contains(time_sec)
    }

    /// Implied playback speed: source seconds consumed per timeline second
    pub fn speed(&self) -> f64 {
        if self.place.duration_sec <= 0.0 {
            return 1.0;
        }
        self.range.duration() / self.place.duration_sec
    }

    /// Maps a timeline time to source time, clamped to the trim window.
    ///
    /// At `t = timeline_in` this yields `trim_start`; as `t` approaches
    /// `timeline_in + duration` it approaches `trim_end`.
    pub fn source_time_at(&self, timeline_sec: TimeSec) -> TimeSec {
        let offset = timeline_sec - self.place.timeline_in_sec;
        let raw = self.range.trim_start_sec + offset * self.speed();
        raw.clamp(self.range.trim_start_sec, self.range.trim_end_sec)
    }

    /// Validates the trim window against the backing asset duration
    pub fn validate_trim(&self, asset_duration: TimeSec) -> CoreResult<()> {
        let (start, end) = (self.range.trim_start_sec, self.range.trim_end_sec);
        if start < 0.0 || start > end || end > asset_duration {
            return Err(CoreError::InvalidTrimWindow {
                trim_start: start,
                trim_end: end,
                asset_duration,
            });
        }
        Ok(())
    }
}

// =============================================================================
// Track
// =============================================================================

/// Track (ordered lane of non-overlapping clips of one medium)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: TrackId,
    pub kind: Medium,
    pub name: String,
    /// Hidden tracks contribute neither video nor audio
    pub hidden: bool,
    /// Muted tracks contribute no audio (video still renders)
    pub muted: bool,
    pub clips: Vec<Clip>,
}

impl Track {
    /// Creates a new track with the given name and medium
    pub fn new(name: &str, kind: Medium) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            kind,
            name: name.to_string(),
            hidden: false,
            muted: false,
            clips: vec![],
        }
    }

    pub fn new_video(name: &str) -> Self {
        Self::new(name, Medium::Video)
    }

    pub fn new_audio(name: &str) -> Self {
        Self::new(name, Medium::Audio)
    }

    /// Pure placement validation: checks a proposed interval against this
    /// track's medium and existing clips.
    ///
    /// Usable by interactive drop handling and headless tests alike.
    /// `exclude` skips one clip (the clip being moved).
    pub fn can_place(
        &self,
        proposed: &ClipPlace,
        clip_kind: Medium,
        exclude: Option<&ClipId>,
    ) -> CoreResult<()> {
        if self.kind != clip_kind {
            return Err(CoreError::TrackKindMismatch {
                track_kind: self.kind.as_str().to_string(),
                clip_kind: clip_kind.as_str().to_string(),
            });
        }
        if proposed.duration_sec <= 0.0 || proposed.timeline_in_sec < 0.0 {
            return Err(CoreError::InvalidTimeRange(
                proposed.timeline_in_sec,
                proposed.timeline_out_sec(),
            ));
        }
        for clip in &self.clips {
            if exclude.is_some_and(|id| id == &clip.id) {
                continue;
            }
            if clip.place.overlaps(proposed) {
                return Err(CoreError::ClipOverlap {
                    track_id: self.id.clone(),
                    existing_clip_id: clip.id.clone(),
                    new_start: proposed.timeline_in_sec,
                    new_end: proposed.timeline_out_sec(),
                });
            }
        }
        Ok(())
    }

    /// Validates and adds a clip, keeping clips ordered by start time
    pub fn add_clip(&mut self, clip: Clip) -> CoreResult<()> {
        self.can_place(&clip.place, clip.kind, None)?;
        let idx = self
            .clips
            .partition_point(|c| c.place.timeline_in_sec < clip.place.timeline_in_sec);
        self.clips.insert(idx, clip);
        Ok(())
    }

    /// Removes a clip by ID
    pub fn remove_clip(&mut self, clip_id: &ClipId) -> Option<Clip> {
        let pos = self.clips.iter().position(|c| &c.id == clip_id)?;
        Some(self.clips.remove(pos))
    }

    /// Gets a clip by ID
    pub fn get_clip(&self, clip_id: &str) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == clip_id)
    }

    /// Finds the at-most-one clip covering timeline time `t`.
    ///
    /// Uniqueness is guaranteed by the per-track non-overlap invariant.
    pub fn clip_at(&self, time_sec: TimeSec) -> Option<&Clip> {
        self.clips.iter().find(|c| c.contains_time(time_sec))
    }

    /// Checks the per-track non-overlap invariant over all clip pairs
    pub fn validate(&self) -> CoreResult<()> {
        for (i, a) in self.clips.iter().enumerate() {
            if a.place.duration_sec <= 0.0 {
                return Err(CoreError::InvalidTimeRange(
                    a.place.timeline_in_sec,
                    a.place.timeline_out_sec(),
                ));
            }
            for b in self.clips.iter().skip(i + 1) {
                if a.place.overlaps(&b.place) {
                    return Err(CoreError::ClipOverlap {
                        track_id: self.id.clone(),
                        existing_clip_id: a.id.clone(),
                        new_start: b.place.timeline_in_sec,
                        new_end: b.place.timeline_out_sec(),
                    });
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Sequence
// =============================================================================

/// Sequence (timeline container).
///
/// Track order is display order and z-order: index 0 is the bottom
/// layer, later tracks render on top. Preview and export share this
/// convention.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sequence {
    pub id: SequenceId,
    pub name: String,
    pub format: SequenceFormat,
    pub tracks: Vec<Track>,
    pub created_at: String,
    pub modified_at: String,
}

impl Sequence {
    /// Creates a new sequence with the given name and format
    pub fn new(name: &str, format: SequenceFormat) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: ulid::Ulid::new().to_string(),
            name: name.to_string(),
            format,
            tracks: vec![],
            created_at: now.clone(),
            modified_at: now,
        }
    }

    /// Adds a track to the sequence (on top of existing tracks)
    pub fn add_track(&mut self, track: Track) {
        self.tracks.push(track);
        self.modified_at = chrono::Utc::now().to_rfc3339();
    }

    /// Gets a track by ID
    pub fn get_track(&self, track_id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == track_id)
    }

    /// Gets a mutable track by ID
    pub fn get_track_mut(&mut self, track_id: &str) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == track_id)
    }

    /// Calculates the total duration of the sequence
    pub fn duration(&self) -> TimeSec {
        self.tracks
            .iter()
            .flat_map(|t| t.clips.iter())
            .map(|c| c.place.timeline_out_sec())
            .fold(0.0, f64::max)
    }

    /// Validates every track's non-overlap invariant
    pub fn validate(&self) -> CoreResult<()> {
        for track in &self.tracks {
            track.validate()?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
