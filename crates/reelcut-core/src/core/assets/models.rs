//! Asset Model Definitions
//!
//! Defines the Asset struct and stream metadata types.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::{timeline::Medium, AssetId, Ratio, TimeSec};

/// Video-specific metadata
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame rate
    pub fps: Ratio,
}

impl Default for VideoInfo {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: Ratio::new(30, 1),
        }
    }
}

/// Audio-specific metadata
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioInfo {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of audio channels
    pub channels: u16,
}

impl Default for AudioInfo {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 2,
        }
    }
}

/// Main Asset structure
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    /// Unique identifier (ULID)
    pub id: AssetId,
    /// Medium of the asset
    pub kind: Medium,
    /// Display name
    pub name: String,
    /// File path or URI
    pub uri: String,
    /// Duration in seconds (images report 0)
    pub duration_sec: TimeSec,
    /// Import timestamp (ISO 8601)
    pub imported_at: String,
    /// Video-specific metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoInfo>,
    /// Audio-specific metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioInfo>,
}

impl Asset {
    /// Creates a new video asset with generated ULID
    pub fn new_video(name: &str, uri: &str, duration_sec: TimeSec, mut video: VideoInfo) -> Self {
        if video.width == 0 || video.height == 0 {
            warn!(
                "Video asset '{}' created with invalid dimensions {}x{}. Defaulting to 1920x1080",
                name, video.width, video.height
            );
            video.width = 1920;
            video.height = 1080;
        }
        Self {
            id: ulid::Ulid::new().to_string(),
            kind: Medium::Video,
            name: name.to_string(),
            uri: uri.to_string(),
            duration_sec,
            imported_at: chrono::Utc::now().to_rfc3339(),
            video: Some(video),
            audio: Some(AudioInfo::default()),
        }
    }

    /// Creates a new audio asset with generated ULID
    pub fn new_audio(name: &str, uri: &str, duration_sec: TimeSec, audio: AudioInfo) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            kind: Medium::Audio,
            name: name.to_string(),
            uri: uri.to_string(),
            duration_sec,
            imported_at: chrono::Utc::now().to_rfc3339(),
            video: None,
            audio: Some(audio),
        }
    }

    /// Creates a new image asset with generated ULID
    pub fn new_image(name: &str, uri: &str, width: u32, height: u32) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            kind: Medium::Image,
            name: name.to_string(),
            uri: uri.to_string(),
            duration_sec: 0.0,
            imported_at: chrono::Utc::now().to_rfc3339(),
            video: Some(VideoInfo {
                width,
                height,
                fps: Ratio::new(0, 1),
            }),
            audio: None,
        }
    }

    /// Whether this asset exposes a decodable audio stream
    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }
}
