//! Codec Negotiation Module
//!
//! Container/codec tables and the negotiation pass that picks a
//! mutually-supported (container, video codec, audio codec) tuple
//! against the encoder backend's capability oracle.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{media::EncoderCapabilities, Size2D};

// =============================================================================
// Containers and Codecs
// =============================================================================

/// Container format
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Container {
    Mp4,
    Webm,
    Mov,
    Mkv,
    Wav,
    Aac,
    Mp3,
}

impl Container {
    /// Canonical file extension
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
            Self::Mov => "mov",
            Self::Mkv => "mkv",
            Self::Wav => "wav",
            Self::Aac => "aac",
            Self::Mp3 => "mp3",
        }
    }

    /// Whether the container carries audio only (no video track)
    pub fn is_audio_only(self) -> bool {
        matches!(self, Self::Wav | Self::Aac | Self::Mp3)
    }

    /// MIME type for the muxed artifact
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Mp4 => "video/mp4",
            Self::Webm => "video/webm",
            Self::Mov => "video/quicktime",
            Self::Mkv => "video/x-matroska",
            Self::Wav => "audio/wav",
            Self::Aac => "audio/aac",
            Self::Mp3 => "audio/mpeg",
        }
    }

    /// Video codecs the container supports, in negotiation priority order
    pub fn video_codecs(self) -> &'static [VideoCodec] {
        match self {
            Self::Mp4 => &[VideoCodec::H264, VideoCodec::H265, VideoCodec::Av1],
            Self::Webm => &[VideoCodec::Vp9, VideoCodec::Av1, VideoCodec::Vp8],
            Self::Mov => &[VideoCodec::H264, VideoCodec::ProRes, VideoCodec::H265],
            Self::Mkv => &[
                VideoCodec::H264,
                VideoCodec::H265,
                VideoCodec::Vp9,
                VideoCodec::Av1,
            ],
            Self::Wav | Self::Aac | Self::Mp3 => &[],
        }
    }

    /// Audio codecs the container supports, in negotiation priority order
    pub fn audio_codecs(self) -> &'static [AudioCodec] {
        match self {
            Self::Mp4 => &[AudioCodec::Aac, AudioCodec::Mp3],
            Self::Webm => &[AudioCodec::Opus, AudioCodec::Vorbis],
            Self::Mov => &[AudioCodec::Aac, AudioCodec::Pcm],
            Self::Mkv => &[
                AudioCodec::Aac,
                AudioCodec::Opus,
                AudioCodec::Vorbis,
                AudioCodec::Mp3,
            ],
            Self::Wav => &[AudioCodec::Pcm],
            Self::Aac => &[AudioCodec::Aac],
            Self::Mp3 => &[AudioCodec::Mp3],
        }
    }
}

/// Video codec selection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodec {
    H264,
    H265,
    Vp8,
    Vp9,
    Av1,
    ProRes,
}

/// Audio codec selection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioCodec {
    Aac,
    Opus,
    Vorbis,
    Mp3,
    Pcm,
}

// =============================================================================
// Negotiation
// =============================================================================

/// Standard audio parameters used for negotiation probes
pub const NEGOTIATION_SAMPLE_RATE: u32 = 48000;
/// Standard channel layout used for negotiation probes
pub const NEGOTIATION_CHANNELS: u16 = 2;

/// Default container priority when the caller expresses no preference
pub const DEFAULT_CANDIDATES: &[Container] = &[Container::Mp4, Container::Webm];

/// Result of codec negotiation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiatedFormat {
    pub container: Container,
    /// `None` only for audio-only containers; the export then skips the
    /// frame loop entirely
    pub video_codec: Option<VideoCodec>,
    /// `None` means the export carries no audio track
    pub audio_codec: Option<AudioCodec>,
}

/// Picks a mutually-supported (container, video codec, audio codec) tuple.
///
/// An audio-only container (wav/aac/mp3) is honored only when it is the
/// explicit preference and the timeline has audio; it yields a format
/// with no video codec. Otherwise candidates are the caller's preference
/// (if any) followed by the default priority order, so an unsupported
/// preference falls back rather than failing. The first pass requires
/// video plus audio when `needs_audio`; if it exhausts every candidate,
/// a second pass retries with audio dropped, exporting silent video
/// rather than failing. Returns `None` only when no candidate yields
/// even a video codec.
pub fn negotiate<C>(
    caps: &C,
    size: Size2D,
    needs_audio: bool,
    preference: Option<Container>,
) -> Option<NegotiatedFormat>
where
    C: EncoderCapabilities + ?Sized,
{
    if let Some(preferred) = preference {
        if preferred.is_audio_only() && needs_audio {
            if let Some(audio) = pick_audio(caps, preferred) {
                debug!(container = ?preferred, ?audio, "negotiated audio-only format");
                return Some(NegotiatedFormat {
                    container: preferred,
                    video_codec: None,
                    audio_codec: Some(audio),
                });
            }
        }
    }

    let mut candidates: Vec<Container> = Vec::new();
    if let Some(preferred) = preference {
        candidates.push(preferred);
    }
    for &c in DEFAULT_CANDIDATES {
        if !candidates.contains(&c) {
            candidates.push(c);
        }
    }

    // First pass: video, plus audio when the timeline has any
    if needs_audio {
        for &container in &candidates {
            let Some(video) = pick_video(caps, container, size) else {
                continue;
            };
            if let Some(audio) = pick_audio(caps, container) {
                debug!(?container, ?video, ?audio, "negotiated format");
                return Some(NegotiatedFormat {
                    container,
                    video_codec: Some(video),
                    audio_codec: Some(audio),
                });
            }
        }
    }

    // Second pass (or only pass when needs_audio is false): video alone
    for &container in &candidates {
        if let Some(video) = pick_video(caps, container, size) {
            debug!(?container, ?video, "negotiated silent format");
            return Some(NegotiatedFormat {
                container,
                video_codec: Some(video),
                audio_codec: None,
            });
        }
    }

    None
}

fn pick_video<C>(caps: &C, container: Container, size: Size2D) -> Option<VideoCodec>
where
    C: EncoderCapabilities + ?Sized,
{
    container
        .video_codecs()
        .iter()
        .copied()
        .find(|&codec| caps.can_encode_video(container, codec, size))
}

fn pick_audio<C>(caps: &C, container: Container) -> Option<AudioCodec>
where
    C: EncoderCapabilities + ?Sized,
{
    container
        .audio_codecs()
        .iter()
        .copied()
        .find(|&codec| {
            caps.can_encode_audio(container, codec, NEGOTIATION_SAMPLE_RATE, NEGOTIATION_CHANNELS)
        })
}

// =============================================================================
// Tests
// =============================================================================
