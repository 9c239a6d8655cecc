//! Static capability profile for the software codec stack.
//!
//! Mirrors what a plain ffmpeg-style software build encodes, so the
//! `negotiate` command answers without probing a real encoder.

use reelcut_core::core::{
    codec::{AudioCodec, Container, VideoCodec},
    media::EncoderCapabilities,
    Size2D,
};

/// 8K, the practical ceiling for software H.264/H.265 encodes here
const MAX_DIMENSION: u32 = 7680;

#[derive(Default)]
pub struct SoftwareProfile;

impl EncoderCapabilities for SoftwareProfile {
    fn can_encode_video(&self, container: Container, codec: VideoCodec, size: Size2D) -> bool {
        if size.width == 0 || size.height == 0 || size.width > MAX_DIMENSION || size.height > MAX_DIMENSION {
            return false;
        }
        matches!(
            (container, codec),
            (Container::Mp4, VideoCodec::H264 | VideoCodec::H265)
                | (Container::Webm, VideoCodec::Vp9)
                | (Container::Mov, VideoCodec::H264)
                | (Container::Mkv, VideoCodec::H264 | VideoCodec::H265 | VideoCodec::Vp9)
        )
    }

    fn can_encode_audio(
        &self,
        container: Container,
        codec: AudioCodec,
        sample_rate: u32,
        channels: u16,
    ) -> bool {
        if sample_rate == 0 || channels == 0 || channels > 8 {
            return false;
        }
        matches!(
            (container, codec),
            (Container::Mp4, AudioCodec::Aac)
                | (Container::Webm, AudioCodec::Opus)
                | (Container::Mov, AudioCodec::Aac)
                | (Container::Mkv, AudioCodec::Aac | AudioCodec::Opus)
                | (Container::Wav, AudioCodec::Pcm)
                | (Container::Aac, AudioCodec::Aac)
                | (Container::Mp3, AudioCodec::Mp3)
        )
    }
}
