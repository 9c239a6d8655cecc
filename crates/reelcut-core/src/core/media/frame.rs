//! Frame and sample buffer value types exchanged with collaborators.

use serde::{Deserialize, Serialize};

use crate::core::{Size2D, TimeSec};

// =============================================================================
// Video Frame
// =============================================================================

/// One rasterized output frame (interleaved RGBA8)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoFrame {
    pub size: Size2D,
    /// Interleaved RGBA bytes, `size.width * size.height * 4` long
    pub data: Vec<u8>,
}

impl VideoFrame {
    /// Allocates a zeroed frame of the given size
    pub fn new(size: Size2D) -> Self {
        let len = size.width as usize * size.height as usize * 4;
        Self {
            size,
            data: vec![0; len],
        }
    }
}

// =============================================================================
// Mixdown Buffer
// =============================================================================

/// Single interleaved PCM buffer spanning the whole timeline.
///
/// `frames = ceil(duration * sample_rate)`; the sample vector holds
/// `frames * channels` interleaved f32 samples.
#[derive(Clone, Debug, PartialEq)]
pub struct MixdownBuffer {
    pub sample_rate: u32,
    pub channels: u16,
    /// Interleaved f32 samples
    pub samples: Vec<f32>,
}

impl MixdownBuffer {
    /// Allocates a silent buffer covering `duration_sec`
    pub fn new(duration_sec: TimeSec, sample_rate: u32, channels: u16) -> Self {
        let frames = (duration_sec * sample_rate as f64).ceil() as usize;
        Self {
            sample_rate,
            channels,
            samples: vec![0.0; frames * channels as usize],
        }
    }

    /// Number of audio frames (sample groups across all channels)
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Buffer duration in seconds
    pub fn duration_sec(&self) -> TimeSec {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Adds interleaved samples starting at `offset_frames`, linear sum.
    ///
    /// Samples falling past the end of the buffer are discarded; negative
    /// offsets drop the leading portion of the input. Returns the number
    /// of frames actually mixed in.
    pub fn add_samples(&mut self, offset_frames: i64, input: &[f32]) -> usize {
        let ch = self.channels as usize;
        if ch == 0 || input.is_empty() {
            return 0;
        }
        let input_frames = input.len() / ch;
        let total_frames = self.frames() as i64;

        let first = offset_frames.max(0);
        let skip_input = (first - offset_frames) as usize;
        let last = (offset_frames + input_frames as i64).min(total_frames);
        if first >= last {
            return 0;
        }

        let mixed = (last - first) as usize;
        for f in 0..mixed {
            let dst = (first as usize + f) * ch;
            let src = (skip_input + f) * ch;
            for c in 0..ch {
                self.samples[dst + c] += input[src + c];
            }
        }
        mixed
    }
}

// =============================================================================
// Encoded Output
// =============================================================================

/// Final muxed artifact handed back to the caller
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedOutput {
    /// Container bytes
    pub bytes: Vec<u8>,
    /// Suggested output file name (base + container extension)
    pub suggested_file_name: String,
    /// MIME type derived from the negotiated container
    pub mime_type: String,
}
