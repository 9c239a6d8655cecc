//! Timeline audio mixdown.
//!
//! Every audible clip is decoded for its trim window and summed into a
//! single interleaved buffer covering the whole timeline. Audio is
//! scheduled at 1x source speed: a retimed clip keeps its original
//! pitch and tempo, only video timestamps follow the speed factor.

use futures::future::join_all;
use tracing::{debug, warn};

use crate::core::{
    media::{MediaError, MixdownBuffer, SourceMap},
    timeline::{Clip, Sequence},
    TimeRange,
};

/// One clip scheduled into the mix
struct ScheduledClip<'a> {
    clip: &'a Clip,
    asset_id: &'a str,
}

/// Mixes the sequence's audio into one interleaved PCM buffer.
///
/// Tracks that are hidden or muted contribute nothing, as do clips whose
/// medium carries no audio or whose loaded source exposes no audio
/// stream. Returns `None` when nothing is scheduled, so the caller can
/// negotiate a silent export. A clip whose decode fails is logged and
/// skipped; the rest of the mix is unaffected.
pub async fn mix_sequence_audio(
    sequence: &Sequence,
    sources: &SourceMap,
    sample_rate: u32,
    channels: u16,
) -> Option<MixdownBuffer> {
    let duration = sequence.duration();
    if duration <= 0.0 {
        return None;
    }

    let scheduled: Vec<ScheduledClip<'_>> = sequence
        .tracks
        .iter()
        .filter(|track| !track.hidden && !track.muted)
        .flat_map(|track| track.clips.iter())
        .filter(|clip| clip.kind.may_have_audio())
        .filter_map(|clip| {
            let asset_id = clip.asset_id.as_deref()?;
            let source = sources.get(asset_id)?;
            source.has_audio().then_some(ScheduledClip { clip, asset_id })
        })
        .collect();

    if scheduled.is_empty() {
        return None;
    }
    debug!(clips = scheduled.len(), duration, "mixing timeline audio");

    let mut buffer = MixdownBuffer::new(duration, sample_rate, channels);

    // Decode concurrently in bounded batches, then sum sequentially so
    // the mix is deterministic regardless of decode completion order.
    for batch in scheduled.chunks(num_cpus::get().max(1)) {
        let decodes = batch.iter().map(|entry| decode_clip(entry, sources, sample_rate, channels));
        for (entry, decoded) in batch.iter().zip(join_all(decodes).await) {
            match decoded {
                Ok(samples) => {
                    let offset = (entry.clip.place.timeline_in_sec * sample_rate as f64).round() as i64;
                    buffer.add_samples(offset, &samples);
                }
                Err(error) => {
                    warn!(
                        clip_id = %entry.clip.id,
                        asset_id = %entry.asset_id,
                        %error,
                        "skipping clip after audio decode failure"
                    );
                }
            }
        }
    }

    Some(buffer)
}

/// Decodes one clip's audible window at 1x source speed.
///
/// The window spans `place.duration` source seconds from `trim_start`,
/// capped at `trim_end` so a slowed-down clip never reads past its trim.
async fn decode_clip(
    entry: &ScheduledClip<'_>,
    sources: &SourceMap,
    sample_rate: u32,
    channels: u16,
) -> Result<Vec<f32>, MediaError> {
    let source = sources
        .get(entry.asset_id)
        .ok_or_else(|| MediaError::AudioDecode(format!("source not loaded: {}", entry.asset_id)))?;

    let start = entry.clip.range.trim_start_sec;
    let end = (start + entry.clip.place.duration_sec).min(entry.clip.range.trim_end_sec);
    if end <= start {
        return Ok(Vec::new());
    }

    source
        .decode_audio(TimeRange::new(start, end), sample_rate, channels)
        .await
}

// =============================================================================
// Tests
// =============================================================================
