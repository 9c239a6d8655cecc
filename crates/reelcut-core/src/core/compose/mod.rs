//! Composition Module
//!
//! Turns one timeline instant into an ordered visual layer stack.
//! Preview and export both go through `build_composition`, so the
//! function is pure: identical inputs always produce identical layers.

use serde::{Deserialize, Serialize};

use crate::core::{
    media::SourceMap,
    timeline::{FilterSet, Sequence, Transform},
    ClipId, Size2D, TimeSec,
};

// =============================================================================
// Layer Types
// =============================================================================

/// How source pixels map onto the output canvas
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    /// Letterbox: scale to fit entirely inside the canvas
    #[default]
    Contain,
    /// Scale to fill the canvas, cropping overflow
    Cover,
    /// Stretch to the canvas, ignoring aspect ratio
    Fill,
}

/// Destination rectangle in output pixel coordinates
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One visual layer at one instant. Derived, never persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionLayer {
    pub clip_id: ClipId,
    /// Source timestamp to sample, clamped to the clip's trim window
    pub source_time_sec: TimeSec,
    pub transform: Transform,
    pub filters: FilterSet,
    pub dest: DestRect,
    /// Stacking order; track index 0 is the bottom layer
    pub z_order: usize,
}

// =============================================================================
// Builder
// =============================================================================

/// Computes the destination rectangle for a source of `source_size`
/// placed on `canvas` under `fit`, then applies the clip transform
/// (scale about the rect center, then translate).
pub fn fit_rect(source_size: Size2D, canvas: Size2D, fit: FitMode, transform: &Transform) -> DestRect {
    let cw = canvas.width as f64;
    let ch = canvas.height as f64;
    let sw = source_size.width.max(1) as f64;
    let sh = source_size.height.max(1) as f64;

    let (mut w, mut h) = match fit {
        FitMode::Fill => (cw, ch),
        FitMode::Contain => {
            let scale = (cw / sw).min(ch / sh);
            (sw * scale, sh * scale)
        }
        FitMode::Cover => {
            let scale = (cw / sw).max(ch / sh);
            (sw * scale, sh * scale)
        }
    };

    w *= transform.scale_x;
    h *= transform.scale_y;

    DestRect {
        x: (cw - w) / 2.0 + transform.x,
        y: (ch - h) / 2.0 + transform.y,
        width: w,
        height: h,
    }
}

/// Builds the visual layer stack for timeline instant `t`.
///
/// Walks tracks bottom to top (index 0 renders lowest). Each non-hidden
/// visual track contributes at most one layer: the clip covering `t`,
/// provided its asset has a loaded source. Clips without a loaded
/// source are skipped rather than rendered as placeholders.
pub fn build_composition(
    t: TimeSec,
    sequence: &Sequence,
    sources: &SourceMap,
    canvas: Size2D,
    fit: FitMode,
) -> Vec<CompositionLayer> {
    let mut layers = Vec::new();

    for (track_index, track) in sequence.tracks.iter().enumerate() {
        if track.hidden || !track.kind.is_visual() {
            continue;
        }
        let Some(clip) = track.clip_at(t) else {
            continue;
        };
        let Some(asset_id) = &clip.asset_id else {
            continue;
        };
        let Some(source) = sources.get(asset_id) else {
            continue;
        };

        let source_size = source.dimensions().unwrap_or(canvas);
        layers.push(CompositionLayer {
            clip_id: clip.id.clone(),
            source_time_sec: clip.source_time_at(t),
            transform: clip.transform,
            filters: clip.filters,
            dest: fit_rect(source_size, canvas, fit, &clip.transform),
            z_order: track_index,
        });
    }

    layers
}

// =============================================================================
// Tests
// =============================================================================
