//! Layout math: waveform width, canvas tiling, scroll targets.

use serde::{Deserialize, Serialize};
use std::ops::Range;
use waveview_gesture::ScrollState;

/// Widest canvas the compositor creates, in device px.
pub const MAX_CANVAS_WIDTH: f64 = 8000.0;

/// Gap kept between the progress point and the viewport edge while dragging.
pub const DRAG_EDGE_GAP: f64 = 30.0;

/// Largest step of the auto-center nudge per progress update, in px.
pub const AUTO_CENTER_STEP: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveformDimensions {
    /// Full waveform width in CSS px.
    pub width: f64,
    pub is_scrollable: bool,
}

/// Width of the waveform for `duration` seconds at `min_px_per_sec`.
///
/// The waveform scrolls when it is wider than the container. When it fits
/// and `fill_parent` is set it stretches to the container width.
pub fn calculate_waveform_dimensions(
    duration: f64,
    min_px_per_sec: f64,
    container_width: f64,
    fill_parent: bool,
) -> WaveformDimensions {
    let raw = (duration.max(0.0) * min_px_per_sec.max(0.0)).ceil();
    let raw = if raw.is_finite() { raw } else { 0.0 };
    let is_scrollable = raw > container_width;
    let width = if fill_parent && !is_scrollable {
        container_width
    } else {
        raw
    };
    WaveformDimensions { width, is_scrollable }
}

/// A horizontal span of the waveform painted by one canvas, in device px.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileSpan {
    pub index: usize,
    pub offset: f64,
    pub width: f64,
}

impl TileSpan {
    /// Sample range of a channel of `len` samples that this tile covers.
    pub fn sample_range(&self, total_width: f64, len: usize) -> Range<usize> {
        if total_width <= 0.0 {
            return 0..0;
        }
        let at = |px: f64| ((px / total_width * len as f64).floor() as usize).min(len);
        at(self.offset)..at(self.offset + self.width)
    }
}

/// Partition `total_width` into tiles of at most `max_tile_width`. In bar
/// mode the tile width is rounded down to whole bar spacings so no bar is
/// split across two canvases.
pub fn plan_tiles(total_width: f64, max_tile_width: f64, bar_spacing: Option<f64>) -> Vec<TileSpan> {
    if total_width <= 0.0 {
        return Vec::new();
    }
    let mut tile_width = max_tile_width.min(total_width).max(1.0);
    if let Some(spacing) = bar_spacing.filter(|s| *s > 0.0) {
        if tile_width % spacing != 0.0 {
            tile_width = ((tile_width / spacing).floor() * spacing).max(spacing);
        }
    }
    let count = (total_width / tile_width).ceil() as usize;
    (0..count)
        .map(|index| {
            let offset = index as f64 * tile_width;
            TileSpan {
                index,
                offset,
                width: tile_width.min(total_width - offset),
            }
        })
        .filter(|tile| tile.width > 0.0)
        .collect()
}

/// Tiles worth painting for the current scroll position: the tile under the
/// viewport start and its neighbours.
pub fn visible_tiles(scroll_left: f64, total_width: f64, count: usize) -> Range<usize> {
    if count == 0 || total_width <= 0.0 {
        return 0..0;
    }
    let position = (scroll_left / total_width).clamp(0.0, 1.0);
    let current = ((position * count as f64).floor() as usize).min(count - 1);
    current.saturating_sub(1)..(current + 2).min(count)
}

/// Where auto-scroll should move the viewport for `progress`.
///
/// While dragging, the viewport is nudged by [`DRAG_EDGE_GAP`] when the
/// progress point gets that close to an edge. Otherwise it jumps when the
/// point leaves the viewport (centring it with `auto_center`), and during
/// playback with `auto_center` it creeps toward keeping the point centred.
pub fn auto_scroll_target(
    progress: f64,
    scroll: &ScrollState,
    auto_center: bool,
    is_dragging: bool,
    is_playing: bool,
) -> f64 {
    let progress_width = progress * scroll.scroll_width;
    let start_edge = scroll.scroll_left;
    let end_edge = scroll.scroll_right();
    let middle = scroll.client_width / 2.0;
    let mut target = scroll.scroll_left;

    if is_dragging {
        if progress_width + DRAG_EDGE_GAP > end_edge {
            target += DRAG_EDGE_GAP;
        } else if progress_width - DRAG_EDGE_GAP < start_edge {
            target -= DRAG_EDGE_GAP;
        }
    } else {
        if progress_width < start_edge || progress_width > end_edge {
            target = progress_width - if auto_center { middle } else { 0.0 };
        }
        let center = progress_width - scroll.scroll_left - middle;
        if is_playing && auto_center && center > 0.0 {
            target += center.min(AUTO_CENTER_STEP);
        }
    }
    scroll.with_scroll_left(target).scroll_left
}

/// Scroll offset after a zoom from `old_width` to `new_width` that keeps the
/// same time under the anchor: the progress cursor when it is on screen,
/// otherwise the left edge of the viewport.
pub fn zoom_scroll_anchor(
    progress: f64,
    old_scroll_left: f64,
    old_width: f64,
    new_width: f64,
    client_width: f64,
) -> f64 {
    let cursor = progress * old_width;
    let target = if cursor >= old_scroll_left && cursor <= old_scroll_left + client_width {
        progress * new_width - (cursor - old_scroll_left)
    } else if old_width > 0.0 {
        old_scroll_left / old_width * new_width
    } else {
        0.0
    };
    ScrollState::new(0.0, new_width, client_width)
        .with_scroll_left(target)
        .scroll_left
}
