//! Bar-mode geometry.

use serde::{Deserialize, Serialize};

/// Vertical placement of bars within the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarAlign {
    Top,
    Bottom,
    #[default]
    Center,
}

/// Bar options as configured, in CSS px.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BarOptions {
    pub width: Option<f64>,
    pub gap: Option<f64>,
    pub radius: Option<f64>,
    pub align: BarAlign,
}

impl BarOptions {
    /// Bars are drawn when a width or a gap is set.
    pub fn enabled(&self) -> bool {
        self.width.is_some() || self.gap.is_some()
    }

    /// `(bar_width, bar_gap)` in device px. Without an explicit gap, a set
    /// width implies a gap of half the width.
    pub fn device_metrics(&self, pixel_ratio: f64) -> (f64, f64) {
        let width = self.width.map_or(1.0, |w| w * pixel_ratio);
        let gap = match (self.gap, self.width) {
            (Some(gap), _) => gap * pixel_ratio,
            (None, Some(_)) => width / 2.0,
            (None, None) => 0.0,
        };
        (width, gap)
    }

    /// Distance between bar starts in device px.
    pub fn spacing(&self, pixel_ratio: f64) -> f64 {
        let (width, gap) = self.device_metrics(pixel_ratio);
        width + gap
    }
}

/// Geometry inputs for one canvas, in device px.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarLayout {
    pub width: f64,
    pub height: f64,
    pub v_scale: f64,
    pub bar_width: f64,
    pub bar_gap: f64,
    pub align: BarAlign,
}

/// One bar in canvas pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarSegment {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Reduce channel data to bars.
///
/// Samples are bucketed by bar index; each bar's upper lobe is the peak
/// magnitude of channel 0 and its lower lobe that of channel 1 (channel 0
/// again for mono). Every bar is at least 1 px tall.
pub fn compute_bar_segments(channels: &[&[f32]], layout: &BarLayout) -> Vec<BarSegment> {
    let Some(&top) = channels.first() else {
        return Vec::new();
    };
    let bottom = channels.get(1).copied().unwrap_or(top);
    let length = top.len();
    let spacing = layout.bar_width + layout.bar_gap;
    if length == 0 || spacing <= 0.0 || layout.width <= 0.0 {
        return Vec::new();
    }

    let half = layout.height / 2.0;
    let index_scale = layout.width / spacing / length as f64;
    let mut segments = Vec::with_capacity((layout.width / spacing).ceil() as usize);
    let (mut prev_x, mut max_top, mut max_bottom) = (0.0f64, 0.0f32, 0.0f32);

    for i in 0..=length {
        let x = (i as f64 * index_scale).round();
        if x > prev_x {
            let top_height = (f64::from(max_top) * half * layout.v_scale).round();
            let bottom_height = (f64::from(max_bottom) * half * layout.v_scale).round();
            let bar_height = match top_height + bottom_height {
                h if h > 0.0 => h,
                _ => 1.0,
            };
            let y = match layout.align {
                BarAlign::Top => 0.0,
                BarAlign::Bottom => layout.height - bar_height,
                BarAlign::Center => half - top_height,
            };
            segments.push(BarSegment {
                x: prev_x * spacing,
                y,
                width: layout.bar_width,
                height: bar_height,
            });
            prev_x = x;
            max_top = 0.0;
            max_bottom = 0.0;
        }
        max_top = max_top.max(top.get(i).map_or(0.0, |s| s.abs()));
        max_bottom = max_bottom.max(bottom.get(i).map_or(0.0, |s| s.abs()));
    }
    segments
}
