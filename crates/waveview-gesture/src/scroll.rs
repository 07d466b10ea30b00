//! Scroll position of the waveform viewport.

use crate::pointer::ratio;
use serde::{Deserialize, Serialize};

/// Horizontal scroll geometry of a scroll container, in CSS px.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrollState {
    pub scroll_left: f64,
    /// Full scrollable width of the content.
    pub scroll_width: f64,
    /// Width of the visible viewport.
    pub client_width: f64,
}

impl ScrollState {
    pub fn new(scroll_left: f64, scroll_width: f64, client_width: f64) -> Self {
        Self {
            scroll_left,
            scroll_width,
            client_width,
        }
    }

    /// Furthest the viewport can scroll.
    pub fn max_scroll(&self) -> f64 {
        (self.scroll_width - self.client_width).max(0.0)
    }

    pub fn is_scrollable(&self) -> bool {
        self.scroll_width > self.client_width
    }

    /// Same geometry with `scroll_left` clamped into range.
    pub fn with_scroll_left(&self, scroll_left: f64) -> Self {
        Self {
            scroll_left: scroll_left.clamp(0.0, self.max_scroll()),
            ..*self
        }
    }

    pub fn scroll_right(&self) -> f64 {
        self.scroll_left + self.client_width
    }

    /// Visible start as a ratio of the full width.
    pub fn start_ratio(&self) -> f64 {
        ratio(self.scroll_left, self.scroll_width)
    }

    /// Visible end as a ratio of the full width.
    pub fn end_ratio(&self) -> f64 {
        ratio(self.scroll_right(), self.scroll_width)
    }

    /// Visible window in seconds for media of `duration`.
    pub fn visible_time_range(&self, duration: f64) -> (f64, f64) {
        (self.start_ratio() * duration, self.end_ratio() * duration)
    }
}
