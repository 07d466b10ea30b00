//! Renderer configuration.

use crate::bars::{BarAlign, BarOptions};
use crate::color::ColorSpec;
use serde::{Deserialize, Serialize};
use waveview_core::Result;

/// Per-channel overrides when channels are split into tracks.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelStyle {
    pub wave_color: Option<ColorSpec>,
    pub progress_color: Option<ColorSpec>,
    /// Track height in CSS px.
    pub height: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererOptions {
    /// Track height in CSS px.
    pub height: f64,
    pub wave_color: ColorSpec,
    pub progress_color: ColorSpec,
    /// Defaults to the progress colour.
    pub cursor_color: Option<String>,
    pub cursor_width: f64,
    pub bar_width: Option<f64>,
    pub bar_gap: Option<f64>,
    pub bar_radius: Option<f64>,
    /// Vertical scale of the amplitudes.
    pub bar_height: f64,
    pub bar_align: BarAlign,
    pub min_px_per_sec: f64,
    pub fill_parent: bool,
    pub auto_scroll: bool,
    pub auto_center: bool,
    pub hide_scrollbar: bool,
    pub normalize: bool,
    pub split_channels: Option<Vec<ChannelStyle>>,
    pub drag_to_seek: bool,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            height: 128.0,
            wave_color: ColorSpec::solid("#999"),
            progress_color: ColorSpec::solid("#555"),
            cursor_color: None,
            cursor_width: 1.0,
            bar_width: None,
            bar_gap: None,
            bar_radius: None,
            bar_height: 1.0,
            bar_align: BarAlign::Center,
            min_px_per_sec: 0.0,
            fill_parent: true,
            auto_scroll: true,
            auto_center: true,
            hide_scrollbar: false,
            normalize: false,
            split_channels: None,
            drag_to_seek: false,
        }
    }
}

impl RendererOptions {
    pub fn bars(&self) -> BarOptions {
        BarOptions {
            width: self.bar_width,
            gap: self.bar_gap,
            radius: self.bar_radius,
            align: self.bar_align,
        }
    }

    /// Fail on colour settings that cannot be painted.
    pub fn validate(&self) -> Result<()> {
        self.wave_color.validate()?;
        self.progress_color.validate()?;
        for style in self.split_channels.iter().flatten() {
            if let Some(color) = &style.wave_color {
                color.validate()?;
            }
            if let Some(color) = &style.progress_color {
                color.validate()?;
            }
        }
        Ok(())
    }

    /// Cursor colour: explicit, else the first progress colour.
    pub fn cursor_color(&self) -> String {
        match (&self.cursor_color, &self.progress_color) {
            (Some(color), _) => color.clone(),
            (None, ColorSpec::Solid(color)) => color.clone(),
            (None, ColorSpec::Gradient(stops)) => stops.first().cloned().unwrap_or_default(),
        }
    }
}
