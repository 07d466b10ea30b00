//! Instance configuration and its layering.
//!
//! Precedence is `Default` < constructor options < `OptionsPatch`; patches
//! are merged with [`OptionsPatch::apply`] and nowhere else.

use crate::fetcher::FetchParams;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use waveview_core::{Peaks, Result};
use waveview_media::PlayerOptions;
use waveview_render::{BarAlign, ChannelStyle, ColorSpec, RendererOptions};

/// Seek while dragging across the waveform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragToSeek {
    #[default]
    Off,
    /// Seek 200 ms after the pointer rests.
    On,
    /// Seek after the given number of milliseconds.
    Debounced(u64),
}

impl DragToSeek {
    pub fn is_enabled(self) -> bool {
        self != DragToSeek::Off
    }

    /// Delay before a drag turns into a seek. Playing media seeks at once.
    pub fn debounce(self, is_playing: bool) -> Option<Duration> {
        match self {
            DragToSeek::Off => None,
            _ if is_playing => Some(Duration::ZERO),
            DragToSeek::On => Some(Duration::from_millis(200)),
            DragToSeek::Debounced(ms) => Some(Duration::from_millis(ms)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveSurferOptions {
    /// Height of the waveform in CSS px.
    pub height: f64,
    pub wave_color: ColorSpec,
    pub progress_color: ColorSpec,
    pub cursor_color: Option<String>,
    pub cursor_width: f64,
    pub bar_width: Option<f64>,
    pub bar_gap: Option<f64>,
    pub bar_radius: Option<f64>,
    /// Vertical scale of the waveform.
    pub bar_height: f64,
    pub bar_align: BarAlign,
    /// Minimum pixels per second of audio (zoom).
    pub min_px_per_sec: f64,
    pub fill_parent: bool,
    /// Clicks and drags seek.
    pub interact: bool,
    pub drag_to_seek: DragToSeek,
    pub auto_scroll: bool,
    pub auto_center: bool,
    pub hide_scrollbar: bool,
    /// Decoding sample rate.
    pub sample_rate: f64,
    pub normalize: bool,
    /// Render each channel as its own track.
    pub split_channels: Option<Vec<ChannelStyle>>,
    /// Playback speed.
    pub audio_rate: f64,
    pub autoplay: bool,
    pub media_controls: bool,
    /// Loaded on creation.
    pub url: Option<String>,
    /// Pre-decoded peaks, rendered instead of decoding the audio.
    pub peaks: Option<Peaks>,
    /// Duration for `peaks`, in seconds.
    pub duration: Option<f64>,
    /// Override the MIME type of fetched audio.
    pub blob_mime_type: Option<String>,
    pub fetch_params: FetchParams,
}

impl Default for WaveSurferOptions {
    fn default() -> Self {
        let renderer = RendererOptions::default();
        Self {
            height: renderer.height,
            wave_color: renderer.wave_color,
            progress_color: renderer.progress_color,
            cursor_color: None,
            cursor_width: renderer.cursor_width,
            bar_width: None,
            bar_gap: None,
            bar_radius: None,
            bar_height: renderer.bar_height,
            bar_align: BarAlign::Center,
            min_px_per_sec: 0.0,
            fill_parent: true,
            interact: true,
            drag_to_seek: DragToSeek::Off,
            auto_scroll: true,
            auto_center: true,
            hide_scrollbar: false,
            sample_rate: 8000.0,
            normalize: false,
            split_channels: None,
            audio_rate: 1.0,
            autoplay: false,
            media_controls: false,
            url: None,
            peaks: None,
            duration: None,
            blob_mime_type: None,
            fetch_params: FetchParams::default(),
        }
    }
}

impl WaveSurferOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn player_options(&self) -> PlayerOptions {
        PlayerOptions {
            media_controls: self.media_controls,
            autoplay: self.autoplay,
            playback_rate: self.audio_rate,
        }
    }
}

impl From<&WaveSurferOptions> for RendererOptions {
    fn from(options: &WaveSurferOptions) -> Self {
        RendererOptions {
            height: options.height,
            wave_color: options.wave_color.clone(),
            progress_color: options.progress_color.clone(),
            cursor_color: options.cursor_color.clone(),
            cursor_width: options.cursor_width,
            bar_width: options.bar_width,
            bar_gap: options.bar_gap,
            bar_radius: options.bar_radius,
            bar_height: options.bar_height,
            bar_align: options.bar_align,
            min_px_per_sec: options.min_px_per_sec,
            fill_parent: options.fill_parent,
            auto_scroll: options.auto_scroll,
            auto_center: options.auto_center,
            hide_scrollbar: options.hide_scrollbar,
            normalize: options.normalize,
            split_channels: options.split_channels.clone(),
            drag_to_seek: options.drag_to_seek.is_enabled(),
        }
    }
}

/// `null` in JSON clears the field, absence leaves it alone.
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A partial update. `None` keeps the current value; for optional settings
/// `Some(None)` clears them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsPatch {
    pub height: Option<f64>,
    pub wave_color: Option<ColorSpec>,
    pub progress_color: Option<ColorSpec>,
    #[serde(deserialize_with = "nullable")]
    pub cursor_color: Option<Option<String>>,
    pub cursor_width: Option<f64>,
    #[serde(deserialize_with = "nullable")]
    pub bar_width: Option<Option<f64>>,
    #[serde(deserialize_with = "nullable")]
    pub bar_gap: Option<Option<f64>>,
    #[serde(deserialize_with = "nullable")]
    pub bar_radius: Option<Option<f64>>,
    pub bar_height: Option<f64>,
    pub bar_align: Option<BarAlign>,
    pub min_px_per_sec: Option<f64>,
    pub fill_parent: Option<bool>,
    pub interact: Option<bool>,
    pub drag_to_seek: Option<DragToSeek>,
    pub auto_scroll: Option<bool>,
    pub auto_center: Option<bool>,
    pub hide_scrollbar: Option<bool>,
    pub sample_rate: Option<f64>,
    pub normalize: Option<bool>,
    #[serde(deserialize_with = "nullable")]
    pub split_channels: Option<Option<Vec<ChannelStyle>>>,
    pub audio_rate: Option<f64>,
    pub media_controls: Option<bool>,
    pub peaks: Option<Peaks>,
    pub duration: Option<f64>,
    #[serde(deserialize_with = "nullable")]
    pub blob_mime_type: Option<Option<String>>,
}

macro_rules! merge {
    ($patch:ident, $options:ident: $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $patch.$field.clone() {
                $options.$field = value;
            }
        )+
    };
}

impl OptionsPatch {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Merge into `options`.
    pub fn apply(&self, options: &mut WaveSurferOptions) {
        merge!(self, options:
            height, wave_color, progress_color, cursor_color, cursor_width,
            bar_width, bar_gap, bar_radius, bar_height, bar_align,
            min_px_per_sec, fill_parent, interact, drag_to_seek,
            auto_scroll, auto_center, hide_scrollbar, sample_rate, normalize,
            split_channels, audio_rate, media_controls, blob_mime_type,
        );
        if let Some(peaks) = &self.peaks {
            options.peaks = Some(peaks.clone());
        }
        if let Some(duration) = self.duration {
            options.duration = Some(duration);
        }
    }
}
