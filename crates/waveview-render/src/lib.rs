//! Waveform rendering for waveview.
//!
//! Geometry ([`path`], [`bars`], [`layout`]) is pure and canvas-free; the
//! paint layer ([`waveform`]) issues [`Canvas2d`] calls; the [`Renderer`]
//! composites tiles on a [`RenderSurface`] and tracks progress and scroll.

pub mod bars;
pub mod canvas;
pub mod color;
pub mod layout;
pub mod options;
pub mod path;
pub mod peaks;
pub mod renderer;
pub mod surface;
pub mod waveform;

pub use bars::{compute_bar_segments, BarAlign, BarLayout, BarOptions, BarSegment};
pub use canvas::{trace_rounded_rect, Canvas2d, CanvasTile, DrawCommand, ImageBlob, RecordingCanvas};
pub use color::{ColorSpec, ColorStop, FillStyle, LinearGradient};
pub use layout::{
    auto_scroll_target, calculate_waveform_dimensions, plan_tiles, visible_tiles, zoom_scroll_anchor, TileSpan,
    WaveformDimensions, MAX_CANVAS_WIDTH,
};
pub use options::{ChannelStyle, RendererOptions};
pub use path::{build_waveform_path, build_waveform_path_data, generate_channel_path, PathCommand, WaveformPath};
pub use peaks::{downsample, export_peaks, ExportPeaksOptions, MinMax};
pub use renderer::{ExportFormat, ExportedImage, Renderer, RendererEvent, RESIZE_DEBOUNCE};
pub use surface::{
    Container, CursorStyle, HeadlessHost, HeadlessSurface, HeadlessTile, RenderSurface, SurfaceHost, TileLayer,
    TileSnapshot, TileSpec, WrapperWidth,
};
pub use waveform::{
    render_bar_waveform, render_line_waveform, render_to_canvas, render_waveform_with_channel_data,
    WaveformRenderOptions,
};
