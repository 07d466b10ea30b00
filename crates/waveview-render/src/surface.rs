//! Render surfaces: the element scaffolding the compositor paints into.
//!
//! A surface is a scroll container holding a wrapper as wide as the whole
//! waveform, with wave canvases, a progress overlay and a cursor inside it.
//! [`HeadlessSurface`] keeps all of it in memory for tests and servers.

use crate::canvas::{Canvas2d, CanvasTile, DrawCommand, ImageBlob, RecordingCanvas};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use waveview_core::{Result, WaveviewError};
use waveview_gesture::{ElementRect, ScrollState};

/// Where to mount a waveform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Container {
    /// A CSS selector resolved by the host.
    Selector(String),
    /// An element handle the host already holds.
    Element(u64),
}

impl std::fmt::Display for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Container::Selector(selector) => write!(f, "{selector}"),
            Container::Element(id) => write!(f, "element #{id}"),
        }
    }
}

impl From<&str> for Container {
    fn from(selector: &str) -> Self {
        Container::Selector(selector.to_string())
    }
}

/// Which canvas stack a tile belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TileLayer {
    Wave,
    Progress,
}

/// Placement of a canvas tile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileSpec {
    pub layer: TileLayer,
    /// Channel track, 0 unless channels are split.
    pub track: usize,
    pub index: usize,
    /// Left edge in CSS px.
    pub left: f64,
    /// Top edge of the track in CSS px.
    pub top: f64,
    pub css_width: f64,
    pub css_height: f64,
    pub pixel_width: u32,
    pub pixel_height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorStyle {
    pub color: String,
    pub width: f64,
}

/// Width of the wrapper holding the canvases.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WrapperWidth {
    /// As wide as the scroll container.
    Fill,
    Px(f64),
}

/// The element scaffolding of one mounted waveform.
pub trait RenderSurface: Send {
    /// Client width of the scroll container in CSS px.
    fn container_width(&self) -> f64;

    fn pixel_ratio(&self) -> f64;

    fn scroll(&self) -> ScrollState;

    /// Set the scroll offset; clamped to the scrollable range.
    fn set_scroll_left(&mut self, scroll_left: f64);

    fn set_wrapper_width(&mut self, width: WrapperWidth);

    fn set_scrollable(&mut self, scrollable: bool, hide_scrollbar: bool);

    fn set_height(&mut self, height: f64);

    /// Bounds of the wrapper in client coordinates.
    fn wrapper_rect(&self) -> ElementRect;

    fn create_tile(&mut self, spec: TileSpec) -> Box<dyn CanvasTile>;

    /// Remove every canvas.
    fn clear_tiles(&mut self);

    /// Reveal the progress overlay up to `ratio` of the wrapper and hide the
    /// wave canvases below it.
    fn set_progress(&mut self, ratio: f64);

    /// Place the cursor at `ratio`, shifted left by `offset` px.
    fn set_cursor(&mut self, ratio: f64, offset: f64, style: Option<&CursorStyle>);

    /// Detach the scaffolding from the container.
    fn unmount(&mut self);
}

/// Resolves containers and builds surfaces in them.
pub trait SurfaceHost: Send + Sync {
    fn mount(&self, container: &Container) -> Result<Box<dyn RenderSurface>>;
}

#[derive(Debug)]
struct TileRecord {
    spec: TileSpec,
    canvas: Arc<Mutex<RecordingCanvas>>,
}

#[derive(Debug)]
struct HeadlessState {
    container_width: f64,
    pixel_ratio: f64,
    origin: (f64, f64),
    scroll_left: f64,
    wrapper_width: WrapperWidth,
    scrollable: bool,
    hide_scrollbar: bool,
    height: f64,
    tiles: Vec<TileRecord>,
    progress: f64,
    cursor: Option<(f64, f64, Option<CursorStyle>)>,
    mounted: bool,
}

impl HeadlessState {
    fn scroll_width(&self) -> f64 {
        match self.wrapper_width {
            WrapperWidth::Fill => self.container_width,
            WrapperWidth::Px(width) => width.max(self.container_width),
        }
    }

    fn scroll_state(&self) -> ScrollState {
        ScrollState::new(self.scroll_left, self.scroll_width(), self.container_width)
    }
}

/// In-memory render surface. Clones share state, so a test can keep one
/// handle for inspection while the renderer owns another.
#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    state: Arc<Mutex<HeadlessState>>,
}

/// Snapshot of one tile of a [`HeadlessSurface`].
#[derive(Debug, Clone, PartialEq)]
pub struct TileSnapshot {
    pub spec: TileSpec,
    pub commands: Vec<DrawCommand>,
}

impl HeadlessSurface {
    pub fn new(container_width: f64, pixel_ratio: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(HeadlessState {
                container_width,
                pixel_ratio: if pixel_ratio > 0.0 { pixel_ratio } else { 1.0 },
                origin: (0.0, 0.0),
                scroll_left: 0.0,
                wrapper_width: WrapperWidth::Fill,
                scrollable: false,
                hide_scrollbar: false,
                height: 0.0,
                tiles: Vec::new(),
                progress: 0.0,
                cursor: None,
                mounted: true,
            })),
        }
    }

    /// Place the container at `(left, top)` in client coordinates.
    pub fn with_origin(self, left: f64, top: f64) -> Self {
        self.state.lock().origin = (left, top);
        self
    }

    /// Simulate the container being resized by layout.
    pub fn resize_container(&self, width: f64) {
        self.state.lock().container_width = width;
    }

    pub fn scroll_left(&self) -> f64 {
        self.state.lock().scroll_left
    }

    pub fn wrapper_width(&self) -> WrapperWidth {
        self.state.lock().wrapper_width
    }

    pub fn is_scrollable(&self) -> bool {
        self.state.lock().scrollable
    }

    pub fn hides_scrollbar(&self) -> bool {
        self.state.lock().hide_scrollbar
    }

    pub fn height(&self) -> f64 {
        self.state.lock().height
    }

    pub fn progress(&self) -> f64 {
        self.state.lock().progress
    }

    /// Cursor ratio and pixel offset, once placed.
    pub fn cursor(&self) -> Option<(f64, f64)> {
        self.state.lock().cursor.as_ref().map(|(ratio, offset, _)| (*ratio, *offset))
    }

    pub fn is_mounted(&self) -> bool {
        self.state.lock().mounted
    }

    pub fn tile_count(&self, layer: TileLayer) -> usize {
        self.state.lock().tiles.iter().filter(|t| t.spec.layer == layer).count()
    }

    /// Tiles of one layer, ordered by track then left edge.
    pub fn tiles(&self, layer: TileLayer) -> Vec<TileSnapshot> {
        let state = self.state.lock();
        let mut tiles: Vec<TileSnapshot> = state
            .tiles
            .iter()
            .filter(|t| t.spec.layer == layer)
            .map(|t| TileSnapshot {
                spec: t.spec,
                commands: t.canvas.lock().commands().to_vec(),
            })
            .collect();
        tiles.sort_by(|a, b| (a.spec.track, a.spec.index).cmp(&(b.spec.track, b.spec.index)));
        tiles
    }
}

impl RenderSurface for HeadlessSurface {
    fn container_width(&self) -> f64 {
        self.state.lock().container_width
    }

    fn pixel_ratio(&self) -> f64 {
        self.state.lock().pixel_ratio
    }

    fn scroll(&self) -> ScrollState {
        self.state.lock().scroll_state()
    }

    fn set_scroll_left(&mut self, scroll_left: f64) {
        let mut state = self.state.lock();
        state.scroll_left = state.scroll_state().with_scroll_left(scroll_left).scroll_left;
    }

    fn set_wrapper_width(&mut self, width: WrapperWidth) {
        let mut state = self.state.lock();
        state.wrapper_width = width;
        state.scroll_left = state.scroll_state().with_scroll_left(state.scroll_left).scroll_left;
    }

    fn set_scrollable(&mut self, scrollable: bool, hide_scrollbar: bool) {
        let mut state = self.state.lock();
        state.scrollable = scrollable;
        state.hide_scrollbar = hide_scrollbar;
    }

    fn set_height(&mut self, height: f64) {
        self.state.lock().height = height;
    }

    fn wrapper_rect(&self) -> ElementRect {
        let state = self.state.lock();
        ElementRect::new(
            state.origin.0 - state.scroll_left,
            state.origin.1,
            state.scroll_width(),
            state.height,
        )
    }

    fn create_tile(&mut self, spec: TileSpec) -> Box<dyn CanvasTile> {
        let canvas = Arc::new(Mutex::new(RecordingCanvas::new(
            f64::from(spec.pixel_width),
            f64::from(spec.pixel_height),
        )));
        self.state.lock().tiles.push(TileRecord {
            spec,
            canvas: Arc::clone(&canvas),
        });
        Box::new(HeadlessTile { spec, canvas })
    }

    fn clear_tiles(&mut self) {
        self.state.lock().tiles.clear();
    }

    fn set_progress(&mut self, ratio: f64) {
        self.state.lock().progress = ratio;
    }

    fn set_cursor(&mut self, ratio: f64, offset: f64, style: Option<&CursorStyle>) {
        self.state.lock().cursor = Some((ratio, offset, style.cloned()));
    }

    fn unmount(&mut self) {
        let mut state = self.state.lock();
        state.tiles.clear();
        state.mounted = false;
    }
}

/// Canvas of a [`HeadlessSurface`]: a recorded display list.
///
/// Exports carry the display list rather than pixels: blobs hold it as
/// JSON and data URLs describe the tile.
#[derive(Debug)]
pub struct HeadlessTile {
    spec: TileSpec,
    canvas: Arc<Mutex<RecordingCanvas>>,
}

impl CanvasTile for HeadlessTile {
    fn size(&self) -> (u32, u32) {
        (self.spec.pixel_width, self.spec.pixel_height)
    }

    fn paint(&mut self, paint: &mut dyn FnMut(&mut dyn Canvas2d)) {
        let mut canvas = self.canvas.lock();
        paint(&mut *canvas);
    }

    fn to_data_url(&self, mime_type: &str, _quality: f64) -> Result<String> {
        let commands = self.canvas.lock().commands().len();
        Ok(format!(
            "data:{mime_type};headless,track={};tile={};size={}x{};commands={commands}",
            self.spec.track, self.spec.index, self.spec.pixel_width, self.spec.pixel_height
        ))
    }

    fn to_blob(&self, mime_type: &str, _quality: f64) -> Result<ImageBlob> {
        let bytes = serde_json::to_vec(self.canvas.lock().commands())?;
        Ok(ImageBlob {
            mime_type: mime_type.to_string(),
            bytes,
        })
    }
}

/// Container registry for headless rendering.
#[derive(Debug, Clone, Default)]
pub struct HeadlessHost {
    containers: Arc<Mutex<HashMap<Container, HeadlessSurface>>>,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `surface` under `container`.
    pub fn with_container(self, container: impl Into<Container>, surface: HeadlessSurface) -> Self {
        self.insert(container, surface);
        self
    }

    pub fn insert(&self, container: impl Into<Container>, surface: HeadlessSurface) {
        self.containers.lock().insert(container.into(), surface);
    }

    pub fn surface(&self, container: &Container) -> Option<HeadlessSurface> {
        self.containers.lock().get(container).cloned()
    }
}

impl SurfaceHost for HeadlessHost {
    fn mount(&self, container: &Container) -> Result<Box<dyn RenderSurface>> {
        let surface = self
            .surface(container)
            .ok_or_else(|| WaveviewError::ContainerNotFound(container.to_string()))?;
        surface.state.lock().mounted = true;
        Ok(Box::new(surface))
    }
}
