//! The compositor: lays the waveform out over canvas tiles and keeps the
//! progress overlay, cursor and scroll position in step with playback.

use crate::canvas::{CanvasTile, ImageBlob};
use crate::color::ColorSpec;
use crate::layout::{
    auto_scroll_target, calculate_waveform_dimensions, plan_tiles, visible_tiles, zoom_scroll_anchor,
    TileSpan, MAX_CANVAS_WIDTH,
};
use crate::options::RendererOptions;
use crate::surface::{Container, CursorStyle, RenderSurface, SurfaceHost, TileLayer, TileSpec, WrapperWidth};
use crate::waveform::{render_waveform_with_channel_data, WaveformRenderOptions};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, warn};
use waveview_core::{
    clamp_ratio, DecodedAudio, HostLoop, RenderPriority, RenderScheduler, Result, Signal, Stream, Subject,
    Subscriptions, WaveviewError,
};
use waveview_gesture::{ratio, DragEvent, DragOptions, DragStream, PointerEvent, PointerEventKind, ScrollState};

/// Container resizes settle for this long before the waveform is redrawn.
pub const RESIZE_DEBOUNCE: Duration = Duration::from_millis(100);

/// Renderer notifications. Positions are ratios of the waveform width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RendererEvent {
    Click { x: f64, y: f64 },
    Dblclick { x: f64, y: f64 },
    DragStart { x: f64 },
    Drag { x: f64 },
    DragEnd { x: f64 },
    /// Visible window as ratios and as pixel offsets.
    Scroll { start: f64, end: f64, left: f64, right: f64 },
    Render,
    Rendered,
    Resize,
}

impl RendererEvent {
    fn scroll(scroll: &ScrollState) -> Self {
        RendererEvent::Scroll {
            start: scroll.start_ratio(),
            end: scroll.end_ratio(),
            left: scroll.scroll_left,
            right: scroll.scroll_right(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExportFormat {
    #[default]
    DataUrl,
    Blob,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportedImage {
    DataUrl(String),
    Blob(ImageBlob),
}

/// One horizontal band of the waveform: all channels, or one channel when
/// channels are split.
#[derive(Debug, Clone)]
struct Track {
    channels: Vec<usize>,
    top: f64,
    height: f64,
    wave_color: ColorSpec,
    progress_color: ColorSpec,
    v_scale: f64,
}

#[derive(Debug, Clone)]
struct Layout {
    /// Waveform width in CSS px.
    width: f64,
    is_scrollable: bool,
    pixel_ratio: f64,
    /// Waveform width in device px.
    total_pixels: f64,
    tiles: Vec<TileSpan>,
    tracks: Vec<Track>,
}

struct PaintedTile {
    wave: Box<dyn CanvasTile>,
    _progress: Box<dyn CanvasTile>,
}

struct RendererState {
    options: RendererOptions,
    surface: Box<dyn RenderSurface>,
    audio: Option<DecodedAudio>,
    layout: Option<Layout>,
    /// Keyed by (track, tile index) so iteration runs left to right.
    painted: BTreeMap<(usize, usize), PaintedTile>,
    is_dragging: bool,
    last_container_width: f64,
    destroyed: bool,
}

struct RendererInner {
    state: Mutex<RendererState>,
    scheduler: RenderScheduler,
    events: Subject<RendererEvent>,
    progress: Signal<f64>,
    resize: Subject<f64>,
    drag: DragStream,
    subscriptions: Mutex<Subscriptions>,
}

/// Waveform compositor bound to one mounted surface.
#[derive(Clone)]
pub struct Renderer {
    inner: Arc<RendererInner>,
}

fn build_tracks(options: &RendererOptions, audio: &DecodedAudio) -> Vec<Track> {
    let v_scale = |channels: &[usize]| {
        if !options.normalize {
            return options.bar_height;
        }
        let peak = channels
            .iter()
            .filter_map(|&c| audio.channels.channel(c))
            .flat_map(|samples| samples.iter())
            .fold(0.0f32, |peak, s| peak.max(s.abs()));
        if peak > 0.0 {
            options.bar_height / f64::from(peak)
        } else {
            options.bar_height
        }
    };

    match &options.split_channels {
        None => {
            let channels: Vec<usize> = (0..audio.num_channels()).collect();
            vec![Track {
                v_scale: v_scale(&channels),
                channels,
                top: 0.0,
                height: options.height,
                wave_color: options.wave_color.clone(),
                progress_color: options.progress_color.clone(),
            }]
        }
        Some(styles) => {
            let mut top = 0.0;
            (0..audio.num_channels())
                .map(|channel| {
                    let style = styles.get(channel);
                    let height = style.and_then(|s| s.height).unwrap_or(options.height);
                    let track = Track {
                        channels: vec![channel],
                        top,
                        height,
                        wave_color: style
                            .and_then(|s| s.wave_color.clone())
                            .unwrap_or_else(|| options.wave_color.clone()),
                        progress_color: style
                            .and_then(|s| s.progress_color.clone())
                            .unwrap_or_else(|| options.progress_color.clone()),
                        v_scale: v_scale(&[channel]),
                    };
                    top += height;
                    track
                })
                .collect()
        }
    }
}

fn paint_tile(
    surface: &mut dyn RenderSurface,
    layout: &Layout,
    options: &RendererOptions,
    audio: &DecodedAudio,
    track_index: usize,
    tile_index: usize,
) -> Result<PaintedTile> {
    let (Some(track), Some(span)) = (layout.tracks.get(track_index), layout.tiles.get(tile_index)) else {
        return Err(WaveviewError::Render(format!(
            "tile {tile_index} of track {track_index} is outside the layout"
        )));
    };
    let ratio = layout.pixel_ratio;
    let pixel_height = (track.height * ratio).round().max(1.0);
    let slices: Vec<&[f32]> = track
        .channels
        .iter()
        .filter_map(|&c| audio.channels.channel(c))
        .map(|samples| &samples[span.sample_range(layout.total_pixels, samples.len())])
        .collect();

    let mut paint_layer = |layer: TileLayer, color: &ColorSpec| -> Result<Box<dyn CanvasTile>> {
        let mut tile = surface.create_tile(TileSpec {
            layer,
            track: track_index,
            index: tile_index,
            left: span.offset / ratio,
            top: track.top,
            css_width: span.width / ratio,
            css_height: track.height,
            pixel_width: span.width.ceil() as u32,
            pixel_height: pixel_height as u32,
        });
        let options = WaveformRenderOptions {
            width: span.width,
            height: pixel_height,
            v_scale: track.v_scale,
            wave_color: color.clone(),
            progress_color: None,
            progress: None,
            bars: options.bars(),
            pixel_ratio: ratio,
        };
        let mut result = Ok(());
        tile.paint(&mut |ctx| result = render_waveform_with_channel_data(ctx, &slices, &options));
        result.map(|()| tile)
    };

    let wave = paint_layer(TileLayer::Wave, &track.wave_color)?;
    let progress = paint_layer(TileLayer::Progress, &track.progress_color)?;
    Ok(PaintedTile {
        wave,
        _progress: progress,
    })
}

impl RendererState {
    fn scroll_event(&self) -> RendererEvent {
        RendererEvent::scroll(&self.surface.scroll())
    }

    /// Recompute the layout for the current audio and options, dropping
    /// every canvas. Nothing is painted.
    fn relayout(&mut self) -> Result<()> {
        self.options.validate()?;
        self.painted.clear();
        self.surface.clear_tiles();

        let Some(audio) = &self.audio else {
            self.layout = None;
            return Ok(());
        };
        let container_width = self.surface.container_width();
        let pixel_ratio = self.surface.pixel_ratio();
        let dims = calculate_waveform_dimensions(
            audio.duration,
            self.options.min_px_per_sec,
            container_width,
            self.options.fill_parent,
        );

        self.surface.set_scrollable(dims.is_scrollable, self.options.hide_scrollbar);
        self.surface.set_wrapper_width(if !dims.is_scrollable && self.options.fill_parent {
            WrapperWidth::Fill
        } else {
            WrapperWidth::Px(dims.width)
        });

        let tracks = build_tracks(&self.options, audio);
        self.surface.set_height(tracks.iter().map(|t| t.height).sum());

        let total_pixels = (dims.width * pixel_ratio).round();
        let budget = if container_width > 0.0 {
            MAX_CANVAS_WIDTH.min(container_width * pixel_ratio)
        } else {
            MAX_CANVAS_WIDTH
        };
        let bars = self.options.bars();
        let spacing = bars.enabled().then(|| bars.spacing(pixel_ratio));
        let tiles = plan_tiles(total_pixels, budget, spacing);

        debug!(
            width = dims.width,
            scrollable = dims.is_scrollable,
            tiles = tiles.len(),
            tracks = tracks.len(),
            "waveform laid out"
        );
        self.layout = Some(Layout {
            width: dims.width,
            is_scrollable: dims.is_scrollable,
            pixel_ratio,
            total_pixels,
            tiles,
            tracks,
        });
        self.last_container_width = container_width;
        Ok(())
    }

    /// Paint tiles in `range` that are not painted yet.
    fn paint_range(&mut self, range: std::ops::Range<usize>) -> Result<()> {
        let Self {
            surface,
            layout,
            options,
            audio,
            painted,
            ..
        } = self;
        let (Some(layout), Some(audio)) = (layout.as_ref(), audio.as_ref()) else {
            return Ok(());
        };
        for tile in range {
            for track in 0..layout.tracks.len() {
                if painted.contains_key(&(track, tile)) {
                    continue;
                }
                let painted_tile = paint_tile(surface.as_mut(), layout, options, audio, track, tile)?;
                painted.insert((track, tile), painted_tile);
            }
        }
        Ok(())
    }

    /// Paint what is on screen: everything when the waveform fits, else the
    /// tile at the viewport and its neighbours.
    fn paint_visible(&mut self) -> Result<()> {
        let range = match &self.layout {
            None => return Ok(()),
            Some(layout) if layout.is_scrollable => {
                visible_tiles(self.surface.scroll().scroll_left, layout.width, layout.tiles.len())
            }
            Some(layout) => 0..layout.tiles.len(),
        };
        self.paint_range(range)
    }

    fn paint_all(&mut self) -> Result<()> {
        let count = self.layout.as_ref().map_or(0, |l| l.tiles.len());
        self.paint_range(0..count)
    }

    fn is_scrollable(&self) -> bool {
        self.layout.as_ref().is_some_and(|l| l.is_scrollable)
    }

    /// Move the overlay and cursor to `progress`, auto-scrolling if enabled.
    /// Returns a scroll event when the viewport moved.
    fn apply_progress(&mut self, progress: f64, is_playing: bool) -> Option<RendererEvent> {
        self.surface.set_progress(progress);
        let offset = if (progress * 100.0).round() >= 100.0 {
            self.options.cursor_width
        } else {
            0.0
        };
        let cursor = CursorStyle {
            color: self.options.cursor_color(),
            width: self.options.cursor_width,
        };
        self.surface.set_cursor(progress, offset, Some(&cursor));

        if self.is_scrollable() && self.options.auto_scroll {
            self.scroll_into_view(progress, is_playing)
        } else {
            None
        }
    }

    fn scroll_into_view(&mut self, progress: f64, is_playing: bool) -> Option<RendererEvent> {
        let scroll = self.surface.scroll();
        let target = auto_scroll_target(
            progress,
            &scroll,
            self.options.auto_center,
            self.is_dragging,
            is_playing,
        );
        if (target - scroll.scroll_left).abs() < f64::EPSILON {
            return None;
        }
        self.surface.set_scroll_left(target);
        if let Err(err) = self.paint_visible() {
            warn!(error = %err, "failed to paint tiles scrolled into view");
        }
        Some(self.scroll_event())
    }
}

impl Renderer {
    /// Mount a renderer in `container`. An unknown container or unpaintable
    /// colours fail here.
    pub fn new(
        options: RendererOptions,
        surfaces: &dyn SurfaceHost,
        container: &Container,
        host: Arc<dyn HostLoop>,
    ) -> Result<Self> {
        options.validate()?;
        let mut surface = surfaces.mount(container)?;
        let last_container_width = surface.container_width();
        surface.set_height(options.height);

        let inner = Arc::new(RendererInner {
            state: Mutex::new(RendererState {
                options,
                surface,
                audio: None,
                layout: None,
                painted: BTreeMap::new(),
                is_dragging: false,
                last_container_width,
                destroyed: false,
            }),
            scheduler: RenderScheduler::new(Arc::clone(&host)),
            events: Subject::new(),
            progress: Signal::new(0.0),
            resize: Subject::new(),
            drag: DragStream::new(DragOptions::default()),
            subscriptions: Mutex::new(Subscriptions::new()),
        });

        let weak = Arc::downgrade(&inner);
        let on_drag = inner.drag.events().subscribe(move |drag| {
            if let Some(renderer) = Renderer::upgrade(&weak) {
                renderer.on_drag(drag);
            }
        });
        let weak = Arc::downgrade(&inner);
        let on_resize = inner
            .resize
            .stream()
            .debounce(host, RESIZE_DEBOUNCE)
            .subscribe(move |width| {
                if let Some(renderer) = Renderer::upgrade(&weak) {
                    renderer.on_resize(width);
                }
            });
        inner.subscriptions.lock().extend([on_drag, on_resize]);

        debug!(%container, "renderer mounted");
        Ok(Self { inner })
    }

    fn upgrade(weak: &Weak<RendererInner>) -> Option<Renderer> {
        weak.upgrade().map(|inner| Renderer { inner })
    }

    fn emit_all(&self, events: impl IntoIterator<Item = RendererEvent>) {
        for event in events {
            self.inner.events.emit(event);
        }
    }

    pub fn events(&self) -> Stream<RendererEvent> {
        self.inner.events.stream()
    }

    pub fn options(&self) -> RendererOptions {
        self.inner.state.lock().options.clone()
    }

    /// Current progress ratio.
    pub fn progress(&self) -> f64 {
        self.inner.progress.get()
    }

    pub fn is_scrollable(&self) -> bool {
        self.inner.state.lock().is_scrollable()
    }

    pub fn is_dragging(&self) -> bool {
        self.inner.state.lock().is_dragging
    }

    /// Lay out and paint `audio`, replacing whatever was drawn. The view
    /// starts scrolled to the beginning.
    pub fn render(&self, audio: &DecodedAudio) -> Result<()> {
        if self.inner.state.lock().destroyed {
            return Ok(());
        }
        self.inner.events.emit(RendererEvent::Render);
        let scroll = {
            let mut state = self.inner.state.lock();
            state.audio = Some(audio.clone());
            state.relayout()?;
            state.surface.set_scroll_left(0.0);
            state.paint_visible()?;
            let progress = self.inner.progress.get();
            state.apply_progress(progress, false)
        };
        self.emit_all(std::iter::once(RendererEvent::Rendered).chain(scroll));
        Ok(())
    }

    /// Redraw the current audio after a layout change, keeping the time
    /// under the progress cursor (or the viewport start) in place.
    pub fn re_render(&self) -> Result<()> {
        {
            let state = self.inner.state.lock();
            if state.destroyed || state.audio.is_none() {
                return Ok(());
            }
        }
        self.inner.events.emit(RendererEvent::Render);
        let scroll = {
            let mut state = self.inner.state.lock();
            let before = state.surface.scroll();
            state.relayout()?;
            let progress = self.inner.progress.get();
            if let Some(layout) = state.layout.as_ref().filter(|l| l.is_scrollable) {
                let target = zoom_scroll_anchor(
                    progress,
                    before.scroll_left,
                    before.scroll_width,
                    layout.width,
                    state.surface.container_width(),
                );
                state.surface.set_scroll_left(target);
            }
            state.paint_visible()?;
            let after = state.surface.scroll();
            let moved = (after.scroll_left - before.scroll_left).abs() > f64::EPSILON
                || (after.scroll_width - before.scroll_width).abs() > f64::EPSILON;
            state
                .apply_progress(progress, false)
                .or_else(|| (moved && state.is_scrollable()).then(|| state.scroll_event()))
        };
        self.emit_all(std::iter::once(RendererEvent::Rendered).chain(scroll));
        Ok(())
    }

    /// Change the zoom level and redraw.
    pub fn zoom(&self, min_px_per_sec: f64) -> Result<()> {
        {
            let mut state = self.inner.state.lock();
            if state.audio.is_none() {
                return Err(WaveviewError::NoAudio("zoom needs decoded audio"));
            }
            state.options.min_px_per_sec = min_px_per_sec.max(0.0);
        }
        debug!(min_px_per_sec, "zoom");
        self.re_render()
    }

    /// Replace the options and redraw.
    pub fn set_options(&self, options: RendererOptions) -> Result<()> {
        options.validate()?;
        self.inner.state.lock().options = options;
        self.re_render()
    }

    /// Move the progress indicator. With `use_scheduler` the update is
    /// batched into the next frame (the playback path); otherwise it paints
    /// now, dropping any batched update.
    pub fn render_progress(&self, progress: f64, use_scheduler: bool) {
        if progress.is_nan() {
            return;
        }
        self.inner.progress.set(clamp_ratio(progress));

        let weak = Arc::downgrade(&self.inner);
        let paint = move || {
            if let Some(renderer) = Renderer::upgrade(&weak) {
                renderer.paint_progress(use_scheduler);
            }
        };
        if use_scheduler {
            self.inner.scheduler.schedule_render(paint, RenderPriority::Normal);
        } else {
            self.inner.scheduler.flush_render(paint);
        }
    }

    fn paint_progress(&self, is_playing: bool) {
        let scroll = {
            let mut state = self.inner.state.lock();
            if state.destroyed {
                return;
            }
            let progress = self.inner.progress.get();
            state.apply_progress(progress, is_playing)
        };
        self.emit_all(scroll);
    }

    /// Bring `progress` into view if auto-scroll allows it.
    pub fn scroll_into_view(&self, progress: f64, is_playing: bool) {
        let scroll = {
            let mut state = self.inner.state.lock();
            if state.destroyed || !state.is_scrollable() {
                return;
            }
            state.scroll_into_view(clamp_ratio(progress), is_playing)
        };
        self.emit_all(scroll);
    }

    /// The host scrolled the container to `scroll_left`.
    pub fn handle_scroll(&self, scroll_left: f64) {
        self.set_scroll(scroll_left);
    }

    /// The container was resized. The redraw happens once resizes settle.
    pub fn handle_resize(&self, container_width: f64) {
        self.inner.resize.emit(container_width);
    }

    fn on_resize(&self, container_width: f64) {
        {
            let state = self.inner.state.lock();
            if state.destroyed || (state.last_container_width - container_width).abs() < f64::EPSILON {
                return;
            }
        }
        if let Err(err) = self.re_render() {
            warn!(error = %err, "redraw after resize failed");
            return;
        }
        self.inner.state.lock().last_container_width = container_width;
        self.inner.events.emit(RendererEvent::Resize);
    }

    /// Route a pointer event: clicks and double clicks become events at the
    /// relative position; presses and moves feed drag recognition when drag
    /// is enabled. Returns whether the event was consumed.
    pub fn handle_pointer(&self, event: &PointerEvent) -> bool {
        let (rect, scroll_left, drag_enabled) = {
            let state = self.inner.state.lock();
            if state.destroyed {
                return false;
            }
            (
                state.surface.wrapper_rect(),
                state.surface.scroll().scroll_left,
                state.options.drag_to_seek,
            )
        };
        match event.kind {
            PointerEventKind::Click => {
                if self.inner.drag.handle_pointer_at(event, rect, scroll_left) {
                    return true;
                }
                let (x, y) = rect.relative(event.client_x, event.client_y);
                self.inner.events.emit(RendererEvent::Click { x, y });
                false
            }
            PointerEventKind::DoubleClick => {
                let (x, y) = rect.relative(event.client_x, event.client_y);
                self.inner.events.emit(RendererEvent::Dblclick { x, y });
                false
            }
            _ if drag_enabled => self.inner.drag.handle_pointer_at(event, rect, scroll_left),
            _ => false,
        }
    }

    fn on_drag(&self, drag: DragEvent) {
        let event = {
            let mut state = self.inner.state.lock();
            let x = ratio(drag.x(), state.surface.wrapper_rect().width);
            match drag {
                DragEvent::Start { .. } => {
                    state.is_dragging = true;
                    RendererEvent::DragStart { x }
                }
                DragEvent::Move { .. } => RendererEvent::Drag { x },
                DragEvent::End { .. } => {
                    state.is_dragging = false;
                    RendererEvent::DragEnd { x }
                }
            }
        };
        self.inner.events.emit(event);
    }

    /// Scroll offset in CSS px.
    pub fn scroll(&self) -> f64 {
        self.inner.state.lock().surface.scroll().scroll_left
    }

    /// Full waveform width in CSS px.
    pub fn width(&self) -> f64 {
        self.inner.state.lock().surface.scroll().scroll_width
    }

    pub fn scroll_state(&self) -> ScrollState {
        self.inner.state.lock().surface.scroll()
    }

    /// Scroll to `scroll_left` px, painting newly visible tiles.
    pub fn set_scroll(&self, scroll_left: f64) {
        let event = {
            let mut state = self.inner.state.lock();
            if state.destroyed {
                return;
            }
            state.surface.set_scroll_left(scroll_left);
            if let Err(err) = state.paint_visible() {
                warn!(error = %err, "failed to paint tiles scrolled into view");
            }
            state.scroll_event()
        };
        self.inner.events.emit(event);
    }

    /// Scroll so the viewport starts at `time` seconds.
    pub fn set_scroll_time(&self, time: f64) {
        let target = {
            let state = self.inner.state.lock();
            match &state.audio {
                Some(audio) if audio.duration > 0.0 => time / audio.duration * state.surface.scroll().scroll_width,
                _ => return,
            }
        };
        self.set_scroll(target);
    }

    /// Export every wave canvas, left to right (track by track when channels
    /// are split). Tiles not painted yet are painted first.
    pub fn export_image(&self, mime_type: &str, quality: f64, format: ExportFormat) -> Result<Vec<ExportedImage>> {
        let mut state = self.inner.state.lock();
        if state.audio.is_none() {
            return Err(WaveviewError::NoAudio("export needs a rendered waveform"));
        }
        state.paint_all()?;
        state
            .painted
            .values()
            .map(|tile| match format {
                ExportFormat::DataUrl => tile.wave.to_data_url(mime_type, quality).map(ExportedImage::DataUrl),
                ExportFormat::Blob => tile.wave.to_blob(mime_type, quality).map(ExportedImage::Blob),
            })
            .collect()
    }

    /// Tear down: cancel the pending frame and timers, stop gestures, drop
    /// canvases and unmount. Idempotent.
    pub fn destroy(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            state.painted.clear();
            state.layout = None;
            state.audio = None;
            state.surface.clear_tiles();
            state.surface.unmount();
        }
        self.inner.scheduler.cancel_render();
        self.inner.subscriptions.lock().clear();
        self.inner.drag.cleanup();
        self.inner.progress.cleanup();
        self.inner.resize.complete();
        self.inner.events.complete();
        debug!("renderer destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{HeadlessHost, HeadlessSurface};
    use waveview_core::{ChannelData, VirtualLoop};

    struct Fixture {
        host: VirtualLoop,
        probe: HeadlessSurface,
        renderer: Renderer,
        events: Arc<Mutex<Vec<RendererEvent>>>,
        _sub: waveview_core::Subscription,
    }

    fn fixture(options: RendererOptions, container_width: f64) -> Fixture {
        let host = VirtualLoop::new();
        let probe = HeadlessSurface::new(container_width, 1.0);
        let surfaces = HeadlessHost::new().with_container("#waveform", probe.clone());
        let renderer = Renderer::new(options, &surfaces, &"#waveform".into(), Arc::new(host.clone())).unwrap();
        let events = Arc::new(Mutex::new(Vec::new()));
        let e = Arc::clone(&events);
        let sub = renderer.events().subscribe(move |event| e.lock().push(event));
        Fixture {
            host,
            probe,
            renderer,
            events,
            _sub: sub,
        }
    }

    fn audio(duration: f64, len: usize) -> DecodedAudio {
        let samples = (0..len).map(|i| ((i as f32) / 50.0).sin() * 0.8).collect();
        DecodedAudio::new(ChannelData::mono(samples).unwrap(), duration)
    }

    #[test]
    fn test_missing_container_fails_fast() {
        let result = Renderer::new(
            RendererOptions::default(),
            &HeadlessHost::new(),
            &"#nope".into(),
            Arc::new(VirtualLoop::new()),
        );
        assert!(matches!(result.err(), Some(WaveviewError::ContainerNotFound(_))));
    }

    #[test]
    fn test_render_fits_container() {
        let f = fixture(RendererOptions::default(), 600.0);
        f.renderer.render(&audio(10.0, 10_000)).unwrap();
        assert!(!f.renderer.is_scrollable());
        assert_eq!(f.probe.wrapper_width(), WrapperWidth::Fill);
        assert_eq!(f.probe.tile_count(TileLayer::Wave), 1);
        assert_eq!(f.probe.tile_count(TileLayer::Progress), 1);
        let events = f.events.lock();
        assert_eq!(events[0], RendererEvent::Render);
        assert_eq!(events[1], RendererEvent::Rendered);
    }

    #[test]
    fn test_scrollable_render_paints_lazily() {
        let options = RendererOptions {
            min_px_per_sec: 100.0,
            ..RendererOptions::default()
        };
        let f = fixture(options, 500.0);
        f.renderer.render(&audio(100.0, 100_000)).unwrap();
        assert!(f.renderer.is_scrollable());
        assert_eq!(f.renderer.width(), 10_000.0);
        assert_eq!(f.probe.tile_count(TileLayer::Wave), 2);

        f.renderer.handle_scroll(5000.0);
        let tiles = f.probe.tiles(TileLayer::Wave);
        let indices: Vec<usize> = tiles.iter().map(|t| t.spec.index).collect();
        assert_eq!(indices, vec![0, 1, 9, 10, 11]);
        assert!(matches!(
            f.events.lock().last(),
            Some(RendererEvent::Scroll { left, .. }) if *left == 5000.0
        ));
    }

    #[test]
    fn test_export_paints_all_tiles_in_order() {
        let options = RendererOptions {
            min_px_per_sec: 100.0,
            ..RendererOptions::default()
        };
        let f = fixture(options, 500.0);
        f.renderer.render(&audio(20.0, 20_000)).unwrap();
        let images = f.renderer.export_image("image/png", 1.0, ExportFormat::DataUrl).unwrap();
        assert_eq!(images.len(), 4);
        for (i, image) in images.iter().enumerate() {
            let ExportedImage::DataUrl(url) = image else {
                panic!("expected data url");
            };
            assert!(url.contains(&format!("tile={i};")));
        }
    }

    #[test]
    fn test_progress_is_batched_on_the_playback_path() {
        let f = fixture(RendererOptions::default(), 600.0);
        f.renderer.render(&audio(10.0, 1000)).unwrap();
        for i in 1..=5 {
            f.renderer.render_progress(i as f64 / 10.0, true);
        }
        assert_eq!(f.probe.progress(), 0.0);
        f.host.advance_frame();
        assert_eq!(f.probe.progress(), 0.5);

        f.renderer.render_progress(0.75, false);
        assert_eq!(f.probe.progress(), 0.75);
        f.renderer.render_progress(1.5, false);
        assert_eq!(f.probe.cursor(), Some((1.0, 1.0)));
    }

    #[test]
    fn test_auto_scroll_follows_progress() {
        let options = RendererOptions {
            min_px_per_sec: 100.0,
            ..RendererOptions::default()
        };
        let f = fixture(options, 500.0);
        f.renderer.render(&audio(100.0, 10_000)).unwrap();
        f.renderer.render_progress(0.5, false);
        assert_eq!(f.probe.scroll_left(), 4750.0);
    }

    #[test]
    fn test_zoom_keeps_cursor_time() {
        let options = RendererOptions {
            min_px_per_sec: 50.0,
            ..RendererOptions::default()
        };
        let f = fixture(options, 1000.0);
        f.renderer.render(&audio(100.0, 10_000)).unwrap();
        f.renderer.render_progress(0.4, false);
        let before = f.renderer.scroll_state();
        let screen_x = 0.4 * before.scroll_width - before.scroll_left;

        f.renderer.zoom(120.0).unwrap();
        let after = f.renderer.scroll_state();
        assert_eq!(after.scroll_width, 12_000.0);
        let screen_after = 0.4 * after.scroll_width - after.scroll_left;
        assert!((screen_x - screen_after).abs() <= 1.0);
    }

    #[test]
    fn test_zoom_without_audio_is_an_error() {
        let f = fixture(RendererOptions::default(), 600.0);
        assert!(matches!(f.renderer.zoom(10.0), Err(WaveviewError::NoAudio(_))));
    }

    #[test]
    fn test_split_channels_make_tracks() {
        let options = RendererOptions {
            split_channels: Some(vec![
                Default::default(),
                crate::options::ChannelStyle {
                    height: Some(40.0),
                    ..Default::default()
                },
            ]),
            ..RendererOptions::default()
        };
        let f = fixture(options, 300.0);
        let data = ChannelData::new(vec![vec![0.5; 100], vec![-0.5; 100]]).unwrap();
        f.renderer.render(&DecodedAudio::new(data, 1.0)).unwrap();
        let tiles = f.probe.tiles(TileLayer::Wave);
        assert_eq!(tiles.len(), 2);
        assert_eq!(tiles[1].spec.top, 128.0);
        assert_eq!(tiles[1].spec.css_height, 40.0);
        assert_eq!(f.probe.height(), 168.0);
    }

    #[test]
    fn test_click_reports_relative_position() {
        let f = fixture(RendererOptions::default(), 400.0);
        f.renderer.render(&audio(10.0, 1000)).unwrap();
        f.renderer.handle_pointer(&PointerEvent::click(100.0, 64.0));
        assert!(f
            .events
            .lock()
            .contains(&RendererEvent::Click { x: 0.25, y: 0.5 }));
    }

    #[test]
    fn test_drag_emits_relative_positions_and_suppresses_click() {
        let options = RendererOptions {
            drag_to_seek: true,
            ..RendererOptions::default()
        };
        let f = fixture(options, 400.0);
        f.renderer.render(&audio(10.0, 1000)).unwrap();
        f.renderer.handle_pointer(&PointerEvent::down(100.0, 10.0));
        f.renderer.handle_pointer(&PointerEvent::moved(200.0, 10.0));
        assert!(f.renderer.is_dragging());
        f.renderer.handle_pointer(&PointerEvent::up(300.0, 10.0));
        assert!(f.renderer.handle_pointer(&PointerEvent::click(300.0, 10.0)));

        let drag: Vec<RendererEvent> = f
            .events
            .lock()
            .iter()
            .copied()
            .filter(|e| !matches!(e, RendererEvent::Render | RendererEvent::Rendered))
            .collect();
        assert_eq!(
            drag,
            vec![
                RendererEvent::DragStart { x: 0.25 },
                RendererEvent::Drag { x: 0.5 },
                RendererEvent::DragEnd { x: 0.75 },
            ]
        );
    }

    #[test]
    fn test_resize_is_debounced() {
        let f = fixture(RendererOptions::default(), 400.0);
        f.renderer.render(&audio(10.0, 1000)).unwrap();
        f.probe.resize_container(800.0);
        f.renderer.handle_resize(700.0);
        f.host.advance(Duration::from_millis(50));
        f.renderer.handle_resize(800.0);
        f.host.advance(Duration::from_millis(99));
        assert!(!f.events.lock().contains(&RendererEvent::Resize));
        f.host.advance(Duration::from_millis(1));
        let resizes = f.events.lock().iter().filter(|e| **e == RendererEvent::Resize).count();
        assert_eq!(resizes, 1);
    }

    #[test]
    fn test_destroy_cancels_everything() {
        let f = fixture(RendererOptions::default(), 400.0);
        f.renderer.render(&audio(10.0, 1000)).unwrap();
        f.renderer.render_progress(0.3, true);
        f.renderer.handle_resize(900.0);
        f.renderer.destroy();
        f.renderer.destroy();
        let seen = f.events.lock().len();
        f.host.advance(Duration::from_secs(1));
        assert_eq!(f.events.lock().len(), seen);
        assert_eq!(f.probe.progress(), 0.0);
        assert!(!f.probe.is_mounted());
        assert_eq!(f.host.pending_frames(), 0);
        assert_eq!(f.host.pending_timers(), 0);
    }
}
