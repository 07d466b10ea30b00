//! The orchestrator: player, renderer and timer behind one public surface.
//!
//! Media events and timer ticks move the progress indicator; clicks and
//! drags on the waveform seek the media. Loading runs fetch, then decode,
//! then render, strictly in that order.

use crate::decoder::{create_buffer, Decoder, PcmDecoder};
use crate::events::{WaveSurferEvent, WaveSurferEventKind};
use crate::fetcher::{monotonic, AbortController, Fetcher, MemoryFetcher};
use crate::options::{OptionsPatch, WaveSurferOptions};
use crate::plugin::{same_plugin, Plugin, PluginEventKind};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use waveview_core::{
    calculate_progress, DecodedAudio, EventBus, HostLoop, Peaks, Result, Stream, Subscription, Subscriptions,
    TaskId, WaveviewError,
};
use waveview_gesture::PointerEvent;
use waveview_media::{
    Blob, BlobRegistry, BlobUrls, MediaElement, MediaEventKind, MediaHandle, Player, SimulatedMedia, Timer,
};
use waveview_render::{
    export_peaks, Container, ExportFormat, ExportPeaksOptions, ExportedImage, Renderer, RendererEvent,
    RendererOptions, SurfaceHost,
};

/// Everything an instance is built from.
pub struct WaveSurferConfig {
    pub options: WaveSurferOptions,
    pub container: Container,
    pub surfaces: Arc<dyn SurfaceHost>,
    pub host: Arc<dyn HostLoop>,
    /// `None` creates an owned headless element.
    pub media: Option<MediaHandle>,
    pub fetcher: Arc<dyn Fetcher>,
    pub decoder: Arc<dyn Decoder>,
    pub blob_urls: Arc<dyn BlobUrls>,
    pub plugins: Vec<Arc<dyn Plugin>>,
}

impl WaveSurferConfig {
    pub fn new(container: impl Into<Container>, surfaces: Arc<dyn SurfaceHost>, host: Arc<dyn HostLoop>) -> Self {
        Self {
            options: WaveSurferOptions::default(),
            container: container.into(),
            surfaces,
            host,
            media: None,
            fetcher: Arc::new(MemoryFetcher::new()),
            decoder: Arc::new(PcmDecoder::default()),
            blob_urls: Arc::new(BlobRegistry::new()),
            plugins: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: WaveSurferOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_media(mut self, media: MediaHandle) -> Self {
        self.media = Some(media);
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn Decoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_blob_urls(mut self, blob_urls: Arc<dyn BlobUrls>) -> Self {
        self.blob_urls = blob_urls;
        self
    }

    pub fn with_plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }
}

struct WaveSurferState {
    options: WaveSurferOptions,
    decoded: Option<DecodedAudio>,
    /// Pause once playback reaches this time.
    stop_at: Option<f64>,
    abort: Option<AbortController>,
    /// Bumped by every load; a load whose generation is stale gives up.
    load_generation: u64,
    /// Each plugin with the hook that forgets it when it destroys itself.
    plugins: Vec<(Arc<dyn Plugin>, Subscription)>,
    drag_seek: Option<TaskId>,
    startup: Option<TaskId>,
    /// Dropping it fails a load waiting for metadata.
    metadata_wait: Option<Subscription>,
    destroyed: bool,
}

struct WaveSurferInner {
    state: Mutex<WaveSurferState>,
    events: EventBus<WaveSurferEvent>,
    player: Player,
    renderer: Renderer,
    timer: Timer,
    host: Arc<dyn HostLoop>,
    fetcher: Arc<dyn Fetcher>,
    decoder: Arc<dyn Decoder>,
    subscriptions: Mutex<Subscriptions>,
}

/// A waveform bound to a media element.
#[derive(Clone)]
pub struct WaveSurfer {
    inner: Arc<WaveSurferInner>,
}

/// Non-owning handle, for plugins and callbacks.
#[derive(Clone)]
pub struct WeakWaveSurfer {
    inner: Weak<WaveSurferInner>,
}

impl WeakWaveSurfer {
    pub fn upgrade(&self) -> Option<WaveSurfer> {
        self.inner.upgrade().map(|inner| WaveSurfer { inner })
    }
}

impl WaveSurfer {
    /// Build an instance and mount its renderer. The `Init` event and the
    /// initial load (from `url`, or `peaks` with `duration`) follow on the
    /// next turn of the host loop.
    pub fn create(config: WaveSurferConfig) -> Result<Self> {
        let WaveSurferConfig {
            options,
            container,
            surfaces,
            host,
            media,
            fetcher,
            decoder,
            blob_urls,
            plugins,
        } = config;

        let renderer = Renderer::new(
            RendererOptions::from(&options),
            surfaces.as_ref(),
            &container,
            Arc::clone(&host),
        )?;
        let media = media.unwrap_or_else(|| MediaHandle::Owned(Arc::new(SimulatedMedia::new())));
        let player = Player::new(media, &options.player_options(), blob_urls);
        let timer = Timer::new(Arc::clone(&host));

        let wavesurfer = Self {
            inner: Arc::new(WaveSurferInner {
                state: Mutex::new(WaveSurferState {
                    options,
                    decoded: None,
                    stop_at: None,
                    abort: None,
                    load_generation: 0,
                    plugins: Vec::new(),
                    drag_seek: None,
                    startup: None,
                    metadata_wait: None,
                    destroyed: false,
                }),
                events: EventBus::new(),
                player,
                renderer,
                timer,
                host,
                fetcher,
                decoder,
                subscriptions: Mutex::new(Subscriptions::new()),
            }),
        };
        wavesurfer.init_player_events();
        wavesurfer.init_renderer_events();
        wavesurfer.init_timer_events();
        for plugin in plugins {
            wavesurfer.register_plugin_dyn(plugin)?;
        }
        wavesurfer.schedule_startup();

        info!(%container, "wavesurfer created");
        Ok(wavesurfer)
    }

    pub fn downgrade(&self) -> WeakWaveSurfer {
        WeakWaveSurfer {
            inner: Arc::downgrade(&self.inner),
        }
    }

    fn emit(&self, event: WaveSurferEvent) {
        self.inner.events.emit(event);
    }

    pub fn on(&self, kind: WaveSurferEventKind, f: impl Fn(&WaveSurferEvent) + Send + Sync + 'static) -> Subscription {
        self.inner.events.on(kind, f)
    }

    pub fn once(&self, kind: WaveSurferEventKind, f: impl Fn(&WaveSurferEvent) + Send + Sync + 'static) -> Subscription {
        self.inner.events.once(kind, f)
    }

    pub fn on_any(&self, f: impl Fn(&WaveSurferEvent) + Send + Sync + 'static) -> Subscription {
        self.inner.events.on_any(f)
    }

    /// Every public event as a stream.
    pub fn events(&self) -> Stream<WaveSurferEvent> {
        self.inner.events.stream()
    }

    pub fn options(&self) -> WaveSurferOptions {
        self.inner.state.lock().options.clone()
    }

    pub fn renderer(&self) -> &Renderer {
        &self.inner.renderer
    }

    pub fn player(&self) -> &Player {
        &self.inner.player
    }

    pub fn media_element(&self) -> Arc<dyn MediaElement> {
        self.inner.player.media()
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.state.lock().destroyed
    }

    fn init_player_events(&self) {
        let weak = self.downgrade();
        let subscription = self.inner.player.events().subscribe(move |kind| {
            if let Some(wavesurfer) = weak.upgrade() {
                wavesurfer.on_media_event(kind);
            }
        });
        self.inner.subscriptions.lock().push(subscription);
    }

    fn on_media_event(&self, kind: MediaEventKind) {
        match kind {
            MediaEventKind::TimeUpdate => {
                let time = self.update_progress(None);
                self.emit(WaveSurferEvent::TimeUpdate { time });
            }
            MediaEventKind::Play => {
                self.emit(WaveSurferEvent::Play);
                self.inner.timer.start();
            }
            MediaEventKind::Pause => {
                self.emit(WaveSurferEvent::Pause);
                self.inner.timer.stop();
                self.inner.state.lock().stop_at = None;
            }
            MediaEventKind::Emptied => {
                self.inner.timer.stop();
                self.inner.state.lock().stop_at = None;
            }
            MediaEventKind::Ended => {
                self.emit(WaveSurferEvent::TimeUpdate {
                    time: self.duration(),
                });
                self.emit(WaveSurferEvent::Finish);
                self.inner.timer.stop();
                self.inner.state.lock().stop_at = None;
            }
            MediaEventKind::Seeking => {
                self.emit(WaveSurferEvent::Seeking {
                    time: self.current_time(),
                });
            }
            MediaEventKind::Error => {
                self.emit(WaveSurferEvent::Error {
                    message: "media element error".into(),
                });
                self.inner.state.lock().stop_at = None;
            }
            _ => {}
        }
    }

    fn init_renderer_events(&self) {
        let weak = self.downgrade();
        let subscription = self.inner.renderer.events().subscribe(move |event| {
            if let Some(wavesurfer) = weak.upgrade() {
                wavesurfer.on_renderer_event(event);
            }
        });
        self.inner.subscriptions.lock().push(subscription);
    }

    fn on_renderer_event(&self, event: RendererEvent) {
        let interact = self.inner.state.lock().options.interact;
        match event {
            RendererEvent::Click { x, y } if interact => {
                self.seek_to(x);
                self.emit(WaveSurferEvent::Interaction {
                    time: x * self.duration(),
                });
                self.emit(WaveSurferEvent::Click { x, y });
            }
            RendererEvent::Dblclick { x, y } if interact => {
                self.seek_to(x);
                self.emit(WaveSurferEvent::Interaction {
                    time: x * self.duration(),
                });
                self.emit(WaveSurferEvent::Dblclick { x, y });
            }
            RendererEvent::Drag { x } if interact => self.on_drag(x),
            RendererEvent::DragStart { x } => self.emit(WaveSurferEvent::DragStart { x }),
            RendererEvent::DragEnd { x } => self.emit(WaveSurferEvent::DragEnd { x }),
            RendererEvent::Scroll {
                start,
                end,
                left,
                right,
            } => {
                let duration = self.duration();
                self.emit(WaveSurferEvent::Scroll {
                    start: start * duration,
                    end: end * duration,
                    left,
                    right,
                });
            }
            RendererEvent::Render => self.emit(WaveSurferEvent::Redraw),
            RendererEvent::Rendered => self.emit(WaveSurferEvent::RedrawComplete),
            RendererEvent::Click { .. }
            | RendererEvent::Dblclick { .. }
            | RendererEvent::Drag { .. }
            | RendererEvent::Resize => {}
        }
    }

    /// Show the dragged position now; seek once the pointer rests.
    fn on_drag(&self, x: f64) {
        self.inner.renderer.render_progress(x, false);

        let is_playing = self.is_playing();
        let (previous, debounce) = {
            let mut state = self.inner.state.lock();
            (state.drag_seek.take(), state.options.drag_to_seek.debounce(is_playing))
        };
        if let Some(id) = previous {
            self.inner.host.cancel(id);
        }
        if let Some(delay) = debounce {
            let weak = self.downgrade();
            let id = self.inner.host.set_timeout(
                delay,
                Box::new(move || {
                    if let Some(wavesurfer) = weak.upgrade() {
                        wavesurfer.inner.state.lock().drag_seek = None;
                        wavesurfer.seek_to(x);
                    }
                }),
            );
            self.inner.state.lock().drag_seek = Some(id);
        }

        self.emit(WaveSurferEvent::Interaction {
            time: x * self.duration(),
        });
        self.emit(WaveSurferEvent::Drag { x });
    }

    fn init_timer_events(&self) {
        let weak = self.downgrade();
        let subscription = self.inner.timer.ticks().subscribe(move |()| {
            if let Some(wavesurfer) = weak.upgrade() {
                wavesurfer.on_tick();
            }
        });
        self.inner.subscriptions.lock().push(subscription);
    }

    fn on_tick(&self) {
        if self.is_seeking() {
            return;
        }
        let time = self.update_progress(None);
        self.emit(WaveSurferEvent::TimeUpdate { time });
        self.emit(WaveSurferEvent::AudioProcess { time });

        let stop_at = self.inner.state.lock().stop_at;
        if stop_at.is_some_and(|stop| self.is_playing() && time >= stop) {
            debug!(time, "reached end of play range");
            self.pause();
        }
    }

    /// Push the playback position to the renderer; batched while playing.
    fn update_progress(&self, time: Option<f64>) -> f64 {
        let time = time.unwrap_or_else(|| self.current_time());
        let progress = calculate_progress(time, self.duration());
        self.inner.renderer.render_progress(progress, self.is_playing());
        time
    }

    fn schedule_startup(&self) {
        let runtime = tokio::runtime::Handle::try_current().ok();
        let weak = self.downgrade();
        let id = self.inner.host.set_timeout(
            Duration::ZERO,
            Box::new(move || {
                if let Some(wavesurfer) = weak.upgrade() {
                    wavesurfer.inner.state.lock().startup = None;
                    wavesurfer.startup(runtime);
                }
            }),
        );
        self.inner.state.lock().startup = Some(id);
    }

    fn startup(&self, runtime: Option<tokio::runtime::Handle>) {
        self.emit(WaveSurferEvent::Init);

        let (url, peaks, duration) = {
            let state = self.inner.state.lock();
            (
                state.options.url.clone(),
                state.options.peaks.clone(),
                state.options.duration,
            )
        };
        let url = url.unwrap_or_else(|| self.inner.player.src());

        match (peaks, duration) {
            (Some(peaks), Some(duration)) if duration > 0.0 => {
                if let Err(err) = self.load_peaks_now(&url, peaks, duration) {
                    warn!(error = %err, "initial load failed");
                }
            }
            (peaks, duration) if !url.is_empty() => match runtime {
                Some(runtime) => {
                    let wavesurfer = self.clone();
                    runtime.spawn(async move {
                        if let Err(err) = wavesurfer.load(&url, peaks, duration).await {
                            warn!(error = %err, "initial load failed");
                        }
                    });
                }
                None => warn!(%url, "no async runtime for the initial load; call load()"),
            },
            _ => {}
        }
    }

    /// Load `url`. With `peaks` nothing is fetched or decoded: the peaks are
    /// rendered over `duration`, or over the media's duration once its
    /// metadata arrives.
    pub async fn load(&self, url: &str, peaks: Option<Peaks>, duration: Option<f64>) -> Result<()> {
        self.load_audio(url, None, peaks, duration).await
    }

    /// Load audio from a blob already in memory.
    pub async fn load_blob(&self, blob: Blob, peaks: Option<Peaks>, duration: Option<f64>) -> Result<()> {
        self.load_audio("", Some(blob), peaks, duration).await
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.is_destroyed() {
            Err(WaveviewError::Aborted)
        } else {
            Ok(())
        }
    }

    /// Fails with `Aborted` once the instance is destroyed or a newer load
    /// has started.
    fn ensure_current(&self, generation: u64) -> Result<()> {
        let state = self.inner.state.lock();
        if state.destroyed || state.load_generation != generation {
            Err(WaveviewError::Aborted)
        } else {
            Ok(())
        }
    }

    /// Report a load failure. Aborts are not announced.
    fn fail(&self, err: WaveviewError) -> WaveviewError {
        if !matches!(err, WaveviewError::Aborted) {
            warn!(error = %err, "load failed");
            self.emit(WaveSurferEvent::Error {
                message: err.to_string(),
            });
        }
        err
    }

    /// Supersede any load in flight and return the new load's generation.
    fn begin_load(&self, url: &str) -> Result<u64> {
        self.ensure_alive()?;
        let (generation, previous, metadata_wait) = {
            let mut state = self.inner.state.lock();
            state.load_generation += 1;
            (state.load_generation, state.abort.take(), state.metadata_wait.take())
        };
        if let Some(controller) = previous {
            debug!("aborting superseded load");
            controller.abort();
        }
        drop(metadata_wait);

        info!(%url, generation, "load");
        self.emit(WaveSurferEvent::Load { url: url.to_string() });
        if self.inner.player.is_owned() && self.is_playing() {
            self.pause();
        }
        let mut state = self.inner.state.lock();
        state.decoded = None;
        state.stop_at = None;
        Ok(generation)
    }

    fn load_peaks_now(&self, url: &str, peaks: Peaks, duration: f64) -> Result<()> {
        let generation = self.begin_load(url)?;
        self.inner.player.set_src(url, None);
        let decoded = create_buffer(peaks, duration).map_err(|err| self.fail(err))?;
        self.finish_load(generation, Some(decoded))
    }

    async fn load_audio(
        &self,
        url: &str,
        blob: Option<Blob>,
        peaks: Option<Peaks>,
        duration: Option<f64>,
    ) -> Result<()> {
        let generation = self.begin_load(url)?;

        let blob = match blob {
            None if peaks.is_none() => Some(self.fetch(url).await.map_err(|err| self.fail(err))?),
            blob => blob,
        };
        self.ensure_current(generation)?;
        self.inner.player.set_src(url, blob.as_ref());

        let known = duration
            .filter(|d| *d > 0.0)
            .or_else(|| Some(self.duration()).filter(|d| *d > 0.0));
        let duration = match known {
            Some(duration) => duration,
            None if peaks.is_some() => self.wait_for_metadata().await?,
            None => 0.0,
        };

        let decoded = match (peaks, blob) {
            (Some(peaks), _) => create_buffer(peaks, duration).map_err(|err| self.fail(err))?,
            (None, Some(blob)) => {
                let sample_rate = self.inner.state.lock().options.sample_rate;
                self.inner
                    .decoder
                    .decode(blob.bytes(), sample_rate)
                    .await
                    .map_err(|err| self.fail(err))?
            }
            (None, None) => return self.finish_load(generation, None),
        };
        self.finish_load(generation, Some(decoded))
    }

    async fn fetch(&self, url: &str) -> Result<Blob> {
        let (params, mime_type) = {
            let mut state = self.inner.state.lock();
            let mut params = state.options.fetch_params.clone();
            if params.signal.is_none() {
                let controller = AbortController::new();
                params.signal = Some(controller.signal());
                state.abort = Some(controller);
            }
            (params, state.options.blob_mime_type.clone())
        };
        let weak = self.downgrade();
        let progress = monotonic(Arc::new(move |percent| {
            if let Some(wavesurfer) = weak.upgrade() {
                wavesurfer.emit(WaveSurferEvent::Loading { percent });
            }
        }));

        let blob = self.inner.fetcher.fetch_blob(url, progress, &params).await?;
        Ok(match mime_type {
            Some(mime_type) => blob.with_mime_type(mime_type),
            None => blob,
        })
    }

    async fn wait_for_metadata(&self) -> Result<f64> {
        let (tx, rx) = oneshot::channel::<()>();
        let tx = Mutex::new(Some(tx));
        let subscription = self.inner.player.media().subscribe_once(
            MediaEventKind::LoadedMetadata,
            Arc::new(move || {
                if let Some(tx) = tx.lock().take() {
                    let _ = tx.send(());
                }
            }),
        );
        self.inner.state.lock().metadata_wait = Some(subscription);
        debug!("waiting for media metadata");

        rx.await.map_err(|_| WaveviewError::Aborted)?;
        Ok(self.inner.player.duration())
    }

    fn finish_load(&self, generation: u64, decoded: Option<DecodedAudio>) -> Result<()> {
        self.ensure_current(generation)?;
        if let Some(decoded) = decoded {
            self.inner.state.lock().decoded = Some(decoded.clone());
            self.emit(WaveSurferEvent::Decode {
                duration: self.duration(),
            });
            self.inner.renderer.render(&decoded).map_err(|err| self.fail(err))?;
        }
        let duration = self.duration();
        info!(duration, "ready");
        self.emit(WaveSurferEvent::Ready { duration });
        Ok(())
    }

    /// Media duration, falling back to the decoded audio while the media
    /// does not know it.
    pub fn duration(&self) -> f64 {
        let duration = self.inner.player.duration();
        if duration > 0.0 {
            return duration;
        }
        self.inner
            .state
            .lock()
            .decoded
            .as_ref()
            .map_or(0.0, |decoded| decoded.duration)
    }

    pub fn current_time(&self) -> f64 {
        self.inner.player.current_time()
    }

    pub fn is_playing(&self) -> bool {
        self.inner.player.is_playing()
    }

    pub fn is_seeking(&self) -> bool {
        self.inner.player.is_seeking()
    }

    pub fn decoded_data(&self) -> Option<DecodedAudio> {
        self.inner.state.lock().decoded.clone()
    }

    pub fn play(&self) -> Result<()> {
        Ok(self.inner.player.play()?)
    }

    /// Play from `start` and pause at `end` (checked every frame).
    pub fn play_range(&self, start: Option<f64>, end: Option<f64>) -> Result<()> {
        if let Some(start) = start {
            self.set_time(start);
        }
        self.play()?;
        if end.is_some() {
            self.inner.state.lock().stop_at = end;
        }
        Ok(())
    }

    pub fn pause(&self) {
        self.inner.player.pause();
    }

    pub fn play_pause(&self) -> Result<()> {
        if self.is_playing() {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Pause and rewind to the start.
    pub fn stop(&self) {
        self.pause();
        self.set_time(0.0);
    }

    /// Jump `seconds` forward (or back when negative).
    pub fn skip(&self, seconds: f64) {
        self.set_time(self.current_time() + seconds);
    }

    /// Seek to `time` seconds.
    pub fn set_time(&self, time: f64) {
        self.inner.state.lock().stop_at = None;
        self.inner.player.set_time(time);
        self.update_progress(Some(time));
        self.emit(WaveSurferEvent::TimeUpdate { time });
    }

    /// Seek to a ratio of the duration.
    pub fn seek_to(&self, progress: f64) {
        self.set_time(self.duration() * progress);
    }

    /// Change the zoom level to `min_px_per_sec`.
    pub fn zoom(&self, min_px_per_sec: f64) -> Result<()> {
        {
            let mut state = self.inner.state.lock();
            if state.decoded.is_none() {
                return Err(WaveviewError::NoAudio("zoom needs decoded audio"));
            }
            state.options.min_px_per_sec = min_px_per_sec;
        }
        self.inner.renderer.zoom(min_px_per_sec)?;
        self.emit(WaveSurferEvent::Zoom { min_px_per_sec });
        Ok(())
    }

    /// Merge `patch` into the options and redraw. New `peaks` with a
    /// `duration` replace the decoded audio; a `duration` alone rescales it.
    pub fn set_options(&self, patch: OptionsPatch) -> Result<()> {
        let (renderer_options, replaced) = {
            let mut state = self.inner.state.lock();
            let mut options = state.options.clone();
            patch.apply(&mut options);
            let replaced = match (&patch.peaks, patch.duration) {
                (Some(peaks), Some(duration)) => Some(create_buffer(peaks.clone(), duration)?),
                (None, Some(duration)) => state
                    .decoded
                    .as_ref()
                    .map(|decoded| DecodedAudio::new(decoded.channels.clone(), duration)),
                _ => None,
            };
            let renderer_options = RendererOptions::from(&options);
            renderer_options.validate()?;
            state.options = options;
            if let Some(decoded) = &replaced {
                state.decoded = Some(decoded.clone());
            }
            (renderer_options, replaced)
        };

        self.inner.renderer.set_options(renderer_options)?;
        if let Some(decoded) = replaced {
            self.inner.renderer.render(&decoded)?;
        }
        if let Some(rate) = patch.audio_rate {
            self.inner.player.set_playback_rate(rate, None);
        }
        if let Some(controls) = patch.media_controls {
            self.inner.player.media().set_controls(controls);
        }
        Ok(())
    }

    /// Reduce the decoded audio to peaks for storage.
    pub fn export_peaks(&self, options: &ExportPeaksOptions) -> Result<Peaks> {
        let state = self.inner.state.lock();
        let decoded = state
            .decoded
            .as_ref()
            .ok_or(WaveviewError::NoAudio("export needs decoded audio"))?;
        Ok(export_peaks(&decoded.channels, options))
    }

    pub fn export_image(&self, mime_type: &str, quality: f64, format: ExportFormat) -> Result<Vec<ExportedImage>> {
        self.inner.renderer.export_image(mime_type, quality, format)
    }

    /// Initialise `plugin` against this instance and keep it until it, or
    /// the instance, is destroyed.
    pub fn register_plugin<P: Plugin + 'static>(&self, plugin: Arc<P>) -> Result<Arc<P>> {
        self.register_plugin_dyn(Arc::clone(&plugin) as Arc<dyn Plugin>)?;
        Ok(plugin)
    }

    fn register_plugin_dyn(&self, plugin: Arc<dyn Plugin>) -> Result<()> {
        plugin.init(self)?;

        let weak = self.downgrade();
        let target = Arc::downgrade(&plugin);
        let subscription = plugin.base().events().once(PluginEventKind::Destroy, move |_| {
            let (Some(wavesurfer), Some(plugin)) = (weak.upgrade(), target.upgrade()) else {
                return;
            };
            wavesurfer
                .inner
                .state
                .lock()
                .plugins
                .retain(|(p, _)| !same_plugin(p, &plugin));
        });
        info!(plugin = plugin.name(), "plugin registered");
        self.inner.state.lock().plugins.push((plugin, subscription));
        Ok(())
    }

    pub fn active_plugins(&self) -> Vec<Arc<dyn Plugin>> {
        self.inner
            .state
            .lock()
            .plugins
            .iter()
            .map(|(plugin, _)| Arc::clone(plugin))
            .collect()
    }

    pub fn volume(&self) -> f64 {
        self.inner.player.volume()
    }

    pub fn set_volume(&self, volume: f64) {
        self.inner.player.set_volume(volume);
    }

    pub fn muted(&self) -> bool {
        self.inner.player.muted()
    }

    pub fn set_muted(&self, muted: bool) {
        self.inner.player.set_muted(muted);
    }

    pub fn playback_rate(&self) -> f64 {
        self.inner.player.playback_rate()
    }

    pub fn set_playback_rate(&self, rate: f64, preserve_pitch: Option<bool>) {
        self.inner.player.set_playback_rate(rate, preserve_pitch);
    }

    pub fn set_sink_id(&self, sink_id: &str) -> Result<()> {
        Ok(self.inner.player.set_sink_id(sink_id)?)
    }

    /// Scroll offset in CSS px.
    pub fn scroll(&self) -> f64 {
        self.inner.renderer.scroll()
    }

    pub fn set_scroll(&self, pixels: f64) {
        self.inner.renderer.set_scroll(pixels);
    }

    /// Scroll so the viewport starts at `time` seconds.
    pub fn set_scroll_time(&self, time: f64) {
        self.inner.renderer.set_scroll_time(time);
    }

    /// Full waveform width in CSS px.
    pub fn width(&self) -> f64 {
        self.inner.renderer.width()
    }

    /// Forward a pointer event from the host. Returns whether it was
    /// consumed (e.g. a click swallowed after a drag).
    pub fn handle_pointer(&self, event: &PointerEvent) -> bool {
        self.inner.renderer.handle_pointer(event)
    }

    pub fn handle_scroll(&self, scroll_left: f64) {
        self.inner.renderer.handle_scroll(scroll_left);
    }

    pub fn handle_resize(&self, container_width: f64) {
        self.inner.renderer.handle_resize(container_width);
    }

    /// Emit `Destroy`, abort loading, destroy plugins, drop subscriptions,
    /// then tear down the timer, renderer and player. Idempotent.
    pub fn destroy(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
        }
        self.emit(WaveSurferEvent::Destroy);

        let (abort, plugins, tasks, metadata_wait) = {
            let mut state = self.inner.state.lock();
            (
                state.abort.take(),
                std::mem::take(&mut state.plugins),
                [state.drag_seek.take(), state.startup.take()],
                state.metadata_wait.take(),
            )
        };
        if let Some(controller) = abort {
            controller.abort();
        }
        drop(metadata_wait);
        for (plugin, hook) in plugins {
            drop(hook);
            plugin.destroy();
        }
        for id in tasks.into_iter().flatten() {
            self.inner.host.cancel(id);
        }
        let subscriptions = std::mem::take(&mut *self.inner.subscriptions.lock());
        drop(subscriptions);

        self.inner.timer.destroy();
        self.inner.renderer.destroy();
        self.inner.player.destroy();
        self.inner.events.clear();
        info!("wavesurfer destroyed");
    }
}
