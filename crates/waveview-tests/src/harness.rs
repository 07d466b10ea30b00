//! Shared setup: a headless host, a simulated media element and an event log.

use parking_lot::Mutex;
use std::sync::{Arc, Once};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use waveview::{MemoryFetcher, WaveSurfer, WaveSurferConfig, WaveSurferEvent, WaveSurferEventKind, WaveSurferOptions};
use waveview_core::{Event, Peaks, Subscription, VirtualLoop};
use waveview_media::{MediaHandle, SimulatedMedia};
use waveview_render::{HeadlessHost, HeadlessSurface};

pub const CONTAINER: &str = "#waveform";
pub const CONTAINER_WIDTH: f64 = 400.0;

static TRACING: Once = Once::new();

/// Print logs for failing tests when `RUST_LOG` is set.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub struct Harness {
    pub host: VirtualLoop,
    pub media: SimulatedMedia,
    pub surface: HeadlessSurface,
    pub fetcher: MemoryFetcher,
    pub wavesurfer: WaveSurfer,
    log: Arc<Mutex<Vec<WaveSurferEvent>>>,
    _log_subscription: Subscription,
}

impl Harness {
    pub fn new(options: WaveSurferOptions) -> anyhow::Result<Self> {
        Self::with_media(options, SimulatedMedia::new(), MemoryFetcher::new())
    }

    pub fn with_media(options: WaveSurferOptions, media: SimulatedMedia, fetcher: MemoryFetcher) -> anyhow::Result<Self> {
        init_tracing();
        let host = VirtualLoop::new();
        let surface = HeadlessSurface::new(CONTAINER_WIDTH, 1.0);
        let surfaces = HeadlessHost::new().with_container(CONTAINER, surface.clone());
        let config = WaveSurferConfig::new(CONTAINER, Arc::new(surfaces), Arc::new(host.clone()))
            .with_options(options)
            .with_media(MediaHandle::Owned(Arc::new(media.clone())))
            .with_fetcher(Arc::new(fetcher.clone()));
        let wavesurfer = WaveSurfer::create(config)?;

        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let log_subscription = wavesurfer.on_any(move |event| sink.lock().push(event.clone()));
        Ok(Self {
            host,
            media,
            surface,
            fetcher,
            wavesurfer,
            log,
            _log_subscription: log_subscription,
        })
    }

    /// An instance that renders `peaks` over `duration` on startup.
    pub fn with_peaks(peaks: Vec<Vec<f32>>, duration: f64) -> anyhow::Result<Self> {
        let options = WaveSurferOptions {
            url: Some("track.wav".into()),
            peaks: Some(Peaks(peaks)),
            duration: Some(duration),
            ..Default::default()
        };
        let harness = Self::with_media(
            options,
            SimulatedMedia::new().with_default_duration(duration),
            MemoryFetcher::new(),
        )?;
        harness.host.flush();
        Ok(harness)
    }

    pub fn events(&self) -> Vec<WaveSurferEvent> {
        self.log.lock().clone()
    }

    pub fn kinds(&self) -> Vec<WaveSurferEventKind> {
        self.log.lock().iter().map(Event::kind).collect()
    }

    pub fn count(&self, kind: WaveSurferEventKind) -> usize {
        self.log.lock().iter().filter(|e| e.kind() == kind).count()
    }

    pub fn clear_log(&self) {
        self.log.lock().clear();
    }

    /// Play for `ms` of wall time, one frame at a time.
    pub fn run_for(&self, ms: u64) {
        for _ in 0..ms / 16 {
            self.media.advance(0.016);
            self.host.advance(Duration::from_millis(16));
        }
    }
}

/// Sawtooth samples in [-1, 1).
pub fn ramp(len: usize) -> Vec<f32> {
    (0..len).map(|i| ((i % 50) as f32 / 50.0) * 2.0 - 1.0).collect()
}
