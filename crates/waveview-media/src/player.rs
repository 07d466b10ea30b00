//! Playback control over a media element, mirrored into signals.

use crate::blob::{Blob, BlobUrls};
use crate::element::{MediaElement, MediaEventKind};
use crate::error::MediaError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info};
use waveview_core::{Signal, Stream, Subject, Subscriptions};

const MIRRORED_EVENTS: [MediaEventKind; 14] = [
    MediaEventKind::Emptied,
    MediaEventKind::LoadedMetadata,
    MediaEventKind::DurationChange,
    MediaEventKind::CanPlay,
    MediaEventKind::Play,
    MediaEventKind::Playing,
    MediaEventKind::Pause,
    MediaEventKind::Ended,
    MediaEventKind::TimeUpdate,
    MediaEventKind::Seeking,
    MediaEventKind::Seeked,
    MediaEventKind::VolumeChange,
    MediaEventKind::RateChange,
    MediaEventKind::Error,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerOptions {
    /// Show the element's native controls.
    pub media_controls: bool,
    pub autoplay: bool,
    /// Applied once the first source can play.
    pub playback_rate: f64,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            media_controls: false,
            autoplay: false,
            playback_rate: 1.0,
        }
    }
}

/// Who is responsible for tearing the element down.
#[derive(Clone)]
pub enum MediaHandle {
    /// Created for the player; destroyed with it.
    Owned(Arc<dyn MediaElement>),
    /// Supplied by the host; left untouched on destroy.
    Borrowed(Arc<dyn MediaElement>),
}

impl MediaHandle {
    fn element(&self) -> &Arc<dyn MediaElement> {
        match self {
            MediaHandle::Owned(media) | MediaHandle::Borrowed(media) => media,
        }
    }

    fn is_owned(&self) -> bool {
        matches!(self, MediaHandle::Owned(_))
    }
}

/// Mirrors of the element's state. The element stays authoritative.
#[derive(Clone)]
struct PlayerSignals {
    current_time: Signal<f64>,
    duration: Signal<f64>,
    volume: Signal<f64>,
    muted: Signal<bool>,
    playback_rate: Signal<f64>,
    is_playing: Signal<bool>,
    is_seeking: Signal<bool>,
}

impl PlayerSignals {
    fn read(media: &dyn MediaElement) -> Self {
        Self {
            current_time: Signal::new(media.current_time()),
            duration: Signal::new(finite_or_zero(media.duration())),
            volume: Signal::new(media.volume()),
            muted: Signal::new(media.muted()),
            playback_rate: Signal::new(media.playback_rate()),
            is_playing: Signal::new(!media.is_paused()),
            is_seeking: Signal::new(media.is_seeking()),
        }
    }

    fn sync(&self, kind: MediaEventKind, media: &dyn MediaElement) {
        match kind {
            MediaEventKind::Play | MediaEventKind::Playing | MediaEventKind::Pause | MediaEventKind::Ended => {
                self.is_playing.set(!media.is_paused());
            }
            MediaEventKind::TimeUpdate => {
                self.current_time.set(media.current_time());
            }
            MediaEventKind::DurationChange | MediaEventKind::LoadedMetadata => {
                self.duration.set(finite_or_zero(media.duration()));
            }
            MediaEventKind::Seeking | MediaEventKind::Seeked => {
                self.is_seeking.set(media.is_seeking());
                self.current_time.set(media.current_time());
            }
            MediaEventKind::VolumeChange => {
                self.volume.set(media.volume());
                self.muted.set(media.muted());
            }
            MediaEventKind::RateChange => {
                self.playback_rate.set(media.playback_rate());
            }
            MediaEventKind::Emptied => {
                self.is_playing.set(false);
                self.current_time.set(media.current_time());
                self.duration.set(finite_or_zero(media.duration()));
            }
            MediaEventKind::CanPlay | MediaEventKind::Error => {}
        }
    }

    fn cleanup(&self) {
        self.current_time.cleanup();
        self.duration.cleanup();
        self.volume.cleanup();
        self.muted.cleanup();
        self.playback_rate.cleanup();
        self.is_playing.cleanup();
        self.is_seeking.cleanup();
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

struct PlayerInner {
    handle: MediaHandle,
    urls: Arc<dyn BlobUrls>,
    object_url: Mutex<Option<String>>,
    signals: PlayerSignals,
    events: Subject<MediaEventKind>,
    subscriptions: Mutex<Subscriptions>,
    destroyed: AtomicBool,
}

/// Drives a media element and mirrors its events into signals.
#[derive(Clone)]
pub struct Player {
    inner: Arc<PlayerInner>,
}

impl Player {
    pub fn new(handle: MediaHandle, options: &PlayerOptions, urls: Arc<dyn BlobUrls>) -> Self {
        let media = Arc::clone(handle.element());
        if options.media_controls {
            media.set_controls(true);
        }
        if options.autoplay {
            media.set_autoplay(true);
        }

        let signals = PlayerSignals::read(media.as_ref());
        let events = Subject::new();
        let mut subscriptions = Subscriptions::new();
        let weak: Weak<dyn MediaElement> = Arc::downgrade(&media);

        for kind in MIRRORED_EVENTS {
            let (weak, signals, events) = (weak.clone(), signals.clone(), events.clone());
            subscriptions.push(media.subscribe(
                kind,
                Arc::new(move || {
                    if let Some(media) = weak.upgrade() {
                        signals.sync(kind, media.as_ref());
                    }
                    events.emit(kind);
                }),
            ));
        }

        if options.playback_rate != 1.0 {
            let rate = options.playback_rate;
            let weak = weak.clone();
            subscriptions.push(media.subscribe_once(
                MediaEventKind::CanPlay,
                Arc::new(move || {
                    if let Some(media) = weak.upgrade() {
                        media.set_playback_rate(rate);
                    }
                }),
            ));
        }

        Self {
            inner: Arc::new(PlayerInner {
                handle,
                urls,
                object_url: Mutex::new(None),
                signals,
                events,
                subscriptions: Mutex::new(subscriptions),
                destroyed: AtomicBool::new(false),
            }),
        }
    }

    pub fn media(&self) -> Arc<dyn MediaElement> {
        Arc::clone(self.inner.handle.element())
    }

    fn element(&self) -> &dyn MediaElement {
        self.inner.handle.element().as_ref()
    }

    /// Every media event, after the signals have been updated.
    pub fn events(&self) -> Stream<MediaEventKind> {
        self.inner.events.stream()
    }

    /// Events of one kind.
    pub fn on(&self, kind: MediaEventKind) -> Stream<MediaEventKind> {
        self.events().filter(move |k| *k == kind)
    }

    pub fn current_time_signal(&self) -> &Signal<f64> {
        &self.inner.signals.current_time
    }

    pub fn duration_signal(&self) -> &Signal<f64> {
        &self.inner.signals.duration
    }

    pub fn is_playing_signal(&self) -> &Signal<bool> {
        &self.inner.signals.is_playing
    }

    pub fn is_seeking_signal(&self) -> &Signal<bool> {
        &self.inner.signals.is_seeking
    }

    pub fn volume_signal(&self) -> &Signal<f64> {
        &self.inner.signals.volume
    }

    pub fn muted_signal(&self) -> &Signal<bool> {
        &self.inner.signals.muted
    }

    pub fn playback_rate_signal(&self) -> &Signal<f64> {
        &self.inner.signals.playback_rate
    }

    /// Start playback. An interrupted play is not an error.
    pub fn play(&self) -> Result<(), MediaError> {
        match self.element().play() {
            Err(err) if err.is_abort() => {
                debug!(%err, "play interrupted");
                Ok(())
            }
            result => result,
        }
    }

    pub fn pause(&self) {
        self.element().pause();
    }

    pub fn is_playing(&self) -> bool {
        !self.element().is_paused() && !self.element().is_ended()
    }

    pub fn is_seeking(&self) -> bool {
        self.element().is_seeking()
    }

    /// Seek to `time` seconds.
    pub fn set_time(&self, time: f64) {
        self.element().set_current_time(time);
    }

    pub fn current_time(&self) -> f64 {
        self.element().current_time()
    }

    /// Duration of the loaded media; 0 while unknown.
    pub fn duration(&self) -> f64 {
        finite_or_zero(self.element().duration())
    }

    pub fn volume(&self) -> f64 {
        self.element().volume()
    }

    pub fn set_volume(&self, volume: f64) {
        self.element().set_volume(volume);
    }

    pub fn muted(&self) -> bool {
        self.element().muted()
    }

    pub fn set_muted(&self, muted: bool) {
        self.element().set_muted(muted);
    }

    pub fn playback_rate(&self) -> f64 {
        self.element().playback_rate()
    }

    /// Change speed; `preserve_pitch` of `None` keeps the current setting.
    pub fn set_playback_rate(&self, rate: f64, preserve_pitch: Option<bool>) {
        if let Some(preserve) = preserve_pitch {
            self.element().set_preserves_pitch(preserve);
        }
        self.element().set_playback_rate(rate);
    }

    pub fn set_sink_id(&self, sink_id: &str) -> Result<(), MediaError> {
        self.element().set_sink_id(sink_id)
    }

    pub fn src(&self) -> String {
        self.element().src()
    }

    /// Assign a source, preferring an object URL for `blob` when the element
    /// can play its type or there is no URL to fall back to.
    pub fn set_src(&self, url: &str, blob: Option<&Blob>) {
        if !url.is_empty() && self.src() == url {
            return;
        }
        self.revoke_src();

        let src = match blob {
            Some(blob) if self.element().can_play_type(blob.mime_type()) || url.is_empty() => {
                let object_url = self.inner.urls.create_object_url(blob);
                *self.inner.object_url.lock() = Some(object_url.clone());
                object_url
            }
            _ => url.to_string(),
        };
        debug!(%src, "media source set");
        self.element().set_src(&src);
    }

    fn revoke_src(&self) {
        let previous = self.inner.object_url.lock().take();
        if let Some(url) = previous {
            self.inner.urls.revoke_object_url(&url);
        }
    }

    /// Whether the player created the element and will tear it down.
    pub fn is_owned(&self) -> bool {
        self.inner.handle.is_owned()
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }

    /// Detach from the element. An owned element is also stopped, unloaded
    /// and removed; a borrowed one is left as it is.
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.subscriptions.lock().clear();
        self.inner.events.complete();
        self.inner.signals.cleanup();

        if self.inner.handle.is_owned() {
            let media = self.element();
            media.pause();
            self.revoke_src();
            media.set_src("");
            media.load();
            media.remove();
        }
        info!(owned = self.inner.handle.is_owned(), "player destroyed");
    }
}
