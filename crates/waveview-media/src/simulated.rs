//! A deterministic media element driven by explicit time advances.

use crate::element::{MediaElement, MediaEvent, MediaEventKind, MediaListener};
use crate::error::MediaError;
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;
use waveview_core::{EventBus, Subscription};

/// Media time between two `timeupdate` events during playback.
pub const TIMEUPDATE_INTERVAL: f64 = 0.25;

type Dispatch = SmallVec<[MediaEventKind; 4]>;

#[derive(Debug)]
struct SimState {
    src: String,
    durations: HashMap<String, f64>,
    default_duration: Option<f64>,
    supported: Vec<String>,
    duration: f64,
    current_time: f64,
    last_timeupdate: f64,
    paused: bool,
    ended: bool,
    seeking: bool,
    volume: f64,
    muted: bool,
    playback_rate: f64,
    preserves_pitch: bool,
    sink_id: String,
    controls: bool,
    autoplay: bool,
    removed: bool,
    fail_next_play: Option<MediaError>,
    play_calls: usize,
}

impl SimState {
    /// Reset for a new source and report what loading it dispatches.
    fn select_resource(&mut self, had_source: bool) -> Dispatch {
        let mut events = Dispatch::new();
        if had_source {
            events.push(MediaEventKind::Emptied);
        }
        self.duration = f64::NAN;
        self.current_time = 0.0;
        self.last_timeupdate = 0.0;
        self.paused = true;
        self.ended = false;
        self.seeking = false;
        if self.src.is_empty() {
            return events;
        }
        let known = self.durations.get(&self.src).copied().or(self.default_duration);
        if let Some(duration) = known {
            self.duration = duration;
            events.extend([
                MediaEventKind::DurationChange,
                MediaEventKind::LoadedMetadata,
                MediaEventKind::CanPlay,
            ]);
            if self.autoplay {
                self.paused = false;
                events.extend([MediaEventKind::Play, MediaEventKind::Playing]);
            }
        }
        events
    }
}

/// Media element for tests and headless playback.
///
/// Metadata for a source is known when a duration was registered for it (or
/// a default duration is set); it is then delivered synchronously when the
/// source is assigned. Otherwise [`SimulatedMedia::deliver_metadata`]
/// delivers it later. Playback only moves on [`SimulatedMedia::advance`].
#[derive(Clone)]
pub struct SimulatedMedia {
    state: Arc<Mutex<SimState>>,
    bus: EventBus<MediaEvent>,
}

impl Default for SimulatedMedia {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedMedia {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                src: String::new(),
                durations: HashMap::new(),
                default_duration: None,
                supported: vec!["audio/".into(), "video/".into()],
                duration: f64::NAN,
                current_time: 0.0,
                last_timeupdate: 0.0,
                paused: true,
                ended: false,
                seeking: false,
                volume: 1.0,
                muted: false,
                playback_rate: 1.0,
                preserves_pitch: true,
                sink_id: String::new(),
                controls: false,
                autoplay: false,
                removed: false,
                fail_next_play: None,
                play_calls: 0,
            })),
            bus: EventBus::new(),
        }
    }

    /// Metadata for `src` reports `duration`.
    pub fn with_duration(self, src: impl Into<String>, duration: f64) -> Self {
        self.state.lock().durations.insert(src.into(), duration);
        self
    }

    /// Metadata for unregistered sources reports `duration`.
    pub fn with_default_duration(self, duration: f64) -> Self {
        self.state.lock().default_duration = Some(duration);
        self
    }

    /// MIME type prefixes `can_play_type` accepts.
    pub fn with_supported_types<S: Into<String>>(self, prefixes: impl IntoIterator<Item = S>) -> Self {
        self.state.lock().supported = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Make the next `play` fail with `err`.
    pub fn fail_next_play(&self, err: MediaError) {
        self.state.lock().fail_next_play = Some(err);
    }

    /// Metadata for the current source arrives.
    pub fn deliver_metadata(&self, duration: f64) {
        let had = {
            let mut state = self.state.lock();
            if state.src.is_empty() {
                return;
            }
            state.duration = duration;
            true
        };
        if had {
            self.dispatch([
                MediaEventKind::DurationChange,
                MediaEventKind::LoadedMetadata,
                MediaEventKind::CanPlay,
            ]);
        }
    }

    /// Play for `seconds` of wall time.
    pub fn advance(&self, seconds: f64) {
        let events = {
            let mut state = self.state.lock();
            let mut events = Dispatch::new();
            if state.paused || !state.duration.is_finite() || seconds <= 0.0 {
                return;
            }
            state.current_time += seconds * state.playback_rate;
            if state.current_time >= state.duration {
                state.current_time = state.duration;
                state.paused = true;
                state.ended = true;
                events.extend([MediaEventKind::TimeUpdate, MediaEventKind::Pause, MediaEventKind::Ended]);
            } else if state.current_time - state.last_timeupdate >= TIMEUPDATE_INTERVAL {
                state.last_timeupdate = state.current_time;
                events.push(MediaEventKind::TimeUpdate);
            }
            events
        };
        self.dispatch(events);
    }

    pub fn sink_id(&self) -> String {
        self.state.lock().sink_id.clone()
    }

    pub fn is_removed(&self) -> bool {
        self.state.lock().removed
    }

    pub fn has_controls(&self) -> bool {
        self.state.lock().controls
    }

    pub fn play_calls(&self) -> usize {
        self.state.lock().play_calls
    }

    /// Registered listeners across all event kinds.
    pub fn listener_count(&self) -> usize {
        [
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
        ]
        .into_iter()
        .map(|kind| self.bus.listener_count(kind))
        .sum()
    }

    fn dispatch(&self, events: impl IntoIterator<Item = MediaEventKind>) {
        for kind in events {
            self.bus.emit(MediaEvent(kind));
        }
    }
}

impl MediaElement for SimulatedMedia {
    fn play(&self) -> Result<(), MediaError> {
        let events = {
            let mut state = self.state.lock();
            state.play_calls += 1;
            if let Some(err) = state.fail_next_play.take() {
                return Err(err);
            }
            if state.src.is_empty() {
                return Err(MediaError::NotSupported("no source assigned".into()));
            }
            if !state.paused {
                return Ok(());
            }
            if state.ended {
                state.current_time = 0.0;
                state.last_timeupdate = 0.0;
                state.ended = false;
            }
            state.paused = false;
            [MediaEventKind::Play, MediaEventKind::Playing]
        };
        self.dispatch(events);
        Ok(())
    }

    fn pause(&self) {
        {
            let mut state = self.state.lock();
            if state.paused {
                return;
            }
            state.paused = true;
        }
        self.dispatch([MediaEventKind::Pause]);
    }

    fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    fn is_ended(&self) -> bool {
        self.state.lock().ended
    }

    fn is_seeking(&self) -> bool {
        self.state.lock().seeking
    }

    fn current_time(&self) -> f64 {
        self.state.lock().current_time
    }

    fn set_current_time(&self, time: f64) {
        {
            let mut state = self.state.lock();
            state.seeking = true;
        }
        self.dispatch([MediaEventKind::Seeking]);
        {
            let mut state = self.state.lock();
            let end = if state.duration.is_finite() {
                state.duration
            } else {
                f64::INFINITY
            };
            state.current_time = if time.is_nan() { 0.0 } else { time.clamp(0.0, end) };
            state.last_timeupdate = state.current_time;
            state.ended = false;
            state.seeking = false;
        }
        self.dispatch([MediaEventKind::TimeUpdate, MediaEventKind::Seeked]);
    }

    fn duration(&self) -> f64 {
        self.state.lock().duration
    }

    fn volume(&self) -> f64 {
        self.state.lock().volume
    }

    fn set_volume(&self, volume: f64) {
        {
            let mut state = self.state.lock();
            let volume = volume.clamp(0.0, 1.0);
            if state.volume == volume {
                return;
            }
            state.volume = volume;
        }
        self.dispatch([MediaEventKind::VolumeChange]);
    }

    fn muted(&self) -> bool {
        self.state.lock().muted
    }

    fn set_muted(&self, muted: bool) {
        {
            let mut state = self.state.lock();
            if state.muted == muted {
                return;
            }
            state.muted = muted;
        }
        self.dispatch([MediaEventKind::VolumeChange]);
    }

    fn playback_rate(&self) -> f64 {
        self.state.lock().playback_rate
    }

    fn set_playback_rate(&self, rate: f64) {
        {
            let mut state = self.state.lock();
            if state.playback_rate == rate {
                return;
            }
            state.playback_rate = rate;
        }
        self.dispatch([MediaEventKind::RateChange]);
    }

    fn preserves_pitch(&self) -> bool {
        self.state.lock().preserves_pitch
    }

    fn set_preserves_pitch(&self, preserve: bool) {
        self.state.lock().preserves_pitch = preserve;
    }

    fn src(&self) -> String {
        self.state.lock().src.clone()
    }

    fn set_src(&self, src: &str) {
        let events = {
            let mut state = self.state.lock();
            let had_source = !state.src.is_empty();
            state.src = src.to_string();
            state.select_resource(had_source)
        };
        self.dispatch(events);
    }

    fn can_play_type(&self, mime_type: &str) -> bool {
        self.state
            .lock()
            .supported
            .iter()
            .any(|prefix| mime_type.starts_with(prefix.as_str()))
    }

    fn load(&self) {
        let events = {
            let mut state = self.state.lock();
            let had_source = !state.src.is_empty();
            state.select_resource(had_source)
        };
        self.dispatch(events);
    }

    fn set_sink_id(&self, sink_id: &str) -> Result<(), MediaError> {
        self.state.lock().sink_id = sink_id.to_string();
        Ok(())
    }

    fn set_controls(&self, controls: bool) {
        self.state.lock().controls = controls;
    }

    fn set_autoplay(&self, autoplay: bool) {
        self.state.lock().autoplay = autoplay;
    }

    fn remove(&self) {
        self.state.lock().removed = true;
    }

    fn subscribe(&self, kind: MediaEventKind, listener: MediaListener) -> Subscription {
        self.bus.on(kind, move |_| listener())
    }

    fn subscribe_once(&self, kind: MediaEventKind, listener: MediaListener) -> Subscription {
        self.bus.once(kind, move |_| listener())
    }
}
