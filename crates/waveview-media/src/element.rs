//! The media element contract.

use crate::error::MediaError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use waveview_core::{Event, Subscription};

/// Events a media element dispatches. They carry no payload; listeners read
/// the element's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaEventKind {
    Emptied,
    LoadedMetadata,
    DurationChange,
    CanPlay,
    Play,
    Playing,
    Pause,
    Ended,
    TimeUpdate,
    Seeking,
    Seeked,
    VolumeChange,
    RateChange,
    Error,
}

/// A dispatched media event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaEvent(pub MediaEventKind);

impl Event for MediaEvent {
    type Kind = MediaEventKind;

    fn kind(&self) -> MediaEventKind {
        self.0
    }
}

pub type MediaListener = Arc<dyn Fn() + Send + Sync>;

/// An audio/video element. Methods take `&self`; implementations use
/// interior mutability and must not hold locks while dispatching events.
pub trait MediaElement: Send + Sync {
    /// Start playback.
    fn play(&self) -> Result<(), MediaError>;
    fn pause(&self);
    fn is_paused(&self) -> bool;
    fn is_ended(&self) -> bool;
    fn is_seeking(&self) -> bool;

    fn current_time(&self) -> f64;
    fn set_current_time(&self, time: f64);
    /// NaN until metadata is known.
    fn duration(&self) -> f64;

    fn volume(&self) -> f64;
    fn set_volume(&self, volume: f64);
    fn muted(&self) -> bool;
    fn set_muted(&self, muted: bool);
    fn playback_rate(&self) -> f64;
    fn set_playback_rate(&self, rate: f64);
    fn preserves_pitch(&self) -> bool;
    fn set_preserves_pitch(&self, preserve: bool);

    fn src(&self) -> String;
    /// Assign a source. An empty string detaches the current one.
    fn set_src(&self, src: &str);
    fn can_play_type(&self, mime_type: &str) -> bool;
    /// Rerun resource selection for the current source.
    fn load(&self);

    fn set_sink_id(&self, sink_id: &str) -> Result<(), MediaError>;
    fn set_controls(&self, controls: bool);
    fn set_autoplay(&self, autoplay: bool);
    /// Detach the element from its document.
    fn remove(&self);

    fn subscribe(&self, kind: MediaEventKind, listener: MediaListener) -> Subscription;
    fn subscribe_once(&self, kind: MediaEventKind, listener: MediaListener) -> Subscription;
}
