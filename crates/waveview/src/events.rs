//! Public events. Times are in seconds, positions are ratios of the
//! waveform width.

use serde::{Deserialize, Serialize};
use waveview_core::Event;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WaveSurferEvent {
    /// The instance is set up and plugins are registered.
    Init,
    /// Loading of `url` started.
    Load { url: String },
    /// Fetch progress in percent.
    Loading { percent: f64 },
    Decode { duration: f64 },
    Ready { duration: f64 },
    /// The waveform is about to be drawn.
    Redraw,
    RedrawComplete,
    Play,
    Pause,
    Finish,
    TimeUpdate { time: f64 },
    /// Playback position on every timer tick.
    AudioProcess { time: f64 },
    Seeking { time: f64 },
    /// The user clicked or dragged to `time`.
    Interaction { time: f64 },
    Click { x: f64, y: f64 },
    Dblclick { x: f64, y: f64 },
    Drag { x: f64 },
    DragStart { x: f64 },
    DragEnd { x: f64 },
    /// Visible window as times and as pixel offsets.
    Scroll { start: f64, end: f64, left: f64, right: f64 },
    Zoom { min_px_per_sec: f64 },
    Error { message: String },
    Destroy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaveSurferEventKind {
    Init,
    Load,
    Loading,
    Decode,
    Ready,
    Redraw,
    RedrawComplete,
    Play,
    Pause,
    Finish,
    TimeUpdate,
    AudioProcess,
    Seeking,
    Interaction,
    Click,
    Dblclick,
    Drag,
    DragStart,
    DragEnd,
    Scroll,
    Zoom,
    Error,
    Destroy,
}

impl Event for WaveSurferEvent {
    type Kind = WaveSurferEventKind;

    fn kind(&self) -> WaveSurferEventKind {
        use WaveSurferEvent as E;
        use WaveSurferEventKind as K;
        match self {
            E::Init => K::Init,
            E::Load { .. } => K::Load,
            E::Loading { .. } => K::Loading,
            E::Decode { .. } => K::Decode,
            E::Ready { .. } => K::Ready,
            E::Redraw => K::Redraw,
            E::RedrawComplete => K::RedrawComplete,
            E::Play => K::Play,
            E::Pause => K::Pause,
            E::Finish => K::Finish,
            E::TimeUpdate { .. } => K::TimeUpdate,
            E::AudioProcess { .. } => K::AudioProcess,
            E::Seeking { .. } => K::Seeking,
            E::Interaction { .. } => K::Interaction,
            E::Click { .. } => K::Click,
            E::Dblclick { .. } => K::Dblclick,
            E::Drag { .. } => K::Drag,
            E::DragStart { .. } => K::DragStart,
            E::DragEnd { .. } => K::DragEnd,
            E::Scroll { .. } => K::Scroll,
            E::Zoom { .. } => K::Zoom,
            E::Error { .. } => K::Error,
            E::Destroy => K::Destroy,
        }
    }
}
