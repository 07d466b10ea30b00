//! Waveview Core - reactive plumbing shared by every waveview crate
//!
//! This crate provides:
//! - Error type and `Result` alias
//! - Decoded audio (`ChannelData`, `DecodedAudio`, `Peaks`)
//! - The host event loop abstraction (`HostLoop`, `VirtualLoop`, `TokioLoop`)
//! - Reactive primitives (`Signal`, `Stream`, `Subject`, `EventBus`)
//! - Render batching (`RenderScheduler`)

pub mod audio;
pub mod error;
pub mod events;
pub mod host;
pub mod listeners;
pub mod progress;
pub mod scheduler;
pub mod signal;
pub mod stream;
pub mod subscription;

pub use audio::{ChannelData, DecodedAudio, Peaks};
pub use error::{Result, WaveviewError};
pub use events::{Event, EventBus};
pub use host::{HostLoop, RepeatingTask, Task, TaskId, TokioLoop, VirtualLoop, FRAME_INTERVAL};
pub use progress::{calculate_progress, clamp_ratio};
pub use scheduler::{RenderPriority, RenderScheduler};
pub use signal::{effect, Computed, Signal, Trigger};
pub use stream::{Observer, Stream, Subject};
pub use subscription::{Subscription, Subscriptions};
