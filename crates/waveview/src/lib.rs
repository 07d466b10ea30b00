//! Waveview - an audio waveform bound to media playback
//!
//! This crate provides:
//! - [`WaveSurfer`], the orchestrator tying a media element, the waveform
//!   renderer and the playback timer together
//! - Options and their partial updates ([`WaveSurferOptions`], [`OptionsPatch`])
//! - Pluggable fetching and decoding ([`Fetcher`], [`Decoder`])
//! - Instance-scoped plugins ([`Plugin`], [`PluginBase`])

pub mod decoder;
pub mod events;
pub mod fetcher;
pub mod options;
pub mod plugin;
pub mod wavesurfer;

pub use decoder::{create_buffer, normalize, Decoder, PcmDecoder};
pub use events::{WaveSurferEvent, WaveSurferEventKind};
pub use fetcher::{monotonic, AbortController, AbortSignal, BoxFuture, FetchParams, Fetcher, MemoryFetcher, ProgressFn};
pub use options::{DragToSeek, OptionsPatch, WaveSurferOptions};
pub use plugin::{Plugin, PluginBase, PluginEvent, PluginEventKind};
pub use wavesurfer::{WaveSurfer, WaveSurferConfig, WeakWaveSurfer};

pub use waveview_core::{Result, WaveviewError};
