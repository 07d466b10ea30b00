//! Waveview Media - the bridge between waveview and a playing media element
//!
//! This crate provides:
//! - The `MediaElement` contract and a deterministic `SimulatedMedia`
//! - Blobs and object URLs (`Blob`, `BlobUrls`, `BlobRegistry`)
//! - `Player`, which mirrors media events into signals
//! - `Timer`, the per-frame progress ticker

pub mod blob;
pub mod element;
pub mod error;
pub mod player;
pub mod simulated;
pub mod timer;

pub use blob::{Blob, BlobRegistry, BlobUrls};
pub use element::{MediaElement, MediaEvent, MediaEventKind, MediaListener};
pub use error::MediaError;
pub use player::{MediaHandle, Player, PlayerOptions};
pub use simulated::{SimulatedMedia, TIMEUPDATE_INTERVAL};
pub use timer::Timer;
