//! Gesture recognition for waveview.
//!
//! Turns raw pointer events into normalized drag events and tracks the
//! scroll geometry of the waveform viewport.

pub mod drag;
pub mod pointer;
pub mod scroll;

pub use drag::{DragEvent, DragOptions, DragOutput, DragStream, DragTracker, CLICK_SUPPRESSION};
pub use pointer::{ratio, ElementRect, PointerEvent, PointerEventKind, PointerType};
pub use scroll::ScrollState;
