//! Pointer input as delivered by the host.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerEventKind {
    Down,
    Move,
    Up,
    /// The pointer left an element. Ends a drag only when it left the document.
    Leave,
    Cancel,
    Click,
    DoubleClick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PointerType {
    #[default]
    Mouse,
    Touch,
    Pen,
}

/// A single pointer event in client (viewport) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub pointer_id: i32,
    pub pointer_type: PointerType,
    pub button: i16,
    pub client_x: f64,
    pub client_y: f64,
    /// Host time the event was dispatched at.
    pub timestamp: Duration,
    /// For `Leave`: the pointer moved outside the document.
    pub related_target_outside: bool,
}

impl PointerEvent {
    pub fn new(kind: PointerEventKind, client_x: f64, client_y: f64) -> Self {
        Self {
            kind,
            pointer_id: 1,
            pointer_type: PointerType::Mouse,
            button: 0,
            client_x,
            client_y,
            timestamp: Duration::ZERO,
            related_target_outside: false,
        }
    }

    pub fn down(x: f64, y: f64) -> Self {
        Self::new(PointerEventKind::Down, x, y)
    }

    pub fn moved(x: f64, y: f64) -> Self {
        Self::new(PointerEventKind::Move, x, y)
    }

    pub fn up(x: f64, y: f64) -> Self {
        Self::new(PointerEventKind::Up, x, y)
    }

    pub fn click(x: f64, y: f64) -> Self {
        Self::new(PointerEventKind::Click, x, y)
    }

    pub fn double_click(x: f64, y: f64) -> Self {
        Self::new(PointerEventKind::DoubleClick, x, y)
    }

    pub fn leave_document(x: f64, y: f64) -> Self {
        Self {
            related_target_outside: true,
            ..Self::new(PointerEventKind::Leave, x, y)
        }
    }

    pub fn at(mut self, timestamp: Duration) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_pointer(mut self, pointer_id: i32, pointer_type: PointerType) -> Self {
        self.pointer_id = pointer_id;
        self.pointer_type = pointer_type;
        self
    }

    pub fn with_button(mut self, button: i16) -> Self {
        self.button = button;
        self
    }
}

/// Bounding box of an element in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ElementRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Client point relative to the element's top-left corner.
    pub fn local(&self, client_x: f64, client_y: f64) -> (f64, f64) {
        (client_x - self.left, client_y - self.top)
    }

    /// Client point as a ratio of the element's size, clamped to `[0, 1]`.
    pub fn relative(&self, client_x: f64, client_y: f64) -> (f64, f64) {
        let (x, y) = self.local(client_x, client_y);
        (ratio(x, self.width), ratio(y, self.height))
    }
}

/// `offset / extent` clamped to `[0, 1]`; degenerate extents give 0.
pub fn ratio(offset: f64, extent: f64) -> f64 {
    if extent > 0.0 {
        (offset / extent).clamp(0.0, 1.0)
    } else {
        0.0
    }
}
