//! Threshold-gated drag recognition.
//!
//! [`DragTracker`] is the pure state machine: feed it pointer events and it
//! answers with the drag events they produce. [`DragStream`] wraps a tracker
//! behind a shared handle and multicasts the events.

use crate::pointer::{ElementRect, PointerEvent, PointerEventKind, PointerType};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;
use waveview_core::{Stream, Subject};

/// How long a click stays suppressed after a drag ends.
pub const CLICK_SUPPRESSION: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DragOptions {
    /// Distance in px a pointer must travel before a drag starts.
    pub threshold: f64,
    pub mouse_button: i16,
    /// Touch moves this soon after touch start are ignored.
    pub touch_delay: Duration,
}

impl Default for DragOptions {
    fn default() -> Self {
        Self {
            threshold: 3.0,
            mouse_button: 0,
            touch_delay: Duration::from_millis(100),
        }
    }
}

/// Element-relative drag event. Move deltas are since the previous move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DragEvent {
    Start { x: f64, y: f64 },
    Move { x: f64, y: f64, delta_x: f64, delta_y: f64 },
    End { x: f64, y: f64 },
}

impl DragEvent {
    pub fn x(&self) -> f64 {
        match *self {
            DragEvent::Start { x, .. } | DragEvent::Move { x, .. } | DragEvent::End { x, .. } => x,
        }
    }

    pub fn y(&self) -> f64 {
        match *self {
            DragEvent::Start { y, .. } | DragEvent::Move { y, .. } | DragEvent::End { y, .. } => y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DragState {
    Idle,
    Armed {
        pointer_id: i32,
        pointer_type: PointerType,
        start_x: f64,
        start_y: f64,
        start_scroll: f64,
        started_at: Duration,
    },
    Dragging {
        pointer_id: i32,
        pointer_type: PointerType,
        started_at: Duration,
        last_x: f64,
        last_y: f64,
        last_scroll: f64,
        rect: ElementRect,
    },
}

/// What a pointer event produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DragOutput {
    pub events: SmallVec<[DragEvent; 2]>,
    /// The host should stop default handling and propagation of the event.
    pub consumed: bool,
}

impl DragOutput {
    fn consumed() -> Self {
        Self {
            events: SmallVec::new(),
            consumed: true,
        }
    }
}

/// Drag state machine for one element.
#[derive(Debug, Clone)]
pub struct DragTracker {
    options: DragOptions,
    state: DragState,
    suppress_clicks_until: Option<Duration>,
}

impl DragTracker {
    pub fn new(options: DragOptions) -> Self {
        Self {
            options,
            state: DragState::Idle,
            suppress_clicks_until: None,
        }
    }

    pub fn options(&self) -> &DragOptions {
        &self.options
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, DragState::Armed { .. })
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Forget any gesture in flight without emitting.
    pub fn reset(&mut self) {
        self.state = DragState::Idle;
        self.suppress_clicks_until = None;
    }

    /// Advance the state machine. `rect` is the tracked element's current
    /// bounds and `scroll` the scroll offset of its scrolling ancestor, which
    /// is folded into move deltas and the start threshold.
    pub fn handle(&mut self, event: &PointerEvent, rect: ElementRect, scroll: f64) -> DragOutput {
        match event.kind {
            PointerEventKind::Down => self.on_down(event, scroll),
            PointerEventKind::Move => self.on_move(event, rect, scroll),
            PointerEventKind::Up | PointerEventKind::Cancel => self.on_end(event, rect),
            PointerEventKind::Leave if event.related_target_outside => self.on_end(event, rect),
            PointerEventKind::Leave | PointerEventKind::DoubleClick => DragOutput::default(),
            PointerEventKind::Click => {
                if self.suppresses_click(event.timestamp) {
                    trace!("click after drag suppressed");
                    DragOutput::consumed()
                } else {
                    DragOutput::default()
                }
            }
        }
    }

    fn suppresses_click(&self, at: Duration) -> bool {
        self.is_dragging() || self.suppress_clicks_until.is_some_and(|until| at <= until)
    }

    fn on_down(&mut self, event: &PointerEvent, scroll: f64) -> DragOutput {
        match self.state {
            DragState::Idle => {}
            DragState::Armed { pointer_id, .. } | DragState::Dragging { pointer_id, .. }
                if pointer_id != event.pointer_id =>
            {
                return self.abort();
            }
            _ => self.state = DragState::Idle,
        }

        if event.button != self.options.mouse_button {
            return DragOutput::default();
        }
        self.state = DragState::Armed {
            pointer_id: event.pointer_id,
            pointer_type: event.pointer_type,
            start_x: event.client_x,
            start_y: event.client_y,
            start_scroll: scroll,
            started_at: event.timestamp,
        };
        DragOutput::consumed()
    }

    /// A second pointer went down: stop tracking, closing an open drag at its
    /// last point.
    fn abort(&mut self) -> DragOutput {
        let mut output = DragOutput::default();
        if let DragState::Dragging {
            last_x,
            last_y,
            rect,
            ..
        } = self.state
        {
            let (x, y) = rect.local(last_x, last_y);
            output.events.push(DragEvent::End { x, y });
        }
        trace!("drag aborted by concurrent pointer");
        self.state = DragState::Idle;
        output
    }

    fn within_touch_delay(&self, pointer_type: PointerType, started_at: Duration, now: Duration) -> bool {
        pointer_type == PointerType::Touch && now.saturating_sub(started_at) < self.options.touch_delay
    }

    fn on_move(&mut self, event: &PointerEvent, rect: ElementRect, scroll: f64) -> DragOutput {
        let mut output = DragOutput::default();
        match self.state {
            DragState::Armed {
                pointer_id,
                pointer_type,
                start_x,
                start_y,
                start_scroll,
                started_at,
            } if pointer_id == event.pointer_id => {
                if self.within_touch_delay(pointer_type, started_at, event.timestamp) {
                    return output;
                }
                let dx = event.client_x - start_x + (scroll - start_scroll);
                let dy = event.client_y - start_y;
                if dx.abs().max(dy.abs()) <= self.options.threshold {
                    return output;
                }
                let (sx, sy) = rect.local(start_x, start_y);
                let (x, y) = rect.local(event.client_x, event.client_y);
                output.events.push(DragEvent::Start { x: sx, y: sy });
                output.events.push(DragEvent::Move {
                    x,
                    y,
                    delta_x: dx,
                    delta_y: dy,
                });
                self.state = DragState::Dragging {
                    pointer_id,
                    pointer_type,
                    started_at,
                    last_x: event.client_x,
                    last_y: event.client_y,
                    last_scroll: scroll,
                    rect,
                };
            }
            DragState::Dragging {
                pointer_id,
                pointer_type,
                started_at,
                last_x,
                last_y,
                last_scroll,
                ..
            } if pointer_id == event.pointer_id => {
                let (x, y) = rect.local(event.client_x, event.client_y);
                output.events.push(DragEvent::Move {
                    x,
                    y,
                    delta_x: event.client_x - last_x + (scroll - last_scroll),
                    delta_y: event.client_y - last_y,
                });
                self.state = DragState::Dragging {
                    pointer_id,
                    pointer_type,
                    started_at,
                    last_x: event.client_x,
                    last_y: event.client_y,
                    last_scroll: scroll,
                    rect,
                };
            }
            _ => {}
        }
        output
    }

    fn on_end(&mut self, event: &PointerEvent, rect: ElementRect) -> DragOutput {
        match self.state {
            DragState::Armed { pointer_id, .. } if pointer_id == event.pointer_id => {
                self.state = DragState::Idle;
                DragOutput::default()
            }
            DragState::Dragging { pointer_id, .. } if pointer_id == event.pointer_id => {
                self.state = DragState::Idle;
                self.suppress_clicks_until = Some(event.timestamp + CLICK_SUPPRESSION);
                let (x, y) = rect.local(event.client_x, event.client_y);
                DragOutput {
                    events: SmallVec::from_slice(&[DragEvent::End { x, y }]),
                    consumed: true,
                }
            }
            _ => DragOutput::default(),
        }
    }
}

type ScrollSource = Arc<dyn Fn() -> f64 + Send + Sync>;

/// Shared drag tracker that multicasts its events.
#[derive(Clone)]
pub struct DragStream {
    tracker: Arc<Mutex<DragTracker>>,
    events: Subject<DragEvent>,
    attached: Arc<AtomicBool>,
    scroll: Option<ScrollSource>,
}

impl DragStream {
    pub fn new(options: DragOptions) -> Self {
        Self {
            tracker: Arc::new(Mutex::new(DragTracker::new(options))),
            events: Subject::new(),
            attached: Arc::new(AtomicBool::new(true)),
            scroll: None,
        }
    }

    /// Read the scroll offset from `source` on every event, so moves of a
    /// scrolling container do not show up as phantom jumps.
    pub fn with_scroll_source(mut self, source: impl Fn() -> f64 + Send + Sync + 'static) -> Self {
        self.scroll = Some(Arc::new(source));
        self
    }

    pub fn events(&self) -> Stream<DragEvent> {
        self.events.stream()
    }

    pub fn is_dragging(&self) -> bool {
        self.tracker.lock().is_dragging()
    }

    /// Feed a pointer event. Returns whether the event was consumed.
    pub fn handle_pointer(&self, event: &PointerEvent, rect: ElementRect) -> bool {
        let scroll = self.scroll.as_ref().map_or(0.0, |source| source());
        self.handle_pointer_at(event, rect, scroll)
    }

    /// Feed a pointer event with an explicit scroll offset.
    pub fn handle_pointer_at(&self, event: &PointerEvent, rect: ElementRect, scroll: f64) -> bool {
        if !self.attached.load(Ordering::Acquire) {
            return false;
        }
        let output = self.tracker.lock().handle(event, rect, scroll);
        for drag in output.events {
            self.events.emit(drag);
        }
        output.consumed
    }

    /// Stop listening and drop any gesture in flight. Safe mid-drag and
    /// safe to repeat.
    pub fn cleanup(&self) {
        self.attached.store(false, Ordering::Release);
        self.tracker.lock().reset();
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }
}
