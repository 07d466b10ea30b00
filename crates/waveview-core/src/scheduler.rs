//! Render batching: many render requests, one paint per animation frame.

use crate::host::{HostLoop, TaskId};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;

/// Which lane a render request goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderPriority {
    Low,
    #[default]
    Normal,
    /// Runs synchronously at call time, bypassing the batched lane.
    High,
}

#[derive(Debug, Default)]
struct SchedulerState {
    pending: bool,
    frame: Option<TaskId>,
}

/// Coalesces render requests into at most one batched render per frame.
///
/// While a batched render is pending, further normal/low requests are
/// dropped; the first request's closure runs when the frame fires. Closures
/// that need the freshest state should read it when they run rather than
/// capture it. High-priority requests run inline and never touch the batched
/// lane, so an outstanding batched render still fires on schedule.
#[derive(Clone)]
pub struct RenderScheduler {
    host: Arc<dyn HostLoop>,
    state: Arc<Mutex<SchedulerState>>,
}

impl RenderScheduler {
    pub fn new(host: Arc<dyn HostLoop>) -> Self {
        Self {
            host,
            state: Arc::new(Mutex::new(SchedulerState::default())),
        }
    }

    pub fn schedule_render(&self, render: impl FnOnce() + Send + 'static, priority: RenderPriority) {
        if priority == RenderPriority::High {
            render();
            return;
        }

        {
            let mut state = self.state.lock();
            if state.pending {
                trace!("render coalesced into pending frame");
                return;
            }
            state.pending = true;
        }

        let state = Arc::clone(&self.state);
        let frame = self.host.request_frame(Box::new(move || {
            // Cleared before the render runs: a panicking render cannot leave
            // the lane stuck, and a render may schedule its successor.
            {
                let mut state = state.lock();
                state.pending = false;
                state.frame = None;
            }
            render();
        }));
        self.state.lock().frame = Some(frame);
    }

    /// Cancel the pending batched render, if any.
    pub fn cancel_render(&self) {
        let frame = {
            let mut state = self.state.lock();
            state.pending = false;
            state.frame.take()
        };
        if let Some(frame) = frame {
            self.host.cancel(frame);
        }
    }

    /// Cancel any pending batched render and run `render` now.
    pub fn flush_render(&self, render: impl FnOnce()) {
        self.cancel_render();
        render();
    }

    /// Whether a batched render is waiting for its frame.
    pub fn is_pending(&self) -> bool {
        self.state.lock().pending
    }
}
