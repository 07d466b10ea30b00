//! Frame-rate ticker that drives progress between media time updates.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;
use waveview_core::{HostLoop, Stream, Subject, TaskId, FRAME_INTERVAL};

/// Emits a tick every animation frame while running.
///
/// Holds no clock of its own: subscribers read the playback position from
/// the player on each tick.
pub struct Timer {
    host: Arc<dyn HostLoop>,
    interval: Mutex<Option<TaskId>>,
    ticks: Subject<()>,
}

impl Timer {
    pub fn new(host: Arc<dyn HostLoop>) -> Self {
        Self {
            host,
            interval: Mutex::new(None),
            ticks: Subject::new(),
        }
    }

    pub fn ticks(&self) -> Stream<()> {
        self.ticks.stream()
    }

    /// Start ticking. Already running is a no-op.
    pub fn start(&self) {
        let mut interval = self.interval.lock();
        if interval.is_some() {
            return;
        }
        let ticks = self.ticks.clone();
        *interval = Some(
            self.host
                .set_interval(FRAME_INTERVAL, Arc::new(move || ticks.emit(()))),
        );
        trace!("timer started");
    }

    pub fn stop(&self) {
        let interval = self.interval.lock().take();
        if let Some(id) = interval {
            self.host.cancel(id);
            trace!("timer stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.interval.lock().is_some()
    }

    pub fn destroy(&self) {
        self.stop();
        self.ticks.complete();
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.stop();
    }
}
