//! Host event loop abstraction: animation frames, timeouts and intervals.
//!
//! Everything time-driven in waveview (render batching, the playback timer,
//! debounced streams) goes through [`HostLoop`], so the same code runs on a
//! real runtime ([`TokioLoop`]) and on deterministic virtual time
//! ([`VirtualLoop`]).

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// One animation frame at 60 Hz, rounded down to whole milliseconds.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

pub type Task = Box<dyn FnOnce() + Send>;
pub type RepeatingTask = Arc<dyn Fn() + Send + Sync>;

/// Handle for a scheduled frame, timeout or interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

/// The event loop a component is driven by.
pub trait HostLoop: Send + Sync {
    /// Monotonic time since the loop started.
    fn now(&self) -> Duration;

    /// Run `task` on the next animation frame.
    fn request_frame(&self, task: Task) -> TaskId;

    /// Run `task` once after `delay`.
    fn set_timeout(&self, delay: Duration, task: Task) -> TaskId;

    /// Run `task` every `period` until cancelled.
    fn set_interval(&self, period: Duration, task: RepeatingTask) -> TaskId;

    /// Cancel a frame, timeout or interval. Unknown ids are ignored.
    fn cancel(&self, id: TaskId);
}

enum TimerKind {
    Once(Task),
    Repeating { period: Duration, task: RepeatingTask },
}

struct VirtualTimer {
    id: TaskId,
    due: Duration,
    kind: TimerKind,
}

#[derive(Default)]
struct VirtualState {
    now: Duration,
    next_id: u64,
    frames: Vec<(TaskId, Task)>,
    timers: Vec<VirtualTimer>,
}

impl VirtualState {
    fn allocate(&mut self) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        id
    }

    fn next_frame_at(&self) -> Duration {
        let frame = FRAME_INTERVAL.as_nanos();
        let elapsed = self.now.as_nanos() / frame + 1;
        Duration::from_nanos((elapsed * frame) as u64)
    }

    fn next_timer(&self) -> Option<(usize, Duration)> {
        self.timers
            .iter()
            .enumerate()
            .min_by_key(|(_, t)| (t.due, t.id))
            .map(|(i, t)| (i, t.due))
    }
}

enum Due {
    Timer(usize),
    Frames,
}

/// Deterministic event loop driven by explicit time advances.
///
/// Frames fire on 16 ms boundaries; timers due at or before a frame boundary
/// run first. Tasks never run while the loop's lock is held, so they may
/// schedule or cancel other tasks.
#[derive(Clone, Default)]
pub struct VirtualLoop {
    state: Arc<Mutex<VirtualState>>,
}

impl VirtualLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward by `delta`, running everything that falls due.
    pub fn advance(&self, delta: Duration) {
        let target = self.state.lock().now + delta;
        loop {
            let due = {
                let mut state = self.state.lock();
                let timer = state.next_timer().filter(|(_, due)| *due <= target);
                let frame = (!state.frames.is_empty())
                    .then(|| state.next_frame_at())
                    .filter(|at| *at <= target);
                match (timer, frame) {
                    (Some((index, due)), Some(at)) if due <= at => {
                        state.now = state.now.max(due);
                        Due::Timer(index)
                    }
                    (_, Some(at)) => {
                        state.now = at;
                        Due::Frames
                    }
                    (Some((index, due)), None) => {
                        state.now = state.now.max(due);
                        Due::Timer(index)
                    }
                    (None, None) => {
                        state.now = target;
                        break;
                    }
                }
            };
            match due {
                Due::Timer(index) => self.fire_timer(index),
                Due::Frames => self.fire_frames(),
            }
        }
    }

    /// Advance to the next frame boundary.
    pub fn advance_frame(&self) {
        let delta = {
            let state = self.state.lock();
            state.next_frame_at() - state.now
        };
        self.advance(delta);
    }

    /// Run timers that are already due without moving time.
    pub fn flush(&self) {
        self.advance(Duration::ZERO);
    }

    pub fn pending_frames(&self) -> usize {
        self.state.lock().frames.len()
    }

    pub fn pending_timers(&self) -> usize {
        self.state.lock().timers.len()
    }

    fn fire_timer(&self, index: usize) {
        let task: Task = {
            let mut state = self.state.lock();
            if let TimerKind::Repeating { period, task } = &state.timers[index].kind {
                let (period, task) = (*period, Arc::clone(task));
                state.timers[index].due += period;
                Box::new(move || task())
            } else {
                match state.timers.swap_remove(index).kind {
                    TimerKind::Once(task) => task,
                    TimerKind::Repeating { task, .. } => Box::new(move || task()),
                }
            }
        };
        task();
    }

    fn fire_frames(&self) {
        let frames = std::mem::take(&mut self.state.lock().frames);
        for (_, task) in frames {
            task();
        }
    }
}

impl HostLoop for VirtualLoop {
    fn now(&self) -> Duration {
        self.state.lock().now
    }

    fn request_frame(&self, task: Task) -> TaskId {
        let mut state = self.state.lock();
        let id = state.allocate();
        state.frames.push((id, task));
        id
    }

    fn set_timeout(&self, delay: Duration, task: Task) -> TaskId {
        let mut state = self.state.lock();
        let id = state.allocate();
        let due = state.now + delay;
        state.timers.push(VirtualTimer {
            id,
            due,
            kind: TimerKind::Once(task),
        });
        id
    }

    fn set_interval(&self, period: Duration, task: RepeatingTask) -> TaskId {
        let period = period.max(Duration::from_millis(1));
        let mut state = self.state.lock();
        let id = state.allocate();
        let due = state.now + period;
        state.timers.push(VirtualTimer {
            id,
            due,
            kind: TimerKind::Repeating { period, task },
        });
        id
    }

    fn cancel(&self, id: TaskId) {
        let mut state = self.state.lock();
        state.frames.retain(|(frame, _)| *frame != id);
        state.timers.retain(|t| t.id != id);
    }
}

/// Event loop backed by a tokio runtime. Frames are 16 ms sleeps.
pub struct TokioLoop {
    handle: tokio::runtime::Handle,
    start: tokio::time::Instant,
    next_id: AtomicU64,
    tasks: Arc<Mutex<HashMap<TaskId, JoinHandle<()>>>>,
}

impl TokioLoop {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self {
            handle,
            start: tokio::time::Instant::now(),
            next_id: AtomicU64::new(0),
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Use the runtime of the calling context.
    pub fn current() -> Option<Self> {
        tokio::runtime::Handle::try_current().ok().map(Self::new)
    }

    fn allocate(&self) -> TaskId {
        TaskId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl HostLoop for TokioLoop {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn request_frame(&self, task: Task) -> TaskId {
        self.set_timeout(FRAME_INTERVAL, task)
    }

    fn set_timeout(&self, delay: Duration, task: Task) -> TaskId {
        let id = self.allocate();
        let tasks = Arc::clone(&self.tasks);
        // Hold the map lock so the task cannot remove itself before it is inserted.
        let mut map = self.tasks.lock();
        let handle = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            tasks.lock().remove(&id);
            task();
        });
        map.insert(id, handle);
        id
    }

    fn set_interval(&self, period: Duration, task: RepeatingTask) -> TaskId {
        let id = self.allocate();
        let period = period.max(Duration::from_millis(1));
        let handle = self.handle.spawn(async move {
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                interval.tick().await;
                task();
            }
        });
        self.tasks.lock().insert(id, handle);
        id
    }

    fn cancel(&self, id: TaskId) {
        if let Some(handle) = self.tasks.lock().remove(&id) {
            handle.abort();
        }
    }
}

impl Drop for TokioLoop {
    fn drop(&mut self) {
        for (_, handle) in self.tasks.lock().drain() {
            handle.abort();
        }
    }
}
