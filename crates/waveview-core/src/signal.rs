//! Observable single values with synchronous notification.

use crate::listeners::ListenerSet;
use crate::stream::Stream;
use crate::subscription::Subscription;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

struct SignalInner<T> {
    value: RwLock<T>,
    version: AtomicU64,
    listeners: ListenerSet<T>,
}

/// A mutable value whose subscribers run synchronously on every change.
///
/// `set` with an equal value is a no-op. If a subscriber sets the signal again
/// while a notification is in flight, the outer notification stops: the nested
/// `set` has already delivered the newer value to every subscriber.
pub struct Signal<T> {
    inner: Arc<SignalInner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("value", &*self.inner.value.read())
            .field("subscribers", &self.inner.listeners.len())
            .finish()
    }
}

impl<T: Default + Clone + PartialEq + Send + Sync + 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Signal<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(SignalInner {
                value: RwLock::new(value),
                version: AtomicU64::new(0),
                listeners: ListenerSet::new(),
            }),
        }
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Borrow the current value without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.read())
    }

    /// Store `value` and notify subscribers. Returns whether the value changed.
    pub fn set(&self, value: T) -> bool {
        let version = {
            let mut current = self.inner.value.write();
            if *current == value {
                return false;
            }
            *current = value.clone();
            self.inner.version.fetch_add(1, Ordering::SeqCst) + 1
        };
        for listener in self.inner.listeners.snapshot() {
            if self.inner.version.load(Ordering::SeqCst) != version {
                break;
            }
            listener(&value);
        }
        true
    }

    /// Compute the next value from the current one.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> bool {
        let next = f(&self.inner.value.read());
        self.set(next)
    }

    /// Subscribe to later changes. The current value is not replayed.
    pub fn subscribe(&self, f: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        self.inner.listeners.add(Arc::new(f))
    }

    /// Stream of later values.
    pub fn changes(&self) -> Stream<T> {
        let signal = self.clone();
        Stream::new(move |observer| {
            signal.subscribe(move |value: &T| observer(value.clone()))
        })
    }

    /// Read-only signal derived from this one through `f`.
    pub fn map<U>(&self, f: impl Fn(&T) -> U + Send + Sync + 'static) -> Computed<U>
    where
        U: Clone + PartialEq + Send + Sync + 'static,
    {
        let derived = Signal::new(self.with(&f));
        let target = derived.clone();
        let source = self.subscribe(move |value| {
            target.set(f(value));
        });
        Computed {
            signal: derived,
            _source: Arc::new(Mutex::new(source)),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Drop every subscriber.
    pub fn cleanup(&self) {
        self.inner.listeners.clear();
    }
}

/// A derived, read-only signal. Keeps its upstream subscription alive.
#[derive(Clone)]
pub struct Computed<T> {
    signal: Signal<T>,
    _source: Arc<Mutex<Subscription>>,
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Computed<T> {
    pub fn get(&self) -> T {
        self.signal.get()
    }

    pub fn subscribe(&self, f: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        self.signal.subscribe(f)
    }

    pub fn changes(&self) -> Stream<T> {
        self.signal.changes()
    }
}

/// Anything that can announce "I changed".
pub trait Trigger: Send + Sync {
    fn on_change(&self, f: Arc<dyn Fn() + Send + Sync>) -> Subscription;
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Trigger for Signal<T> {
    fn on_change(&self, f: Arc<dyn Fn() + Send + Sync>) -> Subscription {
        self.subscribe(move |_| f())
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Trigger for Computed<T> {
    fn on_change(&self, f: Arc<dyn Fn() + Send + Sync>) -> Subscription {
        self.signal.on_change(f)
    }
}

/// Run `f` now and again whenever any of `deps` changes.
pub fn effect(deps: &[&dyn Trigger], f: impl Fn() + Send + Sync + 'static) -> Subscription {
    let f: Arc<dyn Fn() + Send + Sync> = Arc::new(f);
    f();
    Subscription::merge(deps.iter().map(|d| d.on_change(Arc::clone(&f))).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_set_notifies_synchronously() {
        let signal = Signal::new(0);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let _sub = signal.subscribe(move |v| s.lock().push(*v));
        assert!(signal.set(1));
        assert!(signal.set(2));
        assert_eq!(*seen.lock(), vec![1, 2]);
    }

    #[test]
    fn test_equal_value_does_not_notify() {
        let signal = Signal::new(5);
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let _sub = signal.subscribe(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        assert!(!signal.set(5));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_nested_set_does_not_deliver_stale_value() {
        let signal = Signal::new(0);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let clamp = signal.clone();
        let _clamp = signal.subscribe(move |v| {
            if *v > 10 {
                clamp.set(10);
            }
        });
        let s = Arc::clone(&seen);
        let _observer = signal.subscribe(move |v| s.lock().push(*v));

        signal.set(42);
        assert_eq!(signal.get(), 10);
        assert_eq!(*seen.lock(), vec![10]);
    }

    #[test]
    fn test_unsubscribe_and_cleanup() {
        let signal = Signal::new(0);
        let sub = signal.subscribe(|_| {});
        let _other = signal.subscribe(|_| {});
        assert_eq!(signal.subscriber_count(), 2);
        sub.unsubscribe();
        assert_eq!(signal.subscriber_count(), 1);
        signal.cleanup();
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn test_map_tracks_source() {
        let seconds = Signal::new(1.5f64);
        let millis = seconds.map(|s| (s * 1000.0) as i64);
        assert_eq!(millis.get(), 1500);
        seconds.set(2.0);
        assert_eq!(millis.get(), 2000);
    }

    #[test]
    fn test_effect_runs_on_each_dependency() {
        let a = Signal::new(1);
        let b = Signal::new(2);
        let runs = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&runs);
        let _effect = effect(&[&a, &b], move || {
            r.fetch_add(1, Ordering::SeqCst);
        });
        a.set(3);
        b.set(4);
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }
}
