//! Push-based streams with derivation operators.
//!
//! A [`Stream`] is cold: every `subscribe` call runs the source's subscribe
//! function and gets its own upstream subscription. Dropping the returned
//! [`Subscription`] tears the whole chain down. [`Stream::share`] turns a
//! stream hot with reference counting; [`Subject`] is a hot source.

use crate::host::{HostLoop, TaskId};
use crate::listeners::ListenerSet;
use crate::subscription::Subscription;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub type Observer<T> = Arc<dyn Fn(T) + Send + Sync>;

type SubscribeFn<T> = dyn Fn(Observer<T>) -> Subscription + Send + Sync;

type Slot = Arc<Mutex<Option<Subscription>>>;

fn empty_slot() -> Slot {
    Arc::new(Mutex::new(None))
}

/// Drop the subscription held in `slot` without holding the slot's lock.
fn release(slot: &Slot) {
    let subscription = slot.lock().take();
    drop(subscription);
}

pub struct Stream<T> {
    source: Arc<SubscribeFn<T>>,
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<T: Clone + Send + 'static> Stream<T> {
    /// Build a stream from its subscribe function.
    pub fn new(subscribe: impl Fn(Observer<T>) -> Subscription + Send + Sync + 'static) -> Self {
        Self {
            source: Arc::new(subscribe),
        }
    }

    /// A stream that never emits.
    pub fn never() -> Self {
        Self::new(|_| Subscription::empty())
    }

    pub fn subscribe(&self, f: impl Fn(T) + Send + Sync + 'static) -> Subscription {
        (self.source)(Arc::new(f))
    }

    pub fn map<U: Clone + Send + 'static>(
        &self,
        f: impl Fn(T) -> U + Send + Sync + 'static,
    ) -> Stream<U> {
        let upstream = self.clone();
        let f = Arc::new(f);
        Stream::new(move |observer: Observer<U>| {
            let f = Arc::clone(&f);
            upstream.subscribe(move |value| observer(f(value)))
        })
    }

    pub fn filter(&self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Stream<T> {
        let upstream = self.clone();
        let predicate = Arc::new(predicate);
        Stream::new(move |observer: Observer<T>| {
            let predicate = Arc::clone(&predicate);
            upstream.subscribe(move |value| {
                if predicate(&value) {
                    observer(value);
                }
            })
        })
    }

    /// Only the first `count` values, then unsubscribe upstream.
    pub fn take(&self, count: usize) -> Stream<T> {
        let upstream = self.clone();
        Stream::new(move |observer: Observer<T>| {
            if count == 0 {
                return Subscription::empty();
            }
            let remaining = Arc::new(AtomicUsize::new(count));
            let slot = empty_slot();
            let (left, inner_slot) = (Arc::clone(&remaining), Arc::clone(&slot));
            let subscription = upstream.subscribe(move |value| {
                let taken = left.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
                if let Ok(before) = taken {
                    observer(value);
                    if before == 1 {
                        release(&inner_slot);
                    }
                }
            });
            if remaining.load(Ordering::SeqCst) == 0 {
                return Subscription::empty();
            }
            *slot.lock() = Some(subscription);
            Subscription::new(move || release(&slot))
        })
    }

    /// Values until `notifier` emits for the first time.
    pub fn take_until<U: Clone + Send + 'static>(&self, notifier: &Stream<U>) -> Stream<T> {
        let upstream = self.clone();
        let notifier = notifier.clone();
        Stream::new(move |observer: Observer<T>| {
            let done = Arc::new(AtomicBool::new(false));
            let source_slot = empty_slot();
            let notifier_slot = empty_slot();

            let (d, s, n) = (
                Arc::clone(&done),
                Arc::clone(&source_slot),
                Arc::clone(&notifier_slot),
            );
            let stop = notifier.subscribe(move |_| {
                if !d.swap(true, Ordering::SeqCst) {
                    release(&s);
                    release(&n);
                }
            });
            if done.load(Ordering::SeqCst) {
                return Subscription::empty();
            }
            *notifier_slot.lock() = Some(stop);

            let d = Arc::clone(&done);
            let source = upstream.subscribe(move |value| {
                if !d.load(Ordering::SeqCst) {
                    observer(value);
                }
            });
            if done.load(Ordering::SeqCst) {
                return Subscription::empty();
            }
            *source_slot.lock() = Some(source);

            Subscription::new(move || {
                release(&source_slot);
                release(&notifier_slot);
            })
        })
    }

    /// Latest pair, once both streams have emitted.
    pub fn combine<U: Clone + Send + 'static>(&self, other: &Stream<U>) -> Stream<(T, U)> {
        let left = self.clone();
        let right = other.clone();
        Stream::new(move |observer: Observer<(T, U)>| {
            let latest: Arc<Mutex<(Option<T>, Option<U>)>> = Arc::new(Mutex::new((None, None)));

            let (state, out) = (Arc::clone(&latest), Arc::clone(&observer));
            let a = left.subscribe(move |value| {
                let pair = {
                    let mut state = state.lock();
                    state.0 = Some(value);
                    state.0.clone().zip(state.1.clone())
                };
                if let Some(pair) = pair {
                    out(pair);
                }
            });

            let state = Arc::clone(&latest);
            let b = right.subscribe(move |value| {
                let pair = {
                    let mut state = state.lock();
                    state.1 = Some(value);
                    state.0.clone().zip(state.1.clone())
                };
                if let Some(pair) = pair {
                    observer(pair);
                }
            });
            Subscription::merge(vec![a, b])
        })
    }

    /// Values from both streams, interleaved as they arrive.
    pub fn merge(&self, other: &Stream<T>) -> Stream<T> {
        let left = self.clone();
        let right = other.clone();
        Stream::new(move |observer: Observer<T>| {
            let out = Arc::clone(&observer);
            let a = left.subscribe(move |value| out(value));
            let b = right.subscribe(move |value| observer(value));
            Subscription::merge(vec![a, b])
        })
    }

    /// Emit the latest value once `delay` has passed without a newer one.
    pub fn debounce(&self, host: Arc<dyn HostLoop>, delay: Duration) -> Stream<T> {
        let upstream = self.clone();
        Stream::new(move |observer: Observer<T>| {
            let pending: Arc<Mutex<Option<TaskId>>> = Arc::new(Mutex::new(None));
            let (timer_host, timer_slot) = (Arc::clone(&host), Arc::clone(&pending));
            let subscription = upstream.subscribe(move |value| {
                if let Some(previous) = timer_slot.lock().take() {
                    timer_host.cancel(previous);
                }
                let observer = Arc::clone(&observer);
                let fired = Arc::clone(&timer_slot);
                let id = timer_host.set_timeout(
                    delay,
                    Box::new(move || {
                        fired.lock().take();
                        observer(value);
                    }),
                );
                *timer_slot.lock() = Some(id);
            });
            let host = Arc::clone(&host);
            Subscription::new(move || {
                drop(subscription);
                if let Some(id) = pending.lock().take() {
                    host.cancel(id);
                }
            })
        })
    }

    /// Emit a value, then drop values until `window` has passed.
    pub fn throttle(&self, host: Arc<dyn HostLoop>, window: Duration) -> Stream<T> {
        let upstream = self.clone();
        Stream::new(move |observer: Observer<T>| {
            let last: Arc<Mutex<Option<Duration>>> = Arc::new(Mutex::new(None));
            let host = Arc::clone(&host);
            upstream.subscribe(move |value| {
                let now = host.now();
                let open = {
                    let mut last = last.lock();
                    let open = last.map_or(true, |at| now.saturating_sub(at) >= window);
                    if open {
                        *last = Some(now);
                    }
                    open
                };
                if open {
                    observer(value);
                }
            })
        })
    }

    /// Multicast: one upstream subscription shared by all observers,
    /// connected on the first observer and released with the last.
    pub fn share(&self) -> Stream<T> {
        let upstream = self.clone();
        let listeners: ListenerSet<T> = ListenerSet::new();
        let connection = empty_slot();
        let observers = Arc::new(AtomicUsize::new(0));
        Stream::new(move |observer: Observer<T>| {
            let listener = listeners.add(Arc::new(move |value: &T| observer(value.clone())));
            if observers.fetch_add(1, Ordering::SeqCst) == 0 {
                let fanout = listeners.clone();
                let upstream_subscription = upstream.subscribe(move |value| fanout.notify(&value));
                *connection.lock() = Some(upstream_subscription);
            }
            let (observers, connection) = (Arc::clone(&observers), Arc::clone(&connection));
            Subscription::new(move || {
                drop(listener);
                if observers.fetch_sub(1, Ordering::SeqCst) == 1 {
                    release(&connection);
                }
            })
        })
    }
}

impl<T: Clone + PartialEq + Send + 'static> Stream<T> {
    /// Drop values equal to the previous emitted one.
    pub fn distinct(&self) -> Stream<T> {
        let upstream = self.clone();
        Stream::new(move |observer: Observer<T>| {
            let previous: Arc<Mutex<Option<T>>> = Arc::new(Mutex::new(None));
            upstream.subscribe(move |value| {
                let fresh = {
                    let mut previous = previous.lock();
                    if previous.as_ref() == Some(&value) {
                        false
                    } else {
                        *previous = Some(value.clone());
                        true
                    }
                };
                if fresh {
                    observer(value);
                }
            })
        })
    }
}

/// Hot source: values emitted reach the observers subscribed at that moment.
pub struct Subject<T: 'static> {
    listeners: ListenerSet<T>,
}

impl<T: 'static> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> Subject<T> {
    pub fn new() -> Self {
        Self {
            listeners: ListenerSet::new(),
        }
    }

    pub fn emit(&self, value: T) {
        self.listeners.notify(&value);
    }

    pub fn stream(&self) -> Stream<T> {
        let listeners = self.listeners.clone();
        Stream::new(move |observer: Observer<T>| {
            listeners.add(Arc::new(move |value: &T| observer(value.clone())))
        })
    }

    pub fn observer_count(&self) -> usize {
        self.listeners.len()
    }

    /// Detach every observer.
    pub fn complete(&self) {
        self.listeners.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::VirtualLoop;

    fn collect<T: Clone + Send + 'static>(stream: &Stream<T>) -> (Arc<Mutex<Vec<T>>>, Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let sub = stream.subscribe(move |v| s.lock().push(v));
        (seen, sub)
    }

    #[test]
    fn test_map_filter_chain() {
        let subject = Subject::<i32>::new();
        let stream = subject.stream().map(|v: i32| v * 10).filter(|v| *v > 10);
        let (seen, _sub) = collect(&stream);
        for v in 0..4 {
            subject.emit(v);
        }
        assert_eq!(*seen.lock(), vec![20, 30]);
    }

    #[test]
    fn test_distinct() {
        let subject = Subject::<i32>::new();
        let (seen, _sub) = collect(&subject.stream().distinct());
        for v in [1, 1, 2, 2, 1] {
            subject.emit(v);
        }
        assert_eq!(*seen.lock(), vec![1, 2, 1]);
    }

    #[test]
    fn test_take_unsubscribes_upstream() {
        let subject = Subject::<i32>::new();
        let (seen, _sub) = collect(&subject.stream().take(2));
        assert_eq!(subject.observer_count(), 1);
        for v in 0..5 {
            subject.emit(v);
        }
        assert_eq!(*seen.lock(), vec![0, 1]);
        assert_eq!(subject.observer_count(), 0);
    }

    #[test]
    fn test_take_until() {
        let source = Subject::<i32>::new();
        let stop = Subject::<()>::new();
        let (seen, _sub) = collect(&source.stream().take_until(&stop.stream()));
        source.emit(1);
        stop.emit(());
        source.emit(2);
        assert_eq!(*seen.lock(), vec![1]);
        assert_eq!(source.observer_count(), 0);
        assert_eq!(stop.observer_count(), 0);
    }

    #[test]
    fn test_combine_waits_for_both() {
        let a = Subject::<i32>::new();
        let b = Subject::<char>::new();
        let (seen, _sub) = collect(&a.stream().combine(&b.stream()));
        a.emit(1);
        assert!(seen.lock().is_empty());
        b.emit('x');
        a.emit(2);
        assert_eq!(*seen.lock(), vec![(1, 'x'), (2, 'x')]);
    }

    #[test]
    fn test_debounce_emits_latest() {
        let host = VirtualLoop::new();
        let subject = Subject::<i32>::new();
        let stream = subject
            .stream()
            .debounce(Arc::new(host.clone()), Duration::from_millis(100));
        let (seen, _sub) = collect(&stream);
        subject.emit(1);
        host.advance(Duration::from_millis(50));
        subject.emit(2);
        host.advance(Duration::from_millis(99));
        assert!(seen.lock().is_empty());
        host.advance(Duration::from_millis(1));
        assert_eq!(*seen.lock(), vec![2]);
    }

    #[test]
    fn test_debounce_cancelled_on_unsubscribe() {
        let host = VirtualLoop::new();
        let subject = Subject::<i32>::new();
        let stream = subject
            .stream()
            .debounce(Arc::new(host.clone()), Duration::from_millis(100));
        let (seen, sub) = collect(&stream);
        subject.emit(1);
        drop(sub);
        assert_eq!(host.pending_timers(), 0);
        host.advance(Duration::from_millis(200));
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_throttle_leading_edge() {
        let host = VirtualLoop::new();
        let subject = Subject::<i32>::new();
        let stream = subject
            .stream()
            .throttle(Arc::new(host.clone()), Duration::from_millis(16));
        let (seen, _sub) = collect(&stream);
        subject.emit(1);
        subject.emit(2);
        host.advance(Duration::from_millis(16));
        subject.emit(3);
        assert_eq!(*seen.lock(), vec![1, 3]);
    }

    #[test]
    fn test_share_reference_counts_upstream() {
        let subject = Subject::<i32>::new();
        let shared = subject.stream().map(|v: i32| v + 1).share();
        let (first, sub_a) = collect(&shared);
        let (second, sub_b) = collect(&shared);
        assert_eq!(subject.observer_count(), 1);
        subject.emit(1);
        assert_eq!(*first.lock(), vec![2]);
        assert_eq!(*second.lock(), vec![2]);
        drop(sub_a);
        assert_eq!(subject.observer_count(), 1);
        drop(sub_b);
        assert_eq!(subject.observer_count(), 0);
        let (_third, _sub_c) = collect(&shared);
        assert_eq!(subject.observer_count(), 1);
    }

    #[test]
    fn test_merge() {
        let a = Subject::<i32>::new();
        let b = Subject::<i32>::new();
        let (seen, _sub) = collect(&a.stream().merge(&b.stream()));
        a.emit(1);
        b.emit(2);
        assert_eq!(*seen.lock(), vec![1, 2]);
    }
}
