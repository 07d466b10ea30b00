//! Listener registry shared by signals, subjects and the event bus.
//!
//! Notification snapshots the listener list first, so listeners may subscribe,
//! unsubscribe or emit again without deadlocking.

use crate::subscription::Subscription;
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::sync::{Arc, Weak};

pub type Listener<A> = Arc<dyn Fn(&A) + Send + Sync>;

struct Entry<A: ?Sized> {
    id: u64,
    once: bool,
    listener: Listener<A>,
}

struct Registry<A: ?Sized> {
    next_id: u64,
    entries: SmallVec<[Entry<A>; 4]>,
}

/// A cloneable, thread-safe list of listeners taking `&A`.
pub struct ListenerSet<A: ?Sized> {
    registry: Arc<Mutex<Registry<A>>>,
}

impl<A: ?Sized> Clone for ListenerSet<A> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<A: ?Sized + 'static> Default for ListenerSet<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: ?Sized + 'static> ListenerSet<A> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                entries: SmallVec::new(),
            })),
        }
    }

    pub fn add(&self, listener: Listener<A>) -> Subscription {
        self.insert(listener, false)
    }

    /// Listener removed after its first invocation.
    pub fn add_once(&self, listener: Listener<A>) -> Subscription {
        self.insert(listener, true)
    }

    fn insert(&self, listener: Listener<A>, once: bool) -> Subscription {
        let id = {
            let mut registry = self.registry.lock();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.entries.push(Entry { id, once, listener });
            id
        };
        let weak: Weak<Mutex<Registry<A>>> = Arc::downgrade(&self.registry);
        Subscription::new(move || {
            if let Some(registry) = weak.upgrade() {
                registry.lock().entries.retain(|e| e.id != id);
            }
        })
    }

    /// Current listeners; one-shot listeners are removed from the set.
    pub fn snapshot(&self) -> SmallVec<[Listener<A>; 4]> {
        let mut registry = self.registry.lock();
        let snapshot = registry
            .entries
            .iter()
            .map(|e| Arc::clone(&e.listener))
            .collect();
        registry.entries.retain(|e| !e.once);
        snapshot
    }

    /// Invoke every listener with `value`.
    pub fn notify(&self, value: &A) {
        for listener in self.snapshot() {
            listener(value);
        }
    }

    pub fn len(&self) -> usize {
        self.registry.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.registry.lock().entries.clear();
    }
}
