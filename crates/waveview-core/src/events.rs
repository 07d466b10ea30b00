//! Callback-style event bus keyed by event kind.

use crate::listeners::ListenerSet;
use crate::stream::Stream;
use crate::subscription::Subscription;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// An event that can be routed by its kind.
pub trait Event: Clone + Send + Sync + 'static {
    type Kind: Copy + Eq + Hash + Send + Sync + std::fmt::Debug + 'static;

    fn kind(&self) -> Self::Kind;
}

/// Synchronous, fire-and-forget event bus.
///
/// Listeners run in registration order for their kind, then the catch-all
/// listeners run.
pub struct EventBus<E: Event> {
    by_kind: Arc<Mutex<HashMap<E::Kind, ListenerSet<E>>>>,
    any: ListenerSet<E>,
}

impl<E: Event> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            by_kind: Arc::clone(&self.by_kind),
            any: self.any.clone(),
        }
    }
}

impl<E: Event> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> EventBus<E> {
    pub fn new() -> Self {
        Self {
            by_kind: Arc::new(Mutex::new(HashMap::new())),
            any: ListenerSet::new(),
        }
    }

    fn set_for(&self, kind: E::Kind) -> ListenerSet<E> {
        self.by_kind.lock().entry(kind).or_default().clone()
    }

    pub fn on(&self, kind: E::Kind, f: impl Fn(&E) + Send + Sync + 'static) -> Subscription {
        self.set_for(kind).add(Arc::new(f))
    }

    pub fn once(&self, kind: E::Kind, f: impl Fn(&E) + Send + Sync + 'static) -> Subscription {
        self.set_for(kind).add_once(Arc::new(f))
    }

    pub fn on_any(&self, f: impl Fn(&E) + Send + Sync + 'static) -> Subscription {
        self.any.add(Arc::new(f))
    }

    pub fn emit(&self, event: E) {
        let listeners = self.by_kind.lock().get(&event.kind()).cloned();
        if let Some(listeners) = listeners {
            listeners.notify(&event);
        }
        self.any.notify(&event);
    }

    /// Every emitted event as a stream.
    pub fn stream(&self) -> Stream<E> {
        let any = self.any.clone();
        Stream::new(move |observer| any.add(Arc::new(move |event: &E| observer(event.clone()))))
    }

    pub fn listener_count(&self, kind: E::Kind) -> usize {
        self.by_kind.lock().get(&kind).map_or(0, ListenerSet::len)
    }

    /// Remove every listener.
    pub fn clear(&self) {
        let sets: Vec<ListenerSet<E>> = self.by_kind.lock().drain().map(|(_, s)| s).collect();
        for set in sets {
            set.clear();
        }
        self.any.clear();
    }
}
