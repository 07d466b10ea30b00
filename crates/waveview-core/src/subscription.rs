//! Teardown handles for listeners, timers and derived streams.

use std::fmt;

type Teardown = Box<dyn FnOnce() + Send>;

/// Handle returned by every `subscribe`/`on` call.
///
/// Dropping the handle unsubscribes. Call [`Subscription::detach`] to keep the
/// listener alive for the lifetime of its source.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    teardown: Option<Teardown>,
}

impl Subscription {
    pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// A subscription with nothing to tear down.
    pub fn empty() -> Self {
        Self { teardown: None }
    }

    /// Combine several subscriptions into one.
    pub fn merge(subscriptions: Vec<Subscription>) -> Self {
        Self::new(move || drop(subscriptions))
    }

    /// Tear down now.
    pub fn unsubscribe(mut self) {
        self.run();
    }

    /// Forget the teardown; the listener stays registered.
    pub fn detach(mut self) {
        self.teardown = None;
    }

    pub fn is_active(&self) -> bool {
        self.teardown.is_some()
    }

    fn run(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// A bag of subscriptions owned by a component and cleared on destroy.
#[derive(Debug, Default)]
pub struct Subscriptions {
    items: Vec<Subscription>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, subscription: Subscription) {
        self.items.push(subscription);
    }

    pub fn extend(&mut self, subscriptions: impl IntoIterator<Item = Subscription>) {
        self.items.extend(subscriptions);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Unsubscribe everything, in registration order.
    pub fn clear(&mut self) {
        for subscription in self.items.drain(..) {
            subscription.unsubscribe();
        }
    }

    /// Take the subscriptions out so they can be torn down without holding a lock.
    pub fn take(&mut self) -> Subscriptions {
        Subscriptions {
            items: std::mem::take(&mut self.items),
        }
    }
}
