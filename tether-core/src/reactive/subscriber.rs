//! Subscriber types for the reactive system.
//!
//! A Subscriber is any computation that depends on reactive values: a
//! computed's invalidation effect, or an eager [`Effect`](super::Effect).
//! Plain callbacks registered on a ref are tracked separately through a
//! [`CallbackList`] and released with a [`Subscription`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

/// Unique identifier for a subscriber.
///
/// Each subscriber (computed, effect, or callback) gets a unique ID when
/// created. This ID is used to track dependencies and avoid duplicate
/// subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// A computation registered in the dependency graph.
pub trait Subscriber: Send + Sync {
    /// Get the subscriber ID for this computation.
    fn subscriber_id(&self) -> SubscriberId;

    /// Called synchronously when a dependency is triggered.
    fn notify(&self);
}

/// Shared notification callback.
pub type Callback = Arc<dyn Fn() + Send + Sync>;

/// Ordered list of plain callbacks.
#[derive(Default)]
pub(crate) struct CallbackList {
    entries: RwLock<Vec<(SubscriberId, Callback)>>,
}

impl CallbackList {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn add(self: &Arc<Self>, callback: Callback) -> Subscription {
        let id = SubscriberId::new();
        self.entries.write().push((id, callback));

        let list: Weak<Self> = Arc::downgrade(self);
        Subscription::new(move || {
            if let Some(list) = list.upgrade() {
                list.remove(id);
            }
        })
    }

    fn remove(&self, id: SubscriberId) {
        self.entries.write().retain(|(entry, _)| *entry != id);
    }

    /// Copy of the current callbacks, so invoking one may (un)subscribe.
    pub(crate) fn snapshot(&self) -> Vec<Callback> {
        self.entries.read().iter().map(|(_, cb)| Arc::clone(cb)).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }
}

/// Handle to a registered callback.
///
/// Dropping the handle unsubscribes. Use [`Subscription::detach`] to keep
/// the callback for the lifetime of its source.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub(crate) fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription that was never attached to anything.
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    /// Unsubscribe now.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Keep the callback registered for as long as its source lives.
    pub fn detach(mut self) {
        self.cancel = None;
    }

    /// Whether dropping this handle would unsubscribe something.
    pub fn is_attached(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.is_attached())
            .finish()
    }
}
