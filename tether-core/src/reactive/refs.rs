//! Ref Implementation
//!
//! A Ref is the single-value reactive cell. It holds a value and takes part
//! in dependency tracking under its own [`TargetId`].
//!
//! # How Refs Work
//!
//! 1. When a ref is read within a reactive context (computed/effect), the
//!    read is tracked against `(ref id, Key::Value)`.
//!
//! 2. A write compares the new value with the current one. Equal values
//!    (strict identity, with NaN equal to NaN) are a no-op: nothing fires.
//!
//! 3. On a real change the ref stores the value, triggers the graph,
//!    invokes its direct subscribers, and finally fires its captured store
//!    trigger.
//!
//! The captured trigger is fixed at creation: either passed explicitly or
//! taken from the ambient trigger a running setup function installed.

use std::fmt::{self, Debug};
use std::sync::Arc;

use parking_lot::RwLock;

use super::context::AmbientTrigger;
use super::runtime::Runtime;
use super::subscriber::{CallbackList, Subscription};
use super::trigger::StoreTrigger;
use crate::graph::{Key, TargetId};

/// Equality used to decide whether a write is a change.
pub type EqualsFn<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// `PartialEq` extended so that two self-unequal values (NaN) are equal.
#[allow(clippy::eq_op)]
pub fn same_value<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b || (a != a && b != b)
}

/// A reactive cell holding a value of type T.
///
/// # Example
///
/// ```rust,ignore
/// let rt = Runtime::new();
/// let count = Ref::new(&rt, 0);
///
/// let value = count.get();
/// count.set(5); // notifies dependents
/// ```
pub struct Ref<T> {
    inner: Arc<RefInner<T>>,
}

struct RefInner<T> {
    /// Identity in the dependency graph.
    id: TargetId,

    runtime: Runtime,

    value: RwLock<T>,

    equals: EqualsFn<T>,

    /// Direct subscribers, invoked after graph dependents.
    listeners: Arc<CallbackList>,

    /// Captured store trigger, invoked last.
    trigger: Option<StoreTrigger>,
}

impl<T> Ref<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a ref, capturing the ambient store trigger if one is installed.
    pub fn new(runtime: &Runtime, value: T) -> Self
    where
        T: PartialEq,
    {
        Self::with_trigger(runtime, value, AmbientTrigger::current(runtime))
    }

    /// Create a ref with an explicit store trigger (or none).
    pub fn with_trigger(runtime: &Runtime, value: T, trigger: Option<StoreTrigger>) -> Self
    where
        T: PartialEq,
    {
        Self::build(runtime, value, Arc::new(same_value::<T>), trigger)
    }

    /// Create a ref with a custom equality function.
    pub fn with_equals<F>(runtime: &Runtime, value: T, equals: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Self::build(runtime, value, Arc::new(equals), AmbientTrigger::current(runtime))
    }

    fn build(
        runtime: &Runtime,
        value: T,
        equals: EqualsFn<T>,
        trigger: Option<StoreTrigger>,
    ) -> Self {
        Self {
            inner: Arc::new(RefInner {
                id: TargetId::new(),
                runtime: runtime.clone(),
                value: RwLock::new(value),
                equals,
                listeners: CallbackList::new(),
                trigger,
            }),
        }
    }

    /// Get the ref's identity.
    pub fn id(&self) -> TargetId {
        self.inner.id
    }

    /// Get the current value, tracking the read.
    pub fn get(&self) -> T {
        self.inner.runtime.track(self.inner.id, Key::Value);
        self.inner.value.read().clone()
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Run `f` on the current value, tracking the read.
    ///
    /// `f` sees a clone taken before it runs, so it may write this ref.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let value = self.get();
        f(&value)
    }

    /// Set a new value.
    ///
    /// Returns `false` (and notifies nobody) if the value is unchanged.
    pub fn set(&self, value: T) -> bool {
        let changed = {
            let mut guard = self.inner.value.write();
            if (self.inner.equals)(&guard, &value) {
                false
            } else {
                *guard = value;
                true
            }
        };

        if changed {
            self.notify();
        }
        changed
    }

    /// Update the value using a function of the current one.
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&self.inner.value.read());
        self.set(next)
    }

    fn notify(&self) {
        self.inner.runtime.trigger(self.inner.id, Key::Value);
        for listener in self.inner.listeners.snapshot() {
            listener();
        }
        if let Some(trigger) = &self.inner.trigger {
            trigger.fire();
        }
    }

    /// Register a callback invoked after every change.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.listeners.add(Arc::new(callback))
    }

    /// Get the number of direct subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// The store trigger this ref captured at creation.
    pub fn captured_trigger(&self) -> Option<&StoreTrigger> {
        self.inner.trigger.as_ref()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Ref<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.read())
            .field("subscriber_count", &self.inner.listeners.len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
