//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a ref or a wrapped
//! structure is read, the current computation is registered as a dependent.
//!
//! # Implementation
//!
//! Each [`Runtime`] owns a stack of active computations. Entering a context
//! (running a computed's getter or an effect) pushes the subscriber; the
//! returned guard pops it when dropped, so the previous computation is
//! restored even if the getter panics. Nested contexts (a computed that
//! reads another computed) push on top and restore the outer one on exit.
//!
//! The same stack discipline is used for the ambient store trigger that
//! setup functions install, see [`AmbientTrigger`].

use super::runtime::Runtime;
use super::trigger::StoreTrigger;
use super::SubscriberId;

/// Guard that pops the active computation when dropped.
pub struct ReactiveContext {
    runtime: Runtime,
    subscriber_id: Option<SubscriberId>,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given subscriber.
    ///
    /// While this context is active, tracked reads register the subscriber
    /// as a dependent. The context is exited when the guard is dropped.
    pub fn enter(runtime: &Runtime, subscriber_id: SubscriberId) -> Self {
        runtime.inner().context.lock().push(Some(subscriber_id));
        Self {
            runtime: runtime.clone(),
            subscriber_id: Some(subscriber_id),
        }
    }

    /// Enter a context in which reads are not tracked at all.
    pub fn untracked(runtime: &Runtime) -> Self {
        runtime.inner().context.lock().push(None);
        Self {
            runtime: runtime.clone(),
            subscriber_id: None,
        }
    }

    /// Check if a computation is currently collecting dependencies.
    pub fn is_active(runtime: &Runtime) -> bool {
        Self::current_subscriber(runtime).is_some()
    }

    /// Get the current subscriber ID, if any.
    pub fn current_subscriber(runtime: &Runtime) -> Option<SubscriberId> {
        runtime.inner().context.lock().last().copied().flatten()
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let popped = self.runtime.inner().context.lock().pop();

        // Verify we're popping the right context.
        debug_assert_eq!(
            popped,
            Some(self.subscriber_id),
            "ReactiveContext mismatch: expected {:?}, got {:?}",
            self.subscriber_id,
            popped
        );
    }
}

/// Guard that installs a store trigger as the ambient one.
///
/// Refs and wrappers created while it is installed capture the trigger.
/// The guard must be dropped before the next suspension point; setup
/// functions are synchronous so this holds by construction.
pub struct AmbientTrigger {
    runtime: Runtime,
}

impl AmbientTrigger {
    pub fn install(runtime: &Runtime, trigger: StoreTrigger) -> Self {
        runtime.inner().ambient.lock().push(trigger);
        Self {
            runtime: runtime.clone(),
        }
    }

    /// The innermost installed trigger.
    pub fn current(runtime: &Runtime) -> Option<StoreTrigger> {
        runtime.inner().ambient.lock().last().cloned()
    }
}

impl Drop for AmbientTrigger {
    fn drop(&mut self) {
        self.runtime.inner().ambient.lock().pop();
    }
}
