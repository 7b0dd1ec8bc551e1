//! Effect Implementation
//!
//! An Effect is a side-effecting computation that re-runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. When any dependency is triggered, the effect re-runs synchronously,
//!    inside the write that triggered it.
//!
//! 3. Before re-running, the effect clears its old dependencies and tracks
//!    new ones during execution.
//!
//! # Differences from Computed
//!
//! - Computeds return a value; effects do not.
//! - Computeds are lazy (recompute on access); effects are eager.
//! - A write an effect makes to a key it reads does not re-trigger itself.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use super::context::ReactiveContext;
use super::runtime::{ReactiveHandle, Runtime};
use super::subscriber::{Subscriber, SubscriberId};

/// A side-effecting computation that runs when dependencies change.
///
/// # Example
///
/// ```rust,ignore
/// let count = Ref::new(&rt, 0);
///
/// let count_clone = count.clone();
/// let effect = Effect::new(&rt, move || {
///     println!("Count is: {}", count_clone.get());
/// });
///
/// count.set(5);  // Prints: "Count is: 5"
/// ```
#[derive(Clone)]
pub struct Effect {
    inner: Arc<EffectInner>,
}

struct EffectInner {
    subscriber_id: SubscriberId,
    runtime: Runtime,
    run: Box<dyn Fn() + Send + Sync>,
    disposed: AtomicBool,
    run_count: AtomicUsize,
    _handle: ReactiveHandle,
}

impl Effect {
    /// Create a new effect and run it once.
    pub fn new<F>(runtime: &Runtime, run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let effect = Self::new_lazy(runtime, run);
        effect.execute();
        effect
    }

    /// Create a new effect without running it.
    ///
    /// It has no dependencies until [`execute`](Self::execute) is called.
    pub fn new_lazy<F>(runtime: &Runtime, run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let subscriber_id = SubscriberId::new();
        let inner = Arc::new_cyclic(|weak: &Weak<EffectInner>| {
            let subscriber: Weak<dyn Subscriber> = weak.clone();
            EffectInner {
                subscriber_id,
                runtime: runtime.clone(),
                run: Box::new(run),
                disposed: AtomicBool::new(false),
                run_count: AtomicUsize::new(0),
                _handle: runtime.register(subscriber_id, subscriber),
            }
        });
        Self { inner }
    }

    pub fn subscriber_id(&self) -> SubscriberId {
        self.inner.subscriber_id
    }

    /// Run the effect function, re-collecting its dependencies.
    pub fn execute(&self) {
        self.inner.execute();
    }

    /// Stop the effect. It will not run again.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
        self.inner.runtime.clear_dependencies(self.inner.subscriber_id);
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }

    /// Get the number of dependencies.
    pub fn dependency_count(&self) -> usize {
        self.inner.runtime.dependency_count(self.inner.subscriber_id)
    }
}

impl EffectInner {
    fn execute(&self) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }

        if self.runtime.config().prune_stale_dependencies {
            self.runtime.clear_dependencies(self.subscriber_id);
        }

        {
            let _ctx = ReactiveContext::enter(&self.runtime, self.subscriber_id);
            (self.run)();
        }

        self.run_count.fetch_add(1, Ordering::SeqCst);
    }
}

impl Subscriber for EffectInner {
    fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }

    fn notify(&self) {
        self.execute();
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("subscriber_id", &self.inner.subscriber_id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
