//! Computed Implementation
//!
//! A Computed is a cached derived value that re-evaluates only when its
//! dependencies change.
//!
//! # How Computeds Work
//!
//! 1. On creation, the getter runs once to fill the cache and register
//!    dependencies.
//!
//! 2. Reading the value tracks the computed itself (so other computeds can
//!    depend on it), then returns the cache if it is clean.
//!
//! 3. When a dependency is triggered, the computed's invalidation effect
//!    runs. It only flips the computed to dirty and triggers the computed's
//!    own identity; it never recomputes. Dependents are invalidated the same
//!    way, all the way down a chain.
//!
//! 4. The next read of a dirty computed re-runs the getter with the
//!    computed as the active computation.
//!
//! A getter that fails leaves the computed dirty and returns the error to
//! the reader, so the next read retries. Dependents are told about the next
//! dependency change all the same, so a reader that fell back on the error
//! sees the recovery. A getter that reads nothing
//! reactive computes once and stays cached forever.

use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::debug;

use super::context::ReactiveContext;
use super::runtime::{ReactiveHandle, Runtime};
use super::subscriber::{Subscriber, SubscriberId};
use crate::error::Result;
use crate::graph::{Key, TargetId};

type Getter<T> = Arc<dyn Fn() -> Result<T> + Send + Sync>;

/// A cached derived value that recomputes only when dependencies change.
///
/// # Type Parameters
///
/// - `T`: The type of the computed value. Must be Clone + Send + Sync.
pub struct Computed<T> {
    inner: Arc<ComputedInner<T>>,
}

struct ComputedInner<T> {
    /// Identity in the dependency graph, tracked by readers.
    id: TargetId,

    /// The subscriber ID used while the getter runs.
    subscriber_id: SubscriberId,

    runtime: Runtime,

    getter: Getter<T>,

    /// The cached value (None until the first successful run).
    value: RwLock<Option<T>>,

    dirty: AtomicBool,

    /// Set once dependents have been triggered; cleared by every getter run.
    announced: AtomicBool,

    _handle: ReactiveHandle,
}

impl<T> Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a computed from an infallible getter.
    pub fn new<F>(runtime: &Runtime, getter: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::fallible(runtime, move || Ok(getter()))
    }

    /// Create a computed whose getter may fail.
    ///
    /// The getter runs once immediately. If that first run fails the
    /// computed starts out dirty and the next read retries.
    pub fn fallible<F>(runtime: &Runtime, getter: F) -> Self
    where
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        let subscriber_id = SubscriberId::new();
        let inner = Arc::new_cyclic(|weak: &Weak<ComputedInner<T>>| {
            let subscriber: Weak<dyn Subscriber> = weak.clone();
            ComputedInner {
                id: TargetId::new(),
                subscriber_id,
                runtime: runtime.clone(),
                getter: Arc::new(getter),
                value: RwLock::new(None),
                dirty: AtomicBool::new(true),
                announced: AtomicBool::new(false),
                _handle: runtime.register(subscriber_id, subscriber),
            }
        });

        let computed = Self { inner };
        if let Err(error) = computed.recompute() {
            debug!(computed = %computed.inner.id, %error, "initial computation failed");
        }
        computed
    }

    /// Get the computed's identity.
    pub fn id(&self) -> TargetId {
        self.inner.id
    }

    /// Get the subscriber ID for this computed.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.inner.subscriber_id
    }

    /// Get the current value, recomputing if necessary.
    pub fn get(&self) -> Result<T> {
        self.inner.runtime.track(self.inner.id, Key::Value);
        self.get_untracked()
    }

    /// Like [`get`](Self::get), without registering the reader.
    pub fn get_untracked(&self) -> Result<T> {
        if !self.inner.dirty.load(Ordering::SeqCst) {
            if let Some(value) = self.inner.value.read().clone() {
                return Ok(value);
            }
        }
        self.recompute()
    }

    fn recompute(&self) -> Result<T> {
        let inner = &self.inner;
        if inner.runtime.config().prune_stale_dependencies {
            inner.runtime.clear_dependencies(inner.subscriber_id);
        }

        let result = {
            let _ctx = ReactiveContext::enter(&inner.runtime, inner.subscriber_id);
            (inner.getter)()
        };
        inner.announced.store(false, Ordering::SeqCst);

        let value = result?;
        *inner.value.write() = Some(value.clone());
        inner.dirty.store(false, Ordering::SeqCst);
        Ok(value)
    }

    /// Whether the next read will run the getter.
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.load(Ordering::SeqCst)
    }

    /// Number of `(target, key)` pairs the getter read on its last run.
    pub fn dependency_count(&self) -> usize {
        self.inner.runtime.dependency_count(self.inner.subscriber_id)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Subscriber for ComputedInner<T>
where
    T: Send + Sync,
{
    fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }

    /// The invalidation effect.
    fn notify(&self) {
        self.dirty.store(true, Ordering::SeqCst);
        if !self.announced.swap(true, Ordering::SeqCst) {
            self.runtime.trigger(self.id, Key::Value);
        }
    }
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Computed<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.inner.id)
            .field("dirty", &self.inner.dirty.load(Ordering::SeqCst))
            .field("value", &*self.inner.value.read())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::reactive::Ref;
    use std::sync::atomic::AtomicI32;

    fn spy() -> (Arc<AtomicI32>, Arc<AtomicI32>) {
        let count = Arc::new(AtomicI32::new(0));
        (count.clone(), count)
    }

    #[test]
    fn computes_eagerly_on_creation() {
        let rt = Runtime::new();
        let (calls, calls_clone) = spy();

        let computed = Computed::new(&rt, move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            42
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!computed.is_dirty());
        assert_eq!(computed.get().unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn caches_until_a_dependency_changes() {
        let rt = Runtime::new();
        let source = Ref::new(&rt, 2);
        let (calls, calls_clone) = spy();

        let source_clone = source.clone();
        let doubled = Computed::new(&rt, move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            source_clone.get() * 2
        });

        for _ in 0..5 {
            assert_eq!(doubled.get().unwrap(), 4);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        source.set(5);
        assert!(doubled.is_dirty());
        // Invalidation is lazy: nothing ran yet.
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(doubled.get().unwrap(), 10);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn computed_depends_on_computed() {
        let rt = Runtime::new();
        let base = Ref::new(&rt, 5);

        let base_clone = base.clone();
        let doubled = Computed::new(&rt, move || base_clone.get() * 2);

        let doubled_clone = doubled.clone();
        let plus_ten = Computed::fallible(&rt, move || Ok(doubled_clone.get()? + 10));

        assert_eq!(plus_ten.get().unwrap(), 20);

        base.set(10);
        assert!(doubled.is_dirty());
        assert!(plus_ten.is_dirty());
        assert_eq!(plus_ten.get().unwrap(), 30);
    }

    #[test]
    fn failing_getter_stays_dirty_and_retries() {
        let rt = Runtime::new();
        let divisor = Ref::new(&rt, 0);
        let (calls, calls_clone) = spy();

        let divisor_clone = divisor.clone();
        let quotient = Computed::fallible(&rt, move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            match divisor_clone.get() {
                0 => Err(StoreError::Getter("division by zero".into())),
                d => Ok(100 / d),
            }
        });

        assert!(quotient.is_dirty());
        assert!(quotient.get().is_err());
        assert!(quotient.get().is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        divisor.set(4);
        assert_eq!(quotient.get().unwrap(), 25);
        assert!(!quotient.is_dirty());
    }

    #[test]
    fn failed_getter_still_invalidates_dependents() {
        let rt = Runtime::new();
        let divisor = Ref::new(&rt, 0);

        let divisor_clone = divisor.clone();
        let quotient = Computed::fallible(&rt, move || match divisor_clone.get() {
            0 => Err(StoreError::Getter("division by zero".into())),
            d => Ok(100 / d),
        });
        let quotient_clone = quotient.clone();
        let shown = Computed::new(&rt, move || quotient_clone.get().unwrap_or(-1));
        assert_eq!(shown.get().unwrap(), -1);

        divisor.set(4);
        assert!(shown.is_dirty());
        assert_eq!(shown.get().unwrap(), 25);

        // Back to failing, then recovering again
        divisor.set(0);
        assert_eq!(shown.get().unwrap(), -1);
        divisor.set(5);
        assert_eq!(shown.get().unwrap(), 20);
    }

    #[test]
    fn getter_without_reactive_reads_is_cached_forever() {
        let rt = Runtime::new();
        let (calls, calls_clone) = spy();
        let constant = Computed::new(&rt, move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            "fixed"
        });

        let unrelated = Ref::new(&rt, 0);
        unrelated.set(1);

        assert_eq!(constant.get().unwrap(), "fixed");
        assert_eq!(constant.dependency_count(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stale_branches_are_pruned() {
        let rt = Runtime::new();
        let use_left = Ref::new(&rt, true);
        let left = Ref::new(&rt, 1);
        let right = Ref::new(&rt, 2);
        let (calls, calls_clone) = spy();

        let (flag, l, r) = (use_left.clone(), left.clone(), right.clone());
        let pick = Computed::new(&rt, move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            if flag.get() {
                l.get()
            } else {
                r.get()
            }
        });

        use_left.set(false);
        assert_eq!(pick.get().unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // `left` is no longer read, so writing it must not invalidate.
        left.set(100);
        assert!(!pick.is_dirty());
    }

    #[test]
    fn stale_branches_accumulate_when_pruning_is_disabled() {
        let config = crate::config::RuntimeConfig {
            prune_stale_dependencies: false,
            ..Default::default()
        };
        let rt = Runtime::with_config(config);
        let use_left = Ref::new(&rt, true);
        let left = Ref::new(&rt, 1);
        let right = Ref::new(&rt, 2);

        let (flag, l, r) = (use_left.clone(), left.clone(), right.clone());
        let pick = Computed::new(&rt, move || if flag.get() { l.get() } else { r.get() });

        use_left.set(false);
        assert_eq!(pick.get().unwrap(), 2);

        left.set(100);
        assert!(pick.is_dirty());
    }

    #[test]
    fn dropping_a_computed_unregisters_it() {
        let rt = Runtime::new();
        let source = Ref::new(&rt, 1);
        let source_clone = source.clone();
        let computed = Computed::new(&rt, move || source_clone.get());

        assert_eq!(rt.dependent_count(source.id(), &Key::Value), 1);
        drop(computed);
        assert_eq!(rt.dependent_count(source.id(), &Key::Value), 0);
        source.set(2);
    }
}
