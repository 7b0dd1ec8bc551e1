//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects refs, computeds,
//! effects and wrapped structures. It owns the dependency graph and
//! dispatches notifications when something changes.
//!
//! # How It Works
//!
//! 1. Computeds and effects register with the runtime, which holds them
//!    weakly so dropping the last handle unregisters them.
//!
//! 2. When a computation reads a ref or a wrapped structure, the runtime
//!    records the `(target, key)` dependency against the active computation.
//!
//! 3. When a write triggers `(target, key)`, the runtime:
//!    a. Snapshots the subscribers registered against it
//!    b. Skips the computation that is currently running (no self-recursion)
//!    c. Notifies the rest synchronously; computeds only mark themselves
//!       dirty, effects re-run
//!
//! # Isolation
//!
//! Nothing here is process-global. Every `Runtime` carries its own graph,
//! context stacks, identity map, registries and lifecycle hooks, so any
//! number of engines coexist in one process (one per test, one per
//! server, ...). Cloning a `Runtime` clones a handle to the same engine.
//!
//! Stores keep a handle to their runtime, so a runtime with registered
//! stores lives until the process ends or its registries are dropped.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::trace;

use super::context::{AmbientTrigger, ReactiveContext};
use super::subscriber::{Subscriber, SubscriberId};
use super::trigger::StoreTrigger;
use crate::config::RuntimeConfig;
use crate::graph::{DependencyGraph, Key, TargetId};
use crate::store::{Hooks, Registry};
use crate::wrap::IdentityMap;

/// Handle to a registered subscriber.
///
/// Dropping this handle unregisters the subscriber from the runtime and
/// removes all of its dependency edges.
pub struct ReactiveHandle {
    runtime: Weak<RuntimeInner>,
    subscriber_id: SubscriberId,
}

impl Drop for ReactiveHandle {
    fn drop(&mut self) {
        if let Some(inner) = self.runtime.upgrade() {
            inner.subscribers.write().remove(&self.subscriber_id);
            inner.graph.lock().clear_subscriber(self.subscriber_id);
        }
    }
}

/// An independent reactive engine.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

pub(crate) struct RuntimeInner {
    pub(crate) config: RuntimeConfig,
    pub(crate) graph: Mutex<DependencyGraph>,
    pub(crate) subscribers: RwLock<HashMap<SubscriberId, Weak<dyn Subscriber>>>,
    pub(crate) context: Mutex<Vec<Option<SubscriberId>>>,
    pub(crate) ambient: Mutex<Vec<StoreTrigger>>,
    pub(crate) silent: AtomicUsize,
    pub(crate) wrappers: IdentityMap,
    pub(crate) default_registry: Registry,
    pub(crate) active_registry: Mutex<Option<Registry>>,
    pub(crate) hooks: Hooks,
}

impl Runtime {
    /// Create an engine with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let wrappers = IdentityMap::new(config.sweep_threshold);
        Self {
            inner: Arc::new(RuntimeInner {
                config,
                graph: Mutex::new(DependencyGraph::new()),
                subscribers: RwLock::new(HashMap::new()),
                context: Mutex::new(Vec::new()),
                ambient: Mutex::new(Vec::new()),
                silent: AtomicUsize::new(0),
                wrappers,
                default_registry: Registry::new(),
                active_registry: Mutex::new(None),
                hooks: Hooks::default(),
            }),
        }
    }

    pub(crate) fn inner(&self) -> &RuntimeInner {
        &self.inner
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Register a subscriber with the runtime.
    ///
    /// The runtime only holds it weakly. Returns a handle that unregisters
    /// it when dropped.
    pub fn register(&self, subscriber_id: SubscriberId, subscriber: Weak<dyn Subscriber>) -> ReactiveHandle {
        self.inner.subscribers.write().insert(subscriber_id, subscriber);
        ReactiveHandle {
            runtime: Arc::downgrade(&self.inner),
            subscriber_id,
        }
    }

    /// Record that the active computation reads `key` of `target`.
    ///
    /// No-op outside a reactive context.
    pub fn track(&self, target: TargetId, key: Key) {
        let Some(subscriber) = ReactiveContext::current_subscriber(self) else {
            return;
        };
        trace!(%target, %key, ?subscriber, "track");
        self.inner.graph.lock().add(target, key, subscriber);
    }

    /// Notify every computation that read `key` of `target`.
    pub fn trigger(&self, target: TargetId, key: Key) {
        self.trigger_keys(target, std::slice::from_ref(&key));
    }

    /// Notify every computation that read any of `keys` of `target`.
    ///
    /// A computation registered against several of the keys is notified
    /// once.
    pub fn trigger_keys(&self, target: TargetId, keys: &[Key]) {
        let ids = self.inner.graph.lock().dependents_of_keys(target, keys);
        if ids.is_empty() {
            return;
        }

        let active = ReactiveContext::current_subscriber(self);
        let live: Vec<Arc<dyn Subscriber>> = {
            let subscribers = self.inner.subscribers.read();
            ids.iter()
                .filter(|id| Some(**id) != active)
                .filter_map(|id| subscribers.get(id).and_then(Weak::upgrade))
                .collect()
        };

        trace!(%target, keys = keys.len(), notified = live.len(), "trigger");
        for subscriber in live {
            subscriber.notify();
        }
    }

    /// Remove all dependencies of a subscriber.
    ///
    /// Called before re-running a computation to clear stale dependencies.
    pub fn clear_dependencies(&self, subscriber_id: SubscriberId) {
        self.inner.graph.lock().clear_subscriber(subscriber_id);
    }

    /// Number of `(target, key)` pairs a subscriber depends on.
    pub fn dependency_count(&self, subscriber_id: SubscriberId) -> usize {
        self.inner.graph.lock().dependency_count(subscriber_id)
    }

    /// Number of computations registered against `(target, key)`.
    pub fn dependent_count(&self, target: TargetId, key: &Key) -> usize {
        self.inner.graph.lock().dependent_count(target, key)
    }

    /// Get the current subscriber being tracked, if any.
    pub fn current_subscriber(&self) -> Option<SubscriberId> {
        ReactiveContext::current_subscriber(self)
    }

    /// Check if we're inside a reactive context.
    pub fn is_tracking(&self) -> bool {
        ReactiveContext::is_active(self)
    }

    /// Run `f` without recording any dependency.
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        let _ctx = ReactiveContext::untracked(self);
        f()
    }

    /// Run `f` with store triggers suppressed.
    ///
    /// Fine-grained dependents are still notified; only the coarse change
    /// signals stay put. Used to adopt state that is already current.
    pub fn silently<R>(&self, f: impl FnOnce() -> R) -> R {
        struct Restore<'a>(&'a AtomicUsize);
        impl Drop for Restore<'_> {
            fn drop(&mut self) {
                self.0.fetch_sub(1, Ordering::SeqCst);
            }
        }

        self.inner.silent.fetch_add(1, Ordering::SeqCst);
        let _restore = Restore(&self.inner.silent);
        f()
    }

    pub fn is_silent(&self) -> bool {
        self.inner.silent.load(Ordering::SeqCst) > 0
    }

    /// The store trigger installed by the innermost running setup function.
    pub fn ambient_trigger(&self) -> Option<StoreTrigger> {
        AmbientTrigger::current(self)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("subscribers", &self.inner.subscribers.read().len())
            .field("targets", &self.inner.graph.lock().target_count())
            .finish()
    }
}
