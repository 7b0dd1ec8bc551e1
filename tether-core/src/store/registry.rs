//! Store Registry
//!
//! A registry maps store ids to live instances. Every runtime owns one
//! long-lived default registry; isolated registries are created on demand
//! and made active for the duration of, say, one server request so that
//! concurrent requests never share mutable singletons.
//!
//! ```rust,ignore
//! let request = rt.create_registry();
//! {
//!     let _guard = rt.enter_registry(&request);
//!     let counter = rt.define_store("counter", definition).await?;
//!     // `counter` lives in `request`, not in the default registry
//! }
//! let state = request.snapshot()?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value as Json};
use tracing::{debug, warn};

use super::instance::Store;
use super::snapshot::{get_state_snapshot, hydrate_store, json_type};
use crate::error::Result;
use crate::reactive::Runtime;

/// An id → store map.
///
/// Cloning is cheap; clones share the same entries.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    stores: RwLock<IndexMap<String, Store>>,
    /// Hydration state for ids that were not registered yet.
    pending: Mutex<HashMap<String, Map<String, Json>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Store> {
        self.inner.stores.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.stores.read().contains_key(id)
    }

    /// Registered ids, in registration order.
    pub fn ids(&self) -> Vec<String> {
        self.inner.stores.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.stores.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.stores.read().is_empty()
    }

    /// Register `store` unless its id is taken. Returns whichever store
    /// ends up registered under the id.
    pub(crate) fn insert(&self, store: Store) -> Store {
        let mut stores = self.inner.stores.write();
        stores
            .entry(store.id().to_string())
            .or_insert(store)
            .clone()
    }

    pub(crate) fn take_pending(&self, id: &str) -> Option<Map<String, Json>> {
        self.inner.pending.lock().remove(id)
    }

    /// Ids holding hydration state that no store has adopted yet.
    pub fn pending_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.pending.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Snapshot every registered store, keyed by id.
    pub fn snapshot(&self) -> Result<Map<String, Json>> {
        let stores: Vec<Store> = self.inner.stores.read().values().cloned().collect();
        let mut out = Map::new();
        for store in stores {
            let state = get_state_snapshot(&store)?;
            out.insert(store.id().to_string(), Json::Object(state));
        }
        Ok(out)
    }

    /// Adopt a per-id state mapping without advancing change signals.
    ///
    /// Registered stores adopt their entry now. Entries for unknown ids are
    /// kept and adopted when that id registers. Entries that are not
    /// objects, or that a store rejects, are logged and skipped. Returns
    /// the number of stores that adopted state.
    pub fn hydrate(&self, snapshot: &Map<String, Json>) -> usize {
        let mut adopted = 0;
        for (id, state) in snapshot {
            let Json::Object(state) = state else {
                warn!(store = %id, found = json_type(state), "hydration entry is not an object");
                continue;
            };
            match self.get(id) {
                Some(store) => {
                    if hydrate_store(&store, state) {
                        adopted += 1;
                    }
                }
                None => {
                    debug!(store = %id, "hydration state kept until the store registers");
                    self.inner.pending.lock().insert(id.clone(), state.clone());
                }
            }
        }
        adopted
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("ids", &self.ids())
            .field("pending", &self.inner.pending.lock().len())
            .finish()
    }
}

/// Restores the previously active registry when dropped.
#[must_use = "the registry is only active while the guard is alive"]
pub struct RegistryGuard {
    runtime: Runtime,
    previous: Option<Registry>,
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        *self.runtime.inner().active_registry.lock() = self.previous.take();
    }
}

impl Runtime {
    /// A new, empty registry. It is not active until selected.
    pub fn create_registry(&self) -> Registry {
        Registry::new()
    }

    pub fn default_registry(&self) -> &Registry {
        &self.inner().default_registry
    }

    /// The registry `define_store` currently registers into.
    pub fn active_registry(&self) -> Registry {
        self.inner()
            .active_registry
            .lock()
            .clone()
            .unwrap_or_else(|| self.inner().default_registry.clone())
    }

    pub fn set_active(&self, registry: &Registry) {
        *self.inner().active_registry.lock() = Some(registry.clone());
    }

    /// Make the default registry active again.
    pub fn reset_active(&self) {
        *self.inner().active_registry.lock() = None;
    }

    /// Activate `registry` until the returned guard drops.
    pub fn enter_registry(&self, registry: &Registry) -> RegistryGuard {
        let previous = self
            .inner()
            .active_registry
            .lock()
            .replace(registry.clone());
        RegistryGuard {
            runtime: self.clone(),
            previous,
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_is_active_initially() {
        let rt = Runtime::new();
        assert!(rt.active_registry().ptr_eq(rt.default_registry()));
    }

    #[test]
    fn set_and_reset_active() {
        let rt = Runtime::new();
        let isolated = rt.create_registry();
        assert!(!isolated.ptr_eq(rt.default_registry()));

        rt.set_active(&isolated);
        assert!(rt.active_registry().ptr_eq(&isolated));

        rt.reset_active();
        assert!(rt.active_registry().ptr_eq(rt.default_registry()));
    }

    #[test]
    fn guards_nest_and_restore() {
        let rt = Runtime::new();
        let outer = rt.create_registry();
        let inner = rt.create_registry();
        {
            let _outer = rt.enter_registry(&outer);
            {
                let _inner = rt.enter_registry(&inner);
                assert!(rt.active_registry().ptr_eq(&inner));
            }
            assert!(rt.active_registry().ptr_eq(&outer));
        }
        assert!(rt.active_registry().ptr_eq(rt.default_registry()));
    }

    #[test]
    fn hydrating_unknown_ids_keeps_pending_state() {
        let registry = Registry::new();
        let snapshot = serde_json::json!({
            "cart": { "items": [] },
            "broken": 42,
        });
        let Json::Object(snapshot) = snapshot else {
            unreachable!()
        };

        assert_eq!(registry.hydrate(&snapshot), 0);
        assert_eq!(registry.pending_ids(), vec!["cart".to_string()]);
        assert!(registry.take_pending("cart").is_some());
        assert!(registry.pending_ids().is_empty());
    }

    #[test]
    fn empty_registry_snapshot_is_empty() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert!(registry.snapshot().expect("snapshot").is_empty());
    }
}
