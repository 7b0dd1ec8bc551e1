//! Lifecycle Notification Bus
//!
//! Three ordered callback lists, one per event:
//!
//! - store created: async, run in registration order after a store is
//!   registered. May extend the instance.
//! - before action: sync, sees the store, action name and arguments.
//! - after action: async, sees the same plus the action's outcome.
//!
//! A callback that fails is logged with the plugin that registered it and
//! does not stop the rest of its list. Callbacks registered directly on
//! [`Hooks`] rather than through a plugin are logged as `anonymous`.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use parking_lot::RwLock;
use tracing::error;

use super::instance::Store;
use crate::error::ActionError;
use crate::reactive::Runtime;
use crate::value::Value;

/// Result of an action, as handed to after-action hooks.
pub type ActionOutcome = std::result::Result<Value, ActionError>;

pub type HookResult = std::result::Result<(), ActionError>;

pub type StoreCreatedFn = Arc<dyn Fn(Store) -> BoxFuture<'static, HookResult> + Send + Sync>;
pub type BeforeActionFn = Arc<dyn Fn(&ActionCall) -> HookResult + Send + Sync>;
pub type AfterActionFn =
    Arc<dyn Fn(ActionCall, ActionOutcome) -> BoxFuture<'static, HookResult> + Send + Sync>;

pub(crate) const ANONYMOUS: &str = "anonymous";

/// One action invocation.
#[derive(Clone, Debug)]
pub struct ActionCall {
    pub store: Store,
    pub name: String,
    pub args: Vec<Value>,
}

struct Named<F> {
    plugin: Arc<str>,
    callback: F,
}

impl<F: Clone> Named<F> {
    fn snapshot(list: &RwLock<Vec<Self>>) -> Vec<(Arc<str>, F)> {
        list.read()
            .iter()
            .map(|n| (n.plugin.clone(), n.callback.clone()))
            .collect()
    }
}

/// Lifecycle callback lists of one runtime.
#[derive(Default)]
pub struct Hooks {
    store_created: RwLock<Vec<Named<StoreCreatedFn>>>,
    before_action: RwLock<Vec<Named<BeforeActionFn>>>,
    after_action: RwLock<Vec<Named<AfterActionFn>>>,
}

impl Hooks {
    pub fn on_store_created<F, Fut>(&self, callback: F)
    where
        F: Fn(Store) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        self.add_store_created(ANONYMOUS.into(), callback);
    }

    pub fn before_action<F>(&self, callback: F)
    where
        F: Fn(&ActionCall) -> HookResult + Send + Sync + 'static,
    {
        self.add_before_action(ANONYMOUS.into(), callback);
    }

    pub fn after_action<F, Fut>(&self, callback: F)
    where
        F: Fn(ActionCall, ActionOutcome) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        self.add_after_action(ANONYMOUS.into(), callback);
    }

    pub(crate) fn add_store_created<F, Fut>(&self, plugin: Arc<str>, callback: F)
    where
        F: Fn(Store) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        let callback: StoreCreatedFn = Arc::new(move |store: Store| callback(store).boxed());
        self.store_created.write().push(Named { plugin, callback });
    }

    pub(crate) fn add_before_action<F>(&self, plugin: Arc<str>, callback: F)
    where
        F: Fn(&ActionCall) -> HookResult + Send + Sync + 'static,
    {
        let callback: BeforeActionFn = Arc::new(callback);
        self.before_action.write().push(Named { plugin, callback });
    }

    pub(crate) fn add_after_action<F, Fut>(&self, plugin: Arc<str>, callback: F)
    where
        F: Fn(ActionCall, ActionOutcome) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        let callback: AfterActionFn = Arc::new(move |call: ActionCall, outcome: ActionOutcome| {
            callback(call, outcome).boxed()
        });
        self.after_action.write().push(Named { plugin, callback });
    }

    /// Number of registered callbacks across all three lists.
    pub fn len(&self) -> usize {
        self.store_created.read().len()
            + self.before_action.read().len()
            + self.after_action.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) async fn emit_store_created(&self, store: &Store) {
        for (plugin, callback) in Named::snapshot(&self.store_created) {
            if let Err(error) = callback(store.clone()).await {
                error!(store = store.id(), plugin = &*plugin, %error, "store-created hook failed");
            }
        }
    }

    pub(crate) fn emit_before_action(&self, call: &ActionCall) {
        for (plugin, callback) in Named::snapshot(&self.before_action) {
            if let Err(error) = callback(call) {
                error!(
                    store = call.store.id(),
                    plugin = &*plugin,
                    action = %call.name,
                    %error,
                    "before-action hook failed"
                );
            }
        }
    }

    pub(crate) async fn emit_after_action(&self, call: &ActionCall, outcome: &ActionOutcome) {
        for (plugin, callback) in Named::snapshot(&self.after_action) {
            if let Err(error) = callback(call.clone(), outcome.clone()).await {
                error!(
                    store = call.store.id(),
                    plugin = &*plugin,
                    action = %call.name,
                    %error,
                    "after-action hook failed"
                );
            }
        }
    }
}

impl Runtime {
    /// Lifecycle callbacks shared by every store of this runtime.
    pub fn hooks(&self) -> &Hooks {
        &self.inner().hooks
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("store_created", &self.store_created.read().len())
            .field("before_action", &self.before_action.read().len())
            .field("after_action", &self.after_action.read().len())
            .finish()
    }
}
