//! Plugins.
//!
//! A plugin is installed once per runtime and registers lifecycle
//! callbacks through a [`PluginApi`]. Every callback it registers is
//! tagged with the plugin's name, which is what gets logged when the
//! callback fails.
//!
//! ```rust,ignore
//! rt.use_plugin(plugin::named("audit", |api: &PluginApi| {
//!     api.after_action(|call, outcome| async move {
//!         tracing::info!(store = call.store.id(), action = %call.name, ok = outcome.is_ok());
//!         Ok(())
//!     });
//! }));
//! ```

use std::future::Future;
use std::sync::Arc;

use serde_json::{Map, Value as Json};
use tracing::debug;

use super::hooks::{ActionCall, ActionOutcome, HookResult, ANONYMOUS};
use super::instance::Store;
use super::snapshot;
use crate::error::Result;
use crate::reactive::Runtime;
use crate::value::Value;

pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn install(&self, api: &PluginApi);
}

/// Closures are anonymous plugins.
impl<F> Plugin for F
where
    F: Fn(&PluginApi) + Send + Sync,
{
    fn name(&self) -> &str {
        ANONYMOUS
    }

    fn install(&self, api: &PluginApi) {
        self(api)
    }
}

/// A closure plugin with a name.
pub struct NamedPlugin<F> {
    name: String,
    install: F,
}

impl<F> Plugin for NamedPlugin<F>
where
    F: Fn(&PluginApi) + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn install(&self, api: &PluginApi) {
        (self.install)(api)
    }
}

pub fn named<F>(name: impl Into<String>, install: F) -> NamedPlugin<F>
where
    F: Fn(&PluginApi) + Send + Sync,
{
    NamedPlugin {
        name: name.into(),
        install,
    }
}

/// What a plugin sees while it installs. Clones can be moved into
/// callbacks.
#[derive(Clone)]
pub struct PluginApi {
    runtime: Runtime,
    plugin: Arc<str>,
}

impl PluginApi {
    pub fn plugin_name(&self) -> &str {
        &self.plugin
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn on_store_created<F, Fut>(&self, callback: F)
    where
        F: Fn(Store) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        self.runtime
            .hooks()
            .add_store_created(self.plugin.clone(), callback);
    }

    pub fn before_action<F>(&self, callback: F)
    where
        F: Fn(&ActionCall) -> HookResult + Send + Sync + 'static,
    {
        self.runtime
            .hooks()
            .add_before_action(self.plugin.clone(), callback);
    }

    pub fn after_action<F, Fut>(&self, callback: F)
    where
        F: Fn(ActionCall, ActionOutcome) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        self.runtime
            .hooks()
            .add_after_action(self.plugin.clone(), callback);
    }

    /// Shallow-assign extension properties onto `store`.
    pub fn extend_store<K, V, I>(&self, store: &Store, entries: I)
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        store.extend(entries);
    }

    pub fn get_state_snapshot(&self, store: &Store) -> Result<Map<String, Json>> {
        snapshot::get_state_snapshot(store)
    }
}

impl Runtime {
    /// Install a plugin. Its callbacks apply to every store of this
    /// runtime, including stores registered before it.
    pub fn use_plugin(&self, plugin: impl Plugin) {
        let api = PluginApi {
            runtime: self.clone(),
            plugin: Arc::from(plugin.name()),
        };
        plugin.install(&api);
        debug!(plugin = plugin.name(), hooks = self.hooks().len(), "plugin installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_anonymous_plugins() {
        let rt = Runtime::new();
        rt.use_plugin(|api: &PluginApi| {
            assert_eq!(api.plugin_name(), "anonymous");
            api.before_action(|_| Ok(()));
        });
        assert_eq!(rt.hooks().len(), 1);
    }

    #[test]
    fn named_plugins_register_every_hook() {
        let rt = Runtime::new();
        rt.use_plugin(named("audit", |api: &PluginApi| {
            assert_eq!(api.plugin_name(), "audit");
            api.on_store_created(|_| async { Ok(()) });
            api.before_action(|_| Ok(()));
            api.after_action(|_, _| async { Ok(()) });
        }));
        assert_eq!(rt.hooks().len(), 3);
    }
}
