//! Assembled stores and their accessors.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::definition::{Action, Export, Exports, StateFactory};
use super::observer;
use super::snapshot::{apply_state, ApplyMode};
use crate::error::{Result, StoreError};
use crate::reactive::{Computed, Ref, Runtime, StoreTrigger, Subscription};
use crate::value::Value;
use crate::wrap::{Field, ReactiveObject, Scope};

/// A live store instance.
///
/// Cloning is cheap and every clone is the same instance. All mutation
/// goes through wrapped state or refs, so each successful write advances
/// [`change_signal`](Self::change_signal) by one.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    id: String,
    runtime: Runtime,
    change_signal: Ref<u64>,
    trigger: StoreTrigger,
    body: StoreBody,
    extensions: RwLock<IndexMap<String, Value>>,
}

pub(crate) enum StoreBody {
    Options {
        state: ReactiveObject,
        /// Keys the state factory returned. Snapshots are restricted to them.
        state_keys: Vec<String>,
        factory: StateFactory,
        getters: IndexMap<String, Computed<Value>>,
        actions: IndexMap<String, Action>,
    },
    Setup {
        exports: Exports,
    },
}

impl Store {
    pub(crate) fn new(
        id: String,
        runtime: &Runtime,
        change_signal: Ref<u64>,
        trigger: StoreTrigger,
        body: StoreBody,
    ) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                id,
                runtime: runtime.clone(),
                change_signal,
                trigger,
                body,
                extensions: RwLock::new(IndexMap::new()),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    /// Whether the store was built by a setup function.
    pub fn is_setup(&self) -> bool {
        matches!(self.inner.body, StoreBody::Setup { .. })
    }

    /// Counter advanced once per successful mutation anywhere in the store.
    pub fn change_signal(&self) -> &Ref<u64> {
        &self.inner.change_signal
    }

    pub(crate) fn trigger(&self) -> &StoreTrigger {
        &self.inner.trigger
    }

    pub(crate) fn body(&self) -> &StoreBody {
        &self.inner.body
    }

    fn scope(&self) -> Scope {
        Scope::new(&self.inner.runtime, Some(self.inner.trigger.clone()))
    }

    fn unknown_property(&self, name: &str) -> StoreError {
        StoreError::UnknownProperty {
            store: self.inner.id.clone(),
            name: name.to_string(),
        }
    }

    fn read_only(&self, name: &str) -> StoreError {
        StoreError::ReadOnly {
            store: self.inner.id.clone(),
            name: name.to_string(),
        }
    }

    /// The wrapped state object of a declarative store.
    pub fn state(&self) -> Option<&ReactiveObject> {
        match &self.inner.body {
            StoreBody::Options { state, .. } => Some(state),
            StoreBody::Setup { .. } => None,
        }
    }

    /// An export of a setup store.
    pub fn export(&self, name: &str) -> Option<&Export> {
        match &self.inner.body {
            StoreBody::Setup { exports } => exports.get(name),
            StoreBody::Options { .. } => None,
        }
    }

    /// Read a property: state, getter or extension (declarative form), or a
    /// non-action export (setup form). Reads are tracked.
    pub fn get(&self, name: &str) -> Result<Field> {
        match &self.inner.body {
            StoreBody::Options { state, getters, .. } => {
                if state.has(name) {
                    return Ok(state.get(name));
                }
                if getters.contains_key(name) {
                    return self.getter(name);
                }
            }
            StoreBody::Setup { exports } => match exports.get(name) {
                Some(Export::Ref(r)) => return Ok(self.scope().wrap(r.get())),
                Some(Export::Computed(c)) => return Ok(self.scope().wrap(c.get()?)),
                Some(Export::Reactive(r)) => return Ok(Field::Reactive(r.clone())),
                Some(Export::Value(v)) => return Ok(self.scope().wrap(v.clone())),
                Some(Export::Action(_)) => return Err(self.unknown_property(name)),
                None => {}
            },
        }

        self.extension(name)
            .ok_or_else(|| self.unknown_property(name))
    }

    /// Read a getter (declarative form) or computed export (setup form).
    pub fn getter(&self, name: &str) -> Result<Field> {
        let computed = match &self.inner.body {
            StoreBody::Options { getters, .. } => getters.get(name),
            StoreBody::Setup { exports } => match exports.get(name) {
                Some(Export::Computed(c)) => Some(c),
                _ => None,
            },
        };
        let computed = computed.ok_or_else(|| self.unknown_property(name))?;
        Ok(self.scope().wrap(computed.get()?))
    }

    /// Write a state property (declarative form) or ref export (setup
    /// form). Returns `false` if the value was unchanged.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<bool> {
        match &self.inner.body {
            StoreBody::Options {
                state,
                getters,
                actions,
                ..
            } => {
                if getters.contains_key(name) || actions.contains_key(name) {
                    return Err(self.read_only(name));
                }
                Ok(state.set(name, value))
            }
            StoreBody::Setup { exports } => match exports.get(name) {
                Some(Export::Ref(r)) => Ok(r.set(value.into())),
                Some(_) => Err(self.read_only(name)),
                None => Err(self.unknown_property(name)),
            },
        }
    }

    pub fn action(&self, name: &str) -> Option<Action> {
        match &self.inner.body {
            StoreBody::Options { actions, .. } => actions.get(name).cloned(),
            StoreBody::Setup { exports } => match exports.get(name) {
                Some(Export::Action(a)) => Some(a.clone()),
                _ => None,
            },
        }
    }

    pub fn action_names(&self) -> Vec<String> {
        match &self.inner.body {
            StoreBody::Options { actions, .. } => actions.keys().cloned().collect(),
            StoreBody::Setup { exports } => exports
                .iter()
                .filter(|(_, e)| matches!(e, Export::Action(_)))
                .map(|(name, _)| name.to_string())
                .collect(),
        }
    }

    /// Run an action through the lifecycle hooks.
    ///
    /// Before-action hooks run first, then the action (awaited if async),
    /// then every after-action hook with the outcome. A failed action's
    /// error is returned only after all after-action hooks ran. Writes the
    /// action made before failing are kept.
    pub async fn dispatch(&self, name: &str, args: Vec<Value>) -> Result<Value> {
        let action = self.action(name).ok_or_else(|| StoreError::UnknownAction {
            store: self.inner.id.clone(),
            name: name.to_string(),
        })?;

        let call = super::hooks::ActionCall {
            store: self.clone(),
            name: name.to_string(),
            args,
        };
        let hooks = self.inner.runtime.hooks();

        hooks.emit_before_action(&call);
        let outcome = match &action {
            Action::Sync(run) => run(self, &call.args),
            Action::Async(run) => run(self.clone(), call.args.clone()).await,
        };
        hooks.emit_after_action(&call, &outcome).await;

        outcome.map_err(StoreError::Action)
    }

    /// Shallow-assign extension properties.
    pub fn extend<K, V, I>(&self, entries: I)
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut extensions = self.inner.extensions.write();
        for (key, value) in entries {
            extensions.insert(key.into(), value.into());
        }
    }

    pub fn extension(&self, name: &str) -> Option<Field> {
        let value = self.inner.extensions.read().get(name).cloned()?;
        Some(self.scope().wrap(value))
    }

    /// Merge a JSON object into the state.
    ///
    /// Nested objects merge into existing wrapped objects; anything else
    /// replaces. Every key is checked before anything is written. Each
    /// effective write advances the change signal.
    pub fn patch(&self, partial: &serde_json::Map<String, serde_json::Value>) -> Result<()> {
        apply_state(self, partial, ApplyMode::Patch)
    }

    /// Re-run the state factory and assign every key it returns.
    pub fn reset(&self) -> Result<()> {
        let StoreBody::Options { state, factory, .. } = &self.inner.body else {
            return Err(StoreError::ResetUnsupported(self.inner.id.clone()));
        };
        let fresh = factory();
        let found = fresh.type_name();
        let Value::Object(fresh) = fresh else {
            return Err(StoreError::InvalidState {
                store: self.inner.id.clone(),
                found,
            });
        };
        let entries: Vec<(String, Value)> = fresh
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (key, value) in entries {
            state.set(&key, value);
        }
        Ok(())
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.inner.id)
            .field("setup", &self.is_setup())
            .field("change_signal", &self.inner.change_signal.get_untracked())
            .finish()
    }
}

/// What `define_store` returns.
///
/// Every definition of an id in one registry yields an accessor to the
/// same instance.
#[derive(Clone, Debug)]
pub struct StoreAccessor {
    store: Store,
}

impl StoreAccessor {
    pub(crate) fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn id(&self) -> &str {
        self.store.id()
    }

    pub fn change_signal(&self) -> &Ref<u64> {
        self.store.change_signal()
    }

    /// Subscribe `on_change` to the change signal for the lifetime of the
    /// returned guard, and return the live instance.
    pub fn use_store<F>(&self, on_change: F) -> (Store, Subscription)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let subscription = observer::subscribe(self.store.change_signal(), on_change);
        (self.store.clone(), subscription)
    }

    /// The live instance, without subscribing.
    pub fn store(&self) -> Store {
        self.store.clone()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.store.ptr_eq(&other.store)
    }
}
