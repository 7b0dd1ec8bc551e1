//! Store declarations.
//!
//! A store is declared in one of two forms:
//!
//! - [`OptionsStore`]: a state factory, named getters and named actions.
//!   Getters become computeds over the wrapped state; actions receive the
//!   assembled [`Store`] as an explicit receiver.
//!
//! - [`SetupStore`]: a function that builds the store's exports itself
//!   from refs, computeds, wrapped structures and actions. It runs once,
//!   synchronously, with the store's trigger installed as the ambient
//!   trigger so every ref it creates reports to the store.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use indexmap::IndexMap;

use super::instance::Store;
use crate::error::{ActionError, Result, StoreError};
use crate::reactive::{Computed, Ref, Runtime};
use crate::value::Value;
use crate::wrap::{Field, Reactive, ReactiveObject};

pub type StateFactory = Arc<dyn Fn() -> Value + Send + Sync>;
pub type GetterFn = Arc<dyn Fn(&GetterScope) -> Result<Value> + Send + Sync>;
pub type SyncActionFn =
    Arc<dyn Fn(&Store, &[Value]) -> std::result::Result<Value, ActionError> + Send + Sync>;
pub type AsyncActionFn = Arc<
    dyn Fn(Store, Vec<Value>) -> BoxFuture<'static, std::result::Result<Value, ActionError>>
        + Send
        + Sync,
>;
pub type SetupFn =
    Arc<dyn Fn(&SetupContext) -> std::result::Result<Exports, ActionError> + Send + Sync>;

/// A store method, run through the lifecycle hooks by
/// [`Store::dispatch`].
#[derive(Clone)]
pub enum Action {
    Sync(SyncActionFn),
    Async(AsyncActionFn),
}

impl Action {
    pub fn sync<F>(action: F) -> Self
    where
        F: Fn(&Store, &[Value]) -> std::result::Result<Value, ActionError> + Send + Sync + 'static,
    {
        Action::Sync(Arc::new(action))
    }

    /// An action returning a future. The future owns its receiver and
    /// arguments.
    pub fn future<F, Fut>(action: F) -> Self
    where
        F: Fn(Store, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Value, ActionError>> + Send + 'static,
    {
        Action::Async(Arc::new(move |store: Store, args: Vec<Value>| {
            action(store, args).boxed()
        }))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Action::Async(_))
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.is_async() { "Action::Async" } else { "Action::Sync" })
    }
}

// ----------------------------------------------------------------------------
// Declarative form
// ----------------------------------------------------------------------------

/// Declarative store: `state` + `getters` + `actions`.
///
/// ```rust,ignore
/// let counter = OptionsStore::new()
///     .state(|| Value::object_from([("count", 0)]))
///     .getter("double", |s| Ok((s.get("count").as_f64().unwrap_or(0.0) * 2.0).into()))
///     .action("increment", Action::sync(|store, _| {
///         let count = store.get("count")?.as_f64().unwrap_or(0.0);
///         store.set("count", count + 1.0)?;
///         Ok(Value::Undefined)
///     }));
/// ```
#[derive(Clone, Default)]
pub struct OptionsStore {
    pub(crate) state: Option<StateFactory>,
    pub(crate) getters: Vec<(String, GetterFn)>,
    pub(crate) actions: IndexMap<String, Action>,
}

impl OptionsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The state factory. Must return an object.
    pub fn state<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.state = Some(Arc::new(factory));
        self
    }

    /// Add a getter. Getters see the state and every getter declared
    /// before them.
    pub fn getter<F>(mut self, name: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&GetterScope) -> Result<Value> + Send + Sync + 'static,
    {
        self.getters.push((name.into(), Arc::new(getter)));
        self
    }

    pub fn action(mut self, name: impl Into<String>, action: Action) -> Self {
        self.actions.insert(name.into(), action);
        self
    }
}

/// What a getter can read.
#[derive(Clone)]
pub struct GetterScope {
    pub(crate) store: String,
    pub(crate) state: ReactiveObject,
    pub(crate) getters: Arc<IndexMap<String, Computed<Value>>>,
}

impl GetterScope {
    /// The wrapped state object.
    pub fn state(&self) -> &ReactiveObject {
        &self.state
    }

    /// Shorthand for `state().get(key)`.
    pub fn get(&self, key: &str) -> Field {
        self.state.get(key)
    }

    /// Read an earlier-declared getter.
    pub fn getter(&self, name: &str) -> Result<Value> {
        match self.getters.get(name) {
            Some(computed) => computed.get(),
            None => Err(StoreError::UnknownProperty {
                store: self.store.clone(),
                name: name.to_string(),
            }),
        }
    }
}

// ----------------------------------------------------------------------------
// Setup form
// ----------------------------------------------------------------------------

/// Setup store: one function returning the store's exports.
#[derive(Clone)]
pub struct SetupStore {
    pub(crate) setup: SetupFn,
}

impl SetupStore {
    pub fn new<F>(setup: F) -> Self
    where
        F: Fn(&SetupContext) -> std::result::Result<Exports, ActionError> + Send + Sync + 'static,
    {
        Self {
            setup: Arc::new(setup),
        }
    }
}

/// Handed to a setup function while it runs.
pub struct SetupContext {
    pub(crate) runtime: Runtime,
    pub(crate) store: String,
}

impl SetupContext {
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Id of the store being built.
    pub fn id(&self) -> &str {
        &self.store
    }

    /// A ref reporting to this store.
    pub fn ref_value(&self, value: impl Into<Value>) -> Ref<Value> {
        Ref::new(&self.runtime, value.into())
    }

    pub fn computed<F>(&self, getter: F) -> Computed<Value>
    where
        F: Fn() -> Result<Value> + Send + Sync + 'static,
    {
        Computed::fallible(&self.runtime, getter)
    }

    /// A wrapped structure reporting to this store.
    pub fn reactive(&self, value: impl Into<Value>) -> Field {
        self.runtime.reactive(value)
    }
}

/// One entry of a setup store.
#[derive(Clone)]
pub enum Export {
    Ref(Ref<Value>),
    Computed(Computed<Value>),
    Reactive(Reactive),
    Value(Value),
    Action(Action),
}

impl From<Ref<Value>> for Export {
    fn from(r: Ref<Value>) -> Self {
        Export::Ref(r)
    }
}

impl From<Computed<Value>> for Export {
    fn from(c: Computed<Value>) -> Self {
        Export::Computed(c)
    }
}

impl From<Reactive> for Export {
    fn from(r: Reactive) -> Self {
        Export::Reactive(r)
    }
}

impl From<Field> for Export {
    fn from(field: Field) -> Self {
        match field {
            Field::Reactive(r) => Export::Reactive(r),
            Field::Value(v) => Export::Value(v),
        }
    }
}

impl From<Value> for Export {
    fn from(v: Value) -> Self {
        Export::Value(v)
    }
}

impl From<Action> for Export {
    fn from(a: Action) -> Self {
        Export::Action(a)
    }
}

impl fmt::Debug for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Export::Ref(r) => f.debug_tuple("Ref").field(r).finish(),
            Export::Computed(c) => f.debug_tuple("Computed").field(c).finish(),
            Export::Reactive(r) => f.debug_tuple("Reactive").field(r).finish(),
            Export::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Export::Action(a) => a.fmt(f),
        }
    }
}

/// The named exports of a setup store, in declaration order.
#[derive(Clone, Default, Debug)]
pub struct Exports {
    entries: IndexMap<String, Export>,
}

impl Exports {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, export: impl Into<Export>) -> Self {
        self.insert(name, export);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, export: impl Into<Export>) {
        self.entries.insert(name.into(), export.into());
    }

    pub fn get(&self, name: &str) -> Option<&Export> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Export)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Export)> for Exports {
    fn from_iter<I: IntoIterator<Item = (K, Export)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Either declaration form.
#[derive(Clone)]
pub enum StoreDefinition {
    Options(OptionsStore),
    Setup(SetupStore),
}

impl From<OptionsStore> for StoreDefinition {
    fn from(options: OptionsStore) -> Self {
        StoreDefinition::Options(options)
    }
}

impl From<SetupStore> for StoreDefinition {
    fn from(setup: SetupStore) -> Self {
        StoreDefinition::Setup(setup)
    }
}
