//! Store Assembler
//!
//! Turns a [`StoreDefinition`] into a registered [`Store`]:
//!
//! 1. Look the id up in the active registry. A hit returns the existing
//!    instance; the new definition is never evaluated.
//! 2. Create the change signal and the store trigger that advances it.
//! 3. Build the body:
//!    - declarative: run the state factory, wrap the result with the
//!      store trigger, build getters as computeds in declaration order;
//!    - setup: run the setup function once with the store trigger
//!      installed as the ambient trigger.
//! 4. Register, adopt any pending hydration state, then run the
//!    store-created hooks.
//!
//! Construction errors abort before anything is registered.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, warn};

use super::definition::{GetterScope, OptionsStore, SetupContext, SetupStore, StoreDefinition};
use super::instance::{Store, StoreAccessor, StoreBody};
use super::snapshot::hydrate_store;
use crate::error::{Result, StoreError};
use crate::reactive::{AmbientTrigger, Computed, Ref, Runtime, StoreTrigger};
use crate::value::Value;
use crate::wrap::Scope;

impl Runtime {
    /// Define (or look up) the store `id` in the active registry.
    ///
    /// The first definition of an id wins. Later calls return an accessor
    /// to the same instance and ignore their definition.
    pub async fn define_store(
        &self,
        id: impl Into<String>,
        definition: impl Into<StoreDefinition>,
    ) -> Result<StoreAccessor> {
        let id = id.into();
        let registry = self.active_registry();

        if let Some(existing) = registry.get(&id) {
            self.duplicate_definition(&id);
            return Ok(StoreAccessor::new(existing));
        }

        let definition = definition.into();
        let store = self.untracked(|| assemble(self, &id, definition))?;

        let registered = registry.insert(store.clone());
        if !registered.ptr_eq(&store) {
            self.duplicate_definition(&id);
            return Ok(StoreAccessor::new(registered));
        }

        if let Some(state) = registry.take_pending(&id) {
            debug!(store = %id, "adopting pending hydration state");
            hydrate_store(&store, &state);
        }

        debug!(store = %id, setup = store.is_setup(), "store registered");
        self.hooks().emit_store_created(&store).await;

        Ok(StoreAccessor::new(store))
    }

    fn duplicate_definition(&self, id: &str) {
        if self.config().warn_on_duplicate_definition {
            warn!(store = id, "store already defined; new definition ignored");
        } else {
            debug!(store = id, "store already defined; new definition ignored");
        }
    }
}

fn assemble(rt: &Runtime, id: &str, definition: StoreDefinition) -> Result<Store> {
    let change_signal = Ref::with_trigger(rt, 0u64, None);
    let signal = change_signal.clone();
    let trigger = StoreTrigger::new(rt, move || {
        signal.update(|n| n + 1);
    });

    let body = match definition {
        StoreDefinition::Options(options) => assemble_options(rt, id, options, &trigger)?,
        StoreDefinition::Setup(setup) => assemble_setup(rt, id, setup, &trigger)?,
    };

    Ok(Store::new(id.to_string(), rt, change_signal, trigger, body))
}

fn assemble_options(
    rt: &Runtime,
    id: &str,
    options: OptionsStore,
    trigger: &StoreTrigger,
) -> Result<StoreBody> {
    let factory = options
        .state
        .ok_or_else(|| StoreError::MissingState(id.to_string()))?;

    let initial = factory();
    let found = initial.type_name();
    let Value::Object(target) = initial else {
        return Err(StoreError::InvalidState {
            store: id.to_string(),
            found,
        });
    };
    let state_keys: Vec<String> = target.read().keys().cloned().collect();
    let state = Scope::new(rt, Some(trigger.clone())).object(&target);

    let mut getters: IndexMap<String, Computed<Value>> = IndexMap::new();
    for (name, getter) in options.getters {
        let scope = GetterScope {
            store: id.to_string(),
            state: state.clone(),
            getters: Arc::new(getters.clone()),
        };
        let computed = Computed::fallible(rt, move || getter(&scope));
        getters.insert(name, computed);
    }

    Ok(StoreBody::Options {
        state,
        state_keys,
        factory,
        getters,
        actions: options.actions,
    })
}

fn assemble_setup(
    rt: &Runtime,
    id: &str,
    setup: SetupStore,
    trigger: &StoreTrigger,
) -> Result<StoreBody> {
    let _ambient = AmbientTrigger::install(rt, trigger.clone());
    let ctx = SetupContext {
        runtime: rt.clone(),
        store: id.to_string(),
    };
    let exports = (setup.setup)(&ctx).map_err(|source| StoreError::Setup {
        store: id.to_string(),
        source,
    })?;
    Ok(StoreBody::Setup { exports })
}
