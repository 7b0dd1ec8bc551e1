//! Stores
//!
//! This module turns reactive primitives into named, singleton units of
//! state and behavior.
//!
//! # Overview
//!
//! - **Definitions** (`definition.rs`): the declarative and setup forms a
//!   store is declared in
//! - **Assembler** (`assembler.rs`): `Runtime::define_store`, which builds
//!   and registers an instance once per id
//! - **Instances** (`instance.rs`): the live store and its accessor
//! - **Registry** (`registry.rs`): id → store maps and request isolation
//! - **Hooks** (`hooks.rs`): store-created, before-action and after-action
//!   callback lists
//! - **Plugins** (`plugin.rs`): named bundles of hooks
//! - **Snapshots** (`snapshot.rs`): plain JSON state, patching, hydration
//! - **Observer adapter** (`observer.rs`): what an external binding needs
//!
//! # Change signal
//!
//! Every store owns a `Ref<u64>` that advances by one per successful
//! mutation anywhere in the store, whatever the depth or collection type.
//! It is the single subscription point for observers that only need to
//! know *that* something changed.
//!
//! ```rust,ignore
//! let rt = Runtime::new();
//! let counter = rt.define_store("counter", OptionsStore::new()
//!     .state(|| Value::object_from([("count", 0)]))).await?;
//!
//! let (store, _subscription) = counter.use_store(|| println!("changed"));
//! store.set("count", 1)?;
//! assert_eq!(observer::read_snapshot(counter.change_signal()), 1);
//! ```

mod assembler;
mod definition;
mod hooks;
mod instance;
pub mod observer;
pub mod plugin;
mod registry;
mod snapshot;

pub use definition::{
    Action, AsyncActionFn, Export, Exports, GetterFn, GetterScope, OptionsStore, SetupContext,
    SetupFn, SetupStore, StateFactory, StoreDefinition, SyncActionFn,
};
pub use hooks::{ActionCall, ActionOutcome, HookResult, Hooks};
pub use instance::{Store, StoreAccessor};
pub use plugin::{Plugin, PluginApi};
pub use registry::{Registry, RegistryGuard};
pub use snapshot::get_state_snapshot;
