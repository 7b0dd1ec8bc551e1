//! Tether Core
//!
//! This crate provides the core runtime for Tether, a fine-grained reactive
//! state container. It implements:
//!
//! - Reactive primitives (refs, computeds, effects) over an explicit
//!   engine context
//! - Observable wrappers for objects, arrays, maps, sets and dates
//! - Named singleton stores with a coalesced change signal
//! - Isolated registries, lifecycle hooks, plugins, snapshots and hydration
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `value`: the plain data model stores hold
//! - `graph`: `(target, key)` dependency bookkeeping
//! - `reactive`: the `Runtime` and the primitives built on it
//! - `wrap`: property- and entry-level observation of structures
//! - `store`: definitions, assembly, registries and the lifecycle bus
//!
//! # Example
//!
//! ```rust,ignore
//! use tether_core::{Computed, Ref, Runtime, Effect};
//!
//! let rt = Runtime::new();
//!
//! // Create a ref
//! let count = Ref::new(&rt, 0);
//!
//! // Create a derived value
//! let c = count.clone();
//! let doubled = Computed::new(&rt, move || c.get() * 2);
//!
//! // Create an effect
//! let (c, d) = (count.clone(), doubled.clone());
//! let _effect = Effect::new(&rt, move || {
//!     println!("Count: {}, Doubled: {:?}", c.get(), d.get());
//! });
//!
//! // Update the ref
//! count.set(5);
//! // Effect automatically runs, prints: "Count: 5, Doubled: Ok(10)"
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;
pub mod store;
pub mod value;
pub mod wrap;

pub use config::RuntimeConfig;
pub use error::{ActionError, Result, StoreError};
pub use reactive::{Computed, Effect, Ref, Runtime, StoreTrigger, Subscription};
pub use store::{
    Action, Export, Exports, OptionsStore, Plugin, PluginApi, Registry, SetupStore, Store,
    StoreAccessor, StoreDefinition,
};
pub use value::Value;
pub use wrap::{Field, Reactive};
