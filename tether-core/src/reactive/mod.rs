//! Reactive Primitives
//!
//! This module implements the core reactive system: refs, computeds, and
//! effects, all created against an explicit [`Runtime`].
//!
//! # Concepts
//!
//! ## Refs
//!
//! A Ref is a container for mutable state. When a ref's value is read
//! within a tracking context (such as a computed or effect), the ref
//! registers that context as a dependent. When the ref's value changes, all
//! dependents are notified, then direct subscribers, then the store trigger
//! the ref captured at creation.
//!
//! ## Computeds
//!
//! A Computed is a derived value that caches its result. It re-evaluates
//! only when read after one of its dependencies changed. Computeds are
//! themselves trackable, so they chain.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # Implementation Notes
//!
//! Dependency detection is automatic: while a computed or effect runs, its
//! id sits on top of the runtime's context stack, and every tracked read
//! registers against it. Tracking state is per runtime, never
//! process-global.

mod computed;
mod context;
mod effect;
mod refs;
mod runtime;
mod subscriber;
mod trigger;

pub use computed::Computed;
pub use context::{AmbientTrigger, ReactiveContext};
pub use effect::Effect;
pub use refs::{same_value, EqualsFn, Ref};
pub use runtime::{ReactiveHandle, Runtime};
pub use subscriber::{Callback, Subscriber, SubscriberId, Subscription};
pub use trigger::StoreTrigger;

pub(crate) use subscriber::CallbackList;
