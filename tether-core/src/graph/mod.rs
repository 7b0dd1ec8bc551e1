//! Dependency Graph
//!
//! This module implements the bookkeeping that connects reactive reads to
//! the computations that performed them.
//!
//! # Overview
//!
//! Every observable thing (a ref, a computed, a wrapped object, array, map,
//! set or date) has a [`TargetId`]. A read of some part of it is described
//! by a [`Key`]: a property name, an index, a map entry, or one of the
//! pseudo-keys (`Length`, `Size`, `Iterate`, `KeyIterate`, `Value`).
//!
//! The graph stores edges in both directions:
//!
//! - forward: `(target, key)` to the set of subscribers that read it, used
//!   by `trigger` to find who to notify
//! - reverse: subscriber to the set of `(target, key)` pairs it last read,
//!   used to prune stale edges before a computation re-runs and to drop a
//!   subscriber entirely when it is disposed
//!
//! The graph itself is passive. [`Runtime`](crate::reactive::Runtime) owns
//! one and decides when to record and when to notify.

mod deps;
mod key;

pub use deps::DependencyGraph;
pub use key::{Key, TargetId};
