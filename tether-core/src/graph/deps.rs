//! Forward and reverse dependency edges.

use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;
use smallvec::SmallVec;

use super::key::{Key, TargetId};
use crate::reactive::SubscriberId;

/// Subscribers collected for one notification pass.
pub type Dependents = SmallVec<[SubscriberId; 8]>;

/// Bidirectional map between `(target, key)` pairs and subscribers.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// `(target, key)` to the subscribers that read it, in registration order.
    dependents: HashMap<TargetId, HashMap<Key, IndexSet<SubscriberId>>>,

    /// Subscriber to the `(target, key)` pairs it read.
    dependencies: HashMap<SubscriberId, HashSet<(TargetId, Key)>>,
}

impl DependencyGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `subscriber` read `key` of `target`.
    ///
    /// Returns `false` if the edge already existed.
    pub fn add(&mut self, target: TargetId, key: Key, subscriber: SubscriberId) -> bool {
        let inserted = self
            .dependents
            .entry(target)
            .or_default()
            .entry(key.clone())
            .or_default()
            .insert(subscriber);

        if inserted {
            self.dependencies
                .entry(subscriber)
                .or_default()
                .insert((target, key));
        }
        inserted
    }

    /// Snapshot the subscribers registered against `(target, key)`.
    ///
    /// The returned list is a copy, so notifying a subscriber is free to
    /// mutate the graph.
    pub fn dependents(&self, target: TargetId, key: &Key) -> Dependents {
        self.dependents
            .get(&target)
            .and_then(|keys| keys.get(key))
            .map(|subs| subs.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Snapshot the union of subscribers for several keys of one target.
    ///
    /// Each subscriber appears once, in first-seen order.
    pub fn dependents_of_keys(&self, target: TargetId, keys: &[Key]) -> Dependents {
        let Some(by_key) = self.dependents.get(&target) else {
            return Dependents::new();
        };

        let mut seen = IndexSet::new();
        for key in keys {
            if let Some(subs) = by_key.get(key) {
                seen.extend(subs.iter().copied());
            }
        }
        seen.into_iter().collect()
    }

    /// Remove every edge of a subscriber.
    ///
    /// Called before a computation re-runs (to drop stale reads) and when
    /// the computation is disposed.
    pub fn clear_subscriber(&mut self, subscriber: SubscriberId) {
        let Some(deps) = self.dependencies.remove(&subscriber) else {
            return;
        };

        for (target, key) in deps {
            let Some(by_key) = self.dependents.get_mut(&target) else {
                continue;
            };
            if let Some(subs) = by_key.get_mut(&key) {
                subs.shift_remove(&subscriber);
                if subs.is_empty() {
                    by_key.remove(&key);
                }
            }
            if by_key.is_empty() {
                self.dependents.remove(&target);
            }
        }
    }

    /// Number of `(target, key)` pairs a subscriber currently depends on.
    pub fn dependency_count(&self, subscriber: SubscriberId) -> usize {
        self.dependencies.get(&subscriber).map_or(0, HashSet::len)
    }

    /// Number of subscribers registered against `(target, key)`.
    pub fn dependent_count(&self, target: TargetId, key: &Key) -> usize {
        self.dependents
            .get(&target)
            .and_then(|keys| keys.get(key))
            .map_or(0, IndexSet::len)
    }

    /// Number of targets with at least one registered edge.
    pub fn target_count(&self) -> usize {
        self.dependents.len()
    }
}
