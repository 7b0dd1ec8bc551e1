//! Observable view of a unique-value collection.

use std::fmt;
use std::sync::Arc;

use super::map::{entry_key, membership_keys};
use super::{Field, Wrapped};
use crate::graph::{Key, TargetId};
use crate::value::{Value, ValueSet};

/// A wrapped [`ValueSet`]. Same tracking shape as
/// [`ReactiveMap`](super::ReactiveMap), keyed by the members themselves.
#[derive(Clone)]
pub struct ReactiveSet {
    pub(crate) inner: Arc<Wrapped<ValueSet>>,
}

impl ReactiveSet {
    pub fn id(&self) -> TargetId {
        self.inner.target.id()
    }

    pub fn has(&self, value: impl Into<Value>) -> bool {
        let value = value.into();
        self.inner.scope.track(self.id(), entry_key(&value));
        self.inner.target.read().contains(&value)
    }

    /// Insert a member. Returns `false` if it was already present.
    pub fn add(&self, value: impl Into<Value>) -> bool {
        let value = value.into();
        let added = self.inner.target.write().insert(value.clone());
        if added {
            self.inner
                .scope
                .notify(self.id(), &membership_keys(std::iter::once(&value)));
        }
        added
    }

    pub fn delete(&self, value: impl Into<Value>) -> bool {
        let value = value.into();
        let removed = self.inner.target.write().shift_remove(&value);
        if removed {
            self.inner
                .scope
                .notify(self.id(), &membership_keys(std::iter::once(&value)));
        }
        removed
    }

    pub fn clear(&self) -> bool {
        let removed: Vec<Value> = {
            let mut set = self.inner.target.write();
            if set.is_empty() {
                return false;
            }
            set.drain(..).collect()
        };
        self.inner
            .scope
            .notify(self.id(), &membership_keys(removed.iter()));
        true
    }

    pub fn len(&self) -> usize {
        self.inner.scope.track(self.id(), Key::Size);
        self.inner.target.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Members in insertion order, wrapped. Tracks iteration.
    pub fn values(&self) -> Vec<Field> {
        self.inner.scope.track(self.id(), Key::Iterate);
        let values: Vec<Value> = self.inner.target.read().iter().cloned().collect();
        values
            .into_iter()
            .map(|value| self.inner.scope.wrap(value))
            .collect()
    }

    pub fn to_raw(&self) -> Value {
        Value::Set(self.inner.target.clone())
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl From<ReactiveSet> for Value {
    fn from(set: ReactiveSet) -> Self {
        set.to_raw()
    }
}

impl fmt::Debug for ReactiveSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveSet")
            .field("id", &self.id())
            .field("len", &self.inner.target.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Computed, Runtime, StoreTrigger};
    use crate::wrap::wrap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fixture(rt: &Runtime) -> (ReactiveSet, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        let trigger = StoreTrigger::new(rt, move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });
        let field = wrap(Value::set_from(["x", "y"]), Some(trigger), rt);
        (field.as_set().cloned().expect("set"), fired)
    }

    #[test]
    fn add_and_delete_fire_once_per_change() {
        let rt = Runtime::new();
        let (set, fired) = fixture(&rt);

        assert!(set.add("z"));
        assert!(!set.add("z"));
        assert!(set.delete("x"));
        assert!(!set.delete("x"));
        assert_eq!(fired.load(Ordering::SeqCst), 2);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn membership_is_tracked_per_member() {
        let rt = Runtime::new();
        let (set, _) = fixture(&rt);

        let reader = set.clone();
        let has_x = Computed::new(&rt, move || reader.has("x"));
        let reader = set.clone();
        let size = Computed::new(&rt, move || reader.len());

        set.add("w");
        assert!(!has_x.is_dirty());
        assert!(size.is_dirty());

        set.delete("x");
        assert!(has_x.is_dirty());
        assert!(!has_x.get().unwrap());
    }

    #[test]
    fn nan_is_a_single_member() {
        let rt = Runtime::new();
        let (set, _) = fixture(&rt);
        assert!(set.add(f64::NAN));
        assert!(!set.add(f64::NAN));
        assert!(set.has(f64::NAN));
    }

    #[test]
    fn clear_empties_and_reports() {
        let rt = Runtime::new();
        let (set, fired) = fixture(&rt);
        assert!(set.clear());
        assert!(set.is_empty());
        assert!(!set.clear());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(set.values().is_empty());
    }
}
