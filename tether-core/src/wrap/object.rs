//! Observable view of a plain object.

use std::fmt;
use std::sync::Arc;

use super::{Field, Wrapped};
use crate::graph::{Key, TargetId};
use crate::value::{Object, Value};

/// A wrapped [`Object`].
///
/// Property reads track the property; `keys`/`len`/`entries` track the
/// iteration marker. Adding or removing a property triggers the property
/// and the iteration marker; overwriting one triggers only the property.
#[derive(Clone)]
pub struct ReactiveObject {
    pub(crate) inner: Arc<Wrapped<Object>>,
}

impl ReactiveObject {
    pub fn id(&self) -> TargetId {
        self.inner.target.id()
    }

    /// Read a property. Missing properties read as `Undefined`.
    pub fn get(&self, key: &str) -> Field {
        self.inner.scope.track(self.id(), Key::prop(key));
        self.get_untracked(key)
    }

    pub(crate) fn get_untracked(&self, key: &str) -> Field {
        let value = self
            .inner
            .target
            .read()
            .get(key)
            .cloned()
            .unwrap_or(Value::Undefined);
        self.inner.scope.wrap(value)
    }

    pub fn has(&self, key: &str) -> bool {
        self.inner.scope.track(self.id(), Key::prop(key));
        self.inner.target.read().contains_key(key)
    }

    /// Write a property. Returns `false` if it already held `value`.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        let added = {
            let mut target = self.inner.target.write();
            match target.get_mut(key) {
                Some(current) if *current == value => return false,
                Some(current) => {
                    *current = value;
                    false
                }
                None => {
                    target.insert(key.to_string(), value);
                    true
                }
            }
        };

        if added {
            self.inner.scope.notify(self.id(), &[Key::prop(key), Key::Iterate]);
        } else {
            self.inner.scope.notify(self.id(), &[Key::prop(key)]);
        }
        true
    }

    /// Remove a property. Returns `false` if it was absent.
    pub fn delete(&self, key: &str) -> bool {
        let removed = self.inner.target.write().shift_remove(key).is_some();
        if removed {
            self.inner.scope.notify(self.id(), &[Key::prop(key), Key::Iterate]);
        }
        removed
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.scope.track(self.id(), Key::Iterate);
        self.inner.target.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.scope.track(self.id(), Key::Iterate);
        self.inner.target.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every property, in insertion order. Tracks iteration and each key.
    pub fn entries(&self) -> Vec<(String, Field)> {
        self.keys()
            .into_iter()
            .map(|key| {
                let field = self.get(&key);
                (key, field)
            })
            .collect()
    }

    pub fn to_raw(&self) -> Value {
        Value::Object(self.inner.target.clone())
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl From<ReactiveObject> for Value {
    fn from(object: ReactiveObject) -> Self {
        object.to_raw()
    }
}

impl fmt::Debug for ReactiveObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveObject")
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

    fn fixture(rt: &Runtime) -> (ReactiveObject, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        let trigger = StoreTrigger::new(rt, move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });
        let raw = Value::object_from([("a", 1), ("b", 2)]);
        let field = wrap(raw, Some(trigger), rt);
        (field.as_object().cloned().expect("object"), fired)
    }

    #[test]
    fn get_and_set() {
        let rt = Runtime::new();
        let (obj, fired) = fixture(&rt);

        assert_eq!(obj.get("a").as_f64(), Some(1.0));
        assert!(obj.get("missing").is_undefined());

        assert!(obj.set("a", 10));
        assert_eq!(obj.get("a").as_f64(), Some(10.0));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn same_value_write_is_a_noop() {
        let rt = Runtime::new();
        let (obj, fired) = fixture(&rt);
        obj.set("n", f64::NAN);
        fired.store(0, Ordering::SeqCst);

        assert!(!obj.set("a", 1));
        assert!(!obj.set("n", f64::NAN));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn reads_are_fine_grained_per_property() {
        let rt = Runtime::new();
        let (obj, _) = fixture(&rt);

        let reader = obj.clone();
        let a = Computed::new(&rt, move || reader.get("a").to_raw());

        obj.set("b", 20);
        assert!(!a.is_dirty());

        obj.set("a", 5);
        assert!(a.is_dirty());
    }

    #[test]
    fn adding_a_key_invalidates_iteration() {
        let rt = Runtime::new();
        let (obj, _) = fixture(&rt);

        let reader = obj.clone();
        let keys = Computed::new(&rt, move || reader.keys());

        obj.set("a", 100);
        assert!(!keys.is_dirty());

        obj.set("c", 3);
        assert!(keys.is_dirty());
        assert_eq!(keys.get().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn delete_triggers_property_and_iteration() {
        let rt = Runtime::new();
        let (obj, fired) = fixture(&rt);

        let reader = obj.clone();
        let a = Computed::new(&rt, move || reader.get("a").to_raw());
        let reader = obj.clone();
        let len = Computed::new(&rt, move || reader.len());

        assert!(obj.delete("a"));
        assert!(a.is_dirty());
        assert!(len.is_dirty());
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        assert!(!obj.delete("a"));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn nested_objects_carry_the_store_trigger() {
        let rt = Runtime::new();
        let (obj, fired) = fixture(&rt);
        obj.set("nested", Value::object_from([("x", 1)]));

        let nested = obj.get("nested");
        nested.as_object().expect("object").set("x", 2);
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn writing_a_wrapper_stores_its_raw_target() {
        let rt = Runtime::new();
        let (obj, _) = fixture(&rt);
        let other = rt.reactive(Value::object());

        obj.set("child", other.clone());
        let child = obj.get("child");
        assert_eq!(child.to_raw(), other.to_raw());
    }
}
