//! Observable view of a key/value collection.

use std::fmt;
use std::sync::Arc;

use super::{Field, Wrapped};
use crate::graph::{Key, TargetId};
use crate::value::{Value, ValueMap};

/// The key a read of `key` tracks.
///
/// Primitive keys are tracked individually. Structural keys compare by
/// identity, so reads through them track the iteration marker instead.
pub(crate) fn entry_key(key: &Value) -> Key {
    if key.is_primitive() {
        Key::Entry(key.clone())
    } else {
        Key::Iterate
    }
}

/// Keys triggered by a membership or value change of `keys`.
pub(crate) fn membership_keys<'a>(keys: impl IntoIterator<Item = &'a Value>) -> Vec<Key> {
    let mut out: Vec<Key> = keys
        .into_iter()
        .filter(|k| k.is_primitive())
        .map(|k| Key::Entry(k.clone()))
        .collect();
    out.extend([Key::Iterate, Key::KeyIterate, Key::Size]);
    out
}

/// A wrapped [`ValueMap`].
#[derive(Clone)]
pub struct ReactiveMap {
    pub(crate) inner: Arc<Wrapped<ValueMap>>,
}

impl ReactiveMap {
    pub fn id(&self) -> TargetId {
        self.inner.target.id()
    }

    pub fn get(&self, key: impl Into<Value>) -> Field {
        let key = key.into();
        self.inner.scope.track(self.id(), entry_key(&key));
        let value = self
            .inner
            .target
            .read()
            .get(&key)
            .cloned()
            .unwrap_or(Value::Undefined);
        self.inner.scope.wrap(value)
    }

    pub fn has(&self, key: impl Into<Value>) -> bool {
        let key = key.into();
        self.inner.scope.track(self.id(), entry_key(&key));
        self.inner.target.read().contains_key(&key)
    }

    /// Insert or overwrite. Returns `false` if the entry already held
    /// `value`.
    pub fn set(&self, key: impl Into<Value>, value: impl Into<Value>) -> bool {
        let (key, value) = (key.into(), value.into());
        {
            let mut map = self.inner.target.write();
            if map.get(&key) == Some(&value) {
                return false;
            }
            map.insert(key.clone(), value);
        }
        self.inner
            .scope
            .notify(self.id(), &membership_keys(std::iter::once(&key)));
        true
    }

    pub fn delete(&self, key: impl Into<Value>) -> bool {
        let key = key.into();
        let removed = self.inner.target.write().shift_remove(&key).is_some();
        if removed {
            self.inner
                .scope
                .notify(self.id(), &membership_keys(std::iter::once(&key)));
        }
        removed
    }

    /// Remove every entry. Returns `false` if the map was already empty.
    pub fn clear(&self) -> bool {
        let removed: Vec<Value> = {
            let mut map = self.inner.target.write();
            if map.is_empty() {
                return false;
            }
            map.drain(..).map(|(k, _)| k).collect()
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

    /// Keys in insertion order. Tracks key enumeration only.
    pub fn keys(&self) -> Vec<Field> {
        self.inner.scope.track(self.id(), Key::KeyIterate);
        let keys: Vec<Value> = self.inner.target.read().keys().cloned().collect();
        keys.into_iter().map(|k| self.inner.scope.wrap(k)).collect()
    }

    pub fn values(&self) -> Vec<Field> {
        self.entries().into_iter().map(|(_, v)| v).collect()
    }

    /// Entries in insertion order. Tracks iteration.
    pub fn entries(&self) -> Vec<(Field, Field)> {
        self.inner.scope.track(self.id(), Key::Iterate);
        let entries: Vec<(Value, Value)> = self
            .inner
            .target
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries
            .into_iter()
            .map(|(k, v)| (self.inner.scope.wrap(k), self.inner.scope.wrap(v)))
            .collect()
    }

    pub fn to_raw(&self) -> Value {
        Value::Map(self.inner.target.clone())
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl From<ReactiveMap> for Value {
    fn from(map: ReactiveMap) -> Self {
        map.to_raw()
    }
}

impl fmt::Debug for ReactiveMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveMap")
            .field("id", &self.id())
            .field("len", &self.inner.target.read().len())
            .finish()
    }
}
