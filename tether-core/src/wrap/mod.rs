//! Reactive Wrappers
//!
//! Wrapping turns a plain structure from [`crate::value`] into an observable
//! view of it. Reads through the view call `track`; writes compare old and
//! new, and on a real change `trigger` the affected keys and fire the
//! store trigger the wrapper was created with.
//!
//! # How Wrapping Works
//!
//! 1. [`wrap`] dispatches on the kind of value. Primitives come back as
//!    [`Field::Value`]; structures come back as [`Field::Reactive`] holding
//!    one of the closed set of wrapper kinds in [`Reactive`].
//!
//! 2. Nested structures are wrapped lazily, when a read returns them, and
//!    inherit the parent's store trigger. There is no way to reach an
//!    untracked nested structure through a wrapper.
//!
//! 3. Each runtime keeps an identity map keyed by `(target, trigger)`, so
//!    wrapping the same structure twice returns the same wrapper. Entries
//!    hold wrappers weakly and are swept as the map grows, so dropping
//!    every handle to a wrapper lets it go.
//!
//! Tracking is keyed by the target's identity, never the wrapper's, so two
//! wrappers of one structure (for example with different store triggers)
//! observe the same dependencies.
//!
//! # Granularity
//!
//! | kind | reads track | writes trigger |
//! |------|-------------|----------------|
//! | object | the property | the property, plus `Iterate` when a key is added or removed |
//! | array | the index, `Length` | see [`ReactiveArray`] |
//! | map | the entry key, or `Iterate` for structural keys | entry, `Iterate`, `KeyIterate`, `Size` |
//! | set | same as map | same as map |
//! | date | `Value` | `Value`, `Iterate` |

mod array;
mod date;
mod map;
mod object;
mod set;

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::trace;

pub use array::ReactiveArray;
pub use date::ReactiveDate;
pub use map::ReactiveMap;
pub use object::ReactiveObject;
pub use set::ReactiveSet;

use crate::graph::{Key, TargetId};
use crate::reactive::{Runtime, StoreTrigger};
use crate::value::{Object, Shared, Value, ValueMap, ValueSet};

/// Wrap `value`, firing `trigger` on every successful mutation made
/// through the returned wrapper (or anything reached through it).
pub fn wrap(value: Value, trigger: Option<StoreTrigger>, runtime: &Runtime) -> Field {
    Scope::new(runtime, trigger).wrap(value)
}

impl Runtime {
    /// Wrap `value`, capturing the ambient store trigger if a setup function
    /// is running.
    pub fn reactive(&self, value: impl Into<Value>) -> Field {
        wrap(value.into(), self.ambient_trigger(), self)
    }
}

// ----------------------------------------------------------------------------
// Field / Reactive
// ----------------------------------------------------------------------------

/// What a read through a wrapper returns.
#[derive(Clone)]
pub enum Field {
    /// A primitive. Carries no tracking of its own.
    Value(Value),
    /// A structure, already wrapped.
    Reactive(Reactive),
}

impl Field {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Field::Value(v) => Some(v),
            Field::Reactive(_) => None,
        }
    }

    pub fn as_reactive(&self) -> Option<&Reactive> {
        match self {
            Field::Reactive(r) => Some(r),
            Field::Value(_) => None,
        }
    }

    pub fn into_reactive(self) -> Option<Reactive> {
        match self {
            Field::Reactive(r) => Some(r),
            Field::Value(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_value().and_then(Value::as_f64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_value().and_then(Value::as_bool)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Field::Value(Value::Undefined))
    }

    pub fn as_object(&self) -> Option<&ReactiveObject> {
        self.as_reactive().and_then(Reactive::as_object)
    }

    pub fn as_array(&self) -> Option<&ReactiveArray> {
        self.as_reactive().and_then(Reactive::as_array)
    }

    pub fn as_map(&self) -> Option<&ReactiveMap> {
        self.as_reactive().and_then(Reactive::as_map)
    }

    pub fn as_set(&self) -> Option<&ReactiveSet> {
        self.as_reactive().and_then(Reactive::as_set)
    }

    pub fn as_date(&self) -> Option<&ReactiveDate> {
        self.as_reactive().and_then(Reactive::as_date)
    }

    /// The underlying plain value.
    pub fn to_raw(&self) -> Value {
        match self {
            Field::Value(v) => v.clone(),
            Field::Reactive(r) => r.to_raw(),
        }
    }
}

impl From<Field> for Value {
    fn from(field: Field) -> Self {
        field.to_raw()
    }
}

impl From<&Field> for Value {
    fn from(field: &Field) -> Self {
        field.to_raw()
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Field::Reactive(r) => f.debug_tuple("Reactive").field(r).finish(),
        }
    }
}

/// The closed set of wrapper kinds.
#[derive(Clone)]
pub enum Reactive {
    Object(ReactiveObject),
    Array(ReactiveArray),
    Map(ReactiveMap),
    Set(ReactiveSet),
    Date(ReactiveDate),
}

impl Reactive {
    pub fn target_id(&self) -> TargetId {
        match self {
            Reactive::Object(w) => w.id(),
            Reactive::Array(w) => w.id(),
            Reactive::Map(w) => w.id(),
            Reactive::Set(w) => w.id(),
            Reactive::Date(w) => w.id(),
        }
    }

    /// The wrapped structure, as a plain value sharing the same target.
    pub fn to_raw(&self) -> Value {
        match self {
            Reactive::Object(w) => w.to_raw(),
            Reactive::Array(w) => w.to_raw(),
            Reactive::Map(w) => w.to_raw(),
            Reactive::Set(w) => w.to_raw(),
            Reactive::Date(w) => w.to_raw(),
        }
    }

    /// Whether both are the same wrapper instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Reactive::Object(a), Reactive::Object(b)) => a.ptr_eq(b),
            (Reactive::Array(a), Reactive::Array(b)) => a.ptr_eq(b),
            (Reactive::Map(a), Reactive::Map(b)) => a.ptr_eq(b),
            (Reactive::Set(a), Reactive::Set(b)) => a.ptr_eq(b),
            (Reactive::Date(a), Reactive::Date(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub fn as_object(&self) -> Option<&ReactiveObject> {
        match self {
            Reactive::Object(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ReactiveArray> {
        match self {
            Reactive::Array(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ReactiveMap> {
        match self {
            Reactive::Map(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&ReactiveSet> {
        match self {
            Reactive::Set(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&ReactiveDate> {
        match self {
            Reactive::Date(w) => Some(w),
            _ => None,
        }
    }
}

impl From<Reactive> for Value {
    fn from(reactive: Reactive) -> Self {
        reactive.to_raw()
    }
}

impl From<&Reactive> for Value {
    fn from(reactive: &Reactive) -> Self {
        reactive.to_raw()
    }
}

impl fmt::Debug for Reactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reactive::Object(w) => fmt::Debug::fmt(w, f),
            Reactive::Array(w) => fmt::Debug::fmt(w, f),
            Reactive::Map(w) => fmt::Debug::fmt(w, f),
            Reactive::Set(w) => fmt::Debug::fmt(w, f),
            Reactive::Date(w) => fmt::Debug::fmt(w, f),
        }
    }
}

// ----------------------------------------------------------------------------
// Scope
// ----------------------------------------------------------------------------

/// The runtime and store trigger a wrapper reports to.
#[derive(Clone)]
pub(crate) struct Scope {
    runtime: Runtime,
    trigger: Option<StoreTrigger>,
}

impl Scope {
    pub(crate) fn new(runtime: &Runtime, trigger: Option<StoreTrigger>) -> Self {
        Self {
            runtime: runtime.clone(),
            trigger,
        }
    }

    pub(crate) fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    fn trigger_id(&self) -> Option<u64> {
        self.trigger.as_ref().map(StoreTrigger::id)
    }

    pub(crate) fn track(&self, target: TargetId, key: Key) {
        self.runtime.track(target, key);
    }

    /// Trigger `keys` and fire the store trigger once.
    pub(crate) fn notify(&self, target: TargetId, keys: &[Key]) {
        self.runtime.trigger_keys(target, keys);
        if let Some(trigger) = &self.trigger {
            trigger.fire();
        }
    }

    /// Wrap a value read out of a structure this scope owns.
    pub(crate) fn wrap(&self, value: Value) -> Field {
        let wrappers = &self.runtime.inner().wrappers;
        match value {
            Value::Object(target) => {
                Field::Reactive(Reactive::Object(wrappers.intern(&target, self)))
            }
            Value::Array(target) => Field::Reactive(Reactive::Array(wrappers.intern(&target, self))),
            Value::Map(target) => Field::Reactive(Reactive::Map(wrappers.intern(&target, self))),
            Value::Set(target) => Field::Reactive(Reactive::Set(wrappers.intern(&target, self))),
            Value::Date(target) => Field::Reactive(Reactive::Date(wrappers.intern(&target, self))),
            primitive => Field::Value(primitive),
        }
    }

    /// Wrap an object directly.
    pub(crate) fn object(&self, target: &Shared<Object>) -> ReactiveObject {
        self.runtime.inner().wrappers.intern(target, self)
    }
}

/// A target plus the scope it reports to. Every wrapper kind is an `Arc` of
/// one of these.
pub(crate) struct Wrapped<T> {
    pub(crate) target: Shared<T>,
    pub(crate) scope: Scope,
}

// ----------------------------------------------------------------------------
// Identity map
// ----------------------------------------------------------------------------

pub(crate) enum WeakEntry {
    Object(Weak<Wrapped<Object>>),
    Array(Weak<Wrapped<Vec<Value>>>),
    Map(Weak<Wrapped<ValueMap>>),
    Set(Weak<Wrapped<ValueSet>>),
    Date(Weak<Wrapped<chrono::DateTime<chrono::Utc>>>),
}

impl WeakEntry {
    fn is_alive(&self) -> bool {
        match self {
            WeakEntry::Object(w) => w.strong_count() > 0,
            WeakEntry::Array(w) => w.strong_count() > 0,
            WeakEntry::Map(w) => w.strong_count() > 0,
            WeakEntry::Set(w) => w.strong_count() > 0,
            WeakEntry::Date(w) => w.strong_count() > 0,
        }
    }
}

/// A wrapper kind that can live in the identity map.
pub(crate) trait Interned: Sized {
    type Target;

    fn create(wrapped: Wrapped<Self::Target>) -> Self;
    fn upgrade(entry: &WeakEntry) -> Option<Self>;
    fn downgrade(&self) -> WeakEntry;
}

macro_rules! impl_interned {
    ($wrapper:ident, $target:ty, $variant:ident) => {
        impl Interned for $wrapper {
            type Target = $target;

            fn create(wrapped: Wrapped<$target>) -> Self {
                Self {
                    inner: Arc::new(wrapped),
                }
            }

            fn upgrade(entry: &WeakEntry) -> Option<Self> {
                match entry {
                    WeakEntry::$variant(weak) => weak.upgrade().map(|inner| Self { inner }),
                    _ => None,
                }
            }

            fn downgrade(&self) -> WeakEntry {
                WeakEntry::$variant(Arc::downgrade(&self.inner))
            }
        }
    };
}

impl_interned!(ReactiveObject, Object, Object);
impl_interned!(ReactiveArray, Vec<Value>, Array);
impl_interned!(ReactiveMap, ValueMap, Map);
impl_interned!(ReactiveSet, ValueSet, Set);
impl_interned!(ReactiveDate, chrono::DateTime<chrono::Utc>, Date);

/// One wrapper per `(target, store trigger)`.
pub(crate) struct IdentityMap {
    entries: DashMap<(TargetId, Option<u64>), WeakEntry>,
    initial_threshold: usize,
    threshold: AtomicUsize,
}

impl IdentityMap {
    pub(crate) fn new(threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            entries: DashMap::new(),
            initial_threshold: threshold,
            threshold: AtomicUsize::new(threshold),
        }
    }

    pub(crate) fn intern<W: Interned>(&self, target: &Shared<W::Target>, scope: &Scope) -> W {
        let key = (target.id(), scope.trigger_id());
        let make = || {
            W::create(Wrapped {
                target: target.clone(),
                scope: scope.clone(),
            })
        };

        let wrapper = match self.entries.entry(key) {
            Entry::Occupied(mut entry) => match W::upgrade(entry.get()) {
                Some(existing) => return existing,
                None => {
                    let wrapper = make();
                    entry.insert(wrapper.downgrade());
                    wrapper
                }
            },
            Entry::Vacant(entry) => {
                let wrapper = make();
                entry.insert(wrapper.downgrade());
                wrapper
            }
        };

        self.maybe_sweep();
        wrapper
    }

    fn maybe_sweep(&self) {
        let before = self.entries.len();
        if before < self.threshold.load(Ordering::Relaxed) {
            return;
        }

        self.entries.retain(|_, entry| entry.is_alive());
        let after = self.entries.len();
        self.threshold
            .store((after * 2).max(self.initial_threshold), Ordering::Relaxed);
        trace!(before, after, "identity map swept");
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;

    #[test]
    fn primitives_are_not_wrapped() {
        let rt = Runtime::new();
        assert!(matches!(rt.reactive(1), Field::Value(Value::Number(n)) if n == 1.0));
        assert!(rt.reactive(Value::Undefined).is_undefined());
    }

    #[test]
    fn wrapping_twice_returns_the_same_wrapper() {
        let rt = Runtime::new();
        let raw = Value::object_from([("a", 1)]);

        let first = rt.reactive(raw.clone()).into_reactive();
        let second = rt.reactive(raw).into_reactive();
        match (first, second) {
            (Some(a), Some(b)) => assert!(a.ptr_eq(&b)),
            other => panic!("expected two wrappers, got {other:?}"),
        }
    }

    #[test]
    fn different_triggers_get_different_wrappers_over_one_target() {
        let rt = Runtime::new();
        let raw = Value::object();
        let trigger = StoreTrigger::new(&rt, || {});

        let plain = wrap(raw.clone(), None, &rt).into_reactive();
        let with_trigger = wrap(raw, Some(trigger), &rt).into_reactive();
        let (Some(plain), Some(with_trigger)) = (plain, with_trigger) else {
            panic!("expected wrappers");
        };
        assert!(!plain.ptr_eq(&with_trigger));
        assert_eq!(plain.target_id(), with_trigger.target_id());
    }

    #[test]
    fn nested_reads_are_identity_stable() {
        let rt = Runtime::new();
        let inner = Value::object_from([("x", 1)]);
        let outer = Value::object_from([("inner", inner)]);
        let field = rt.reactive(outer);
        let obj = field.as_object().expect("object");

        let a = obj.get("inner").into_reactive().expect("nested");
        let b = obj.get("inner").into_reactive().expect("nested");
        assert!(a.ptr_eq(&b));
    }

    #[test]
    fn self_referential_structures_wrap() {
        let rt = Runtime::new();
        let raw = Value::object();
        if let Value::Object(target) = &raw {
            target.write().insert("me".into(), raw.clone());
        }

        let field = rt.reactive(raw);
        let obj = field.as_object().expect("object");
        let me = obj.get("me");
        let again = me.as_object().expect("object").get("me");
        assert!(Reactive::Object(obj.clone()).ptr_eq(again.as_reactive().expect("wrapper")));
    }

    #[test]
    fn dead_wrappers_are_swept() {
        let rt = Runtime::with_config(RuntimeConfig {
            sweep_threshold: 4,
            ..Default::default()
        });

        for _ in 0..32 {
            let _dropped = rt.reactive(Value::object());
        }
        assert!(rt.inner().wrappers.len() <= 4);
    }

    #[test]
    fn reactive_converts_back_to_raw() {
        let rt = Runtime::new();
        let raw = Value::array_from([1, 2]);
        let field = rt.reactive(raw.clone());
        assert_eq!(field.to_raw(), raw);
    }
}
