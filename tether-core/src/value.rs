//! Plain data model.
//!
//! [`Value`] is what stores hold: primitives plus five structure kinds.
//! Structures live behind [`Shared`], a shared interior-mutable handle with
//! a stable [`TargetId`]. Two `Value`s holding the same `Shared` are the
//! *same* structure; two structurally equal but separately created objects
//! are not. This mirrors the identity semantics the reactive layer needs:
//! wrapping is keyed by identity, and a write of "the same object" is a
//! no-op while a write of an equal copy is a change.
//!
//! Raw values are untracked. Reads and writes only participate in
//! dependency tracking when they go through a wrapper from
//! [`crate::wrap`].
//!
//! Cycles built out of `Shared` handles (an object that contains itself)
//! are supported by the wrapper layer and rejected by [`Value::to_json`];
//! like any `Arc` cycle they are never freed.

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::{IndexMap, IndexSet};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{Result, StoreError};
use crate::graph::TargetId;

/// Ordered string-keyed record.
pub type Object = IndexMap<String, Value>;

/// Key/value collection keyed by any value.
pub type ValueMap = IndexMap<Value, Value>;

/// Collection of unique values.
pub type ValueSet = IndexSet<Value>;

/// Shared, identity-carrying handle to a structure.
pub struct Shared<T> {
    inner: Arc<SharedInner<T>>,
}

struct SharedInner<T> {
    id: TargetId,
    data: RwLock<T>,
}

impl<T> Shared<T> {
    pub fn new(data: T) -> Self {
        Self {
            inner: Arc::new(SharedInner {
                id: TargetId::new(),
                data: RwLock::new(data),
            }),
        }
    }

    /// Identity of this structure.
    pub fn id(&self) -> TargetId {
        self.inner.id
    }

    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.inner.data.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.inner.data.write()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Contents are omitted: structures may be self-referential.
        f.debug_tuple("Shared").field(&self.inner.id).finish()
    }
}

/// A storable value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Object(Shared<Object>),
    Array(Shared<Vec<Value>>),
    Map(Shared<ValueMap>),
    Set(Shared<ValueSet>),
    Date(Shared<DateTime<Utc>>),
}

impl Value {
    /// A new empty object.
    pub fn object() -> Self {
        Value::Object(Shared::new(Object::new()))
    }

    pub fn object_from<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let object = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Value::Object(Shared::new(object))
    }

    pub fn array_from<V, I>(items: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Value::Array(Shared::new(items.into_iter().map(Into::into).collect()))
    }

    pub fn map_from<K, V, I>(entries: I) -> Self
    where
        K: Into<Value>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Value::Map(Shared::new(map))
    }

    pub fn set_from<V, I>(items: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Value::Set(Shared::new(items.into_iter().map(Into::into).collect()))
    }

    pub fn date(instant: DateTime<Utc>) -> Self {
        Value::Date(Shared::new(instant))
    }

    /// Name of the value's kind, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(_) => "object",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Set(_) => "set",
            Value::Date(_) => "date",
        }
    }

    /// Identity of the structure, or `None` for primitives.
    pub fn target_id(&self) -> Option<TargetId> {
        match self {
            Value::Object(s) => Some(s.id()),
            Value::Array(s) => Some(s.id()),
            Value::Map(s) => Some(s.id()),
            Value::Set(s) => Some(s.id()),
            Value::Date(s) => Some(s.id()),
            _ => None,
        }
    }

    pub fn is_primitive(&self) -> bool {
        self.target_id().is_none()
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Shared<Object>> {
        match self {
            Value::Object(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Shared<Vec<Value>>> {
        match self {
            Value::Array(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to JSON.
    ///
    /// Fails with [`StoreError::CyclicState`] if a structure contains
    /// itself. Shared substructures that are not cycles are fine.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let mut path = HashSet::new();
        to_json_inner(self, &mut path)
    }

    /// Build a fresh value tree from JSON. Every object and array is new.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                Value::array_from(items.iter().map(Value::from_json))
            }
            serde_json::Value::Object(map) => Value::object_from(
                map.iter().map(|(k, v)| (k.clone(), Value::from_json(v))),
            ),
        }
    }
}

fn to_json_inner(value: &Value, path: &mut HashSet<TargetId>) -> Result<serde_json::Value> {
    use serde_json::Value as Json;

    if let Some(id) = value.target_id() {
        if !path.insert(id) {
            return Err(StoreError::CyclicState);
        }
    }

    let json = match value {
        Value::Undefined | Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Number(n) => number_to_json(*n),
        Value::String(s) => Json::String(s.clone()),
        Value::Object(obj) => {
            let entries: Vec<(String, Value)> = obj
                .read()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            let mut out = serde_json::Map::with_capacity(entries.len());
            for (k, v) in entries {
                out.insert(k, to_json_inner(&v, path)?);
            }
            Json::Object(out)
        }
        Value::Array(items) => {
            let items = items.read().clone();
            Json::Array(
                items
                    .iter()
                    .map(|v| to_json_inner(v, path))
                    .collect::<Result<_>>()?,
            )
        }
        Value::Set(items) => {
            let items: Vec<Value> = items.read().iter().cloned().collect();
            Json::Array(
                items
                    .iter()
                    .map(|v| to_json_inner(v, path))
                    .collect::<Result<_>>()?,
            )
        }
        Value::Map(map) => {
            let entries: Vec<(Value, Value)> = map
                .read()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            if entries.iter().all(|(k, _)| matches!(k, Value::String(_))) {
                let mut out = serde_json::Map::with_capacity(entries.len());
                for (k, v) in entries {
                    out.insert(k.to_string(), to_json_inner(&v, path)?);
                }
                Json::Object(out)
            } else {
                let mut pairs = Vec::with_capacity(entries.len());
                for (k, v) in entries {
                    pairs.push(Json::Array(vec![
                        to_json_inner(&k, path)?,
                        to_json_inner(&v, path)?,
                    ]));
                }
                Json::Array(pairs)
            }
        }
        Value::Date(instant) => {
            Json::String(instant.read().to_rfc3339_opts(SecondsFormat::Millis, true))
        }
    };

    if let Some(id) = value.target_id() {
        path.remove(&id);
    }
    Ok(json)
}

fn number_to_json(n: f64) -> serde_json::Value {
    // Integral values serialize as integers so snapshots read naturally.
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
    }
}

// ----------------------------------------------------------------------------
// Equality and hashing
// ----------------------------------------------------------------------------

/// Strict identity plus NaN-equals-NaN.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Map(a), Value::Map(b)) => a.ptr_eq(b),
            (Value::Set(a), Value::Set(b)) => a.ptr_eq(b),
            (Value::Date(a), Value::Date(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Undefined | Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Number(n) => {
                // +0 and -0 compare equal; every NaN compares equal.
                let bits = if n.is_nan() {
                    f64::NAN.to_bits()
                } else if *n == 0.0 {
                    0
                } else {
                    n.to_bits()
                };
                bits.hash(state);
            }
            Value::String(s) => s.hash(state),
            other => other.target_id().hash(state),
        }
    }
}

// ----------------------------------------------------------------------------
// Display
// ----------------------------------------------------------------------------

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut seen = HashSet::new();
        write_display(self, f, &mut seen)
    }
}

fn write_display(
    value: &Value,
    f: &mut fmt::Formatter<'_>,
    seen: &mut HashSet<TargetId>,
) -> fmt::Result {
    match value {
        Value::Undefined => f.write_str("undefined"),
        Value::Null => f.write_str("null"),
        Value::Bool(b) => write!(f, "{b}"),
        Value::Number(n) => write_number(*n, f),
        Value::String(s) => f.write_str(s),
        Value::Object(_) => f.write_str("[object Object]"),
        Value::Map(_) => f.write_str("[object Map]"),
        Value::Set(_) => f.write_str("[object Set]"),
        Value::Date(instant) => {
            f.write_str(&instant.read().to_rfc3339_opts(SecondsFormat::Millis, true))
        }
        Value::Array(items) => {
            // A nested reference to an array being printed renders empty.
            if !seen.insert(items.id()) {
                return Ok(());
            }
            let items = items.read().clone();
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                if !matches!(item, Value::Undefined | Value::Null) {
                    write_display(item, f, seen)?;
                }
            }
            if let Some(id) = value.target_id() {
                seen.remove(&id);
            }
            Ok(())
        }
    }
}

fn write_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_nan() {
        f.write_str("NaN")
    } else if n.is_infinite() {
        f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" })
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        write!(f, "{}", n as i64)
    } else {
        write!(f, "{n}")
    }
}

// ----------------------------------------------------------------------------
// Conversions
// ----------------------------------------------------------------------------

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

macro_rules! impl_from_number {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::Number(n as f64)
                }
            }
        )*
    };
}

impl_from_number!(f32, i32, i64, u32, u64, usize);

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(instant: DateTime<Utc>) -> Self {
        Value::date(instant)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(Shared::new(items))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        Value::from_json(json)
    }
}
