//! Graph keys.
//!
//! A dependency is the pair `(TargetId, Key)`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::value::Value;

/// Identity of an observable target.
///
/// Allocated from a process-wide counter so identities never collide, even
/// between independent runtimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(u64);

impl TargetId {
    /// Generate a new unique target ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for TargetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The part of a target a computation read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A named property of an object.
    Prop(String),

    /// An index of an array.
    Index(usize),

    /// A primitive key of a map, or a primitive member of a set.
    Entry(Value),

    /// The whole value of a ref, computed or date.
    Value,

    /// Length of an array.
    Length,

    /// Size of a map or set.
    Size,

    /// Any change to the contents: membership, order, or values.
    Iterate,

    /// Key enumeration of a map.
    KeyIterate,
}

impl Key {
    pub fn prop(name: impl Into<String>) -> Self {
        Key::Prop(name.into())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Prop(name) => write!(f, ".{name}"),
            Key::Index(i) => write!(f, "[{i}]"),
            Key::Entry(v) => write!(f, "<{v}>"),
            Key::Value => f.write_str("value"),
            Key::Length => f.write_str("length"),
            Key::Size => f.write_str("size"),
            Key::Iterate => f.write_str("iterate"),
            Key::KeyIterate => f.write_str("keys"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_ids_are_unique() {
        let a = TargetId::new();
        let b = TargetId::new();
        assert_ne!(a, b);
        assert!(b.raw() > a.raw());
    }

    #[test]
    fn entry_keys_use_value_equality() {
        assert_eq!(Key::Entry(Value::from(1.0)), Key::Entry(Value::from(1)));
        assert_eq!(
            Key::Entry(Value::Number(f64::NAN)),
            Key::Entry(Value::Number(f64::NAN))
        );
        assert_ne!(Key::prop("a"), Key::prop("b"));
    }
}
