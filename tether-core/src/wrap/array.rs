//! Observable view of an ordered sequence.
//!
//! Mutating operations are instrumented one by one because each moves a
//! different set of indices:
//!
//! | operation | triggers |
//! |-----------|----------|
//! | `push` | `Length`, `Iterate`, the new index |
//! | `pop` | `Length`, `Iterate`, the vacated index |
//! | `unshift` / `shift` | `Length`, `Iterate`, every index whose content moved |
//! | `splice` | `Iterate`, every index from `start` to the end of the longer of the old and new layouts, `Length` only when the length changes |
//! | `sort` / `reverse` | `Iterate`, every index (only when there are two or more elements) |
//! | `set` | the index; past the end also `Length`, `Iterate` and every new index |
//!
//! Operations on an empty array that have nothing to remove are no-ops and
//! fire nothing. Every operation that does change the array fires the store
//! trigger exactly once.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use super::{Field, Wrapped};
use crate::graph::{Key, TargetId};
use crate::value::Value;

/// A wrapped `Vec<Value>`.
#[derive(Clone)]
pub struct ReactiveArray {
    pub(crate) inner: Arc<Wrapped<Vec<Value>>>,
}

fn changed_keys(indices: Range<usize>, length_changed: bool) -> Vec<Key> {
    let mut keys = Vec::with_capacity(indices.len() + 2);
    if length_changed {
        keys.push(Key::Length);
    }
    keys.push(Key::Iterate);
    keys.extend(indices.map(Key::Index));
    keys
}

impl ReactiveArray {
    pub fn id(&self) -> TargetId {
        self.inner.target.id()
    }

    fn notify(&self, keys: &[Key]) {
        self.inner.scope.notify(self.id(), keys);
    }

    pub fn len(&self) -> usize {
        self.inner.scope.track(self.id(), Key::Length);
        self.inner.target.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read an index. Out-of-range reads are `Undefined`.
    pub fn get(&self, index: usize) -> Field {
        self.inner.scope.track(self.id(), Key::Index(index));
        let value = self
            .inner
            .target
            .read()
            .get(index)
            .cloned()
            .unwrap_or(Value::Undefined);
        self.inner.scope.wrap(value)
    }

    /// Write an index, extending the array with `Undefined` if needed.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> bool {
        let value = value.into();
        let grew_from = {
            let mut items = self.inner.target.write();
            let old_len = items.len();
            if index < old_len {
                if items[index] == value {
                    return false;
                }
                items[index] = value;
                None
            } else {
                items.resize(index, Value::Undefined);
                items.push(value);
                Some(old_len)
            }
        };

        match grew_from {
            None => self.notify(&[Key::Index(index)]),
            Some(old_len) => self.notify(&changed_keys(old_len..index + 1, true)),
        }
        true
    }

    /// Truncate or extend with `Undefined`.
    pub fn set_len(&self, len: usize) -> bool {
        let old_len = {
            let mut items = self.inner.target.write();
            let old_len = items.len();
            if old_len == len {
                return false;
            }
            items.resize(len, Value::Undefined);
            old_len
        };
        self.notify(&changed_keys(old_len.min(len)..old_len.max(len), true));
        true
    }

    /// Append a value and return the new length.
    pub fn push(&self, value: impl Into<Value>) -> usize {
        let new_len = {
            let mut items = self.inner.target.write();
            items.push(value.into());
            items.len()
        };
        self.notify(&changed_keys(new_len - 1..new_len, true));
        new_len
    }

    /// Remove the last value. `Undefined` (and no notification) when empty.
    pub fn pop(&self) -> Field {
        let (value, new_len) = {
            let mut items = self.inner.target.write();
            match items.pop() {
                Some(value) => (value, items.len()),
                None => return Field::Value(Value::Undefined),
            }
        };
        self.notify(&changed_keys(new_len..new_len + 1, true));
        self.inner.scope.wrap(value)
    }

    /// Insert a value at the front and return the new length.
    pub fn unshift(&self, value: impl Into<Value>) -> usize {
        let new_len = {
            let mut items = self.inner.target.write();
            items.insert(0, value.into());
            items.len()
        };
        self.notify(&changed_keys(0..new_len, true));
        new_len
    }

    /// Remove the first value. `Undefined` (and no notification) when empty.
    pub fn shift(&self) -> Field {
        let (value, old_len) = {
            let mut items = self.inner.target.write();
            if items.is_empty() {
                return Field::Value(Value::Undefined);
            }
            let old_len = items.len();
            (items.remove(0), old_len)
        };
        self.notify(&changed_keys(0..old_len, true));
        self.inner.scope.wrap(value)
    }

    /// Remove `delete_count` values at `start`, insert `items` in their
    /// place and return the removed values.
    ///
    /// `start` and `delete_count` are clamped to the array. Removing nothing
    /// and inserting nothing is a no-op.
    pub fn splice<I, V>(&self, start: usize, delete_count: usize, items: I) -> Vec<Field>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let inserted: Vec<Value> = items.into_iter().map(Into::into).collect();
        let (removed, old_len, new_len, start) = {
            let mut target = self.inner.target.write();
            let old_len = target.len();
            let start = start.min(old_len);
            let delete_count = delete_count.min(old_len - start);
            if delete_count == 0 && inserted.is_empty() {
                return Vec::new();
            }
            let inserted_len = inserted.len();
            let removed: Vec<Value> = target
                .splice(start..start + delete_count, inserted)
                .collect();
            let new_len = target.len();
            let end = if old_len == new_len {
                start + delete_count.max(inserted_len)
            } else {
                old_len.max(new_len)
            };
            (removed, old_len, new_len, start..end)
        };

        self.notify(&changed_keys(start, old_len != new_len));
        removed
            .into_iter()
            .map(|value| self.inner.scope.wrap(value))
            .collect()
    }

    /// Sort with the default ordering: by string form, `Undefined` last.
    pub fn sort(&self) -> bool {
        self.sort_by(default_order)
    }

    /// Sort with a comparator. Stable.
    pub fn sort_by<F>(&self, mut compare: F) -> bool
    where
        F: FnMut(&Value, &Value) -> Ordering,
    {
        let len = {
            let mut items = self.inner.target.write();
            if items.len() < 2 {
                return false;
            }
            // The comparator is user code: sort a copy without the lock held,
            // so a panicking comparator leaves the array as it was.
            let mut sorted = items.clone();
            drop(items);
            sorted.sort_by(&mut compare);
            let len = sorted.len();
            *self.inner.target.write() = sorted;
            len
        };
        self.notify(&changed_keys(0..len, false));
        true
    }

    pub fn reverse(&self) -> bool {
        let len = {
            let mut items = self.inner.target.write();
            if items.len() < 2 {
                return false;
            }
            items.reverse();
            items.len()
        };
        self.notify(&changed_keys(0..len, false));
        true
    }

    /// Reset an index to `Undefined`, keeping the length.
    pub fn delete(&self, index: usize) -> bool {
        {
            let mut items = self.inner.target.write();
            match items.get_mut(index) {
                Some(slot) => *slot = Value::Undefined,
                None => return false,
            }
        }
        self.notify(&[Key::Index(index), Key::Iterate, Key::Length]);
        true
    }

    fn track_all(&self) -> Vec<Value> {
        let items = self.inner.target.read().clone();
        let id = self.id();
        self.inner.scope.track(id, Key::Length);
        self.inner.scope.track(id, Key::Iterate);
        for index in 0..items.len() {
            self.inner.scope.track(id, Key::Index(index));
        }
        items
    }

    /// Every element, wrapped. Tracks length, iteration and every index.
    pub fn to_vec(&self) -> Vec<Field> {
        self.track_all()
            .into_iter()
            .map(|value| self.inner.scope.wrap(value))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = Field> {
        self.to_vec().into_iter()
    }

    /// Position of the first element strictly equal to `needle`. NaN is
    /// never found.
    pub fn index_of(&self, needle: impl Into<Value>) -> Option<usize> {
        let needle = needle.into();
        if matches!(needle, Value::Number(n) if n.is_nan()) {
            self.track_all();
            return None;
        }
        self.track_all().iter().position(|item| *item == needle)
    }

    /// Whether any element equals `needle`. NaN finds NaN.
    pub fn includes(&self, needle: impl Into<Value>) -> bool {
        let needle = needle.into();
        self.track_all().contains(&needle)
    }

    pub fn to_raw(&self) -> Value {
        Value::Array(self.inner.target.clone())
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

fn default_order(a: &Value, b: &Value) -> Ordering {
    match (a.is_undefined(), b.is_undefined()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.to_string().cmp(&b.to_string()),
    }
}

impl From<ReactiveArray> for Value {
    fn from(array: ReactiveArray) -> Self {
        array.to_raw()
    }
}

impl fmt::Debug for ReactiveArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveArray")
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
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    fn fixture(rt: &Runtime, items: Vec<Value>) -> (ReactiveArray, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        let trigger = StoreTrigger::new(rt, move || {
            fired_clone.fetch_add(1, AtomicOrdering::SeqCst);
        });
        let field = wrap(Value::from(items), Some(trigger), rt);
        (field.as_array().cloned().expect("array"), fired)
    }

    fn numbers(array: &ReactiveArray) -> Vec<f64> {
        array.to_vec().iter().filter_map(Field::as_f64).collect()
    }

    fn watch_index(rt: &Runtime, array: &ReactiveArray, index: usize) -> Computed<Value> {
        let reader = array.clone();
        Computed::new(rt, move || reader.get(index).to_raw())
    }

    #[test]
    fn push_then_pop() {
        let rt = Runtime::new();
        let (array, fired) = fixture(&rt, vec![]);

        assert_eq!(array.push(10), 1);
        assert_eq!(array.len(), 1);
        assert_eq!(array.get(0).as_f64(), Some(10.0));
        assert_eq!(fired.load(AtomicOrdering::SeqCst), 1);

        assert_eq!(array.pop().as_f64(), Some(10.0));
        assert_eq!(array.len(), 0);
        assert!(array.get(0).is_undefined());
        assert_eq!(fired.load(AtomicOrdering::SeqCst), 2);
    }

    #[test]
    fn pop_and_shift_on_empty_are_noops() {
        let rt = Runtime::new();
        let (array, fired) = fixture(&rt, vec![]);

        assert!(array.pop().is_undefined());
        assert!(array.shift().is_undefined());
        assert_eq!(fired.load(AtomicOrdering::SeqCst), 0);
    }

    #[test]
    fn push_only_touches_the_new_index() {
        let rt = Runtime::new();
        let (array, _) = fixture(&rt, vec![1.into(), 2.into()]);
        let first = watch_index(&rt, &array, 0);
        let third = watch_index(&rt, &array, 2);

        array.push(3);
        assert!(!first.is_dirty());
        assert!(third.is_dirty());
    }

    #[test]
    fn unshift_moves_every_index() {
        let rt = Runtime::new();
        let (array, fired) = fixture(&rt, vec![1.into(), 2.into()]);
        let last = watch_index(&rt, &array, 1);

        assert_eq!(array.unshift(0), 3);
        assert!(last.is_dirty());
        assert_eq!(numbers(&array), vec![0.0, 1.0, 2.0]);
        assert_eq!(fired.load(AtomicOrdering::SeqCst), 1);
    }

    #[test]
    fn shift_moves_every_index() {
        let rt = Runtime::new();
        let (array, _) = fixture(&rt, vec![1.into(), 2.into(), 3.into()]);
        let middle = watch_index(&rt, &array, 1);

        assert_eq!(array.shift().as_f64(), Some(1.0));
        assert!(middle.is_dirty());
        assert_eq!(numbers(&array), vec![2.0, 3.0]);
    }

    #[test]
    fn splice_replaces_and_reports_removed() {
        let rt = Runtime::new();
        let (array, fired) = fixture(&rt, vec![1.into(), 2.into(), 3.into(), 4.into()]);
        let first = watch_index(&rt, &array, 0);
        let last = watch_index(&rt, &array, 3);

        let removed = array.splice(1, 2, [Value::from(9)]);
        let removed: Vec<f64> = removed.iter().filter_map(Field::as_f64).collect();
        assert_eq!(removed, vec![2.0, 3.0]);
        assert_eq!(numbers(&array), vec![1.0, 9.0, 4.0]);
        assert!(!first.is_dirty());
        assert!(last.is_dirty());
        assert_eq!(fired.load(AtomicOrdering::SeqCst), 1);
    }

    #[test]
    fn same_length_splice_only_touches_the_replaced_range() {
        let rt = Runtime::new();
        let (array, _) = fixture(&rt, vec![1.into(), 2.into(), 3.into()]);
        let last = watch_index(&rt, &array, 2);
        let reader = array.clone();
        let len = Computed::new(&rt, move || reader.len());

        array.splice(0, 1, [Value::from(7)]);
        assert!(!last.is_dirty());
        assert!(!len.is_dirty());
    }

    #[test]
    fn empty_splice_is_a_noop() {
        let rt = Runtime::new();
        let (array, fired) = fixture(&rt, vec![1.into()]);
        assert!(array.splice(5, 3, Vec::<Value>::new()).is_empty());
        assert_eq!(fired.load(AtomicOrdering::SeqCst), 0);
    }

    #[test]
    fn sort_uses_string_order_with_undefined_last() {
        let rt = Runtime::new();
        let (array, _) = fixture(
            &rt,
            vec![10.into(), Value::Undefined, 9.into(), 1.into()],
        );

        assert!(array.sort());
        let items = array.to_vec();
        assert_eq!(items[0].as_f64(), Some(1.0));
        assert_eq!(items[1].as_f64(), Some(10.0));
        assert_eq!(items[2].as_f64(), Some(9.0));
        assert!(items[3].is_undefined());
    }

    #[test]
    fn sort_by_comparator() {
        let rt = Runtime::new();
        let (array, _) = fixture(&rt, vec![3.into(), 1.into(), 2.into()]);
        array.sort_by(|a, b| {
            let (a, b) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
            b.total_cmp(&a)
        });
        assert_eq!(numbers(&array), vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn panicking_comparator_leaves_the_array_intact() {
        let rt = Runtime::new();
        let (array, fired) = fixture(&rt, vec![3.into(), 1.into(), 2.into()]);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            array.sort_by(|_, _| panic!("comparator failed"));
        }));
        assert!(result.is_err());
        assert_eq!(numbers(&array), vec![3.0, 1.0, 2.0]);
        assert_eq!(fired.load(AtomicOrdering::SeqCst), 0);
    }

    #[test]
    fn reverse_of_short_array_is_a_noop() {
        let rt = Runtime::new();
        let (array, fired) = fixture(&rt, vec![1.into()]);
        assert!(!array.reverse());
        assert!(!array.sort());
        assert_eq!(fired.load(AtomicOrdering::SeqCst), 0);

        array.push(2);
        assert!(array.reverse());
        assert_eq!(numbers(&array), vec![2.0, 1.0]);
    }

    #[test]
    fn set_past_the_end_extends() {
        let rt = Runtime::new();
        let (array, _) = fixture(&rt, vec![]);
        let reader = array.clone();
        let len = Computed::new(&rt, move || reader.len());

        assert!(array.set(2, "x"));
        assert!(len.is_dirty());
        assert_eq!(array.len(), 3);
        assert!(array.get(1).is_undefined());
        assert_eq!(array.get(2).as_str(), Some("x"));
        assert!(!array.set(2, "x"));
    }

    #[test]
    fn set_len_truncates() {
        let rt = Runtime::new();
        let (array, _) = fixture(&rt, vec![1.into(), 2.into(), 3.into()]);
        let last = watch_index(&rt, &array, 2);

        assert!(array.set_len(1));
        assert!(last.is_dirty());
        assert_eq!(numbers(&array), vec![1.0]);
        assert!(!array.set_len(1));
    }

    #[test]
    fn delete_keeps_length() {
        let rt = Runtime::new();
        let (array, _) = fixture(&rt, vec![1.into(), 2.into()]);
        assert!(array.delete(0));
        assert_eq!(array.len(), 2);
        assert!(array.get(0).is_undefined());
        assert!(!array.delete(5));
    }

    #[test]
    fn searching_tracks_every_index() {
        let rt = Runtime::new();
        let (array, _) = fixture(&rt, vec![1.into(), f64::NAN.into()]);

        let reader = array.clone();
        let has_two = Computed::new(&rt, move || reader.includes(2));
        assert!(!has_two.get().unwrap());

        array.set(0, 2);
        assert!(has_two.get().unwrap());

        assert!(array.includes(f64::NAN));
        assert_eq!(array.index_of(f64::NAN), None);
        assert_eq!(array.index_of(2), Some(0));
    }
}
