//! Property tests: wrapper identity, equal-write suppression, array
//! operations against a `Vec` model, computed caching.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use proptest::prelude::*;

use tether_core::reactive::{Computed, Ref, StoreTrigger};
use tether_core::wrap::wrap;
use tether_core::{Runtime, Value};

#[derive(Debug, Clone)]
enum ArrayOp {
    Push(i32),
    Pop,
    Unshift(i32),
    Shift,
    Set(usize, i32),
    Splice(usize, usize, Vec<i32>),
    Reverse,
}

fn array_op() -> impl Strategy<Value = ArrayOp> {
    prop_oneof![
        any::<i32>().prop_map(ArrayOp::Push),
        Just(ArrayOp::Pop),
        any::<i32>().prop_map(ArrayOp::Unshift),
        Just(ArrayOp::Shift),
        (0usize..12, any::<i32>()).prop_map(|(i, v)| ArrayOp::Set(i, v)),
        (0usize..12, 0usize..4, prop::collection::vec(any::<i32>(), 0..3))
            .prop_map(|(s, d, items)| ArrayOp::Splice(s, d, items)),
        Just(ArrayOp::Reverse),
    ]
}

/// Apply `op` to the model. Returns whether the model changed.
fn apply_model(model: &mut Vec<Option<i32>>, op: &ArrayOp) -> bool {
    match op {
        ArrayOp::Push(v) => {
            model.push(Some(*v));
            true
        }
        ArrayOp::Pop => model.pop().is_some(),
        ArrayOp::Unshift(v) => {
            model.insert(0, Some(*v));
            true
        }
        ArrayOp::Shift => {
            if model.is_empty() {
                false
            } else {
                model.remove(0);
                true
            }
        }
        ArrayOp::Set(i, v) => {
            if *i < model.len() {
                if model[*i] == Some(*v) {
                    return false;
                }
                model[*i] = Some(*v);
            } else {
                model.resize(*i, None);
                model.push(Some(*v));
            }
            true
        }
        ArrayOp::Splice(start, delete, items) => {
            let start = (*start).min(model.len());
            let delete = (*delete).min(model.len() - start);
            if delete == 0 && items.is_empty() {
                return false;
            }
            model.splice(start..start + delete, items.iter().map(|v| Some(*v)));
            true
        }
        ArrayOp::Reverse => {
            if model.len() < 2 {
                return false;
            }
            model.reverse();
            true
        }
    }
}

fn model_as_values(model: &[Option<i32>]) -> Vec<Value> {
    model
        .iter()
        .map(|v| v.map_or(Value::Undefined, Value::from))
        .collect()
}

proptest! {
    #[test]
    fn wrapping_is_referentially_stable(depth in 0usize..4, width in 1usize..4) {
        let rt = Runtime::new();
        let mut value = Value::from(1);
        for _ in 0..depth {
            value = Value::object_from((0..width).map(|i| (format!("k{i}"), value.clone())));
        }

        let a = rt.reactive(value.clone());
        let b = rt.reactive(value);
        match (a.as_reactive(), b.as_reactive()) {
            (Some(a), Some(b)) => prop_assert!(a.ptr_eq(b)),
            (None, None) => prop_assert_eq!(depth, 0),
            _ => prop_assert!(false, "wrapping disagreed"),
        }
    }

    #[test]
    fn writing_the_current_value_never_notifies(x in any::<f64>()) {
        let rt = Runtime::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let cell = Ref::new(&rt, Value::from(x));

        let calls_clone = calls.clone();
        let _subscription = cell.subscribe(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        prop_assert!(!cell.set(Value::from(x)));
        prop_assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn array_operations_follow_the_vec_model(
        initial in prop::collection::vec(any::<i32>(), 0..6),
        ops in prop::collection::vec(array_op(), 0..24),
    ) {
        let rt = Runtime::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        let trigger = StoreTrigger::new(&rt, move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        let array = wrap(Value::array_from(initial.iter().copied()), Some(trigger), &rt);
        let array = array.as_array().cloned().expect("array");
        let mut model: Vec<Option<i32>> = initial.into_iter().map(Some).collect();
        let mut changes = 0;

        for op in &ops {
            if apply_model(&mut model, op) {
                changes += 1;
            }
            match op {
                ArrayOp::Push(v) => { array.push(*v); }
                ArrayOp::Pop => { array.pop(); }
                ArrayOp::Unshift(v) => { array.unshift(*v); }
                ArrayOp::Shift => { array.shift(); }
                ArrayOp::Set(i, v) => { array.set(*i, *v); }
                ArrayOp::Splice(s, d, items) => {
                    array.splice(*s, *d, items.iter().copied());
                }
                ArrayOp::Reverse => { array.reverse(); }
            }
        }

        let raw: Vec<Value> = array.to_vec().into_iter().map(Value::from).collect();
        prop_assert_eq!(raw, model_as_values(&model));
        prop_assert_eq!(fired.load(Ordering::SeqCst), changes);
    }

    #[test]
    fn computed_runs_once_per_observed_change(writes in prop::collection::vec(0i32..3, 1..20)) {
        let rt = Runtime::new();
        let source = Ref::new(&rt, 0);
        let calls = Arc::new(AtomicUsize::new(0));

        let (reader, calls_clone) = (source.clone(), calls.clone());
        let computed = Computed::new(&rt, move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            reader.get()
        });

        let mut expected = 1;
        for w in writes {
            let changed = source.set(w);
            // Several reads per write; only the first may recompute
            for _ in 0..3 {
                prop_assert_eq!(computed.get().unwrap(), w);
            }
            if changed {
                expected += 1;
            }
            prop_assert_eq!(calls.load(Ordering::SeqCst), expected);
        }
    }
}
