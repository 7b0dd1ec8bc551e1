//! Benchmarks for tether-core
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tether_core::reactive::{Computed, Effect, Ref};
use tether_core::store::OptionsStore;
use tether_core::{Runtime, Value};

// =============================================================================
// REF / COMPUTED
// =============================================================================

fn bench_ref_set(c: &mut Criterion) {
    let rt = Runtime::new();
    let cell = Ref::new(&rt, 0i64);
    let mut n = 0i64;
    c.bench_function("ref_set", |b| {
        b.iter(|| {
            n += 1;
            cell.set(black_box(n))
        })
    });
}

fn bench_computed_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("computed_chain");
    for depth in [1usize, 10, 100] {
        let rt = Runtime::new();
        let source = Ref::new(&rt, 0i64);
        let mut tail = {
            let s = source.clone();
            Computed::new(&rt, move || s.get())
        };
        for _ in 1..depth {
            let prev = tail.clone();
            tail = Computed::fallible(&rt, move || Ok(prev.get()? + 1));
        }

        let mut n = 0i64;
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| {
                n += 1;
                source.set(n);
                black_box(tail.get().ok())
            })
        });
    }
    group.finish();
}

fn bench_effect_fanout(c: &mut Criterion) {
    let rt = Runtime::new();
    let source = Ref::new(&rt, 0i64);
    let _effects: Vec<Effect> = (0..100)
        .map(|_| {
            let s = source.clone();
            Effect::new(&rt, move || {
                black_box(s.get());
            })
        })
        .collect();

    let mut n = 0i64;
    c.bench_function("effect_fanout_100", |b| {
        b.iter(|| {
            n += 1;
            source.set(n)
        })
    });
}

// =============================================================================
// WRAPPERS / STORES
// =============================================================================

fn bench_wrapped_array_push(c: &mut Criterion) {
    let rt = Runtime::new();
    c.bench_function("wrapped_array_push_100", |b| {
        b.iter(|| {
            let items = rt.reactive(Value::array_from(Vec::<Value>::new()));
            if let Some(items) = items.as_array() {
                for i in 0..100 {
                    items.push(i);
                }
            }
        })
    });
}

fn bench_store_write(c: &mut Criterion) {
    let rt = Runtime::new();
    let definition = OptionsStore::new()
        .state(|| Value::object_from([("count", 0)]))
        .getter("double", |s| {
            Ok(Value::from(s.get("count").as_f64().unwrap_or(0.0) * 2.0))
        });
    let accessor = futures_util::FutureExt::now_or_never(rt.define_store("counter", definition))
        .expect("store creation does not suspend without hooks")
        .expect("valid definition");
    let store = accessor.store();

    let mut n = 0i64;
    c.bench_function("store_write_and_getter", |b| {
        b.iter(|| {
            n += 1;
            store.set("count", n).ok();
            black_box(store.getter("double").ok())
        })
    });
}

criterion_group!(
    benches,
    bench_ref_set,
    bench_computed_chain,
    bench_effect_fanout,
    bench_wrapped_array_push,
    bench_store_write,
);
criterion_main!(benches);
