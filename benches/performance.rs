//! Performance benchmarks for diffing, cloning and store commits.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use frozen_state::{
    compare, count_changes, deep_clone, freeze, FileStorage, ListStore, Projection,
    StorageBackend, StorageOptions, Store, StoreOptions, StoreRegistry, Value,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// List of `size` records shaped like typical UI state.
fn records(size: usize) -> Value {
    Value::array((0..size).map(|i| {
        Value::object([
            ("id", Value::from(i)),
            ("title", Value::from(format!("record {}", i))),
            ("created", Value::date_millis(1_700_000_000_000 + i as i64)),
            (
                "tags",
                Value::array([Value::from("a"), Value::from("b")]),
            ),
        ])
    }))
}

/// Benchmark deep equality on equal but unshared trees
fn bench_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("compare");

    for size in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("records", size), &size, |b, &size| {
            let left = records(size);
            let right = deep_clone(&left);
            b.iter(|| black_box(compare(&left, &right)));
        });
    }

    group.finish();
}

/// Benchmark change counting with one edited record
fn bench_count_changes(c: &mut Criterion) {
    let mut group = c.benchmark_group("count_changes");

    for size in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("records", size), &size, |b, &size| {
            let left = records(size);
            let mut right = deep_clone(&left);
            if let Ok(Some(last)) = right.index_mut(size - 1) {
                let _ = last.set_field("title", Value::from("edited"));
            }
            b.iter(|| black_box(count_changes(&left, &right)));
        });
    }

    group.finish();
}

/// Benchmark clone-then-freeze, the work done on every commit
fn bench_clone_freeze(c: &mut Criterion) {
    let mut group = c.benchmark_group("clone_freeze");

    for size in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("records", size), &size, |b, &size| {
            let value = records(size);
            b.iter(|| black_box(freeze(&deep_clone(&value))));
        });
    }

    group.finish();
}

/// Benchmark a full commit with one active subscriber
fn bench_store_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_commit");

    for size in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("records", size), &size, |b, &size| {
            let registry = StoreRegistry::new();
            let store = Store::new(&registry, StoreOptions::new("bench"), records(size)).unwrap();
            let _sub = store
                .select(Projection::Identity)
                .subscribe(|v| {
                    black_box(v);
                });

            let mut toggle = false;
            b.iter(|| {
                toggle = !toggle;
                store
                    .update(Value::object([("flag", Value::from(toggle))]))
                    .unwrap();
            });
        });
    }

    group.finish();
}

/// Benchmark list appends with id checking
fn bench_list_append(c: &mut Criterion) {
    c.bench_function("list_append_1000", |b| {
        b.iter(|| {
            let registry = StoreRegistry::new();
            let list = ListStore::with_id_key(
                &registry,
                StoreOptions::new("items"),
                Value::array(Vec::new()),
                "id",
            )
            .unwrap();
            for i in 0..1000usize {
                list.append(vec![Value::object([("id", Value::from(i))])])
                    .unwrap();
            }
            black_box(list.items().len());
        });
    });
}

/// Benchmark persisted writes through the file backend
fn bench_file_storage(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_storage");

    group.bench_function("set_item", |b| {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path(), 100).unwrap();
        let payload = records(100).to_json_string().unwrap();

        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            storage.set_item(&format!("key{}", i % 50), &payload).unwrap();
        });
    });

    group.bench_function("debounced_store", |b| {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(FileStorage::new(dir.path(), 100).unwrap());
        let registry = StoreRegistry::new();
        let options = StoreOptions::new("persisted").with_storage(
            StorageOptions::custom(storage).with_debounce(Duration::from_millis(5)),
        );
        let store = Store::new(&registry, options, Value::from(0)).unwrap();

        let mut i = 0i64;
        b.iter(|| {
            i += 1;
            store.set(Value::from(i)).unwrap();
        });
        store.flush_storage();
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_compare,
    bench_count_changes,
    bench_clone_freeze,
    bench_store_commit,
    bench_list_append,
    bench_file_storage,
);

criterion_main!(benches);
