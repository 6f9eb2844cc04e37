//! Performance benchmarks for masterdata-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use masterdata_engine::{
    fields_from_value, merge, BaseDataset, ChangeLog, Fields, Record, SequentialIds, Store,
};
use serde_json::json;

fn fields(name: String) -> Fields {
    fields_from_value(json!({ "name": name })).unwrap_or_default()
}

fn create_base(size: usize) -> BaseDataset {
    let records = (0..size)
        .map(|i| Record::new(format!("S{}", i), fields(format!("Supplier {}", i))))
        .collect();
    BaseDataset::new().with_category("SUPPLIERS", records)
}

/// A change log touching roughly a tenth of the base in each overlay.
fn create_changes(size: usize) -> ChangeLog {
    let mut changes = ChangeLog::new();
    for i in (0..size).step_by(10) {
        changes.update("SUPPLIERS", &format!("S{}", i), fields(format!("Renamed {}", i)));
        changes.delete("SUPPLIERS", &format!("S{}", i + 1));
        changes.add(
            "SUPPLIERS",
            Record::new(format!("n{}", i), fields(format!("New {}", i))),
        );
    }
    changes
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");

    for size in [100, 1_000, 10_000].iter() {
        let base = create_base(*size);
        let changes = create_changes(*size);
        group.bench_with_input(BenchmarkId::new("merge", size), size, |b, _| {
            b.iter(|| merge(black_box(&base), black_box(&changes)))
        });
    }

    group.finish();
}

fn bench_store_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_operations");

    // Every mutation re-merges its category, so cost tracks category size
    for size in [100, 1_000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::new("add", size), size, |b, &size| {
            let mut store =
                Store::with_id_generator(create_base(size), Box::new(SequentialIds::new("n")));
            b.iter(|| store.add(black_box("SUPPLIERS"), fields("Bench".to_string())))
        });

        group.bench_with_input(BenchmarkId::new("update", size), size, |b, &size| {
            let mut store = Store::new(create_base(size));
            b.iter(|| {
                store.update(
                    black_box("SUPPLIERS"),
                    black_box("S0"),
                    fields("Bench".to_string()),
                )
            })
        });
    }

    // Mutating a small category must not pay for the large one
    for size in [100, 1_000, 10_000].iter() {
        group.bench_with_input(
            BenchmarkId::new("add_beside_large_category", size),
            size,
            |b, &size| {
                let base = create_base(size).with_category(
                    "PACKING",
                    vec![Record::new("P0", fields("Crate".to_string()))],
                );
                let mut store = Store::with_id_generator(base, Box::new(SequentialIds::new("n")));
                b.iter(|| store.add(black_box("PACKING"), fields("Bench".to_string())))
            },
        );
    }

    group.bench_function("get_by_category", |b| {
        let mut store = Store::new(create_base(1_000));
        store.replace_changes(create_changes(1_000));
        b.iter(|| store.get_by_category(black_box("SUPPLIERS")).len())
    });

    group.finish();
}

fn bench_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialization");

    let changes = create_changes(10_000);
    let json = changes.to_json().unwrap_or_default();

    group.bench_function("change_log_to_json", |b| {
        b.iter(|| black_box(&changes).to_json())
    });

    group.bench_function("change_log_from_json", |b| {
        b.iter(|| ChangeLog::from_json(black_box(&json)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_merge,
    bench_store_operations,
    bench_serialization,
);
criterion_main!(benches);
