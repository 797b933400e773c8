use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tempfile::tempdir;

use burrow::{Direction, Options, Store, SyncPolicy};

fn bench_options() -> Options {
    // Per-write fsync would benchmark the disk, not the engine.
    Options {
        sync_policy: SyncPolicy::Never,
        ..Options::default()
    }
}

fn put_benchmark(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let mut store = Store::open_with(dir.path(), bench_options()).unwrap();
    let value = vec![0xABu8; 100];
    let mut i = 0u64;

    c.bench_function("put_100b_value", |b| {
        b.iter(|| {
            let key = format!("key_{:012}", i);
            i += 1;
            store.put(key.as_bytes(), black_box(&value)).unwrap();
        })
    });
}

fn get_benchmark(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let mut store = Store::open_with(dir.path(), bench_options()).unwrap();
    for i in 0..10_000u64 {
        let key = format!("key_{:012}", i);
        let val = format!("val_{:012}", i);
        store.put(key.as_bytes(), val.as_bytes()).unwrap();
    }

    let mut i = 0u64;
    c.bench_function("get_hot", |b| {
        b.iter(|| {
            let key = format!("key_{:012}", i % 10_000);
            i += 7;
            black_box(store.get(key.as_bytes()).unwrap());
        })
    });
}

fn scan_benchmark(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let mut store = Store::open_with(dir.path(), bench_options()).unwrap();
    for i in 0..10_000u64 {
        let key = format!("key_{:012}", i);
        store.put(key.as_bytes(), b"value").unwrap();
    }

    c.bench_function("scan_10k_ascending", |b| {
        b.iter(|| {
            let count = store
                .cursor(Direction::Ascending, None)
                .unwrap()
                .count();
            black_box(count);
        })
    });
}

criterion_group!(benches, put_benchmark, get_benchmark, scan_benchmark);
criterion_main!(benches);
