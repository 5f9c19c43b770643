//! Performance benchmarks for finance-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use finance_engine::{
    AccountChanges, CacheKeys, MemoryCache, MemoryPrimaryStore, MemorySearchIndex, NewAccount,
    Synchronizer,
};
use std::sync::Arc;
use tokio::runtime::Runtime;

fn populated(rt: &Runtime, count: u64) -> (Synchronizer, Arc<MemoryCache>) {
    let cache = Arc::new(MemoryCache::new());
    let sync = Synchronizer::builder(
        Arc::new(MemoryPrimaryStore::new()),
        cache.clone(),
        Arc::new(MemorySearchIndex::new()),
    )
    .build();

    rt.block_on(async {
        for i in 0..count {
            let _ = sync
                .create_account(NewAccount::new(format!("User {}", i), i as f64))
                .await;
        }
    });

    (sync, cache)
}

fn bench_keys(c: &mut Criterion) {
    let keys = CacheKeys::default();
    c.bench_function("account_key", |b| b.iter(|| keys.account(black_box(123_456))));
}

fn bench_reads(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("reads");

    // Every account was cached on create
    group.bench_function("get_account_hit", |b| {
        let (sync, _) = populated(&rt, 1000);
        let sync = &sync;
        b.to_async(&rt)
            .iter(|| async move { sync.get_account(black_box(500)).await })
    });

    group.bench_function("get_account_miss", |b| {
        let (sync, cache) = populated(&rt, 1000);
        cache.set_offline(true);
        let sync = &sync;
        b.to_async(&rt)
            .iter(|| async move { sync.get_account(black_box(500)).await })
    });

    for size in [10u64, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("get_all_miss", size), size, |b, &size| {
            let (sync, cache) = populated(&rt, size);
            cache.set_offline(true);
            let sync = &sync;
            b.to_async(&rt)
                .iter(|| async move { sync.get_all_accounts().await })
        });
    }

    group.finish();
}

fn bench_writes(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("writes");

    group.bench_function("create_account", |b| {
        let (sync, _) = populated(&rt, 0);
        let sync = &sync;
        b.to_async(&rt).iter(|| async move {
            sync.create_account(black_box(NewAccount::new("Alice", 100.0)))
                .await
        })
    });

    group.bench_function("update_account", |b| {
        let (sync, _) = populated(&rt, 100);
        let sync = &sync;
        b.to_async(&rt).iter(|| async move {
            sync.update_account(black_box(50), AccountChanges::new("Alice Smith", 150.0))
                .await
        })
    });

    group.finish();
}

criterion_group!(benches, bench_keys, bench_reads, bench_writes);
criterion_main!(benches);
