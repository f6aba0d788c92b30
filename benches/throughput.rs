//! Throughput benchmarks for the cache handler.
//!
//! Benchmarks:
//! - Entry encode/decode at several payload sizes
//! - Header-only expiration reads (the reaper's scan path)
//! - Batched lookups through the redb handler
//! - Full reaper sweeps
//!
//! Run with:
//! ```bash
//! cargo bench --bench throughput
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;

use tempfile::TempDir;
use ttlcache::config::StoreConfig;
use ttlcache::store::entry::{Entry, decode_expiration};
use ttlcache::store::{CacheHandler, GetRequest, RedbHandler, SetRequest, expiry, sweep};

fn codec_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    for size in [0usize, 100, 4096, 65536] {
        let entry = Entry::new(expiry::now(), 7, vec![0xAB; size]);
        let buf = entry.encode();
        group.throughput(Throughput::Bytes(buf.len() as u64));

        group.bench_with_input(BenchmarkId::new("encode", size), &entry, |b, entry| {
            b.iter(|| black_box(entry.encode()));
        });
        group.bench_with_input(BenchmarkId::new("decode", size), &buf, |b, buf| {
            b.iter(|| black_box(Entry::decode(buf).unwrap()));
        });
        group.bench_with_input(
            BenchmarkId::new("decode_expiration", size),
            &buf,
            |b, buf| {
                b.iter(|| black_box(decode_expiration(buf).unwrap()));
            },
        );
    }

    group.finish();
}

fn handler_benchmarks(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let tmp = TempDir::new().unwrap();
    let handler = rt.block_on(async {
        let handler = RedbHandler::open(&StoreConfig::new(tmp.path(), 1 << 30))
            .await
            .unwrap();
        handler.shutdown().await;
        for i in 0..1000 {
            handler
                .set(SetRequest::new(format!("key{i}"), vec![0u8; 256]).with_ttl(3600))
                .await
                .unwrap();
        }
        handler
    });

    let mut group = c.benchmark_group("handler");
    group.measurement_time(Duration::from_secs(5));

    for batch in [1usize, 16, 128] {
        let keys: Vec<String> = (0..batch).map(|i| format!("key{}", i * 7 % 1000)).collect();
        group.throughput(Throughput::Elements(batch as u64));
        group.bench_with_input(BenchmarkId::new("get_batch", batch), &keys, |b, keys| {
            b.iter(|| {
                rt.block_on(async {
                    let results = handler
                        .get(GetRequest::new(keys.clone()))
                        .collect()
                        .await
                        .unwrap();
                    black_box(results)
                })
            });
        });
    }

    group.sample_size(20);
    group.bench_function("sweep_1000_live", |b| {
        b.iter(|| black_box(sweep(handler.engine(), expiry::now).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, codec_benchmarks, handler_benchmarks);
criterion_main!(benches);
