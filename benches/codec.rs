//! Encode/decode throughput, with and without the decode caches.
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rmpk::{decode_with, encode, IntCache, Registry, StringCache, Value};

fn sample_map() -> Value {
    Value::Map(
        (0..32)
            .map(|i| (Value::from(format!("field_{i}")), Value::from(i as i64)))
            .collect(),
    )
}

fn bench_encode(c: &mut Criterion) {
    let value = sample_map();
    c.bench_function("encode_map_32_fields", |b| {
        b.iter(|| black_box(encode(black_box(&value)).unwrap()))
    });
}

fn bench_decode_cold_caches(c: &mut Criterion) {
    let value = sample_map();
    let bytes = encode(&value).unwrap();
    let registry = Registry::new();

    c.bench_function("decode_map_32_fields_cold_caches", |b| {
        b.iter(|| {
            let strings = StringCache::with_default_size();
            let ints = IntCache::new();
            black_box(decode_with(black_box(&bytes), &registry, false, &strings, &ints).unwrap())
        })
    });
}

fn bench_decode_warm_caches(c: &mut Criterion) {
    let value = sample_map();
    let bytes = encode(&value).unwrap();
    let registry = Registry::new();
    let strings = StringCache::with_default_size();
    let ints = IntCache::new();
    // Warm the caches with one pass before timing.
    decode_with(&bytes, &registry, false, &strings, &ints).unwrap();

    c.bench_function("decode_map_32_fields_warm_caches", |b| {
        b.iter(|| black_box(decode_with(black_box(&bytes), &registry, false, &strings, &ints).unwrap()))
    });
}

criterion_group!(benches, bench_encode, bench_decode_cold_caches, bench_decode_warm_caches);
criterion_main!(benches);
