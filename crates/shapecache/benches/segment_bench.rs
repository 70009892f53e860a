//! Segmented shaping through the cache versus shaping every run whole
//!
//! Text that repeats words is where the cache earns its keep; the cold
//! benchmark shows what a first pass over unseen text costs on top of plain
//! shaping.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use shapecache::{shape_uncached, CacheStore};
use shapecache_core::{types::FeatureValues, ArenaRun, CacheConfig, StaticCharMap};
use shapecache_shape_basic::BasicEngine;

fn charmap() -> StaticCharMap {
    let mut map = StaticCharMap::identity(0x20..0x7F);
    map.insert(0x0301, 0x0301);
    map.insert(0xFB01, 0xFB01);
    map.insert(0xFB02, 0xFB02);
    map
}

fn bench_shaping(c: &mut Criterion) {
    let map = charmap();
    let engine = BasicEngine::new(&map);
    let features = FeatureValues::default();
    let text = "The quick brown fox jumps over the lazy dog. ".repeat(20);

    c.bench_function("shape_uncached", |b| {
        b.iter(|| {
            let mut run = ArenaRun::from_text(black_box(&text), &map, 1);
            shape_uncached(&engine, &mut run).unwrap();
            run
        })
    });

    c.bench_function("shape_cached_warm", |b| {
        let mut store = CacheStore::new(CacheConfig::default(), &map, &[&engine]).unwrap();
        let mut warmup = ArenaRun::from_text(&text, &map, 1);
        store.shape(0, &features, &engine, &mut warmup).unwrap();

        b.iter(|| {
            let mut run = ArenaRun::from_text(black_box(&text), &map, 1);
            store.shape(0, &features, &engine, &mut run).unwrap();
            run
        })
    });

    c.bench_function("shape_cached_cold", |b| {
        b.iter(|| {
            let mut store = CacheStore::new(CacheConfig::default(), &map, &[&engine]).unwrap();
            let mut run = ArenaRun::from_text(black_box(&text), &map, 1);
            store.shape(0, &features, &engine, &mut run).unwrap();
            run
        })
    });
}

fn bench_table_pressure(c: &mut Criterion) {
    let map = charmap();
    let engine = BasicEngine::new(&map);
    let features = FeatureValues::default();
    let words: Vec<String> = (0..400).map(|i| format!("w{i:03} ")).collect();
    let text = words.concat();

    // 400 distinct words through a 64-entry bucket: constant eviction
    c.bench_function("shape_cached_evicting", |b| {
        let config = CacheConfig::default().with_max_segments(64);
        let mut store = CacheStore::new(config, &map, &[&engine]).unwrap();
        b.iter(|| {
            let mut run = ArenaRun::from_text(black_box(&text), &map, 1);
            store.shape(0, &features, &engine, &mut run).unwrap();
            run
        })
    });
}

criterion_group!(benches, bench_shaping, bench_table_pressure);
criterion_main!(benches);
