//! Benchmarks for entry-table dispatch.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::alloc::{GlobalAlloc, Layout, System};

use allocswap::{CountingManager, EntryTable, ReplacementManager};

fn bench_dispatch(c: &mut Criterion) {
    let original: &'static EntryTable = Box::leak(Box::new(EntryTable::system()));
    let substituted: &'static EntryTable = Box::leak(Box::new(EntryTable::system()));
    let manager: &'static CountingManager = Box::leak(Box::new(CountingManager::new("counting")));
    manager.initialize();
    manager.install(substituted).unwrap();

    let mut group = c.benchmark_group("alloc_dealloc");

    for size in [16usize, 256, 4096] {
        let layout = Layout::from_size_align(size, 8).unwrap();

        group.bench_with_input(BenchmarkId::new("system", size), &layout, |b, layout| {
            b.iter(|| unsafe {
                let ptr = System.alloc(*layout);
                System.dealloc(black_box(ptr), *layout);
            })
        });

        group.bench_with_input(BenchmarkId::new("table_original", size), &layout, |b, layout| {
            b.iter(|| unsafe {
                let ptr = original.alloc(*layout);
                original.dealloc(black_box(ptr), *layout);
            })
        });

        group.bench_with_input(BenchmarkId::new("table_substituted", size), &layout, |b, layout| {
            b.iter(|| unsafe {
                let ptr = substituted.alloc(*layout);
                substituted.dealloc(black_box(ptr), *layout);
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
