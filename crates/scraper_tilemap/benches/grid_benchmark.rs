//! Benchmarks for the per-tick hot path: tile queries, collision and
//! chunk runs.
//!
//! Run with: cargo bench --package scraper_tilemap --bench grid_benchmark

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use scraper_tilemap::{
    resolve, Body, ChunkGenerator, GridConfig, MotionFlags, TemplateLibrary, Tileset, WorldGrid,
};

fn grid() -> WorldGrid {
    let library = Arc::new(TemplateLibrary::builtin(8).expect("bundled templates"));
    let generator = Arc::new(ChunkGenerator::new(library, "Clouds", 42));
    generator.set_workload(100).expect("workload");
    while generator.run().expect("run").remaining > 0 {}
    WorldGrid::new(GridConfig::default(), Tileset::default(), generator).expect("grid")
}

fn benchmark_query_tile_type(c: &mut Criterion) {
    let grid = grid();
    let cols = grid.len() as i32;

    c.bench_function("query_tile_type", |b| {
        let mut col = 0i32;
        b.iter(|| {
            col = (col + 1) % cols;
            black_box(grid.query_tile_type(black_box(7), black_box(col)))
        });
    });
}

fn benchmark_resolve(c: &mut Criterion) {
    let grid = grid();

    c.bench_function("resolve_grounded_runner", |b| {
        let mut x = 100.0;
        b.iter(|| {
            x += 3.0;
            if x > 10_000.0 {
                x = 100.0;
            }
            let body = Body {
                x,
                y: 195.0,
                dx: 3.0,
                dy: 0.15,
                width: 30,
                height: 30,
                flags: MotionFlags::default(),
            };
            black_box(resolve(black_box(&body), &grid))
        });
    });
}

fn benchmark_visible_tiles(c: &mut Criterion) {
    let grid = grid();

    c.bench_function("visible_tiles_frame", |b| {
        b.iter(|| black_box(grid.visible_tiles().count()));
    });
}

fn benchmark_chunk_runs(c: &mut Criterion) {
    let library = Arc::new(TemplateLibrary::builtin(8).expect("bundled templates"));

    let mut group = c.benchmark_group("chunk_runs");
    group.throughput(Throughput::Elements(100));
    group.bench_function("workload_100", |b| {
        b.iter(|| {
            let generator = ChunkGenerator::new(Arc::clone(&library), "Rain", 7);
            generator.set_workload(100).expect("workload");
            while generator.run().expect("run").remaining > 0 {}
            black_box(generator.columns().len())
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_query_tile_type,
    benchmark_resolve,
    benchmark_visible_tiles,
    benchmark_chunk_runs
);
criterion_main!(benches);
