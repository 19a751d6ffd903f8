//! # Algebra Benchmarks
//!
//! Performance benchmarks for measure interning and unit conversion.
//!
//! Run with: `cargo bench -p measure-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use measure_core::{Commons, Measure, MeasureRegistry};
use std::hint::black_box;

/// Create `count` basic measures with a single unit each.
fn create_primitives(registry: &MeasureRegistry, count: usize) -> Vec<Measure> {
    (0..count)
        .map(|i| {
            registry
                .basic_with(format!("dimension_{i}"), [(format!("unit_{i}"), 1.0)])
                .expect("primitive")
        })
        .collect()
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_interning(c: &mut Criterion) {
    let mut group = c.benchmark_group("interning");

    for size in [2, 8, 32].iter() {
        let registry = MeasureRegistry::new();
        let primitives = create_primitives(&registry, *size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let product = primitives
                    .iter()
                    .enumerate()
                    .try_fold(Measure::Scalar, |acc, (i, m)| {
                        acc.mul(&m.pow(if i % 2 == 0 { 1 } else { -2 })?)
                    })
                    .expect("product");
                black_box(product)
            });
        });
    }

    group.finish();
}

fn bench_conversion(c: &mut Criterion) {
    let commons = Commons::new(&MeasureRegistry::new()).expect("commons");
    let speed = commons.distance.div(&commons.duration).expect("speed");
    let mut group = c.benchmark_group("conversion");

    group.bench_function("basic_lookup", |b| {
        let run = commons.distance.parse("42.195 km").expect("run");
        b.iter(|| black_box(run.get(black_box("mile")).expect("mile")));
    });

    group.bench_function("composite_lookup", |b| {
        let walk = speed.parse("5 km/hour").expect("walk");
        b.iter(|| black_box(walk.get(black_box("foot/s")).expect("foot/s")));
    });

    group.bench_function("ladder_lookup", |b| {
        let absolute = commons.temperature.absolute();
        let room = absolute.parse("25 C").expect("room");
        b.iter(|| black_box(room.get(black_box("F")).expect("F")));
    });

    group.finish();
}

fn bench_live_reads(c: &mut Criterion) {
    let registry = MeasureRegistry::new();
    let currency = registry
        .dynamic_with("currency", [("gold", 1.0), ("toy", 0.01), ("pog", 2.0)])
        .expect("currency");
    let weight = registry.basic_with("weight", [("kg", 1.0)]).expect("weight");
    let price = currency
        .parse("4 pog")
        .and_then(|p| p.div(&weight.unit("kg")?))
        .expect("price");

    c.bench_function("live_reads", |b| {
        b.iter(|| black_box(price.get(black_box("toy/kg")).expect("toy/kg")));
    });
}

criterion_group!(benches, bench_interning, bench_conversion, bench_live_reads);
criterion_main!(benches);
