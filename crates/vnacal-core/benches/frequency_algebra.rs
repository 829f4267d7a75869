//! Benchmarks for frequency algebra and crossover splitting
//!
//! Sweeps of typical VNA sizes against two overlapping ECal ranges.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vnacal_core::frequency::{Frequency, FrequencyUnit, SplitSide, SweepType};
use vnacal_core::CoverageCrossoverPolicy;

fn sweep(npoints: usize) -> Frequency {
    Frequency::new(0.05, 20.0, npoints, FrequencyUnit::GHz, SweepType::Linear).unwrap()
}

fn bench_set_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_operations");
    let ecal = Frequency::new(1.0, 26.5, 256, FrequencyUnit::GHz, SweepType::Linear).unwrap();

    for npoints in [201, 1601, 10001].iter() {
        let measured = sweep(*npoints);

        group.bench_with_input(BenchmarkId::new("intersection", npoints), npoints, |b, _| {
            b.iter(|| black_box(measured.intersection(&ecal)))
        });
        group.bench_with_input(BenchmarkId::new("union", npoints), npoints, |b, _| {
            b.iter(|| black_box(measured.union(&ecal)))
        });
        group.bench_with_input(BenchmarkId::new("split", npoints), npoints, |b, _| {
            b.iter(|| black_box(measured.split(5e9, SplitSide::Low)))
        });
    }

    group.finish();
}

fn bench_crossover_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("crossover_split");
    let low = Frequency::new(0.03, 9.0, 256, FrequencyUnit::GHz, SweepType::Linear).unwrap();
    let high = Frequency::new(1.0, 26.5, 256, FrequencyUnit::GHz, SweepType::Linear).unwrap();
    let policy = CoverageCrossoverPolicy::default();

    for npoints in [201, 1601, 10001].iter() {
        let measured = sweep(*npoints);
        group.bench_with_input(BenchmarkId::from_parameter(npoints), npoints, |b, _| {
            b.iter(|| black_box(policy.split_between_sources(&measured, &low, &high, false)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_set_operations, bench_crossover_split);
criterion_main!(benches);
