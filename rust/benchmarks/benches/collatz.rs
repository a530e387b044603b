use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use num_bigint::BigUint;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use collatz_core::{descend, evaluate, evaluate_raw, Limits, Width};
use collatz_scan::{scan, ScanConfig, Schedule, Sieve};
use residue_sieve::{derive, Expansion, Reducer};

fn odd_samples(bits: u32, count: usize) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count)
        .map(|_| rng.gen_range(1u64 << (bits - 1)..1u64 << bits) | 1)
        .collect()
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    let limits = Limits::default();

    for bits in [32u32, 60] {
        let samples = odd_samples(bits, 1_000);
        group.throughput(Throughput::Elements(samples.len() as u64));

        group.bench_with_input(BenchmarkId::new("u64", bits), &samples, |b, s| {
            b.iter(|| s.iter().map(|n| evaluate(n, &limits).steps()).sum::<u64>());
        });

        let wide: Vec<u128> = samples.iter().map(|&n| n as u128).collect();
        group.bench_with_input(BenchmarkId::new("u128", bits), &wide, |b, s| {
            b.iter(|| s.iter().map(|n| evaluate(n, &limits).steps()).sum::<u64>());
        });

        let big: Vec<BigUint> = samples.iter().map(|&n| BigUint::from(n)).collect();
        group.bench_with_input(BenchmarkId::new("arbitrary", bits), &big, |b, s| {
            b.iter(|| s.iter().map(|n| evaluate(n, &limits).steps()).sum::<u64>());
        });
    }

    group.finish();
}

fn bench_expand(c: &mut Criterion) {
    let mut group = c.benchmark_group("expand");
    let reducer = Reducer::mod_256();
    let index: u64 = 1 << 32;

    group.bench_function("expand_into_u64", |b| {
        let mut out = Expansion::default();
        b.iter(|| reducer.expand_into(&index, &mut out));
    });
    group.bench_function("expand_alloc_u64", |b| {
        b.iter(|| reducer.expand(&index));
    });
    group.bench_function("expand_into_big", |b| {
        let big = BigUint::from(u128::MAX);
        let mut out = Expansion::default();
        b.iter(|| reducer.expand_into(&big, &mut out));
    });

    group.finish();
}

/// One chunk, reduced against unfiltered, single threaded.
fn bench_chunk(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk");
    let limits = Limits::default();
    let reducer = Reducer::mod_256();
    let index: u64 = 1 << 32;

    group.bench_function("reduced", |b| {
        let mut out = Expansion::default();
        b.iter(|| {
            reducer.expand_into(&index, &mut out);
            out.candidates()
                .iter()
                .map(|cand| descend(cand.value, &cand.start, cand.pre_steps as u64, &limits).steps())
                .sum::<u64>()
        });
    });
    group.bench_function("unfiltered", |b| {
        b.iter(|| {
            (0..256u64)
                .map(|r| evaluate_raw(&(index * 256 + r), &limits).steps())
                .sum::<u64>()
        });
    });

    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan");
    group.sample_size(10);
    let base: u128 = 1 << 32;
    let span: u128 = 20_000;
    group.throughput(Throughput::Elements(span as u64));

    for (name, sieve, width) in [
        ("reduced_u64", Sieve::Residues, Width::U64),
        ("unfiltered_u64", Sieve::Unfiltered, Width::U64),
        ("reduced_u128", Sieve::Residues, Width::U128),
    ] {
        let config = ScanConfig::new(base, base + span).with_sieve(sieve).with_width(width);
        group.bench_function(name, |b| b.iter(|| scan(&config)));
    }

    for schedule in [Schedule::Static { block: 512 }, Schedule::Dynamic { block: 1024 }] {
        let config = ScanConfig::new(base, base + span).with_schedule(schedule);
        group.bench_function(schedule.to_string(), |b| b.iter(|| scan(&config)));
    }

    group.finish();
}

fn bench_derive(c: &mut Criterion) {
    let mut group = c.benchmark_group("derive");
    for bits in [8u32, 12, 16] {
        group.bench_with_input(BenchmarkId::from_parameter(bits), &bits, |b, &k| {
            b.iter(|| derive(k));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_evaluate, bench_expand, bench_chunk, bench_scan, bench_derive);
criterion_main!(benches);
