//! Scaling runs for the Collatz scanner.
//!
//! Measures how throughput moves with range size, residue reduction,
//! integer width, schedule and thread count. Pass `--json` to get the
//! measurements as one JSON array instead of tables.

use num_bigint::BigUint;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use std::time::Instant;

use collatz_core::{evaluate, Limits, Width};
use collatz_scan::{default_threads, scan, ScanConfig, ScanReport, Schedule, Sieve};

/// Base chunk index; high enough that trajectories are not trivially short.
const BASE: u128 = 1 << 32;

fn run(config: &ScanConfig) -> Option<ScanReport> {
    match scan(config) {
        Ok(report) => Some(report),
        Err(e) => {
            log::error!("scan of [{}, {}) failed: {}", config.lower, config.upper, e);
            None
        }
    }
}

fn main() {
    env_logger::init();
    let json_out = std::env::args().any(|a| a == "--json");
    let threads = default_threads();
    let mut rows: Vec<Value> = Vec::new();

    if !json_out {
        println!("================================================================");
        println!("  SCALING BENCHMARKS: Collatz range scan on {} threads", threads);
        println!("================================================================\n");
    }

    bench_reduction(threads, json_out, &mut rows);
    bench_widths(threads, json_out, &mut rows);
    bench_schedules(json_out, &mut rows);
    bench_evaluator(json_out, &mut rows);

    if json_out {
        match serde_json::to_string_pretty(&rows) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("Error: {}", e),
        }
    }
}

// ============================================================================
// Residue reduction vs unfiltered
// ============================================================================

fn bench_reduction(threads: usize, json_out: bool, rows: &mut Vec<Value>) {
    if !json_out {
        println!("  Residue reduction (64-bit, dynamic schedule):");
        println!(
            "  {:>10} {:>12} {:>12} {:>14} {:>10}",
            "chunks", "reduced_ms", "raw_ms", "reduced_c/s", "speedup"
        );
        println!("  {}", "-".repeat(62));
    }

    for span in [1_000u128, 10_000, 100_000, 1_000_000] {
        let base = ScanConfig::new(BASE, BASE + span).with_threads(threads);
        let Some(reduced) = run(&base.clone().with_sieve(Sieve::Residues)) else {
            continue;
        };
        let Some(raw) = run(&base.with_sieve(Sieve::Unfiltered)) else {
            continue;
        };
        let reduced_ms = reduced.elapsed.as_secs_f64() * 1e3;
        let raw_ms = raw.elapsed.as_secs_f64() * 1e3;
        let speedup = if reduced_ms > 0.0 { raw_ms / reduced_ms } else { f64::INFINITY };

        if json_out {
            rows.push(json!({
                "bench": "reduction",
                "chunks": span as u64,
                "reduced_ms": reduced_ms,
                "raw_ms": raw_ms,
                "speedup": speedup,
            }));
        } else {
            println!(
                "  {:>10} {:>12.1} {:>12.1} {:>14.0} {:>9.1}x",
                span,
                reduced_ms,
                raw_ms,
                reduced.throughput(),
                speedup
            );
        }
    }
    if !json_out {
        println!();
    }
}

// ============================================================================
// Integer width
// ============================================================================

fn bench_widths(threads: usize, json_out: bool, rows: &mut Vec<Value>) {
    if !json_out {
        println!("  Integer width (100000 chunks, reduced):");
        println!("  {:>10} {:>12} {:>14} {:>12}", "width", "time_ms", "cand/s", "escalations");
        println!("  {}", "-".repeat(52));
    }

    for width in [Width::U64, Width::U128, Width::Arbitrary] {
        let config = ScanConfig::new(BASE, BASE + 100_000)
            .with_threads(threads)
            .with_width(width);
        let Some(report) = run(&config) else {
            continue;
        };
        let ms = report.elapsed.as_secs_f64() * 1e3;
        if json_out {
            rows.push(json!({
                "bench": "width",
                "width": width.to_string(),
                "time_ms": ms,
                "throughput": report.throughput(),
                "escalations": report.escalations,
            }));
        } else {
            println!(
                "  {:>10} {:>12.1} {:>14.0} {:>12}",
                width.to_string(),
                ms,
                report.throughput(),
                report.escalations
            );
        }
    }
    if !json_out {
        println!();
    }
}

// ============================================================================
// Schedules and thread counts
// ============================================================================

fn bench_schedules(json_out: bool, rows: &mut Vec<Value>) {
    let max_threads = default_threads();
    let mut counts = vec![1usize];
    while counts[counts.len() - 1] * 2 <= max_threads {
        let next = counts[counts.len() - 1] * 2;
        counts.push(next);
    }
    if counts[counts.len() - 1] != max_threads {
        counts.push(max_threads);
    }

    if !json_out {
        println!("  Schedules (200000 chunks, 64-bit, reduced):");
        println!(
            "  {:>8} {:>16} {:>12} {:>14}",
            "threads", "schedule", "time_ms", "cand/s"
        );
        println!("  {}", "-".repeat(54));
    }

    let schedules = [
        Schedule::Static { block: 512 },
        Schedule::Dynamic { block: 64 },
        Schedule::Dynamic { block: 1024 },
        Schedule::Dynamic { block: 16_384 },
    ];
    for &threads in &counts {
        for schedule in schedules {
            let config = ScanConfig::new(BASE, BASE + 200_000)
                .with_threads(threads)
                .with_schedule(schedule);
            let Some(report) = run(&config) else {
                continue;
            };
            let ms = report.elapsed.as_secs_f64() * 1e3;
            if json_out {
                rows.push(json!({
                    "bench": "schedule",
                    "threads": threads,
                    "schedule": schedule.to_string(),
                    "time_ms": ms,
                    "throughput": report.throughput(),
                }));
            } else {
                println!(
                    "  {:>8} {:>16} {:>12.1} {:>14.0}",
                    threads,
                    schedule.to_string(),
                    ms,
                    report.throughput()
                );
            }
        }
    }
    if !json_out {
        println!();
    }
}

// ============================================================================
// Single-value evaluation
// ============================================================================

fn bench_evaluator(json_out: bool, rows: &mut Vec<Value>) {
    let mut rng = StdRng::seed_from_u64(12345);
    let limits = Limits::default();

    if !json_out {
        println!("  Evaluator on 100000 random odd starts per magnitude:");
        println!(
            "  {:>6} {:>12} {:>12} {:>12} {:>10}",
            "bits", "u64_ns", "u128_ns", "big_ns", "avg_steps"
        );
        println!("  {}", "-".repeat(58));
    }

    for bits in [20u32, 32, 48, 60] {
        let samples: Vec<u64> = (0..100_000)
            .map(|_| rng.gen_range(1u64 << (bits - 1)..1u64 << bits) | 1)
            .collect();

        let start = Instant::now();
        let mut steps = 0u64;
        for &n in &samples {
            steps += evaluate(&n, &limits).steps();
        }
        let narrow_ns = start.elapsed().as_nanos() as f64 / samples.len() as f64;

        let wide: Vec<u128> = samples.iter().map(|&n| n as u128).collect();
        let start = Instant::now();
        for n in &wide {
            evaluate(n, &limits);
        }
        let wide_ns = start.elapsed().as_nanos() as f64 / samples.len() as f64;

        let big: Vec<BigUint> = samples.iter().map(|&n| BigUint::from(n)).collect();
        let start = Instant::now();
        for n in &big {
            evaluate(n, &limits);
        }
        let big_ns = start.elapsed().as_nanos() as f64 / samples.len() as f64;

        let avg_steps = steps as f64 / samples.len() as f64;
        if json_out {
            rows.push(json!({
                "bench": "evaluate",
                "bits": bits,
                "u64_ns": narrow_ns,
                "u128_ns": wide_ns,
                "big_ns": big_ns,
                "avg_steps": avg_steps,
            }));
        } else {
            println!(
                "  {:>6} {:>12.1} {:>12.1} {:>12.1} {:>10.1}",
                bits, narrow_ns, wide_ns, big_ns, avg_steps
            );
        }
    }
    if !json_out {
        println!();
    }
}
