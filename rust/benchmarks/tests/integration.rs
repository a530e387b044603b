//! End-to-end checks across the reducer, the evaluator and the scanner.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use collatz_core::{descend, evaluate, evaluate_raw, Limits, Outcome, Width};
use collatz_scan::{scan, ScanConfig, ScanError, ScanOutcome, Schedule, Sieve};
use residue_sieve::{classify, Classification, Reducer};

/// Apply up to `limit` shortcut steps; true if the value drops below `start`.
fn falls_within(start: u128, limit: u32) -> bool {
    let mut n = start;
    for _ in 0..limit {
        n = if n % 2 == 0 { n / 2 } else { (3 * n + 1) / 2 };
        if n < start {
            return true;
        }
    }
    false
}

#[test]
fn test_reduction_matches_raw_scan_on_random_chunks() {
    let mut rng = StdRng::seed_from_u64(2024);
    let reducer = Reducer::mod_256();
    let limits = Limits::default();

    for _ in 0..10_000 {
        let i: u128 = rng.gen_range(1..1u128 << 40);
        let candidates = reducer.expand(&i).unwrap();
        assert_eq!(candidates.len(), 19);

        let mut next = candidates.iter().peekable();
        for r in 0..256u128 {
            let start = 256 * i + r;
            let raw = evaluate_raw(&start, &limits);
            assert!(raw.fell(), "start {} did not fall: {:?}", start, raw);

            match next.peek() {
                Some(c) if c.start == start => {
                    let reduced = descend(c.value, &c.start, c.pre_steps as u64, &limits);
                    assert_eq!(reduced, raw, "start {}", start);
                    next.next();
                }
                _ => {
                    assert!(!reducer.admits(r as u32));
                    assert!(falls_within(start, 8), "excluded start {} did not fall", start);
                }
            }
        }
        assert!(next.peek().is_none());
    }
}

#[test]
fn test_excluded_classes_classified_as_falling() {
    let reducer = Reducer::mod_256();
    for r in 2..256u32 {
        let falls = matches!(classify(8, r), Classification::Falls { .. });
        assert_eq!(falls, !reducer.admits(r), "residue {}", r);
    }
}

#[test]
fn test_random_odd_starts_fall_within_cap() {
    let mut rng = StdRng::seed_from_u64(7);
    let limits = Limits::default();
    for _ in 0..20_000 {
        let n: u128 = rng.gen_range(1..1_000_000_000_000u128) | 1;
        match evaluate(&n, &limits) {
            Outcome::Fell { steps } => assert!(n == 1 || steps > 0),
            other => panic!("{} did not fall: {:?}", n, other),
        }
    }
}

#[test]
fn test_scan_first_million_chunks() {
    let config = ScanConfig::new(0, 1_000_000).with_threads(4);
    let report = scan(&config).unwrap();
    assert_eq!(report.outcome(), ScanOutcome::Completed);
    assert_eq!(report.chunks_scanned, 1_000_000);
    assert_eq!(report.candidates_tested, 19_000_000);
    assert!(report.finding.is_none());
}

#[test]
fn test_malformed_range() {
    let config = ScanConfig::new(100, 50).with_threads(4);
    assert!(matches!(
        scan(&config),
        Err(ScanError::InvalidRange { lower: 100, upper: 50 })
    ));
}

#[test]
fn test_scan_is_repeatable() {
    let config = ScanConfig::new(5_000, 25_000).with_threads(3);
    let first = scan(&config).unwrap();
    let second = scan(&config).unwrap();
    assert_eq!(first.outcome(), second.outcome());
    assert_eq!(first.chunks_scanned, second.chunks_scanned);
    assert_eq!(first.candidates_tested, second.candidates_tested);
    assert_eq!(first.finding, second.finding);
}

#[test]
fn test_configurations_agree() {
    let lower = 1u128 << 30;
    let upper = lower + 2_000;
    for width in [Width::U64, Width::U128, Width::Arbitrary] {
        for schedule in [Schedule::Static { block: 100 }, Schedule::Dynamic { block: 37 }] {
            for sieve in [Sieve::Residues, Sieve::Unfiltered] {
                let config = ScanConfig::new(lower, upper)
                    .with_threads(2)
                    .with_width(width)
                    .with_schedule(schedule)
                    .with_sieve(sieve);
                let report = scan(&config).unwrap();
                let per_chunk = if sieve == Sieve::Residues { 19 } else { 256 };
                assert_eq!(report.outcome(), ScanOutcome::Completed);
                assert_eq!(report.chunks_scanned, 2_000);
                assert_eq!(report.candidates_tested, 2_000 * per_chunk);
            }
        }
    }
}

#[test]
fn test_step_limit_finding_is_a_real_start() {
    let config = ScanConfig::new(0, 4)
        .with_threads(1)
        .with_schedule(Schedule::Static { block: 1 })
        .with_limits(Limits { max_odd_steps: 3 });
    let report = scan(&config).unwrap();
    let finding = report.finding.expect("a three-step cap must trip");
    let start: u128 = finding.start.parse().unwrap();
    assert!(start < 4 * 256);
    // Uncapped, the same start falls.
    assert!(evaluate_raw(&start, &Limits::default()).fell());
}
