//! Parallel Collatz range scanner.
//!
//! Scans chunk indices `[lower, upper)`, where chunk `i` stands for the 256
//! integers `[256i, 256i + 256)`. With the residue sieve on, each chunk is
//! expanded into its 19 surviving candidates, pre-advanced along their forced
//! steps; with it off, all 256 integers are evaluated directly. Every start
//! value must drop back below itself. Anything else (an iteration cap hit, or
//! a 3n + 1 that no width can hold) is reported as a [`Finding`] and stops
//! the scan.
//!
//! The scan runs on its own rayon pool, sized per call; no global thread
//! state is touched.

pub mod schedule;

use collatz_core::{descend, evaluate_raw, widen, CollatzInt, Limits, Outcome, Width};
use num_bigint::BigUint;
use num_traits::ToPrimitive;
use rayon::prelude::*;
use residue_sieve::{Expansion, Reducer};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub use schedule::{Blocks, Schedule, DEFAULT_DYNAMIC_BLOCK, DEFAULT_STATIC_BLOCK};

/// Integers per chunk index.
pub const CHUNK_SIZE: u64 = 256;

/// Sieve depth matching [`CHUNK_SIZE`].
const CHUNK_BITS: u32 = 8;

/// Whether chunks are reduced to their surviving residues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sieve {
    /// Test only the 19 surviving residues of each chunk.
    #[default]
    Residues,
    /// Test all 256 integers of each chunk.
    Unfiltered,
}

impl fmt::Display for Sieve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sieve::Residues => write!(f, "residues"),
            Sieve::Unfiltered => write!(f, "unfiltered"),
        }
    }
}

/// Errors detected before any work starts.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("invalid range: lower bound {lower} exceeds upper bound {upper}")]
    InvalidRange { lower: u128, upper: u128 },

    #[error("chunk range up to {upper} reaches {largest}, which does not fit in {width}-bit arithmetic")]
    WidthExceeded {
        width: Width,
        upper: u128,
        largest: String,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Parameters of one scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanConfig {
    /// First chunk index (inclusive).
    pub lower: u128,
    /// Last chunk index (exclusive).
    pub upper: u128,
    pub threads: usize,
    pub width: Width,
    pub sieve: Sieve,
    pub schedule: Schedule,
    pub limits: Limits,
}

/// Worker count when none is given: the host's available parallelism.
pub fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            lower: 0,
            upper: 0,
            threads: default_threads(),
            width: Width::U64,
            sieve: Sieve::default(),
            schedule: Schedule::default(),
            limits: Limits::default(),
        }
    }
}

impl ScanConfig {
    pub fn new(lower: u128, upper: u128) -> Self {
        Self {
            lower,
            upper,
            ..Self::default()
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_width(mut self, width: Width) -> Self {
        self.width = width;
        self
    }

    pub fn with_sieve(mut self, sieve: Sieve) -> Self {
        self.sieve = sieve;
        self
    }

    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Number of chunk indices in the range (zero for an inverted range).
    pub fn chunk_count(&self) -> u128 {
        self.upper.saturating_sub(self.lower)
    }

    /// Largest value the scan will place in its integer type before any
    /// trajectory step: the last start value, or the last expanded value if larger.
    pub fn largest_value(&self) -> Option<BigUint> {
        if self.upper <= self.lower {
            return None;
        }
        let last = BigUint::from(self.upper - 1);
        let last_start = &last * CHUNK_SIZE + (CHUNK_SIZE - 1);
        let largest = match self.sieve {
            Sieve::Unfiltered => last_start,
            Sieve::Residues => Reducer::mod_256()
                .rules()
                .iter()
                .map(|r| &last * r.multiplier + r.offset)
                .chain(std::iter::once(last_start))
                .max()
                .unwrap_or_default(),
        };
        Some(largest)
    }

    /// Check the configuration before any evaluation work.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.lower > self.upper {
            return Err(ScanError::InvalidRange {
                lower: self.lower,
                upper: self.upper,
            });
        }
        if self.threads == 0 {
            return Err(ScanError::InvalidConfig("thread count must be positive".into()));
        }
        if self.schedule.block() == 0 {
            return Err(ScanError::InvalidConfig("block size must be positive".into()));
        }
        if self.limits.max_odd_steps == 0 {
            return Err(ScanError::InvalidConfig("step limit must be positive".into()));
        }
        let blocks = Blocks::new(self.lower, self.upper, self.schedule.block());
        if blocks.count() > usize::MAX as u128 {
            return Err(ScanError::InvalidConfig(format!(
                "{} blocks is too many; raise the block size",
                blocks.count()
            )));
        }
        if let Some(largest) = self.largest_value() {
            if !self.width.holds(&largest) {
                return Err(ScanError::WidthExceeded {
                    width: self.width,
                    upper: self.upper,
                    largest: largest.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// A start value whose trajectory could not be shown to fall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// The start value, in decimal.
    pub start: String,
    /// Its residue mod 256.
    pub residue: u32,
    /// Outcome of the final (widest) evaluation.
    pub outcome: Outcome,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            Outcome::StepLimit { steps } => {
                write!(f, "{} still above its start after {} steps", self.start, steps)
            }
            Outcome::Overflow { steps } => {
                write!(f, "{} overflowed after {} steps", self.start, steps)
            }
            Outcome::Fell { steps } => write!(f, "{} fell after {} steps", self.start, steps),
        }
    }
}

/// How a scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanOutcome {
    /// Every start value in range fell.
    Completed,
    /// A finding stopped the scan.
    Finding,
    /// The caller's cancel flag stopped the scan.
    Cancelled,
}

/// Summary of one scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub lower: u128,
    pub upper: u128,
    pub width: Width,
    pub sieve: Sieve,
    pub schedule: Schedule,
    pub threads: usize,
    pub chunks_scanned: u64,
    pub candidates_tested: u64,
    /// Fixed-width overflows re-checked in arbitrary precision.
    pub escalations: u64,
    pub elapsed: Duration,
    pub finding: Option<Finding>,
    pub cancelled: bool,
}

impl ScanReport {
    pub fn outcome(&self) -> ScanOutcome {
        if self.finding.is_some() {
            ScanOutcome::Finding
        } else if self.cancelled {
            ScanOutcome::Cancelled
        } else {
            ScanOutcome::Completed
        }
    }

    /// Candidates per second of wall time.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.candidates_tested as f64 / secs
        } else {
            0.0
        }
    }
}

/// Scan `config`'s range, returning the first finding if there is one.
pub fn scan(config: &ScanConfig) -> Result<ScanReport, ScanError> {
    let cancel = AtomicBool::new(false);
    scan_with_cancel(config, &cancel)
}

/// Like [`scan`], stopping early once `cancel` is set.
///
/// Workers check the flag between chunks.
pub fn scan_with_cancel(config: &ScanConfig, cancel: &AtomicBool) -> Result<ScanReport, ScanError> {
    config.validate()?;
    match config.width {
        Width::U64 => run::<u64>(config, cancel),
        Width::U128 => run::<u128>(config, cancel),
        Width::Arbitrary => run::<BigUint>(config, cancel),
    }
}

/// State shared by all workers of one scan.
struct Shared<'a> {
    config: &'a ScanConfig,
    reducer: Reducer,
    blocks: Blocks,
    cancel: &'a AtomicBool,
    stop: AtomicBool,
    chunks: AtomicU64,
    candidates: AtomicU64,
    escalations: AtomicU64,
}

impl Shared<'_> {
    fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Relaxed) || self.cancel.load(Ordering::Relaxed)
    }

    /// Turn a non-falling outcome into a finding, re-checking fixed-width
    /// overflows in arbitrary precision first.
    fn resolve<T: CollatzInt>(&self, start: &T, value: &T, pre_steps: u64, outcome: Outcome) -> Option<Finding> {
        let outcome = match outcome {
            Outcome::Fell { .. } => return None,
            Outcome::Overflow { steps } if T::WIDTH != Width::Arbitrary => {
                self.escalations.fetch_add(1, Ordering::Relaxed);
                log::debug!(
                    "{} overflowed {}-bit arithmetic after {} steps; re-checking in arbitrary precision",
                    start,
                    T::WIDTH,
                    steps
                );
                let widened = descend(widen(value), &widen(start), pre_steps, &self.config.limits);
                if widened.fell() {
                    return None;
                }
                widened
            }
            other => other,
        };

        let start = widen(start);
        let residue = (&start % CHUNK_SIZE).to_u32().unwrap_or_default();
        let finding = Finding {
            start: start.to_string(),
            residue,
            outcome,
        };
        log::warn!("possible counterexample: {}", finding);
        self.stop.store(true, Ordering::Relaxed);
        Some(finding)
    }
}

/// Per-worker scratch space.
struct Worker<'a, T> {
    shared: &'a Shared<'a>,
    expansion: Expansion<T>,
}

impl<'a, T: CollatzInt> Worker<'a, T> {
    fn new(shared: &'a Shared<'a>) -> Self {
        Self {
            shared,
            expansion: Expansion::default(),
        }
    }

    /// Scan every chunk of block `k`, stopping at the first finding.
    fn scan_block(&mut self, k: u128) -> Option<Finding> {
        let mut chunks = 0u64;
        let mut tested = 0u64;
        let mut found = None;

        for i in self.shared.blocks.get(k) {
            if self.shared.should_stop() {
                break;
            }
            let (count, finding) = self.scan_chunk(i);
            chunks += 1;
            tested += count;
            if finding.is_some() {
                found = finding;
                break;
            }
        }

        self.shared.chunks.fetch_add(chunks, Ordering::Relaxed);
        self.shared.candidates.fetch_add(tested, Ordering::Relaxed);
        found
    }

    /// Evaluate one chunk; returns the number of start values tested.
    fn scan_chunk(&mut self, i: u128) -> (u64, Option<Finding>) {
        let shared = self.shared;
        let limits = &shared.config.limits;
        let Some(index) = T::from_u128(i) else {
            // Validation keeps the range inside the width; fall back to
            // arbitrary precision rather than skip the chunk.
            return Worker::<BigUint>::new(shared).scan_chunk(i);
        };

        match shared.config.sieve {
            Sieve::Residues => {
                if shared.reducer.expand_into(&index, &mut self.expansion).is_none() {
                    return Worker::<BigUint>::new(shared).scan_chunk(i);
                }
                let mut tested = 0u64;
                for c in self.expansion.candidates() {
                    tested += 1;
                    let pre_steps = c.pre_steps as u64;
                    let outcome = descend(c.value.clone(), &c.start, pre_steps, limits);
                    if !outcome.fell() {
                        if let Some(finding) = shared.resolve(&c.start, &c.value, pre_steps, outcome) {
                            return (tested, Some(finding));
                        }
                    }
                }
                (tested, None)
            }
            Sieve::Unfiltered => {
                let mut tested = 0u64;
                for r in 0..CHUNK_SIZE {
                    let Some(start) = index.mul_add_small(CHUNK_SIZE, r) else {
                        return Worker::<BigUint>::new(shared).scan_chunk(i);
                    };
                    tested += 1;
                    let outcome = evaluate_raw(&start, limits);
                    if !outcome.fell() {
                        if let Some(finding) = shared.resolve(&start, &start, 0, outcome) {
                            return (tested, Some(finding));
                        }
                    }
                }
                (tested, None)
            }
        }
    }
}

fn run<T: CollatzInt>(config: &ScanConfig, cancel: &AtomicBool) -> Result<ScanReport, ScanError> {
    let start = Instant::now();
    let blocks = Blocks::new(config.lower, config.upper, config.schedule.block());
    let shared = Shared {
        config,
        reducer: Reducer::new(CHUNK_BITS, residue_sieve::RULES_MOD_256.to_vec()),
        blocks,
        cancel,
        stop: AtomicBool::new(false),
        chunks: AtomicU64::new(0),
        candidates: AtomicU64::new(0),
        escalations: AtomicU64::new(0),
    };

    log::info!(
        "scanning chunks [{}, {}) on {} threads: {}-bit, {}, {}",
        config.lower,
        config.upper,
        config.threads,
        config.width,
        config.sieve,
        config.schedule
    );
    log::debug!("{} blocks, step limit {}", blocks.count(), config.limits.max_odd_steps);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .thread_name(|i| format!("collatz-worker-{}", i))
        .build()?;

    let finding = pool.install(|| match config.schedule {
        Schedule::Dynamic { .. } => (0..blocks.count() as usize)
            .into_par_iter()
            .with_max_len(1)
            .map_init(|| Worker::<T>::new(&shared), |worker, k| worker.scan_block(k as u128))
            .find_map_any(|found| found),
        Schedule::Static { .. } => (0..config.threads)
            .into_par_iter()
            .with_max_len(1)
            .map(|w| {
                let mut worker = Worker::<T>::new(&shared);
                for k in blocks.owned_by(w, config.threads) {
                    if shared.should_stop() {
                        break;
                    }
                    if let Some(found) = worker.scan_block(k) {
                        return Some(found);
                    }
                }
                None
            })
            .find_map_any(|found| found),
    });

    let chunks_scanned = shared.chunks.load(Ordering::Relaxed);
    let cancelled =
        finding.is_none() && cancel.load(Ordering::Relaxed) && (chunks_scanned as u128) < config.chunk_count();
    let report = ScanReport {
        lower: config.lower,
        upper: config.upper,
        width: config.width,
        sieve: config.sieve,
        schedule: config.schedule,
        threads: config.threads,
        chunks_scanned,
        candidates_tested: shared.candidates.load(Ordering::Relaxed),
        escalations: shared.escalations.load(Ordering::Relaxed),
        elapsed: start.elapsed(),
        finding,
        cancelled,
    };

    log::info!(
        "scanned {} chunks ({} candidates) in {:.3}s, {:.0} candidates/s, outcome {:?}",
        report.chunks_scanned,
        report.candidates_tested,
        report.elapsed.as_secs_f64(),
        report.throughput(),
        report.outcome()
    );
    Ok(report)
}
