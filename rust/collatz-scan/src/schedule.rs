//! Work distribution over chunk-index ranges.
//!
//! The range `[lower, upper)` is cut into blocks of consecutive chunk
//! indices. A static schedule deals blocks round-robin to a fixed number
//! of workers up front; a dynamic schedule lets idle workers steal blocks
//! as they go, which evens out the uneven trajectory lengths.

use serde::Serialize;
use std::fmt;
use std::ops::Range;

/// Default block size for the dynamic schedule, in chunk indices.
pub const DEFAULT_DYNAMIC_BLOCK: u64 = 1024;

/// Default block size for the static schedule, in chunk indices.
pub const DEFAULT_STATIC_BLOCK: u64 = 512;

/// Work distribution policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum Schedule {
    /// Block `k` belongs to worker `k mod threads`.
    Static { block: u64 },
    /// Blocks are claimed through work stealing.
    Dynamic { block: u64 },
}

impl Schedule {
    pub fn block(&self) -> u64 {
        match *self {
            Schedule::Static { block } | Schedule::Dynamic { block } => block,
        }
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Schedule::Dynamic {
            block: DEFAULT_DYNAMIC_BLOCK,
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::Static { block } => write!(f, "static({})", block),
            Schedule::Dynamic { block } => write!(f, "dynamic({})", block),
        }
    }
}

/// A chunk-index range cut into fixed-size blocks; the last one may be short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blocks {
    lower: u128,
    upper: u128,
    size: u128,
}

impl Blocks {
    /// `size` must be positive and `lower <= upper`; the scan validates both.
    pub fn new(lower: u128, upper: u128, size: u64) -> Self {
        Self {
            lower,
            upper: upper.max(lower),
            size: size.max(1) as u128,
        }
    }

    pub fn count(&self) -> u128 {
        let span = self.upper - self.lower;
        span / self.size + u128::from(span % self.size != 0)
    }

    /// Chunk indices of block `k`.
    pub fn get(&self, k: u128) -> Range<u128> {
        let start = self.lower.saturating_add(k.saturating_mul(self.size)).min(self.upper);
        let end = start.saturating_add(self.size).min(self.upper);
        start..end
    }

    /// Block numbers dealt to `worker` out of `workers` under a static schedule.
    pub fn owned_by(&self, worker: usize, workers: usize) -> impl Iterator<Item = u128> {
        (worker as u128..self.count()).step_by(workers.max(1))
    }
}
