//! Trajectory evaluation: does a start value's orbit drop back below it?
//!
//! The hot loop alternates `3n + 1` with a single shift that removes every
//! factor of two at once, so one iteration moves from one odd value to the
//! next. Steps are counted in the stopping-time convention (every `3n + 1`
//! and every halving is one step).

use crate::CollatzInt;
use num_bigint::BigUint;
use num_integer::Integer;
use serde::Serialize;

/// Bounds on a single evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Limits {
    /// Maximum number of multiply-add/strip iterations before giving up.
    pub max_odd_steps: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_odd_steps: 10_000,
        }
    }
}

/// Result of evaluating one start value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// The running value dropped below the threshold (or reached 1).
    Fell { steps: u64 },
    /// The iteration cap was hit while the value was still at or above the threshold.
    StepLimit { steps: u64 },
    /// The next `3n + 1` would not fit in the integer width.
    Overflow { steps: u64 },
}

impl Outcome {
    pub fn fell(&self) -> bool {
        matches!(self, Outcome::Fell { .. })
    }

    pub fn steps(&self) -> u64 {
        match *self {
            Outcome::Fell { steps } | Outcome::StepLimit { steps } | Outcome::Overflow { steps } => {
                steps
            }
        }
    }
}

/// Evaluate an odd candidate against itself.
///
/// Callers guarantee `candidate` is odd; the first operation is always a
/// multiply-add.
pub fn evaluate<T: CollatzInt>(candidate: &T, limits: &Limits) -> Outcome {
    debug_assert!(candidate.is_odd() || candidate.is_at_most_one());
    descend(candidate.clone(), candidate, 0, limits)
}

/// Evaluate any positive start value, even or odd.
///
/// This is the unfiltered path: no residue pre-advance, threshold is the
/// value itself.
pub fn evaluate_raw<T: CollatzInt>(start: &T, limits: &Limits) -> Outcome {
    descend(start.clone(), start, 0, limits)
}

/// Continue a trajectory from `value` until it drops below `threshold`.
///
/// `value` is a point already reached from the start `threshold` after
/// `pre_steps` steps. It may be even; its trailing zeros are stripped
/// before the first multiply-add.
pub fn descend<T: CollatzInt>(mut value: T, threshold: &T, pre_steps: u64, limits: &Limits) -> Outcome {
    let mut steps = pre_steps;
    if value < *threshold || value.is_at_most_one() {
        return Outcome::Fell { steps };
    }
    if !value.is_odd() {
        steps += value.strip_twos();
    }

    let mut iterations = 0u64;
    while value >= *threshold && !value.is_at_most_one() {
        if iterations == limits.max_odd_steps {
            return Outcome::StepLimit { steps };
        }
        iterations += 1;

        if !value.triple_plus_one() {
            return Outcome::Overflow { steps };
        }
        steps += 1 + value.strip_twos();
    }

    Outcome::Fell { steps }
}

/// Iterator over the full orbit of a start value down to 1 (inclusive).
///
/// With `shortcut` set, an odd `n` maps straight to `(3n + 1) / 2`.
#[derive(Debug, Clone)]
pub struct Trajectory {
    current: Option<BigUint>,
    shortcut: bool,
}

impl Trajectory {
    pub fn new(start: impl Into<BigUint>, shortcut: bool) -> Self {
        let start = start.into();
        let current = if start.bits() == 0 { None } else { Some(start) };
        Self { current, shortcut }
    }

    /// One Collatz step.
    pub fn step(n: &BigUint, shortcut: bool) -> BigUint {
        if n.is_even() {
            n >> 1u32
        } else if shortcut {
            (n * 3u32 + 1u32) >> 1u32
        } else {
            n * 3u32 + 1u32
        }
    }
}

/// Plain Collatz steps until the orbit first drops below `start`.
///
/// Checks after every step, so this can undercut [`evaluate_raw`], which
/// only compares at odd landings. Zero and one have stopping time zero.
pub fn stopping_time(start: &BigUint) -> u64 {
    Trajectory::new(start.clone(), false)
        .skip(1)
        .position(|v| v < *start)
        .map_or(0, |p| p as u64 + 1)
}

impl Iterator for Trajectory {
    type Item = BigUint;

    fn next(&mut self) -> Option<BigUint> {
        let current = self.current.take()?;
        if current.bits() > 1 {
            self.current = Some(Self::step(&current, self.shortcut));
        }
        Some(current)
    }
}
