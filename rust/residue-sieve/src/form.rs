//! Affine forms `a*n + b` and their Collatz steps.
//!
//! A form stands for every integer it produces as `n` ranges over the
//! naturals. Its parity is fixed while `a` is even; once `a` turns odd the
//! parity depends on `n` and the form cannot be stepped any further.

use serde::Serialize;
use std::fmt;

/// Parity of a form, when it is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    Even,
    Odd,
    Undetermined,
}

/// The affine form `a*n + b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Form {
    pub a: u128,
    pub b: u128,
}

impl Form {
    pub fn new(a: u128, b: u128) -> Self {
        Self { a, b }
    }

    pub fn parity(&self) -> Parity {
        if self.a % 2 != 0 {
            Parity::Undetermined
        } else if self.b % 2 == 0 {
            Parity::Even
        } else {
            Parity::Odd
        }
    }

    /// One plain Collatz step: halve if even, `3x + 1` if odd.
    pub fn step(&self) -> Option<Form> {
        match self.parity() {
            Parity::Even => Some(Form::new(self.a / 2, self.b / 2)),
            Parity::Odd => Some(Form::new(3 * self.a, 3 * self.b + 1)),
            Parity::Undetermined => None,
        }
    }

    /// One shortcut step: halve if even, `(3x + 1) / 2` if odd.
    ///
    /// `3(an + b) + 1` is always even when the form is odd, so the halving
    /// that follows is folded in.
    pub fn shortcut_step(&self) -> Option<Form> {
        match self.parity() {
            Parity::Even => Some(Form::new(self.a / 2, self.b / 2)),
            Parity::Odd => Some(Form::new(3 * self.a / 2, (3 * self.b + 1) / 2)),
            Parity::Undetermined => None,
        }
    }

    /// Whether this form stays below `origin` from some `n` on: a smaller
    /// coefficient, or an equal one with a smaller offset.
    pub fn below(&self, origin: &Form) -> bool {
        self.a < origin.a || (self.a == origin.a && self.b < origin.b)
    }

    /// Value at `n`, if it fits in 128 bits.
    pub fn at(&self, n: u128) -> Option<u128> {
        self.a.checked_mul(n)?.checked_add(self.b)
    }
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}n + {}", self.a, self.b)
    }
}
