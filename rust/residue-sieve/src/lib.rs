//! Residue-class reduction for Collatz range scans.
//!
//! Write a start value as `2^k * i + r`. For most residues `r` the first
//! `k` parity decisions of the trajectory are fixed by `r` alone and already
//! force the value below its start, so those classes never need testing.
//! For the survivors the same forced steps collapse into a closed form
//! `3^j * i + c`, letting the evaluator pick up the trajectory `k + j` steps
//! in. With `k = 8` only 19 of every 256 residues survive.

pub mod form;

use collatz_core::CollatzInt;
use serde::Serialize;

pub use form::{Form, Parity};

/// Largest supported sieve depth (residues mod `2^MAX_BITS`).
pub const MAX_BITS: u32 = 24;

/// One surviving residue class and its closed form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ResidueRule {
    /// Residue of the start value mod `2^bits`.
    pub residue: u32,
    /// `3^odd_steps`, the coefficient of the chunk index after the forced steps.
    pub multiplier: u64,
    /// Constant term of the closed form.
    pub offset: u64,
    /// Number of `(3x + 1) / 2` steps among the forced ones.
    pub odd_steps: u32,
    /// Collatz steps folded into the closed form, counting `3x + 1` and each halving.
    pub steps: u32,
    /// Parity of each forced shortcut step, step `s` in bit `s`.
    pub pattern: u32,
}

const fn rule(residue: u32, multiplier: u64, offset: u64, odd_steps: u32, steps: u32, pattern: u32) -> ResidueRule {
    ResidueRule {
        residue,
        multiplier,
        offset,
        odd_steps,
        steps,
        pattern,
    }
}

/// The verified table for residues mod 256.
pub const RULES_MOD_256: [ResidueRule; 19] = [
    rule(27, 2187, 242, 7, 15, 0b11111011),
    rule(31, 729, 91, 6, 14, 0b01011111),
    rule(47, 729, 137, 6, 14, 0b10101111),
    rule(63, 729, 182, 6, 14, 0b00111111),
    rule(71, 729, 206, 6, 14, 0b11010111),
    rule(91, 729, 263, 6, 14, 0b10111011),
    rule(103, 2187, 890, 7, 15, 0b11110111),
    rule(111, 729, 319, 6, 14, 0b01101111),
    rule(127, 2187, 1093, 7, 15, 0b01111111),
    rule(155, 729, 445, 6, 14, 0b01111011),
    rule(159, 2187, 1367, 7, 15, 0b11011111),
    rule(167, 729, 479, 6, 14, 0b10110111),
    rule(191, 2187, 1640, 7, 15, 0b10111111),
    rule(207, 729, 593, 6, 14, 0b11001111),
    rule(223, 729, 638, 6, 14, 0b10011111),
    rule(231, 729, 661, 6, 14, 0b01110111),
    rule(239, 2187, 2051, 7, 15, 0b11101111),
    rule(251, 729, 719, 6, 14, 0b11011011),
    rule(255, 6561, 6560, 8, 16, 0b11111111),
];

/// Fate of one residue class under its forced steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The class provably drops below its start within the forced steps.
    Falls { steps: u32 },
    /// The forced steps run out first; the class must be tested.
    Survives(ResidueRule),
}

/// Step the form `2^bits * n + residue` until it falls or its parity is lost.
pub fn classify(bits: u32, residue: u32) -> Classification {
    let origin = Form::new(1u128 << bits, residue as u128);
    let mut form = origin;
    let mut odd_steps = 0u32;
    let mut steps = 0u32;
    let mut pattern = 0u32;
    let mut consumed = 0u32;

    loop {
        match form.parity() {
            Parity::Even => {
                form = Form::new(form.a / 2, form.b / 2);
                steps += 1;
                consumed += 1;
                if form.below(&origin) {
                    return Classification::Falls { steps };
                }
            }
            Parity::Odd => {
                form = Form::new(3 * form.a / 2, (3 * form.b + 1) / 2);
                pattern |= 1 << consumed;
                odd_steps += 1;
                steps += 2;
                consumed += 1;
            }
            Parity::Undetermined => {
                return Classification::Survives(ResidueRule {
                    residue,
                    multiplier: form.a as u64,
                    offset: form.b as u64,
                    odd_steps,
                    steps,
                    pattern,
                });
            }
        }
    }
}

/// Derive the surviving rules for residues mod `2^bits`, sorted by residue.
///
/// Returns `None` when `bits` is outside `1..=MAX_BITS`.
pub fn derive(bits: u32) -> Option<Vec<ResidueRule>> {
    if bits == 0 || bits > MAX_BITS {
        return None;
    }
    let rules = (0..1u32 << bits)
        .filter_map(|r| match classify(bits, r) {
            Classification::Survives(rule) => Some(rule),
            Classification::Falls { .. } => None,
        })
        .collect();
    Some(rules)
}

/// One value handed to the evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<T> {
    /// The real start value `2^bits * i + residue`; the trajectory must fall below it.
    pub start: T,
    /// Where the trajectory stands after the forced steps.
    pub value: T,
    /// Steps already applied to reach `value`.
    pub pre_steps: u32,
    pub residue: u32,
}

/// Reusable buffers for [`Reducer::expand_into`].
#[derive(Debug, Clone)]
pub struct Expansion<T> {
    products: Vec<T>,
    candidates: Vec<Candidate<T>>,
}

impl<T> Default for Expansion<T> {
    fn default() -> Self {
        Self {
            products: Vec::new(),
            candidates: Vec::new(),
        }
    }
}

impl<T> Expansion<T> {
    pub fn candidates(&self) -> &[Candidate<T>] {
        &self.candidates
    }
}

/// Expands chunk indices into the candidates that need testing.
///
/// Rules sharing a multiplier share one product per chunk: for the mod-256
/// table that is three multiplications (729i, 2187i, 6561i) for 19 candidates.
#[derive(Debug, Clone)]
pub struct Reducer {
    bits: u32,
    rules: Vec<ResidueRule>,
    multipliers: Vec<u64>,
    /// Index into `multipliers` for each rule.
    slots: Vec<usize>,
}

impl Reducer {
    /// Rules may come in any order; they are kept sorted by residue.
    pub fn new(bits: u32, mut rules: Vec<ResidueRule>) -> Self {
        rules.sort_unstable_by_key(|r| r.residue);
        let mut multipliers: Vec<u64> = rules.iter().map(|r| r.multiplier).collect();
        multipliers.sort_unstable();
        multipliers.dedup();
        let slots = rules
            .iter()
            .map(|r| multipliers.binary_search(&r.multiplier).unwrap_or_default())
            .collect();
        Self {
            bits,
            rules,
            multipliers,
            slots,
        }
    }

    /// Reducer over the verified mod-256 table.
    pub fn mod_256() -> Self {
        Self::new(8, RULES_MOD_256.to_vec())
    }

    /// Reducer over a freshly derived table, `None` for unsupported depths.
    pub fn derived(bits: u32) -> Option<Self> {
        derive(bits).map(|rules| Self::new(bits, rules))
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Integers covered by one chunk index.
    pub fn modulus(&self) -> u64 {
        1u64 << self.bits
    }

    pub fn rules(&self) -> &[ResidueRule] {
        &self.rules
    }

    pub fn multipliers(&self) -> &[u64] {
        &self.multipliers
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether values with this residue are tested rather than skipped.
    pub fn admits(&self, residue: u32) -> bool {
        self.rules.binary_search_by_key(&residue, |r| r.residue).is_ok()
    }

    /// Largest multiplier in the table; bounds the expanded values of a chunk.
    pub fn max_multiplier(&self) -> u64 {
        self.multipliers.last().copied().unwrap_or(1)
    }

    /// Fill `out` with the candidates of chunk `i`.
    ///
    /// Returns `None` if any start or expanded value overflows `T`; `out`
    /// is then left in an unspecified state.
    pub fn expand_into<T: CollatzInt>(&self, i: &T, out: &mut Expansion<T>) -> Option<()> {
        out.products.clear();
        for &m in &self.multipliers {
            out.products.push(i.mul_add_small(m, 0)?);
        }

        out.candidates.clear();
        let modulus = self.modulus();
        for (rule, &slot) in self.rules.iter().zip(&self.slots) {
            out.candidates.push(Candidate {
                start: i.mul_add_small(modulus, rule.residue as u64)?,
                value: out.products[slot].add_small(rule.offset)?,
                pre_steps: rule.steps,
                residue: rule.residue,
            });
        }
        Some(())
    }

    /// The candidates of chunk `i`, or `None` on overflow of `T`.
    pub fn expand<T: CollatzInt>(&self, i: &T) -> Option<Vec<Candidate<T>>> {
        let mut out = Expansion::default();
        self.expand_into(i, &mut out)?;
        Some(out.candidates)
    }
}

impl Default for Reducer {
    fn default() -> Self {
        Self::mod_256()
    }
}
