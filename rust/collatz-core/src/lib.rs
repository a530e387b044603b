//! Shared types and arithmetic for Collatz range scans.
//!
//! The scanner is generic over the integer type carrying trajectory values.
//! [`CollatzInt`] is the capability set the evaluator needs (multiply-add,
//! compare, trailing-zero strip), implemented for `u64`, `u128` and
//! [`BigUint`] so one evaluator serves all three widths.

pub mod trajectory;

use num_bigint::{BigUint, ToBigUint};
use num_integer::Integer;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub use trajectory::{descend, evaluate, evaluate_raw, stopping_time, Limits, Outcome, Trajectory};

/// Integer width used to carry trajectory values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Width {
    #[serde(rename = "64")]
    U64,
    #[serde(rename = "128")]
    U128,
    #[serde(rename = "arbitrary")]
    Arbitrary,
}

impl Width {
    /// Largest representable value, or `None` for arbitrary precision.
    pub fn max_value(self) -> Option<u128> {
        match self {
            Width::U64 => Some(u64::MAX as u128),
            Width::U128 => Some(u128::MAX),
            Width::Arbitrary => None,
        }
    }

    /// Whether `value` fits in this width.
    pub fn holds(self, value: &BigUint) -> bool {
        match self {
            Width::U64 => value.bits() <= 64,
            Width::U128 => value.bits() <= 128,
            Width::Arbitrary => true,
        }
    }
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Width::U64 => write!(f, "64"),
            Width::U128 => write!(f, "128"),
            Width::Arbitrary => write!(f, "arbitrary"),
        }
    }
}

/// Error returned when a width string is not one of `64`, `128`, `arbitrary`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWidthError(pub String);

impl fmt::Display for ParseWidthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown width '{}' (expected 64, 128 or arbitrary)", self.0)
    }
}

impl std::error::Error for ParseWidthError {}

impl FromStr for Width {
    type Err = ParseWidthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "64" | "u64" => Ok(Width::U64),
            "128" | "u128" => Ok(Width::U128),
            "arbitrary" | "big" | "bigint" => Ok(Width::Arbitrary),
            other => Err(ParseWidthError(other.to_string())),
        }
    }
}

/// Arithmetic the trajectory evaluator and the residue reducer rely on.
///
/// Fixed-width implementations detect overflow instead of wrapping; the
/// `BigUint` implementation never overflows.
pub trait CollatzInt:
    Clone + Ord + fmt::Debug + fmt::Display + Send + Sync + ToBigUint + 'static
{
    const WIDTH: Width;

    /// Convert from `u128`, failing if the value does not fit.
    fn from_u128(value: u128) -> Option<Self>;

    /// Convert from a `BigUint`, failing if the value does not fit.
    fn from_biguint(value: &BigUint) -> Option<Self>;

    fn is_odd(&self) -> bool;

    /// True for 0 and 1, where the trajectory has nowhere left to fall.
    fn is_at_most_one(&self) -> bool;

    /// In-place `3n + 1`. Returns `false` (leaving `self` untouched) on overflow.
    fn triple_plus_one(&mut self) -> bool;

    /// Shift out every trailing zero bit at once and return the shift.
    /// Zero is left as is.
    fn strip_twos(&mut self) -> u64;

    /// Checked `m * self + c`.
    fn mul_add_small(&self, m: u64, c: u64) -> Option<Self>;

    /// Checked `self + c`.
    fn add_small(&self, c: u64) -> Option<Self>;
}

macro_rules! impl_collatz_int_primitive {
    ($t:ty, $width:expr) => {
        impl CollatzInt for $t {
            const WIDTH: Width = $width;

            #[inline]
            fn from_u128(value: u128) -> Option<Self> {
                <$t>::try_from(value).ok()
            }

            fn from_biguint(value: &BigUint) -> Option<Self> {
                <$t>::try_from(value).ok()
            }

            #[inline]
            fn is_odd(&self) -> bool {
                Integer::is_odd(self)
            }

            #[inline]
            fn is_at_most_one(&self) -> bool {
                *self <= 1
            }

            #[inline]
            fn triple_plus_one(&mut self) -> bool {
                match self.checked_mul(3).and_then(|v| v.checked_add(1)) {
                    Some(v) => {
                        *self = v;
                        true
                    }
                    None => false,
                }
            }

            #[inline]
            fn strip_twos(&mut self) -> u64 {
                if *self == 0 {
                    return 0;
                }
                let tz = self.trailing_zeros();
                *self >>= tz;
                tz as u64
            }

            #[inline]
            fn mul_add_small(&self, m: u64, c: u64) -> Option<Self> {
                let m = <$t>::try_from(m).ok()?;
                let c = <$t>::try_from(c).ok()?;
                self.checked_mul(m)?.checked_add(c)
            }

            #[inline]
            fn add_small(&self, c: u64) -> Option<Self> {
                self.checked_add(<$t>::try_from(c).ok()?)
            }
        }
    };
}

impl_collatz_int_primitive!(u64, Width::U64);
impl_collatz_int_primitive!(u128, Width::U128);

impl CollatzInt for BigUint {
    const WIDTH: Width = Width::Arbitrary;

    fn from_u128(value: u128) -> Option<Self> {
        Some(BigUint::from(value))
    }

    fn from_biguint(value: &BigUint) -> Option<Self> {
        Some(value.clone())
    }

    fn is_odd(&self) -> bool {
        Integer::is_odd(self)
    }

    fn is_at_most_one(&self) -> bool {
        self.bits() <= 1
    }

    fn triple_plus_one(&mut self) -> bool {
        *self *= 3u32;
        *self += 1u32;
        true
    }

    fn strip_twos(&mut self) -> u64 {
        match self.trailing_zeros() {
            Some(tz) if tz > 0 => {
                *self >>= tz;
                tz
            }
            _ => 0,
        }
    }

    fn mul_add_small(&self, m: u64, c: u64) -> Option<Self> {
        Some(self * m + c)
    }

    fn add_small(&self, c: u64) -> Option<Self> {
        Some(self + c)
    }
}

/// Widen any supported integer to `BigUint` for reporting or escalation.
pub fn widen<T: CollatzInt>(value: &T) -> BigUint {
    // ToBigUint is infallible for unsigned types.
    value.to_biguint().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_parse_and_display() {
        assert_eq!("64".parse::<Width>().unwrap(), Width::U64);
        assert_eq!("u128".parse::<Width>().unwrap(), Width::U128);
        assert_eq!("Arbitrary".parse::<Width>().unwrap(), Width::Arbitrary);
        assert!("32".parse::<Width>().is_err());
        for w in [Width::U64, Width::U128, Width::Arbitrary] {
            assert_eq!(w.to_string().parse::<Width>().unwrap(), w);
        }
    }

    #[test]
    fn test_width_holds() {
        let just_fits = BigUint::from(u64::MAX);
        let too_big = &just_fits + 1u32;
        assert!(Width::U64.holds(&just_fits));
        assert!(!Width::U64.holds(&too_big));
        assert!(Width::U128.holds(&too_big));
        assert!(Width::Arbitrary.holds(&(&too_big << 500)));
        assert_eq!(Width::Arbitrary.max_value(), None);
    }

    #[test]
    fn test_triple_plus_one_overflow_detected() {
        let mut n: u64 = u64::MAX / 3 + 1;
        let before = n;
        assert!(!n.triple_plus_one());
        assert_eq!(n, before, "value must be left untouched on overflow");

        let mut m: u64 = (u64::MAX - 1) / 3;
        assert!(m.triple_plus_one());
        assert_eq!(m, 3 * ((u64::MAX - 1) / 3) + 1);

        // First value whose 3n + 1 no longer fits.
        let mut edge: u64 = (u64::MAX - 1) / 3 + 1;
        assert!(!edge.triple_plus_one());
        assert_eq!(edge, (u64::MAX - 1) / 3 + 1);

        let mut big = BigUint::from(u128::MAX);
        assert!(big.triple_plus_one());
        assert_eq!(big, BigUint::from(u128::MAX) * 3u32 + 1u32);
    }

    #[test]
    fn test_strip_twos_all_widths() {
        let mut a: u64 = 40; // 5 * 2^3
        assert_eq!(a.strip_twos(), 3);
        assert_eq!(a, 5);

        let mut b: u128 = 1u128 << 100;
        assert_eq!(b.strip_twos(), 100);
        assert_eq!(b, 1);

        let mut c = BigUint::from(7u32) << 300u32;
        assert_eq!(c.strip_twos(), 300);
        assert_eq!(c, BigUint::from(7u32));

        let mut odd: u64 = 9;
        assert_eq!(odd.strip_twos(), 0);
        let mut zero: u64 = 0;
        assert_eq!(zero.strip_twos(), 0);
        let mut big_zero = BigUint::default();
        assert_eq!(big_zero.strip_twos(), 0);
    }

    #[test]
    fn test_mul_add_small() {
        assert_eq!(5u64.mul_add_small(729, 91), Some(5 * 729 + 91));
        assert_eq!(u64::MAX.mul_add_small(2, 0), None);
        assert_eq!((u64::MAX - 3).add_small(4), None);
        assert_eq!(
            BigUint::from(u128::MAX).mul_add_small(6561, 6560),
            Some(BigUint::from(u128::MAX) * 6561u32 + 6560u32)
        );
    }

    #[test]
    fn test_conversions() {
        assert_eq!(<u64 as CollatzInt>::from_u128(u64::MAX as u128 + 1), None);
        assert_eq!(<u128 as CollatzInt>::from_u128(7), Some(7u128));
        let big = BigUint::from(u64::MAX) + 1u32;
        assert_eq!(<u64 as CollatzInt>::from_biguint(&big), None);
        assert_eq!(<u128 as CollatzInt>::from_biguint(&big), Some(u64::MAX as u128 + 1));
        assert_eq!(widen(&12345u64), BigUint::from(12345u32));
    }

    #[test]
    fn test_at_most_one() {
        assert!(0u64.is_at_most_one());
        assert!(1u128.is_at_most_one());
        assert!(!2u64.is_at_most_one());
        assert!(BigUint::from(1u32).is_at_most_one());
        assert!(!BigUint::from(2u32).is_at_most_one());
    }
}
