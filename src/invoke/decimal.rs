//! Correctly rounded conversion of decimal literals to binary floating point.
//!
//! A literal is held as the exact rational `digits * 10^exponent` and rounded once, half to
//! even, to the precision of the target format. This keeps every significand bit that the
//! format can hold, which a detour through `f64` would lose.

use std::cmp::Ordering;

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};

/// Decimal magnitude above which every supported format overflows
const OVERFLOW_DIGITS: i64 = 4940;
/// Decimal magnitude below which every supported format rounds to zero
const UNDERFLOW_DIGITS: i64 = -4980;

/// Shape of a binary floating point format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Shape {
    /// Significand bits including the leading one
    pub precision: u32,
    /// Exponent of the smallest normal value
    pub min_exponent: i64,
    /// Exponent of the largest finite value
    pub max_exponent: i64,
}

impl Shape {
    pub(crate) const BINARY64: Shape = Shape {
        precision: 53,
        min_exponent: -1022,
        max_exponent: 1023,
    };

    pub(crate) const X87: Shape = Shape {
        precision: 64,
        min_exponent: -16382,
        max_exponent: 16383,
    };

    pub(crate) const BINARY128: Shape = Shape {
        precision: 113,
        min_exponent: -16382,
        max_exponent: 16383,
    };
}

/// A magnitude rounded to a [`Shape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rounded {
    Zero,
    /// `significand * 2^(exponent - precision + 1)`. The value is subnormal when the leading
    /// significand bit is clear.
    Finite {
        exponent: i64,
        significand: u128,
    },
    Infinite,
}

/// Non-negative rational number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Ratio {
    numerator: BigUint,
    denominator: BigUint,
}

impl Ratio {
    fn zero() -> Self {
        Ratio {
            numerator: BigUint::zero(),
            denominator: BigUint::one(),
        }
    }

    /// `mantissa * 2^exponent`
    pub(crate) fn from_binary(mantissa: u128, exponent: i64) -> Self {
        let mantissa = BigUint::from(mantissa);
        if exponent >= 0 {
            Ratio {
                numerator: mantissa << shift(exponent),
                denominator: BigUint::one(),
            }
        } else {
            Ratio {
                numerator: mantissa,
                denominator: BigUint::one() << shift(exponent),
            }
        }
    }

    pub(crate) fn is_zero(&self) -> bool {
        self.numerator.is_zero()
    }

    /// `|self - other|`, and whether `self` is the smaller of the two.
    pub(crate) fn abs_diff(&self, other: &Ratio) -> (bool, Ratio) {
        let left = &self.numerator * &other.denominator;
        let right = &other.numerator * &self.denominator;
        let denominator = &self.denominator * &other.denominator;

        if left >= right {
            (
                false,
                Ratio {
                    numerator: left - right,
                    denominator,
                },
            )
        } else {
            (
                true,
                Ratio {
                    numerator: right - left,
                    denominator,
                },
            )
        }
    }

    /// `floor(self * 2^scale)`, with the remainder and the divisor it is relative to.
    fn scaled(&self, scale: i64) -> (BigUint, BigUint, BigUint) {
        let (numerator, divisor) = if scale >= 0 {
            (&self.numerator << shift(scale), self.denominator.clone())
        } else {
            (self.numerator.clone(), &self.denominator << shift(scale))
        };
        let quotient = &numerator / &divisor;
        let remainder = numerator % &divisor;
        (quotient, remainder, divisor)
    }

    /// `floor(log2(self))` of a non-zero ratio.
    fn log2(&self) -> i64 {
        let estimate = bit_length(&self.numerator) - bit_length(&self.denominator);
        let below = if estimate >= 0 {
            self.numerator < (&self.denominator << shift(estimate))
        } else {
            (&self.numerator << shift(estimate)) < self.denominator
        };
        if below {
            estimate - 1
        } else {
            estimate
        }
    }

    /// Rounds to the nearest value of `shape`, ties to even.
    pub(crate) fn round(&self, shape: Shape) -> Rounded {
        if self.is_zero() {
            return Rounded::Zero;
        }

        let precision = i64::from(shape.precision);
        let mut exponent = self.log2().max(shape.min_exponent);
        let (mut significand, remainder, divisor) = self.scaled(precision - 1 - exponent);

        match (remainder << 1usize).cmp(&divisor) {
            Ordering::Greater => significand += 1u32,
            Ordering::Equal if significand.bit(0) => significand += 1u32,
            _ => {}
        }
        if significand.bits() > u64::from(shape.precision) {
            significand >>= 1usize;
            exponent += 1;
        }

        if exponent > shape.max_exponent {
            return Rounded::Infinite;
        }
        match significand.to_u128() {
            Some(0) => Rounded::Zero,
            Some(significand) => Rounded::Finite {
                exponent,
                significand,
            },
            // wider than any shape
            None => Rounded::Infinite,
        }
    }
}

/// A finite decimal literal `digits * 10^exponent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Decimal {
    /// Sign of the literal, kept for zero as well
    pub negative: bool,
    digits: BigUint,
    exponent: i64,
    /// Number of digits once leading zeros are dropped
    significant: i64,
}

impl Decimal {
    /// Parses `[+-]digits[.digits][(e|E)[+-]digits]`, where either digit run around the point
    /// may be empty but not both. Infinities and NaN are not decimal literals.
    pub(crate) fn parse(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        let (negative, rest) = match bytes.split_first() {
            Some((b'-', rest)) => (true, rest),
            Some((b'+', rest)) => (false, rest),
            _ => (false, bytes),
        };

        let (mantissa, exponent) = match rest.iter().position(|&b| matches!(b, b'e' | b'E')) {
            Some(at) => (&rest[..at], parse_exponent(&rest[at + 1..])?),
            None => (rest, 0),
        };
        let (integer, fraction) = match mantissa.iter().position(|&b| b == b'.') {
            Some(at) => (&mantissa[..at], &mantissa[at + 1..]),
            None => (mantissa, &mantissa[mantissa.len()..]),
        };
        if integer.is_empty() && fraction.is_empty() {
            return None;
        }
        if !integer.iter().chain(fraction).all(u8::is_ascii_digit) {
            return None;
        }

        let all: Vec<u8> = integer.iter().chain(fraction).copied().collect();
        let leading = all.iter().take_while(|&&digit| digit == b'0').count();
        let digits = if leading == all.len() {
            BigUint::zero()
        } else {
            BigUint::parse_bytes(&all[leading..], 10)?
        };

        Some(Decimal {
            negative,
            digits,
            exponent: exponent.saturating_sub(i64::try_from(fraction.len()).ok()?),
            significant: i64::try_from(all.len() - leading).ok()?,
        })
    }

    /// The exact magnitude, or `None` when it overflows every supported format.
    pub(crate) fn magnitude(&self) -> Option<Ratio> {
        if self.significant == 0 {
            return Some(Ratio::zero());
        }

        let scale = self.significant.saturating_add(self.exponent);
        if scale > OVERFLOW_DIGITS {
            return None;
        }
        if scale < UNDERFLOW_DIGITS {
            return Some(Ratio::zero());
        }

        let power = BigUint::from(10u32).pow(u32::try_from(self.exponent.unsigned_abs()).ok()?);
        Some(if self.exponent >= 0 {
            Ratio {
                numerator: &self.digits * power,
                denominator: BigUint::one(),
            }
        } else {
            Ratio {
                numerator: self.digits.clone(),
                denominator: power,
            }
        })
    }

    /// Rounds the magnitude to `shape`.
    pub(crate) fn round(&self, shape: Shape) -> Rounded {
        match self.magnitude() {
            Some(magnitude) => magnitude.round(shape),
            None => Rounded::Infinite,
        }
    }
}

/// Parses an optionally signed exponent, saturating far beyond any representable range.
fn parse_exponent(bytes: &[u8]) -> Option<i64> {
    let (negative, digits) = match bytes.split_first() {
        Some((b'-', rest)) => (true, rest),
        Some((b'+', rest)) => (false, rest),
        _ => (false, bytes),
    };
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }

    let value = digits.iter().fold(0i64, |value, digit| {
        value
            .saturating_mul(10)
            .saturating_add(i64::from(digit - b'0'))
            .min(i64::from(u32::MAX))
    });
    Some(if negative { -value } else { value })
}

fn bit_length(value: &BigUint) -> i64 {
    i64::try_from(value.bits()).unwrap_or(i64::MAX)
}

fn shift(exponent: i64) -> usize {
    usize::try_from(exponent.unsigned_abs()).unwrap_or(usize::MAX)
}
