//! Conversion of values into the platform's `long double` representation.
//!
//! `long double` has no Rust primitive. The encoders produce its bytes directly from an `f64`
//! (or a decimal string) in one of the formats C compilers use:
//!
//! - [`LongDoubleFormat::Double`] - `long double` is plain `double` (Windows, 32-bit ARM,
//!   Apple AArch64)
//! - [`LongDoubleFormat::X87`] - 80-bit x87 extended precision, zero padded to the type size
//! - [`LongDoubleFormat::Binary128`] - IEEE-754 quadruple precision
//! - [`LongDoubleFormat::DoubleDouble`] - IBM double-double (PowerPC), a pair of doubles
//!
//! Every `f64` is exactly representable in each of these formats, so conversion from `f64` only
//! fails when the destination is too small. Decimal strings are rounded straight to the
//! format's own precision, so `"0.1"` gets all 64 x87 significand bits rather than the 53 an
//! `f64` would carry.

use strum::Display;

use crate::{
    invoke::{
        decimal::{Decimal, Ratio, Rounded, Shape},
        io::{write_be_at, write_le_at, NativeIO},
    },
    platform::ByteOrder,
    Error::{self, OutOfBounds},
    Result,
};

const F64_FRACTION_BITS: u32 = 52;
const F64_FRACTION_MASK: u64 = (1 << F64_FRACTION_BITS) - 1;
const F64_EXPONENT_MAX: u64 = 0x7ff;
// Re-biasing from the f64 exponent bias (1023) to the 15-bit bias (16383)
const REBIAS: u64 = 16383 - 1023;
const EXTENDED_EXPONENT_MAX: u64 = 0x7fff;

/// Binary representation of `long double`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum LongDoubleFormat {
    /// Same as `double`
    Double,
    /// x87 80-bit extended precision
    X87,
    /// IEEE-754 binary128
    Binary128,
    /// IBM double-double
    DoubleDouble,
}

impl LongDoubleFormat {
    /// Number of significant bytes the format writes; any remaining bytes of the destination
    /// are padding and are zeroed.
    #[must_use]
    pub fn encoded_len(self) -> usize {
        match self {
            LongDoubleFormat::Double => 8,
            LongDoubleFormat::X87 => 10,
            LongDoubleFormat::Binary128 | LongDoubleFormat::DoubleDouble => 16,
        }
    }

    /// Encodes `value` into `out`.
    ///
    /// x87 values are always stored little-endian; the other formats follow `order`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if `out` is shorter than
    /// [`LongDoubleFormat::encoded_len`].
    pub fn encode_f64(self, value: f64, order: ByteOrder, out: &mut [u8]) -> Result<()> {
        if out.len() < self.encoded_len() {
            return Err(OutOfBounds);
        }
        out.fill(0);

        let mut offset = 0;
        match self {
            LongDoubleFormat::Double => write(out, &mut offset, value, order),
            LongDoubleFormat::X87 => {
                let (sign_exponent, significand) = to_x87(value);
                write_le_at(out, &mut offset, significand)?;
                write_le_at(out, &mut offset, sign_exponent)
            }
            LongDoubleFormat::Binary128 => write(out, &mut offset, to_binary128(value), order),
            LongDoubleFormat::DoubleDouble => {
                write(out, &mut offset, value, order)?;
                write(out, &mut offset, 0.0f64, order)
            }
        }
    }

    /// Parses a decimal string and encodes it into `out`, correctly rounded to the precision
    /// of the format.
    ///
    /// Accepts everything `f64` parsing does, including `inf` and `NaN`. Values beyond the
    /// `f64` range stay finite when the format can hold them.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LongDoubleConversion`] if `text` is not a valid decimal number,
    /// or [`crate::Error::OutOfBounds`] if `out` is too small.
    pub fn encode_str(self, text: &str, order: ByteOrder, out: &mut [u8]) -> Result<()> {
        let text = text.trim();
        let value: f64 = text.parse().map_err(|_| {
            Error::LongDoubleConversion(format!("'{text}' is not a decimal number"))
        })?;
        let Some(decimal) = Decimal::parse(text) else {
            return self.encode_f64(value, order, out);
        };

        if out.len() < self.encoded_len() {
            return Err(OutOfBounds);
        }
        out.fill(0);

        let mut offset = 0;
        match self {
            LongDoubleFormat::Double => write(out, &mut offset, value, order),
            LongDoubleFormat::X87 => {
                let (sign_exponent, significand) =
                    x87_from(decimal.negative, decimal.round(Shape::X87));
                write_le_at(out, &mut offset, significand)?;
                write_le_at(out, &mut offset, sign_exponent)
            }
            LongDoubleFormat::Binary128 => {
                let bits = binary128_from(decimal.negative, decimal.round(Shape::BINARY128));
                write(out, &mut offset, bits, order)
            }
            LongDoubleFormat::DoubleDouble => {
                let (high, low) = double_double(&decimal);
                write(out, &mut offset, high, order)?;
                write(out, &mut offset, low, order)
            }
        }
    }
}

fn write<T: NativeIO>(out: &mut [u8], offset: &mut usize, value: T, order: ByteOrder) -> Result<()> {
    match order {
        ByteOrder::LittleEndian => write_le_at(out, offset, value),
        ByteOrder::BigEndian => write_be_at(out, offset, value),
    }
}

/// Splits an f64 into sign, biased exponent (15-bit bias) and a normalised fraction whose
/// leading one sits just above bit 52.
fn decompose(value: f64) -> (u64, u64, u64) {
    let bits = value.to_bits();
    let sign = bits >> 63;
    let exponent = (bits >> F64_FRACTION_BITS) & F64_EXPONENT_MAX;
    let fraction = bits & F64_FRACTION_MASK;

    match exponent {
        0 if fraction == 0 => (sign, 0, 0),
        0 => {
            // subnormal: renormalise so the leading one becomes the implicit bit
            let top = u64::from(63 - fraction.leading_zeros());
            let shifted = (fraction << (u64::from(F64_FRACTION_BITS) - top)) & F64_FRACTION_MASK;
            (sign, top + REBIAS + 1 - u64::from(F64_FRACTION_BITS), shifted)
        }
        F64_EXPONENT_MAX => (sign, EXTENDED_EXPONENT_MAX, fraction),
        _ => (sign, exponent + REBIAS, fraction),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_x87(value: f64) -> (u16, u64) {
    let (sign, exponent, fraction) = decompose(value);
    let integer_bit = if exponent == 0 { 0 } else { 1u64 << 63 };
    let significand = integer_bit | (fraction << 11);
    (((sign << 15) | exponent) as u16, significand)
}

fn to_binary128(value: f64) -> u128 {
    let (sign, exponent, fraction) = decompose(value);
    (u128::from(sign) << 127) | (u128::from(exponent) << 112) | (u128::from(fraction) << 60)
}

/// Biased exponent of a rounded value whose leading bit is `top`; zero for subnormals.
#[allow(clippy::cast_sign_loss)]
fn biased(exponent: i64, significand: u128, top: u32, bias: i64) -> u128 {
    if significand >> top == 0 {
        0
    } else {
        (exponent + bias) as u128
    }
}

#[allow(clippy::cast_possible_truncation)]
fn x87_from(negative: bool, rounded: Rounded) -> (u16, u64) {
    let sign = u16::from(negative) << 15;
    match rounded {
        Rounded::Zero => (sign, 0),
        Rounded::Infinite => (sign | EXTENDED_EXPONENT_MAX as u16, 1 << 63),
        Rounded::Finite {
            exponent,
            significand,
        } => {
            let exponent = biased(exponent, significand, 63, 16383) as u16;
            (sign | exponent, significand as u64)
        }
    }
}

fn binary128_from(negative: bool, rounded: Rounded) -> u128 {
    let sign = u128::from(negative) << 127;
    match rounded {
        Rounded::Zero => sign,
        Rounded::Infinite => sign | (u128::from(EXTENDED_EXPONENT_MAX) << 112),
        Rounded::Finite {
            exponent,
            significand,
        } => {
            let fraction = significand & ((1 << 112) - 1);
            sign | (biased(exponent, significand, 112, 16383) << 112) | fraction
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn f64_from(negative: bool, rounded: Rounded) -> f64 {
    let sign = u64::from(negative) << 63;
    let bits = match rounded {
        Rounded::Zero => sign,
        Rounded::Infinite => sign | (F64_EXPONENT_MAX << F64_FRACTION_BITS),
        Rounded::Finite {
            exponent,
            significand,
        } => {
            let exponent = biased(exponent, significand, F64_FRACTION_BITS, 1023) as u64;
            sign | (exponent << F64_FRACTION_BITS) | (significand as u64 & F64_FRACTION_MASK)
        }
    };
    f64::from_bits(bits)
}

/// The nearest double and the nearest double to what it leaves over.
fn double_double(decimal: &Decimal) -> (f64, f64) {
    let Some(magnitude) = decimal.magnitude() else {
        return (f64_from(decimal.negative, Rounded::Infinite), 0.0);
    };

    let high = magnitude.round(Shape::BINARY64);
    let Rounded::Finite {
        exponent,
        significand,
    } = high
    else {
        return (f64_from(decimal.negative, high), 0.0);
    };

    let scale = exponent - i64::from(F64_FRACTION_BITS);
    let (below, rest) = magnitude.abs_diff(&Ratio::from_binary(significand, scale));
    let low = if rest.is_zero() {
        0.0
    } else {
        f64_from(decimal.negative != below, rest.round(Shape::BINARY64))
    };
    (f64_from(decimal.negative, high), low)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x87(value: f64) -> [u8; 16] {
        let mut out = [0xAAu8; 16];
        LongDoubleFormat::X87
            .encode_f64(value, ByteOrder::LittleEndian, &mut out)
            .unwrap();
        out
    }

    #[test]
    fn x87_known_values() {
        // 1.0 = exponent 0x3fff, significand 0x8000000000000000
        let out = x87(1.0);
        assert_eq!(&out[..10], &[0, 0, 0, 0, 0, 0, 0, 0x80, 0xff, 0x3f]);
        assert_eq!(&out[10..], &[0; 6]);

        // -2.0 = sign set, exponent 0x4000
        let out = x87(-2.0);
        assert_eq!(&out[..10], &[0, 0, 0, 0, 0, 0, 0, 0x80, 0x00, 0xc0]);

        // 0.0 is all zero
        assert_eq!(x87(0.0), [0; 16]);

        // infinity
        let out = x87(f64::INFINITY);
        assert_eq!(&out[..10], &[0, 0, 0, 0, 0, 0, 0, 0x80, 0xff, 0x7f]);
    }

    #[test]
    fn x87_subnormal() {
        // smallest positive subnormal = 2^-1074 => exponent 16383 - 1074
        let (sign_exponent, significand) = to_x87(f64::from_bits(1));
        assert_eq!(sign_exponent, 16383 - 1074);
        assert_eq!(significand, 1u64 << 63);

        // largest subnormal keeps all 52 fraction bits below the integer bit
        let (sign_exponent, significand) = to_x87(f64::from_bits(F64_FRACTION_MASK));
        assert_eq!(sign_exponent, 16383 - 1023);
        assert_eq!(significand, F64_FRACTION_MASK << 12);
    }

    #[test]
    fn binary128_known_values() {
        assert_eq!(to_binary128(1.0), 0x3fff_u128 << 112);
        assert_eq!(to_binary128(-0.0), 1u128 << 127);
        assert_eq!(to_binary128(1.5), (0x3fff_u128 << 112) | (1u128 << 111));

        let mut out = [0u8; 16];
        LongDoubleFormat::Binary128
            .encode_f64(1.0, ByteOrder::BigEndian, &mut out)
            .unwrap();
        assert_eq!(&out[..2], &[0x3f, 0xff]);
        assert_eq!(&out[2..], &[0; 14]);
    }

    #[test]
    fn double_and_double_double() {
        let mut out = [0xAAu8; 8];
        LongDoubleFormat::Double
            .encode_f64(3.14, ByteOrder::LittleEndian, &mut out)
            .unwrap();
        assert_eq!(out, 3.14f64.to_le_bytes());

        let mut out = [0xAAu8; 16];
        LongDoubleFormat::DoubleDouble
            .encode_f64(3.14, ByteOrder::BigEndian, &mut out)
            .unwrap();
        assert_eq!(&out[..8], &3.14f64.to_be_bytes());
        assert_eq!(&out[8..], &[0; 8]);
    }

    #[test]
    fn from_string() {
        let mut parsed = [0u8; 16];
        LongDoubleFormat::X87
            .encode_str(" 1.0e0 ", ByteOrder::LittleEndian, &mut parsed)
            .unwrap();
        assert_eq!(parsed, x87(1.0));

        let result = LongDoubleFormat::X87.encode_str("1,5", ByteOrder::LittleEndian, &mut parsed);
        assert!(matches!(result, Err(Error::LongDoubleConversion(_))));
    }

    fn encode_str(format: LongDoubleFormat, text: &str, order: ByteOrder) -> [u8; 16] {
        let mut out = [0xAAu8; 16];
        format.encode_str(text, order, &mut out).unwrap();
        out
    }

    #[test]
    fn x87_string_keeps_full_precision() {
        let out = encode_str(LongDoubleFormat::X87, "0.1", ByteOrder::LittleEndian);
        assert_eq!(&out[..8], &0xCCCC_CCCC_CCCC_CCCDu64.to_le_bytes());
        assert_eq!(&out[8..10], &0x3ffbu16.to_le_bytes());
        assert_eq!(&out[10..], &[0; 6]);

        // the f64 path can only carry 53 bits
        assert_ne!(out, x87(0.1));
    }

    #[test]
    fn binary128_string_keeps_full_precision() {
        let out = encode_str(LongDoubleFormat::Binary128, "0.1", ByteOrder::BigEndian);
        assert_eq!(out, 0x3ffb_9999_9999_9999_9999_9999_9999_999a_u128.to_be_bytes());

        let out = encode_str(LongDoubleFormat::Binary128, "-1.5", ByteOrder::LittleEndian);
        assert_eq!(out, ((0xbfff_u128 << 112) | (1u128 << 111)).to_le_bytes());
    }

    #[test]
    fn double_double_string_splits_the_remainder() {
        let out = encode_str(LongDoubleFormat::DoubleDouble, "0.1", ByteOrder::BigEndian);
        let high = f64::from_be_bytes(out[..8].try_into().unwrap());
        let low = f64::from_be_bytes(out[8..].try_into().unwrap());
        assert_eq!(high, 0.1);
        assert!(low < 0.0);
        assert!(low.abs() <= f64::EPSILON * high / 2.0);

        let out = encode_str(LongDoubleFormat::DoubleDouble, "2.5", ByteOrder::BigEndian);
        assert_eq!(&out[..8], &2.5f64.to_be_bytes());
        assert_eq!(&out[8..], &[0; 8]);
    }

    #[test]
    fn string_range_and_specials() {
        // beyond f64 but within the extended exponent range
        let out = encode_str(LongDoubleFormat::X87, "1e4000", ByteOrder::LittleEndian);
        let exponent = u16::from_le_bytes([out[8], out[9]]);
        assert!(exponent > 0x3fff + 1023 && exponent < 0x7fff);

        let out = encode_str(LongDoubleFormat::X87, "1e5000", ByteOrder::LittleEndian);
        assert_eq!(&out[..10], &[0, 0, 0, 0, 0, 0, 0, 0x80, 0xff, 0x7f]);

        let out = encode_str(LongDoubleFormat::X87, "-inf", ByteOrder::LittleEndian);
        assert_eq!(out, x87(f64::NEG_INFINITY));

        let out = encode_str(LongDoubleFormat::X87, "-0.0", ByteOrder::LittleEndian);
        assert_eq!(&out[..10], &[0, 0, 0, 0, 0, 0, 0, 0, 0, 0x80]);

        let out = encode_str(LongDoubleFormat::Double, "0.1", ByteOrder::LittleEndian);
        assert_eq!(&out[..8], &0.1f64.to_le_bytes());
    }

    #[test]
    fn destination_too_small() {
        let mut out = [0u8; 9];
        let result = LongDoubleFormat::X87.encode_f64(1.0, ByteOrder::LittleEndian, &mut out);
        assert!(matches!(result, Err(OutOfBounds)));
        let result = LongDoubleFormat::X87.encode_str("0.1", ByteOrder::LittleEndian, &mut out);
        assert!(matches!(result, Err(OutOfBounds)));
    }
}
