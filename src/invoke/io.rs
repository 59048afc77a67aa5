//! Endian-aware primitive writers for argument buffers.
//!
//! This module provides the lowest layer of argument packing: writing a primitive of a fixed
//! width at a given offset of a byte buffer, in one of two byte orders.
//!
//! # Architecture
//!
//! - [`NativeIO`] converts every primitive to and from its little- and big-endian byte arrays.
//! - [`write_le_at`] / [`write_be_at`] (and the matching readers) perform a single bounds-checked
//!   access at an offset and advance it.
//! - [`ByteWriter`] is the closed family of four writers (byte order × address width) the
//!   encoders are parameterised with. Floating point values are written through their raw bit
//!   patterns; addresses are written as 32- or 64-bit integers depending on the instance.
//!
//! # Error Handling
//!
//! Every write returns [`crate::Error::OutOfBounds`] instead of touching the buffer when the
//! value does not fit at the requested offset.
//!
//! # Examples
//!
//! ```rust
//! use callpack::invoke::ByteWriter;
//!
//! let mut buffer = [0u8; 8];
//! ByteWriter::Be64.put_int(&mut buffer, 4, 0x0102_0304)?;
//! assert_eq!(buffer, [0, 0, 0, 0, 1, 2, 3, 4]);
//!
//! ByteWriter::Le32.put_address(&mut buffer, 0, 0xdead_beef)?;
//! assert_eq!(&buffer[..4], &[0xef, 0xbe, 0xad, 0xde]);
//! # Ok::<(), callpack::Error>(())
//! ```
//!
//! # Thread Safety
//!
//! All functions are pure and [`ByteWriter`] is a stateless `Copy` value.

use crate::{
    platform::{ByteOrder, Platform},
    Error::OutOfBounds,
    Result,
};

/// Trait for primitives that can be converted to and from fixed-size byte arrays in either
/// byte order.
pub trait NativeIO: Sized + Copy {
    /// Byte array type holding the encoded value (e.g. `[u8; 4]` for `u32`).
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
    /// Read T from a byte buffer in big-endian
    fn from_be_bytes(bytes: Self::Bytes) -> Self;

    /// Write T to a byte buffer in little-endian
    fn to_le_bytes(self) -> Self::Bytes;
    /// Write T to a byte buffer in big-endian
    fn to_be_bytes(self) -> Self::Bytes;
}

macro_rules! impl_native_io {
    ($($ty:ty),* $(,)?) => {
        $(
            impl NativeIO for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn from_be_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_be_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }

                fn to_be_bytes(self) -> Self::Bytes {
                    <$ty>::to_be_bytes(self)
                }
            }
        )*
    };
}

impl_native_io!(u8, i8, u16, i16, u32, i32, u64, i64, u128, f32, f64);

/// Writes `value` in little-endian byte order at `offset` and advances the offset.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if the value does not fit; the buffer is untouched.
pub fn write_le_at<T: NativeIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    copy_at(data, offset, value.to_le_bytes().as_ref())
}

/// Writes `value` in big-endian byte order at `offset` and advances the offset.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if the value does not fit; the buffer is untouched.
pub fn write_be_at<T: NativeIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    copy_at(data, offset, value.to_be_bytes().as_ref())
}

/// Reads a little-endian value at `offset` and advances the offset.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le_at<T: NativeIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let bytes = slice_at::<T>(data, offset)?;
    Ok(T::from_le_bytes(bytes))
}

/// Reads a big-endian value at `offset` and advances the offset.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_be_at<T: NativeIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let bytes = slice_at::<T>(data, offset)?;
    Ok(T::from_be_bytes(bytes))
}

/// Reads a value in `order` at a fixed offset.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_at<T: NativeIO>(data: &[u8], offset: usize, order: ByteOrder) -> Result<T> {
    let mut offset = offset;
    match order {
        ByteOrder::LittleEndian => read_le_at(data, &mut offset),
        ByteOrder::BigEndian => read_be_at(data, &mut offset),
    }
}

fn copy_at(data: &mut [u8], offset: &mut usize, bytes: &[u8]) -> Result<()> {
    let end = offset.checked_add(bytes.len()).ok_or(OutOfBounds)?;
    let Some(target) = data.get_mut(*offset..end) else {
        return Err(OutOfBounds);
    };

    target.copy_from_slice(bytes);
    *offset = end;
    Ok(())
}

fn slice_at<T: NativeIO>(data: &[u8], offset: &mut usize) -> Result<T::Bytes> {
    let type_len = std::mem::size_of::<T>();
    let end = offset.checked_add(type_len).ok_or(OutOfBounds)?;
    let Some(source) = data.get(*offset..end) else {
        return Err(OutOfBounds);
    };

    let Ok(bytes) = source.try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;
    Ok(bytes)
}

/// Primitive writer for one byte order and address width.
///
/// The four instances are the only ones that exist; an encoder picks one once and every put
/// of every buffer goes through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteWriter {
    /// Little-endian, 32-bit addresses
    Le32,
    /// Little-endian, 64-bit addresses
    Le64,
    /// Big-endian, 32-bit addresses
    Be32,
    /// Big-endian, 64-bit addresses
    Be64,
}

impl ByteWriter {
    /// Writer for a byte order and address width in bits.
    #[must_use]
    pub fn new(order: ByteOrder, address_size: usize) -> Self {
        match (order, address_size == 64) {
            (ByteOrder::LittleEndian, false) => ByteWriter::Le32,
            (ByteOrder::LittleEndian, true) => ByteWriter::Le64,
            (ByteOrder::BigEndian, false) => ByteWriter::Be32,
            (ByteOrder::BigEndian, true) => ByteWriter::Be64,
        }
    }

    /// Writer matching a platform's byte order and address width.
    #[must_use]
    pub fn for_platform(platform: &Platform) -> Self {
        Self::new(platform.byte_order(), platform.address_size())
    }

    /// Byte order of this writer
    #[must_use]
    pub fn byte_order(self) -> ByteOrder {
        match self {
            ByteWriter::Le32 | ByteWriter::Le64 => ByteOrder::LittleEndian,
            ByteWriter::Be32 | ByteWriter::Be64 => ByteOrder::BigEndian,
        }
    }

    /// Width of an address in bytes
    #[must_use]
    pub fn address_bytes(self) -> usize {
        match self {
            ByteWriter::Le32 | ByteWriter::Be32 => 4,
            ByteWriter::Le64 | ByteWriter::Be64 => 8,
        }
    }

    #[inline]
    fn write<T: NativeIO>(self, buffer: &mut [u8], offset: usize, value: T) -> Result<()> {
        let mut offset = offset;
        match self.byte_order() {
            ByteOrder::LittleEndian => write_le_at(buffer, &mut offset, value),
            ByteOrder::BigEndian => write_be_at(buffer, &mut offset, value),
        }
    }

    /// Writes an 8-bit value.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the value does not fit.
    #[inline]
    pub fn put_byte(self, buffer: &mut [u8], offset: usize, value: i8) -> Result<()> {
        self.write(buffer, offset, value)
    }

    /// Writes a 16-bit value.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the value does not fit.
    #[inline]
    pub fn put_short(self, buffer: &mut [u8], offset: usize, value: i16) -> Result<()> {
        self.write(buffer, offset, value)
    }

    /// Writes a 32-bit value.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the value does not fit.
    #[inline]
    pub fn put_int(self, buffer: &mut [u8], offset: usize, value: i32) -> Result<()> {
        self.write(buffer, offset, value)
    }

    /// Writes a 64-bit value.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the value does not fit.
    #[inline]
    pub fn put_long(self, buffer: &mut [u8], offset: usize, value: i64) -> Result<()> {
        self.write(buffer, offset, value)
    }

    /// Writes the raw bit pattern of a `f32` as a 32-bit value.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the value does not fit.
    #[inline]
    #[allow(clippy::cast_possible_wrap)]
    pub fn put_float(self, buffer: &mut [u8], offset: usize, value: f32) -> Result<()> {
        self.put_int(buffer, offset, value.to_bits() as i32)
    }

    /// Writes the raw bit pattern of a `f64` as a 64-bit value.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the value does not fit.
    #[inline]
    #[allow(clippy::cast_possible_wrap)]
    pub fn put_double(self, buffer: &mut [u8], offset: usize, value: f64) -> Result<()> {
        self.put_long(buffer, offset, value.to_bits() as i64)
    }

    /// Writes an address; 32-bit instances keep the low 32 bits.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the value does not fit.
    #[inline]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn put_address(self, buffer: &mut [u8], offset: usize, value: u64) -> Result<()> {
        match self {
            ByteWriter::Le32 | ByteWriter::Be32 => self.put_int(buffer, offset, value as u32 as i32),
            ByteWriter::Le64 | ByteWriter::Be64 => self.put_long(buffer, offset, value as i64),
        }
    }
}
