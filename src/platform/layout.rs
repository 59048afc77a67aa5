//! Native size and alignment of primitive types.
//!
//! The values mirror what a C compiler (and therefore libffi) reports for the corresponding
//! types on each platform. The differences that matter in practice:
//!
//! | Platform              | `int64`/`double` align | `long double`           |
//! |-----------------------|------------------------|-------------------------|
//! | i386 System V         | 4                      | x87, 12 bytes, align 4  |
//! | i386 Darwin           | 4                      | x87, 16 bytes, align 16 |
//! | i386 / x86-64 Windows | 8                      | same as `double`        |
//! | x86-64 System V       | 8                      | x87, 16 bytes, align 16 |
//! | AArch64 Linux         | 8                      | binary128, 16 bytes     |
//! | AArch64 Darwin        | 8                      | same as `double`        |
//! | 32-bit ARM / MIPS     | 8                      | same as `double`        |
//! | PowerPC               | 8                      | double-double, 16 bytes |

use crate::{
    invoke::LongDoubleFormat,
    platform::{ByteOrder, Cpu, Os, Platform},
};

/// Size and alignment of a single native type, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeLayout {
    /// Size in bytes
    pub size: usize,
    /// Alignment in bytes (a power of two)
    pub alignment: usize,
}

impl TypeLayout {
    /// Creates a layout from a size and alignment.
    #[must_use]
    pub const fn new(size: usize, alignment: usize) -> Self {
        TypeLayout { size, alignment }
    }
}

/// Native layout of every primitive on one platform.
///
/// Raw encoders carry a copy of this table so that a single [`crate::invoke::Encoder`] value
/// has everything it needs to pack a frame without consulting the platform again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrimitiveLayout {
    /// `int8_t` / `uint8_t`
    pub sint8: TypeLayout,
    /// `int16_t` / `uint16_t`
    pub sint16: TypeLayout,
    /// `int32_t` / `uint32_t`
    pub sint32: TypeLayout,
    /// `int64_t` / `uint64_t`
    pub sint64: TypeLayout,
    /// C `long`
    pub long: TypeLayout,
    /// `float`
    pub float: TypeLayout,
    /// `double`
    pub double: TypeLayout,
    /// `long double`
    pub long_double: TypeLayout,
    /// Data pointer
    pub pointer: TypeLayout,
    /// Width of one raw argument slot (`sizeof(ffi_arg)`)
    pub slot_size: usize,
    /// Encoding of `long double`
    pub long_double_format: LongDoubleFormat,
    /// Byte order of multi-byte values
    pub byte_order: ByteOrder,
}

impl PrimitiveLayout {
    pub(crate) fn for_platform(platform: &Platform) -> Self {
        let pointer_bytes = platform.address_size() / 8;
        let long_bytes = platform.long_size() / 8;
        let wide_align = match (platform.cpu(), platform.os()) {
            (Cpu::I386, Os::Windows) => 8,
            (Cpu::I386, _) => 4,
            _ => 8,
        };

        let double = TypeLayout::new(8, wide_align);
        let (long_double, long_double_format) = match (platform.cpu(), platform.os()) {
            (Cpu::I386 | Cpu::X86_64, Os::Windows) => (double, LongDoubleFormat::Double),
            (Cpu::I386, Os::Darwin) => (TypeLayout::new(16, 16), LongDoubleFormat::X87),
            (Cpu::I386, _) => (TypeLayout::new(12, 4), LongDoubleFormat::X87),
            (Cpu::X86_64, _) => (TypeLayout::new(16, 16), LongDoubleFormat::X87),
            (Cpu::Aarch64, Os::Darwin | Os::Windows) => (double, LongDoubleFormat::Double),
            (Cpu::Arm | Cpu::Mips | Cpu::Unknown, _) => (double, LongDoubleFormat::Double),
            (Cpu::Ppc | Cpu::Ppc64 | Cpu::Ppc64le, _) => {
                (TypeLayout::new(16, 16), LongDoubleFormat::DoubleDouble)
            }
            (Cpu::Sparc, _) => (TypeLayout::new(16, 8), LongDoubleFormat::Binary128),
            _ => (TypeLayout::new(16, 16), LongDoubleFormat::Binary128),
        };

        PrimitiveLayout {
            sint8: TypeLayout::new(1, 1),
            sint16: TypeLayout::new(2, 2),
            sint32: TypeLayout::new(4, 4),
            sint64: TypeLayout::new(8, wide_align),
            long: TypeLayout::new(long_bytes, long_bytes.min(wide_align)),
            float: TypeLayout::new(4, 4),
            double,
            long_double,
            pointer: TypeLayout::new(pointer_bytes, pointer_bytes),
            slot_size: pointer_bytes,
            long_double_format,
            byte_order: platform.byte_order(),
        }
    }
}
