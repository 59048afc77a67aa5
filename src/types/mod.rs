//! Native type descriptors and call signatures.
//!
//! A [`Type`] describes one native parameter: its semantic [`NativeType`] plus the size and
//! alignment the platform assigns it. Primitive descriptors are created from a
//! [`crate::platform::Platform`]; aggregates are laid out from their fields with the C rules
//! or given an explicit layout.
//!
//! A [`CallContext`] is the signature an [`crate::InvocationBuffer`] is built for. It owns the
//! ordered parameter types and precomputes the raw parameter size used by the raw encoders.
//!
//! # Examples
//!
//! ```rust
//! use callpack::{CallContext, Type};
//!
//! let point = Type::aggregate(&[Type::sint32(), Type::sint32()]);
//! assert_eq!(point.size(), 8);
//! assert_eq!(point.alignment(), 4);
//!
//! let context = CallContext::new(Type::void(), vec![Type::sint8(), point, Type::pointer()]);
//! assert_eq!(context.parameter_count(), 3);
//! ```

mod context;

use strum::{Display, EnumIter};

use crate::{
    platform::{Platform, TypeLayout},
    utils::align_up,
};

pub use context::{CallContext, CallContextBuilder, CallFlags, CallingConvention};

/// Semantic kind of a native value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum NativeType {
    /// No value; only meaningful as a return type
    Void,
    /// Signed 8-bit integer
    SInt8,
    /// Unsigned 8-bit integer
    UInt8,
    /// Signed 16-bit integer
    SInt16,
    /// Unsigned 16-bit integer
    UInt16,
    /// Signed 32-bit integer
    SInt32,
    /// Unsigned 32-bit integer
    UInt32,
    /// Signed C `long`
    SLong,
    /// Unsigned C `long`
    ULong,
    /// Signed 64-bit integer
    SInt64,
    /// Unsigned 64-bit integer
    UInt64,
    /// IEEE-754 single precision
    Float,
    /// IEEE-754 double precision
    Double,
    /// Platform extended precision (`long double`)
    LongDouble,
    /// Data pointer / address
    Pointer,
    /// Aggregate passed by value
    Struct,
    /// Opaque reference resolved by the call bridge
    Object,
}

impl NativeType {
    /// Returns `true` for the integer kinds.
    #[must_use]
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            NativeType::SInt8
                | NativeType::UInt8
                | NativeType::SInt16
                | NativeType::UInt16
                | NativeType::SInt32
                | NativeType::UInt32
                | NativeType::SLong
                | NativeType::ULong
                | NativeType::SInt64
                | NativeType::UInt64
        )
    }

    /// Native layout of this kind on `platform`. Aggregates have no intrinsic layout and
    /// report `None`.
    #[must_use]
    pub fn layout(self, platform: &Platform) -> Option<TypeLayout> {
        let layout = platform.layout();
        Some(match self {
            NativeType::Void => TypeLayout::new(0, 1),
            NativeType::SInt8 | NativeType::UInt8 => layout.sint8,
            NativeType::SInt16 | NativeType::UInt16 => layout.sint16,
            NativeType::SInt32 | NativeType::UInt32 => layout.sint32,
            NativeType::SLong | NativeType::ULong => layout.long,
            NativeType::SInt64 | NativeType::UInt64 => layout.sint64,
            NativeType::Float => layout.float,
            NativeType::Double => layout.double,
            NativeType::LongDouble => layout.long_double,
            NativeType::Pointer | NativeType::Object => layout.pointer,
            NativeType::Struct => return None,
        })
    }
}

/// Descriptor of one native parameter or return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Type {
    kind: NativeType,
    size: usize,
    alignment: usize,
}

impl Type {
    /// Descriptor for a primitive kind on `platform`.
    ///
    /// # Panics
    ///
    /// Panics if `kind` is [`NativeType::Struct`]; aggregates are built with
    /// [`Type::aggregate`] or [`Type::aggregate_with_layout`].
    #[must_use]
    pub fn primitive(kind: NativeType, platform: &Platform) -> Self {
        let Some(layout) = kind.layout(platform) else {
            panic!("aggregates have no primitive layout");
        };
        Type {
            kind,
            size: layout.size,
            alignment: layout.alignment,
        }
    }

    /// Aggregate laid out from `fields` with C struct rules: every field is placed at its
    /// alignment and the total size is rounded up to the largest field alignment.
    #[must_use]
    pub fn aggregate(fields: &[Type]) -> Self {
        let mut offset = 0;
        let mut alignment = 1;
        for field in fields {
            offset = align_up(offset, field.alignment);
            offset += field.size;
            alignment = alignment.max(field.alignment);
        }

        Type {
            kind: NativeType::Struct,
            size: align_up(offset, alignment),
            alignment,
        }
    }

    /// Aggregate with an explicitly known size and alignment.
    ///
    /// # Panics
    ///
    /// Panics if `alignment` is not a power of two.
    #[must_use]
    pub fn aggregate_with_layout(size: usize, alignment: usize) -> Self {
        assert!(alignment.is_power_of_two(), "alignment must be a power of two");
        Type {
            kind: NativeType::Struct,
            size,
            alignment,
        }
    }

    /// `void` on the native platform
    #[must_use]
    pub fn void() -> Self {
        Self::primitive(NativeType::Void, Platform::native())
    }

    /// `int8_t` on the native platform
    #[must_use]
    pub fn sint8() -> Self {
        Self::primitive(NativeType::SInt8, Platform::native())
    }

    /// `int16_t` on the native platform
    #[must_use]
    pub fn sint16() -> Self {
        Self::primitive(NativeType::SInt16, Platform::native())
    }

    /// `int32_t` on the native platform
    #[must_use]
    pub fn sint32() -> Self {
        Self::primitive(NativeType::SInt32, Platform::native())
    }

    /// `int64_t` on the native platform
    #[must_use]
    pub fn sint64() -> Self {
        Self::primitive(NativeType::SInt64, Platform::native())
    }

    /// `float` on the native platform
    #[must_use]
    pub fn float() -> Self {
        Self::primitive(NativeType::Float, Platform::native())
    }

    /// `double` on the native platform
    #[must_use]
    pub fn double() -> Self {
        Self::primitive(NativeType::Double, Platform::native())
    }

    /// `long double` on the native platform
    #[must_use]
    pub fn long_double() -> Self {
        Self::primitive(NativeType::LongDouble, Platform::native())
    }

    /// Data pointer on the native platform
    #[must_use]
    pub fn pointer() -> Self {
        Self::primitive(NativeType::Pointer, Platform::native())
    }

    /// Semantic kind
    #[must_use]
    pub fn kind(&self) -> NativeType {
        self.kind
    }

    /// Size in bytes
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Alignment in bytes
    #[must_use]
    pub fn alignment(&self) -> usize {
        self.alignment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Cpu, Os};

    #[test]
    fn primitive_sizes() {
        let platform = Platform::new(Cpu::X86_64, Os::Linux);
        let long = Type::primitive(NativeType::SInt64, &platform);
        assert_eq!((long.size(), long.alignment()), (8, 8));

        let i386 = Platform::new(Cpu::I386, Os::Linux);
        let long = Type::primitive(NativeType::SInt64, &i386);
        assert_eq!((long.size(), long.alignment()), (8, 4));
        let ptr = Type::primitive(NativeType::Pointer, &i386);
        assert_eq!(ptr.size(), 4);
    }

    #[test]
    fn aggregate_layout() {
        let platform = Platform::new(Cpu::X86_64, Os::Linux);
        let byte = Type::primitive(NativeType::SInt8, &platform);
        let int = Type::primitive(NativeType::SInt32, &platform);
        let double = Type::primitive(NativeType::Double, &platform);

        // struct { char a; double b; char c; }
        let s = Type::aggregate(&[byte, double, byte]);
        assert_eq!(s.kind(), NativeType::Struct);
        assert_eq!(s.size(), 24);
        assert_eq!(s.alignment(), 8);

        // struct { char a; char b; int c; }
        let s = Type::aggregate(&[byte, byte, int]);
        assert_eq!(s.size(), 8);
        assert_eq!(s.alignment(), 4);

        let empty = Type::aggregate(&[]);
        assert_eq!((empty.size(), empty.alignment()), (0, 1));
    }

    #[test]
    fn nested_aggregate() {
        let platform = Platform::new(Cpu::I386, Os::Linux);
        let int = Type::primitive(NativeType::SInt32, &platform);
        let long = Type::primitive(NativeType::SInt64, &platform);
        let inner = Type::aggregate(&[int, long]);
        assert_eq!((inner.size(), inner.alignment()), (12, 4));

        let outer = Type::aggregate(&[Type::primitive(NativeType::SInt8, &platform), inner]);
        assert_eq!((outer.size(), outer.alignment()), (16, 4));
    }

    #[test]
    #[should_panic(expected = "aggregates have no primitive layout")]
    fn struct_is_not_primitive() {
        let _ = Type::primitive(NativeType::Struct, Platform::native());
    }

    #[test]
    fn integer_kinds() {
        assert!(NativeType::ULong.is_integer());
        assert!(!NativeType::Pointer.is_integer());
        assert!(!NativeType::Float.is_integer());
    }
}
