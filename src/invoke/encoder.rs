//! Argument packing strategies.
//!
//! An [`Encoder`] decides where each argument of a call lands in the parameter buffer. There
//! are exactly three strategies:
//!
//! | Strategy             | Buffer size              | Per-value placement                               |
//! |----------------------|--------------------------|---------------------------------------------------|
//! | [`Encoder::Default`] | `count * 8`              | one 8-byte slot per value, no alignment           |
//! | [`Encoder::Raw`]     | raw parameter size       | aligned to `max(type alignment, slot)`, natural size |
//! | [`Encoder::RawI386`] | raw parameter size       | 4 bytes, 8 for `int64`/`double`, never padded     |
//!
//! Both raw strategies compute a signature's frame size with the same placement rules they
//! pack with, see [`raw_parameter_size`].
//!
//! The default strategy feeds a generic argument array where each slot is wide enough for any
//! primitive. The raw strategies reproduce the native stack frame so the buffer can be handed
//! to the callee as is.
//!
//! Every put takes the current cursor and returns the cursor after the value. Writing a zero
//! address is skipped because parameter buffers start zeroed; the bounds are still checked.
//!
//! # Examples
//!
//! ```rust
//! use callpack::{
//!     invoke::Encoder,
//!     platform::{Cpu, Os, Platform},
//! };
//!
//! let encoder = Encoder::select(&Platform::new(Cpu::X86_64, Os::Linux), true);
//! let mut buffer = [0u8; 16];
//!
//! let cursor = encoder.put_byte(&mut buffer, 0, 7)?;
//! let cursor = encoder.put_long(&mut buffer, cursor, 123_456_789)?;
//!
//! assert_eq!(cursor, 16);
//! assert_eq!(&buffer[8..], &123_456_789i64.to_le_bytes());
//! # Ok::<(), callpack::Error>(())
//! ```

use std::sync::OnceLock;

use tracing::debug;

use crate::{
    invoke::{io::ByteWriter, LongDoubleFormat},
    platform::{ByteOrder, Cpu, Platform, PrimitiveLayout, TypeLayout},
    types::{CallContext, NativeType, Type},
    utils::align_up,
    Config,
    Error::OutOfBounds,
    Result,
};

/// Width of one argument slot of the default encoder
pub const PARAM_SIZE: usize = 8;

/// Slot width of the i386 stack
const I386_SLOT: usize = 4;

/// Where a multi-byte value (`long double`, by-value struct) lands in a raw frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// First byte of the value
    pub start: usize,
    /// Cursor after the value and its trailing padding
    pub next: usize,
}

/// Argument packing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoder {
    /// One fixed 8-byte slot per argument
    Default {
        /// Primitive writer for the platform
        io: ByteWriter,
        /// Platform layout; consulted for `long double` only
        layout: PrimitiveLayout,
    },
    /// Native stack layout
    Raw {
        /// Primitive writer for the platform
        io: ByteWriter,
        /// Platform layout
        layout: PrimitiveLayout,
    },
    /// i386 stack layout: 4-byte slots, never padded
    RawI386 {
        /// Platform layout; decides the size and format of `long double`
        layout: PrimitiveLayout,
    },
}

impl Encoder {
    /// Chooses the strategy for a platform.
    ///
    /// Raw packing on 32-bit x86 always uses the stack-packing encoder, regardless of the
    /// platform's OS. The OS still decides how wide `long double` is.
    #[must_use]
    pub fn select(platform: &Platform, raw_packing: bool) -> Self {
        let io = ByteWriter::for_platform(platform);
        let layout = platform.layout();

        match (platform.cpu(), raw_packing) {
            (Cpu::I386, true) => Encoder::RawI386 { layout },
            (_, true) => Encoder::Raw { io, layout },
            (_, false) => Encoder::Default { io, layout },
        }
    }

    /// The encoder of this process, selected once from [`Platform::native`] and
    /// [`Config::global`].
    pub fn native() -> &'static Encoder {
        static NATIVE: OnceLock<Encoder> = OnceLock::new();
        NATIVE.get_or_init(|| {
            let platform = Platform::native();
            let encoder = Self::select(platform, Config::global().raw_parameter_packing);
            debug!(
                cpu = %platform.cpu(),
                os = %platform.os(),
                address_size = platform.address_size(),
                strategy = encoder.name(),
                "selected parameter encoder"
            );
            encoder
        })
    }

    /// Short name of the strategy
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Encoder::Default { .. } => "default",
            Encoder::Raw { .. } => "raw",
            Encoder::RawI386 { .. } => "raw-i386",
        }
    }

    /// Whether values are packed to the native stack layout.
    #[must_use]
    pub fn is_raw(&self) -> bool {
        !matches!(self, Encoder::Default { .. })
    }

    /// The primitive layout this encoder packs with.
    #[must_use]
    pub fn layout(&self) -> &PrimitiveLayout {
        match self {
            Encoder::Default { layout, .. }
            | Encoder::Raw { layout, .. }
            | Encoder::RawI386 { layout } => layout,
        }
    }

    /// The primitive writer this encoder packs with.
    #[must_use]
    pub fn io(&self) -> ByteWriter {
        match self {
            Encoder::Default { io, .. } | Encoder::Raw { io, .. } => *io,
            Encoder::RawI386 { .. } => ByteWriter::Le32,
        }
    }

    /// Byte order of multi-byte values
    #[must_use]
    pub fn byte_order(&self) -> ByteOrder {
        self.io().byte_order()
    }

    /// Size and alignment of `long double`
    #[must_use]
    pub fn long_double(&self) -> TypeLayout {
        self.layout().long_double
    }

    /// Representation of `long double`
    #[must_use]
    pub fn long_double_format(&self) -> LongDoubleFormat {
        self.layout().long_double_format
    }

    /// Width of one raw argument slot
    #[must_use]
    pub fn slot_size(&self) -> usize {
        match self {
            Encoder::Default { .. } => PARAM_SIZE,
            Encoder::Raw { layout, .. } => layout.slot_size,
            Encoder::RawI386 { .. } => I386_SLOT,
        }
    }

    /// Number of bytes the parameter buffer for `context` needs.
    #[must_use]
    pub fn buffer_size(&self, context: &CallContext) -> usize {
        match self {
            Encoder::Default { .. } => context.parameter_count() * PARAM_SIZE,
            Encoder::Raw { .. } | Encoder::RawI386 { .. } => context.raw_parameter_size(),
        }
    }

    /// Cursor at which a raw value of `alignment` starts.
    fn align(&self, offset: usize, alignment: usize) -> usize {
        match self {
            Encoder::Default { .. } | Encoder::RawI386 { .. } => offset,
            Encoder::Raw { layout, .. } => align_up(offset, alignment.max(layout.slot_size)),
        }
    }

    /// Cursor after a primitive of natural size `size` written at `start`.
    fn advance(&self, start: usize, size: usize) -> usize {
        match self {
            Encoder::Default { .. } => start + PARAM_SIZE,
            Encoder::Raw { .. } => start + size,
            Encoder::RawI386 { .. } => start + size.max(I386_SLOT),
        }
    }

    /// Encodes an 8-bit integer and returns the next cursor.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the value does not fit in `buffer`.
    pub fn put_byte(&self, buffer: &mut [u8], offset: usize, value: i8) -> Result<usize> {
        let layout = self.layout().sint8;
        let start = self.align(offset, layout.alignment);
        self.io().put_byte(buffer, start, value)?;
        Ok(self.advance(start, layout.size))
    }

    /// Encodes a 16-bit integer and returns the next cursor.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the value does not fit in `buffer`.
    pub fn put_short(&self, buffer: &mut [u8], offset: usize, value: i16) -> Result<usize> {
        let layout = self.layout().sint16;
        let start = self.align(offset, layout.alignment);
        self.io().put_short(buffer, start, value)?;
        Ok(self.advance(start, layout.size))
    }

    /// Encodes a 32-bit integer and returns the next cursor.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the value does not fit in `buffer`.
    pub fn put_int(&self, buffer: &mut [u8], offset: usize, value: i32) -> Result<usize> {
        let layout = self.layout().sint32;
        let start = self.align(offset, layout.alignment);
        self.io().put_int(buffer, start, value)?;
        Ok(self.advance(start, layout.size))
    }

    /// Encodes a 64-bit integer and returns the next cursor.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the value does not fit in `buffer`.
    pub fn put_long(&self, buffer: &mut [u8], offset: usize, value: i64) -> Result<usize> {
        let layout = self.layout().sint64;
        let start = self.align(offset, layout.alignment);
        self.io().put_long(buffer, start, value)?;
        Ok(self.advance(start, layout.size))
    }

    /// Encodes a `float` and returns the next cursor.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the value does not fit in `buffer`.
    pub fn put_float(&self, buffer: &mut [u8], offset: usize, value: f32) -> Result<usize> {
        let layout = self.layout().float;
        let start = self.align(offset, layout.alignment);
        self.io().put_float(buffer, start, value)?;
        Ok(self.advance(start, layout.size))
    }

    /// Encodes a `double` and returns the next cursor.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the value does not fit in `buffer`.
    pub fn put_double(&self, buffer: &mut [u8], offset: usize, value: f64) -> Result<usize> {
        let layout = self.layout().double;
        let start = self.align(offset, layout.alignment);
        self.io().put_double(buffer, start, value)?;
        Ok(self.advance(start, layout.size))
    }

    /// Encodes an address and returns the next cursor. A zero address is bounds checked but
    /// not written.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the value does not fit in `buffer`.
    pub fn put_address(&self, buffer: &mut [u8], offset: usize, value: u64) -> Result<usize> {
        let io = self.io();
        let layout = self.layout().pointer;
        let start = self.align(offset, layout.alignment);
        if value == 0 {
            check_bounds(buffer, start, io.address_bytes())?;
        } else {
            io.put_address(buffer, start, value)?;
        }
        Ok(self.advance(start, layout.size))
    }

    /// Placement of a `long double` written inline at `offset`; `None` for the default
    /// encoder, which passes the value out of line.
    #[must_use]
    pub fn long_double_placement(&self, offset: usize) -> Option<Placement> {
        if !self.is_raw() {
            return None;
        }

        let layout = self.long_double();
        let start = self.align(offset, layout.alignment);
        Some(Placement {
            start,
            next: start + align_up(layout.size, self.slot_size()),
        })
    }

    /// Placement of a by-value struct of type `ty` copied inline at `offset`; `None` for the
    /// default encoder.
    #[must_use]
    pub fn struct_placement(&self, offset: usize, ty: &Type) -> Option<Placement> {
        if !self.is_raw() {
            return None;
        }

        let start = self.align(offset, ty.alignment());
        Some(Placement {
            start,
            next: align_up(start + ty.size(), self.slot_size()),
        })
    }

    /// End of the frame a put sequence matching `parameters` produces, rounded up to the slot.
    fn frame_size(&self, parameters: &[Type]) -> usize {
        let slot = self.slot_size();
        let end = parameters.iter().fold(0, |offset, ty| {
            let start = self.align(offset, ty.alignment());
            match ty.kind() {
                NativeType::Struct | NativeType::LongDouble => start + align_up(ty.size(), slot),
                _ => self.advance(start, ty.size()),
            }
        });
        align_up(end, slot)
    }
}

fn check_bounds(buffer: &[u8], offset: usize, len: usize) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= buffer.len() => Ok(()),
        _ => Err(OutOfBounds),
    }
}

/// Size in bytes of the raw-packed frame for `parameters` on `platform`.
///
/// The size is measured with the raw encoder [`Encoder::select`] picks for `platform`, so it
/// always agrees with the puts.
///
/// - Generic raw packing starts each value at a multiple of `max(alignment, slot)`.
/// - i386 packs every value at the cursor in 4-byte steps, whatever its alignment.
///
/// Primitives occupy their natural size (at least 4 bytes on i386). `long double` and by-value
/// structs are padded to whole slots. The total is rounded up to the slot width.
#[must_use]
pub fn raw_parameter_size(parameters: &[Type], platform: &Platform) -> usize {
    Encoder::select(platform, true).frame_size(parameters)
}
