//! The parameter buffer of one native call.
//!
//! An [`InvocationBuffer`] is filled by issuing one put per parameter, in signature order. Each
//! put hands the value to the [`Encoder`], which decides where it lands, and moves the cursor
//! and parameter index forward together. By-reference arguments leave a zero address in their
//! slot and are recorded in the lazily created [`ObjectBuffer`].
//!
//! The buffer is single pass: there is no way to revisit a parameter. Once every parameter is
//! put, [`InvocationBuffer::into_parts`] yields the packed bytes and the payloads for the call
//! bridge.
//!
//! Put order is not checked unless [`Config::validate_parameters`] is set. Without validation
//! a put of the wrong kind silently produces a frame that does not match the signature; only
//! writes past the end of the buffer are always reported.

use std::any::Any;

use strum::IntoStaticStr;
use tracing::trace;

use crate::{
    invoke::{
        encoder::Placement, Encoder, HeapArray, LongDoubleFormat, ObjectBuffer, ObjectParameter,
        ParameterFlags, Payload,
    },
    platform::{ByteOrder, Platform},
    types::{CallContext, NativeType, Type},
    Config,
    Error::{self, OutOfBounds, ParameterCount, ParameterMismatch},
    Result,
};

/// The kind of value a put supplies, for validation against the signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
enum PutKind {
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    LongDouble,
    Address,
    Reference,
    Struct,
}

impl PutKind {
    fn accepts(self, ty: &Type) -> bool {
        let kind = ty.kind();
        let is_long = matches!(kind, NativeType::SLong | NativeType::ULong);
        match self {
            PutKind::Byte => matches!(kind, NativeType::SInt8 | NativeType::UInt8),
            PutKind::Short => matches!(kind, NativeType::SInt16 | NativeType::UInt16),
            PutKind::Int => {
                matches!(kind, NativeType::SInt32 | NativeType::UInt32) || (is_long && ty.size() == 4)
            }
            PutKind::Long => {
                matches!(kind, NativeType::SInt64 | NativeType::UInt64) || (is_long && ty.size() == 8)
            }
            PutKind::Float => kind == NativeType::Float,
            PutKind::Double => kind == NativeType::Double,
            PutKind::LongDouble => kind == NativeType::LongDouble,
            PutKind::Address => kind == NativeType::Pointer,
            PutKind::Reference => matches!(kind, NativeType::Pointer | NativeType::Object),
            PutKind::Struct => matches!(kind, NativeType::Struct | NativeType::Pointer),
        }
    }
}

/// Builder for the packed arguments of one native call.
///
/// # Examples
///
/// ```rust
/// use callpack::{
///     invoke::Encoder,
///     platform::{Cpu, Os, Platform},
///     types::{CallFlags, NativeType},
///     CallContext, Config, InvocationBuffer, Type,
/// };
///
/// let platform = Platform::new(Cpu::X86_64, Os::Linux);
/// let context = CallContext::builder()
///     .platform(platform)
///     .flags(CallFlags::RAW_PACKING)
///     .parameter(Type::primitive(NativeType::SInt8, &platform))
///     .parameter(Type::primitive(NativeType::SInt64, &platform))
///     .build();
///
/// let encoder = Encoder::select(&platform, true);
/// let mut buffer = InvocationBuffer::with_encoder(&context, encoder, Config::default());
/// buffer.put_byte(7)?;
/// buffer.put_long(123_456_789)?;
///
/// let (bytes, objects) = buffer.into_parts();
/// assert_eq!(bytes[0], 7);
/// assert_eq!(&bytes[8..], &123_456_789i64.to_le_bytes());
/// assert!(objects.is_none());
/// # Ok::<(), callpack::Error>(())
/// ```
#[derive(Debug)]
pub struct InvocationBuffer<'a> {
    context: &'a CallContext,
    encoder: Encoder,
    config: Config,
    buffer: Vec<u8>,
    param_offset: usize,
    param_index: usize,
    objects: Option<ObjectBuffer<'a>>,
}

impl<'a> InvocationBuffer<'a> {
    /// Creates an empty buffer for `context`.
    ///
    /// Uses the process encoder unless the signature targets another platform or packing
    /// mode, in which case the matching encoder is selected for it.
    #[must_use]
    pub fn new(context: &'a CallContext) -> Self {
        Self::with_encoder(context, encoder_for(context), *Config::global())
    }

    /// Creates an empty buffer whose object buffer is allocated up front for `objects`
    /// by-reference parameters.
    #[must_use]
    pub fn with_object_capacity(context: &'a CallContext, objects: usize) -> Self {
        let mut buffer = Self::new(context);
        buffer.objects = Some(ObjectBuffer::with_capacity(objects));
        buffer
    }

    /// Creates an empty buffer packed by `encoder`.
    #[must_use]
    pub fn with_encoder(context: &'a CallContext, encoder: Encoder, config: Config) -> Self {
        InvocationBuffer {
            context,
            encoder,
            config,
            buffer: vec![0u8; encoder.buffer_size(context)],
            param_offset: 0,
            param_index: 0,
            objects: None,
        }
    }

    /// Puts an 8-bit integer.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the buffer is full, or a validation error.
    pub fn put_byte(&mut self, value: i8) -> Result<()> {
        self.check(PutKind::Byte)?;
        self.param_offset = self
            .encoder
            .put_byte(&mut self.buffer, self.param_offset, value)?;
        self.param_index += 1;
        Ok(())
    }

    /// Puts a 16-bit integer.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the buffer is full, or a validation error.
    pub fn put_short(&mut self, value: i16) -> Result<()> {
        self.check(PutKind::Short)?;
        self.param_offset = self
            .encoder
            .put_short(&mut self.buffer, self.param_offset, value)?;
        self.param_index += 1;
        Ok(())
    }

    /// Puts a 32-bit integer.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the buffer is full, or a validation error.
    pub fn put_int(&mut self, value: i32) -> Result<()> {
        self.check(PutKind::Int)?;
        self.param_offset = self
            .encoder
            .put_int(&mut self.buffer, self.param_offset, value)?;
        self.param_index += 1;
        Ok(())
    }

    /// Puts a 64-bit integer.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the buffer is full, or a validation error.
    pub fn put_long(&mut self, value: i64) -> Result<()> {
        self.check(PutKind::Long)?;
        self.param_offset = self
            .encoder
            .put_long(&mut self.buffer, self.param_offset, value)?;
        self.param_index += 1;
        Ok(())
    }

    /// Puts a `float`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the buffer is full, or a validation error.
    pub fn put_float(&mut self, value: f32) -> Result<()> {
        self.check(PutKind::Float)?;
        self.param_offset = self
            .encoder
            .put_float(&mut self.buffer, self.param_offset, value)?;
        self.param_index += 1;
        Ok(())
    }

    /// Puts a `double`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the buffer is full, or a validation error.
    pub fn put_double(&mut self, value: f64) -> Result<()> {
        self.check(PutKind::Double)?;
        self.param_offset = self
            .encoder
            .put_double(&mut self.buffer, self.param_offset, value)?;
        self.param_index += 1;
        Ok(())
    }

    /// Puts a native address.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the buffer is full, or a validation error.
    pub fn put_address(&mut self, value: u64) -> Result<()> {
        self.check(PutKind::Address)?;
        self.param_offset = self
            .encoder
            .put_address(&mut self.buffer, self.param_offset, value)?;
        self.param_index += 1;
        Ok(())
    }

    /// Puts a `long double` converted from `value`.
    ///
    /// Raw encoders store the value inline. The default encoder stores it in a separate
    /// buffer registered as an `IN` primitive array and leaves a zero address in the slot.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the buffer is full, or a validation error.
    pub fn put_long_double(&mut self, value: f64) -> Result<()> {
        self.put_long_double_with(|format, order, out| format.encode_f64(value, order, out))
    }

    /// Puts a `long double` parsed from a decimal string.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LongDoubleConversion`] if `text` is not a decimal number,
    /// [`crate::Error::OutOfBounds`] if the buffer is full, or a validation error.
    pub fn put_long_double_str(&mut self, text: &str) -> Result<()> {
        self.put_long_double_with(|format, order, out| format.encode_str(text, order, out))
    }

    fn put_long_double_with<F>(&mut self, encode: F) -> Result<()>
    where
        F: FnOnce(LongDoubleFormat, ByteOrder, &mut [u8]) -> Result<()>,
    {
        self.check(PutKind::LongDouble)?;

        let format = self.encoder.long_double_format();
        let order = self.encoder.byte_order();
        let size = self.encoder.long_double().size;

        match self.encoder.long_double_placement(self.param_offset) {
            Some(placement) => {
                let target = self.reserve(placement, size)?;
                encode(format, order, target)?;
                self.param_offset = placement.next;
            }
            None => {
                let mut scratch = vec![0u8; size];
                encode(format, order, &mut scratch)?;
                let payload = Payload::Array(HeapArray::Scratch(scratch));
                return self.put_reference(payload, 0, size, ParameterFlags::IN);
            }
        }

        self.param_index += 1;
        Ok(())
    }

    /// Puts a primitive array passed by address.
    ///
    /// `offset` and `length` select the elements native code sees.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the buffer is full or the region lies outside
    /// `array`, or a validation error.
    pub fn put_array(
        &mut self,
        array: impl Into<HeapArray<'a>>,
        offset: usize,
        length: usize,
        flags: ParameterFlags,
    ) -> Result<()> {
        self.check(PutKind::Reference)?;
        self.put_reference(Payload::Array(array.into()), offset, length, flags)
    }

    /// Puts native memory passed in place.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the buffer is full or the region lies outside
    /// `memory`, or a validation error.
    pub fn put_direct_buffer(
        &mut self,
        memory: &'a mut [u8],
        offset: usize,
        length: usize,
    ) -> Result<()> {
        self.check(PutKind::Reference)?;
        self.put_reference(
            Payload::DirectBuffer(memory),
            offset,
            length,
            ParameterFlags::PINNED,
        )
    }

    /// Puts a caller-defined object resolved by the call bridge.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the buffer is full, or a validation error.
    pub fn put_object(
        &mut self,
        object: &'a mut dyn ObjectParameter,
        flags: ParameterFlags,
    ) -> Result<()> {
        self.check(PutKind::Reference)?;
        let (offset, length) = (object.offset(), object.length());
        let object_type = object.object_type();
        self.put_reference(
            Payload::Object {
                object,
                object_type,
            },
            offset,
            length,
            flags,
        )
    }

    /// Puts a placeholder for the bridge's environment handle.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the buffer is full, or a validation error.
    pub fn put_jni_environment(&mut self) -> Result<()> {
        self.check(PutKind::Reference)?;
        self.put_reference(Payload::JniEnvironment, 0, 0, ParameterFlags::empty())
    }

    /// Puts a managed object handle resolved by the bridge.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the buffer is full, or a validation error.
    pub fn put_jni_object(&mut self, object: &'a dyn Any) -> Result<()> {
        self.check(PutKind::Reference)?;
        self.put_reference(Payload::JniObject(object), 0, 0, ParameterFlags::empty())
    }

    /// Puts a struct from its bytes, starting at `offset`.
    ///
    /// The size comes from the signature. With a raw encoder and a by-value struct parameter
    /// the bytes are copied inline; otherwise they are registered as an `IN` struct payload
    /// and a zero address is written.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotSupported`] if the signature has no parameter at this index,
    /// [`crate::Error::OutOfBounds`] if `bytes` is too short or the buffer is full, or a
    /// validation error.
    pub fn put_struct(&mut self, bytes: &'a [u8], offset: usize) -> Result<()> {
        self.check(PutKind::Struct)?;
        let ty = self.struct_type()?;

        let end = offset.checked_add(ty.size()).ok_or(OutOfBounds)?;
        let source = bytes.get(offset..end).ok_or(OutOfBounds)?;

        match self.struct_placement(&ty) {
            Some(placement) => self.copy_inline(placement, source),
            None => self.put_reference(Payload::Struct(bytes), offset, ty.size(), ParameterFlags::IN),
        }
    }

    /// Puts a struct that lives in native memory.
    ///
    /// With a raw encoder and a by-value struct parameter the declared number of bytes is
    /// copied inline from `ptr`; otherwise `ptr` itself is written as the address.
    ///
    /// # Safety
    ///
    /// When the struct is copied inline, `ptr` must be valid for reads of the struct size
    /// declared by the signature.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotSupported`] if the signature has no parameter at this index
    /// or `ptr` is null where bytes must be copied, [`crate::Error::OutOfBounds`] if the
    /// buffer is full, or a validation error.
    pub unsafe fn put_struct_ptr(&mut self, ptr: *const u8) -> Result<()> {
        self.check(PutKind::Struct)?;
        let ty = self.struct_type()?;

        match self.struct_placement(&ty) {
            Some(placement) => {
                if ty.size() == 0 {
                    return self.copy_inline(placement, &[]);
                }
                if ptr.is_null() {
                    return Err(Error::NotSupported(format!(
                        "null pointer for by-value struct parameter {}",
                        self.param_index
                    )));
                }
                // SAFETY: the caller guarantees `ptr` is readable for the declared size
                let source = unsafe { std::slice::from_raw_parts(ptr, ty.size()) };
                self.copy_inline(placement, source)
            }
            None => {
                self.param_offset =
                    self.encoder
                        .put_address(&mut self.buffer, self.param_offset, ptr as usize as u64)?;
                self.param_index += 1;
                Ok(())
            }
        }
    }

    /// The packed bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Size of the packed frame in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the frame has no bytes (a signature without parameters)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Number of parameters put so far
    #[must_use]
    pub fn param_index(&self) -> usize {
        self.param_index
    }

    /// Current write cursor
    #[must_use]
    pub fn param_offset(&self) -> usize {
        self.param_offset
    }

    /// The by-reference payloads, if any parameter needed one
    #[must_use]
    pub fn object_buffer(&self) -> Option<&ObjectBuffer<'a>> {
        self.objects.as_ref()
    }

    /// The packing strategy of this buffer
    #[must_use]
    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    /// The signature this buffer is filled for
    #[must_use]
    pub fn context(&self) -> &CallContext {
        self.context
    }

    /// Consumes the buffer, returning the packed bytes and the by-reference payloads.
    #[must_use]
    pub fn into_parts(self) -> (Vec<u8>, Option<ObjectBuffer<'a>>) {
        (self.buffer, self.objects)
    }

    fn check(&self, put: PutKind) -> Result<()> {
        if !self.config.validate_parameters {
            return Ok(());
        }

        let index = self.param_index;
        let Some(ty) = self.context.parameter_type(index) else {
            return Err(ParameterCount {
                index,
                count: self.context.parameter_count(),
            });
        };

        if put.accepts(ty) {
            Ok(())
        } else {
            Err(ParameterMismatch {
                index,
                expected: ty.kind(),
                found: put.into(),
            })
        }
    }

    fn objects_mut(&mut self) -> &mut ObjectBuffer<'a> {
        let index = self.param_index;
        self.objects.get_or_insert_with(|| {
            trace!(index, "allocating object buffer");
            ObjectBuffer::new()
        })
    }

    /// Writes the zero address placeholder and registers the payload for the current index.
    fn put_reference(
        &mut self,
        payload: Payload<'a>,
        offset: usize,
        length: usize,
        flags: ParameterFlags,
    ) -> Result<()> {
        payload.check_region(offset, length)?;
        let next = self
            .encoder
            .put_address(&mut self.buffer, self.param_offset, 0)?;
        let index = self.param_index;
        self.objects_mut()
            .push(index, payload, offset, length, flags)?;

        self.param_offset = next;
        self.param_index += 1;
        Ok(())
    }

    fn struct_type(&self) -> Result<Type> {
        self.context
            .parameter_type(self.param_index)
            .copied()
            .ok_or_else(|| {
                Error::NotSupported(format!(
                    "struct parameter {} is not declared by the signature",
                    self.param_index
                ))
            })
    }

    fn struct_placement(&self, ty: &Type) -> Option<Placement> {
        if ty.kind() == NativeType::Struct {
            self.encoder.struct_placement(self.param_offset, ty)
        } else {
            None
        }
    }

    /// The `len` bytes at `placement`, provided the whole placement fits the buffer.
    fn reserve(&mut self, placement: Placement, len: usize) -> Result<&mut [u8]> {
        if placement.next > self.buffer.len() {
            return Err(OutOfBounds);
        }
        let end = placement.start.checked_add(len).ok_or(OutOfBounds)?;
        self.buffer.get_mut(placement.start..end).ok_or(OutOfBounds)
    }

    fn copy_inline(&mut self, placement: Placement, source: &[u8]) -> Result<()> {
        self.reserve(placement, source.len())?
            .copy_from_slice(source);
        self.param_offset = placement.next;
        self.param_index += 1;
        Ok(())
    }
}

fn encoder_for(context: &CallContext) -> Encoder {
    let native = Encoder::native();
    if context.platform() == Platform::native() && context.is_raw() == native.is_raw() {
        *native
    } else {
        Encoder::select(context.platform(), context.is_raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        invoke::{io::read_at, ObjectType, PayloadKind},
        platform::{Cpu, Os},
        types::CallFlags,
    };

    fn context(platform: Platform, raw: bool, params: Vec<Type>) -> CallContext {
        CallContext::builder()
            .platform(platform)
            .flags(if raw {
                CallFlags::RAW_PACKING
            } else {
                CallFlags::empty()
            })
            .parameters(params)
            .build()
    }

    fn primitives(platform: &Platform, kinds: &[NativeType]) -> Vec<Type> {
        kinds
            .iter()
            .map(|kind| Type::primitive(*kind, platform))
            .collect()
    }

    fn new_buffer<'a>(context: &'a CallContext, config: Config) -> InvocationBuffer<'a> {
        let encoder = Encoder::select(context.platform(), context.is_raw());
        InvocationBuffer::with_encoder(context, encoder, config)
    }

    #[derive(Debug)]
    struct Pixels;

    impl ObjectParameter for Pixels {
        fn object_type(&self) -> ObjectType {
            ObjectType::Buffer
        }

        fn offset(&self) -> usize {
            0
        }

        fn length(&self) -> usize {
            64
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn primitives_advance_in_lockstep() {
        let platform = Platform::new(Cpu::X86_64, Os::Linux);
        let context = context(
            platform,
            false,
            primitives(
                &platform,
                &[NativeType::SInt16, NativeType::Float, NativeType::Pointer],
            ),
        );
        let mut buffer = new_buffer(&context, Config::default());
        assert_eq!(buffer.len(), 24);

        buffer.put_short(-2).unwrap();
        assert_eq!((buffer.param_index(), buffer.param_offset()), (1, 8));
        buffer.put_float(1.5).unwrap();
        buffer.put_address(0x7fff_0000).unwrap();
        assert_eq!((buffer.param_index(), buffer.param_offset()), (3, 24));

        let bytes = buffer.as_bytes();
        assert_eq!(read_at::<i16>(bytes, 0, ByteOrder::LittleEndian).unwrap(), -2);
        assert_eq!(read_at::<f32>(bytes, 8, ByteOrder::LittleEndian).unwrap(), 1.5);
        assert_eq!(
            read_at::<u64>(bytes, 16, ByteOrder::LittleEndian).unwrap(),
            0x7fff_0000
        );
        assert!(buffer.object_buffer().is_none());
    }

    #[test]
    fn overflow_is_reported() {
        let platform = Platform::new(Cpu::X86_64, Os::Linux);
        let context = context(platform, false, primitives(&platform, &[NativeType::SInt32]));
        let mut buffer = new_buffer(&context, Config::default());

        buffer.put_int(1).unwrap();
        assert!(matches!(buffer.put_int(2), Err(OutOfBounds)));
        assert!(matches!(buffer.put_jni_environment(), Err(OutOfBounds)));
        assert_eq!(buffer.param_index(), 1);
        assert_eq!(buffer.param_offset(), 8);
        assert!(buffer.object_buffer().is_none());
    }

    #[test]
    fn references_register_payloads() {
        let platform = Platform::new(Cpu::X86_64, Os::Linux);
        let pointer = Type::primitive(NativeType::Pointer, &platform);
        let context = context(
            platform,
            false,
            vec![
                Type::primitive(NativeType::SInt32, &platform),
                pointer,
                pointer,
                pointer,
                pointer,
                pointer,
            ],
        );

        let mut ints = [1i32, 2, 3, 4];
        let mut native = [0u8; 16];
        let mut pixels = Pixels;
        let handle = String::from("handle");

        let mut buffer = new_buffer(&context, Config::strict());
        buffer.put_int(9).unwrap();
        buffer
            .put_array(&mut ints[..], 1, 2, ParameterFlags::IN | ParameterFlags::OUT)
            .unwrap();
        buffer.put_direct_buffer(&mut native, 4, 8).unwrap();
        buffer.put_object(&mut pixels, ParameterFlags::OUT).unwrap();
        buffer.put_jni_environment().unwrap();
        buffer.put_jni_object(&handle).unwrap();

        let (bytes, objects) = buffer.into_parts();
        assert_eq!(&bytes[8..], &[0; 40]);

        let objects = objects.unwrap();
        let indices: Vec<_> = objects.entries().iter().map(|e| e.index).collect();
        assert_eq!(indices, [1, 2, 3, 4, 5]);

        let kinds: Vec<_> = objects.entries().iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            [
                PayloadKind::PrimitiveArray,
                PayloadKind::DirectBuffer,
                PayloadKind::Object,
                PayloadKind::JniEnvironment,
                PayloadKind::JniObject,
            ]
        );

        let array = &objects.entries()[0];
        assert_eq!((array.offset, array.length), (1, 2));
        assert!(array.flags.is_in_out());
        assert_eq!(objects.entries()[1].flags, ParameterFlags::PINNED);
        assert_eq!(objects.entries()[2].length, 64);
    }

    #[test]
    fn array_window_is_checked() {
        let platform = Platform::new(Cpu::X86_64, Os::Linux);
        let context = context(platform, false, primitives(&platform, &[NativeType::Pointer]));
        let mut values = [0.0f64; 2];
        let mut buffer = new_buffer(&context, Config::default());

        let result = buffer.put_array(&mut values[..], 1, 2, ParameterFlags::IN);
        assert!(matches!(result, Err(OutOfBounds)));
        assert_eq!(buffer.param_index(), 0);
        assert_eq!(buffer.param_offset(), 0);
        assert!(buffer.object_buffer().is_none());
    }

    #[test]
    fn long_double_raw_inline() {
        let platform = Platform::new(Cpu::X86_64, Os::Linux);
        let context = context(
            platform,
            true,
            primitives(&platform, &[NativeType::SInt8, NativeType::LongDouble]),
        );
        let mut buffer = new_buffer(&context, Config::strict());
        assert_eq!(buffer.len(), 32);

        buffer.put_byte(1).unwrap();
        buffer.put_long_double(1.0).unwrap();
        assert_eq!(buffer.param_offset(), 32);

        let bytes = buffer.as_bytes();
        assert_eq!(&bytes[16..26], &[0, 0, 0, 0, 0, 0, 0, 0x80, 0xff, 0x3f]);
        assert!(buffer.object_buffer().is_none());
    }

    #[test]
    fn long_double_i386_unaligned() {
        let platform = Platform::new(Cpu::I386, Os::Linux);
        let context = context(
            platform,
            true,
            primitives(
                &platform,
                &[NativeType::SInt8, NativeType::LongDouble, NativeType::SInt32],
            ),
        );
        let mut buffer = new_buffer(&context, Config::default());
        assert_eq!(buffer.len(), 20);

        buffer.put_byte(1).unwrap();
        buffer.put_long_double_str("-2").unwrap();
        assert_eq!(buffer.param_offset(), 16);
        buffer.put_int(3).unwrap();
        assert_eq!(buffer.param_offset(), 20);

        let bytes = buffer.as_bytes();
        assert_eq!(&bytes[4..14], &[0, 0, 0, 0, 0, 0, 0, 0x80, 0x00, 0xc0]);
        assert_eq!(&bytes[16..], &[3, 0, 0, 0]);
    }

    #[test]
    fn long_double_i386_windows_is_a_double() {
        let platform = Platform::new(Cpu::I386, Os::Windows);
        let context = context(platform, true, primitives(&platform, &[NativeType::LongDouble]));
        let mut buffer = new_buffer(&context, Config::default());
        assert_eq!(buffer.len(), 8);

        buffer.put_long_double(1.0).unwrap();
        assert_eq!(buffer.param_offset(), 8);
        assert_eq!(buffer.as_bytes(), &1.0f64.to_le_bytes());
    }

    #[test]
    fn long_double_i386_darwin_takes_sixteen_bytes() {
        let platform = Platform::new(Cpu::I386, Os::Darwin);
        let context = context(
            platform,
            true,
            primitives(&platform, &[NativeType::LongDouble, NativeType::SInt32]),
        );
        let mut buffer = new_buffer(&context, Config::default());
        assert_eq!(buffer.len(), 20);

        buffer.put_long_double(1.0).unwrap();
        assert_eq!(buffer.param_offset(), 16);
        buffer.put_int(7).unwrap();
        assert_eq!(buffer.param_offset(), 20);

        let bytes = buffer.as_bytes();
        assert_eq!(&bytes[..10], &[0, 0, 0, 0, 0, 0, 0, 0x80, 0xff, 0x3f]);
        assert_eq!(&bytes[10..16], &[0; 6]);
        assert_eq!(&bytes[16..], &[7, 0, 0, 0]);
    }

    #[test]
    fn long_double_default_is_boxed() {
        let platform = Platform::new(Cpu::X86_64, Os::Linux);
        let context = context(
            platform,
            false,
            primitives(&platform, &[NativeType::Double, NativeType::LongDouble]),
        );
        let mut buffer = new_buffer(&context, Config::default());

        buffer.put_double(0.5).unwrap();
        buffer.put_long_double(1.0).unwrap();
        assert_eq!(buffer.param_offset(), 16);
        assert_eq!(&buffer.as_bytes()[8..], &[0; 8]);

        let objects = buffer.object_buffer().unwrap();
        assert_eq!(objects.len(), 1);
        let entry = &objects.entries()[0];
        assert_eq!(entry.index, 1);
        assert_eq!(entry.flags, ParameterFlags::IN);
        assert_eq!(entry.length, 16);
        match &entry.payload {
            Payload::Array(HeapArray::Scratch(bytes)) => {
                assert_eq!(&bytes[..10], &[0, 0, 0, 0, 0, 0, 0, 0x80, 0xff, 0x3f]);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn long_double_bad_string() {
        let platform = Platform::new(Cpu::X86_64, Os::Linux);
        let context = context(platform, true, primitives(&platform, &[NativeType::LongDouble]));
        let mut buffer = new_buffer(&context, Config::default());

        let result = buffer.put_long_double_str("one");
        assert!(matches!(result, Err(Error::LongDoubleConversion(_))));
        assert_eq!(buffer.param_index(), 0);
    }

    #[test]
    fn struct_by_value_raw() {
        let platform = Platform::new(Cpu::X86_64, Os::Linux);
        let rgb = Type::aggregate(&primitives(
            &platform,
            &[NativeType::UInt8, NativeType::UInt8, NativeType::UInt8],
        ));
        let context = context(
            platform,
            true,
            vec![Type::primitive(NativeType::SInt32, &platform), rgb],
        );
        let bytes = [0xEE, 0x10, 0x20, 0x30];
        let mut buffer = new_buffer(&context, Config::strict());

        buffer.put_int(-1).unwrap();
        buffer.put_struct(&bytes, 1).unwrap();
        assert_eq!(buffer.param_offset(), 16);
        assert_eq!(&buffer.as_bytes()[8..], &[0x10, 0x20, 0x30, 0, 0, 0, 0, 0]);
        assert!(buffer.object_buffer().is_none());
    }

    #[test]
    fn struct_boxed_default() {
        let platform = Platform::new(Cpu::Aarch64, Os::Linux);
        let point = Type::aggregate(&primitives(
            &platform,
            &[NativeType::SInt32, NativeType::SInt32],
        ));
        let context = context(platform, false, vec![point]);
        let bytes = [1u8, 0, 0, 0, 2, 0, 0, 0];
        let mut buffer = new_buffer(&context, Config::default());

        buffer.put_struct(&bytes, 0).unwrap();
        assert_eq!(buffer.as_bytes(), &[0; 8]);

        let entry = &buffer.object_buffer().unwrap().entries()[0];
        assert_eq!(entry.kind(), PayloadKind::Struct);
        assert_eq!((entry.index, entry.length), (0, 8));
        assert_eq!(entry.flags, ParameterFlags::IN);
    }

    #[test]
    fn struct_errors() {
        let platform = Platform::new(Cpu::X86_64, Os::Linux);
        let point = Type::aggregate_with_layout(8, 4);
        let context = context(platform, true, vec![point]);
        let mut buffer = new_buffer(&context, Config::default());

        assert!(matches!(buffer.put_struct(&[0u8; 4], 0), Err(OutOfBounds)));
        buffer.put_struct(&[0u8; 8], 0).unwrap();
        assert!(matches!(
            buffer.put_struct(&[0u8; 8], 0),
            Err(Error::NotSupported(_))
        ));
    }

    #[test]
    fn struct_from_pointer() {
        let platform = Platform::new(Cpu::X86_64, Os::Linux);
        let point = Type::aggregate_with_layout(8, 4);
        let source = [7u8, 0, 0, 0, 9, 0, 0, 0];

        let raw = context(platform, true, vec![point]);
        let mut buffer = new_buffer(&raw, Config::default());
        unsafe { buffer.put_struct_ptr(source.as_ptr()) }.unwrap();
        assert_eq!(buffer.as_bytes(), &source);

        let mut buffer = new_buffer(&raw, Config::default());
        let result = unsafe { buffer.put_struct_ptr(std::ptr::null()) };
        assert!(matches!(result, Err(Error::NotSupported(_))));

        let boxed = context(platform, false, vec![point]);
        let mut buffer = new_buffer(&boxed, Config::default());
        unsafe { buffer.put_struct_ptr(0x1000 as *const u8) }.unwrap();
        assert_eq!(
            read_at::<u64>(buffer.as_bytes(), 0, ByteOrder::LittleEndian).unwrap(),
            0x1000
        );
        assert!(buffer.object_buffer().is_none());
    }

    #[test]
    fn validation() {
        let platform = Platform::new(Cpu::X86_64, Os::Windows);
        let context = context(
            platform,
            false,
            primitives(&platform, &[NativeType::SLong, NativeType::UInt64]),
        );

        let mut buffer = new_buffer(&context, Config::strict());
        match buffer.put_long(1) {
            Err(ParameterMismatch {
                index,
                expected,
                found,
            }) => {
                assert_eq!(index, 0);
                assert_eq!(expected, NativeType::SLong);
                assert_eq!(found, "long");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        buffer.put_int(1).unwrap();
        buffer.put_long(2).unwrap();
        assert!(matches!(
            buffer.put_byte(3),
            Err(ParameterCount { index: 2, count: 2 })
        ));

        // unchecked buffers accept any order
        let mut buffer = new_buffer(&context, Config::default());
        buffer.put_double(1.0).unwrap();
        buffer.put_float(2.0).unwrap();
    }

    #[test]
    fn object_capacity_and_native_encoder() {
        let context = CallContext::new(Type::void(), vec![Type::pointer()]);
        let buffer = InvocationBuffer::with_object_capacity(&context, 4);
        assert!(buffer.object_buffer().is_some_and(ObjectBuffer::is_empty));
        assert_eq!(buffer.encoder().is_raw(), context.is_raw());
        assert_eq!(buffer.context(), &context);
    }
}
