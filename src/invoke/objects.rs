//! By-reference payloads of one invocation.
//!
//! Arguments that native code receives as an address (arrays, direct buffers, boxed structs,
//! opaque objects and bridge handles) cannot be resolved while the parameter buffer is being
//! filled: the real address is only known once the call bridge pins or copies the data. The
//! builder therefore writes a zero address into the argument slot and records an
//! [`ObjectEntry`] here, tagged with the parameter index it belongs to.
//!
//! At call time the bridge walks [`ObjectBuffer::entries`] in order, resolves each payload to
//! an address, patches it into the argument array and copies `OUT` data back afterwards. None
//! of that happens in this crate.

use std::{any::Any, fmt};

use bitflags::bitflags;
use strum::Display;

use crate::{Error::OutOfBounds, Result};

bitflags! {
    /// Direction and handling of a by-reference payload.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ParameterFlags: u32 {
        /// Native code reads the data; copied in before the call
        const IN = 0x01;
        /// Native code writes the data; copied back after the call
        const OUT = 0x02;
        /// Pass the data in place instead of copying it
        const PINNED = 0x04;
        /// Append a NUL terminator to the copied-in data
        const NUL_TERMINATE = 0x08;
    }
}

impl ParameterFlags {
    /// Whether data flows both ways.
    #[must_use]
    pub fn is_in_out(self) -> bool {
        self.contains(ParameterFlags::IN | ParameterFlags::OUT)
    }
}

/// Element type of a primitive array payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ComponentType {
    /// 8-bit integers (also raw bytes)
    Byte,
    /// 16-bit integers
    Short,
    /// 32-bit integers
    Int,
    /// 64-bit integers
    Long,
    /// `f32`
    Float,
    /// `f64`
    Double,
    /// One byte per `bool`
    Boolean,
    /// UTF-16 code units
    Char,
}

impl ComponentType {
    /// Size of one element in bytes
    #[must_use]
    pub fn size(self) -> usize {
        match self {
            ComponentType::Byte | ComponentType::Boolean => 1,
            ComponentType::Short | ComponentType::Char => 2,
            ComponentType::Int | ComponentType::Float => 4,
            ComponentType::Long | ComponentType::Double => 8,
        }
    }
}

/// How the call bridge obtains the address of an opaque object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ObjectType {
    /// The object is backed by a primitive array
    Array(ComponentType),
    /// The object is backed by native memory
    Buffer,
}

/// A caller-defined object marshalled by the call bridge.
///
/// The builder only records which region of the object the native side sees; the bridge
/// downcasts or otherwise interprets the object when it resolves the address.
pub trait ObjectParameter: fmt::Debug {
    /// Backing storage kind of the object
    fn object_type(&self) -> ObjectType;

    /// Offset of the region passed to native code, in elements
    fn offset(&self) -> usize;

    /// Length of the region passed to native code, in elements
    fn length(&self) -> usize;

    /// The object for downcasting by the bridge
    fn as_any(&self) -> &dyn Any;
}

/// Source data of a primitive array payload.
///
/// Borrowed variants point at caller-owned slices; [`HeapArray::Scratch`] owns bytes the
/// builder produced itself, such as an out-of-line `long double`.
#[derive(Debug)]
pub enum HeapArray<'a> {
    /// `i8` elements
    Byte(&'a mut [i8]),
    /// `i16` elements
    Short(&'a mut [i16]),
    /// `i32` elements
    Int(&'a mut [i32]),
    /// `i64` elements
    Long(&'a mut [i64]),
    /// `f32` elements
    Float(&'a mut [f32]),
    /// `f64` elements
    Double(&'a mut [f64]),
    /// `bool` elements
    Boolean(&'a mut [bool]),
    /// UTF-16 code units
    Char(&'a mut [u16]),
    /// Bytes owned by the payload
    Scratch(Vec<u8>),
}

impl HeapArray<'_> {
    /// Element type of the array
    #[must_use]
    pub fn component_type(&self) -> ComponentType {
        match self {
            HeapArray::Byte(_) | HeapArray::Scratch(_) => ComponentType::Byte,
            HeapArray::Short(_) => ComponentType::Short,
            HeapArray::Int(_) => ComponentType::Int,
            HeapArray::Long(_) => ComponentType::Long,
            HeapArray::Float(_) => ComponentType::Float,
            HeapArray::Double(_) => ComponentType::Double,
            HeapArray::Boolean(_) => ComponentType::Boolean,
            HeapArray::Char(_) => ComponentType::Char,
        }
    }

    /// Number of elements
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            HeapArray::Byte(a) => a.len(),
            HeapArray::Short(a) => a.len(),
            HeapArray::Int(a) => a.len(),
            HeapArray::Long(a) => a.len(),
            HeapArray::Float(a) => a.len(),
            HeapArray::Double(a) => a.len(),
            HeapArray::Boolean(a) => a.len(),
            HeapArray::Char(a) => a.len(),
            HeapArray::Scratch(a) => a.len(),
        }
    }

    /// Whether the array has no elements
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

macro_rules! impl_heap_array_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl<'a> From<&'a mut [$ty]> for HeapArray<'a> {
                fn from(array: &'a mut [$ty]) -> Self {
                    HeapArray::$variant(array)
                }
            }
        )*
    };
}

impl_heap_array_from!(
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    bool => Boolean,
    u16 => Char,
);

impl From<Vec<u8>> for HeapArray<'_> {
    fn from(bytes: Vec<u8>) -> Self {
        HeapArray::Scratch(bytes)
    }
}

/// Kind of a registered payload, as seen by the call bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum PayloadKind {
    /// Copy-in/copy-out primitive array
    PrimitiveArray,
    /// Pinned native memory
    DirectBuffer,
    /// Struct bytes copied in and passed by address
    Struct,
    /// Caller-defined object
    Object,
    /// The bridge's environment handle
    JniEnvironment,
    /// A handle to a managed object
    JniObject,
}

/// Source of a by-reference payload.
pub enum Payload<'a> {
    /// A primitive array
    Array(HeapArray<'a>),
    /// Native memory the caller owns
    DirectBuffer(&'a mut [u8]),
    /// Bytes of a struct passed by address
    Struct(&'a [u8]),
    /// A caller-defined object
    Object {
        /// The object
        object: &'a mut dyn ObjectParameter,
        /// How its address is obtained
        object_type: ObjectType,
    },
    /// Placeholder for the bridge's environment handle
    JniEnvironment,
    /// A managed object handle
    JniObject(&'a dyn Any),
}

impl Payload<'_> {
    /// Kind reported to the bridge
    #[must_use]
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Array(_) => PayloadKind::PrimitiveArray,
            Payload::DirectBuffer(_) => PayloadKind::DirectBuffer,
            Payload::Struct(_) => PayloadKind::Struct,
            Payload::Object { .. } => PayloadKind::Object,
            Payload::JniEnvironment => PayloadKind::JniEnvironment,
            Payload::JniObject(_) => PayloadKind::JniObject,
        }
    }

    /// Number of addressable units in the source, used to validate offset and length.
    fn source_len(&self) -> Option<usize> {
        match self {
            Payload::Array(array) => Some(array.len()),
            Payload::DirectBuffer(buffer) => Some(buffer.len()),
            Payload::Struct(bytes) => Some(bytes.len()),
            Payload::Object { .. } | Payload::JniEnvironment | Payload::JniObject(_) => None,
        }
    }

    /// Checks that `offset..offset + length` lies within the source.
    pub(crate) fn check_region(&self, offset: usize, length: usize) -> Result<()> {
        let Some(available) = self.source_len() else {
            return Ok(());
        };
        match offset.checked_add(length) {
            Some(end) if end <= available => Ok(()),
            _ => Err(OutOfBounds),
        }
    }
}

impl fmt::Debug for Payload<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Array(array) => f.debug_tuple("Array").field(array).finish(),
            Payload::DirectBuffer(buffer) => {
                f.debug_tuple("DirectBuffer").field(&buffer.len()).finish()
            }
            Payload::Struct(bytes) => f.debug_tuple("Struct").field(&bytes.len()).finish(),
            Payload::Object {
                object,
                object_type,
            } => f
                .debug_struct("Object")
                .field("object", object)
                .field("object_type", object_type)
                .finish(),
            Payload::JniEnvironment => f.write_str("JniEnvironment"),
            Payload::JniObject(_) => f.write_str("JniObject"),
        }
    }
}

/// One by-reference argument.
#[derive(Debug)]
pub struct ObjectEntry<'a> {
    /// Index of the parameter whose slot receives the resolved address
    pub index: usize,
    /// Source data
    pub payload: Payload<'a>,
    /// Start of the passed region within the source, in elements
    pub offset: usize,
    /// Length of the passed region, in elements
    pub length: usize,
    /// Direction and handling
    pub flags: ParameterFlags,
}

impl ObjectEntry<'_> {
    /// Kind reported to the bridge
    #[must_use]
    pub fn kind(&self) -> PayloadKind {
        self.payload.kind()
    }
}

/// Ordered collection of the by-reference payloads of one invocation.
#[derive(Debug, Default)]
pub struct ObjectBuffer<'a> {
    entries: Vec<ObjectEntry<'a>>,
}

impl<'a> ObjectBuffer<'a> {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        ObjectBuffer {
            entries: Vec::new(),
        }
    }

    /// Creates an empty collection with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        ObjectBuffer {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Appends a payload for parameter `index`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if `offset..offset + length` lies outside an array,
    /// buffer or struct source.
    pub fn push(
        &mut self,
        index: usize,
        payload: Payload<'a>,
        offset: usize,
        length: usize,
        flags: ParameterFlags,
    ) -> Result<()> {
        payload.check_region(offset, length)?;

        self.entries.push(ObjectEntry {
            index,
            payload,
            offset,
            length,
            flags,
        });
        Ok(())
    }

    /// Registered entries, in put order
    #[must_use]
    pub fn entries(&self) -> &[ObjectEntry<'a>] {
        &self.entries
    }

    /// Mutable access to the entries, for resolving `OUT` payloads
    pub fn entries_mut(&mut self) -> &mut [ObjectEntry<'a>] {
        &mut self.entries
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no payload was registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry registered for parameter `index`, if any.
    #[must_use]
    pub fn entry_for(&self, index: usize) -> Option<&ObjectEntry<'a>> {
        self.entries.iter().find(|entry| entry.index == index)
    }
}

impl<'a> IntoIterator for ObjectBuffer<'a> {
    type Item = ObjectEntry<'a>;
    type IntoIter = std::vec::IntoIter<ObjectEntry<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
