//! Packing of native call arguments.
//!
//! This module turns a sequence of typed values into the byte image a native call expects,
//! following the layout rules of a [`crate::CallContext`].
//!
//! # Architecture
//!
//! The layers, from the bottom up:
//!
//! - **I/O** ([`io`]) - [`ByteWriter`] writes fixed-width primitives at an offset in one of
//!   four byte order / address width combinations
//! - **Extended precision** ([`longdouble`]) - [`LongDoubleFormat`] produces the bytes of a
//!   C `long double`
//! - **Strategies** ([`encoder`]) - [`Encoder`] decides where each value lands: fixed 8-byte
//!   slots, the native stack layout, or the i386 stack layout
//! - **Payloads** ([`objects`]) - [`ObjectBuffer`] records arguments passed by address
//! - **Builder** ([`buffer`]) - [`InvocationBuffer`] is the put surface callers use
//!
//! # Key Components
//!
//! - [`InvocationBuffer`] - One call's parameter buffer and payloads
//! - [`Encoder`] - The packing strategy, selected once per process by [`Encoder::native`]
//! - [`ObjectBuffer`] / [`ObjectEntry`] - By-reference arguments for the call bridge
//!
//! # Examples
//!
//! ```rust
//! use callpack::{
//!     invoke::{Encoder, ParameterFlags, PayloadKind},
//!     platform::{Cpu, Os, Platform},
//!     types::NativeType,
//!     CallContext, Config, InvocationBuffer, Type,
//! };
//!
//! let platform = Platform::new(Cpu::X86_64, Os::Linux);
//! let context = CallContext::builder()
//!     .platform(platform)
//!     .parameter(Type::primitive(NativeType::Pointer, &platform))
//!     .parameter(Type::primitive(NativeType::SInt32, &platform))
//!     .build();
//!
//! let mut data = [1i32, 2, 3];
//! let encoder = Encoder::select(&platform, false);
//! let mut buffer = InvocationBuffer::with_encoder(&context, encoder, Config::default());
//! buffer.put_array(&mut data[..], 0, 3, ParameterFlags::IN)?;
//! buffer.put_int(3)?;
//!
//! let (bytes, objects) = buffer.into_parts();
//! assert_eq!(&bytes[..8], &[0; 8]);
//! assert_eq!(objects.unwrap().entries()[0].kind(), PayloadKind::PrimitiveArray);
//! # Ok::<(), callpack::Error>(())
//! ```

pub mod buffer;
mod decimal;
pub mod encoder;
pub mod io;
pub mod longdouble;
pub mod objects;

pub use buffer::InvocationBuffer;
pub use encoder::{raw_parameter_size, Encoder, Placement, PARAM_SIZE};
pub use io::{read_at, read_be_at, read_le_at, write_be_at, write_le_at, ByteWriter, NativeIO};
pub use longdouble::LongDoubleFormat;
pub use objects::{
    ComponentType, HeapArray, ObjectBuffer, ObjectEntry, ObjectParameter, ObjectType,
    ParameterFlags, Payload, PayloadKind,
};
