// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
//#![deny(unsafe_code)]
// - 'invoke/buffer.rs' reads by-value structs from native memory in `put_struct_ptr`

//! # callpack
//!
//! Packing of native call arguments for foreign function interfaces.
//!
//! Given a function signature and the values a caller supplies, `callpack` produces the byte
//! buffer a native call mechanism expects, laid out exactly as the target ABI requires, plus
//! the list of arguments that must be passed by address (arrays, buffers, structs, opaque
//! objects) for the call bridge to resolve.
//!
//! ## Features
//!
//! - **Three packing strategies** - fixed 8-byte slots for generic argument arrays, the native
//!   stack layout, and the i386 System V stack layout
//! - **Cross-layout encoding** - any supported CPU / OS combination can be targeted from any
//!   host, including big-endian and 32-bit layouts
//! - **Extended precision** - `long double` as x87, IEEE binary128, IBM double-double or plain
//!   `double`
//! - **Optional validation** - every put can be checked against the signature
//!
//! ## Quick Start
//!
//! ```rust
//! use callpack::prelude::*;
//!
//! let context = CallContext::new(
//!     Type::sint32(),
//!     vec![Type::sint32(), Type::double(), Type::pointer()],
//! );
//!
//! let mut buffer = InvocationBuffer::new(&context);
//! buffer.put_int(42)?;
//! buffer.put_double(3.14)?;
//! buffer.put_address(0xdead_beef)?;
//!
//! assert_eq!(buffer.param_index(), 3);
//!
//! let (bytes, objects) = buffer.into_parts();
//! assert!(!bytes.is_empty());
//! assert!(objects.is_none());
//! # Ok::<(), callpack::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`platform`] - CPU, OS, byte order and the native layout of every primitive
//! - [`types`] - Native type descriptors and call signatures ([`CallContext`])
//! - [`config`] - Process-wide packing and validation switches
//! - [`invoke`] - Byte writers, packing strategies, payload collection and the
//!   [`InvocationBuffer`] put surface
//!
//! ## Packing Strategies
//!
//! The strategy is chosen once per process from the native platform and
//! [`Config::raw_parameter_packing`]:
//!
//! | Platform  | Raw packing | Strategy                     |
//! |-----------|-------------|------------------------------|
//! | i386      | on          | [`Encoder::RawI386`]         |
//! | any other | on          | [`Encoder::Raw`]             |
//! | any       | off         | [`Encoder::Default`]         |
//!
//! Buffers for other platforms are built with [`InvocationBuffer::with_encoder`] and
//! [`Encoder::select`].
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`]. Writing past the end of the parameter buffer
//! is reported as [`Error::OutOfBounds`] and leaves the buffer unchanged; see [`Error`] for
//! the complete list.
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events (strategy selection, configuration loading, object
//! buffer allocation) and never installs a subscriber.
//!
//! ## Development and Testing
//!
//! ```bash
//! cargo test
//! cargo bench
//! ```
#[macro_use]
pub(crate) mod error;

pub mod config;

pub mod invoke;

pub mod platform;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use callpack::prelude::*;
///
/// let context = CallContext::new(Type::void(), vec![Type::sint8()]);
/// let mut buffer = InvocationBuffer::new(&context);
/// buffer.put_byte(1)?;
/// # Ok::<(), callpack::Error>(())
/// ```
pub mod prelude;

pub mod types;

pub mod utils;

/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
/// This is used consistently throughout the crate for all fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `callpack` Error type
///
/// The main error type for all operations in this crate.
pub use error::Error;

/// Process-wide packing configuration
pub use config::Config;

/// The parameter buffer of one native call, and its packing strategy
pub use invoke::{Encoder, InvocationBuffer};

/// Call signatures and native type descriptors
pub use types::{CallContext, Type};
