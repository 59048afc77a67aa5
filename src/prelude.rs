//! # callpack Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the callpack library. Import this module to get quick access to everything needed
//! to describe a signature and fill its parameter buffer.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all callpack operations
pub use crate::Error;

/// The result type used throughout callpack
pub use crate::Result;

/// Process-wide packing and validation configuration
pub use crate::Config;

// ================================================================================================
// Signatures
// ================================================================================================

/// Call signatures and their builder
pub use crate::types::{CallContext, CallContextBuilder, CallFlags, CallingConvention};

/// Native type descriptors
pub use crate::types::{NativeType, Type};

// ================================================================================================
// Platform
// ================================================================================================

/// Target description and primitive layouts
pub use crate::platform::{ByteOrder, Cpu, Os, Platform, PrimitiveLayout, TypeLayout};

// ================================================================================================
// Argument Packing
// ================================================================================================

/// The put surface and its packing strategy
pub use crate::invoke::{Encoder, InvocationBuffer};

/// By-reference payloads handed to the call bridge
pub use crate::invoke::{
    ComponentType, HeapArray, ObjectBuffer, ObjectEntry, ObjectParameter, ObjectType,
    ParameterFlags, Payload, PayloadKind,
};

/// Extended precision representation
pub use crate::invoke::LongDoubleFormat;
