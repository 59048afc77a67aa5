//! Call signatures.

use bitflags::bitflags;
use strum::Display;

use crate::{
    invoke::encoder::raw_parameter_size,
    platform::Platform,
    types::{NativeType, Type},
    Config,
};

/// Calling convention of the native function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
pub enum CallingConvention {
    /// The platform's default C convention
    #[default]
    Default,
    /// Windows `__stdcall`; callee pops the arguments
    Stdcall,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    /// Per-signature call options
    pub struct CallFlags: u32 {
        /// Capture `errno` / `GetLastError` after the call
        const SAVE_ERRNO = 0x0001;
        /// Run the call with fault protection enabled
        const FAULT_PROTECT = 0x0002;
        /// Arguments are packed to the native stack layout instead of fixed slots
        const RAW_PACKING = 0x0004;
    }
}

/// The signature an [`crate::InvocationBuffer`] is filled for.
///
/// Immutable once built. Besides the ordered parameter types it records the platform whose
/// layout rules were used to compute [`CallContext::raw_parameter_size`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    return_type: Type,
    parameter_types: Vec<Type>,
    convention: CallingConvention,
    flags: CallFlags,
    platform: Platform,
    raw_parameter_size: usize,
}

impl CallContext {
    /// Signature for the native platform using the default convention.
    ///
    /// The [`CallFlags::RAW_PACKING`] flag follows [`Config::global`].
    #[must_use]
    pub fn new(return_type: Type, parameter_types: Vec<Type>) -> Self {
        CallContextBuilder::new()
            .returns(return_type)
            .parameters(parameter_types)
            .build()
    }

    /// Starts a [`CallContextBuilder`].
    #[must_use]
    pub fn builder() -> CallContextBuilder {
        CallContextBuilder::new()
    }

    /// Return type
    #[must_use]
    pub fn return_type(&self) -> &Type {
        &self.return_type
    }

    /// Number of parameters
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.parameter_types.len()
    }

    /// Type of the parameter at `index`, if it exists.
    #[must_use]
    pub fn parameter_type(&self, index: usize) -> Option<&Type> {
        self.parameter_types.get(index)
    }

    /// All parameter types in order
    #[must_use]
    pub fn parameter_types(&self) -> &[Type] {
        &self.parameter_types
    }

    /// Calling convention
    #[must_use]
    pub fn convention(&self) -> CallingConvention {
        self.convention
    }

    /// Call flags
    #[must_use]
    pub fn flags(&self) -> CallFlags {
        self.flags
    }

    /// Whether the signature is packed to the native stack layout.
    #[must_use]
    pub fn is_raw(&self) -> bool {
        self.flags.contains(CallFlags::RAW_PACKING)
    }

    /// Platform whose layout rules apply to this signature
    #[must_use]
    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Size in bytes of the raw-packed argument frame.
    ///
    /// Every argument starts at a multiple of its own alignment and of the raw slot width,
    /// and the total is rounded up to the slot width. The value is computed for every
    /// signature but is only consulted by the raw encoders.
    #[must_use]
    pub fn raw_parameter_size(&self) -> usize {
        self.raw_parameter_size
    }
}

/// Builder for [`CallContext`].
///
/// # Examples
///
/// ```rust
/// use callpack::{
///     platform::{Cpu, Os, Platform},
///     types::{CallFlags, NativeType},
///     CallContext, Type,
/// };
///
/// let i386 = Platform::new(Cpu::I386, Os::Linux);
/// let context = CallContext::builder()
///     .platform(i386)
///     .flags(CallFlags::RAW_PACKING)
///     .parameter(Type::primitive(NativeType::SInt8, &i386))
///     .parameter(Type::primitive(NativeType::SInt64, &i386))
///     .build();
///
/// assert_eq!(context.raw_parameter_size(), 12);
/// ```
#[derive(Debug, Clone)]
pub struct CallContextBuilder {
    return_type: Option<Type>,
    parameter_types: Vec<Type>,
    convention: CallingConvention,
    flags: Option<CallFlags>,
    platform: Platform,
}

impl CallContextBuilder {
    /// Creates a builder for the native platform returning `void`.
    #[must_use]
    pub fn new() -> Self {
        CallContextBuilder {
            return_type: None,
            parameter_types: Vec::new(),
            convention: CallingConvention::Default,
            flags: None,
            platform: *Platform::native(),
        }
    }

    /// Sets the platform whose layout rules are used.
    #[must_use]
    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Sets the return type.
    #[must_use]
    pub fn returns(mut self, return_type: Type) -> Self {
        self.return_type = Some(return_type);
        self
    }

    /// Appends a parameter.
    #[must_use]
    pub fn parameter(mut self, parameter: Type) -> Self {
        self.parameter_types.push(parameter);
        self
    }

    /// Appends several parameters.
    #[must_use]
    pub fn parameters(mut self, parameters: impl IntoIterator<Item = Type>) -> Self {
        self.parameter_types.extend(parameters);
        self
    }

    /// Sets the calling convention.
    #[must_use]
    pub fn convention(mut self, convention: CallingConvention) -> Self {
        self.convention = convention;
        self
    }

    /// Sets the call flags, replacing the configured default.
    #[must_use]
    pub fn flags(mut self, flags: CallFlags) -> Self {
        self.flags = Some(flags);
        self
    }

    /// Finalizes the signature and computes its raw parameter size.
    #[must_use]
    pub fn build(self) -> CallContext {
        let flags = self.flags.unwrap_or_else(|| {
            if Config::global().raw_parameter_packing {
                CallFlags::RAW_PACKING
            } else {
                CallFlags::empty()
            }
        });
        let raw_parameter_size = raw_parameter_size(&self.parameter_types, &self.platform);
        let return_type = self
            .return_type
            .unwrap_or_else(|| Type::primitive(NativeType::Void, &self.platform));

        CallContext {
            return_type,
            parameter_types: self.parameter_types,
            convention: self.convention,
            flags,
            platform: self.platform,
            raw_parameter_size,
        }
    }
}

impl Default for CallContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
