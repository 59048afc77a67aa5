use thiserror::Error;

use crate::types::NativeType;

macro_rules! config_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Config {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Config {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Encoding an invocation buffer is a deterministic, local computation, so none of these errors
/// are transient. They fall into three groups:
///
/// ## Contract violations
/// - [`Error::OutOfBounds`] - A write would land outside the parameter buffer, or a payload
///   window lies outside its source data
/// - [`Error::ParameterCount`] - More puts than the signature has parameters (validation only)
/// - [`Error::ParameterMismatch`] - A put does not match the declared parameter type
///   (validation only)
/// - [`Error::NotSupported`] - The operation cannot be expressed for the parameter or platform
///
/// ## Conversion
/// - [`Error::LongDoubleConversion`] - A value could not be converted to the platform's
///   extended-precision format
///
/// ## Configuration
/// - [`Error::Config`] - An environment override could not be parsed
///
/// # Examples
///
/// ```rust
/// use callpack::{CallContext, Error, InvocationBuffer, Type};
///
/// let context = CallContext::new(Type::sint32(), vec![Type::sint32()]);
/// let mut buffer = InvocationBuffer::new(&context);
/// buffer.put_int(1)?;
///
/// match buffer.put_int(2) {
///     Err(Error::OutOfBounds) => println!("signature only declares one parameter"),
///     Err(e) => println!("other error: {e}"),
///     Ok(()) => {}
/// }
/// # Ok::<(), callpack::Error>(())
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// An out of bound write was attempted.
    ///
    /// Raised when a put would write past the end of the parameter buffer, which means the
    /// caller issued more (or wider) puts than the signature accounts for, or when a
    /// by-reference payload's offset and length do not fit its source.
    #[error("Out of Bound write would have occurred!")]
    OutOfBounds,

    /// A put was issued after all declared parameters were filled.
    ///
    /// Only reported when parameter validation is enabled in [`crate::Config`].
    #[error("Parameter index {index} exceeds the signature's {count} parameters")]
    ParameterCount {
        /// Index of the offending put
        index: usize,
        /// Number of parameters declared by the signature
        count: usize,
    },

    /// A put does not match the type declared for the parameter.
    ///
    /// Only reported when parameter validation is enabled in [`crate::Config`].
    #[error("Parameter {index} is declared as {expected}, but a {found} value was put")]
    ParameterMismatch {
        /// Index of the offending put
        index: usize,
        /// The type declared by the signature
        expected: NativeType,
        /// The kind of put that was issued
        found: &'static str,
    },

    /// The requested encoding is not supported for this parameter or platform.
    #[error("Not supported - {0}")]
    NotSupported(String),

    /// Conversion to the platform's extended-precision float format failed.
    #[error("Long double conversion failed - {0}")]
    LongDoubleConversion(String),

    /// A configuration value could not be parsed.
    ///
    /// # Fields
    ///
    /// * `message` - Description of the invalid value
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Config - {file}:{line}: {message}")]
    Config {
        /// The message to be printed for the Config error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },
}
