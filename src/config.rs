//! Process configuration for argument packing.
//!
//! Two switches influence how invocation buffers are built:
//!
//! - `raw_parameter_packing` selects the raw encoders, which lay arguments out exactly as the
//!   native stack convention expects, instead of the default fixed-slot encoder.
//! - `validate_parameters` makes every put check the call sequence against the signature.
//!   Off by default; the unchecked path is the zero-overhead one.
//!
//! The process-wide configuration is read once from the environment by [`Config::global`]:
//!
//! | Variable               | Field                   |
//! |------------------------|-------------------------|
//! | `CALLPACK_RAW_PACKING` | `raw_parameter_packing` |
//! | `CALLPACK_VALIDATE`    | `validate_parameters`   |
//!
//! Accepted values are `1`, `0`, `true`, `false`, `yes`, `no`, `on` and `off`.

use std::sync::OnceLock;

use tracing::{debug, warn};

use crate::Result;

/// Environment variable enabling raw parameter packing
pub const ENV_RAW_PACKING: &str = "CALLPACK_RAW_PACKING";
/// Environment variable enabling parameter validation
pub const ENV_VALIDATE: &str = "CALLPACK_VALIDATE";

/// Configuration for invocation buffer construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Pack arguments to the native stack layout (raw encoders)
    pub raw_parameter_packing: bool,

    /// Check every put against the signature's parameter count and types
    pub validate_parameters: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            raw_parameter_packing: false,
            validate_parameters: false,
        }
    }
}

impl Config {
    /// Raw packing without validation
    #[must_use]
    pub fn raw() -> Self {
        Self {
            raw_parameter_packing: true,
            validate_parameters: false,
        }
    }

    /// Default packing with every put validated against the signature
    #[must_use]
    pub fn strict() -> Self {
        Self {
            raw_parameter_packing: false,
            validate_parameters: true,
        }
    }

    /// Reads the configuration from the process environment, starting from the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if a variable is set to an unrecognised value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if a variable is set to an unrecognised value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = lookup(ENV_RAW_PACKING) {
            config.raw_parameter_packing = parse_switch(ENV_RAW_PACKING, &value)?;
        }
        if let Some(value) = lookup(ENV_VALIDATE) {
            config.validate_parameters = parse_switch(ENV_VALIDATE, &value)?;
        }
        Ok(config)
    }

    /// The process-wide configuration, read from the environment on first use.
    ///
    /// An invalid environment value is reported once and the defaults are used instead.
    pub fn global() -> &'static Config {
        static GLOBAL: OnceLock<Config> = OnceLock::new();
        GLOBAL.get_or_init(|| match Self::from_env() {
            Ok(config) => {
                debug!(
                    raw_parameter_packing = config.raw_parameter_packing,
                    validate_parameters = config.validate_parameters,
                    "loaded invocation config"
                );
                config
            }
            Err(error) => {
                warn!(%error, "ignoring invalid invocation config");
                Self::default()
            }
        })
    }
}

fn parse_switch(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(config_error!("{} has invalid value '{}'", name, other)),
    }
}
