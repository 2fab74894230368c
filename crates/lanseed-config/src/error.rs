//! Error types for configuration loading.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Why a configuration could not be produced.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field or override holds a value outside its accepted range.
    #[error("configuration value rejected")]
    InvalidField {
        /// `session` for document fields, `env` for overrides.
        section: String,
        /// Field or variable name.
        field: String,
        /// Rejected value, when it can be shown.
        value: Option<String>,
        /// Short constant describing the accepted values.
        reason: &'static str,
    },
    /// The document names a key the configuration does not define.
    #[error("unrecognised configuration key")]
    UnknownField {
        /// Section the key appeared in.
        section: String,
        /// The key.
        field: String,
    },
    /// The configuration file could not be read.
    #[error("configuration file unreadable")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// File involved.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// Configuration document could not be decoded.
    #[error("configuration document is malformed")]
    Parse {
        /// Operation identifier.
        operation: &'static str,
        /// Source JSON error.
        source: serde_json::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid(
        section: &str,
        field: &str,
        value: Option<String>,
        reason: &'static str,
    ) -> Self {
        Self::InvalidField {
            section: section.to_string(),
            field: field.to_string(),
            value,
            reason,
        }
    }
}

/// Result alias for the configuration crate.
pub type ConfigResult<T> = Result<T, ConfigError>;
