//! # Design
//!
//! - Every failure that ends the process surfaces as an [`AppError`].
//! - Messages stay constant; the `operation` field says where it happened.
//! - Sources are kept intact; `main` reports them on exit.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for the binary.
pub type AppResult<T> = Result<T, AppError>;

/// Failure that stops the lanseed process.
#[derive(Debug, Error)]
pub enum AppError {
    /// The configuration could not be loaded.
    #[error("configuration unavailable")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Loader error.
        source: lanseed_config::ConfigError,
    },
    /// Logging could not be set up.
    #[error("logging setup failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Telemetry error.
        source: lanseed_telemetry::TelemetryError,
    },
    /// A file named on the command line could not be read.
    #[error("file access failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// File that could not be accessed.
        path: Option<PathBuf>,
        /// Source IO error.
        source: io::Error,
    },
    /// A background task panicked or was cancelled.
    #[error("background task failed")]
    Join {
        /// Operation identifier.
        operation: &'static str,
        /// Source join error.
        source: tokio::task::JoinError,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: lanseed_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: lanseed_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn io(
        operation: &'static str,
        path: Option<PathBuf>,
        source: io::Error,
    ) -> Self {
        Self::Io {
            operation,
            path,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn app_error_helpers_build_variants() {
        let config = AppError::config(
            "config.load",
            lanseed_config::ConfigError::UnknownField {
                section: "session".to_string(),
                field: "bogus".to_string(),
            },
        );
        assert_eq!(config.to_string(), "configuration unavailable");
        assert!(config.source().is_some());

        let io = AppError::io(
            "startup.read_torrent",
            Some(PathBuf::from("missing.torrent")),
            io::Error::other("missing"),
        );
        assert!(matches!(io, AppError::Io { path: Some(_), .. }));
        assert_eq!(io.to_string(), "file access failed");
    }
}
