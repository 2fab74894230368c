//! Telemetry failures.

use thiserror::Error;

/// Result alias for the telemetry crate.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Failure setting up logging.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global subscriber was already set, or setting one failed.
    #[error("failed to install tracing subscriber")]
    SubscriberInstall {
        /// Error from `tracing-subscriber`.
        source: tracing_subscriber::util::TryInitError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use tracing_subscriber::util::SubscriberInitExt;

    #[test]
    fn install_failure_keeps_its_source() {
        // One of the two installs must lose the global default.
        let source = match tracing_subscriber::registry().try_init() {
            Ok(()) => tracing_subscriber::registry()
                .try_init()
                .expect_err("global default already set"),
            Err(err) => err,
        };
        let err = TelemetryError::SubscriberInstall { source };
        assert_eq!(err.to_string(), "failed to install tracing subscriber");
        assert!(err.source().is_some());
    }
}
