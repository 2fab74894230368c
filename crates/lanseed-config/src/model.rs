//! Typed session configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Section name used in configuration errors for the JSON document.
pub const SESSION_SECTION: &str = "session";

/// Default poll/dispatch period in milliseconds.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;
/// Default number of ticks between requested status refreshes.
pub const DEFAULT_STATUS_REFRESH_TICKS: u32 = 10;
/// Default first engine listen port.
pub const DEFAULT_LISTEN_PORT_START: u16 = 6881;
/// Default last engine listen port.
pub const DEFAULT_LISTEN_PORT_END: u16 = 6891;
/// Default event bus replay capacity.
pub const DEFAULT_EVENT_BUS_CAPACITY: usize = 1_024;
/// Default number of retained user-facing messages.
pub const DEFAULT_MESSAGE_CAPACITY: usize = 256;

/// Keys accepted in the JSON document.
pub const KNOWN_FIELDS: &[&str] = &[
    "tick_interval_ms",
    "status_refresh_ticks",
    "listen_port_start",
    "listen_port_end",
    "enable_lsd",
    "default_save_dir",
    "event_bus_capacity",
    "message_capacity",
    "log_level",
    "log_format",
];

/// Runtime configuration of the session core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Period of the poll/dispatch loop in milliseconds.
    pub tick_interval_ms: u64,
    /// Ticks without a status batch before one is requested.
    pub status_refresh_ticks: u32,
    /// First port of the engine listen range.
    pub listen_port_start: u16,
    /// Last port of the engine listen range.
    pub listen_port_end: u16,
    /// Start local peer discovery with the session.
    pub enable_lsd: bool,
    /// Directory used when an add names none.
    pub default_save_dir: PathBuf,
    /// Replay and broadcast capacity of the event bus.
    pub event_bus_capacity: usize,
    /// Maximum retained user-facing messages.
    pub message_capacity: usize,
    /// Default log filter directive.
    pub log_level: String,
    /// Log output format (`pretty` or `json`); inferred from the build when unset.
    pub log_format: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            status_refresh_ticks: DEFAULT_STATUS_REFRESH_TICKS,
            listen_port_start: DEFAULT_LISTEN_PORT_START,
            listen_port_end: DEFAULT_LISTEN_PORT_END,
            enable_lsd: true,
            default_save_dir: PathBuf::from("./downloads"),
            event_bus_capacity: DEFAULT_EVENT_BUS_CAPACITY,
            message_capacity: DEFAULT_MESSAGE_CAPACITY,
            log_level: "info".to_string(),
            log_format: None,
        }
    }
}

impl SessionConfig {
    /// Poll/dispatch period.
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_fields_cover_the_serialised_form() {
        let value = serde_json::to_value(SessionConfig::default()).expect("serialise");
        let object = value.as_object().expect("object");
        assert_eq!(object.len(), KNOWN_FIELDS.len());
        for key in object.keys() {
            assert!(KNOWN_FIELDS.contains(&key.as_str()), "{key} missing");
        }
    }

    #[test]
    fn tick_interval_uses_milliseconds() {
        let config = SessionConfig {
            tick_interval_ms: 250,
            ..SessionConfig::default()
        };
        assert_eq!(config.tick_interval(), Duration::from_millis(250));
    }
}
