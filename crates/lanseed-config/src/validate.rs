//! Range and consistency checks for a loaded configuration.

use std::fmt::Display;
use std::ops::RangeInclusive;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{SESSION_SECTION, SessionConfig};

/// Accepted log formats.
pub const LOG_FORMATS: &[&str] = &["pretty", "json"];

/// Validate every field of `config`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for the first field out of range.
pub fn validate(config: &SessionConfig) -> ConfigResult<()> {
    ensure_range("tick_interval_ms", config.tick_interval_ms, 10..=10_000)?;
    ensure_range("status_refresh_ticks", config.status_refresh_ticks, 1..=1_000)?;
    ensure_range("listen_port_start", config.listen_port_start, 1..=u16::MAX)?;
    ensure_range("listen_port_end", config.listen_port_end, 1..=u16::MAX)?;
    if config.listen_port_start > config.listen_port_end {
        return Err(ConfigError::invalid(
            SESSION_SECTION,
            "listen_port_end",
            Some(config.listen_port_end.to_string()),
            "must not be below listen_port_start",
        ));
    }
    ensure_range("event_bus_capacity", config.event_bus_capacity, 1..=usize::MAX)?;
    ensure_range("message_capacity", config.message_capacity, 1..=usize::MAX)?;
    if config.default_save_dir.as_os_str().is_empty() {
        return Err(ConfigError::invalid(
            SESSION_SECTION,
            "default_save_dir",
            None,
            "must not be empty",
        ));
    }
    if config.log_level.trim().is_empty() {
        return Err(ConfigError::invalid(
            SESSION_SECTION,
            "log_level",
            None,
            "must not be empty",
        ));
    }
    if let Some(format) = &config.log_format
        && !LOG_FORMATS.contains(&format.as_str())
    {
        return Err(ConfigError::invalid(
            SESSION_SECTION,
            "log_format",
            Some(format.clone()),
            "must be 'pretty' or 'json'",
        ));
    }
    Ok(())
}

fn ensure_range<T>(field: &str, value: T, range: RangeInclusive<T>) -> ConfigResult<()>
where
    T: PartialOrd + Display,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            SESSION_SECTION,
            field,
            Some(value.to_string()),
            "out of range",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn field_of(err: &ConfigError) -> &str {
        match err {
            ConfigError::InvalidField { field, .. } => field,
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn defaults_are_valid() {
        validate(&SessionConfig::default()).expect("defaults validate");
    }

    #[test]
    fn tick_interval_bounds() {
        let config = SessionConfig {
            tick_interval_ms: 5,
            ..SessionConfig::default()
        };
        let err = validate(&config).expect_err("too fast");
        assert_eq!(field_of(&err), "tick_interval_ms");
    }

    #[test]
    fn port_range_must_be_ordered() {
        let config = SessionConfig {
            listen_port_start: 7000,
            listen_port_end: 6000,
            ..SessionConfig::default()
        };
        let err = validate(&config).expect_err("reversed range");
        assert_eq!(field_of(&err), "listen_port_end");
    }

    #[test]
    fn zero_capacities_are_rejected() {
        let config = SessionConfig {
            message_capacity: 0,
            ..SessionConfig::default()
        };
        assert_eq!(field_of(&validate(&config).expect_err("zero")), "message_capacity");
    }

    #[test]
    fn empty_paths_and_unknown_formats_are_rejected() {
        let config = SessionConfig {
            default_save_dir: PathBuf::new(),
            ..SessionConfig::default()
        };
        assert_eq!(field_of(&validate(&config).expect_err("empty")), "default_save_dir");

        let config = SessionConfig {
            log_format: Some("xml".to_string()),
            ..SessionConfig::default()
        };
        match validate(&config).expect_err("format") {
            ConfigError::InvalidField { value, reason, .. } => {
                assert_eq!(value.as_deref(), Some("xml"));
                assert_eq!(reason, "must be 'pretty' or 'json'");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
