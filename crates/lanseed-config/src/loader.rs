//! Layered configuration loading: defaults, JSON file, environment.
//!
//! # Design
//! - The JSON document is checked key by key before decoding so a typo is
//!   reported as an unknown field rather than silently ignored.
//! - Environment lookups go through a caller-supplied function; tests never
//!   touch the process environment.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::model::{KNOWN_FIELDS, SESSION_SECTION, SessionConfig};
use crate::validate::validate;

/// Variable naming the optional JSON configuration file.
pub const CONFIG_PATH_ENV: &str = "LANSEED_CONFIG";
/// Override for `tick_interval_ms`.
pub const TICK_INTERVAL_ENV: &str = "LANSEED_TICK_INTERVAL_MS";
/// Override for `status_refresh_ticks`.
pub const STATUS_REFRESH_ENV: &str = "LANSEED_STATUS_REFRESH_TICKS";
/// Override for `default_save_dir`.
pub const SAVE_DIR_ENV: &str = "LANSEED_SAVE_DIR";
/// Override for `log_level`.
pub const LOG_LEVEL_ENV: &str = "LANSEED_LOG_LEVEL";
/// Override for `log_format`.
pub const LOG_FORMAT_ENV: &str = "LANSEED_LOG_FORMAT";
/// Override for `enable_lsd`.
pub const ENABLE_LSD_ENV: &str = "LANSEED_ENABLE_LSD";

const ENV_SECTION: &str = "env";

/// Load the configuration from the process environment.
///
/// # Errors
///
/// Returns an error when the file cannot be read or decoded, an override is
/// malformed, or the result fails validation.
pub fn load() -> ConfigResult<SessionConfig> {
    load_with(|key| std::env::var(key).ok())
}

/// Load the configuration using `lookup` to read environment variables.
///
/// # Errors
///
/// See [`load`].
pub fn load_with<F>(lookup: F) -> ConfigResult<SessionConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match lookup(CONFIG_PATH_ENV) {
        Some(path) if !path.trim().is_empty() => from_file(Path::new(&path))?,
        _ => SessionConfig::default(),
    };
    apply_env_overrides(&mut config, &lookup)?;
    validate(&config)?;
    debug!(?config, "configuration loaded");
    Ok(config)
}

/// Read and decode a JSON configuration file. The result is not validated.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file cannot be read and
/// [`ConfigError::Parse`] or [`ConfigError::UnknownField`] when it cannot be decoded.
pub fn from_file(path: &Path) -> ConfigResult<SessionConfig> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        operation: "config.read_file",
        path: path.to_path_buf(),
        source,
    })?;
    let config = from_json_str(&raw)?;
    info!(path = %path.display(), "loaded configuration file");
    Ok(config)
}

/// Decode a JSON document; missing fields take their defaults.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownField`] for keys the configuration does not
/// define and [`ConfigError::Parse`] for malformed documents or values.
pub fn from_json_str(raw: &str) -> ConfigResult<SessionConfig> {
    let value: Value = serde_json::from_str(raw).map_err(|source| ConfigError::Parse {
        operation: "config.parse_document",
        source,
    })?;
    let Some(object) = value.as_object() else {
        return Err(ConfigError::invalid(
            SESSION_SECTION,
            "$",
            None,
            "must be a JSON object",
        ));
    };
    if let Some(field) = object
        .keys()
        .find(|key| !KNOWN_FIELDS.contains(&key.as_str()))
    {
        return Err(ConfigError::UnknownField {
            section: SESSION_SECTION.to_string(),
            field: field.clone(),
        });
    }
    serde_json::from_value(value).map_err(|source| ConfigError::Parse {
        operation: "config.decode_document",
        source,
    })
}

/// Apply `LANSEED_*` overrides read through `lookup`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when an override cannot be parsed.
pub fn apply_env_overrides<F>(config: &mut SessionConfig, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(TICK_INTERVAL_ENV) {
        config.tick_interval_ms = parse_env(TICK_INTERVAL_ENV, &value, "must be an integer")?;
    }
    if let Some(value) = lookup(STATUS_REFRESH_ENV) {
        config.status_refresh_ticks = parse_env(STATUS_REFRESH_ENV, &value, "must be an integer")?;
    }
    if let Some(value) = lookup(SAVE_DIR_ENV) {
        config.default_save_dir = PathBuf::from(value);
    }
    if let Some(value) = lookup(LOG_LEVEL_ENV) {
        config.log_level = value;
    }
    if let Some(value) = lookup(LOG_FORMAT_ENV) {
        config.log_format = Some(value.trim().to_ascii_lowercase());
    }
    if let Some(value) = lookup(ENABLE_LSD_ENV) {
        config.enable_lsd = parse_flag(&value)?;
    }
    Ok(())
}

fn parse_env<T: FromStr>(name: &str, value: &str, reason: &'static str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(ENV_SECTION, name, Some(value.to_string()), reason))
}

fn parse_flag(value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(
            ENV_SECTION,
            ENABLE_LSD_ENV,
            Some(value.to_string()),
            "must be a boolean",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = load_with(lookup(&[])).expect("defaults");
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn partial_document_keeps_defaults() {
        let config = from_json_str(r#"{ "tick_interval_ms": 50, "enable_lsd": false }"#)
            .expect("decode");
        assert_eq!(config.tick_interval_ms, 50);
        assert!(!config.enable_lsd);
        assert_eq!(config.status_refresh_ticks, 10);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = from_json_str(r#"{ "tick_interval": 50 }"#).expect_err("unknown key");
        assert!(matches!(
            err,
            ConfigError::UnknownField { ref field, .. } if field == "tick_interval"
        ));
    }

    #[test]
    fn non_object_documents_are_rejected() {
        assert!(matches!(
            from_json_str("[1, 2]"),
            Err(ConfigError::InvalidField { .. })
        ));
        assert!(matches!(
            from_json_str("{ not json"),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            from_json_str(r#"{ "listen_port_start": 70000 }"#),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn environment_overrides_apply() {
        let config = load_with(lookup(&[
            (TICK_INTERVAL_ENV, "250"),
            (STATUS_REFRESH_ENV, " 4 "),
            (SAVE_DIR_ENV, "/tmp/lanseed"),
            (LOG_FORMAT_ENV, "JSON"),
            (ENABLE_LSD_ENV, "off"),
        ]))
        .expect("overrides");
        assert_eq!(config.tick_interval_ms, 250);
        assert_eq!(config.status_refresh_ticks, 4);
        assert_eq!(config.default_save_dir, PathBuf::from("/tmp/lanseed"));
        assert_eq!(config.log_format.as_deref(), Some("json"));
        assert!(!config.enable_lsd);
    }

    #[test]
    fn malformed_overrides_are_reported() {
        let err = load_with(lookup(&[(TICK_INTERVAL_ENV, "fast")])).expect_err("not a number");
        assert!(matches!(
            err,
            ConfigError::InvalidField { ref field, reason: "must be an integer", .. }
                if field == TICK_INTERVAL_ENV
        ));
        assert!(load_with(lookup(&[(ENABLE_LSD_ENV, "maybe")])).is_err());
    }

    #[test]
    fn overrides_are_validated() {
        let err = load_with(lookup(&[(STATUS_REFRESH_ENV, "0")])).expect_err("zero");
        assert!(matches!(
            err,
            ConfigError::InvalidField { ref field, .. } if field == "status_refresh_ticks"
        ));
    }
}
