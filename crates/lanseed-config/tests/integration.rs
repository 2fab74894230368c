use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use lanseed_config::{
    CONFIG_PATH_ENV, ConfigError, LOG_LEVEL_ENV, SessionConfig, from_file, load_with,
};
use serde_json::json;

#[test]
fn file_then_environment_layering() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("lanseed.json");
    let document = json!({
        "tick_interval_ms": 200,
        "status_refresh_ticks": 5,
        "default_save_dir": dir.path().join("incoming"),
        "log_level": "debug",
    });
    fs::write(&path, serde_json::to_vec_pretty(&document)?)?;

    let path_string = path.display().to_string();
    let config = load_with(|key| match key {
        CONFIG_PATH_ENV => Some(path_string.clone()),
        LOG_LEVEL_ENV => Some("lanseed_session=trace".to_string()),
        _ => None,
    })?;

    assert_eq!(config.tick_interval_ms, 200);
    assert_eq!(config.status_refresh_ticks, 5);
    assert_eq!(config.default_save_dir, dir.path().join("incoming"));
    assert_eq!(config.log_level, "lanseed_session=trace");
    assert_eq!(config.message_capacity, SessionConfig::default().message_capacity);
    Ok(())
}

#[test]
fn missing_file_reports_the_path() {
    let missing = PathBuf::from("/nonexistent/lanseed/config.json");
    match from_file(&missing) {
        Err(ConfigError::Io { path, operation, .. }) => {
            assert_eq!(path, missing);
            assert_eq!(operation, "config.read_file");
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn invalid_file_values_fail_validation() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("lanseed.json");
    fs::write(&path, r#"{ "listen_port_start": 7000, "listen_port_end": 6000 }"#)?;

    let path_string = path.display().to_string();
    let err = load_with(|key| (key == CONFIG_PATH_ENV).then(|| path_string.clone()))
        .expect_err("reversed port range");
    assert!(matches!(
        err,
        ConfigError::InvalidField { ref field, .. } if field == "listen_port_end"
    ));
    Ok(())
}
