#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![warn(
    unused,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links
)]

//! Layered configuration for the session core.
//!
//! Layout: `model.rs` (typed configuration and defaults), `loader.rs` (JSON
//! file and environment layering), `validate.rs` (range checks), `error.rs`.

pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    CONFIG_PATH_ENV, ENABLE_LSD_ENV, LOG_FORMAT_ENV, LOG_LEVEL_ENV, SAVE_DIR_ENV,
    STATUS_REFRESH_ENV, TICK_INTERVAL_ENV, apply_env_overrides, from_file, from_json_str, load,
    load_with,
};
pub use model::SessionConfig;
pub use validate::validate;
