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

//! lanseed application bootstrap wiring.
//!
//! Layout: `bootstrap.rs` (config, logging, session worker), `error.rs`.

/// Application bootstrap and environment loading.
pub mod bootstrap;
/// Application-level errors.
pub mod error;

pub use bootstrap::run_app;
pub use error::{AppError, AppResult};
