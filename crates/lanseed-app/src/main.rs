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

//! Binary entrypoint that wires the lanseed session core together and runs it
//! until interrupted.

use lanseed_app::{AppResult, run_app};

/// Bootstraps the session and blocks until shutdown.
#[tokio::main]
async fn main() -> AppResult<()> {
    run_app().await
}
