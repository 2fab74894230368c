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

//! Session core: owns the engine connection, keeps the identity map of tracked
//! torrents, turns engine alerts into record updates, and maintains the
//! incremental projections the GUI and tray render.
//!
//! The synchronous [`Session`] is driven by [`worker::spawn`], which ticks it on
//! a tokio interval and serves a cloneable [`SessionHandle`].

mod command;
/// Session and projection errors.
pub mod error;
/// Async handle implementing the shell workflow.
pub mod handle;
/// In-memory engine for tests and engine-less runs.
pub mod loopback;
/// User-facing message list.
pub mod messages;
/// Synchronous observer hooks.
pub mod observer;
/// Generic incremental projection engine and its policies.
pub mod projection;
/// Session core.
pub mod session;
/// Owned session snapshots.
pub mod snapshot;
/// Tray summary.
pub mod summary;
/// The three torrent views.
pub mod views;
/// Background worker that ticks a session.
pub mod worker;

pub use error::{ProjectionError, SessionError, SessionResult};
pub use handle::SessionHandle;
pub use loopback::LoopbackEngine;
pub use messages::{Message, MessageId, MessageLevel, MessageList};
pub use observer::{SessionNotification, SessionObserver};
pub use projection::{
    ActiveDownloads, ActiveUploads, AllTorrents, Classification, EntitySource, Projection,
    ProjectionChange, ProjectionPolicy,
};
pub use session::{DEFAULT_STATUS_REFRESH_TICKS, Session, SessionSettings, TickReport};
pub use snapshot::{SessionSnapshot, TorrentOverview};
pub use summary::{SessionSummary, format_speed};
pub use views::{TorrentViews, ViewChange, ViewKind};
