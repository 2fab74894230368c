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

//! Engine-agnostic torrent model and engine boundary.
//!
//! Layout: `hash.rs` (content hashes), `status.rs` (status snapshots),
//! `metadata.rs` (metadata and `.torrent` decoding), `magnet.rs` (magnet
//! links), `attachments.rs` and `record.rs` (tracked torrents), `engine.rs`
//! (alerts, commands, engine trait), `service.rs` (shell workflow trait).

/// Type-keyed extension storage.
pub mod attachments;
/// Alerts, commands and the engine trait.
pub mod engine;
/// Error types.
pub mod error;
/// Content hash.
pub mod hash;
/// Magnet link parsing.
pub mod magnet;
/// Metadata and metainfo decoding.
pub mod metadata;
/// Tracked torrent records.
pub mod record;
/// Shell-facing workflow trait.
pub mod service;
/// Status snapshots.
pub mod status;

pub use attachments::Attachments;
pub use engine::{AddSource, AddTorrentParams, Alert, EngineCommand, StatusEntry, TorrentEngine};
pub use error::{
    EngineError, HashError, MagnetError, MetainfoError, TorrentError, TorrentResult,
};
pub use hash::{ContentHash, HASH_LEN};
pub use magnet::{MagnetLink, parse_magnet};
pub use metadata::{TorrentMetadata, TorrentMetainfo};
pub use record::{AddFlags, Lifecycle, TorrentId, TorrentRecord};
pub use service::{AddOutcome, TorrentWorkflow};
pub use status::{SessionStatusSnapshot, StatusDelta, StatusField, StatusSnapshot, TorrentState};
