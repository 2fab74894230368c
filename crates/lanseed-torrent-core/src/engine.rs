//! Narrow boundary to the external torrent engine.
//!
//! The engine is a black box that accepts fire-and-forget commands and queues
//! alerts describing what happened. The session drains that queue once per
//! tick; command outcomes are only ever observed through later alerts.

use std::path::PathBuf;

use crate::error::EngineError;
use crate::hash::ContentHash;
use crate::magnet::MagnetLink;
use crate::metadata::{TorrentMetadata, TorrentMetainfo};
use crate::record::AddFlags;
use crate::status::{SessionStatusSnapshot, StatusSnapshot};

/// One entry of a status batch.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusEntry {
    /// Torrent the status belongs to.
    pub hash: ContentHash,
    /// Fresh engine status.
    pub status: StatusSnapshot,
}

/// Asynchronous event emitted by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    /// An add request succeeded.
    TorrentAdded {
        /// Hash the torrent was added under.
        hash: ContentHash,
    },
    /// An add request failed.
    AddFailed {
        /// Hash of the rejected torrent.
        hash: ContentHash,
        /// Engine diagnostic.
        error: EngineError,
    },
    /// A torrent left the session.
    TorrentRemoved {
        /// Hash of the removed torrent.
        hash: ContentHash,
    },
    /// Files of a removed torrent were deleted.
    TorrentDeleted {
        /// Hash of the removed torrent.
        hash: ContentHash,
    },
    /// Files of a removed torrent could not be deleted.
    DeleteFailed {
        /// Hash of the removed torrent.
        hash: ContentHash,
        /// Engine diagnostic.
        error: EngineError,
    },
    /// Full metadata arrived for a torrent.
    MetadataReceived {
        /// Hash of the torrent.
        hash: ContentHash,
        /// Decoded metadata.
        metadata: TorrentMetadata,
    },
    /// Fetching metadata failed.
    MetadataFailed {
        /// Hash of the torrent.
        hash: ContentHash,
        /// Engine diagnostic.
        error: EngineError,
    },
    /// A torrent's content hash changed.
    IdentityChanged {
        /// Hash the torrent was known by.
        old: ContentHash,
        /// Hash the torrent is known by from now on.
        new: ContentHash,
    },
    /// Periodic status refresh for a set of torrents.
    StatusBatch {
        /// One entry per torrent whose status was reported.
        entries: Vec<StatusEntry>,
    },
    /// Any alert the session does not interpret.
    Other {
        /// Engine alert name.
        kind: String,
        /// Engine message.
        message: String,
    },
}

impl Alert {
    /// Machine-friendly discriminator.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::TorrentAdded { .. } => "torrent_added",
            Self::AddFailed { .. } => "add_failed",
            Self::TorrentRemoved { .. } => "torrent_removed",
            Self::TorrentDeleted { .. } => "torrent_deleted",
            Self::DeleteFailed { .. } => "delete_failed",
            Self::MetadataReceived { .. } => "metadata_received",
            Self::MetadataFailed { .. } => "metadata_failed",
            Self::IdentityChanged { .. } => "identity_changed",
            Self::StatusBatch { .. } => "status_batch",
            Self::Other { .. } => "other",
        }
    }

    /// Hash a torrent-scoped alert refers to; for identity changes, the new hash.
    #[must_use]
    pub const fn hash(&self) -> Option<ContentHash> {
        match self {
            Self::TorrentAdded { hash }
            | Self::AddFailed { hash, .. }
            | Self::TorrentRemoved { hash }
            | Self::TorrentDeleted { hash }
            | Self::DeleteFailed { hash, .. }
            | Self::MetadataReceived { hash, .. }
            | Self::MetadataFailed { hash, .. } => Some(*hash),
            Self::IdentityChanged { new, .. } => Some(*new),
            Self::StatusBatch { .. } | Self::Other { .. } => None,
        }
    }
}

/// Payload of an add command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddSource {
    /// Complete metainfo from a `.torrent` file.
    Metainfo(TorrentMetainfo),
    /// Magnet link; metadata is fetched from peers.
    Magnet(MagnetLink),
}

impl AddSource {
    /// Hash the torrent is added under.
    #[must_use]
    pub const fn info_hash(&self) -> ContentHash {
        match self {
            Self::Metainfo(metainfo) => metainfo.info_hash(),
            Self::Magnet(link) => link.info_hash(),
        }
    }
}

/// Parameters of an add command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddTorrentParams {
    /// What to add.
    pub source: AddSource,
    /// Directory the payload is stored in.
    pub save_dir: PathBuf,
    /// Engine flags.
    pub flags: AddFlags,
}

/// Command issued to the engine. Effects surface later as alerts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    /// Add a torrent.
    Add(AddTorrentParams),
    /// Remove a torrent, optionally deleting its files.
    Remove {
        /// Hash of the torrent.
        hash: ContentHash,
        /// Delete downloaded files as well.
        delete_files: bool,
    },
    /// Ask for a status batch covering torrents with changes.
    PostStatusUpdates,
    /// Start local peer discovery.
    StartLocalDiscovery,
}

impl EngineCommand {
    /// Machine-friendly discriminator.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Remove {
                delete_files: false,
                ..
            } => "remove",
            Self::Remove {
                delete_files: true, ..
            } => "remove_with_files",
            Self::PostStatusUpdates => "post_status_updates",
            Self::StartLocalDiscovery => "start_local_discovery",
        }
    }
}

/// The external engine as seen by the session.
///
/// Implementations must not block: `submit` enqueues, `pop_alerts` drains
/// whatever has accumulated since the previous call in arrival order.
pub trait TorrentEngine: Send {
    /// Enqueue a command.
    fn submit(&mut self, command: EngineCommand);

    /// Drain all queued alerts in arrival order.
    fn pop_alerts(&mut self) -> Vec<Alert>;

    /// Current aggregate session status.
    fn session_status(&self) -> SessionStatusSnapshot;
}

impl<E: TorrentEngine + ?Sized> TorrentEngine for Box<E> {
    fn submit(&mut self, command: EngineCommand) {
        (**self).submit(command);
    }

    fn pop_alerts(&mut self) -> Vec<Alert> {
        (**self).pop_alerts()
    }

    fn session_status(&self) -> SessionStatusSnapshot {
        (**self).session_status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_hash_uses_new_hash_for_identity_changes() {
        let old = ContentHash::from_bytes([1; 20]);
        let new = ContentHash::from_bytes([2; 20]);
        let alert = Alert::IdentityChanged { old, new };
        assert_eq!(alert.hash(), Some(new));
        assert_eq!(alert.kind(), "identity_changed");
        assert_eq!(Alert::StatusBatch { entries: Vec::new() }.hash(), None);
    }

    #[test]
    fn remove_command_kind_reflects_file_deletion() {
        let hash = ContentHash::from_bytes([3; 20]);
        assert_eq!(
            EngineCommand::Remove {
                hash,
                delete_files: true
            }
            .kind(),
            "remove_with_files"
        );
        assert_eq!(
            EngineCommand::Remove {
                hash,
                delete_files: false
            }
            .kind(),
            "remove"
        );
    }
}
