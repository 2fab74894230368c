//! Event payload types carried from the session core to asynchronous observers.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Identifier assigned to each event emitted by the session.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Typed domain events surfaced by the session core.
///
/// Hashes are rendered as lowercase hex so the payloads stay independent of the
/// torrent model crate.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The engine emitted an alert; carries the alert kind and the resolved torrent.
    AlertObserved {
        /// Machine-friendly alert discriminator.
        alert: String,
        /// Torrent the alert resolved to, if any.
        torrent_id: Option<Uuid>,
    },
    /// The engine confirmed that a torrent was added.
    TorrentAdded {
        /// Stable identifier of the torrent.
        torrent_id: Uuid,
        /// Content hash at the time of the add.
        info_hash: String,
        /// Display name when metadata is known.
        name: Option<String>,
    },
    /// The engine rejected an add request.
    AddFailed {
        /// Stable identifier of the discarded torrent.
        torrent_id: Uuid,
        /// Content hash of the rejected torrent.
        info_hash: String,
        /// Engine diagnostic.
        message: String,
    },
    /// The engine confirmed that a torrent left the session.
    TorrentRemoved {
        /// Stable identifier of the torrent.
        torrent_id: Uuid,
        /// Content hash of the removed torrent.
        info_hash: String,
    },
    /// Files of a removed torrent were purged from disk.
    TorrentDeleted {
        /// Stable identifier of the torrent.
        torrent_id: Uuid,
        /// Content hash of the deleted torrent.
        info_hash: String,
    },
    /// File deletion for a removed torrent failed.
    DeleteFailed {
        /// Stable identifier of the torrent.
        torrent_id: Uuid,
        /// Content hash of the torrent.
        info_hash: String,
        /// Engine diagnostic.
        message: String,
    },
    /// Full metadata became available for a torrent.
    MetadataReceived {
        /// Stable identifier of the torrent.
        torrent_id: Uuid,
        /// Display name from the metadata.
        name: String,
    },
    /// Fetching metadata failed for a torrent.
    MetadataFailed {
        /// Stable identifier of the torrent.
        torrent_id: Uuid,
        /// Engine diagnostic.
        message: String,
    },
    /// A torrent moved from its provisional hash to its true hash.
    TorrentRekeyed {
        /// Stable identifier of the torrent.
        torrent_id: Uuid,
        /// Hash the torrent was known by before.
        old_hash: String,
        /// Hash the torrent is known by now.
        new_hash: String,
    },
    /// Engine status of a torrent was refreshed.
    StatusUpdated {
        /// Stable identifier of the torrent.
        torrent_id: Uuid,
        /// Engine-reported download state.
        state: String,
        /// Completion in parts per million.
        progress_ppm: u32,
        /// Total download rate in bytes per second.
        download_rate: u64,
        /// Total upload rate in bytes per second.
        upload_rate: u64,
    },
    /// Aggregate session rates changed.
    SessionStatusUpdated {
        /// Connected peers across all torrents.
        num_peers: u32,
        /// Payload download rate in bytes per second.
        download_rate: u64,
        /// Payload upload rate in bytes per second.
        upload_rate: u64,
    },
    /// System health status changed (degraded or restored components).
    HealthChanged {
        /// Components currently considered degraded.
        degraded: Vec<String>,
    },
    /// The session was asked to shut down.
    SessionClosed,
}

impl Event {
    /// Machine-friendly discriminator for log and UI consumers.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AlertObserved { .. } => "alert_observed",
            Self::TorrentAdded { .. } => "torrent_added",
            Self::AddFailed { .. } => "add_failed",
            Self::TorrentRemoved { .. } => "torrent_removed",
            Self::TorrentDeleted { .. } => "torrent_deleted",
            Self::DeleteFailed { .. } => "delete_failed",
            Self::MetadataReceived { .. } => "metadata_received",
            Self::MetadataFailed { .. } => "metadata_failed",
            Self::TorrentRekeyed { .. } => "torrent_rekeyed",
            Self::StatusUpdated { .. } => "status_updated",
            Self::SessionStatusUpdated { .. } => "session_status_updated",
            Self::HealthChanged { .. } => "health_changed",
            Self::SessionClosed => "session_closed",
        }
    }

    /// Torrent the event refers to, when it is torrent-scoped.
    #[must_use]
    pub const fn torrent_id(&self) -> Option<Uuid> {
        match self {
            Self::AlertObserved { torrent_id, .. } => *torrent_id,
            Self::TorrentAdded { torrent_id, .. }
            | Self::AddFailed { torrent_id, .. }
            | Self::TorrentRemoved { torrent_id, .. }
            | Self::TorrentDeleted { torrent_id, .. }
            | Self::DeleteFailed { torrent_id, .. }
            | Self::MetadataReceived { torrent_id, .. }
            | Self::MetadataFailed { torrent_id, .. }
            | Self::TorrentRekeyed { torrent_id, .. }
            | Self::StatusUpdated { torrent_id, .. } => Some(*torrent_id),
            Self::SessionStatusUpdated { .. } | Self::HealthChanged { .. } | Self::SessionClosed => {
                None
            }
        }
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and emission timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Sequential identifier.
    pub id: EventId,
    /// Emission time.
    pub timestamp: DateTime<Utc>,
    /// Event payload.
    pub event: Event,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_and_torrent_id_follow_variant() {
        let id = Uuid::from_u128(7);
        let added = Event::TorrentAdded {
            torrent_id: id,
            info_hash: "00".repeat(20),
            name: None,
        };
        assert_eq!(added.kind(), "torrent_added");
        assert_eq!(added.torrent_id(), Some(id));

        let health = Event::HealthChanged {
            degraded: vec!["session".into()],
        };
        assert_eq!(health.kind(), "health_changed");
        assert_eq!(health.torrent_id(), None);
        assert_eq!(Event::SessionClosed.kind(), "session_closed");
    }

    #[test]
    fn events_serialise_with_type_tag() -> Result<(), serde_json::Error> {
        let event = Event::MetadataFailed {
            torrent_id: Uuid::nil(),
            message: "timed out".into(),
        };
        let value = serde_json::to_value(&event)?;
        assert_eq!(value["type"], "metadata_failed");
        assert_eq!(value["message"], "timed out");
        Ok(())
    }
}
