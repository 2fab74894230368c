//! Synchronous observers invoked while a tick is being processed.
//!
//! Observers run on the tick thread and see every notification of a tick before
//! `Session::tick` returns, so they never observe a partially applied tick.

use lanseed_torrent_core::{
    Alert, ContentHash, EngineError, SessionStatusSnapshot, StatusDelta, TorrentRecord,
};

use crate::views::ViewChange;

/// Notification delivered to [`SessionObserver`]s.
#[derive(Debug, Clone, Copy)]
pub enum SessionNotification<'a> {
    /// Raw engine alert with the record it resolved to, if any.
    AlertObserved {
        /// The alert.
        alert: &'a Alert,
        /// Resolved record.
        record: Option<&'a TorrentRecord>,
    },
    /// The engine confirmed an add.
    TorrentAdded {
        /// Confirmed record.
        record: &'a TorrentRecord,
    },
    /// The engine rejected an add; the record is discarded afterwards.
    AddFailed {
        /// Discarded record.
        record: &'a TorrentRecord,
        /// Engine diagnostic.
        error: &'a EngineError,
    },
    /// The torrent left the session.
    TorrentRemoved {
        /// Removed record.
        record: &'a TorrentRecord,
    },
    /// Files of a removed torrent were deleted.
    TorrentDeleted {
        /// Removed record.
        record: &'a TorrentRecord,
    },
    /// Files of a removed torrent could not be deleted.
    DeleteFailed {
        /// Removed record.
        record: &'a TorrentRecord,
        /// Engine diagnostic.
        error: &'a EngineError,
    },
    /// Metadata was attached to a record.
    MetadataReceived {
        /// Updated record.
        record: &'a TorrentRecord,
    },
    /// Fetching metadata failed.
    MetadataFailed {
        /// Affected record.
        record: &'a TorrentRecord,
        /// Engine diagnostic.
        error: &'a EngineError,
    },
    /// A record moved to a new content hash.
    TorrentRekeyed {
        /// Rekeyed record, already carrying the new hash.
        record: &'a TorrentRecord,
        /// Hash the record was known by.
        old: ContentHash,
    },
    /// Engine status of a record was refreshed.
    StatusChanged {
        /// Updated record.
        record: &'a TorrentRecord,
        /// Fields that changed; may be empty.
        delta: &'a StatusDelta,
    },
    /// Aggregate session status changed.
    SessionStatusChanged {
        /// New status.
        status: &'a SessionStatusSnapshot,
    },
    /// A projection changed its visible sequence.
    ViewChanged(ViewChange),
    /// The session was closed.
    Closed,
}

/// Receiver of session notifications.
pub trait SessionObserver: Send {
    /// Handle one notification. Must not block.
    fn notify(&mut self, notification: &SessionNotification<'_>);
}

impl<F> SessionObserver for F
where
    F: FnMut(&SessionNotification<'_>) + Send,
{
    fn notify(&mut self, notification: &SessionNotification<'_>) {
        self(notification);
    }
}
