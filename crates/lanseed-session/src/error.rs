//! # Design
//!
//! - Invariant violations are programming errors. They abort the current tick
//!   and are never repaired silently.
//! - Caller mistakes (unknown ids, commands after close) are ordinary errors.
//! - Keep error messages constant while carrying context fields for debugging.

use lanseed_torrent_core::{ContentHash, TorrentError, TorrentId};
use thiserror::Error;

/// Result alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors raised by the session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Two records were about to share one content hash.
    #[error("content hash already tracked")]
    DuplicateHash {
        /// Colliding hash.
        hash: ContentHash,
    },
    /// An alert referred to a hash with no record.
    #[error("no torrent tracked for content hash")]
    MissingTorrent {
        /// Alert kind that failed to resolve.
        alert: &'static str,
        /// Unresolved hash.
        hash: ContentHash,
    },
    /// An identity change targeted a hash that is already tracked.
    #[error("identity change target already tracked")]
    RekeyCollision {
        /// Previous hash.
        old: ContentHash,
        /// Occupied target hash.
        new: ContentHash,
    },
    /// An identity change named a source hash with no record.
    #[error("identity change source not tracked")]
    RekeyMissing {
        /// Missing source hash.
        old: ContentHash,
        /// Target hash.
        new: ContentHash,
    },
    /// A projection lost consistency with the record store.
    #[error("projection invariant violated")]
    Projection {
        /// View that failed.
        view: &'static str,
        /// Underlying projection error.
        #[source]
        source: ProjectionError,
    },
    /// A command named a torrent the session does not track.
    #[error("unknown torrent")]
    UnknownTorrent {
        /// Requested identifier.
        torrent_id: TorrentId,
    },
    /// A command was rejected before reaching the engine.
    #[error("torrent request rejected")]
    Rejected {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying validation error.
        #[source]
        source: TorrentError,
    },
    /// The session was closed.
    #[error("session closed")]
    Closed,
}

impl SessionError {
    /// Whether the error is an invariant violation that aborts a tick.
    #[must_use]
    pub const fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::DuplicateHash { .. }
                | Self::MissingTorrent { .. }
                | Self::RekeyCollision { .. }
                | Self::RekeyMissing { .. }
                | Self::Projection { .. }
        )
    }
}

/// Errors raised by a projection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionError {
    /// `track` was called for an entity that is already tracked.
    #[error("entity already tracked")]
    AlreadyTracked {
        /// Debug rendering of the entity key.
        key: String,
    },
    /// A tracked entity could not be resolved from the entity source.
    #[error("tracked entity missing from source")]
    MissingEntity {
        /// Debug rendering of the entity key.
        key: String,
    },
    /// The reverse index disagreed with the ordered sequence.
    #[error("projection index mismatch")]
    IndexMismatch {
        /// Debug rendering of the entity key.
        key: String,
        /// Index stored in the reverse map.
        recorded: usize,
        /// Actual position, if the entity is present at all.
        actual: Option<usize>,
    },
    /// Two adjacent rows are out of order.
    #[error("projection rows out of order")]
    OutOfOrder {
        /// Index of the first row of the offending pair.
        index: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_violations_are_classified() {
        let hash = ContentHash::from_bytes([0; 20]);
        assert!(SessionError::DuplicateHash { hash }.is_invariant_violation());
        assert!(
            SessionError::Projection {
                view: "downloads",
                source: ProjectionError::OutOfOrder { index: 1 },
            }
            .is_invariant_violation()
        );
        assert!(!SessionError::Closed.is_invariant_violation());
        assert!(
            !SessionError::UnknownTorrent {
                torrent_id: TorrentId::nil()
            }
            .is_invariant_violation()
        );
    }
}
