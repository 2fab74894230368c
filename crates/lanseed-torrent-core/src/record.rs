//! One tracked torrent: identity, lifecycle flags, status, metadata and attachments.
//!
//! # Design
//! - The stable `TorrentId` never changes; the content hash may be rekeyed once
//!   full metadata replaces a provisional magnet hash.
//! - A record with `added == false` is either still being added or about to be
//!   discarded after a failed add; the two cannot be told apart from the record.
//! - `removing` and `deleting` are monotone: once set they are never cleared.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attachments::Attachments;
use crate::hash::ContentHash;
use crate::metadata::TorrentMetadata;
use crate::status::StatusSnapshot;

/// Stable identifier of a torrent record for its whole lifetime.
pub type TorrentId = Uuid;

/// Coarse lifecycle position derived from the record flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Created by an add command, not yet confirmed by the engine.
    Provisional,
    /// Confirmed by the engine.
    Added,
    /// Removal requested.
    Removing,
    /// Removal with file deletion requested.
    Deleting,
}

/// Flags recorded for a torrent added to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddFlags {
    /// Add the torrent in a paused state.
    pub paused: bool,
    /// Let the engine queue the torrent automatically.
    pub auto_managed: bool,
    /// Download pieces in order.
    pub sequential: bool,
}

impl Default for AddFlags {
    fn default() -> Self {
        Self {
            paused: false,
            auto_managed: true,
            sequential: false,
        }
    }
}

/// A torrent tracked by the session.
#[derive(Debug, Clone)]
pub struct TorrentRecord {
    id: TorrentId,
    hash: ContentHash,
    save_dir: PathBuf,
    added: bool,
    removing: bool,
    deleting: bool,
    status: StatusSnapshot,
    metadata: Option<TorrentMetadata>,
    attachments: Attachments,
}

impl TorrentRecord {
    /// Create a provisional record that has not been confirmed by the engine.
    #[must_use]
    pub fn provisional(
        hash: ContentHash,
        save_dir: impl Into<PathBuf>,
        metadata: Option<TorrentMetadata>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            hash,
            save_dir: save_dir.into(),
            added: false,
            removing: false,
            deleting: false,
            status: StatusSnapshot::default(),
            metadata,
            attachments: Attachments::default(),
        }
    }

    /// Stable identifier.
    #[must_use]
    pub const fn id(&self) -> TorrentId {
        self.id
    }

    /// Current content hash.
    #[must_use]
    pub const fn hash(&self) -> ContentHash {
        self.hash
    }

    /// Directory the payload is stored in.
    #[must_use]
    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    /// Whether the engine confirmed the add.
    #[must_use]
    pub const fn is_added(&self) -> bool {
        self.added
    }

    /// Whether removal was requested.
    #[must_use]
    pub const fn is_removing(&self) -> bool {
        self.removing
    }

    /// Whether removal with file deletion was requested.
    #[must_use]
    pub const fn is_deleting(&self) -> bool {
        self.deleting
    }

    /// Lifecycle position derived from the flags.
    #[must_use]
    pub const fn lifecycle(&self) -> Lifecycle {
        if self.deleting {
            Lifecycle::Deleting
        } else if self.removing {
            Lifecycle::Removing
        } else if self.added {
            Lifecycle::Added
        } else {
            Lifecycle::Provisional
        }
    }

    /// Latest engine status.
    #[must_use]
    pub const fn status(&self) -> &StatusSnapshot {
        &self.status
    }

    /// Mutable engine status; setters report whether a field changed.
    pub const fn status_mut(&mut self) -> &mut StatusSnapshot {
        &mut self.status
    }

    /// Descriptive metadata once known.
    #[must_use]
    pub const fn metadata(&self) -> Option<&TorrentMetadata> {
        self.metadata.as_ref()
    }

    /// Display name: metadata name, then status name, then the hash.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.metadata
            .as_ref()
            .map(|metadata| metadata.name.clone())
            .filter(|name| !name.is_empty())
            .or_else(|| {
                let name = self.status.name();
                (!name.is_empty()).then(|| name.to_string())
            })
            .unwrap_or_else(|| self.hash.to_hex())
    }

    /// Extension storage.
    #[must_use]
    pub const fn attachments(&self) -> &Attachments {
        &self.attachments
    }

    /// Mutable extension storage.
    pub const fn attachments_mut(&mut self) -> &mut Attachments {
        &mut self.attachments
    }

    /// Record the engine's add confirmation.
    pub const fn mark_added(&mut self) {
        self.added = true;
    }

    /// Flag the record for removal; returns `false` when it was already flagged.
    pub const fn mark_removing(&mut self) -> bool {
        let first = !self.removing;
        self.removing = true;
        first
    }

    /// Flag the record for removal with file deletion; returns `false` when
    /// removal was already requested, in which case the earlier request stands
    /// and `deleting` is left unchanged.
    pub const fn mark_deleting(&mut self) -> bool {
        let first = self.mark_removing();
        if first {
            self.deleting = true;
        }
        first
    }

    /// Replace the metadata snapshot.
    pub fn set_metadata(&mut self, metadata: TorrentMetadata) {
        self.metadata = Some(metadata);
    }

    /// Move the record to a new content hash; all other fields are untouched.
    pub const fn rekey(&mut self, hash: ContentHash) {
        self.hash = hash;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::TorrentState;

    fn record() -> TorrentRecord {
        TorrentRecord::provisional(ContentHash::from_bytes([1; 20]), "/tmp/dl", None)
    }

    #[test]
    fn lifecycle_follows_flags() {
        let mut record = record();
        assert_eq!(record.lifecycle(), Lifecycle::Provisional);
        record.mark_added();
        assert_eq!(record.lifecycle(), Lifecycle::Added);
        assert!(record.mark_deleting());
        assert_eq!(record.lifecycle(), Lifecycle::Deleting);
        assert!(record.is_removing() && record.is_deleting());
        assert!(!record.mark_removing());
        assert!(record.is_deleting());
    }

    #[test]
    fn delete_after_plain_removal_keeps_the_first_request() {
        let mut record = record();
        record.mark_added();
        assert!(record.mark_removing());
        assert!(!record.mark_deleting());
        assert!(record.is_removing());
        assert!(!record.is_deleting());
        assert_eq!(record.lifecycle(), Lifecycle::Removing);
    }

    #[test]
    fn rekey_keeps_identity_and_fields() {
        let mut record = record();
        record.status_mut().set_state(TorrentState::Downloading);
        record.attachments_mut().insert(5_u8);
        let id = record.id();

        let new_hash = ContentHash::from_bytes([2; 20]);
        record.rekey(new_hash);

        assert_eq!(record.id(), id);
        assert_eq!(record.hash(), new_hash);
        assert_eq!(record.status().state(), TorrentState::Downloading);
        assert!(record.attachments().contains::<u8>());
    }

    #[test]
    fn display_name_prefers_metadata() {
        let mut record = record();
        assert_eq!(record.display_name(), "01".repeat(20));
        record.status_mut().set_name("from status");
        assert_eq!(record.display_name(), "from status");
        record.set_metadata(TorrentMetadata::named("from metadata"));
        assert_eq!(record.display_name(), "from metadata");
    }
}
