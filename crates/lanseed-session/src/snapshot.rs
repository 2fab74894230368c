//! Owned, serialisable copies of session state handed across the worker boundary.

use chrono::{DateTime, Utc};
use lanseed_torrent_core::{Lifecycle, TorrentId, TorrentRecord, TorrentState};
use serde::{Deserialize, Serialize};

use crate::views::ViewKind;

/// Row-level overview of one tracked torrent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentOverview {
    /// Stable identifier.
    pub id: TorrentId,
    /// Current content hash in hex.
    pub info_hash: String,
    /// Display name.
    pub name: String,
    /// Lifecycle stage.
    pub lifecycle: Lifecycle,
    /// Engine state.
    pub state: TorrentState,
    /// Progress in parts per million.
    pub progress_ppm: u32,
    /// Download rate in bytes per second.
    pub download_rate: u64,
    /// Upload rate in bytes per second.
    pub upload_rate: u64,
    /// Queue position reported by the engine.
    pub queue_position: i32,
    /// Time the engine added the torrent.
    pub added_time: Option<DateTime<Utc>>,
}

impl From<&TorrentRecord> for TorrentOverview {
    fn from(record: &TorrentRecord) -> Self {
        let status = record.status();
        Self {
            id: record.id(),
            info_hash: record.hash().to_hex(),
            name: record.display_name(),
            lifecycle: record.lifecycle(),
            state: status.state(),
            progress_ppm: status.progress_ppm(),
            download_rate: status.download_rate(),
            upload_rate: status.upload_rate(),
            queue_position: status.queue_position(),
            added_time: status.added_time(),
        }
    }
}

/// Point-in-time copy of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Every tracked torrent, ordered by name.
    pub torrents: Vec<TorrentOverview>,
    /// Rows of the all-torrents view.
    pub all: Vec<TorrentId>,
    /// Rows of the active-downloads view.
    pub downloads: Vec<TorrentId>,
    /// Rows of the active-uploads view.
    pub uploads: Vec<TorrentId>,
    /// Tray status lines.
    pub summary: Vec<String>,
    /// Messages the user has not seen yet.
    pub unnoticed_messages: usize,
    /// Whether the session was closed.
    pub closed: bool,
}

impl SessionSnapshot {
    /// Rows of one view.
    #[must_use]
    pub fn rows(&self, view: ViewKind) -> &[TorrentId] {
        match view {
            ViewKind::All => &self.all,
            ViewKind::Downloads => &self.downloads,
            ViewKind::Uploads => &self.uploads,
        }
    }

    /// Overview of one torrent.
    #[must_use]
    pub fn torrent(&self, id: TorrentId) -> Option<&TorrentOverview> {
        self.torrents.iter().find(|torrent| torrent.id == id)
    }
}
