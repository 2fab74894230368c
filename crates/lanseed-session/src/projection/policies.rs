use std::cmp::Ordering;

use lanseed_torrent_core::{TorrentRecord, TorrentState};

use super::{Classification, ProjectionPolicy};

/// Every torrent, in arrival order.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllTorrents;

impl ProjectionPolicy for AllTorrents {
    type Entity = TorrentRecord;

    fn name(&self) -> &'static str {
        "all"
    }

    fn classify(&self, _entity: &TorrentRecord) -> Classification {
        Classification::Accept
    }

    fn order(&self, _a: &TorrentRecord, _b: &TorrentRecord) -> Ordering {
        Ordering::Equal
    }
}

/// Torrents still downloading, ordered by queue position.
///
/// Completed and not-yet-started torrents stay tracked but hidden so they can
/// reappear, for example when a finished torrent is restarted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActiveDownloads;

impl ProjectionPolicy for ActiveDownloads {
    type Entity = TorrentRecord;

    fn name(&self) -> &'static str {
        "downloads"
    }

    fn classify(&self, entity: &TorrentRecord) -> Classification {
        match entity.status().state() {
            TorrentState::Adding
            | TorrentState::Finished
            | TorrentState::Seeding
            | TorrentState::CheckingResumeData => Classification::Keep,
            _ => Classification::Accept,
        }
    }

    fn order(&self, a: &TorrentRecord, b: &TorrentRecord) -> Ordering {
        a.status().queue_position().cmp(&b.status().queue_position())
    }
}

/// Torrents currently uploading to at least one peer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActiveUploads;

impl ProjectionPolicy for ActiveUploads {
    type Entity = TorrentRecord;

    fn name(&self) -> &'static str {
        "uploads"
    }

    fn classify(&self, entity: &TorrentRecord) -> Classification {
        if entity.status().uploads() > 0 {
            Classification::Accept
        } else {
            Classification::Remove
        }
    }

    fn order(&self, _a: &TorrentRecord, _b: &TorrentRecord) -> Ordering {
        Ordering::Equal
    }
}
