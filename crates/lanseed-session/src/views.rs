//! The three torrent projections driven by the session.

use std::collections::HashMap;
use std::fmt;

use lanseed_torrent_core::{TorrentId, TorrentRecord};

use crate::error::{ProjectionError, SessionError};
use crate::projection::{
    ActiveDownloads, ActiveUploads, AllTorrents, Projection, ProjectionChange, ProjectionPolicy,
};

/// Identifies one of the session's projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    /// Every torrent.
    All,
    /// Active downloads ordered by queue position.
    Downloads,
    /// Torrents uploading to at least one peer.
    Uploads,
}

impl ViewKind {
    /// Machine-friendly name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Downloads => "downloads",
            Self::Uploads => "uploads",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A projection change tagged with the view it happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewChange {
    /// View that changed.
    pub view: ViewKind,
    /// The change itself.
    pub change: ProjectionChange<TorrentId>,
}

type Records = HashMap<TorrentId, TorrentRecord>;

/// All-torrents, downloads and uploads projections over the session's records.
pub struct TorrentViews {
    all: Projection<TorrentId, AllTorrents>,
    downloads: Projection<TorrentId, ActiveDownloads>,
    uploads: Projection<TorrentId, ActiveUploads>,
}

impl Default for TorrentViews {
    fn default() -> Self {
        Self::new()
    }
}

impl TorrentViews {
    /// Three empty projections.
    #[must_use]
    pub fn new() -> Self {
        Self {
            all: Projection::new(AllTorrents),
            downloads: Projection::new(ActiveDownloads),
            uploads: Projection::new(ActiveUploads),
        }
    }

    /// Every torrent the engine confirmed.
    #[must_use]
    pub const fn all(&self) -> &Projection<TorrentId, AllTorrents> {
        &self.all
    }

    /// Active downloads.
    #[must_use]
    pub const fn downloads(&self) -> &Projection<TorrentId, ActiveDownloads> {
        &self.downloads
    }

    /// Active uploads.
    #[must_use]
    pub const fn uploads(&self) -> &Projection<TorrentId, ActiveUploads> {
        &self.uploads
    }

    /// Visible keys of `view` in display order.
    #[must_use]
    pub fn rows(&self, view: ViewKind) -> &[TorrentId] {
        match view {
            ViewKind::All => self.all.rows(),
            ViewKind::Downloads => self.downloads.rows(),
            ViewKind::Uploads => self.uploads.rows(),
        }
    }

    /// Start tracking a confirmed torrent in every view.
    ///
    /// # Errors
    ///
    /// Fails when the torrent is already tracked or missing from `records`.
    pub fn track(&mut self, id: TorrentId, records: &Records) -> Result<(), SessionError> {
        self.all.track(id, records).map_err(projection_error(&self.all))?;
        self.downloads
            .track(id, records)
            .map_err(projection_error(&self.downloads))?;
        self.uploads
            .track(id, records)
            .map_err(projection_error(&self.uploads))
    }

    /// Stop tracking a torrent in every view; unknown ids are ignored.
    pub fn untrack(&mut self, id: TorrentId) {
        self.uploads.untrack(&id);
        self.downloads.untrack(&id);
        self.all.untrack(&id);
    }

    /// Re-evaluate a torrent whose status or metadata changed.
    ///
    /// # Errors
    ///
    /// Fails when a projection cannot resolve a record it tracks.
    pub fn changed(
        &mut self,
        id: TorrentId,
        metadata: bool,
        records: &Records,
    ) -> Result<(), SessionError> {
        self.all
            .changed(id, metadata, records)
            .map_err(projection_error(&self.all))?;
        self.downloads
            .changed(id, metadata, records)
            .map_err(projection_error(&self.downloads))?;
        self.uploads
            .changed(id, metadata, records)
            .map_err(projection_error(&self.uploads))
    }

    /// Drain queued changes of every view, all-torrents first.
    pub fn take_changes(&mut self) -> Vec<ViewChange> {
        let tag = |view: ViewKind| move |change| ViewChange { view, change };
        let mut changes: Vec<ViewChange> = self
            .all
            .take_changes()
            .into_iter()
            .map(tag(ViewKind::All))
            .collect();
        changes.extend(
            self.downloads
                .take_changes()
                .into_iter()
                .map(tag(ViewKind::Downloads)),
        );
        changes.extend(
            self.uploads
                .take_changes()
                .into_iter()
                .map(tag(ViewKind::Uploads)),
        );
        changes
    }

    /// Verify every view against `records`.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn check_invariants(&self, records: &Records) -> Result<(), SessionError> {
        self.all
            .check_invariants(records)
            .map_err(projection_error(&self.all))?;
        self.downloads
            .check_invariants(records)
            .map_err(projection_error(&self.downloads))?;
        self.uploads
            .check_invariants(records)
            .map_err(projection_error(&self.uploads))
    }
}

fn projection_error<P: ProjectionPolicy>(
    projection: &Projection<TorrentId, P>,
) -> impl FnOnce(ProjectionError) -> SessionError + use<P> {
    let view = projection.policy().name();
    move |source| SessionError::Projection { view, source }
}
