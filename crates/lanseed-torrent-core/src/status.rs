//! Per-torrent and per-session status snapshots.
//!
//! # Design
//! - Snapshots are plain values refreshed once per engine status batch.
//! - Every setter compares the old and new value and reports whether anything
//!   changed, so downstream consumers can skip redundant work.
//! - `apply` folds a whole engine snapshot in and returns the set of fields
//!   that actually moved.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Engine-reported download state of a torrent.
///
/// The normal progression is `Adding → QueuedForChecking → CheckingFiles →
/// DownloadingMetadata → Downloading → Finished → Seeding`, with `Allocating`
/// and `CheckingResumeData` as alternate early states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentState {
    /// Add request accepted, engine has not reported a state yet.
    #[default]
    Adding,
    /// Waiting for a slot to verify existing files.
    QueuedForChecking,
    /// Verifying existing files on disk.
    CheckingFiles,
    /// Fetching the info dictionary from peers.
    DownloadingMetadata,
    /// Transferring payload.
    Downloading,
    /// All wanted pieces are present.
    Finished,
    /// Complete and uploading to peers.
    Seeding,
    /// Preallocating storage.
    Allocating,
    /// Validating fast-resume data.
    CheckingResumeData,
}

impl TorrentState {
    /// Machine-friendly state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Adding => "adding",
            Self::QueuedForChecking => "queued_for_checking",
            Self::CheckingFiles => "checking_files",
            Self::DownloadingMetadata => "downloading_metadata",
            Self::Downloading => "downloading",
            Self::Finished => "finished",
            Self::Seeding => "seeding",
            Self::Allocating => "allocating",
            Self::CheckingResumeData => "checking_resume_data",
        }
    }

    /// Whether the torrent holds every wanted piece.
    #[must_use]
    pub const fn is_complete(self) -> bool {
        matches!(self, Self::Finished | Self::Seeding)
    }
}

impl fmt::Display for TorrentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field of a [`StatusSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusField {
    /// Display name.
    Name,
    /// Save directory.
    SavePath,
    /// Error overlay.
    Error,
    /// Download state.
    State,
    /// Completion in parts per million.
    ProgressPpm,
    /// Time the torrent was added.
    AddedTime,
    /// Time the torrent completed.
    CompletedTime,
    /// Total download rate.
    DownloadRate,
    /// Payload download rate.
    DownloadPayloadRate,
    /// Total upload rate.
    UploadRate,
    /// Payload upload rate.
    UploadPayloadRate,
    /// Connected peers.
    Peers,
    /// Connected seeds.
    Seeds,
    /// Peers currently being uploaded to.
    Uploads,
    /// Position in the download queue.
    QueuePosition,
    /// Tracker currently announced to.
    CurrentTracker,
}

/// Set of fields changed by [`StatusSnapshot::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusDelta {
    fields: Vec<StatusField>,
}

impl StatusDelta {
    /// Whether no field changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether `field` changed.
    #[must_use]
    pub fn contains(&self, field: StatusField) -> bool {
        self.fields.contains(&field)
    }

    /// Changed fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[StatusField] {
        &self.fields
    }

    fn record(&mut self, changed: bool, field: StatusField) {
        if changed {
            self.fields.push(field);
        }
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

/// Engine-reported status of a single torrent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
    name: String,
    save_path: String,
    error: Option<String>,
    state: TorrentState,
    progress_ppm: u32,
    added_time: Option<DateTime<Utc>>,
    completed_time: Option<DateTime<Utc>>,
    download_rate: u64,
    download_payload_rate: u64,
    upload_rate: u64,
    upload_payload_rate: u64,
    peers: u32,
    seeds: u32,
    uploads: u32,
    queue_position: i32,
    current_tracker: String,
}

impl StatusSnapshot {
    /// Display name as reported by the engine.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory the payload is stored in.
    #[must_use]
    pub fn save_path(&self) -> &str {
        &self.save_path
    }

    /// Error overlay; orthogonal to [`state`](Self::state).
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Download state.
    #[must_use]
    pub const fn state(&self) -> TorrentState {
        self.state
    }

    /// Completion in parts per million.
    #[must_use]
    pub const fn progress_ppm(&self) -> u32 {
        self.progress_ppm
    }

    /// Time the torrent was added.
    #[must_use]
    pub const fn added_time(&self) -> Option<DateTime<Utc>> {
        self.added_time
    }

    /// Time the torrent completed.
    #[must_use]
    pub const fn completed_time(&self) -> Option<DateTime<Utc>> {
        self.completed_time
    }

    /// Total download rate in bytes per second.
    #[must_use]
    pub const fn download_rate(&self) -> u64 {
        self.download_rate
    }

    /// Payload download rate in bytes per second.
    #[must_use]
    pub const fn download_payload_rate(&self) -> u64 {
        self.download_payload_rate
    }

    /// Total upload rate in bytes per second.
    #[must_use]
    pub const fn upload_rate(&self) -> u64 {
        self.upload_rate
    }

    /// Payload upload rate in bytes per second.
    #[must_use]
    pub const fn upload_payload_rate(&self) -> u64 {
        self.upload_payload_rate
    }

    /// Connected peers.
    #[must_use]
    pub const fn peers(&self) -> u32 {
        self.peers
    }

    /// Connected seeds.
    #[must_use]
    pub const fn seeds(&self) -> u32 {
        self.seeds
    }

    /// Peers currently receiving uploads from this torrent.
    #[must_use]
    pub const fn uploads(&self) -> u32 {
        self.uploads
    }

    /// Position in the download queue; negative when not queued.
    #[must_use]
    pub const fn queue_position(&self) -> i32 {
        self.queue_position
    }

    /// Tracker currently announced to.
    #[must_use]
    pub fn current_tracker(&self) -> &str {
        &self.current_tracker
    }

    /// Set the display name.
    pub fn set_name(&mut self, value: impl Into<String>) -> bool {
        replace(&mut self.name, value.into())
    }

    /// Set the save directory.
    pub fn set_save_path(&mut self, value: impl Into<String>) -> bool {
        replace(&mut self.save_path, value.into())
    }

    /// Set or clear the error overlay.
    pub fn set_error(&mut self, value: Option<String>) -> bool {
        replace(&mut self.error, value)
    }

    /// Set the download state.
    pub fn set_state(&mut self, value: TorrentState) -> bool {
        replace(&mut self.state, value)
    }

    /// Set completion; values above one million are clamped.
    pub fn set_progress_ppm(&mut self, value: u32) -> bool {
        replace(&mut self.progress_ppm, value.min(1_000_000))
    }

    /// Set the time the torrent was added.
    pub fn set_added_time(&mut self, value: Option<DateTime<Utc>>) -> bool {
        replace(&mut self.added_time, value)
    }

    /// Set the time the torrent completed.
    pub fn set_completed_time(&mut self, value: Option<DateTime<Utc>>) -> bool {
        replace(&mut self.completed_time, value)
    }

    /// Set the total download rate.
    pub fn set_download_rate(&mut self, value: u64) -> bool {
        replace(&mut self.download_rate, value)
    }

    /// Set the payload download rate.
    pub fn set_download_payload_rate(&mut self, value: u64) -> bool {
        replace(&mut self.download_payload_rate, value)
    }

    /// Set the total upload rate.
    pub fn set_upload_rate(&mut self, value: u64) -> bool {
        replace(&mut self.upload_rate, value)
    }

    /// Set the payload upload rate.
    pub fn set_upload_payload_rate(&mut self, value: u64) -> bool {
        replace(&mut self.upload_payload_rate, value)
    }

    /// Set the connected peer count.
    pub fn set_peers(&mut self, value: u32) -> bool {
        replace(&mut self.peers, value)
    }

    /// Set the connected seed count.
    pub fn set_seeds(&mut self, value: u32) -> bool {
        replace(&mut self.seeds, value)
    }

    /// Set the number of peers being uploaded to.
    pub fn set_uploads(&mut self, value: u32) -> bool {
        replace(&mut self.uploads, value)
    }

    /// Set the queue position.
    pub fn set_queue_position(&mut self, value: i32) -> bool {
        replace(&mut self.queue_position, value)
    }

    /// Set the current tracker.
    pub fn set_current_tracker(&mut self, value: impl Into<String>) -> bool {
        replace(&mut self.current_tracker, value.into())
    }

    /// Copy every field of `next` into `self`, returning the fields that changed.
    pub fn apply(&mut self, next: &Self) -> StatusDelta {
        let mut delta = StatusDelta::default();
        delta.record(self.set_name(next.name.as_str()), StatusField::Name);
        delta.record(self.set_save_path(next.save_path.as_str()), StatusField::SavePath);
        delta.record(self.set_error(next.error.clone()), StatusField::Error);
        delta.record(self.set_state(next.state), StatusField::State);
        delta.record(self.set_progress_ppm(next.progress_ppm), StatusField::ProgressPpm);
        delta.record(self.set_added_time(next.added_time), StatusField::AddedTime);
        delta.record(
            self.set_completed_time(next.completed_time),
            StatusField::CompletedTime,
        );
        delta.record(
            self.set_download_rate(next.download_rate),
            StatusField::DownloadRate,
        );
        delta.record(
            self.set_download_payload_rate(next.download_payload_rate),
            StatusField::DownloadPayloadRate,
        );
        delta.record(self.set_upload_rate(next.upload_rate), StatusField::UploadRate);
        delta.record(
            self.set_upload_payload_rate(next.upload_payload_rate),
            StatusField::UploadPayloadRate,
        );
        delta.record(self.set_peers(next.peers), StatusField::Peers);
        delta.record(self.set_seeds(next.seeds), StatusField::Seeds);
        delta.record(self.set_uploads(next.uploads), StatusField::Uploads);
        delta.record(
            self.set_queue_position(next.queue_position),
            StatusField::QueuePosition,
        );
        delta.record(
            self.set_current_tracker(next.current_tracker.as_str()),
            StatusField::CurrentTracker,
        );
        delta
    }
}

/// Aggregate rates and totals for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionStatusSnapshot {
    num_peers: u32,
    download_rate: u64,
    upload_rate: u64,
    payload_download_rate: u64,
    payload_upload_rate: u64,
    total_download: u64,
    total_upload: u64,
    total_payload_download: u64,
    total_payload_upload: u64,
}

impl SessionStatusSnapshot {
    /// Connected peers across all torrents.
    #[must_use]
    pub const fn num_peers(&self) -> u32 {
        self.num_peers
    }

    /// Total download rate in bytes per second.
    #[must_use]
    pub const fn download_rate(&self) -> u64 {
        self.download_rate
    }

    /// Total upload rate in bytes per second.
    #[must_use]
    pub const fn upload_rate(&self) -> u64 {
        self.upload_rate
    }

    /// Payload download rate in bytes per second.
    #[must_use]
    pub const fn payload_download_rate(&self) -> u64 {
        self.payload_download_rate
    }

    /// Payload upload rate in bytes per second.
    #[must_use]
    pub const fn payload_upload_rate(&self) -> u64 {
        self.payload_upload_rate
    }

    /// Bytes downloaded since the session started.
    #[must_use]
    pub const fn total_download(&self) -> u64 {
        self.total_download
    }

    /// Bytes uploaded since the session started.
    #[must_use]
    pub const fn total_upload(&self) -> u64 {
        self.total_upload
    }

    /// Payload bytes downloaded since the session started.
    #[must_use]
    pub const fn total_payload_download(&self) -> u64 {
        self.total_payload_download
    }

    /// Payload bytes uploaded since the session started.
    #[must_use]
    pub const fn total_payload_upload(&self) -> u64 {
        self.total_payload_upload
    }

    /// Set the connected peer count.
    pub fn set_num_peers(&mut self, value: u32) -> bool {
        replace(&mut self.num_peers, value)
    }

    /// Set the total download rate.
    pub fn set_download_rate(&mut self, value: u64) -> bool {
        replace(&mut self.download_rate, value)
    }

    /// Set the total upload rate.
    pub fn set_upload_rate(&mut self, value: u64) -> bool {
        replace(&mut self.upload_rate, value)
    }

    /// Set the payload download rate.
    pub fn set_payload_download_rate(&mut self, value: u64) -> bool {
        replace(&mut self.payload_download_rate, value)
    }

    /// Set the payload upload rate.
    pub fn set_payload_upload_rate(&mut self, value: u64) -> bool {
        replace(&mut self.payload_upload_rate, value)
    }

    /// Set the downloaded byte total.
    pub fn set_total_download(&mut self, value: u64) -> bool {
        replace(&mut self.total_download, value)
    }

    /// Set the uploaded byte total.
    pub fn set_total_upload(&mut self, value: u64) -> bool {
        replace(&mut self.total_upload, value)
    }

    /// Set the downloaded payload total.
    pub fn set_total_payload_download(&mut self, value: u64) -> bool {
        replace(&mut self.total_payload_download, value)
    }

    /// Set the uploaded payload total.
    pub fn set_total_payload_upload(&mut self, value: u64) -> bool {
        replace(&mut self.total_payload_upload, value)
    }

    /// Copy every field of `next` into `self`; returns whether anything changed.
    pub fn apply(&mut self, next: &Self) -> bool {
        // Non-short-circuiting `|` so every setter runs.
        self.set_num_peers(next.num_peers)
            | self.set_download_rate(next.download_rate)
            | self.set_upload_rate(next.upload_rate)
            | self.set_payload_download_rate(next.payload_download_rate)
            | self.set_payload_upload_rate(next.payload_upload_rate)
            | self.set_total_download(next.total_download)
            | self.set_total_upload(next.total_upload)
            | self.set_total_payload_download(next.total_payload_download)
            | self.set_total_payload_upload(next.total_payload_upload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_report_only_real_changes() {
        let mut status = StatusSnapshot::default();
        assert!(status.set_state(TorrentState::Downloading));
        assert!(!status.set_state(TorrentState::Downloading));
        assert!(status.set_name("ubuntu.iso"));
        assert!(!status.set_name("ubuntu.iso"));
        assert!(status.set_error(Some("tracker timeout".into())));
        assert!(status.set_error(None));
        assert!(!status.set_error(None));
    }

    #[test]
    fn progress_is_clamped_to_one_million() {
        let mut status = StatusSnapshot::default();
        assert!(status.set_progress_ppm(2_000_000));
        assert_eq!(status.progress_ppm(), 1_000_000);
        assert!(!status.set_progress_ppm(1_500_000));
    }

    #[test]
    fn apply_reports_changed_fields_only() {
        let mut current = StatusSnapshot::default();
        current.set_name("a");
        current.set_queue_position(3);

        let mut next = current.clone();
        next.set_queue_position(1);
        next.set_uploads(2);

        let delta = current.apply(&next);
        assert_eq!(delta.fields(), &[StatusField::Uploads, StatusField::QueuePosition]);
        assert!(delta.contains(StatusField::QueuePosition));
        assert!(!delta.contains(StatusField::Name));
        assert_eq!(current, next);
        assert!(current.apply(&next).is_empty());
    }

    #[test]
    fn session_status_apply_runs_every_setter() {
        let mut current = SessionStatusSnapshot::default();
        let mut next = SessionStatusSnapshot::default();
        next.set_num_peers(4);
        next.set_total_payload_upload(1_024);

        assert!(current.apply(&next));
        assert_eq!(current.num_peers(), 4);
        assert_eq!(current.total_payload_upload(), 1_024);
        assert!(!current.apply(&next));
    }

    #[test]
    fn complete_states() {
        assert!(TorrentState::Finished.is_complete());
        assert!(TorrentState::Seeding.is_complete());
        assert!(!TorrentState::Downloading.is_complete());
        assert_eq!(TorrentState::CheckingResumeData.to_string(), "checking_resume_data");
    }
}
