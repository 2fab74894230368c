//! Shell-facing command surface.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::hash::ContentHash;
use crate::record::{AddFlags, TorrentId};

/// Immediate result of an add command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOutcome {
    /// Record the add resolved to.
    pub torrent_id: TorrentId,
    /// Hash the record is keyed by.
    pub info_hash: ContentHash,
    /// Whether the record already existed before this call.
    pub already_present: bool,
    /// Whether the engine had already confirmed the record.
    pub added: bool,
}

/// Commands the GUI and tray shell issue. All return as soon as the session has
/// recorded the request; outcomes are observed through events.
#[async_trait]
pub trait TorrentWorkflow: Send + Sync {
    /// Add a torrent from the raw contents of a `.torrent` file.
    async fn add_torrent_file(
        &self,
        bytes: Vec<u8>,
        save_dir: Option<PathBuf>,
        flags: AddFlags,
    ) -> anyhow::Result<AddOutcome>;

    /// Add a torrent from a magnet URI.
    async fn add_magnet(
        &self,
        uri: String,
        save_dir: Option<PathBuf>,
        flags: AddFlags,
    ) -> anyhow::Result<AddOutcome>;

    /// Remove a torrent, keeping its files.
    async fn remove(&self, id: TorrentId) -> anyhow::Result<()>;

    /// Remove a torrent and delete its files.
    async fn delete_files(&self, id: TorrentId) -> anyhow::Result<()>;

    /// Ask the session to shut down.
    async fn close(&self) -> anyhow::Result<()>;
}
