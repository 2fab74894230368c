use std::path::PathBuf;

use lanseed_torrent_core::{AddFlags, AddOutcome, TorrentId};
use tokio::sync::oneshot;

use crate::error::SessionResult;
use crate::snapshot::SessionSnapshot;

/// Requests accepted by the session worker.
#[derive(Debug)]
pub(crate) enum SessionCommand {
    /// Decode and add a `.torrent` file.
    AddTorrentFile {
        /// Raw file contents.
        bytes: Vec<u8>,
        /// Target directory; the configured default when `None`.
        save_dir: Option<PathBuf>,
        /// Engine add flags.
        flags: AddFlags,
        /// Outcome channel.
        respond_to: oneshot::Sender<SessionResult<AddOutcome>>,
    },
    /// Add a magnet link.
    AddMagnet {
        /// Magnet URI.
        uri: String,
        /// Target directory; the configured default when `None`.
        save_dir: Option<PathBuf>,
        /// Engine add flags.
        flags: AddFlags,
        /// Outcome channel.
        respond_to: oneshot::Sender<SessionResult<AddOutcome>>,
    },
    /// Remove a torrent, optionally deleting its files.
    Remove {
        /// Stable torrent identifier.
        id: TorrentId,
        /// Also delete downloaded files.
        delete_files: bool,
        /// Outcome channel.
        respond_to: oneshot::Sender<SessionResult<()>>,
    },
    /// Copy the current state.
    Snapshot {
        /// Snapshot channel.
        respond_to: oneshot::Sender<SessionSnapshot>,
    },
    /// Close the session and stop the worker after a final tick.
    Close {
        /// Acknowledgement channel.
        respond_to: oneshot::Sender<()>,
    },
}
