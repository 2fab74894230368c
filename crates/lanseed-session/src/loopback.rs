//! In-memory engine used by tests and by the binary when no native engine is linked.
//!
//! Clones share state, so a test can keep a handle while the session owns the
//! engine. In responsive mode the engine answers commands the way a real engine
//! would (add, remove, status batches); otherwise it only records them and
//! replays whatever alerts the caller injects.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lanseed_torrent_core::{
    AddSource, AddTorrentParams, Alert, ContentHash, EngineCommand, EngineError,
    SessionStatusSnapshot, StatusEntry, StatusSnapshot, TorrentEngine, TorrentState,
};

/// Error code reported when a torrent is added twice.
pub const DUPLICATE_TORRENT: i32 = 17;

#[derive(Default)]
struct LoopbackState {
    responsive: bool,
    torrents: BTreeMap<ContentHash, StatusSnapshot>,
    alerts: Vec<Alert>,
    commands: Vec<EngineCommand>,
    session_status: SessionStatusSnapshot,
    next_queue_position: i32,
}

/// Engine double that records commands and queues alerts in memory.
#[derive(Clone, Default)]
pub struct LoopbackEngine {
    state: Arc<Mutex<LoopbackState>>,
}

impl LoopbackEngine {
    /// Engine that records commands and only emits injected alerts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that answers commands with the alerts a real engine would emit.
    #[must_use]
    pub fn responsive() -> Self {
        let engine = Self::default();
        engine.state().responsive = true;
        engine
    }

    /// Queue an alert for the next drain.
    pub fn push_alert(&self, alert: Alert) {
        self.state().alerts.push(alert);
    }

    /// Number of alerts waiting to be drained.
    #[must_use]
    pub fn pending_alerts(&self) -> usize {
        self.state().alerts.len()
    }

    /// Commands received so far, oldest first.
    #[must_use]
    pub fn commands(&self) -> Vec<EngineCommand> {
        self.state().commands.clone()
    }

    /// Drain the received commands.
    #[must_use]
    pub fn take_commands(&self) -> Vec<EngineCommand> {
        std::mem::take(&mut self.state().commands)
    }

    /// Replace the aggregate session status reported to the session.
    pub fn set_session_status(&self, status: SessionStatusSnapshot) {
        self.state().session_status = status;
    }

    /// Replace the status the responsive engine reports for `hash`.
    ///
    /// Returns `false` when the engine does not hold that torrent.
    pub fn set_status(&self, hash: ContentHash, status: StatusSnapshot) -> bool {
        match self.state().torrents.get_mut(&hash) {
            Some(slot) => {
                *slot = status;
                true
            }
            None => false,
        }
    }

    /// Hashes of the torrents the responsive engine holds.
    #[must_use]
    pub fn torrents(&self) -> Vec<ContentHash> {
        self.state().torrents.keys().copied().collect()
    }

    fn state(&self) -> MutexGuard<'_, LoopbackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LoopbackState {
    fn respond(&mut self, command: &EngineCommand) {
        match command {
            EngineCommand::Add(params) => self.respond_add(params),
            EngineCommand::Remove { hash, delete_files } => {
                if self.torrents.remove(hash).is_none() {
                    return;
                }
                self.alerts.push(Alert::TorrentRemoved { hash: *hash });
                if *delete_files {
                    self.alerts.push(Alert::TorrentDeleted { hash: *hash });
                }
            }
            EngineCommand::PostStatusUpdates => {
                let entries = self
                    .torrents
                    .iter()
                    .map(|(hash, status)| StatusEntry {
                        hash: *hash,
                        status: status.clone(),
                    })
                    .collect();
                self.alerts.push(Alert::StatusBatch { entries });
            }
            EngineCommand::StartLocalDiscovery => {}
        }
    }

    fn respond_add(&mut self, params: &AddTorrentParams) {
        let hash = params.source.info_hash();
        if self.torrents.contains_key(&hash) {
            self.alerts.push(Alert::AddFailed {
                hash,
                error: EngineError::new(DUPLICATE_TORRENT, "torrent already in session"),
            });
            return;
        }

        let mut status = StatusSnapshot::default();
        let (name, state) = match &params.source {
            AddSource::Metainfo(metainfo) => {
                (metainfo.metadata().name.clone(), TorrentState::Downloading)
            }
            AddSource::Magnet(link) => (
                link.display_name().unwrap_or_default().to_string(),
                TorrentState::DownloadingMetadata,
            ),
        };
        status.set_name(name);
        status.set_state(if params.flags.paused {
            TorrentState::QueuedForChecking
        } else {
            state
        });
        status.set_save_path(params.save_dir.display().to_string());
        status.set_queue_position(self.next_queue_position);
        self.next_queue_position += 1;

        self.torrents.insert(hash, status);
        self.alerts.push(Alert::TorrentAdded { hash });
    }
}

impl TorrentEngine for LoopbackEngine {
    fn submit(&mut self, command: EngineCommand) {
        let mut state = self.state();
        if state.responsive {
            state.respond(&command);
        }
        state.commands.push(command);
    }

    fn pop_alerts(&mut self) -> Vec<Alert> {
        std::mem::take(&mut self.state().alerts)
    }

    fn session_status(&self) -> SessionStatusSnapshot {
        self.state().session_status
    }
}
