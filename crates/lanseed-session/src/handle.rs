//! Cloneable async handle to a session running on its worker task.

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use lanseed_events::{EventBus, EventId, EventStream};
use lanseed_torrent_core::{AddFlags, AddOutcome, TorrentId, TorrentWorkflow};
use tokio::sync::{mpsc, oneshot};

use crate::command::SessionCommand;
use crate::snapshot::SessionSnapshot;

/// Handle used by the GUI and tray shell to drive a spawned session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    events: EventBus,
}

impl SessionHandle {
    pub(crate) const fn new(commands: mpsc::Sender<SessionCommand>, events: EventBus) -> Self {
        Self { commands, events }
    }

    /// Event bus the session publishes to.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Subscribe to session events, replaying anything newer than `since`.
    #[must_use]
    pub fn subscribe(&self, since: Option<EventId>) -> EventStream {
        self.events.subscribe(since)
    }

    /// Copy the current session state.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker has stopped.
    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let (respond_to, rx) = oneshot::channel();
        self.send_command(SessionCommand::Snapshot { respond_to })
            .await?;
        rx.await
            .map_err(|err| anyhow!("session snapshot response dropped: {err}"))
    }

    async fn remove_with(&self, id: TorrentId, delete_files: bool) -> Result<()> {
        let (respond_to, rx) = oneshot::channel();
        self.send_command(SessionCommand::Remove {
            id,
            delete_files,
            respond_to,
        })
        .await?;
        rx.await
            .map_err(|err| anyhow!("session remove response dropped: {err}"))?
            .map_err(anyhow::Error::from)
    }

    async fn send_command(&self, command: SessionCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|err| anyhow!("failed to enqueue session command: {err}"))
    }
}

#[async_trait]
impl TorrentWorkflow for SessionHandle {
    async fn add_torrent_file(
        &self,
        bytes: Vec<u8>,
        save_dir: Option<PathBuf>,
        flags: AddFlags,
    ) -> Result<AddOutcome> {
        let (respond_to, rx) = oneshot::channel();
        self.send_command(SessionCommand::AddTorrentFile {
            bytes,
            save_dir,
            flags,
            respond_to,
        })
        .await?;
        rx.await
            .map_err(|err| anyhow!("session add response dropped: {err}"))?
            .map_err(anyhow::Error::from)
    }

    async fn add_magnet(
        &self,
        uri: String,
        save_dir: Option<PathBuf>,
        flags: AddFlags,
    ) -> Result<AddOutcome> {
        let (respond_to, rx) = oneshot::channel();
        self.send_command(SessionCommand::AddMagnet {
            uri,
            save_dir,
            flags,
            respond_to,
        })
        .await?;
        rx.await
            .map_err(|err| anyhow!("session add response dropped: {err}"))?
            .map_err(anyhow::Error::from)
    }

    async fn remove(&self, id: TorrentId) -> Result<()> {
        self.remove_with(id, false).await
    }

    async fn delete_files(&self, id: TorrentId) -> Result<()> {
        self.remove_with(id, true).await
    }

    async fn close(&self) -> Result<()> {
        let (respond_to, rx) = oneshot::channel();
        self.send_command(SessionCommand::Close { respond_to })
            .await?;
        rx.await
            .map_err(|err| anyhow!("session close response dropped: {err}"))
    }
}
