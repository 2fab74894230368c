#![allow(clippy::redundant_pub_crate)]

use std::collections::BTreeSet;
use std::time::Duration;

use lanseed_events::{Event, EventBus};
use lanseed_torrent_core::{AddOutcome, TorrentEngine, TorrentRecord};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::command::SessionCommand;
use crate::error::SessionResult;
use crate::handle::SessionHandle;
use crate::session::Session;

const COMMAND_BUFFER: usize = 128;
const SESSION_COMPONENT: &str = "session";

/// Move `session` onto a background task that ticks it every `tick_interval`
/// and serves commands from the returned handle.
///
/// The task stops after the session is closed (or every handle is dropped),
/// running one last tick to flush outstanding alerts.
pub fn spawn<E>(session: Session<E>, tick_interval: Duration) -> (SessionHandle, JoinHandle<()>)
where
    E: TorrentEngine + 'static,
{
    let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
    let handle = SessionHandle::new(commands, session.events().clone());
    let task = tokio::spawn(run(session, rx, tick_interval));
    (handle, task)
}

async fn run<E: TorrentEngine>(
    session: Session<E>,
    mut commands: mpsc::Receiver<SessionCommand>,
    tick_interval: Duration,
) {
    let mut worker = Worker::new(session);
    let mut poll = tokio::time::interval(tick_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            command = commands.recv() => {
                match command {
                    Some(command) => worker.handle(command),
                    None => {
                        debug!("all session handles dropped");
                        worker.session.close();
                    }
                }
            }
            _ = poll.tick() => worker.tick(),
        }
        if worker.session.is_closed() {
            break;
        }
    }

    worker.tick();
    info!("session worker stopped");
}

struct Worker<E> {
    session: Session<E>,
    events: EventBus,
    health: BTreeSet<String>,
}

impl<E: TorrentEngine> Worker<E> {
    fn new(session: Session<E>) -> Self {
        let events = session.events().clone();
        Self {
            session,
            events,
            health: BTreeSet::new(),
        }
    }

    fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::AddTorrentFile {
                bytes,
                save_dir,
                flags,
                respond_to,
            } => {
                let known = self.session.len();
                let result = self
                    .session
                    .add_torrent_bytes(bytes, save_dir.as_deref(), flags)
                    .map(outcome);
                let _ = respond_to.send(self.settle(result, known));
            }
            SessionCommand::AddMagnet {
                uri,
                save_dir,
                flags,
                respond_to,
            } => {
                let known = self.session.len();
                let result = self
                    .session
                    .add_magnet(&uri, save_dir.as_deref(), flags)
                    .map(outcome);
                let _ = respond_to.send(self.settle(result, known));
            }
            SessionCommand::Remove {
                id,
                delete_files,
                respond_to,
            } => {
                let result = if delete_files {
                    self.session.delete_torrent_files(id)
                } else {
                    self.session.remove_torrent(id)
                };
                if let Err(err) = &result {
                    warn!(torrent_id = %id, error = %err, "remove request rejected");
                }
                let _ = respond_to.send(result);
            }
            SessionCommand::Snapshot { respond_to } => {
                let _ = respond_to.send(self.session.snapshot());
            }
            SessionCommand::Close { respond_to } => {
                self.session.close();
                let _ = respond_to.send(());
            }
        }
    }

    // An add creates at most one record, so an unchanged count means the hash
    // was already tracked.
    fn settle(
        &self,
        result: SessionResult<AddOutcome>,
        known: usize,
    ) -> SessionResult<AddOutcome> {
        result.map(|outcome| AddOutcome {
            already_present: self.session.len() == known,
            ..outcome
        })
    }

    fn tick(&mut self) {
        match self.session.tick() {
            Ok(_) => self.mark_recovered(SESSION_COMPONENT),
            Err(err) => {
                let detail = format!("{err:?}");
                self.mark_degraded(SESSION_COMPONENT, Some(&detail));
                warn!(error = %err, "session tick aborted");
            }
        }
    }

    fn mark_degraded(&mut self, component: &str, detail: Option<&str>) {
        let inserted = self.health.insert(component.to_string());
        if inserted {
            let degraded = self.health.iter().cloned().collect::<Vec<_>>();
            self.events.publish(Event::HealthChanged { degraded });
            if let Some(detail) = detail {
                warn!(component, detail = %detail, "session component degraded");
            } else {
                warn!(component, "session component degraded");
            }
        } else if let Some(detail) = detail {
            warn!(component, detail = %detail, "session component still degraded");
        }
    }

    fn mark_recovered(&mut self, component: &str) {
        if self.health.remove(component) {
            let degraded = self.health.iter().cloned().collect::<Vec<_>>();
            self.events.publish(Event::HealthChanged { degraded });
            info!(component, "session component recovered");
        }
    }
}

fn outcome(record: &TorrentRecord) -> AddOutcome {
    AddOutcome {
        torrent_id: record.id(),
        info_hash: record.hash(),
        already_present: false,
        added: record.is_added(),
    }
}
