//! The session: sole owner of the engine connection and of the identity map.
//!
//! # Design
//! - Records are stored by their stable id; the identity map resolves the
//!   current content hash to that id, so a rekey only moves one map entry and
//!   never disturbs the projections.
//! - Commands update bookkeeping synchronously and reach the engine
//!   asynchronously; their effects are only ever observed through alerts.
//! - One tick drains every queued alert in arrival order. Each alert is
//!   resolved (and rekeyed) first, announced as "alert observed", and then
//!   applied. Projection changes and observer notifications are flushed before
//!   the next alert is processed.
//! - Invariant violations abort the tick; the remaining alerts of that tick are
//!   discarded and the error is returned to the driver.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use lanseed_events::{Event, EventBus};
use lanseed_torrent_core::{
    AddFlags, AddSource, AddTorrentParams, Alert, Attachments, ContentHash, EngineCommand,
    EngineError, SessionStatusSnapshot, StatusEntry, TorrentEngine, TorrentId, TorrentMetadata,
    TorrentMetainfo, TorrentRecord, parse_magnet,
};
use tracing::{debug, error, info, warn};

use crate::error::{SessionError, SessionResult};
use crate::messages::{MessageLevel, MessageList};
use crate::observer::{SessionNotification, SessionObserver};
use crate::snapshot::{SessionSnapshot, TorrentOverview};
use crate::summary::SessionSummary;
use crate::views::TorrentViews;

/// Default number of ticks without a status batch before one is requested.
pub const DEFAULT_STATUS_REFRESH_TICKS: u32 = 10;

/// Tunables of a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Ticks without an engine status batch before one is requested.
    pub status_refresh_ticks: u32,
    /// Directory used when an add command names none.
    pub default_save_dir: PathBuf,
    /// Start local peer discovery when the session is created.
    pub enable_lsd: bool,
    /// Maximum number of retained user-facing messages.
    pub message_capacity: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            status_refresh_ticks: DEFAULT_STATUS_REFRESH_TICKS,
            default_save_dir: PathBuf::from("./downloads"),
            enable_lsd: true,
            message_capacity: 256,
        }
    }
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    /// Alerts drained from the engine.
    pub alerts: usize,
    /// Whether a status refresh was requested at the end of the tick.
    pub status_requested: bool,
}

type Observers = Vec<Box<dyn SessionObserver>>;

/// Session core driving one external engine.
pub struct Session<E> {
    engine: E,
    settings: SessionSettings,
    events: EventBus,
    records: HashMap<TorrentId, TorrentRecord>,
    identities: HashMap<ContentHash, TorrentId>,
    pending_deletions: HashMap<ContentHash, TorrentRecord>,
    status: SessionStatusSnapshot,
    views: TorrentViews,
    messages: MessageList,
    observers: Observers,
    ticks_without_status: u32,
    closed: bool,
}

impl<E: TorrentEngine> Session<E> {
    /// Take ownership of `engine` and start local discovery if enabled.
    pub fn new(mut engine: E, settings: SessionSettings, events: EventBus) -> Self {
        if settings.enable_lsd {
            engine.submit(EngineCommand::StartLocalDiscovery);
        }
        let status = engine.session_status();
        info!(
            status_refresh_ticks = settings.status_refresh_ticks,
            save_dir = %settings.default_save_dir.display(),
            lsd = settings.enable_lsd,
            "session started"
        );
        Self {
            engine,
            messages: MessageList::with_capacity(settings.message_capacity),
            settings,
            events,
            records: HashMap::new(),
            identities: HashMap::new(),
            pending_deletions: HashMap::new(),
            status,
            views: TorrentViews::new(),
            observers: Vec::new(),
            ticks_without_status: 0,
            closed: false,
        }
    }

    /// Register a synchronous observer.
    pub fn add_observer(&mut self, observer: impl SessionObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Add a torrent from decoded metainfo.
    ///
    /// If a record already exists for the content hash it is returned unchanged
    /// and no command is issued; inspect [`TorrentRecord::is_added`] to tell a
    /// pre-existing torrent from a fresh one.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] after [`close`](Self::close).
    pub fn add_torrent(
        &mut self,
        metainfo: TorrentMetainfo,
        save_dir: Option<&Path>,
        flags: AddFlags,
    ) -> SessionResult<&TorrentRecord> {
        self.ensure_open()?;
        let metadata = metainfo.metadata().clone();
        self.add_source(AddSource::Metainfo(metainfo), Some(metadata), save_dir, flags)
    }

    /// Decode a `.torrent` file and add it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Rejected`] when the file cannot be decoded; no
    /// record is created and a failure message is recorded.
    pub fn add_torrent_bytes(
        &mut self,
        bytes: Vec<u8>,
        save_dir: Option<&Path>,
        flags: AddFlags,
    ) -> SessionResult<&TorrentRecord> {
        self.ensure_open()?;
        match TorrentMetainfo::from_bytes(bytes) {
            Ok(metainfo) => self.add_torrent(metainfo, save_dir, flags),
            Err(source) => {
                warn!(error = %source, "rejected torrent file");
                self.messages.push(
                    MessageLevel::Failure,
                    "Could not add torrent",
                    format!("The torrent file is invalid: {source}"),
                );
                Err(SessionError::Rejected {
                    operation: "session.add_torrent_bytes",
                    source: source.into(),
                })
            }
        }
    }

    /// Add a torrent from a magnet URI, keyed by its provisional hash.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Rejected`] when the URI is malformed; no record
    /// is created and a failure message is recorded.
    pub fn add_magnet(
        &mut self,
        uri: &str,
        save_dir: Option<&Path>,
        flags: AddFlags,
    ) -> SessionResult<&TorrentRecord> {
        self.ensure_open()?;
        match parse_magnet(uri) {
            Ok(link) => {
                let metadata = link.display_name().map(TorrentMetadata::named);
                self.add_source(AddSource::Magnet(link), metadata, save_dir, flags)
            }
            Err(source) => {
                warn!(error = %source, "rejected magnet link");
                self.messages.push(
                    MessageLevel::Failure,
                    "Could not add magnet link",
                    format!("{uri}: {source}"),
                );
                Err(SessionError::Rejected {
                    operation: "session.add_magnet",
                    source: source.into(),
                })
            }
        }
    }

    /// Request removal of a torrent, keeping its files.
    ///
    /// A provisional record is flagged now and removed once the engine confirms
    /// the add. Calling this after the torrent reached a terminal state is a
    /// caller error.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown ids or after [`close`](Self::close).
    pub fn remove_torrent(&mut self, id: TorrentId) -> SessionResult<()> {
        self.request_removal(id, false)
    }

    /// Request removal of a torrent together with its files on disk.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown ids or after [`close`](Self::close).
    pub fn delete_torrent_files(&mut self, id: TorrentId) -> SessionResult<()> {
        self.request_removal(id, true)
    }

    /// Signal shutdown. Does not wait for the engine.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        info!(torrents = self.records.len(), "session closing");
        notify(&mut self.observers, &SessionNotification::Closed);
        self.events.publish(Event::SessionClosed);
    }

    /// Drain and apply every alert queued by the engine.
    ///
    /// # Errors
    ///
    /// Returns the first invariant violation; the rest of the tick is discarded.
    pub fn tick(&mut self) -> SessionResult<TickReport> {
        let alerts = self.engine.pop_alerts();
        let mut report = TickReport {
            alerts: alerts.len(),
            status_requested: false,
        };

        let batch_received = alerts
            .iter()
            .any(|alert| matches!(alert, Alert::StatusBatch { .. }));

        for alert in &alerts {
            if let Err(err) = self.dispatch(alert) {
                error!(
                    error = ?err,
                    alert = alert.kind(),
                    "aborting tick after session invariant violation"
                );
                // Changes of earlier alerts were already flushed; only the
                // failing alert's queued view changes are dropped here.
                self.views.take_changes();
                return Err(err);
            }
        }

        if batch_received {
            self.ticks_without_status = 0;
            return Ok(report);
        }
        self.ticks_without_status += 1;
        if self.ticks_without_status >= self.settings.status_refresh_ticks.max(1) {
            self.ticks_without_status = 0;
            self.engine.submit(EngineCommand::PostStatusUpdates);
            report.status_requested = true;
            debug!("requested torrent status refresh");
        }
        Ok(report)
    }

    /// Whether [`close`](Self::close) was called.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether a record is keyed by `hash`.
    #[must_use]
    pub fn contains(&self, hash: ContentHash) -> bool {
        self.identities.contains_key(&hash)
    }

    /// Record keyed by `hash`.
    #[must_use]
    pub fn get(&self, hash: ContentHash) -> Option<&TorrentRecord> {
        self.identities
            .get(&hash)
            .and_then(|id| self.records.get(id))
    }

    /// Record with stable id `id`.
    #[must_use]
    pub fn record(&self, id: TorrentId) -> Option<&TorrentRecord> {
        self.records.get(&id)
    }

    /// Extension storage of a record.
    pub fn attachments_mut(&mut self, id: TorrentId) -> Option<&mut Attachments> {
        self.records.get_mut(&id).map(TorrentRecord::attachments_mut)
    }

    /// All records; the order is undefined.
    pub fn torrents(&self) -> impl Iterator<Item = &TorrentRecord> + '_ {
        self.records.values()
    }

    /// Number of records in the identity map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no torrent is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Removed torrents whose file deletion outcome is still outstanding.
    #[must_use]
    pub fn pending_deletions(&self) -> usize {
        self.pending_deletions.len()
    }

    /// The three projections.
    #[must_use]
    pub const fn views(&self) -> &TorrentViews {
        &self.views
    }

    /// Aggregate session status.
    #[must_use]
    pub const fn status(&self) -> &SessionStatusSnapshot {
        &self.status
    }

    /// User-facing messages.
    #[must_use]
    pub const fn messages(&self) -> &MessageList {
        &self.messages
    }

    /// Mutable user-facing messages.
    pub const fn messages_mut(&mut self) -> &mut MessageList {
        &mut self.messages
    }

    /// Tray summary of the current state.
    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        SessionSummary::compute(&self.views, &self.records, &self.status)
    }

    /// Owned copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let mut torrents: Vec<TorrentOverview> =
            self.records.values().map(TorrentOverview::from).collect();
        torrents.sort_by(|left, right| left.name.cmp(&right.name).then(left.id.cmp(&right.id)));
        SessionSnapshot {
            torrents,
            all: self.views.all().rows().to_vec(),
            downloads: self.views.downloads().rows().to_vec(),
            uploads: self.views.uploads().rows().to_vec(),
            summary: self.summary().lines(),
            unnoticed_messages: self.messages.unnoticed(),
            closed: self.closed,
        }
    }

    /// Settings the session runs with.
    #[must_use]
    pub const fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Event bus the session publishes to.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// The engine.
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    /// Mutable access to the engine.
    pub const fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Verify the identity map and every projection.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn check_invariants(&self) -> SessionResult<()> {
        for (hash, id) in &self.identities {
            match self.records.get(id) {
                Some(record) if record.hash() == *hash => {}
                Some(_) => return Err(SessionError::DuplicateHash { hash: *hash }),
                None => {
                    return Err(SessionError::MissingTorrent {
                        alert: "identity_map",
                        hash: *hash,
                    });
                }
            }
        }
        if let Some(record) = self
            .records
            .values()
            .find(|record| self.identities.get(&record.hash()) != Some(&record.id()))
        {
            return Err(SessionError::MissingTorrent {
                alert: "identity_map",
                hash: record.hash(),
            });
        }
        self.views.check_invariants(&self.records)
    }

    fn ensure_open(&self) -> SessionResult<()> {
        if self.closed {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }

    fn add_source(
        &mut self,
        source: AddSource,
        metadata: Option<TorrentMetadata>,
        save_dir: Option<&Path>,
        flags: AddFlags,
    ) -> SessionResult<&TorrentRecord> {
        let hash = source.info_hash();
        if let Some(id) = self.identities.get(&hash).copied() {
            debug!(info_hash = %hash, torrent_id = %id, "torrent already tracked");
            return self
                .records
                .get(&id)
                .ok_or(SessionError::MissingTorrent { alert: "add", hash });
        }

        let save_dir =
            save_dir.map_or_else(|| self.settings.default_save_dir.clone(), Path::to_path_buf);
        let record = TorrentRecord::provisional(hash, save_dir.clone(), metadata);
        let id = record.id();
        info!(
            info_hash = %hash,
            torrent_id = %id,
            save_dir = %save_dir.display(),
            magnet = matches!(source, AddSource::Magnet(_)),
            "adding torrent"
        );
        self.engine.submit(EngineCommand::Add(AddTorrentParams {
            source,
            save_dir,
            flags,
        }));
        self.identities.insert(hash, id);
        Ok(self.records.entry(id).or_insert(record))
    }

    fn request_removal(&mut self, id: TorrentId, delete_files: bool) -> SessionResult<()> {
        self.ensure_open()?;
        let record = self
            .records
            .get_mut(&id)
            .ok_or(SessionError::UnknownTorrent { torrent_id: id })?;
        let first = if delete_files {
            record.mark_deleting()
        } else {
            record.mark_removing()
        };
        if !first {
            debug!(torrent_id = %id, "removal already requested");
            return Ok(());
        }
        if record.is_added() {
            let hash = record.hash();
            info!(torrent_id = %id, info_hash = %hash, delete_files, "removing torrent");
            self.engine
                .submit(EngineCommand::Remove { hash, delete_files });
        } else {
            debug!(
                torrent_id = %id,
                delete_files,
                "deferring removal until the engine confirms the add"
            );
        }
        Ok(())
    }

    fn dispatch(&mut self, alert: &Alert) -> SessionResult<()> {
        if let Alert::IdentityChanged { old, new } = alert {
            self.rekey(*old, *new)?;
        }
        let resolved = self.resolve(alert)?;

        let record = resolved.and_then(|id| {
            self.records
                .get(&id)
                .or_else(|| alert.hash().and_then(|hash| self.pending_deletions.get(&hash)))
        });
        notify(
            &mut self.observers,
            &SessionNotification::AlertObserved { alert, record },
        );
        self.events.publish(Event::AlertObserved {
            alert: alert.kind().to_string(),
            torrent_id: resolved,
        });

        let kind = alert.kind();
        match alert {
            Alert::TorrentAdded { hash } => self.on_added(require(resolved, kind, *hash)?),
            Alert::AddFailed { hash, error } => {
                self.on_add_failed(require(resolved, kind, *hash)?, error)
            }
            Alert::TorrentRemoved { hash } => self.on_removed(require(resolved, kind, *hash)?),
            Alert::TorrentDeleted { hash } => {
                self.on_delete_outcome(require(resolved, kind, *hash)?, *hash, None);
                Ok(())
            }
            Alert::DeleteFailed { hash, error } => {
                self.on_delete_outcome(require(resolved, kind, *hash)?, *hash, Some(error));
                Ok(())
            }
            Alert::MetadataReceived { hash, metadata } => {
                self.on_metadata(require(resolved, kind, *hash)?, metadata.clone())
            }
            Alert::MetadataFailed { hash, error } => {
                self.on_metadata_failed(require(resolved, kind, *hash)?, error);
                Ok(())
            }
            Alert::IdentityChanged { old, new } => {
                self.on_rekeyed(require(resolved, kind, *new)?, *old);
                Ok(())
            }
            Alert::StatusBatch { entries } => self.on_status_batch(entries),
            Alert::Other { kind, message } => {
                debug!(kind = %kind, message = %message, "engine alert");
                Ok(())
            }
        }
    }

    fn resolve(&self, alert: &Alert) -> SessionResult<Option<TorrentId>> {
        match alert {
            Alert::StatusBatch { .. } | Alert::Other { .. } => Ok(None),
            // A re-added torrent may already own the hash again; the outcome
            // belongs to the removed record awaiting it.
            Alert::TorrentDeleted { hash } | Alert::DeleteFailed { hash, .. } => self
                .pending_deletions
                .get(hash)
                .map(TorrentRecord::id)
                .or_else(|| self.identities.get(hash).copied())
                .map(Some)
                .ok_or(SessionError::MissingTorrent {
                    alert: alert.kind(),
                    hash: *hash,
                }),
            _ => {
                let Some(hash) = alert.hash() else {
                    return Ok(None);
                };
                self.identities
                    .get(&hash)
                    .copied()
                    .filter(|id| self.records.contains_key(id))
                    .map(Some)
                    .ok_or(SessionError::MissingTorrent {
                        alert: alert.kind(),
                        hash,
                    })
            }
        }
    }

    fn rekey(&mut self, old: ContentHash, new: ContentHash) -> SessionResult<()> {
        if self.identities.contains_key(&new) {
            return Err(SessionError::RekeyCollision { old, new });
        }
        let id = self
            .identities
            .remove(&old)
            .ok_or(SessionError::RekeyMissing { old, new })?;
        self.identities.insert(new, id);
        match self.records.get_mut(&id) {
            Some(record) => {
                record.rekey(new);
                info!(torrent_id = %id, old_hash = %old, new_hash = %new, "torrent rekeyed");
                Ok(())
            }
            None => Err(SessionError::RekeyMissing { old, new }),
        }
    }

    fn on_added(&mut self, id: TorrentId) -> SessionResult<()> {
        self.views.track(id, &self.records)?;
        self.flush_views();

        let Some(record) = self.records.get_mut(&id) else {
            return Err(missing(id, "torrent_added"));
        };
        record.mark_added();
        let hash = record.hash();
        let deferred = record.is_removing().then_some(record.is_deleting());
        info!(torrent_id = %id, info_hash = %hash, "torrent added");

        if let Some(record) = self.records.get(&id) {
            notify(
                &mut self.observers,
                &SessionNotification::TorrentAdded { record },
            );
            self.events.publish(Event::TorrentAdded {
                torrent_id: id,
                info_hash: hash.to_hex(),
                name: record.metadata().map(|metadata| metadata.name.clone()),
            });
        }

        if let Some(delete_files) = deferred {
            info!(torrent_id = %id, delete_files, "issuing deferred removal");
            self.engine
                .submit(EngineCommand::Remove { hash, delete_files });
        }
        Ok(())
    }

    fn on_add_failed(&mut self, id: TorrentId, error: &EngineError) -> SessionResult<()> {
        self.views.untrack(id);
        self.flush_views();

        let Some(record) = self.records.remove(&id) else {
            return Err(missing(id, "add_failed"));
        };
        let hash = record.hash();
        self.identities.remove(&hash);
        warn!(torrent_id = %id, info_hash = %hash, error = %error, "torrent add failed");

        notify(
            &mut self.observers,
            &SessionNotification::AddFailed {
                record: &record,
                error,
            },
        );
        self.messages.push(
            MessageLevel::Failure,
            "Could not add torrent",
            format!("{}: {}", record.display_name(), error.message),
        );
        self.events.publish(Event::AddFailed {
            torrent_id: id,
            info_hash: hash.to_hex(),
            message: error.message.clone(),
        });
        Ok(())
    }

    fn on_removed(&mut self, id: TorrentId) -> SessionResult<()> {
        self.views.untrack(id);
        self.flush_views();

        let Some(record) = self.records.remove(&id) else {
            return Err(missing(id, "torrent_removed"));
        };
        let hash = record.hash();
        self.identities.remove(&hash);
        info!(torrent_id = %id, info_hash = %hash, "torrent removed");

        notify(
            &mut self.observers,
            &SessionNotification::TorrentRemoved { record: &record },
        );
        self.events.publish(Event::TorrentRemoved {
            torrent_id: id,
            info_hash: hash.to_hex(),
        });

        if record.is_deleting() {
            self.pending_deletions.insert(hash, record);
        }
        Ok(())
    }

    fn on_delete_outcome(&mut self, id: TorrentId, hash: ContentHash, error: Option<&EngineError>) {
        let pending = self.pending_deletions.remove(&hash);
        let Some(record) = pending.as_ref().or_else(|| self.records.get(&id)) else {
            return;
        };

        match error {
            None => {
                info!(torrent_id = %id, info_hash = %hash, "torrent files deleted");
                notify(
                    &mut self.observers,
                    &SessionNotification::TorrentDeleted { record },
                );
                self.events.publish(Event::TorrentDeleted {
                    torrent_id: id,
                    info_hash: hash.to_hex(),
                });
            }
            Some(error) => {
                warn!(torrent_id = %id, info_hash = %hash, error = %error, "torrent file deletion failed");
                notify(
                    &mut self.observers,
                    &SessionNotification::DeleteFailed { record, error },
                );
                self.messages.push(
                    MessageLevel::Failure,
                    "Could not delete files",
                    format!("{}: {}", record.display_name(), error.message),
                );
                self.events.publish(Event::DeleteFailed {
                    torrent_id: id,
                    info_hash: hash.to_hex(),
                    message: error.message.clone(),
                });
            }
        }
    }

    fn on_metadata(&mut self, id: TorrentId, metadata: TorrentMetadata) -> SessionResult<()> {
        let Some(record) = self.records.get_mut(&id) else {
            return Err(missing(id, "metadata_received"));
        };
        let name = metadata.name.clone();
        record.set_metadata(metadata);
        debug!(torrent_id = %id, name = %name, "metadata received");

        if let Some(record) = self.records.get(&id) {
            notify(
                &mut self.observers,
                &SessionNotification::MetadataReceived { record },
            );
        }
        self.views.changed(id, true, &self.records)?;
        self.flush_views();
        self.events.publish(Event::MetadataReceived {
            torrent_id: id,
            name,
        });
        Ok(())
    }

    fn on_metadata_failed(&mut self, id: TorrentId, error: &EngineError) {
        let Some(record) = self.records.get(&id) else {
            return;
        };
        warn!(torrent_id = %id, error = %error, "metadata fetch failed");
        notify(
            &mut self.observers,
            &SessionNotification::MetadataFailed { record, error },
        );
        self.messages.push(
            MessageLevel::Failure,
            "Could not fetch metadata",
            format!("{}: {}", record.display_name(), error.message),
        );
        self.events.publish(Event::MetadataFailed {
            torrent_id: id,
            message: error.message.clone(),
        });
    }

    fn on_rekeyed(&mut self, id: TorrentId, old: ContentHash) {
        let Some(record) = self.records.get(&id) else {
            return;
        };
        notify(
            &mut self.observers,
            &SessionNotification::TorrentRekeyed { record, old },
        );
        self.events.publish(Event::TorrentRekeyed {
            torrent_id: id,
            old_hash: old.to_hex(),
            new_hash: record.hash().to_hex(),
        });
    }

    fn on_status_batch(&mut self, entries: &[StatusEntry]) -> SessionResult<()> {
        debug!(entries = entries.len(), "status batch");

        for entry in entries {
            let id = self
                .identities
                .get(&entry.hash)
                .copied()
                .ok_or(SessionError::MissingTorrent {
                    alert: "status_batch",
                    hash: entry.hash,
                })?;
            let Some(record) = self.records.get_mut(&id) else {
                return Err(missing(id, "status_batch"));
            };
            let delta = record.status_mut().apply(&entry.status);

            if let Some(record) = self.records.get(&id) {
                notify(
                    &mut self.observers,
                    &SessionNotification::StatusChanged {
                        record,
                        delta: &delta,
                    },
                );
                if !delta.is_empty() {
                    let status = record.status();
                    self.events.publish(Event::StatusUpdated {
                        torrent_id: id,
                        state: status.state().as_str().to_string(),
                        progress_ppm: status.progress_ppm(),
                        download_rate: status.download_rate(),
                        upload_rate: status.upload_rate(),
                    });
                }
            }
            if !delta.is_empty() {
                self.views.changed(id, false, &self.records)?;
                self.flush_views();
            }
        }

        let next = self.engine.session_status();
        if self.status.apply(&next) {
            notify(
                &mut self.observers,
                &SessionNotification::SessionStatusChanged {
                    status: &self.status,
                },
            );
            self.events.publish(Event::SessionStatusUpdated {
                num_peers: self.status.num_peers(),
                download_rate: self.status.payload_download_rate(),
                upload_rate: self.status.payload_upload_rate(),
            });
        }
        Ok(())
    }

    fn flush_views(&mut self) {
        for change in self.views.take_changes() {
            notify(
                &mut self.observers,
                &SessionNotification::ViewChanged(change),
            );
        }
    }
}

fn notify(observers: &mut Observers, notification: &SessionNotification<'_>) {
    for observer in observers.iter_mut() {
        observer.notify(notification);
    }
}

fn require(
    resolved: Option<TorrentId>,
    alert: &'static str,
    hash: ContentHash,
) -> SessionResult<TorrentId> {
    resolved.ok_or(SessionError::MissingTorrent { alert, hash })
}

fn missing(id: TorrentId, alert: &'static str) -> SessionError {
    debug!(torrent_id = %id, alert, "record vanished from store");
    SessionError::UnknownTorrent { torrent_id: id }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loopback::LoopbackEngine;
    use lanseed_torrent_core::{StatusSnapshot, TorrentState};
    use std::sync::{Arc, Mutex};

    fn hash(seed: u8) -> ContentHash {
        ContentHash::from_bytes([seed; 20])
    }

    fn metainfo(seed: u8) -> TorrentMetainfo {
        TorrentMetainfo::from_parts(
            hash(seed),
            TorrentMetadata::named(format!("torrent-{seed}")),
            Vec::new(),
        )
    }

    fn session() -> (LoopbackEngine, Session<LoopbackEngine>) {
        let engine = LoopbackEngine::new();
        let settings = SessionSettings {
            enable_lsd: false,
            ..SessionSettings::default()
        };
        let session = Session::new(engine.clone(), settings, EventBus::with_capacity(64));
        (engine, session)
    }

    #[test]
    fn construction_starts_local_discovery() {
        let engine = LoopbackEngine::new();
        let _session = Session::new(engine.clone(), SessionSettings::default(), EventBus::new());
        assert_eq!(engine.commands(), vec![EngineCommand::StartLocalDiscovery]);
    }

    #[test]
    fn add_uses_default_save_dir_and_issues_one_command() {
        let (engine, mut session) = session();
        let record = session
            .add_torrent(metainfo(1), None, AddFlags::default())
            .expect("add");
        assert!(!record.is_added());
        assert_eq!(record.save_dir(), Path::new("./downloads"));
        assert_eq!(
            record.metadata().map(|metadata| metadata.name.as_str()),
            Some("torrent-1")
        );
        assert_eq!(engine.commands().len(), 1);
    }

    #[test]
    fn malformed_magnet_creates_no_record() {
        let (engine, mut session) = session();
        let result = session.add_magnet("magnet:?dn=nothing", None, AddFlags::default());
        assert!(matches!(result, Err(SessionError::Rejected { .. })));
        assert!(session.is_empty());
        assert!(engine.commands().is_empty());
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn magnet_display_name_becomes_provisional_metadata() {
        let (_engine, mut session) = session();
        let uri = format!("magnet:?xt=urn:btih:{}&dn=Example", hash(4).to_hex());
        let record = session
            .add_magnet(&uri, Some(Path::new("/data")), AddFlags::default())
            .expect("magnet");
        assert_eq!(record.hash(), hash(4));
        assert_eq!(record.display_name(), "Example");
        assert_eq!(record.save_dir(), Path::new("/data"));
    }

    #[test]
    fn removal_of_added_torrent_is_issued_once() {
        let (engine, mut session) = session();
        let id = session
            .add_torrent(metainfo(1), None, AddFlags::default())
            .expect("add")
            .id();
        engine.push_alert(Alert::TorrentAdded { hash: hash(1) });
        session.tick().expect("tick");
        let _ = engine.take_commands();

        session.remove_torrent(id).expect("remove");
        session.remove_torrent(id).expect("second remove is ignored");
        assert_eq!(
            engine.take_commands(),
            vec![EngineCommand::Remove {
                hash: hash(1),
                delete_files: false
            }]
        );
    }

    #[test]
    fn commands_after_close_are_rejected() {
        let (_engine, mut session) = session();
        let seen = Arc::new(Mutex::new(0_usize));
        let counter = Arc::clone(&seen);
        session.add_observer(move |notification: &SessionNotification<'_>| {
            if matches!(notification, SessionNotification::Closed) {
                *counter.lock().expect("counter lock") += 1;
            }
        });

        session.close();
        session.close();
        assert!(session.is_closed());
        assert_eq!(*seen.lock().expect("counter lock"), 1);
        assert!(matches!(
            session.add_torrent(metainfo(1), None, AddFlags::default()),
            Err(SessionError::Closed)
        ));
    }

    #[test]
    fn unknown_alert_hash_aborts_the_tick() {
        let (engine, mut session) = session();
        engine.push_alert(Alert::TorrentAdded { hash: hash(9) });
        engine.push_alert(Alert::Other {
            kind: "log".into(),
            message: "never processed".into(),
        });
        let err = session.tick().expect_err("missing torrent");
        assert!(err.is_invariant_violation());
        assert_eq!(engine.pending_alerts(), 0);
    }

    #[test]
    fn status_refresh_requested_every_n_ticks_without_batches() {
        let (engine, mut session) = session();
        for _ in 0..9 {
            assert!(!session.tick().expect("tick").status_requested);
        }
        assert!(session.tick().expect("tick").status_requested);
        assert_eq!(engine.take_commands(), vec![EngineCommand::PostStatusUpdates]);

        for _ in 0..5 {
            session.tick().expect("tick");
        }
        engine.push_alert(Alert::StatusBatch {
            entries: Vec::new(),
        });
        assert!(!session.tick().expect("batch tick").status_requested);
        for _ in 0..9 {
            assert!(!session.tick().expect("tick").status_requested);
        }
        assert!(session.tick().expect("tick").status_requested);
    }

    #[test]
    fn status_batch_updates_session_status_once() {
        let (engine, mut session) = session();
        let id = session
            .add_torrent(metainfo(1), None, AddFlags::default())
            .expect("add")
            .id();
        engine.push_alert(Alert::TorrentAdded { hash: hash(1) });
        session.tick().expect("tick");

        let mut aggregate = SessionStatusSnapshot::default();
        aggregate.set_payload_download_rate(4_096);
        engine.set_session_status(aggregate);

        let mut status = StatusSnapshot::default();
        status.set_state(TorrentState::Downloading);
        status.set_download_rate(4_096);
        engine.push_alert(Alert::StatusBatch {
            entries: vec![StatusEntry {
                hash: hash(1),
                status,
            }],
        });
        session.tick().expect("tick");

        let record = session.record(id).expect("record");
        assert_eq!(record.status().state(), TorrentState::Downloading);
        assert_eq!(session.status().payload_download_rate(), 4_096);
        assert_eq!(session.views().downloads().rows(), &[id]);
        session.check_invariants().expect("invariants");
    }
}
