use std::future::Future;
use std::path::{Path, PathBuf};

use lanseed_config::SessionConfig;
use lanseed_events::{Event, EventBus, EventEnvelope};
use lanseed_session::{LoopbackEngine, Session, SessionHandle, SessionSettings, worker};
use lanseed_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig};
use lanseed_torrent_core::{AddFlags, TorrentEngine, TorrentWorkflow};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};

const MAGNET_PREFIX: &str = "magnet:";

/// Dependencies required to bootstrap the session.
pub(crate) struct BootstrapDependencies {
    config: SessionConfig,
    engine: LoopbackEngine,
    startup: Vec<StartupSource>,
}

impl BootstrapDependencies {
    /// Construct production dependencies from the environment and command line.
    pub(crate) fn from_env() -> AppResult<Self> {
        let config =
            lanseed_config::load().map_err(|err| AppError::config("config.load", err))?;
        let startup = std::env::args().skip(1).map(StartupSource::parse).collect();
        Ok(Self {
            config,
            engine: LoopbackEngine::responsive(),
            startup,
        })
    }
}

/// Torrent named on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StartupSource {
    /// Magnet URI.
    Magnet(String),
    /// Path to a `.torrent` file.
    File(PathBuf),
}

impl StartupSource {
    pub(crate) fn parse(arg: String) -> Self {
        if arg
            .get(..MAGNET_PREFIX.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(MAGNET_PREFIX))
        {
            Self::Magnet(arg)
        } else {
            Self::File(PathBuf::from(arg))
        }
    }
}

/// Entry point for the lanseed boot sequence.
///
/// # Errors
///
/// Returns an error if configuration, logging, or the session worker fails.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    run_app_with(dependencies, shutdown_signal()).await
}

/// Boot sequence that relies entirely on injected dependencies.
pub(crate) async fn run_app_with<F>(dependencies: BootstrapDependencies, shutdown: F) -> AppResult<()>
where
    F: Future<Output = ()>,
{
    let BootstrapDependencies {
        config,
        engine,
        startup,
    } = dependencies;

    let build_sha = option_env!("LANSEED_BUILD_SHA").unwrap_or("dev");
    lanseed_telemetry::init_logging(&LoggingConfig {
        level: &config.log_level,
        format: LogFormat::from_setting(config.log_format.as_deref()),
        build_sha,
    })
    .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("bootstrap");

    info!(
        tick_interval_ms = config.tick_interval_ms,
        status_refresh_ticks = config.status_refresh_ticks,
        "lanseed bootstrap starting"
    );

    serve_session(&config, engine, startup, shutdown).await
}

/// Run a session worker until `shutdown` resolves, then close it and wait for
/// the worker to finish.
pub(crate) async fn serve_session<E, F>(
    config: &SessionConfig,
    engine: E,
    startup: Vec<StartupSource>,
    shutdown: F,
) -> AppResult<()>
where
    E: TorrentEngine + 'static,
    F: Future<Output = ()>,
{
    let events = EventBus::with_capacity(config.event_bus_capacity);
    let session = Session::new(engine, session_settings(config), events);
    let (handle, worker_task) = worker::spawn(session, config.tick_interval());
    let event_log = spawn_event_log(&handle);

    for source in startup {
        if let Err(err) = submit_startup(&handle, &source).await {
            warn!(error = %err, source = ?source, "startup torrent not added");
        }
    }

    shutdown.await;
    info!("shutdown requested");

    if let Err(err) = handle.close().await {
        warn!(error = %err, "session worker already stopped");
    }
    let joined = worker_task.await;
    event_log.abort();
    joined.map_err(|source| AppError::Join {
        operation: "session.worker",
        source,
    })?;
    info!("session shutdown complete");
    Ok(())
}

pub(crate) fn session_settings(config: &SessionConfig) -> SessionSettings {
    SessionSettings {
        status_refresh_ticks: config.status_refresh_ticks,
        default_save_dir: config.default_save_dir.clone(),
        enable_lsd: config.enable_lsd,
        message_capacity: config.message_capacity,
    }
}

async fn submit_startup(handle: &SessionHandle, source: &StartupSource) -> AppResult<()> {
    let outcome = match source {
        StartupSource::Magnet(uri) => {
            handle
                .add_magnet(uri.clone(), None, AddFlags::default())
                .await
        }
        StartupSource::File(path) => {
            let bytes = read_torrent(path).await?;
            handle
                .add_torrent_file(bytes, None, AddFlags::default())
                .await
        }
    };
    match outcome {
        Ok(outcome) => {
            info!(
                torrent_id = %outcome.torrent_id,
                info_hash = %outcome.info_hash,
                already_present = outcome.already_present,
                "startup torrent submitted"
            );
        }
        Err(err) => warn!(error = %err, "session rejected startup torrent"),
    }
    Ok(())
}

async fn read_torrent(path: &Path) -> AppResult<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|source| AppError::io("startup.read_torrent", Some(path.to_path_buf()), source))
}

fn spawn_event_log(handle: &SessionHandle) -> JoinHandle<()> {
    let mut stream = handle.subscribe(None);
    tokio::spawn(async move {
        while let Some(envelope) = stream.next().await {
            log_event(&envelope);
        }
    })
}

fn log_event(envelope: &EventEnvelope) {
    match &envelope.event {
        Event::AlertObserved { .. } | Event::StatusUpdated { .. } => {
            debug!(event_id = envelope.id, kind = envelope.event.kind(), "session event");
        }
        Event::HealthChanged { degraded } => {
            if degraded.is_empty() {
                info!(event_id = envelope.id, "session healthy");
            } else {
                warn!(event_id = envelope.id, degraded = ?degraded, "session degraded");
            }
        }
        event => info!(event_id = envelope.id, kind = event.kind(), "session event"),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use lanseed_torrent_core::{AddSource, EngineCommand};

    const MAGNET: &str = "magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef01234567&dn=demo";

    fn fast_config() -> SessionConfig {
        SessionConfig {
            tick_interval_ms: 10,
            enable_lsd: false,
            ..SessionConfig::default()
        }
    }

    #[test]
    fn startup_sources_detect_magnets() {
        assert_eq!(
            StartupSource::parse(MAGNET.to_string()),
            StartupSource::Magnet(MAGNET.to_string())
        );
        assert_eq!(
            StartupSource::parse("MAGNET:?xt=x".to_string()),
            StartupSource::Magnet("MAGNET:?xt=x".to_string())
        );
        assert_eq!(
            StartupSource::parse("ubuntu.torrent".to_string()),
            StartupSource::File(PathBuf::from("ubuntu.torrent"))
        );
    }

    #[test]
    fn session_settings_follow_config() {
        let config = SessionConfig {
            status_refresh_ticks: 3,
            default_save_dir: PathBuf::from("/srv/torrents"),
            enable_lsd: false,
            message_capacity: 16,
            ..SessionConfig::default()
        };
        let settings = session_settings(&config);
        assert_eq!(settings.status_refresh_ticks, 3);
        assert_eq!(settings.default_save_dir, PathBuf::from("/srv/torrents"));
        assert!(!settings.enable_lsd);
        assert_eq!(settings.message_capacity, 16);
    }

    #[tokio::test]
    async fn serve_session_adds_startup_magnets_and_shuts_down() -> anyhow::Result<()> {
        let engine = LoopbackEngine::responsive();
        let loopback = engine.clone();
        serve_session(
            &fast_config(),
            engine,
            vec![StartupSource::Magnet(MAGNET.to_string())],
            tokio::time::sleep(Duration::from_millis(50)),
        )
        .await?;

        let adds: Vec<_> = loopback
            .commands()
            .into_iter()
            .filter_map(|command| match command {
                EngineCommand::Add(params) => Some(params),
                _ => None,
            })
            .collect();
        assert_eq!(adds.len(), 1);
        assert!(matches!(adds[0].source, AddSource::Magnet(_)));
        assert_eq!(adds[0].save_dir, PathBuf::from("./downloads"));
        Ok(())
    }

    #[tokio::test]
    async fn missing_startup_files_do_not_stop_the_session() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let engine = LoopbackEngine::responsive();
        let loopback = engine.clone();
        serve_session(
            &fast_config(),
            engine,
            vec![StartupSource::File(dir.path().join("missing.torrent"))],
            tokio::time::sleep(Duration::from_millis(30)),
        )
        .await?;
        assert!(
            loopback
                .commands()
                .iter()
                .all(|command| !matches!(command, EngineCommand::Add(_)))
        );
        Ok(())
    }

    #[tokio::test]
    async fn read_torrent_reports_the_path() {
        let err = read_torrent(Path::new("/nonexistent/lanseed.torrent"))
            .await
            .expect_err("missing file");
        assert!(matches!(
            err,
            AppError::Io { operation: "startup.read_torrent", path: Some(_), .. }
        ));
    }
}
