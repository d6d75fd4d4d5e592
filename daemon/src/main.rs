mod classifier;
mod config;
mod controls;
mod coordinator;
mod engine;
mod filters;
mod fullscreen;
mod ipc_server;
mod keyboard;
mod macros;
mod playlist;
mod session;
mod timers;
mod tracks;

use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};

use crate::config::EngineSettings;
use crate::coordinator::{Coordinator, CoordinatorSettings};
use crate::engine::{MediaBackend, PlaybackEngine};

#[tokio::main]
async fn main() -> Result<()> {
    // Config first so its log level can seed the logger
    let (config, config_error) = match config::Config::load() {
        Ok(cfg) => (cfg, None),
        Err(e) => (config::Config::default(), Some(e)),
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.general.log_level.as_str()),
    )
    .init();

    log::info!("Starting Marquee player daemon v{}", env!("CARGO_PKG_VERSION"));

    if let Some(e) = config_error {
        log::warn!("Failed to load config: {:#}. Using defaults.", e);
        if let Ok(path) = config::Config::default_config_path() {
            log::info!("Config is read from {}", path.display());
        }
    }

    log::info!("  Playlist: {}", config.general.playlist);
    log::info!(
        "  Controls: hide after {}ms, glyph {}ms, bar height {}",
        config.controls.hide_after_ms,
        config.controls.glyph_flash_ms,
        config.controls.control_bar_height
    );
    log::info!(
        "  Engine: {} backend, tick {}ms",
        config.engine.backend,
        config.engine.tick_ms
    );

    let started = Instant::now();
    let engine = PlaybackEngine::new(build_backend(&config.engine));
    let coordinator = Coordinator::new(
        CoordinatorSettings::from_config(&config),
        engine,
        Box::new(fullscreen::RemoteSurface),
        Box::new(tracks::LogAudioHook),
        started,
    );
    let loader = playlist::JsonFileLoader::new(&config.general.playlist);

    // Channels between IPC and the session
    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(session::Snapshot::default());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let session = session::Session::new(
        coordinator,
        Box::new(loader),
        config.engine.tick(),
        snapshot_tx,
    );
    let mut session_handle = tokio::spawn(session.run(request_rx, shutdown_rx.clone()));

    // Start IPC server
    let ipc_ctx = ipc_server::IpcContext {
        requests: request_tx,
        snapshot: snapshot_rx,
        started,
    };
    let ipc_handle = tokio::spawn(async move {
        if let Err(e) = ipc_server::start(ipc_ctx, shutdown_rx).await {
            log::error!("IPC server error: {}", e);
        }
    });

    // Set up signal handlers
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    let session_finished = tokio::select! {
        _ = sigterm.recv() => {
            log::info!("Received SIGTERM, shutting down...");
            false
        }
        _ = sigint.recv() => {
            log::info!("Received SIGINT, shutting down...");
            false
        }
        result = &mut session_handle => {
            log_session_result(result);
            true
        }
    };

    let _ = shutdown_tx.send(true);
    if !session_finished {
        log_session_result(session_handle.await);
    }
    if let Err(e) = ipc_handle.await {
        log::error!("IPC server task failed: {}", e);
    }

    // Give in-flight replies a moment to reach their clients
    tokio::time::sleep(Duration::from_millis(100)).await;
    log::info!("Daemon shutting down");
    Ok(())
}

fn log_session_result(result: std::result::Result<Result<()>, tokio::task::JoinError>) {
    match result {
        Ok(Ok(())) => log::info!("Player session stopped"),
        Ok(Err(e)) => log::error!("Player session error: {:#}", e),
        Err(e) => log::error!("Player session task failed: {}", e),
    }
}

/// Pick the media backend named in the config, falling back to simulated playback
fn build_backend(settings: &EngineSettings) -> Box<dyn MediaBackend> {
    match settings.backend.as_str() {
        #[cfg(feature = "video")]
        "gstreamer" => match engine::GstBackend::new() {
            Ok(backend) => {
                log::info!("Using GStreamer backend");
                return Box::new(backend);
            }
            Err(e) => log::warn!(
                "GStreamer backend unavailable: {:#}. Falling back to simulated playback.",
                e
            ),
        },
        #[cfg(not(feature = "video"))]
        "gstreamer" => log::warn!(
            "GStreamer backend not compiled (build with --features video). Falling back to simulated playback."
        ),
        _ => {}
    }

    log::info!(
        "Using simulated backend ({}s per entry)",
        settings.simulated_duration_secs
    );
    Box::new(engine::SimulatedBackend::new(
        settings.simulated_duration_secs,
    ))
}
