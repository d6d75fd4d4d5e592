//! The player session event loop.
//!
//! One task owns the [`Coordinator`]. IPC commands, timer expiries and engine
//! polling are multiplexed onto it, so every mutation happens in delivery
//! order on a single writer. Observers read the [`Snapshot`] published through
//! a `watch` channel.

use anyhow::Result;
use common::{Command, PlayerStatus, PlaylistItemInfo, Response};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::MissedTickBehavior;

use crate::coordinator::Coordinator;
use crate::playlist::{PlaylistLoader, PlaylistStore};

/// A command forwarded from the IPC server, with the channel for its reply
#[derive(Debug)]
pub struct SessionRequest {
    pub command: Command,
    pub reply: oneshot::Sender<Response>,
}

/// State published after every change
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub status: PlayerStatus,
    pub playlist: Vec<PlaylistItemInfo>,
}

pub struct Session {
    coordinator: Coordinator,
    loader: Box<dyn PlaylistLoader>,
    tick: Duration,
    snapshot_tx: watch::Sender<Snapshot>,
}

impl Session {
    pub fn new(
        coordinator: Coordinator,
        loader: Box<dyn PlaylistLoader>,
        tick: Duration,
        snapshot_tx: watch::Sender<Snapshot>,
    ) -> Self {
        Self {
            coordinator,
            loader,
            tick,
            snapshot_tx,
        }
    }

    /// Run until `Kill`, shutdown, or every request sender is gone
    pub async fn run(
        mut self,
        mut requests: mpsc::UnboundedReceiver<SessionRequest>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let entries = PlaylistStore::load(self.loader.as_ref());
        self.coordinator.start(entries);
        self.publish(Instant::now());

        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let deadline = self.coordinator.next_deadline();

            tokio::select! {
                request = requests.recv() => {
                    let Some(request) = request else {
                        log::info!("Command channel closed");
                        break;
                    };
                    if !self.handle_request(request) {
                        break;
                    }
                }
                _ = wait_until(deadline) => {
                    self.coordinator.fire_timers(Instant::now());
                }
                _ = ticker.tick() => {
                    self.coordinator.poll_engine(Instant::now());
                }
                _ = shutdown.changed() => {
                    log::info!("Session shutdown requested");
                    break;
                }
            }

            self.publish(Instant::now());
        }

        self.coordinator.teardown();
        self.publish(Instant::now());
        Ok(())
    }

    /// Apply one request. Returns false when the session should stop.
    fn handle_request(&mut self, request: SessionRequest) -> bool {
        let SessionRequest { command, reply } = request;
        let now = Instant::now();

        let (response, keep_running) = match command {
            Command::Kill => {
                log::info!("Received kill command");
                (Response::Ok, false)
            }
            Command::ReloadPlaylist => {
                let entries = PlaylistStore::load(self.loader.as_ref());
                self.coordinator.replace_playlist(entries);
                (Response::Ok, true)
            }
            command => (self.coordinator.handle_command(command, now), true),
        };

        // Observers see the new state before the client sees the reply
        self.publish(now);
        if reply.send(response).is_err() {
            log::debug!("Client went away before the reply was sent");
        }
        keep_running
    }

    fn publish(&mut self, now: Instant) {
        if !self.coordinator.take_dirty() {
            return;
        }
        self.snapshot_tx.send_replace(Snapshot {
            status: self.coordinator.status(now),
            playlist: self.coordinator.playlist_items(),
        });
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

/// Send `command` to the session and wait for its reply
pub async fn request(
    sender: &mpsc::UnboundedSender<SessionRequest>,
    command: Command,
) -> Response {
    let (reply, response) = oneshot::channel();
    if sender.send(SessionRequest { command, reply }).is_err() {
        return Response::Error(common::PlayerError::Ipc(
            "Player session is not running".to_string(),
        ));
    }
    response.await.unwrap_or_else(|_| {
        Response::Error(common::PlayerError::Ipc(
            "Player session dropped the request".to_string(),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::CoordinatorSettings;
    use crate::engine::{PlaybackEngine, SimulatedBackend};
    use crate::fullscreen::RemoteSurface;
    use crate::tracks::LogAudioHook;
    use common::{PlayerError, PlaylistEntry, SourceVariant};
    use std::sync::{Arc, Mutex};

    /// Loader serving whatever list the test put in it
    #[derive(Clone, Default)]
    struct SharedLoader {
        entries: Arc<Mutex<Vec<PlaylistEntry>>>,
    }

    impl PlaylistLoader for SharedLoader {
        fn load(&self) -> Result<Vec<PlaylistEntry>> {
            Ok(self.entries.lock().unwrap().clone())
        }

        fn describe(&self) -> String {
            "memory".to_string()
        }
    }

    fn entries(json: &str) -> Vec<PlaylistEntry> {
        serde_json::from_str(json).unwrap()
    }

    struct Running {
        sender: mpsc::UnboundedSender<SessionRequest>,
        snapshots: watch::Receiver<Snapshot>,
        shutdown: watch::Sender<bool>,
        handle: tokio::task::JoinHandle<Result<()>>,
        loader: SharedLoader,
    }

    fn spawn_session(json: &str) -> Running {
        let loader = SharedLoader::default();
        *loader.entries.lock().unwrap() = entries(json);

        let coordinator = Coordinator::new(
            CoordinatorSettings::default(),
            PlaybackEngine::new(Box::new(SimulatedBackend::new(60.0))),
            Box::new(RemoteSurface),
            Box::new(LogAudioHook),
            Instant::now(),
        );
        let (snapshot_tx, snapshots) = watch::channel(Snapshot::default());
        let (shutdown, shutdown_rx) = watch::channel(false);
        let (sender, receiver) = mpsc::unbounded_channel();

        let session = Session::new(
            coordinator,
            Box::new(loader.clone()),
            Duration::from_millis(20),
            snapshot_tx,
        );
        let handle = tokio::spawn(session.run(receiver, shutdown_rx));

        Running {
            sender,
            snapshots,
            shutdown,
            handle,
            loader,
        }
    }

    const PLAYLIST: &str = r#"[
        {"url": "https://youtube.com/x", "name": "Clip", "type": "embedA"},
        {"url": "https://cdn.example.com/video.mp4", "name": "Direct", "type": "standard"}
    ]"#;

    #[tokio::test]
    async fn test_commands_reach_coordinator() {
        let running = spawn_session(PLAYLIST);

        assert_eq!(
            request(&running.sender, Command::Select { index: 1 }).await,
            Response::Ok
        );
        assert_eq!(request(&running.sender, Command::Play).await, Response::Ok);

        let snapshot = running.snapshots.borrow().clone();
        assert_eq!(snapshot.status.variant, Some(SourceVariant::Direct));
        assert!(snapshot.status.is_playing);
        assert_eq!(snapshot.playlist.len(), 2);
        assert!(snapshot.playlist[1].active);

        let response = request(&running.sender, Command::Select { index: 9 }).await;
        assert!(matches!(response, Response::Error(PlayerError::NotFound(_))));

        assert_eq!(request(&running.sender, Command::Kill).await, Response::Ok);
        running.handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_glyph_clears_on_its_own() {
        let mut running = spawn_session(PLAYLIST);
        request(&running.sender, Command::Select { index: 1 }).await;
        request(&running.sender, Command::Play).await;
        assert!(running.snapshots.borrow_and_update().status.glyph.is_some());

        tokio::time::timeout(Duration::from_secs(5), async {
            while running.snapshots.borrow_and_update().status.glyph.is_some() {
                running.snapshots.changed().await.unwrap();
            }
        })
        .await
        .unwrap();

        let _ = running.shutdown.send(true);
        running.handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_reload_replaces_list() {
        let running = spawn_session(PLAYLIST);
        *running.loader.entries.lock().unwrap() =
            entries(r#"[{"url": "//ok.ru/videoembed/42", "type": "embedB"}]"#);

        assert_eq!(
            request(&running.sender, Command::ReloadPlaylist).await,
            Response::Ok
        );
        let snapshot = running.snapshots.borrow().clone();
        assert_eq!(snapshot.playlist.len(), 1);
        assert_eq!(snapshot.status.variant, Some(SourceVariant::ExternalEmbedB));

        let _ = running.shutdown.send(true);
        running.handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_requests_after_shutdown_fail() {
        let running = spawn_session("[]");
        let _ = running.shutdown.send(true);
        running.handle.await.unwrap().unwrap();

        let response = request(&running.sender, Command::Play).await;
        assert!(matches!(response, Response::Error(PlayerError::Ipc(_))));
    }
}
