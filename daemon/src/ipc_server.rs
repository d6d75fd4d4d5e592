use anyhow::Result;
use common::{Command, PlayerError, Response};
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, watch};

use crate::session::{self, SessionRequest, Snapshot};

/// What every client connection needs to reach the session
#[derive(Clone)]
pub struct IpcContext {
    pub requests: mpsc::UnboundedSender<SessionRequest>,
    pub snapshot: watch::Receiver<Snapshot>,
    pub started: Instant,
}

pub async fn start(ctx: IpcContext, mut shutdown: watch::Receiver<bool>) -> Result<()> {
    let socket_path = common::get_socket_path();

    // Remove old socket if it exists
    if socket_path.exists() {
        std::fs::remove_file(&socket_path)?;
    }

    let listener = UnixListener::bind(&socket_path)?;
    log::info!("IPC server listening on: {}", socket_path.display());

    loop {
        tokio::select! {
            accept_result = listener.accept() => match accept_result {
                Ok((stream, _addr)) => {
                    let ctx = ctx.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, ctx).await {
                            log::error!("Error handling client: {}", e);
                        }
                    });
                }
                Err(e) => {
                    log::error!("Error accepting connection: {}", e);
                }
            },
            _ = shutdown.changed() => break,
        }
    }

    // Clean up socket
    let _ = std::fs::remove_file(&socket_path);
    log::info!("IPC server stopped");
    Ok(())
}

async fn handle_client(stream: UnixStream, ctx: IpcContext) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    while reader.read_line(&mut line).await? > 0 {
        if line.trim().is_empty() {
            line.clear();
            continue;
        }

        let response = match serde_json::from_str::<Command>(&line) {
            Ok(command) => handle_command(command, &ctx).await,
            Err(e) => {
                log::warn!("Invalid command: {}", e);
                Response::Error(PlayerError::Ipc(format!("Invalid command: {}", e)))
            }
        };

        // Send response
        let response_json = serde_json::to_string(&response)?;
        writer.write_all(response_json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        line.clear();
    }

    Ok(())
}

async fn handle_command(command: Command, ctx: &IpcContext) -> Response {
    log::debug!("Handling command: {:?}", command);

    match command {
        Command::Ping => Response::Pong,

        // Read-only queries come from the last published snapshot
        Command::Status => {
            let mut status = ctx.snapshot.borrow().status.clone();
            status.uptime_secs = ctx.started.elapsed().as_secs();
            Response::Status(Box::new(status))
        }

        Command::ListPlaylist => Response::Playlist(ctx.snapshot.borrow().playlist.clone()),

        // Everything else mutates player state and goes through the session
        command => session::request(&ctx.requests, command).await,
    }
}
