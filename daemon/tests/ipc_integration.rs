//! Integration tests for IPC communication
//!
//! These tests pin the wire format front ends rely on and drive a real
//! daemon over its Unix socket.

use common::{
    Command, FilterChannel, Glyph, InputEvent, Key, PlayerError, PlayerStatus, Response,
    SourceVariant,
};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Stdio};
use std::time::{Duration, Instant};

#[test]
fn test_input_event_wire_format() {
    let cmd = Command::Input(InputEvent::Click {
        y: 120.0,
        height: 480.0,
    });
    let json = serde_json::to_string(&cmd).unwrap();
    assert_eq!(json, r#"{"Input":{"Click":{"y":120.0,"height":480.0}}}"#);

    // Front ends hand-write these
    let cmd: Command = serde_json::from_str(r#"{"Input":{"Key":"Space"}}"#).unwrap();
    assert_eq!(cmd, Command::Input(InputEvent::Key(Key::Space)));

    let cmd: Command = serde_json::from_str(r#"{"Input":{"Key":{"Char":"f"}}}"#).unwrap();
    assert_eq!(cmd, Command::Input(InputEvent::Key(Key::Char('f'))));

    let cmd: Command =
        serde_json::from_str(r#"{"Input":{"FullscreenChanged":{"active":false}}}"#).unwrap();
    assert_eq!(
        cmd,
        Command::Input(InputEvent::FullscreenChanged { active: false })
    );
}

#[test]
fn test_player_commands_wire_format() {
    let cmd: Command = serde_json::from_str(r#"{"Select":{"index":1}}"#).unwrap();
    assert_eq!(cmd, Command::Select { index: 1 });

    let cmd: Command =
        serde_json::from_str(r#"{"SetFilter":{"channel":"Contrast","value":140}}"#).unwrap();
    assert_eq!(
        cmd,
        Command::SetFilter {
            channel: FilterChannel::Contrast,
            value: 140
        }
    );

    let cmd: Command = serde_json::from_str(r#""TogglePlay""#).unwrap();
    assert_eq!(cmd, Command::TogglePlay);
}

#[test]
fn test_status_response_fields() {
    let status = PlayerStatus {
        active_index: Some(1),
        variant: Some(SourceVariant::Direct),
        controls_enabled: true,
        is_playing: true,
        glyph: Some(Glyph::Pause),
        elapsed: "01:05".to_string(),
        ..Default::default()
    };
    let json = serde_json::to_string(&Response::Status(Box::new(status))).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["Status"]["variant"], "Direct");
    assert_eq!(value["Status"]["glyph"], "Pause");
    assert_eq!(value["Status"]["elapsed"], "01:05");
    assert_eq!(value["Status"]["hover_preview"], serde_json::Value::Null);
}

#[test]
fn test_error_response() {
    let resp = Response::Error(PlayerError::NotFound("entry 9".to_string()));
    let json = serde_json::to_string(&resp).unwrap();
    assert_eq!(json, r#"{"Error":{"NotFound":"entry 9"}}"#);
}

/// Kills the daemon if a test bails out early
struct Daemon {
    child: Child,
    socket: PathBuf,
    _dir: tempfile::TempDir,
}

impl Drop for Daemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn spawn_daemon() -> Daemon {
    let dir = tempfile::tempdir().unwrap();
    let runtime = dir.path().join("run");
    let config_home = dir.path().join("config");
    std::fs::create_dir_all(&runtime).unwrap();
    std::fs::create_dir_all(config_home.join("marquee")).unwrap();

    let video = dir.path().join("video.mp4");
    std::fs::write(&video, b"not really a video").unwrap();

    let playlist = dir.path().join("playlist.json");
    let entries = serde_json::json!([
        {"url": "https://youtube.com/x", "name": "Clip", "type": "embedA"},
        {"url": video.to_str().unwrap(), "name": "Local", "type": "standard",
         "subtitles": [{"label": "en", "src": "/en.vtt"}]}
    ]);
    std::fs::write(&playlist, entries.to_string()).unwrap();

    std::fs::write(
        config_home.join("marquee").join("config.toml"),
        format!(
            "[general]\nlog_level = \"warn\"\nplaylist = \"{}\"\n",
            playlist.display()
        ),
    )
    .unwrap();

    let child = std::process::Command::new(env!("CARGO_BIN_EXE_marquee"))
        .env("XDG_RUNTIME_DIR", &runtime)
        .env("XDG_CONFIG_HOME", &config_home)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    Daemon {
        child,
        socket: runtime.join("marquee.sock"),
        _dir: dir,
    }
}

fn connect(socket: &Path) -> UnixStream {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if let Ok(stream) = UnixStream::connect(socket) {
            return stream;
        }
        assert!(Instant::now() < deadline, "daemon socket never appeared");
        std::thread::sleep(Duration::from_millis(50));
    }
}

fn send(stream: &mut UnixStream, command: &Command) -> Response {
    let mut json = serde_json::to_string(command).unwrap();
    json.push('\n');
    stream.write_all(json.as_bytes()).unwrap();

    let mut line = String::new();
    BufReader::new(stream.try_clone().unwrap())
        .read_line(&mut line)
        .unwrap();
    serde_json::from_str(&line).unwrap()
}

fn status(stream: &mut UnixStream) -> PlayerStatus {
    match send(stream, &Command::Status) {
        Response::Status(status) => *status,
        other => panic!("unexpected response: {:?}", other),
    }
}

#[test]
fn test_daemon_session_over_socket() {
    let daemon = spawn_daemon();
    let mut stream = connect(&daemon.socket);

    assert_eq!(send(&mut stream, &Command::Ping), Response::Pong);

    match send(&mut stream, &Command::ListPlaylist) {
        Response::Playlist(items) => {
            assert_eq!(items.len(), 2);
            assert_eq!(items[0].variant, SourceVariant::ExternalEmbedA);
            assert_eq!(items[1].variant, SourceVariant::Direct);
            assert!(items[0].active);
        }
        other => panic!("unexpected response: {:?}", other),
    }

    // Play on an embed does nothing
    assert_eq!(send(&mut stream, &Command::Play), Response::Ok);
    assert!(!status(&mut stream).is_playing);

    assert_eq!(send(&mut stream, &Command::Select { index: 1 }), Response::Ok);
    assert_eq!(send(&mut stream, &Command::Play), Response::Ok);
    let current = status(&mut stream);
    assert!(current.is_playing);
    assert!(current.controls_enabled);
    assert_eq!(current.subtitle_labels, vec!["en"]);

    assert!(matches!(
        send(&mut stream, &Command::Select { index: 5 }),
        Response::Error(PlayerError::NotFound(_))
    ));

    // Malformed input keeps the connection usable
    stream.write_all(b"{not json}\n").unwrap();
    let mut line = String::new();
    BufReader::new(stream.try_clone().unwrap())
        .read_line(&mut line)
        .unwrap();
    let resp: Response = serde_json::from_str(&line).unwrap();
    assert!(matches!(resp, Response::Error(PlayerError::Ipc(_))));
    assert_eq!(send(&mut stream, &Command::Ping), Response::Pong);

    assert_eq!(send(&mut stream, &Command::Select { index: 0 }), Response::Ok);
    assert!(!status(&mut stream).is_playing);

    assert_eq!(send(&mut stream, &Command::Kill), Response::Ok);
}
