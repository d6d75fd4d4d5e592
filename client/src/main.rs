use anyhow::Result;
use clap::{Parser, Subcommand};
use common::{Command, FilterChannel, InputEvent, Key, PlayerStatus, Response};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

#[derive(Parser)]
#[command(name = "mqctl")]
#[command(about = "Marquee Player Control", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show player status
    Status,

    /// Ping the daemon to check if it's running
    Ping,

    /// Kill the running daemon
    Kill,

    /// List playlist entries
    List,

    /// Reload the playlist file
    Reload,

    /// Make a playlist entry active
    Select {
        /// Entry index (see `mqctl list`)
        index: usize,
    },

    /// Start playback
    Play,

    /// Pause playback
    Pause,

    /// Toggle play/pause
    Toggle,

    /// Seek relative to the current position
    Seek {
        /// Seconds to move (negative goes back)
        #[arg(allow_hyphen_values = true)]
        seconds: f64,
    },

    /// Seek to an absolute position
    SeekTo {
        /// Position in seconds
        seconds: f64,
    },

    /// Set volume (0.0-1.0)
    Volume { volume: f64 },

    /// Mute or unmute; toggles without an argument
    Mute {
        /// on | off
        state: Option<String>,
    },

    /// Select a subtitle track by label
    Subtitle {
        /// Track label; omit to hide subtitles
        label: Option<String>,
    },

    /// Select an audio track by label
    Audio { label: String },

    /// Set a visual filter channel (0-200, 100 is neutral)
    Filter {
        /// brightness | contrast | saturation
        channel: String,

        value: i32,
    },

    /// Reset a visual filter channel to 100
    FilterReset {
        /// brightness | contrast | saturation
        channel: String,
    },

    /// Toggle fullscreen
    Fullscreen,

    /// Forward a front-end input event
    Input {
        #[command(subcommand)]
        event: InputCommands,
    },
}

#[derive(Subcommand)]
enum InputCommands {
    /// Pointer entered the player
    Enter,

    /// Pointer left the player
    Leave,

    /// Pointer moved over the player
    Move,

    /// Single click on the player surface
    Click {
        /// Distance from the top of the player
        #[arg(short, long)]
        y: f32,

        /// Player height
        #[arg(short = 'H', long)]
        height: f32,
    },

    /// Key press (space, left, right, up, down, or a single character)
    Key { name: String },

    /// Begin scrubbing the timeline
    ScrubStart { time: f64 },

    /// Move the scrub position
    ScrubMove { time: f64 },

    /// Release the scrub handle and seek there
    ScrubCommit { time: f64 },

    /// End the scrub gesture
    ScrubEnd,

    /// Report a fullscreen change from the environment
    FullscreenChanged {
        /// on | off
        state: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let command = match cli.command {
        Commands::Status => Command::Status,
        Commands::Ping => Command::Ping,
        Commands::Kill => Command::Kill,
        Commands::List => Command::ListPlaylist,
        Commands::Reload => Command::ReloadPlaylist,
        Commands::Select { index } => Command::Select { index },
        Commands::Play => Command::Play,
        Commands::Pause => Command::Pause,
        Commands::Toggle => Command::TogglePlay,
        Commands::Seek { seconds } => Command::SeekBy { seconds },
        Commands::SeekTo { seconds } => Command::SeekTo { seconds },
        Commands::Volume { volume } => Command::SetVolume { volume },
        Commands::Mute { state } => match state {
            Some(state) => Command::SetMuted {
                muted: parse_switch(&state)?,
            },
            None => Command::ToggleMute,
        },
        Commands::Subtitle { label } => Command::SelectSubtitle {
            label: label.unwrap_or_default(),
        },
        Commands::Audio { label } => Command::SelectAudioTrack { label },
        Commands::Filter { channel, value } => Command::SetFilter {
            channel: parse_channel(&channel)?,
            value,
        },
        Commands::FilterReset { channel } => Command::ResetFilter {
            channel: parse_channel(&channel)?,
        },
        Commands::Fullscreen => Command::ToggleFullscreen,
        Commands::Input { event } => Command::Input(match event {
            InputCommands::Enter => InputEvent::PointerEnter,
            InputCommands::Leave => InputEvent::PointerLeave,
            InputCommands::Move => InputEvent::PointerMove,
            InputCommands::Click { y, height } => InputEvent::Click { y, height },
            InputCommands::Key { name } => InputEvent::Key(
                Key::from_name(&name).ok_or_else(|| anyhow::anyhow!("Unknown key: {}", name))?,
            ),
            InputCommands::ScrubStart { time } => InputEvent::ScrubStart { time },
            InputCommands::ScrubMove { time } => InputEvent::ScrubMove { time },
            InputCommands::ScrubCommit { time } => InputEvent::ScrubCommit { time },
            InputCommands::ScrubEnd => InputEvent::ScrubEnd,
            InputCommands::FullscreenChanged { state } => InputEvent::FullscreenChanged {
                active: parse_switch(&state)?,
            },
        }),
    };

    match send_command(command).await {
        Ok(response) => {
            handle_response(response);
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("\nIs the daemon running? Try starting it with: marquee");
            std::process::exit(1);
        }
    }
}

async fn send_command(command: Command) -> Result<Response> {
    let socket_path = common::get_socket_path();

    let stream = UnixStream::connect(&socket_path).await?;
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    // Send command
    let command_json = serde_json::to_string(&command)?;
    writer.write_all(command_json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;

    // Read response
    let mut response_line = String::new();
    reader.read_line(&mut response_line).await?;

    let response: Response = serde_json::from_str(&response_line)?;
    Ok(response)
}

fn handle_response(response: Response) {
    match response {
        Response::Ok => {
            println!("✓ Success");
        }
        Response::Error(e) => {
            eprintln!("✗ Error: {}", e);
            std::process::exit(1);
        }
        Response::Status(status) => print_status(&status),
        Response::Playlist(items) => {
            if items.is_empty() {
                println!("Playlist is empty");
            }
            for item in items {
                println!(
                    "{} {:>2}  {:<24} [{}] {}",
                    if item.active { "▶" } else { " " },
                    item.index,
                    item.name,
                    item.declared_type.label(),
                    item.url
                );
            }
        }
        Response::Pong => {
            println!("✓ Daemon is running");
        }
    }
}

fn print_status(status: &PlayerStatus) {
    println!("Player Status:");
    println!("  Version: {}", status.version);
    println!("  Uptime: {}s", status.uptime_secs);

    match (status.active_index, &status.entry_name, status.variant) {
        (Some(index), Some(name), Some(variant)) => {
            println!("  Entry: #{} {} ({})", index, name, variant.name());
        }
        _ => println!("  Entry: none"),
    }
    if let Some(ref error) = status.media_error {
        println!("  Media error: {}", error);
    }

    if status.controls_enabled {
        println!(
            "  Playback: {} {} / {}",
            if status.is_playing { "playing" } else { "paused" },
            status.elapsed,
            status.total
        );
        if let Some(ref effect) = status.filter_effect {
            println!("  Filter: {}", effect);
        }
    } else {
        println!("  Playback: external player (controls unavailable)");
    }

    println!(
        "  Volume: {:.0}%{}",
        status.volume * 100.0,
        if status.muted { " (muted)" } else { "" }
    );
    println!(
        "  Subtitles: {} of [{}]",
        status.subtitle.as_deref().unwrap_or("off"),
        status.subtitle_labels.join(", ")
    );
    println!(
        "  Audio: {} of [{}]",
        status.audio_track.as_deref().unwrap_or("default"),
        status.audio_labels.join(", ")
    );
    println!(
        "  Controls: {}",
        if status.controls_visible { "visible" } else { "hidden" }
    );
    println!(
        "  Fullscreen: {}{}",
        if status.fullscreen { "yes" } else { "no" },
        status
            .pending_fullscreen
            .map(|r| format!(" ({:?} requested)", r))
            .unwrap_or_default()
    );
    if let Some(glyph) = status.glyph {
        println!("  Glyph: {:?}", glyph);
    }
    if let Some(preview) = status.hover_preview {
        println!("  Scrubbing: {}", common::format_time(preview));
    }
}

fn parse_channel(name: &str) -> Result<FilterChannel> {
    FilterChannel::from_name(name).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown filter channel '{}' (expected brightness, contrast or saturation)",
            name
        )
    })
}

fn parse_switch(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => anyhow::bail!("Expected on or off, got '{}'", value),
    }
}
