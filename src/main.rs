//! Shardlink - legacy shard game client core
//!
//! Connects to a game server (or replays a captured stream), keeps the world
//! model in sync and reports changes to a stand-in UI.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shardlink::config::{self, Config};
use shardlink::network::{Client, ClientEvent};
use shardlink::observer::{ChannelBridge, RecordingBridge, UiEvent};
use shardlink::protocol::{ClientVersion, DispatchTable, FrameDecoder};
use shardlink::session::Session;
use shardlink::world::World;

/// Shardlink - legacy shard game client core
#[derive(Parser)]
#[command(name = "shardlink")]
#[command(author = "Shardlink Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Decode a shard server stream and keep a world model in sync", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to a game server
    Connect {
        /// Server address (host or host:port)
        #[arg(short, long)]
        server: Option<String>,

        /// Server port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Replay a raw server-to-client capture
    Replay {
        /// Capture file
        capture: PathBuf,

        /// Client version the capture was recorded with
        #[arg(long)]
        client_version: Option<ClientVersion>,

        /// Print the final world snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show current configuration
    Config {
        /// Generate sample configuration
        #[arg(long)]
        generate: bool,

        /// Output path for generated config
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default().unwrap_or_default()
    };

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose || config.general.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Connect { server, port } => {
            run_client(config, server, port).await?;
        }
        Commands::Replay {
            capture,
            client_version,
            json,
        } => {
            run_replay(config, capture, client_version, json)?;
        }
        Commands::Config { generate, output } => {
            if generate {
                let sample = config::generate_sample_config()?;
                if let Some(path) = output {
                    std::fs::write(&path, &sample)?;
                    println!("Configuration written to: {}", path.display());
                } else {
                    println!("{}", sample);
                }
            } else {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

/// Connect and run the apply/render tick until disconnect or Ctrl+C
async fn run_client(config: Config, server: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let port = port.unwrap_or(config.network.port);
    let server = server.unwrap_or_else(|| config.network.host.clone());

    let table = DispatchTable::new(config.client.version);
    let mut client = Client::new(config.net_config(), table);
    let mut packets = client
        .take_event_receiver()
        .ok_or_else(|| anyhow::anyhow!("event receiver already taken"))?;

    let (mut bridge, ui_rx) = ChannelBridge::channel(1024);
    tokio::spawn(run_ui(ui_rx));

    let mut world = World::new(config.world_settings());

    tracing::info!(
        "Connecting to {} as client {}",
        server,
        config.client.version
    );
    client.connect_hostname(&server, port).await?;

    let mut tick = tokio::time::interval(Duration::from_millis(config.client.tick_ms.max(1)));
    let mut connected = true;

    while connected {
        tokio::select! {
            _ = tick.tick() => {
                // Apply phase: drain everything the receive task has decoded.
                while let Ok(event) = packets.try_recv() {
                    match event {
                        ClientEvent::Connected { server_addr } => {
                            tracing::info!("Connected to {}", server_addr);
                        }
                        ClientEvent::Packet(packet) => {
                            world.apply(packet, &mut bridge);
                        }
                        ClientEvent::Disconnected { reason } => {
                            tracing::info!("Disconnected: {}", reason);
                            world.logout(&mut bridge);
                            connected = false;
                        }
                        ClientEvent::Error { message } => {
                            tracing::error!("Client error: {}", message);
                        }
                    }
                }

                // Render phase: read-only.
                let party = world.party();
                tracing::trace!(
                    "tick: {} entities, party of {} led by {}",
                    world.entities().len(),
                    party.len(),
                    party.leader()
                );
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nDisconnecting...");
                let _ = client.disconnect().await;
                break;
            }
        }
    }

    if bridge.dropped() > 0 {
        tracing::warn!("{} UI events dropped while the UI was busy", bridge.dropped());
    }

    Ok(())
}

/// Stand-in UI: logs what a panel would refresh
async fn run_ui(mut events: tokio::sync::mpsc::Receiver<UiEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            UiEvent::Refresh { serial } => tracing::debug!("refresh panels for {}", serial),
            UiEvent::MembershipView => tracing::debug!("refresh party panel"),
            UiEvent::Invite { inviter } => {
                println!("Party invite from {}", inviter);
            }
            UiEvent::Chat(chat) => {
                println!("[party] {}: {}", chat.label, chat.body);
            }
        }
    }
}

/// Feed a capture file through a session and report the result
fn run_replay(
    config: Config,
    capture: PathBuf,
    version: Option<ClientVersion>,
    json: bool,
) -> anyhow::Result<()> {
    let bytes = std::fs::read(&capture)?;
    let version = version.unwrap_or(config.client.version);

    let mut session = Session::new(
        DispatchTable::new(version),
        config.world_settings(),
        RecordingBridge::new(),
    )
    .with_framer(FrameDecoder::new(config.network.max_packet_size));

    if let Err(e) = session.feed(&bytes) {
        tracing::error!(
            "Capture lost sync with {} bytes left: {}",
            session.pending(),
            e
        );
    }

    let snapshot = session.world().snapshot();
    let stats = session.stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!("Replayed {} ({} bytes, client {})", capture.display(), stats.bytes_received, version);
    println!("  Packets applied: {}", stats.applied);
    println!("  Packets dropped: {}", stats.dropped);
    println!("  UI events:       {}", session.bridge().events().len());
    println!("  Player:          {}", snapshot.player);
    println!("  Entities:        {}", snapshot.entities.len());
    println!("  Party leader:    {}", snapshot.party.leader);
    for member in &snapshot.party.members {
        println!("    {} {}", member.serial, member.name);
    }
    if session.pending() > 0 {
        println!("  Trailing bytes:  {}", session.pending());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["shardlink", "replay", "capture.bin", "--client-version", "6.0.1.7"]);
        assert!(cli.is_ok());

        let cli = Cli::try_parse_from(["shardlink", "replay", "capture.bin", "--client-version", "x"]);
        assert!(cli.is_err());

        let cli = Cli::try_parse_from(["shardlink", "connect", "--server", "play.example.net:2600"]).unwrap();
        match cli.command {
            Commands::Connect { server, port } => {
                assert_eq!(server.as_deref(), Some("play.example.net:2600"));
                assert_eq!(port, None);
            }
            _ => panic!("expected connect"),
        }
    }
}
