//! Voice channel speaking indicator.
//!
//! Demonstrates:
//! - Building a client from `DISCORD_CLIENT_ID` / `DISCORD_CLIENT_SECRET`
//! - Connecting and authorizing (a dialog appears in Discord the first time)
//! - Looking up the selected voice channel and its members
//! - Subscribing to speaking events
//!
//! Usage:
//!   cargo run --example voice_events
//!   cargo run --example voice_events -- --debug

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;

use anyhow::{Context, bail};
use discord_ipc::voice::ipc_to_ui_volume;
use discord_ipc::{ClientBuilder, CommandType, EventType, Notification};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Helpers
// ============================================================================

/// Credential file under the user's config directory.
fn credential_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("discord-ipc")
        .join("discordOauth.json")
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "discord_ipc=debug"
    } else {
        "discord_ipc=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let debug = std::env::args().any(|a| a == "--debug");
    init_logging(debug);

    if let Err(e) = run().await {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    println!("=== Voice Events ===\n");

    let client = ClientBuilder::from_env()
        .scopes(["rpc", "identify", "rpc.voice.read"])
        .credential_path(credential_path())
        .build()?;

    let mut events = client.event_channel();

    println!("[1] Connecting...");
    client.connect().await.context("connect")?;
    println!(
        "    ✓ Connected as {}\n",
        client.user_id().unwrap_or_default()
    );

    println!("[2] Selected voice channel...");
    let channel = client
        .send_command_blocking(CommandType::GetSelectedVoiceChannel, json!({}))
        .await?
        .into_result()?;
    let Some(channel_id) = channel.data_str(&["id"]).map(str::to_owned) else {
        bail!("not in a voice channel");
    };
    println!(
        "    ✓ {} ({channel_id})",
        channel.data_str(&["name"]).unwrap_or("unnamed")
    );

    if let Some(Value::Array(states)) = channel.data.get("voice_states") {
        for state in states {
            let nick = state["nick"].as_str().unwrap_or("?");
            let volume = state["volume"].as_f64().unwrap_or_default();
            println!("      - {nick} at {:.0}%", ipc_to_ui_volume(volume));
        }
    }
    println!();

    println!("[3] Subscribing to speaking events...");
    let args = json!({ "channel_id": channel_id });
    for event in [EventType::SpeakingStart, EventType::SpeakingStop] {
        client.subscribe(event, args.clone()).await?.into_result()?;
    }
    println!("    ✓ Subscribed, press Ctrl+C to exit\n");

    loop {
        tokio::select! {
            notification = events.recv() => match notification {
                Some(Notification::Message(message)) => {
                    let user = message.data_str(&["user_id"]).unwrap_or("?");
                    match message.event {
                        EventType::SpeakingStart => println!("    ▶ {user}"),
                        EventType::SpeakingStop => println!("    ■ {user}"),
                        _ => {}
                    }
                }
                Some(Notification::Disconnected) | None => {
                    println!("\nDisconnected: {}", client.last_error().unwrap_or("-"));
                    break;
                }
                Some(Notification::Connected) => {}
            },
            _ = tokio::signal::ctrl_c() => {
                client.disconnect();
                break;
            }
        }
    }

    Ok(())
}
