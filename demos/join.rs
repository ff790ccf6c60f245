//! Example: Joining a server and printing chat
//!
//! Connects with the configuration from `mcproto.toml` (if present) plus
//! `MCPROTO_*` environment overrides, logs in offline, prints chat, confirms
//! teleports, and leaves cleanly on Ctrl-C.
//!
//! Run with: `MCPROTO_HOST=localhost MCPROTO_USERNAME=Nick cargo run --example join`

use mcproto_client::config::NetworkConfig;
use mcproto_client::protocol::game;
use mcproto_client::utils::logging::init_logging;
use mcproto_client::{EventSink, Session, SessionEnd};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match NetworkConfig::from_file("mcproto.toml") {
        Ok(config) => config,
        Err(_) => NetworkConfig::default(),
    };
    config.apply_env_overrides()?;
    config.validate_strict()?;
    init_logging(&config.logging)?;

    let sink = Arc::new(EventSink::new());
    sink.subscribe(|_, packet| {
        if let game::Clientbound::ChatMessage { json, .. } = packet {
            println!("[chat] {json}");
        }
    })?;
    sink.subscribe(|sender, packet| {
        if let game::Clientbound::PlayerPositionAndLook { teleport_id, .. } = packet {
            if let Err(e) = sender.send(game::Serverbound::TeleportConfirm {
                teleport_id: *teleport_id,
            }) {
                warn!(error = %e, "Could not confirm teleport");
            }
        }
    })?;

    let session = Session::new(config.client.clone(), sink)?;
    let cancel = session.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, leaving");
            cancel.cancel();
        }
    });

    match session.connect().await? {
        SessionEnd::Kicked(reason) => println!("Kicked: {reason}"),
        SessionEnd::Closed => println!("Server closed the connection"),
        SessionEnd::Cancelled => println!("Disconnected"),
    }
    Ok(())
}
