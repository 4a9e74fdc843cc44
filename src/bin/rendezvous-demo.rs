//! End-to-end walkthrough of the listener over the in-memory medium.
//!
//! Arms a few bind slots, drives peers through the reject, accept and
//! respawn paths, and narrates the outcomes via tracing.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::{broadcast, mpsc};

use rendezvous_listener::config::{load_config, ListenerConfig};
use rendezvous_listener::event::{EventBus, EventDispatcher, EventKind};
use rendezvous_listener::link::{DataLink, MemoryMedium};
use rendezvous_listener::observability::logging;
use rendezvous_listener::RendezvousListener;

#[derive(Parser)]
#[command(name = "rendezvous-demo")]
#[command(about = "Drive a rendezvous listener over the in-memory medium", long_about = None)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of bind slots to arm.
    #[arg(short, long, default_value_t = 3, value_parser = clap::value_parser!(u16).range(1..=64))]
    slots: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ListenerConfig::default(),
    };

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let bus = EventBus::new();
    let pump = tokio::spawn(bus.clone().run(shutdown_rx));

    let dispatcher: Arc<dyn EventDispatcher> = bus.clone();
    let medium = MemoryMedium::new(Arc::clone(&dispatcher));
    let listener = RendezvousListener::new(medium.clone(), Arc::clone(&dispatcher), &config);

    // Forward connection-pending notifications into a channel main can await.
    let (pending_tx, mut pending_rx) = mpsc::unbounded_channel();
    dispatcher.register(
        EventKind::ConnectionPending,
        listener.target(),
        Box::new(move |_| {
            let _ = pending_tx.send(());
        }),
    )?;

    let slots = usize::from(cli.slots);
    for slot in 0..slots {
        let addr = format!("slot-{slot}");
        listener.bind(&addr)?;
        tracing::info!(addr = %addr, "slot armed");
    }

    let connect = config.handshake.connect_request.as_bytes().to_vec();

    // The first peer fumbles the handshake once before getting it right.
    // The retry waits for the reject so the two payloads are read apart.
    let first = medium.connect("slot-0").expect("slot-0 is armed");
    first.send(b"not the handshake");
    while first.replies().is_empty() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    tracing::info!(target_id = %first.target(), "fumbled handshake was rejected, retrying");
    first.send(&connect);

    let mut peers = vec![first];
    for slot in 1..slots {
        let addr = format!("slot-{slot}");
        let peer = medium.connect(&addr).expect("slot is armed");
        peer.send(&connect);
        peers.push(peer);
    }

    for _ in 0..slots {
        pending_rx
            .recv()
            .await
            .ok_or("notification channel closed")?;
        let link = listener.accept()?;
        tracing::info!(target_id = %link.target(), "connection accepted");
    }

    for peer in &peers {
        let replies = peer.replies();
        tracing::info!(
            target_id = %peer.target(),
            replies = %String::from_utf8_lossy(&replies),
            "peer view of the exchange"
        );
    }

    // A peer that drops mid-handshake costs nothing: the slot respawns.
    let addr = "slot-respawn".to_string();
    listener.bind(&addr)?;
    let doomed = medium.connect(&addr).expect("respawn slot armed");
    doomed.disconnect();

    let mut revived = None;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        if let Some(peer) = medium.connect(&addr) {
            revived = Some(peer);
            break;
        }
    }
    let revived = revived.ok_or("slot did not respawn")?;
    revived.send(&connect);
    pending_rx
        .recv()
        .await
        .ok_or("notification channel closed")?;
    let link = listener.accept()?;
    tracing::info!(target_id = %link.target(), "connection accepted on respawned slot");

    listener.close();
    shutdown_tx.send(())?;
    pump.await?;
    Ok(())
}
