//! Standalone client binary.
//!
//! Usage:
//!   cargo run -p realm_client -- [--config client.json] [--addr 127.0.0.1:40000]
//!                                [--assets-dir assets] [--handoff-dir handoff]
//!
//! The client connects to an event server, replays any parked character
//! selection, and reconciles world events until the server hangs up. Scene
//! output goes to the log.

use std::env;
use std::net::SocketAddr;
use std::path::Path;

use anyhow::Context;
use realm_client::{client::GameClient, link::spawn_link};
use realm_shared::{
    config::ClientConfig,
    event::EventHub,
    render::{NullScene, Scene, TracingHud},
    storage::FileStore,
};
use tracing::{info, warn};

fn parse_args() -> anyhow::Result<ClientConfig> {
    let args: Vec<String> = env::args().collect();

    let mut cfg = match args.iter().position(|a| a == "--config") {
        Some(i) if i + 1 < args.len() => ClientConfig::load(Path::new(&args[i + 1]))?,
        _ => ClientConfig::default(),
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--addr" if i + 1 < args.len() => {
                cfg.server_addr = args[i + 1].clone();
                i += 2;
            }
            "--assets-dir" if i + 1 < args.len() => {
                cfg.assets_dir = args[i + 1].clone();
                i += 2;
            }
            "--handoff-dir" if i + 1 < args.len() => {
                cfg.handoff_dir = args[i + 1].clone();
                i += 2;
            }
            _ => i += 1,
        }
    }
    Ok(cfg)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = parse_args()?;
    let addr: SocketAddr = cfg
        .server_addr
        .parse()
        .with_context(|| format!("invalid server address {}", cfg.server_addr))?;
    info!(server = %addr, assets_dir = %cfg.assets_dir, "Starting client");

    let hub = EventHub::new();
    let link = spawn_link(addr, hub.clone());

    let scene = Scene::new(
        Box::new(NullScene),
        Box::new(NullScene),
        Box::new(TracingHud),
    );
    let mut client = GameClient::from_config(&cfg, scene);
    let mut store = FileStore::new(&cfg.handoff_dir);
    client
        .attach(&hub, &mut store)
        .await
        .context("attach to world events")?;

    let applied = client.run().await;
    let registry = client.reconciler().registry();
    info!(
        applied,
        players = registry.player_count(),
        monsters = registry.monster_count(),
        "Session ended"
    );

    match link.await.context("link task")? {
        Ok(received) => info!(received, "Link closed"),
        Err(e) => warn!(error = %e, "Link closed with error"),
    }
    Ok(())
}
