//! Socket-based tests for the event link.

use std::net::SocketAddr;

use realm_client::{client::GameClient, link::spawn_link};
use realm_shared::{
    event::EventHub,
    net::ReliableListener,
    protocol::WorldEvent,
    storage::MemoryStore,
};
use realm_tests::{fast_config, init_tracing, reconciler, CatalogLoader, Recorder};
use serde_json::json;
use tokio::sync::oneshot;

fn script() -> anyhow::Result<Vec<WorldEvent>> {
    let events = [
        json!({
            "type": "enter_world",
            "success": true,
            "local_id": "P1",
            "local_character": { "id": "P1", "name": "Ayla", "health": 100, "max_health": 100 },
            "all_players": [
                { "id": "P2", "name": "Bram", "position": { "x": 5.0, "z": 5.0 },
                  "health": 80, "max_health": 80 }
            ],
            "all_monsters": [
                { "id": 7, "name": "Orc", "position": { "x": 1.0, "z": 1.0 },
                  "health": 30, "max_health": 30, "is_alive": true, "prefab_path": "orc" }
            ]
        }),
        json!({
            "type": "delta",
            "players": [
                { "id": "P1", "position": { "x": 1.0, "z": 0.0 },
                  "health": 50, "max_health": 100 }
            ]
        }),
        json!({
            "type": "combat_result",
            "attacker_type": "player", "target_type": "monster",
            "target_id": 7, "damage": 6, "is_critical": false
        }),
    ];
    events
        .into_iter()
        .map(|v| serde_json::from_value(v).map_err(anyhow::Error::from))
        .collect()
}

/// Server sends a scripted session over TCP; the client reconciles it.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn link_feeds_registry_over_tcp() -> anyhow::Result<()> {
    init_tracing();

    let listener = ReliableListener::bind("127.0.0.1:0".parse::<SocketAddr>()?).await?;
    let addr = listener.local_addr()?;
    let (attached_tx, attached_rx) = oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let (mut conn, _peer) = listener.accept().await?;
        // Events sent before the client subscribes would be lost.
        attached_rx.await?;
        for event in script()? {
            conn.send(&event).await?;
        }
        Ok::<_, anyhow::Error>(())
    });

    let hub = EventHub::new();
    let link = spawn_link(addr, hub.clone());

    let rec = Recorder::new();
    let mut client = GameClient::new(
        &fast_config(100),
        reconciler(&rec, CatalogLoader::new(&["Monsters/Default", "orc"])),
    );
    client.attach(&hub, &mut MemoryStore::new()).await?;
    let _ = attached_tx.send(());

    assert_eq!(client.run().await, 3);
    server.await??;
    assert_eq!(link.await??, 3);

    let r = client.reconciler();
    assert_eq!(
        r.registry().player_ids(),
        vec!["P1".to_string(), "P2".to_string()]
    );
    assert_eq!(r.registry().monster(7).map(|m| m.asset.key.as_str()), Some("orc"));
    assert_eq!(r.local_character().map(|c| c.health), Some(50));
    Ok(())
}

#[tokio::test]
async fn link_failure_closes_hub() -> anyhow::Result<()> {
    // Bind then drop to get a port nobody listens on.
    let addr = {
        let listener = ReliableListener::bind("127.0.0.1:0".parse::<SocketAddr>()?).await?;
        listener.local_addr()?
    };

    let hub = EventHub::new();
    let link = spawn_link(addr, hub.clone());
    assert!(link.await?.is_err());
    assert!(!hub.is_ready());

    let rec = Recorder::new();
    let mut client = GameClient::new(&fast_config(2), reconciler(&rec, CatalogLoader::default()));
    assert!(client.attach(&hub, &mut MemoryStore::new()).await.is_err());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn undecodable_frames_are_skipped() -> anyhow::Result<()> {
    init_tracing();

    let listener = ReliableListener::bind("127.0.0.1:0".parse::<SocketAddr>()?).await?;
    let addr = listener.local_addr()?;
    let (attached_tx, attached_rx) = oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let (mut conn, _peer) = listener.accept().await?;
        attached_rx.await?;
        let mut events = script()?.into_iter();
        if let Some(first) = events.next() {
            conn.send(&first).await?;
        }
        conn.send_frame(b"\x00not json").await?;
        conn.send_frame(br#"{"type":"teleport","id":"P1"}"#).await?;
        for event in events {
            conn.send(&event).await?;
        }
        Ok::<_, anyhow::Error>(())
    });

    let hub = EventHub::new();
    let link = spawn_link(addr, hub.clone());

    let rec = Recorder::new();
    let mut client = GameClient::new(
        &fast_config(100),
        reconciler(&rec, CatalogLoader::new(&["Monsters/Default", "orc"])),
    );
    client.attach(&hub, &mut MemoryStore::new()).await?;
    let _ = attached_tx.send(());

    assert_eq!(client.run().await, 3);
    server.await??;
    assert_eq!(link.await??, 3);
    assert_eq!(client.reconciler().local_character().map(|c| c.health), Some(50));
    Ok(())
}
