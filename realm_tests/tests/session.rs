//! Session lifecycle: readiness, handoff replay and the event pump.

use std::time::Duration;

use realm_client::{
    client::{ClientState, GameClient},
    handoff::{HandoffPayload, HANDOFF_KEY},
};
use realm_shared::{
    error::SyncError,
    event::EventHub,
    protocol::{CharacterData, EnterWorld, NetPosition, PlayerJoined, WorldEvent},
    storage::{FileStore, HandoffStore, MemoryStore},
};
use realm_tests::{fast_config, init_tracing, reconciler, CatalogLoader, Recorder, SceneCall};

fn selection() -> EnterWorld {
    EnterWorld {
        success: true,
        local_id: "P1".into(),
        local_character: CharacterData {
            id: "P1".into(),
            name: "Ayla".into(),
            race: "human".into(),
            health: 100,
            max_health: 100,
            position: Some(NetPosition::planar(3.0, 4.0)),
            ..Default::default()
        },
        all_players: vec![],
        all_monsters: vec![],
    }
}

fn joined(id: &str) -> WorldEvent {
    WorldEvent::PlayerJoined(PlayerJoined {
        id: id.into(),
        name: id.into(),
        race: "orc".into(),
        class: "warrior".into(),
        health: 50,
        max_health: 50,
        level: 2,
        position: NetPosition::planar(1.0, 1.0),
    })
}

fn client(rec: &Recorder, attempts: u32) -> GameClient {
    GameClient::new(
        &fast_config(attempts),
        reconciler(rec, CatalogLoader::new(&["Monsters/Default"])),
    )
}

#[tokio::test]
async fn parked_selection_is_replayed_on_attach() -> anyhow::Result<()> {
    init_tracing();
    let mut store = MemoryStore::new();
    HandoffPayload::new(selection()).park(&mut store)?;

    let hub = EventHub::new();
    hub.mark_ready();
    let rec = Recorder::new();
    let mut client = client(&rec, 3);
    client.attach(&hub, &mut store).await?;

    let r = client.reconciler();
    assert_eq!(r.local_id(), Some("P1"));
    assert_eq!(r.registry().player_ids(), vec!["P1".to_string()]);
    assert!(!store.contains(HANDOFF_KEY));
    assert!(rec
        .calls()
        .iter()
        .any(|c| matches!(c, SceneCall::CameraTarget(_))));
    Ok(())
}

#[tokio::test]
async fn live_snapshot_after_replay_is_ignored() -> anyhow::Result<()> {
    let mut store = MemoryStore::new();
    HandoffPayload::new(selection()).park(&mut store)?;

    let hub = EventHub::new();
    hub.mark_ready();
    let rec = Recorder::new();
    let mut client = client(&rec, 3);
    client.attach(&hub, &mut store).await?;

    let mut again = selection();
    again.local_id = "P9".into();
    hub.publish(WorldEvent::EnterWorld(again));
    hub.publish(joined("P2"));
    assert_eq!(client.drain(), 2);

    let r = client.reconciler();
    assert_eq!(r.local_id(), Some("P1"));
    assert_eq!(
        r.registry().player_ids(),
        vec!["P1".to_string(), "P2".to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn malformed_parked_selection_is_deleted() -> anyhow::Result<()> {
    let dir = std::env::temp_dir().join(format!("realm-handoff-{}", std::process::id()));
    let mut store = FileStore::new(&dir);
    store.put(HANDOFF_KEY, b"\x00garbage")?;

    let hub = EventHub::new();
    hub.mark_ready();
    let rec = Recorder::new();
    let mut client = client(&rec, 3);
    client.attach(&hub, &mut store).await?;

    assert!(!client.reconciler().has_entered());
    assert!(!store.contains(HANDOFF_KEY));
    assert_eq!(client.state, ClientState::Attached);

    let _ = std::fs::remove_dir_all(&dir);
    Ok(())
}

#[tokio::test]
async fn attach_waits_for_late_readiness() -> anyhow::Result<()> {
    let hub = EventHub::new();
    let late = hub.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(40)).await;
        late.mark_ready();
    });

    let rec = Recorder::new();
    let mut client = client(&rec, 50);
    client.attach(&hub, &mut MemoryStore::new()).await?;
    assert_eq!(client.state, ClientState::Attached);
    assert_eq!(hub.subscriber_count(), 1);
    Ok(())
}

#[tokio::test]
async fn attach_gives_up_after_retry_budget() {
    let hub = EventHub::new();
    let rec = Recorder::new();
    let mut client = client(&rec, 3);

    let err = client
        .attach(&hub, &mut MemoryStore::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::DependencyNotReady { attempts: 3 }));
    assert_eq!(client.state, ClientState::Detached);
    assert_eq!(hub.subscriber_count(), 0);
}

#[tokio::test]
async fn parked_selection_survives_failed_attach() -> anyhow::Result<()> {
    let mut store = MemoryStore::new();
    HandoffPayload::new(selection()).park(&mut store)?;

    let hub = EventHub::new();
    let rec = Recorder::new();
    let mut client = client(&rec, 1);
    assert!(client.attach(&hub, &mut store).await.is_err());
    assert!(store.contains(HANDOFF_KEY));
    Ok(())
}

#[tokio::test]
async fn run_applies_events_until_hub_closes() -> anyhow::Result<()> {
    let hub = EventHub::new();
    hub.mark_ready();
    let rec = Recorder::new();
    let mut client = client(&rec, 3);
    client.attach(&hub, &mut MemoryStore::new()).await?;

    hub.publish(WorldEvent::EnterWorld(selection()));
    hub.publish(joined("P2"));
    hub.publish(WorldEvent::PlayerLeft { id: "P2".into() });
    hub.close();

    assert_eq!(client.run().await, 3);
    assert_eq!(client.state, ClientState::Closed);
    assert_eq!(
        client.reconciler().registry().player_ids(),
        vec!["P1".to_string()]
    );
    Ok(())
}
