//! Client session.
//!
//! `GameClient` owns the reconciler and its subscription to the event hub.
//! Lifecycle:
//! - `attach`: wait (bounded) for the hub to become ready, subscribe, then
//!   replay any parked character selection;
//! - `pump`/`run`: apply events one at a time in delivery order;
//! - `detach`: release the subscription.

use std::{path::PathBuf, time::Duration};

use realm_shared::{
    config::ClientConfig,
    error::SyncError,
    event::{EventHub, Subscription},
    physics::{FlatGround, GroundQuery},
    protocol::WorldEvent,
    render::Scene,
    resources::{FsAssetLoader, ResourceResolver},
    storage::HandoffStore,
};
use tracing::{debug, info};

use crate::{handoff::PendingHandoff, reconcile::Reconciler, spawn::SpawnPositionPolicy};

/// Client session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Not subscribed to any event source.
    Detached,
    /// Waiting for the event source to become ready.
    WaitingForEvents,
    /// Subscribed and applying events.
    Attached,
    /// The event stream ended.
    Closed,
}

/// High-level world client.
pub struct GameClient {
    pub state: ClientState,
    reconciler: Reconciler,
    handoff: PendingHandoff,
    subscription: Option<Subscription>,
    retry_delay: Duration,
    max_attempts: u32,
}

impl GameClient {
    pub fn new(cfg: &ClientConfig, reconciler: Reconciler) -> Self {
        Self {
            state: ClientState::Detached,
            reconciler,
            handoff: PendingHandoff::new(cfg.handoff_max_age()),
            subscription: None,
            retry_delay: cfg.init_retry_delay(),
            max_attempts: cfg.init_max_attempts,
        }
    }

    /// Builds a client with on-disk assets and the configured ground.
    pub fn from_config(cfg: &ClientConfig, scene: Scene) -> Self {
        let loader = FsAssetLoader::new(PathBuf::from(&cfg.assets_dir));
        let resolver =
            ResourceResolver::with_default_key(Box::new(loader), cfg.default_monster_asset.as_deref());
        let ground = cfg
            .ground_level
            .map(|level| Box::new(FlatGround::new(level)) as Box<dyn GroundQuery>);
        let spawns = SpawnPositionPolicy::new(cfg.use_custom_spawns, cfg.height_offset, ground);
        Self::new(cfg, Reconciler::new(resolver, spawns, scene))
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Subscribes to `hub` and replays a parked character selection.
    pub async fn attach(
        &mut self,
        hub: &EventHub,
        store: &mut dyn HandoffStore,
    ) -> Result<(), SyncError> {
        self.state = ClientState::WaitingForEvents;
        let attempts = match wait_until_ready(hub, self.retry_delay, self.max_attempts).await {
            Ok(attempts) => attempts,
            Err(e) => {
                self.state = ClientState::Detached;
                return Err(e);
            }
        };
        self.subscription = Some(hub.subscribe());
        self.state = ClientState::Attached;
        info!(attempts, "Attached to world events");

        if let Some(selection) = self.handoff.take(store) {
            self.reconciler.apply(WorldEvent::EnterWorld(selection));
        }
        Ok(())
    }

    /// Waits for and applies one event. Returns `false` once the stream has
    /// ended or the client is not attached.
    pub async fn pump(&mut self) -> bool {
        let Some(sub) = self.subscription.as_mut() else {
            return false;
        };
        match sub.recv().await {
            Some(event) => {
                debug!(event = event.kind(), "Applying event");
                self.reconciler.apply(event);
                true
            }
            None => {
                info!("World event stream ended");
                self.subscription = None;
                self.state = ClientState::Closed;
                false
            }
        }
    }

    /// Applies every already-queued event without waiting.
    pub fn drain(&mut self) -> usize {
        let Some(sub) = self.subscription.as_mut() else {
            return 0;
        };
        let mut applied = 0;
        while let Some(event) = sub.try_recv() {
            self.reconciler.apply(event);
            applied += 1;
        }
        applied
    }

    /// Applies events until the stream ends. Returns how many were applied.
    pub async fn run(&mut self) -> usize {
        let mut applied = 0;
        while self.pump().await {
            applied += 1;
        }
        applied
    }

    /// Releases the event subscription.
    pub fn detach(&mut self) {
        if let Some(sub) = self.subscription.take() {
            sub.release();
            info!("Detached from world events");
        }
        if self.state != ClientState::Closed {
            self.state = ClientState::Detached;
        }
    }
}

/// Polls `hub` until it is ready, sleeping `delay` between checks.
///
/// Returns the number of checks made, or `DependencyNotReady` after
/// `max_attempts` failed checks (at least one check is always made).
pub async fn wait_until_ready(
    hub: &EventHub,
    delay: Duration,
    max_attempts: u32,
) -> Result<u32, SyncError> {
    let max_attempts = max_attempts.max(1);
    let mut attempts = 0;
    loop {
        attempts += 1;
        if hub.is_ready() {
            return Ok(attempts);
        }
        if attempts >= max_attempts {
            return Err(SyncError::DependencyNotReady { attempts });
        }
        debug!(attempt = attempts, max_attempts, "Event source not ready, retrying");
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use realm_shared::storage::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn ready_hub_attaches_first_try() {
        let hub = EventHub::new();
        hub.mark_ready();
        assert_eq!(
            wait_until_ready(&hub, Duration::from_millis(1), 3).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn never_ready_hub_fails_after_budget() {
        let hub = EventHub::new();
        let err = wait_until_ready(&hub, Duration::from_millis(1), 3)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::DependencyNotReady { attempts: 3 }));
    }

    #[tokio::test]
    async fn detach_releases_subscription() {
        let cfg = ClientConfig {
            init_retry_delay_ms: 1,
            init_max_attempts: 1,
            ..Default::default()
        };
        let hub = EventHub::new();
        hub.mark_ready();
        let mut client = GameClient::from_config(&cfg, Scene::headless());
        client.attach(&hub, &mut MemoryStore::new()).await.unwrap();
        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(client.state, ClientState::Attached);

        client.detach();
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(client.state, ClientState::Detached);
        assert!(!client.pump().await);
    }
}
