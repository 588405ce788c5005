//! Fixtures shared by the integration suites.
//!
//! [`Recorder`] stands in for every scene collaborator and keeps the calls it
//! receives, in order, so tests can assert on what the reconciler told the
//! views, camera and HUD.

use std::sync::{Arc, Mutex, PoisonError};

use realm_client::{reconcile::Reconciler, spawn::SpawnPositionPolicy};
use realm_shared::{
    config::ClientConfig,
    math::Vec3,
    protocol::CharacterData,
    render::{CameraRig, EntityKey, EntityViews, Hud, Scene, ViewSpawn, ViewUpdate},
    resources::{AssetHandle, AssetLoader, ResourceResolver},
};

/// One call made on a scene collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneCall {
    Spawn(EntityKey, ViewSpawn),
    Despawn(EntityKey),
    Update(EntityKey, ViewUpdate),
    Damage(EntityKey, u32, bool),
    Death(EntityKey),
    Respawn(EntityKey, Vec3),
    CameraTarget(EntityKey),
    Health(u32, u32),
    Mana(u32, u32),
    Experience(u64, u32),
    Log(String),
    CombatStatus(bool),
    Character(CharacterData),
}

/// Recording scene. Clones share the same call log.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<SceneCall>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scene whose three collaborators all record into this log.
    pub fn scene(&self) -> Scene {
        Scene::new(
            Box::new(self.clone()),
            Box::new(self.clone()),
            Box::new(self.clone()),
        )
    }

    pub fn calls(&self) -> Vec<SceneCall> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&SceneCall) -> bool) -> usize {
        self.lock().iter().filter(|c| pred(c)).count()
    }

    pub fn logs(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|c| match c {
                SceneCall::Log(line) => Some(line.clone()),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: SceneCall) {
        self.lock().push(call);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SceneCall>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EntityViews for Recorder {
    fn spawn(&mut self, key: &EntityKey, spawn: &ViewSpawn) {
        self.push(SceneCall::Spawn(key.clone(), spawn.clone()));
    }

    fn despawn(&mut self, key: &EntityKey) {
        self.push(SceneCall::Despawn(key.clone()));
    }

    fn update(&mut self, key: &EntityKey, update: &ViewUpdate) {
        self.push(SceneCall::Update(key.clone(), update.clone()));
    }

    fn show_damage(&mut self, key: &EntityKey, damage: u32, critical: bool) {
        self.push(SceneCall::Damage(key.clone(), damage, critical));
    }

    fn play_death(&mut self, key: &EntityKey) {
        self.push(SceneCall::Death(key.clone()));
    }

    fn play_respawn(&mut self, key: &EntityKey, position: Vec3) {
        self.push(SceneCall::Respawn(key.clone(), position));
    }
}

impl CameraRig for Recorder {
    fn set_target(&mut self, key: &EntityKey) {
        self.push(SceneCall::CameraTarget(key.clone()));
    }
}

impl Hud for Recorder {
    fn set_health(&mut self, current: u32, max: u32) {
        self.push(SceneCall::Health(current, max));
    }

    fn set_mana(&mut self, current: u32, max: u32) {
        self.push(SceneCall::Mana(current, max));
    }

    fn set_experience(&mut self, experience: u64, level: u32) {
        self.push(SceneCall::Experience(experience, level));
    }

    fn push_log(&mut self, line: &str) {
        self.push(SceneCall::Log(line.to_string()));
    }

    fn set_combat_status(&mut self, in_combat: bool) {
        self.push(SceneCall::CombatStatus(in_combat));
    }

    fn show_character(&mut self, character: &CharacterData) {
        self.push(SceneCall::Character(character.clone()));
    }
}

/// Loader that knows a fixed set of keys. Shares its call counter with clones.
#[derive(Debug, Clone, Default)]
pub struct CatalogLoader {
    known: Vec<String>,
    loads: Arc<Mutex<usize>>,
}

impl CatalogLoader {
    pub fn new(known: &[&str]) -> Self {
        Self {
            known: known.iter().map(|k| k.to_string()).collect(),
            loads: Arc::default(),
        }
    }

    /// Loader calls made so far, successful or not.
    pub fn loads(&self) -> usize {
        *self.loads.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AssetLoader for CatalogLoader {
    fn load(&mut self, key: &str) -> anyhow::Result<AssetHandle> {
        let mut loads = self.loads.lock().unwrap_or_else(PoisonError::into_inner);
        *loads += 1;
        let id = self
            .known
            .iter()
            .position(|k| k == key)
            .ok_or_else(|| anyhow::anyhow!("no asset {key}"))?;
        Ok(AssetHandle {
            id: id as u64 + 1,
            key: key.to_string(),
        })
    }
}

/// Reconciler over a recording scene and the given asset catalog, with
/// server-supplied spawns on flat ground at height 0.
pub fn reconciler(recorder: &Recorder, loader: CatalogLoader) -> Reconciler {
    Reconciler::new(
        ResourceResolver::with_default_key(Box::new(loader), Some("Monsters/Default")),
        SpawnPositionPolicy::new(false, 0.0, None),
        recorder.scene(),
    )
}

/// Config with a short readiness budget for async tests.
pub fn fast_config(attempts: u32) -> ClientConfig {
    ClientConfig {
        init_retry_delay_ms: 10,
        init_max_attempts: attempts,
        ..Default::default()
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}
