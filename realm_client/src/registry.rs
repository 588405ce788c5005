//! Entity registry.
//!
//! Two independent maps of live entities, keyed by their server ids. Entities
//! are complete values built here; views are told about spawns and removals
//! as they happen.

use std::collections::{hash_map::Entry, HashMap};

use realm_shared::{
    error::SyncError,
    math::Vec3,
    protocol::{CharacterStats, MonsterId, MonsterState, PlayerId},
    render::{EntityKey, EntityViews, ViewFlags, ViewSpawn, ViewUpdate},
    resources::{AssetHandle, ResourceResolver},
};
use tracing::{debug, info};

/// A player character known to this client.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerEntity {
    pub id: PlayerId,
    pub name: String,
    pub race: String,
    pub class: String,
    pub health: u32,
    pub max_health: u32,
    pub mana: u32,
    pub max_mana: u32,
    pub level: u32,
    pub experience: u64,
    pub status_points: u32,
    pub stats: CharacterStats,
    pub is_dead: bool,
    pub is_local: bool,
    pub is_moving: bool,
    pub in_combat: bool,
    pub position: Vec3,
    pub target: Option<Vec3>,
}

impl PlayerEntity {
    pub fn key(&self) -> EntityKey {
        EntityKey::Player(self.id.clone())
    }

    pub fn view_update(&self) -> ViewUpdate {
        let mut flags = ViewFlags::empty();
        flags.set(ViewFlags::MOVING, self.is_moving);
        flags.set(ViewFlags::DEAD, self.is_dead);
        flags.set(ViewFlags::IN_COMBAT, self.in_combat);
        ViewUpdate {
            position: self.position,
            target: self.target,
            health: self.health,
            max_health: self.max_health,
            flags,
        }
    }
}

/// A monster known to this client.
#[derive(Debug, Clone, PartialEq)]
pub struct MonsterEntity {
    pub id: MonsterId,
    pub name: String,
    pub level: u32,
    pub health: u32,
    pub max_health: u32,
    pub is_alive: bool,
    pub is_moving: bool,
    pub in_combat: bool,
    /// Logical asset key as sent by the server (may be empty).
    pub asset_key: String,
    pub asset: AssetHandle,
    pub position: Vec3,
    pub target: Option<Vec3>,
}

impl MonsterEntity {
    pub fn key(&self) -> EntityKey {
        EntityKey::Monster(self.id)
    }

    pub fn view_update(&self) -> ViewUpdate {
        let mut flags = ViewFlags::empty();
        flags.set(ViewFlags::MOVING, self.is_moving);
        flags.set(ViewFlags::DEAD, !self.is_alive);
        flags.set(ViewFlags::IN_COMBAT, self.in_combat);
        ViewUpdate {
            position: self.position,
            target: self.target,
            health: self.health,
            max_health: self.max_health,
            flags,
        }
    }
}

/// Arguments for [`EntityRegistry::spawn_player`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSpawn {
    pub id: PlayerId,
    pub name: String,
    pub position: Vec3,
    pub is_local: bool,
    pub race: String,
    pub class: String,
    pub health: u32,
    pub max_health: u32,
    pub level: u32,
    pub is_dead: bool,
}

impl PlayerSpawn {
    fn build(self) -> PlayerEntity {
        PlayerEntity {
            id: self.id,
            name: self.name,
            race: self.race,
            class: self.class,
            health: self.health,
            max_health: self.max_health,
            mana: 0,
            max_mana: 0,
            level: self.level,
            experience: 0,
            status_points: 0,
            stats: CharacterStats::default(),
            is_dead: self.is_dead,
            is_local: self.is_local,
            is_moving: false,
            in_combat: false,
            position: self.position,
            target: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct EntityRegistry {
    players: HashMap<PlayerId, PlayerEntity>,
    monsters: HashMap<MonsterId, MonsterEntity>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a player and creates its view. An id that is already
    /// registered is left untouched.
    pub fn spawn_player(
        &mut self,
        spawn: PlayerSpawn,
        views: &mut dyn EntityViews,
    ) -> &mut PlayerEntity {
        let slot = match self.players.entry(spawn.id.clone()) {
            Entry::Occupied(existing) => {
                debug!(id = %spawn.id, "Player already registered, spawn skipped");
                return existing.into_mut();
            }
            Entry::Vacant(slot) => slot,
        };

        let player = spawn.build();
        let key = player.key();
        views.spawn(
            &key,
            &ViewSpawn {
                name: player.name.clone(),
                level: player.level,
                position: player.position,
                is_local: player.is_local,
                asset: None,
            },
        );
        if player.is_dead {
            views.play_death(&key);
        }
        info!(
            id = %player.id,
            name = %player.name,
            local = player.is_local,
            x = player.position.x,
            z = player.position.z,
            "Player spawned"
        );
        slot.insert(player)
    }

    /// Registers a monster after resolving its visual asset. Nothing is
    /// registered when the asset cannot be resolved.
    pub fn spawn_monster(
        &mut self,
        state: &MonsterState,
        position: Vec3,
        resolver: &mut ResourceResolver,
        views: &mut dyn EntityViews,
    ) -> Result<&mut MonsterEntity, SyncError> {
        let slot = match self.monsters.entry(state.id) {
            Entry::Occupied(existing) => {
                debug!(id = state.id, "Monster already registered, spawn skipped");
                return Ok(existing.into_mut());
            }
            Entry::Vacant(slot) => slot,
        };

        let asset_key = state.prefab_path.clone().unwrap_or_default();
        let asset = resolver
            .resolve(Some(asset_key.as_str()))
            .map_err(|_| SyncError::MissingSpawnAsset {
                id: state.id,
                key: asset_key.clone(),
            })?;

        let monster = MonsterEntity {
            id: state.id,
            name: state.name.clone(),
            level: state.level,
            health: state.health,
            max_health: state.max_health,
            is_alive: state.is_alive,
            is_moving: state.is_moving,
            in_combat: state.in_combat,
            asset_key,
            asset,
            position,
            target: None,
        };
        views.spawn(
            &monster.key(),
            &ViewSpawn {
                name: monster.name.clone(),
                level: monster.level,
                position,
                is_local: false,
                asset: Some(monster.asset.clone()),
            },
        );
        info!(
            id = monster.id,
            name = %monster.name,
            asset = %monster.asset.key,
            "Monster spawned"
        );
        Ok(slot.insert(monster))
    }

    /// Removes a player and tears down its view.
    pub fn remove_player(
        &mut self,
        id: &str,
        views: &mut dyn EntityViews,
    ) -> Option<PlayerEntity> {
        let removed = self.players.remove(id)?;
        views.despawn(&removed.key());
        info!(id = %removed.id, "Player removed");
        Some(removed)
    }

    pub fn player(&self, id: &str) -> Option<&PlayerEntity> {
        self.players.get(id)
    }

    pub fn player_mut(&mut self, id: &str) -> Option<&mut PlayerEntity> {
        self.players.get_mut(id)
    }

    pub fn monster(&self, id: MonsterId) -> Option<&MonsterEntity> {
        self.monsters.get(&id)
    }

    pub fn monster_mut(&mut self, id: MonsterId) -> Option<&mut MonsterEntity> {
        self.monsters.get_mut(&id)
    }

    pub fn contains_player(&self, id: &str) -> bool {
        self.players.contains_key(id)
    }

    pub fn contains_monster(&self, id: MonsterId) -> bool {
        self.monsters.contains_key(&id)
    }

    pub fn local_player(&self) -> Option<&PlayerEntity> {
        self.players.values().find(|p| p.is_local)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn monster_count(&self) -> usize {
        self.monsters.len()
    }

    /// Player ids in sorted order.
    pub fn player_ids(&self) -> Vec<PlayerId> {
        let mut ids: Vec<_> = self.players.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Monster ids in ascending order.
    pub fn monster_ids(&self) -> Vec<MonsterId> {
        let mut ids: Vec<_> = self.monsters.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use realm_shared::{
        protocol::NetPosition,
        render::NullScene,
        resources::{AssetLoader, ResourceResolver},
    };

    use super::*;

    struct KnownKeys(&'static [&'static str]);

    impl AssetLoader for KnownKeys {
        fn load(&mut self, key: &str) -> anyhow::Result<AssetHandle> {
            anyhow::ensure!(self.0.iter().any(|k| *k == key), "unknown asset {key}");
            Ok(AssetHandle {
                id: 1,
                key: key.to_string(),
            })
        }
    }

    fn spawn(id: &str, is_dead: bool) -> PlayerSpawn {
        PlayerSpawn {
            id: id.into(),
            name: format!("name-{id}"),
            position: Vec3::new(1.0, 0.0, 1.0),
            is_local: false,
            race: "human".into(),
            class: "warrior".into(),
            health: 100,
            max_health: 100,
            level: 3,
            is_dead,
        }
    }

    fn monster(id: MonsterId, prefab: Option<&str>) -> MonsterState {
        MonsterState {
            id,
            name: "Orc".into(),
            level: 2,
            position: NetPosition::planar(1.0, 1.0),
            health: 30,
            max_health: 30,
            is_alive: true,
            prefab_path: prefab.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn second_spawn_keeps_first_entity() {
        let mut reg = EntityRegistry::new();
        let mut views = NullScene;
        reg.spawn_player(spawn("P1", false), &mut views).health = 40;
        let again = reg.spawn_player(spawn("P1", false), &mut views);
        assert_eq!(again.health, 40);
        assert_eq!(reg.player_count(), 1);
    }

    #[test]
    fn dead_spawn_keeps_dead_flag() {
        let mut reg = EntityRegistry::new();
        let p = reg.spawn_player(spawn("P3", true), &mut NullScene);
        assert!(p.is_dead);
        assert!(p.view_update().flags.contains(ViewFlags::DEAD));
    }

    #[test]
    fn monster_without_asset_is_not_registered() {
        let mut reg = EntityRegistry::new();
        let mut resolver = ResourceResolver::new(Box::new(KnownKeys(&["orc"])), None);
        let err = reg
            .spawn_monster(
                &monster(9, Some("dragon")),
                Vec3::ZERO,
                &mut resolver,
                &mut NullScene,
            )
            .unwrap_err();
        assert!(matches!(err, SyncError::MissingSpawnAsset { id: 9, .. }));
        assert!(!reg.contains_monster(9));

        reg.spawn_monster(
            &monster(7, Some("orc")),
            Vec3::ZERO,
            &mut resolver,
            &mut NullScene,
        )
        .unwrap();
        assert_eq!(reg.monster(7).map(|m| m.asset.key.as_str()), Some("orc"));
    }

    #[test]
    fn remove_player_only_touches_named_id() {
        let mut reg = EntityRegistry::new();
        reg.spawn_player(spawn("P1", false), &mut NullScene);
        reg.spawn_player(spawn("P2", false), &mut NullScene);

        assert!(reg.remove_player("P1", &mut NullScene).is_some());
        assert!(reg.remove_player("P1", &mut NullScene).is_none());
        assert_eq!(reg.player_ids(), vec!["P2".to_string()]);
    }
}
