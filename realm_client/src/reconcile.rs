//! Event reconciliation.
//!
//! The reconciler is the only writer of the entity registry. Each inbound
//! [`WorldEvent`] is applied to completion before the next one is looked at;
//! nothing is buffered or reordered here, so per-entity ordering is whatever
//! the transport delivered.
//!
//! Presence rules:
//! - snapshot, join and monster-delta paths spawn, and only for absent ids;
//! - delta paths update present entities in place;
//! - only a disconnect removes a player, and nothing removes a monster.

use realm_shared::{
    error::SyncError,
    math::Vec3,
    protocol::{
        CharacterData, CombatResult, EnterWorld, EntityKind, LevelUp, MonsterState, PlayerId,
        PlayerJoined, PlayerRespawned, PlayerState, StatKind, StatusPointAdded, WorldDelta,
        WorldEvent,
    },
    render::{EntityKey, Scene},
    resources::ResourceResolver,
};
use tracing::{debug, error, info, warn};

use crate::{
    registry::{EntityRegistry, PlayerSpawn},
    spawn::SpawnPositionPolicy,
};

pub struct Reconciler {
    registry: EntityRegistry,
    resolver: ResourceResolver,
    spawns: SpawnPositionPolicy,
    scene: Scene,
    local_id: Option<PlayerId>,
    local: Option<CharacterData>,
}

impl Reconciler {
    pub fn new(resolver: ResourceResolver, spawns: SpawnPositionPolicy, scene: Scene) -> Self {
        Self {
            registry: EntityRegistry::new(),
            resolver,
            spawns,
            scene,
            local_id: None,
            local: None,
        }
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &ResourceResolver {
        &self.resolver
    }

    pub fn local_id(&self) -> Option<&str> {
        self.local_id.as_deref()
    }

    /// Latest known state of the character this client controls.
    pub fn local_character(&self) -> Option<&CharacterData> {
        self.local.as_ref()
    }

    /// Whether a world-entry snapshot has been applied.
    pub fn has_entered(&self) -> bool {
        self.local_id.is_some()
    }

    fn is_local(&self, id: &str) -> bool {
        self.local_id.as_deref() == Some(id)
    }

    /// Applies one event. Failures are logged and dropped per entity: a
    /// record that cannot be applied does not hold back the rest of the
    /// event.
    pub fn apply(&mut self, event: WorldEvent) {
        let kind = event.kind();
        let result = match event {
            WorldEvent::EnterWorld(snapshot) => self.on_enter_world(snapshot),
            WorldEvent::Delta(delta) => self.on_delta(delta),
            WorldEvent::PlayerJoined(joined) => self.on_player_joined(joined),
            WorldEvent::PlayerLeft { id } => self.on_player_left(&id),
            WorldEvent::CombatResult(hit) => self.on_combat_result(hit),
            WorldEvent::LevelUp(level_up) => self.on_level_up(level_up),
            WorldEvent::StatusPointAdded(added) => self.on_status_point_added(added),
            WorldEvent::PlayerDied { id, .. } => self.on_player_died(&id),
            WorldEvent::PlayerRespawned(respawn) => self.on_player_respawned(respawn),
        };

        if let Err(e) = result {
            report(kind, &e);
        }
    }

    fn on_enter_world(&mut self, snapshot: EnterWorld) -> Result<(), SyncError> {
        if !snapshot.success {
            warn!(local_id = %snapshot.local_id, "Server rejected world entry");
            return Ok(());
        }
        if let Some(current) = &self.local_id {
            warn!(
                current = %current,
                incoming = %snapshot.local_id,
                "Already in world, snapshot ignored"
            );
            return Ok(());
        }

        let EnterWorld {
            local_id,
            local_character,
            all_players,
            all_monsters,
            ..
        } = snapshot;

        info!(
            local_id = %local_id,
            players = all_players.len(),
            monsters = all_monsters.len(),
            "Entering world"
        );

        let own_record = all_players.iter().find(|p| p.id == local_id);
        let server_position = match (local_character.position, own_record) {
            (Some(pos), _) => pos,
            (None, Some(record)) => record.position,
            (None, None) => Default::default(),
        };
        let position = self
            .spawns
            .position_for(&local_character.race, server_position);

        let local = self.registry.spawn_player(
            PlayerSpawn {
                id: local_id.clone(),
                name: local_character.name.clone(),
                position,
                is_local: true,
                race: local_character.race.clone(),
                class: local_character.class.clone(),
                health: local_character.health,
                max_health: local_character.max_health,
                level: local_character.level,
                is_dead: own_record.is_some_and(|p| p.is_dead),
            },
            self.scene.views.as_mut(),
        );
        local.mana = local_character.mana;
        local.max_mana = local_character.max_mana;
        local.experience = local_character.experience;
        local.status_points = local_character.status_points;
        local.stats = local_character.stats;
        let key = local.key();

        self.scene.camera.set_target(&key);
        self.scene.hud.show_character(&local_character);
        self.local_id = Some(local_id.clone());
        self.local = Some(local_character);

        for other in all_players.iter().filter(|p| p.id != local_id) {
            let position = self.spawns.from_server(other.position);
            self.spawn_remote_player(other, position);
        }

        for monster in all_monsters.iter().filter(|m| m.is_alive) {
            if let Err(e) = self.spawn_monster(monster) {
                report("enter_world", &e);
            }
        }
        Ok(())
    }

    fn spawn_remote_player(&mut self, state: &PlayerState, position: Vec3) {
        if self.registry.contains_player(&state.id) {
            return;
        }
        let target = state
            .target_position
            .map(|t| self.spawns.world_position(t));
        let player = self.registry.spawn_player(
            PlayerSpawn {
                id: state.id.clone(),
                name: state.name.clone(),
                position,
                is_local: false,
                race: state.race.clone(),
                class: state.class.clone(),
                health: state.health,
                max_health: state.max_health,
                level: state.level,
                is_dead: state.is_dead,
            },
            self.scene.views.as_mut(),
        );
        player.mana = state.mana;
        player.max_mana = state.max_mana;
        player.experience = state.experience;
        player.status_points = state.status_points;
        player.in_combat = state.in_combat;
        player.is_moving = state.is_moving;
        player.target = target;
        self.scene.views.update(&player.key(), &player.view_update());
    }

    fn spawn_monster(&mut self, state: &MonsterState) -> Result<(), SyncError> {
        let position = self.spawns.world_position(state.position);
        let target = state
            .target_position
            .map(|t| self.spawns.world_position(t));
        let monster = self.registry.spawn_monster(
            state,
            position,
            &mut self.resolver,
            self.scene.views.as_mut(),
        )?;
        monster.target = target;
        Ok(())
    }

    fn on_delta(&mut self, delta: WorldDelta) -> Result<(), SyncError> {
        for state in &delta.players {
            self.update_player(state);
        }
        for state in &delta.monsters {
            if let Err(e) = self.update_monster(state) {
                report("delta", &e);
            }
        }
        Ok(())
    }

    fn update_player(&mut self, state: &PlayerState) {
        let position = self.spawns.world_position(state.position);
        let target = state
            .target_position
            .map(|t| self.spawns.world_position(t));

        let Some(player) = self.registry.player_mut(&state.id) else {
            debug!(id = %state.id, "Delta for unregistered player skipped");
            return;
        };
        player.position = position;
        player.target = target;
        player.is_moving = state.is_moving;
        player.health = state.health;
        player.max_health = state.max_health;
        player.mana = state.mana;
        player.max_mana = state.max_mana;
        player.in_combat = state.in_combat;
        player.experience = state.experience;
        player.level = state.level;
        player.status_points = state.status_points;
        self.scene.views.update(&player.key(), &player.view_update());

        if !self.is_local(&state.id) {
            return;
        }
        let hud = self.scene.hud.as_mut();
        hud.set_health(state.health, state.max_health);
        hud.set_mana(state.mana, state.max_mana);
        hud.set_experience(state.experience, state.level);
        hud.set_combat_status(state.in_combat);
        if let Some(local) = self.local.as_mut() {
            local.health = state.health;
            local.max_health = state.max_health;
            local.mana = state.mana;
            local.max_mana = state.max_mana;
            local.experience = state.experience;
            local.level = state.level;
            local.status_points = state.status_points;
            local.position = Some(state.position);
        }
    }

    fn update_monster(&mut self, state: &MonsterState) -> Result<(), SyncError> {
        if !self.registry.contains_monster(state.id) {
            if !state.is_alive {
                return Ok(());
            }
            debug!(id = state.id, "Late-join monster from delta");
            return self.spawn_monster(state);
        }

        let position = self.spawns.world_position(state.position);
        let target = state
            .target_position
            .map(|t| self.spawns.world_position(t));
        let monster = self
            .registry
            .monster_mut(state.id)
            .ok_or_else(|| SyncError::unknown_monster(state.id))?;

        monster.position = position;
        monster.target = target;
        monster.health = state.health;
        monster.max_health = state.max_health;
        monster.is_alive = state.is_alive;
        monster.is_moving = state.is_moving;
        monster.in_combat = state.in_combat;
        self.scene
            .views
            .update(&monster.key(), &monster.view_update());
        Ok(())
    }

    fn on_player_joined(&mut self, joined: PlayerJoined) -> Result<(), SyncError> {
        if self.registry.contains_player(&joined.id) {
            debug!(id = %joined.id, "Join for registered player ignored");
            return Ok(());
        }
        let position = self.spawns.position_for(&joined.race, joined.position);
        self.registry.spawn_player(
            PlayerSpawn {
                id: joined.id,
                name: joined.name,
                position,
                is_local: false,
                race: joined.race,
                class: joined.class,
                health: joined.health,
                max_health: joined.max_health,
                level: joined.level,
                is_dead: false,
            },
            self.scene.views.as_mut(),
        );
        Ok(())
    }

    fn on_player_left(&mut self, id: &str) -> Result<(), SyncError> {
        self.registry
            .remove_player(id, self.scene.views.as_mut())
            .map(|_| ())
            .ok_or_else(|| SyncError::unknown_player(id))
    }

    fn on_combat_result(&mut self, hit: CombatResult) -> Result<(), SyncError> {
        let key = match hit.target_type {
            EntityKind::Player => {
                let id = hit.target_id.as_player_id();
                let player = self
                    .registry
                    .player(&id)
                    .ok_or_else(|| SyncError::unknown_player(&id))?;
                player.key()
            }
            EntityKind::Monster => {
                let monster = hit
                    .target_id
                    .as_monster_id()
                    .and_then(|id| self.registry.monster(id))
                    .ok_or_else(|| SyncError::unknown_monster(&hit.target_id))?;
                monster.key()
            }
        };

        self.scene
            .views
            .show_damage(&key, hit.damage, hit.is_critical);

        if let EntityKey::Player(id) = &key {
            if self.is_local(id) {
                let crit = if hit.is_critical { " (critical)" } else { "" };
                self.scene.hud.push_log(&format!(
                    "Took {} damage from a {}{crit}",
                    hit.damage, hit.attacker_type
                ));
            }
        }
        Ok(())
    }

    fn on_level_up(&mut self, level_up: LevelUp) -> Result<(), SyncError> {
        let player = self
            .registry
            .player_mut(&level_up.id)
            .ok_or_else(|| SyncError::unknown_player(&level_up.id))?;
        player.level = level_up.new_level;
        player.stats = level_up.new_stats;
        player.status_points = level_up.status_points;
        player.experience = level_up.experience;
        info!(id = %level_up.id, level = level_up.new_level, "Level up");

        if !self.is_local(&level_up.id) {
            return Ok(());
        }
        if let Some(local) = self.local.as_mut() {
            local.level = level_up.new_level;
            local.stats = level_up.new_stats;
            local.status_points = level_up.status_points;
            local.experience = level_up.experience;
            self.scene.hud.show_character(local);
        }
        self.scene.hud.push_log(&format!(
            "Reached level {} ({} status points)",
            level_up.new_level, level_up.status_points
        ));
        Ok(())
    }

    fn on_status_point_added(&mut self, added: StatusPointAdded) -> Result<(), SyncError> {
        if !self.is_local(&added.id) {
            debug!(id = %added.id, "Status point for non-local player ignored");
            return Ok(());
        }
        let player = self
            .registry
            .player_mut(&added.id)
            .ok_or_else(|| SyncError::unknown_player(&added.id))?;

        let stat = StatKind::parse(&added.stat);
        if stat.is_none() {
            warn!(stat = %added.stat, "Unknown stat name, applying derived stats only");
        }
        player.stats = added.new_stats;
        player.status_points = added.status_points;

        if let Some(local) = self.local.as_mut() {
            local.stats = added.new_stats;
            local.status_points = added.status_points;
            self.scene.hud.show_character(local);
        }
        let line = match stat {
            Some(stat) => format!(
                "{} increased to {} ({} points left)",
                stat.name(),
                added.new_stats.get(stat),
                added.status_points
            ),
            None => format!(
                "{} updated ({} points left)",
                added.stat, added.status_points
            ),
        };
        info!(id = %added.id, stat = %added.stat, "Status point spent");
        self.scene.hud.push_log(&line);
        Ok(())
    }

    fn on_player_died(&mut self, id: &str) -> Result<(), SyncError> {
        let player = self
            .registry
            .player_mut(id)
            .ok_or_else(|| SyncError::unknown_player(id))?;
        player.is_dead = true;
        player.in_combat = false;
        player.is_moving = false;
        self.scene.views.play_death(&player.key());
        info!(id, "Player died");

        if self.is_local(id) {
            self.scene.hud.set_combat_status(false);
        }
        Ok(())
    }

    fn on_player_respawned(&mut self, respawn: PlayerRespawned) -> Result<(), SyncError> {
        let position = self.spawns.from_server(respawn.position);
        let player = self
            .registry
            .player_mut(&respawn.id)
            .ok_or_else(|| SyncError::unknown_player(&respawn.id))?;
        player.is_dead = false;
        player.in_combat = false;
        player.health = respawn.health;
        player.max_health = respawn.max_health;
        player.position = position;
        player.target = None;
        self.scene.views.play_respawn(&player.key(), position);
        info!(id = %respawn.id, x = position.x, z = position.z, "Player respawned");

        if !self.is_local(&respawn.id) {
            return Ok(());
        }
        if let Some(local) = self.local.as_mut() {
            local.health = respawn.health;
            local.max_health = respawn.max_health;
            local.position = Some(respawn.position);
        }
        self.scene.hud.set_health(respawn.health, respawn.max_health);
        self.scene.hud.set_combat_status(false);
        Ok(())
    }
}

fn report(kind: &str, err: &SyncError) {
    match err {
        SyncError::UnknownEntityReference { .. } => {
            debug!(event = kind, error = %err, "Event ignored");
        }
        SyncError::MissingSpawnAsset { .. } => {
            error!(event = kind, error = %err, "Entity will not be visible");
        }
        _ => warn!(event = kind, error = %err, "Event dropped"),
    }
}
