//! Inbound world event payloads.
//!
//! These are the records the server pushes to a client once it has entered
//! the world. Field names follow the server's snake_case JSON; anything a
//! server may omit is `#[serde(default)]` so older servers keep decoding.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::Vec3;

/// Stable, server-assigned player identifier.
pub type PlayerId = String;

/// Server-assigned monster identifier.
pub type MonsterId = u32;

/// Wire position. `y` is optional: many server records only carry the
/// ground-plane coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct NetPosition {
    pub x: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    pub z: f32,
}

impl NetPosition {
    pub const fn planar(x: f32, z: f32) -> Self {
        Self { x, y: None, z }
    }

    pub const fn full(x: f32, y: f32, z: f32) -> Self {
        Self { x, y: Some(y), z }
    }

    /// Plane coordinates with the given height.
    pub fn at_height(self, y: f32) -> Vec3 {
        Vec3::new(self.x, y, self.z)
    }
}

/// Derived combat stats, recomputed by the server on level-up and stat spend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CharacterStats {
    pub attack_power: u32,
    pub magic_power: u32,
    pub defense: u32,
    pub attack_speed: f32,
    pub strength: u32,
    pub intelligence: u32,
    pub dexterity: u32,
    pub vitality: u32,
}

/// Primary attribute a status point can be spent on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatKind {
    Strength,
    Intelligence,
    Dexterity,
    Vitality,
}

impl StatKind {
    /// Parses a server stat name. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "strength" | "str" => Some(Self::Strength),
            "intelligence" | "int" => Some(Self::Intelligence),
            "dexterity" | "dex" => Some(Self::Dexterity),
            "vitality" | "vit" => Some(Self::Vitality),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Strength => "strength",
            Self::Intelligence => "intelligence",
            Self::Dexterity => "dexterity",
            Self::Vitality => "vitality",
        }
    }
}

impl CharacterStats {
    pub fn get(&self, stat: StatKind) -> u32 {
        match stat {
            StatKind::Strength => self.strength,
            StatKind::Intelligence => self.intelligence,
            StatKind::Dexterity => self.dexterity,
            StatKind::Vitality => self.vitality,
        }
    }
}

/// Full record of the character this client controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CharacterData {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub race: String,
    #[serde(default)]
    pub class: String,
    #[serde(default = "one")]
    pub level: u32,
    #[serde(default)]
    pub experience: u64,
    pub health: u32,
    pub max_health: u32,
    #[serde(default)]
    pub mana: u32,
    #[serde(default)]
    pub max_mana: u32,
    #[serde(default)]
    pub status_points: u32,
    #[serde(default)]
    pub stats: CharacterStats,
    #[serde(default)]
    pub position: Option<NetPosition>,
}

fn one() -> u32 {
    1
}

/// Replicated player record, used in snapshots and deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PlayerState {
    pub id: PlayerId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub race: String,
    #[serde(default)]
    pub class: String,
    pub position: NetPosition,
    #[serde(default)]
    pub target_position: Option<NetPosition>,
    pub health: u32,
    pub max_health: u32,
    #[serde(default)]
    pub mana: u32,
    #[serde(default)]
    pub max_mana: u32,
    #[serde(default = "one")]
    pub level: u32,
    #[serde(default)]
    pub experience: u64,
    #[serde(default)]
    pub is_dead: bool,
    #[serde(default)]
    pub is_moving: bool,
    #[serde(default)]
    pub in_combat: bool,
    #[serde(default)]
    pub status_points: u32,
}

/// Replicated monster record, used in snapshots and deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MonsterState {
    pub id: MonsterId,
    #[serde(default)]
    pub name: String,
    #[serde(default = "one")]
    pub level: u32,
    pub position: NetPosition,
    #[serde(default)]
    pub target_position: Option<NetPosition>,
    pub health: u32,
    pub max_health: u32,
    pub is_alive: bool,
    #[serde(default)]
    pub is_moving: bool,
    #[serde(default)]
    pub in_combat: bool,
    /// Logical visual-asset key.
    #[serde(default)]
    pub prefab_path: Option<String>,
}

/// Which entity map a combat participant lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Player,
    Monster,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => f.write_str("player"),
            Self::Monster => f.write_str("monster"),
        }
    }
}

/// Combat target id. Servers send player ids as strings and monster ids as
/// numbers, but either may arrive in either form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityRef {
    Number(u64),
    Text(String),
}

impl EntityRef {
    pub fn as_player_id(&self) -> PlayerId {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }

    pub fn as_monster_id(&self) -> Option<MonsterId> {
        match self {
            Self::Number(n) => MonsterId::try_from(*n).ok(),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Full snapshot delivered once on world entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnterWorld {
    pub success: bool,
    pub local_id: PlayerId,
    pub local_character: CharacterData,
    #[serde(default)]
    pub all_players: Vec<PlayerState>,
    #[serde(default)]
    pub all_monsters: Vec<MonsterState>,
}

/// Periodic partial state for entities relevant to this client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WorldDelta {
    #[serde(default)]
    pub players: Vec<PlayerState>,
    #[serde(default)]
    pub monsters: Vec<MonsterState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerJoined {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub race: String,
    #[serde(default)]
    pub class: String,
    pub health: u32,
    pub max_health: u32,
    #[serde(default = "one")]
    pub level: u32,
    pub position: NetPosition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatResult {
    pub attacker_type: EntityKind,
    pub target_type: EntityKind,
    pub target_id: EntityRef,
    pub damage: u32,
    #[serde(default)]
    pub is_critical: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelUp {
    pub id: PlayerId,
    #[serde(default)]
    pub name: String,
    pub new_level: u32,
    pub new_stats: CharacterStats,
    pub status_points: u32,
    pub experience: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusPointAdded {
    pub id: PlayerId,
    #[serde(default)]
    pub name: String,
    pub stat: String,
    pub status_points: u32,
    pub new_stats: CharacterStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRespawned {
    pub id: PlayerId,
    #[serde(default)]
    pub name: String,
    pub position: NetPosition,
    pub health: u32,
    pub max_health: u32,
}

/// Every event the client reconciles, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorldEvent {
    EnterWorld(EnterWorld),
    Delta(WorldDelta),
    PlayerJoined(PlayerJoined),
    PlayerLeft {
        id: PlayerId,
    },
    CombatResult(CombatResult),
    LevelUp(LevelUp),
    StatusPointAdded(StatusPointAdded),
    PlayerDied {
        id: PlayerId,
        #[serde(default)]
        name: String,
    },
    PlayerRespawned(PlayerRespawned),
}

impl WorldEvent {
    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EnterWorld(_) => "enter_world",
            Self::Delta(_) => "delta",
            Self::PlayerJoined(_) => "player_joined",
            Self::PlayerLeft { .. } => "player_left",
            Self::CombatResult(_) => "combat_result",
            Self::LevelUp(_) => "level_up",
            Self::StatusPointAdded(_) => "status_point_added",
            Self::PlayerDied { .. } => "player_died",
            Self::PlayerRespawned(_) => "player_respawned",
        }
    }
}
