//! Scene collaborators.
//!
//! This crate does not depend on a renderer, an animation system or a UI
//! toolkit. It defines what the reconciler tells them. Implementations only
//! receive calls; nothing here is ever read back.

use std::fmt;

use tracing::info;

use crate::{
    math::Vec3,
    protocol::{CharacterData, MonsterId, PlayerId},
    resources::AssetHandle,
};

/// Addresses the visual representation of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Player(PlayerId),
    Monster(MonsterId),
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player(id) => write!(f, "player:{id}"),
            Self::Monster(id) => write!(f, "monster:{id}"),
        }
    }
}

bitflags::bitflags! {
    /// Per-entity state flags pushed to views.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ViewFlags: u8 {
        const MOVING = 1 << 0;
        const DEAD = 1 << 1;
        const IN_COMBAT = 1 << 2;
    }
}

/// Everything a view needs to build the visual for a new entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSpawn {
    pub name: String,
    pub level: u32,
    pub position: Vec3,
    pub is_local: bool,
    /// Resolved visual asset (monsters only).
    pub asset: Option<AssetHandle>,
}

/// Controller state for an existing entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewUpdate {
    pub position: Vec3,
    pub target: Option<Vec3>,
    pub health: u32,
    pub max_health: u32,
    pub flags: ViewFlags,
}

/// Per-entity visual controllers and transient effects.
pub trait EntityViews: Send {
    fn spawn(&mut self, key: &EntityKey, spawn: &ViewSpawn);
    fn despawn(&mut self, key: &EntityKey);
    fn update(&mut self, key: &EntityKey, update: &ViewUpdate);
    fn show_damage(&mut self, key: &EntityKey, damage: u32, critical: bool);
    fn play_death(&mut self, key: &EntityKey);
    fn play_respawn(&mut self, key: &EntityKey, position: Vec3);
}

pub trait CameraRig: Send {
    fn set_target(&mut self, key: &EntityKey);
}

/// Player-facing UI widgets.
pub trait Hud: Send {
    fn set_health(&mut self, current: u32, max: u32);
    fn set_mana(&mut self, current: u32, max: u32);
    fn set_experience(&mut self, experience: u64, level: u32);
    fn push_log(&mut self, line: &str);
    fn set_combat_status(&mut self, in_combat: bool);
    fn show_character(&mut self, character: &CharacterData);
}

/// No-op collaborators for headless runs.
#[derive(Default)]
pub struct NullScene;

impl EntityViews for NullScene {
    fn spawn(&mut self, _key: &EntityKey, _spawn: &ViewSpawn) {}
    fn despawn(&mut self, _key: &EntityKey) {}
    fn update(&mut self, _key: &EntityKey, _update: &ViewUpdate) {}
    fn show_damage(&mut self, _key: &EntityKey, _damage: u32, _critical: bool) {}
    fn play_death(&mut self, _key: &EntityKey) {}
    fn play_respawn(&mut self, _key: &EntityKey, _position: Vec3) {}
}

impl CameraRig for NullScene {
    fn set_target(&mut self, _key: &EntityKey) {}
}

impl Hud for NullScene {
    fn set_health(&mut self, _current: u32, _max: u32) {}
    fn set_mana(&mut self, _current: u32, _max: u32) {}
    fn set_experience(&mut self, _experience: u64, _level: u32) {}
    fn push_log(&mut self, _line: &str) {}
    fn set_combat_status(&mut self, _in_combat: bool) {}
    fn show_character(&mut self, _character: &CharacterData) {}
}

/// HUD that writes to the log. Used by the standalone client.
#[derive(Default)]
pub struct TracingHud;

impl Hud for TracingHud {
    fn set_health(&mut self, current: u32, max: u32) {
        info!(current, max, "HUD health");
    }

    fn set_mana(&mut self, current: u32, max: u32) {
        info!(current, max, "HUD mana");
    }

    fn set_experience(&mut self, experience: u64, level: u32) {
        info!(experience, level, "HUD experience");
    }

    fn push_log(&mut self, line: &str) {
        info!(line, "Combat log");
    }

    fn set_combat_status(&mut self, in_combat: bool) {
        info!(in_combat, "HUD combat status");
    }

    fn show_character(&mut self, character: &CharacterData) {
        info!(
            id = %character.id,
            name = %character.name,
            level = character.level,
            health = character.health,
            max_health = character.max_health,
            status_points = character.status_points,
            "HUD character"
        );
    }
}

/// The three scene collaborators a reconciler writes to.
pub struct Scene {
    pub views: Box<dyn EntityViews>,
    pub camera: Box<dyn CameraRig>,
    pub hud: Box<dyn Hud>,
}

impl Scene {
    pub fn new(
        views: Box<dyn EntityViews>,
        camera: Box<dyn CameraRig>,
        hud: Box<dyn Hud>,
    ) -> Self {
        Self { views, camera, hud }
    }

    pub fn headless() -> Self {
        Self::new(Box::new(NullScene), Box::new(NullScene), Box::new(NullScene))
    }
}
