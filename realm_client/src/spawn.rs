//! Spawn placement.
//!
//! New players appear either at a fixed per-race start point or where the
//! server says they are. In both cases the result is settled onto the ground
//! when a ground query is available.

use realm_shared::{math::Vec3, physics::GroundQuery, protocol::NetPosition};

/// Playable races with a dedicated start point. Anything else uses
/// [`Race::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Race {
    Human,
    Elf,
    Dwarf,
    Orc,
    Unknown,
}

impl Race {
    /// Total over all inputs: unrecognized names map to `Unknown`.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "human" => Self::Human,
            "elf" => Self::Elf,
            "dwarf" => Self::Dwarf,
            "orc" => Self::Orc,
            _ => Self::Unknown,
        }
    }

    /// Start point on the ground plane (height is applied separately).
    pub fn spawn_point(self) -> Vec3 {
        match self {
            Self::Human => Vec3::new(0.0, 0.0, 0.0),
            Self::Elf => Vec3::new(50.0, 0.0, 50.0),
            Self::Dwarf => Vec3::new(-50.0, 0.0, 50.0),
            Self::Orc => Vec3::new(50.0, 0.0, -50.0),
            Self::Unknown => Vec3::new(0.0, 0.0, 0.0),
        }
    }
}

pub struct SpawnPositionPolicy {
    use_custom_spawns: bool,
    height_offset: f32,
    ground: Option<Box<dyn GroundQuery>>,
}

impl SpawnPositionPolicy {
    pub fn new(
        use_custom_spawns: bool,
        height_offset: f32,
        ground: Option<Box<dyn GroundQuery>>,
    ) -> Self {
        Self {
            use_custom_spawns,
            height_offset,
            ground,
        }
    }

    pub fn use_custom_spawns(&self) -> bool {
        self.use_custom_spawns
    }

    /// Initial position for a newly spawned player.
    pub fn position_for(&self, race: &str, server: NetPosition) -> Vec3 {
        if self.use_custom_spawns {
            self.settle(Race::parse(race).spawn_point())
        } else {
            self.from_server(server)
        }
    }

    /// Server plane coordinates, placed at the configured height.
    pub fn from_server(&self, server: NetPosition) -> Vec3 {
        self.settle(server.at_height(self.height_offset))
    }

    /// Server position, keeping a server-supplied height when there is one.
    pub fn world_position(&self, server: NetPosition) -> Vec3 {
        match server.y {
            Some(y) => server.at_height(y),
            None => self.from_server(server),
        }
    }

    fn settle(&self, position: Vec3) -> Vec3 {
        match &self.ground {
            Some(ground) => ground.ground_clamp(position, self.height_offset),
            None => position.with_y(self.height_offset),
        }
    }
}
