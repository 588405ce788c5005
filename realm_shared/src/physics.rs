//! Ground queries.
//!
//! The terrain itself lives outside this crate. Spawning only needs one
//! question answered: where is the ground under a point?

use crate::math::Vec3;

/// Terrain height service.
pub trait GroundQuery: Send {
    /// Returns `position` moved vertically so it rests `height_offset` above
    /// the ground.
    fn ground_clamp(&self, position: Vec3, height_offset: f32) -> Vec3;
}

/// Infinite flat plane at a fixed height.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatGround {
    pub level: f32,
}

impl FlatGround {
    pub fn new(level: f32) -> Self {
        Self { level }
    }
}

impl GroundQuery for FlatGround {
    fn ground_clamp(&self, position: Vec3, height_offset: f32) -> Vec3 {
        position.with_y(self.level + height_offset)
    }
}
