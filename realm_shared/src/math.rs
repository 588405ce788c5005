//! Math types.
//!
//! World space is y-up: `x`/`z` span the ground plane and `y` is height.

use serde::{Deserialize, Serialize};

/// 3D vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Returns a copy with the vertical component replaced.
    pub const fn with_y(self, y: f32) -> Self {
        Self::new(self.x, y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_y_keeps_plane_coords() {
        let v = Vec3::new(3.0, 9.0, -2.0).with_y(0.5);
        assert_eq!(v, Vec3::new(3.0, 0.5, -2.0));
    }
}
