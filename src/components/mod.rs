use glam::{Quat, Vec3};

mod physics;
mod skater;

pub use physics::*;
pub use skater::*;

/// World-space placement of an entity. Z is up.
#[derive(Clone, Copy, Debug)]
pub struct LocalTransform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl LocalTransform {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }
}
