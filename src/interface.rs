//! Capability interface shared by the skate body and its follower.
//!
//! Both sides implement [`Skaterface`] and override only what they own; every
//! method has a harmless default so a caller holding the wrong side, or no
//! side at all ([`Detached`]), degrades to a no-op instead of failing.

use glam::Vec3;

use crate::components::{GroundState, LocomotionMode, RayHit};

pub trait Skaterface {
    /// Start a forward push.
    fn pump(&mut self) {}

    /// Lateral lean. `at_rest` marks the low-speed variant where the caller
    /// turns its own tracker and the body does nothing.
    fn lean(&mut self, _at_rest: bool, _axis_value: f32) {}

    fn ollie(&mut self) {}

    /// Remove the part of the velocity that carries the body over the ramp.
    fn flip_jump(&mut self) {}

    /// Look ahead along the ballistic arc and pre-orient for the landing.
    fn air_trajectory_prediction(&mut self) {}

    fn orient_to_landing(&mut self, _hit: &RayHit, _time_to_hit: f32, _projected_forward: Vec3) {}

    fn report_ground_condition(&mut self) -> GroundState {
        GroundState::default()
    }

    fn velocity(&self) -> Vec3 {
        Vec3::ZERO
    }

    fn mode(&self) -> LocomotionMode {
        LocomotionMode::Skate
    }

    fn grounded(&self) -> bool {
        false
    }

    fn tracker_forward(&self) -> Vec3 {
        Vec3::ZERO
    }

    fn tracker_right(&self) -> Vec3 {
        Vec3::ZERO
    }

    fn tracker_up(&self) -> Vec3 {
        Vec3::ZERO
    }
}

/// Stand-in used when no live body or follower is attached.
#[derive(Clone, Copy, Debug, Default)]
pub struct Detached;

impl Skaterface for Detached {}
