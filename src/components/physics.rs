use std::ops::BitOr;

use glam::Vec3;
use hecs::Entity;

/// Constant gravitational acceleration, world units per second squared.
pub const GRAVITY: Vec3 = Vec3::new(0.0, 0.0, -980.0);

/// Query channel a ray is cast on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    /// Ordinary visible geometry: ground checks and landing prediction.
    Visibility,
    /// Rails and ledges the board can lock onto.
    Grindable,
    /// Surfaces the integrator resolves body contacts against.
    Physics,
}

/// Set of channels a collider blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelMask(u8);

impl ChannelMask {
    pub const NONE: Self = Self(0);
    pub const VISIBILITY: Self = Self(1 << 0);
    pub const GRINDABLE: Self = Self(1 << 1);
    pub const PHYSICS: Self = Self(1 << 2);
    /// Ordinary solid geometry: seen by raycasts and collided with.
    pub const SOLID: Self = Self(Self::VISIBILITY.0 | Self::PHYSICS.0);

    pub fn blocks(self, channel: Channel) -> bool {
        let bit = match channel {
            Channel::Visibility => Self::VISIBILITY,
            Channel::Grindable => Self::GRINDABLE,
            Channel::Physics => Self::PHYSICS,
        };
        self.0 & bit.0 != 0
    }
}

impl BitOr for ChannelMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Static collision shape. Box and Sphere are placed by the entity's
/// `LocalTransform`; Plane and Polyline are given in world space.
#[derive(Clone, Debug)]
pub enum Collider {
    Sphere { radius: f32 },
    /// Oriented box, rotated by the transform's rotation.
    Box { half_extents: Vec3 },
    /// Single-sided infinite plane: `dot(p, normal) = offset`.
    Plane { normal: Vec3, offset: f32 },
    /// Chain of capsules, used as the grind collider of a rail.
    Polyline { points: Vec<Vec3>, radius: f32 },
}

/// Result of a ray cast. The default value is a miss.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RayHit {
    pub blocking: bool,
    pub point: Vec3,
    pub normal: Vec3,
    /// Distance from the ray origin to `point`.
    pub distance: f32,
    pub entity: Option<Entity>,
}

impl RayHit {
    pub fn miss() -> Self {
        Self::default()
    }
}

/// Simulated sphere body.
///
/// Changing the simulate flag only *requests* the change; the integrator
/// latches it at the end of its next step. Until then the body keeps its old
/// behaviour, and any force or impulse added while it is not simulating is
/// dropped by that step.
#[derive(Clone, Debug)]
pub struct PhysicsBody {
    pub velocity: Vec3,
    pub radius: f32,
    /// Channels this body's own shape blocks. Casts on other channels pass through it.
    pub channels: ChannelMask,
    simulate_requested: bool,
    simulating: bool,
    pub(crate) force: Vec3,
    pub(crate) impulse: Vec3,
}

impl PhysicsBody {
    pub fn new(radius: f32) -> Self {
        Self {
            velocity: Vec3::ZERO,
            radius,
            channels: ChannelMask::PHYSICS,
            simulate_requested: true,
            simulating: true,
            force: Vec3::ZERO,
            impulse: Vec3::ZERO,
        }
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Acceleration-style force: applied as `force * dt` by the next step.
    pub fn add_force(&mut self, force: Vec3) {
        self.force += force;
    }

    /// Velocity change applied whole by the next step.
    pub fn add_impulse(&mut self, impulse: Vec3) {
        self.impulse += impulse;
    }

    pub fn pending_force(&self) -> Vec3 {
        self.force
    }

    pub fn pending_impulse(&self) -> Vec3 {
        self.impulse
    }

    pub fn set_simulate_physics(&mut self, simulate: bool) {
        self.simulate_requested = simulate;
    }

    /// The flag as last requested.
    pub fn simulate_requested(&self) -> bool {
        self.simulate_requested
    }

    /// Whether the integrator currently treats the body as dynamic.
    pub fn is_simulating(&self) -> bool {
        self.simulating
    }

    /// End-of-step bookkeeping: drop accumulators and adopt the requested flag.
    pub(crate) fn finish_step(&mut self) {
        self.force = Vec3::ZERO;
        self.impulse = Vec3::ZERO;
        self.simulating = self.simulate_requested;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_membership() {
        let rail = ChannelMask::VISIBILITY | ChannelMask::GRINDABLE;
        assert!(rail.blocks(Channel::Grindable));
        assert!(rail.blocks(Channel::Visibility));
        assert!(!rail.blocks(Channel::Physics));
        assert!(!ChannelMask::NONE.blocks(Channel::Visibility));
        assert!(ChannelMask::SOLID.blocks(Channel::Physics));
    }

    #[test]
    fn simulate_flag_latches_on_step() {
        let mut body = PhysicsBody::new(25.0);
        body.set_simulate_physics(false);
        assert!(!body.simulate_requested());
        assert!(body.is_simulating());
        body.add_impulse(Vec3::Z);
        body.finish_step();
        assert!(!body.is_simulating());
        assert_eq!(body.pending_impulse(), Vec3::ZERO);
    }
}
