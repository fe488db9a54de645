//! Velocity and force responses of the skate body: speed cap, ground stick,
//! pumping, leaning, ollies and the ramp flip-jump correction.

use glam::Vec3;
use log::debug;

use crate::components::{DeferredOllie, LocomotionMode, PumpState};
use crate::interface::Skaterface;

use super::skate::SkateBody;

/// Forward share of the ollie impulse; the rest is straight up the tracker.
const OLLIE_FORWARD_SHARE: f32 = 0.05;

/// `velocity` with its length capped at `max`. Direction is preserved.
pub fn clamp_speed(velocity: Vec3, max: f32) -> Vec3 {
    velocity.clamp_length_max(max)
}

/// Lateral lean force for a body moving at `velocity`.
///
/// Points along `Z x v̂`, scaled by speed relative to `max_velocity` (clamped
/// to `[0.25, 2]`) so a slow board still turns and a fast one does not spin out.
pub fn lean_force(velocity: Vec3, max_velocity: f32, axis_value: f32, strength: f32) -> Vec3 {
    let heading = velocity.normalize_or_zero();
    let direction = Vec3::Z.cross(heading).normalize_or_zero();
    let scale = (velocity.length() / max_velocity).clamp(0.25, 2.0);
    direction * scale * axis_value * strength
}

pub fn ollie_impulse(forward: Vec3, up: Vec3, strength: f32) -> Vec3 {
    (forward * OLLIE_FORWARD_SHARE + up) * strength
}

/// Velocity with the component that carries the body over the lip of a ramp
/// removed. `ground_normal` is the ramp normal from the last blocking ground cast.
pub fn flip_jump_velocity(velocity: Vec3, ground_normal: Vec3) -> Vec3 {
    let along_lip = ground_normal.cross(Vec3::Z).normalize_or_zero();
    let inward = along_lip.cross(Vec3::Z);
    velocity - inward * velocity.dot(inward)
}

impl SkateBody<'_> {
    pub(crate) fn clamp_velocity(&self) {
        let Some(max) = self.with_state(|s| s.config.max_velocity) else {
            return;
        };
        self.with_body(|b| b.velocity = clamp_speed(b.velocity, max));
    }

    /// Extra downward force along the tracker while the follower is grounded.
    pub(crate) fn stick_to_ground(&self) {
        let Some(follower) = self.follower() else {
            return;
        };
        if !follower.grounded() {
            return;
        }
        let Some(stick) = self.with_state(|s| s.config.stick_force) else {
            return;
        };
        let force = follower.tracker_up() * -stick;
        self.with_body(|b| b.add_force(force));
    }

    /// Pushes along the pump direction until the pump runs out.
    pub(crate) fn apply_pump(&self, dt: f32) {
        let Some(Some((direction, strength))) = self.with_state(|s| {
            let strength = s.config.pump_force;
            let pump = s.pump.as_mut()?;
            let direction = pump.direction;
            pump.remaining -= dt;
            if pump.remaining <= 0.0 {
                s.pump = None;
            }
            Some((direction, strength))
        }) else {
            return;
        };
        self.with_body(|b| b.add_force(direction * strength));
    }

    pub(crate) fn start_pump(&mut self) {
        if self.mode() != LocomotionMode::Skate {
            return;
        }
        let direction = self.facing_or(self.velocity().normalize_or_zero());
        if direction == Vec3::ZERO {
            return;
        }
        self.with_state(|s| {
            s.pump = Some(PumpState {
                direction,
                remaining: s.config.pump_duration,
            });
        });
        debug!("pump along {direction}");
    }

    pub(crate) fn apply_lean(&mut self, at_rest: bool, axis_value: f32) {
        if at_rest || self.mode() != LocomotionMode::Skate {
            return;
        }
        let lean = self.with_state(|s| (s.config.max_velocity, s.config.lean_force));
        let Some((max, strength)) = lean else {
            return;
        };
        let force = lean_force(self.velocity(), max, axis_value, strength);
        self.with_body(|b| b.add_force(force));
    }

    /// In `Skate`, kicks the body up and slightly forward along the tracker.
    /// In `Grind`, leaves the rail and queues the kick for the first tick the
    /// body simulates again.
    pub(crate) fn jump(&mut self) {
        match self.mode() {
            LocomotionMode::Skate => {
                let Some(strength) = self.with_state(|s| s.config.ollie_impulse) else {
                    return;
                };
                let (forward, up) = self
                    .follower()
                    .map(|f| (f.tracker_forward(), f.tracker_up()))
                    .unwrap_or((self.velocity().normalize_or_zero(), Vec3::Z));
                let impulse = ollie_impulse(forward, up, strength);
                self.with_body(|b| b.add_impulse(impulse));
                self.with_state(|s| s.deferred_ollie = DeferredOllie::Idle);
            }
            LocomotionMode::Grind => {
                self.cancel_grind();
                self.with_state(|s| s.deferred_ollie = DeferredOllie::Requested);
            }
        }
    }

    pub(crate) fn cancel_ramp_carry(&mut self) {
        let Some(normal) = self.with_state(|s| s.last_ground_normal) else {
            return;
        };
        self.with_body(|b| b.velocity = flip_jump_velocity(b.velocity, normal));
    }
}
