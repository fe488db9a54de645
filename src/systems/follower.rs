//! The follower: the unsimulated presentation side of a skater.
//!
//! It trails the physics body, owns the rotation tracker every other system
//! reads its heading from, turns player intents into skate-body calls and
//! reacts to the ground report.

use glam::{Quat, Vec3};
use hecs::{Entity, World};
use log::{debug, warn};

use crate::components::{
    Follower, LocalTransform, LocomotionMode, RayHit, RotationTracker, SkatePhysics,
};
use crate::interface::Skaterface;

use super::raycast::SurfaceQuery;
use super::skate::SkateBody;

/// Ground normals flatter than this (|n.z|) never re-orient the tracker for a landing.
const MIN_LANDING_NORMAL_Z: f32 = 0.1;
/// Horizontal share of the ground normal above which a take-off counts as
/// leaving a ramp wall.
const RAMP_WALL_NORMAL: f32 = 0.95;

/// Player intents for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SkateInput {
    pub pump: bool,
    /// Lean axis in `[-1, 1]` while the lean input is held.
    pub lean: Option<f32>,
    pub lean_released: bool,
    pub ollie: bool,
}

impl SkateInput {
    pub fn pump() -> Self {
        Self {
            pump: true,
            ..Self::default()
        }
    }

    pub fn ollie() -> Self {
        Self {
            ollie: true,
            ..Self::default()
        }
    }

    pub fn lean(axis: f32) -> Self {
        Self {
            lean: Some(axis),
            ..Self::default()
        }
    }

    pub fn release_lean() -> Self {
        Self {
            lean_released: true,
            ..Self::default()
        }
    }
}

/// Handle on a follower entity (`Follower` + `RotationTracker` + `LocalTransform`).
#[derive(Clone, Copy)]
pub struct SkaterView<'w> {
    world: &'w World,
    entity: Entity,
}

impl<'w> SkaterView<'w> {
    pub fn new(world: &'w World, entity: Entity) -> Self {
        Self { world, entity }
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn is_live(&self) -> bool {
        self.world.get::<&Follower>(self.entity).is_ok()
            && self.world.get::<&RotationTracker>(self.entity).is_ok()
    }

    fn tracker(&self) -> Option<RotationTracker> {
        let tracker = self.world.get::<&RotationTracker>(self.entity).ok()?;
        Some(*tracker)
    }

    /// Points the tracker along `forward` with world up as reference.
    pub fn face(&self, forward: Vec3) {
        if let Ok(mut tracker) = self.world.get::<&mut RotationTracker>(self.entity) {
            tracker.face(forward);
        }
    }

    /// Forward and right of the camera heading.
    pub fn camera_axes(&self) -> (Vec3, Vec3) {
        self.world
            .get::<&Follower>(self.entity)
            .map(|f| (f.camera_forward(), f.camera_right()))
            .unwrap_or((Vec3::X, Vec3::NEG_Y))
    }

    /// Mode of the attached skate body, if there is one.
    fn physics_mode(&self) -> Option<LocomotionMode> {
        let physics = self.world.get::<&Follower>(self.entity).ok()?.physics?;
        let state = self.world.get::<&SkatePhysics>(physics).ok()?;
        Some(state.current_mode())
    }
}

impl Skaterface for SkaterView<'_> {
    /// Skate mode only. Near-vertical surfaces are ignored; otherwise the
    /// tracker faces `projected_forward` with the surface normal as up.
    fn orient_to_landing(&mut self, hit: &RayHit, _time_to_hit: f32, projected_forward: Vec3) {
        if self.physics_mode() != Some(LocomotionMode::Skate) || !hit.blocking {
            return;
        }
        if hit.normal.dot(Vec3::Z).abs() < MIN_LANDING_NORMAL_Z {
            return;
        }
        if let Ok(mut tracker) = self.world.get::<&mut RotationTracker>(self.entity) {
            tracker.face_with_up(projected_forward, hit.normal);
        }
    }

    fn grounded(&self) -> bool {
        self.world
            .get::<&Follower>(self.entity)
            .map(|f| f.grounded)
            .unwrap_or(false)
    }

    fn tracker_forward(&self) -> Vec3 {
        self.tracker().map(|t| t.forward()).unwrap_or(Vec3::ZERO)
    }

    fn tracker_right(&self) -> Vec3 {
        self.tracker().map(|t| t.right()).unwrap_or(Vec3::ZERO)
    }

    fn tracker_up(&self) -> Vec3 {
        self.tracker().map(|t| t.up()).unwrap_or(Vec3::ZERO)
    }
}

/// Moves `current` toward `target` by `dt * speed` of the remaining gap.
/// A non-positive speed jumps straight to the target.
pub fn interp_to(current: Vec3, target: Vec3, dt: f32, speed: f32) -> Vec3 {
    if speed <= 0.0 {
        return target;
    }
    let gap = target - current;
    if gap.length_squared() < 1e-8 {
        return target;
    }
    current + gap * (dt * speed).clamp(0.0, 1.0)
}

/// Drives one follower for one frame.
pub struct FollowerController<'w> {
    view: SkaterView<'w>,
    surfaces: &'w dyn SurfaceQuery,
}

impl<'w> FollowerController<'w> {
    pub fn new(world: &'w World, surfaces: &'w dyn SurfaceQuery, entity: Entity) -> Self {
        Self {
            view: SkaterView::new(world, entity),
            surfaces,
        }
    }

    fn world(&self) -> &'w World {
        self.view.world
    }

    /// The skate body this follower drives, or `None` in degraded mode.
    fn physics(&self) -> Option<SkateBody<'w>> {
        let follower = self.world().get::<&Follower>(self.view.entity).ok()?;
        let body = SkateBody::new(self.world(), self.surfaces, follower.physics?);
        body.is_live().then_some(body)
    }

    fn with_follower<R>(&self, f: impl FnOnce(&mut Follower) -> R) -> Option<R> {
        let mut follower = self.world().get::<&mut Follower>(self.view.entity).ok()?;
        Some(f(&mut follower))
    }

    fn with_tracker<R>(&self, f: impl FnOnce(&mut RotationTracker) -> R) -> Option<R> {
        let world = self.world();
        let mut tracker = world.get::<&mut RotationTracker>(self.view.entity).ok()?;
        Some(f(&mut tracker))
    }

    pub fn tick(&mut self, input: &SkateInput, dt: f32) {
        if !self.view.is_live() {
            return;
        }
        self.handle_input(input, dt);
        self.move_with_physics(dt);
        self.advance_cooldowns(dt);
        self.ground_adjust();
        self.update_presentation();
    }

    fn handle_input(&mut self, input: &SkateInput, dt: f32) {
        if input.pump {
            self.pump();
        }
        if let Some(axis) = input.lean {
            self.lean(axis, dt);
        }
        if input.lean_released {
            self.release_lean();
        }
        if input.ollie {
            self.ollie();
        }
    }

    fn pump(&mut self) {
        let Some(mut physics) = self.physics() else {
            return;
        };
        let ready = self
            .with_follower(|f| f.grounded && f.pump_cooldown.complete)
            .unwrap_or(false);
        if ready {
            physics.pump();
            self.with_follower(|f| f.pump_cooldown.arm());
        }
    }

    /// Above the lean speed the body is pushed sideways and the board swings
    /// toward the lean; below it the tracker turns in place.
    fn lean(&mut self, axis: f32, dt: f32) {
        let Some(mut physics) = self.physics() else {
            return;
        };
        if !self.view.grounded() {
            return;
        }
        let Some(config) = self.with_follower(|f| f.config.clone()) else {
            return;
        };

        if physics.velocity().length() > config.lean_min_speed {
            physics.lean(false, axis);
            let alpha = (dt * config.board_interp_speed).clamp(0.0, 1.0);
            let tilt = Quat::from_rotation_z((axis * config.board_lean_degrees).to_radians());
            self.with_follower(|f| {
                let target = f.mesh_rotation * tilt;
                f.board_rotation = f.board_rotation.slerp(target, alpha);
            });
        } else {
            self.with_tracker(|t| t.add_yaw(axis * config.at_rest_turn_degrees));
            physics.lean(true, axis);
        }
    }

    fn release_lean(&mut self) {
        if let Some(mut physics) = self.physics() {
            physics.lean(false, 0.0);
        }
        self.with_follower(|f| f.board_rotation = f.mesh_rotation);
    }

    fn ollie(&mut self) {
        let Some(mut physics) = self.physics() else {
            return;
        };
        if self.view.grounded() {
            physics.ollie();
        }
    }

    fn move_with_physics(&mut self, dt: f32) {
        let Some(physics) = self.physics() else {
            return;
        };
        let target = physics.position();
        let Some(speed) = self.with_follower(|f| f.config.follow_interp_speed) else {
            return;
        };
        if let Ok(mut local) = self.world().get::<&mut LocalTransform>(self.view.entity) {
            local.position = interp_to(local.position, target, dt, speed);
        }
    }

    fn advance_cooldowns(&mut self, dt: f32) {
        self.with_follower(|f| f.pump_cooldown.advance(dt));
    }

    fn ground_adjust(&mut self) {
        let Some(mut physics) = self.physics() else {
            return;
        };
        let ground = physics.report_ground_condition();

        if ground.blocking {
            let landed = self
                .with_follower(|f| {
                    f.ground_normal = ground.normal;
                    let landed = !f.grounded;
                    f.grounded = true;
                    if landed {
                        f.landings += 1;
                    }
                    landed
                })
                .unwrap_or(false);
            if landed {
                debug!("landed on {}", ground.normal);
            }

            let velocity = physics.velocity();
            let align = self
                .with_follower(|f| f.config.align_min_speed)
                .unwrap_or(f32::INFINITY);
            if velocity.length() > align {
                self.with_tracker(|t| t.face_with_up(velocity, ground.normal));
            }
            return;
        }

        let normal = self
            .with_follower(|f| {
                f.grounded = false;
                f.ground_normal
            })
            .unwrap_or(Vec3::Z);
        let rising = physics.velocity().z > 0.0;
        let off_a_wall = normal.truncate().length() > RAMP_WALL_NORMAL;
        if rising && off_a_wall {
            physics.flip_jump();
        } else {
            physics.air_trajectory_prediction();
        }
    }

    /// Camera takes the tracker's heading only; the mesh takes the full rotation.
    fn update_presentation(&mut self) {
        let Some(tracker) = self.view.tracker() else {
            return;
        };
        self.with_follower(|f| {
            f.camera_rotation = Quat::from_rotation_z(tracker.yaw());
            f.mesh_rotation = tracker.rotation;
        });
    }
}

/// Ticks every follower. Followers without a live skate body still move
/// their presentation but skip everything physical.
pub fn follower_system(world: &World, surfaces: &dyn SurfaceQuery, input: &SkateInput, dt: f32) {
    let followers: Vec<Entity> = world
        .query::<&Follower>()
        .with::<&RotationTracker>()
        .iter()
        .map(|(e, _)| e)
        .collect();

    for entity in followers {
        FollowerController::new(world, surfaces, entity).tick(input, dt);
    }
}

/// Logs followers that have no skate body to drive. Run once after spawning.
pub fn report_detached_followers(world: &World) -> usize {
    let mut detached = 0;
    for (entity, follower) in world.query::<&Follower>().iter() {
        let live = follower
            .physics
            .is_some_and(|p| world.get::<&SkatePhysics>(p).is_ok());
        if !live {
            warn!("follower {entity:?} has no skate body; running without physics");
            detached += 1;
        }
    }
    detached
}
