//! Physics-side skate body.
//!
//! [`SkateBody`] is a short-lived handle over one entity carrying
//! `SkatePhysics`, `PhysicsBody` and `LocalTransform`. It borrows components
//! only for the duration of each small read or write, so it can freely call
//! into the follower (which calls back into the body) without tripping hecs'
//! dynamic borrow checks.

use glam::Vec3;
use hecs::{Entity, World};
use log::{debug, info};

use crate::components::{
    DeferredOllie, GrindSession, GroundState, LocalTransform, LocomotionMode, PhysicsBody,
    SkatePhysics,
};
use crate::interface::Skaterface;

use super::follower::SkaterView;
use super::ground::detect_ground;
use super::physics::teleport;
use super::raycast::SurfaceQuery;

pub struct SkateBody<'w> {
    pub(crate) world: &'w World,
    pub(crate) surfaces: &'w dyn SurfaceQuery,
    entity: Entity,
}

impl<'w> SkateBody<'w> {
    pub fn new(world: &'w World, surfaces: &'w dyn SurfaceQuery, entity: Entity) -> Self {
        Self {
            world,
            surfaces,
            entity,
        }
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Whether the entity carries everything a skate body needs.
    pub fn is_live(&self) -> bool {
        self.world.get::<&SkatePhysics>(self.entity).is_ok()
            && self.world.get::<&PhysicsBody>(self.entity).is_ok()
    }

    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut SkatePhysics) -> R) -> Option<R> {
        let mut state = self.world.get::<&mut SkatePhysics>(self.entity).ok()?;
        Some(f(&mut state))
    }

    pub(crate) fn with_body<R>(&self, f: impl FnOnce(&mut PhysicsBody) -> R) -> Option<R> {
        let mut body = self.world.get::<&mut PhysicsBody>(self.entity).ok()?;
        Some(f(&mut body))
    }

    pub fn position(&self) -> Vec3 {
        self.world
            .get::<&LocalTransform>(self.entity)
            .map(|t| t.position)
            .unwrap_or(Vec3::ZERO)
    }

    pub(crate) fn set_position(&self, position: Vec3) {
        teleport(self.world, self.entity, position);
    }

    /// The attached follower, if it is still alive.
    pub fn follower(&self) -> Option<SkaterView<'w>> {
        let follower = self.with_state(|s| s.follower).flatten()?;
        let view = SkaterView::new(self.world, follower);
        view.is_live().then_some(view)
    }

    /// Tracker forward of the follower, or `fallback` when there is none.
    pub(crate) fn facing_or(&self, fallback: Vec3) -> Vec3 {
        self.follower()
            .map(|f| f.tracker_forward())
            .filter(|f| *f != Vec3::ZERO)
            .unwrap_or(fallback)
    }

    /// One frame of skate logic; the integrator runs afterwards.
    pub fn tick(&mut self, dt: f32) {
        let Some(mode) = self.with_state(|s| {
            if s.mode.just_entered() {
                debug!("{:?} -> {:?}", s.mode.previous, s.mode.state);
            }
            s.mode.tick(dt);
            s.current_mode()
        }) else {
            return;
        };

        match mode {
            LocomotionMode::Skate => {
                self.check_grinding();
                self.clamp_velocity();
                self.stick_to_ground();
                self.apply_pump(dt);
                self.advance_grind_cooldown(dt);
                self.fire_deferred_ollie();
            }
            LocomotionMode::Grind => self.grind(dt),
        }
    }

    /// Lock onto a rail: physics off, velocity captured in `session`.
    pub(crate) fn enter_grind(&mut self, session: GrindSession) {
        let speed = session.initial_speed;
        let entered = self
            .with_state(|s| {
                if !s.mode.go(LocomotionMode::Grind) {
                    return false;
                }
                s.pump = None;
                s.grind = Some(session);
                true
            })
            .unwrap_or(false);
        if entered {
            self.with_body(|b| b.set_simulate_physics(false));
            info!("grind started at {speed:.0} u/s");
        }
    }

    /// Leave a grind and hand the body back to the integrator, moving along
    /// the tracker forward at the entry speed. Arms the grind cooldown.
    /// Does nothing outside `Grind`.
    pub fn cancel_grind(&mut self) {
        let Some((session, elapsed)) = self
            .with_state(|s| {
                let elapsed = s.mode.elapsed;
                if !s.mode.go(LocomotionMode::Skate) {
                    return None;
                }
                s.grind_cooldown.arm();
                Some((s.grind.take(), elapsed))
            })
            .flatten()
        else {
            return;
        };

        let (speed, fallback) = session
            .map(|g| (g.initial_speed, g.entry_direction))
            .unwrap_or((0.0, Vec3::ZERO));
        let velocity = self.facing_or(fallback) * speed;
        self.with_body(|b| {
            b.velocity = velocity;
            b.set_simulate_physics(true);
        });
        info!("grind ended after {elapsed:.2}s, leaving at {speed:.0} u/s");
    }

    fn advance_grind_cooldown(&self, dt: f32) {
        if self.with_state(|s| s.grind_cooldown.advance(dt)) == Some(true) {
            debug!("grind cooldown complete");
        }
    }

    /// An ollie queued during a grind fires once the body simulates again.
    fn fire_deferred_ollie(&mut self) {
        let pending = self.with_state(|s| s.deferred_ollie == DeferredOllie::Requested);
        let simulating = self.with_body(|b| b.is_simulating());
        if pending == Some(true) && simulating == Some(true) {
            self.with_state(|s| s.deferred_ollie = DeferredOllie::Idle);
            self.ollie();
        }
    }
}

impl Skaterface for SkateBody<'_> {
    fn pump(&mut self) {
        self.start_pump();
    }

    fn lean(&mut self, at_rest: bool, axis_value: f32) {
        self.apply_lean(at_rest, axis_value);
    }

    fn ollie(&mut self) {
        self.jump();
    }

    fn flip_jump(&mut self) {
        self.cancel_ramp_carry();
    }

    fn air_trajectory_prediction(&mut self) {
        self.predict_and_orient();
    }

    /// Fan-casts from the body. The follower's camera heading gives the fan
    /// its forward and right planes.
    fn report_ground_condition(&mut self) -> GroundState {
        let (forward, right) = self
            .follower()
            .map(|f| f.camera_axes())
            .unwrap_or((Vec3::X, Vec3::NEG_Y));
        let origin = self.position();

        let Ok(state) = self.world.get::<&SkatePhysics>(self.entity) else {
            return GroundState::miss();
        };
        let ground = detect_ground(
            self.surfaces,
            origin,
            Vec3::Z,
            forward,
            right,
            &state.config.ground_check_angles,
            state.config.ground_check_length,
        );
        drop(state);

        if ground.blocking {
            self.with_state(|s| s.last_ground_normal = ground.normal);
        }
        ground
    }

    fn velocity(&self) -> Vec3 {
        self.with_body(|b| b.velocity).unwrap_or(Vec3::ZERO)
    }

    fn mode(&self) -> LocomotionMode {
        self.with_state(|s| s.current_mode()).unwrap_or_default()
    }
}

/// Runs [`SkateBody::tick`] for every skate body in the world.
pub fn skate_physics_system(world: &World, surfaces: &dyn SurfaceQuery, dt: f32) {
    let bodies: Vec<Entity> = world
        .query::<&SkatePhysics>()
        .with::<&PhysicsBody>()
        .iter()
        .map(|(e, _)| e)
        .collect();

    for entity in bodies {
        SkateBody::new(world, surfaces, entity).tick(dt);
    }
}
