use glam::Vec3;
use log::warn;

use crate::components::{Channel, GrindSession};
use crate::interface::Skaterface;
use crate::rail::Rail;

use super::skate::SkateBody;

/// A rail must be closer than this along the velocity ray to be grabbed.
pub const GRIND_REACH: f32 = 50.0;
/// Minimum speed for a grind to start.
pub const GRIND_MIN_SPEED: f32 = 250.0;
/// Minimum `|cos|` between the velocity and the rail tangent.
pub const GRIND_ALIGNMENT: f32 = 0.9;

/// Outcome of testing one grindable hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GrindCandidate {
    pub distance_ok: bool,
    pub speed_ok: bool,
    pub aligned: bool,
    /// Travelling toward increasing rail distance.
    pub along: bool,
}

impl GrindCandidate {
    pub fn evaluate(hit_distance: f32, velocity: Vec3, tangent: Vec3) -> Self {
        let cos = tangent.dot(velocity.normalize_or_zero());
        Self {
            distance_ok: hit_distance < GRIND_REACH,
            speed_ok: velocity.length() > GRIND_MIN_SPEED,
            aligned: cos.abs() > GRIND_ALIGNMENT,
            along: cos > 0.0,
        }
    }

    pub fn accepted(&self) -> bool {
        self.distance_ok && self.speed_ok && self.aligned
    }
}

impl SkateBody<'_> {
    /// Casts along the velocity on the grindable channel and locks onto the
    /// rail when close, fast and aligned enough. Skipped during the grind
    /// cooldown.
    pub(crate) fn check_grinding(&mut self) {
        if self.with_state(|s| s.grind_cooldown.complete) != Some(true) {
            return;
        }
        let Some(z_offset) = self.with_state(|s| s.config.grind_z_offset) else {
            return;
        };

        let origin = self.position();
        let velocity = self.velocity();
        let target = origin + velocity;
        let hit = self.surfaces.raycast(origin, target, Channel::Grindable);
        if !hit.blocking {
            return;
        }
        let Some(rail_entity) = hit.entity else {
            return;
        };
        let Ok(rail) = self.world.get::<&Rail>(rail_entity) else {
            warn!("grindable surface {rail_entity:?} has no rail attached");
            return;
        };

        let tangent = rail.0.tangent_near(hit.point);
        let candidate = GrindCandidate::evaluate(hit.distance, velocity, tangent);
        if !candidate.accepted() {
            return;
        }

        let session = GrindSession {
            rail: rail_entity,
            distance: rail.0.initial_distance(hit.point),
            length: rail.0.spline_length(),
            initial_speed: velocity.length(),
            entry_direction: velocity.normalize_or_zero(),
            along: candidate.along,
            initial_snap_done: false,
            snap_point: rail.0.initial_snap_point(hit.point),
            z_offset,
        };
        drop(rail);
        self.enter_grind(session);
    }

    /// One grind frame. The first frame only snaps onto the rail; later frames
    /// advance by `initial_speed * dt` and leave the grind once the distance
    /// runs off either end.
    pub(crate) fn grind(&mut self, dt: f32) {
        let Some(mut session) = self.with_state(|s| s.grind.clone()).flatten() else {
            self.cancel_grind();
            return;
        };

        if !session.initial_snap_done {
            self.set_position(session.snap_point + Vec3::Z * session.z_offset);
            self.with_state(|s| {
                if let Some(g) = s.grind.as_mut() {
                    g.initial_snap_done = true;
                }
            });
            return;
        }

        let step = session.initial_speed * dt;
        session.distance += if session.along { step } else { -step };
        let distance = session.distance;
        self.with_state(|s| {
            if let Some(g) = s.grind.as_mut() {
                g.distance = distance;
            }
        });
        if session.is_past_end() {
            self.cancel_grind();
            return;
        }

        let Ok(rail) = self.world.get::<&Rail>(session.rail) else {
            warn!("rail {:?} vanished mid-grind", session.rail);
            self.cancel_grind();
            return;
        };
        let point = rail.0.snap_point_at(distance);
        let tangent = rail.0.tangent_at(distance);
        drop(rail);

        let facing = if session.along { tangent } else { -tangent };
        self.set_position(point + Vec3::Z * session.z_offset);
        // Kinematic while grinding; report the rail velocity.
        self.with_body(|b| b.velocity = facing * session.initial_speed);
        if let Some(follower) = self.follower() {
            follower.face(facing);
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use hecs::{Entity, World};

    use super::*;
    use crate::components::{
        ChannelMask, Collider, Follower, LocalTransform, LocomotionMode, PhysicsBody,
        RotationTracker, SkatePhysics,
    };
    use crate::config::{FollowerConfig, SkateConfig};
    use crate::rail::PolylineRail;
    use crate::systems::raycast::{SurfaceQuery, WorldSurfaces};

    const DT: f32 = 1.0 / 60.0;

    /// Straight rail along +X from x = 0 to x = 1000 at z = 0.
    fn rail(world: &mut World) -> Entity {
        let points = vec![Vec3::ZERO, Vec3::new(1000.0, 0.0, 0.0)];
        world.spawn((
            Collider::Polyline {
                points: points.clone(),
                radius: 5.0,
            },
            LocalTransform::new(Vec3::ZERO),
            ChannelMask::VISIBILITY | ChannelMask::GRINDABLE,
            Rail::new(PolylineRail::new(points).unwrap()),
        ))
    }

    fn skater(world: &mut World, position: Vec3, velocity: Vec3) -> Entity {
        world.spawn((
            LocalTransform::new(position),
            PhysicsBody::new(25.0).with_velocity(velocity),
            SkatePhysics::new(SkateConfig::default()),
        ))
    }

    /// Skater at x = -30 rolling toward the rail at `speed`.
    fn approaching(world: &mut World, speed: f32) -> Entity {
        let position = Vec3::new(-30.0, 0.0, 0.0);
        skater(world, position, Vec3::new(speed, 0.0, 0.0))
    }

    fn attach_follower(world: &mut World, body: Entity) -> Entity {
        let follower = world.spawn((
            LocalTransform::new(Vec3::ZERO),
            RotationTracker::default(),
            Follower::new(FollowerConfig::default(), Some(body)),
        ));
        world.get::<&mut SkatePhysics>(body).unwrap().follower = Some(follower);
        follower
    }

    fn grind_distance(skate: &SkateBody) -> Option<f32> {
        skate
            .with_state(|s| s.grind.as_ref().map(|g| g.distance))
            .flatten()
    }

    #[test]
    fn candidate_thresholds() {
        let fast = Vec3::new(300.0, 0.0, 0.0);
        let slow = Vec3::new(250.0, 0.0, 0.0);
        assert!(GrindCandidate::evaluate(25.0, fast, Vec3::X).accepted());
        assert!(!GrindCandidate::evaluate(50.0, fast, Vec3::X).accepted());
        assert!(!GrindCandidate::evaluate(25.0, slow, Vec3::X).accepted());
        // cos(30 degrees) is below the alignment threshold.
        let skewed = Vec3::new(300.0 * 0.866, 150.0, 0.0);
        assert!(!GrindCandidate::evaluate(25.0, skewed, Vec3::X).aligned);

        let backwards = GrindCandidate::evaluate(25.0, -fast, Vec3::X);
        assert!(backwards.accepted());
        assert!(!backwards.along);
    }

    #[test]
    fn fast_aligned_skater_locks_on() {
        let mut world = World::new();
        let rail = rail(&mut world);
        let body = approaching(&mut world, 300.0);
        let surfaces = WorldSurfaces::new(&world);
        let mut skate = SkateBody::new(&world, &surfaces, body);

        skate.check_grinding();
        assert_eq!(skate.mode(), LocomotionMode::Grind);
        let session = skate.with_state(|s| s.grind.clone()).flatten().unwrap();
        assert_eq!(session.rail, rail);
        assert!(session.along);
        assert_relative_eq!(session.initial_speed, 300.0);
        assert_relative_eq!(session.length, 1000.0);
    }

    #[test]
    fn rail_beyond_grab_distance_is_ignored() {
        let mut world = World::new();
        rail(&mut world);
        // The tube starts at x = -5, so the hit lands 75 units out.
        let position = Vec3::new(-80.0, 0.0, 0.0);
        let velocity = Vec3::new(300.0, 0.0, 0.0);
        let body = skater(&mut world, position, velocity);
        let surfaces = WorldSurfaces::new(&world);

        let hit = surfaces.raycast(position, position + velocity, Channel::Grindable);
        assert!(hit.blocking);
        let candidate = GrindCandidate::evaluate(hit.distance, velocity, Vec3::X);
        assert!(!candidate.distance_ok);
        assert!(candidate.speed_ok && candidate.aligned);

        let mut skate = SkateBody::new(&world, &surfaces, body);
        skate.check_grinding();
        assert_eq!(skate.mode(), LocomotionMode::Skate);
        assert_eq!(grind_distance(&skate), None);
    }

    #[test]
    fn slow_skater_does_not_grind() {
        let mut world = World::new();
        rail(&mut world);
        let body = approaching(&mut world, 250.0);
        let surfaces = WorldSurfaces::new(&world);
        let mut skate = SkateBody::new(&world, &surfaces, body);
        skate.check_grinding();
        assert_eq!(skate.mode(), LocomotionMode::Skate);
    }

    #[test]
    fn cooldown_blocks_detection() {
        let mut world = World::new();
        rail(&mut world);
        let body = approaching(&mut world, 300.0);
        let mut state = world.get::<&mut SkatePhysics>(body).unwrap();
        state.grind_cooldown.arm();
        drop(state);
        let surfaces = WorldSurfaces::new(&world);
        let mut skate = SkateBody::new(&world, &surfaces, body);
        skate.check_grinding();
        assert_eq!(skate.mode(), LocomotionMode::Skate);
    }

    #[test]
    fn grindable_surface_without_rail_is_skipped() {
        let mut world = World::new();
        world.spawn((
            Collider::Plane {
                normal: Vec3::NEG_X,
                offset: 0.0,
            },
            LocalTransform::new(Vec3::ZERO),
            ChannelMask::GRINDABLE,
        ));
        let body = approaching(&mut world, 300.0);
        let surfaces = WorldSurfaces::new(&world);
        let mut skate = SkateBody::new(&world, &surfaces, body);
        skate.check_grinding();
        assert_eq!(skate.mode(), LocomotionMode::Skate);
    }

    #[test]
    fn traversal_snaps_then_advances_then_exits() {
        let mut world = World::new();
        let rail = rail(&mut world);
        let body = skater(&mut world, Vec3::new(0.0, 0.0, 100.0), Vec3::ZERO);
        let surfaces = WorldSurfaces::new(&world);
        let mut skate = SkateBody::new(&world, &surfaces, body);
        skate.enter_grind(GrindSession {
            rail,
            distance: 990.0,
            length: 1000.0,
            initial_speed: 300.0,
            entry_direction: Vec3::X,
            along: true,
            initial_snap_done: false,
            snap_point: Vec3::new(990.0, 0.0, 0.0),
            z_offset: 50.0,
        });

        // First frame: snap only.
        skate.grind(DT);
        assert_eq!(skate.position(), Vec3::new(990.0, 0.0, 50.0));
        assert_eq!(grind_distance(&skate), Some(990.0));

        // 990 + 5 stays on the rail.
        skate.grind(DT);
        assert_eq!(skate.mode(), LocomotionMode::Grind);
        assert_relative_eq!(skate.position().x, 995.0, epsilon = 1e-3);
        assert_relative_eq!(skate.velocity().x, 300.0, epsilon = 1e-3);

        // 995 + 5 lands exactly on the end: still grinding.
        skate.grind(DT);
        assert_eq!(skate.mode(), LocomotionMode::Grind);

        // First frame past the end leaves the grind.
        skate.grind(DT);
        assert_eq!(skate.mode(), LocomotionMode::Skate);
        assert!(skate.with_body(|b| b.simulate_requested()).unwrap());
        assert!(!skate.with_state(|s| s.grind_cooldown.complete).unwrap());
        assert_relative_eq!(skate.velocity().length(), 300.0, epsilon = 1e-3);
    }

    #[test]
    fn traversal_against_the_rail_runs_backwards_and_exits_below_zero() {
        // 320 u/s over 1/32 s is exactly 10 units a frame.
        const STEP_DT: f32 = 1.0 / 32.0;

        let mut world = World::new();
        let rail = rail(&mut world);
        let body = skater(&mut world, Vec3::new(20.0, 0.0, 100.0), Vec3::ZERO);
        let follower = attach_follower(&mut world, body);
        let surfaces = WorldSurfaces::new(&world);
        let mut skate = SkateBody::new(&world, &surfaces, body);
        skate.enter_grind(GrindSession {
            rail,
            distance: 20.0,
            length: 1000.0,
            initial_speed: 320.0,
            entry_direction: Vec3::NEG_X,
            along: false,
            initial_snap_done: false,
            snap_point: Vec3::new(20.0, 0.0, 0.0),
            z_offset: 50.0,
        });

        skate.grind(STEP_DT);
        assert_eq!(grind_distance(&skate), Some(20.0));

        skate.grind(STEP_DT);
        assert_eq!(grind_distance(&skate), Some(10.0));
        assert_relative_eq!(skate.position().x, 10.0, epsilon = 1e-3);
        assert_relative_eq!(skate.velocity().x, -320.0, epsilon = 1e-3);
        let forward = world.get::<&RotationTracker>(follower).unwrap().forward();
        assert_relative_eq!(forward.x, -1.0, epsilon = 1e-5);

        // Distance 0 is still on the rail.
        skate.grind(STEP_DT);
        assert_eq!(skate.mode(), LocomotionMode::Grind);
        assert_eq!(grind_distance(&skate), Some(0.0));

        // First frame below 0 leaves along the tracker at the entry speed.
        skate.grind(STEP_DT);
        assert_eq!(skate.mode(), LocomotionMode::Skate);
        assert_eq!(grind_distance(&skate), None);
        assert!(!skate.with_state(|s| s.grind_cooldown.complete).unwrap());
        let v = skate.velocity();
        assert_relative_eq!(v.length(), 320.0, epsilon = 1e-3);
        assert_relative_eq!(v.x, -320.0, epsilon = 1e-3);
    }

    #[test]
    fn zero_length_rail_exits_with_finite_velocity() {
        let mut world = World::new();
        let body = skater(&mut world, Vec3::ZERO, Vec3::new(400.0, 0.0, 0.0));
        let surfaces = WorldSurfaces::new(&world);
        let mut skate = SkateBody::new(&world, &surfaces, body);
        skate.enter_grind(GrindSession {
            rail: Entity::DANGLING,
            distance: 0.0,
            length: 0.0,
            initial_speed: 400.0,
            entry_direction: Vec3::X,
            along: true,
            initial_snap_done: false,
            snap_point: Vec3::ZERO,
            z_offset: 50.0,
        });
        skate.grind(DT);
        skate.grind(DT);
        assert_eq!(skate.mode(), LocomotionMode::Skate);
        let v = skate.velocity();
        assert!(v.is_finite());
        assert_relative_eq!(v.length(), 400.0, epsilon = 1e-3);
    }
}
