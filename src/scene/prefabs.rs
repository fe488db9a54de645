use glam::{Quat, Vec3};
use hecs::{Entity, World};

use crate::components::*;
use crate::config::{FollowerConfig, SimConfig};
use crate::rail::{Rail, RailSurface};

/// Radius of the skate body sphere.
pub const SKATER_RADIUS: f32 = 25.0;
/// Radius of the grind tube around a rail spline.
pub const RAIL_TUBE_RADIUS: f32 = 5.0;
/// Arc-length spacing of the collider samples along a curved rail.
const RAIL_SAMPLE_SPACING: f32 = 25.0;

/// Both halves of a skater.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SkaterHandles {
    pub body: Entity,
    pub follower: Entity,
}

/// Infinite ground plane at z = 0.
pub fn spawn_ground(world: &mut World) -> Entity {
    world.spawn((
        LocalTransform::new(Vec3::ZERO),
        Collider::Plane {
            normal: Vec3::Z,
            offset: 0.0,
        },
        ChannelMask::SOLID,
    ))
}

pub fn spawn_static_box(
    world: &mut World,
    pos: Vec3,
    half_extents: Vec3,
    rotation: Quat,
) -> Entity {
    world.spawn((
        LocalTransform::new(pos).with_rotation(rotation),
        Collider::Box { half_extents },
        ChannelMask::SOLID,
    ))
}

/// Flat slab rising at `angle_deg` toward +X, with its lower edge resting on
/// the ground at `foot` and its running surface `length` long.
pub fn spawn_ramp(
    world: &mut World,
    foot: Vec3,
    length: f32,
    width: f32,
    angle_deg: f32,
) -> Entity {
    const THICKNESS: f32 = 20.0;
    let rotation = Quat::from_rotation_y(-angle_deg.to_radians());
    let half_extents = Vec3::new(length / 2.0, width / 2.0, THICKNESS / 2.0);
    // Put the lower edge of the top face on `foot`.
    let center = foot - rotation * Vec3::new(-half_extents.x, 0.0, half_extents.z);
    spawn_static_box(world, center, half_extents, rotation)
}

/// Grindable rail: a tube collider sampled from `surface`, seen by ground
/// checks and grind detection but not collided with.
pub fn spawn_rail(world: &mut World, surface: impl RailSurface + 'static) -> Entity {
    let points = rail_collider_points(&surface);
    world.spawn((
        LocalTransform::new(Vec3::ZERO),
        Collider::Polyline {
            points,
            radius: RAIL_TUBE_RADIUS,
        },
        ChannelMask::VISIBILITY | ChannelMask::GRINDABLE,
        Rail::new(surface),
    ))
}

fn rail_collider_points(surface: &dyn RailSurface) -> Vec<Vec3> {
    let length = surface.spline_length();
    let segments = (length / RAIL_SAMPLE_SPACING).ceil().max(1.0) as usize;
    let step = length / segments as f32;
    (0..=segments)
        .map(|i| surface.snap_point_at(step * i as f32))
        .collect()
}

/// Physics body plus follower, cross-linked, with the tracker facing along
/// `velocity` (or +X when standing still).
pub fn spawn_skater(
    world: &mut World,
    pos: Vec3,
    velocity: Vec3,
    config: &SimConfig,
) -> SkaterHandles {
    let body = world.spawn((
        LocalTransform::new(pos),
        PhysicsBody::new(SKATER_RADIUS).with_velocity(velocity),
        SkatePhysics::new(config.skate.clone()),
    ));

    let mut tracker = RotationTracker::default();
    tracker.face(velocity);
    let mut follower = Follower::new(config.follower.clone(), Some(body));
    follower.camera_rotation = Quat::from_rotation_z(tracker.yaw());
    follower.mesh_rotation = tracker.rotation;
    follower.board_rotation = tracker.rotation;
    let follower = world.spawn((LocalTransform::new(pos), tracker, follower));

    if let Ok(mut state) = world.get::<&mut SkatePhysics>(body) {
        state.follower = Some(follower);
    }
    SkaterHandles { body, follower }
}

/// A follower with nothing to drive. It only presents itself; the warning
/// about it comes from `report_detached_followers`.
pub fn spawn_detached_follower(world: &mut World, pos: Vec3, config: FollowerConfig) -> Entity {
    world.spawn((
        LocalTransform::new(pos),
        RotationTracker::default(),
        Follower::new(config, None),
    ))
}
