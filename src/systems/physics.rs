use glam::Vec3;
use hecs::{Entity, World};

use crate::components::{Channel, ChannelMask, Collider, LocalTransform, PhysicsBody, GRAVITY};

use super::raycast::closest_point_on_segment;

/// Default fixed step of the driver.
pub const PHYSICS_DT: f32 = 1.0 / 60.0;

struct StaticShape {
    collider: Collider,
    transform: LocalTransform,
}

/// One integrator step.
///
/// Simulating bodies get gravity, their accumulated force (as acceleration)
/// and impulse (as a velocity change), then move. Contacts against colliders
/// that block the physics channel push the body out and remove the inward
/// part of its velocity. Every body then latches its requested simulate flag
/// and drops its accumulators, simulating or not.
pub fn physics_step(world: &mut World, dt: f32) {
    // Collect first (drops the borrow), then resolve against the snapshot.
    let shapes: Vec<StaticShape> = world
        .query::<(&Collider, &LocalTransform, &ChannelMask)>()
        .iter()
        .filter(|(_, (_, _, mask))| mask.blocks(Channel::Physics))
        .map(|(_, (collider, transform, _))| StaticShape {
            collider: collider.clone(),
            transform: *transform,
        })
        .collect();

    for (_entity, (local, body)) in world.query_mut::<(&mut LocalTransform, &mut PhysicsBody)>() {
        if body.is_simulating() {
            // Semi-implicit Euler: update velocity first, then position
            body.velocity += (GRAVITY + body.force) * dt + body.impulse;
            local.position += body.velocity * dt;

            for shape in &shapes {
                if let Some((normal, depth)) = sphere_contact(shape, local.position, body.radius) {
                    local.position += normal * depth;
                    let into = body.velocity.dot(normal);
                    if into < 0.0 {
                        body.velocity -= normal * into;
                    }
                }
            }
        }
        body.finish_step();
    }
}

/// Contact normal (pointing out of the shape) and penetration depth.
fn sphere_contact(shape: &StaticShape, center: Vec3, radius: f32) -> Option<(Vec3, f32)> {
    match &shape.collider {
        Collider::Plane { normal, offset } => {
            let dist = center.dot(*normal) - offset;
            // Far behind a single-sided plane is not a contact.
            (dist < radius && dist > -radius).then(|| (*normal, radius - dist))
        }
        Collider::Sphere { radius: r } => {
            let diff = center - shape.transform.position;
            push_from_point(diff, r + radius)
        }
        Collider::Box { half_extents } => {
            let rotation = shape.transform.rotation;
            let local = rotation.inverse() * (center - shape.transform.position);
            let clamped = local.clamp(-*half_extents, *half_extents);
            if clamped != local {
                let closest = shape.transform.position + rotation * clamped;
                return push_from_point(center - closest, radius);
            }
            // Center inside the box: leave through the nearest face.
            let room = *half_extents - local.abs();
            let (axis, gap) = if room.x <= room.y && room.x <= room.z {
                (Vec3::X * local.x.signum(), room.x)
            } else if room.y <= room.z {
                (Vec3::Y * local.y.signum(), room.y)
            } else {
                (Vec3::Z * local.z.signum(), room.z)
            };
            Some((rotation * axis, gap + radius))
        }
        Collider::Polyline { points, radius: r } => points
            .windows(2)
            .map(|seg| center - closest_point_on_segment(seg[0], seg[1], center))
            .filter_map(|diff| push_from_point(diff, r + radius))
            .max_by(|a, b| a.1.total_cmp(&b.1)),
    }
}

fn push_from_point(diff: Vec3, reach: f32) -> Option<(Vec3, f32)> {
    let dist = diff.length();
    if dist >= reach {
        return None;
    }
    let normal = if dist > 1e-6 { diff / dist } else { Vec3::Z };
    Some((normal, reach - dist))
}

/// Moves a body explicitly. Used while the body is not simulating.
pub fn teleport(world: &World, entity: Entity, position: Vec3) {
    if let Ok(mut local) = world.get::<&mut LocalTransform>(entity) {
        local.position = position;
    }
}
