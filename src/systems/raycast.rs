use glam::{Quat, Vec3};
use hecs::{Entity, World};

use crate::components::{Channel, ChannelMask, Collider, LocalTransform, RayHit};

/// Synchronous line traces against world geometry.
///
/// A miss is a normal answer, never an error.
pub trait SurfaceQuery {
    /// Trace the segment `origin..end` and return the nearest surface that
    /// blocks `channel`.
    fn raycast(&self, origin: Vec3, end: Vec3, channel: Channel) -> RayHit;
}

/// Casts against every entity carrying `(Collider, LocalTransform, ChannelMask)`.
pub struct WorldSurfaces<'w> {
    world: &'w World,
}

impl<'w> WorldSurfaces<'w> {
    pub fn new(world: &'w World) -> Self {
        Self { world }
    }
}

impl SurfaceQuery for WorldSurfaces<'_> {
    fn raycast(&self, origin: Vec3, end: Vec3, channel: Channel) -> RayHit {
        let delta = end - origin;
        let max_distance = delta.length();
        let Some(dir) = delta.try_normalize() else {
            return RayHit::miss();
        };

        let mut best: Option<(f32, Vec3, Entity)> = None;

        for (entity, (collider, transform, mask)) in self
            .world
            .query::<(&Collider, &LocalTransform, &ChannelMask)>()
            .iter()
        {
            if !mask.blocks(channel) {
                continue;
            }
            if let Some((t, normal)) = intersect(collider, transform, origin, dir) {
                if t <= max_distance && best.map_or(true, |(b, _, _)| t < b) {
                    best = Some((t, normal, entity));
                }
            }
        }

        match best {
            Some((distance, normal, entity)) => RayHit {
                blocking: true,
                point: origin + dir * distance,
                normal,
                distance,
                entity: Some(entity),
            },
            None => RayHit::miss(),
        }
    }
}

/// Distance along `dir` (unit) and surface normal of the first hit, if any.
pub fn intersect(
    collider: &Collider,
    transform: &LocalTransform,
    origin: Vec3,
    dir: Vec3,
) -> Option<(f32, Vec3)> {
    match collider {
        Collider::Sphere { radius } => {
            let center = transform.position;
            ray_sphere_intersection(origin, dir, center, *radius)
                .map(|t| (t, (origin + dir * t - center).normalize_or(-dir)))
        }
        Collider::Box { half_extents } => ray_box_intersection(
            origin,
            dir,
            transform.position,
            transform.rotation,
            *half_extents,
        ),
        Collider::Plane { normal, offset } => ray_plane_intersection(origin, dir, *normal, *offset),
        Collider::Polyline { points, radius } => points
            .windows(2)
            .filter_map(|pair| ray_capsule_intersection(origin, dir, pair[0], pair[1], *radius))
            .min_by(|a, b| a.0.total_cmp(&b.0)),
    }
}

fn ray_sphere_intersection(origin: Vec3, dir: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let oc = origin - center;
    let a = dir.dot(dir);
    let b = 2.0 * oc.dot(dir);
    let c = oc.dot(oc) - radius * radius;
    let discriminant = b * b - 4.0 * a * c;

    if discriminant < 0.0 {
        return None;
    }

    let sqrt_d = discriminant.sqrt();
    let t1 = (-b - sqrt_d) / (2.0 * a);
    let t2 = (-b + sqrt_d) / (2.0 * a);

    if t1 > 0.0 {
        Some(t1)
    } else if t2 > 0.0 {
        Some(t2)
    } else {
        None
    }
}

/// Single-sided: only rays travelling against the normal hit.
fn ray_plane_intersection(
    origin: Vec3,
    dir: Vec3,
    normal: Vec3,
    offset: f32,
) -> Option<(f32, Vec3)> {
    let denom = normal.dot(dir);
    if denom > -1e-6 {
        return None;
    }
    let t = (offset - normal.dot(origin)) / denom;
    (t >= 0.0).then_some((t, normal))
}

/// Oriented box. Rays starting inside the box report nothing.
fn ray_box_intersection(
    origin: Vec3,
    dir: Vec3,
    center: Vec3,
    rotation: Quat,
    half: Vec3,
) -> Option<(f32, Vec3)> {
    let inv = rotation.inverse();
    let o = inv * (origin - center);
    let d = inv * dir;

    let mut t_min = f32::NEG_INFINITY;
    let mut t_max = f32::INFINITY;
    let mut normal = Vec3::ZERO;

    for axis in 0..3 {
        let (o_i, d_i, h_i) = (o[axis], d[axis], half[axis]);
        if d_i.abs() < 1e-8 {
            if o_i.abs() > h_i {
                return None;
            }
            continue;
        }
        let t1 = (-h_i - o_i) / d_i;
        let t2 = (h_i - o_i) / d_i;
        let (near, far) = if t1 < t2 { (t1, t2) } else { (t2, t1) };
        if near > t_min {
            t_min = near;
            normal = Vec3::ZERO;
            normal[axis] = -d_i.signum();
        }
        t_max = t_max.min(far);
    }

    if t_min > t_max || t_min < 0.0 {
        return None;
    }
    Some((t_min, rotation * normal))
}

/// Capsule around the segment `a..b`: cylinder body plus two end spheres.
fn ray_capsule_intersection(
    origin: Vec3,
    dir: Vec3,
    a: Vec3,
    b: Vec3,
    radius: f32,
) -> Option<(f32, Vec3)> {
    let ba = b - a;
    let oa = origin - a;
    let baba = ba.dot(ba);
    let bard = ba.dot(dir);
    let baoa = ba.dot(oa);
    let rdoa = dir.dot(oa);
    let oaoa = oa.dot(oa);

    let mut best: Option<f32> = None;

    // Cylinder body. Skipped when the ray runs parallel to the axis; the caps
    // cover that case.
    let qa = baba - bard * bard;
    if qa > 1e-6 * baba.max(1.0) {
        let qb = baba * rdoa - baoa * bard;
        let qc = baba * oaoa - baoa * baoa - radius * radius * baba;
        let h = qb * qb - qa * qc;
        if h >= 0.0 {
            let t = (-qb - h.sqrt()) / qa;
            let y = baoa + t * bard;
            if t > 0.0 && y > 0.0 && y < baba {
                best = Some(t);
            }
        }
    }

    for cap in [a, b] {
        if let Some(t) = ray_sphere_intersection(origin, dir, cap, radius) {
            if best.map_or(true, |bt| t < bt) {
                best = Some(t);
            }
        }
    }

    best.map(|t| {
        let point = origin + dir * t;
        let axis_point = closest_point_on_segment(a, b, point);
        (t, (point - axis_point).normalize_or(-dir))
    })
}

pub fn closest_point_on_segment(a: Vec3, b: Vec3, p: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < 1e-12 {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn spawn(
        world: &mut World,
        collider: Collider,
        transform: LocalTransform,
        mask: ChannelMask,
    ) -> Entity {
        world.spawn((collider, transform, mask))
    }

    fn ground(world: &mut World) -> Entity {
        spawn(
            world,
            Collider::Plane {
                normal: Vec3::Z,
                offset: 0.0,
            },
            LocalTransform::new(Vec3::ZERO),
            ChannelMask::SOLID,
        )
    }

    fn vertical(from_z: f32, to_z: f32) -> (Vec3, Vec3) {
        (Vec3::new(0.0, 0.0, from_z), Vec3::new(0.0, 0.0, to_z))
    }

    #[test]
    fn plane_hit_and_miss() {
        let mut world = World::new();
        let plane = ground(&mut world);
        let surfaces = WorldSurfaces::new(&world);

        let from = Vec3::new(5.0, 0.0, 100.0);
        let to = Vec3::new(5.0, 0.0, -100.0);
        let hit = surfaces.raycast(from, to, Channel::Visibility);
        assert!(hit.blocking);
        assert_relative_eq!(hit.distance, 100.0);
        assert_eq!(hit.normal, Vec3::Z);
        assert_eq!(hit.entity, Some(plane));

        // Too short to reach.
        let (from, to) = vertical(100.0, 50.0);
        let hit = surfaces.raycast(from, to, Channel::Visibility);
        assert!(!hit.blocking);

        // From below the plane.
        let (from, to) = vertical(-10.0, 10.0);
        let hit = surfaces.raycast(from, to, Channel::Visibility);
        assert!(!hit.blocking);
    }

    #[test]
    fn channel_filtering() {
        let mut world = World::new();
        ground(&mut world);
        let surfaces = WorldSurfaces::new(&world);
        let (from, to) = vertical(10.0, -10.0);
        let hit = surfaces.raycast(from, to, Channel::Grindable);
        assert!(!hit.blocking);
    }

    #[test]
    fn degenerate_ray_misses() {
        let mut world = World::new();
        ground(&mut world);
        let surfaces = WorldSurfaces::new(&world);
        let hit = surfaces.raycast(Vec3::ZERO, Vec3::ZERO, Channel::Visibility);
        assert!(!hit.blocking);
    }

    #[test]
    fn tilted_box_reports_face_normal() {
        let mut world = World::new();
        let rotation = Quat::from_rotation_y(-30f32.to_radians());
        spawn(
            &mut world,
            Collider::Box {
                half_extents: Vec3::new(200.0, 200.0, 20.0),
            },
            LocalTransform::new(Vec3::ZERO).with_rotation(rotation),
            ChannelMask::SOLID,
        );
        let surfaces = WorldSurfaces::new(&world);
        let (from, to) = vertical(100.0, -100.0);
        let hit = surfaces.raycast(from, to, Channel::Visibility);
        assert!(hit.blocking);
        let expected = rotation * Vec3::Z;
        assert_relative_eq!(hit.normal.dot(expected), 1.0, epsilon = 1e-5);
        // Top face sits 20 / cos(30deg) above the centre along the ray.
        let top = 20.0 / 30f32.to_radians().cos();
        assert_relative_eq!(hit.point.z, top, epsilon = 1e-3);
    }

    #[test]
    fn ray_starting_inside_box_misses() {
        let mut world = World::new();
        spawn(
            &mut world,
            Collider::Box {
                half_extents: Vec3::splat(10.0),
            },
            LocalTransform::new(Vec3::ZERO),
            ChannelMask::SOLID,
        );
        let surfaces = WorldSurfaces::new(&world);
        let (from, to) = vertical(0.0, -50.0);
        let hit = surfaces.raycast(from, to, Channel::Visibility);
        assert!(!hit.blocking);
    }

    #[test]
    fn rail_tube_hit_head_on() {
        let mut world = World::new();
        spawn(
            &mut world,
            Collider::Polyline {
                points: vec![Vec3::new(30.0, 0.0, 25.0), Vec3::new(530.0, 0.0, 25.0)],
                radius: 5.0,
            },
            LocalTransform::new(Vec3::ZERO),
            ChannelMask::GRINDABLE,
        );
        let surfaces = WorldSurfaces::new(&world);
        let from = Vec3::new(0.0, 0.0, 25.0);
        let to = Vec3::new(300.0, 0.0, 25.0);
        let hit = surfaces.raycast(from, to, Channel::Grindable);
        assert!(hit.blocking);
        assert_relative_eq!(hit.distance, 25.0, epsilon = 1e-3);
        assert_relative_eq!(hit.normal.x, -1.0, epsilon = 1e-4);
    }

    #[test]
    fn rail_tube_hit_from_above() {
        let mut world = World::new();
        spawn(
            &mut world,
            Collider::Polyline {
                points: vec![Vec3::new(-100.0, 0.0, 0.0), Vec3::new(100.0, 0.0, 0.0)],
                radius: 5.0,
            },
            LocalTransform::new(Vec3::ZERO),
            ChannelMask::GRINDABLE,
        );
        let surfaces = WorldSurfaces::new(&world);
        let from = Vec3::new(10.0, 0.0, 40.0);
        let to = Vec3::new(10.0, 0.0, -40.0);
        let hit = surfaces.raycast(from, to, Channel::Grindable);
        assert!(hit.blocking);
        assert_relative_eq!(hit.distance, 35.0, epsilon = 1e-3);
        assert_relative_eq!(hit.normal.z, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn nearest_surface_wins() {
        let mut world = World::new();
        ground(&mut world);
        let sphere = spawn(
            &mut world,
            Collider::Sphere { radius: 10.0 },
            LocalTransform::new(Vec3::new(0.0, 0.0, 50.0)),
            ChannelMask::SOLID,
        );
        let surfaces = WorldSurfaces::new(&world);
        let (from, to) = vertical(100.0, -100.0);
        let hit = surfaces.raycast(from, to, Channel::Visibility);
        assert_eq!(hit.entity, Some(sphere));
        assert_relative_eq!(hit.distance, 40.0, epsilon = 1e-4);
    }
}
