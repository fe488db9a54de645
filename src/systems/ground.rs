use glam::Vec3;

use crate::components::{Channel, GroundState};

use super::raycast::SurfaceQuery;

/// Fan-cast ground sensor.
///
/// A single straight-down ray misses steep ramps, so rays are swept from
/// straight down toward `forward` by each angle in `angles` (degrees), then
/// toward `right`. The first blocking hit in that order wins; if nothing
/// blocks, the result is a miss.
pub fn detect_ground<Q: SurfaceQuery + ?Sized>(
    surfaces: &Q,
    origin: Vec3,
    up: Vec3,
    forward: Vec3,
    right: Vec3,
    angles: &[f32],
    length: f32,
) -> GroundState {
    for axis in [forward, right] {
        for &angle in angles {
            let (sin, cos) = angle.to_radians().sin_cos();
            let end = origin + (-up * cos + axis * sin) * length;
            let hit = surfaces.raycast(origin, end, Channel::Visibility);
            if hit.blocking {
                return hit;
            }
        }
    }
    GroundState::miss()
}
