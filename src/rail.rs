//! Grindable rail surfaces.
//!
//! Anything the skater can grind implements [`RailSurface`]: a curve
//! parameterised by arc length. Distances passed in are clamped to
//! `[0, spline_length()]`.

use std::f32::consts::TAU;

use glam::Vec3;

use crate::error::RailError;

pub trait RailSurface: Send + Sync {
    /// Total arc length of the rail.
    fn spline_length(&self) -> f32;

    /// Arc-length distance of the curve point closest to `point`.
    fn distance_near(&self, point: Vec3) -> f32;

    /// World-space curve point at `distance`.
    fn snap_point_at(&self, distance: f32) -> Vec3;

    /// Unit tangent at `distance`, pointing toward increasing distance.
    fn tangent_at(&self, distance: f32) -> Vec3;

    fn tangent_near(&self, point: Vec3) -> Vec3 {
        self.tangent_at(self.distance_near(point))
    }

    fn initial_snap_point(&self, point: Vec3) -> Vec3 {
        self.snap_point_at(self.distance_near(point))
    }

    fn initial_distance(&self, point: Vec3) -> f32 {
        self.distance_near(point)
    }
}

/// Component: the entity's grind collider belongs to this rail.
pub struct Rail(pub Box<dyn RailSurface>);

impl Rail {
    pub fn new(surface: impl RailSurface + 'static) -> Self {
        Self(Box::new(surface))
    }
}

// ---------------------------------------------------------------------------
// Polyline (static spline)
// ---------------------------------------------------------------------------

/// Piecewise-linear rail through a list of points.
pub struct PolylineRail {
    points: Vec<Vec3>,
    /// `cumulative[i]` = arc length from the first point to `points[i]`.
    cumulative: Vec<f32>,
}

impl PolylineRail {
    pub fn new(points: Vec<Vec3>) -> Result<Self, RailError> {
        if points.len() < 2 {
            return Err(RailError::TooFewPoints(points.len()));
        }
        if let Some(i) = points.iter().position(|p| !p.is_finite()) {
            return Err(RailError::NonFinitePoint(i));
        }
        let mut cumulative = Vec::with_capacity(points.len());
        let mut total = 0.0;
        cumulative.push(0.0);
        for pair in points.windows(2) {
            total += pair[0].distance(pair[1]);
            cumulative.push(total);
        }
        Ok(Self { points, cumulative })
    }

    /// Sample a Catmull-Rom spline through `control` points. The curve passes
    /// through every control point; end segments reuse the end points as
    /// their outer neighbours.
    pub fn from_catmull_rom(
        control: &[Vec3],
        samples_per_segment: usize,
    ) -> Result<Self, RailError> {
        if control.len() < 2 {
            return Err(RailError::TooFewPoints(control.len()));
        }
        let samples = samples_per_segment.max(1);
        let last = control.len() - 1;
        let mut points = Vec::with_capacity(last * samples + 1);
        for i in 0..last {
            let p0 = control[i.saturating_sub(1)];
            let p1 = control[i];
            let p2 = control[i + 1];
            let p3 = control[(i + 2).min(last)];
            for s in 0..samples {
                let t = s as f32 / samples as f32;
                points.push(catmull_rom(p0, p1, p2, p3, t));
            }
        }
        points.push(control[last]);
        Self::new(points)
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Segment index containing `distance` and the interpolation factor inside it.
    fn locate(&self, distance: f32) -> (usize, f32) {
        let d = distance.clamp(0.0, self.spline_length());
        let segments = self.points.len() - 1;
        let i = self
            .cumulative
            .partition_point(|&c| c <= d)
            .saturating_sub(1)
            .min(segments - 1);
        let len = self.cumulative[i + 1] - self.cumulative[i];
        let t = if len > 0.0 {
            (d - self.cumulative[i]) / len
        } else {
            0.0
        };
        (i, t)
    }

    fn fallback_direction(&self) -> Vec3 {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];
        (last - first).normalize_or(Vec3::X)
    }
}

impl RailSurface for PolylineRail {
    fn spline_length(&self) -> f32 {
        self.cumulative[self.cumulative.len() - 1]
    }

    fn distance_near(&self, point: Vec3) -> f32 {
        let mut best = (f32::INFINITY, 0.0);
        for (i, pair) in self.points.windows(2).enumerate() {
            let ab = pair[1] - pair[0];
            let len_sq = ab.length_squared();
            let t = if len_sq > 0.0 {
                ((point - pair[0]).dot(ab) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let dist_sq = point.distance_squared(pair[0] + ab * t);
            if dist_sq < best.0 {
                best = (dist_sq, self.cumulative[i] + t * len_sq.sqrt());
            }
        }
        best.1
    }

    fn snap_point_at(&self, distance: f32) -> Vec3 {
        let (i, t) = self.locate(distance);
        self.points[i].lerp(self.points[i + 1], t)
    }

    fn tangent_at(&self, distance: f32) -> Vec3 {
        let (i, _) = self.locate(distance);
        let segment = self.points[i + 1] - self.points[i];
        segment.normalize_or(self.fallback_direction())
    }
}

fn catmull_rom(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32) -> Vec3 {
    let t2 = t * t;
    let t3 = t2 * t;
    let linear = (p2 - p0) * t;
    let quadratic = (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2;
    let cubic = (3.0 * p1 - p0 - 3.0 * p2 + p3) * t3;
    0.5 * (2.0 * p1 + linear + quadratic + cubic)
}

// ---------------------------------------------------------------------------
// Arc (procedural curve)
// ---------------------------------------------------------------------------

/// Horizontal circular arc, e.g. the lip of a bowl.
pub struct ArcRail {
    pub center: Vec3,
    pub radius: f32,
    /// Angle of the start point around +Z, radians.
    pub start_angle: f32,
    /// Signed sweep, radians. Positive runs counter-clockwise seen from above.
    pub sweep: f32,
}

impl ArcRail {
    pub fn new(center: Vec3, radius: f32, start_angle: f32, sweep: f32) -> Result<Self, RailError> {
        if !(radius > 0.0 && radius.is_finite()) {
            return Err(RailError::InvalidRadius(radius));
        }
        Ok(Self {
            center,
            radius,
            start_angle,
            sweep: sweep.clamp(-TAU, TAU),
        })
    }

    fn angle_at(&self, distance: f32) -> f32 {
        let d = distance.clamp(0.0, self.spline_length());
        self.start_angle + self.sweep.signum() * d / self.radius
    }
}

impl RailSurface for ArcRail {
    fn spline_length(&self) -> f32 {
        self.radius * self.sweep.abs()
    }

    fn distance_near(&self, point: Vec3) -> f32 {
        let offset = point - self.center;
        if offset.truncate().length_squared() == 0.0 {
            return 0.0;
        }
        let angle = offset.y.atan2(offset.x);
        let along = ((angle - self.start_angle) * self.sweep.signum()).rem_euclid(TAU);
        let span = self.sweep.abs();
        let along = if along <= span {
            along
        } else if along - span < TAU - along {
            span
        } else {
            0.0
        };
        along * self.radius
    }

    fn snap_point_at(&self, distance: f32) -> Vec3 {
        let angle = self.angle_at(distance);
        self.center + Vec3::new(angle.cos(), angle.sin(), 0.0) * self.radius
    }

    fn tangent_at(&self, distance: f32) -> Vec3 {
        let angle = self.angle_at(distance);
        let direction = if self.sweep < 0.0 { -1.0 } else { 1.0 };
        Vec3::new(-angle.sin(), angle.cos(), 0.0) * direction
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::{FRAC_PI_2, PI};

    use approx::assert_relative_eq;

    use super::*;

    fn l_rail() -> PolylineRail {
        let points = vec![
            Vec3::ZERO,
            Vec3::new(100.0, 0.0, 0.0),
            Vec3::new(100.0, 50.0, 0.0),
        ];
        PolylineRail::new(points).unwrap()
    }

    #[test]
    fn polyline_length_and_snap() {
        let rail = l_rail();
        assert_relative_eq!(rail.spline_length(), 150.0);
        let p = rail.snap_point_at(125.0);
        assert_relative_eq!(p.x, 100.0);
        assert_relative_eq!(p.y, 25.0);
        assert_eq!(rail.tangent_at(10.0), Vec3::X);
        assert_eq!(rail.tangent_at(140.0), Vec3::Y);
    }

    #[test]
    fn polyline_clamps_out_of_range_distance() {
        let rail = l_rail();
        assert_eq!(rail.snap_point_at(-5.0), Vec3::ZERO);
        assert_eq!(rail.snap_point_at(500.0), Vec3::new(100.0, 50.0, 0.0));
    }

    #[test]
    fn polyline_nearest_distance() {
        let rail = l_rail();
        assert_relative_eq!(rail.distance_near(Vec3::new(40.0, -10.0, 5.0)), 40.0);
        assert_relative_eq!(rail.distance_near(Vec3::new(130.0, 30.0, 0.0)), 130.0);
        assert_eq!(
            rail.initial_snap_point(Vec3::new(40.0, 3.0, 0.0)),
            Vec3::new(40.0, 0.0, 0.0)
        );
        assert_eq!(rail.tangent_near(Vec3::new(101.0, 40.0, 0.0)), Vec3::Y);
    }

    #[test]
    fn polyline_rejects_single_point() {
        assert_eq!(
            PolylineRail::new(vec![Vec3::ZERO]).err(),
            Some(RailError::TooFewPoints(1))
        );
        assert_eq!(
            PolylineRail::new(vec![Vec3::ZERO, Vec3::splat(f32::NAN)]).err(),
            Some(RailError::NonFinitePoint(1))
        );
    }

    #[test]
    fn degenerate_polyline_has_zero_length_and_finite_tangent() {
        let rail = PolylineRail::new(vec![Vec3::ONE, Vec3::ONE]).unwrap();
        assert_eq!(rail.spline_length(), 0.0);
        assert!(rail.tangent_at(0.0).is_finite());
        assert_eq!(rail.snap_point_at(3.0), Vec3::ONE);
    }

    #[test]
    fn catmull_rom_passes_through_control_points() {
        let control = [
            Vec3::ZERO,
            Vec3::new(100.0, 20.0, 0.0),
            Vec3::new(200.0, 0.0, 10.0),
        ];
        let rail = PolylineRail::from_catmull_rom(&control, 8).unwrap();
        assert_eq!(rail.points().len(), 17);
        assert_eq!(rail.points()[0], control[0]);
        let mid = rail.points()[8];
        assert_relative_eq!(mid.x, 100.0, epsilon = 1e-3);
        assert_relative_eq!(mid.y, 20.0, epsilon = 1e-3);
        assert_eq!(*rail.points().last().unwrap(), control[2]);
    }

    #[test]
    fn arc_quarter_circle() {
        let rail = ArcRail::new(Vec3::new(0.0, 0.0, 30.0), 100.0, 0.0, FRAC_PI_2).unwrap();
        assert_relative_eq!(rail.spline_length(), 50.0 * PI, epsilon = 1e-3);

        let end = rail.snap_point_at(rail.spline_length());
        assert_relative_eq!(end.x, 0.0, epsilon = 1e-3);
        assert_relative_eq!(end.y, 100.0, epsilon = 1e-3);
        assert_relative_eq!(end.z, 30.0);

        let t = rail.tangent_at(0.0);
        assert_relative_eq!(t.y, 1.0, epsilon = 1e-6);

        let d = rail.distance_near(Vec3::new(70.7, 70.7, 0.0));
        assert_relative_eq!(d, 25.0 * PI, epsilon = 0.1);
    }

    #[test]
    fn arc_clockwise_and_outside_points() {
        let rail = ArcRail::new(Vec3::ZERO, 10.0, 0.0, -FRAC_PI_2).unwrap();
        let t = rail.tangent_at(0.0);
        assert_relative_eq!(t.y, -1.0, epsilon = 1e-6);
        // Just past the start, outside the sweep: snaps to the start.
        assert_eq!(rail.distance_near(Vec3::new(10.0, 1.0, 0.0)), 0.0);
        // Just past the end: snaps to the end.
        let d = rail.distance_near(Vec3::new(-1.0, -10.0, 0.0));
        assert_relative_eq!(d, rail.spline_length());
    }

    #[test]
    fn arc_rejects_bad_radius() {
        assert_eq!(
            ArcRail::new(Vec3::ZERO, 0.0, 0.0, 1.0).err(),
            Some(RailError::InvalidRadius(0.0))
        );
    }
}
