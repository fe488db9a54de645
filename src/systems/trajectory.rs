use glam::Vec3;
use log::trace;

use crate::components::{Channel, LandingPrediction, GRAVITY};
use crate::interface::Skaterface;

use super::raycast::SurfaceQuery;
use super::skate::SkateBody;

pub const PREDICTION_SAMPLES: usize = 100;
/// Spacing of the sample times, seconds.
pub const PREDICTION_STEP: f32 = 0.05;
/// Every sample is evaluated this far in the past, compensating for the frame
/// that has already elapsed by the time the prediction runs.
pub const PREDICTION_LOOKBACK: f32 = 0.1;

/// Walks the ballistic arc of a body at `origin` moving with `velocity` and
/// returns the first surface a short cast from any sample reaches.
///
/// Each sample casts along the predicted velocity for the distance covered
/// in one step, so consecutive casts overlap into a continuous sweep.
pub fn predict_landing<Q: SurfaceQuery + ?Sized>(
    surfaces: &Q,
    origin: Vec3,
    velocity: Vec3,
) -> Option<LandingPrediction> {
    let step_drop = 0.5 * GRAVITY.length() * PREDICTION_STEP * PREDICTION_STEP;
    (0..PREDICTION_SAMPLES).find_map(|sample| {
        let time = sample as f32 * PREDICTION_STEP;
        let t = time - PREDICTION_LOOKBACK;
        let start = origin + velocity * t + 0.5 * GRAVITY * t * t;
        let predicted = velocity + GRAVITY * t;
        let reach = predicted.length() * PREDICTION_STEP + step_drop;
        let end = start + predicted.normalize_or_zero() * reach;

        let hit = surfaces.raycast(start, end, Channel::Visibility);
        hit.blocking.then(|| LandingPrediction {
            sample,
            time,
            hit,
            projected_forward: project_on_plane(predicted, hit.normal).normalize_or_zero(),
        })
    })
}

/// `v` with its component along `normal` removed.
pub fn project_on_plane(v: Vec3, normal: Vec3) -> Vec3 {
    let n = normal.normalize_or_zero();
    v - n * v.dot(n)
}

impl SkateBody<'_> {
    /// Predicts the landing and hands it to the follower to pre-orient.
    pub(crate) fn predict_and_orient(&mut self) {
        let prediction = predict_landing(self.surfaces, self.position(), self.velocity());
        self.with_state(|s| s.landing = prediction);

        let Some(landing) = prediction else {
            return;
        };
        trace!("landing in {:.2}s at {}", landing.time, landing.hit.point);
        if let Some(mut follower) = self.follower() {
            follower.orient_to_landing(&landing.hit, landing.time, landing.projected_forward);
        }
    }
}
