mod follower;
mod grind;
mod ground;
mod physics;
mod raycast;
mod responder;
mod skate;
mod trajectory;

pub use follower::{
    follower_system, interp_to, report_detached_followers, FollowerController, SkateInput,
    SkaterView,
};
pub use grind::{GrindCandidate, GRIND_ALIGNMENT, GRIND_MIN_SPEED, GRIND_REACH};
pub use ground::detect_ground;
pub use physics::{physics_step, teleport, PHYSICS_DT};
pub use raycast::{closest_point_on_segment, intersect, SurfaceQuery, WorldSurfaces};
pub use responder::{clamp_speed, flip_jump_velocity, lean_force, ollie_impulse};
pub use skate::{skate_physics_system, SkateBody};
pub use trajectory::{
    predict_landing, project_on_plane, PREDICTION_LOOKBACK, PREDICTION_SAMPLES, PREDICTION_STEP,
};
