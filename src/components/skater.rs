use glam::{Mat3, Quat, Vec3};
use hecs::Entity;

use crate::config::{FollowerConfig, SkateConfig};
use crate::fsm::StateMachine;

use super::RayHit;

// ---------------------------------------------------------------------------
// Locomotion modes
// ---------------------------------------------------------------------------

/// Which per-frame algorithm drives the skate body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LocomotionMode {
    /// Free skating: the integrator moves the body.
    #[default]
    Skate,
    /// Locked to a rail: the body is placed explicitly every frame.
    Grind,
}

/// Result of a ground check. A miss (`blocking == false`) is a normal outcome.
pub type GroundState = RayHit;

/// Live state of one grind. Exists only while the mode is `Grind`.
#[derive(Clone, Debug)]
pub struct GrindSession {
    /// Entity carrying the `Rail` being ground.
    pub rail: Entity,
    /// Arc-length position along the rail.
    pub distance: f32,
    pub length: f32,
    /// Speed at grind entry; the grind advances at this rate and exits with it.
    pub initial_speed: f32,
    /// Velocity direction at grind entry, the exit heading when no follower is attached.
    pub entry_direction: Vec3,
    /// `true` when travelling toward increasing rail distance.
    pub along: bool,
    pub initial_snap_done: bool,
    /// Rail point nearest the detection hit, used by the first grind frame.
    pub snap_point: Vec3,
    pub z_offset: f32,
}

impl GrindSession {
    /// The session is finished once the distance leaves `[0, length]`.
    pub fn is_past_end(&self) -> bool {
        !(0.0..=self.length).contains(&self.distance)
    }
}

/// Timer that blocks an action for `target` seconds after being armed.
///
/// Used to keep the body from re-snapping to a rail right after leaving it,
/// and to space out pumps.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cooldown {
    pub elapsed: f32,
    pub target: f32,
    pub complete: bool,
}

impl Cooldown {
    /// A cooldown that starts out complete.
    pub fn new(target: f32) -> Self {
        Self {
            elapsed: 0.0,
            target,
            complete: true,
        }
    }

    pub fn arm(&mut self) {
        self.complete = false;
        self.elapsed = 0.0;
    }

    /// Returns `true` on the frame the cooldown completes.
    pub fn advance(&mut self, dt: f32) -> bool {
        if self.complete {
            return false;
        }
        self.elapsed += dt;
        if self.elapsed > self.target {
            self.complete = true;
            self.elapsed = 0.0;
            return true;
        }
        false
    }
}

/// Ollie requested while grinding, fired once the body simulates again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DeferredOllie {
    #[default]
    Idle,
    Requested,
}

/// An active pump push.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PumpState {
    pub direction: Vec3,
    pub remaining: f32,
}

/// First surface found along the predicted airborne arc.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LandingPrediction {
    /// Index of the time sample that hit.
    pub sample: usize,
    /// Sample time, seconds from now.
    pub time: f32,
    pub hit: RayHit,
    /// Predicted velocity direction projected onto the landing surface.
    pub projected_forward: Vec3,
}

/// Skate logic attached to the entity that owns the `PhysicsBody`.
pub struct SkatePhysics {
    pub config: SkateConfig,
    pub mode: StateMachine<LocomotionMode>,
    pub grind: Option<GrindSession>,
    pub grind_cooldown: Cooldown,
    pub deferred_ollie: DeferredOllie,
    pub pump: Option<PumpState>,
    /// Normal of the last blocking ground check; kept while airborne.
    pub last_ground_normal: Vec3,
    /// Most recent landing found by trajectory prediction.
    pub landing: Option<LandingPrediction>,
    /// The follower whose rotation tracker steers this body.
    pub follower: Option<Entity>,
}

impl SkatePhysics {
    pub fn new(config: SkateConfig) -> Self {
        let grind_cooldown = Cooldown::new(config.grind_cooldown_seconds);
        Self {
            config,
            mode: StateMachine::new(LocomotionMode::Skate),
            grind: None,
            grind_cooldown,
            deferred_ollie: DeferredOllie::Idle,
            pump: None,
            last_ground_normal: Vec3::Z,
            landing: None,
            follower: None,
        }
    }

    pub fn current_mode(&self) -> LocomotionMode {
        self.mode.state
    }
}

// ---------------------------------------------------------------------------
// Follower
// ---------------------------------------------------------------------------

/// Orientation frame of the follower, decoupled from its mesh and camera.
///
/// Local axes: forward = +X, left = +Y, up = +Z.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RotationTracker {
    pub rotation: Quat,
}

impl Default for RotationTracker {
    fn default() -> Self {
        Self {
            rotation: Quat::IDENTITY,
        }
    }
}

impl RotationTracker {
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Y
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    /// Face `forward`, keeping world up as the secondary axis.
    /// A zero direction leaves the tracker unchanged.
    pub fn face(&mut self, forward: Vec3) {
        self.face_with_up(forward, Vec3::Z);
    }

    /// Face `forward` exactly, with `up` as the secondary reference.
    pub fn face_with_up(&mut self, forward: Vec3, up: Vec3) {
        if let Some(rotation) = rotation_from_xz(forward, up) {
            self.rotation = rotation;
        }
    }

    /// Rotate about world up by `degrees`.
    pub fn add_yaw(&mut self, degrees: f32) {
        self.rotation = (Quat::from_rotation_z(degrees.to_radians()) * self.rotation).normalize();
    }

    /// Heading of the forward axis around world up, radians.
    pub fn yaw(&self) -> f32 {
        let f = self.forward();
        f.y.atan2(f.x)
    }
}

/// Rotation whose X axis is `x` and whose Z axis is as close to `z` as
/// orthogonality allows. `None` when `x` is zero or not finite.
pub fn rotation_from_xz(x: Vec3, z: Vec3) -> Option<Quat> {
    let x = x.try_normalize()?;
    let y = z.cross(x).normalize_or(x.any_orthonormal_vector());
    let z = x.cross(y);
    Some(Quat::from_mat3(&Mat3::from_cols(x, y, z)).normalize())
}

/// Visual follower of a skate body. Not simulated; it trails the body and
/// owns the orientation everything else is presented with.
pub struct Follower {
    pub config: FollowerConfig,
    /// Physics body driven by this follower. `None` runs the follower in
    /// degraded mode where every physics call is skipped.
    pub physics: Option<Entity>,
    pub grounded: bool,
    pub ground_normal: Vec3,
    pub pump_cooldown: Cooldown,
    /// Yaw-only camera heading taken from the tracker.
    pub camera_rotation: Quat,
    pub mesh_rotation: Quat,
    /// Board rotation; swings toward the lean direction.
    pub board_rotation: Quat,
    pub landings: u32,
}

impl Follower {
    pub fn new(config: FollowerConfig, physics: Option<Entity>) -> Self {
        let pump_cooldown = Cooldown::new(config.pump_cooldown_seconds);
        Self {
            config,
            physics,
            grounded: false,
            ground_normal: Vec3::Z,
            pump_cooldown,
            camera_rotation: Quat::IDENTITY,
            mesh_rotation: Quat::IDENTITY,
            board_rotation: Quat::IDENTITY,
            landings: 0,
        }
    }

    /// Horizontal forward of the camera heading.
    pub fn camera_forward(&self) -> Vec3 {
        self.camera_rotation * Vec3::X
    }

    pub fn camera_right(&self) -> Vec3 {
        self.camera_rotation * Vec3::NEG_Y
    }
}
