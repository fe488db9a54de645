//! Tuning values for the skate body and its follower.
//!
//! Every field has a default, so a RON file only needs the values it changes:
//!
//! ```ron
//! (
//!     skate: (max_velocity: 1800.0, grind_cooldown_seconds: 0.5),
//!     follower: (pump_cooldown_seconds: 1.0),
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Fan used by the ground detector, in degrees from straight down.
pub const DEFAULT_GROUND_CHECK_ANGLES: [f32; 9] =
    [-90.0, -75.0, -50.0, -25.0, 0.0, 25.0, 50.0, 75.0, 90.0];

/// Tuning for the physics-side skate body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkateConfig {
    /// Force applied along the pump direction while a pump push is active.
    pub pump_force: f32,
    /// How long one pump keeps pushing (seconds).
    pub pump_duration: f32,
    /// Lateral force applied when leaning at full axis.
    pub lean_force: f32,
    /// Velocity change applied by an ollie.
    pub ollie_impulse: f32,
    /// Height of the body above the rail spline while grinding.
    pub grind_z_offset: f32,
    /// Speed cap applied every skate tick.
    pub max_velocity: f32,
    /// Seconds after leaving a grind before another grind can be detected.
    pub grind_cooldown_seconds: f32,
    /// Ground check fan, degrees.
    pub ground_check_angles: Vec<f32>,
    /// Length of each ground check ray.
    pub ground_check_length: f32,
    /// Downward force that keeps the body seated on steep ramps.
    pub stick_force: f32,
}

impl Default for SkateConfig {
    fn default() -> Self {
        Self {
            pump_force: 1750.0,
            pump_duration: 0.4,
            lean_force: 3500.0,
            ollie_impulse: 500.0,
            grind_z_offset: 50.0,
            max_velocity: 2250.0,
            grind_cooldown_seconds: 1.0,
            ground_check_angles: DEFAULT_GROUND_CHECK_ANGLES.to_vec(),
            ground_check_length: 65.0,
            stick_force: 1000.0,
        }
    }
}

/// Tuning for the visual follower.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowerConfig {
    /// Seconds between two accepted pumps.
    pub pump_cooldown_seconds: f32,
    /// Interpolation speed toward the physics body position.
    pub follow_interp_speed: f32,
    /// Below this speed the tracker keeps its heading instead of following velocity.
    pub align_min_speed: f32,
    /// Below this speed leaning turns the tracker instead of pushing the body.
    pub lean_min_speed: f32,
    /// Tracker yaw per frame of at-rest leaning, degrees.
    pub at_rest_turn_degrees: f32,
    /// Board yaw at full lean, degrees.
    pub board_lean_degrees: f32,
    /// Interpolation speed of the board toward its lean target.
    pub board_interp_speed: f32,
}

impl Default for FollowerConfig {
    fn default() -> Self {
        Self {
            pump_cooldown_seconds: 1.5,
            follow_interp_speed: 1000.0,
            align_min_speed: 50.0,
            lean_min_speed: 50.0,
            at_rest_turn_degrees: 2.0,
            board_lean_degrees: 25.0,
            board_interp_speed: 5.0,
        }
    }
}

/// Top-level tuning file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub skate: SkateConfig,
    pub follower: FollowerConfig,
}

impl SimConfig {
    pub fn from_ron(source: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.skate;
        let f = &self.follower;
        positive("skate.max_velocity", s.max_velocity)?;
        positive("skate.ground_check_length", s.ground_check_length)?;
        non_negative("skate.grind_cooldown_seconds", s.grind_cooldown_seconds)?;
        non_negative("skate.pump_duration", s.pump_duration)?;
        if s.ground_check_angles.is_empty() {
            return Err(ConfigError::Invalid {
                field: "skate.ground_check_angles",
                reason: "at least one angle is required".into(),
            });
        }
        if let Some(angle) = s.ground_check_angles.iter().find(|a| a.abs() > 90.0) {
            return Err(ConfigError::Invalid {
                field: "skate.ground_check_angles",
                reason: format!("{angle} is outside [-90, 90]"),
            });
        }
        non_negative("follower.pump_cooldown_seconds", f.pump_cooldown_seconds)?;
        non_negative("follower.follow_interp_speed", f.follow_interp_speed)?;
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{value} must be positive"),
        })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{value} must not be negative"),
        })
    }
}
