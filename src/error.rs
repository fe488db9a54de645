use std::path::PathBuf;

use thiserror::Error;

/// Failure loading or validating a tuning file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the rejected field, e.g. `skate.max_velocity`.
        field: &'static str,
        reason: String,
    },
}

/// Failure building a rail surface.
#[derive(Debug, Error, PartialEq)]
pub enum RailError {
    #[error("a rail needs at least 2 points, got {0}")]
    TooFewPoints(usize),

    #[error("rail point {0} is not finite")]
    NonFinitePoint(usize),

    #[error("arc radius must be positive, got {0}")]
    InvalidRadius(f32),
}
