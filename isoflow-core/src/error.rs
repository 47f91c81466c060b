/// Error types for the isometric core.
use thiserror::Error;

/// Failures the core reports explicitly instead of letting NaN leak into
/// screen coordinates or silently dropping scene entities.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IsoError {
    #[error("camera angles rotateX={rotate_x}° rotateZ={rotate_z}° make the screen-to-iso inverse singular")]
    DegenerateProjection { rotate_x: f64, rotate_z: f64 },

    #[error("projection scale {0} cannot be inverted")]
    InvalidScale(f64),

    #[error("unknown box id: {0}")]
    UnknownBox(String),

    #[error("box id already present in scene: {0}")]
    DuplicateBox(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, IsoError>;
