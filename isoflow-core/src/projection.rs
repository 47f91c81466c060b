/// Isometric projection between logical 3D coordinates and screen space.
use nalgebra::{Matrix2, Point2, Point3, Vector2};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_PERSPECTIVE, DEFAULT_ROTATE_X, DEFAULT_ROTATE_Z, SINGULAR_EPSILON,
};
use crate::error::{IsoError, Result};
use crate::geometry::{Point2D, Point3D};

/// Camera parameters. Angles are in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleConfig {
    pub rotate_x: f64,
    pub rotate_z: f64,
    pub perspective: f64,
}

impl AngleConfig {
    pub fn new(rotate_x: f64, rotate_z: f64) -> Self {
        Self {
            rotate_x,
            rotate_z,
            perspective: DEFAULT_PERSPECTIVE,
        }
    }

    /// (sin, cos) of rotateX and rotateZ, in that order.
    fn trig(&self) -> ((f64, f64), (f64, f64)) {
        (
            self.rotate_x.to_radians().sin_cos(),
            self.rotate_z.to_radians().sin_cos(),
        )
    }
}

impl Default for AngleConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ROTATE_X, DEFAULT_ROTATE_Z)
    }
}

/// Scale factor and 2D origin offset applied after rotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projector {
    pub scale: f64,
    pub origin: Point2D,
}

impl Projector {
    pub fn new(scale: f64, origin: Point2D) -> Self {
        Self { scale, origin }
    }

    pub fn to_screen(&self, point: &Point3D, angles: &AngleConfig) -> Point2D {
        iso_to_screen(point, self.scale, &self.origin, angles)
    }

    pub fn to_iso(&self, screen: &Point2D, z: f64, angles: &AngleConfig) -> Result<Point3D> {
        screen_to_iso(screen, z, self.scale, &self.origin, angles)
    }
}

impl Default for Projector {
    fn default() -> Self {
        Self::new(1.0, Point2::origin())
    }
}

/// Project a logical point onto the screen.
pub fn iso_to_screen(
    point: &Point3D,
    scale: f64,
    origin: &Point2D,
    angles: &AngleConfig,
) -> Point2D {
    let ((sin_x, cos_x), (sin_z, cos_z)) = angles.trig();

    let x_rot_z = (point.x - point.y) * cos_z;
    let y_rot_z = (point.x + point.y) * sin_z;

    Point2::new(
        x_rot_z * scale + origin.x,
        (y_rot_z * cos_x - point.z * sin_x) * scale + origin.y,
    )
}

/// Recover the logical point at height `z` that projects to `screen`.
///
/// Fails with [`IsoError::DegenerateProjection`] when the camera collapses
/// the ground plane onto a line or its angles are not finite, and with
/// [`IsoError::InvalidScale`] for a zero or non-finite scale.
pub fn screen_to_iso(
    screen: &Point2D,
    z: f64,
    scale: f64,
    origin: &Point2D,
    angles: &AngleConfig,
) -> Result<Point3D> {
    if !scale.is_finite() || scale.abs() < SINGULAR_EPSILON {
        return Err(IsoError::InvalidScale(scale));
    }
    let ((sin_x, cos_x), (sin_z, cos_z)) = angles.trig();

    // [cos_z, -cos_z; sin_z*cos_x, sin_z*cos_x] * (x, y) = rhs
    let system = Matrix2::new(cos_z, -cos_z, sin_z * cos_x, sin_z * cos_x);
    let degenerate = || IsoError::DegenerateProjection {
        rotate_x: angles.rotate_x,
        rotate_z: angles.rotate_z,
    };
    let det = system.determinant();
    if !det.is_finite() || det.abs() < SINGULAR_EPSILON {
        return Err(degenerate());
    }
    let inverse = system.try_inverse().ok_or_else(degenerate)?;

    let rhs = Vector2::new(
        (screen.x - origin.x) / scale,
        (screen.y - origin.y) / scale + z * sin_x,
    );
    let xy = inverse * rhs;
    Ok(Point3::new(xy.x, xy.y, z))
}
