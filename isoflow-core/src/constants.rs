/// Shared numeric defaults.

/// Default camera tilt around the screen X axis, in degrees.
pub const DEFAULT_ROTATE_X: f64 = 60.0;
/// Default camera spin around the vertical axis, in degrees.
pub const DEFAULT_ROTATE_Z: f64 = 45.0;
/// Default CSS-style perspective distance in pixels. Carried for hosts; the
/// parallel projection itself ignores it.
pub const DEFAULT_PERSPECTIVE: f64 = 1000.0;

/// Determinant magnitude below which the inverse projection is treated as singular.
pub const SINGULAR_EPSILON: f64 = 1e-9;

/// Axis differences at or below this are considered aligned by the router.
pub const ROUTE_EPSILON: f64 = 0.1;

/// Weight of the ground-plane corner sum in the z-order rank (K1).
pub const DEPTH_GROUND_WEIGHT: f64 = 10.0;
/// Weight of height in the z-order rank (K2). Must stay well below K1.
pub const DEPTH_HEIGHT_WEIGHT: f64 = 1.0;
/// Angle tolerance, in degrees, for treating a camera as the calibrated default.
pub const DEPTH_CALIBRATION_TOLERANCE: f64 = 0.5;

/// Progress units per second.
pub const DEFAULT_PARTICLE_SPEED: f64 = 0.5;
/// Particles emitted per second per stream.
pub const DEFAULT_EMISSION_RATE: f64 = 2.0;
pub const DEFAULT_PARTICLE_SIZE: f64 = 4.0;
/// Arclength between consecutive trail points, in iso units.
pub const DEFAULT_TRAIL_SPACING: f64 = 8.0;
/// Upper bound on particles a single stream emits in one step.
pub const MAX_EMIT_PER_STEP: usize = 64;

/// Largest frame delta, in seconds, fed into the simulation after a stall.
pub const MAX_FRAME_DT: f64 = 0.25;
