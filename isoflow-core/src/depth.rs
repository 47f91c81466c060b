/// Paint-order ranking for the isometric scene.
///
/// Ranks favour ground-plane position over height, which is only known to
/// produce the right stacking under the default 60°/45° camera. Under other
/// angles the ranks are still computed but [`DepthSorter`] reports the
/// camera as uncalibrated.
use std::collections::HashSet;

use log::warn;

use crate::constants::{
    DEFAULT_ROTATE_X, DEFAULT_ROTATE_Z, DEPTH_CALIBRATION_TOLERANCE, DEPTH_GROUND_WEIGHT,
    DEPTH_HEIGHT_WEIGHT,
};
use crate::geometry::Point3D;
use crate::projection::AngleConfig;
use crate::route::{Route, Segment};

/// Rank of an entity at `point` with the given footprint, using its
/// bottom-right ground corner. Larger ranks paint later (in front).
pub fn z_order_rank(point: &Point3D, width: f64, height: f64) -> i64 {
    let corner_x = point.x + width / 2.0;
    let corner_y = point.y + height / 2.0;
    (DEPTH_GROUND_WEIGHT * (corner_x + corner_y) + DEPTH_HEIGHT_WEIGHT * point.z).round() as i64
}

/// Rank of a route segment, taken at the midpoint of its endpoints.
pub fn segment_rank(segment: &Segment) -> i64 {
    let mid = nalgebra::center(&segment.start, &segment.end);
    z_order_rank(&mid, 0.0, 0.0)
}

/// One rank per segment, in route order.
pub fn route_ranks(route: &Route) -> Vec<i64> {
    route.segments.iter().map(segment_rank).collect()
}

/// Whether the ranking constants are valid for `angles`.
pub fn is_calibrated(angles: &AngleConfig) -> bool {
    (angles.rotate_x - DEFAULT_ROTATE_X).abs() <= DEPTH_CALIBRATION_TOLERANCE
        && (angles.rotate_z - DEFAULT_ROTATE_Z).abs() <= DEPTH_CALIBRATION_TOLERANCE
}

/// Orders drawables back to front and warns once per uncalibrated camera.
#[derive(Debug, Default)]
pub struct DepthSorter {
    warned: HashSet<(u64, u64)>,
}

impl DepthSorter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stable sort by ascending rank. Returns whether the ranks can be trusted.
    pub fn paint_order<T>(
        &mut self,
        items: &mut [T],
        angles: &AngleConfig,
        rank: impl Fn(&T) -> i64,
    ) -> bool {
        let calibrated = is_calibrated(angles);
        if !calibrated
            && self
                .warned
                .insert((angles.rotate_x.to_bits(), angles.rotate_z.to_bits()))
        {
            warn!(
                "z-order ranks are calibrated for rotateX={DEFAULT_ROTATE_X}° rotateZ={DEFAULT_ROTATE_Z}°; \
                 stacking under rotateX={}° rotateZ={}° may be wrong",
                angles.rotate_x, angles.rotate_z
            );
        }
        items.sort_by_key(|item| rank(item));
        calibrated
    }
}
