/// Axis-ordered connector routing between anchored points.
use std::fmt;

use log::debug;
use nalgebra::distance;
use serde::{Deserialize, Serialize};

use crate::anchor::{Anchor, Face};
use crate::constants::ROUTE_EPSILON;
use crate::geometry::{Axis, IsoBox, Point3D};
use crate::tokens;

/// Completion order used for axes the caller did not name.
pub const DEFAULT_AXIS_ORDER: [Axis; 3] = [Axis::X, Axis::Z, Axis::Y];

/// How a route travels between its endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AxisOrder {
    /// Walk x, then z, then y.
    #[default]
    Auto,
    /// One straight segment.
    Direct,
    /// Walk these axes first, then any remaining ones in x, z, y order.
    Axes(Vec<Axis>),
}

impl AxisOrder {
    /// The complete traversal order for an axis walk, or `None` for direct routes.
    pub fn traversal(&self) -> Option<Vec<Axis>> {
        let requested: &[Axis] = match self {
            AxisOrder::Direct => return None,
            AxisOrder::Auto => &[],
            AxisOrder::Axes(axes) => axes,
        };
        let mut order = Vec::with_capacity(3);
        for &axis in requested.iter().chain(DEFAULT_AXIS_ORDER.iter()) {
            if !order.contains(&axis) {
                order.push(axis);
            }
        }
        Some(order)
    }
}

impl fmt::Display for AxisOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisOrder::Auto => f.write_str("auto"),
            AxisOrder::Direct => f.write_str("direct"),
            AxisOrder::Axes(axes) => axes.iter().try_for_each(|a| write!(f, "{}", a.letter())),
        }
    }
}

impl From<String> for AxisOrder {
    fn from(token: String) -> Self {
        tokens::parse_axis_order(&token)
    }
}

impl From<AxisOrder> for String {
    fn from(order: AxisOrder) -> Self {
        order.to_string()
    }
}

/// Which axis a segment moves along. `Direct` segments may move along several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteAxis {
    Axis(Axis),
    Direct,
}

/// One straight leg of a route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Point3D,
    pub end: Point3D,
    pub length: f64,
    pub axis: RouteAxis,
}

impl Segment {
    pub fn new(start: Point3D, end: Point3D, axis: RouteAxis) -> Self {
        Self {
            start,
            end,
            length: distance(&start, &end),
            axis,
        }
    }

    /// Point at fraction `t` (0..=1) of the segment.
    pub fn lerp(&self, t: f64) -> Point3D {
        self.start + (self.end - self.start) * t
    }
}

/// An ordered, continuous chain of segments. Empty when both endpoints
/// coincide; `origin` is kept so an empty route still has a position.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub origin: Point3D,
    pub segments: Vec<Segment>,
    pub total_length: f64,
}

impl Route {
    pub fn empty(origin: Point3D) -> Self {
        Self {
            origin,
            segments: Vec::new(),
            total_length: 0.0,
        }
    }

    fn from_segments(origin: Point3D, segments: Vec<Segment>) -> Self {
        let total_length = segments.iter().map(|s| s.length).sum();
        Self {
            origin,
            segments,
            total_length,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Position at normalized arclength `progress`.
    pub fn sample(&self, progress: f64) -> Point3D {
        crate::particles::sample_progress(&self.segments, self.total_length, progress, &self.origin)
    }

    /// Position at absolute arclength `distance` from the start, clamped to the path.
    pub fn point_at_distance(&self, distance: f64) -> Point3D {
        if self.total_length <= 0.0 {
            return self.origin;
        }
        self.sample(distance / self.total_length)
    }
}

fn coincident(a: &Point3D, b: &Point3D) -> bool {
    [Axis::X, Axis::Y, Axis::Z]
        .iter()
        .all(|axis| (axis.component(a) - axis.component(b)).abs() <= ROUTE_EPSILON)
}

/// Route from `from` to `to`.
///
/// Direct routes are a single segment. Axis walks first step out of
/// `from_face` by `extension`, walk the axes in `order` changing one
/// coordinate per segment, then step back into `to_face`. Axes already
/// within [`ROUTE_EPSILON`] of the target emit nothing.
pub fn compute_route(
    from: &Point3D,
    to: &Point3D,
    from_face: Face,
    to_face: Face,
    order: &AxisOrder,
    extension: f64,
) -> Route {
    if coincident(from, to) {
        return Route::empty(*from);
    }

    let Some(traversal) = order.traversal() else {
        return Route::from_segments(*from, vec![Segment::new(*from, *to, RouteAxis::Direct)]);
    };

    let extension = extension.max(0.0);
    let mut segments = Vec::with_capacity(traversal.len() + 2);

    let walk_start = *from + from_face.normal() * extension;
    let walk_end = *to + to_face.normal() * extension;
    if extension > 0.0 {
        segments.push(Segment::new(*from, walk_start, RouteAxis::Axis(from_face.axis())));
    }

    let mut current = walk_start;
    for axis in traversal {
        let target = axis.component(&walk_end);
        if (axis.component(&current) - target).abs() <= ROUTE_EPSILON {
            continue;
        }
        let next = axis.with_component(&current, target);
        segments.push(Segment::new(current, next, RouteAxis::Axis(axis)));
        current = next;
    }

    if extension > 0.0 {
        // Residual sub-epsilon drift is absorbed here so the chain still ends at `to`.
        segments.push(Segment::new(current, *to, RouteAxis::Axis(to_face.axis())));
    } else if let Some(last) = segments.last_mut() {
        *last = Segment::new(last.start, *to, last.axis);
    }

    Route::from_segments(*from, segments)
}

/// A connector between anchors on two boxes.
#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    pub from: Anchor,
    pub to: Anchor,
    pub order: AxisOrder,
    pub extension: f64,
}

impl Connector {
    pub fn new(from: Anchor, to: Anchor, order: AxisOrder) -> Self {
        Self {
            from,
            to,
            order,
            extension: 0.0,
        }
    }

    pub fn with_extension(mut self, extension: f64) -> Self {
        self.extension = extension;
        self
    }

    /// Resolve both anchors and build a fresh route.
    pub fn route(&self, from_box: &IsoBox, to_box: &IsoBox) -> Route {
        let from = from_box.anchor_point(&self.from);
        let to = to_box.anchor_point(&self.to);
        let route = compute_route(
            &from,
            &to,
            self.from.face,
            self.to.face,
            &self.order,
            self.extension,
        );
        debug!(
            "routed {} -> {} ({}): {} segments, length {:.2}",
            self.from,
            self.to,
            self.order,
            route.segments.len(),
            route.total_length
        );
        route
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn assert_continuous(route: &Route) {
        for pair in route.segments.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    fn assert_length_consistent(route: &Route) {
        let sum: f64 = route.segments.iter().map(|s| s.length).sum();
        assert!((route.total_length - sum).abs() < 1e-9);
    }

    #[test]
    fn test_traversal_completion() {
        assert_eq!(
            AxisOrder::Auto.traversal(),
            Some(vec![Axis::X, Axis::Z, Axis::Y])
        );
        assert_eq!(
            AxisOrder::Axes(vec![Axis::Y]).traversal(),
            Some(vec![Axis::Y, Axis::X, Axis::Z])
        );
        assert_eq!(AxisOrder::Direct.traversal(), None);
    }

    #[test]
    fn test_single_axis_route() {
        let from = Point3::new(0.0, 0.0, 50.0);
        let to = Point3::new(100.0, 0.0, 50.0);
        let route = compute_route(
            &from,
            &to,
            Face::Right,
            Face::Left,
            &AxisOrder::Axes(vec![Axis::X]),
            0.0,
        );
        assert_eq!(route.segments.len(), 1);
        assert_eq!(route.segments[0].start, from);
        assert_eq!(route.segments[0].end, to);
        assert!((route.total_length - 100.0).abs() < 1e-9);
        assert_eq!(route.segments[0].axis, RouteAxis::Axis(Axis::X));
    }

    #[test]
    fn test_direct_route() {
        let from = Point3::new(0.0, 0.0, 0.0);
        let to = Point3::new(3.0, 4.0, 0.0);
        let route = compute_route(&from, &to, Face::Top, Face::Top, &AxisOrder::Direct, 20.0);
        assert_eq!(route.segments.len(), 1);
        assert_eq!(route.segments[0].axis, RouteAxis::Direct);
        assert!((route.total_length - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_auto_walk_visits_x_then_z_then_y() {
        let from = Point3::new(0.0, 0.0, 0.0);
        let to = Point3::new(10.0, 20.0, 30.0);
        let route = compute_route(&from, &to, Face::Top, Face::Bottom, &AxisOrder::Auto, 0.0);
        let axes: Vec<_> = route.segments.iter().map(|s| s.axis).collect();
        assert_eq!(
            axes,
            vec![
                RouteAxis::Axis(Axis::X),
                RouteAxis::Axis(Axis::Z),
                RouteAxis::Axis(Axis::Y)
            ]
        );
        assert_continuous(&route);
        assert_length_consistent(&route);
        assert!((route.total_length - 60.0).abs() < 1e-9);
        assert_eq!(route.segments.last().unwrap().end, to);
    }

    #[test]
    fn test_extension_steps_out_along_normals() {
        let from = Point3::new(0.0, 0.0, 10.0);
        let to = Point3::new(100.0, 40.0, 10.0);
        let route = compute_route(&from, &to, Face::Right, Face::Front, &AxisOrder::Auto, 15.0);

        let first = route.segments.first().unwrap();
        assert_eq!(first.end, Point3::new(15.0, 0.0, 10.0));
        assert_eq!(first.axis, RouteAxis::Axis(Axis::X));

        let last = route.segments.last().unwrap();
        assert_eq!(last.start, Point3::new(100.0, 55.0, 10.0));
        assert_eq!(last.end, to);
        assert_eq!(last.axis, RouteAxis::Axis(Axis::Y));

        assert_continuous(&route);
        assert_length_consistent(&route);
    }

    #[test]
    fn test_aligned_axes_emit_nothing() {
        let from = Point3::new(0.0, 0.0, 0.0);
        let to = Point3::new(0.05, 30.0, 0.0);
        let route = compute_route(&from, &to, Face::Front, Face::Back, &AxisOrder::Auto, 0.0);
        assert_eq!(route.segments.len(), 1);
        assert_eq!(route.segments[0].axis, RouteAxis::Axis(Axis::Y));
        assert_eq!(route.segments[0].end, to);
    }

    #[test]
    fn test_coincident_endpoints_give_empty_route() {
        let p = Point3::new(5.0, 5.0, 5.0);
        for order in [AxisOrder::Auto, AxisOrder::Direct] {
            let route = compute_route(&p, &p, Face::Top, Face::Top, &order, 10.0);
            assert!(route.is_empty());
            assert_eq!(route.total_length, 0.0);
            assert_eq!(route.sample(0.7), p);
        }
    }

    #[test]
    fn test_connector_routes_between_boxes() {
        use crate::anchor::AnchorPosition;
        use crate::geometry::BoxGeometry;

        let a = IsoBox::new(Point3::new(0.0, 0.0, 0.0), BoxGeometry::cube(20.0));
        let b = IsoBox::new(Point3::new(100.0, 0.0, 0.0), BoxGeometry::cube(20.0));
        let connector = Connector::new(
            Anchor::new(Face::Right, AnchorPosition::Mc),
            Anchor::new(Face::Left, AnchorPosition::Mc),
            AxisOrder::Auto,
        );
        let route = connector.route(&a, &b);
        assert_eq!(route.segments.len(), 1);
        assert!((route.total_length - 80.0).abs() < 1e-9);
    }
}
