/// Geometry primitives for the isometric scene.
use nalgebra::{Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Logical isometric coordinates: `x` and `y` span the ground plane, `z` is height.
pub type Point3D = Point3<f64>;

/// Screen-space pixel offset.
pub type Point2D = Point2<f64>;

/// Axis-aligned extents of an entity, centered on its footprint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxGeometry {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
}

impl BoxGeometry {
    pub fn new(width: f64, height: f64, depth: f64) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    pub fn cube(size: f64) -> Self {
        Self::new(size, size, size)
    }

    pub fn half_extents(&self) -> Vector3<f64> {
        Vector3::new(self.width / 2.0, self.height / 2.0, self.depth / 2.0)
    }
}

/// A box placed in the scene. `position` is the center of the footprint at
/// the box's base; the box extends `depth` upwards from there.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IsoBox {
    pub position: Point3D,
    pub geometry: BoxGeometry,
}

impl IsoBox {
    pub fn new(position: Point3D, geometry: BoxGeometry) -> Self {
        Self { position, geometry }
    }

    /// The eight corners, bottom ring first, each ring ordered
    /// counter-clockwise seen from above starting at (-x, -y).
    pub fn corners(&self) -> [Point3D; 8] {
        let hw = self.geometry.width / 2.0;
        let hh = self.geometry.height / 2.0;
        let p = self.position;
        let ring = |z: f64| {
            [
                Point3::new(p.x - hw, p.y - hh, z),
                Point3::new(p.x + hw, p.y - hh, z),
                Point3::new(p.x + hw, p.y + hh, z),
                Point3::new(p.x - hw, p.y + hh, z),
            ]
        };
        let [b0, b1, b2, b3] = ring(p.z);
        let [t0, t1, t2, t3] = ring(p.z + self.geometry.depth);
        [b0, b1, b2, b3, t0, t1, t2, t3]
    }

    /// Index pairs into [`IsoBox::corners`] forming the twelve edges.
    pub const EDGES: [(usize, usize); 12] = [
        (0, 1),
        (1, 2),
        (2, 3),
        (3, 0),
        (4, 5),
        (5, 6),
        (6, 7),
        (7, 4),
        (0, 4),
        (1, 5),
        (2, 6),
        (3, 7),
    ];
}

/// A coordinate axis of the logical space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn component(self, point: &Point3D) -> f64 {
        match self {
            Axis::X => point.x,
            Axis::Y => point.y,
            Axis::Z => point.z,
        }
    }

    /// Copy of `point` with this axis' component replaced.
    pub fn with_component(self, point: &Point3D, value: f64) -> Point3D {
        let mut out = *point;
        match self {
            Axis::X => out.x = value,
            Axis::Y => out.y = value,
            Axis::Z => out.z = value,
        }
        out
    }

    pub fn letter(self) -> char {
        match self {
            Axis::X => 'x',
            Axis::Y => 'y',
            Axis::Z => 'z',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_component_replacement() {
        let p = Point3::new(1.0, 2.0, 3.0);
        assert_eq!(Axis::Y.component(&p), 2.0);
        assert_eq!(Axis::Z.with_component(&p, 9.0), Point3::new(1.0, 2.0, 9.0));
    }

    #[test]
    fn test_corners_span_extents() {
        let b = IsoBox::new(Point3::new(10.0, 20.0, 0.0), BoxGeometry::new(4.0, 6.0, 8.0));
        let corners = b.corners();
        assert_eq!(corners[0], Point3::new(8.0, 17.0, 0.0));
        assert_eq!(corners[6], Point3::new(12.0, 23.0, 8.0));
    }

    #[test]
    fn test_edges_connect_corners_differing_in_one_axis() {
        let b = IsoBox::new(Point3::origin(), BoxGeometry::cube(2.0));
        let corners = b.corners();
        for (a, c) in IsoBox::EDGES {
            let d = corners[c] - corners[a];
            let changed = [d.x, d.y, d.z].iter().filter(|v| v.abs() > 1e-9).count();
            assert_eq!(changed, 1);
        }
    }
}
