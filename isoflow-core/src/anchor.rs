/// Face and anchor addressing on oriented boxes.
use std::fmt;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::geometry::{Axis, BoxGeometry, IsoBox, Point3D};
use crate::tokens;

/// One of the six faces of a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Face {
    #[default]
    Top,
    Bottom,
    Front,
    Back,
    Left,
    Right,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::Top,
        Face::Bottom,
        Face::Front,
        Face::Back,
        Face::Left,
        Face::Right,
    ];

    /// Outward unit normal.
    pub fn normal(self) -> Vector3<f64> {
        match self {
            Face::Top => Vector3::z(),
            Face::Bottom => -Vector3::z(),
            Face::Front => Vector3::y(),
            Face::Back => -Vector3::y(),
            Face::Left => -Vector3::x(),
            Face::Right => Vector3::x(),
        }
    }

    /// The axis the normal lies on.
    pub fn axis(self) -> Axis {
        match self {
            Face::Top | Face::Bottom => Axis::Z,
            Face::Front | Face::Back => Axis::Y,
            Face::Left | Face::Right => Axis::X,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Face::Top => "top",
            Face::Bottom => "bottom",
            Face::Front => "front",
            Face::Back => "back",
            Face::Left => "left",
            Face::Right => "right",
        }
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A cell of the 3×3 grid laid over a face. The first letter picks the row
/// (top/middle/bottom), the second the column (left/center/right).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorPosition {
    Tl,
    Tc,
    Tr,
    Ml,
    #[default]
    Mc,
    Mr,
    Bl,
    Bc,
    Br,
}

impl AnchorPosition {
    pub const ALL: [AnchorPosition; 9] = [
        AnchorPosition::Tl,
        AnchorPosition::Tc,
        AnchorPosition::Tr,
        AnchorPosition::Ml,
        AnchorPosition::Mc,
        AnchorPosition::Mr,
        AnchorPosition::Bl,
        AnchorPosition::Bc,
        AnchorPosition::Br,
    ];

    /// Normalized face coordinates, (0, 0) at top-left.
    pub fn uv(self) -> (f64, f64) {
        use AnchorPosition::*;
        let u = match self {
            Tl | Ml | Bl => 0.0,
            Tc | Mc | Bc => 0.5,
            Tr | Mr | Br => 1.0,
        };
        let v = match self {
            Tl | Tc | Tr => 0.0,
            Ml | Mc | Mr => 0.5,
            Bl | Bc | Br => 1.0,
        };
        (u, v)
    }

    /// The cell reflected through the face center.
    pub fn opposite(self) -> Self {
        use AnchorPosition::*;
        match self {
            Tl => Br,
            Tc => Bc,
            Tr => Bl,
            Ml => Mr,
            Mc => Mc,
            Mr => Ml,
            Bl => Tr,
            Bc => Tc,
            Br => Tl,
        }
    }

    pub fn name(self) -> &'static str {
        use AnchorPosition::*;
        match self {
            Tl => "tl",
            Tc => "tc",
            Tr => "tr",
            Ml => "ml",
            Mc => "mc",
            Mr => "mr",
            Bl => "bl",
            Bc => "bc",
            Br => "br",
        }
    }
}

impl fmt::Display for AnchorPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A face plus a grid cell on it.
///
/// Deserializes leniently from tokens such as `"right-mc"`; see
/// [`tokens::parse_anchor`] for the fallback rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Anchor {
    pub face: Face,
    pub position: AnchorPosition,
}

impl Anchor {
    pub fn new(face: Face, position: AnchorPosition) -> Self {
        Self { face, position }
    }

    pub fn center(face: Face) -> Self {
        Self::new(face, AnchorPosition::Mc)
    }

    pub fn offset(&self, geometry: &BoxGeometry) -> Vector3<f64> {
        face_anchor_offset(self.face, self.position, geometry)
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.face, self.position)
    }
}

impl From<String> for Anchor {
    fn from(token: String) -> Self {
        tokens::parse_anchor(&token)
    }
}

impl From<Anchor> for String {
    fn from(anchor: Anchor) -> Self {
        anchor.to_string()
    }
}

/// Offset of an anchor from the box's footprint center.
///
/// `x`/`y` are measured from the center of the footprint, `z` from the base,
/// so the top face sits at `z = depth` and the bottom face at `z = 0`.
pub fn face_anchor_offset(
    face: Face,
    position: AnchorPosition,
    geometry: &BoxGeometry,
) -> Vector3<f64> {
    let (u, v) = position.uv();
    let BoxGeometry {
        width: w,
        height: h,
        depth: d,
    } = *geometry;

    match face {
        Face::Top => Vector3::new(w * (u - 0.5), h * (v - 0.5), d),
        Face::Bottom => Vector3::new(w * (u - 0.5), h * (v - 0.5), 0.0),
        Face::Front => Vector3::new(w * (u - 0.5), h / 2.0, d * (1.0 - v)),
        Face::Back => Vector3::new(w * (u - 0.5), -h / 2.0, d * (1.0 - v)),
        Face::Left => Vector3::new(-w / 2.0, h * (u - 0.5), d * (1.0 - v)),
        Face::Right => Vector3::new(w / 2.0, h * (u - 0.5), d * (1.0 - v)),
    }
}

impl IsoBox {
    /// World position of an anchor on this box.
    pub fn anchor_point(&self, anchor: &Anchor) -> Point3D {
        self.position + anchor.offset(&self.geometry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn dims() -> BoxGeometry {
        BoxGeometry::new(40.0, 20.0, 10.0)
    }

    fn face_center(face: Face, g: &BoxGeometry) -> Vector3<f64> {
        match face {
            Face::Top => Vector3::new(0.0, 0.0, g.depth),
            Face::Bottom => Vector3::zeros(),
            Face::Front => Vector3::new(0.0, g.height / 2.0, g.depth / 2.0),
            Face::Back => Vector3::new(0.0, -g.height / 2.0, g.depth / 2.0),
            Face::Left => Vector3::new(-g.width / 2.0, 0.0, g.depth / 2.0),
            Face::Right => Vector3::new(g.width / 2.0, 0.0, g.depth / 2.0),
        }
    }

    #[test]
    fn test_mc_is_face_center() {
        let g = dims();
        for face in Face::ALL {
            let offset = face_anchor_offset(face, AnchorPosition::Mc, &g);
            assert!((offset - face_center(face, &g)).norm() < 1e-12, "{face}");
        }
    }

    #[test]
    fn test_opposite_cells_reflect_through_center() {
        let g = dims();
        for face in Face::ALL {
            let center = face_center(face, &g);
            for pos in AnchorPosition::ALL {
                let a = face_anchor_offset(face, pos, &g) - center;
                let b = face_anchor_offset(face, pos.opposite(), &g) - center;
                assert!((a + b).norm() < 1e-12, "{face}-{pos}");
            }
        }
    }

    #[test]
    fn test_anchor_lies_on_its_face_plane() {
        let g = dims();
        for face in Face::ALL {
            let plane = face.axis().component(&Point3::from(face_center(face, &g)));
            for pos in AnchorPosition::ALL {
                let offset = face_anchor_offset(face, pos, &g);
                let value = face.axis().component(&Point3::from(offset));
                assert!((value - plane).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_normals_are_unit_and_outward() {
        let g = dims();
        for face in Face::ALL {
            let n = face.normal();
            assert!((n.norm() - 1.0).abs() < 1e-12);
            let from_box_middle = face_center(face, &g) - Vector3::new(0.0, 0.0, g.depth / 2.0);
            assert!(n.dot(&from_box_middle) > 0.0);
        }
    }

    #[test]
    fn test_front_top_left_corner() {
        let offset = face_anchor_offset(Face::Front, AnchorPosition::Tl, &dims());
        assert_eq!(offset, Vector3::new(-20.0, 10.0, 10.0));
    }

    #[test]
    fn test_anchor_point_in_world() {
        let b = IsoBox::new(Point3::new(100.0, 50.0, 0.0), dims());
        let p = b.anchor_point(&Anchor::center(Face::Right));
        assert_eq!(p, Point3::new(120.0, 50.0, 5.0));
    }

    #[test]
    fn test_anchor_display_round_trips_through_token() {
        let anchor = Anchor::new(Face::Back, AnchorPosition::Br);
        assert_eq!(anchor.to_string(), "back-br");
        assert_eq!(Anchor::from(anchor.to_string()), anchor);
    }
}
