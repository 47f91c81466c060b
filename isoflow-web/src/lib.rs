/// Isoflow Web - WASM bindings for hosting the isometric core in a browser
///
/// The page owns the DOM; it hands box attributes, anchor and axis-order
/// tokens and angle changes in, and reads screen coordinates, ranks, route
/// segments and particle positions back out.

use isoflow_core::{
    tokens, AngleBroadcast, AngleConfig, BoxGeometry, Connector, DrawKind, Frame, IsoBox,
    IsoError, Point3D, Projector, Route, Scene,
};
use nalgebra::{Point2, Point3};
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod frame_loop;

#[cfg(target_arch = "wasm32")]
pub use frame_loop::FrameLoop;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("isoflow-web ready");
    Ok(())
}

fn js_error(e: IsoError) -> JsError {
    JsError::new(&e.to_string())
}

fn point(coords: &[f64]) -> Point3D {
    let c = |i: usize| coords.get(i).copied().unwrap_or(0.0);
    Point3::new(c(0), c(1), c(2))
}

/// Project a logical point; returns `[x, y]`.
#[wasm_bindgen(js_name = isoToScreen)]
#[allow(clippy::too_many_arguments)]
pub fn iso_to_screen(
    x: f64,
    y: f64,
    z: f64,
    scale: f64,
    origin_x: f64,
    origin_y: f64,
    rotate_x: f64,
    rotate_z: f64,
) -> Vec<f64> {
    let screen = isoflow_core::iso_to_screen(
        &Point3::new(x, y, z),
        scale,
        &Point2::new(origin_x, origin_y),
        &AngleConfig::new(rotate_x, rotate_z),
    );
    vec![screen.x, screen.y]
}

fn screen_to_iso_impl(
    screen: [f64; 2],
    z: f64,
    scale: f64,
    origin: [f64; 2],
    angles: AngleConfig,
) -> isoflow_core::Result<Vec<f64>> {
    let p = isoflow_core::screen_to_iso(
        &Point2::new(screen[0], screen[1]),
        z,
        scale,
        &Point2::new(origin[0], origin[1]),
        &angles,
    )?;
    Ok(vec![p.x, p.y, p.z])
}

/// Inverse projection at a known height; returns `[x, y, z]` or throws for a
/// degenerate camera.
#[wasm_bindgen(js_name = screenToIso)]
#[allow(clippy::too_many_arguments)]
pub fn screen_to_iso(
    screen_x: f64,
    screen_y: f64,
    z: f64,
    scale: f64,
    origin_x: f64,
    origin_y: f64,
    rotate_x: f64,
    rotate_z: f64,
) -> Result<Vec<f64>, JsError> {
    screen_to_iso_impl(
        [screen_x, screen_y],
        z,
        scale,
        [origin_x, origin_y],
        AngleConfig::new(rotate_x, rotate_z),
    )
    .map_err(js_error)
}

#[wasm_bindgen(js_name = zOrderRank)]
pub fn z_order_rank(x: f64, y: f64, z: f64, width: f64, height: f64) -> f64 {
    isoflow_core::z_order_rank(&Point3::new(x, y, z), width, height) as f64
}

/// Offset of an anchor token (e.g. `"right-tl"`) from the box footprint center.
#[wasm_bindgen(js_name = faceAnchorOffset)]
pub fn face_anchor_offset(anchor: &str, width: f64, height: f64, depth: f64) -> Vec<f64> {
    let anchor = tokens::parse_anchor(anchor);
    let offset = anchor.offset(&BoxGeometry::new(width, height, depth));
    vec![offset.x, offset.y, offset.z]
}

/// A computed route, kept on the Rust side for sampling.
#[wasm_bindgen]
pub struct RouteView {
    route: Route,
}

#[wasm_bindgen]
impl RouteView {
    /// Segments flattened as `[sx, sy, sz, ex, ey, ez, length]` per segment.
    pub fn segments(&self) -> Vec<f64> {
        self.route
            .segments
            .iter()
            .flat_map(|s| {
                [
                    s.start.x, s.start.y, s.start.z, s.end.x, s.end.y, s.end.z, s.length,
                ]
            })
            .collect()
    }

    #[wasm_bindgen(getter, js_name = totalLength)]
    pub fn total_length(&self) -> f64 {
        self.route.total_length
    }

    /// One z-order rank per segment.
    pub fn ranks(&self) -> Vec<f64> {
        isoflow_core::depth::route_ranks(&self.route)
            .into_iter()
            .map(|r| r as f64)
            .collect()
    }

    /// `[x, y, z]` at normalized progress along the route.
    pub fn sample(&self, progress: f64) -> Vec<f64> {
        let p = self.route.sample(progress);
        vec![p.x, p.y, p.z]
    }
}

/// Route between two already-resolved anchor points.
#[wasm_bindgen(js_name = computeRoute)]
pub fn compute_route(
    from: &[f64],
    to: &[f64],
    from_face: &str,
    to_face: &str,
    axis_order: &str,
    extension: f64,
) -> RouteView {
    let route = isoflow_core::compute_route(
        &point(from),
        &point(to),
        tokens::parse_anchor(from_face).face,
        tokens::parse_anchor(to_face).face,
        &tokens::parse_axis_order(axis_order),
        extension,
    );
    RouteView { route }
}

/// Read-only view of one frame's draw list, back to front.
#[wasm_bindgen]
pub struct FrameView {
    frame: Frame,
}

#[wasm_bindgen]
impl FrameView {
    pub fn len(&self) -> usize {
        self.frame.items.len()
    }

    #[wasm_bindgen(js_name = isEmpty)]
    pub fn is_empty(&self) -> bool {
        self.frame.items.is_empty()
    }

    #[wasm_bindgen(getter, js_name = depthCalibrated)]
    pub fn depth_calibrated(&self) -> bool {
        self.frame.depth_calibrated
    }

    /// `"box"`, `"segment"` or `"particle"`.
    pub fn kind(&self, index: usize) -> Option<String> {
        self.frame.items.get(index).map(|item| {
            match item.kind {
                DrawKind::Box { .. } => "box",
                DrawKind::Segment { .. } => "segment",
                DrawKind::Particle { .. } => "particle",
            }
            .to_string()
        })
    }

    /// Box id or connector id.
    pub fn id(&self, index: usize) -> Option<String> {
        self.frame.items.get(index).map(|item| match &item.kind {
            DrawKind::Box { id, .. } => id.clone(),
            DrawKind::Segment { connector, .. } | DrawKind::Particle { connector, .. } => {
                connector.clone()
            }
        })
    }

    /// Rank usable as a CSS z-index.
    pub fn rank(&self, index: usize) -> Option<f64> {
        self.frame.items.get(index).map(|item| item.rank as f64)
    }

    /// Screen points: 8 corners for a box, start and end for a segment, the
    /// position for a particle. Flattened `[x0, y0, x1, y1, ...]`.
    pub fn points(&self, index: usize) -> Vec<f64> {
        let Some(item) = self.frame.items.get(index) else {
            return Vec::new();
        };
        match &item.kind {
            DrawKind::Box { corners, .. } => corners.iter().flat_map(|p| [p.x, p.y]).collect(),
            DrawKind::Segment { start, end, .. } => vec![start.x, start.y, end.x, end.y],
            DrawKind::Particle { position, .. } => vec![position.x, position.y],
        }
    }

    /// `[size, opacity]` for particles, empty otherwise.
    pub fn style(&self, index: usize) -> Vec<f64> {
        match self.frame.items.get(index).map(|item| &item.kind) {
            Some(DrawKind::Particle { size, opacity, .. }) => vec![*size, *opacity],
            _ => Vec::new(),
        }
    }
}

/// A scene plus the camera and projection it is drawn with.
#[wasm_bindgen]
pub struct IsoEngine {
    scene: Scene,
    camera: AngleBroadcast,
    projector: Projector,
}

impl IsoEngine {
    fn frame_at(&mut self, now_seconds: f64) -> Frame {
        let angles = self.camera.current();
        self.scene.frame(now_seconds, &angles, &self.projector)
    }
}

impl Default for IsoEngine {
    fn default() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }
}

#[wasm_bindgen]
impl IsoEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(scale: f64, origin_x: f64, origin_y: f64) -> IsoEngine {
        IsoEngine {
            scene: Scene::new(),
            camera: AngleBroadcast::default(),
            projector: Projector::new(scale, Point2::new(origin_x, origin_y)),
        }
    }

    /// Angle-change notification from the page; visible on the next frame.
    #[wasm_bindgen(js_name = setAngles)]
    pub fn set_angles(&mut self, rotate_x: f64, rotate_z: f64, perspective: f64) {
        self.camera.set(AngleConfig {
            rotate_x,
            rotate_z,
            perspective,
        });
    }

    #[wasm_bindgen(js_name = setProjection)]
    pub fn set_projection(&mut self, scale: f64, origin_x: f64, origin_y: f64) {
        self.projector = Projector::new(scale, Point2::new(origin_x, origin_y));
    }

    #[wasm_bindgen(js_name = addBox)]
    #[allow(clippy::too_many_arguments)]
    pub fn add_box(
        &mut self,
        id: &str,
        x: f64,
        y: f64,
        z: f64,
        width: f64,
        height: f64,
        depth: f64,
    ) -> Result<(), JsError> {
        self.scene
            .add_box(
                id,
                IsoBox::new(Point3::new(x, y, z), BoxGeometry::new(width, height, depth)),
            )
            .map_err(js_error)
    }

    #[wasm_bindgen(js_name = moveBox)]
    pub fn move_box(&mut self, id: &str, x: f64, y: f64, z: f64) -> Result<(), JsError> {
        self.scene
            .move_box(id, Point3::new(x, y, z))
            .map_err(js_error)
    }

    /// Connect two boxes. `particles` is an optional descriptor such as
    /// `"speed:2s rate:4/s flow:both"`.
    #[wasm_bindgen(js_name = addConnector)]
    #[allow(clippy::too_many_arguments)]
    pub fn add_connector(
        &mut self,
        id: &str,
        from_box: &str,
        from_anchor: &str,
        to_box: &str,
        to_anchor: &str,
        axis_order: &str,
        extension: f64,
        particles: Option<String>,
    ) -> Result<(), JsError> {
        let connector = Connector::new(
            tokens::parse_anchor(from_anchor),
            tokens::parse_anchor(to_anchor),
            tokens::parse_axis_order(axis_order),
        )
        .with_extension(extension.max(0.0));
        let particles = particles.as_deref().map(tokens::parse_particle_descriptor);
        self.scene
            .add_connector(id, from_box, to_box, connector, particles)
            .map_err(js_error)
    }

    #[wasm_bindgen(js_name = setAxisOrder)]
    pub fn set_axis_order(&mut self, connector_id: &str, axis_order: &str) -> bool {
        self.scene
            .set_axis_order(connector_id, tokens::parse_axis_order(axis_order))
    }

    /// Freshly computed route of a connector.
    pub fn route(&self, connector_id: &str) -> Option<RouteView> {
        self.scene.route(connector_id).map(|route| RouteView { route })
    }

    /// Advance to `now_ms` (a `performance.now()` style timestamp) and lay out the frame.
    pub fn frame(&mut self, now_ms: f64) -> FrameView {
        FrameView {
            frame: self.frame_at(now_ms / 1000.0),
        }
    }
}
