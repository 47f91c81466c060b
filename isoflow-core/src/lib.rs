/// Isoflow Core Library - 2.5D isometric projection, connector routing and particle flow
///
/// This library provides the stateless core of an isometric scene renderer:
/// projecting logical 3D coordinates to the screen, addressing anchors on box
/// faces, routing connectors between them, ranking paint order and moving
/// particles along the routes. Hosts own the frame loop and the camera state.

pub mod anchor;
pub mod animation;
pub mod camera;
pub mod constants;
pub mod depth;
pub mod error;
pub mod geometry;
pub mod particles;
pub mod projection;
pub mod route;
pub mod scene;
pub mod tokens;

// Re-export commonly used types
pub use anchor::{face_anchor_offset, Anchor, AnchorPosition, Face};
pub use animation::{AnimationLoop, FrameClock};
pub use camera::{AngleBroadcast, SubscriptionId};
pub use depth::{is_calibrated, segment_rank, z_order_rank, DepthSorter};
pub use error::{IsoError, Result};
pub use geometry::{Axis, BoxGeometry, IsoBox, Point2D, Point3D};
pub use particles::{
    sample_progress, step_particles, trail, Direction, Flow, Particle, ParticleConfig,
    ParticleStream, ParticleSystem, TrailConfig, TrailPoint,
};
pub use projection::{iso_to_screen, screen_to_iso, AngleConfig, Projector};
pub use route::{compute_route, AxisOrder, Connector, Route, RouteAxis, Segment};
pub use scene::{DrawItem, DrawKind, Frame, Scene, SceneDescription};
