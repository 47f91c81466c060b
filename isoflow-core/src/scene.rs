/// Scene façade: boxes, connectors and their particles, evaluated per frame.
use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::anchor::Anchor;
use crate::animation::FrameClock;
use crate::depth::{segment_rank, z_order_rank, DepthSorter};
use crate::error::{IsoError, Result};
use crate::geometry::{BoxGeometry, IsoBox, Point2D, Point3D};
use crate::particles::{trail, ParticleConfig, ParticleSystem};
use crate::projection::{AngleConfig, Projector};
use crate::route::{AxisOrder, Connector, Route};
use crate::tokens::parse_particle_descriptor;

/// Particle settings as they appear in a scene description: either a
/// compact descriptor string or a structured record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParticleSpec {
    Descriptor(String),
    Config(ParticleConfig),
}

impl ParticleSpec {
    pub fn resolve(&self) -> ParticleConfig {
        match self {
            ParticleSpec::Descriptor(s) => parse_particle_descriptor(s),
            ParticleSpec::Config(c) => *c,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxDescription {
    pub id: String,
    pub position: Point3D,
    pub size: BoxGeometry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorDescription {
    pub id: String,
    pub from: String,
    #[serde(default)]
    pub from_anchor: Anchor,
    pub to: String,
    #[serde(default)]
    pub to_anchor: Anchor,
    #[serde(default)]
    pub axis_order: AxisOrder,
    #[serde(default)]
    pub extension: f64,
    #[serde(default)]
    pub particles: Option<ParticleSpec>,
}

/// Serializable description of a whole scene.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneDescription {
    #[serde(default)]
    pub projector: Projector,
    #[serde(default)]
    pub angles: AngleConfig,
    #[serde(default)]
    pub boxes: Vec<BoxDescription>,
    #[serde(default)]
    pub connectors: Vec<ConnectorDescription>,
}

/// What a draw item paints.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawKind {
    Box {
        id: String,
        /// Screen positions of [`IsoBox::corners`].
        corners: [Point2D; 8],
    },
    Segment {
        connector: String,
        index: usize,
        start: Point2D,
        end: Point2D,
    },
    Particle {
        connector: String,
        particle: u64,
        /// 0 for the head, then trail points in order.
        trail_index: usize,
        position: Point2D,
        size: f64,
        opacity: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub rank: i64,
    pub kind: DrawKind,
}

/// Everything to paint for one frame, back to front.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub items: Vec<DrawItem>,
    /// False when the camera is outside the range the depth ranks are tuned for.
    pub depth_calibrated: bool,
    pub dt: f64,
}

#[derive(Debug, Clone)]
struct SceneConnector {
    id: String,
    from_box: String,
    to_box: String,
    connector: Connector,
    particles: Option<ParticleSystem>,
}

#[derive(Debug, Default)]
pub struct Scene {
    boxes: Vec<(String, IsoBox)>,
    index: HashMap<String, usize>,
    connectors: Vec<SceneConnector>,
    clock: FrameClock,
    /// Sum of clamped frame deltas; particle motion and emission both run on it.
    sim_time: f64,
    sorter: DepthSorter,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_description(description: &SceneDescription) -> Result<Self> {
        let mut scene = Self::new();
        for b in &description.boxes {
            scene.add_box(&b.id, IsoBox::new(b.position, b.size))?;
        }
        for c in &description.connectors {
            if c.extension < 0.0 || !c.extension.is_finite() {
                return Err(IsoError::InvalidConfig(format!(
                    "connector {} has invalid extension {}",
                    c.id, c.extension
                )));
            }
            let connector = Connector::new(c.from_anchor, c.to_anchor, c.axis_order.clone())
                .with_extension(c.extension);
            let particles = c.particles.as_ref().map(ParticleSpec::resolve);
            scene.add_connector(&c.id, &c.from, &c.to, connector, particles)?;
        }
        Ok(scene)
    }

    pub fn add_box(&mut self, id: &str, iso_box: IsoBox) -> Result<()> {
        if self.index.contains_key(id) {
            return Err(IsoError::DuplicateBox(id.to_string()));
        }
        self.index.insert(id.to_string(), self.boxes.len());
        self.boxes.push((id.to_string(), iso_box));
        Ok(())
    }

    pub fn get_box(&self, id: &str) -> Result<&IsoBox> {
        self.index
            .get(id)
            .map(|&i| &self.boxes[i].1)
            .ok_or_else(|| IsoError::UnknownBox(id.to_string()))
    }

    pub fn move_box(&mut self, id: &str, position: Point3D) -> Result<()> {
        let i = *self
            .index
            .get(id)
            .ok_or_else(|| IsoError::UnknownBox(id.to_string()))?;
        self.boxes[i].1.position = position;
        Ok(())
    }

    pub fn resize_box(&mut self, id: &str, geometry: BoxGeometry) -> Result<()> {
        let i = *self
            .index
            .get(id)
            .ok_or_else(|| IsoError::UnknownBox(id.to_string()))?;
        self.boxes[i].1.geometry = geometry;
        Ok(())
    }

    /// Remove a box along with every connector attached to it.
    pub fn remove_box(&mut self, id: &str) -> Result<IsoBox> {
        let i = self
            .index
            .remove(id)
            .ok_or_else(|| IsoError::UnknownBox(id.to_string()))?;
        let (_, removed) = self.boxes.remove(i);
        for slot in self.index.values_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
        let before = self.connectors.len();
        self.connectors
            .retain(|c| c.from_box != id && c.to_box != id);
        if self.connectors.len() != before {
            debug!(
                "removed {} connector(s) attached to box {id}",
                before - self.connectors.len()
            );
        }
        Ok(removed)
    }

    pub fn add_connector(
        &mut self,
        id: &str,
        from_box: &str,
        to_box: &str,
        connector: Connector,
        particles: Option<ParticleConfig>,
    ) -> Result<()> {
        self.get_box(from_box)?;
        self.get_box(to_box)?;
        let particles = particles.map(ParticleSystem::new).transpose()?;
        self.connectors.push(SceneConnector {
            id: id.to_string(),
            from_box: from_box.to_string(),
            to_box: to_box.to_string(),
            connector,
            particles,
        });
        Ok(())
    }

    /// Change a connector's axis order; its route is rebuilt on next use.
    pub fn set_axis_order(&mut self, connector_id: &str, order: AxisOrder) -> bool {
        match self.connectors.iter_mut().find(|c| c.id == connector_id) {
            Some(c) => {
                c.connector.order = order;
                true
            }
            None => false,
        }
    }

    /// A freshly computed route for a connector.
    pub fn route(&self, connector_id: &str) -> Option<Route> {
        let c = self.connectors.iter().find(|c| c.id == connector_id)?;
        self.route_for(c).ok()
    }

    fn route_for(&self, c: &SceneConnector) -> Result<Route> {
        let from = self.get_box(&c.from_box)?;
        let to = self.get_box(&c.to_box)?;
        Ok(c.connector.route(from, to))
    }

    pub fn boxes(&self) -> impl Iterator<Item = (&str, &IsoBox)> {
        self.boxes.iter().map(|(id, b)| (id.as_str(), b))
    }

    /// Clear every particle; emission restarts on the next frame, which sees dt = 0.
    pub fn reset_particles(&mut self) {
        self.clock.reset();
        for c in &mut self.connectors {
            if let Some(p) = c.particles.as_mut() {
                p.reset();
            }
        }
    }

    /// Advance to `now` (seconds) and lay out everything to paint.
    pub fn frame(&mut self, now: f64, angles: &AngleConfig, projector: &Projector) -> Frame {
        let dt = self.clock.tick(now);
        self.sim_time += dt;
        let sim_time = self.sim_time;
        let mut items = Vec::new();

        for (id, b) in &self.boxes {
            let corners = b.corners().map(|p| projector.to_screen(&p, angles));
            items.push(DrawItem {
                rank: z_order_rank(&b.position, b.geometry.width, b.geometry.height),
                kind: DrawKind::Box {
                    id: id.clone(),
                    corners,
                },
            });
        }

        let mut routes = Vec::with_capacity(self.connectors.len());
        for c in &self.connectors {
            routes.push(self.route_for(c).ok());
        }

        for (c, route) in self.connectors.iter_mut().zip(routes) {
            let Some(route) = route else {
                continue;
            };
            for (index, segment) in route.segments.iter().enumerate() {
                items.push(DrawItem {
                    rank: segment_rank(segment),
                    kind: DrawKind::Segment {
                        connector: c.id.clone(),
                        index,
                        start: projector.to_screen(&segment.start, angles),
                        end: projector.to_screen(&segment.end, angles),
                    },
                });
            }

            let Some(system) = c.particles.as_mut() else {
                continue;
            };
            system.step(sim_time, dt);
            let config = *system.config();
            for particle in system.particles() {
                let points = trail(&route, particle, &config);
                for (trail_index, point) in points.into_iter().enumerate() {
                    items.push(DrawItem {
                        rank: z_order_rank(&point.position, 0.0, 0.0),
                        kind: DrawKind::Particle {
                            connector: c.id.clone(),
                            particle: particle.id,
                            trail_index,
                            position: projector.to_screen(&point.position, angles),
                            size: point.size,
                            opacity: point.opacity,
                        },
                    });
                }
            }
        }

        let depth_calibrated = self.sorter.paint_order(&mut items, angles, |item| item.rank);
        Frame {
            items,
            depth_calibrated,
            dt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::{AnchorPosition, Face};
    use crate::constants::MAX_FRAME_DT;
    use nalgebra::Point3;

    fn two_boxes() -> Scene {
        let mut scene = Scene::new();
        scene
            .add_box("a", IsoBox::new(Point3::new(0.0, 0.0, 0.0), BoxGeometry::cube(100.0)))
            .unwrap();
        scene
            .add_box(
                "b",
                IsoBox::new(Point3::new(200.0, 200.0, 0.0), BoxGeometry::cube(100.0)),
            )
            .unwrap();
        scene
    }

    fn box_order(frame: &Frame) -> Vec<&str> {
        frame
            .items
            .iter()
            .filter_map(|item| match &item.kind {
                DrawKind::Box { id, .. } => Some(id.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_duplicate_and_unknown_boxes() {
        let mut scene = two_boxes();
        assert_eq!(
            scene.add_box("a", IsoBox::new(Point3::origin(), BoxGeometry::cube(1.0))),
            Err(IsoError::DuplicateBox("a".into()))
        );
        let connector = Connector::new(Anchor::default(), Anchor::default(), AxisOrder::Auto);
        assert_eq!(
            scene.add_connector("c", "a", "zzz", connector, None),
            Err(IsoError::UnknownBox("zzz".into()))
        );
    }

    #[test]
    fn test_frame_paints_far_box_last() {
        let mut scene = two_boxes();
        let frame = scene.frame(0.0, &AngleConfig::default(), &Projector::default());
        assert!(frame.depth_calibrated);
        assert_eq!(box_order(&frame), vec!["a", "b"]);
    }

    #[test]
    fn test_route_follows_moved_box() {
        let mut scene = two_boxes();
        let connector = Connector::new(
            Anchor::new(Face::Right, AnchorPosition::Mc),
            Anchor::new(Face::Left, AnchorPosition::Mc),
            AxisOrder::Auto,
        );
        scene.add_connector("ab", "a", "b", connector, None).unwrap();
        let before = scene.route("ab").unwrap();

        scene.move_box("b", Point3::new(400.0, 0.0, 0.0)).unwrap();
        let after = scene.route("ab").unwrap();

        assert_ne!(before, after);
        assert_eq!(after.segments.len(), 1);
        assert!((after.total_length - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_particles_appear_in_frames() {
        let mut scene = two_boxes();
        let connector = Connector::new(
            Anchor::new(Face::Right, AnchorPosition::Mc),
            Anchor::new(Face::Left, AnchorPosition::Mc),
            AxisOrder::Auto,
        );
        scene
            .add_connector("ab", "a", "b", connector, Some(ParticleConfig::default()))
            .unwrap();

        let angles = AngleConfig::default();
        let projector = Projector::default();
        let first = scene.frame(1.0, &angles, &projector);
        let second = scene.frame(1.5, &angles, &projector);
        let count = |f: &Frame| {
            f.items
                .iter()
                .filter(|i| matches!(i.kind, DrawKind::Particle { .. }))
                .count()
        };
        assert_eq!(first.dt, 0.0);
        assert_eq!(count(&first), 1);
        assert!((second.dt - 0.5).abs() < 1e-12);
        assert_eq!(count(&second), 2);
    }

    #[test]
    fn test_stalled_frame_keeps_particle_spacing() {
        let mut scene = two_boxes();
        let connector = Connector::new(Anchor::default(), Anchor::default(), AxisOrder::Direct);
        let config = ParticleConfig {
            emission_rate: 20.0,
            ..ParticleConfig::default()
        };
        scene
            .add_connector("ab", "a", "b", connector, Some(config))
            .unwrap();
        let angles = AngleConfig::default();
        let projector = Projector::default();

        scene.frame(0.0, &angles, &projector);
        scene.frame(0.1, &angles, &projector);
        let frame = scene.frame(10.0, &angles, &projector);
        assert_eq!(frame.dt, MAX_FRAME_DT);

        let mut heads: Vec<(u64, Point2D)> = frame
            .items
            .iter()
            .filter_map(|item| match item.kind {
                DrawKind::Particle {
                    particle,
                    trail_index: 0,
                    position,
                    ..
                } => Some((particle, position)),
                _ => None,
            })
            .collect();
        heads.sort_by_key(|(id, _)| *id);

        // 0.35 s of simulated time at 20/s, not a backlog of 64.
        assert!((7..=8).contains(&heads.len()));
        let gaps: Vec<f64> = heads
            .windows(2)
            .map(|pair| (pair[1].1 - pair[0].1).norm())
            .collect();
        for gap in &gaps {
            assert!((gap - gaps[0]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_reset_particles_restarts_emission() {
        let mut scene = two_boxes();
        let connector = Connector::new(Anchor::default(), Anchor::default(), AxisOrder::Direct);
        scene
            .add_connector("ab", "a", "b", connector, Some(ParticleConfig::default()))
            .unwrap();
        let angles = AngleConfig::default();
        let projector = Projector::default();
        let heads = |f: &Frame| {
            f.items
                .iter()
                .filter(|i| matches!(i.kind, DrawKind::Particle { .. }))
                .count()
        };

        scene.frame(1.0, &angles, &projector);
        assert_eq!(heads(&scene.frame(1.2, &angles, &projector)), 1);

        scene.reset_particles();
        let frame = scene.frame(5.0, &angles, &projector);
        assert_eq!(frame.dt, 0.0);
        assert_eq!(heads(&frame), 1);
    }

    #[test]
    fn test_remove_box_drops_attached_connectors() {
        let mut scene = two_boxes();
        let connector = Connector::new(Anchor::default(), Anchor::default(), AxisOrder::Direct);
        scene.add_connector("ab", "a", "b", connector, None).unwrap();
        scene.remove_box("a").unwrap();
        assert!(scene.route("ab").is_none());
        assert!(scene.get_box("b").is_ok());
    }
}
