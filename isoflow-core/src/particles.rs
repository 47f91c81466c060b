/// Particles flowing along routes.
use log::trace;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_EMISSION_RATE, DEFAULT_PARTICLE_SIZE, DEFAULT_PARTICLE_SPEED, DEFAULT_TRAIL_SPACING,
    MAX_EMIT_PER_STEP,
};
use crate::error::{IsoError, Result};
use crate::geometry::Point3D;
use crate::route::{Route, Segment};

/// Travel direction of a single stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Progress grows from 0 to 1.
    Forward,
    /// Progress shrinks from 1 to 0.
    Backward,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Backward => -1.0,
        }
    }

    /// Progress a freshly emitted particle starts at.
    pub fn start(self) -> f64 {
        match self {
            Direction::Forward => 0.0,
            Direction::Backward => 1.0,
        }
    }
}

/// Which streams a connector runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flow {
    #[default]
    Forward,
    Backward,
    Both,
}

impl Flow {
    pub fn directions(self) -> &'static [Direction] {
        match self {
            Flow::Forward => &[Direction::Forward],
            Flow::Backward => &[Direction::Backward],
            Flow::Both => &[Direction::Forward, Direction::Backward],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailConfig {
    /// Trail points drawn behind each particle head.
    pub count: usize,
    /// Arclength between consecutive trail points.
    pub spacing: f64,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            count: 0,
            spacing: DEFAULT_TRAIL_SPACING,
        }
    }
}

/// Particle animation settings for one connector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    /// Progress units per second.
    pub speed: f64,
    /// Particles per second, per stream.
    pub emission_rate: f64,
    pub flow: Flow,
    /// Head size in pixels.
    pub size: f64,
    pub trail: TrailConfig,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            speed: DEFAULT_PARTICLE_SPEED,
            emission_rate: DEFAULT_EMISSION_RATE,
            flow: Flow::default(),
            size: DEFAULT_PARTICLE_SIZE,
            trail: TrailConfig::default(),
        }
    }
}

impl ParticleConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(IsoError::InvalidConfig(format!(
                "particle speed must be positive, got {}",
                self.speed
            )));
        }
        if !self.emission_rate.is_finite() || self.emission_rate <= 0.0 {
            return Err(IsoError::InvalidConfig(format!(
                "emission rate must be positive, got {}",
                self.emission_rate
            )));
        }
        if !self.size.is_finite() || self.size <= 0.0 {
            return Err(IsoError::InvalidConfig(format!(
                "particle size must be positive, got {}",
                self.size
            )));
        }
        if !self.trail.spacing.is_finite() || self.trail.spacing <= 0.0 {
            return Err(IsoError::InvalidConfig(format!(
                "trail spacing must be positive, got {}",
                self.trail.spacing
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub id: u64,
    pub progress: f64,
    /// Timestamp, in seconds, of the nominal emission instant.
    pub created_at: f64,
    pub direction: Direction,
}

impl Particle {
    pub fn is_alive(&self) -> bool {
        (0.0..=1.0).contains(&self.progress)
    }
}

/// Position at normalized arclength `progress` along a segment chain.
///
/// `progress` is clamped to [0, 1]. An empty chain or zero total length
/// yields `origin`.
pub fn sample_progress(
    segments: &[Segment],
    total_length: f64,
    progress: f64,
    origin: &Point3D,
) -> Point3D {
    if segments.is_empty() || total_length <= 0.0 {
        return *origin;
    }
    let target = progress.clamp(0.0, 1.0) * total_length;

    let mut travelled = 0.0;
    for segment in segments {
        if target <= travelled + segment.length {
            if segment.length <= 0.0 {
                return segment.start;
            }
            return segment.lerp((target - travelled) / segment.length);
        }
        travelled += segment.length;
    }
    // Rounding can leave the target a hair past the summed lengths.
    segments.last().map(|s| s.end).unwrap_or(*origin)
}

/// Result of [`step_particles`].
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub particles: Vec<Particle>,
    pub last_emit_time: Option<f64>,
    pub emitted: usize,
}

/// Advance one stream by `dt` seconds and emit whatever became due by `now`.
///
/// Existing particles move by `speed * dt` in `direction` and are dropped once
/// their progress leaves [0, 1]. A stream that has never emitted emits at
/// `now`; afterwards one particle is due every `1 / emission_rate` seconds,
/// each already advanced by the time elapsed since it was due. A stream whose
/// particles cannot move (non-positive speed) emits nothing.
#[allow(clippy::too_many_arguments)]
pub fn step_particles(
    particles: Vec<Particle>,
    dt: f64,
    speed: f64,
    direction: Direction,
    emission_rate: f64,
    last_emit_time: Option<f64>,
    now: f64,
    next_id: &mut u64,
) -> StepOutcome {
    let delta = direction.sign() * speed * dt.max(0.0);
    let mut particles: Vec<Particle> = particles
        .into_iter()
        .map(|mut p| {
            p.progress += delta;
            p
        })
        .filter(Particle::is_alive)
        .collect();

    let mut emitted = 0;
    let mut spawn = |particles: &mut Vec<Particle>, at: f64| {
        let progress = direction.start() + direction.sign() * speed * (now - at).max(0.0);
        let particle = Particle {
            id: *next_id,
            progress,
            created_at: at,
            direction,
        };
        *next_id += 1;
        if particle.is_alive() {
            particles.push(particle);
        }
    };

    let emitting = emission_rate.is_finite() && emission_rate > 0.0;
    let moving = speed.is_finite() && speed > 0.0;
    if !(emitting && moving) {
        return StepOutcome {
            particles,
            last_emit_time,
            emitted,
        };
    }

    let interval = 1.0 / emission_rate;
    let mut last = match last_emit_time {
        Some(t) => t,
        None => {
            spawn(&mut particles, now);
            emitted += 1;
            now
        }
    };
    while last + interval <= now {
        if emitted >= MAX_EMIT_PER_STEP {
            trace!("emission backlog dropped after {emitted} particles");
            last = now;
            break;
        }
        last += interval;
        spawn(&mut particles, last);
        emitted += 1;
    }

    StepOutcome {
        particles,
        last_emit_time: Some(last),
        emitted,
    }
}

/// State for one direction of flow on a connector.
#[derive(Debug, Clone)]
pub struct ParticleStream {
    direction: Direction,
    particles: Vec<Particle>,
    last_emit_time: Option<f64>,
    next_id: u64,
}

impl ParticleStream {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            particles: Vec::new(),
            last_emit_time: None,
            next_id: 0,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn step(&mut self, now: f64, dt: f64, config: &ParticleConfig) {
        let outcome = step_particles(
            std::mem::take(&mut self.particles),
            dt,
            config.speed,
            self.direction,
            config.emission_rate,
            self.last_emit_time,
            now,
            &mut self.next_id,
        );
        if outcome.emitted > 0 {
            trace!(
                "{:?} stream emitted {}, {} alive",
                self.direction,
                outcome.emitted,
                outcome.particles.len()
            );
        }
        self.particles = outcome.particles;
        self.last_emit_time = outcome.last_emit_time;
    }

    /// Drop all particles and restart emission on the next step.
    pub fn reset(&mut self) {
        self.particles.clear();
        self.last_emit_time = None;
    }
}

/// All particle streams of one connector.
#[derive(Debug, Clone)]
pub struct ParticleSystem {
    config: ParticleConfig,
    streams: Vec<ParticleStream>,
}

impl ParticleSystem {
    pub fn new(config: ParticleConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            streams: Self::streams_for(config.flow),
            config,
        })
    }

    fn streams_for(flow: Flow) -> Vec<ParticleStream> {
        flow.directions()
            .iter()
            .copied()
            .map(ParticleStream::new)
            .collect()
    }

    pub fn config(&self) -> &ParticleConfig {
        &self.config
    }

    /// Swap the configuration; streams restart only when the flow changes.
    pub fn set_config(&mut self, config: ParticleConfig) -> Result<()> {
        config.validate()?;
        if config.flow != self.config.flow {
            self.streams = Self::streams_for(config.flow);
        }
        self.config = config;
        Ok(())
    }

    pub fn step(&mut self, now: f64, dt: f64) {
        for stream in &mut self.streams {
            stream.step(now, dt, &self.config);
        }
    }

    pub fn reset(&mut self) {
        self.streams.iter_mut().for_each(ParticleStream::reset);
    }

    pub fn particles(&self) -> impl Iterator<Item = &Particle> {
        self.streams.iter().flat_map(|s| s.particles().iter())
    }
}

/// A sampled point of a particle's trail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailPoint {
    pub position: Point3D,
    pub size: f64,
    pub opacity: f64,
}

/// The particle head followed by up to `config.trail.count` points spaced
/// `config.trail.spacing` apart behind it (ahead in progress terms for
/// backward particles). Points that would fall off the route are omitted.
pub fn trail(route: &Route, particle: &Particle, config: &ParticleConfig) -> Vec<TrailPoint> {
    let count = config.trail.count;
    let mut points = Vec::with_capacity(count + 1);
    points.push(TrailPoint {
        position: route.sample(particle.progress),
        size: config.size,
        opacity: 1.0,
    });
    if route.total_length <= 0.0 {
        return points;
    }

    let head = particle.progress.clamp(0.0, 1.0) * route.total_length;
    for i in 1..=count {
        let at = head - particle.direction.sign() * i as f64 * config.trail.spacing;
        if !(0.0..=route.total_length).contains(&at) {
            break;
        }
        let fade = 1.0 - i as f64 / (count + 1) as f64;
        points.push(TrailPoint {
            position: route.point_at_distance(at),
            size: config.size * fade,
            opacity: fade,
        });
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::RouteAxis;
    use nalgebra::Point3;

    fn l_path() -> Route {
        let a = Segment::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            RouteAxis::Direct,
        );
        let b = Segment::new(
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(10.0, 10.0, 0.0),
            RouteAxis::Direct,
        );
        Route {
            origin: a.start,
            total_length: 20.0,
            segments: vec![a, b],
        }
    }

    fn particle(progress: f64, direction: Direction) -> Particle {
        Particle {
            id: 0,
            progress,
            created_at: 0.0,
            direction,
        }
    }

    #[test]
    fn test_sample_midpoint_is_corner() {
        let route = l_path();
        let p = sample_progress(&route.segments, route.total_length, 0.5, &route.origin);
        assert!((p - Point3::new(10.0, 0.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn test_sample_interpolates_and_clamps() {
        let route = l_path();
        assert!((route.sample(0.75) - Point3::new(10.0, 5.0, 0.0)).norm() < 1e-9);
        assert_eq!(route.sample(-1.0), Point3::new(0.0, 0.0, 0.0));
        assert_eq!(route.sample(2.0), Point3::new(10.0, 10.0, 0.0));
    }

    #[test]
    fn test_sample_empty_route_returns_origin() {
        let origin = Point3::new(3.0, 4.0, 5.0);
        assert_eq!(sample_progress(&[], 0.0, 0.5, &origin), origin);
        assert_eq!(sample_progress(&l_path().segments, 0.0, 0.5, &origin), origin);
    }

    #[test]
    fn test_forward_step_advances_and_retires() {
        let mut ids = 10;
        let particles = vec![
            particle(0.2, Direction::Forward),
            particle(0.98, Direction::Forward),
        ];
        let out = step_particles(
            particles,
            0.1,
            0.5,
            Direction::Forward,
            1.0,
            Some(0.0),
            0.5,
            &mut ids,
        );
        assert_eq!(out.emitted, 0);
        assert_eq!(out.particles.len(), 1);
        assert!((out.particles[0].progress - 0.25).abs() < 1e-12);
        assert_eq!(ids, 10);
    }

    #[test]
    fn test_particle_at_exactly_one_survives() {
        let mut ids = 0;
        let out = step_particles(
            vec![particle(0.5, Direction::Forward)],
            1.0,
            0.5,
            Direction::Forward,
            1.0,
            Some(10.0),
            10.5,
            &mut ids,
        );
        assert_eq!(out.particles.len(), 1);
        assert_eq!(out.particles[0].progress, 1.0);
    }

    #[test]
    fn test_backward_particles_run_from_one_to_zero() {
        let mut ids = 0;
        let out = step_particles(
            Vec::new(),
            0.0,
            0.5,
            Direction::Backward,
            1.0,
            None,
            3.0,
            &mut ids,
        );
        assert_eq!(out.emitted, 1);
        assert_eq!(out.particles[0].progress, 1.0);

        let out = step_particles(
            out.particles,
            1.0,
            0.5,
            Direction::Backward,
            1.0,
            out.last_emit_time,
            4.0,
            &mut ids,
        );
        let progresses: Vec<f64> = out.particles.iter().map(|p| p.progress).collect();
        assert_eq!(progresses, vec![0.5, 1.0]);
    }

    #[test]
    fn test_emission_is_frame_rate_independent() {
        let config = ParticleConfig {
            speed: 0.1,
            emission_rate: 4.0,
            ..ParticleConfig::default()
        };

        let mut coarse = ParticleStream::new(Direction::Forward);
        coarse.step(0.0, 0.0, &config);
        coarse.step(1.0, 1.0, &config);

        let mut fine = ParticleStream::new(Direction::Forward);
        fine.step(0.0, 0.0, &config);
        for i in 1..=8 {
            fine.step(i as f64 * 0.125, 0.125, &config);
        }

        let mut a: Vec<f64> = coarse.particles().iter().map(|p| p.progress).collect();
        let mut b: Vec<f64> = fine.particles().iter().map(|p| p.progress).collect();
        a.sort_by(f64::total_cmp);
        b.sort_by(f64::total_cmp);
        assert_eq!(a.len(), 5);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_emission_backlog_is_capped() {
        let mut ids = 0;
        let out = step_particles(
            Vec::new(),
            0.0,
            1e-6,
            Direction::Forward,
            1000.0,
            Some(0.0),
            10.0,
            &mut ids,
        );
        assert_eq!(out.emitted, MAX_EMIT_PER_STEP);
        assert_eq!(out.last_emit_time, Some(10.0));
    }

    #[test]
    fn test_stationary_stream_emits_nothing() {
        let mut ids = 0;
        let mut particles = Vec::new();
        let mut last_emit = None;
        for i in 0..6000 {
            let out = step_particles(
                particles,
                0.1,
                0.0,
                Direction::Forward,
                2.0,
                last_emit,
                i as f64 * 0.1,
                &mut ids,
            );
            particles = out.particles;
            last_emit = out.last_emit_time;
        }
        assert!(particles.is_empty());
        assert_eq!(ids, 0);
    }

    #[test]
    fn test_zero_speed_config_is_rejected() {
        let config = ParticleConfig {
            speed: 0.0,
            ..ParticleConfig::default()
        };
        assert!(matches!(
            ParticleSystem::new(config),
            Err(IsoError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_particle_system_runs_both_streams() {
        let config = ParticleConfig {
            flow: Flow::Both,
            ..ParticleConfig::default()
        };
        let mut system = ParticleSystem::new(config).unwrap();
        system.step(0.0, 0.0);
        let directions: Vec<Direction> = system.particles().map(|p| p.direction).collect();
        assert_eq!(directions, vec![Direction::Forward, Direction::Backward]);

        system.reset();
        assert_eq!(system.particles().count(), 0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ParticleConfig {
            emission_rate: 0.0,
            ..ParticleConfig::default()
        };
        assert!(matches!(
            ParticleSystem::new(config),
            Err(IsoError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_trail_fades_behind_head() {
        let route = l_path();
        let config = ParticleConfig {
            size: 10.0,
            trail: TrailConfig {
                count: 3,
                spacing: 2.0,
            },
            ..ParticleConfig::default()
        };
        let points = trail(&route, &particle(0.5, Direction::Forward), &config);
        assert_eq!(points.len(), 4);
        assert!((points[1].position - Point3::new(8.0, 0.0, 0.0)).norm() < 1e-9);
        for pair in points.windows(2) {
            assert!(pair[1].size < pair[0].size);
            assert!(pair[1].opacity < pair[0].opacity);
        }
    }

    #[test]
    fn test_trail_for_backward_particle_lies_ahead() {
        let route = l_path();
        let config = ParticleConfig {
            trail: TrailConfig {
                count: 5,
                spacing: 2.0,
            },
            ..ParticleConfig::default()
        };
        let points = trail(&route, &particle(0.9, Direction::Backward), &config);
        // Head at 18, trail at 20; 22 and beyond fall off the route.
        assert_eq!(points.len(), 2);
        assert!((points[1].position - Point3::new(10.0, 10.0, 0.0)).norm() < 1e-9);
    }
}
