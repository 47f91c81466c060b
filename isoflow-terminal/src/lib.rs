/// Terminal host for the isometric scene: frame loop, camera controls, ASCII output
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self},
};
use isoflow_core::{
    AngleBroadcast, AngleConfig, AnimationLoop, Anchor, AnchorPosition, AxisOrder, BoxGeometry,
    Connector, Face, Flow, IsoBox, ParticleConfig, Projector, Scene, TrailConfig,
};
use log::{info, warn};
use nalgebra::{Point2, Point3};
use std::cell::Cell;
use std::io::{self, stdout, Write};
use std::rc::Rc;
use std::time::{Duration, Instant};

pub mod renderer;

pub use renderer::AsciiRenderer;

/// Degrees per key press
const ROTATE_STEP: f64 = 2.5;

/// Main application struct for terminal isometric rendering
pub struct TerminalApp {
    scene: Scene,
    camera: AngleBroadcast,
    projector: Projector,
    renderer: AsciiRenderer,
    frame_loop: AnimationLoop<()>,
    angles_changed: Rc<Cell<bool>>,
    paused: bool,
    /// Scene time in seconds; frozen while paused.
    sim_time: f64,
    started: Instant,
    last_fps_sample: Instant,
    frame_count: u32,
    fps: f32,
    calibrated: bool,
}

impl TerminalApp {
    pub fn new(scene: Scene, angles: AngleConfig, scale: f64) -> io::Result<Self> {
        let (width, height) = terminal::size()?;

        let mut camera = AngleBroadcast::new(angles);
        let angles_changed = Rc::new(Cell::new(false));
        let flag = Rc::clone(&angles_changed);
        camera.subscribe(move |angles| {
            info!(
                "camera now rotateX={:.1} rotateZ={:.1}",
                angles.rotate_x, angles.rotate_z
            );
            flag.set(true);
        });

        Ok(Self {
            scene,
            camera,
            projector: Projector::new(scale, centre(width, height)),
            renderer: AsciiRenderer::new(width as usize, height as usize),
            frame_loop: AnimationLoop::new(),
            angles_changed,
            paused: false,
            sim_time: 0.0,
            started: Instant::now(),
            last_fps_sample: Instant::now(),
            frame_count: 0,
            fps: 0.0,
            calibrated: true,
        })
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        self.stop();
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    /// Stop the frame loop. Calling it again is a no-op.
    pub fn stop(&mut self) {
        self.frame_loop.stop(|_| {});
    }

    fn now(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 30); // 30 FPS target
        self.frame_loop.start();

        loop {
            let frame_start = Instant::now();
            self.frame_loop.scheduled(());
            let now = self.now();
            let Some(dt) = self.frame_loop.begin_frame(now) else {
                break;
            };
            if !self.paused {
                self.sim_time += dt;
            }

            // Handle input
            while event::poll(Duration::from_millis(0))? {
                self.handle_input()?;
            }
            if !self.frame_loop.is_running() {
                break;
            }

            // Render
            self.render()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_fps_sample).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_fps_sample).as_secs_f32();
                self.frame_count = 0;
                self.last_fps_sample = now;
            }
        }

        Ok(())
    }

    fn handle_input(&mut self) -> io::Result<()> {
        match event::read()? {
            Event::Key(KeyEvent { code, .. }) => match code {
                KeyCode::Char('q') | KeyCode::Esc => self.stop(),
                KeyCode::Char('w') | KeyCode::Up => self.camera.rotate(ROTATE_STEP, 0.0),
                KeyCode::Char('s') | KeyCode::Down => self.camera.rotate(-ROTATE_STEP, 0.0),
                KeyCode::Char('a') | KeyCode::Left => self.camera.rotate(0.0, -ROTATE_STEP),
                KeyCode::Char('d') | KeyCode::Right => self.camera.rotate(0.0, ROTATE_STEP),
                KeyCode::Char('r') => self.camera.set(AngleConfig::default()),
                KeyCode::Char(' ') => self.paused = !self.paused,
                KeyCode::Char('c') => self.scene.reset_particles(),
                _ => {}
            },
            Event::Resize(width, height) => {
                self.renderer.resize(width as usize, height as usize);
                self.projector.origin = centre(width, height);
            }
            _ => {}
        }
        Ok(())
    }

    fn render(&mut self) -> io::Result<()> {
        // Always read the camera fresh; never reuse a frame's copy.
        let angles = self.camera.current();
        if self.angles_changed.replace(false) && !isoflow_core::is_calibrated(&angles) {
            warn!("camera moved away from the default isometric angles; stacking may be off");
        }

        // A paused scene sees the same timestamp again, so nothing moves or emits.
        let frame = self.scene.frame(self.sim_time, &angles, &self.projector);
        self.calibrated = frame.depth_calibrated;
        self.renderer.clear();
        self.renderer.render_frame(&frame);

        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;
        self.renderer.draw(&mut stdout)?;

        // Draw UI overlay
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(if self.calibrated { Color::Yellow } else { Color::Red }),
            Print(format!(
                "Isoflow | FPS: {:.1} | rotX {:.1} rotZ {:.1}{} | WASD/Arrows=Camera R=Reset Space=Pause C=Clear Q=Quit",
                self.fps,
                angles.rotate_x,
                angles.rotate_z,
                if self.calibrated { "" } else { " (uncalibrated depth)" },
            )),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}

/// Projector origin for a terminal of the given size, in screen units.
fn centre(width: u16, height: u16) -> Point2<f64> {
    Point2::new(
        width as f64 / 2.0,
        height as f64 / renderer::CELL_ASPECT / 2.0,
    )
}

/// A small three-tier pipeline used when no scene file is given.
pub fn demo_scene() -> isoflow_core::Result<Scene> {
    let mut scene = Scene::new();
    let tier = BoxGeometry::new(60.0, 60.0, 30.0);
    scene.add_box("client", IsoBox::new(Point3::new(-140.0, 0.0, 0.0), tier))?;
    scene.add_box("api", IsoBox::new(Point3::new(0.0, 0.0, 0.0), tier))?;
    scene.add_box(
        "db",
        IsoBox::new(Point3::new(0.0, 160.0, 0.0), BoxGeometry::new(80.0, 60.0, 50.0)),
    )?;
    scene.add_box(
        "cache",
        IsoBox::new(Point3::new(140.0, -60.0, 0.0), BoxGeometry::cube(40.0)),
    )?;

    scene.add_connector(
        "client-api",
        "client",
        "api",
        Connector::new(
            Anchor::center(Face::Right),
            Anchor::center(Face::Left),
            AxisOrder::Auto,
        ),
        Some(ParticleConfig {
            flow: Flow::Both,
            trail: TrailConfig {
                count: 3,
                spacing: 6.0,
            },
            ..ParticleConfig::default()
        }),
    )?;
    scene.add_connector(
        "api-db",
        "api",
        "db",
        Connector::new(
            Anchor::new(Face::Front, AnchorPosition::Bc),
            Anchor::center(Face::Top),
            AxisOrder::Axes(vec![isoflow_core::Axis::Y]),
        )
        .with_extension(20.0),
        Some(ParticleConfig::default()),
    )?;
    scene.add_connector(
        "api-cache",
        "api",
        "cache",
        Connector::new(
            Anchor::new(Face::Top, AnchorPosition::Tr),
            Anchor::center(Face::Top),
            AxisOrder::Auto,
        )
        .with_extension(25.0),
        None,
    )?;
    Ok(scene)
}
