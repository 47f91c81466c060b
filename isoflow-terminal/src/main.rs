/// Isoflow Terminal Demo - Connected boxes with flowing particles
///
/// Renders an isometric scene with routed connectors in the terminal.
/// Controls:
///   - WASD / Arrow Keys: Tilt and spin the camera
///   - R: Reset camera angles
///   - Space: Pause, C: Clear particles
///   - Q/ESC: Quit

use isoflow_core::AngleConfig;
use isoflow_terminal::{demo_scene, TerminalApp};
use std::io;

fn main() -> io::Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let scene = demo_scene().map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    println!("Starting terminal renderer (press Q to quit)...");
    std::thread::sleep(std::time::Duration::from_millis(500));

    let mut app = TerminalApp::new(scene, AngleConfig::default(), 0.25)?;
    app.run()?;

    println!("Thank you for using Isoflow!");
    Ok(())
}
