/// Example: Load a JSON scene description and render it in the terminal
///
/// Usage: cargo run --example load_scene -- path/to/scene.json

use isoflow_core::{Scene, SceneDescription};
use isoflow_terminal::{demo_scene, TerminalApp};
use std::env;
use std::fs;
use std::io;

fn main() -> io::Result<()> {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <scene.json>", args[0]);
        eprintln!("\nNo scene file provided, using the demo scene...");
        let scene = demo_scene().map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let mut app = TerminalApp::new(scene, Default::default(), 0.25)?;
        return app.run();
    }

    let path = &args[1];
    println!("Loading scene: {}", path);

    let text = fs::read_to_string(path).map_err(|e| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("Failed to read scene file: {}", e),
        )
    })?;
    let description: SceneDescription = serde_json::from_str(&text).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Failed to parse scene: {}", e),
        )
    })?;
    let scene = Scene::from_description(&description)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    println!(
        "Loaded {} boxes and {} connectors",
        description.boxes.len(),
        description.connectors.len()
    );
    std::thread::sleep(std::time::Duration::from_millis(500));

    let mut app = TerminalApp::new(scene, description.angles, description.projector.scale)?;
    app.run()?;

    println!("Thank you for using Isoflow!");
    Ok(())
}
