use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use glam::{Vec2, Vec3};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vantage_author::EditorManager;
use vantage_common::{Transform, Viewport};
use vantage_input::{InputState, MouseButton};
use vantage_kernel::{CameraController, World, spawn_editor_gizmos};
use vantage_persist::JsonSceneStore;
use vantage_render::{DeviceCall, RecordingDevice, Renderer, RenderTarget};
use vantage_tools::WorldInspector;

#[derive(Parser)]
#[command(name = "vantage-cli", about = "Headless tool for vantage scenes")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Directory holding scene files
    #[arg(long, default_value = "./scenes", global = true)]
    scene_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate versions
    Info,
    /// Create, list and inspect scene files
    Scene {
        #[command(subcommand)]
        action: SceneAction,
    },
    /// Render one frame on the recording device and summarize the calls
    Frame {
        /// Scene to load; an empty world with one cube otherwise
        #[arg(long)]
        scene: Option<String>,
        #[arg(long, default_value = "640")]
        width: u32,
        #[arg(long, default_value = "480")]
        height: u32,
        /// Hold the primary button so the picking pass runs
        #[arg(long)]
        picking: bool,
    },
    /// Ray cast from the editor camera through a pixel
    Pick {
        #[arg(long)]
        scene: Option<String>,
        x: f32,
        y: f32,
        #[arg(long, default_value = "640")]
        width: u32,
        #[arg(long, default_value = "480")]
        height: u32,
    },
}

#[derive(Subcommand)]
enum SceneAction {
    /// Write a scene with actors placed in a row along +Z
    New {
        name: String,
        /// Comma-separated actor type tags
        #[arg(long, value_delimiter = ',', default_value = "Cube,Sphere,Cylinder")]
        actors: Vec<String>,
        #[arg(long, default_value = "2.0")]
        spacing: f32,
    },
    /// List scenes in the scene directory
    List,
    /// Load a scene and print its actors
    Inspect {
        name: String,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!(scene_dir = %cli.scene_dir.display(), "vantage-cli starting");

    match cli.command {
        Commands::Info => {
            println!("vantage-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("kernel: {}", vantage_kernel::crate_info());
            println!("render: {}", vantage_render::crate_info());
            println!("persist: {}", vantage_persist::crate_info());
            println!("author: {}", vantage_author::crate_info());
            println!("tools: {}", vantage_tools::crate_info());
            println!("actor types: {}", vantage_kernel::BUILTIN_TAGS.join(", "));
        }
        Commands::Scene { action } => {
            let mut store = JsonSceneStore::open(&cli.scene_dir)?;
            match action {
                SceneAction::New {
                    name,
                    actors,
                    spacing,
                } => {
                    let world = build_scene(&name, &actors, spacing);
                    world.save_world(&mut store)?;
                    println!(
                        "Wrote {} ({} actors)",
                        store.scene_path(&name)?.display(),
                        world.describe().actors.len()
                    );
                }
                SceneAction::List => {
                    for name in store.list()? {
                        println!("{name}");
                    }
                }
                SceneAction::Inspect { name, json } => {
                    let world = editor_world(&store, Some(&name))?;
                    let summary = WorldInspector::summary(&world);
                    let actors = WorldInspector::list_actors(&world);
                    if json {
                        let value = serde_json::json!({ "summary": summary, "actors": actors });
                        println!("{}", serde_json::to_string_pretty(&value)?);
                    } else {
                        println!("{summary}");
                        for info in actors {
                            println!("  {info}");
                        }
                    }
                }
            }
        }
        Commands::Frame {
            scene,
            width,
            height,
            picking,
        } => {
            let store = JsonSceneStore::open(&cli.scene_dir)?;
            let mut world = editor_world(&store, scene.as_deref())?;
            let mut input = InputState::new(Viewport::new(width, height));
            if picking {
                input.button_down(MouseButton::Left);
            }
            let mut renderer = Renderer::new(RecordingDevice::new(width, height));
            renderer.device_mut().clear_calls();

            world.tick(&input, 0.0);
            world.render(&mut renderer, &input);
            world.late_tick(0.0);

            for (line, count) in summarize_calls(renderer.device().calls()) {
                println!("{count:>5}  {line}");
            }
        }
        Commands::Pick {
            scene,
            x,
            y,
            width,
            height,
        } => {
            let store = JsonSceneStore::open(&cli.scene_dir)?;
            let mut world = editor_world(&store, scene.as_deref())?;
            world.tick(&InputState::new(Viewport::new(width, height)), 0.0);

            let viewport = Viewport::new(width, height);
            let ndc = pixel_to_ndc(Vec2::new(x, y), viewport);
            let mut editor = EditorManager::new();
            match world.ray_casting(ndc, viewport.aspect_ratio(), &mut editor) {
                Some(id) => {
                    let info = WorldInspector::inspect_actor(&world, id)
                        .context("selected actor vanished")?;
                    println!("{}", world.billboard().text());
                    println!("{info}");
                }
                None => println!("no hit"),
            }
        }
    }

    Ok(())
}

/// Non-gizmo actors from `tags`, one every `spacing` units along +Z.
fn build_scene(name: &str, tags: &[String], spacing: f32) -> World {
    let mut world = World::new();
    world.set_scene_name(name);
    for (i, tag) in tags.iter().enumerate() {
        let Some(id) = world.spawn_by_tag(tag) else {
            continue;
        };
        let offset = (i as f32 - (tags.len() as f32 - 1.0) / 2.0) * spacing;
        if let Some(actor) = world.actor_mut(id) {
            actor.set_transform(Transform::from_position(Vec3::new(0.0, 0.0, offset)));
        }
    }
    world
}

/// Editor gizmos plus the named scene, or a single cube at the origin.
fn editor_world(store: &JsonSceneStore, scene: Option<&str>) -> anyhow::Result<World> {
    let mut world = World::new();
    spawn_editor_gizmos(&mut world, CameraController::default());
    match scene {
        Some(name) => {
            if !world.load_world(store, name)? {
                bail!("scene '{name}' not found in {}", store.root().display());
            }
        }
        None => {
            world.spawn_by_tag("Cube");
        }
    }
    Ok(world)
}

fn pixel_to_ndc(pixel: Vec2, viewport: Viewport) -> Vec2 {
    let mut input = InputState::new(viewport);
    input.set_cursor(pixel);
    input.cursor_ndc()
}

/// Group device calls into readable lines with counts, in first-seen order.
fn summarize_calls(calls: &[DeviceCall]) -> Vec<(String, usize)> {
    let mut order = Vec::new();
    let mut counts = BTreeMap::new();
    for call in calls {
        let line = match call {
            DeviceCall::Draw(record) => format!(
                "draw {} pixel={:?}",
                target_name(record.target),
                record.pixel_shader
            ),
            DeviceCall::Clear { target, .. } => format!("clear {}", target_name(*target)),
            DeviceCall::ClearDepth(_) => "clear depth".to_string(),
            DeviceCall::SetRenderTarget(target) => format!("bind {}", target_name(*target)),
            DeviceCall::WriteBuffer { .. } => "write buffer".to_string(),
            other => format!("{other:?}"),
        };
        let count = counts.entry(line.clone()).or_insert(0);
        if *count == 0 {
            order.push(line);
        }
        *count += 1;
    }
    order
        .into_iter()
        .map(|line| {
            let count = counts.get(&line).copied().unwrap_or(0);
            (line, count)
        })
        .collect()
}

fn target_name(target: RenderTarget) -> &'static str {
    match target {
        RenderTarget::Main => "main",
        RenderTarget::Texture(_) => "picking",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_render::ShaderProgram;

    #[test]
    fn scene_row_is_centered() {
        let tags = vec!["Cube".to_string(), "Teapot".to_string(), "Cone".to_string()];
        let world = build_scene("row", &tags, 2.0);
        let positions: Vec<_> = world.actors().map(|a| a.transform().position.z).collect();
        assert_eq!(positions, vec![-2.0, 2.0]);
    }

    #[test]
    fn missing_scene_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonSceneStore::open(tmp.path()).unwrap();
        assert!(editor_world(&store, Some("nope")).is_err());
        assert!(editor_world(&store, None).is_ok());
    }

    #[test]
    fn pixel_center_is_ndc_origin() {
        let ndc = pixel_to_ndc(Vec2::new(320.0, 240.0), Viewport::new(640, 480));
        assert!(ndc.abs_diff_eq(Vec2::ZERO, 1e-6));
    }

    #[test]
    fn picking_frame_draws_into_the_picking_target() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonSceneStore::open(tmp.path()).unwrap();
        let mut world = editor_world(&store, None).unwrap();
        let mut input = InputState::new(Viewport::new(32, 32));
        input.button_down(MouseButton::Left);
        let mut renderer = Renderer::new(RecordingDevice::new(32, 32));
        renderer.device_mut().clear_calls();

        world.tick(&input, 0.0);
        world.render(&mut renderer, &input);

        let summary = summarize_calls(renderer.device().calls());
        let picking_line = format!("draw picking pixel={:?}", Some(ShaderProgram::PickingPixel));
        let count = summary
            .iter()
            .find(|(line, _)| *line == picking_line)
            .map(|(_, n)| *n);
        // One cube and three axis lines.
        assert_eq!(count, Some(4));
    }
}
