//! Everything the editor window drives each frame, independent of the GPU.

use crate::config::{AppConfig, SelectionMode};
use crate::keymap::{map_key, spawn_tag};
use anyhow::Context;
use glam::Vec3;
use vantage_author::EditorManager;
use vantage_common::{ObjectId, Transform, Viewport};
use vantage_input::{InputState, MouseButton, PlayerInput};
use vantage_kernel::{CameraController, World, spawn_editor_gizmos};
use vantage_persist::JsonSceneStore;
use vantage_render::{GpuDevice, Renderer};
use vantage_tools::WorldInspector;
use winit::keyboard::KeyCode;

const SPAWN_DISTANCE: f32 = 5.0;
const DEFAULT_SCENE_NAME: &str = "untitled";

pub struct Session {
    pub world: World,
    pub input: PlayerInput,
    pub editor: EditorManager,
    store: JsonSceneStore,
    mode: SelectionMode,
}

impl Session {
    pub fn new(config: &AppConfig, viewport: Viewport) -> anyhow::Result<Self> {
        let store = JsonSceneStore::open(&config.scene_dir)
            .with_context(|| format!("opening scene dir {}", config.scene_dir.display()))?;

        let mut world = World::new();
        spawn_editor_gizmos(
            &mut world,
            CameraController::new(config.camera_speed, config.camera_sensitivity),
        );
        let loaded = match &config.scene {
            Some(name) => world.load_world(&store, name)?,
            None => false,
        };
        if !loaded {
            populate_default(&mut world);
        }

        let mut input = PlayerInput::new(InputState::new(viewport));
        world.begin_play(&mut input);
        let mut editor = EditorManager::new();
        editor.sync(&world);
        tracing::info!("{}", WorldInspector::summary(&world));

        Ok(Self {
            world,
            input,
            editor,
            store,
            mode: config.selection_mode,
        })
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.input.state_mut().set_viewport(viewport);
    }

    pub fn handle_key(&mut self, code: KeyCode, pressed: bool) {
        if let Some(key) = map_key(code) {
            if pressed {
                self.input.state_mut().key_down(key);
            } else {
                self.input.state_mut().key_up(key);
            }
        }
        if !pressed {
            return;
        }

        match code {
            KeyCode::F5 => self.save(),
            KeyCode::F9 => self.reload(),
            KeyCode::Delete => match self.editor.delete_selected(&mut self.world) {
                Ok(_) => self.world.clear_selection(),
                Err(e) => tracing::debug!("delete ignored: {e}"),
            },
            KeyCode::Escape => {
                self.editor.clear_selection();
                self.world.clear_selection();
            }
            _ => {
                if let Some(tag) = spawn_tag(code) {
                    self.spawn_in_front(tag);
                }
            }
        }
    }

    fn spawn_in_front(&mut self, tag: &str) -> Option<ObjectId> {
        let position = self
            .world
            .camera()
            .and_then(|camera| self.world.actor(camera))
            .map(|camera| {
                let t = camera.transform();
                t.position + t.forward() * SPAWN_DISTANCE
            })
            .unwrap_or(Vec3::ZERO);
        let id = self.world.spawn_by_tag(tag)?;
        if let Some(actor) = self.world.actor_mut(id) {
            actor.set_transform(Transform::from_position(position));
        }
        tracing::info!(actor = %id, tag, "spawned");
        Some(id)
    }

    pub fn save(&mut self) {
        if self.world.scene_name().is_empty() {
            self.world.set_scene_name(DEFAULT_SCENE_NAME);
        }
        if let Err(e) = self.world.save_world(&mut self.store) {
            tracing::error!("{e}");
        }
    }

    pub fn reload(&mut self) {
        let name = self.world.scene_name().to_string();
        match self.world.load_world(&self.store, &name) {
            Ok(true) => self.editor.clear_selection(),
            Ok(false) => tracing::warn!(scene = %name, "nothing to reload"),
            Err(e) => tracing::error!("{e}"),
        }
    }

    /// One frame: selection from input, tick, render, present, pixel pick,
    /// late tick.
    pub fn frame<D: GpuDevice>(
        &mut self,
        renderer: &mut Renderer<D>,
        dt: f32,
        present: impl FnOnce(&mut Renderer<D>),
    ) {
        match self.mode {
            SelectionMode::Ray => {
                self.world.process_input(&mut self.input, &mut self.editor);
            }
            SelectionMode::Pixel => {
                self.input.drain_events(self.world.id());
            }
        }

        self.world.tick(self.input.state(), dt);
        self.world.render(renderer, self.input.state());
        present(renderer);

        if self.mode == SelectionMode::Pixel
            && self.input.state().was_button_pressed(MouseButton::Left)
        {
            let cursor = self.input.state().cursor_position();
            self.world.pick_pixel(renderer, cursor, &mut self.editor);
        }

        self.world.late_tick(dt);
        self.editor.sync(&self.world);
        self.input.end_frame();
    }

    pub fn shutdown(&mut self) {
        self.world.end_play(&mut self.input);
    }
}

fn populate_default(world: &mut World) {
    let layout = [
        ("Cube", Vec3::ZERO),
        ("Sphere", Vec3::new(0.0, 0.0, 2.0)),
        ("Cylinder", Vec3::new(0.0, 0.0, -2.0)),
        ("Arrow", Vec3::new(0.0, 1.5, 0.0)),
    ];
    for (tag, position) in layout {
        if let Some(id) = world.spawn_by_tag(tag) {
            if let Some(actor) = world.actor_mut(id) {
                actor.set_transform(Transform::from_position(position));
            }
        }
    }
}
