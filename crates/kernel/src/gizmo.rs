//! Editor-only helper actors. None of them are persisted or cleared.

use crate::actor::ActorBehavior;
use crate::world::{PrimitiveSpec, World};
use glam::{Quat, Vec3, Vec4};
use std::f32::consts::FRAC_PI_2;
use vantage_common::{ObjectId, PrimitiveShape, Transform};
use vantage_input::{InputState, Key, MouseButton};

const MAX_PITCH_DEGREES: f32 = 89.0;
const AXIS_LENGTH: f32 = 50.0;

/// Flies the camera with WASD (plane) and QE (down/up); right-drag looks around.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraController {
    /// World units per second.
    pub speed: f32,
    /// Degrees per pixel of mouse motion.
    pub sensitivity: f32,
    pitch: f32,
}

impl CameraController {
    pub fn new(speed: f32, sensitivity: f32) -> Self {
        Self {
            speed,
            sensitivity,
            pitch: 0.0,
        }
    }
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(1.0, 0.2)
    }
}

impl ActorBehavior for CameraController {
    fn tick(&mut self, world: &mut World, me: ObjectId, input: &InputState, dt: f32) {
        let Some(actor) = world.actor_mut(me) else {
            return;
        };
        let mut transform = *actor.transform();

        let mut motion = Vec3::ZERO;
        let bindings = [
            (Key::W, transform.forward()),
            (Key::S, -transform.forward()),
            (Key::D, transform.right()),
            (Key::A, -transform.right()),
            (Key::E, Vec3::Y),
            (Key::Q, Vec3::NEG_Y),
        ];
        for (key, direction) in bindings {
            if input.is_key_held(key) {
                motion += direction;
            }
        }
        transform.position += motion * self.speed * dt;

        if input.is_button_held(MouseButton::Right) {
            let delta = input.mouse_delta();
            let yaw = Quat::from_rotation_y((-delta.x * self.sensitivity).to_radians());
            let pitch_step = (-delta.y * self.sensitivity)
                .clamp(-MAX_PITCH_DEGREES - self.pitch, MAX_PITCH_DEGREES - self.pitch);
            self.pitch += pitch_step;
            let pitch = Quat::from_rotation_x(pitch_step.to_radians());
            transform.rotation = (yaw * transform.rotation * pitch).normalize();
        }

        actor.set_transform(transform);
    }
}

/// Ids of the gizmos an editor world starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorGizmos {
    pub camera: ObjectId,
    pub axis: ObjectId,
    pub picker: ObjectId,
}

/// Camera at (-5, 0, 0) looking down +X.
pub fn spawn_camera(world: &mut World, controller: CameraController) -> ObjectId {
    let transform = Transform {
        position: Vec3::new(-5.0, 0.0, 0.0),
        rotation: Quat::from_rotation_y(-FRAC_PI_2),
        ..Transform::default()
    };
    let id = world.spawn_actor("Camera", transform);
    world.add_camera(id);
    world.set_behavior(id, Box::new(controller));
    if let Some(actor) = world.actor_mut(id) {
        actor.set_gizmo(true);
    }
    id
}

/// World axis lines, drawn over everything.
pub fn spawn_axis(world: &mut World) -> ObjectId {
    let id = world.spawn_actor("Axis", Transform::default());
    let scale = Vec3::new(AXIS_LENGTH, 1.0, 1.0);
    let lines = [
        (Quat::IDENTITY, Vec4::new(1.0, 0.0, 0.0, 1.0)),
        (Quat::from_rotation_z(FRAC_PI_2), Vec4::new(0.0, 1.0, 0.0, 1.0)),
        (Quat::from_rotation_y(-FRAC_PI_2), Vec4::new(0.0, 0.0, 1.0, 1.0)),
    ];
    for (rotation, color) in lines {
        let relative = Transform {
            rotation,
            scale,
            ..Transform::default()
        };
        world.add_primitive(
            id,
            PrimitiveSpec::new(PrimitiveShape::Line)
                .relative(relative)
                .color(color)
                .z_ignore(),
        );
    }
    if let Some(actor) = world.actor_mut(id) {
        actor.set_gizmo(true);
        actor.set_depth(1);
        actor.set_tick_enabled(false);
    }
    id
}

/// Component-less helper marking the picking tool.
pub fn spawn_picker(world: &mut World) -> ObjectId {
    let id = world.spawn_actor("Picker", Transform::default());
    if let Some(actor) = world.actor_mut(id) {
        actor.set_gizmo(true);
        actor.set_tick_enabled(false);
    }
    id
}

/// Spawn camera, axis and picker, and make the camera active.
pub fn spawn_editor_gizmos(world: &mut World, controller: CameraController) -> EditorGizmos {
    let camera = spawn_camera(world, controller);
    world.set_camera(Some(camera));
    EditorGizmos {
        camera,
        axis: spawn_axis(world),
        picker: spawn_picker(world),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_common::Viewport;

    #[test]
    fn camera_starts_looking_down_positive_x() {
        let mut world = World::new();
        let id = spawn_camera(&mut world, CameraController::default());
        let forward = world.actor(id).unwrap().transform().forward();
        assert!(forward.abs_diff_eq(Vec3::X, 1e-5));
    }

    #[test]
    fn camera_moves_forward_while_w_is_held() {
        let mut world = World::new();
        let id = spawn_camera(&mut world, CameraController::new(2.0, 0.2));
        let mut input = InputState::new(Viewport::new(100, 100));
        world.tick(&input, 0.5);
        input.key_down(Key::W);
        world.tick(&input, 0.5);
        let position = world.actor(id).unwrap().transform().position;
        assert!(position.abs_diff_eq(Vec3::new(-4.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn axis_lines_are_depth_ignored_overlays() {
        let mut world = World::new();
        let id = spawn_axis(&mut world);
        let actor = world.actor(id).unwrap();
        assert_eq!(actor.depth(), 1);
        assert!(actor.is_gizmo());
        assert_eq!(world.z_ignore_components().len(), 3);
        assert!(world.render_components().is_empty());
    }

    #[test]
    fn editor_gizmos_set_the_camera() {
        let mut world = World::new();
        let gizmos = spawn_editor_gizmos(&mut world, CameraController::default());
        assert_eq!(world.camera(), Some(gizmos.camera));
        assert!(world.actor(gizmos.picker).unwrap().components().is_empty());
    }
}
