use crate::world::World;
use glam::Mat4;
use std::fmt;
use vantage_common::{ObjectId, Transform};
use vantage_ecs::ComponentSet;
use vantage_input::InputState;

/// Per-actor hooks. Every method defaults to a no-op.
///
/// Hooks receive the world mutably and may spawn or destroy actors,
/// including their own.
pub trait ActorBehavior {
    fn begin_play(&mut self, _world: &mut World, _me: ObjectId) {}

    fn tick(&mut self, _world: &mut World, _me: ObjectId, _input: &InputState, _dt: f32) {}

    fn late_tick(&mut self, _world: &mut World, _me: ObjectId, _dt: f32) {}

    /// Teardown hook, called once when the actor is destroyed.
    fn destroyed(&mut self, _world: &mut World, _me: ObjectId) {}
}

/// A placed entity with a transform and components.
pub struct Actor {
    id: ObjectId,
    type_name: String,
    pub(crate) transform: Transform,
    depth: u32,
    gizmo: bool,
    tick_enabled: bool,
    pub(crate) components: ComponentSet,
    pub(crate) behavior: Option<Box<dyn ActorBehavior>>,
    /// Set while the behavior is checked out for a hook call.
    pub(crate) behavior_busy: bool,
    pub(crate) begun_play: bool,
    pub(crate) pending_destroy: bool,
    pub(crate) teardown_done: bool,
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .field("transform", &self.transform)
            .field("depth", &self.depth)
            .field("gizmo", &self.gizmo)
            .field("tick_enabled", &self.tick_enabled)
            .field("components", &self.components)
            .field("pending_destroy", &self.pending_destroy)
            .finish_non_exhaustive()
    }
}

impl Actor {
    pub(crate) fn new(id: ObjectId, type_name: impl Into<String>, transform: Transform) -> Self {
        Self {
            id,
            type_name: type_name.into(),
            transform,
            depth: 0,
            gizmo: false,
            tick_enabled: true,
            components: ComponentSet::new(),
            behavior: None,
            behavior_busy: false,
            begun_play: false,
            pending_destroy: false,
            teardown_done: false,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Type tag used for persistence.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.transform.matrix()
    }

    /// `0` for scene content; greater values are overlays drawn only in the
    /// depth-ignoring sub-pass.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn set_depth(&mut self, depth: u32) {
        self.depth = depth;
    }

    pub fn is_gizmo(&self) -> bool {
        self.gizmo
    }

    pub fn set_gizmo(&mut self, gizmo: bool) {
        self.gizmo = gizmo;
    }

    pub fn can_tick(&self) -> bool {
        self.tick_enabled
    }

    pub fn set_tick_enabled(&mut self, enabled: bool) {
        self.tick_enabled = enabled;
    }

    pub fn components(&self) -> &ComponentSet {
        &self.components
    }

    pub fn has_begun_play(&self) -> bool {
        self.begun_play
    }

    pub fn is_pending_destroy(&self) -> bool {
        self.pending_destroy
    }
}
