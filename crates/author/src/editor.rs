use vantage_common::{ObjectId, Transform};
use vantage_kernel::{SelectionListener, World};

/// Errors from selection-driven edits.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EditError {
    #[error("nothing is selected")]
    NothingSelected,
    #[error("actor {0} not found")]
    ActorNotFound(ObjectId),
    #[error("actor {0} is an editor gizmo")]
    Gizmo(ObjectId),
}

/// Receives selection notifications from the world and tracks the active camera.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorManager {
    selected: Option<ObjectId>,
    camera: Option<ObjectId>,
    /// Number of selection notifications received.
    selections: u64,
}

impl EditorManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<ObjectId> {
        self.selected
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selection_count(&self) -> u64 {
        self.selections
    }

    pub fn camera(&self) -> Option<ObjectId> {
        self.camera
    }

    pub fn set_camera(&mut self, camera: Option<ObjectId>) {
        self.camera = camera;
    }

    /// Drop references to actors the world no longer holds, and follow the
    /// world's camera.
    pub fn sync(&mut self, world: &World) {
        if self.selected.is_some_and(|id| !world.is_alive(id)) {
            tracing::debug!(actor = ?self.selected, "selection no longer alive");
            self.selected = None;
        }
        self.camera = world.camera();
    }

    /// Destroy the selected actor. Gizmos cannot be deleted.
    pub fn delete_selected(&mut self, world: &mut World) -> Result<ObjectId, EditError> {
        let id = self.selected.ok_or(EditError::NothingSelected)?;
        let actor = world.actor(id).ok_or(EditError::ActorNotFound(id))?;
        if actor.is_gizmo() {
            return Err(EditError::Gizmo(id));
        }
        world.destroy_actor(id);
        self.selected = None;
        tracing::info!(actor = %id, "deleted selected actor");
        Ok(id)
    }

    /// Replace the selected actor's transform, returning the previous one.
    pub fn set_selected_transform(
        &self,
        world: &mut World,
        transform: Transform,
    ) -> Result<Transform, EditError> {
        let id = self.selected.ok_or(EditError::NothingSelected)?;
        let actor = world
            .actor_mut(id)
            .filter(|a| !a.is_pending_destroy())
            .ok_or(EditError::ActorNotFound(id))?;
        let old = *actor.transform();
        actor.set_transform(transform);
        Ok(old)
    }
}

impl SelectionListener for EditorManager {
    fn select_actor(&mut self, actor: ObjectId) {
        self.selected = Some(actor);
        self.selections += 1;
        tracing::debug!(actor = %actor, "editor selection");
    }
}
