use glam::Vec3;
use serde::{Deserialize, Serialize};
use vantage_common::{ObjectId, Transform};

/// Boxed error returned by scene store implementations.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Persisted form of one actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorDescription {
    pub type_tag: String,
    pub position: Vec3,
    /// Euler angles in degrees, XYZ order.
    pub rotation: Vec3,
    pub scale: Vec3,
    pub id: ObjectId,
}

impl ActorDescription {
    pub fn new(type_tag: impl Into<String>, id: ObjectId, transform: &Transform) -> Self {
        Self {
            type_tag: type_tag.into(),
            position: transform.position,
            rotation: transform.euler_degrees(),
            scale: transform.scale,
            id,
        }
    }

    pub fn transform(&self) -> Transform {
        Transform::from_euler_degrees(self.position, self.rotation, self.scale)
    }
}

/// Persisted form of a world: its name, version and non-gizmo actors in
/// active-sequence order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldDescription {
    pub scene_name: String,
    pub version: u32,
    pub actors: Vec<ActorDescription>,
}

impl WorldDescription {
    pub fn new(scene_name: impl Into<String>) -> Self {
        Self {
            scene_name: scene_name.into(),
            version: 1,
            actors: Vec::new(),
        }
    }
}

/// Scene persistence collaborator.
pub trait SceneStore {
    fn save_scene(&mut self, scene: &WorldDescription) -> Result<(), StoreError>;

    /// `Ok(None)` when no scene with that name exists.
    fn load_scene(&self, name: &str) -> Result<Option<WorldDescription>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("failed to save scene '{name}': {source}")]
    Save {
        name: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to load scene '{name}': {source}")]
    Load {
        name: String,
        #[source]
        source: StoreError,
    },
}
