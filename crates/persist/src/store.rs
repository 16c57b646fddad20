//! File-backed and in-memory scene stores.
//!
//! Layout inside the store directory:
//! ```text
//! <name>.scene.json   - one pretty-printed world description per scene
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use vantage_kernel::{SceneStore, StoreError, WorldDescription};

/// File suffix for persisted scenes.
pub const SCENE_EXTENSION: &str = "scene.json";

/// Errors from file-backed persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid scene name '{0}'")]
    InvalidName(String),
}

/// Names must be non-empty and usable as a single file name.
fn validate_name(name: &str) -> Result<(), PersistError> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.chars().any(|c| matches!(c, '/' | '\\' | '\0'));
    if bad {
        return Err(PersistError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Scenes as JSON files in a directory.
#[derive(Debug, Clone)]
pub struct JsonSceneStore {
    root: PathBuf,
}

impl JsonSceneStore {
    /// Open or create a store at the given directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let root = path.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scene_path(&self, name: &str) -> Result<PathBuf, PersistError> {
        validate_name(name)?;
        Ok(self.root.join(format!("{name}.{SCENE_EXTENSION}")))
    }

    pub fn write(&self, scene: &WorldDescription) -> Result<PathBuf, PersistError> {
        let path = self.scene_path(&scene.scene_name)?;
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(scene)?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        tracing::info!(path = %path.display(), actors = scene.actors.len(), "wrote scene");
        Ok(path)
    }

    pub fn read(&self, name: &str) -> Result<Option<WorldDescription>, PersistError> {
        let path = self.scene_path(name)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no scene file");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let scene = serde_json::from_slice(&bytes)?;
        Ok(Some(scene))
    }

    /// Names of the scenes in the store, sorted.
    pub fn list(&self) -> Result<Vec<String>, PersistError> {
        let suffix = format!(".{SCENE_EXTENSION}");
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let file_name = entry?.file_name();
            if let Some(name) = file_name.to_str().and_then(|n| n.strip_suffix(&suffix)) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

impl SceneStore for JsonSceneStore {
    fn save_scene(&mut self, scene: &WorldDescription) -> Result<(), StoreError> {
        self.write(scene)?;
        Ok(())
    }

    fn load_scene(&self, name: &str) -> Result<Option<WorldDescription>, StoreError> {
        Ok(self.read(name)?)
    }
}

/// Scenes kept in memory, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MemorySceneStore {
    scenes: BTreeMap<String, WorldDescription>,
}

impl MemorySceneStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&WorldDescription> {
        self.scenes.get(name)
    }
}

impl SceneStore for MemorySceneStore {
    fn save_scene(&mut self, scene: &WorldDescription) -> Result<(), StoreError> {
        validate_name(&scene.scene_name)?;
        self.scenes.insert(scene.scene_name.clone(), scene.clone());
        Ok(())
    }

    fn load_scene(&self, name: &str) -> Result<Option<WorldDescription>, StoreError> {
        Ok(self.scenes.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use vantage_common::{ObjectId, Transform};
    use vantage_kernel::{ActorDescription, World};

    fn sample_scene(name: &str) -> WorldDescription {
        let mut scene = WorldDescription::new(name);
        scene.version = 2;
        scene.actors.push(ActorDescription::new(
            "Cube",
            ObjectId(11),
            &Transform::from_position(Vec3::new(1.0, 2.0, 3.0)),
        ));
        scene.actors.push(ActorDescription::new(
            "Sphere",
            ObjectId(12),
            &Transform::default(),
        ));
        scene
    }

    #[test]
    fn write_then_read() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonSceneStore::open(tmp.path().join("scenes")).unwrap();
        let scene = sample_scene("level1");

        let path = store.write(&scene).unwrap();
        assert!(path.ends_with("level1.scene.json"));
        assert_eq!(store.read("level1").unwrap(), Some(scene));
    }

    #[test]
    fn missing_scene_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonSceneStore::open(tmp.path()).unwrap();
        assert_eq!(store.read("nothing").unwrap(), None);
    }

    #[test]
    fn reopen_lists_saved_scenes() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("scenes");
        {
            let store = JsonSceneStore::open(&path).unwrap();
            store.write(&sample_scene("b")).unwrap();
            store.write(&sample_scene("a")).unwrap();
        }
        std::fs::write(path.join("notes.txt"), "ignored").unwrap();

        let store = JsonSceneStore::open(&path).unwrap();
        assert_eq!(store.list().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn path_like_names_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonSceneStore::open(tmp.path()).unwrap();
        for name in ["", "..", "a/b", "a\\b"] {
            match store.read(name) {
                Err(PersistError::InvalidName(n)) => assert_eq!(n, name),
                other => panic!("expected InvalidName for {name:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn corrupt_file_is_a_json_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonSceneStore::open(tmp.path()).unwrap();
        std::fs::write(store.scene_path("broken").unwrap(), b"{ not json").unwrap();
        assert!(matches!(store.read("broken"), Err(PersistError::Json(_))));
    }

    #[test]
    fn world_round_trips_through_files() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = JsonSceneStore::open(tmp.path()).unwrap();

        let mut world = World::new();
        world.set_scene_name("roundtrip");
        let cone = world.spawn_by_tag("Cone").unwrap();
        world
            .actor_mut(cone)
            .unwrap()
            .set_transform(Transform::from_position(Vec3::new(0.0, 0.0, -7.0)));
        world.save_world(&mut store).unwrap();

        let mut loaded = World::new();
        assert!(loaded.load_world(&store, "roundtrip").unwrap());
        let actor = loaded.actors().next().unwrap();
        assert_eq!(actor.type_name(), "Cone");
        assert!(actor.transform().position.abs_diff_eq(Vec3::new(0.0, 0.0, -7.0), 1e-5));
    }

    #[test]
    fn memory_store_keeps_the_latest_save() {
        let mut store = MemorySceneStore::new();
        store.save_scene(&sample_scene("x")).unwrap();
        let mut newer = sample_scene("x");
        newer.actors.clear();
        store.save_scene(&newer).unwrap();

        assert_eq!(store.len(), 1);
        assert!(store.load_scene("x").unwrap().unwrap().actors.is_empty());
        assert!(store.load_scene("y").unwrap().is_none());
        assert!(store.save_scene(&WorldDescription::new("")).is_err());
    }
}
