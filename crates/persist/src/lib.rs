//! Scene persistence collaborators for the world kernel.
//!
//! # Invariants
//! - A scene named `n` lives at `<root>/n.scene.json`; names never contain path separators.
//! - Loading a scene that was never saved is `Ok(None)`, not an error.
//! - Saving overwrites the previous file atomically from the reader's point of view (write to a temp file, then rename).

pub mod store;

pub use store::{JsonSceneStore, MemorySceneStore, PersistError, SCENE_EXTENSION};

pub fn crate_info() -> &'static str {
    "vantage-persist v0.1.0"
}
