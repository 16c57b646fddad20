//! Editor state that sits beside the world: what is selected and which actor is the camera.
//!
//! # Invariants
//! - The manager only ever holds ids; the world stays the owner of every actor.
//! - A selection that no longer names a live actor is dropped by [`EditorManager::sync`].

pub mod editor;

pub use editor::{EditError, EditorManager};

pub fn crate_info() -> &'static str {
    "vantage-author v0.1.0"
}
