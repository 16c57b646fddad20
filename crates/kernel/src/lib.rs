//! World kernel: actor lifecycle, frame orchestration, selection and scene persistence.
//!
//! # Invariants
//! - An actor is in the active sequence from spawn until destroy; `begin_play` runs at most once, at the start of the first tick after spawn.
//! - Destruction is two-phase. The actor disappears from iteration and rendering immediately and is released from the object registry exactly once, in the next late tick.
//! - Gizmo actors are never cleared or persisted.
//! - Ray-cast selection picks the strictly nearest hit; ties go to the actor earliest in the active sequence.

pub mod actor;
pub mod factory;
pub mod gizmo;
pub mod ray;
pub mod registry;
pub mod scene;
pub mod selection;
pub mod world;

pub use actor::{Actor, ActorBehavior};
pub use factory::{ActorFactory, BUILTIN_TAGS, FactoryRegistry};
pub use gizmo::{CameraController, EditorGizmos, spawn_editor_gizmos};
pub use registry::{ObjectKind, ObjectRegistry};
pub use scene::{ActorDescription, SceneError, SceneStore, StoreError, WorldDescription};
pub use selection::{LastSelection, SelectionListener, UuidBillboard};
pub use world::{PrimitiveSpec, RenderSet, World};

/// Returns the crate name and version for diagnostics.
pub fn crate_info() -> &'static str {
    "vantage-kernel v0.1.0"
}
