//! Developer tooling: world inspector.
//!
//! # Invariants
//! - Tools never mutate the world.

pub mod inspector;

pub use inspector::{ActorInfo, WorldInspector, WorldSummary};

pub fn crate_info() -> &'static str {
    "vantage-tools v0.1.0"
}
