//! Shared types used by every vantage crate.
//!
//! # Invariants
//! - `ObjectId` values handed out by a registry are never `0` and never `u32::MAX`.
//! - `Transform::matrix` is scale, then rotation, then translation.

mod types;

pub use types::{ObjectId, PrimitiveShape, Transform, Viewport};
