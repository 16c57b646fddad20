//! wgpu backend for the vantage renderer.
//!
//! # Invariants
//! - Draws observe the constant buffer contents bound when they were issued.
//! - Offscreen targets are 8-bit unorm so identifier colors read back exactly.
//! - Pixel copies outside the source target are ignored.

mod gpu;
mod shaders;

pub use gpu::{TARGET_FORMAT, WgpuDevice};
