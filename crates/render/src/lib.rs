//! Rendering over an abstract GPU device.
//!
//! # Invariants
//! - The renderer reads world state; it never mutates it.
//! - The picking target always matches the viewport it was created for, or
//!   does not exist.
//! - Identifier colors decode back to the exact `ObjectId` that produced them.

pub mod constants;
pub mod device;
pub mod geometry;
pub mod picking;
pub mod recording;
mod renderer;

pub use device::{GpuDevice, RenderTarget, ShaderProgram, ShaderStage};
pub use recording::{DeviceCall, DrawRecord, RecordingDevice};
pub use renderer::{
    CameraParams, MAIN_CLEAR_COLOR, PIXEL_FALLBACK, PickingTarget, PrimitiveDraw, Renderer,
};

pub fn crate_info() -> &'static str {
    "vantage-render v0.1.0"
}
