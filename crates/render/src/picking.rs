//! Identifier ↔ color encoding for the picking target.
//!
//! An `ObjectId` is split into four bytes, least significant first, and
//! written as RGBA. The picking target stores 8 bits per channel, so the
//! readback bytes invert the encoding exactly.

use glam::Vec4;
use vantage_common::ObjectId;

/// Clear color of the picking target. Decodes to [`ObjectId::NONE`].
pub const PICKING_CLEAR_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Encode an identifier as a color with channels in `0.0..=255.0`.
pub fn encode_id(id: ObjectId) -> Vec4 {
    let [r, g, b, a] = id.0.to_le_bytes();
    Vec4::new(r as f32, g as f32, b as f32, a as f32)
}

/// Normalize an encoded color into `0.0..=1.0` for a constant buffer.
pub fn normalize_color(encoded: Vec4) -> Vec4 {
    encoded / 255.0
}

/// Decode raw picking-target bytes.
pub fn decode_bytes(bytes: [u8; 4]) -> ObjectId {
    ObjectId(u32::from_le_bytes(bytes))
}

/// Decode a color with channels in `0.0..=255.0`, as returned by
/// [`crate::Renderer::get_pixel`].
pub fn decode_color(color: Vec4) -> ObjectId {
    let channel = |c: f32| c.round().clamp(0.0, 255.0) as u8;
    decode_bytes([channel(color.x), channel(color.y), channel(color.z), channel(color.w)])
}

/// The byte a unorm8 target stores for a normalized channel value.
pub fn unorm8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
