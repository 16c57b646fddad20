use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};

/// Per-draw vertex-stage constants (slot 0).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Constants {
    pub mvp: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub use_vertex_color: u32,
    pub _padding: [u32; 3],
}

impl Constants {
    pub fn new(mvp: Mat4, color: Vec4, use_vertex_color: bool) -> Self {
        Self {
            mvp: mvp.to_cols_array_2d(),
            color: color.to_array(),
            use_vertex_color: u32::from(use_vertex_color),
            _padding: [0; 3],
        }
    }
}

/// Identifier color for the picking pixel shader (slot 1), normalized.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct PickingConstants {
    pub uuid_color: [f32; 4],
}

/// Depth classification of the owning actor plus camera clip planes (slot 2).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct DepthConstants {
    pub depth_offset: i32,
    pub near_plane: f32,
    pub far_plane: f32,
    pub _padding: f32,
}

/// Constant buffer slots, shared with the shaders.
pub const CONSTANTS_SLOT: u32 = 0;
pub const PICKING_CONSTANTS_SLOT: u32 = 1;
pub const DEPTH_CONSTANTS_SLOT: u32 = 2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_sizes_are_16_byte_multiples() {
        assert_eq!(std::mem::size_of::<Constants>() % 16, 0);
        assert_eq!(std::mem::size_of::<PickingConstants>(), 16);
        assert_eq!(std::mem::size_of::<DepthConstants>(), 16);
    }

    #[test]
    fn vertex_color_flag_is_encoded_as_u32() {
        let c = Constants::new(Mat4::IDENTITY, Vec4::ONE, true);
        assert_eq!(c.use_vertex_color, 1);
        assert_eq!(c.mvp, Mat4::IDENTITY.to_cols_array_2d());
    }
}
