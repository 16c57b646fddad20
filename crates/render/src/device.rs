//! The GPU device collaborator.
//!
//! The renderer never talks to a graphics API directly. It drives an
//! implementation of [`GpuDevice`], which behaves like an immediate-mode
//! state machine: bind state, bind a target, issue draws. Creation methods
//! return `None` on failure instead of an error; callers log and carry on.

use vantage_common::Viewport;

/// Opaque handle to a GPU buffer (vertex, index or constant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u32);

/// Opaque handle to a texture: a render target or a CPU-readable staging copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

/// Opaque handle to a fixed-function state object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateHandle(pub u32);

/// Opaque handle to a compiled shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Vertex,
    Index,
    Constant,
}

/// Buffer creation request. `contents` is the initial data for vertex and
/// index buffers; constant buffers are sized by `size` and start zeroed.
#[derive(Debug, Clone, Copy)]
pub struct BufferDesc<'a> {
    pub label: &'a str,
    pub kind: BufferKind,
    pub size: u64,
    pub contents: Option<&'a [u8]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    Never,
    Less,
    LessEqual,
    Equal,
    Greater,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthStencilDesc {
    pub depth_enable: bool,
    pub depth_write: bool,
    pub compare: CompareFunction,
}

impl DepthStencilDesc {
    /// Depth-tested and write-enabled.
    pub const DEPTH_TEST: Self = Self {
        depth_enable: true,
        depth_write: true,
        compare: CompareFunction::Less,
    };

    /// Comparison always passes but depth is still written.
    pub const IGNORE_DEPTH: Self = Self {
        depth_enable: true,
        depth_write: true,
        compare: CompareFunction::Always,
    };
}

impl Default for DepthStencilDesc {
    fn default() -> Self {
        Self::DEPTH_TEST
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendDesc {
    /// Source replaces destination. This is the state bound when no blend
    /// state object is set.
    #[default]
    Opaque,
    /// Classic source-alpha over inverse-source-alpha.
    AlphaBlend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    None,
    #[default]
    Back,
    Front,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RasterizerDesc {
    pub cull: CullMode,
    pub wireframe: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Pixel,
}

/// Shader programs the renderer knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderProgram {
    /// Transforms primitive vertices by the MVP constant.
    PrimitiveVertex,
    /// Writes material or vertex color.
    PrimitivePixel,
    /// Writes the identifier color from the picking constant.
    PickingPixel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Topology {
    LineList,
    #[default]
    TriangleList,
}

/// Where draws land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    /// The swap-chain back buffer.
    Main,
    /// An offscreen color target created with [`GpuDevice::create_render_target`].
    Texture(TextureHandle),
}

/// A single indexed draw. Missing buffers are passed through as `None`; the
/// device decides what a draw without geometry means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexedDraw {
    pub vertex_buffer: Option<BufferHandle>,
    pub index_buffer: Option<BufferHandle>,
    pub index_count: u32,
    pub topology: Topology,
}

/// Capability provider for everything the renderer needs from the GPU.
///
/// Both render targets share the device's single depth buffer.
pub trait GpuDevice {
    /// Current viewport dimensions.
    fn viewport(&self) -> Viewport;

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Option<BufferHandle>;
    /// Map, overwrite from offset 0, unmap.
    fn write_buffer(&mut self, buffer: BufferHandle, bytes: &[u8]);
    fn release_buffer(&mut self, buffer: BufferHandle);

    /// 8-bit RGBA color target usable as a copy source.
    fn create_render_target(&mut self, label: &str, width: u32, height: u32) -> Option<TextureHandle>;
    /// CPU-readable texture in the same format as render targets.
    fn create_staging_texture(&mut self, width: u32, height: u32) -> Option<TextureHandle>;
    fn release_texture(&mut self, texture: TextureHandle);

    fn create_depth_stencil_state(&mut self, desc: DepthStencilDesc) -> Option<StateHandle>;
    fn create_blend_state(&mut self, desc: BlendDesc) -> Option<StateHandle>;
    fn create_rasterizer_state(&mut self, desc: RasterizerDesc) -> Option<StateHandle>;
    fn create_shader(&mut self, program: ShaderProgram) -> Option<ShaderHandle>;

    fn set_render_target(&mut self, target: RenderTarget);
    fn clear_render_target(&mut self, target: RenderTarget, color: [f32; 4]);
    fn clear_depth(&mut self, depth: f32);

    /// `None` restores the device default (depth-tested, write-enabled).
    fn set_depth_stencil_state(&mut self, state: Option<StateHandle>);
    /// `None` restores the device default (opaque).
    fn set_blend_state(&mut self, state: Option<StateHandle>);
    fn set_rasterizer_state(&mut self, state: Option<StateHandle>);
    fn set_shader(&mut self, stage: ShaderStage, shader: Option<ShaderHandle>);
    fn set_constant_buffer(&mut self, stage: ShaderStage, slot: u32, buffer: BufferHandle);

    fn draw_indexed(&mut self, draw: &IndexedDraw);

    /// Copy the single texel at `(x, y)` of `source` into texel `(0, 0)` of `staging`.
    fn copy_pixel(&mut self, source: TextureHandle, staging: TextureHandle, x: u32, y: u32);
    /// Map `staging` for reading and return its first texel as raw bytes.
    fn read_staging_pixel(&mut self, staging: TextureHandle) -> Option<[u8; 4]>;
}
