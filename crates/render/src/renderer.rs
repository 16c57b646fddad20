use crate::constants::{
    CONSTANTS_SLOT, Constants, DEPTH_CONSTANTS_SLOT, DepthConstants, PICKING_CONSTANTS_SLOT,
    PickingConstants,
};
use crate::device::{
    BlendDesc, BufferDesc, BufferHandle, BufferKind, DepthStencilDesc, GpuDevice, IndexedDraw,
    RasterizerDesc, RenderTarget, ShaderHandle, ShaderProgram, ShaderStage, StateHandle,
    TextureHandle, Topology,
};
use crate::geometry;
use crate::picking::{PICKING_CLEAR_COLOR, normalize_color};
use glam::{Mat4, Vec2, Vec4};
use std::collections::BTreeMap;
use vantage_common::{PrimitiveShape, Viewport};

/// Background color of the main target.
pub const MAIN_CLEAR_COLOR: [f32; 4] = [0.025, 0.025, 0.025, 1.0];

/// Returned by [`Renderer::get_pixel`] when the readback cannot happen.
pub const PIXEL_FALLBACK: Vec4 = Vec4::ONE;

/// Projection parameters the renderer needs from the active camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraParams {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            near: 1.0,
            far: 100.0,
        }
    }
}

impl CameraParams {
    /// Right-handed perspective projection with a `0..1` depth range.
    pub fn projection(&self, aspect_ratio: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), aspect_ratio, self.near, self.far)
    }
}

/// What a render component asks the renderer to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrimitiveDraw {
    pub shape: PrimitiveShape,
    pub color: Vec4,
    pub use_vertex_color: bool,
}

/// The offscreen identifier target. Always sized to the viewport it was
/// created for; a resize destroys it and creates a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickingTarget {
    pub texture: TextureHandle,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy)]
struct GpuMesh {
    vertex_buffer: Option<BufferHandle>,
    index_buffer: Option<BufferHandle>,
    index_count: u32,
    topology: Topology,
}

#[derive(Debug, Clone, Copy, Default)]
struct ShaderSet {
    vertex: Option<ShaderHandle>,
    pixel: Option<ShaderHandle>,
    picking_pixel: Option<ShaderHandle>,
}

/// Stateful pipeline wrapper over a [`GpuDevice`].
///
/// Owns the fixed-function state objects, the three constant buffers, the
/// primitive meshes and the picking target. Every resource is optional: a
/// failed creation is logged once and the dependent operation degrades to a
/// no-op or a logged draw.
pub struct Renderer<D: GpuDevice> {
    device: D,
    rasterizer_state: Option<StateHandle>,
    depth_stencil_state: Option<StateHandle>,
    ignore_depth_stencil_state: Option<StateHandle>,
    blend_state: Option<StateHandle>,
    constant_buffer: Option<BufferHandle>,
    picking_constant_buffer: Option<BufferHandle>,
    depth_constant_buffer: Option<BufferHandle>,
    shaders: ShaderSet,
    pixel_shader_override: Option<ShaderHandle>,
    meshes: BTreeMap<PrimitiveShape, GpuMesh>,
    picking_target: Option<PickingTarget>,
    pending_size: Option<Viewport>,
    view_matrix: Mat4,
    projection_matrix: Mat4,
    camera: CameraParams,
}

impl<D: GpuDevice> Renderer<D> {
    /// Create every state object, buffer, shader and mesh, then the picking
    /// target sized to the device viewport.
    pub fn new(mut device: D) -> Self {
        let rasterizer_state = device.create_rasterizer_state(RasterizerDesc::default());
        if rasterizer_state.is_none() {
            tracing::error!("failed to create rasterizer state");
        }
        let depth_stencil_state = device.create_depth_stencil_state(DepthStencilDesc::DEPTH_TEST);
        let ignore_depth_stencil_state =
            device.create_depth_stencil_state(DepthStencilDesc::IGNORE_DEPTH);
        if depth_stencil_state.is_none() || ignore_depth_stencil_state.is_none() {
            tracing::error!("failed to create depth stencil states");
        }
        let blend_state = device.create_blend_state(BlendDesc::AlphaBlend);
        if blend_state.is_none() {
            tracing::error!("failed to create blend state");
        }

        let constant_buffer =
            create_constant_buffer::<D, Constants>(&mut device, "constant_buffer");
        let picking_constant_buffer =
            create_constant_buffer::<D, PickingConstants>(&mut device, "picking_constant_buffer");
        let depth_constant_buffer =
            create_constant_buffer::<D, DepthConstants>(&mut device, "depth_constant_buffer");

        let shaders = ShaderSet {
            vertex: create_shader(&mut device, ShaderProgram::PrimitiveVertex),
            pixel: create_shader(&mut device, ShaderProgram::PrimitivePixel),
            picking_pixel: create_shader(&mut device, ShaderProgram::PickingPixel),
        };

        let meshes = PrimitiveShape::ALL
            .into_iter()
            .map(|shape| (shape, upload_mesh(&mut device, shape)))
            .collect();

        let mut renderer = Self {
            device,
            rasterizer_state,
            depth_stencil_state,
            ignore_depth_stencil_state,
            blend_state,
            constant_buffer,
            picking_constant_buffer,
            depth_constant_buffer,
            shaders,
            pixel_shader_override: None,
            meshes,
            picking_target: None,
            pending_size: None,
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
            camera: CameraParams::default(),
        };
        renderer.create_picking_target();
        renderer
    }

    /// The backend the renderer drives.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Mutable backend access, for presenting and resizing.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// `None` between the two halves of a resize.
    pub fn picking_target(&self) -> Option<PickingTarget> {
        self.picking_target
    }

    /// Alpha blend state for overlays that want translucency.
    pub fn blend_state(&self) -> Option<StateHandle> {
        self.blend_state
    }

    /// View matrix of the last camera update.
    pub fn view_matrix(&self) -> Mat4 {
        self.view_matrix
    }

    /// Projection built by the last [`Renderer::update_projection_matrix`].
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection_matrix
    }

    /// Camera parameters behind the current projection.
    pub fn camera_params(&self) -> CameraParams {
        self.camera
    }

    /// Bind the back buffer and clear color and depth for a new frame.
    pub fn begin_frame(&mut self) {
        self.device.set_render_target(RenderTarget::Main);
        self.device
            .clear_render_target(RenderTarget::Main, MAIN_CLEAR_COLOR);
        self.device.clear_depth(1.0);
    }

    /// Bind the rasterizer state and the default blend state.
    pub fn prepare(&mut self) {
        self.device.set_rasterizer_state(self.rasterizer_state);
        self.device.set_blend_state(None);
    }

    /// Bind the default shaders and the vertex/depth constant buffers.
    pub fn prepare_shader(&mut self) {
        self.pixel_shader_override = None;
        self.device.set_shader(ShaderStage::Vertex, self.shaders.vertex);
        self.device.set_shader(ShaderStage::Pixel, self.shaders.pixel);
        if let Some(buffer) = self.constant_buffer {
            self.device
                .set_constant_buffer(ShaderStage::Vertex, CONSTANTS_SLOT, buffer);
        }
        if let Some(buffer) = self.depth_constant_buffer {
            self.device
                .set_constant_buffer(ShaderStage::Pixel, DEPTH_CONSTANTS_SLOT, buffer);
        }
    }

    /// Depth-tested, write-enabled state with the default blend. Must run
    /// before drawing default-set components.
    pub fn prepare_main(&mut self) {
        self.device.set_depth_stencil_state(self.depth_stencil_state);
        self.device.set_blend_state(None);
    }

    /// Bind the picking target as the only color target, clear it to the
    /// sentinel color and bind the depth-tested state. Returns `false` when
    /// no picking target exists (e.g. mid-resize); callers skip the pass.
    ///
    /// Depth is cleared so the picking draws re-resolve occlusion against
    /// each other instead of failing against the main pass's identical depths.
    pub fn prepare_picking(&mut self) -> bool {
        let Some(target) = self.picking_target else {
            tracing::warn!("picking pass skipped: no picking target");
            return false;
        };
        let target = RenderTarget::Texture(target.texture);
        self.device.set_render_target(target);
        self.device.set_blend_state(None);
        self.device.set_depth_stencil_state(self.depth_stencil_state);
        self.device.clear_render_target(target, PICKING_CLEAR_COLOR);
        self.device.clear_depth(1.0);
        true
    }

    /// Route pixel shading through the identifier shader until the next
    /// [`Renderer::prepare_shader`].
    pub fn prepare_picking_shader(&mut self) {
        self.pixel_shader_override = self.shaders.picking_pixel;
        self.device
            .set_shader(ShaderStage::Pixel, self.shaders.picking_pixel);
        if let Some(buffer) = self.picking_constant_buffer {
            self.device
                .set_constant_buffer(ShaderStage::Pixel, PICKING_CONSTANTS_SLOT, buffer);
        }
    }

    /// Swap in the always-pass depth state for overlay components.
    pub fn prepare_z_ignore(&mut self) {
        self.device
            .set_depth_stencil_state(self.ignore_depth_stencil_state);
    }

    /// Upload per-draw MVP and color. No-op without a constant buffer.
    pub fn update_constant(&mut self, constants: &Constants) {
        let Some(buffer) = self.constant_buffer else {
            return;
        };
        self.device
            .write_buffer(buffer, bytemuck::bytes_of(constants));
    }

    /// Upload an identifier color with channels in `0..=255`; it is
    /// normalized before it reaches the buffer.
    pub fn update_constant_picking(&mut self, encoded: Vec4) {
        let Some(buffer) = self.picking_constant_buffer else {
            return;
        };
        let constants = PickingConstants {
            uuid_color: normalize_color(encoded).to_array(),
        };
        self.device
            .write_buffer(buffer, bytemuck::bytes_of(&constants));
    }

    /// Upload the owner's depth offset along with the camera's clip planes.
    pub fn update_constant_depth(&mut self, depth: u32) {
        let Some(buffer) = self.depth_constant_buffer else {
            return;
        };
        let constants = DepthConstants {
            depth_offset: depth as i32,
            near_plane: self.camera.near,
            far_plane: self.camera.far,
            _padding: 0.0,
        };
        self.device
            .write_buffer(buffer, bytemuck::bytes_of(&constants));
    }

    /// Store the view used by subsequent draws.
    pub fn update_view_matrix(&mut self, view: Mat4) {
        self.view_matrix = view;
    }

    /// Rebuild the projection from the camera and the current viewport aspect.
    pub fn update_projection_matrix(&mut self, camera: CameraParams) {
        self.camera = camera;
        let aspect = self.device.viewport().aspect_ratio();
        self.projection_matrix = camera.projection(aspect);
    }

    /// Upload MVP and color for `model`, then draw.
    pub fn render_primitive(&mut self, draw: &PrimitiveDraw, model: Mat4) {
        let mvp = self.projection_matrix * self.view_matrix * model;
        self.update_constant(&Constants::new(mvp, draw.color, draw.use_vertex_color));
        self.render_primitive_internal(draw.shape);
    }

    fn render_primitive_internal(&mut self, shape: PrimitiveShape) {
        let mesh = self.meshes.get(&shape).copied();
        let pixel_shader = self.pixel_shader_override.or(self.shaders.pixel);

        if self.shaders.vertex.is_none() {
            tracing::error!("vertex shader has not been set");
        }
        if pixel_shader.is_none() {
            tracing::error!("pixel shader has not been set");
        }
        let (vertex_buffer, index_buffer, index_count, topology) = match mesh {
            Some(m) => (m.vertex_buffer, m.index_buffer, m.index_count, m.topology),
            None => (None, None, 0, Topology::TriangleList),
        };
        if vertex_buffer.is_none() {
            tracing::error!(?shape, "vertex buffer has not been set");
        }
        if index_buffer.is_none() {
            tracing::error!(?shape, "index buffer has not been set");
        }

        self.device.set_shader(ShaderStage::Vertex, self.shaders.vertex);
        self.device.set_shader(ShaderStage::Pixel, pixel_shader);
        self.device.set_rasterizer_state(self.rasterizer_state);
        self.device.draw_indexed(&IndexedDraw {
            vertex_buffer,
            index_buffer,
            index_count,
            topology,
        });
    }

    /// Read the picking target at `screen_pos` (pixels).
    ///
    /// The coordinate is clamped into `[0, width] × [0, height]`, a single
    /// texel is copied into a 1×1 staging texture and returned with each
    /// channel in `0..=255`. Any failure yields [`PIXEL_FALLBACK`].
    pub fn get_pixel(&mut self, screen_pos: Vec2) -> Vec4 {
        let Some(target) = self.picking_target else {
            tracing::warn!("get_pixel without a picking target");
            return PIXEL_FALLBACK;
        };
        let viewport = self.device.viewport();
        let x = screen_pos.x.clamp(0.0, viewport.width as f32) as u32;
        let y = screen_pos.y.clamp(0.0, viewport.height as f32) as u32;

        let Some(staging) = self.device.create_staging_texture(1, 1) else {
            tracing::error!("failed to create picking staging texture");
            return PIXEL_FALLBACK;
        };
        self.device.copy_pixel(target.texture, staging, x, y);
        let pixel = self.device.read_staging_pixel(staging);
        self.device.release_texture(staging);

        match pixel {
            Some([r, g, b, a]) => {
                tracing::debug!(x, y, r, g, b, a, "picking pixel");
                Vec4::new(r as f32, g as f32, b as f32, a as f32)
            }
            None => PIXEL_FALLBACK,
        }
    }

    /// First half of a resize: drop the picking target immediately.
    pub fn on_update_window_size(&mut self, width: u32, height: u32) {
        self.release_picking_target();
        self.pending_size = Some(Viewport::new(width, height));
    }

    /// Second half of a resize: recreate the picking target at the device's
    /// final viewport size.
    pub fn on_resize_complete(&mut self) {
        self.release_picking_target();
        if let Some(pending) = self.pending_size.take() {
            let actual = self.device.viewport();
            if pending != actual {
                tracing::debug!(?pending, ?actual, "resize settled on a different size");
            }
        }
        self.create_picking_target();
    }

    fn create_picking_target(&mut self) {
        let Viewport { width, height } = self.device.viewport();
        if width == 0 || height == 0 {
            tracing::warn!(width, height, "picking target not created for empty viewport");
            return;
        }
        match self
            .device
            .create_render_target("picking_target", width, height)
        {
            Some(texture) => {
                self.picking_target = Some(PickingTarget {
                    texture,
                    width,
                    height,
                });
            }
            None => tracing::error!(width, height, "failed to create picking target"),
        }
    }

    fn release_picking_target(&mut self) {
        if let Some(target) = self.picking_target.take() {
            self.device.release_texture(target.texture);
        }
    }
}

fn create_constant_buffer<D: GpuDevice, T>(device: &mut D, label: &str) -> Option<BufferHandle> {
    // Constant buffers are rounded up to a multiple of 16 bytes.
    let size = (std::mem::size_of::<T>() as u64 + 0xf) & !0xf;
    let buffer = device.create_buffer(&BufferDesc {
        label,
        kind: BufferKind::Constant,
        size,
        contents: None,
    });
    if buffer.is_none() {
        tracing::error!(label, "failed to create constant buffer");
    }
    buffer
}

fn create_shader<D: GpuDevice>(device: &mut D, program: ShaderProgram) -> Option<ShaderHandle> {
    let shader = device.create_shader(program);
    if shader.is_none() {
        tracing::error!(?program, "failed to create shader");
    }
    shader
}

fn upload_mesh<D: GpuDevice>(device: &mut D, shape: PrimitiveShape) -> GpuMesh {
    let data = geometry::mesh(shape);
    let vertex_bytes: &[u8] = bytemuck::cast_slice(&data.vertices);
    let index_bytes: &[u8] = bytemuck::cast_slice(&data.indices);
    let vertex_buffer = device.create_buffer(&BufferDesc {
        label: "vertex_buffer",
        kind: BufferKind::Vertex,
        size: vertex_bytes.len() as u64,
        contents: Some(vertex_bytes),
    });
    let index_buffer = device.create_buffer(&BufferDesc {
        label: "index_buffer",
        kind: BufferKind::Index,
        size: index_bytes.len() as u64,
        contents: Some(index_bytes),
    });
    if vertex_buffer.is_none() || index_buffer.is_none() {
        tracing::error!(?shape, "failed to create mesh buffers");
    }
    GpuMesh {
        vertex_buffer,
        index_buffer,
        index_count: data.indices.len() as u32,
        topology: data.topology,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picking::{decode_color, encode_id};
    use crate::recording::{DeviceCall, RecordingDevice};
    use vantage_common::ObjectId;

    fn renderer(width: u32, height: u32) -> Renderer<RecordingDevice> {
        Renderer::new(RecordingDevice::new(width, height))
    }

    #[test]
    fn picking_target_matches_viewport_on_creation() {
        let r = renderer(640, 480);
        let target = r.picking_target().unwrap();
        assert_eq!((target.width, target.height), (640, 480));
        assert_eq!(r.device().texture_size(target.texture), Some((640, 480)));
    }

    #[test]
    fn resize_releases_immediately_and_recreates_on_complete() {
        let mut r = renderer(640, 480);
        let old = r.picking_target().unwrap().texture;

        r.on_update_window_size(1024, 768);
        assert!(r.picking_target().is_none());
        assert!(!r.device().is_live(old));

        r.device_mut().set_viewport(1024, 768);
        r.on_resize_complete();
        let new = r.picking_target().unwrap();
        assert_eq!((new.width, new.height), (1024, 768));
        assert_ne!(new.texture, old);
        assert!(r.device().released_textures().contains(&old));
    }

    #[test]
    fn resize_cycles_never_reuse_handles() {
        let mut r = renderer(100, 100);
        let mut seen = vec![r.picking_target().unwrap().texture];
        for (w, h) in [(1, 1), (300, 200), (7, 4096), (1920, 1080)] {
            r.on_update_window_size(w, h);
            r.device_mut().set_viewport(w, h);
            r.on_resize_complete();
            let t = r.picking_target().unwrap();
            assert_eq!((t.width, t.height), (w, h));
            assert!(!seen.contains(&t.texture));
            seen.push(t.texture);
        }
        assert_eq!(r.device().live_render_target_count(), 1);
    }

    #[test]
    fn constant_updates_are_noops_without_buffers() {
        let mut device = RecordingDevice::new(64, 64);
        device.fail_buffer_creation(true);
        let mut r = Renderer::new(device);
        r.update_constant(&Constants::new(Mat4::IDENTITY, Vec4::ONE, false));
        r.update_constant_picking(encode_id(ObjectId(5)));
        r.update_constant_depth(2);
        assert!(!r
            .device()
            .calls()
            .iter()
            .any(|c| matches!(c, DeviceCall::WriteBuffer { .. })));
    }

    #[test]
    fn missing_resources_still_issue_the_draw() {
        let mut device = RecordingDevice::new(64, 64);
        device.fail_buffer_creation(true);
        let mut r = Renderer::new(device);
        r.begin_frame();
        r.prepare();
        r.prepare_shader();
        r.prepare_main();
        r.render_primitive(
            &PrimitiveDraw {
                shape: PrimitiveShape::Cube,
                color: Vec4::ONE,
                use_vertex_color: true,
            },
            Mat4::IDENTITY,
        );
        let draws: Vec<_> = r.device().draws().collect();
        assert_eq!(draws.len(), 1);
        assert!(draws[0].draw.vertex_buffer.is_none());
    }

    #[test]
    fn picking_constant_is_normalized() {
        let mut r = renderer(64, 64);
        r.prepare_picking();
        r.prepare_picking_shader();
        r.update_constant_picking(Vec4::new(255.0, 0.0, 51.0, 255.0));
        r.render_primitive(
            &PrimitiveDraw {
                shape: PrimitiveShape::Cube,
                color: Vec4::ONE,
                use_vertex_color: false,
            },
            Mat4::IDENTITY,
        );
        let draw = r.device().draws().last().unwrap().clone();
        assert_eq!(draw.picking_color, Some([1.0, 0.0, 0.2, 1.0]));
        assert_eq!(draw.pixel_shader, Some(ShaderProgram::PickingPixel));
    }

    #[test]
    fn prepare_picking_clears_to_sentinel() {
        let mut r = renderer(32, 32);
        let target = r.picking_target().unwrap().texture;
        assert!(r.prepare_picking());
        assert!(r.device().calls().contains(&DeviceCall::Clear {
            target: RenderTarget::Texture(target),
            color: PICKING_CLEAR_COLOR,
        }));
        let pixel = r.get_pixel(Vec2::new(3.0, 3.0));
        assert_eq!(decode_color(pixel), ObjectId::NONE);
    }

    #[test]
    fn get_pixel_reads_raw_channels() {
        let mut r = renderer(32, 32);
        let target = r.picking_target().unwrap().texture;
        r.prepare_picking();
        r.device_mut().paint_pixel(target, 10, 12, [7, 1, 0, 0]);
        let pixel = r.get_pixel(Vec2::new(10.4, 12.9));
        assert_eq!(pixel, Vec4::new(7.0, 1.0, 0.0, 0.0));
        assert_eq!(decode_color(pixel), ObjectId(263));
    }

    #[test]
    fn get_pixel_clamps_coordinates() {
        let mut r = renderer(32, 32);
        let target = r.picking_target().unwrap().texture;
        r.prepare_picking();
        r.device_mut().paint_pixel(target, 0, 0, [9, 0, 0, 0]);
        let pixel = r.get_pixel(Vec2::new(-50.0, -3.0));
        assert_eq!(pixel, Vec4::new(9.0, 0.0, 0.0, 0.0));
        assert!(r.device().calls().contains(&DeviceCall::CopyPixel {
            source: target,
            x: 0,
            y: 0
        }));

        let _ = r.get_pixel(Vec2::new(5000.0, 5000.0));
        assert!(r.device().calls().contains(&DeviceCall::CopyPixel {
            source: target,
            x: 32,
            y: 32
        }));
    }

    #[test]
    fn get_pixel_falls_back_when_staging_fails() {
        let mut device = RecordingDevice::new(32, 32);
        device.fail_staging_creation(true);
        let mut r = Renderer::new(device);
        assert_eq!(r.get_pixel(Vec2::new(1.0, 1.0)), PIXEL_FALLBACK);
    }

    #[test]
    fn staging_texture_is_released_after_readback() {
        let mut r = renderer(32, 32);
        let _ = r.get_pixel(Vec2::ZERO);
        assert_eq!(r.device().live_staging_count(), 0);
    }

    #[test]
    fn z_ignore_binds_always_pass_state() {
        let mut r = renderer(32, 32);
        r.prepare_main();
        r.prepare_z_ignore();
        let last_depth = r.device().calls().iter().rev().find_map(|c| match c {
            DeviceCall::SetDepthStencil(desc) => Some(*desc),
            _ => None,
        });
        assert_eq!(last_depth, Some(Some(DepthStencilDesc::IGNORE_DEPTH)));
    }

    #[test]
    fn projection_uses_viewport_aspect() {
        let mut r = renderer(200, 100);
        r.update_projection_matrix(CameraParams::default());
        let expected = CameraParams::default().projection(2.0);
        assert_eq!(r.projection_matrix(), expected);
    }
}
