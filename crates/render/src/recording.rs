//! Headless [`GpuDevice`] that records every call.
//!
//! Used by tests and by the command-line frame dump. Textures are modelled
//! as a fill color plus individually painted texels, which is enough to
//! exercise clears and single-texel readback.

use crate::constants::{
    CONSTANTS_SLOT, Constants, DEPTH_CONSTANTS_SLOT, DepthConstants, PICKING_CONSTANTS_SLOT,
    PickingConstants,
};
use crate::device::{
    BlendDesc, BufferDesc, BufferHandle, BufferKind, DepthStencilDesc, GpuDevice, IndexedDraw,
    RasterizerDesc, RenderTarget, ShaderHandle, ShaderProgram, ShaderStage, StateHandle,
    TextureHandle,
};
use crate::picking::unorm8;
use std::collections::BTreeMap;
use vantage_common::Viewport;

/// Snapshot of the bound pipeline at the moment of a draw.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub target: RenderTarget,
    pub depth_state: Option<DepthStencilDesc>,
    pub blend_state: Option<BlendDesc>,
    pub vertex_shader: Option<ShaderProgram>,
    pub pixel_shader: Option<ShaderProgram>,
    pub constants: Option<Constants>,
    pub picking_color: Option<[f32; 4]>,
    pub depth: Option<DepthConstants>,
    pub draw: IndexedDraw,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    WriteBuffer { buffer: BufferHandle, len: usize },
    CreateTexture { texture: TextureHandle, width: u32, height: u32, staging: bool },
    ReleaseTexture(TextureHandle),
    SetRenderTarget(RenderTarget),
    Clear { target: RenderTarget, color: [f32; 4] },
    ClearDepth(f32),
    SetDepthStencil(Option<DepthStencilDesc>),
    SetBlend(Option<BlendDesc>),
    Draw(DrawRecord),
    CopyPixel { source: TextureHandle, x: u32, y: u32 },
}

#[derive(Debug, Clone)]
struct RecordedTexture {
    width: u32,
    height: u32,
    staging: bool,
    fill: [u8; 4],
    texels: BTreeMap<(u32, u32), [u8; 4]>,
}

impl RecordedTexture {
    fn texel(&self, x: u32, y: u32) -> [u8; 4] {
        self.texels.get(&(x, y)).copied().unwrap_or(self.fill)
    }
}

#[derive(Debug, Default)]
pub struct RecordingDevice {
    viewport: Viewport,
    next_handle: u32,
    buffers: BTreeMap<BufferHandle, (BufferKind, Vec<u8>)>,
    textures: BTreeMap<TextureHandle, RecordedTexture>,
    released_textures: Vec<TextureHandle>,
    depth_states: BTreeMap<StateHandle, DepthStencilDesc>,
    blend_states: BTreeMap<StateHandle, BlendDesc>,
    rasterizer_states: BTreeMap<StateHandle, RasterizerDesc>,
    shaders: BTreeMap<ShaderHandle, ShaderProgram>,
    target: Option<RenderTarget>,
    depth_state: Option<StateHandle>,
    blend_state: Option<StateHandle>,
    vertex_shader: Option<ShaderHandle>,
    pixel_shader: Option<ShaderHandle>,
    constant_slots: BTreeMap<(u8, u32), BufferHandle>,
    calls: Vec<DeviceCall>,
    fail_buffers: bool,
    fail_staging: bool,
}

fn stage_key(stage: ShaderStage) -> u8 {
    match stage {
        ShaderStage::Vertex => 0,
        ShaderStage::Pixel => 1,
    }
}

impl RecordingDevice {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            viewport: Viewport::new(width, height),
            next_handle: 1,
            ..Self::default()
        }
    }

    /// Simulate the swap chain settling on a new size.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = Viewport::new(width, height);
    }

    pub fn fail_buffer_creation(&mut self, fail: bool) {
        self.fail_buffers = fail;
    }

    pub fn fail_staging_creation(&mut self, fail: bool) {
        self.fail_staging = fail;
    }

    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn draws(&self) -> impl Iterator<Item = &DrawRecord> {
        self.calls.iter().filter_map(|call| match call {
            DeviceCall::Draw(record) => Some(record),
            _ => None,
        })
    }

    pub fn texture_size(&self, texture: TextureHandle) -> Option<(u32, u32)> {
        self.textures.get(&texture).map(|t| (t.width, t.height))
    }

    pub fn is_live(&self, texture: TextureHandle) -> bool {
        self.textures.contains_key(&texture)
    }

    pub fn released_textures(&self) -> &[TextureHandle] {
        &self.released_textures
    }

    pub fn live_render_target_count(&self) -> usize {
        self.textures.values().filter(|t| !t.staging).count()
    }

    pub fn live_staging_count(&self) -> usize {
        self.textures.values().filter(|t| t.staging).count()
    }

    /// Write one texel directly, as if a draw had covered it.
    pub fn paint_pixel(&mut self, texture: TextureHandle, x: u32, y: u32, rgba: [u8; 4]) {
        if let Some(t) = self.textures.get_mut(&texture) {
            t.texels.insert((x, y), rgba);
        }
    }

    fn allocate(&mut self) -> u32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn create_texture(&mut self, width: u32, height: u32, staging: bool) -> TextureHandle {
        let texture = TextureHandle(self.allocate());
        self.textures.insert(
            texture,
            RecordedTexture {
                width,
                height,
                staging,
                fill: [0; 4],
                texels: BTreeMap::new(),
            },
        );
        self.calls.push(DeviceCall::CreateTexture {
            texture,
            width,
            height,
            staging,
        });
        texture
    }

    fn read_slot<T: bytemuck::Pod>(&self, stage: ShaderStage, slot: u32) -> Option<T> {
        let buffer = self.constant_slots.get(&(stage_key(stage), slot))?;
        let (_, bytes) = self.buffers.get(buffer)?;
        let size = std::mem::size_of::<T>();
        bytemuck::try_pod_read_unaligned(bytes.get(..size)?).ok()
    }
}

impl GpuDevice for RecordingDevice {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Option<BufferHandle> {
        if self.fail_buffers {
            return None;
        }
        let buffer = BufferHandle(self.allocate());
        let bytes = match desc.contents {
            Some(contents) => contents.to_vec(),
            None => vec![0; desc.size as usize],
        };
        self.buffers.insert(buffer, (desc.kind, bytes));
        Some(buffer)
    }

    fn write_buffer(&mut self, buffer: BufferHandle, bytes: &[u8]) {
        if let Some((_, data)) = self.buffers.get_mut(&buffer) {
            let len = bytes.len().min(data.len());
            data[..len].copy_from_slice(&bytes[..len]);
        }
        self.calls.push(DeviceCall::WriteBuffer {
            buffer,
            len: bytes.len(),
        });
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer);
    }

    fn create_render_target(
        &mut self,
        _label: &str,
        width: u32,
        height: u32,
    ) -> Option<TextureHandle> {
        Some(self.create_texture(width, height, false))
    }

    fn create_staging_texture(&mut self, width: u32, height: u32) -> Option<TextureHandle> {
        if self.fail_staging {
            return None;
        }
        Some(self.create_texture(width, height, true))
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(&texture).is_some() {
            self.released_textures.push(texture);
            self.calls.push(DeviceCall::ReleaseTexture(texture));
        }
    }

    fn create_depth_stencil_state(&mut self, desc: DepthStencilDesc) -> Option<StateHandle> {
        let state = StateHandle(self.allocate());
        self.depth_states.insert(state, desc);
        Some(state)
    }

    fn create_blend_state(&mut self, desc: BlendDesc) -> Option<StateHandle> {
        let state = StateHandle(self.allocate());
        self.blend_states.insert(state, desc);
        Some(state)
    }

    fn create_rasterizer_state(&mut self, desc: RasterizerDesc) -> Option<StateHandle> {
        let state = StateHandle(self.allocate());
        self.rasterizer_states.insert(state, desc);
        Some(state)
    }

    fn create_shader(&mut self, program: ShaderProgram) -> Option<ShaderHandle> {
        let shader = ShaderHandle(self.allocate());
        self.shaders.insert(shader, program);
        Some(shader)
    }

    fn set_render_target(&mut self, target: RenderTarget) {
        self.target = Some(target);
        self.calls.push(DeviceCall::SetRenderTarget(target));
    }

    fn clear_render_target(&mut self, target: RenderTarget, color: [f32; 4]) {
        if let RenderTarget::Texture(texture) = target {
            if let Some(t) = self.textures.get_mut(&texture) {
                t.fill = color.map(unorm8);
                t.texels.clear();
            }
        }
        self.calls.push(DeviceCall::Clear { target, color });
    }

    fn clear_depth(&mut self, depth: f32) {
        self.calls.push(DeviceCall::ClearDepth(depth));
    }

    fn set_depth_stencil_state(&mut self, state: Option<StateHandle>) {
        self.depth_state = state;
        let desc = state.and_then(|s| self.depth_states.get(&s).copied());
        self.calls.push(DeviceCall::SetDepthStencil(desc));
    }

    fn set_blend_state(&mut self, state: Option<StateHandle>) {
        self.blend_state = state;
        let desc = state.and_then(|s| self.blend_states.get(&s).copied());
        self.calls.push(DeviceCall::SetBlend(desc));
    }

    fn set_rasterizer_state(&mut self, _state: Option<StateHandle>) {}

    fn set_shader(&mut self, stage: ShaderStage, shader: Option<ShaderHandle>) {
        match stage {
            ShaderStage::Vertex => self.vertex_shader = shader,
            ShaderStage::Pixel => self.pixel_shader = shader,
        }
    }

    fn set_constant_buffer(&mut self, stage: ShaderStage, slot: u32, buffer: BufferHandle) {
        self.constant_slots.insert((stage_key(stage), slot), buffer);
    }

    fn draw_indexed(&mut self, draw: &IndexedDraw) {
        let record = DrawRecord {
            target: self.target.unwrap_or(RenderTarget::Main),
            depth_state: self
                .depth_state
                .and_then(|s| self.depth_states.get(&s).copied()),
            blend_state: self
                .blend_state
                .and_then(|s| self.blend_states.get(&s).copied()),
            vertex_shader: self
                .vertex_shader
                .and_then(|s| self.shaders.get(&s).copied()),
            pixel_shader: self
                .pixel_shader
                .and_then(|s| self.shaders.get(&s).copied()),
            constants: self.read_slot::<Constants>(ShaderStage::Vertex, CONSTANTS_SLOT),
            picking_color: self
                .read_slot::<PickingConstants>(ShaderStage::Pixel, PICKING_CONSTANTS_SLOT)
                .map(|c| c.uuid_color),
            depth: self.read_slot::<DepthConstants>(ShaderStage::Pixel, DEPTH_CONSTANTS_SLOT),
            draw: *draw,
        };
        self.calls.push(DeviceCall::Draw(record));
    }

    fn copy_pixel(&mut self, source: TextureHandle, staging: TextureHandle, x: u32, y: u32) {
        self.calls.push(DeviceCall::CopyPixel { source, x, y });
        let Some(texel) = self
            .textures
            .get(&source)
            .filter(|t| x < t.width && y < t.height)
            .map(|t| t.texel(x, y))
        else {
            return;
        };
        if let Some(target) = self.textures.get_mut(&staging) {
            target.texels.insert((0, 0), texel);
        }
    }

    fn read_staging_pixel(&mut self, staging: TextureHandle) -> Option<[u8; 4]> {
        self.textures
            .get(&staging)
            .filter(|t| t.staging)
            .map(|t| t.texel(0, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_never_reused() {
        let mut device = RecordingDevice::new(8, 8);
        let a = device.create_render_target("a", 8, 8).unwrap();
        device.release_texture(a);
        let b = device.create_render_target("b", 8, 8).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn out_of_range_copy_leaves_staging_untouched() {
        let mut device = RecordingDevice::new(4, 4);
        let target = device.create_render_target("t", 4, 4).unwrap();
        device.clear_render_target(RenderTarget::Texture(target), [1.0; 4]);
        let staging = device.create_staging_texture(1, 1).unwrap();
        device.copy_pixel(target, staging, 4, 0);
        assert_eq!(device.read_staging_pixel(staging), Some([0; 4]));
        device.copy_pixel(target, staging, 3, 3);
        assert_eq!(device.read_staging_pixel(staging), Some([255; 4]));
    }

    #[test]
    fn release_is_recorded_once() {
        let mut device = RecordingDevice::new(4, 4);
        let target = device.create_render_target("t", 4, 4).unwrap();
        device.release_texture(target);
        device.release_texture(target);
        assert_eq!(device.released_textures(), &[target]);
    }
}
