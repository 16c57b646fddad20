use crate::shaders;
use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroU64;
use vantage_common::Viewport;
use vantage_render::constants::{Constants, DepthConstants, PickingConstants};
use vantage_render::device::{
    BlendDesc, BufferDesc, BufferHandle, BufferKind, CompareFunction, CullMode, DepthStencilDesc,
    GpuDevice, IndexedDraw, RasterizerDesc, RenderTarget, ShaderHandle, ShaderProgram,
    ShaderStage, StateHandle, TextureHandle, Topology,
};
use vantage_render::geometry::Vertex;
use wgpu::util::DeviceExt;

/// Format of offscreen render targets. Must stay 8-bit unorm so identifier
/// bytes survive the round trip.
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Every dynamic uniform offset is a multiple of this.
const UNIFORM_ALIGN: usize = 256;
const UNIFORM_SLOTS: usize = 3;
const INITIAL_ARENA_SIZE: u64 = 256 * 1024;
/// Staging copies use a full row so `bytes_per_row` satisfies the copy alignment.
const STAGING_SIZE: u64 = 256;

const SLOT_SIZES: [u64; UNIFORM_SLOTS] = [
    std::mem::size_of::<Constants>() as u64,
    std::mem::size_of::<PickingConstants>() as u64,
    std::mem::size_of::<DepthConstants>() as u64,
];

struct GpuBuffer {
    buffer: Option<wgpu::Buffer>,
    kind: BufferKind,
    /// CPU copy of constant buffer contents, snapshotted per draw.
    shadow: Vec<u8>,
}

enum GpuTexture {
    Target {
        texture: wgpu::Texture,
        view: wgpu::TextureView,
        width: u32,
        height: u32,
    },
    Staging {
        buffer: wgpu::Buffer,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PipelineKey {
    format: wgpu::TextureFormat,
    pixel: ShaderProgram,
    depth: DepthStencilDesc,
    blend: BlendDesc,
    rasterizer: RasterizerDesc,
    topology: Topology,
}

#[derive(Debug, Clone, Copy, Default)]
struct BoundState {
    target: Option<RenderTarget>,
    depth: Option<StateHandle>,
    blend: Option<StateHandle>,
    rasterizer: Option<StateHandle>,
    vertex_shader: Option<ShaderHandle>,
    pixel_shader: Option<ShaderHandle>,
    slots: [Option<BufferHandle>; UNIFORM_SLOTS],
}

#[derive(Debug, Clone, Copy)]
enum Command {
    Clear {
        target: RenderTarget,
        color: [f32; 4],
    },
    ClearDepth(f32),
    Draw {
        target: RenderTarget,
        pipeline: PipelineKey,
        draw: IndexedDraw,
        offsets: [u32; UNIFORM_SLOTS],
    },
    CopyPixel {
        source: TextureHandle,
        staging: TextureHandle,
        x: u32,
        y: u32,
    },
}

/// One render pass worth of commands against a single color target.
struct PassSegment {
    target: RenderTarget,
    clear_color: Option<[f32; 4]>,
    clear_depth: Option<f32>,
    draws: Vec<(PipelineKey, IndexedDraw, [u32; UNIFORM_SLOTS])>,
}

enum Segment {
    Pass(PassSegment),
    Copy {
        source: TextureHandle,
        staging: TextureHandle,
        x: u32,
        y: u32,
    },
}

/// [`GpuDevice`] backed by wgpu.
///
/// Calls are recorded while the renderer drives the state machine and
/// encoded into render passes on [`WgpuDevice::end_frame`] (or earlier when
/// a staging read needs the results). Constant buffer contents are copied
/// into a per-frame uniform arena at draw time, so a draw always sees the
/// values bound when it was issued.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    viewport: Viewport,
    depth_view: wgpu::TextureView,
    shader_module: wgpu::ShaderModule,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    arena: wgpu::Buffer,
    arena_size: u64,
    bind_group: wgpu::BindGroup,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    next_handle: u32,
    buffers: BTreeMap<BufferHandle, GpuBuffer>,
    textures: BTreeMap<TextureHandle, GpuTexture>,
    depth_states: BTreeMap<StateHandle, DepthStencilDesc>,
    blend_states: BTreeMap<StateHandle, BlendDesc>,
    rasterizer_states: BTreeMap<StateHandle, RasterizerDesc>,
    shaders: BTreeMap<ShaderHandle, ShaderProgram>,
    bound: BoundState,
    commands: Vec<Command>,
    uniforms: Vec<u8>,
    frame_view: Option<wgpu::TextureView>,
}

impl WgpuDevice {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("primitive_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::PRIMITIVE_SHADER.into()),
        });

        let entries: Vec<wgpu::BindGroupLayoutEntry> = SLOT_SIZES
            .iter()
            .enumerate()
            .map(|(binding, size)| wgpu::BindGroupLayoutEntry {
                binding: binding as u32,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(*size),
                },
                count: None,
            })
            .collect();
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("constants_bind_group_layout"),
            entries: &entries,
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("primitive_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let arena = create_arena(&device, INITIAL_ARENA_SIZE);
        let bind_group = create_bind_group(&device, &bind_group_layout, &arena);
        let depth_view = create_depth_view(&device, width, height);

        Self {
            device,
            queue,
            surface_format,
            viewport: Viewport::new(width, height),
            depth_view,
            shader_module,
            bind_group_layout,
            pipeline_layout,
            arena,
            arena_size: INITIAL_ARENA_SIZE,
            bind_group,
            pipelines: HashMap::new(),
            next_handle: 1,
            buffers: BTreeMap::new(),
            textures: BTreeMap::new(),
            depth_states: BTreeMap::new(),
            blend_states: BTreeMap::new(),
            rasterizer_states: BTreeMap::new(),
            shaders: BTreeMap::new(),
            bound: BoundState::default(),
            commands: Vec::new(),
            uniforms: Vec::new(),
            frame_view: None,
        }
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    /// The underlying wgpu device, for surface configuration.
    pub fn wgpu_device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Adopt a new swap-chain size. The shared depth buffer follows it.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = Viewport::new(width, height);
        self.depth_view = create_depth_view(&self.device, width, height);
    }

    /// Start recording a frame whose main target is `view`.
    pub fn begin_frame(&mut self, view: wgpu::TextureView) {
        self.frame_view = Some(view);
    }

    /// Encode and submit everything recorded since the last submit.
    pub fn end_frame(&mut self) {
        self.submit();
        self.frame_view = None;
    }

    fn allocate(&mut self) -> u32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn target_format(&self, target: RenderTarget) -> wgpu::TextureFormat {
        match target {
            RenderTarget::Main => self.surface_format,
            RenderTarget::Texture(_) => TARGET_FORMAT,
        }
    }

    fn ensure_pipeline(&mut self, key: PipelineKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }
        let fragment_entry = match key.pixel {
            ShaderProgram::PickingPixel => shaders::PICKING_ENTRY,
            _ => shaders::PIXEL_ENTRY,
        };
        let polygon_mode = if key.rasterizer.wireframe
            && self.device.features().contains(wgpu::Features::POLYGON_MODE_LINE)
        {
            wgpu::PolygonMode::Line
        } else {
            wgpu::PolygonMode::Fill
        };
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("primitive_pipeline"),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &self.shader_module,
                    entry_point: Some(shaders::VERTEX_ENTRY),
                    compilation_options: Default::default(),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<Vertex>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![
                            0 => Float32x3,
                            1 => Float32x4,
                        ],
                    }],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &self.shader_module,
                    entry_point: Some(fragment_entry),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: key.format,
                        blend: Some(blend_state(key.blend)),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: match key.topology {
                        Topology::LineList => wgpu::PrimitiveTopology::LineList,
                        Topology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
                    },
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: match key.rasterizer.cull {
                        CullMode::None => None,
                        CullMode::Back => Some(wgpu::Face::Back),
                        CullMode::Front => Some(wgpu::Face::Front),
                    },
                    polygon_mode,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: key.depth.depth_enable && key.depth.depth_write,
                    depth_compare: if key.depth.depth_enable {
                        compare_function(key.depth.compare)
                    } else {
                        wgpu::CompareFunction::Always
                    },
                    stencil: Default::default(),
                    bias: Default::default(),
                }),
                multisample: Default::default(),
                multiview: None,
                cache: None,
            });
        tracing::debug!(?key, "created render pipeline");
        self.pipelines.insert(key, pipeline);
    }

    /// Append the bound constant buffers to the uniform arena and return
    /// their offsets.
    fn snapshot_uniforms(&mut self) -> [u32; UNIFORM_SLOTS] {
        let mut offsets = [0u32; UNIFORM_SLOTS];
        for (slot, offset) in offsets.iter_mut().enumerate() {
            let start = self.uniforms.len();
            *offset = start as u32;
            let size = SLOT_SIZES[slot] as usize;
            let bytes = self.bound.slots[slot]
                .and_then(|h| self.buffers.get(&h))
                .map(|b| b.shadow.as_slice())
                .unwrap_or(&[]);
            let len = bytes.len().min(size);
            self.uniforms.extend_from_slice(&bytes[..len]);
            self.uniforms.resize(start + UNIFORM_ALIGN, 0);
        }
        offsets
    }

    fn grow_arena(&mut self, needed: u64) {
        if needed <= self.arena_size {
            return;
        }
        let size = needed.next_power_of_two();
        tracing::debug!(size, "growing uniform arena");
        self.arena = create_arena(&self.device, size);
        self.bind_group = create_bind_group(&self.device, &self.bind_group_layout, &self.arena);
        self.arena_size = size;
    }

    fn submit(&mut self) {
        if self.commands.is_empty() {
            return;
        }
        let commands = std::mem::take(&mut self.commands);
        let uniforms = std::mem::take(&mut self.uniforms);
        self.grow_arena(uniforms.len() as u64);
        if !uniforms.is_empty() {
            self.queue.write_buffer(&self.arena, 0, &uniforms);
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });
        for segment in segment_commands(&commands) {
            match segment {
                Segment::Pass(pass) => self.encode_pass(&mut encoder, &pass),
                Segment::Copy {
                    source,
                    staging,
                    x,
                    y,
                } => self.encode_copy(&mut encoder, source, staging, x, y),
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn color_view(&self, target: RenderTarget) -> Option<&wgpu::TextureView> {
        match target {
            RenderTarget::Main => self.frame_view.as_ref(),
            RenderTarget::Texture(handle) => match self.textures.get(&handle) {
                Some(GpuTexture::Target { view, .. }) => Some(view),
                _ => None,
            },
        }
    }

    fn encode_pass(&self, encoder: &mut wgpu::CommandEncoder, segment: &PassSegment) {
        let Some(view) = self.color_view(segment.target) else {
            tracing::debug!(render_target = ?segment.target, "dropping pass without a color target");
            return;
        };
        let color_load = match segment.clear_color {
            Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: a as f64,
            }),
            None => wgpu::LoadOp::Load,
        };
        let depth_load = match segment.clear_depth {
            Some(depth) => wgpu::LoadOp::Clear(depth),
            None => wgpu::LoadOp::Load,
        };
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("primitive_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: color_load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: depth_load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        });

        for (key, draw, offsets) in &segment.draws {
            let Some(pipeline) = self.pipelines.get(key) else {
                continue;
            };
            let vertex = draw
                .vertex_buffer
                .and_then(|h| self.buffers.get(&h))
                .and_then(|b| b.buffer.as_ref());
            let index = draw
                .index_buffer
                .and_then(|h| self.buffers.get(&h))
                .and_then(|b| b.buffer.as_ref());
            let (Some(vertex), Some(index)) = (vertex, index) else {
                continue;
            };
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &self.bind_group, offsets);
            pass.set_vertex_buffer(0, vertex.slice(..));
            pass.set_index_buffer(index.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..draw.index_count, 0, 0..1);
        }
    }

    fn encode_copy(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        source: TextureHandle,
        staging: TextureHandle,
        x: u32,
        y: u32,
    ) {
        let (
            Some(GpuTexture::Target {
                texture,
                width,
                height,
                ..
            }),
            Some(GpuTexture::Staging { buffer }),
        ) = (self.textures.get(&source), self.textures.get(&staging))
        else {
            return;
        };
        if x >= *width || y >= *height {
            tracing::debug!(x, y, "pixel copy outside the target is ignored");
            return;
        }
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(STAGING_SIZE as u32),
                    rows_per_image: None,
                },
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
    }
}

/// Split the recorded stream into render passes and copies. Clears become
/// load ops on the next pass for their target; clears with no following
/// draw get a pass of their own.
fn segment_commands(commands: &[Command]) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current: Option<PassSegment> = None;
    let mut pending_colors: Vec<(RenderTarget, [f32; 4])> = Vec::new();
    let mut pending_depth: Option<f32> = None;

    let flush_pending = |segments: &mut Vec<Segment>,
                         pending_colors: &mut Vec<(RenderTarget, [f32; 4])>,
                         pending_depth: &mut Option<f32>| {
        for (target, color) in pending_colors.drain(..) {
            segments.push(Segment::Pass(PassSegment {
                target,
                clear_color: Some(color),
                clear_depth: pending_depth.take(),
                draws: Vec::new(),
            }));
        }
    };

    for command in commands {
        match *command {
            Command::Clear { target, color } => {
                if let Some(pass) = current.take() {
                    segments.push(Segment::Pass(pass));
                }
                pending_colors.retain(|(t, _)| *t != target);
                pending_colors.push((target, color));
            }
            Command::ClearDepth(depth) => {
                if let Some(pass) = current.take() {
                    segments.push(Segment::Pass(pass));
                }
                pending_depth = Some(depth);
            }
            Command::Draw {
                target,
                pipeline,
                draw,
                offsets,
            } => {
                if current.as_ref().is_some_and(|pass| pass.target != target) {
                    if let Some(pass) = current.take() {
                        segments.push(Segment::Pass(pass));
                    }
                }
                let pass = current.get_or_insert_with(|| {
                    let clear_color = pending_colors
                        .iter()
                        .position(|(t, _)| *t == target)
                        .map(|i| pending_colors.remove(i).1);
                    PassSegment {
                        target,
                        clear_color,
                        clear_depth: pending_depth.take(),
                        draws: Vec::new(),
                    }
                });
                pass.draws.push((pipeline, draw, offsets));
            }
            Command::CopyPixel {
                source,
                staging,
                x,
                y,
            } => {
                if let Some(pass) = current.take() {
                    segments.push(Segment::Pass(pass));
                }
                flush_pending(&mut segments, &mut pending_colors, &mut pending_depth);
                segments.push(Segment::Copy {
                    source,
                    staging,
                    x,
                    y,
                });
            }
        }
    }
    if let Some(pass) = current.take() {
        segments.push(Segment::Pass(pass));
    }
    flush_pending(&mut segments, &mut pending_colors, &mut pending_depth);
    segments
}

impl GpuDevice for WgpuDevice {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Option<BufferHandle> {
        let handle = BufferHandle(self.allocate());
        let entry = match desc.kind {
            BufferKind::Constant => GpuBuffer {
                buffer: None,
                kind: desc.kind,
                shadow: vec![0; desc.size as usize],
            },
            BufferKind::Vertex | BufferKind::Index => {
                let usage = match desc.kind {
                    BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
                    _ => wgpu::BufferUsages::INDEX,
                } | wgpu::BufferUsages::COPY_DST;
                let buffer = match desc.contents {
                    Some(contents) => {
                        self.device
                            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                                label: Some(desc.label),
                                contents,
                                usage,
                            })
                    }
                    None => self.device.create_buffer(&wgpu::BufferDescriptor {
                        label: Some(desc.label),
                        size: desc.size,
                        usage,
                        mapped_at_creation: false,
                    }),
                };
                GpuBuffer {
                    buffer: Some(buffer),
                    kind: desc.kind,
                    shadow: Vec::new(),
                }
            }
        };
        self.buffers.insert(handle, entry);
        Some(handle)
    }

    fn write_buffer(&mut self, buffer: BufferHandle, bytes: &[u8]) {
        let Some(entry) = self.buffers.get_mut(&buffer) else {
            return;
        };
        match (entry.kind, &entry.buffer) {
            (BufferKind::Constant, _) => {
                let len = bytes.len().min(entry.shadow.len());
                entry.shadow[..len].copy_from_slice(&bytes[..len]);
            }
            (_, Some(gpu)) => self.queue.write_buffer(gpu, 0, bytes),
            (_, None) => {}
        }
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer);
    }

    fn create_render_target(
        &mut self,
        label: &str,
        width: u32,
        height: u32,
    ) -> Option<TextureHandle> {
        if width == 0 || height == 0 {
            return None;
        }
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&Default::default());
        let handle = TextureHandle(self.allocate());
        self.textures.insert(
            handle,
            GpuTexture::Target {
                texture,
                view,
                width,
                height,
            },
        );
        Some(handle)
    }

    fn create_staging_texture(&mut self, width: u32, height: u32) -> Option<TextureHandle> {
        if width != 1 || height != 1 {
            tracing::warn!(width, height, "only single-texel staging copies are supported");
            return None;
        }
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("picking_staging"),
            size: STAGING_SIZE,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let handle = TextureHandle(self.allocate());
        self.textures.insert(handle, GpuTexture::Staging { buffer });
        Some(handle)
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(&texture);
    }

    fn create_depth_stencil_state(&mut self, desc: DepthStencilDesc) -> Option<StateHandle> {
        let handle = StateHandle(self.allocate());
        self.depth_states.insert(handle, desc);
        Some(handle)
    }

    fn create_blend_state(&mut self, desc: BlendDesc) -> Option<StateHandle> {
        let handle = StateHandle(self.allocate());
        self.blend_states.insert(handle, desc);
        Some(handle)
    }

    fn create_rasterizer_state(&mut self, desc: RasterizerDesc) -> Option<StateHandle> {
        let handle = StateHandle(self.allocate());
        self.rasterizer_states.insert(handle, desc);
        Some(handle)
    }

    fn create_shader(&mut self, program: ShaderProgram) -> Option<ShaderHandle> {
        let handle = ShaderHandle(self.allocate());
        self.shaders.insert(handle, program);
        Some(handle)
    }

    fn set_render_target(&mut self, target: RenderTarget) {
        self.bound.target = Some(target);
    }

    fn clear_render_target(&mut self, target: RenderTarget, color: [f32; 4]) {
        self.commands.push(Command::Clear { target, color });
    }

    fn clear_depth(&mut self, depth: f32) {
        self.commands.push(Command::ClearDepth(depth));
    }

    fn set_depth_stencil_state(&mut self, state: Option<StateHandle>) {
        self.bound.depth = state;
    }

    fn set_blend_state(&mut self, state: Option<StateHandle>) {
        self.bound.blend = state;
    }

    fn set_rasterizer_state(&mut self, state: Option<StateHandle>) {
        self.bound.rasterizer = state;
    }

    fn set_shader(&mut self, stage: ShaderStage, shader: Option<ShaderHandle>) {
        match stage {
            ShaderStage::Vertex => self.bound.vertex_shader = shader,
            ShaderStage::Pixel => self.bound.pixel_shader = shader,
        }
    }

    fn set_constant_buffer(&mut self, _stage: ShaderStage, slot: u32, buffer: BufferHandle) {
        match self.bound.slots.get_mut(slot as usize) {
            Some(bound) => *bound = Some(buffer),
            None => tracing::warn!(slot, "constant buffer slot out of range"),
        }
    }

    fn draw_indexed(&mut self, draw: &IndexedDraw) {
        if self.bound.vertex_shader.is_none() {
            return;
        }
        let Some(pixel) = self
            .bound
            .pixel_shader
            .and_then(|h| self.shaders.get(&h).copied())
        else {
            return;
        };
        let target = self.bound.target.unwrap_or(RenderTarget::Main);
        let key = PipelineKey {
            format: self.target_format(target),
            pixel,
            depth: self
                .bound
                .depth
                .and_then(|h| self.depth_states.get(&h).copied())
                .unwrap_or_default(),
            blend: self
                .bound
                .blend
                .and_then(|h| self.blend_states.get(&h).copied())
                .unwrap_or_default(),
            rasterizer: self
                .bound
                .rasterizer
                .and_then(|h| self.rasterizer_states.get(&h).copied())
                .unwrap_or_default(),
            topology: draw.topology,
        };
        self.ensure_pipeline(key);
        let offsets = self.snapshot_uniforms();
        self.commands.push(Command::Draw {
            target,
            pipeline: key,
            draw: *draw,
            offsets,
        });
    }

    fn copy_pixel(&mut self, source: TextureHandle, staging: TextureHandle, x: u32, y: u32) {
        self.commands.push(Command::CopyPixel {
            source,
            staging,
            x,
            y,
        });
    }

    fn read_staging_pixel(&mut self, staging: TextureHandle) -> Option<[u8; 4]> {
        self.submit();
        let Some(GpuTexture::Staging { buffer }) = self.textures.get(&staging) else {
            return None;
        };
        let slice = buffer.slice(0..4);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        let _ = self.device.poll(wgpu::Maintain::Wait);
        match receiver.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::error!(%err, "failed to map picking staging buffer");
                return None;
            }
            Err(_) => return None,
        }
        let pixel = {
            let data = slice.get_mapped_range();
            [data[0], data[1], data[2], data[3]]
        };
        buffer.unmap();
        Some(pixel)
    }
}

fn create_arena(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("uniform_arena"),
        size,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    arena: &wgpu::Buffer,
) -> wgpu::BindGroup {
    let entries: Vec<wgpu::BindGroupEntry> = SLOT_SIZES
        .iter()
        .enumerate()
        .map(|(binding, size)| wgpu::BindGroupEntry {
            binding: binding as u32,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: arena,
                offset: 0,
                size: NonZeroU64::new(*size),
            }),
        })
        .collect();
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("constants_bind_group"),
        layout,
        entries: &entries,
    })
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&Default::default())
}

fn compare_function(compare: CompareFunction) -> wgpu::CompareFunction {
    match compare {
        CompareFunction::Never => wgpu::CompareFunction::Never,
        CompareFunction::Less => wgpu::CompareFunction::Less,
        CompareFunction::LessEqual => wgpu::CompareFunction::LessEqual,
        CompareFunction::Equal => wgpu::CompareFunction::Equal,
        CompareFunction::Greater => wgpu::CompareFunction::Greater,
        CompareFunction::Always => wgpu::CompareFunction::Always,
    }
}

fn blend_state(blend: BlendDesc) -> wgpu::BlendState {
    match blend {
        BlendDesc::Opaque => wgpu::BlendState::REPLACE,
        BlendDesc::AlphaBlend => wgpu::BlendState::ALPHA_BLENDING,
    }
}
