/// WGSL for primitive rendering and the picking pass.
///
/// Bindings mirror the renderer's constant buffer slots; each one is bound
/// with a dynamic offset into the per-frame uniform arena.
pub const PRIMITIVE_SHADER: &str = r#"
struct Constants {
    mvp: mat4x4<f32>,
    color: vec4<f32>,
    use_vertex_color: u32,
};

struct PickingConstants {
    uuid_color: vec4<f32>,
};

struct DepthConstants {
    depth_offset: i32,
    near_plane: f32,
    far_plane: f32,
    padding: f32,
};

@group(0) @binding(0)
var<uniform> constants: Constants;

@group(0) @binding(1)
var<uniform> picking: PickingConstants;

@group(0) @binding(2)
var<uniform> depth: DepthConstants;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) color: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = constants.mvp * vec4<f32>(vertex.position, 1.0);
    out.color = select(constants.color, vertex.color, constants.use_vertex_color != 0u);
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    // Overlay tiers are drawn slightly brighter so they read above the scene.
    let lift = f32(max(depth.depth_offset, 0)) * 0.1;
    return vec4<f32>(min(in.color.rgb + vec3<f32>(lift), vec3<f32>(1.0)), in.color.a);
}

@fragment
fn fs_picking(in: VertexOutput) -> @location(0) vec4<f32> {
    return picking.uuid_color;
}
"#;

pub const VERTEX_ENTRY: &str = "vs_main";
pub const PIXEL_ENTRY: &str = "fs_main";
pub const PICKING_ENTRY: &str = "fs_picking";
