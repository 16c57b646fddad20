//! Unit-sized primitive meshes, centered on the origin.
//!
//! Front faces wind counter-clockwise when seen from outside.

use crate::device::Topology;
use bytemuck::{Pod, Zeroable};
use std::f32::consts::{PI, TAU};
use vantage_common::PrimitiveShape;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

/// CPU-side geometry for one primitive shape.
#[derive(Debug, Clone)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub topology: Topology,
}

const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
const SEGMENTS: u32 = 24;
const RINGS: u32 = 16;
const RADIUS: f32 = 0.5;

/// Build the mesh for a shape.
pub fn mesh(shape: PrimitiveShape) -> MeshData {
    match shape {
        PrimitiveShape::Line => line_mesh(),
        PrimitiveShape::Triangle => triangle_mesh(),
        PrimitiveShape::Quad => quad_mesh(),
        PrimitiveShape::Cube => cube_mesh(),
        PrimitiveShape::Sphere => sphere_mesh(),
        PrimitiveShape::Cylinder => cylinder_mesh(),
        PrimitiveShape::Cone => cone_mesh(),
    }
}

fn v(position: [f32; 3], color: [f32; 4]) -> Vertex {
    Vertex { position, color }
}

fn line_mesh() -> MeshData {
    MeshData {
        vertices: vec![v([0.0, 0.0, 0.0], WHITE), v([1.0, 0.0, 0.0], WHITE)],
        indices: vec![0, 1],
        topology: Topology::LineList,
    }
}

fn triangle_mesh() -> MeshData {
    MeshData {
        vertices: vec![
            v([-0.5, -0.5, 0.0], [1.0, 0.0, 0.0, 1.0]),
            v([0.5, -0.5, 0.0], [0.0, 1.0, 0.0, 1.0]),
            v([0.0, 0.5, 0.0], [0.0, 0.0, 1.0, 1.0]),
        ],
        indices: vec![0, 1, 2],
        topology: Topology::TriangleList,
    }
}

fn quad_mesh() -> MeshData {
    MeshData {
        vertices: vec![
            v([-0.5, -0.5, 0.0], WHITE),
            v([0.5, -0.5, 0.0], WHITE),
            v([0.5, 0.5, 0.0], WHITE),
            v([-0.5, 0.5, 0.0], WHITE),
        ],
        indices: vec![0, 1, 2, 2, 3, 0],
        topology: Topology::TriangleList,
    }
}

fn cube_mesh() -> MeshData {
    let p = 0.5_f32;
    let faces: [([[f32; 3]; 4], [f32; 4]); 6] = [
        ([[-p, -p, p], [p, -p, p], [p, p, p], [-p, p, p]], [0.2, 0.2, 1.0, 1.0]),
        ([[p, -p, -p], [-p, -p, -p], [-p, p, -p], [p, p, -p]], [1.0, 1.0, 0.2, 1.0]),
        ([[p, -p, p], [p, -p, -p], [p, p, -p], [p, p, p]], [1.0, 0.2, 0.2, 1.0]),
        ([[-p, -p, -p], [-p, -p, p], [-p, p, p], [-p, p, -p]], [0.2, 1.0, 1.0, 1.0]),
        ([[-p, p, p], [p, p, p], [p, p, -p], [-p, p, -p]], [0.2, 1.0, 0.2, 1.0]),
        ([[-p, -p, -p], [p, -p, -p], [p, -p, p], [-p, -p, p]], [1.0, 0.2, 1.0, 1.0]),
    ];
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (corners, color) in faces {
        let base = vertices.len() as u32;
        vertices.extend(corners.iter().map(|c| v(*c, color)));
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
    MeshData {
        vertices,
        indices,
        topology: Topology::TriangleList,
    }
}

fn ring_point(phi: f32, y: f32, radius: f32) -> [f32; 3] {
    [radius * phi.cos(), y, radius * phi.sin()]
}

fn sphere_mesh() -> MeshData {
    let mut vertices = Vec::new();
    for ring in 0..=RINGS {
        let theta = PI * ring as f32 / RINGS as f32;
        for seg in 0..=SEGMENTS {
            let phi = TAU * seg as f32 / SEGMENTS as f32;
            let y = RADIUS * theta.cos();
            let r = RADIUS * theta.sin();
            let shade = 0.6 + 0.4 * (1.0 - ring as f32 / RINGS as f32);
            vertices.push(v(ring_point(phi, y, r), [shade, shade, shade, 1.0]));
        }
    }
    let stride = SEGMENTS + 1;
    let mut indices = Vec::new();
    for ring in 0..RINGS {
        for seg in 0..SEGMENTS {
            let a = ring * stride + seg;
            let b = a + stride;
            let c = a + 1;
            let d = b + 1;
            indices.extend_from_slice(&[a, c, b, c, d, b]);
        }
    }
    MeshData {
        vertices,
        indices,
        topology: Topology::TriangleList,
    }
}

fn cylinder_mesh() -> MeshData {
    let mut vertices = vec![v([0.0, 0.5, 0.0], WHITE), v([0.0, -0.5, 0.0], WHITE)];
    for seg in 0..SEGMENTS {
        let phi = TAU * seg as f32 / SEGMENTS as f32;
        vertices.push(v(ring_point(phi, 0.5, RADIUS), WHITE));
        vertices.push(v(ring_point(phi, -0.5, RADIUS), [0.7, 0.7, 0.7, 1.0]));
    }
    let mut indices = Vec::new();
    for seg in 0..SEGMENTS {
        let next = (seg + 1) % SEGMENTS;
        let top = 2 + seg * 2;
        let bottom = top + 1;
        let top_next = 2 + next * 2;
        let bottom_next = top_next + 1;
        indices.extend_from_slice(&[top, top_next, bottom, top_next, bottom_next, bottom]);
        indices.extend_from_slice(&[0, top_next, top]);
        indices.extend_from_slice(&[1, bottom, bottom_next]);
    }
    MeshData {
        vertices,
        indices,
        topology: Topology::TriangleList,
    }
}

fn cone_mesh() -> MeshData {
    let mut vertices = vec![v([0.0, 0.5, 0.0], WHITE), v([0.0, -0.5, 0.0], WHITE)];
    for seg in 0..SEGMENTS {
        let phi = TAU * seg as f32 / SEGMENTS as f32;
        vertices.push(v(ring_point(phi, -0.5, RADIUS), [0.7, 0.7, 0.7, 1.0]));
    }
    let mut indices = Vec::new();
    for seg in 0..SEGMENTS {
        let current = 2 + seg;
        let next = 2 + (seg + 1) % SEGMENTS;
        indices.extend_from_slice(&[0, next, current]);
        indices.extend_from_slice(&[1, current, next]);
    }
    MeshData {
        vertices,
        indices,
        topology: Topology::TriangleList,
    }
}
