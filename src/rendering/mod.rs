use bytemuck::{Pod, Zeroable};
use wgpu::util::{BufferInitDescriptor, DeviceExt};

use crate::util::Color;

pub const BACKGROUND_COLOR: Color = Color::rgb(10, 10, 36);

/// One corner of the unit cell quad.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

// Two triangles covering a quad, inset so neighboring cells leave a gap.
const QUAD_VERTICES: [Vertex; 6] = [
    Vertex { position: [-0.8, -0.8] },
    Vertex { position: [0.8, -0.8] },
    Vertex { position: [0.8, 0.8] },
    Vertex { position: [-0.8, -0.8] },
    Vertex { position: [0.8, 0.8] },
    Vertex { position: [-0.8, 0.8] },
];

/// The shared instance shape: a single static vertex buffer holding the
/// unit quad, repeated per cell by instanced drawing.
pub struct QuadGeometry {
    pub buffer: wgpu::Buffer,
}

impl QuadGeometry {
    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("cell quad vertices"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Self { buffer }
    }

    pub fn vertex_count(&self) -> u32 {
        QUAD_VERTICES.len() as u32
    }
}
