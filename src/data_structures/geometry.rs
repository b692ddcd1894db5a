//! Static geometry of the primitive renderables and the GPU buffers holding it.

use std::ops::Range;

use wgpu::util::DeviceExt;

use crate::{
    data_structures::vertex::{CubeVertex, GridVertex, PlaneVertex},
    render::PassEncoder,
};

const fn cv(position: [f32; 3], normal: [f32; 3]) -> CubeVertex {
    CubeVertex { position, normal }
}

/// Four vertices per face so every face gets its own normal.
#[rustfmt::skip]
pub const CUBE_VERTICES: [CubeVertex; 24] = [
    // front
    cv([-1.0, -1.0, 1.0], [0.0, 0.0, 1.0]), cv([1.0, -1.0, 1.0], [0.0, 0.0, 1.0]),
    cv([1.0, 1.0, 1.0], [0.0, 0.0, 1.0]), cv([-1.0, 1.0, 1.0], [0.0, 0.0, 1.0]),
    // back
    cv([-1.0, -1.0, -1.0], [0.0, 0.0, -1.0]), cv([-1.0, 1.0, -1.0], [0.0, 0.0, -1.0]),
    cv([1.0, 1.0, -1.0], [0.0, 0.0, -1.0]), cv([1.0, -1.0, -1.0], [0.0, 0.0, -1.0]),
    // top
    cv([-1.0, 1.0, -1.0], [0.0, 1.0, 0.0]), cv([-1.0, 1.0, 1.0], [0.0, 1.0, 0.0]),
    cv([1.0, 1.0, 1.0], [0.0, 1.0, 0.0]), cv([1.0, 1.0, -1.0], [0.0, 1.0, 0.0]),
    // bottom
    cv([-1.0, -1.0, -1.0], [0.0, -1.0, 0.0]), cv([1.0, -1.0, -1.0], [0.0, -1.0, 0.0]),
    cv([1.0, -1.0, 1.0], [0.0, -1.0, 0.0]), cv([-1.0, -1.0, 1.0], [0.0, -1.0, 0.0]),
    // right
    cv([1.0, -1.0, -1.0], [1.0, 0.0, 0.0]), cv([1.0, 1.0, -1.0], [1.0, 0.0, 0.0]),
    cv([1.0, 1.0, 1.0], [1.0, 0.0, 0.0]), cv([1.0, -1.0, 1.0], [1.0, 0.0, 0.0]),
    // left
    cv([-1.0, -1.0, -1.0], [-1.0, 0.0, 0.0]), cv([-1.0, -1.0, 1.0], [-1.0, 0.0, 0.0]),
    cv([-1.0, 1.0, 1.0], [-1.0, 0.0, 0.0]), cv([-1.0, 1.0, -1.0], [-1.0, 0.0, 0.0]),
];

#[rustfmt::skip]
pub const CUBE_INDICES: [u16; 36] = [
    0, 1, 2, 2, 3, 0,
    4, 5, 6, 6, 7, 4,
    8, 9, 10, 10, 11, 8,
    12, 13, 14, 14, 15, 12,
    16, 17, 18, 18, 19, 16,
    20, 21, 22, 22, 23, 20,
];

pub const PLANE_VERTICES: [PlaneVertex; 4] = [
    PlaneVertex {
        position: [-1.0, -1.0, 0.0],
        normal: [0.0, 0.0, 1.0],
        tex_coords: [0.0, 0.0],
    },
    PlaneVertex {
        position: [1.0, -1.0, 0.0],
        normal: [0.0, 0.0, 1.0],
        tex_coords: [1.0, 0.0],
    },
    PlaneVertex {
        position: [-1.0, 1.0, 0.0],
        normal: [0.0, 0.0, 1.0],
        tex_coords: [0.0, 1.0],
    },
    PlaneVertex {
        position: [1.0, 1.0, 0.0],
        normal: [0.0, 0.0, 1.0],
        tex_coords: [1.0, 1.0],
    },
];

pub const PLANE_INDICES: [u16; 6] = [0, 1, 2, 2, 1, 3];

/// Two triangles covering -1..1, drawn once per grid cell.
pub const GRID_VERTICES: [GridVertex; 6] = [
    GridVertex { position: [-1.0, -1.0] },
    GridVertex { position: [1.0, -1.0] },
    GridVertex { position: [1.0, 1.0] },
    GridVertex { position: [-1.0, -1.0] },
    GridVertex { position: [1.0, 1.0] },
    GridVertex { position: [-1.0, 1.0] },
];

/// A vertex buffer, an optional index buffer and how many elements to draw.
#[derive(Debug)]
pub struct Geometry {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: Option<(wgpu::Buffer, wgpu::IndexFormat)>,
    pub element_count: u32,
}

impl Geometry {
    pub fn non_indexed<V: bytemuck::Pod>(device: &wgpu::Device, label: &str, vertices: &[V]) -> Self {
        Self {
            vertex_buffer: vertex_buffer(device, label, vertices),
            index_buffer: None,
            element_count: vertices.len() as u32,
        }
    }

    pub fn indexed<V: bytemuck::Pod>(
        device: &wgpu::Device,
        label: &str,
        vertices: &[V],
        indices: &[u16],
    ) -> Self {
        Self::with_indices(device, label, vertices, indices, wgpu::IndexFormat::Uint16)
    }

    pub fn indexed_u32<V: bytemuck::Pod>(
        device: &wgpu::Device,
        label: &str,
        vertices: &[V],
        indices: &[u32],
    ) -> Self {
        Self::with_indices(device, label, vertices, indices, wgpu::IndexFormat::Uint32)
    }

    fn with_indices<V: bytemuck::Pod, I: bytemuck::Pod>(
        device: &wgpu::Device,
        label: &str,
        vertices: &[V],
        indices: &[I],
        format: wgpu::IndexFormat,
    ) -> Self {
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Index Buffer")),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            vertex_buffer: vertex_buffer(device, label, vertices),
            index_buffer: Some((index_buffer, format)),
            element_count: indices.len() as u32,
        }
    }

    /// Bind the buffers to slot 0 and draw every element `instances` times.
    pub fn draw(&self, pass: &mut dyn PassEncoder, instances: Range<u32>) {
        pass.set_vertex_buffer(0, &self.vertex_buffer);
        match &self.index_buffer {
            Some((buffer, format)) => {
                pass.set_index_buffer(buffer, *format);
                pass.draw_indexed(0..self.element_count, instances);
            }
            None => pass.draw(0..self.element_count, instances),
        }
    }

    pub fn destroy(&self) {
        self.vertex_buffer.destroy();
        if let Some((buffer, _)) = &self.index_buffer {
            buffer.destroy();
        }
    }
}

fn vertex_buffer<V: bytemuck::Pod>(device: &wgpu::Device, label: &str, vertices: &[V]) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{label} Vertex Buffer")),
        contents: bytemuck::cast_slice(vertices),
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
    })
}
