//! The tile mesh shared by every terrain node, and its GPU buffers.

use bytemuck::{Pod, Zeroable};
use terra_cdlod::NodeInstance;
use wgpu::util::DeviceExt;

/// A grid vertex in cell units, `0..=mesh_grid_size` on both axes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GridVertex {
    pub grid: [f32; 2],
}

impl GridVertex {
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<GridVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            }],
        }
    }
}

/// Per-instance layout matching [`NodeInstance`]: one `vec4` at location 1.
pub fn instance_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: size_of::<NodeInstance>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x4,
        }],
    }
}

/// `n x n` cells as a triangle list over `(n + 1)^2` vertices.
#[derive(Clone, Debug, PartialEq)]
pub struct GridMesh {
    pub cells: u32,
    pub vertices: Vec<GridVertex>,
    pub indices: Vec<u32>,
}

impl GridMesh {
    pub fn new(cells: u32) -> Self {
        let side = cells + 1;
        let mut vertices = Vec::with_capacity((side * side) as usize);
        for y in 0..side {
            for x in 0..side {
                vertices.push(GridVertex {
                    grid: [x as f32, y as f32],
                });
            }
        }

        let mut indices = Vec::with_capacity((cells * cells * 6) as usize);
        for y in 0..cells {
            for x in 0..cells {
                let i0 = y * side + x;
                let i1 = i0 + 1;
                let i2 = i0 + side;
                let i3 = i2 + 1;
                // Counter-clockwise seen from +Z.
                indices.extend_from_slice(&[i0, i1, i3, i0, i3, i2]);
            }
        }

        Self {
            cells,
            vertices,
            indices,
        }
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn upload(&self, device: &wgpu::Device) -> GpuGridMesh {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("terrain-grid-vertices"),
            contents: bytemuck::cast_slice(&self.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("terrain-grid-indices"),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        GpuGridMesh {
            vertex_buffer,
            index_buffer,
            index_count: self.index_count(),
        }
    }
}

/// A [`GridMesh`] resident on the GPU.
pub struct GpuGridMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl GpuGridMesh {
    /// Bind vertex slot 0 and the index buffer.
    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
    }
}
