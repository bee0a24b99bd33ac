//! wgpu implementation of [`TerrainClient`].

use terra_cdlod::{DrawCommand, RenderError, TerrainClient, TerrainLayer, TerrainUniforms};
use wgpu::util::DeviceExt;

use crate::camera::CameraUniform;
use crate::instance_buffer::InstanceBuffer;
use crate::mesh::{GpuGridMesh, GridMesh};
use crate::pipeline::{TerrainGlobals, TerrainPipelines, globals_bind_group_layout};

/// GPU resources shared by every terrain draw: the tile mesh, the instance
/// stream and the globals uniform.
pub struct TerrainGpu {
    pub globals_layout: wgpu::BindGroupLayout,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    pub mesh: GpuGridMesh,
    pub instances: InstanceBuffer,
}

impl TerrainGpu {
    pub fn new(device: &wgpu::Device, mesh_grid_size: u32) -> Self {
        let globals_layout = globals_bind_group_layout(device);
        let globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("terrain-globals"),
            contents: bytemuck::bytes_of(&TerrainGlobals::default()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("terrain-globals-bind-group"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });
        Self {
            globals_layout,
            globals_buffer,
            globals_bind_group,
            mesh: GridMesh::new(mesh_grid_size).upload(device),
            instances: InstanceBuffer::new(device),
        }
    }
}

/// Records terrain draws into an open render pass for one frame.
pub struct WgpuTerrainClient<'a, 'pass> {
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    gpu: &'a mut TerrainGpu,
    pipelines: &'a TerrainPipelines,
    camera: CameraUniform,
    pass: &'a mut wgpu::RenderPass<'pass>,
}

impl<'a, 'pass> WgpuTerrainClient<'a, 'pass> {
    pub fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        gpu: &'a mut TerrainGpu,
        pipelines: &'a TerrainPipelines,
        camera: CameraUniform,
        pass: &'a mut wgpu::RenderPass<'pass>,
    ) -> Self {
        Self {
            device,
            queue,
            gpu,
            pipelines,
            camera,
            pass,
        }
    }
}

impl TerrainClient for WgpuTerrainClient<'_, '_> {
    fn bind_layers(&mut self, layers: &[TerrainLayer], uniforms: &TerrainUniforms) {
        let globals = TerrainGlobals::new(&self.camera, uniforms, layers);
        self.queue
            .write_buffer(&self.gpu.globals_buffer, 0, bytemuck::bytes_of(&globals));
        self.pass.set_bind_group(0, &self.gpu.globals_bind_group, &[]);
        self.gpu.mesh.bind(self.pass);
    }

    fn upload_instances(&mut self, bytes: &[u8]) {
        self.gpu.instances.write(self.device, self.queue, bytes);
    }

    fn draw_batch(&mut self, command: &DrawCommand) -> Result<(), RenderError> {
        let pipeline = self
            .pipelines
            .get(command.program)
            .ok_or(RenderError::UnknownProgram(command.program.0))?;
        if command.byte_offset >= self.gpu.instances.len() {
            return Err(RenderError::Draw(format!(
                "instance offset {} outside uploaded {} bytes",
                command.byte_offset,
                self.gpu.instances.len()
            )));
        }
        self.pass.set_pipeline(pipeline);
        self.pass
            .set_vertex_buffer(1, self.gpu.instances.slice_from(command.byte_offset));
        self.pass
            .draw_indexed(0..self.gpu.mesh.index_count, 0, 0..command.instance_count);
        Ok(())
    }
}
