//! wgpu backend for `terra-cdlod`: camera and frustum culling, the shared
//! tile mesh, per-variant terrain pipelines and a [`TerrainClient`] that
//! records the frame's draws into a render pass.
//!
//! [`TerrainClient`]: terra_cdlod::TerrainClient

pub mod camera;
pub mod client;
pub mod frustum;
pub mod instance_buffer;
pub mod mesh;
pub mod pipeline;
pub mod shader;

pub use camera::{CameraUniform, TerrainView, ViewCamera};
pub use client::{TerrainGpu, WgpuTerrainClient};
pub use frustum::Frustum;
pub use instance_buffer::{InstanceBuffer, MIN_INSTANCE_BUFFER_SIZE, grown_capacity};
pub use mesh::{GpuGridMesh, GridMesh, GridVertex, instance_layout};
pub use pipeline::{
    PipelineBuilder, PipelineRegistry, TerrainGlobals, TerrainPipelineBuilder, TerrainPipelines,
    globals_bind_group_layout,
};
pub use shader::{TERRAIN_SHADER_SOURCE, program_label, terrain_shader_source, variant_prelude};
