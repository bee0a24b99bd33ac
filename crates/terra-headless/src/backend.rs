//! CPU stand-ins for the GPU backend: programs are their generated WGSL and
//! draws are only counted.

use std::collections::BTreeMap;

use terra_cdlod::{
    DrawCommand, MaterialMask, ProgramVariant, RenderError, TerrainClient, TerrainLayer,
    TerrainUniforms,
};
use terra_render::{PipelineRegistry, terrain_shader_source};
use tracing::trace;

type CompileFn = fn(&ProgramVariant) -> Result<String, RenderError>;

/// Program registry whose "pipelines" are WGSL sources.
pub type SourceRegistry = PipelineRegistry<String, CompileFn>;

fn compile(variant: &ProgramVariant) -> Result<String, RenderError> {
    Ok(terrain_shader_source(variant))
}

pub fn source_registry() -> SourceRegistry {
    PipelineRegistry::new(compile as CompileFn)
}

/// Counts what a frame would submit to the GPU.
#[derive(Debug, Default)]
pub struct CountingClient {
    pub layers_bound: usize,
    pub texture_maps: usize,
    pub uploaded_bytes: usize,
    pub draws: usize,
    pub instances_by_material: BTreeMap<u32, u32>,
}

impl CountingClient {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn instances_of(&self, material: MaterialMask) -> u32 {
        self.instances_by_material
            .get(&material.bits())
            .copied()
            .unwrap_or(0)
    }
}

impl TerrainClient for CountingClient {
    fn bind_layers(&mut self, layers: &[TerrainLayer], uniforms: &TerrainUniforms) {
        self.layers_bound = layers.len();
        self.texture_maps = layers.iter().map(|l| l.texture_maps.len()).sum();
        trace!(
            leaf_node_size_m = uniforms.leaf_node_size_m,
            layers = layers.len(),
            "Bound terrain layers"
        );
    }

    fn upload_instances(&mut self, bytes: &[u8]) {
        self.uploaded_bytes += bytes.len();
    }

    fn draw_batch(&mut self, command: &DrawCommand) -> Result<(), RenderError> {
        self.draws += 1;
        *self
            .instances_by_material
            .entry(command.key.material.bits())
            .or_default() += command.instance_count;
        Ok(())
    }
}
