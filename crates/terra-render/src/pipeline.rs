//! Terrain program variants: a registry implementing [`ProgramFactory`] and
//! the wgpu pipeline builder behind it.

use std::collections::HashMap;
use std::num::NonZeroU64;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use log::{debug, info};
use static_assertions::const_assert_eq;
use terra_cdlod::{
    BASE_LAYER_PREFIX, BatchKey, DETAIL_LAYER_PREFIX, ProgramFactory, ProgramHandle,
    ProgramVariant, RenderError, TerrainLayer, TerrainUniforms,
};

use crate::camera::CameraUniform;
use crate::mesh::{GridVertex, instance_layout};
use crate::shader::{program_label, terrain_shader_source};

/// Uniform block bound at group 0, binding 0 of every terrain program.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TerrainGlobals {
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub cdlod: [f32; 4],
    /// Origin and size in meters.
    pub detail_layer: [f32; 4],
    pub base_layer: [f32; 4],
}

const_assert_eq!(size_of::<TerrainGlobals>(), 128);

impl TerrainGlobals {
    pub fn new(
        camera: &CameraUniform,
        uniforms: &TerrainUniforms,
        layers: &[TerrainLayer],
    ) -> Self {
        let placement = |prefix: &str| {
            layers
                .iter()
                .find(|layer| layer.uniform_prefix == prefix)
                .map(|layer| {
                    [
                        layer.origin_m.x as f32,
                        layer.origin_m.y as f32,
                        layer.size_m.x as f32,
                        layer.size_m.y as f32,
                    ]
                })
                .unwrap_or_default()
        };
        Self {
            view_proj: camera.view_proj,
            camera_pos: camera.camera_pos,
            cdlod: bytemuck::cast(*uniforms),
            detail_layer: placement(DETAIL_LAYER_PREFIX),
            base_layer: placement(BASE_LAYER_PREFIX),
        }
    }
}

/// Compiles one program variant into a backend pipeline.
pub trait PipelineBuilder<P> {
    fn build(&mut self, variant: &ProgramVariant) -> Result<P, RenderError>;
}

impl<P, F> PipelineBuilder<P> for F
where
    F: FnMut(&ProgramVariant) -> Result<P, RenderError>,
{
    fn build(&mut self, variant: &ProgramVariant) -> Result<P, RenderError> {
        self(variant)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct VariantKey {
    name: String,
    key: BatchKey,
    enable_base_map: bool,
}

impl VariantKey {
    fn of(variant: &ProgramVariant) -> Self {
        Self {
            name: variant.name.clone(),
            key: variant.key,
            enable_base_map: variant.enable_base_map,
        }
    }
}

/// Owns every built pipeline and hands out [`ProgramHandle`]s for them.
///
/// Requesting a variant that was already built returns the existing handle,
/// so rebuilding the render list does not recompile anything.
pub struct PipelineRegistry<P, B> {
    builder: B,
    pipelines: Vec<P>,
    handles: HashMap<VariantKey, ProgramHandle>,
}

impl<P, B: PipelineBuilder<P>> PipelineRegistry<P, B> {
    pub fn new(builder: B) -> Self {
        Self {
            builder,
            pipelines: Vec::new(),
            handles: HashMap::new(),
        }
    }

    pub fn get(&self, handle: ProgramHandle) -> Option<&P> {
        usize::try_from(handle.0)
            .ok()
            .and_then(|index| self.pipelines.get(index))
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }
}

impl<P, B: PipelineBuilder<P>> ProgramFactory for PipelineRegistry<P, B> {
    fn create_program(&mut self, variant: &ProgramVariant) -> Result<ProgramHandle, RenderError> {
        let key = VariantKey::of(variant);
        if let Some(&handle) = self.handles.get(&key) {
            return Ok(handle);
        }
        let pipeline = self.builder.build(variant)?;
        let handle = ProgramHandle(self.pipelines.len() as u64);
        self.pipelines.push(pipeline);
        self.handles.insert(key, handle);
        debug!("Built terrain program {}", program_label(variant));
        Ok(handle)
    }
}

/// Bind group layout for [`TerrainGlobals`].
pub fn globals_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("terrain-globals-bind-group-layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: NonZeroU64::new(size_of::<TerrainGlobals>() as u64),
            },
            count: None,
        }],
    })
}

/// Builds one wgpu render pipeline per terrain program variant.
///
/// Shader compile errors are reported through the device's uncaptured error
/// handler rather than as a [`RenderError`].
pub struct TerrainPipelineBuilder {
    device: Arc<wgpu::Device>,
    layout: wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    depth_format: Option<wgpu::TextureFormat>,
}

impl TerrainPipelineBuilder {
    pub fn new(
        device: Arc<wgpu::Device>,
        globals_layout: &wgpu::BindGroupLayout,
        color_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Self {
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("terrain-pipeline-layout"),
            bind_group_layouts: &[globals_layout],
            immediate_size: 0,
        });
        info!(
            "Terrain pipelines target {:?} with depth {:?}",
            color_format, depth_format
        );
        Self {
            device,
            layout,
            color_format,
            depth_format,
        }
    }
}

impl PipelineBuilder<wgpu::RenderPipeline> for TerrainPipelineBuilder {
    fn build(&mut self, variant: &ProgramVariant) -> Result<wgpu::RenderPipeline, RenderError> {
        let label = program_label(variant);
        let source = terrain_shader_source(variant);
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

        let depth_stencil = self.depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::GreaterEqual, // reverse-Z
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&label),
                layout: Some(&self.layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: Some("vs_main"),
                    buffers: &[GridVertex::layout(), instance_layout()],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: Some(wgpu::Face::Back),
                    unclipped_depth: false,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    conservative: false,
                },
                depth_stencil,
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.color_format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                multiview_mask: None,
                cache: None,
            });
        Ok(pipeline)
    }
}

/// Registry of wgpu terrain pipelines.
pub type TerrainPipelines = PipelineRegistry<wgpu::RenderPipeline, TerrainPipelineBuilder>;
