//! The terrain facade: build once, then `update` and `draw` every frame.

use bytemuck::{Pod, Zeroable};
use glam::DVec2;
use terra_config::Config;
use tracing::{debug, info, trace, warn};

use crate::batch::{BatchKey, NodeInstance, ProgramFactory, ProgramHandle, RenderList};
use crate::camera::TerrainCamera;
use crate::detail::DetailLevelTable;
use crate::elevation::ElevationSource;
use crate::error::{RenderError, TerrainError};
use crate::layers::{LayerSource, TerrainLayer, TextureUnitAllocator, build_layers};
use crate::material_map::MaterialMap;
use crate::params::LodParams;
use crate::quadtree::Quadtree;
use crate::selector::{LodSelector, SelectionStats};

/// Inputs for [`TerrainRenderer::build`].
pub struct BuildParameters<'a> {
    pub lod: LodParams,
    pub detail_levels: DetailLevelTable,
    /// Root minimum corner. `None` centres the tree on the world origin.
    pub origin: Option<DVec2>,
    pub elevation: &'a dyn ElevationSource,
    pub materials: &'a MaterialMap,
    /// Coarse height map covering a wider area than the detail layer.
    pub base_layer: Option<LayerSource>,
    pub max_texture_units: u32,
}

impl<'a> BuildParameters<'a> {
    pub fn new(elevation: &'a dyn ElevationSource, materials: &'a MaterialMap) -> Self {
        Self {
            lod: LodParams::default(),
            detail_levels: DetailLevelTable::default(),
            origin: None,
            elevation,
            materials,
            base_layer: None,
            max_texture_units: 16,
        }
    }

    /// Take the terrain constants from `config`.
    pub fn from_config(
        config: &Config,
        elevation: &'a dyn ElevationSource,
        materials: &'a MaterialMap,
    ) -> Result<Self, TerrainError> {
        Ok(Self {
            lod: LodParams::from_config(&config.terrain)?,
            detail_levels: DetailLevelTable::from_config(&config.terrain)?,
            max_texture_units: config.terrain.max_texture_units,
            ..Self::new(elevation, materials)
        })
    }

    pub fn with_lod(mut self, lod: LodParams) -> Self {
        self.lod = lod;
        self
    }

    pub fn with_detail_levels(mut self, detail_levels: DetailLevelTable) -> Self {
        self.detail_levels = detail_levels;
        self
    }

    pub fn with_origin(mut self, origin: DVec2) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_base_layer(mut self, base_layer: LayerSource) -> Self {
        self.base_layer = Some(base_layer);
        self
    }

    pub fn with_max_texture_units(mut self, max_texture_units: u32) -> Self {
        self.max_texture_units = max_texture_units;
        self
    }
}

/// Per-draw constants shared by every terrain program.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TerrainUniforms {
    pub cdlod_min_dist: f32,
    pub mesh_resolution_m: f32,
    pub leaf_node_size_m: f32,
    pub mesh_grid_size: f32,
}

impl TerrainUniforms {
    pub fn new(params: &LodParams) -> Self {
        Self {
            cdlod_min_dist: params.base_lod_distance,
            mesh_resolution_m: params.meters_per_grid as f32,
            leaf_node_size_m: params.leaf_size() as f32,
            mesh_grid_size: params.mesh_grid_size as f32,
        }
    }
}

/// One instanced draw of the shared tile mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawCommand {
    pub program: ProgramHandle,
    pub key: BatchKey,
    /// First instance in the uploaded buffer.
    pub first_instance: u32,
    pub instance_count: u32,
    /// `first_instance * size_of::<NodeInstance>()`.
    pub byte_offset: u64,
}

/// Receives the draw work of a frame. Implemented by the render backend.
pub trait TerrainClient {
    /// Bind the layer textures and set the per-draw uniforms.
    fn bind_layers(&mut self, layers: &[TerrainLayer], uniforms: &TerrainUniforms);

    /// Replace the instance buffer contents for this frame.
    fn upload_instances(&mut self, bytes: &[u8]);

    fn draw_batch(&mut self, command: &DrawCommand) -> Result<(), RenderError>;
}

/// What `update` did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub selection: SelectionStats,
    pub batches: usize,
    pub instances: usize,
}

/// What `draw` did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub batches_drawn: usize,
    pub batches_failed: usize,
    pub instances: usize,
}

/// Level-of-detail terrain renderer.
pub trait TerrainRenderer {
    /// Build the terrain, replacing any previous one. On error the terrain is
    /// left unbuilt and draws nothing.
    fn build(
        &mut self,
        params: &BuildParameters<'_>,
        factory: &mut dyn ProgramFactory,
    ) -> Result<(), TerrainError>;

    /// Select the nodes to draw for `camera` and pack their instance data.
    fn update(
        &mut self,
        camera: &dyn TerrainCamera,
        low_detail: bool,
        factory: &mut dyn ProgramFactory,
    ) -> FrameStats;

    /// Issue the draws prepared by the last `update`.
    fn draw(&mut self, client: &mut dyn TerrainClient) -> DrawStats;

    /// Nodes farther than `distance` are not drawn. `None`, zero or negative disables the limit.
    fn set_draw_distance(&mut self, distance: Option<f32>);

    fn set_base_map_origin(&mut self, origin: DVec2);

    /// Base name of the programs requested from the factory. Changing it drops
    /// the existing programs.
    fn set_program_name(&mut self, name: &str);

    fn is_built(&self) -> bool;
}

/// [`TerrainRenderer`] backed by a CDLOD quadtree.
#[derive(Debug)]
pub struct CdlodTerrain {
    tree: Option<Quadtree>,
    params: LodParams,
    detail_levels: DetailLevelTable,
    render_list: RenderList,
    instances: Vec<NodeInstance>,
    layers: Vec<TerrainLayer>,
    uniforms: TerrainUniforms,
    draw_distance: Option<f32>,
    program_name: String,
    base_map_origin: DVec2,
    has_base_layer: bool,
}

impl Default for CdlodTerrain {
    fn default() -> Self {
        Self::new()
    }
}

impl CdlodTerrain {
    pub fn new() -> Self {
        let detail_levels = DetailLevelTable::default();
        let program_name = "terrain".to_string();
        Self {
            tree: None,
            params: LodParams::default(),
            render_list: RenderList::new(program_name.clone(), &detail_levels, false),
            detail_levels,
            instances: Vec::new(),
            layers: Vec::new(),
            uniforms: TerrainUniforms::default(),
            draw_distance: None,
            program_name,
            base_map_origin: DVec2::ZERO,
            has_base_layer: false,
        }
    }

    /// Apply the per-frame settings from `config`.
    pub fn configure(&mut self, config: &Config) {
        self.set_draw_distance(Some(config.render.draw_distance_m));
        self.set_program_name(&config.render.program_name);
    }

    pub fn quadtree(&self) -> Option<&Quadtree> {
        self.tree.as_ref()
    }

    pub fn render_list(&self) -> &RenderList {
        &self.render_list
    }

    /// Instance data packed by the last `update`.
    pub fn instances(&self) -> &[NodeInstance] {
        &self.instances
    }

    pub fn layers(&self) -> &[TerrainLayer] {
        &self.layers
    }

    pub fn uniforms(&self) -> &TerrainUniforms {
        &self.uniforms
    }

    pub fn params(&self) -> &LodParams {
        &self.params
    }

    pub fn detail_levels(&self) -> &DetailLevelTable {
        &self.detail_levels
    }

    pub fn draw_distance(&self) -> Option<f32> {
        self.draw_distance
    }

    fn clear(&mut self) {
        self.render_list
            .reset(self.program_name.clone(), &self.detail_levels, false);
        self.instances.clear();
        self.layers.clear();
        self.has_base_layer = false;
    }

    fn try_build(
        &mut self,
        params: &BuildParameters<'_>,
        factory: &mut dyn ProgramFactory,
    ) -> Result<(), TerrainError> {
        let lod = params.lod;
        lod.validate()?;
        let origin = params.origin.unwrap_or_else(|| lod.centered_origin());

        let mut units = TextureUnitAllocator::new(params.max_texture_units);
        let elevation_size = params.elevation.size();
        let detail_source = LayerSource::new(elevation_size, lod.meters_per_grid as f64);
        let layers = build_layers(
            detail_source,
            params.base_layer,
            self.base_map_origin,
            &mut units,
        )?;

        let tree = match self.tree.take() {
            Some(mut tree) => {
                tree.rebuild(&lod, origin, params.elevation, params.materials)?;
                tree
            }
            None => Quadtree::build(&lod, origin, params.elevation, params.materials)?,
        };

        self.params = lod;
        self.detail_levels = params.detail_levels.clone();
        self.uniforms = TerrainUniforms::new(&lod);
        self.layers = layers;
        self.has_base_layer = params.base_layer.is_some();
        self.render_list.reset(
            self.program_name.clone(),
            &self.detail_levels,
            self.has_base_layer,
        );
        self.instances = Vec::with_capacity(lod.leaf_count().min(1 << 16));

        for &material in tree.materials() {
            for detail_level in 0..self.detail_levels.len() {
                self.render_list
                    .ensure_batch(BatchKey::new(material, detail_level), factory);
            }
        }

        info!(
            nodes = tree.node_count(),
            leaves = tree.leaf_count(),
            materials = tree.materials().len(),
            programs = self.render_list.batch_count(),
            failed_programs = self.render_list.failed_programs().len(),
            texture_units = units.used(),
            "terrain built"
        );
        self.tree = Some(tree);
        Ok(())
    }
}

impl TerrainRenderer for CdlodTerrain {
    fn build(
        &mut self,
        params: &BuildParameters<'_>,
        factory: &mut dyn ProgramFactory,
    ) -> Result<(), TerrainError> {
        debug!(
            max_level = params.lod.max_level,
            elevation = ?params.elevation.size(),
            "building terrain"
        );
        self.clear();
        let result = self.try_build(params, factory);
        if result.is_err() {
            self.tree = None;
            self.clear();
        }
        result
    }

    fn update(
        &mut self,
        camera: &dyn TerrainCamera,
        low_detail: bool,
        factory: &mut dyn ProgramFactory,
    ) -> FrameStats {
        let Some(tree) = &self.tree else {
            return FrameStats::default();
        };

        self.render_list.clear();
        let selector = LodSelector::new(self.draw_distance, low_detail);
        let selection = selector.select(
            tree,
            &self.detail_levels,
            camera,
            &mut self.render_list,
            factory,
        );
        let instances = self
            .render_list
            .pack_instances(&self.params, &mut self.instances);

        let stats = FrameStats {
            selection,
            batches: self.render_list.active_batches().count(),
            instances,
        };
        trace!(?stats, "terrain update");
        stats
    }

    fn draw(&mut self, client: &mut dyn TerrainClient) -> DrawStats {
        if self.tree.is_none() || self.render_list.is_empty() {
            return DrawStats::default();
        }

        client.bind_layers(&self.layers, &self.uniforms);
        client.upload_instances(bytemuck::cast_slice(&self.instances));

        let mut stats = DrawStats::default();
        for batch in self.render_list.active_batches() {
            let command = DrawCommand {
                program: batch.program(),
                key: batch.key(),
                first_instance: batch.instance_offset() as u32,
                instance_count: batch.len() as u32,
                byte_offset: batch.byte_offset() as u64,
            };
            match client.draw_batch(&command) {
                Ok(()) => {
                    stats.batches_drawn += 1;
                    stats.instances += batch.len();
                }
                Err(err) => {
                    warn!(
                        material = ?command.key.material,
                        detail_level = command.key.detail_level,
                        "skipping terrain batch: {err}"
                    );
                    stats.batches_failed += 1;
                }
            }
        }
        stats
    }

    fn set_draw_distance(&mut self, distance: Option<f32>) {
        self.draw_distance = distance.filter(|d| d.is_finite() && *d > 0.0);
    }

    fn set_base_map_origin(&mut self, origin: DVec2) {
        self.base_map_origin = origin;
        if self.has_base_layer
            && let Some(base) = self.layers.get_mut(1)
        {
            base.origin_m = origin;
        }
    }

    fn set_program_name(&mut self, name: &str) {
        if name == self.program_name {
            return;
        }
        debug!(name, "terrain program name changed");
        self.program_name = name.to_string();
        self.render_list.reset(
            self.program_name.clone(),
            &self.detail_levels,
            self.has_base_layer,
        );
        self.instances.clear();
    }

    fn is_built(&self) -> bool {
        self.tree.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::OmniCamera;
    use crate::elevation::HeightField;
    use crate::material::MaterialMask;
    use crate::material_map::{MaterialLayer, MaterialRaster};
    use glam::{UVec2, Vec3};

    #[derive(Default)]
    struct Factory {
        created: usize,
    }

    impl ProgramFactory for Factory {
        fn create_program(
            &mut self,
            _variant: &crate::batch::ProgramVariant,
        ) -> Result<ProgramHandle, RenderError> {
            self.created += 1;
            Ok(ProgramHandle(self.created as u64))
        }
    }

    #[derive(Default)]
    struct Client {
        bound: usize,
        uploaded: Vec<u8>,
        draws: Vec<DrawCommand>,
    }

    impl TerrainClient for Client {
        fn bind_layers(&mut self, _layers: &[TerrainLayer], _uniforms: &TerrainUniforms) {
            self.bound += 1;
        }

        fn upload_instances(&mut self, bytes: &[u8]) {
            self.uploaded = bytes.to_vec();
        }

        fn draw_batch(&mut self, command: &DrawCommand) -> Result<(), RenderError> {
            self.draws.push(*command);
            Ok(())
        }
    }

    fn lod() -> LodParams {
        LodParams {
            max_level: 2,
            mesh_grid_size: 4,
            meters_per_grid: 100,
            base_lod_distance: 500.0,
        }
    }

    fn land() -> MaterialMap {
        let raster = MaterialRaster::filled(16, 16, MaterialMask::LAND).unwrap();
        MaterialMap::new(MaterialLayer::new(raster, DVec2::ZERO, 100.0).unwrap())
    }

    #[test]
    fn test_unbuilt_terrain_is_inert() {
        let mut terrain = CdlodTerrain::new();
        let camera = OmniCamera::new(Vec3::ZERO);
        assert!(!terrain.is_built());
        assert_eq!(
            terrain.update(&camera, false, &mut Factory::default()),
            FrameStats::default()
        );
        let mut client = Client::default();
        assert_eq!(terrain.draw(&mut client), DrawStats::default());
        assert_eq!(client.bound, 0);
    }

    #[test]
    fn test_build_precreates_programs() {
        let field = HeightField::flat(16, 16, 0.0).unwrap();
        let materials = land();
        let params = BuildParameters::new(&field, &materials)
            .with_lod(lod())
            .with_origin(DVec2::ZERO);
        let mut terrain = CdlodTerrain::new();
        let mut factory = Factory::default();
        terrain.build(&params, &mut factory).unwrap();

        assert!(terrain.is_built());
        assert_eq!(factory.created, DetailLevelTable::default().len());
        assert_eq!(terrain.layers().len(), 1);
        assert_eq!(terrain.uniforms().leaf_node_size_m, 400.0);
        assert_eq!(
            terrain.layers()[0].size_m,
            UVec2::splat(16).as_dvec2() * 100.0
        );
    }

    #[test]
    fn test_update_then_draw() {
        let field = HeightField::flat(16, 16, 0.0).unwrap();
        let materials = land();
        let params = BuildParameters::new(&field, &materials)
            .with_lod(lod())
            .with_origin(DVec2::ZERO);
        let mut terrain = CdlodTerrain::new();
        let mut factory = Factory::default();
        terrain.build(&params, &mut factory).unwrap();

        let camera = OmniCamera::new(Vec3::new(100.0, 100.0, 10.0));
        let stats = terrain.update(&camera, false, &mut factory);
        assert!(stats.instances > 1);
        assert_eq!(stats.instances, stats.selection.selected);

        let mut client = Client::default();
        let drawn = terrain.draw(&mut client);
        assert_eq!(client.bound, 1);
        assert_eq!(client.uploaded.len(), stats.instances * 16);
        assert_eq!(drawn.batches_drawn, stats.batches);
        assert_eq!(drawn.instances, stats.instances);
        let total: u32 = client.draws.iter().map(|d| d.instance_count).sum();
        assert_eq!(total as usize, stats.instances);
    }

    #[test]
    fn test_failed_build_leaves_terrain_unbuilt() {
        let good = HeightField::flat(16, 16, 0.0).unwrap();
        let bad = HeightField::flat(12, 16, 0.0).unwrap();
        let materials = land();
        let mut terrain = CdlodTerrain::new();
        let mut factory = Factory::default();
        terrain
            .build(
                &BuildParameters::new(&good, &materials).with_lod(lod()),
                &mut factory,
            )
            .unwrap();

        let result = terrain.build(
            &BuildParameters::new(&bad, &materials).with_lod(lod()),
            &mut factory,
        );
        assert!(matches!(result, Err(TerrainError::NotPowerOfTwo { .. })));
        assert!(!terrain.is_built());
        assert!(terrain.layers().is_empty());
    }

    #[test]
    fn test_texture_unit_limit() {
        let field = HeightField::flat(16, 16, 0.0).unwrap();
        let materials = land();
        let params = BuildParameters::new(&field, &materials)
            .with_lod(lod())
            .with_base_layer(LayerSource::new(UVec2::splat(8), 800.0))
            .with_max_texture_units(3);
        let mut terrain = CdlodTerrain::new();
        let result = terrain.build(&params, &mut Factory::default());
        assert!(matches!(result, Err(TerrainError::TooManyTextureUnits { .. })));
        assert!(!terrain.is_built());
    }

    #[test]
    fn test_base_map_origin_follows_setter() {
        let field = HeightField::flat(16, 16, 0.0).unwrap();
        let materials = land();
        let params = BuildParameters::new(&field, &materials)
            .with_lod(lod())
            .with_base_layer(LayerSource::new(UVec2::splat(8), 800.0));
        let mut terrain = CdlodTerrain::new();
        terrain.set_base_map_origin(DVec2::splat(-800.0));
        terrain.build(&params, &mut Factory::default()).unwrap();
        assert_eq!(terrain.layers()[1].origin_m, DVec2::splat(-800.0));

        terrain.set_base_map_origin(DVec2::splat(1_600.0));
        assert_eq!(terrain.layers()[1].origin_m, DVec2::splat(1_600.0));
        assert_eq!(terrain.layers()[0].origin_m, DVec2::ZERO);
    }

    #[test]
    fn test_draw_distance_setter_normalizes() {
        let mut terrain = CdlodTerrain::new();
        terrain.set_draw_distance(Some(0.0));
        assert_eq!(terrain.draw_distance(), None);
        terrain.set_draw_distance(Some(5_000.0));
        assert_eq!(terrain.draw_distance(), Some(5_000.0));
        terrain.set_draw_distance(None);
        assert_eq!(terrain.draw_distance(), None);
    }

    #[test]
    fn test_program_name_change_recreates_programs() {
        let field = HeightField::flat(16, 16, 0.0).unwrap();
        let materials = land();
        let params = BuildParameters::new(&field, &materials)
            .with_lod(lod())
            .with_origin(DVec2::ZERO);
        let mut terrain = CdlodTerrain::new();
        let mut factory = Factory::default();
        terrain.build(&params, &mut factory).unwrap();
        let before = factory.created;

        terrain.set_program_name("ground");
        assert_eq!(terrain.render_list().batch_count(), 0);
        assert_eq!(terrain.render_list().program_name(), "ground");

        let camera = OmniCamera::new(Vec3::new(100.0, 100.0, 10.0));
        terrain.update(&camera, false, &mut factory);
        assert!(factory.created > before);
    }
}
