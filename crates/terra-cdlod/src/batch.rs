//! Render batching: selected nodes grouped by (material, detail level) into
//! instanced draws that share one program.
//!
//! Batches and their programs are created lazily the first time a key is seen
//! and live as long as the [`RenderList`]. Each frame only clears their
//! instance lists, so steady-state frames allocate nothing.

use std::mem::size_of;

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use rustc_hash::FxHashMap;
use static_assertions::const_assert_eq;
use tracing::{debug, error};

use crate::detail::DetailLevelTable;
use crate::error::RenderError;
use crate::material::{DetailFeatures, MaterialMask};
use crate::params::LodParams;
use crate::quadtree::Node;

/// Identifies one batch and the program variant it draws with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchKey {
    pub material: MaterialMask,
    pub detail_level: usize,
}

impl BatchKey {
    pub fn new(material: MaterialMask, detail_level: usize) -> Self {
        Self {
            material,
            detail_level,
        }
    }
}

/// Opaque handle issued by a [`ProgramFactory`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u64);

/// Everything a program factory needs to build the shader variant for a batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgramVariant {
    /// Program name, `<base>_cdlod`.
    pub name: String,
    pub key: BatchKey,
    /// Features enabled by the key's detail level.
    pub features: DetailFeatures,
    /// Material is pure water; only the water path is compiled.
    pub enable_water_only: bool,
    /// Sample the land type map.
    pub enable_type_map: bool,
    pub enable_water: bool,
    pub enable_forest: bool,
    pub detailed_water: bool,
    pub detailed_forest: bool,
    /// A base layer is bound alongside the detail layer.
    pub enable_base_map: bool,
}

impl ProgramVariant {
    pub fn new(
        base_name: &str,
        key: BatchKey,
        features: DetailFeatures,
        enable_base_map: bool,
    ) -> Self {
        let material = key.material;
        let water_only = material == MaterialMask::WATER;
        Self {
            name: format!("{base_name}_cdlod"),
            key,
            features,
            enable_water_only: water_only,
            enable_type_map: !water_only
                && material.contains(MaterialMask::LAND)
                && features.contains(DetailFeatures::LAND),
            enable_water: water_only || material.contains(MaterialMask::WATER),
            enable_forest: !water_only && material.contains(MaterialMask::FOREST),
            detailed_water: features.contains(DetailFeatures::WATER),
            detailed_forest: features.contains(DetailFeatures::FOREST),
            enable_base_map,
        }
    }
}

/// Builds GPU programs on demand. Implemented by the render backend.
pub trait ProgramFactory {
    fn create_program(&mut self, variant: &ProgramVariant) -> Result<ProgramHandle, RenderError>;
}

/// Per-instance vertex data for one selected node.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct NodeInstance {
    /// Node origin in grid cells.
    pub x: f32,
    pub y: f32,
    /// Mesh scale, `2^lod`.
    pub scale: f32,
    /// Morph distance, `base_lod_distance * 2^lod`.
    pub lod_distance: f32,
}

const_assert_eq!(size_of::<NodeInstance>(), 16);

impl NodeInstance {
    pub fn new(grid_position: Vec2, lod: u8, params: &LodParams) -> Self {
        Self {
            x: grid_position.x,
            y: grid_position.y,
            scale: params.node_scale(lod),
            lod_distance: params.lod_distance(lod),
        }
    }
}

/// Nodes that share a program this frame.
#[derive(Debug)]
pub struct RenderBatch {
    key: BatchKey,
    program: ProgramHandle,
    positions: Vec<Vec2>,
    lods: Vec<u8>,
    instance_offset: usize,
    active: bool,
}

impl RenderBatch {
    fn new(key: BatchKey, program: ProgramHandle) -> Self {
        Self {
            key,
            program,
            positions: Vec::new(),
            lods: Vec::new(),
            instance_offset: 0,
            active: false,
        }
    }

    fn clear(&mut self) {
        self.positions.clear();
        self.lods.clear();
        self.active = false;
    }

    pub fn key(&self) -> BatchKey {
        self.key
    }

    pub fn program(&self) -> ProgramHandle {
        self.program
    }

    /// Grid positions of the queued nodes.
    pub fn positions(&self) -> &[Vec2] {
        &self.positions
    }

    /// LOD of each queued node, parallel to [`positions`](Self::positions).
    pub fn lods(&self) -> &[u8] {
        &self.lods
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// First instance of this batch in the packed buffer. Valid after packing.
    pub fn instance_offset(&self) -> usize {
        self.instance_offset
    }

    /// Byte offset of this batch in the packed buffer.
    pub fn byte_offset(&self) -> usize {
        self.instance_offset * size_of::<NodeInstance>()
    }
}

#[derive(Debug)]
enum BatchSlot {
    Ready(usize),
    Failed,
}

/// The batches drawn this frame, in first-activation order.
#[derive(Debug)]
pub struct RenderList {
    program_name: String,
    enable_base_map: bool,
    features: Vec<DetailFeatures>,
    slots: FxHashMap<BatchKey, BatchSlot>,
    batches: Vec<RenderBatch>,
    active: Vec<usize>,
    failed: Vec<(BatchKey, RenderError)>,
}

impl RenderList {
    pub fn new(
        program_name: impl Into<String>,
        detail: &DetailLevelTable,
        enable_base_map: bool,
    ) -> Self {
        Self {
            program_name: program_name.into(),
            enable_base_map,
            features: detail.levels().iter().map(|level| level.features).collect(),
            slots: FxHashMap::default(),
            batches: Vec::new(),
            active: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Queue `node` at `lod` in the batch for `(node.material, detail_level)`.
    ///
    /// Returns false when that batch's program could not be created; the node
    /// is dropped for this frame.
    pub fn add_node(
        &mut self,
        node: &Node,
        lod: u8,
        detail_level: usize,
        factory: &mut dyn ProgramFactory,
    ) -> bool {
        let key = BatchKey::new(node.material, detail_level);
        let Some(index) = self.ensure_batch(key, factory) else {
            return false;
        };

        let batch = &mut self.batches[index];
        if !batch.active {
            batch.active = true;
            self.active.push(index);
        }
        batch.positions.push(node.grid_position);
        batch.lods.push(lod);
        true
    }

    /// Create the batch and program for `key` if this is the first time it is seen.
    ///
    /// A failed creation is remembered and logged once; later calls return `None`
    /// without asking the factory again.
    pub fn ensure_batch(
        &mut self,
        key: BatchKey,
        factory: &mut dyn ProgramFactory,
    ) -> Option<usize> {
        if let Some(slot) = self.slots.get(&key) {
            return match slot {
                BatchSlot::Ready(index) => Some(*index),
                BatchSlot::Failed => None,
            };
        }

        let features = self
            .features
            .get(key.detail_level)
            .copied()
            .unwrap_or_default();
        let variant =
            ProgramVariant::new(&self.program_name, key, features, self.enable_base_map);
        match factory.create_program(&variant) {
            Ok(program) => {
                let index = self.batches.len();
                self.batches.push(RenderBatch::new(key, program));
                self.slots.insert(key, BatchSlot::Ready(index));
                debug!(
                    material = ?key.material,
                    detail_level = key.detail_level,
                    program = program.0,
                    "created terrain program"
                );
                Some(index)
            }
            Err(err) => {
                error!(
                    material = ?key.material,
                    detail_level = key.detail_level,
                    "terrain program unavailable: {err}"
                );
                self.slots.insert(key, BatchSlot::Failed);
                self.failed.push((key, err));
                None
            }
        }
    }

    /// Empty every batch and deactivate it. Batches and programs are kept.
    pub fn clear(&mut self) {
        for &index in &self.active {
            self.batches[index].clear();
        }
        self.active.clear();
    }

    /// Forget every batch, program and failure, e.g. after the program name changed.
    pub fn reset(
        &mut self,
        program_name: impl Into<String>,
        detail: &DetailLevelTable,
        enable_base_map: bool,
    ) {
        *self = Self::new(program_name, detail, enable_base_map);
    }

    /// Write all active batches contiguously into `out` and record each batch's offset.
    ///
    /// Returns the number of instances written.
    pub fn pack_instances(&mut self, params: &LodParams, out: &mut Vec<NodeInstance>) -> usize {
        out.clear();
        for &index in &self.active {
            let batch = &mut self.batches[index];
            batch.instance_offset = out.len();
            out.extend(
                batch
                    .positions
                    .iter()
                    .zip(&batch.lods)
                    .map(|(&position, &lod)| NodeInstance::new(position, lod, params)),
            );
        }
        debug_assert!(out.len() <= params.leaf_count());
        out.len()
    }

    /// Batches with at least one node this frame.
    pub fn active_batches(&self) -> impl Iterator<Item = &RenderBatch> {
        self.active.iter().map(|&index| &self.batches[index])
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Queued nodes across all active batches.
    pub fn instance_count(&self) -> usize {
        self.active_batches().map(RenderBatch::len).sum()
    }

    /// Batches created so far, active or not.
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Keys whose program could not be created, with the factory's error.
    pub fn failed_programs(&self) -> &[(BatchKey, RenderError)] {
        &self.failed
    }

    pub fn program_name(&self) -> &str {
        &self.program_name
    }
}
