//! WGSL source for the terrain programs.
//!
//! Every [`ProgramVariant`] compiles the same source behind a prelude of
//! `const bool` switches, so unused paths are eliminated by the compiler.

use std::fmt::Write;

use terra_cdlod::ProgramVariant;

/// Shared terrain vertex and fragment stages. Expects the switch constants
/// from [`variant_prelude`].
pub const TERRAIN_SHADER_SOURCE: &str = r#"
const MORPH_START: f32 = 0.7;

struct TerrainGlobals {
    view_proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
    // cdlod_min_dist, mesh_resolution_m, leaf_node_size_m, mesh_grid_size
    cdlod: vec4<f32>,
    // origin_m.xy, size_m.xy
    detail_layer: vec4<f32>,
    base_layer: vec4<f32>,
};

@group(0) @binding(0) var<uniform> globals: TerrainGlobals;

struct VertexInput {
    @location(0) grid: vec2<f32>,
    // node grid x, node grid y, scale, lod distance
    @location(1) node: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) detail_uv: vec2<f32>,
    @location(2) base_uv: vec2<f32>,
};

fn morph_factor(dist: f32, lod_distance: f32) -> f32 {
    let start = lod_distance * MORPH_START;
    return clamp((dist - start) / (lod_distance - start), 0.0, 1.0);
}

fn layer_uv(world: vec2<f32>, layer: vec4<f32>) -> vec2<f32> {
    return (world - layer.xy) / max(layer.zw, vec2<f32>(1.0));
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    let scale = input.node.z;
    let resolution = globals.cdlod.y;
    let node_grid = input.node.xy + input.grid * scale;
    let dist = distance(vec3<f32>(node_grid * resolution, 0.0), globals.camera_pos.xyz);
    let morph = morph_factor(dist, input.node.w);

    // Odd vertices slide onto the next coarser grid.
    let odd = fract(input.grid * 0.5) * 2.0;
    let grid = node_grid - odd * scale * morph;
    let world = vec3<f32>(grid * resolution, 0.0);

    var out: VertexOutput;
    out.clip_position = globals.view_proj * vec4<f32>(world, 1.0);
    out.world_position = world;
    out.detail_uv = layer_uv(world.xy, globals.detail_layer);
    out.base_uv = layer_uv(world.xy, globals.base_layer);
    return out;
}

const LAND_COLOR: vec3<f32> = vec3<f32>(0.42, 0.38, 0.30);
const GRASS_COLOR: vec3<f32> = vec3<f32>(0.33, 0.42, 0.24);
const FOREST_COLOR: vec3<f32> = vec3<f32>(0.12, 0.28, 0.10);
const WATER_COLOR: vec3<f32> = vec3<f32>(0.08, 0.22, 0.40);

fn inside(uv: vec2<f32>) -> bool {
    return all(uv >= vec2<f32>(0.0)) && all(uv <= vec2<f32>(1.0));
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    var color = LAND_COLOR;
    if ENABLE_WATER_ONLY {
        color = WATER_COLOR;
    } else {
        if ENABLE_TYPE_MAP {
            color = GRASS_COLOR;
        }
        if ENABLE_FOREST {
            color = mix(color, FOREST_COLOR, select(0.3, 0.6, DETAILED_FOREST));
        }
        if ENABLE_WATER {
            color = mix(color, WATER_COLOR, 0.25);
        }
    }
    if DETAILED_WATER && ENABLE_WATER {
        let ripple = 0.5 + 0.5 * sin(input.world_position.x * 0.05 + input.world_position.y * 0.03);
        color = color * (0.95 + 0.1 * ripple);
    }
    // Outside the detail layer only the base layer has data.
    if ENABLE_BASE_MAP && !inside(input.detail_uv) && inside(input.base_uv) {
        color = color * 0.85;
    }
    return vec4<f32>(color, 1.0);
}
"#;

/// `const` declarations selecting the code paths of one variant.
pub fn variant_prelude(variant: &ProgramVariant) -> String {
    let switches = [
        ("ENABLE_WATER_ONLY", variant.enable_water_only),
        ("ENABLE_TYPE_MAP", variant.enable_type_map),
        ("ENABLE_WATER", variant.enable_water),
        ("ENABLE_FOREST", variant.enable_forest),
        ("DETAILED_WATER", variant.detailed_water),
        ("DETAILED_FOREST", variant.detailed_forest),
        ("ENABLE_BASE_MAP", variant.enable_base_map),
    ];
    let mut prelude = String::new();
    for (name, enabled) in switches {
        // Writing to a String cannot fail.
        let _ = writeln!(prelude, "const {name}: bool = {enabled};");
    }
    prelude
}

/// Complete WGSL for `variant`.
pub fn terrain_shader_source(variant: &ProgramVariant) -> String {
    let mut source = variant_prelude(variant);
    source.push_str(TERRAIN_SHADER_SOURCE);
    source
}

/// Debug label naming the program and its batch key.
pub fn program_label(variant: &ProgramVariant) -> String {
    format!(
        "{}[material={:#04x},detail={}]",
        variant.name,
        variant.key.material.bits(),
        variant.key.detail_level
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use terra_cdlod::{BatchKey, DetailFeatures, MaterialMask};

    fn variant(material: MaterialMask, features: DetailFeatures) -> ProgramVariant {
        ProgramVariant::new("terrain", BatchKey::new(material, 2), features, false)
    }

    #[test]
    fn test_prelude_declares_every_switch() {
        let prelude = variant_prelude(&variant(MaterialMask::LAND, DetailFeatures::empty()));
        assert_eq!(prelude.lines().count(), 7);
        for line in prelude.lines() {
            assert!(line.starts_with("const ") && line.ends_with(';'));
        }
    }

    #[test]
    fn test_water_only_variant() {
        let prelude = variant_prelude(&variant(MaterialMask::WATER, DetailFeatures::WATER));
        assert!(prelude.contains("const ENABLE_WATER_ONLY: bool = true;"));
        assert!(prelude.contains("const ENABLE_TYPE_MAP: bool = false;"));
        assert!(prelude.contains("const DETAILED_WATER: bool = true;"));
    }

    #[test]
    fn test_source_starts_with_prelude() {
        let v = variant(MaterialMask::LAND | MaterialMask::FOREST, DetailFeatures::all());
        let source = terrain_shader_source(&v);
        assert!(source.starts_with("const ENABLE_WATER_ONLY: bool = false;"));
        assert!(source.contains("const ENABLE_FOREST: bool = true;"));
        assert!(source.contains("fn vs_main"));
        assert!(source.contains("fn fs_main"));
    }

    #[test]
    fn test_label_names_key() {
        let label = program_label(&variant(MaterialMask::WATER, DetailFeatures::empty()));
        assert!(label.starts_with("terrain_cdlod[material="));
        assert!(label.ends_with("detail=2]"));
    }
}
