use criterion::{Criterion, black_box, criterion_group, criterion_main};
use glam::{DVec2, Vec3};
use terra_cdlod::*;

struct NullFactory;

impl ProgramFactory for NullFactory {
    fn create_program(&mut self, variant: &ProgramVariant) -> Result<ProgramHandle, RenderError> {
        Ok(ProgramHandle(variant.key.detail_level as u64))
    }
}

fn lod() -> LodParams {
    LodParams {
        max_level: 6,
        mesh_grid_size: 16,
        meters_per_grid: 100,
        base_lod_distance: 4_000.0,
    }
}

fn inputs() -> (HeightField, MaterialMap) {
    let field = HeightField::from_fn(1024, 1024, |x, y| ((x * 7 + y * 13) % 300) as f32).unwrap();
    let raster = MaterialRaster::from_fn(64, 64, |x, y| {
        if (x + y) % 5 == 0 {
            MaterialMask::WATER
        } else {
            MaterialMask::LAND
        }
    })
    .unwrap();
    let layer = MaterialLayer::new(raster, DVec2::ZERO, 1_600.0).unwrap();
    (field, MaterialMap::new(layer))
}

fn bench_build(c: &mut Criterion) {
    let (field, materials) = inputs();
    let params = lod();
    c.bench_function("quadtree_build_level6", |bencher| {
        bencher.iter(|| {
            black_box(Quadtree::build(&params, DVec2::ZERO, &field, &materials).unwrap())
        })
    });
}

fn bench_update(c: &mut Criterion) {
    let (field, materials) = inputs();
    let mut terrain = CdlodTerrain::new();
    let build = BuildParameters::new(&field, &materials)
        .with_lod(lod())
        .with_origin(DVec2::ZERO);
    terrain.build(&build, &mut NullFactory).unwrap();

    let camera = OmniCamera::new(Vec3::new(20_000.0, 30_000.0, 500.0));
    c.bench_function("terrain_update_level6", |bencher| {
        bencher.iter(|| black_box(terrain.update(&camera, false, &mut NullFactory)))
    });
}

criterion_group!(benches, bench_build, bench_update);
criterion_main!(benches);
