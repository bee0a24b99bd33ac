//! Headless terrain run: builds a procedural terrain, flies a camera over it
//! and logs what each frame would draw.
//!
//! Run with `cargo run -p terra-headless -- --frames 60 --max-level 7`.

mod backend;
mod flight;
mod world;

use std::process::ExitCode;

use clap::Parser;
use glam::DVec2;
use terra_cdlod::{
    BuildParameters, CdlodTerrain, ElevationSource, MaterialMask, TerrainRenderer,
};
use terra_config::{CliArgs, Config, default_config_dir};
use tracing::{error, info};

use crate::backend::{CountingClient, source_registry};
use crate::flight::Flight;

#[derive(Parser, Debug)]
#[command(name = "terra-headless", about = "Fly a camera over a procedural CDLOD terrain")]
struct Args {
    #[command(flatten)]
    common: CliArgs,

    /// Number of frames to simulate.
    #[arg(long, default_value_t = 120)]
    frames: u32,

    /// Noise seed for the generated terrain.
    #[arg(long, default_value_t = 42)]
    seed: u32,

    /// Elevation samples per side, padded up to a power of two.
    #[arg(long, default_value_t = 1024)]
    size: u32,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config_dir = args
        .common
        .config
        .clone()
        .or_else(default_config_dir)
        .unwrap_or_else(|| ".terra".into());

    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args.common);

    let log_dir = config_dir.join("logs");
    terra_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    match run(&args, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, config: &Config) -> Result<(), terra_cdlod::TerrainError> {
    let meters_per_grid = f64::from(config.terrain.meters_per_grid);
    let world = world::generate(
        args.seed,
        args.size,
        meters_per_grid,
        config.terrain.material_margin_cells,
    )?;
    let extent_m = f64::from(world.elevation.size().x) * meters_per_grid;
    info!(
        seed = args.seed,
        samples = world.elevation.size().x,
        extent_km = extent_m / 1_000.0,
        "generated world"
    );

    let mut registry = source_registry();
    let mut terrain = CdlodTerrain::new();
    terrain.configure(config);
    let params = BuildParameters::from_config(config, &world.elevation, &world.materials)?
        .with_origin(DVec2::ZERO)
        .with_base_layer(world.base_layer);
    terrain.build(&params, &mut registry)?;

    // Center the overview texture on the elevation data.
    let base_size = world.base_layer.size_m();
    terrain.set_base_map_origin(DVec2::splat(extent_m * 0.5) - base_size * 0.5);

    let mut flight = Flight::new(extent_m as f32, args.frames);
    let mut client = CountingClient::default();
    for frame in 0..args.frames {
        let camera = flight.camera(frame);
        let view = camera.terrain_view();
        let stats = terrain.update(&view, config.render.low_detail, &mut registry);

        client.reset();
        let drawn = terrain.draw(&mut client);

        if config.debug.log_frame_stats {
            info!(
                frame,
                visited = stats.selection.visited,
                culled = stats.selection.culled,
                selected = stats.selection.selected,
                skipped = stats.selection.skipped,
                beyond_draw_distance = stats.selection.beyond_draw_distance,
                batches = stats.batches,
                instances = stats.instances,
                "frame selected"
            );
        }
        info!(
            frame,
            draws = drawn.batches_drawn,
            failed = drawn.batches_failed,
            land = client.instances_of(MaterialMask::LAND),
            water = client.instances_of(MaterialMask::WATER),
            upload_bytes = client.uploaded_bytes,
            "frame drawn"
        );
    }

    info!(programs = registry.len(), "flight finished");
    Ok(())
}
