//! Headless demo: generate tile heightmaps, then fly a camera across the
//! world while the pool streams islands in and out.

use std::path::Path;
use std::thread;
use std::time::Duration;

use clap::Parser;
use glam::Vec3;

use terrainstream::{
    DiskTiles, HeightmapGenerator, StreamSettings, TILE_SAMPLE_WIDTH, TILE_WORLD_SIZE,
    TerrainPool, TerrainQuadtree, TerrainStreamer, TileFileError, load_settings, save_settings,
    tile_file_name, write_heightmap_file,
};

/// Terrain streaming demo
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Generate tile heightmap files before flying
    #[arg(long, default_value_t = false)]
    generate: bool,

    /// World size in top-level tiles per side
    #[arg(long, default_value_t = 4)]
    tiles: i32,

    /// Number of frames to simulate
    #[arg(long, default_value_t = 600)]
    frames: u32,

    /// Override the pool capacity from settings
    #[arg(long)]
    capacity: Option<usize>,

    /// Worldgen seed
    #[arg(long, default_value_t = 1337)]
    seed: u32,

    /// Camera speed in world units per frame
    #[arg(long, default_value_t = 8.0)]
    speed: f32,

    /// Settings file; created with defaults when missing
    #[arg(long)]
    settings: Option<String>,
}

pub fn run() {
    let args = Args::parse();

    let mut settings = match &args.settings {
        Some(path) if Path::new(path).exists() => match load_settings(path) {
            Ok(settings) => settings,
            Err(err) => {
                tracing::error!("Failed to load settings from {}: {}", path, err);
                return;
            }
        },
        Some(path) => {
            let settings = StreamSettings::default();
            if let Err(err) = save_settings(path, &settings) {
                tracing::warn!("Failed to save default settings to {}: {}", path, err);
            }
            settings
        }
        None => StreamSettings::default(),
    };
    if let Some(capacity) = args.capacity {
        settings.pool.capacity = capacity;
    }

    if args.generate {
        if let Err(err) = generate_tiles(&settings, args.tiles, args.seed) {
            tracing::error!("Tile generation failed: {}", err);
            return;
        }
    }

    fly(&settings, &args);
}

fn generate_tiles(settings: &StreamSettings, tiles: i32, seed: u32) -> Result<(), TileFileError> {
    let dir = Path::new(&settings.streamer.data_dir);
    std::fs::create_dir_all(dir)?;

    let generator = HeightmapGenerator::new(seed);
    for tile_y in 0..tiles {
        for tile_x in 0..tiles {
            let samples = generator.generate_tile(TILE_SAMPLE_WIDTH, tile_x, tile_y);
            write_heightmap_file(
                dir.join(tile_file_name(tile_x, tile_y)),
                TILE_SAMPLE_WIDTH,
                &samples,
            )?;
        }
    }

    tracing::info!(
        "Generated {} tile heightmaps (seed {}) in {}",
        tiles * tiles,
        seed,
        dir.display()
    );
    Ok(())
}

fn fly(settings: &StreamSettings, args: &Args) {
    let source = DiskTiles::new(settings.streamer.data_dir.as_str(), TILE_SAMPLE_WIDTH);
    let streamer = TerrainStreamer::new(
        source,
        settings.streamer.queue_capacity,
        settings.streamer.policy,
    );
    let mut pool = TerrainPool::new(settings.pool.capacity, streamer);
    let mut tree = TerrainQuadtree::new(
        args.tiles,
        args.tiles,
        settings.lod.max_depth,
        settings.lod.leaf_range,
    );

    tracing::info!(
        "Flying {} frames over a {}x{} tile world (pool capacity {})",
        args.frames,
        args.tiles,
        args.tiles,
        pool.capacity()
    );

    let world = args.tiles as f32 * TILE_WORLD_SIZE;
    let mut camera = Vec3::new(0.0, 120.0, 0.0);

    for frame in 0..args.frames {
        let t = frame as f32 * args.speed;
        camera.x = t % world;
        camera.z = (t * 0.61) % world;

        // Per-frame contract: requests and touches, then the pool update,
        // then geometry reads
        let visible = tree.walk(camera, &mut pool);
        pool.update_island_pool();
        let ready = visible
            .iter()
            .filter(|(tile, slot)| pool.get_island(*slot, *tile).is_some())
            .count();

        if frame % 60 == 0 {
            tracing::info!(
                "Frame {}: camera ({:.0}, {:.0}), {}/{} islands ready, {} resident, {} queued",
                frame,
                camera.x,
                camera.z,
                ready,
                visible.len(),
                pool.resident_count(),
                pool.streamer().queued()
            );
        }

        thread::sleep(Duration::from_millis(5));
    }

    tracing::info!(
        "Flight complete: {} resident islands ({} loaded), {} quadtree nodes",
        pool.resident_count(),
        pool.loaded_count(),
        tree.node_count()
    );
}
