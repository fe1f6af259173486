// Terrain module with the pool, streamer, and quadtree walker
pub mod terrain;

// Persisted per-tile heightmap files
pub mod tile_file;

// Heightmap generation for the demo and tools
pub mod worldgen;

// Other modules
pub mod constants;
pub mod error;
pub mod settings;

// Re-exports
pub use constants::*;
pub use error::{PoolError, TileFileError};
pub use settings::{LodSettings, PoolSettings, StreamSettings, StreamerSettings, load_settings, save_settings};
pub use terrain::{
    DiskTiles, IslandGeometry, IslandRef, IslandVertex, QueuePolicy, SlotId, StreamRequest,
    TerrainPool, TerrainQuadtree, TerrainStreamer, TileId, TileSource,
};
pub use tile_file::{read_heightmap_file, tile_file_name, write_heightmap_file};
pub use worldgen::HeightmapGenerator;
