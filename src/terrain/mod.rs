//! Terrain streaming: the island pool, the background streamer, and the
//! per-frame quadtree walker that drives them.

pub mod pool;
pub mod quadtree;
pub mod streamer;
pub mod tile;

// Re-export commonly used types
pub use pool::{IslandRef, SlotId, TerrainPool};
pub use quadtree::TerrainQuadtree;
pub use streamer::{DiskTiles, QueuePolicy, StreamRequest, TerrainStreamer, TileSource};
pub use tile::{IslandGeometry, IslandVertex, TileId};
