// Terrain constants
pub const TILE_SAMPLE_WIDTH: u32 = 257;
pub const ISLAND_VERTS: usize = 17;
pub const MAX_TILE_DEPTH: u8 = 4; // (257 - 1) == (17 - 1) << 4
pub const TILE_WORLD_SIZE: f32 = 1024.0;
pub const HEIGHT_AMPLITUDE: f32 = 96.0;

// Streaming constants
pub const DEFAULT_POOL_CAPACITY: usize = 64;
pub const STREAM_QUEUE_CAPACITY: usize = 256;
pub const MAX_NEW_REQUESTS_PER_FRAME: usize = 8;

// LOD constants
pub const DEFAULT_LEAF_RANGE: f32 = 192.0;

// Tile file constants
pub const TILE_FILE_EXTENSION: &str = "thm";
pub const DEFAULT_TILE_DIR: &str = "terrain";
