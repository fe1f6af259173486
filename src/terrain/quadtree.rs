//! Per-frame quadtree walk that decides which islands are needed
//!
//! The tree is index-based: a node arena with u32 child indices, children
//! allocated lazily on first descent and never freed. Each frame the walk
//! picks a render leaf per branch by camera distance, requests its island
//! from the pool, and touches interior nodes so coarser parents stay
//! resident while finer children stream in.

use glam::Vec3;

use crate::constants::MAX_NEW_REQUESTS_PER_FRAME;
use crate::terrain::pool::{SlotId, TerrainPool};
use crate::terrain::tile::TileId;

struct Node {
    tile: TileId,
    children: Option<[u32; 4]>,
}

pub struct TerrainQuadtree {
    nodes: Vec<Node>,
    roots: Vec<u32>,
    max_depth: u8,
    leaf_range: f32,
}

impl TerrainQuadtree {
    /// Build roots for a `tiles_x * tiles_y` grid of top-level tiles.
    /// `leaf_range` is the camera distance below which a max-depth island
    /// is selected; each coarser level doubles it.
    pub fn new(tiles_x: i32, tiles_y: i32, max_depth: u8, leaf_range: f32) -> Self {
        let mut nodes = Vec::new();
        let mut roots = Vec::new();
        for tile_y in 0..tiles_y {
            for tile_x in 0..tiles_x {
                roots.push(nodes.len() as u32);
                nodes.push(Node {
                    tile: TileId::root(tile_x, tile_y),
                    children: None,
                });
            }
        }
        TerrainQuadtree {
            nodes,
            roots,
            max_depth,
            leaf_range,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn lod_range(&self, depth: u8) -> f32 {
        self.leaf_range * (1u32 << (self.max_depth - depth)) as f32
    }

    fn children_of(&mut self, index: u32) -> [u32; 4] {
        if let Some(children) = self.nodes[index as usize].children {
            return children;
        }
        let tile = self.nodes[index as usize].tile;
        let first = self.nodes.len() as u32;
        for quadrant in 0..4u8 {
            self.nodes.push(Node {
                tile: tile.child(quadrant),
                children: None,
            });
        }
        let children = [first, first + 1, first + 2, first + 3];
        self.nodes[index as usize].children = Some(children);
        children
    }

    /// Walk the tree for one frame, issuing pool requests and touches.
    /// Returns the render leaves as (tile, slot) pairs; fetch their
    /// geometry with `get_island` after `update_island_pool`.
    ///
    /// New loads are throttled to a per-frame budget so the streamer queue
    /// is never flooded; throttled tiles are retried on later frames.
    pub fn walk(&mut self, camera: Vec3, pool: &mut TerrainPool) -> Vec<(TileId, SlotId)> {
        let mut leaves = Vec::new();
        let mut budget = MAX_NEW_REQUESTS_PER_FRAME;
        let mut stack: Vec<u32> = self.roots.iter().rev().copied().collect();

        while let Some(index) = stack.pop() {
            let tile = self.nodes[index as usize].tile;
            let distance = tile.world_distance(camera);

            if tile.depth >= self.max_depth || distance > self.lod_range(tile.depth) {
                let is_new = !pool.contains(&tile);
                if is_new && budget == 0 {
                    continue;
                }
                match pool.request_island(tile) {
                    Ok(slot) => {
                        if is_new {
                            budget -= 1;
                        }
                        leaves.push((tile, slot));
                    }
                    Err(err) => {
                        tracing::warn!("Skipping island {} this frame: {}", tile, err);
                    }
                }
            } else {
                // Keep the coarser parent alive while children stream in
                pool.touch_island(tile);
                for child in self.children_of(index) {
                    stack.push(child);
                }
            }
        }

        leaves
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TileFileError;
    use crate::terrain::streamer::{QueuePolicy, TerrainStreamer, TileSource};

    const TEST_WIDTH: u32 = 257;

    struct FlatTiles;

    impl TileSource for FlatTiles {
        fn sample_width(&self) -> u32 {
            TEST_WIDTH
        }
        fn load_samples(&self, _: i32, _: i32) -> Result<Vec<f32>, TileFileError> {
            Ok(vec![0.0; (TEST_WIDTH * TEST_WIDTH) as usize])
        }
    }

    fn pool(capacity: usize) -> TerrainPool {
        TerrainPool::new(
            capacity,
            TerrainStreamer::new(FlatTiles, 256, QueuePolicy::Reject),
        )
    }

    #[test]
    fn test_distant_camera_selects_roots() {
        let mut tree = TerrainQuadtree::new(2, 2, 4, 100.0);
        let mut pool = pool(16);

        let camera = Vec3::new(1.0e6, 0.0, 1.0e6);
        let leaves = tree.walk(camera, &mut pool);

        assert_eq!(leaves.len(), 4);
        assert!(leaves.iter().all(|(tile, _)| tile.depth == 0));
        // Nothing was subdivided
        assert_eq!(tree.node_count(), 4);
    }

    #[test]
    fn test_near_camera_subdivides_to_max_depth() {
        let mut tree = TerrainQuadtree::new(1, 1, 2, 10.0);
        let mut pool = pool(64);

        // Stand at the tile center so at least one branch refines fully
        let camera = TileId::root(0, 0).world_center();
        let leaves = tree.walk(camera, &mut pool);

        assert!(leaves.iter().any(|(tile, _)| tile.depth == 2));
        // A walk never returns an interior node together with its children
        assert!(leaves.iter().all(|(tile, _)| tile.depth > 0));
        assert!(tree.node_count() > 1);
    }

    #[test]
    fn test_child_allocation_is_lazy_and_stable() {
        let mut tree = TerrainQuadtree::new(1, 1, 3, 10.0);
        let mut pool = pool(128);

        let camera = TileId::root(0, 0).world_center();
        tree.walk(camera, &mut pool);
        let after_first = tree.node_count();

        pool.update_island_pool();
        tree.walk(camera, &mut pool);
        assert_eq!(tree.node_count(), after_first);
    }

    #[test]
    fn test_new_loads_respect_frame_budget() {
        let mut tree = TerrainQuadtree::new(4, 4, 4, 50.0);
        let mut pool = pool(256);

        let camera = Vec3::new(1.0e6, 0.0, 1.0e6);
        tree.walk(camera, &mut pool);
        assert!(pool.resident_count() <= MAX_NEW_REQUESTS_PER_FRAME);

        // Later frames pick up the throttled tiles
        for _ in 0..4 {
            pool.update_island_pool();
            tree.walk(camera, &mut pool);
        }
        assert_eq!(pool.resident_count(), 16);
    }
}
