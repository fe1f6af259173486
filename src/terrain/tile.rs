//! Tile identity and island geometry
//!
//! A "tile" is one top-level heightmap file; an "island" is one quadtree
//! node inside a tile, rendered as a fixed-size vertex grid whose sample
//! stride depends on the node depth.

use std::fmt;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::constants::*;

/// Identity of one quadtree node within one top-level tile.
///
/// `(x, y)` are node coordinates on the `2^depth` grid of that depth.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TileId {
    pub tile_x: i32,
    pub tile_y: i32,
    pub depth: u8,
    pub x: u16,
    pub y: u16,
}

impl TileId {
    pub fn new(tile_x: i32, tile_y: i32, depth: u8, x: u16, y: u16) -> Self {
        TileId {
            tile_x,
            tile_y,
            depth,
            x,
            y,
        }
    }

    pub fn root(tile_x: i32, tile_y: i32) -> Self {
        TileId::new(tile_x, tile_y, 0, 0, 0)
    }

    /// Child node in quadrant 0..4 (bit 0 = +x, bit 1 = +y)
    pub fn child(&self, quadrant: u8) -> TileId {
        TileId {
            tile_x: self.tile_x,
            tile_y: self.tile_y,
            depth: self.depth + 1,
            x: self.x * 2 + (quadrant & 1) as u16,
            y: self.y * 2 + (quadrant >> 1) as u16,
        }
    }

    /// Compact form for logs and debugging
    pub fn packed(&self) -> u64 {
        ((self.tile_x as u16 as u64) << 48)
            | ((self.tile_y as u16 as u64) << 32)
            | ((self.depth as u64) << 24)
            | ((self.x as u64) << 12)
            | self.y as u64
    }

    /// Side length of this node in world units
    pub fn world_size(&self) -> f32 {
        TILE_WORLD_SIZE / (1u32 << self.depth) as f32
    }

    /// Center of the node's footprint on the y = 0 plane
    pub fn world_center(&self) -> Vec3 {
        let size = self.world_size();
        Vec3::new(
            self.tile_x as f32 * TILE_WORLD_SIZE + (self.x as f32 + 0.5) * size,
            0.0,
            self.tile_y as f32 * TILE_WORLD_SIZE + (self.y as f32 + 0.5) * size,
        )
    }

    /// True when the node's sample window lies inside a `width * width`
    /// heightmap and divides evenly into the vertex grid. Anything else
    /// must not reach `IslandGeometry::rebuild`.
    pub fn fits_sample_grid(&self, width: usize) -> bool {
        const GRID_STEP: usize = ISLAND_VERTS - 1;
        if width < 2 || self.depth >= 32 || (width - 1) % (1usize << self.depth) != 0 {
            return false;
        }
        let span = (width - 1) >> self.depth;
        span >= GRID_STEP
            && span % GRID_STEP == 0
            && (self.x as usize + 1) * span <= width - 1
            && (self.y as usize + 1) * span <= width - 1
    }

    /// Distance from a point to the node's footprint rectangle at y = 0.
    /// Zero horizontal distance when the point is above the node, so the
    /// branch under the camera always refines.
    pub fn world_distance(&self, point: Vec3) -> f32 {
        let size = self.world_size();
        let min_x = self.tile_x as f32 * TILE_WORLD_SIZE + self.x as f32 * size;
        let min_z = self.tile_y as f32 * TILE_WORLD_SIZE + self.y as f32 * size;
        let dx = (min_x - point.x).max(point.x - (min_x + size)).max(0.0);
        let dz = (min_z - point.z).max(point.z - (min_z + size)).max(0.0);
        Vec3::new(dx, point.y, dz).length()
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{} d{} {},{})",
            self.tile_x, self.tile_y, self.depth, self.x, self.y
        )
    }
}

/// One vertex of an island grid, laid out for direct GPU upload
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct IslandVertex {
    pub position: [f32; 3],
}

/// Fixed-size vertex grid for one island, rebuilt in place on each reuse
pub struct IslandGeometry {
    vertices: Vec<IslandVertex>,
}

impl IslandGeometry {
    pub fn empty() -> Self {
        IslandGeometry {
            vertices: vec![IslandVertex::zeroed(); ISLAND_VERTS * ISLAND_VERTS],
        }
    }

    pub fn vertices(&self) -> &[IslandVertex] {
        &self.vertices
    }

    /// Raw bytes for GPU upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Rebuild the grid from a tile heightmap.
    ///
    /// `samples` is the full `width * width` heightmap of the node's
    /// top-level tile; the node reads its `(depth, x, y)` sub-window with a
    /// stride of `span / (ISLAND_VERTS - 1)` samples. `width - 1` must be
    /// divisible by `(ISLAND_VERTS - 1) << depth`.
    pub fn rebuild(&mut self, samples: &[f32], width: usize, tile: TileId) {
        let span = (width - 1) >> tile.depth;
        debug_assert!(span >= ISLAND_VERTS - 1 && span % (ISLAND_VERTS - 1) == 0);
        debug_assert_eq!(samples.len(), width * width);

        let step = span / (ISLAND_VERTS - 1);
        let origin_x = tile.x as usize * span;
        let origin_y = tile.y as usize * span;
        let world_per_sample = TILE_WORLD_SIZE / (width - 1) as f32;
        let base_x = tile.tile_x as f32 * TILE_WORLD_SIZE;
        let base_z = tile.tile_y as f32 * TILE_WORLD_SIZE;

        for gy in 0..ISLAND_VERTS {
            let sy = origin_y + gy * step;
            for gx in 0..ISLAND_VERTS {
                let sx = origin_x + gx * step;
                let height = samples[sy * width + sx];
                self.vertices[gy * ISLAND_VERTS + gx] = IslandVertex {
                    position: [
                        base_x + sx as f32 * world_per_sample,
                        height,
                        base_z + sy as f32 * world_per_sample,
                    ],
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_coordinates() {
        let root = TileId::root(2, -1);
        assert_eq!(root.child(0), TileId::new(2, -1, 1, 0, 0));
        assert_eq!(root.child(1), TileId::new(2, -1, 1, 1, 0));
        assert_eq!(root.child(2), TileId::new(2, -1, 1, 0, 1));
        assert_eq!(root.child(3), TileId::new(2, -1, 1, 1, 1));

        let deep = root.child(3).child(0);
        assert_eq!(deep.depth, 2);
        assert_eq!((deep.x, deep.y), (2, 2));
    }

    #[test]
    fn test_world_center() {
        let root = TileId::root(0, 0);
        let center = root.world_center();
        assert_eq!(center.x, TILE_WORLD_SIZE / 2.0);
        assert_eq!(center.z, TILE_WORLD_SIZE / 2.0);

        // child(0) covers the -x/-y quarter of the root
        let child = root.child(0);
        assert_eq!(child.world_center().x, TILE_WORLD_SIZE / 4.0);
    }

    #[test]
    fn test_fits_sample_grid() {
        // width 33: depth 0 (stride 2) and depth 1 (stride 1) fit
        assert!(TileId::root(0, 0).fits_sample_grid(33));
        assert!(TileId::new(0, 0, 1, 1, 1).fits_sample_grid(33));

        // node coordinates outside the 2^depth grid
        assert!(!TileId::new(0, 0, 0, 9, 9).fits_sample_grid(33));
        assert!(!TileId::new(0, 0, 1, 2, 0).fits_sample_grid(33));

        // too deep: span shrinks below the vertex grid
        assert!(!TileId::new(0, 0, 2, 0, 0).fits_sample_grid(33));

        // width not aligned to the vertex grid at all
        assert!(!TileId::root(0, 0).fits_sample_grid(30));
        assert!(!TileId::root(0, 0).fits_sample_grid(0));
    }

    #[test]
    fn test_world_distance() {
        let root = TileId::root(0, 0);
        // Inside the footprint, only height contributes
        assert_eq!(root.world_distance(Vec3::new(100.0, 0.0, 100.0)), 0.0);
        assert_eq!(root.world_distance(Vec3::new(100.0, 50.0, 100.0)), 50.0);
        // Straight out along +x past the far edge
        assert_eq!(
            root.world_distance(Vec3::new(TILE_WORLD_SIZE + 30.0, 0.0, 100.0)),
            30.0
        );
    }

    #[test]
    fn test_rebuild_reads_sub_window() {
        let width = 33usize;
        // height encodes the sample index so the window is easy to verify
        let samples: Vec<f32> = (0..width * width).map(|i| i as f32).collect();

        let mut geometry = IslandGeometry::empty();

        // depth 1, node (1, 0): right half of the top row, stride 1
        geometry.rebuild(&samples, width, TileId::new(0, 0, 1, 1, 0));
        let first = geometry.vertices()[0].position;
        assert_eq!(first[1], 16.0); // samples[0 * 33 + 16]

        // depth 0 covers the whole tile with stride 2
        geometry.rebuild(&samples, width, TileId::root(0, 0));
        assert_eq!(geometry.vertices()[0].position[1], 0.0);
        assert_eq!(geometry.vertices()[1].position[1], 2.0);
        let last = geometry.vertices()[ISLAND_VERTS * ISLAND_VERTS - 1].position;
        assert_eq!(last[1], (width * width - 1) as f32);
    }

    #[test]
    fn test_vertex_bytes_length() {
        let geometry = IslandGeometry::empty();
        assert_eq!(
            geometry.as_bytes().len(),
            ISLAND_VERTS * ISLAND_VERTS * std::mem::size_of::<IslandVertex>()
        );
    }
}
