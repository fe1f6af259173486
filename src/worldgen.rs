//! Deterministic heightmap generation using FastNoiseLite
//!
//! Produces the per-tile heightmaps the demo streams back in. Samples are
//! taken in global sample space (`tile * (width - 1) + local`) so adjacent
//! tiles share their edge rows and columns exactly.

use fastnoise_lite::{FastNoiseLite, FractalType, NoiseType};

use crate::constants::HEIGHT_AMPLITUDE;

/// Pre-configured noise stack for tile heightmaps
pub struct HeightmapGenerator {
    noise_base: FastNoiseLite,
    noise_detail: FastNoiseLite,
    pub seed: u32,
}

impl HeightmapGenerator {
    pub fn new(seed: u32) -> Self {
        HeightmapGenerator {
            noise_base: Self::create_fbm_noise(seed, 0.004),
            noise_detail: Self::create_fbm_noise(seed.wrapping_add(1), 0.02),
            seed,
        }
    }

    fn create_fbm_noise(seed: u32, frequency: f32) -> FastNoiseLite {
        let mut noise = FastNoiseLite::with_seed(seed as i32);
        noise.set_noise_type(Some(NoiseType::OpenSimplex2));
        noise.set_fractal_type(Some(FractalType::FBm));
        noise.set_fractal_octaves(Some(4));
        noise.set_frequency(Some(frequency));
        noise
    }

    /// Generate the `width * width` heightmap for one top-level tile
    pub fn generate_tile(&self, width: u32, tile_x: i32, tile_y: i32) -> Vec<f32> {
        let width = width as usize;
        let mut samples = Vec::with_capacity(width * width);

        let base_x = tile_x as f32 * (width - 1) as f32;
        let base_y = tile_y as f32 * (width - 1) as f32;

        for gy in 0..width {
            let sy = base_y + gy as f32;
            for gx in 0..width {
                let sx = base_x + gx as f32;
                let base = self.noise_base.get_noise_2d(sx, sy);
                let detail = self.noise_detail.get_noise_2d(sx, sy);
                samples.push((base + detail * 0.15) * HEIGHT_AMPLITUDE);
            }
        }

        samples
    }
}
