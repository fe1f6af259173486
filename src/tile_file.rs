//! Persisted per-tile heightmap files
//!
//! One file per top-level tile coordinate pair, holding `width * width`
//! f32 height samples behind a magic/version header. The streamer worker
//! reads these; the worldgen CLI writes them.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::constants::TILE_FILE_EXTENSION;
use crate::error::TileFileError;

const MAGIC_HEADER: &[u8; 4] = b"THM1";
const VERSION: u32 = 1;

/// File name for the tile at (tile_x, tile_y), relative to the data dir
pub fn tile_file_name(tile_x: i32, tile_y: i32) -> String {
    format!("tile_{}_{}.{}", tile_x, tile_y, TILE_FILE_EXTENSION)
}

/// Write a tile heightmap. `samples` must hold exactly `width * width` values.
pub fn write_heightmap_file<P: AsRef<Path>>(
    path: P,
    width: u32,
    samples: &[f32],
) -> Result<(), TileFileError> {
    let expected = width as u64 * width as u64;
    if samples.len() as u64 != expected {
        return Err(TileFileError::SampleCountMismatch {
            width,
            expected,
            actual: samples.len() as u64,
        });
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(MAGIC_HEADER)?;
    writer.write_all(&VERSION.to_le_bytes())?;
    writer.write_all(&width.to_le_bytes())?;
    writer.write_all(&(samples.len() as u64).to_le_bytes())?;
    writer.write_all(bytemuck::cast_slice(samples))?;
    writer.flush()?;

    Ok(())
}

/// Read a tile heightmap, validating magic, version, and dimensions.
pub fn read_heightmap_file<P: AsRef<Path>>(
    path: P,
    expected_width: u32,
) -> Result<Vec<f32>, TileFileError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC_HEADER {
        return Err(TileFileError::BadMagic);
    }

    let mut word = [0u8; 4];
    reader.read_exact(&mut word)?;
    let version = u32::from_le_bytes(word);
    if version != VERSION {
        return Err(TileFileError::UnsupportedVersion(version));
    }

    reader.read_exact(&mut word)?;
    let width = u32::from_le_bytes(word);
    if width != expected_width {
        return Err(TileFileError::WidthMismatch {
            expected: expected_width,
            actual: width,
        });
    }

    let mut count_bytes = [0u8; 8];
    reader.read_exact(&mut count_bytes)?;
    let count = u64::from_le_bytes(count_bytes);
    let expected = width as u64 * width as u64;
    if count != expected {
        return Err(TileFileError::SampleCountMismatch {
            width,
            expected,
            actual: count,
        });
    }

    let mut samples = vec![0f32; count as usize];
    reader.read_exact(bytemuck::cast_slice_mut(&mut samples))?;

    Ok(samples)
}
