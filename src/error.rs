//! Error types for the pool and the tile file format

use thiserror::Error;

/// Errors surfaced by `TerrainPool::request_island`
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// Every slot was touched this frame, so there is no eviction candidate.
    /// This is a capacity/configuration problem, not a transient one.
    #[error("island pool exhausted: all {capacity} slots are pinned this frame")]
    PoolExhausted { capacity: usize },

    /// The streamer's bounded request queue is full (or the worker is gone).
    #[error("stream request queue is saturated")]
    QueueSaturated,
}

/// Errors from reading or writing persisted tile heightmap files
#[derive(Debug, Error)]
pub enum TileFileError {
    #[error("tile file io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a tile heightmap file (bad magic)")]
    BadMagic,

    #[error("unsupported tile file version: {0}")]
    UnsupportedVersion(u32),

    #[error("tile width mismatch: expected {expected}, file has {actual}")]
    WidthMismatch { expected: u32, actual: u32 },

    #[error("sample count mismatch: width {width} needs {expected} samples, header says {actual}")]
    SampleCountMismatch { width: u32, expected: u64, actual: u64 },
}
