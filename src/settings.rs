//! Streaming configuration with file persistence

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::constants::*;
use crate::terrain::QueuePolicy;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StreamSettings {
    pub pool: PoolSettings,
    pub streamer: StreamerSettings,
    #[serde(default)]
    pub lod: LodSettings,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            pool: PoolSettings::default(),
            streamer: StreamerSettings::default(),
            lod: LodSettings::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PoolSettings {
    pub capacity: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_POOL_CAPACITY,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StreamerSettings {
    pub queue_capacity: usize,
    pub policy: QueuePolicy,
    pub data_dir: String,
}

impl Default for StreamerSettings {
    fn default() -> Self {
        Self {
            queue_capacity: STREAM_QUEUE_CAPACITY,
            policy: QueuePolicy::Reject,
            data_dir: DEFAULT_TILE_DIR.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LodSettings {
    pub max_depth: u8,
    pub leaf_range: f32,
}

impl Default for LodSettings {
    fn default() -> Self {
        Self {
            max_depth: MAX_TILE_DEPTH,
            leaf_range: DEFAULT_LEAF_RANGE,
        }
    }
}

pub fn save_settings<P: AsRef<Path>>(path: P, settings: &StreamSettings) -> bincode::Result<()> {
    let file = File::create(path).map_err(bincode::Error::from)?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, settings)?;
    Ok(())
}

pub fn load_settings<P: AsRef<Path>>(path: P) -> bincode::Result<StreamSettings> {
    let file = File::open(path).map_err(bincode::Error::from)?;
    let mut reader = BufReader::new(file);
    let settings = bincode::deserialize_from(&mut reader)?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stream.cfg");

        let mut settings = StreamSettings::default();
        settings.pool.capacity = 12;
        settings.streamer.policy = QueuePolicy::Block;
        save_settings(&path, &settings).unwrap();

        let loaded = load_settings(&path).unwrap();
        assert_eq!(loaded.pool.capacity, 12);
        assert_eq!(loaded.streamer.policy, QueuePolicy::Block);
        assert_eq!(loaded.lod.max_depth, MAX_TILE_DEPTH);
    }
}
