//! Background terrain streaming
//!
//! One dedicated worker thread pulls `StreamRequest`s from a bounded
//! crossbeam channel in FIFO order, loads the tile's heightmap through a
//! `TileSource`, and writes the finished vertex grid straight into the
//! request's shared `SlotCell`. The channel only ever carries requests,
//! never geometry.
//!
//! A request is never cancelled: if the pool reassigns the slot before the
//! load finishes, the slot's generation no longer matches and the worker
//! drops the result instead of installing it.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded};
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use serde::{Deserialize, Serialize};

use crate::error::{PoolError, TileFileError};
use crate::terrain::tile::{IslandGeometry, TileId};
use crate::tile_file::{read_heightmap_file, tile_file_name};

/// What to do when the request queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QueuePolicy {
    /// Surface `PoolError::QueueSaturated` to the caller
    #[default]
    Reject,
    /// Block the caller until the worker frees a queue entry
    Block,
}

/// Source of raw tile heightmaps; the seam between the streamer and storage
pub trait TileSource: Send + 'static {
    fn sample_width(&self) -> u32;

    /// Blocking load of the full heightmap for one top-level tile
    fn load_samples(&self, tile_x: i32, tile_y: i32) -> Result<Vec<f32>, TileFileError>;
}

/// Reads tile heightmap files from a directory
pub struct DiskTiles {
    dir: PathBuf,
    width: u32,
}

impl DiskTiles {
    pub fn new<P: Into<PathBuf>>(dir: P, width: u32) -> Self {
        DiskTiles {
            dir: dir.into(),
            width,
        }
    }
}

impl TileSource for DiskTiles {
    fn sample_width(&self) -> u32 {
        self.width
    }

    fn load_samples(&self, tile_x: i32, tile_y: i32) -> Result<Vec<f32>, TileFileError> {
        read_heightmap_file(self.dir.join(tile_file_name(tile_x, tile_y)), self.width)
    }
}

struct SlotState {
    generation: u64,
    geometry: IslandGeometry,
}

/// Shared half of one pool slot: the geometry buffer plus the loaded flag.
///
/// The worker thread writes geometry under the lock and publishes `loaded`
/// with release ordering; the main thread checks the flag with acquire
/// ordering before touching the geometry. Generation changes and `loaded`
/// stores both happen inside the lock, so a retired request can never mark
/// a reassigned slot as loaded.
pub struct SlotCell {
    state: Mutex<SlotState>,
    loaded: AtomicBool,
}

impl SlotCell {
    pub fn new() -> Self {
        SlotCell {
            state: Mutex::new(SlotState {
                generation: 0,
                geometry: IslandGeometry::empty(),
            }),
            loaded: AtomicBool::new(false),
        }
    }

    /// Non-blocking check; true only after a full geometry publish
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Invalidate the slot for reassignment; returns the new generation.
    /// Any in-flight load for an older generation becomes a dead letter.
    pub(crate) fn retire(&self) -> u64 {
        let mut state = self.state.lock();
        state.generation += 1;
        self.loaded.store(false, Ordering::Release);
        state.generation
    }

    /// Geometry access for the expected generation, or None if the slot is
    /// not loaded or was reassigned since the caller's request.
    pub(crate) fn try_read(&self, generation: u64) -> Option<MappedMutexGuard<'_, IslandGeometry>> {
        if !self.is_loaded() {
            return None;
        }
        let state = self.state.lock();
        if state.generation != generation || !self.is_loaded() {
            return None;
        }
        Some(MutexGuard::map(state, |s| &mut s.geometry))
    }

    /// Worker-side install: rebuild the geometry and publish `loaded`, but
    /// only if the request's generation is still current.
    fn install(&self, generation: u64, build: impl FnOnce(&mut IslandGeometry)) -> bool {
        let mut state = self.state.lock();
        if state.generation != generation {
            return false;
        }
        build(&mut state.geometry);
        self.loaded.store(true, Ordering::Release);
        true
    }
}

/// One queued load: tile identity plus the destination slot
pub struct StreamRequest {
    pub tile: TileId,
    pub slot: usize,
    pub generation: u64,
    pub cell: Arc<SlotCell>,
}

/// Owns the worker thread and the bounded request queue
pub struct TerrainStreamer {
    request_tx: Option<Sender<StreamRequest>>,
    worker: Option<JoinHandle<()>>,
    policy: QueuePolicy,
    queue_capacity: usize,
}

impl TerrainStreamer {
    pub fn new<S: TileSource>(source: S, queue_capacity: usize, policy: QueuePolicy) -> Self {
        let (request_tx, request_rx) = bounded::<StreamRequest>(queue_capacity);

        let worker = thread::Builder::new()
            .name("terrain-stream".to_string())
            .spawn(move || worker_loop(source, request_rx))
            .expect("Failed to spawn terrain streaming worker");

        TerrainStreamer {
            request_tx: Some(request_tx),
            worker: Some(worker),
            policy,
            queue_capacity,
        }
    }

    pub fn policy(&self) -> QueuePolicy {
        self.policy
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Number of requests currently waiting in the queue
    pub fn queued(&self) -> usize {
        self.request_tx.as_ref().map_or(0, |tx| tx.len())
    }

    /// True when a `Reject`-policy submit would fail. The main thread is
    /// the only producer, so a false result cannot turn stale before the
    /// matching `submit`.
    pub fn is_saturated(&self) -> bool {
        self.request_tx.as_ref().map_or(true, |tx| tx.is_full())
    }

    pub(crate) fn submit(&self, request: StreamRequest) -> Result<(), PoolError> {
        let tx = self.request_tx.as_ref().ok_or(PoolError::QueueSaturated)?;
        match self.policy {
            QueuePolicy::Block => tx.send(request).map_err(|_| PoolError::QueueSaturated),
            QueuePolicy::Reject => tx.try_send(request).map_err(|_| PoolError::QueueSaturated),
        }
    }
}

impl Drop for TerrainStreamer {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain and exit
        self.request_tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_loop<S: TileSource>(source: S, request_rx: Receiver<StreamRequest>) {
    let width = source.sample_width() as usize;

    while let Ok(request) = request_rx.recv() {
        match source.load_samples(request.tile.tile_x, request.tile.tile_y) {
            Ok(samples) => {
                // A window that doesn't fit the heightmap is treated like
                // any other load failure: the slot stays unloaded and the
                // worker lives on
                if samples.len() != width * width || !request.tile.fits_sample_grid(width) {
                    tracing::warn!(
                        "Discarding island {}: window does not fit a width-{} heightmap",
                        request.tile,
                        width
                    );
                    continue;
                }
                let installed = request.cell.install(request.generation, |geometry| {
                    geometry.rebuild(&samples, width, request.tile);
                });
                if installed {
                    tracing::debug!("Streamed island {} into slot {}", request.tile, request.slot);
                } else {
                    tracing::trace!(
                        "Dropping stale load for island {} (slot {} was reassigned)",
                        request.tile,
                        request.slot
                    );
                }
            }
            Err(err) => {
                // No retry; the slot stays unloaded until eviction reclaims it
                tracing::warn!("Failed to load island {}: {}", request.tile, err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ISLAND_VERTS;
    use crate::tile_file::write_heightmap_file;
    use std::time::{Duration, Instant};

    const TEST_WIDTH: u32 = 17;

    fn wait_for<F: Fn() -> bool>(condition: F) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "timed out waiting for streamer");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_streams_island_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let samples = vec![5.0f32; (TEST_WIDTH * TEST_WIDTH) as usize];
        write_heightmap_file(dir.path().join(tile_file_name(0, 0)), TEST_WIDTH, &samples).unwrap();

        let streamer = TerrainStreamer::new(
            DiskTiles::new(dir.path(), TEST_WIDTH),
            8,
            QueuePolicy::Reject,
        );

        let cell = Arc::new(SlotCell::new());
        let generation = cell.retire();
        streamer
            .submit(StreamRequest {
                tile: TileId::root(0, 0),
                slot: 0,
                generation,
                cell: Arc::clone(&cell),
            })
            .unwrap();

        wait_for(|| cell.is_loaded());
        let geometry = cell.try_read(generation).unwrap();
        assert_eq!(geometry.vertex_count(), ISLAND_VERTS * ISLAND_VERTS);
        assert_eq!(geometry.vertices()[0].position[1], 5.0);
    }

    #[test]
    fn test_missing_file_leaves_slot_unloaded() {
        let dir = tempfile::tempdir().unwrap();
        // Write only tile (1, 1) so tile (0, 0) fails, then use (1, 1) as a
        // barrier proving the failed request was fully processed first.
        let samples = vec![1.0f32; (TEST_WIDTH * TEST_WIDTH) as usize];
        write_heightmap_file(dir.path().join(tile_file_name(1, 1)), TEST_WIDTH, &samples).unwrap();

        let streamer = TerrainStreamer::new(
            DiskTiles::new(dir.path(), TEST_WIDTH),
            8,
            QueuePolicy::Reject,
        );

        let missing = Arc::new(SlotCell::new());
        let barrier = Arc::new(SlotCell::new());
        streamer
            .submit(StreamRequest {
                tile: TileId::root(0, 0),
                slot: 0,
                generation: missing.retire(),
                cell: Arc::clone(&missing),
            })
            .unwrap();
        streamer
            .submit(StreamRequest {
                tile: TileId::root(1, 1),
                slot: 1,
                generation: barrier.retire(),
                cell: Arc::clone(&barrier),
            })
            .unwrap();

        wait_for(|| barrier.is_loaded());
        assert!(!missing.is_loaded());
    }

    #[test]
    fn test_malformed_window_does_not_kill_worker() {
        let dir = tempfile::tempdir().unwrap();
        let samples = vec![3.0f32; (TEST_WIDTH * TEST_WIDTH) as usize];
        write_heightmap_file(dir.path().join(tile_file_name(0, 0)), TEST_WIDTH, &samples).unwrap();

        let streamer = TerrainStreamer::new(
            DiskTiles::new(dir.path(), TEST_WIDTH),
            8,
            QueuePolicy::Reject,
        );

        // The tile file exists, but the node coordinates lie outside the
        // depth-0 grid; the worker must discard the load instead of
        // panicking on the sample window
        let bad = Arc::new(SlotCell::new());
        streamer
            .submit(StreamRequest {
                tile: TileId::new(0, 0, 0, 9, 9),
                slot: 0,
                generation: bad.retire(),
                cell: Arc::clone(&bad),
            })
            .unwrap();

        // A well-formed follow-up request proves the worker is still alive
        let good = Arc::new(SlotCell::new());
        streamer
            .submit(StreamRequest {
                tile: TileId::root(0, 0),
                slot: 1,
                generation: good.retire(),
                cell: Arc::clone(&good),
            })
            .unwrap();

        wait_for(|| good.is_loaded());
        assert!(!bad.is_loaded());
    }

    #[test]
    fn test_stale_generation_is_dropped() {
        let cell = SlotCell::new();
        let old = cell.retire();
        let current = cell.retire();

        assert!(!cell.install(old, |_| panic!("stale build must not run")));
        assert!(!cell.is_loaded());

        assert!(cell.install(current, |_| {}));
        assert!(cell.is_loaded());
        assert!(cell.try_read(old).is_none());
        assert!(cell.try_read(current).is_some());
    }

    #[test]
    fn test_retire_clears_loaded() {
        let cell = SlotCell::new();
        let generation = cell.retire();
        assert!(cell.install(generation, |_| {}));
        assert!(cell.is_loaded());

        cell.retire();
        assert!(!cell.is_loaded());
    }

    #[test]
    fn test_reject_policy_reports_saturation() {
        // A source that blocks on a gate keeps the queue full until the
        // test releases it (by dropping the sender at the end)
        struct GatedTiles {
            gate: crossbeam_channel::Receiver<()>,
        }
        impl TileSource for GatedTiles {
            fn sample_width(&self) -> u32 {
                TEST_WIDTH
            }
            fn load_samples(&self, _: i32, _: i32) -> Result<Vec<f32>, TileFileError> {
                let _ = self.gate.recv();
                Err(TileFileError::BadMagic)
            }
        }

        let (gate_tx, gate_rx) = crossbeam_channel::unbounded::<()>();
        let streamer = TerrainStreamer::new(GatedTiles { gate: gate_rx }, 1, QueuePolicy::Reject);
        let submit = |tile_y: i32| {
            let cell = Arc::new(SlotCell::new());
            streamer.submit(StreamRequest {
                tile: TileId::root(0, tile_y),
                slot: 0,
                generation: cell.retire(),
                cell,
            })
        };

        // First request may be picked up immediately; keep pushing until the
        // queue itself is full, which must happen within capacity + 1 pushes.
        assert!(submit(0).is_ok());
        let second = submit(1);
        if second.is_ok() {
            wait_for(|| streamer.is_saturated());
            assert_eq!(submit(2), Err(PoolError::QueueSaturated));
        } else {
            assert_eq!(second, Err(PoolError::QueueSaturated));
        }

        // Release the worker so Drop can join it
        drop(gate_tx);
    }
}
