//! Bounded pool of GPU-uploadable terrain islands
//!
//! The pool owns a fixed arena of slots, allocated once and reused forever.
//! `request_island` never blocks the frame loop: a resident tile is touched
//! and returned, a missing tile evicts the least-recently-used unpinned slot
//! and hands the load to the background streamer. Slots touched during the
//! current frame are pinned and can never be eviction victims, even when
//! their recency stamp is stale.

use std::ops::Deref;
use std::sync::Arc;

use parking_lot::MappedMutexGuard;
use rustc_hash::FxHashMap;

use crate::error::PoolError;
use crate::terrain::streamer::{QueuePolicy, SlotCell, StreamRequest, TerrainStreamer};
use crate::terrain::tile::{IslandGeometry, TileId};

/// Index of a slot in the pool arena
pub type SlotId = usize;

/// Main-thread bookkeeping for one slot. The geometry itself lives in the
/// slot's shared `SlotCell`.
struct SlotMeta {
    tile: Option<TileId>,
    mru: u64,
    used_this_frame: bool,
    generation: u64,
}

/// Borrowed view of a loaded island's geometry
pub struct IslandRef<'a>(MappedMutexGuard<'a, IslandGeometry>);

impl Deref for IslandRef<'_> {
    type Target = IslandGeometry;

    fn deref(&self) -> &IslandGeometry {
        &self.0
    }
}

pub struct TerrainPool {
    slots: Vec<SlotMeta>,
    cells: Vec<Arc<SlotCell>>,
    resident: FxHashMap<TileId, SlotId>,
    mru_clock: u64,
    streamer: TerrainStreamer,
}

impl TerrainPool {
    /// Create a pool with a fixed slot count. Slots are never freed or
    /// reallocated after this point.
    pub fn new(capacity: usize, streamer: TerrainStreamer) -> Self {
        assert!(capacity > 0, "island pool needs at least one slot");
        TerrainPool {
            slots: (0..capacity)
                .map(|_| SlotMeta {
                    tile: None,
                    mru: 0,
                    used_this_frame: false,
                    generation: 0,
                })
                .collect(),
            cells: (0..capacity).map(|_| Arc::new(SlotCell::new())).collect(),
            resident: FxHashMap::default(),
            mru_clock: 0,
            streamer,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn resident_count(&self) -> usize {
        self.resident.len()
    }

    /// Number of resident islands whose geometry has finished loading
    pub fn loaded_count(&self) -> usize {
        self.resident
            .values()
            .filter(|&&slot| self.cells[slot].is_loaded())
            .count()
    }

    pub fn streamer(&self) -> &TerrainStreamer {
        &self.streamer
    }

    /// True if the tile is resident, loaded or still in flight
    pub fn contains(&self, tile: &TileId) -> bool {
        self.resident.contains_key(tile)
    }

    /// Return the slot holding `tile`, starting an asynchronous load if it
    /// is not resident. Never blocks on I/O; under `QueuePolicy::Block` the
    /// queue push may wait for a free entry.
    pub fn request_island(&mut self, tile: TileId) -> Result<SlotId, PoolError> {
        if let Some(&slot) = self.resident.get(&tile) {
            self.touch_slot(slot);
            return Ok(slot);
        }

        let victim = self.pick_victim().ok_or(PoolError::PoolExhausted {
            capacity: self.slots.len(),
        })?;

        // Check saturation before mutating anything, so a rejected request
        // leaves the pool untouched. The main thread is the only producer,
        // which makes this check authoritative.
        if self.streamer.policy() == QueuePolicy::Reject && self.streamer.is_saturated() {
            return Err(PoolError::QueueSaturated);
        }

        if let Some(old) = self.slots[victim].tile.take() {
            self.resident.remove(&old);
            tracing::trace!("Evicting island {} from slot {}", old, victim);
        }

        let generation = self.cells[victim].retire();
        self.slots[victim].tile = Some(tile);
        self.slots[victim].generation = generation;
        self.touch_slot(victim);
        self.resident.insert(tile, victim);

        // The queue was pre-checked above; a failure here means the worker
        // is gone, and the slot simply stays unloaded until evicted.
        self.streamer.submit(StreamRequest {
            tile,
            slot: victim,
            generation,
            cell: Arc::clone(&self.cells[victim]),
        })?;

        Ok(victim)
    }

    /// Non-blocking read of a loaded island. Returns None while the load is
    /// in flight, after a load failure, or when the slot no longer holds
    /// the tile the caller asked for.
    pub fn get_island(&self, slot: SlotId, tile: TileId) -> Option<IslandRef<'_>> {
        let meta = self.slots.get(slot)?;
        if meta.tile != Some(tile) {
            return None;
        }
        self.cells[slot].try_read(meta.generation).map(IslandRef)
    }

    /// Refresh recency and pin the tile for this frame without loading.
    /// Used to keep coarser LOD parents alive. Returns false if the tile is
    /// not resident.
    pub fn touch_island(&mut self, tile: TileId) -> bool {
        match self.resident.get(&tile) {
            Some(&slot) => {
                self.touch_slot(slot);
                true
            }
            None => false,
        }
    }

    /// End-of-frame maintenance: clears every slot's pin so next frame's
    /// touches start fresh. Call once per frame after all requests and
    /// touches have been issued.
    pub fn update_island_pool(&mut self) {
        for meta in &mut self.slots {
            meta.used_this_frame = false;
        }
    }

    fn touch_slot(&mut self, slot: SlotId) {
        self.mru_clock += 1;
        let meta = &mut self.slots[slot];
        meta.mru = self.mru_clock;
        meta.used_this_frame = true;
    }

    /// Lowest MRU stamp among unpinned slots, lowest index on ties. Empty
    /// slots carry stamp 0 and are claimed first.
    fn pick_victim(&self) -> Option<SlotId> {
        let mut best: Option<(u64, SlotId)> = None;
        for (slot, meta) in self.slots.iter().enumerate() {
            if meta.used_this_frame {
                continue;
            }
            if best.is_none_or(|(mru, _)| meta.mru < mru) {
                best = Some((meta.mru, slot));
            }
        }
        best.map(|(_, slot)| slot)
    }
}
