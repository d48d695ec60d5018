//! The fluid index: every grid position that currently holds a fluid cell, plus the weather
//! counter.
//!
//! Positions are bucketed per chunk column like the host world's tick containers. The index is
//! world scoped saved data, so every effective mutation marks it dirty.

use rainvox_utils::{BlockPos, ChunkPos};
use rustc_hash::{FxHashMap, FxHashSet};
use simdnbt::owned::{NbtCompound, NbtList, NbtTag};

use crate::error::NbtLoadError;
use crate::nbt::{nbt_i32, read_pos, require_compounds, write_pos};

/// Data name under which the index is saved.
pub const DATA_NAME: &str = "rainvox_fluid_index";

/// Sparse set of active fluid positions.
#[derive(Debug, Default)]
pub struct FluidIndex {
    /// Positions bucketed by chunk. Empty buckets are removed.
    chunks: FxHashMap<ChunkPos, FxHashSet<BlockPos>>,
    len: usize,
    weather_counter: i32,
    dirty: bool,
}

impl FluidIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a position. Adding a present position is a no-op.
    pub fn add(&mut self, pos: BlockPos) -> bool {
        let added = self.chunks.entry(pos.chunk_pos()).or_default().insert(pos);
        if added {
            self.len += 1;
            self.dirty = true;
        }
        added
    }

    /// Removes a position. Removing an absent position is a no-op.
    pub fn remove(&mut self, pos: BlockPos) -> bool {
        let chunk = pos.chunk_pos();
        let Some(bucket) = self.chunks.get_mut(&chunk) else {
            return false;
        };
        if !bucket.remove(&pos) {
            return false;
        }
        if bucket.is_empty() {
            self.chunks.remove(&chunk);
        }
        self.len -= 1;
        self.dirty = true;
        true
    }

    /// Whether `pos` is indexed.
    #[must_use]
    pub fn contains(&self, pos: BlockPos) -> bool {
        self.chunks
            .get(&pos.chunk_pos())
            .is_some_and(|bucket| bucket.contains(&pos))
    }

    /// A snapshot of all positions. Later mutation does not affect the returned list.
    #[must_use]
    pub fn list(&self) -> Vec<BlockPos> {
        let mut out = Vec::with_capacity(self.len);
        for bucket in self.chunks.values() {
            out.extend(bucket.iter().copied());
        }
        out
    }

    /// Positions inside one chunk column.
    pub fn in_chunk(&self, chunk: ChunkPos) -> impl Iterator<Item = BlockPos> + '_ {
        self.chunks.get(&chunk).into_iter().flatten().copied()
    }

    /// Number of chunk columns with at least one position.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Number of indexed positions.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if nothing is indexed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the current weather counter, then increments it.
    pub fn next_weather_counter(&mut self) -> i32 {
        let current = self.weather_counter;
        self.weather_counter = current.saturating_add(1);
        self.dirty = true;
        current
    }

    /// Resets the weather counter to zero.
    pub fn reset_weather_counter(&mut self) {
        if self.weather_counter != 0 {
            self.weather_counter = 0;
            self.dirty = true;
        }
    }

    /// The counter without advancing it.
    #[must_use]
    pub const fn weather_counter(&self) -> i32 {
        self.weather_counter
    }

    /// Whether there are changes not yet flushed to storage.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clears the dirty flag after a successful save.
    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    /// Serializes the index. Positions are written in sorted order so saves are stable.
    #[must_use]
    pub fn save(&self) -> NbtCompound {
        let mut positions = self.list();
        positions.sort_unstable();
        let entries: Vec<NbtCompound> = positions
            .into_iter()
            .map(|pos| {
                let mut entry = NbtCompound::new();
                write_pos(&mut entry, pos);
                entry
            })
            .collect();

        let mut nbt = NbtCompound::new();
        nbt.insert("WeatherTickCounter", NbtTag::Int(self.weather_counter));
        nbt.insert("Positions", NbtList::Compound(entries));
        nbt
    }

    /// Restores an index saved with [`FluidIndex::save`]. The loaded index starts clean.
    pub fn load(nbt: &NbtCompound) -> Result<Self, NbtLoadError> {
        let mut index = Self::new();
        for entry in require_compounds(nbt, "Positions")? {
            index.add(read_pos(entry)?);
        }
        index.weather_counter = nbt
            .get("WeatherTickCounter")
            .and_then(nbt_i32)
            .unwrap_or(0)
            .max(0);
        index.dirty = false;
        Ok(index)
    }
}
