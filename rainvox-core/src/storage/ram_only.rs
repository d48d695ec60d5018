//! RAM-only saved data storage.
//!
//! Keeps records in memory. Useful for tests and for throwaway worlds.

use std::io;

use rustc_hash::FxHashMap;
use simdnbt::owned::NbtCompound;

use super::SavedDataStorage;
use crate::error::StorageError;

/// In-memory record storage.
#[derive(Debug, Clone, Default)]
pub struct RamOnlyStorage {
    records: FxHashMap<(String, String), NbtCompound>,
    /// Number of writes accepted.
    saves: usize,
    /// If true, writes fail.
    read_only: bool,
}

impl RamOnlyStorage {
    /// Creates an empty, writable storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a storage that rejects every write.
    #[must_use]
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::default()
        }
    }

    /// Number of writes accepted so far.
    #[must_use]
    pub const fn saves(&self) -> usize {
        self.saves
    }

    /// Whether a record exists.
    #[must_use]
    pub fn contains(&self, world: &str, name: &str) -> bool {
        self.records.contains_key(&(world.to_owned(), name.to_owned()))
    }

    /// Stores a record directly, bypassing the write counter.
    pub fn insert(&mut self, world: &str, name: &str, data: NbtCompound) {
        self.records.insert((world.to_owned(), name.to_owned()), data);
    }
}

impl SavedDataStorage for RamOnlyStorage {
    fn load(&self, world: &str, name: &str) -> Result<Option<NbtCompound>, StorageError> {
        Ok(self.records.get(&(world.to_owned(), name.to_owned())).cloned())
    }

    fn save(&mut self, world: &str, name: &str, data: NbtCompound) -> Result<(), StorageError> {
        if self.read_only {
            return Err(StorageError::Backend(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "storage is read-only",
            )));
        }
        self.insert(world, name, data);
        self.saves += 1;
        Ok(())
    }
}
