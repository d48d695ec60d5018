//! Persistence of per-world saved data.
//!
//! The simulation stores two named compounds per world: the fluid index and the cell records.
//! Backends only move opaque NBT compounds around.

mod ram_only;

pub use ram_only::RamOnlyStorage;

use simdnbt::owned::NbtCompound;

use crate::error::StorageError;

/// A named-record store keyed by world and record name.
pub trait SavedDataStorage {
    /// Loads a record, or `None` if it was never saved.
    ///
    /// # Errors
    /// Returns an error if the backend fails to read the record.
    fn load(&self, world: &str, name: &str) -> Result<Option<NbtCompound>, StorageError>;

    /// Stores a record, replacing any previous one.
    ///
    /// # Errors
    /// Returns an error if the backend fails to write the record.
    fn save(&mut self, world: &str, name: &str, data: NbtCompound) -> Result<(), StorageError>;
}
