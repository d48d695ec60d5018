//! Error types for the fallible edges of the simulation: config files and saved data.
//!
//! Ticking itself never fails. Inconsistent state found mid-tick is healed and logged instead.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to load or validate a [`crate::config::SimulationConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read or written.
    #[error("could not access config file {path}: {source}")]
    Io {
        /// File that was being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The file is not valid json5 for the config schema.
    #[error("could not parse config: {0}")]
    Parse(#[from] serde_json5::Error),
    /// A value is outside its accepted range.
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

/// A saved NBT record is missing a tag or holds the wrong tag type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NbtLoadError {
    /// A required tag is absent.
    #[error("missing tag `{0}`")]
    MissingTag(&'static str),
    /// The tag exists but has an unexpected type.
    #[error("tag `{0}` has the wrong type")]
    WrongType(&'static str),
}

/// Failure in the persistence substrate.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The stored record could not be decoded.
    #[error("saved data `{name}` of world `{world}` is corrupt: {source}")]
    Corrupt {
        /// World the record belongs to.
        world: String,
        /// Data name of the record.
        name: String,
        /// What was wrong with it.
        #[source]
        source: NbtLoadError,
    },
    /// The backing store refused the operation.
    #[error("storage backend error: {0}")]
    Backend(#[from] io::Error),
}
