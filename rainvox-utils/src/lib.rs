//! Shared primitives for the rainvox workspace: grid coordinates, directions and seeded randomness.

pub mod direction;
pub mod math;
pub mod random;
pub mod types;

pub use direction::Direction;
pub use types::{BlockPos, ChunkPos};
