// Wrapper types making it harder to accidentaly use the wrong underlying type.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::direction::Direction;
use crate::math::{Vector2, Vector3};

const PACKED_XZ_BITS: u32 = 26;
const PACKED_Y_BITS: u32 = 12;
const PACKED_XZ_MASK: i64 = (1 << PACKED_XZ_BITS) - 1;
const PACKED_Y_MASK: i64 = (1 << PACKED_Y_BITS) - 1;
const Z_OFFSET: u32 = PACKED_Y_BITS;
const X_OFFSET: u32 = PACKED_Y_BITS + PACKED_XZ_BITS;

/// A chunk column position (16x16 blocks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkPos(pub Vector2<i32>);

impl ChunkPos {
    /// Creates a chunk position from chunk coordinates.
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self(Vector2::new(x, z))
    }

    /// The chunk containing the given block.
    #[must_use]
    pub const fn from_block(pos: BlockPos) -> Self {
        Self::new(pos.0.x >> 4, pos.0.z >> 4)
    }
}

/// A block position on the integer grid.
///
/// Ordered by `x`, then `y`, then `z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos(pub Vector3<i32>);

impl BlockPos {
    /// The origin.
    pub const ZERO: Self = Self::new(0, 0, 0);

    /// Creates a new block position.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self(Vector3::new(x, y, z))
    }

    /// The x coordinate.
    #[must_use]
    pub const fn x(self) -> i32 {
        self.0.x
    }

    /// The y coordinate.
    #[must_use]
    pub const fn y(self) -> i32 {
        self.0.y
    }

    /// The z coordinate.
    #[must_use]
    pub const fn z(self) -> i32 {
        self.0.z
    }

    /// Returns this position moved by the given deltas.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.0.x + dx, self.0.y + dy, self.0.z + dz)
    }

    /// The position directly above.
    #[must_use]
    pub const fn above(self) -> Self {
        self.offset(0, 1, 0)
    }

    /// The position directly below.
    #[must_use]
    pub const fn below(self) -> Self {
        self.offset(0, -1, 0)
    }

    /// The neighbouring position in `direction`.
    #[must_use]
    pub const fn relative(self, direction: Direction) -> Self {
        let (dx, dy, dz) = direction.offset();
        self.offset(dx, dy, dz)
    }

    /// The chunk this position falls in.
    #[must_use]
    pub const fn chunk_pos(self) -> ChunkPos {
        ChunkPos::from_block(self)
    }

    /// Packs the position into a single `i64` (26 bits x, 12 bits y, 26 bits z).
    #[must_use]
    pub const fn as_long(self) -> i64 {
        ((self.0.x as i64 & PACKED_XZ_MASK) << X_OFFSET)
            | ((self.0.z as i64 & PACKED_XZ_MASK) << Z_OFFSET)
            | (self.0.y as i64 & PACKED_Y_MASK)
    }

    /// Inverse of [`BlockPos::as_long`].
    #[must_use]
    pub const fn from_long(packed: i64) -> Self {
        let x = packed >> X_OFFSET;
        let y = (packed << (64 - PACKED_Y_BITS)) >> (64 - PACKED_Y_BITS);
        let z = (packed << (64 - X_OFFSET)) >> (64 - PACKED_XZ_BITS);
        Self::new(x as i32, y as i32, z as i32)
    }
}

impl Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.0.x, self.0.y, self.0.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_long_keeps_sign() {
        for pos in [
            BlockPos::new(0, 0, 0),
            BlockPos::new(-1, -64, -1),
            BlockPos::new(30_000_000, 319, -30_000_000),
            BlockPos::new(-123, 7, 456),
        ] {
            assert_eq!(BlockPos::from_long(pos.as_long()), pos, "packing {pos}");
        }
    }

    #[test]
    fn test_chunk_pos_floors_negative_coordinates() {
        assert_eq!(BlockPos::new(-1, 0, 15).chunk_pos(), ChunkPos::new(-1, 0));
        assert_eq!(BlockPos::new(16, 0, -17).chunk_pos(), ChunkPos::new(1, -2));
    }

    #[test]
    fn test_neighbours() {
        let pos = BlockPos::new(3, 10, -2);
        assert_eq!(pos.above(), BlockPos::new(3, 11, -2));
        assert_eq!(pos.below(), BlockPos::new(3, 9, -2));
        assert_eq!(pos.relative(Direction::East), BlockPos::new(4, 10, -2));
    }
}
