//! The six axis directions of the voxel grid.

use crate::types::BlockPos;

/// Six axis-aligned directions.
///
/// Ordinals follow the host world's order (down, up, north, south, west, east).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// -Y
    Down = 0,
    /// +Y
    Up = 1,
    /// -Z
    North = 2,
    /// +Z
    South = 3,
    /// -X
    West = 4,
    /// +X
    East = 5,
}

impl Direction {
    /// All six directions in array form for iteration.
    pub const ALL: [Direction; 6] = [
        Direction::Down,
        Direction::Up,
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// The four horizontal directions.
    pub const HORIZONTAL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// Returns the opposite direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Down => Self::Up,
            Self::Up => Self::Down,
            Self::North => Self::South,
            Self::South => Self::North,
            Self::West => Self::East,
            Self::East => Self::West,
        }
    }

    /// Gets the offset in the given direction.
    ///
    /// Returns (dx, dy, dz) for this direction.
    #[must_use]
    pub const fn offset(self) -> (i32, i32, i32) {
        match self {
            Self::Down => (0, -1, 0),
            Self::Up => (0, 1, 0),
            Self::North => (0, 0, -1),
            Self::South => (0, 0, 1),
            Self::West => (-1, 0, 0),
            Self::East => (1, 0, 0),
        }
    }

    /// X component of the offset.
    #[must_use]
    pub const fn step_x(self) -> i32 {
        self.offset().0
    }

    /// Z component of the offset.
    #[must_use]
    pub const fn step_z(self) -> i32 {
        self.offset().2
    }

    /// Returns true for the four horizontal directions.
    #[must_use]
    pub const fn is_horizontal(self) -> bool {
        !matches!(self, Self::Down | Self::Up)
    }

    /// Finds the direction matching a unit offset, if any.
    #[must_use]
    pub fn from_delta(dx: i32, dy: i32, dz: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|dir| dir.offset() == (dx, dy, dz))
    }

    /// Returns a new `BlockPos` relative to the given position in this direction.
    #[must_use]
    pub const fn relative(self, pos: BlockPos) -> BlockPos {
        pos.relative(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinals() {
        assert_eq!(Direction::Down as u8, 0);
        assert_eq!(Direction::Up as u8, 1);
        assert_eq!(Direction::North as u8, 2);
        assert_eq!(Direction::South as u8, 3);
        assert_eq!(Direction::West as u8, 4);
        assert_eq!(Direction::East as u8, 5);
    }

    #[test]
    fn test_opposite() {
        for dir in Direction::ALL {
            assert_eq!(dir.opposite().opposite(), dir);
            let (x, y, z) = dir.offset();
            assert_eq!(dir.opposite().offset(), (-x, -y, -z));
        }
    }

    #[test]
    fn test_from_delta() {
        assert_eq!(Direction::from_delta(1, 0, 0), Some(Direction::East));
        assert_eq!(Direction::from_delta(0, -1, 0), Some(Direction::Down));
        assert_eq!(Direction::from_delta(1, 1, 0), None);
    }

    #[test]
    fn test_horizontal() {
        assert!(Direction::HORIZONTAL.iter().all(|d| d.is_horizontal()));
        assert!(!Direction::Up.is_horizontal());
        assert_eq!(Direction::West.step_x(), -1);
        assert_eq!(Direction::South.step_z(), 1);
    }
}
