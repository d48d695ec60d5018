//! Frozen start-of-firing view of the fluid grid.
//!
//! The compute pass only ever reads sibling cells through this view, so the order cells are
//! visited in cannot change what any of them sees. Terrain lookups are memoised because the same
//! positions are probed by up to six neighbours.

use std::cell::RefCell;

use rainvox_utils::BlockPos;
use rustc_hash::FxHashMap;

use crate::cell::Phase;
use crate::level::FluidLevel;
use crate::world::WorldQuery;

/// What a neighbour can see of a cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellView {
    /// Phase at capture time.
    pub phase: Phase,
    /// Volume at capture time.
    pub volume: f32,
}

/// Immutable copy of phase and volume of every cell, plus a terrain cache.
#[derive(Debug)]
pub struct TickSnapshot {
    cells: FxHashMap<BlockPos, CellView>,
    /// Cache for terrain solidity by position
    terrain_cache: RefCell<FxHashMap<BlockPos, bool>>,
    min_y: i32,
    max_y: i32,
    full_volume: f32,
}

impl TickSnapshot {
    /// Captures the level as it is now.
    ///
    /// `full_volume` is the volume at which a water cell counts as support for cells above it.
    #[must_use]
    pub fn capture<W: WorldQuery + ?Sized>(level: &FluidLevel, world: &W, full_volume: f32) -> Self {
        let cells = level
            .iter()
            .map(|(pos, cell)| {
                (
                    pos,
                    CellView {
                        phase: cell.phase,
                        volume: cell.volume(),
                    },
                )
            })
            .collect();
        Self {
            cells,
            terrain_cache: RefCell::new(FxHashMap::default()),
            min_y: world.min_build_height(),
            max_y: world.max_build_height(),
            full_volume,
        }
    }

    /// The captured cell at `pos`.
    #[must_use]
    pub fn cell(&self, pos: BlockPos) -> Option<CellView> {
        self.cells.get(&pos).copied()
    }

    /// The captured phase at `pos`.
    #[must_use]
    pub fn phase_at(&self, pos: BlockPos) -> Option<Phase> {
        self.cells.get(&pos).map(|view| view.phase)
    }

    /// Number of captured cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Captured volume at `pos`, zero when empty.
    #[must_use]
    pub fn volume_at(&self, pos: BlockPos) -> f32 {
        self.cells.get(&pos).map_or(0.0, |view| view.volume)
    }

    /// Whether terrain is solid at `pos`, with caching.
    pub fn is_terrain<W: WorldQuery + ?Sized>(&self, world: &W, pos: BlockPos) -> bool {
        *self
            .terrain_cache
            .borrow_mut()
            .entry(pos)
            .or_insert_with(|| world.is_solid(pos))
    }

    /// Whether `pos` is terrain or outside the build range.
    pub fn is_blocked<W: WorldQuery + ?Sized>(&self, world: &W, pos: BlockPos) -> bool {
        pos.y() < self.min_y || pos.y() >= self.max_y || self.is_terrain(world, pos)
    }

    /// Whether anything, fluid or terrain, occupies `pos`.
    pub fn is_occupied<W: WorldQuery + ?Sized>(&self, world: &W, pos: BlockPos) -> bool {
        self.cells.contains_key(&pos) || self.is_blocked(world, pos)
    }

    /// Whether `pos` is free for a cell to move or spill into.
    pub fn is_vacant<W: WorldQuery + ?Sized>(&self, world: &W, pos: BlockPos) -> bool {
        !self.is_occupied(world, pos)
    }

    /// Whether something at `pos` can hold a cell resting on top of it.
    ///
    /// Terrain, the bottom of the world, and every non-water cell except steam support. Water
    /// only supports once it is full.
    pub fn supports<W: WorldQuery + ?Sized>(&self, world: &W, pos: BlockPos) -> bool {
        match self.cells.get(&pos) {
            Some(view) => match view.phase {
                Phase::Water => view.volume >= self.full_volume,
                Phase::Steam => false,
                Phase::Ice | Phase::Snow | Phase::Hail => true,
            },
            None => self.is_blocked(world, pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::FluidCell;
    use crate::world::SimpleWorld;

    #[test]
    fn test_snapshot_is_frozen() {
        let world = SimpleWorld::new(0).with_floor(0);
        let mut level = FluidLevel::new();
        let pos = BlockPos::new(0, 1, 0);
        level.place_cell(pos, FluidCell::water(pos));

        let snapshot = TickSnapshot::capture(&level, &world, 0.99);
        level.clear_cell(pos);
        level.place_cell(pos.above(), FluidCell::water(pos.above()));

        assert_eq!(snapshot.phase_at(pos), Some(Phase::Water));
        assert!(snapshot.cell(pos.above()).is_none());
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_support_rules() {
        let world = SimpleWorld::new(0).with_floor(0);
        let mut level = FluidLevel::new();
        let full = BlockPos::new(0, 1, 0);
        let half = BlockPos::new(1, 1, 0);
        let steam = BlockPos::new(2, 1, 0);
        let snow = BlockPos::new(3, 1, 0);
        level.place_cell(full, FluidCell::water(full));
        level.place_cell(half, FluidCell::new(Phase::Water, 0.5, half));
        level.place_cell(steam, FluidCell::new(Phase::Steam, 1.0, steam));
        level.place_cell(snow, FluidCell::new(Phase::Snow, 0.3, snow));

        let snapshot = TickSnapshot::capture(&level, &world, 0.99);
        assert!(snapshot.supports(&world, full));
        assert!(!snapshot.supports(&world, half));
        assert!(!snapshot.supports(&world, steam));
        assert!(snapshot.supports(&world, snow));
        assert!(snapshot.supports(&world, BlockPos::new(9, 0, 9)), "floor");
        assert!(!snapshot.supports(&world, BlockPos::new(9, 1, 9)), "air");
    }

    #[test]
    fn test_build_range_blocks() {
        let world = SimpleWorld::new(0).with_height(0, 8);
        let snapshot = TickSnapshot::capture(&FluidLevel::new(), &world, 0.99);
        assert!(snapshot.is_blocked(&world, BlockPos::new(0, -1, 0)));
        assert!(snapshot.is_blocked(&world, BlockPos::new(0, 8, 0)));
        assert!(snapshot.is_vacant(&world, BlockPos::new(0, 7, 0)));
    }
}
