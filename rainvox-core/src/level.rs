//! The sparse fluid grid and its index.
//!
//! [`FluidLevel`] is the only owner of both, and every placement or removal goes through it, so
//! a position is indexed exactly when it holds a cell.

use rainvox_utils::BlockPos;
use rustc_hash::FxHashMap;
use simdnbt::owned::{NbtCompound, NbtList};

use crate::cell::{FluidCell, Phase};
use crate::error::NbtLoadError;
use crate::index::FluidIndex;
use crate::nbt::{read_pos, require_compounds, write_pos};
use crate::world::WorldQuery;

/// Data name under which cell state is saved.
pub const CELLS_DATA_NAME: &str = "rainvox_fluid_cells";

/// All fluid cells of one world.
#[derive(Debug, Default)]
pub struct FluidLevel {
    cells: FxHashMap<BlockPos, FluidCell>,
    index: FluidIndex,
}

impl FluidLevel {
    /// Creates an empty level.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a cell, replacing and returning any cell already at `pos`.
    pub fn place_cell(&mut self, pos: BlockPos, cell: FluidCell) -> Option<FluidCell> {
        self.index.add(pos);
        self.cells.insert(pos, cell)
    }

    /// Removes the cell at `pos`.
    pub fn clear_cell(&mut self, pos: BlockPos) -> Option<FluidCell> {
        self.index.remove(pos);
        self.cells.remove(&pos)
    }

    /// Moves the cell at `from` to an empty `to`, recording `from` as its previous position.
    ///
    /// Returns false and leaves the level untouched if `from` is empty or `to` is taken.
    pub fn relocate(&mut self, from: BlockPos, to: BlockPos) -> bool {
        if from == to || self.cells.contains_key(&to) {
            return false;
        }
        let Some(mut cell) = self.clear_cell(from) else {
            return false;
        };
        cell.prev_pos = from;
        cell.next_pos = to;
        self.place_cell(to, cell);
        true
    }

    /// The cell at `pos`.
    #[must_use]
    pub fn cell(&self, pos: BlockPos) -> Option<&FluidCell> {
        self.cells.get(&pos)
    }

    /// The cell at `pos`, mutably.
    pub fn cell_mut(&mut self, pos: BlockPos) -> Option<&mut FluidCell> {
        self.cells.get_mut(&pos)
    }

    /// The phase of the cell at `pos`.
    #[must_use]
    pub fn phase_at(&self, pos: BlockPos) -> Option<Phase> {
        self.cells.get(&pos).map(|cell| cell.phase)
    }

    /// Whether `pos` holds a fluid cell.
    #[must_use]
    pub fn contains(&self, pos: BlockPos) -> bool {
        self.cells.contains_key(&pos)
    }

    /// Whether anything blocks `pos`: a fluid cell, terrain, or the edge of the build range.
    pub fn is_occupied<W: WorldQuery + ?Sized>(&self, pos: BlockPos, world: &W) -> bool {
        self.contains(pos) || !world.is_in_build_range(pos) || world.is_solid(pos)
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if there are no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterates over every cell in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (BlockPos, &FluidCell)> {
        self.cells.iter().map(|(pos, cell)| (*pos, cell))
    }

    /// Sum of all cell volumes.
    #[must_use]
    pub fn total_volume(&self) -> f32 {
        self.cells.values().map(FluidCell::volume).sum()
    }

    /// The active position index.
    #[must_use]
    pub const fn index(&self) -> &FluidIndex {
        &self.index
    }

    /// Returns the weather counter, then increments it.
    pub fn next_weather_counter(&mut self) -> i32 {
        self.index.next_weather_counter()
    }

    /// Resets the weather counter.
    pub fn reset_weather_counter(&mut self) {
        self.index.reset_weather_counter();
    }

    /// Drops an index entry that has no cell behind it. Returns true if one was dropped.
    pub fn forget_stale(&mut self, pos: BlockPos) -> bool {
        !self.cells.contains_key(&pos) && self.index.remove(pos)
    }

    /// Whether there is unsaved index state.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.index.is_dirty()
    }

    /// Clears the dirty flag after a save.
    pub fn mark_saved(&mut self) {
        self.index.mark_saved();
    }

    /// Positions where the grid and the index disagree, sorted. Empty when coherent.
    #[must_use]
    pub fn incoherent_positions(&self) -> Vec<BlockPos> {
        let mut out: Vec<BlockPos> = self
            .index
            .list()
            .into_iter()
            .filter(|pos| !self.cells.contains_key(pos))
            .collect();
        out.extend(self.cells.keys().filter(|pos| !self.index.contains(**pos)));
        out.sort_unstable();
        out
    }

    /// Serializes per-cell state, sorted by position.
    #[must_use]
    pub fn save_cells(&self) -> NbtCompound {
        let mut positions: Vec<BlockPos> = self.cells.keys().copied().collect();
        positions.sort_unstable();
        let entries: Vec<NbtCompound> = positions
            .into_iter()
            .filter_map(|pos| {
                let cell = self.cells.get(&pos)?;
                let mut entry = NbtCompound::new();
                write_pos(&mut entry, pos);
                cell.save_additional(&mut entry);
                Some(entry)
            })
            .collect();

        let mut nbt = NbtCompound::new();
        nbt.insert("Cells", NbtList::Compound(entries));
        nbt
    }

    /// Serializes the index.
    #[must_use]
    pub fn save_index(&self) -> NbtCompound {
        self.index.save()
    }

    /// Rebuilds a level from a saved index and, if present, saved cell state.
    ///
    /// Cells without an index entry are indexed. Index entries without a cell are kept and
    /// healed by the next firing.
    pub fn load(index: &NbtCompound, cells: Option<&NbtCompound>) -> Result<Self, NbtLoadError> {
        let mut level = Self {
            cells: FxHashMap::default(),
            index: FluidIndex::load(index)?,
        };
        let was_dirty = level.index.is_dirty();
        if let Some(cells) = cells {
            for entry in require_compounds(cells, "Cells")? {
                let pos = read_pos(entry)?;
                level.place_cell(pos, FluidCell::load_additional(entry, pos));
            }
        }
        if !was_dirty && level.index.is_dirty() {
            log::debug!("Indexed cells missing from the saved fluid index");
        }
        Ok(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::SimpleWorld;

    #[test]
    fn test_place_and_clear_keep_index_coherent() {
        let mut level = FluidLevel::new();
        let pos = BlockPos::new(0, 64, 0);
        assert!(level.place_cell(pos, FluidCell::water(pos)).is_none());
        assert!(level.index().contains(pos));
        assert!(level.place_cell(pos, FluidCell::water(pos)).is_some());
        assert_eq!(level.index().len(), 1);

        assert!(level.clear_cell(pos).is_some());
        assert!(!level.index().contains(pos));
        assert!(level.clear_cell(pos).is_none());
        assert!(level.incoherent_positions().is_empty());
    }

    #[test]
    fn test_relocate() {
        let mut level = FluidLevel::new();
        let from = BlockPos::new(0, 10, 0);
        let to = from.below();
        level.place_cell(from, FluidCell::water(from));
        level.place_cell(BlockPos::new(5, 5, 5), FluidCell::water(BlockPos::new(5, 5, 5)));

        assert!(level.relocate(from, to));
        assert!(!level.contains(from));
        assert_eq!(level.cell(to).map(|cell| cell.prev_pos), Some(from));
        assert!(!level.relocate(to, BlockPos::new(5, 5, 5)), "target is taken");
        assert!(!level.relocate(from, to), "source is empty");
        assert!(level.incoherent_positions().is_empty());
    }

    #[test]
    fn test_occupancy_includes_terrain_and_bounds() {
        let world = SimpleWorld::new(0).with_floor(0).with_height(-64, 320);
        let mut level = FluidLevel::new();
        let pos = BlockPos::new(0, 1, 0);
        assert!(!level.is_occupied(pos, &world));
        assert!(level.is_occupied(pos.below(), &world));
        assert!(level.is_occupied(BlockPos::new(0, 320, 0), &world));
        level.place_cell(pos, FluidCell::water(pos));
        assert!(level.is_occupied(pos, &world));
        assert_eq!(level.phase_at(pos), Some(Phase::Water));
    }

    #[test]
    fn test_save_and_load_level() {
        let mut level = FluidLevel::new();
        for x in 0..3 {
            let pos = BlockPos::new(x, 64, 0);
            level.place_cell(pos, FluidCell::new(Phase::Snow, 0.25 * (x + 1) as f32, pos));
        }
        level.next_weather_counter();

        let loaded = FluidLevel::load(&level.save_index(), Some(&level.save_cells()))
            .expect("level should load");
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.index().weather_counter(), 1);
        assert!((loaded.total_volume() - 1.5).abs() < 1e-6);
        assert_eq!(loaded.phase_at(BlockPos::new(2, 64, 0)), Some(Phase::Snow));
        assert!(loaded.incoherent_positions().is_empty());
    }

    #[test]
    fn test_load_without_cells_keeps_stale_entries() {
        let mut level = FluidLevel::new();
        let pos = BlockPos::new(3, 3, 3);
        level.place_cell(pos, FluidCell::water(pos));

        let mut loaded = FluidLevel::load(&level.save_index(), None).expect("index should load");
        assert_eq!(loaded.incoherent_positions(), vec![pos]);
        assert!(loaded.forget_stale(pos));
        assert!(loaded.incoherent_positions().is_empty());
    }
}
