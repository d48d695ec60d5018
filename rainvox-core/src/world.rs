//! The host world surface the simulation reads terrain, time, entities and randomness from.

use rainvox_utils::random::{Random, Xoroshiro};
use rainvox_utils::{BlockPos, ChunkPos};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use uuid::Uuid;

use crate::environment::Biome;

/// Positions of the entities weather can be spawned around.
pub type EntityPositions = SmallVec<[BlockPos; 8]>;

/// Read access to the host world.
///
/// Fluid cells themselves are owned by [`crate::level::FluidLevel`]; this trait only covers
/// terrain and the other ambient inputs.
pub trait WorldQuery {
    /// The world's random source.
    type Rng: Random;

    /// Whether terrain blocks the given position.
    fn is_solid(&self, pos: BlockPos) -> bool;

    /// Lowest buildable y, inclusive.
    fn min_build_height(&self) -> i32;

    /// Highest buildable y, exclusive.
    fn max_build_height(&self) -> i32;

    /// The biome at a position.
    fn biome_at(&self, pos: BlockPos) -> Biome;

    /// Current game time in ticks.
    fn game_time(&self) -> u64;

    /// Positions of active players.
    fn active_entity_positions(&self) -> EntityPositions;

    /// The shared random source.
    fn random(&mut self) -> &mut Self::Rng;

    /// A value in `[0, 1)`.
    fn random_float(&mut self) -> f32 {
        self.random().next_f32()
    }

    /// A fair coin flip.
    fn random_bool(&mut self) -> bool {
        self.random().next_bool()
    }

    /// A value in `0..bound`.
    fn random_int(&mut self, bound: i32) -> i32 {
        self.random().next_i32_bounded(bound)
    }

    /// Whether `y` is inside the buildable range.
    fn is_in_build_range(&self, pos: BlockPos) -> bool {
        pos.y() >= self.min_build_height() && pos.y() < self.max_build_height()
    }
}

/// An in-memory world with a flat solid floor, loose solid blocks and a seeded random source.
///
/// Everything at or below the floor is solid.
#[derive(Debug, Clone)]
pub struct SimpleWorld {
    min_y: i32,
    max_y: i32,
    floor: Option<i32>,
    solids: FxHashSet<BlockPos>,
    biome: Biome,
    biome_overrides: FxHashMap<ChunkPos, Biome>,
    players: Vec<(Uuid, BlockPos)>,
    game_time: u64,
    random: Xoroshiro,
}

impl SimpleWorld {
    /// Creates an empty world spanning the vanilla overworld height range.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            min_y: -64,
            max_y: 320,
            floor: None,
            solids: FxHashSet::default(),
            biome: Biome::PLAINS,
            biome_overrides: FxHashMap::default(),
            players: Vec::new(),
            game_time: 0,
            random: Xoroshiro::from_seed(seed),
        }
    }

    /// Makes every position with `y <= floor` solid.
    #[must_use]
    pub const fn with_floor(mut self, floor: i32) -> Self {
        self.floor = Some(floor);
        self
    }

    /// Sets the build range, `min_y` inclusive and `max_y` exclusive.
    #[must_use]
    pub const fn with_height(mut self, min_y: i32, max_y: i32) -> Self {
        self.min_y = min_y;
        self.max_y = max_y;
        self
    }

    /// Sets the biome used wherever no override exists.
    #[must_use]
    pub const fn with_biome(mut self, biome: Biome) -> Self {
        self.biome = biome;
        self
    }

    /// Overrides the biome of one chunk column.
    pub fn set_chunk_biome(&mut self, chunk: ChunkPos, biome: Biome) {
        self.biome_overrides.insert(chunk, biome);
    }

    /// Places a solid block.
    pub fn set_solid(&mut self, pos: BlockPos) {
        self.solids.insert(pos);
    }

    /// Removes a solid block placed with [`SimpleWorld::set_solid`].
    pub fn clear_solid(&mut self, pos: BlockPos) {
        self.solids.remove(&pos);
    }

    /// Fills an inclusive box with solid blocks.
    pub fn fill_solid(&mut self, from: BlockPos, to: BlockPos) {
        for x in from.x().min(to.x())..=from.x().max(to.x()) {
            for y in from.y().min(to.y())..=from.y().max(to.y()) {
                for z in from.z().min(to.z())..=from.z().max(to.z()) {
                    self.solids.insert(BlockPos::new(x, y, z));
                }
            }
        }
    }

    /// Adds a player and returns its id.
    pub fn add_player(&mut self, pos: BlockPos) -> Uuid {
        let id = Uuid::new_v4();
        self.players.push((id, pos));
        id
    }

    /// Removes a player.
    pub fn remove_player(&mut self, id: Uuid) {
        self.players.retain(|(player, _)| *player != id);
    }

    /// Advances the game clock by one tick.
    pub fn advance(&mut self) {
        self.game_time += 1;
    }

    /// Sets the game clock.
    pub fn set_game_time(&mut self, game_time: u64) {
        self.game_time = game_time;
    }
}

impl WorldQuery for SimpleWorld {
    type Rng = Xoroshiro;

    fn is_solid(&self, pos: BlockPos) -> bool {
        self.floor.is_some_and(|floor| pos.y() <= floor) || self.solids.contains(&pos)
    }

    fn min_build_height(&self) -> i32 {
        self.min_y
    }

    fn max_build_height(&self) -> i32 {
        self.max_y
    }

    fn biome_at(&self, pos: BlockPos) -> Biome {
        self.biome_overrides
            .get(&pos.chunk_pos())
            .copied()
            .unwrap_or(self.biome)
    }

    fn game_time(&self) -> u64 {
        self.game_time
    }

    fn active_entity_positions(&self) -> EntityPositions {
        self.players.iter().map(|(_, pos)| *pos).collect()
    }

    fn random(&mut self) -> &mut Xoroshiro {
        &mut self.random
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_and_solids() {
        let mut world = SimpleWorld::new(0).with_floor(0);
        assert!(world.is_solid(BlockPos::new(5, 0, 5)));
        assert!(world.is_solid(BlockPos::new(5, -3, 5)));
        assert!(!world.is_solid(BlockPos::new(5, 1, 5)));

        world.set_solid(BlockPos::new(1, 1, 1));
        assert!(world.is_solid(BlockPos::new(1, 1, 1)));
        world.clear_solid(BlockPos::new(1, 1, 1));
        assert!(!world.is_solid(BlockPos::new(1, 1, 1)));
    }

    #[test]
    fn test_biome_overrides() {
        let mut world = SimpleWorld::new(0).with_biome(Biome::OCEAN);
        world.set_chunk_biome(ChunkPos::new(1, 0), Biome::DESERT);
        assert_eq!(world.biome_at(BlockPos::new(0, 64, 0)), Biome::OCEAN);
        assert_eq!(world.biome_at(BlockPos::new(20, 64, 3)), Biome::DESERT);
    }

    #[test]
    fn test_players_keep_insertion_order() {
        let mut world = SimpleWorld::new(0);
        let first = world.add_player(BlockPos::new(1, 64, 1));
        world.add_player(BlockPos::new(2, 64, 2));
        assert_eq!(
            world.active_entity_positions().as_slice(),
            &[BlockPos::new(1, 64, 1), BlockPos::new(2, 64, 2)]
        );
        world.remove_player(first);
        assert_eq!(world.active_entity_positions().len(), 1);
    }

    #[test]
    fn test_seeded_randomness() {
        let mut a = SimpleWorld::new(77);
        let mut b = SimpleWorld::new(77);
        for _ in 0..20 {
            assert_eq!(a.random_float().to_bits(), b.random_float().to_bits());
            assert_eq!(a.random_int(10), b.random_int(10));
        }
    }

    #[test]
    fn test_build_range() {
        let world = SimpleWorld::new(0).with_height(0, 16);
        assert!(world.is_in_build_range(BlockPos::new(0, 0, 0)));
        assert!(world.is_in_build_range(BlockPos::new(0, 15, 0)));
        assert!(!world.is_in_build_range(BlockPos::new(0, 16, 0)));
        assert!(!world.is_in_build_range(BlockPos::new(0, -1, 0)));
    }
}
