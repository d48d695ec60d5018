//! The per-world fluid simulation: scheduling, weather, healing and the flow pass.

use rainvox_utils::BlockPos;
use rainvox_utils::random::shuffle;

use crate::config::SimulationConfig;
use crate::environment::{EnvironmentConfig, EnvironmentSampler};
use crate::error::StorageError;
use crate::flow::FlowEngine;
use crate::index::{DATA_NAME, FluidIndex};
use crate::level::{CELLS_DATA_NAME, FluidLevel};
use crate::scheduler::TickScheduler;
use crate::storage::SavedDataStorage;
use crate::weather::{SpawnOutcome, WeatherSpawner};
use crate::world::WorldQuery;

/// What one firing did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Game tick the firing ran on.
    pub game_time: u64,
    /// Cells run through the flow pass.
    pub processed: usize,
    /// Cells relocated.
    pub moved: usize,
    /// Relocations cancelled at commit.
    pub cancelled: usize,
    /// Cells created by flow.
    pub created: usize,
    /// Cells removed for underflow.
    pub removed: usize,
    /// Stale index entries dropped.
    pub healed: usize,
    /// Result of the weather step.
    pub weather: SpawnOutcome,
}

/// Fluid state of one world together with everything needed to advance it.
#[derive(Debug)]
pub struct FluidSimulation {
    level: FluidLevel,
    scheduler: TickScheduler,
    engine: FlowEngine,
    weather: WeatherSpawner,
    sampler: EnvironmentSampler,
    environment: EnvironmentConfig,
    /// Cell state changed since the last save.
    unsaved: bool,
}

impl FluidSimulation {
    /// Creates a simulation with no fluid.
    #[must_use]
    pub fn new(config: &SimulationConfig) -> Self {
        Self::with_level(config, FluidLevel::new())
    }

    /// Creates a simulation around an existing level.
    #[must_use]
    pub fn with_level(config: &SimulationConfig, level: FluidLevel) -> Self {
        Self {
            level,
            scheduler: TickScheduler::new(config.tick_interval),
            engine: FlowEngine::new(config.flow, config.phase),
            weather: WeatherSpawner::new(config.weather),
            sampler: EnvironmentSampler::new(config.climate),
            environment: config.environment,
            unsaved: false,
        }
    }

    /// Loads the fluid state of `world_name` from storage, or starts empty if none was saved.
    ///
    /// # Errors
    /// Returns an error if the storage fails or a saved record cannot be decoded.
    pub fn open<S: SavedDataStorage + ?Sized>(
        config: &SimulationConfig,
        world_name: &str,
        storage: &S,
    ) -> Result<Self, StorageError> {
        let index = storage.load(world_name, DATA_NAME)?;
        let cells = storage.load(world_name, CELLS_DATA_NAME)?;
        if index.is_none() && cells.is_none() {
            log::debug!("No saved fluid data for {world_name}, starting empty");
            return Ok(Self::new(config));
        }

        let index = index.unwrap_or_else(|| FluidIndex::new().save());
        let level = FluidLevel::load(&index, cells.as_ref()).map_err(|source| StorageError::Corrupt {
            world: world_name.to_owned(),
            name: DATA_NAME.to_owned(),
            source,
        })?;
        log::info!("Loaded {} fluid cells for {world_name}", level.len());
        Ok(Self::with_level(config, level))
    }

    /// Writes the fluid state of `world_name` if anything changed since the last save, or
    /// unconditionally when `force` is set. Returns whether anything was written.
    ///
    /// # Errors
    /// Returns an error if the storage rejects a write. The state stays unsaved in that case.
    pub fn save<S: SavedDataStorage + ?Sized>(
        &mut self,
        world_name: &str,
        storage: &mut S,
        force: bool,
    ) -> Result<bool, StorageError> {
        if !force && !self.unsaved && !self.level.is_dirty() {
            return Ok(false);
        }
        storage.save(world_name, DATA_NAME, self.level.save_index())?;
        storage.save(world_name, CELLS_DATA_NAME, self.level.save_cells())?;
        self.level.mark_saved();
        self.unsaved = false;
        log::debug!("Saved {} fluid cells for {world_name}", self.level.len());
        Ok(true)
    }

    /// Advances the simulation if the scheduler fires on the world's current game time.
    pub fn tick<W: WorldQuery + ?Sized>(&mut self, world: &mut W) -> Option<TickReport> {
        if !self.scheduler.should_fire(world.game_time()) {
            return None;
        }
        Some(self.fire(world))
    }

    /// Runs one firing regardless of the schedule.
    ///
    /// Takes the list of indexed positions, runs weather, drops index entries without a cell,
    /// shuffles the list with the world's random source and runs the flow pass over it. Cells
    /// injected by weather are first processed on the next firing.
    pub fn fire<W: WorldQuery + ?Sized>(&mut self, world: &mut W) -> TickReport {
        let game_time = world.game_time();
        let span = tracing::debug_span!("fluid_firing", game_time, cells = self.level.len());
        let _enter = span.enter();

        let mut order = self.level.index().list();
        let weather = self.weather.run(&mut self.level, world, &self.sampler, &self.environment);
        if let SpawnOutcome::Spawned { pos, stacked, .. } = weather {
            // a spawn may land on a stale entry, which must not be processed this firing
            order.retain(|&listed| listed != pos && !(stacked && listed == pos.above()));
        }

        let healed = self.heal_stale(&mut order);

        order.sort_unstable();
        shuffle(&mut order, world.random());
        let stats = self.engine.run(&order, &mut self.level, world, &self.sampler, &self.environment);
        self.scheduler.record_firing(game_time);
        self.unsaved = true;

        let report = TickReport {
            game_time,
            processed: order.len(),
            moved: stats.moved,
            cancelled: stats.cancelled,
            created: stats.created,
            removed: stats.removed,
            healed,
            weather,
        };
        log::debug!(
            "Fluid firing at {game_time}: {} processed, {} moved, {} cancelled, {} created, {} removed, {} healed, weather {:?}",
            report.processed,
            report.moved,
            report.cancelled,
            report.created,
            report.removed,
            report.healed,
            report.weather
        );
        report
    }

    fn heal_stale(&mut self, order: &mut Vec<BlockPos>) -> usize {
        let mut healed = 0;
        order.retain(|&pos| {
            if self.level.contains(pos) {
                return true;
            }
            if self.level.forget_stale(pos) {
                log::warn!("Dropped fluid index entry at {pos} with no cell");
                healed += 1;
            }
            false
        });
        healed
    }

    /// The fluid cells and their index.
    #[must_use]
    pub const fn level(&self) -> &FluidLevel {
        &self.level
    }

    /// Mutable access for placing or removing cells between firings.
    pub fn level_mut(&mut self) -> &mut FluidLevel {
        self.unsaved = true;
        &mut self.level
    }

    /// Temperature offset and precipitation multiplier in effect.
    #[must_use]
    pub const fn environment(&self) -> &EnvironmentConfig {
        &self.environment
    }

    /// Mutable access to the environment knobs.
    pub fn environment_mut(&mut self) -> &mut EnvironmentConfig {
        &mut self.environment
    }

    /// The firing gate and its counters.
    #[must_use]
    pub const fn scheduler(&self) -> &TickScheduler {
        &self.scheduler
    }

    /// Climate sampler used for temperature and precipitation.
    #[must_use]
    pub const fn sampler(&self) -> &EnvironmentSampler {
        &self.sampler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::FluidCell;
    use crate::shapes::fill_box;
    use crate::storage::RamOnlyStorage;
    use crate::weather::WeatherParams;
    use crate::world::SimpleWorld;

    fn pool(seed: u64) -> (FluidSimulation, SimpleWorld) {
        let world = SimpleWorld::new(seed).with_floor(0);
        let mut simulation = FluidSimulation::new(&SimulationConfig::default());
        fill_box(simulation.level_mut(), &world, BlockPos::new(0, 4, 0), BlockPos::new(2, 6, 2));
        (simulation, world)
    }

    #[test]
    fn test_tick_is_gated() {
        let (mut simulation, mut world) = pool(1);
        world.set_game_time(1);
        assert!(simulation.tick(&mut world).is_none());
        world.set_game_time(2);
        let report = simulation.tick(&mut world).expect("even tick fires");
        assert_eq!(report.processed, 27);
        assert_eq!(report.weather, SpawnOutcome::NoEntities);
        assert_eq!(simulation.scheduler().firings(), 1);
    }

    #[test]
    fn test_cell_above_a_spawn_is_still_processed() {
        let config = SimulationConfig {
            environment: EnvironmentConfig::new(0.0, 100),
            weather: WeatherParams {
                radius: 0,
                base_threshold: 1,
                ..WeatherParams::default()
            },
            ..SimulationConfig::default()
        };
        let mut simulation = FluidSimulation::new(&config);
        let mut world = SimpleWorld::new(4).with_height(0, 128);
        world.add_player(BlockPos::new(0, 64, 0));
        let above = BlockPos::new(0, 109, 0);
        simulation.level_mut().place_cell(above, FluidCell::water(above));
        let before = simulation.level().len();

        let report = simulation.fire(&mut world);
        let SpawnOutcome::Spawned { pos, stacked, .. } = report.weather else {
            panic!("expected a spawn, got {:?}", report.weather);
        };
        assert_eq!(pos, BlockPos::new(0, 108, 0));
        assert!(!stacked);
        assert_eq!(report.processed, before);
    }

    #[test]
    fn test_stays_coherent_and_bounded() {
        let (mut simulation, mut world) = pool(2);
        let initial = simulation.level().total_volume();
        for _ in 0..40 {
            simulation.fire(&mut world);
            world.advance();
            let level = simulation.level();
            assert!(level.incoherent_positions().is_empty());
            assert!(level.iter().all(|(_, cell)| (0.0..=1.0).contains(&cell.volume())));
            assert!(level.total_volume() <= initial + 1e-3);
        }
    }

    #[test]
    fn test_stale_entries_are_healed() {
        let pos = BlockPos::new(3, 3, 3);
        let mut source = FluidLevel::new();
        source.place_cell(pos, FluidCell::water(pos));
        let stale = FluidLevel::load(&source.save_index(), None).expect("valid index");
        assert_eq!(stale.incoherent_positions(), vec![pos]);

        let mut world = SimpleWorld::new(0);
        let mut simulation = FluidSimulation::with_level(&SimulationConfig::default(), stale);
        let report = simulation.fire(&mut world);
        assert_eq!(report.healed, 1);
        assert_eq!(report.processed, 0);
        assert!(simulation.level().is_empty());
        assert!(simulation.level().incoherent_positions().is_empty());
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let run = |seed| {
            let (mut simulation, mut world) = pool(seed);
            for _ in 0..30 {
                simulation.fire(&mut world);
                world.advance();
            }
            simulation.level().save_cells()
        };
        assert_eq!(run(7), run(7));
    }

    #[test]
    fn test_save_and_open() {
        let (mut simulation, mut world) = pool(3);
        let mut storage = RamOnlyStorage::new();
        for _ in 0..5 {
            simulation.fire(&mut world);
        }
        assert!(simulation.save("overworld", &mut storage, false).expect("writable"));
        assert!(!simulation.save("overworld", &mut storage, false).expect("writable"));
        assert_eq!(storage.saves(), 2);

        let reopened = FluidSimulation::open(&SimulationConfig::default(), "overworld", &storage).expect("valid");
        assert_eq!(reopened.level().save_cells(), simulation.level().save_cells());
        assert_eq!(reopened.level().index().weather_counter(), simulation.level().index().weather_counter());
        assert!(!reopened.level().is_dirty());
    }

    #[test]
    fn test_open_without_records_starts_empty() {
        let storage = RamOnlyStorage::new();
        let simulation = FluidSimulation::open(&SimulationConfig::default(), "overworld", &storage).expect("empty");
        assert!(simulation.level().is_empty());
    }

    #[test]
    fn test_save_failure_keeps_state_unsaved() {
        let (mut simulation, mut world) = pool(4);
        simulation.fire(&mut world);
        let mut storage = RamOnlyStorage::read_only();
        assert!(simulation.save("overworld", &mut storage, false).is_err());
        let mut storage = RamOnlyStorage::new();
        assert!(simulation.save("overworld", &mut storage, false).expect("writable"));
    }

    #[test]
    fn test_corrupt_record_is_reported() {
        let mut storage = RamOnlyStorage::new();
        storage.insert("overworld", DATA_NAME, simdnbt::owned::NbtCompound::new());
        let err = FluidSimulation::open(&SimulationConfig::default(), "overworld", &storage).unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }
}
