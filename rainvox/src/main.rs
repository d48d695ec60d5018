//! Headless runner: pours a ball of water into an in-memory world and lets it settle.
//!
//! Usage: `rainvox [ticks]`. Verbosity follows `RUST_LOG` and defaults to `info`.

use std::path::Path;
use std::process::ExitCode;

use rainvox_core::shapes::fill_sphere;
use rainvox_core::storage::RamOnlyStorage;
use rainvox_core::{FluidSimulation, SimpleWorld, SimulationConfig};
use rainvox_utils::BlockPos;
use tracing_subscriber::EnvFilter;

const CONFIG_PATH: &str = "rainvox_config.json5";
const WORLD_NAME: &str = "overworld";
const DEFAULT_TICKS: u64 = 400;
const FLOOR: i32 = 63;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let ticks = match std::env::args().nth(1).map(|arg| arg.parse::<u64>()) {
        None => DEFAULT_TICKS,
        Some(Ok(ticks)) => ticks,
        Some(Err(err)) => {
            log::error!("Tick count must be a positive number: {err}");
            return ExitCode::FAILURE;
        }
    };

    let config = match SimulationConfig::load_or_create(Path::new(CONFIG_PATH)) {
        Ok(config) => config,
        Err(err) => {
            log::error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let mut world = SimpleWorld::new(config.seed).with_floor(FLOOR);
    world.add_player(BlockPos::new(0, FLOOR + 1, 0));
    let mut storage = RamOnlyStorage::new();
    let mut simulation = match FluidSimulation::open(&config, WORLD_NAME, &storage) {
        Ok(simulation) => simulation,
        Err(err) => {
            log::error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let placed = fill_sphere(simulation.level_mut(), &world, BlockPos::new(0, FLOOR + 12, 0), 4);
    log::info!(
        "Poured {placed} water cells, running {ticks} ticks every {} ticks",
        config.tick_interval
    );

    let mut spawned = 0;
    for _ in 0..ticks {
        if let Some(report) = simulation.tick(&mut world) {
            spawned += report.weather.spawned();
            if report.moved + report.created + report.removed > 0 {
                tracing::debug!(
                    game_time = report.game_time,
                    moved = report.moved,
                    created = report.created,
                    removed = report.removed,
                    "fluid activity"
                );
            }
        }
        world.advance();
    }

    let level = simulation.level();
    log::info!(
        "Finished after {} firings: {} cells holding {:.2} volume, {spawned} cells from weather",
        simulation.scheduler().firings(),
        level.len(),
        level.total_volume()
    );

    match simulation.save(WORLD_NAME, &mut storage, false) {
        Ok(saved) => {
            log::info!("Saved fluid state: {saved}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
