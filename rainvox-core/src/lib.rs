//! Voxel fluid simulation for water, ice, steam, snow and hail.
//!
//! Fluid lives in a sparse grid of [`FluidCell`]s owned by a [`FluidLevel`], separate from the
//! host world's blocks. The host is reached through the [`WorldQuery`] trait for terrain,
//! biomes, time, players and randomness.
//!
//! # Architecture
//!
//! A [`FluidSimulation`] fires every few game ticks. Each firing:
//! - takes the list of indexed cells
//! - runs the weather spawner, which may inject precipitation near a player
//! - drops index entries that lost their cell
//! - shuffles the list with the world's random source
//! - computes every cell against a snapshot taken at the start of the firing
//!   (phase change, then flow) into a plan
//! - commits the plan in a fixed order
//!
//! Persistence goes through [`storage::SavedDataStorage`] as two NBT records per world.
//!
//! # Example
//!
//! ```ignore
//! use rainvox_core::{FluidSimulation, SimpleWorld, SimulationConfig, shapes};
//! use rainvox_utils::BlockPos;
//!
//! let mut world = SimpleWorld::new(42).with_floor(63);
//! let mut simulation = FluidSimulation::new(&SimulationConfig::default());
//! shapes::fill_sphere(simulation.level_mut(), &world, BlockPos::new(0, 80, 0), 3);
//!
//! for _ in 0..100 {
//!     simulation.tick(&mut world);
//!     world.advance();
//! }
//! ```

pub mod cell;
pub mod config;
pub mod environment;
pub mod error;
pub mod flow;
pub mod index;
pub mod level;
pub mod nbt;
pub mod phase;
pub mod scheduler;
pub mod shapes;
pub mod simulation;
pub mod storage;
pub mod weather;
pub mod world;

pub use cell::{FluidCell, NeighborMask, Phase};
pub use config::SimulationConfig;
pub use environment::{Biome, EnvironmentConfig, EnvironmentSampler, Precipitation, Season};
pub use error::{ConfigError, NbtLoadError, StorageError};
pub use flow::{FlowEngine, FlowParams};
pub use index::FluidIndex;
pub use level::FluidLevel;
pub use simulation::{FluidSimulation, TickReport};
pub use weather::{SpawnOutcome, WeatherSpawner};
pub use world::{SimpleWorld, WorldQuery};
