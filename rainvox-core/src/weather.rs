//! Stochastic precipitation: new cells dropped near players.

use rainvox_utils::BlockPos;
use serde::Deserialize;

use crate::cell::{FluidCell, Phase};
use crate::environment::{EnvironmentConfig, EnvironmentSampler};
use crate::level::FluidLevel;
use crate::world::WorldQuery;

/// Weather constants.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct WeatherParams {
    /// Horizontal distance from the player spawns land within, on each axis.
    pub radius: i32,
    /// Highest spawn height.
    pub ceiling: i32,
    /// Distance kept from the top of the build range.
    pub ceiling_margin: i32,
    /// Firings between spawns at zero intensity.
    pub base_threshold: i32,
    /// Intensity that removes one firing from the threshold.
    pub intensity_step: f32,
    /// Below or at this temperature spawns are snow.
    pub snow_below: f32,
    /// Below this temperature (and above `snow_below`) spawns are hail.
    pub hail_below: f32,
    /// Whether snow spawns a second cell on top.
    pub stack_snow: bool,
}

impl Default for WeatherParams {
    fn default() -> Self {
        Self {
            radius: 24,
            ceiling: 220,
            ceiling_margin: 20,
            base_threshold: 15,
            intensity_step: 8.0,
            snow_below: 0.0,
            hail_below: 15.0,
            stack_snow: true,
        }
    }
}

impl WeatherParams {
    /// Checks ranges.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !(0..=128).contains(&self.radius) {
            return Err("Weather radius must be in range 0..128");
        }
        if self.base_threshold < 1 {
            return Err("Weather base threshold must be at least 1");
        }
        if self.intensity_step <= 0.0 {
            return Err("Weather intensity step must be positive");
        }
        if self.snow_below > self.hail_below {
            return Err("Snow temperature must not exceed hail temperature");
        }
        Ok(())
    }
}

/// What a weather run did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpawnOutcome {
    /// No player to spawn around.
    NoEntities,
    /// Precipitation is zero where the spawn would land.
    Dry,
    /// The counter has not reached the threshold yet.
    Counting {
        /// Firings counted so far.
        count: i32,
        /// Firings needed.
        threshold: i32,
    },
    /// The threshold was reached but the target was taken.
    Occupied(BlockPos),
    /// A cell was injected.
    Spawned {
        /// Where.
        pos: BlockPos,
        /// Which phase.
        phase: Phase,
        /// Whether a second snow cell was stacked on top.
        stacked: bool,
    },
}

impl SpawnOutcome {
    /// Number of cells created.
    #[must_use]
    pub const fn spawned(&self) -> usize {
        match self {
            Self::Spawned { stacked: true, .. } => 2,
            Self::Spawned { .. } => 1,
            _ => 0,
        }
    }
}

/// Injects precipitation cells.
#[derive(Debug, Clone, Default)]
pub struct WeatherSpawner {
    params: WeatherParams,
}

impl WeatherSpawner {
    /// Creates a spawner.
    #[must_use]
    pub const fn new(params: WeatherParams) -> Self {
        Self { params }
    }

    /// The spawner's constants.
    #[must_use]
    pub const fn params(&self) -> &WeatherParams {
        &self.params
    }

    /// Firings between spawns at the given intensity, at least one.
    #[must_use]
    pub fn threshold(&self, intensity: f32) -> i32 {
        let steps = (intensity / self.params.intensity_step).floor() as i32;
        (self.params.base_threshold - steps).max(1)
    }

    /// The phase precipitation takes at a temperature.
    #[must_use]
    pub fn phase_for(&self, temperature: f32) -> Phase {
        if temperature <= self.params.snow_below {
            Phase::Snow
        } else if temperature < self.params.hail_below {
            Phase::Hail
        } else {
            Phase::Water
        }
    }

    /// One weather step.
    ///
    /// Picks a player, samples a spawn point above it, advances the weather counter and, once
    /// the counter reaches the threshold for the local intensity, resets it and injects a cell.
    pub fn run<W: WorldQuery + ?Sized>(
        &self,
        level: &mut FluidLevel,
        world: &mut W,
        sampler: &EnvironmentSampler,
        environment: &EnvironmentConfig,
    ) -> SpawnOutcome {
        let entities = world.active_entity_positions();
        if entities.is_empty() {
            return SpawnOutcome::NoEntities;
        }
        let anchor = entities[world.random_int(entities.len() as i32) as usize];

        let radius = self.params.radius;
        let x = anchor.x() + world.random_int(radius * 2 + 1) - radius;
        let z = anchor.z() + world.random_int(radius * 2 + 1) - radius;
        let y = self.params.ceiling.min(world.max_build_height() - self.params.ceiling_margin);
        let target = BlockPos::new(x, y, z);

        let game_time = world.game_time();
        let surface = BlockPos::new(x, sampler.climate().sea_level, z);
        let intensity = sampler.precipitation_intensity(
            world.biome_at(surface),
            game_time,
            environment.precipitation_intensity(),
        );
        if intensity <= 0.0 {
            return SpawnOutcome::Dry;
        }

        let threshold = self.threshold(intensity);
        let count = level.next_weather_counter().saturating_add(1);
        if count < threshold {
            return SpawnOutcome::Counting { count, threshold };
        }
        level.reset_weather_counter();

        if level.is_occupied(target, &*world) {
            log::debug!("Weather target {target} is occupied, skipping spawn");
            return SpawnOutcome::Occupied(target);
        }

        let temperature = sampler.temperature(
            target,
            world.biome_at(target),
            game_time,
            environment.temperature_offset(),
        );
        let phase = self.phase_for(temperature);
        level.place_cell(target, FluidCell::new(phase, 1.0, target).with_temperature(temperature));

        let above = target.above();
        let stacked = phase == Phase::Snow && self.params.stack_snow && !level.is_occupied(above, &*world);
        if stacked {
            level.place_cell(above, FluidCell::new(phase, 1.0, above).with_temperature(temperature));
        }
        log::debug!(
            "Spawned {} at {target} (intensity {intensity:.1}, threshold {threshold})",
            phase.name()
        );
        SpawnOutcome::Spawned { pos: target, phase, stacked }
    }
}
