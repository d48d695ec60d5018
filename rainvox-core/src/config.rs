use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::environment::{ClimateParams, EnvironmentConfig};
use crate::error::ConfigError;
use crate::flow::FlowParams;
use crate::phase::PhaseParams;
use crate::scheduler::DEFAULT_TICK_INTERVAL;
use crate::weather::WeatherParams;

/// The config file bundled with the runner, written out when none exists.
pub const DEFAULT_CONFIG: &str = include_str!("../../package-content/rainvox_config.json5");

/// Every tunable of a simulation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub tick_interval: u32,
    pub seed: u64,
    pub environment: EnvironmentConfig,
    pub climate: ClimateParams,
    pub phase: PhaseParams,
    pub flow: FlowParams,
    pub weather: WeatherParams,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            seed: 0,
            environment: EnvironmentConfig::default(),
            climate: ClimateParams::default(),
            phase: PhaseParams::default(),
            flow: FlowParams::default(),
            weather: WeatherParams::default(),
        }
    }
}

impl FromStr for SimulationConfig {
    type Err = ConfigError;

    /// Parses and validates a json5 config.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Self = serde_json5::from_str(s)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }
}

impl SimulationConfig {
    /// Loads the config at `path`, writing the bundled default there first if it does not exist.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or written, does not parse, or fails validation.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if path.exists() {
            let config_str = fs::read_to_string(path).map_err(io_error)?;
            return config_str.parse();
        }

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        fs::write(path, DEFAULT_CONFIG).map_err(io_error)?;
        log::info!("Wrote default config to {}", path.display());
        DEFAULT_CONFIG.parse()
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.tick_interval == 0 {
            return Err("Tick interval must be at least 1");
        }
        if !self.environment.is_valid() {
            return Err("Temperature offset must be in range -50..150 and precipitation intensity in range 0..100");
        }
        if self.climate.day_length == 0 || self.climate.season_days == 0 {
            return Err("Day length and season length must be positive");
        }
        if !(0.0..=1.0).contains(&self.phase.hail_chance) {
            return Err("Hail chance must be in range 0..1");
        }
        if self.phase.freezing_point >= self.phase.boiling_point {
            return Err("Freezing point must be below boiling point");
        }
        if self.phase.freeze_support > 3 {
            return Err("Freeze support must be in range 0..3");
        }
        self.flow.validate()?;
        self.weather.validate()
    }
}
