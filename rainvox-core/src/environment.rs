//! Ambient climate: seasonal, biome and altitude dependent temperature and precipitation.
//!
//! Everything here is a pure function of its inputs. The two global knobs live in
//! [`EnvironmentConfig`], which callers pass in explicitly.

use rainvox_utils::BlockPos;
use serde::Deserialize;

/// Lowest temperature the sampler reports, in °C.
pub const MIN_TEMPERATURE: f32 = -50.0;
/// Highest temperature the sampler reports, in °C.
pub const MAX_TEMPERATURE: f32 = 150.0;
/// Upper bound of the precipitation intensity scale.
pub const MAX_PRECIPITATION: f32 = 100.0;

/// What falls from the sky in a biome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precipitation {
    /// Dry biome.
    None,
    /// Rain.
    Rain,
    /// Snow.
    Snow,
}

impl Precipitation {
    /// Regional wetness factor.
    #[must_use]
    pub const fn factor(self) -> f32 {
        match self {
            Self::None => 0.2,
            Self::Rain => 1.0,
            Self::Snow => 1.3,
        }
    }
}

/// Climate of a region.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Biome {
    /// Base temperature on the host world's 0..2 scale.
    pub base_temperature: f32,
    /// Precipitation kind.
    pub precipitation: Precipitation,
}

impl Biome {
    /// Temperate grassland.
    pub const PLAINS: Self = Self::new(0.8, Precipitation::Rain);
    /// Hot and dry.
    pub const DESERT: Self = Self::new(2.0, Precipitation::None);
    /// Cold, snowy.
    pub const SNOWY_PLAINS: Self = Self::new(0.0, Precipitation::Snow);
    /// Mild and wet.
    pub const OCEAN: Self = Self::new(0.5, Precipitation::Rain);

    /// Creates a biome.
    #[must_use]
    pub const fn new(base_temperature: f32, precipitation: Precipitation) -> Self {
        Self {
            base_temperature,
            precipitation,
        }
    }
}

impl Default for Biome {
    fn default() -> Self {
        Self::PLAINS
    }
}

/// One quarter of the yearly cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Season {
    /// Season 0.
    Spring,
    /// Season 1.
    Summer,
    /// Season 2.
    Fall,
    /// Season 3.
    Winter,
}

impl Season {
    /// All seasons in cycle order.
    pub const ALL: [Season; 4] = [Season::Spring, Season::Summer, Season::Fall, Season::Winter];

    /// The season at `world_time`, given the length of a day in ticks and of a season in days.
    #[must_use]
    pub fn from_world_time(world_time: u64, day_length: u64, season_days: u64) -> Self {
        let days = world_time / day_length.max(1);
        Self::ALL[((days / season_days.max(1)) % 4) as usize]
    }

    /// Multiplier applied to the biome temperature.
    #[must_use]
    pub const fn temperature_multiplier(self) -> f32 {
        match self {
            Self::Spring => 1.1,
            Self::Summer => 1.4,
            Self::Fall => 0.9,
            Self::Winter => 0.6,
        }
    }

    /// Multiplier applied to precipitation.
    #[must_use]
    pub const fn precipitation_factor(self) -> f32 {
        match self {
            Self::Spring => 1.5,
            Self::Summer => 0.5,
            Self::Fall => 1.8,
            Self::Winter => 1.2,
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Spring => "Spring",
            Self::Summer => "Summer",
            Self::Fall => "Fall",
            Self::Winter => "Winter",
        }
    }
}

/// Constants of the climate model.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClimateParams {
    /// Height at which no altitude correction applies.
    pub sea_level: i32,
    /// Cooling per block above sea level, in °C.
    pub lapse_rate: f32,
    /// °C per unit of biome base temperature.
    pub biome_scale: f32,
    /// Biome base temperature that maps to 0 °C.
    pub biome_reference: f32,
    /// Ticks per day.
    pub day_length: u64,
    /// Days per season.
    pub season_days: u64,
}

impl Default for ClimateParams {
    fn default() -> Self {
        Self {
            sea_level: 64,
            lapse_rate: 0.1,
            biome_scale: 50.0,
            biome_reference: 0.0,
            day_length: 24_000,
            season_days: 40,
        }
    }
}

/// The externally controlled climate knobs.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    temperature_offset_c: f32,
    precipitation_intensity: u32,
}

impl EnvironmentConfig {
    /// Creates a config, clamping both knobs into range.
    #[must_use]
    pub fn new(temperature_offset_c: f32, precipitation_intensity: u32) -> Self {
        let mut config = Self::default();
        config.set_temperature_offset(temperature_offset_c);
        config.set_precipitation_intensity(precipitation_intensity);
        config
    }

    /// Global temperature offset in °C, within `[-50, 150]`.
    #[must_use]
    pub const fn temperature_offset(&self) -> f32 {
        self.temperature_offset_c
    }

    /// Global precipitation multiplier, within `0..=100`.
    #[must_use]
    pub const fn precipitation_intensity(&self) -> u32 {
        self.precipitation_intensity
    }

    /// Sets the temperature offset, clamped into `[-50, 150]`.
    pub fn set_temperature_offset(&mut self, offset: f32) {
        let clamped = if offset.is_nan() {
            0.0
        } else {
            offset.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE)
        };
        if clamped != offset {
            log::warn!("Temperature offset {offset} clamped to {clamped}");
        }
        self.temperature_offset_c = clamped;
    }

    /// Sets the precipitation multiplier, clamped to at most 100.
    pub fn set_precipitation_intensity(&mut self, intensity: u32) {
        if intensity > 100 {
            log::warn!("Precipitation intensity {intensity} clamped to 100");
        }
        self.precipitation_intensity = intensity.min(100);
    }

    /// Whether both knobs are in range. Deserialized configs may not be.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&self.temperature_offset_c)
            && self.precipitation_intensity <= 100
    }
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            temperature_offset_c: 0.0,
            precipitation_intensity: 25,
        }
    }
}

/// Maps a position and world time to ambient conditions.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentSampler {
    climate: ClimateParams,
}

impl EnvironmentSampler {
    /// Creates a sampler for the given climate constants.
    #[must_use]
    pub const fn new(climate: ClimateParams) -> Self {
        Self { climate }
    }

    /// The climate constants.
    #[must_use]
    pub const fn climate(&self) -> &ClimateParams {
        &self.climate
    }

    /// The season at `world_time`.
    #[must_use]
    pub fn season(&self, world_time: u64) -> Season {
        Season::from_world_time(world_time, self.climate.day_length, self.climate.season_days)
    }

    /// Ambient temperature at `pos` in °C, clamped to `[-50, 150]`.
    #[must_use]
    pub fn temperature(&self, pos: BlockPos, biome: Biome, world_time: u64, offset: f32) -> f32 {
        let climate = &self.climate;
        let biome_c = (biome.base_temperature - climate.biome_reference)
            * climate.biome_scale
            * self.season(world_time).temperature_multiplier();
        let lapse = -((pos.y() - climate.sea_level) as f32) * climate.lapse_rate;
        let celsius = biome_c + lapse + offset;
        if celsius.is_nan() {
            return 0.0;
        }
        celsius.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE)
    }

    /// Precipitation intensity in `[0, 100]` for a biome, scaled by the global `multiplier`.
    #[must_use]
    pub fn precipitation_intensity(&self, biome: Biome, world_time: u64, multiplier: u32) -> f32 {
        let base = 50.0 * self.season(world_time).precipitation_factor() * biome.precipitation.factor();
        (base * multiplier as f32 / 100.0).clamp(0.0, MAX_PRECIPITATION)
    }
}
