//! Phase transitions between water, ice, steam, snow and hail.

use serde::Deserialize;

use crate::cell::Phase;

/// Thresholds of the phase rules.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PhaseParams {
    /// Water at or below this freezes or turns to snow. Snow above it melts.
    pub freezing_point: f32,
    /// Water at or above this boils. Steam below it condenses.
    pub boiling_point: f32,
    /// Hail above this melts, and water only turns to hail below it.
    pub hail_melt: f32,
    /// Chance per firing that eligible water turns to hail.
    pub hail_chance: f32,
    /// Occupied neighbours out of east, west and below needed to freeze into ice.
    pub freeze_support: u8,
}

impl Default for PhaseParams {
    fn default() -> Self {
        Self {
            freezing_point: 0.0,
            boiling_point: 100.0,
            hail_melt: 15.0,
            hail_chance: 0.01,
            freeze_support: 2,
        }
    }
}

/// Whether computing the next phase needs a random roll. Only water in the hail band does.
#[must_use]
pub fn needs_hail_roll(current: Phase, temperature: f32, params: &PhaseParams) -> bool {
    current == Phase::Water && temperature > params.freezing_point && temperature < params.hail_melt
}

/// The phase a cell takes this firing.
///
/// `freeze_support` counts the occupied positions out of east, west and below, read from the
/// start of firing snapshot. `hail_roll` is a uniform draw in `[0, 1)`, only consulted when
/// [`needs_hail_roll`] holds. Ice never changes phase.
#[must_use]
pub fn next_phase(
    current: Phase,
    temperature: f32,
    freeze_support: u8,
    hail_roll: Option<f32>,
    params: &PhaseParams,
) -> Phase {
    match current {
        Phase::Snow if temperature > params.freezing_point => Phase::Water,
        Phase::Hail if temperature > params.hail_melt => Phase::Water,
        Phase::Steam if temperature < params.boiling_point => Phase::Water,
        Phase::Water => {
            if temperature >= params.boiling_point {
                Phase::Steam
            } else if temperature <= params.freezing_point {
                if freeze_support >= params.freeze_support {
                    Phase::Ice
                } else {
                    Phase::Snow
                }
            } else if needs_hail_roll(current, temperature, params)
                && hail_roll.is_some_and(|roll| roll < params.hail_chance)
            {
                Phase::Hail
            } else {
                Phase::Water
            }
        }
        other => other,
    }
}
