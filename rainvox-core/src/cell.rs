//! The per-voxel physical record.

use bitflags::bitflags;
use rainvox_utils::{BlockPos, Direction, math::Vector3};
use simdnbt::owned::{NbtCompound, NbtTag};

use crate::nbt::{float_or, nbt_i32};

/// Substance state of a cell.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    /// Liquid water. Flows, equalizes and overflows.
    #[default]
    Water = 0,
    /// Frozen water. Immobile.
    Ice = 1,
    /// Buoyant vapour.
    Steam = 2,
    /// Slow falling flakes.
    Snow = 3,
    /// Fast falling, bouncing pellets.
    Hail = 4,
}

impl Phase {
    /// Every phase, ordered by id.
    pub const ALL: [Phase; 5] = [Phase::Water, Phase::Ice, Phase::Steam, Phase::Snow, Phase::Hail];

    /// Stable numeric id used in saved data.
    #[must_use]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Looks a phase up by id. Unknown ids map to [`Phase::Water`].
    #[must_use]
    pub fn by_id(id: i32) -> Self {
        Self::ALL
            .into_iter()
            .find(|phase| i32::from(phase.id()) == id)
            .unwrap_or_default()
    }

    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Water => "water",
            Self::Ice => "ice",
            Self::Steam => "steam",
            Self::Snow => "snow",
            Self::Hail => "hail",
        }
    }

    /// Looks a phase up by name, ignoring case. Unknown names map to [`Phase::Water`].
    #[must_use]
    pub fn by_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|phase| phase.name().eq_ignore_ascii_case(name))
            .unwrap_or_default()
    }

    /// Everything except ice can move.
    #[must_use]
    pub const fn is_mobile(self) -> bool {
        !matches!(self, Self::Ice)
    }

    /// Snow and hail move as whole cells and never split their volume.
    #[must_use]
    pub const fn is_particulate(self) -> bool {
        matches!(self, Self::Snow | Self::Hail)
    }
}

bitflags! {
    /// Which of the six axis neighbours were occupied when the cell was last computed.
    ///
    /// Only read by presentation code to deform the rendered voxel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NeighborMask: u8 {
        /// +X
        const POS_X = 1;
        /// -X
        const NEG_X = 1 << 1;
        /// +Y
        const POS_Y = 1 << 2;
        /// -Y
        const NEG_Y = 1 << 3;
        /// +Z
        const POS_Z = 1 << 4;
        /// -Z
        const NEG_Z = 1 << 5;
    }
}

impl NeighborMask {
    /// The bit for a single direction.
    #[must_use]
    pub const fn from_direction(direction: Direction) -> Self {
        match direction {
            Direction::East => Self::POS_X,
            Direction::West => Self::NEG_X,
            Direction::Up => Self::POS_Y,
            Direction::Down => Self::NEG_Y,
            Direction::South => Self::POS_Z,
            Direction::North => Self::NEG_Z,
        }
    }
}

/// One simulated voxel of fluid matter.
#[derive(Debug, Clone, PartialEq)]
pub struct FluidCell {
    /// Current phase.
    pub phase: Phase,
    volume: f32,
    /// Velocity in blocks per firing.
    pub velocity: Vector3<f32>,
    /// Recomputed every firing from the water column above.
    pub pressure: f32,
    /// Last sampled ambient temperature in °C.
    pub temperature: f32,
    /// Occupied neighbours, for presentation.
    pub neighbors: NeighborMask,
    /// Where the cell was before its last committed move.
    pub prev_pos: BlockPos,
    /// Where the last compute pass wanted the cell to go.
    pub next_pos: BlockPos,
}

impl FluidCell {
    /// Creates a resting cell at `pos`. The volume is clamped into `[0, 1]`.
    #[must_use]
    pub fn new(phase: Phase, volume: f32, pos: BlockPos) -> Self {
        Self {
            phase,
            volume: clamp_volume(volume),
            velocity: Vector3::ZERO,
            pressure: 0.0,
            temperature: 0.0,
            neighbors: NeighborMask::empty(),
            prev_pos: pos,
            next_pos: pos,
        }
    }

    /// A full water cell.
    #[must_use]
    pub fn water(pos: BlockPos) -> Self {
        Self::new(Phase::Water, 1.0, pos)
    }

    /// Sets the initial velocity.
    #[must_use]
    pub const fn with_velocity(mut self, velocity: Vector3<f32>) -> Self {
        self.velocity = velocity;
        self
    }

    /// Sets the initial pressure.
    #[must_use]
    pub const fn with_pressure(mut self, pressure: f32) -> Self {
        self.pressure = pressure;
        self
    }

    /// Sets the cached temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Fraction of the voxel occupied, always in `[0, 1]`.
    #[must_use]
    pub const fn volume(&self) -> f32 {
        self.volume
    }

    /// Sets the volume, clamped into `[0, 1]`.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = clamp_volume(volume);
    }

    /// Adds (or with a negative delta removes) volume, clamped into `[0, 1]`.
    pub fn add_volume(&mut self, delta: f32) {
        self.set_volume(self.volume + delta);
    }

    /// Writes the persistent part of the cell.
    pub fn save_additional(&self, nbt: &mut NbtCompound) {
        nbt.insert("Type", NbtTag::Int(i32::from(self.phase.id())));
        nbt.insert("Volume", NbtTag::Float(self.volume));
        nbt.insert("VX", NbtTag::Float(self.velocity.x));
        nbt.insert("VY", NbtTag::Float(self.velocity.y));
        nbt.insert("VZ", NbtTag::Float(self.velocity.z));
        nbt.insert("CachedTemp", NbtTag::Float(self.temperature));
        nbt.insert("Pressure", NbtTag::Float(self.pressure));
        nbt.insert("Neighbors", NbtTag::Int(i32::from(self.neighbors.bits())));
        nbt.insert("PrevX", NbtTag::Int(self.prev_pos.x()));
        nbt.insert("PrevY", NbtTag::Int(self.prev_pos.y()));
        nbt.insert("PrevZ", NbtTag::Int(self.prev_pos.z()));
    }

    /// Reads a cell saved at `pos`. Missing tags fall back to a resting full water cell.
    #[must_use]
    pub fn load_additional(nbt: &NbtCompound, pos: BlockPos) -> Self {
        let int = |key: &str| nbt.get(key).and_then(nbt_i32);

        let phase = int("Type").map_or(Phase::Water, Phase::by_id);
        let mut cell = Self::new(phase, float_or(nbt, "Volume", 1.0), pos);
        cell.velocity = Vector3::new(
            float_or(nbt, "VX", 0.0),
            float_or(nbt, "VY", 0.0),
            float_or(nbt, "VZ", 0.0),
        );
        cell.temperature = float_or(nbt, "CachedTemp", 0.0);
        cell.pressure = float_or(nbt, "Pressure", 0.0).max(0.0);
        cell.neighbors = int("Neighbors")
            .map_or(NeighborMask::empty(), |bits| NeighborMask::from_bits_truncate(bits as u8));
        if let (Some(x), Some(y), Some(z)) = (int("PrevX"), int("PrevY"), int("PrevZ")) {
            cell.prev_pos = BlockPos::new(x, y, z);
        }
        cell
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_ids_and_names() {
        assert_eq!(Phase::Water.id(), 0);
        assert_eq!(Phase::Ice.id(), 1);
        assert_eq!(Phase::Steam.id(), 2);
        assert_eq!(Phase::Snow.id(), 3);
        assert_eq!(Phase::Hail.id(), 4);
        for phase in Phase::ALL {
            assert_eq!(Phase::by_id(i32::from(phase.id())), phase);
            assert_eq!(Phase::by_name(phase.name()), phase);
        }
        assert_eq!(Phase::by_name("HAIL"), Phase::Hail);
    }

    #[test]
    fn test_phase_motion_classes() {
        let mobile: Vec<Phase> = Phase::ALL.into_iter().filter(|phase| phase.is_mobile()).collect();
        assert_eq!(mobile, [Phase::Water, Phase::Steam, Phase::Snow, Phase::Hail]);
        let particulate: Vec<Phase> =
            Phase::ALL.into_iter().filter(|phase| phase.is_particulate()).collect();
        assert_eq!(particulate, [Phase::Snow, Phase::Hail]);
    }

    #[test]
    fn test_unknown_phase_falls_back_to_water() {
        assert_eq!(Phase::by_id(17), Phase::Water);
        assert_eq!(Phase::by_id(-1), Phase::Water);
        assert_eq!(Phase::by_name("lava"), Phase::Water);
    }

    #[test]
    fn test_neighbor_bits() {
        assert_eq!(NeighborMask::from_direction(Direction::East).bits(), 1);
        assert_eq!(NeighborMask::from_direction(Direction::West).bits(), 2);
        assert_eq!(NeighborMask::from_direction(Direction::Up).bits(), 4);
        assert_eq!(NeighborMask::from_direction(Direction::Down).bits(), 8);
        assert_eq!(NeighborMask::from_direction(Direction::South).bits(), 16);
        assert_eq!(NeighborMask::from_direction(Direction::North).bits(), 32);
    }

    #[test]
    fn test_volume_is_clamped() {
        let pos = BlockPos::ZERO;
        assert_eq!(FluidCell::new(Phase::Water, 1.7, pos).volume(), 1.0);
        assert_eq!(FluidCell::new(Phase::Water, -0.3, pos).volume(), 0.0);
        assert_eq!(FluidCell::new(Phase::Water, f32::NAN, pos).volume(), 0.0);

        let mut cell = FluidCell::new(Phase::Water, 0.8, pos);
        cell.add_volume(0.5);
        assert_eq!(cell.volume(), 1.0);
        cell.add_volume(-2.0);
        assert_eq!(cell.volume(), 0.0);
    }

    #[test]
    fn test_save_and_load_keep_visible_state() {
        let pos = BlockPos::new(4, 70, -9);
        let mut cell = FluidCell::new(Phase::Hail, 0.6, pos)
            .with_velocity(Vector3::new(0.1, -0.7, 0.2))
            .with_temperature(7.5)
            .with_pressure(1.5);
        cell.neighbors = NeighborMask::NEG_Y | NeighborMask::POS_X;
        cell.prev_pos = pos.above();

        let mut nbt = NbtCompound::new();
        cell.save_additional(&mut nbt);
        let loaded = FluidCell::load_additional(&nbt, pos);

        assert_eq!(loaded.phase, Phase::Hail);
        assert!((loaded.volume() - 0.6).abs() < 1e-6);
        assert_eq!(loaded.velocity, cell.velocity);
        assert_eq!(loaded.temperature, 7.5);
        assert_eq!(loaded.neighbors, cell.neighbors);
        assert_eq!(loaded.prev_pos, pos.above());
        assert_eq!(loaded.next_pos, pos);
    }

    #[test]
    fn test_load_defaults_and_clamps() {
        let mut nbt = NbtCompound::new();
        nbt.insert("Volume", NbtTag::Float(3.0));
        let cell = FluidCell::load_additional(&nbt, BlockPos::ZERO);
        assert_eq!(cell.phase, Phase::Water);
        assert_eq!(cell.volume(), 1.0);
        assert!(cell.velocity.is_zero());

        let empty = FluidCell::load_additional(&NbtCompound::new(), BlockPos::ZERO);
        assert_eq!(empty.volume(), 1.0, "missing volume loads as a full cell");
    }
}
