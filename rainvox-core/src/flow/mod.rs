//! Per-firing fluid physics.
//!
//! Every cell is computed against a [`TickSnapshot`] taken before the pass starts, and all writes
//! go into a [`TickPlan`] that is applied afterwards. Water is volume tracked: unsupported water
//! drops one block per firing, water over a partly filled cell streams into it, and resting water
//! equalizes with its horizontal neighbours and spills over edges. Snow, hail and steam move as
//! whole cells driven by their velocity. Ice does not move.

pub mod plan;
pub mod snapshot;

use rainvox_utils::math::Vector3;
use rainvox_utils::{BlockPos, Direction};
use serde::Deserialize;
use smallvec::SmallVec;

use crate::cell::{FluidCell, NeighborMask, Phase};
use crate::environment::{EnvironmentConfig, EnvironmentSampler};
use crate::level::FluidLevel;
use crate::phase::{PhaseParams, needs_hail_roll, next_phase};
use crate::world::WorldQuery;

pub use plan::{CellUpdate, CommitStats, PendingMove, TickPlan};
pub use snapshot::{CellView, TickSnapshot};

/// Tuning constants of the flow model.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct FlowParams {
    /// Cells with less volume are removed.
    pub min_volume: f32,
    /// Water at or above this supports whatever rests on it.
    pub full_volume: f32,
    /// Water at or above this spills over edges.
    pub high_water: f32,
    /// How many cells above are summed into pressure.
    pub pressure_column: u32,
    /// Pressure added when the column ends at a solid ceiling.
    pub ceiling_penalty: f32,
    /// Multiplier applied to the summed column.
    pub pressure_scale: f32,
    /// Pressure at or above which water spills over edges regardless of volume.
    pub overflow_pressure: f32,
    /// Share of a volume difference handed to a lower water neighbour per firing.
    pub equalize_fraction: f32,
    /// Differences below this are left alone.
    pub equalize_epsilon: f32,
    /// Horizontal speed of cells created by spreading.
    pub spread_velocity: f32,
    /// Share of the donor's pressure a spread cell starts with.
    pub spread_pressure_factor: f32,
    /// Share of the remaining volume spilled per edge.
    pub overflow_fraction: f32,
    /// Most volume spilled per edge.
    pub overflow_cap: f32,
    /// Outward speed of spilled cells.
    pub overflow_velocity_horizontal: f32,
    /// Vertical speed of spilled cells.
    pub overflow_velocity_vertical: f32,
    /// Downward acceleration of water and hail per firing.
    pub gravity: f32,
    /// Fastest fall of water and hail.
    pub terminal_velocity: f32,
    /// Vertical speed needed to move a block.
    pub vertical_threshold: f32,
    /// Horizontal speed that must be exceeded to move a block.
    pub horizontal_threshold: f32,
    /// Horizontal velocity decay of water, snow and steam.
    pub water_damping_horizontal: f32,
    /// Vertical velocity decay of water.
    pub water_damping_vertical: f32,
    /// Horizontal velocity decay of hail.
    pub hail_damping_horizontal: f32,
    /// Share of the impact speed hail keeps when bouncing.
    pub hail_restitution: f32,
    /// Size of the random horizontal kick of a bounce.
    pub hail_kick: f32,
    /// Upward acceleration of steam.
    pub steam_buoyancy: f32,
    /// Fastest rise of steam.
    pub steam_max_rise: f32,
    /// Size of the random horizontal drift of steam.
    pub steam_jitter: f32,
    /// Downward acceleration of snow.
    pub snow_gravity: f32,
    /// Fastest fall of snow.
    pub snow_terminal_velocity: f32,
    /// Factor applied to a velocity component that hit something.
    pub collision_damping: f32,
}

impl Default for FlowParams {
    fn default() -> Self {
        Self {
            min_volume: 0.01,
            full_volume: 0.99,
            high_water: 0.95,
            pressure_column: 16,
            ceiling_penalty: 2.0,
            pressure_scale: 0.5,
            overflow_pressure: 2.0,
            equalize_fraction: 0.25,
            equalize_epsilon: 0.05,
            spread_velocity: 0.4,
            spread_pressure_factor: 0.8,
            overflow_fraction: 0.3,
            overflow_cap: 0.5,
            overflow_velocity_horizontal: 0.5,
            overflow_velocity_vertical: -0.3,
            gravity: 0.2,
            terminal_velocity: 1.2,
            vertical_threshold: 0.5,
            horizontal_threshold: 0.3,
            water_damping_horizontal: 0.9,
            water_damping_vertical: 0.95,
            hail_damping_horizontal: 0.96,
            hail_restitution: 0.6,
            hail_kick: 0.5,
            steam_buoyancy: 0.08,
            steam_max_rise: 1.0,
            steam_jitter: 0.4,
            snow_gravity: 0.1,
            snow_terminal_velocity: 0.6,
            collision_damping: -0.5,
        }
    }
}

impl FlowParams {
    /// Checks that every constant is in a range the model can work with.
    pub fn validate(&self) -> Result<(), &'static str> {
        let unit = 0.0..=1.0;
        if !(self.min_volume > 0.0 && self.min_volume < self.full_volume) {
            return Err("min_volume must be positive and below full_volume");
        }
        if !unit.contains(&self.full_volume) || !unit.contains(&self.high_water) {
            return Err("full_volume and high_water must be in 0..1");
        }
        if !unit.contains(&self.equalize_fraction) || !unit.contains(&self.overflow_fraction) {
            return Err("equalize_fraction and overflow_fraction must be in 0..1");
        }
        if self.pressure_column == 0 || self.pressure_column > 256 {
            return Err("pressure_column must be in 1..256");
        }
        if self.vertical_threshold <= 0.0 || self.horizontal_threshold <= 0.0 {
            return Err("motion thresholds must be positive");
        }
        if self.terminal_velocity <= 0.0 || self.snow_terminal_velocity <= 0.0 || self.steam_max_rise <= 0.0 {
            return Err("terminal velocities must be positive");
        }
        if !(-1.0..=0.0).contains(&self.collision_damping) {
            return Err("collision_damping must be in -1..0");
        }
        Ok(())
    }
}

/// Computes what every cell does in a firing.
#[derive(Debug, Clone, Default)]
pub struct FlowEngine {
    params: FlowParams,
    phase: PhaseParams,
}

impl FlowEngine {
    /// Creates an engine.
    #[must_use]
    pub const fn new(params: FlowParams, phase: PhaseParams) -> Self {
        Self { params, phase }
    }

    /// The flow constants.
    #[must_use]
    pub const fn params(&self) -> &FlowParams {
        &self.params
    }

    /// The phase rule constants.
    #[must_use]
    pub const fn phase_params(&self) -> &PhaseParams {
        &self.phase
    }

    /// Snapshots `level`, computes every cell in `order` and commits the result.
    pub fn run<W: WorldQuery + ?Sized>(
        &self,
        order: &[BlockPos],
        level: &mut FluidLevel,
        world: &mut W,
        sampler: &EnvironmentSampler,
        environment: &EnvironmentConfig,
    ) -> CommitStats {
        let snapshot = TickSnapshot::capture(level, &*world, self.params.full_volume);
        let plan = self.compute(order, level, &snapshot, world, sampler, environment);
        plan.commit(level, &*world, self.params.min_volume, self.params.collision_damping)
    }

    /// The compute pass. Reads `level` only to fetch each processed cell's own state.
    pub fn compute<W: WorldQuery + ?Sized>(
        &self,
        order: &[BlockPos],
        level: &FluidLevel,
        snapshot: &TickSnapshot,
        world: &mut W,
        sampler: &EnvironmentSampler,
        environment: &EnvironmentConfig,
    ) -> TickPlan {
        let mut plan = TickPlan::new();
        let game_time = world.game_time();
        for &pos in order {
            let Some(cell) = level.cell(pos) else {
                continue;
            };
            let biome = world.biome_at(pos);
            let temperature = sampler.temperature(pos, biome, game_time, environment.temperature_offset());
            self.compute_cell(pos, cell, temperature, snapshot, world, &mut plan);
        }
        plan
    }

    fn compute_cell<W: WorldQuery + ?Sized>(
        &self,
        pos: BlockPos,
        cell: &FluidCell,
        temperature: f32,
        snapshot: &TickSnapshot,
        world: &mut W,
        plan: &mut TickPlan,
    ) {
        let freeze_support = [Direction::East, Direction::West, Direction::Down]
            .into_iter()
            .filter(|dir| snapshot.is_occupied(&*world, pos.relative(*dir)))
            .count() as u8;
        let hail_roll = if needs_hail_roll(cell.phase, temperature, &self.phase) {
            Some(world.random_float())
        } else {
            None
        };
        let phase = next_phase(cell.phase, temperature, freeze_support, hail_roll, &self.phase);
        if phase != cell.phase {
            log::trace!(
                "Fluid cell at {pos} turned from {} to {} at {temperature:.1}C",
                cell.phase.name(),
                phase.name()
            );
        }

        let mut neighbors = NeighborMask::empty();
        for dir in Direction::ALL {
            if snapshot.is_occupied(&*world, pos.relative(dir)) {
                neighbors |= NeighborMask::from_direction(dir);
            }
        }

        let mut update = CellUpdate {
            pos,
            phase,
            velocity: cell.velocity,
            pressure: 0.0,
            temperature,
            neighbors,
            next_pos: pos,
        };
        if !phase.is_mobile() {
            update.velocity = Vector3::ZERO;
        } else if phase.is_particulate() || phase == Phase::Steam {
            self.particle_step(snapshot, world, plan, &mut update);
        } else {
            self.water_step(cell.volume(), snapshot, &*world, plan, &mut update);
        }
        plan.update(update);
    }

    /// Pressure at `pos`: the water volume in the column above, plus a penalty for a solid
    /// ceiling right on top of it.
    pub fn pressure<W: WorldQuery + ?Sized>(&self, pos: BlockPos, snapshot: &TickSnapshot, world: &W) -> f32 {
        let p = &self.params;
        let mut sum = 0.0;
        let mut cursor = pos;
        for _ in 0..p.pressure_column {
            cursor = cursor.above();
            match snapshot.cell(cursor) {
                Some(view) if view.phase == Phase::Water => sum += view.volume,
                Some(_) => break,
                None => {
                    if snapshot.is_terrain(world, cursor) {
                        sum += p.ceiling_penalty;
                    }
                    break;
                }
            }
        }
        sum * p.pressure_scale
    }

    fn water_step<W: WorldQuery + ?Sized>(
        &self,
        volume: f32,
        snapshot: &TickSnapshot,
        world: &W,
        plan: &mut TickPlan,
        update: &mut CellUpdate,
    ) {
        let p = &self.params;
        let pos = update.pos;
        update.pressure = self.pressure(pos, snapshot, world);

        let below = pos.below();
        let mut velocity = update.velocity;
        velocity.x *= p.water_damping_horizontal;
        velocity.z *= p.water_damping_horizontal;

        if snapshot.is_vacant(world, below) {
            velocity.y = (velocity.y - p.gravity).max(-p.terminal_velocity);
            update.velocity = velocity;
            update.next_pos = below;
            plan.relocate(pos, below);
            return;
        }

        let streams_down = snapshot
            .cell(below)
            .is_some_and(|view| view.phase == Phase::Water && view.volume < p.full_volume);
        let remaining = if streams_down {
            let amount = volume.min(plan.capacity(snapshot, below));
            plan.transfer(pos, below, amount);
            velocity.y *= p.water_damping_vertical;
            update.velocity = velocity;
            volume - amount
        } else if snapshot.supports(world, below) {
            velocity.y = 0.0;
            update.velocity = velocity;
            self.equalize(volume, update, snapshot, world, plan)
        } else {
            // held up by something that is not support, such as steam
            velocity.y *= p.water_damping_vertical;
            update.velocity = velocity;
            volume
        };

        if volume >= p.high_water || update.pressure >= p.overflow_pressure {
            self.overflow(remaining, update, snapshot, world, plan);
        }
    }

    /// Evens out volume with horizontal water neighbours and fills empty but supported ones.
    ///
    /// Only the fuller side of a pair gives, so each pair is handled once per firing. The total
    /// given away never takes the cell below the neighbourhood mean. Returns the volume left.
    fn equalize<W: WorldQuery + ?Sized>(
        &self,
        volume: f32,
        own: &CellUpdate,
        snapshot: &TickSnapshot,
        world: &W,
        plan: &mut TickPlan,
    ) -> f32 {
        let p = &self.params;
        let pos = own.pos;
        let mut waters: SmallVec<[(BlockPos, f32); 4]> = SmallVec::new();
        let mut empties: SmallVec<[(Direction, BlockPos); 4]> = SmallVec::new();
        for dir in Direction::HORIZONTAL {
            let neighbor = pos.relative(dir);
            match snapshot.cell(neighbor) {
                Some(view) if view.phase == Phase::Water => waters.push((neighbor, view.volume)),
                Some(_) => {}
                None => {
                    if !snapshot.is_blocked(world, neighbor) && snapshot.supports(world, neighbor.below()) {
                        empties.push((dir, neighbor));
                    }
                }
            }
        }

        let total = volume + waters.iter().map(|(_, v)| *v).sum::<f32>();
        let mean = total / (1 + waters.len() + empties.len()) as f32;
        let surplus = volume - mean;
        if surplus <= 0.0 || (empties.is_empty() && surplus < p.equalize_epsilon) {
            return volume;
        }

        let water_wants: SmallVec<[f32; 4]> = waters
            .iter()
            .map(|(_, v)| {
                let diff = volume - v;
                if diff > p.equalize_epsilon { diff * p.equalize_fraction } else { 0.0 }
            })
            .collect();
        let wanted = water_wants.iter().sum::<f32>() + mean * empties.len() as f32;
        if wanted <= 0.0 {
            return volume;
        }
        let scale = (surplus / wanted).min(1.0);

        let mut remaining = volume;
        for ((neighbor, _), want) in waters.iter().zip(&water_wants) {
            let amount = (want * scale).min(plan.capacity(snapshot, *neighbor));
            if amount > 0.0 {
                plan.transfer(pos, *neighbor, amount);
                remaining -= amount;
            }
        }
        for (dir, neighbor) in empties {
            let amount = (mean * scale).min(plan.capacity(snapshot, neighbor));
            if amount < p.min_volume {
                continue;
            }
            let velocity = Vector3::new(
                dir.step_x() as f32 * p.spread_velocity,
                0.0,
                dir.step_z() as f32 * p.spread_velocity,
            );
            let mut template = FluidCell::new(Phase::Water, amount, neighbor)
                .with_velocity(velocity)
                .with_pressure(own.pressure * p.spread_pressure_factor)
                .with_temperature(own.temperature);
            template.prev_pos = pos;
            plan.create(pos, neighbor, amount, template);
            remaining -= amount;
        }
        remaining
    }

    /// Spills part of a brimming cell into every edge with a drop below it.
    fn overflow<W: WorldQuery + ?Sized>(
        &self,
        mut remaining: f32,
        own: &CellUpdate,
        snapshot: &TickSnapshot,
        world: &W,
        plan: &mut TickPlan,
    ) {
        let p = &self.params;
        let pos = own.pos;
        for dir in Direction::HORIZONTAL {
            let edge = pos.relative(dir);
            if !snapshot.is_vacant(world, edge) || !snapshot.is_vacant(world, edge.below()) {
                continue;
            }
            let amount = (remaining * p.overflow_fraction)
                .min(p.overflow_cap)
                .min(plan.capacity(snapshot, edge));
            if amount < p.min_volume {
                continue;
            }
            let velocity = Vector3::new(
                dir.step_x() as f32 * p.overflow_velocity_horizontal,
                p.overflow_velocity_vertical,
                dir.step_z() as f32 * p.overflow_velocity_horizontal,
            );
            let mut template = FluidCell::new(Phase::Water, amount, edge)
                .with_velocity(velocity)
                .with_temperature(own.temperature);
            template.prev_pos = pos;
            plan.create(pos, edge, amount, template);
            remaining -= amount;
        }
    }

    /// Velocity driven motion of snow, hail and steam.
    fn particle_step<W: WorldQuery + ?Sized>(
        &self,
        snapshot: &TickSnapshot,
        world: &mut W,
        plan: &mut TickPlan,
        update: &mut CellUpdate,
    ) {
        let p = &self.params;
        let pos = update.pos;
        let mut v = update.velocity;
        match update.phase {
            Phase::Steam => {
                v.y = (v.y + p.steam_buoyancy).min(p.steam_max_rise);
                v.x = (v.x + (world.random_float() - 0.5) * p.steam_jitter) * p.water_damping_horizontal;
                v.z = (v.z + (world.random_float() - 0.5) * p.steam_jitter) * p.water_damping_horizontal;
            }
            Phase::Snow => {
                v.y = (v.y - p.snow_gravity).max(-p.snow_terminal_velocity);
                v.x *= p.water_damping_horizontal;
                v.z *= p.water_damping_horizontal;
            }
            _ => {
                v.y = (v.y - p.gravity).max(-p.terminal_velocity);
                v.x *= p.hail_damping_horizontal;
                v.z *= p.hail_damping_horizontal;
            }
        }

        if v.y < 0.0 && snapshot.is_occupied(&*world, pos.below()) {
            if update.phase == Phase::Hail {
                v.y = -v.y * p.hail_restitution;
                v.x += (world.random_float() - 0.5) * p.hail_kick;
                v.z += (world.random_float() - 0.5) * p.hail_kick;
            } else {
                v.y = 0.0;
            }
        }

        let world = &*world;
        let mut dx = horizontal_step(v.x, p.horizontal_threshold);
        let mut dy = vertical_step(v.y, p.vertical_threshold);
        let mut dz = horizontal_step(v.z, p.horizontal_threshold);
        if dx != 0 && snapshot.is_occupied(world, pos.offset(dx, 0, 0)) {
            v.x *= p.collision_damping;
            dx = 0;
        }
        if dy != 0 && snapshot.is_occupied(world, pos.offset(0, dy, 0)) {
            v.y *= p.collision_damping;
            dy = 0;
        }
        if dz != 0 && snapshot.is_occupied(world, pos.offset(0, 0, dz)) {
            v.z *= p.collision_damping;
            dz = 0;
        }
        update.velocity = v;

        let target = pos.offset(dx, dy, dz);
        if target != pos && snapshot.is_vacant(world, target) {
            update.next_pos = target;
            plan.relocate(pos, target);
        }
    }
}

fn vertical_step(velocity: f32, threshold: f32) -> i32 {
    if velocity.abs() >= threshold { velocity.signum() as i32 } else { 0 }
}

fn horizontal_step(velocity: f32, threshold: f32) -> i32 {
    if velocity.abs() > threshold { velocity.signum() as i32 } else { 0 }
}
