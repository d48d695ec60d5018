//! Buffered writes of one firing and the pass that applies them.

use rainvox_utils::BlockPos;
use rainvox_utils::math::Vector3;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::cell::{FluidCell, NeighborMask, Phase};
use crate::flow::snapshot::TickSnapshot;
use crate::level::FluidLevel;
use crate::world::WorldQuery;

/// New own-state of a processed cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellUpdate {
    /// Position the cell was processed at.
    pub pos: BlockPos,
    /// Phase after transition.
    pub phase: Phase,
    /// Velocity after forces and damping.
    pub velocity: Vector3<f32>,
    /// Freshly computed pressure.
    pub pressure: f32,
    /// Sampled ambient temperature.
    pub temperature: f32,
    /// Occupied neighbours.
    pub neighbors: NeighborMask,
    /// Where the cell wants to go. Equal to `pos` when resting.
    pub next_pos: BlockPos,
}

/// A whole-cell relocation staged during compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PendingMove {
    /// Current position.
    pub from: BlockPos,
    /// Target position, vacant at snapshot time.
    pub to: BlockPos,
}

/// What the commit pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitStats {
    /// Cells relocated.
    pub moved: usize,
    /// Moves dropped because their target got taken first.
    pub cancelled: usize,
    /// Cells created by equalization and overflow.
    pub created: usize,
    /// Cells removed for falling under the minimum volume.
    pub removed: usize,
}

/// Everything the compute pass wants to change, applied in one deterministic pass.
#[derive(Debug, Default)]
pub struct TickPlan {
    updates: Vec<CellUpdate>,
    deltas: FxHashMap<BlockPos, f32>,
    creations: FxHashMap<BlockPos, FluidCell>,
    moves: Vec<PendingMove>,
    /// Volume promised to each receiving position this firing.
    reserved: FxHashMap<BlockPos, f32>,
}

impl TickPlan {
    /// Creates an empty plan.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the new own-state of a processed cell.
    pub fn update(&mut self, update: CellUpdate) {
        self.updates.push(update);
    }

    /// Volume `pos` can still accept this firing.
    #[must_use]
    pub fn capacity(&self, snapshot: &TickSnapshot, pos: BlockPos) -> f32 {
        let reserved = self.reserved.get(&pos).copied().unwrap_or(0.0);
        (1.0 - snapshot.volume_at(pos) - reserved).max(0.0)
    }

    /// Moves `amount` from `from` into the existing cell at `to`.
    pub fn transfer(&mut self, from: BlockPos, to: BlockPos, amount: f32) {
        if amount <= 0.0 {
            return;
        }
        *self.deltas.entry(from).or_insert(0.0) -= amount;
        *self.deltas.entry(to).or_insert(0.0) += amount;
        *self.reserved.entry(to).or_insert(0.0) += amount;
    }

    /// Moves `amount` from `from` into a new cell at the vacant `to`.
    ///
    /// Several donors may target the same position. Their contributions merge into one cell
    /// whose velocity is the volume weighted mean.
    pub fn create(&mut self, from: BlockPos, to: BlockPos, amount: f32, template: FluidCell) {
        if amount <= 0.0 {
            return;
        }
        *self.deltas.entry(from).or_insert(0.0) -= amount;
        *self.reserved.entry(to).or_insert(0.0) += amount;
        match self.creations.get_mut(&to) {
            Some(pending) => merge_into(pending, &template, amount),
            None => {
                let mut cell = template;
                cell.set_volume(amount);
                self.creations.insert(to, cell);
            }
        }
    }

    /// Stages a whole-cell move.
    pub fn relocate(&mut self, from: BlockPos, to: BlockPos) {
        self.moves.push(PendingMove { from, to });
    }

    /// Staged moves.
    #[must_use]
    pub fn moves(&self) -> &[PendingMove] {
        &self.moves
    }

    /// Staged own-state updates.
    #[must_use]
    pub fn updates(&self) -> &[CellUpdate] {
        &self.updates
    }

    /// Net volume change staged for `pos`.
    #[must_use]
    pub fn delta(&self, pos: BlockPos) -> f32 {
        self.deltas.get(&pos).copied().unwrap_or(0.0)
    }

    /// The cell staged for creation at `pos`.
    #[must_use]
    pub fn creation(&self, pos: BlockPos) -> Option<&FluidCell> {
        self.creations.get(&pos)
    }

    /// Applies the plan.
    ///
    /// Order: own-state updates, volume deltas, creations, moves sorted by source position,
    /// then removal of every touched cell under `min_volume`. A move whose target is occupied
    /// by the time it is applied is dropped and its velocity is reflected by `collision_damping`.
    pub fn commit<W: WorldQuery + ?Sized>(
        self,
        level: &mut FluidLevel,
        world: &W,
        min_volume: f32,
        collision_damping: f32,
    ) -> CommitStats {
        let Self {
            updates,
            deltas,
            creations,
            mut moves,
            reserved: _,
        } = self;
        let mut stats = CommitStats::default();
        let mut touched: FxHashSet<BlockPos> = FxHashSet::default();

        for update in updates {
            let Some(cell) = level.cell_mut(update.pos) else {
                log::warn!("Fluid cell at {} vanished before commit", update.pos);
                continue;
            };
            cell.phase = update.phase;
            cell.velocity = update.velocity;
            cell.pressure = update.pressure;
            cell.temperature = update.temperature;
            cell.neighbors = update.neighbors;
            cell.next_pos = update.next_pos;
            touched.insert(update.pos);
        }

        for (pos, delta) in deltas {
            if let Some(cell) = level.cell_mut(pos) {
                cell.add_volume(delta);
                touched.insert(pos);
            }
        }

        let mut creations: Vec<(BlockPos, FluidCell)> = creations.into_iter().collect();
        creations.sort_unstable_by_key(|(pos, _)| *pos);
        for (pos, cell) in creations {
            match level.cell_mut(pos) {
                Some(existing) => {
                    let amount = cell.volume();
                    merge_into(existing, &cell, amount);
                }
                None => {
                    level.place_cell(pos, cell);
                    stats.created += 1;
                }
            }
            touched.insert(pos);
        }

        moves.sort_unstable();
        for PendingMove { from, to } in moves {
            if !level.contains(from) {
                continue;
            }
            if level.is_occupied(to, world) {
                if let Some(cell) = level.cell_mut(from) {
                    reflect(&mut cell.velocity, from, to, collision_damping);
                    cell.next_pos = from;
                }
                stats.cancelled += 1;
                continue;
            }
            if level.relocate(from, to) {
                touched.remove(&from);
                touched.insert(to);
                stats.moved += 1;
            }
        }

        let mut touched: Vec<BlockPos> = touched.into_iter().collect();
        touched.sort_unstable();
        for pos in touched {
            let underflow = level.cell(pos).is_some_and(|cell| cell.volume() < min_volume);
            if underflow {
                level.clear_cell(pos);
                stats.removed += 1;
            }
        }

        stats
    }
}

/// Adds `amount` of `incoming` into `target`, blending velocity by volume.
fn merge_into(target: &mut FluidCell, incoming: &FluidCell, amount: f32) {
    let before = target.volume();
    let total = before + amount;
    if total > 0.0 {
        target.velocity = target.velocity * (before / total) + incoming.velocity * (amount / total);
        target.pressure = target.pressure.max(incoming.pressure);
    }
    target.add_volume(amount);
}

fn reflect(velocity: &mut Vector3<f32>, from: BlockPos, to: BlockPos, damping: f32) {
    if to.x() != from.x() {
        velocity.x *= damping;
    }
    if to.y() != from.y() {
        velocity.y *= damping;
    }
    if to.z() != from.z() {
        velocity.z *= damping;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::SimpleWorld;

    fn water_level(cells: &[(BlockPos, f32)]) -> FluidLevel {
        let mut level = FluidLevel::new();
        for (pos, volume) in cells {
            level.place_cell(*pos, FluidCell::new(Phase::Water, *volume, *pos));
        }
        level
    }

    #[test]
    fn test_capacity_accounts_for_reservations() {
        let world = SimpleWorld::new(0);
        let a = BlockPos::new(0, 5, 0);
        let b = BlockPos::new(1, 5, 0);
        let level = water_level(&[(a, 1.0), (b, 0.6)]);
        let snapshot = TickSnapshot::capture(&level, &world, 0.99);

        let mut plan = TickPlan::new();
        assert!((plan.capacity(&snapshot, b) - 0.4).abs() < 1e-6);
        plan.transfer(a, b, 0.3);
        assert!((plan.capacity(&snapshot, b) - 0.1).abs() < 1e-6);
        assert!((plan.delta(a) + 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_creations_merge() {
        let a = BlockPos::new(0, 1, 0);
        let b = BlockPos::new(2, 1, 0);
        let target = BlockPos::new(1, 1, 0);
        let mut plan = TickPlan::new();
        let east = FluidCell::new(Phase::Water, 0.0, target).with_velocity(Vector3::new(0.4, 0.0, 0.0));
        let west = FluidCell::new(Phase::Water, 0.0, target).with_velocity(Vector3::new(-0.4, 0.0, 0.0));
        plan.create(a, target, 0.2, east);
        plan.create(b, target, 0.2, west);

        let merged = plan.creation(target).expect("creation should be staged");
        assert!((merged.volume() - 0.4).abs() < 1e-6);
        assert!(merged.velocity.x.abs() < 1e-6, "opposite velocities should cancel");
    }

    #[test]
    fn test_commit_conserves_transferred_volume() {
        let world = SimpleWorld::new(0).with_floor(0);
        let a = BlockPos::new(0, 1, 0);
        let b = BlockPos::new(1, 1, 0);
        let c = BlockPos::new(2, 1, 0);
        let mut level = water_level(&[(a, 1.0), (b, 0.2)]);

        let mut plan = TickPlan::new();
        plan.transfer(a, b, 0.3);
        plan.create(a, c, 0.25, FluidCell::new(Phase::Water, 0.0, c));
        let stats = plan.commit(&mut level, &world, 0.01, -0.5);

        assert_eq!(stats.created, 1);
        assert!((level.total_volume() - 1.2).abs() < 1e-5);
        assert!((level.cell(a).map_or(0.0, FluidCell::volume) - 0.45).abs() < 1e-5);
        assert!(level.incoherent_positions().is_empty());
    }

    #[test]
    fn test_moves_apply_in_source_order() {
        let world = SimpleWorld::new(0).with_floor(0);
        let low = BlockPos::new(0, 2, 0);
        let high = BlockPos::new(0, 3, 0);
        let target = BlockPos::new(1, 2, 0);
        let mut level = water_level(&[(low, 1.0), (high, 1.0)]);
        if let Some(cell) = level.cell_mut(high) {
            cell.velocity = Vector3::new(0.8, -0.6, 0.0);
        }

        let mut plan = TickPlan::new();
        plan.relocate(high, target);
        plan.relocate(low, target);
        let stats = plan.commit(&mut level, &world, 0.01, -0.5);

        assert_eq!(stats.moved, 1);
        assert_eq!(stats.cancelled, 1);
        assert!(level.contains(target));
        assert!(!level.contains(low), "the lower source sorts first and wins");
        let loser = level.cell(high).expect("cancelled cell stays");
        assert!((loser.velocity.x + 0.4).abs() < 1e-6);
        assert!((loser.velocity.y - 0.3).abs() < 1e-6);
        assert!(loser.velocity.z.abs() < 1e-6);
    }

    #[test]
    fn test_underflow_is_removed() {
        let world = SimpleWorld::new(0).with_floor(0);
        let a = BlockPos::new(0, 1, 0);
        let b = BlockPos::new(1, 1, 0);
        let mut level = water_level(&[(a, 0.3), (b, 0.2)]);

        let mut plan = TickPlan::new();
        plan.transfer(a, b, 0.295);
        let stats = plan.commit(&mut level, &world, 0.01, -0.5);

        assert_eq!(stats.removed, 1);
        assert!(!level.contains(a));
        assert!(!level.index().contains(a));
        assert!(level.incoherent_positions().is_empty());
    }
}
