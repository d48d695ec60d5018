//! Helpers that pour water into a level in simple shapes.

use rainvox_utils::BlockPos;

use crate::cell::FluidCell;
use crate::level::FluidLevel;
use crate::world::WorldQuery;

/// Fills the inclusive box between `from` and `to` with full water cells.
///
/// Positions that are solid, outside the build range, or already hold a cell are skipped.
/// Returns the number of cells placed.
pub fn fill_box<W: WorldQuery + ?Sized>(level: &mut FluidLevel, world: &W, from: BlockPos, to: BlockPos) -> usize {
    let (min_x, max_x) = (from.x().min(to.x()), from.x().max(to.x()));
    let (min_y, max_y) = (from.y().min(to.y()), from.y().max(to.y()));
    let (min_z, max_z) = (from.z().min(to.z()), from.z().max(to.z()));

    let mut placed = 0;
    for x in min_x..=max_x {
        for y in min_y..=max_y {
            for z in min_z..=max_z {
                if place_water(level, world, BlockPos::new(x, y, z)) {
                    placed += 1;
                }
            }
        }
    }
    placed
}

/// Fills a ball of the given radius around `center` with full water cells.
///
/// Skips the same positions as [`fill_box`]. Returns the number of cells placed.
pub fn fill_sphere<W: WorldQuery + ?Sized>(
    level: &mut FluidLevel,
    world: &W,
    center: BlockPos,
    radius: i32,
) -> usize {
    let radius = radius.max(0);
    let limit = radius * radius;
    let mut placed = 0;
    for dx in -radius..=radius {
        for dy in -radius..=radius {
            for dz in -radius..=radius {
                if dx * dx + dy * dy + dz * dz > limit {
                    continue;
                }
                if place_water(level, world, center.offset(dx, dy, dz)) {
                    placed += 1;
                }
            }
        }
    }
    log::debug!("Filled sphere at {center} (radius {radius}) with {placed} cells");
    placed
}

fn place_water<W: WorldQuery + ?Sized>(level: &mut FluidLevel, world: &W, pos: BlockPos) -> bool {
    if level.is_occupied(pos, world) {
        return false;
    }
    level.place_cell(pos, FluidCell::water(pos));
    true
}
