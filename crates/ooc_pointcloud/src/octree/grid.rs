//! Spatial grid used to decimate points to one octant's resolution.
//!
//! ```text
//!   octant cube (size S)            cell = S / 128
//!  ┌───┬───┬───┬───┐
//!  │   │ · │   │   │   · occupant (kept at this level)
//!  ├───┼───┼───┼───┤
//!  │   │ ·x│   │ · │   x too close to a neighbour occupant -> demoted
//!  ├───┼───┼───┼───┤
//!  │ · │   │   │   │
//!  └───┴───┴───┴───┘
//! ```
//!
//! Every accepted point is at least one cell size away from every other
//! occupant. Demoted points are handed back to the caller, which stores them
//! in the owning octant and later pushes them down to the children.
//!
//! Cells are sparse: only occupied cells are materialized.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use glam::DVec3;

use crate::accessor::PointAccessor;

/// Cells per axis.
pub const GRID_SIZE: usize = 128;

/// log2(GRID_SIZE), used to pack cell coordinates.
pub const GRID_SHIFT: u32 = 7;

/// Neighbour offsets: the 3x3x3 block around a cell, minus the cell itself.
const NEIGHBOUR_OFFSETS: [[i32; 3]; 26] = {
  let mut offsets = [[0i32; 3]; 26];
  let mut n = 0;
  let mut i = 0;
  while i < 27 {
    let x = (i / 9) as i32 - 1;
    let y = ((i / 3) % 3) as i32 - 1;
    let z = (i % 3) as i32 - 1;
    if !(x == 0 && y == 0 && z == 0) {
      offsets[n] = [x, y, z];
      n += 1;
    }
    i += 1;
  }
  offsets
};

/// Pack cell coordinates into a single key.
#[inline(always)]
pub const fn cell_key(x: usize, y: usize, z: usize) -> u32 {
  ((x << (2 * GRID_SHIFT)) | (y << GRID_SHIFT) | z) as u32
}

/// One occupied grid cell.
#[derive(Clone, Debug)]
struct Cell<P> {
  center: DVec3,
  position: DVec3,
  occupant: P,
}

/// Fixed-resolution 128³ grid over one octant's cube.
#[derive(Debug)]
pub struct SpatialGrid<P> {
  min: DVec3,
  cell_size: f64,
  cells: HashMap<u32, Cell<P>>,
}

impl<P> SpatialGrid<P> {
  /// Grid covering the cube at `center` with edge length `size`.
  pub fn new(center: DVec3, size: f64) -> Self {
    Self {
      min: center - DVec3::splat(size * 0.5),
      cell_size: size / GRID_SIZE as f64,
      cells: HashMap::new(),
    }
  }

  /// Edge length of one cell (the octant's resolution).
  #[inline]
  pub fn cell_size(&self) -> f64 {
    self.cell_size
  }

  /// Number of occupied cells.
  pub fn len(&self) -> usize {
    self.cells.len()
  }

  /// True if no cell is occupied.
  pub fn is_empty(&self) -> bool {
    self.cells.is_empty()
  }

  /// Cell coordinates of a position, clamped to the grid.
  pub fn cell_coords(&self, position: DVec3) -> [usize; 3] {
    let rel = (position - self.min) / self.cell_size;
    let clamp = |v: f64| (v.floor().max(0.0) as usize).min(GRID_SIZE - 1);
    [clamp(rel.x), clamp(rel.y), clamp(rel.z)]
  }

  /// World-space center of a cell.
  pub fn cell_center(&self, [x, y, z]: [usize; 3]) -> DVec3 {
    self.min + (DVec3::new(x as f64, y as f64, z as f64) + 0.5) * self.cell_size
  }

  /// Insert a point.
  ///
  /// Returns the point demoted to the owning octant, if any: either the new
  /// point (too close to a neighbour occupant) or the previous occupant of the
  /// target cell (farther from the cell center than the new point).
  pub fn insert<A>(&mut self, accessor: &A, point: P) -> Option<P>
  where
    A: PointAccessor<Point = P>,
  {
    let position = accessor.position(&point);
    let coords = self.cell_coords(position);

    if self.too_close_to_neighbour(coords, position) {
      return Some(point);
    }

    let center = self.cell_center(coords);
    match self.cells.entry(cell_key(coords[0], coords[1], coords[2])) {
      Entry::Vacant(slot) => {
        slot.insert(Cell {
          center,
          position,
          occupant: point,
        });
        None
      }
      Entry::Occupied(mut slot) => {
        let cell = slot.get_mut();
        if position.distance_squared(center) < cell.position.distance_squared(cell.center) {
          cell.position = position;
          Some(std::mem::replace(&mut cell.occupant, point))
        } else {
          Some(point)
        }
      }
    }
  }

  fn too_close_to_neighbour(&self, [x, y, z]: [usize; 3], position: DVec3) -> bool {
    let min_dist_sq = self.cell_size * self.cell_size;
    NEIGHBOUR_OFFSETS.iter().any(|[dx, dy, dz]| {
      let (Some(nx), Some(ny), Some(nz)) = (
        offset_coord(x, *dx),
        offset_coord(y, *dy),
        offset_coord(z, *dz),
      ) else {
        return false;
      };
      self
        .cells
        .get(&cell_key(nx, ny, nz))
        .is_some_and(|cell| cell.position.distance_squared(position) < min_dist_sq)
    })
  }

  /// Occupant positions (unordered).
  pub fn occupant_positions(&self) -> impl Iterator<Item = DVec3> + '_ {
    self.cells.values().map(|c| c.position)
  }

  /// Consume the grid, returning occupants ordered by cell.
  pub fn into_occupants(self) -> Vec<P> {
    let mut cells: Vec<_> = self.cells.into_iter().collect();
    cells.sort_unstable_by_key(|(key, _)| *key);
    cells.into_iter().map(|(_, cell)| cell.occupant).collect()
  }
}

#[inline]
fn offset_coord(v: usize, d: i32) -> Option<usize> {
  let n = v as i32 + d;
  (0..GRID_SIZE as i32).contains(&n).then_some(n as usize)
}

#[cfg(test)]
#[path = "grid_test.rs"]
mod grid_test;
