//! Point cloud octree construction.
//!
//! Every octant keeps the points that survive decimation at its resolution
//! (one point per grid cell, see [`grid`]). Points the grid demotes are pushed
//! down into the children, which have half the size and half the resolution.
//!
//! ```text
//! level 0   ┌───────────────┐  resolution r       (coarse, sparse)
//!           │ ·     ·     · │
//! level 1   ├───────┬───────┤  resolution r/2
//!           │ · · · │ · · · │
//! level 2   ├───┬───┼───┬───┤  resolution r/4     (fine, dense)
//!           │:::│:::│:::│:::│
//!           └───┴───┴───┴───┘
//! ```
//!
//! An octant subdivides once it has demoted at least
//! [`BuildConfig::max_points_per_node`] points and is above
//! [`BuildConfig::max_level`]. Otherwise it becomes a leaf and stores its
//! demoted points alongside the grid occupants, so every input point ends up
//! in exactly one payload.
//!
//! # Module Structure
//!
//! - [`bounds`]: `DAabb3` and `Frustum`
//! - [`octant`]: `OctantId`, `OctantMeta`, write-side `Octant<P>`
//! - [`grid`]: `SpatialGrid` - 128³ decimation grid
//! - [`config`]: `BuildConfig` - bucket cap and level limit

pub mod bounds;
pub mod config;
pub mod grid;
pub mod octant;

use rayon::prelude::*;
use tracing::{debug, info};

// Re-exports
pub use bounds::{DAabb3, Frustum};
pub use config::BuildConfig;
pub use grid::{SpatialGrid, GRID_SIZE};
pub use octant::{Octant, OctantId, OctantMeta};

use crate::accessor::PointAccessor;
use crate::error::{OocError, Result};

/// Octree built from an in-memory point set.
pub struct Octree<A: PointAccessor> {
  accessor: A,
  root: Octant<A::Point>,
  config: BuildConfig,
  max_level: u32,
}

impl<A: PointAccessor> Octree<A> {
  /// Build the octree for `points`.
  ///
  /// The root cube is centered on the points' bounding box and sized to its
  /// longest axis (plus 0.01%), with resolution `size / 128`.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "octree::build"))]
  pub fn build(accessor: A, points: Vec<A::Point>, config: BuildConfig) -> Result<Self> {
    let bounds = DAabb3::from_points(points.iter().map(|p| accessor.position(p)))
      .ok_or(OocError::EmptyPointSet)?;

    let size = match bounds.enclosing_cube_size() {
      s if s > 0.0 => s,
      // Single point or all duplicates.
      _ => 1.0,
    };
    let meta = OctantMeta::root(OctantId::new(), bounds.center(), size, size / GRID_SIZE as f64);

    let input_count = points.len();
    let mut root = Octant::new(meta);
    let max_level = fill(&accessor, &config, &mut root, points);

    let octree = Self {
      accessor,
      root,
      config,
      max_level,
    };

    info!(
      points = input_count,
      octants = octree.octant_count(),
      max_level,
      root_size = size,
      "octree built"
    );
    Ok(octree)
  }

  /// Assemble an octree from an existing root, e.g. one read back from disk.
  pub fn from_parts(accessor: A, root: Octant<A::Point>, config: BuildConfig, max_level: u32) -> Self {
    Self {
      accessor,
      root,
      config,
      max_level,
    }
  }

  #[inline]
  pub fn accessor(&self) -> &A {
    &self.accessor
  }

  #[inline]
  pub fn root(&self) -> &Octant<A::Point> {
    &self.root
  }

  #[inline]
  pub fn config(&self) -> &BuildConfig {
    &self.config
  }

  /// Deepest level any octant was created at.
  #[inline]
  pub fn max_level(&self) -> u32 {
    self.max_level
  }

  /// Number of octants, root included.
  pub fn octant_count(&self) -> usize {
    let mut count = 0;
    self.visit(|_| count += 1);
    count
  }

  /// Number of points stored across all payloads.
  pub fn point_count(&self) -> usize {
    let mut count = 0;
    self.visit(|o| count += o.payload.len());
    count
  }

  /// Pre-order visit from the root, children in ascending slot order.
  pub fn visit<'a>(&'a self, mut f: impl FnMut(&'a Octant<A::Point>)) {
    self.root.visit(&mut f);
  }
}

/// Fill `octant` with `points` and recurse into the children that receive
/// demoted points. Returns the deepest level reached below `octant`.
fn fill<A: PointAccessor>(
  accessor: &A,
  config: &BuildConfig,
  octant: &mut Octant<A::Point>,
  points: Vec<A::Point>,
) -> u32 {
  let mut grid = SpatialGrid::new(octant.meta.center, octant.meta.size);
  let mut demoted = Vec::new();
  for point in points {
    if let Some(d) = grid.insert(accessor, point) {
      demoted.push(d);
    }
  }
  octant.payload = grid.into_occupants();

  if !config.should_subdivide(octant.meta.level, demoted.len()) {
    octant.payload.append(&mut demoted);
    octant.meta.is_leaf = true;
    return octant.meta.level;
  }

  debug!(
    level = octant.meta.level,
    kept = octant.payload.len(),
    pushed_down = demoted.len(),
    "subdividing octant"
  );

  let mut buckets: [Vec<A::Point>; 8] = Default::default();
  for point in demoted {
    let slot = octant.meta.child_index(accessor.position(&point));
    buckets[slot as usize].push(point);
  }

  let seeds: Vec<(Octant<A::Point>, Vec<A::Point>)> = buckets
    .into_iter()
    .enumerate()
    .filter(|(_, bucket)| !bucket.is_empty())
    .map(|(slot, bucket)| (octant.create_child(slot as u8), bucket))
    .collect();

  let children: Vec<(Octant<A::Point>, u32)> = seeds
    .into_par_iter()
    .map(|(mut child, bucket)| {
      let deepest = fill(accessor, config, &mut child, bucket);
      (child, deepest)
    })
    .collect();

  octant.meta.is_leaf = false;
  let mut deepest = octant.meta.level;
  for (child, level) in children {
    deepest = deepest.max(level);
    if let Some(slot) = child.meta.pos_in_parent {
      octant.children[slot as usize] = Some(Box::new(child));
    }
  }
  deepest
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
