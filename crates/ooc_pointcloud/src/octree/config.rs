//! BuildConfig - limits for offline octree construction.

use serde::{Deserialize, Serialize};

/// Limits applied while growing the octree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildConfig {
  /// Demoted points an octant may keep before they are pushed down into
  /// children. Mirrors `maxNoOfPointsInBucket` in `meta.json`.
  pub max_points_per_node: usize,

  /// Deepest level children may be created at. Octants at this level keep all
  /// their demoted points.
  pub max_level: u32,
}

impl BuildConfig {
  pub const DEFAULT: Self = Self {
    max_points_per_node: 1024,
    max_level: 20,
  };

  pub fn with_max_points_per_node(mut self, max_points_per_node: usize) -> Self {
    self.max_points_per_node = max_points_per_node.max(1);
    self
  }

  pub fn with_max_level(mut self, max_level: u32) -> Self {
    self.max_level = max_level;
    self
  }

  /// True if an octant at `level` holding `demoted` points must subdivide.
  #[inline]
  pub fn should_subdivide(&self, level: u32, demoted: usize) -> bool {
    level < self.max_level && demoted >= self.max_points_per_node
  }
}

impl Default for BuildConfig {
  fn default() -> Self {
    Self::DEFAULT
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
