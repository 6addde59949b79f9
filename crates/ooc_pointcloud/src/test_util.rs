//! Shared helpers for unit tests.

use std::path::{Path, PathBuf};

use glam::DVec3;
use uuid::Uuid;

/// Deterministic pseudo-random cloud in `[0, extent)` (xorshift).
pub fn random_cloud(count: usize, extent: DVec3, seed: u64) -> Vec<DVec3> {
  let mut state = seed.max(1);
  let mut next = || {
    state ^= state << 13;
    state ^= state >> 7;
    state ^= state << 17;
    (state >> 11) as f64 / (1u64 << 53) as f64
  };
  (0..count)
    .map(|_| DVec3::new(next(), next(), next()) * extent)
    .collect()
}

/// Unique scratch directory, removed on drop.
pub struct TempDir(PathBuf);

impl TempDir {
  pub fn new() -> Self {
    let path = std::env::temp_dir().join(format!("ooc_pointcloud_{}", Uuid::new_v4().simple()));
    std::fs::create_dir_all(&path).unwrap();
    Self(path)
  }

  pub fn path(&self) -> &Path {
    &self.0
  }
}

impl Drop for TempDir {
  fn drop(&mut self) {
    let _ = std::fs::remove_dir_all(&self.0);
  }
}
