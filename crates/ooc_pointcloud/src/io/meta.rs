//! `meta.json`: root cube, build limits, and file layout.
//!
//! ```json
//! {
//!   "numberOfPoints": 1200000,
//!   "octree": {
//!     "maxLevel": 7,
//!     "maxNoOfPointsInBucket": 1024,
//!     "spacingFactor": 0.78,
//!     "hierarchyLayout": "full",
//!     "rootNode": { "center": [50.0, 5.0, 25.0], "size": 100.01 }
//!   },
//!   "pointType": { "HasPositionFloat3_64": true }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::hierarchy::HierarchyLayout;
use crate::accessor::PointAccessor;
use crate::error::{OocError, Result};
use crate::octree::Octree;

/// Contents of `meta.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaFile {
  /// Total points across all node files.
  #[serde(default)]
  pub number_of_points: u64,
  pub octree: OctreeSection,
  /// Attribute names reported by the point accessor, each mapped to `true`.
  #[serde(default)]
  pub point_type: BTreeMap<String, bool>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OctreeSection {
  /// Deepest level present in the hierarchy.
  pub max_level: u32,
  pub max_no_of_points_in_bucket: usize,
  /// Root resolution (minimum point spacing at level 0).
  pub spacing_factor: f64,
  /// Missing in files written before compact hierarchies existed.
  #[serde(default)]
  pub hierarchy_layout: HierarchyLayout,
  pub root_node: RootNode,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RootNode {
  pub center: [f64; 3],
  pub size: f64,
}

impl MetaFile {
  /// Describe a built octree.
  pub fn from_octree<A: PointAccessor>(octree: &Octree<A>, layout: HierarchyLayout) -> Self {
    let root = &octree.root().meta;
    Self {
      number_of_points: octree.point_count() as u64,
      octree: OctreeSection {
        max_level: octree.max_level(),
        max_no_of_points_in_bucket: octree.config().max_points_per_node,
        spacing_factor: root.resolution,
        hierarchy_layout: layout,
        root_node: RootNode {
          center: root.center.to_array(),
          size: root.size,
        },
      },
      point_type: octree
        .accessor()
        .point_type()
        .into_iter()
        .map(|name| (name.to_owned(), true))
        .collect(),
    }
  }

  /// Root cube center.
  pub fn root_center(&self) -> DVec3 {
    DVec3::from_array(self.octree.root_node.center)
  }

  /// Root cube edge length.
  pub fn root_size(&self) -> f64 {
    self.octree.root_node.size
  }

  /// Root resolution.
  pub fn root_spacing(&self) -> f64 {
    self.octree.spacing_factor
  }

  pub fn layout(&self) -> HierarchyLayout {
    self.octree.hierarchy_layout
  }

  pub fn read(path: &Path) -> Result<Self> {
    let text = fs::read_to_string(path).map_err(|e| OocError::io(path, e))?;
    serde_json::from_str(&text).map_err(|source| OocError::Meta {
      path: path.to_path_buf(),
      source,
    })
  }

  pub fn write(&self, path: &Path) -> Result<()> {
    let text = serde_json::to_string_pretty(self).map_err(|source| OocError::Meta {
      path: path.to_path_buf(),
      source,
    })?;
    fs::write(path, text).map_err(|e| OocError::io(path, e))
  }
}
