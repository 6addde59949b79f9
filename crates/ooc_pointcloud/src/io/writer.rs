//! Writes a built octree to disk.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::info;

use super::hierarchy::{write_hierarchy, HierarchyLayout};
use super::meta::MetaFile;
use super::node_file::NodeStore;
use super::{HIERARCHY_FILE, META_FILE};
use crate::accessor::PointAccessor;
use crate::error::{OocError, Result};
use crate::octree::{Octant, Octree};

/// Writes `meta.json`, `octree.hierarchy`, and one node file per octant.
///
/// Any failure aborts the write; a partially written folder is not usable.
#[derive(Clone, Debug)]
pub struct OctreeFileWriter {
  folder: PathBuf,
  layout: HierarchyLayout,
}

impl OctreeFileWriter {
  pub fn new(folder: impl AsRef<Path>) -> Self {
    Self {
      folder: folder.as_ref().to_path_buf(),
      layout: HierarchyLayout::default(),
    }
  }

  pub fn with_layout(mut self, layout: HierarchyLayout) -> Self {
    self.layout = layout;
    self
  }

  pub fn folder(&self) -> &Path {
    &self.folder
  }

  /// Write everything.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "io::write_complete"))]
  pub fn write_complete<A: PointAccessor>(&self, octree: &Octree<A>) -> Result<()> {
    fs::create_dir_all(&self.folder).map_err(|e| OocError::io(&self.folder, e))?;

    self.write_meta(octree)?;
    self.write_hierarchy(octree)?;
    let nodes = self.write_nodes(octree)?;

    info!(
      folder = %self.folder.display(),
      nodes,
      points = octree.point_count(),
      layout = ?self.layout,
      "octree written"
    );
    Ok(())
  }

  pub fn write_meta<A: PointAccessor>(&self, octree: &Octree<A>) -> Result<()> {
    MetaFile::from_octree(octree, self.layout).write(&self.folder.join(META_FILE))
  }

  pub fn write_hierarchy<A: PointAccessor>(&self, octree: &Octree<A>) -> Result<()> {
    let path = self.folder.join(HIERARCHY_FILE);
    let file = File::create(&path).map_err(|e| OocError::io(&path, e))?;
    let mut out = BufWriter::new(file);
    write_hierarchy(&mut out, octree.root(), self.layout).map_err(|e| OocError::io(&path, e))?;
    out.flush().map_err(|e| OocError::io(&path, e))
  }

  /// Write one node file per octant, in parallel. Returns the file count.
  pub fn write_nodes<A: PointAccessor>(&self, octree: &Octree<A>) -> Result<usize> {
    let store = NodeStore::new(&self.folder);
    store.create_dir()?;

    let mut octants: Vec<&Octant<A::Point>> = Vec::with_capacity(octree.octant_count());
    octree.visit(|o| octants.push(o));

    octants
      .par_iter()
      .try_for_each(|o| store.write_points(octree.accessor(), o.meta.id, &o.payload))?;
    Ok(octants.len())
  }
}
