//! Reads an octree folder back: metadata, hierarchy, node store.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tracing::info;

use super::hierarchy::read_hierarchy;
use super::meta::MetaFile;
use super::node_file::NodeStore;
use super::{HIERARCHY_FILE, META_FILE};
use crate::accessor::PointAccessor;
use crate::error::{OocError, Result};
use crate::octree::{BuildConfig, Octant, Octree};
use crate::scene::SceneTree;

/// Reader for a folder produced by [`OctreeFileWriter`](super::OctreeFileWriter).
///
/// Construction fails if `meta.json` or `octree.hierarchy` is missing.
#[derive(Clone, Debug)]
pub struct OctreeFileReader {
  folder: PathBuf,
  meta: MetaFile,
}

impl OctreeFileReader {
  pub fn new(folder: impl AsRef<Path>) -> Result<Self> {
    let folder = folder.as_ref().to_path_buf();
    let meta = MetaFile::read(&folder.join(META_FILE))?;

    let hierarchy = folder.join(HIERARCHY_FILE);
    if !hierarchy.is_file() {
      return Err(OocError::MissingFile(hierarchy));
    }
    Ok(Self { folder, meta })
  }

  pub fn folder(&self) -> &Path {
    &self.folder
  }

  pub fn meta(&self) -> &MetaFile {
    &self.meta
  }

  /// Node files of this folder.
  pub fn node_store(&self) -> NodeStore {
    NodeStore::new(&self.folder)
  }

  /// Data octree without payload. Points are read on demand through
  /// [`node_store`](Self::node_store).
  ///
  /// The folder does not record the level limit the tree was built with, so
  /// the returned config caps levels at the deepest one present.
  pub fn read_octree<A: PointAccessor>(&self, accessor: A) -> Result<Octree<A>> {
    let root = self.read_root()?;
    let config = BuildConfig::DEFAULT
      .with_max_points_per_node(self.meta.octree.max_no_of_points_in_bucket)
      .with_max_level(self.meta.octree.max_level);
    Ok(Octree::from_parts(accessor, root, config, self.meta.octree.max_level))
  }

  /// Renderer-facing tree for the loader.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "io::read_scene"))]
  pub fn read_scene(&self) -> Result<SceneTree> {
    let root: Octant<()> = self.read_root()?;
    let scene = SceneTree::from_octant(&root);
    info!(
      folder = %self.folder.display(),
      nodes = scene.len(),
      max_level = self.meta.octree.max_level,
      "scene hierarchy read"
    );
    Ok(scene)
  }

  fn read_root<P>(&self) -> Result<Octant<P>> {
    let path = self.folder.join(HIERARCHY_FILE);
    let file = File::open(&path).map_err(|e| OocError::io(&path, e))?;
    read_hierarchy(
      BufReader::new(file),
      &path,
      self.meta.root_center(),
      self.meta.root_size(),
      self.meta.root_spacing(),
      self.meta.layout(),
    )
  }
}
