//! ooc_pointcloud - Out-of-core point cloud octree
//!
//! Builds a level-of-detail octree from a point set, stores it as a folder of
//! small files, and streams the nodes a camera needs back into a renderer
//! under a fixed point budget.
//!
//! # Features
//!
//! - **Resolution-bounded decimation**: every octant keeps at most one point
//!   per cell of a 128³ grid, coarse near the root and finer with depth
//! - **On-disk hierarchy**: compact pre-order node records plus one payload
//!   file per octant, so any node loads independently
//! - **Budgeted streaming**: visible nodes are chosen largest-on-screen first
//!   until the point budget is spent, loaded on a background thread, and
//!   evicted as soon as they leave the visible set
//! - **Hierarchy texture**: the visible tree packed into one RGBA row for
//!   adaptive point sizes on the GPU
//!
//! # Example
//!
//! ```ignore
//! use ooc_pointcloud::{
//!   BuildConfig, LoaderConfig, OctantLoader, Octree, OctreeFileReader, OctreeFileWriter,
//!   Pos64Accessor,
//! };
//!
//! // Offline
//! let octree = Octree::build(Pos64Accessor, points, BuildConfig::default())?;
//! OctreeFileWriter::new("cloud").write_complete(&octree)?;
//!
//! // Runtime
//! let reader = OctreeFileReader::new("cloud")?;
//! let mut loader = OctantLoader::open(&reader, Pos64Accessor, make_geometry, LoaderConfig::default(), &graph.view())?;
//! loop {
//!   loader.tick(&mut graph);
//! }
//! ```

pub mod accessor;
pub mod error;

// Construction: grid, octants, octree
pub mod octree;
pub use octree::{BuildConfig, DAabb3, Frustum, Octant, OctantId, OctantMeta, Octree, SpatialGrid};

// On-disk format
pub mod io;
pub use io::{HierarchyLayout, MetaFile, NodeStore, OctreeFileReader, OctreeFileWriter};

// Renderer-facing tree
pub mod scene;
pub use scene::{NodeState, SceneNode, SceneTree};

// Streaming
pub mod loader;
pub use loader::{LoaderConfig, OctantLoader, RenderGraph, TickOutcome, TickReport, ViewState};

pub mod metrics;
pub use metrics::{LoaderStats, RollingWindow};

pub use accessor::{GeometryFactory, PointAccessor, Pos64Accessor};
pub use error::{HierarchyFault, LoadFailure, OocError, Result};

#[cfg(test)]
mod test_util;
