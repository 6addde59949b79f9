//! On-disk octree format.
//!
//! ```text
//! <folder>/
//! ├── meta.json            root cube, bucket cap, max level, record layout
//! ├── octree.hierarchy     pre-order binary records, see `hierarchy`
//! └── Octants/
//!     └── <id>.node        point payload per octant, see `node_file`
//! ```

pub mod hierarchy;
pub mod meta;
pub mod node_file;
pub mod reader;
pub mod writer;

pub use hierarchy::{read_hierarchy, write_hierarchy, HierarchyLayout};
pub use meta::MetaFile;
pub use node_file::{NodeStore, OCTANTS_DIR};
pub use reader::OctreeFileReader;
pub use writer::OctreeFileWriter;

/// Metadata file name.
pub const META_FILE: &str = "meta.json";

/// Hierarchy file name.
pub const HIERARCHY_FILE: &str = "octree.hierarchy";
