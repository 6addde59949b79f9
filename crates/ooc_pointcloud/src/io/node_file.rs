//! Point payload files: `<root>/Octants/<id>.node`.
//!
//! ```text
//! u32 LE  point count
//! u32 LE  bytes per point
//! count × length raw point records
//! ```

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian as LE, ReadBytesExt, WriteBytesExt};

use crate::accessor::PointAccessor;
use crate::error::{OocError, Result};
use crate::octree::OctantId;

/// Name of the node file directory under the octree folder.
pub const OCTANTS_DIR: &str = "Octants";

/// Resolves and reads/writes node files of one octree folder.
#[derive(Clone, Debug)]
pub struct NodeStore {
  dir: PathBuf,
}

impl NodeStore {
  /// Store for the octree folder `root` (node files live in `root/Octants`).
  pub fn new(root: impl AsRef<Path>) -> Self {
    Self {
      dir: root.as_ref().join(OCTANTS_DIR),
    }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  pub fn path(&self, id: OctantId) -> PathBuf {
    self.dir.join(id.file_name())
  }

  /// Create the node directory if needed.
  pub fn create_dir(&self) -> Result<()> {
    fs::create_dir_all(&self.dir).map_err(|e| OocError::io(&self.dir, e))
  }

  /// Point count from the header only.
  pub fn read_point_count(&self, id: OctantId) -> Result<u32> {
    let path = self.path(id);
    let mut file = File::open(&path).map_err(|e| OocError::io(&path, e))?;
    file.read_u32::<LE>().map_err(|e| truncated_header(&path, e))
  }

  /// Read and decode all points of a node.
  pub fn read_points<A: PointAccessor>(&self, accessor: &A, id: OctantId) -> Result<Vec<A::Point>> {
    let path = self.path(id);
    let file = File::open(&path).map_err(|e| OocError::io(&path, e))?;
    let mut reader = BufReader::new(file);

    let count = reader.read_u32::<LE>().map_err(|e| truncated_header(&path, e))?;
    let point_len = reader.read_u32::<LE>().map_err(|e| truncated_header(&path, e))? as usize;
    if count == 0 {
      return Ok(Vec::new());
    }
    if point_len != accessor.raw_len() {
      return Err(OocError::PointLengthMismatch {
        path,
        expected: accessor.raw_len(),
        found: point_len,
      });
    }

    let mut raw = Vec::new();
    reader
      .take(count as u64 * point_len as u64)
      .read_to_end(&mut raw)
      .map_err(|e| OocError::io(&path, e))?;

    let read = (raw.len() / point_len) as u32;
    if read < count {
      return Err(OocError::TruncatedNode {
        path,
        expected: count,
        read,
      });
    }

    Ok(raw.chunks_exact(point_len).map(|chunk| accessor.decode(chunk)).collect())
  }

  /// Write a node file. Empty point sets still produce a header.
  pub fn write_points<A: PointAccessor>(&self, accessor: &A, id: OctantId, points: &[A::Point]) -> Result<()> {
    let path = self.path(id);
    let file = File::create(&path).map_err(|e| OocError::io(&path, e))?;
    let mut out = BufWriter::new(file);

    let point_len = accessor.raw_len();
    let mut raw = Vec::with_capacity(8 + points.len() * point_len);
    raw.write_u32::<LE>(points.len() as u32).map_err(|e| OocError::io(&path, e))?;
    raw.write_u32::<LE>(point_len as u32).map_err(|e| OocError::io(&path, e))?;
    for point in points {
      accessor.encode(point, &mut raw);
    }

    out.write_all(&raw).map_err(|e| OocError::io(&path, e))?;
    out.flush().map_err(|e| OocError::io(&path, e))
  }
}

/// A header cut short means a truncated file, not an I/O fault.
fn truncated_header(path: &Path, err: std::io::Error) -> OocError {
  if err.kind() == std::io::ErrorKind::UnexpectedEof {
    OocError::TruncatedNode {
      path: path.to_path_buf(),
      expected: 0,
      read: 0,
    }
  } else {
    OocError::io(path, err)
  }
}
