//! Error types for octree construction, persistence, and streaming.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = OocError> = std::result::Result<T, E>;

/// Structural defect found while decoding `octree.hierarchy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HierarchyFault {
  /// The stream ended inside a record or before a flagged child.
  #[error("unexpected end of stream")]
  UnexpectedEof,

  /// A record carried a negative level.
  #[error("negative level {0}")]
  NegativeLevel(i32),

  /// A child record's level does not follow its parent's.
  #[error("expected level {expected}, found {found}")]
  LevelMismatch {
    /// Parent level + 1.
    expected: u32,
    /// Level stored in the record.
    found: u32,
  },

  /// The leaf flag byte was neither 0 nor 1.
  #[error("invalid leaf flag {0:#04x}")]
  InvalidLeafFlag(u8),

  /// A record flagged as leaf also announced children.
  #[error("leaf record announces children (mask {0:#010b})")]
  LeafWithChildren(u8),

  /// Nesting exceeds the deepest level the reader accepts.
  #[error("hierarchy deeper than {0} levels")]
  DepthLimit(u32),

  /// Bytes remain after the root's subtree was fully read.
  #[error("{0} trailing bytes after the root subtree")]
  TrailingBytes(u64),
}

/// Errors raised by the out-of-core point cloud subsystem.
#[derive(Debug, Error)]
pub enum OocError {
  /// Underlying I/O failure on a specific file.
  #[error("i/o error on {path}: {source}")]
  Io {
    /// File or directory being accessed.
    path: PathBuf,
    /// Operating system error.
    #[source]
    source: io::Error,
  },

  /// A required file does not exist.
  #[error("missing file: {0}")]
  MissingFile(PathBuf),

  /// `meta.json` could not be parsed or written.
  #[error("invalid meta file {path}: {source}")]
  Meta {
    /// Path of the meta file.
    path: PathBuf,
    /// JSON error.
    #[source]
    source: serde_json::Error,
  },

  /// `octree.hierarchy` is malformed.
  #[error("corrupt hierarchy at byte {offset}: {fault}")]
  CorruptHierarchy {
    /// Byte offset where decoding failed.
    offset: u64,
    /// What was wrong.
    fault: HierarchyFault,
  },

  /// A node file holds fewer points than its header announces.
  #[error("node file {path} is truncated: header announces {expected} points, read {read}")]
  TruncatedNode {
    /// Node file path.
    path: PathBuf,
    /// Point count from the header.
    expected: u32,
    /// Points actually present.
    read: u32,
  },

  /// The per-point byte length in a node file disagrees with the accessor.
  #[error("point length mismatch in {path}: file stores {found} bytes per point, accessor expects {expected}")]
  PointLengthMismatch {
    /// Node file path.
    path: PathBuf,
    /// Accessor's raw point length.
    expected: usize,
    /// Length stored in the file header.
    found: usize,
  },

  /// The background loading thread could not be started.
  #[error("failed to spawn the loading thread: {0}")]
  WorkerSpawn(#[source] io::Error),

  /// Construction was requested without any input points.
  #[error("cannot build an octree from an empty point set")]
  EmptyPointSet,
}

/// How the loader should react to a failed node load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadFailure {
  /// Leave the node unloaded; it may be scheduled again.
  Retry,
  /// The node can never be decoded with the current accessor.
  Permanent,
}

impl OocError {
  /// Wrap an I/O error, mapping `NotFound` to [`OocError::MissingFile`].
  pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
    let path = path.as_ref().to_path_buf();
    if source.kind() == io::ErrorKind::NotFound {
      OocError::MissingFile(path)
    } else {
      OocError::Io { path, source }
    }
  }

  /// Classify this error as a per-node load failure.
  pub fn load_failure(&self) -> LoadFailure {
    match self {
      OocError::PointLengthMismatch { .. } => LoadFailure::Permanent,
      _ => LoadFailure::Retry,
    }
  }
}
