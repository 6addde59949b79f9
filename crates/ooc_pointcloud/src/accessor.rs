//! Capabilities consumed by the subsystem: point access and geometry creation.
//!
//! The point schema (color, normal, intensity, ...) is never interpreted here.
//! Everything goes through a [`PointAccessor`], which only has to report a
//! position and round-trip a point through a fixed-length byte record.

use glam::DVec3;

/// Typed access to a point record.
///
/// Implementations must encode every point to exactly [`raw_len`] bytes.
///
/// [`raw_len`]: PointAccessor::raw_len
pub trait PointAccessor: Send + Sync + 'static {
  /// Point record type.
  type Point: Clone + Send + Sync + 'static;

  /// World-space position of a point.
  fn position(&self, point: &Self::Point) -> DVec3;

  /// Size in bytes of one encoded point.
  fn raw_len(&self) -> usize;

  /// Append the raw bytes of `point` to `out`.
  fn encode(&self, point: &Self::Point, out: &mut Vec<u8>);

  /// Decode one point from exactly [`raw_len`](PointAccessor::raw_len) bytes.
  fn decode(&self, bytes: &[u8]) -> Self::Point;

  /// Names of the attributes this accessor carries, recorded in `meta.json`.
  fn point_type(&self) -> Vec<&'static str> {
    Vec::new()
  }
}

/// Turns decoded points into renderer-facing geometry.
///
/// Runs on the background loading thread, so implementations must only
/// produce CPU-side descriptors. GPU resources are created by the render graph
/// when geometry is attached.
pub trait GeometryFactory<A: PointAccessor>: Send + Sync + 'static {
  /// Geometry handle type.
  type Geometry: Send + 'static;

  /// Build the geometry for one node's points.
  fn create(&self, accessor: &A, points: Vec<A::Point>) -> Vec<Self::Geometry>;
}

impl<A, G, F> GeometryFactory<A> for F
where
  A: PointAccessor,
  G: Send + 'static,
  F: Fn(&A, Vec<A::Point>) -> Vec<G> + Send + Sync + 'static,
{
  type Geometry = G;

  fn create(&self, accessor: &A, points: Vec<A::Point>) -> Vec<G> {
    self(accessor, points)
  }
}

/// Position-only points stored as three little-endian `f64`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pos64Accessor;

impl Pos64Accessor {
  /// Encoded size of one point.
  pub const RAW_LEN: usize = 24;
}

impl PointAccessor for Pos64Accessor {
  type Point = DVec3;

  #[inline]
  fn position(&self, point: &DVec3) -> DVec3 {
    *point
  }

  fn raw_len(&self) -> usize {
    Self::RAW_LEN
  }

  fn encode(&self, point: &DVec3, out: &mut Vec<u8>) {
    out.extend_from_slice(&point.x.to_le_bytes());
    out.extend_from_slice(&point.y.to_le_bytes());
    out.extend_from_slice(&point.z.to_le_bytes());
  }

  fn decode(&self, bytes: &[u8]) -> DVec3 {
    let component = |i: usize| {
      let mut raw = [0u8; 8];
      raw.copy_from_slice(&bytes[i * 8..i * 8 + 8]);
      f64::from_le_bytes(raw)
    };
    DVec3::new(component(0), component(1), component(2))
  }

  fn point_type(&self) -> Vec<&'static str> {
    vec!["HasPositionFloat3_64"]
  }
}
