//! Octant identity, metadata, and the write-side octant that carries points.
//!
//! Child slots are numbered 0-7 where bits represent +X, +Z, +Y offsets:
//! - bit 0: X offset
//! - bit 1: Z offset
//! - bit 2: Y offset
//!
//! This ordering is part of the on-disk hierarchy format (child bitmask).

use std::fmt;

use glam::DVec3;
use uuid::Uuid;

use super::DAabb3;

/// Globally unique octant identifier, also the node file name on disk.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct OctantId(Uuid);

impl OctantId {
  /// Generate a fresh random identifier.
  pub fn new() -> Self {
    Self(Uuid::new_v4())
  }

  /// Wrap an existing UUID.
  pub fn from_uuid(uuid: Uuid) -> Self {
    Self(uuid)
  }

  /// Decode from the 16 raw bytes stored in the hierarchy file.
  ///
  /// Uses the mixed-endian GUID byte order so files written by .NET tooling
  /// resolve to the same node file names.
  pub fn from_raw_bytes(bytes: [u8; 16]) -> Self {
    Self(Uuid::from_bytes_le(bytes))
  }

  /// Encode as the 16 raw bytes stored in the hierarchy file.
  pub fn to_raw_bytes(self) -> [u8; 16] {
    self.0.to_bytes_le()
  }

  /// `<32 hex digits>.node`
  pub fn file_name(&self) -> String {
    format!("{}.node", self.0.simple())
  }
}

impl Default for OctantId {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Display for OctantId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.simple())
  }
}

/// Metadata shared by every octant representation (build tree, data tree,
/// scene tree).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OctantMeta {
  /// Unique identifier.
  pub id: OctantId,
  /// Cube center in world space.
  pub center: DVec3,
  /// Cube edge length.
  pub size: f64,
  /// Minimum point spacing enforced at this level.
  pub resolution: f64,
  /// Depth from the root (root = 0).
  pub level: u32,
  /// Slot in the parent, `None` for the root.
  pub pos_in_parent: Option<u8>,
  /// True when construction decided no children are needed.
  pub is_leaf: bool,
}

impl OctantMeta {
  /// Root octant metadata.
  pub fn root(id: OctantId, center: DVec3, size: f64, resolution: f64) -> Self {
    Self {
      id,
      center,
      size,
      resolution,
      level: 0,
      pos_in_parent: None,
      is_leaf: true,
    }
  }

  /// Metadata for the child in slot `pos`: half size, half resolution.
  pub fn child(&self, pos: u8, id: OctantId) -> Self {
    Self {
      id,
      center: self.child_center(pos),
      size: self.size * 0.5,
      resolution: self.resolution * 0.5,
      level: self.level + 1,
      pos_in_parent: Some(pos),
      is_leaf: true,
    }
  }

  /// Center of the child cube in slot `pos`.
  pub fn child_center(&self, pos: u8) -> DVec3 {
    let quarter = self.size * 0.25;
    let sign = |bit: u8| if pos & bit != 0 { quarter } else { -quarter };
    self.center + DVec3::new(sign(1), sign(4), sign(2))
  }

  /// Child slot a position falls into. Positions on or beyond the cube faces
  /// clamp to the nearest slot.
  pub fn child_index(&self, position: DVec3) -> u8 {
    let offset = position - self.center;
    let mut pos = 0u8;
    if offset.x >= 0.0 {
      pos |= 1;
    }
    if offset.z >= 0.0 {
      pos |= 2;
    }
    if offset.y >= 0.0 {
      pos |= 4;
    }
    pos
  }

  /// Cube bounds.
  pub fn bounds(&self) -> DAabb3 {
    DAabb3::from_center_size(self.center, self.size)
  }

  /// On-screen extent of this octant in pixels.
  ///
  /// `fov` is the vertical field of view in radians.
  pub fn projected_screen_size(&self, camera_position: DVec3, viewport_height: u32, fov: f32) -> f64 {
    let distance = self.center.distance(camera_position);
    let slope = (f64::from(fov) * 0.5).tan();
    f64::from(viewport_height) * 0.5 * self.size / (slope * distance)
  }
}

/// Write-side octant: metadata, owned children, and the points stored at this
/// level of detail.
#[derive(Debug)]
pub struct Octant<P> {
  /// Identity and geometry.
  pub meta: OctantMeta,
  /// Child slots, see the module docs for the numbering.
  pub children: [Option<Box<Octant<P>>>; 8],
  /// Points stored at this level.
  pub payload: Vec<P>,
}

impl<P> Octant<P> {
  /// Create an octant without children or points.
  pub fn new(meta: OctantMeta) -> Self {
    Self {
      meta,
      children: Default::default(),
      payload: Vec::new(),
    }
  }

  /// Create an empty child for slot `pos` (not yet linked into `children`).
  pub fn create_child(&self, pos: u8) -> Self {
    Self::new(self.meta.child(pos, OctantId::new()))
  }

  /// Bit `i` set iff child `i` exists.
  pub fn child_mask(&self) -> u8 {
    self
      .children
      .iter()
      .enumerate()
      .filter(|(_, c)| c.is_some())
      .fold(0u8, |mask, (i, _)| mask | (1 << i))
  }

  /// True iff all 8 child slots are empty.
  pub fn has_no_children(&self) -> bool {
    self.children.iter().all(Option::is_none)
  }

  /// Existing children in ascending slot order.
  pub fn iter_children(&self) -> impl Iterator<Item = &Octant<P>> {
    self.children.iter().filter_map(|c| c.as_deref())
  }

  /// Pre-order visit (self first, children in ascending slot order).
  pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Octant<P>)) {
    f(self);
    for child in self.iter_children() {
      child.visit(f);
    }
  }
}

#[cfg(test)]
#[path = "octant_test.rs"]
mod octant_test;
