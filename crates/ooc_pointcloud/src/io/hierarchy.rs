//! Binary codec for `octree.hierarchy`.
//!
//! One fixed-size record per octant, written in pre-order with children in
//! ascending slot order. All integers little-endian.
//!
//! ```text
//! full layout (30 bytes)            compact layout (22 bytes)
//! ┌──────┬──────┬─────────────────┐ ┌──────┬──────┬─────────────────┐
//! │ 0    │ 16   │ id (GUID bytes) │ │ 0    │ 16   │ id (GUID bytes) │
//! │ 16   │ 4    │ level (i32)     │ │ 16   │ 4    │ level (i32)     │
//! │ 20   │ 8    │ resolution (f64)│ │ 20   │ 1    │ is_leaf (0 | 1) │
//! │ 28   │ 1    │ is_leaf (0 | 1) │ │ 21   │ 1    │ child mask      │
//! │ 29   │ 1    │ child mask      │ └──────┴──────┴─────────────────┘
//! └──────┴──────┴─────────────────┘
//! ```
//!
//! The child mask alone decides how many records follow; running out of
//! input before they are read is corruption, never a normal end.

use std::io::{self, Read, Write};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian as LE, WriteBytesExt};
use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::{HierarchyFault, OocError, Result};
use crate::octree::{Octant, OctantId, OctantMeta};

/// Deepest nesting accepted when decoding.
pub const MAX_DEPTH: u32 = 64;

const FULL_RECORD_LEN: usize = 30;
const COMPACT_RECORD_LEN: usize = 22;

/// Which record layout a hierarchy file uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HierarchyLayout {
  /// Records carry the octant resolution.
  #[default]
  Full,
  /// Records omit the resolution; it is derived from the root spacing.
  Compact,
}

impl HierarchyLayout {
  /// Bytes per record.
  pub const fn record_len(self) -> usize {
    match self {
      HierarchyLayout::Full => FULL_RECORD_LEN,
      HierarchyLayout::Compact => COMPACT_RECORD_LEN,
    }
  }
}

/// Write `root` and its subtree.
pub fn write_hierarchy<W: Write, P>(out: &mut W, root: &Octant<P>, layout: HierarchyLayout) -> io::Result<()> {
  out.write_all(&root.meta.id.to_raw_bytes())?;
  out.write_i32::<LE>(root.meta.level as i32)?;
  if layout == HierarchyLayout::Full {
    out.write_f64::<LE>(root.meta.resolution)?;
  }
  out.write_u8(u8::from(root.meta.is_leaf))?;
  out.write_u8(root.child_mask())?;

  for child in root.iter_children() {
    write_hierarchy(out, child, layout)?;
  }
  Ok(())
}

/// Read a whole hierarchy into an octant tree without payload.
///
/// `center`, `size` and `spacing` describe the root cube and its resolution
/// (from `meta.json`); child cubes are derived from them. With
/// [`HierarchyLayout::Compact`] the resolution halves per level from
/// `spacing`.
///
/// `path` is only used in error reports.
pub fn read_hierarchy<R: Read, P>(
  input: R,
  path: &Path,
  center: DVec3,
  size: f64,
  spacing: f64,
  layout: HierarchyLayout,
) -> Result<Octant<P>> {
  let mut decoder = Decoder {
    input,
    path,
    layout,
    offset: 0,
  };

  let root = OctantMeta::root(OctantId::default(), center, size, spacing);
  let root = decoder.decode(root)?;

  let trailing = io::copy(&mut decoder.input, &mut io::sink()).map_err(|e| OocError::io(path, e))?;
  if trailing > 0 {
    return Err(corrupt(decoder.offset, HierarchyFault::TrailingBytes(trailing)));
  }
  Ok(root)
}

struct Decoder<'a, R> {
  input: R,
  path: &'a Path,
  layout: HierarchyLayout,
  offset: u64,
}

impl<R: Read> Decoder<'_, R> {
  /// Decode the record for the octant whose geometry is `meta`, then its
  /// children.
  fn decode<P>(&mut self, mut meta: OctantMeta) -> Result<Octant<P>> {
    let start = self.offset;
    let mut buf = [0u8; FULL_RECORD_LEN];
    let record = &mut buf[..self.layout.record_len()];
    self.fill(record)?;

    let mut raw_id = [0u8; 16];
    raw_id.copy_from_slice(&record[..16]);
    meta.id = OctantId::from_raw_bytes(raw_id);

    let level = LE::read_i32(&record[16..20]);
    if level < 0 {
      return Err(corrupt(start + 16, HierarchyFault::NegativeLevel(level)));
    }
    if level as u32 != meta.level {
      return Err(corrupt(
        start + 16,
        HierarchyFault::LevelMismatch {
          expected: meta.level,
          found: level as u32,
        },
      ));
    }

    let mut cursor = 20;
    if self.layout == HierarchyLayout::Full {
      meta.resolution = LE::read_f64(&record[20..28]);
      cursor = 28;
    }

    meta.is_leaf = match record[cursor] {
      0 => false,
      1 => true,
      flag => return Err(corrupt(start + cursor as u64, HierarchyFault::InvalidLeafFlag(flag))),
    };

    let mask = record[cursor + 1];
    let mask_offset = start + cursor as u64 + 1;
    if meta.is_leaf && mask != 0 {
      return Err(corrupt(mask_offset, HierarchyFault::LeafWithChildren(mask)));
    }
    if mask != 0 && meta.level >= MAX_DEPTH {
      return Err(corrupt(mask_offset, HierarchyFault::DepthLimit(MAX_DEPTH)));
    }

    let mut octant = Octant::new(meta);
    for slot in 0..8u8 {
      if mask & (1 << slot) == 0 {
        continue;
      }
      let child = self.decode(octant.meta.child(slot, octant.meta.id))?;
      octant.children[slot as usize] = Some(Box::new(child));
    }
    Ok(octant)
  }

  fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
    match self.input.read_exact(buf) {
      Ok(()) => {
        self.offset += buf.len() as u64;
        Ok(())
      }
      Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(corrupt(self.offset, HierarchyFault::UnexpectedEof)),
      Err(e) => Err(OocError::io(self.path, e)),
    }
  }
}

fn corrupt(offset: u64, fault: HierarchyFault) -> OocError {
  OocError::CorruptHierarchy { offset, fault }
}

#[cfg(test)]
#[path = "hierarchy_test.rs"]
mod hierarchy_test;
