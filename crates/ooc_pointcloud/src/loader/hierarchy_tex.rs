//! Visible hierarchy encoded as a one-row RGBA8 texture.
//!
//! A vertex shader walks it to find the deepest visible node containing a
//! point, which drives adaptive point sizes. Nodes are laid out breadth
//! first, so the visible children of a node occupy consecutive texels.
//!
//! | channel | content                                        |
//! |---------|------------------------------------------------|
//! | R       | bit `i` set iff child slot `i` is visible      |
//! | G, B    | `u16` LE offset from this texel to the first   |
//! |         | visible child (0 when there is none)           |
//! | A       | 0                                              |

use std::collections::{HashMap, HashSet, VecDeque};

use smallvec::SmallVec;
use tracing::warn;

use crate::scene::SceneTree;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HierarchyTexture {
  texels: Vec<[u8; 4]>,
  nodes: Vec<usize>,
}

impl HierarchyTexture {
  /// Encode the nodes of `visible` reachable from the root.
  pub fn build(scene: &SceneTree, visible: &HashSet<usize>) -> Self {
    let mut nodes = Vec::with_capacity(visible.len());
    if visible.contains(&scene.root()) {
      let mut queue = VecDeque::from([scene.root()]);
      while let Some(index) = queue.pop_front() {
        nodes.push(index);
        queue.extend(scene.children(index).filter(|c| visible.contains(c)));
      }
    }

    let position: HashMap<usize, usize> = nodes.iter().enumerate().map(|(pos, &index)| (index, pos)).collect();

    let mut saturated = false;
    let texels = nodes
      .iter()
      .enumerate()
      .map(|(pos, &index)| {
        let children: SmallVec<[usize; 8]> = scene.children(index).filter(|c| visible.contains(c)).collect();

        let mask = children.iter().fold(0u8, |mask, &c| {
          mask | scene.node(c).meta.pos_in_parent.map_or(0, |slot| 1 << slot)
        });

        let offset = children
          .first()
          .and_then(|first| position.get(first))
          .map_or(0, |&first| first - pos);
        let offset = u16::try_from(offset).unwrap_or_else(|_| {
          saturated = true;
          u16::MAX
        });

        let [lo, hi] = offset.to_le_bytes();
        [mask, lo, hi, 0]
      })
      .collect();

    if saturated {
      warn!(nodes = nodes.len(), "hierarchy texture offsets exceed 16 bits");
    }
    Self { texels, nodes }
  }

  /// Texture width in texels (height is 1).
  pub fn width(&self) -> usize {
    self.texels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.texels.is_empty()
  }

  pub fn texels(&self) -> &[[u8; 4]] {
    &self.texels
  }

  /// Tightly packed RGBA8 bytes for upload.
  pub fn to_bytes(&self) -> Vec<u8> {
    self.texels.iter().flatten().copied().collect()
  }

  /// Scene index stored at each texel.
  pub fn nodes(&self) -> &[usize] {
    &self.nodes
  }
}
