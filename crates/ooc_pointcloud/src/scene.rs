//! Renderer-facing octree: structure only, plus per-node streaming state.
//!
//! Nodes live in a flat arena in pre-order (root at index 0, children in
//! ascending slot order), so a node's subtree is a contiguous index range.

use std::collections::HashMap;

use crate::accessor::PointAccessor;
use crate::octree::{Octant, OctantId, OctantMeta, Octree};

/// Streaming state of one scene node, owned by the loader.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NodeState {
  /// Point count of the resident geometry, `None` while not loaded.
  pub resident_points: Option<u32>,
  /// Geometry currently handed to the render graph.
  pub attached: bool,
  /// Loading failed in a way retrying cannot fix.
  pub unloadable: bool,
}

impl NodeState {
  #[inline]
  pub fn is_resident(&self) -> bool {
    self.resident_points.is_some()
  }
}

#[derive(Clone, Debug)]
pub struct SceneNode {
  pub meta: OctantMeta,
  pub parent: Option<usize>,
  pub children: [Option<usize>; 8],
  /// One past the last index of this node's subtree.
  subtree_end: usize,
  pub state: NodeState,
}

impl SceneNode {
  #[inline]
  pub fn id(&self) -> OctantId {
    self.meta.id
  }
}

/// Arena of scene nodes mirroring the hierarchy file.
#[derive(Clone, Debug)]
pub struct SceneTree {
  nodes: Vec<SceneNode>,
  index: HashMap<OctantId, usize>,
}

impl SceneTree {
  /// Mirror the structure of `root`; payloads are ignored.
  pub fn from_octant<P>(root: &Octant<P>) -> Self {
    let mut tree = Self {
      nodes: Vec::new(),
      index: HashMap::new(),
    };
    tree.push(root, None);
    tree
  }

  pub fn from_octree<A: PointAccessor>(octree: &Octree<A>) -> Self {
    Self::from_octant(octree.root())
  }

  fn push<P>(&mut self, octant: &Octant<P>, parent: Option<usize>) -> usize {
    let index = self.nodes.len();
    self.nodes.push(SceneNode {
      meta: octant.meta,
      parent,
      children: [None; 8],
      subtree_end: index + 1,
      state: NodeState::default(),
    });
    self.index.insert(octant.meta.id, index);

    for (slot, child) in octant.children.iter().enumerate() {
      if let Some(child) = child {
        let child_index = self.push(child, Some(index));
        self.nodes[index].children[slot] = Some(child_index);
      }
    }
    self.nodes[index].subtree_end = self.nodes.len();
    index
  }

  /// Number of nodes, root included.
  #[inline]
  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  /// Always false: a scene has at least its root.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  #[inline]
  pub fn root(&self) -> usize {
    0
  }

  #[inline]
  pub fn node(&self, index: usize) -> &SceneNode {
    &self.nodes[index]
  }

  #[inline]
  pub fn node_mut(&mut self, index: usize) -> &mut SceneNode {
    &mut self.nodes[index]
  }

  pub fn index_of(&self, id: OctantId) -> Option<usize> {
    self.index.get(&id).copied()
  }

  /// Existing children of `index` in ascending slot order.
  pub fn children(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
    self.nodes[index].children.iter().filter_map(|c| *c)
  }

  /// `index` and all its descendants, in pre-order.
  pub fn subtree(&self, index: usize) -> std::ops::Range<usize> {
    index..self.nodes[index].subtree_end
  }

  /// All nodes in pre-order.
  pub fn iter(&self) -> impl Iterator<Item = (usize, &SceneNode)> {
    self.nodes.iter().enumerate()
  }

  /// Deepest level present.
  pub fn max_level(&self) -> u32 {
    self.nodes.iter().map(|n| n.meta.level).max().unwrap_or(0)
  }
}

#[cfg(test)]
mod tests {
  use glam::DVec3;

  use super::*;

  fn tree() -> Octant<()> {
    let mut root = Octant::new(OctantMeta::root(OctantId::new(), DVec3::ZERO, 8.0, 8.0 / 128.0));
    root.meta.is_leaf = false;

    let mut a = root.create_child(1);
    a.meta.is_leaf = false;
    let a0 = a.create_child(0);
    let a7 = a.create_child(7);
    a.children[0] = Some(Box::new(a0));
    a.children[7] = Some(Box::new(a7));

    let b = root.create_child(6);
    root.children[1] = Some(Box::new(a));
    root.children[6] = Some(Box::new(b));
    root
  }

  #[test]
  fn arena_is_pre_order() {
    let root = tree();
    let scene = SceneTree::from_octant(&root);
    assert_eq!(scene.len(), 5);

    let mut ids = Vec::new();
    root.visit(&mut |o| ids.push(o.meta.id));
    let arena: Vec<OctantId> = scene.iter().map(|(_, n)| n.id()).collect();
    assert_eq!(arena, ids);
  }

  #[test]
  fn links_and_lookup() {
    let scene = SceneTree::from_octant(&tree());
    let root = scene.root();
    assert_eq!(scene.node(root).parent, None);
    assert_eq!(scene.children(root).collect::<Vec<_>>(), vec![1, 4]);
    assert_eq!(scene.node(1).children[0], Some(2));
    assert_eq!(scene.node(1).children[7], Some(3));
    assert_eq!(scene.node(3).parent, Some(1));
    assert_eq!(scene.node(4).meta.pos_in_parent, Some(6));

    for (index, node) in scene.iter() {
      assert_eq!(scene.index_of(node.id()), Some(index));
    }
    assert_eq!(scene.index_of(OctantId::new()), None);
    assert_eq!(scene.max_level(), 2);
  }

  #[test]
  fn subtree_ranges() {
    let scene = SceneTree::from_octant(&tree());
    assert_eq!(scene.subtree(0), 0..5);
    assert_eq!(scene.subtree(1), 1..4);
    assert_eq!(scene.subtree(2), 2..3);
    assert_eq!(scene.subtree(4), 4..5);
  }

  #[test]
  fn nodes_start_unloaded() {
    let scene = SceneTree::from_octant(&tree());
    assert!(scene.iter().all(|(_, n)| n.state == NodeState::default()));
    assert!(!scene.node(0).state.is_resident());
  }
}
