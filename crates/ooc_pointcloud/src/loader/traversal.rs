//! Visible set selection under a point budget.
//!
//! Nodes are expanded largest-on-screen first, so when the budget runs out
//! the most significant nodes are the ones shown:
//!
//! 1. Seed a max-heap (keyed by projected size) with the root.
//! 2. Pop the largest node, mark it visible, count its points.
//! 3. Push every child that intersects the frustum and is at least
//!    `min_projected_size` pixels large.
//! 4. Stop when the heap is empty or the counter reaches the budget.
//!
//! The root is exempt from the size threshold and is always selected when it
//! intersects the frustum, even with a zero budget.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::view::ViewState;
use crate::octree::Frustum;
use crate::scene::SceneTree;

/// A node picked for this evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Selected {
  pub index: usize,
  pub projected_size: f64,
}

/// Output of one traversal.
#[derive(Clone, Debug, Default)]
pub struct VisibleSet {
  /// Visible nodes in selection order.
  pub nodes: Vec<Selected>,
  /// Visible nodes without resident geometry that may be loaded, in
  /// selection order.
  pub unloaded: Vec<Selected>,
  /// Points counted against the budget.
  pub points: u64,
  /// Children rejected by the frustum or the size threshold.
  pub culled: usize,
}

impl VisibleSet {
  /// Visible arena indices in selection order.
  pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
    self.nodes.iter().map(|s| s.index)
  }

  /// `n` largest unloaded nodes.
  pub fn largest_unloaded(&self, n: usize) -> Vec<Selected> {
    let mut unloaded = self.unloaded.clone();
    unloaded.sort_by(|a, b| b.projected_size.total_cmp(&a.projected_size).then(a.index.cmp(&b.index)));
    unloaded.truncate(n);
    unloaded
  }
}

/// Inputs of one traversal.
pub struct Traversal<'a> {
  pub scene: &'a SceneTree,
  pub view: &'a ViewState,
  pub frustum: Frustum,
  pub min_projected_size: f64,
  pub point_budget: u64,
}

impl<'a> Traversal<'a> {
  pub fn new(scene: &'a SceneTree, view: &'a ViewState, min_projected_size: f64, point_budget: u64) -> Self {
    Self {
      scene,
      view,
      frustum: view.frustum(),
      min_projected_size,
      point_budget,
    }
  }

  /// Select the visible set. `point_count` reports how many points a node
  /// contributes: its resident count when loaded, its file header count
  /// otherwise.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "loader::traverse"))]
  pub fn run(&self, mut point_count: impl FnMut(usize) -> u64) -> VisibleSet {
    let mut set = VisibleSet::default();
    let root = self.scene.root();
    let root_meta = &self.scene.node(root).meta;
    if !self.frustum.intersects_aabb(&root_meta.bounds()) {
      set.culled = 1;
      return set;
    }

    let mut pending = BinaryHeap::new();
    pending.push(Candidate {
      size: self.view.projected_size(root_meta),
      index: root,
    });

    while set.nodes.is_empty() || set.points < self.point_budget {
      let Some(Candidate { size, index }) = pending.pop() else {
        break;
      };

      let selected = Selected {
        index,
        projected_size: size,
      };
      set.points += point_count(index);
      set.nodes.push(selected);

      let state = &self.scene.node(index).state;
      if !state.is_resident() && !state.unloadable {
        set.unloaded.push(selected);
      }

      for child in self.scene.children(index) {
        let meta = &self.scene.node(child).meta;
        let size = self.view.projected_size(meta);
        if size < self.min_projected_size || !self.frustum.intersects_aabb(&meta.bounds()) {
          set.culled += 1;
          continue;
        }
        pending.push(Candidate { size, index: child });
      }
    }
    set
  }
}

/// Heap entry: larger projected size first, lower arena index on ties.
#[derive(Clone, Copy, Debug)]
struct Candidate {
  size: f64,
  index: usize,
}

impl Ord for Candidate {
  fn cmp(&self, other: &Self) -> Ordering {
    self
      .size
      .total_cmp(&other.size)
      .then_with(|| other.index.cmp(&self.index))
  }
}

impl PartialOrd for Candidate {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl PartialEq for Candidate {
  fn eq(&self, other: &Self) -> bool {
    self.cmp(other) == Ordering::Equal
  }
}

impl Eq for Candidate {}

#[cfg(test)]
#[path = "traversal_test.rs"]
mod traversal_test;
