use glam::{DMat4, DVec3};

use super::*;
use crate::accessor::Pos64Accessor;
use crate::octree::{BuildConfig, Octant, OctantId, OctantMeta, Octree};
use crate::test_util::random_cloud;

const FOV: f32 = std::f32::consts::FRAC_PI_3;

/// Root of size 100 centered at (50, 50, 50) with all 8 children.
fn full_root() -> SceneTree {
  let mut root: Octant<()> = Octant::new(OctantMeta::root(OctantId::new(), DVec3::splat(50.0), 100.0, 1.0));
  root.meta.is_leaf = false;
  for slot in 0..8u8 {
    root.children[slot as usize] = Some(Box::new(root.create_child(slot)));
  }
  SceneTree::from_octant(&root)
}

fn camera_at(position: DVec3) -> ViewState {
  ViewState::new(position, DMat4::IDENTITY, 1080, FOV)
}

fn unculled<'a>(scene: &'a SceneTree, view: &'a ViewState, min_size: f64, budget: u64) -> Traversal<'a> {
  Traversal {
    scene,
    view,
    frustum: Frustum::infinite(),
    min_projected_size: min_size,
    point_budget: budget,
  }
}

#[test]
fn far_camera_shows_only_root() {
  let scene = full_root();
  let view = camera_at(DVec3::new(50.0, 50.0, 5000.0));
  let root_size = view.projected_size(&scene.node(0).meta);
  let min_size = root_size * 0.6;

  for budget in [0, 1, 1_000, u64::MAX] {
    let set = unculled(&scene, &view, min_size, budget).run(|_| 10);
    assert_eq!(set.indices().collect::<Vec<_>>(), vec![0], "budget {budget}");
    assert_eq!(set.culled, 8);
    assert_eq!(set.points, 10);
  }
}

#[test]
fn root_ignores_size_threshold() {
  let scene = full_root();
  let view = camera_at(DVec3::new(50.0, 50.0, 5000.0));
  let set = unculled(&scene, &view, f64::INFINITY, 100).run(|_| 1);
  assert_eq!(set.indices().collect::<Vec<_>>(), vec![0]);
}

#[test]
fn close_child_exhausts_budget_first() {
  let scene = full_root();
  // Inside child 0 (center 25, 25, 25).
  let view = camera_at(DVec3::new(25.0, 25.0, 20.0));
  let counts = |index: usize| match index {
    0 => 3,
    1 => 1_000,
    _ => 5,
  };
  assert_eq!(scene.node(1).meta.pos_in_parent, Some(0));

  let set = unculled(&scene, &view, 0.0, 10).run(counts);
  assert_eq!(set.indices().collect::<Vec<_>>(), vec![0, 1]);
  assert_eq!(set.points, 1_003);

  let set = unculled(&scene, &view, 0.0, 2_000).run(counts);
  assert_eq!(set.nodes.len(), 9);
  assert_eq!(set.nodes[1].index, 1);
  assert_eq!(set.points, 1_003 + 7 * 5);
}

#[test]
fn selection_is_largest_first_among_siblings() {
  let scene = full_root();
  let view = camera_at(DVec3::new(-500.0, 50.0, 50.0));
  let set = unculled(&scene, &view, 0.0, u64::MAX).run(|_| 1);

  let children = &set.nodes[1..];
  assert_eq!(children.len(), 8);
  for pair in children.windows(2) {
    assert!(pair[0].projected_size >= pair[1].projected_size);
  }
  // Slots with the X bit clear face the camera.
  let first = scene.node(children[0].index).meta.pos_in_parent.unwrap();
  assert_eq!(first & 1, 0);
}

#[test]
fn root_outside_frustum_selects_nothing() {
  let scene = full_root();
  let view = ViewState::look_at(
    DVec3::new(50.0, 50.0, -100.0),
    DVec3::new(50.0, 50.0, -200.0),
    (1920, 1080),
    FOV,
    0.1,
    1000.0,
  );
  let set = Traversal::new(&scene, &view, 0.0, u64::MAX).run(|_| 1);
  assert!(set.nodes.is_empty());
  assert!(set.unloaded.is_empty());
  assert_eq!(set.culled, 1);
}

#[test]
fn unloaded_skips_resident_and_unloadable() {
  let mut scene = full_root();
  scene.node_mut(0).state.resident_points = Some(10);
  scene.node_mut(2).state.unloadable = true;

  let view = camera_at(DVec3::new(50.0, 50.0, 500.0));
  let set = unculled(&scene, &view, 0.0, u64::MAX).run(|_| 1);
  assert_eq!(set.nodes.len(), 9);

  let unloaded: Vec<usize> = set.unloaded.iter().map(|s| s.index).collect();
  assert_eq!(unloaded.len(), 7);
  assert!(!unloaded.contains(&0));
  assert!(!unloaded.contains(&2));
}

#[test]
fn largest_unloaded_truncates_by_size() {
  let scene = full_root();
  let view = camera_at(DVec3::new(25.0, 25.0, -300.0));
  let set = unculled(&scene, &view, 0.0, u64::MAX).run(|_| 1);

  let top = set.largest_unloaded(5);
  assert_eq!(top.len(), 5);
  assert_eq!(top[0].index, 0);
  for pair in top.windows(2) {
    assert!(pair[0].projected_size >= pair[1].projected_size);
  }
  assert_eq!(set.largest_unloaded(100).len(), 9);
}

#[test]
fn larger_budget_extends_the_selection() {
  let points = random_cloud(20_000, DVec3::splat(100.0), 5);
  let octree = Octree::build(Pos64Accessor, points, BuildConfig::DEFAULT.with_max_points_per_node(200)).unwrap();
  let scene = SceneTree::from_octree(&octree);

  let mut counts = Vec::new();
  octree.visit(|o| counts.push(o.payload.len() as u64));
  assert_eq!(counts.len(), scene.len());

  let view = ViewState::look_at(
    DVec3::new(50.0, 50.0, -150.0),
    DVec3::splat(50.0),
    (1080, 1080),
    FOV,
    0.1,
    1000.0,
  );
  let min_size = view.projected_size(&scene.node(0).meta) / 8.0;

  let mut previous: Option<VisibleSet> = None;
  for budget in [0, 100, 1_000, 5_000, 20_000, u64::MAX] {
    let set = Traversal::new(&scene, &view, min_size, budget).run(|i| counts[i]);
    if let Some(prev) = &previous {
      assert!(set.nodes.len() >= prev.nodes.len());
      assert_eq!(&set.nodes[..prev.nodes.len()], &prev.nodes[..]);
    }
    previous = Some(set);
  }

  let all = previous.unwrap();
  assert!(all.nodes.len() > 1);
  assert!(all.points <= 20_000);
}
