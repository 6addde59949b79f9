use std::collections::HashSet;

use glam::DVec3;

use super::*;
use crate::accessor::Pos64Accessor;
use crate::test_util::random_cloud;

fn key(p: &DVec3) -> [u64; 3] {
  [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()]
}

// =========================================================================
// Root fitting
// =========================================================================

#[test]
fn test_empty_point_set_is_rejected() {
  let result = Octree::build(Pos64Accessor, Vec::new(), BuildConfig::default());
  assert!(matches!(result, Err(OocError::EmptyPointSet)));
}

/// Root is a cube over the longest axis with resolution size / 128.
#[test]
fn test_root_fits_longest_axis() {
  let points = vec![DVec3::ZERO, DVec3::new(100.0, 10.0, 50.0)];
  let octree = Octree::build(Pos64Accessor, points, BuildConfig::default()).unwrap();
  let root = &octree.root().meta;

  assert_eq!(root.center, DVec3::new(50.0, 5.0, 25.0));
  assert!((root.size - 100.01).abs() < 1e-9);
  assert!((root.resolution - root.size / 128.0).abs() < 1e-12);
  assert_eq!(root.level, 0);
  assert_eq!(root.pos_in_parent, None);
}

/// A single point still gets a usable root.
#[test]
fn test_single_point() {
  let octree = Octree::build(Pos64Accessor, vec![DVec3::ONE], BuildConfig::default()).unwrap();
  assert_eq!(octree.octant_count(), 1);
  assert_eq!(octree.point_count(), 1);
  assert!(octree.root().meta.is_leaf);
  assert!(octree.root().meta.size > 0.0);
}

// =========================================================================
// Payload exclusivity
// =========================================================================

/// Every input point is stored in exactly one payload.
#[test]
fn test_payload_exclusivity() {
  let points = random_cloud(30_000, DVec3::new(100.0, 20.0, 60.0), 11);
  let config = BuildConfig::DEFAULT.with_max_points_per_node(500);
  let octree = Octree::build(Pos64Accessor, points.clone(), config).unwrap();

  assert_eq!(octree.point_count(), points.len());

  let mut seen = HashSet::new();
  octree.visit(|o| {
    for p in &o.payload {
      assert!(seen.insert(key(p)), "point {p} stored twice");
    }
  });
  let expected: HashSet<_> = points.iter().map(key).collect();
  assert_eq!(seen, expected);
}

/// Payload points lie inside their octant's cube.
#[test]
fn test_payload_within_octant_bounds() {
  let points = random_cloud(20_000, DVec3::splat(50.0), 3);
  let config = BuildConfig::DEFAULT.with_max_points_per_node(100);
  let octree = Octree::build(Pos64Accessor, points, config).unwrap();

  octree.visit(|o| {
    let bounds = o.meta.bounds();
    for p in &o.payload {
      assert!(bounds.contains_point(*p), "{p} outside level {} octant", o.meta.level);
    }
  });
}

/// Inner octants only keep grid occupants, which respect their resolution.
#[test]
fn test_inner_payload_respects_resolution() {
  // Dense cluster inside a large root forces several levels.
  let mut points: Vec<DVec3> = random_cloud(5_000, DVec3::ONE, 5)
    .into_iter()
    .map(|p| p + DVec3::splat(50.0))
    .collect();
  points.push(DVec3::ZERO);
  points.push(DVec3::splat(100.0));
  let config = BuildConfig::DEFAULT.with_max_points_per_node(100);
  let octree = Octree::build(Pos64Accessor, points, config).unwrap();

  let mut checked = 0;
  octree.visit(|o| {
    if o.meta.is_leaf {
      return;
    }
    for (i, a) in o.payload.iter().enumerate() {
      for b in &o.payload[i + 1..] {
        assert!(a.distance(*b) >= o.meta.resolution);
      }
    }
    checked += 1;
  });
  assert!(checked > 0);
}

// =========================================================================
// Shape
// =========================================================================

/// Each child has half its parent's size and resolution, one level deeper.
#[test]
fn test_levels_and_resolution_halve() {
  let points = random_cloud(20_000, DVec3::splat(100.0), 9);
  let config = BuildConfig::DEFAULT.with_max_points_per_node(100);
  let octree = Octree::build(Pos64Accessor, points, config).unwrap();

  let mut deepest = 0;
  octree.visit(|o| {
    deepest = deepest.max(o.meta.level);
    assert_eq!(o.meta.is_leaf, o.has_no_children());
    for child in o.iter_children() {
      assert_eq!(child.meta.level, o.meta.level + 1);
      assert_eq!(child.meta.size, o.meta.size * 0.5);
      assert_eq!(child.meta.resolution, o.meta.resolution * 0.5);
      let slot = child.meta.pos_in_parent.unwrap();
      assert_eq!(child.meta.center, o.meta.child_center(slot));
    }
  });
  assert!(deepest > 0);
  assert_eq!(octree.max_level(), deepest);
}

/// A smaller bucket subdivides more.
#[test]
fn test_small_bucket_produces_deeper_tree() {
  let points = random_cloud(20_000, DVec3::splat(100.0), 21);
  let shallow = Octree::build(
    Pos64Accessor,
    points.clone(),
    BuildConfig::DEFAULT.with_max_points_per_node(5_000),
  )
  .unwrap();
  let deep = Octree::build(
    Pos64Accessor,
    points,
    BuildConfig::DEFAULT.with_max_points_per_node(50),
  )
  .unwrap();

  assert!(deep.octant_count() > shallow.octant_count());
  assert!(deep.max_level() >= shallow.max_level());
}

/// Duplicates cannot be separated by subdivision; the level cap stops it.
#[test]
fn test_duplicates_stop_at_max_level() {
  let mut points = vec![DVec3::splat(1.0); 500];
  points.push(DVec3::ZERO);
  points.push(DVec3::splat(2.0));
  let config = BuildConfig::DEFAULT
    .with_max_points_per_node(10)
    .with_max_level(4);
  let octree = Octree::build(Pos64Accessor, points, config).unwrap();

  assert_eq!(octree.max_level(), 4);
  assert_eq!(octree.point_count(), 502);
  octree.visit(|o| assert!(o.meta.level <= 4));
}

/// Ids are unique across the tree.
#[test]
fn test_octant_ids_unique() {
  let points = random_cloud(10_000, DVec3::splat(10.0), 17);
  let config = BuildConfig::DEFAULT.with_max_points_per_node(100);
  let octree = Octree::build(Pos64Accessor, points, config).unwrap();

  let mut ids = HashSet::new();
  octree.visit(|o| assert!(ids.insert(o.meta.id)));
  assert_eq!(ids.len(), octree.octant_count());
}
