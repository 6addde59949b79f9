use super::*;

#[test]
fn test_defaults() {
  let config = BuildConfig::default();
  assert_eq!(config.max_points_per_node, 1024);
  assert_eq!(config.max_level, 20);
  assert_eq!(config, BuildConfig::DEFAULT);
}

/// Subdivision starts once the bucket is full, not before.
#[test]
fn test_should_subdivide_at_bucket_cap() {
  let config = BuildConfig::DEFAULT.with_max_points_per_node(10);
  assert!(!config.should_subdivide(0, 9));
  assert!(config.should_subdivide(0, 10));
  assert!(config.should_subdivide(3, 500));
}

/// Nothing subdivides at the level cap.
#[test]
fn test_max_level_stops_subdivision() {
  let config = BuildConfig::DEFAULT.with_max_level(2);
  assert!(config.should_subdivide(1, 1_000_000));
  assert!(!config.should_subdivide(2, 1_000_000));
}

/// A zero bucket would subdivide forever; it is clamped to one point.
#[test]
fn test_zero_bucket_clamped() {
  let config = BuildConfig::DEFAULT.with_max_points_per_node(0);
  assert_eq!(config.max_points_per_node, 1);
  assert!(!config.should_subdivide(0, 0));
}

#[test]
fn test_serde_camel_case_with_defaults() {
  let config: BuildConfig = serde_json::from_str(r#"{ "maxLevel": 7 }"#).unwrap();
  assert_eq!(config.max_level, 7);
  assert_eq!(config.max_points_per_node, 1024);

  let json = serde_json::to_string(&config).unwrap();
  assert!(json.contains("\"maxPointsPerNode\":1024"));
}
