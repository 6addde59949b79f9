//! Loader tuning.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables of an [`OctantLoader`](super::OctantLoader).
///
/// ```json
/// {
///   "pointBudget": 1000000,
///   "minProjectedSizeModifier": 0.3333,
///   "updateIntervalMs": 300,
///   "nodesPerBatch": 5,
///   "idleSleepMs": 2,
///   "buildHierarchyTexture": true
/// }
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoaderConfig {
	/// Maximum points counted into the visible set per evaluation.
	pub point_budget: u64,
	/// Fraction of the root's initial projected size below which nodes are
	/// never shown.
	pub min_projected_size_modifier: f64,
	/// Minimum time between two evaluations.
	#[serde(rename = "updateIntervalMs", with = "millis")]
	pub update_interval: Duration,
	/// Unloaded visible nodes submitted to the loading thread per evaluation.
	pub nodes_per_batch: usize,
	/// Loading thread back-off when the cache is empty.
	#[serde(rename = "idleSleepMs", with = "millis")]
	pub idle_sleep: Duration,
	/// Rebuild the visible-hierarchy texture when the visible set changes.
	pub build_hierarchy_texture: bool,
}

impl LoaderConfig {
	pub const DEFAULT: Self = Self {
		point_budget: 1_000_000,
		min_projected_size_modifier: 1.0 / 3.0,
		update_interval: Duration::from_millis(300),
		nodes_per_batch: 5,
		idle_sleep: Duration::from_millis(2),
		build_hierarchy_texture: true,
	};

	pub fn with_point_budget(mut self, point_budget: u64) -> Self {
		self.point_budget = point_budget;
		self
	}

	/// Negative modifiers clamp to zero (no size threshold).
	pub fn with_min_projected_size_modifier(mut self, modifier: f64) -> Self {
		self.min_projected_size_modifier = modifier.max(0.0);
		self
	}

	pub fn with_update_interval(mut self, interval: Duration) -> Self {
		self.update_interval = interval;
		self
	}

	/// At least one node per batch.
	pub fn with_nodes_per_batch(mut self, nodes: usize) -> Self {
		self.nodes_per_batch = nodes.max(1);
		self
	}

	pub fn with_idle_sleep(mut self, sleep: Duration) -> Self {
		self.idle_sleep = sleep;
		self
	}

	pub fn with_hierarchy_texture(mut self, enabled: bool) -> Self {
		self.build_hierarchy_texture = enabled;
		self
	}
}

impl Default for LoaderConfig {
	fn default() -> Self {
		Self::DEFAULT
	}
}

mod millis {
	use std::time::Duration;

	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_u64(duration.as_millis() as u64)
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
		u64::deserialize(deserializer).map(Duration::from_millis)
	}
}
