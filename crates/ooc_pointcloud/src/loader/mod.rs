//! Runtime streaming of octree nodes under a point budget.
//!
//! Every tick the loader drains finished loads from the background thread.
//! When the update interval has elapsed and the camera is at rest it also
//! runs a full evaluation:
//!
//! ```text
//! traverse ──► schedule top-k unloaded ──► hierarchy texture ──► scene sync
//! (visible set)  (LoadingCache)              (if changed)       (attach / evict)
//! ```
//!
//! Per node:
//!
//! ```text
//! NotVisible ──visible──► VisibleUnloaded ──loaded──► VisibleLoaded
//!     ▲                          │                          │
//!     └──────────────────────────┴──── not selected ────────┘
//!                                      (geometry disposed)
//! ```
//!
//! Children culled during traversal are not evicted on the spot: scene sync
//! walks the tree and disposes the whole subtree below each node outside the
//! visible set.
//!
//! # Module Structure
//!
//! - [`config`]: `LoaderConfig` tunables
//! - [`view`]: `ViewState` and the `RenderGraph` capability
//! - [`traversal`]: largest-first visible set selection
//! - [`cache`]: `LoadingCache` shared with the loading thread
//! - [`worker`]: the loading thread
//! - [`hierarchy_tex`]: visible hierarchy texture

pub mod cache;
pub mod config;
pub mod hierarchy_tex;
pub mod traversal;
pub mod view;
pub mod worker;

use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;

use crossbeam_channel::{Receiver, TryRecvError};
use tracing::{debug, info, warn};
use web_time::Instant;

// Re-exports
pub use cache::{LoadRequest, LoadingCache};
pub use config::LoaderConfig;
pub use hierarchy_tex::HierarchyTexture;
pub use traversal::{Selected, Traversal, VisibleSet};
pub use view::{RenderGraph, ViewState};

use self::worker::{LoadEvent, LoadWorker};
use crate::accessor::{GeometryFactory, PointAccessor};
use crate::error::{LoadFailure, Result};
use crate::io::{NodeStore, OctreeFileReader};
use crate::metrics::LoaderStats;
use crate::octree::{DAabb3, OctantId};
use crate::scene::SceneTree;

/// What a tick did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TickOutcome {
  /// The update interval has not elapsed yet.
  #[default]
  Debounced,
  /// The camera moved since the previous tick, or the host reported motion.
  CameraMoving,
  /// Full evaluation ran.
  Evaluated,
}

/// Summary of one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
  pub outcome: TickOutcome,
  pub loads_completed: usize,
  pub loads_failed: usize,
  pub visible_nodes: usize,
  pub visible_points: u64,
  /// Load requests submitted (new or re-prioritized).
  pub scheduled: usize,
  pub attached: usize,
  pub evicted: usize,
}

/// Streams the nodes of one point cloud into a [`RenderGraph`].
pub struct OctantLoader<A, F>
where
  A: PointAccessor,
  F: GeometryFactory<A>,
{
  scene: SceneTree,
  config: LoaderConfig,
  store: NodeStore,
  cache: LoadingCache,
  events: Receiver<LoadEvent<F::Geometry>>,
  worker: LoadWorker,
  worker_lost: bool,
  /// Geometry delivered by the loading thread, attached or not.
  resident: HashMap<OctantId, Vec<F::Geometry>>,
  /// Node file header counts, read once per node.
  header_counts: HashMap<usize, u32>,
  visible: HashSet<usize>,
  /// Projected size of the root for the camera the loader was created with.
  root_projected_size: f64,
  min_projected_size: f64,
  last_evaluation: Option<Instant>,
  last_view: Option<ViewState>,
  user_moving: bool,
  hierarchy_texture: Option<HierarchyTexture>,
  stats: LoaderStats,
  _types: PhantomData<fn() -> (A, F)>,
}

impl<A, F> OctantLoader<A, F>
where
  A: PointAccessor,
  F: GeometryFactory<A>,
{
  /// Start a loader (and its loading thread) for `scene`, whose node files
  /// live in `store`.
  ///
  /// `initial_view` fixes the root's reference projected size; the minimum
  /// projected size is that times
  /// [`LoaderConfig::min_projected_size_modifier`].
  pub fn new(
    scene: SceneTree,
    store: NodeStore,
    accessor: A,
    factory: F,
    config: LoaderConfig,
    initial_view: &ViewState,
  ) -> Result<Self> {
    let root_projected_size = match initial_view.projected_size(&scene.node(scene.root()).meta) {
      size if size.is_finite() => size,
      // Camera at the root center.
      _ => 0.0,
    };

    let cache = LoadingCache::new();
    let (sender, events) = crossbeam_channel::unbounded();
    let worker = LoadWorker::spawn(cache.clone(), store.clone(), accessor, factory, sender, config.idle_sleep)?;

    info!(
      nodes = scene.len(),
      max_level = scene.max_level(),
      point_budget = config.point_budget,
      root_projected_size,
      "octant loader started"
    );

    Ok(Self {
      scene,
      config,
      store,
      cache,
      events,
      worker,
      worker_lost: false,
      resident: HashMap::new(),
      header_counts: HashMap::new(),
      visible: HashSet::new(),
      root_projected_size,
      min_projected_size: root_projected_size * config.min_projected_size_modifier,
      last_evaluation: None,
      last_view: None,
      user_moving: false,
      hierarchy_texture: None,
      stats: LoaderStats::new(),
      _types: PhantomData,
    })
  }

  /// Start a loader for an octree folder.
  pub fn open(
    reader: &OctreeFileReader,
    accessor: A,
    factory: F,
    config: LoaderConfig,
    initial_view: &ViewState,
  ) -> Result<Self> {
    Self::new(reader.read_scene()?, reader.node_store(), accessor, factory, config, initial_view)
  }

  /// [`tick_at`](Self::tick_at) with the current time.
  pub fn tick<R: RenderGraph<F::Geometry>>(&mut self, graph: &mut R) -> TickReport {
    self.tick_at(graph, Instant::now())
  }

  /// Drain finished loads, then evaluate if due and the camera is at rest.
  pub fn tick_at<R: RenderGraph<F::Geometry>>(&mut self, graph: &mut R, now: Instant) -> TickReport {
    let mut report = TickReport::default();
    self.drain_events(graph, &mut report);

    let view = graph.view();
    let moved = self.last_view.is_some_and(|last| last != view);
    self.last_view = Some(view);

    if let Some(last) = self.last_evaluation {
      if now.saturating_duration_since(last) < self.config.update_interval {
        return report;
      }
    }
    self.last_evaluation = Some(now);

    if moved || self.user_moving {
      report.outcome = TickOutcome::CameraMoving;
      return report;
    }

    self.evaluate(graph, &view, &mut report);
    report
  }

  /// Hosts that track input can suppress evaluation while the user is
  /// navigating, in addition to the loader's own motion check.
  pub fn set_user_moving(&mut self, moving: bool) {
    self.user_moving = moving;
  }

  pub fn set_point_budget(&mut self, point_budget: u64) {
    self.config.point_budget = point_budget;
  }

  /// Re-derive the minimum projected size from the root's initial size.
  pub fn set_min_projected_size_modifier(&mut self, modifier: f64) {
    self.config = self.config.with_min_projected_size_modifier(modifier);
    self.min_projected_size = self.root_projected_size * self.config.min_projected_size_modifier;
  }

  pub fn config(&self) -> &LoaderConfig {
    &self.config
  }

  pub fn min_projected_size(&self) -> f64 {
    self.min_projected_size
  }

  pub fn scene(&self) -> &SceneTree {
    &self.scene
  }

  pub fn stats(&self) -> &LoaderStats {
    &self.stats
  }

  /// Visible set of the last evaluation.
  pub fn visible(&self) -> &HashSet<usize> {
    &self.visible
  }

  pub fn is_resident(&self, id: OctantId) -> bool {
    self.resident.contains_key(&id)
  }

  pub fn resident_count(&self) -> usize {
    self.resident.len()
  }

  /// Entries queued or in flight on the loading thread.
  pub fn loading_count(&self) -> usize {
    self.cache.len()
  }

  /// Bounds of the nodes that are visible and hold geometry, for debug
  /// overlays.
  pub fn resident_visible_bounds(&self) -> Vec<DAabb3> {
    self
      .visible
      .iter()
      .map(|&index| self.scene.node(index))
      .filter(|node| self.resident.contains_key(&node.id()))
      .map(|node| node.meta.bounds())
      .collect()
  }

  /// Texture of the last visible set, when enabled.
  pub fn hierarchy_texture(&self) -> Option<&HierarchyTexture> {
    self.hierarchy_texture.as_ref()
  }

  /// Detach and dispose every resident geometry, e.g. before the render
  /// graph goes away.
  pub fn release<R: RenderGraph<F::Geometry>>(&mut self, graph: &mut R) {
    for (id, geometry) in self.resident.drain() {
      graph.detach_and_dispose(id, geometry);
    }
    for index in 0..self.scene.len() {
      let state = &mut self.scene.node_mut(index).state;
      state.resident_points = None;
      state.attached = false;
    }
    self.visible.clear();
    self.hierarchy_texture = None;
    self.last_evaluation = None;
  }

  /// Stop the loading thread. Loads already delivered stay resident.
  pub fn shutdown(&mut self) {
    self.worker.shutdown();
  }

  fn drain_events<R: RenderGraph<F::Geometry>>(&mut self, graph: &mut R, report: &mut TickReport) {
    loop {
      match self.events.try_recv() {
        Ok(LoadEvent::Loaded {
          request,
          point_count,
          geometry,
          elapsed_us,
        }) => {
          self.cache.acknowledge(request.id);
          report.loads_completed += 1;
          self.stats.record_load(elapsed_us);
          self.header_counts.insert(request.node, point_count);

          let state = &mut self.scene.node_mut(request.node).state;
          state.resident_points = Some(point_count);
          state.attached = false;
          if let Some(stale) = self.resident.insert(request.id, geometry) {
            graph.detach_and_dispose(request.id, stale);
          }
        }
        Ok(LoadEvent::Failed { request, error }) => {
          self.cache.acknowledge(request.id);
          report.loads_failed += 1;
          self.stats.record_failure();
          match error.load_failure() {
            LoadFailure::Retry => {
              warn!(id = %request.id, %error, "node load failed, will retry");
            }
            LoadFailure::Permanent => {
              warn!(id = %request.id, %error, "node cannot be loaded");
              self.scene.node_mut(request.node).state.unloadable = true;
            }
          }
        }
        Err(TryRecvError::Empty) => break,
        Err(TryRecvError::Disconnected) => {
          if !self.worker_lost {
            self.worker_lost = true;
            warn!(running = self.worker.is_running(), "loading thread disconnected");
          }
          break;
        }
      }
    }
  }

  fn evaluate<R: RenderGraph<F::Geometry>>(&mut self, graph: &mut R, view: &ViewState, report: &mut TickReport) {
    let start = Instant::now();

    let set = {
      let scene = &self.scene;
      let store = &self.store;
      let header_counts = &mut self.header_counts;
      Traversal::new(scene, view, self.min_projected_size, self.config.point_budget).run(|index| {
        let node = scene.node(index);
        if let Some(points) = node.state.resident_points {
          return u64::from(points);
        }
        if let Some(&points) = header_counts.get(&index) {
          return u64::from(points);
        }
        match store.read_point_count(node.id()) {
          Ok(points) => {
            header_counts.insert(index, points);
            u64::from(points)
          }
          Err(error) => {
            debug!(id = %node.id(), %error, "node header unreadable");
            0
          }
        }
      })
    };
    let visible: HashSet<usize> = set.indices().collect();

    self.schedule(&set, &visible, report);

    if self.config.build_hierarchy_texture {
      if visible != self.visible || self.hierarchy_texture.is_none() {
        self.hierarchy_texture = Some(HierarchyTexture::build(&self.scene, &visible));
      }
    } else {
      self.hierarchy_texture = None;
    }

    self.sync_scene(graph, &visible, report);
    self.visible = visible;

    report.outcome = TickOutcome::Evaluated;
    report.visible_nodes = set.nodes.len();
    report.visible_points = set.points;

    self.stats.visible_nodes = set.nodes.len();
    self.stats.visible_points = set.points;
    self.stats.visible_unloaded = set.unloaded.len();
    self.stats.resident_nodes = self.resident.len();
    self.stats.loading = self.cache.len();
    self.stats.attachments += report.attached as u64;
    self.stats.evictions += report.evicted as u64;
    self.stats.record_evaluation(start.elapsed().as_micros() as u64);

    debug!(
      visible = set.nodes.len(),
      points = set.points,
      unloaded = set.unloaded.len(),
      culled = set.culled,
      scheduled = report.scheduled,
      attached = report.attached,
      evicted = report.evicted,
      "evaluated"
    );
  }

  /// Submit the largest unloaded visible nodes and drop queued entries that
  /// are no longer visible.
  fn schedule(&mut self, set: &VisibleSet, visible: &HashSet<usize>, report: &mut TickReport) {
    let dropped = self.cache.retain(|request| visible.contains(&request.node));

    for selected in set.largest_unloaded(self.config.nodes_per_batch) {
      let request = LoadRequest {
        id: self.scene.node(selected.index).id(),
        node: selected.index,
        priority: selected.projected_size,
      };
      if self.cache.submit(request) {
        report.scheduled += 1;
      }
    }

    if report.scheduled > 0 || dropped > 0 {
      debug!(scheduled = report.scheduled, dropped, queued = self.cache.len(), "load batch");
    }
  }

  /// Walk the tree: evict whole subtrees outside the visible set, attach
  /// resident geometry inside it.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "loader::sync_scene"))]
  fn sync_scene<R: RenderGraph<F::Geometry>>(&mut self, graph: &mut R, visible: &HashSet<usize>, report: &mut TickReport) {
    let mut index = self.scene.root();
    while index < self.scene.len() {
      if visible.contains(&index) {
        let node = self.scene.node_mut(index);
        debug_assert!(node.parent.map_or(true, |parent| visible.contains(&parent)));
        let id = node.id();
        if let Some(geometry) = self.resident.get(&id) {
          if !node.state.attached {
            graph.attach_geometry(id, geometry);
            node.state.attached = true;
            report.attached += 1;
          }
        }
        index += 1;
        continue;
      }

      // Traversal only reaches children of selected nodes.
      let subtree = self.scene.subtree(index);
      for culled in subtree.clone() {
        let node = self.scene.node_mut(culled);
        let id = node.id();
        if let Some(geometry) = self.resident.remove(&id) {
          graph.detach_and_dispose(id, geometry);
          report.evicted += 1;
        }
        node.state.resident_points = None;
        node.state.attached = false;
      }
      index = subtree.end;
    }
  }
}
