//! Loading cache shared between the tick thread and the loading thread.
//!
//! The tick thread enqueues (or re-prioritizes) visible unloaded nodes; the
//! loading thread takes the highest-priority entry, loads it, and completes
//! it. Entries move pending → in flight → delivered → gone. A delivered
//! entry leaves the cache once the tick thread has consumed its load event,
//! so a node cannot be queued again while its result is still in transit.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::octree::OctantId;

/// One node to load.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoadRequest {
  pub id: OctantId,
  /// Scene arena index, echoed back in the load event.
  pub node: usize,
  /// Projected size at scheduling time.
  pub priority: f64,
}

#[derive(Debug, Default)]
struct Inner {
  pending: HashMap<OctantId, LoadRequest>,
  in_flight: Option<OctantId>,
  /// Completed, event not yet consumed by the tick thread.
  delivered: HashSet<OctantId>,
}

/// Cloneable handle; all clones share one cache.
#[derive(Clone, Debug, Default)]
pub struct LoadingCache {
  inner: Arc<Mutex<Inner>>,
}

impl LoadingCache {
  pub fn new() -> Self {
    Self::default()
  }

  // A panicking holder cannot leave `Inner` half-updated.
  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Enqueue `request`, or update its priority if already pending.
  /// Returns false if the node is being loaded or its result has not been
  /// acknowledged yet.
  pub fn submit(&self, request: LoadRequest) -> bool {
    let mut inner = self.lock();
    if inner.in_flight == Some(request.id) || inner.delivered.contains(&request.id) {
      return false;
    }
    inner.pending.insert(request.id, request);
    true
  }

  /// Remove and return the pending entry with the largest priority, marking
  /// it in flight.
  pub fn take_highest(&self) -> Option<LoadRequest> {
    let mut inner = self.lock();
    let id = inner
      .pending
      .values()
      .max_by(|a, b| a.priority.total_cmp(&b.priority).then(b.node.cmp(&a.node)))
      .map(|r| r.id)?;
    let request = inner.pending.remove(&id)?;
    inner.in_flight = Some(id);
    Some(request)
  }

  /// Clear the in-flight marker once the result has been published.
  pub fn complete(&self, id: OctantId) {
    let mut inner = self.lock();
    if inner.in_flight == Some(id) {
      inner.in_flight = None;
      inner.delivered.insert(id);
    }
  }

  /// The tick thread consumed the load event for `id`; the node may be
  /// submitted again.
  pub fn acknowledge(&self, id: OctantId) {
    self.lock().delivered.remove(&id);
  }

  /// Drop pending entries `keep` rejects. The in-flight entry is never
  /// cancelled.
  pub fn retain(&self, mut keep: impl FnMut(&LoadRequest) -> bool) -> usize {
    let mut inner = self.lock();
    let before = inner.pending.len();
    inner.pending.retain(|_, request| keep(request));
    before - inner.pending.len()
  }

  /// Pending or in flight.
  pub fn contains(&self, id: OctantId) -> bool {
    let inner = self.lock();
    inner.in_flight == Some(id) || inner.pending.contains_key(&id)
  }

  /// Pending plus in-flight entries.
  pub fn len(&self) -> usize {
    let inner = self.lock();
    inner.pending.len() + usize::from(inner.in_flight.is_some())
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
