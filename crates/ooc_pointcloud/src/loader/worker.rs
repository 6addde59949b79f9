//! The background loading thread.
//!
//! ```text
//! tick thread                         loading thread
//! ┌──────────────────┐  submit   ┌─────────────────────────┐
//! │ schedule top-k   │──────────►│ LoadingCache            │
//! └──────────────────┘           └────────────┬────────────┘
//!                                             │ take_highest()
//!                                             ▼
//!                                ┌─────────────────────────┐
//!                                │ read node file          │
//!                                │ GeometryFactory::create │
//!                                └────────────┬────────────┘
//! ┌──────────────────┐  LoadEvent             │
//! │ drain_events()   │◄───────────────────────┘ then complete()
//! └──────────────────┘
//! ```
//!
//! The event is sent before the cache entry is completed, and a completed
//! entry blocks resubmission until the tick thread acknowledges the event, so
//! no node is loaded twice for one request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;
use tracing::{debug, warn};
use web_time::Instant;

use super::cache::{LoadRequest, LoadingCache};
use crate::accessor::{GeometryFactory, PointAccessor};
use crate::error::{OocError, Result};
use crate::io::NodeStore;

/// Outcome of one background load.
pub enum LoadEvent<G> {
  Loaded {
    request: LoadRequest,
    point_count: u32,
    geometry: Vec<G>,
    /// Read and geometry creation time.
    elapsed_us: u64,
  },
  Failed {
    request: LoadRequest,
    error: OocError,
  },
}

/// Owns the loading thread; stops and joins it on drop.
pub struct LoadWorker {
  shutdown: Arc<AtomicBool>,
  handle: Option<JoinHandle<()>>,
}

impl LoadWorker {
  pub fn spawn<A, F>(
    cache: LoadingCache,
    store: NodeStore,
    accessor: A,
    factory: F,
    events: Sender<LoadEvent<F::Geometry>>,
    idle_sleep: Duration,
  ) -> Result<Self>
  where
    A: PointAccessor,
    F: GeometryFactory<A>,
  {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);

    let handle = thread::Builder::new()
      .name("ooc-octant-loader".into())
      .spawn(move || run(&flag, &cache, &store, &accessor, &factory, &events, idle_sleep))
      .map_err(OocError::WorkerSpawn)?;

    Ok(Self {
      shutdown,
      handle: Some(handle),
    })
  }

  /// False once the thread has exited.
  pub fn is_running(&self) -> bool {
    self.handle.as_ref().is_some_and(|h| !h.is_finished())
  }

  /// Signal the thread and wait for it. The load in progress, if any,
  /// finishes first.
  pub fn shutdown(&mut self) {
    self.shutdown.store(true, Ordering::Release);
    if let Some(handle) = self.handle.take() {
      if handle.join().is_err() {
        warn!("loading thread panicked");
      }
    }
  }
}

impl Drop for LoadWorker {
  fn drop(&mut self) {
    self.shutdown();
  }
}

fn run<A, F>(
  shutdown: &AtomicBool,
  cache: &LoadingCache,
  store: &NodeStore,
  accessor: &A,
  factory: &F,
  events: &Sender<LoadEvent<F::Geometry>>,
  idle_sleep: Duration,
) where
  A: PointAccessor,
  F: GeometryFactory<A>,
{
  debug!(dir = %store.dir().display(), "loading thread started");

  while !shutdown.load(Ordering::Acquire) {
    let Some(request) = cache.take_highest() else {
      thread::sleep(idle_sleep);
      continue;
    };

    let event = load(store, accessor, factory, request);
    let delivered = events.send(event).is_ok();
    cache.complete(request.id);
    if !delivered {
      // Loader dropped without stopping us.
      break;
    }
  }

  debug!("loading thread stopped");
}

#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "loader::load_node", fields(id = %request.id)))]
fn load<A, F>(store: &NodeStore, accessor: &A, factory: &F, request: LoadRequest) -> LoadEvent<F::Geometry>
where
  A: PointAccessor,
  F: GeometryFactory<A>,
{
  let start = Instant::now();
  match store.read_points(accessor, request.id) {
    Ok(points) => {
      let point_count = points.len() as u32;
      let geometry = factory.create(accessor, points);
      LoadEvent::Loaded {
        request,
        point_count,
        geometry,
        elapsed_us: start.elapsed().as_micros() as u64,
      }
    }
    Err(error) => LoadEvent::Failed { request, error },
  }
}
