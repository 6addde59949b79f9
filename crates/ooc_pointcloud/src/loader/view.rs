//! What the loader needs from the host renderer.

use glam::{DMat4, DVec3};

use crate::octree::{Frustum, OctantId, OctantMeta};

/// Camera snapshot used for one evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewState {
  /// Camera position in world space.
  pub camera_position: DVec3,
  /// Projection * view, used to derive the culling frustum.
  pub view_projection: DMat4,
  /// Viewport height in pixels.
  pub viewport_height: u32,
  /// Vertical field of view in radians.
  pub fov: f32,
}

impl ViewState {
  pub fn new(camera_position: DVec3, view_projection: DMat4, viewport_height: u32, fov: f32) -> Self {
    Self {
      camera_position,
      view_projection,
      viewport_height,
      fov,
    }
  }

  /// Perspective camera at `eye` looking at `target` (right-handed, +Y up).
  pub fn look_at(eye: DVec3, target: DVec3, viewport: (u32, u32), fov: f32, near: f64, far: f64) -> Self {
    let (width, height) = viewport;
    let aspect = f64::from(width.max(1)) / f64::from(height.max(1));
    let view = DMat4::look_at_rh(eye, target, DVec3::Y);
    let projection = DMat4::perspective_rh(f64::from(fov), aspect, near, far);
    Self::new(eye, projection * view, height, fov)
  }

  pub fn frustum(&self) -> Frustum {
    Frustum::from_view_projection(&self.view_projection)
  }

  /// On-screen size of `meta` in pixels for this view.
  #[inline]
  pub fn projected_size(&self, meta: &OctantMeta) -> f64 {
    meta.projected_screen_size(self.camera_position, self.viewport_height, self.fov)
  }
}

/// The host's scene graph, as seen by the loader.
///
/// All calls happen on the thread that calls
/// [`OctantLoader::tick`](super::OctantLoader::tick), which should own the
/// graphics context.
pub trait RenderGraph<G> {
  /// Current camera.
  fn view(&self) -> ViewState;

  /// Show `geometry` for node `id`. Called once per residency; the loader
  /// keeps ownership until the node is evicted.
  fn attach_geometry(&mut self, id: OctantId, geometry: &[G]);

  /// Detach node `id` if attached and release `geometry`.
  fn detach_and_dispose(&mut self, id: OctantId, geometry: Vec<G>);
}
