//! Double-precision bounding volumes and view-frustum culling.

use glam::{DMat4, DVec3, DVec4};

/// Double-precision axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DAabb3 {
	/// Minimum corner (inclusive).
	pub min: DVec3,
	/// Maximum corner (inclusive).
	pub max: DVec3,
}

impl DAabb3 {
	/// Create a new AABB from min and max corners.
	///
	/// # Panics
	/// Debug-asserts that min <= max on all axes.
	pub fn new(min: DVec3, max: DVec3) -> Self {
		debug_assert!(
			min.x <= max.x && min.y <= max.y && min.z <= max.z,
			"AABB min must be <= max on all axes"
		);
		Self { min, max }
	}

	/// Cube of edge length `size` centered at `center`.
	pub fn from_center_size(center: DVec3, size: f64) -> Self {
		let half = DVec3::splat(size * 0.5);
		Self {
			min: center - half,
			max: center + half,
		}
	}

	/// Tight bounds of a set of positions. `None` when the iterator is empty.
	pub fn from_points(mut points: impl Iterator<Item = DVec3>) -> Option<Self> {
		let first = points.next()?;
		let (min, max) = points.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
		Some(Self { min, max })
	}

	/// Check if this AABB contains a point.
	#[inline]
	pub fn contains_point(&self, point: DVec3) -> bool {
		point.x >= self.min.x
			&& point.x <= self.max.x
			&& point.y >= self.min.y
			&& point.y <= self.max.y
			&& point.z >= self.min.z
			&& point.z <= self.max.z
	}

	/// Get the size of the AABB (max - min).
	#[inline]
	pub fn size(&self) -> DVec3 {
		self.max - self.min
	}

	/// Get the center of the AABB.
	#[inline]
	pub fn center(&self) -> DVec3 {
		(self.min + self.max) * 0.5
	}

	/// Edge length of the enclosing cube used as an octree root.
	///
	/// The longest axis is padded by 0.01% so no point lies exactly on the
	/// root's far faces.
	pub fn enclosing_cube_size(&self) -> f64 {
		let longest = self.size().max_element();
		longest + longest / 100.0 * 0.01
	}
}

/// Six inward-facing planes `(normal, d)` with `dot(normal, p) + d >= 0` inside.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frustum {
	planes: [DVec4; 6],
}

impl Frustum {
	/// Extract the planes of a combined `projection * view` matrix with a
	/// `[0, 1]` depth range, as built by glam's `perspective_rh`.
	pub fn from_view_projection(m: &DMat4) -> Self {
		let r0 = m.row(0);
		let r1 = m.row(1);
		let r2 = m.row(2);
		let r3 = m.row(3);
		let planes = [
			r3 + r0, // left
			r3 - r0, // right
			r3 + r1, // bottom
			r3 - r1, // top
			r2,      // near
			r3 - r2, // far
		]
		.map(normalize_plane);
		Self { planes }
	}

	/// Frustum that accepts everything.
	pub fn infinite() -> Self {
		Self {
			planes: [DVec4::new(0.0, 0.0, 0.0, 1.0); 6],
		}
	}

	/// True if `aabb` is inside or intersects the frustum.
	///
	/// Uses the positive-vertex test: conservative for boxes near frustum
	/// corners, never rejects a visible box.
	pub fn intersects_aabb(&self, aabb: &DAabb3) -> bool {
		self.planes.iter().all(|plane| {
			let normal = plane.truncate();
			let positive = DVec3::select(normal.cmpge(DVec3::ZERO), aabb.max, aabb.min);
			normal.dot(positive) + plane.w >= 0.0
		})
	}
}

fn normalize_plane(plane: DVec4) -> DVec4 {
	let len = plane.truncate().length();
	if len > 0.0 {
		plane / len
	} else {
		plane
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn looking_down_neg_z() -> Frustum {
		let proj = DMat4::perspective_rh(60f64.to_radians(), 1.0, 0.1, 1000.0);
		let view = DMat4::look_at_rh(DVec3::ZERO, DVec3::NEG_Z, DVec3::Y);
		Frustum::from_view_projection(&(proj * view))
	}

	#[test]
	fn test_from_center_size() {
		let aabb = DAabb3::from_center_size(DVec3::ZERO, 20.0);
		assert_eq!(aabb.min, DVec3::splat(-10.0));
		assert_eq!(aabb.max, DVec3::splat(10.0));
	}

	#[test]
	fn test_from_points() {
		let pts = [DVec3::new(1.0, -2.0, 3.0), DVec3::new(-1.0, 4.0, 0.0)];
		let aabb = DAabb3::from_points(pts.into_iter()).unwrap();
		assert_eq!(aabb.min, DVec3::new(-1.0, -2.0, 0.0));
		assert_eq!(aabb.max, DVec3::new(1.0, 4.0, 3.0));
		assert!(DAabb3::from_points(std::iter::empty()).is_none());
	}

	#[test]
	fn test_contains_point() {
		let aabb = DAabb3::new(DVec3::ZERO, DVec3::splat(10.0));
		assert!(aabb.contains_point(DVec3::splat(5.0)));
		assert!(aabb.contains_point(DVec3::ZERO));
		assert!(!aabb.contains_point(DVec3::splat(11.0)));
	}

	#[test]
	fn test_enclosing_cube_pads_longest_axis() {
		let aabb = DAabb3::new(DVec3::ZERO, DVec3::new(100.0, 10.0, 50.0));
		let size = aabb.enclosing_cube_size();
		assert!(size > 100.0);
		assert!((size - 100.01).abs() < 1e-9);
	}

	#[test]
	fn test_frustum_accepts_box_in_front() {
		let frustum = looking_down_neg_z();
		let aabb = DAabb3::from_center_size(DVec3::new(0.0, 0.0, -50.0), 10.0);
		assert!(frustum.intersects_aabb(&aabb));
	}

	#[test]
	fn test_frustum_rejects_box_behind() {
		let frustum = looking_down_neg_z();
		let aabb = DAabb3::from_center_size(DVec3::new(0.0, 0.0, 50.0), 10.0);
		assert!(!frustum.intersects_aabb(&aabb));
	}

	#[test]
	fn test_frustum_rejects_box_to_the_side() {
		let frustum = looking_down_neg_z();
		let aabb = DAabb3::from_center_size(DVec3::new(500.0, 0.0, -10.0), 10.0);
		assert!(!frustum.intersects_aabb(&aabb));
	}

	#[test]
	fn test_frustum_near_plane_matches_depth_range() {
		let proj = DMat4::perspective_rh(60f64.to_radians(), 1.0, 10.0, 20.0);
		let view = DMat4::look_at_rh(DVec3::ZERO, DVec3::NEG_Z, DVec3::Y);
		let frustum = Frustum::from_view_projection(&(proj * view));

		// Entirely between the camera and the near plane.
		let too_close = DAabb3::from_center_size(DVec3::new(0.0, 0.0, -8.0), 1.0);
		assert!(!frustum.intersects_aabb(&too_close));

		let straddling = DAabb3::from_center_size(DVec3::new(0.0, 0.0, -10.0), 1.0);
		assert!(frustum.intersects_aabb(&straddling));
		let inside = DAabb3::from_center_size(DVec3::new(0.0, 0.0, -15.0), 1.0);
		assert!(frustum.intersects_aabb(&inside));
		let beyond_far = DAabb3::from_center_size(DVec3::new(0.0, 0.0, -22.0), 1.0);
		assert!(!frustum.intersects_aabb(&beyond_far));
	}

	#[test]
	fn test_frustum_accepts_box_around_camera() {
		let frustum = looking_down_neg_z();
		let aabb = DAabb3::from_center_size(DVec3::ZERO, 10.0);
		assert!(frustum.intersects_aabb(&aabb));
	}

	#[test]
	fn test_infinite_frustum() {
		let aabb = DAabb3::from_center_size(DVec3::splat(1e12), 1.0);
		assert!(Frustum::infinite().intersects_aabb(&aabb));
	}
}
