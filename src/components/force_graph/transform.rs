//! Pan/zoom transform between world and screen coordinates.

/// Smallest zoom factor reachable through interaction.
pub const MIN_ZOOM: f64 = 0.1;

/// Largest zoom factor reachable through interaction.
pub const MAX_ZOOM: f64 = 10.0;

/// Pan and zoom transform applied to the entire graph view.
///
/// `screen = world * k + (x, y)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	/// Horizontal offset in screen pixels.
	pub x: f64,
	/// Vertical offset in screen pixels.
	pub y: f64,
	/// Zoom factor (1.0 = 100%, clamped to `MIN_ZOOM..=MAX_ZOOM`).
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

impl ViewTransform {
	/// World origin at the middle of a `width` x `height` viewport.
	pub fn centered(width: f64, height: f64) -> Self {
		Self {
			x: width / 2.0,
			y: height / 2.0,
			k: 1.0,
		}
	}

	/// Screen pixels to world units.
	pub fn screen_to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
		((sx - self.x) / self.k, (sy - self.y) / self.k)
	}

	/// World units to screen pixels.
	pub fn world_to_screen(&self, wx: f64, wy: f64) -> (f64, f64) {
		(wx * self.k + self.x, wy * self.k + self.y)
	}

	/// Sets the zoom factor, clamped to the allowed range. NaN is ignored.
	pub fn set_scale(&mut self, k: f64) {
		if !k.is_nan() {
			self.k = k.clamp(MIN_ZOOM, MAX_ZOOM);
		}
	}

	/// Multiplies the zoom by `factor`, keeping the world point under
	/// `(sx, sy)` fixed on screen.
	pub fn zoom_at(&mut self, factor: f64, sx: f64, sy: f64) {
		let (wx, wy) = self.screen_to_world(sx, sy);
		self.set_scale(self.k * factor);
		self.x = sx - wx * self.k;
		self.y = sy - wy * self.k;
	}

	/// Shifts the view by a screen-pixel delta.
	pub fn pan_by(&mut self, dx: f64, dy: f64) {
		self.x += dx;
		self.y += dy;
	}

	/// Frames `bounds` inside the viewport with `padding` screen pixels on
	/// every side. Empty bounds leave the transform untouched.
	pub fn fit(&mut self, bounds: &Bounds, width: f64, height: f64, padding: f64) {
		if bounds.is_empty() {
			return;
		}
		let avail_w = (width - 2.0 * padding).max(1.0);
		let avail_h = (height - 2.0 * padding).max(1.0);
		let k = (avail_w / bounds.width().max(1.0)).min(avail_h / bounds.height().max(1.0));
		self.set_scale(k);
		let (cx, cy) = bounds.center();
		self.x = width / 2.0 - cx * self.k;
		self.y = height / 2.0 - cy * self.k;
	}
}

/// Axis-aligned world-space bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
	/// Left edge.
	pub min_x: f64,
	/// Top edge.
	pub min_y: f64,
	/// Right edge.
	pub max_x: f64,
	/// Bottom edge.
	pub max_y: f64,
}

impl Bounds {
	/// Box that covers nothing; growing it starts from the first point.
	pub fn empty() -> Self {
		Self {
			min_x: f64::INFINITY,
			min_y: f64::INFINITY,
			max_x: f64::NEG_INFINITY,
			max_y: f64::NEG_INFINITY,
		}
	}

	/// True until something has been included.
	pub fn is_empty(&self) -> bool {
		self.min_x > self.max_x || self.min_y > self.max_y
	}

	/// Grows the box to cover a circle. Non-finite input is ignored.
	pub fn include_circle(&mut self, x: f64, y: f64, radius: f64) {
		if !(x.is_finite() && y.is_finite() && radius.is_finite()) {
			return;
		}
		self.min_x = self.min_x.min(x - radius);
		self.min_y = self.min_y.min(y - radius);
		self.max_x = self.max_x.max(x + radius);
		self.max_y = self.max_y.max(y + radius);
	}

	/// Horizontal extent.
	pub fn width(&self) -> f64 {
		self.max_x - self.min_x
	}

	/// Vertical extent.
	pub fn height(&self) -> f64 {
		self.max_y - self.min_y
	}

	/// Midpoint of the box.
	pub fn center(&self) -> (f64, f64) {
		(
			(self.min_x + self.max_x) / 2.0,
			(self.min_y + self.max_y) / 2.0,
		)
	}
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;

	use super::*;

	#[test]
	fn screen_world_roundtrip() {
		let t = ViewTransform {
			x: 120.0,
			y: -40.0,
			k: 2.5,
		};
		let (wx, wy) = t.screen_to_world(300.0, 200.0);
		let (sx, sy) = t.world_to_screen(wx, wy);
		assert!((sx - 300.0).abs() < 1e-9 && (sy - 200.0).abs() < 1e-9);
	}

	#[test]
	fn zoom_at_keeps_anchor_fixed() {
		let mut t = ViewTransform::centered(800.0, 600.0);
		let before = t.screen_to_world(650.0, 120.0);
		t.zoom_at(1.7, 650.0, 120.0);
		let after = t.screen_to_world(650.0, 120.0);
		assert!((before.0 - after.0).abs() < 1e-9);
		assert!((before.1 - after.1).abs() < 1e-9);
	}

	#[test]
	fn nan_scale_is_ignored() {
		let mut t = ViewTransform::default();
		t.set_scale(f64::NAN);
		assert_eq!(t.k, 1.0);
	}

	#[test]
	fn fit_frames_bounds() {
		let mut bounds = Bounds::empty();
		bounds.include_circle(-100.0, 0.0, 0.0);
		bounds.include_circle(100.0, 50.0, 0.0);
		let mut t = ViewTransform::default();
		t.fit(&bounds, 440.0, 300.0, 20.0);

		assert!((t.k - 2.0).abs() < 1e-9);
		let (cx, cy) = t.world_to_screen(0.0, 25.0);
		assert!((cx - 220.0).abs() < 1e-9 && (cy - 150.0).abs() < 1e-9);
	}

	#[test]
	fn fit_ignores_empty_bounds() {
		let mut t = ViewTransform::centered(100.0, 100.0);
		t.fit(&Bounds::empty(), 100.0, 100.0, 10.0);
		assert_eq!(t, ViewTransform::centered(100.0, 100.0));
	}

	proptest! {
		#[test]
		fn scale_never_leaves_bounds(k in prop::num::f64::ANY, factor in 0.0..100.0f64) {
			let mut t = ViewTransform::default();
			t.set_scale(k);
			prop_assert!((MIN_ZOOM..=MAX_ZOOM).contains(&t.k));
			t.zoom_at(factor, 10.0, 10.0);
			prop_assert!((MIN_ZOOM..=MAX_ZOOM).contains(&t.k));
		}
	}
}
