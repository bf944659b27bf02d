//! Zoom-dependent sizing for graph visuals.
//!
//! # Coordinate Spaces
//!
//! - **World-space**: the simulation's coordinate system. Values scale with
//!   zoom (appear larger when zoomed in).
//! - **Screen-space**: canvas pixels. Values stay constant regardless of zoom.
//!
//! Everything here returns world-space values, ready to use after the canvas
//! transform has been applied. Hit-testing uses the same values, so what is
//! drawn is what is clickable.

/// Defines how a visual extent scales with zoom level.
#[derive(Clone, Debug, PartialEq)]
pub enum ScaleBehavior {
	/// Constant world-space size. Appears larger when zoomed in.
	World,
	/// Constant screen-space size (pixels). Divides by `k`.
	Screen,
	/// World-space scaling, clamped to min/max screen-space bounds.
	Clamped {
		/// Smallest on-screen size in pixels.
		min_screen: f64,
		/// Largest on-screen size in pixels.
		max_screen: f64,
	},
}

impl ScaleBehavior {
	/// World-space value for a base value at zoom `k`.
	pub fn apply(&self, base: f64, k: f64) -> f64 {
		match self {
			ScaleBehavior::World => base,
			ScaleBehavior::Screen => base / k,
			ScaleBehavior::Clamped {
				min_screen,
				max_screen,
			} => {
				// screen_size = world_size * k
				base.clamp(min_screen / k, max_screen / k)
			}
		}
	}
}

/// Zoom behavior for every sized element of the graph.
#[derive(Clone, Debug, PartialEq)]
pub struct ScaleConfig {
	/// Applied to the resolved node size.
	pub node_radius: ScaleBehavior,
	/// Applied to the resolved link width.
	pub link_width: ScaleBehavior,
	/// Applied to the resolved arrow length.
	pub arrow_length: ScaleBehavior,
	/// Link hover distance in screen pixels.
	pub link_hover_px: f64,
	/// Hover ring stroke width in screen pixels.
	pub ring_width: f64,
	/// Hover ring gap from the node edge in screen pixels.
	pub ring_offset: f64,
}

impl Default for ScaleConfig {
	fn default() -> Self {
		Self {
			node_radius: ScaleBehavior::World,
			link_width: ScaleBehavior::Screen,
			arrow_length: ScaleBehavior::Clamped {
				min_screen: 0.0,
				max_screen: 24.0,
			},
			link_hover_px: 4.0,
			ring_width: 1.5,
			ring_offset: 2.0,
		}
	}
}

/// Scale values for one zoom level.
///
/// Create this once per frame and pass it to rendering and hit-testing.
#[derive(Clone, Debug)]
pub struct ScaledValues<'a> {
	config: &'a ScaleConfig,
	/// Current zoom level.
	pub k: f64,
	/// Link hover threshold in world units.
	pub link_hover: f64,
	/// Hover ring width in world units.
	pub ring_width: f64,
	/// Gap between node and ring in world units.
	pub ring_offset: f64,
}

impl<'a> ScaledValues<'a> {
	/// Values for zoom `k`.
	pub fn new(config: &'a ScaleConfig, k: f64) -> Self {
		Self {
			config,
			k,
			link_hover: config.link_hover_px / k,
			ring_width: config.ring_width / k,
			ring_offset: config.ring_offset / k,
		}
	}

	/// Node radius in world units.
	pub fn node_radius(&self, size: f64) -> f64 {
		self.config.node_radius.apply(size, self.k)
	}

	/// Link width in world units.
	pub fn link_width(&self, width: f64) -> f64 {
		self.config.link_width.apply(width, self.k)
	}

	/// Arrow length in world units.
	pub fn arrow_length(&self, length: f64) -> f64 {
		self.config.arrow_length.apply(length, self.k)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn behaviors() {
		assert_eq!(ScaleBehavior::World.apply(4.0, 2.0), 4.0);
		assert_eq!(ScaleBehavior::Screen.apply(4.0, 2.0), 2.0);

		let clamped = ScaleBehavior::Clamped {
			min_screen: 2.0,
			max_screen: 10.0,
		};
		assert_eq!(clamped.apply(4.0, 1.0), 4.0);
		assert_eq!(clamped.apply(4.0, 0.25), 8.0);
		assert_eq!(clamped.apply(4.0, 5.0), 2.0);
	}

	#[test]
	fn screen_extents_shrink_with_zoom() {
		let config = ScaleConfig::default();
		let scaled = ScaledValues::new(&config, 4.0);
		assert_eq!(scaled.link_hover, 1.0);
		assert_eq!(scaled.link_width(2.0), 0.5);
		assert_eq!(scaled.node_radius(6.0), 6.0);
	}
}
