//! Smooth hover highlighting.

use std::collections::{HashMap, HashSet};

use super::simulation::{NodeIndex, SimLink};

/// Minimum time (seconds) a highlight must be held before it can fade out.
/// This prevents flashing when the pointer briefly skirts a hover zone.
const MIN_HOLD_TIME: f64 = 0.12;

/// Intensities below this are dropped.
const VISIBLE: f64 = 0.005;

/// What the pointer is over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HoverTarget {
	/// Index into the live node set.
	Node(NodeIndex),
	/// Index into the live link set.
	Link(usize),
}

/// Per-node highlight intensity with exponential smoothing.
///
/// Each node has its own intensity (0.0 to 1.0) that animates towards 1.0
/// while it is in the active set (hovered node plus neighbours, or hovered
/// link plus endpoints) and back to 0.0 after a short hold once it leaves.
#[derive(Clone, Debug, Default)]
pub struct HighlightState {
	target: Option<HoverTarget>,
	target_set: HashSet<NodeIndex>,
	node_intensity: HashMap<NodeIndex, f64>,
	/// Tracks the hovered node only, for the ring.
	ring_intensity: HashMap<NodeIndex, f64>,
	hold_timer: HashMap<NodeIndex, f64>,
	cached_max: f64,
}

impl HighlightState {
	/// Current hover target.
	pub fn target(&self) -> Option<HoverTarget> {
		self.target
	}

	/// Updates the hover target and recomputes the highlight set.
	pub fn set_target(&mut self, target: Option<HoverTarget>, links: &[SimLink]) {
		if self.target == target {
			return;
		}
		self.target = target;
		self.target_set.clear();

		match target {
			Some(HoverTarget::Node(idx)) => {
				self.target_set.insert(idx);
				for link in links {
					if link.source == idx {
						self.target_set.insert(link.target);
					} else if link.target == idx {
						self.target_set.insert(link.source);
					}
				}
			}
			Some(HoverTarget::Link(i)) => {
				if let Some(link) = links.get(i) {
					self.target_set.insert(link.source);
					self.target_set.insert(link.target);
				}
			}
			None => {}
		}

		for &idx in &self.target_set {
			self.hold_timer.insert(idx, MIN_HOLD_TIME);
		}
	}

	/// Forgets everything. Node indices are invalid after reconciliation.
	pub fn reset(&mut self) {
		*self = Self::default();
	}

	/// Animates intensities towards their targets.
	///
	/// value += (target - value) * (1 - e^(-speed * dt))
	pub fn tick(&mut self, dt: f64) {
		const FADE_IN_SPEED: f64 = 6.0; // ~150ms to 95%
		const FADE_OUT_SPEED: f64 = 4.0; // ~250ms to 95%

		let fade_in_factor = 1.0 - (-FADE_IN_SPEED * dt).exp();
		let fade_out_decay = (-FADE_OUT_SPEED * dt).exp();

		for &idx in &self.target_set {
			let intensity = self.node_intensity.entry(idx).or_insert(0.0);
			*intensity += (1.0 - *intensity) * fade_in_factor;
		}
		let hovered = match self.target {
			Some(HoverTarget::Node(idx)) => Some(idx),
			_ => None,
		};
		if let Some(idx) = hovered {
			let intensity = self.ring_intensity.entry(idx).or_insert(0.0);
			*intensity += (1.0 - *intensity) * fade_in_factor;
		}

		let target_set = &self.target_set;
		self.hold_timer.retain(|idx, timer| {
			if target_set.contains(idx) {
				true
			} else {
				*timer -= dt;
				*timer > 0.0
			}
		});

		let hold = &self.hold_timer;
		let held = |idx: &NodeIndex| hold.get(idx).copied().unwrap_or(0.0) > 0.0;
		let mut new_max: f64 = 0.0;
		self.node_intensity.retain(|idx, intensity| {
			if !target_set.contains(idx) && !held(idx) {
				*intensity *= fade_out_decay;
			}
			new_max = new_max.max(*intensity);
			*intensity > VISIBLE
		});
		self.ring_intensity.retain(|idx, intensity| {
			if hovered != Some(*idx) && !held(idx) {
				*intensity *= fade_out_decay;
			}
			*intensity > VISIBLE
		});

		self.cached_max = new_max;
	}

	/// Smoothed highlight of a node, 0 when it is not highlighted.
	pub fn node_intensity(&self, idx: NodeIndex) -> f64 {
		self.node_intensity.get(&idx).copied().unwrap_or(0.0)
	}

	/// Smoothed hover ring intensity.
	pub fn ring_intensity(&self, idx: NodeIndex) -> f64 {
		self.ring_intensity.get(&idx).copied().unwrap_or(0.0)
	}

	/// Geometric mean of the endpoint intensities.
	pub fn link_intensity(&self, link: &SimLink) -> f64 {
		(self.node_intensity(link.source) * self.node_intensity(link.target)).sqrt()
	}

	/// Largest node intensity; drives dimming of everything else.
	pub fn max_intensity(&self) -> f64 {
		self.cached_max
	}
}
