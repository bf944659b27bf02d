//! Hit-testing in world coordinates.
//!
//! Callers convert the pointer with `ViewTransform::screen_to_world` and
//! pass screen-pixel thresholds divided by the zoom factor.

use super::simulation::{NodeIndex, SimLink, SimNode};

/// Squared Euclidean distance.
pub fn distance_sq((ax, ay): (f64, f64), (bx, by): (f64, f64)) -> f64 {
	let (dx, dy) = (bx - ax, by - ay);
	dx * dx + dy * dy
}

/// Inclusive: a point on the rim is inside.
pub fn point_in_circle(point: (f64, f64), center: (f64, f64), radius: f64) -> bool {
	distance_sq(point, center) <= radius * radius
}

/// Distance from `p` to the segment `a`-`b`, projecting and clamping to the
/// segment's parameter range.
pub fn segment_distance(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
	let (dx, dy) = (b.0 - a.0, b.1 - a.1);
	let len_sq = dx * dx + dy * dy;
	if len_sq == 0.0 {
		return distance_sq(p, a).sqrt();
	}
	let t = (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len_sq).clamp(0.0, 1.0);
	distance_sq(p, (a.0 + t * dx, a.1 + t * dy)).sqrt()
}

/// First node, in collection order, whose circle contains `point`.
///
/// Nodes without a usable position are skipped.
pub fn node_at(
	nodes: &[SimNode],
	point: (f64, f64),
	radius_of: impl Fn(&SimNode) -> f64,
) -> Option<NodeIndex> {
	nodes.iter().position(|node| {
		node.position()
			.is_some_and(|center| point_in_circle(point, center, radius_of(node)))
	})
}

/// Nearest link within `threshold` of `point`. Ties go to the earlier link.
pub fn link_at(
	links: &[SimLink],
	nodes: &[SimNode],
	point: (f64, f64),
	threshold: f64,
) -> Option<usize> {
	let mut best: Option<(usize, f64)> = None;
	for (i, link) in links.iter().enumerate() {
		let (Some(a), Some(b)) = (
			nodes.get(link.source).and_then(SimNode::position),
			nodes.get(link.target).and_then(SimNode::position),
		) else {
			continue;
		};
		let d = segment_distance(point, a, b);
		if d <= threshold && best.is_none_or(|(_, nearest)| d < nearest) {
			best = Some((i, d));
		}
	}
	best.map(|(i, _)| i)
}
