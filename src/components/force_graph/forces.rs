//! Pluggable forces applied by the simulation each tick.
//!
//! Every force reads current positions and adds to node velocities (the
//! centering force shifts positions directly). Pinned nodes take part in
//! every calculation; the integrator is what keeps them in place. The one
//! exception is centering, which stands down on any axis a node is pinned on.

use std::rc::Rc;

use super::quadtree::{self, QuadNode};
use super::simulation::{SimLink, SimNode};

/// A force composed additively into each tick.
pub trait Force {
	/// Called whenever the node or link set changes.
	fn initialize(&mut self, _nodes: &[SimNode], _links: &[SimLink]) {}

	/// Adds this force's contribution at temperature `alpha`.
	fn apply(&mut self, nodes: &mut [SimNode], links: &[SimLink], alpha: f64);
}

/// Tiny deterministic offset for coincident points, so no direction is NaN.
fn jiggle(a: usize, b: usize) -> (f64, f64) {
	let angle = ((a as f64) * 0.618_034 + (b as f64) * 0.414_214 + 0.37).fract()
		* std::f64::consts::TAU;
	(angle.cos() * 1e-6, angle.sin() * 1e-6)
}

fn finite(node: &SimNode) -> bool {
	node.x.is_finite() && node.y.is_finite()
}

/// Spring along each link toward a rest distance.
///
/// Without an explicit strength, each link gets `1 / min(degree)` of its
/// endpoints, and the correction is split by relative degree so hubs move
/// less than leaves.
pub struct LinkForce {
	distance: f64,
	strength: Option<f64>,
	iterations: usize,
	strengths: Vec<f64>,
	bias: Vec<f64>,
}

impl LinkForce {
	/// Springs of rest length `distance`. `None` strength uses the degree-aware default.
	pub fn new(distance: f64, strength: Option<f64>) -> Self {
		Self {
			distance,
			strength,
			iterations: 1,
			strengths: Vec::new(),
			bias: Vec::new(),
		}
	}

	/// Rest length of every link.
	pub fn distance(&self) -> f64 {
		self.distance
	}
}

impl Force for LinkForce {
	fn initialize(&mut self, nodes: &[SimNode], links: &[SimLink]) {
		let mut degree = vec![0usize; nodes.len()];
		for link in links {
			if let Some(d) = degree.get_mut(link.source) {
				*d += 1;
			}
			if let Some(d) = degree.get_mut(link.target) {
				*d += 1;
			}
		}

		self.bias = links
			.iter()
			.map(|link| {
				let s = degree.get(link.source).copied().unwrap_or(1) as f64;
				let t = degree.get(link.target).copied().unwrap_or(1) as f64;
				s / (s + t).max(1.0)
			})
			.collect();
		self.strengths = links
			.iter()
			.map(|link| {
				self.strength.unwrap_or_else(|| {
					let s = degree.get(link.source).copied().unwrap_or(1);
					let t = degree.get(link.target).copied().unwrap_or(1);
					1.0 / s.min(t).max(1) as f64
				})
			})
			.collect();
	}

	fn apply(&mut self, nodes: &mut [SimNode], links: &[SimLink], alpha: f64) {
		for _ in 0..self.iterations {
			for (i, link) in links.iter().enumerate() {
				let (s, t) = (link.source, link.target);
				if s == t {
					continue;
				}
				let (Some(source), Some(target)) = (nodes.get(s), nodes.get(t)) else {
					continue;
				};
				if !finite(source) || !finite(target) {
					continue;
				}

				let mut dx = target.x + target.vx - source.x - source.vx;
				let mut dy = target.y + target.vy - source.y - source.vy;
				if dx == 0.0 && dy == 0.0 {
					(dx, dy) = jiggle(s, t);
				}
				let l = (dx * dx + dy * dy).sqrt();
				let strength = self.strengths.get(i).copied().unwrap_or(1.0);
				let k = (l - self.distance) / l * alpha * strength;
				let (dx, dy) = (dx * k, dy * k);
				let b = self.bias.get(i).copied().unwrap_or(0.5);

				nodes[t].vx -= dx * b;
				nodes[t].vy -= dy * b;
				nodes[s].vx += dx * (1.0 - b);
				nodes[s].vy += dy * (1.0 - b);
			}
		}
	}
}

/// Charge between every pair of nodes; negative strength repels.
///
/// Exact pairwise below `approximate_above` nodes, Barnes-Hut above it.
pub struct ManyBodyForce {
	strength: f64,
	theta: f64,
	approximate_above: usize,
	distance_min2: f64,
	distance_max2: f64,
}

impl ManyBodyForce {
	/// Charge of `strength` per node; switches to Barnes-Hut with `theta` above `approximate_above` nodes.
	pub fn new(strength: f64, theta: f64, approximate_above: usize) -> Self {
		Self {
			strength,
			theta,
			approximate_above,
			distance_min2: 1.0,
			distance_max2: f64::INFINITY,
		}
	}

	fn apply_exact(&self, nodes: &mut [SimNode], alpha: f64) {
		let n = nodes.len();
		let weight = self.strength * alpha;
		for i in 0..n {
			if !finite(&nodes[i]) {
				continue;
			}
			for j in (i + 1)..n {
				if !finite(&nodes[j]) {
					continue;
				}
				let mut dx = nodes[j].x - nodes[i].x;
				let mut dy = nodes[j].y - nodes[i].y;
				let mut l = dx * dx + dy * dy;
				if l >= self.distance_max2 {
					continue;
				}
				if l == 0.0 {
					(dx, dy) = jiggle(i, j);
					l = dx * dx + dy * dy;
				}
				let l = quadtree::soften(l, self.distance_min2);
				let (fx, fy) = (dx * weight / l, dy * weight / l);
				nodes[i].vx += fx;
				nodes[i].vy += fy;
				nodes[j].vx -= fx;
				nodes[j].vy -= fy;
			}
		}
	}

	fn apply_approximate(&self, nodes: &mut [SimNode], alpha: f64) {
		let points: Vec<(f64, f64)> = nodes.iter().map(|n| (n.x, n.y)).collect();
		let Some(tree) = QuadNode::build(&points) else {
			return;
		};
		let weight = self.strength * alpha;
		for (i, node) in nodes.iter_mut().enumerate() {
			if !finite(node) {
				continue;
			}
			let mut delta = (0.0, 0.0);
			tree.accumulate(i, &points, weight, self.theta, self.distance_min2, &mut delta);
			node.vx += delta.0;
			node.vy += delta.1;
		}
	}
}

impl Force for ManyBodyForce {
	fn apply(&mut self, nodes: &mut [SimNode], _links: &[SimLink], alpha: f64) {
		if nodes.len() >= self.approximate_above && self.theta > 0.0 {
			self.apply_approximate(nodes, alpha);
		} else {
			self.apply_exact(nodes, alpha);
		}
	}
}

/// Shifts the whole layout so its centroid moves toward a fixed point.
///
/// A pinned node already anchors the layout, so an axis with any pinned
/// node is left alone. Shifting only the free nodes would fling them away
/// from the pin.
pub struct CenterForce {
	x: f64,
	y: f64,
	strength: f64,
}

impl CenterForce {
	/// Pulls the centroid toward `(x, y)`; `strength` 1 moves it all the way
	/// each tick.
	pub fn new(x: f64, y: f64, strength: f64) -> Self {
		Self { x, y, strength }
	}
}

impl Force for CenterForce {
	fn apply(&mut self, nodes: &mut [SimNode], _links: &[SimLink], _alpha: f64) {
		let hold_x = nodes.iter().any(|n| n.fx.is_some());
		let hold_y = nodes.iter().any(|n| n.fy.is_some());
		if hold_x && hold_y {
			return;
		}

		let (mut sx, mut sy, mut count) = (0.0, 0.0, 0usize);
		for node in nodes.iter().filter(|n| finite(n)) {
			sx += node.x;
			sy += node.y;
			count += 1;
		}
		if count == 0 {
			return;
		}

		let shift_x = if hold_x { 0.0 } else { (sx / count as f64 - self.x) * self.strength };
		let shift_y = if hold_y { 0.0 } else { (sy / count as f64 - self.y) * self.strength };
		for node in nodes.iter_mut().filter(|n| finite(n)) {
			node.x -= shift_x;
			node.y -= shift_y;
		}
	}
}

/// Per-node radius used by the collision force.
pub type RadiusFn = Rc<dyn Fn(&SimNode) -> f64>;

/// Pushes overlapping nodes apart until their circles no longer intersect.
pub struct CollideForce {
	radius: RadiusFn,
	strength: f64,
	iterations: usize,
	radii: Vec<f64>,
}

impl CollideForce {
	/// Collision with a per-node radius.
	pub fn new(radius: RadiusFn, strength: f64) -> Self {
		Self {
			radius,
			strength,
			iterations: 1,
			radii: Vec::new(),
		}
	}

	/// Collision with the same radius for every node.
	pub fn constant(radius: f64, strength: f64) -> Self {
		Self::new(Rc::new(move |_: &SimNode| radius), strength)
	}
}

impl Force for CollideForce {
	fn initialize(&mut self, nodes: &[SimNode], _links: &[SimLink]) {
		self.radii = nodes.iter().map(|n| (self.radius)(n).max(0.0)).collect();
	}

	fn apply(&mut self, nodes: &mut [SimNode], _links: &[SimLink], _alpha: f64) {
		if self.radii.len() != nodes.len() {
			self.radii = nodes.iter().map(|n| (self.radius)(n).max(0.0)).collect();
		}
		let n = nodes.len();
		for _ in 0..self.iterations {
			for i in 0..n {
				if !finite(&nodes[i]) {
					continue;
				}
				let ri = self.radii[i];
				for j in (i + 1)..n {
					if !finite(&nodes[j]) {
						continue;
					}
					let rj = self.radii[j];
					let r = ri + rj;
					let mut dx = (nodes[i].x + nodes[i].vx) - (nodes[j].x + nodes[j].vx);
					let mut dy = (nodes[i].y + nodes[i].vy) - (nodes[j].y + nodes[j].vy);
					if dx.abs() >= r || dy.abs() >= r {
						continue;
					}
					let mut l = dx * dx + dy * dy;
					if l >= r * r {
						continue;
					}
					if l == 0.0 {
						(dx, dy) = jiggle(i, j);
						l = dx * dx + dy * dy;
					}
					let l = l.sqrt();
					let k = (r - l) / l * self.strength;
					let (dx, dy) = (dx * k, dy * k);
					let (ri2, rj2) = (ri * ri, rj * rj);
					let share = if ri2 + rj2 > 0.0 { rj2 / (ri2 + rj2) } else { 0.5 };

					nodes[i].vx += dx * share;
					nodes[i].vy += dy * share;
					nodes[j].vx -= dx * (1.0 - share);
					nodes[j].vy -= dy * (1.0 - share);
				}
			}
		}
	}
}
