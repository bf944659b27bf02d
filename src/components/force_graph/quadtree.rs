//! Barnes-Hut quadtree for approximating pairwise repulsion.

const LEAF_CAPACITY: usize = 8;
const MAX_DEPTH: usize = 12;

/// Squared distance used for the charge between two points, softened below
/// `distance_min2` so near-coincident pairs don't blow up.
pub(super) fn soften(l: f64, distance_min2: f64) -> f64 {
	if l < distance_min2 {
		(distance_min2 * l).sqrt()
	} else {
		l
	}
}

#[derive(Clone, Copy, Debug)]
struct Bounds {
	cx: f64,
	cy: f64,
	half: f64,
}

impl Bounds {
	fn around(points: &[(f64, f64)], indices: &[usize]) -> Option<Self> {
		let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
		let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
		for &i in indices {
			let (x, y) = points[i];
			min_x = min_x.min(x);
			min_y = min_y.min(y);
			max_x = max_x.max(x);
			max_y = max_y.max(y);
		}
		if !(min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite()) {
			return None;
		}

		let span = (max_x - min_x).max(max_y - min_y).max(1.0);
		Some(Self {
			cx: (min_x + max_x) * 0.5,
			cy: (min_y + max_y) * 0.5,
			half: span * 0.5 + 1.0,
		})
	}

	fn contains(self, (x, y): (f64, f64)) -> bool {
		(x - self.cx).abs() <= self.half && (y - self.cy).abs() <= self.half
	}

	fn quadrant(self, (x, y): (f64, f64)) -> usize {
		match (x >= self.cx, y >= self.cy) {
			(false, false) => 0,
			(true, false) => 1,
			(false, true) => 2,
			(true, true) => 3,
		}
	}

	fn child(self, quadrant: usize) -> Self {
		let q = self.half * 0.5;
		let (ox, oy) = match quadrant {
			0 => (-q, -q),
			1 => (q, -q),
			2 => (-q, q),
			_ => (q, q),
		};
		Self {
			cx: self.cx + ox,
			cy: self.cy + oy,
			half: q,
		}
	}
}

/// One cell of the tree. Leaves keep their point indices; inner cells only
/// keep aggregate mass and center of mass.
pub(super) struct QuadNode {
	bounds: Bounds,
	com: (f64, f64),
	mass: f64,
	indices: Vec<usize>,
	children: [Option<Box<QuadNode>>; 4],
}

impl QuadNode {
	/// Builds a tree over the finite points in `points`.
	pub(super) fn build(points: &[(f64, f64)]) -> Option<Self> {
		let indices: Vec<usize> = (0..points.len())
			.filter(|&i| points[i].0.is_finite() && points[i].1.is_finite())
			.collect();
		let bounds = Bounds::around(points, &indices)?;
		Some(Self::build_cell(bounds, indices, points, 0))
	}

	fn build_cell(bounds: Bounds, indices: Vec<usize>, points: &[(f64, f64)], depth: usize) -> Self {
		let mass = indices.len() as f64;
		let (mut sx, mut sy) = (0.0, 0.0);
		for &i in &indices {
			sx += points[i].0;
			sy += points[i].1;
		}
		let com = if mass > 0.0 {
			(sx / mass, sy / mass)
		} else {
			(bounds.cx, bounds.cy)
		};

		let mut cell = Self {
			bounds,
			com,
			mass,
			indices,
			children: std::array::from_fn(|_| None),
		};
		if depth >= MAX_DEPTH || cell.indices.len() <= LEAF_CAPACITY {
			return cell;
		}

		let mut buckets: [Vec<usize>; 4] = std::array::from_fn(|_| Vec::new());
		for &i in &cell.indices {
			buckets[bounds.quadrant(points[i])].push(i);
		}
		// Coincident points: splitting further would never separate them.
		if buckets.iter().filter(|b| !b.is_empty()).count() <= 1 {
			return cell;
		}

		for (quadrant, bucket) in buckets.into_iter().enumerate() {
			if !bucket.is_empty() {
				cell.children[quadrant] = Some(Box::new(Self::build_cell(
					bounds.child(quadrant),
					bucket,
					points,
					depth + 1,
				)));
			}
		}
		cell.indices.clear();
		cell
	}

	fn is_leaf(&self) -> bool {
		self.children.iter().all(Option::is_none)
	}

	/// Accumulates the charge felt by point `index` into `out`.
	///
	/// `weight` is `strength * alpha`; `distance_min2` softens near-coincident
	/// pairs the same way the exact pairwise path does.
	pub(super) fn accumulate(
		&self,
		index: usize,
		points: &[(f64, f64)],
		weight: f64,
		theta: f64,
		distance_min2: f64,
		out: &mut (f64, f64),
	) {
		if self.mass <= 0.0 {
			return;
		}
		let point = points[index];

		if self.is_leaf() {
			for &other in &self.indices {
				if other == index {
					continue;
				}
				let (dx, dy) = (points[other].0 - point.0, points[other].1 - point.1);
				let l = dx * dx + dy * dy;
				if l == 0.0 {
					continue;
				}
				let l = soften(l, distance_min2);
				out.0 += dx * weight / l;
				out.1 += dy * weight / l;
			}
			return;
		}

		let (dx, dy) = (self.com.0 - point.0, self.com.1 - point.1);
		let l = dx * dx + dy * dy;
		let far_enough = !self.bounds.contains(point)
			&& (self.bounds.half * 2.0) * (self.bounds.half * 2.0) < theta * theta * l;
		if far_enough && l > 0.0 {
			let l = soften(l, distance_min2);
			out.0 += dx * weight * self.mass / l;
			out.1 += dy * weight * self.mass / l;
			return;
		}

		for child in self.children.iter().flatten() {
			child.accumulate(index, points, weight, theta, distance_min2, out);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_or_non_finite_input_builds_nothing() {
		assert!(QuadNode::build(&[]).is_none());
		assert!(QuadNode::build(&[(f64::NAN, 0.0)]).is_none());
	}

	#[test]
	fn mass_counts_only_finite_points() {
		let points = [(0.0, 0.0), (f64::NAN, 1.0), (10.0, 10.0)];
		let tree = QuadNode::build(&points).unwrap();
		assert_eq!(tree.mass, 2.0);
		assert_eq!(tree.com, (5.0, 5.0));
	}

	#[test]
	fn far_cells_soften_like_single_points() {
		let points = [(0.5, 0.0), (0.0, 0.0), (0.0, 0.0)];
		let bounds = Bounds {
			cx: 0.0,
			cy: 0.0,
			half: 0.1,
		};
		let leaf = QuadNode {
			bounds: bounds.child(3),
			com: (0.0, 0.0),
			mass: 2.0,
			indices: vec![1, 2],
			children: std::array::from_fn(|_| None),
		};
		let mut children: [Option<Box<QuadNode>>; 4] = std::array::from_fn(|_| None);
		children[3] = Some(Box::new(leaf));
		let cell = QuadNode {
			bounds,
			com: (0.0, 0.0),
			mass: 2.0,
			indices: Vec::new(),
			children,
		};

		let mut far = (0.0, 0.0);
		cell.accumulate(0, &points, -1.0, 1.0, 1.0, &mut far);
		// Two unit charges 0.5 away, softened to sqrt(1 * 0.25).
		assert!((far.0 - 2.0).abs() < 1e-12, "{far:?}");

		let mut exact = (0.0, 0.0);
		cell.accumulate(0, &points, -1.0, 0.0, 1.0, &mut exact);
		assert!((far.0 - exact.0).abs() < 1e-12);
		assert_eq!(soften(4.0, 1.0), 4.0);
	}

	#[test]
	fn splits_past_leaf_capacity() {
		let points: Vec<(f64, f64)> = (0..40).map(|i| ((i % 7) as f64 * 13.0, (i / 7) as f64 * 9.0)).collect();
		let tree = QuadNode::build(&points).unwrap();
		assert!(!tree.is_leaf());
		assert!(tree.indices.is_empty());
	}
}
