//! Force-directed layout engine.
//!
//! The simulation owns the live node and link sets. Everything else reads
//! them through `&` accessors; the only outside writes are drag pinning and
//! reconciliation, both of which go through methods here.

use std::collections::HashMap;
use std::rc::Rc;

use log::debug;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::Deserialize;

use super::forces::{CenterForce, CollideForce, Force, LinkForce, ManyBodyForce};
use super::reconcile::{self, LinkDeriver, ReconcileReport};
use super::types::{GraphData, LinkKey, Payload};

/// Position of a node in the live node set. Stable until the next
/// reconciliation.
pub type NodeIndex = usize;

/// Radius used for collisions when nothing else is configured.
pub const DEFAULT_NODE_RADIUS: f64 = 4.0;

/// A node in the simulation: identity, payload and physics state.
#[derive(Clone, Debug, PartialEq)]
pub struct SimNode {
	/// Stable identity across updates.
	pub id: String,
	/// Record fields other than the id.
	pub payload: Payload,
	/// Position in world units.
	pub x: f64,
	/// Vertical counterpart of `x`.
	pub y: f64,
	/// Velocity, applied and decayed each tick.
	pub vx: f64,
	/// Vertical counterpart of `vx`.
	pub vy: f64,
	/// Pinned x coordinate; the integrator holds `x` here while set.
	pub fx: Option<f64>,
	/// Pinned y coordinate.
	pub fy: Option<f64>,
}

impl SimNode {
	/// Unpinned node at rest at `(x, y)`.
	pub fn new(id: String, payload: Payload, x: f64, y: f64) -> Self {
		Self {
			id,
			payload,
			x,
			y,
			vx: 0.0,
			vy: 0.0,
			fx: None,
			fy: None,
		}
	}

	/// Current position, or `None` while it is not a usable number.
	pub fn position(&self) -> Option<(f64, f64)> {
		(self.x.is_finite() && self.y.is_finite()).then_some((self.x, self.y))
	}

	/// Pinned on either axis.
	pub fn is_pinned(&self) -> bool {
		self.fx.is_some() || self.fy.is_some()
	}

	/// Payload field as a string, if present and textual.
	pub fn text(&self, key: &str) -> Option<&str> {
		self.payload.get(key).and_then(|v| v.as_str())
	}
}

/// A link with both endpoints resolved to node indices.
#[derive(Clone, Debug, PartialEq)]
pub struct SimLink {
	/// Identity of the link across updates.
	pub key: LinkKey,
	/// Index of the source node.
	pub source: NodeIndex,
	/// Index of the target node.
	pub target: NodeIndex,
	/// Record fields other than the endpoints and kind.
	pub payload: Payload,
}

/// Simulation tuning. Every field has a default, so partial JSON works.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
	/// Simulation settles once alpha drops below this.
	pub alpha_min: f64,
	/// Fraction of the remaining distance to `alpha_target` covered per tick.
	pub alpha_decay: f64,
	/// Alpha settles toward this value.
	pub alpha_target: f64,
	/// Alpha target held while a node is dragged.
	pub drag_alpha_target: f64,
	/// Fraction of velocity lost per tick.
	pub velocity_decay: f64,
	/// Rest length of links.
	pub link_distance: f64,
	/// Fixed link stiffness; `None` uses the degree-aware default.
	pub link_strength: Option<f64>,
	/// Many-body strength; negative values repel.
	pub charge: f64,
	/// Barnes-Hut opening angle; smaller is more exact.
	pub barnes_hut_theta: f64,
	/// Node count at which repulsion switches to the quadtree approximation.
	pub barnes_hut_threshold: usize,
	/// Point the centroid is pulled toward.
	pub center_x: f64,
	/// Vertical counterpart of `center_x`.
	pub center_y: f64,
	/// 1 recenters fully every tick.
	pub center_strength: f64,
	/// Strength of the collision push; 1 separates overlaps in one tick.
	pub collide_strength: f64,
	/// Fixed collision radius; `None` uses the rendered node radius.
	pub collide_radius: Option<f64>,
	/// Ticks run synchronously before the first frame.
	pub warmup_ticks: usize,
	/// Stop after this many ticks since the last (re)start.
	pub cooldown_ticks: Option<usize>,
	/// Upper bound on ticks run per animation frame.
	pub max_ticks_per_frame: usize,
	/// Seed for initial placement jitter. `None` is non-deterministic.
	pub seed: Option<u64>,
}

impl Default for SimulationConfig {
	fn default() -> Self {
		Self {
			alpha_min: 0.001,
			alpha_decay: 1.0 - 0.001_f64.powf(1.0 / 300.0),
			alpha_target: 0.0,
			drag_alpha_target: 0.3,
			velocity_decay: 0.4,
			link_distance: 30.0,
			link_strength: None,
			charge: -30.0,
			barnes_hut_theta: 0.9,
			barnes_hut_threshold: 512,
			center_x: 0.0,
			center_y: 0.0,
			center_strength: 1.0,
			collide_strength: 1.0,
			collide_radius: None,
			warmup_ticks: 0,
			cooldown_ticks: None,
			max_ticks_per_frame: 1,
			seed: None,
		}
	}
}

/// The live node and link sets fed to the integrator.
#[derive(Clone, Debug, Default)]
pub struct SimulationState {
	pub(super) nodes: Vec<SimNode>,
	pub(super) links: Vec<SimLink>,
	pub(super) index: HashMap<String, NodeIndex>,
}

impl SimulationState {
	/// Live nodes.
	pub fn nodes(&self) -> &[SimNode] {
		&self.nodes
	}

	/// Live links.
	pub fn links(&self) -> &[SimLink] {
		&self.links
	}

	/// Index of the node with this id.
	pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
		self.index.get(id).copied()
	}

	pub(super) fn rebuild_index(&mut self) {
		self.index = self
			.nodes
			.iter()
			.enumerate()
			.map(|(i, n)| (n.id.clone(), i))
			.collect();
	}

	/// Mean position of all positioned nodes.
	pub fn centroid(&self) -> Option<(f64, f64)> {
		let (mut sx, mut sy, mut count) = (0.0, 0.0, 0usize);
		for (x, y) in self.nodes.iter().filter_map(SimNode::position) {
			sx += x;
			sy += y;
			count += 1;
		}
		(count > 0).then(|| (sx / count as f64, sy / count as f64))
	}
}

/// Work done by one animation frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
	/// Ticks run.
	pub ticks: usize,
	/// The simulation went from running to settled during this frame.
	pub settled: bool,
}

/// Force simulation over a persistent node/link set.
pub struct Simulation {
	state: SimulationState,
	forces: Vec<(String, Box<dyn Force>)>,
	config: SimulationConfig,
	alpha: f64,
	alpha_target: f64,
	ticks: usize,
	stopped: bool,
	rng: SmallRng,
}

impl Simulation {
	/// Empty simulation with the default link, charge, center and collide forces.
	pub fn new(config: SimulationConfig) -> Self {
		let collide_radius = config.collide_radius.unwrap_or(DEFAULT_NODE_RADIUS);
		let forces: Vec<(String, Box<dyn Force>)> = vec![
			(
				"link".to_string(),
				Box::new(LinkForce::new(config.link_distance, config.link_strength)),
			),
			(
				"charge".to_string(),
				Box::new(ManyBodyForce::new(
					config.charge,
					config.barnes_hut_theta,
					config.barnes_hut_threshold,
				)),
			),
			(
				"center".to_string(),
				Box::new(CenterForce::new(
					config.center_x,
					config.center_y,
					config.center_strength,
				)),
			),
			(
				"collide".to_string(),
				Box::new(CollideForce::constant(collide_radius, config.collide_strength)),
			),
		];

		Self {
			state: SimulationState::default(),
			forces,
			alpha: 1.0,
			alpha_target: config.alpha_target,
			ticks: 0,
			stopped: false,
			rng: SmallRng::seed_from_u64(config.seed.unwrap_or_else(entropy)),
			config,
		}
	}

	/// Configuration the simulation was built with.
	pub fn config(&self) -> &SimulationConfig {
		&self.config
	}

	/// Live node and link sets.
	pub fn state(&self) -> &SimulationState {
		&self.state
	}

	/// Live nodes, indexed by `NodeIndex`.
	pub fn nodes(&self) -> &[SimNode] {
		&self.state.nodes
	}

	/// Live links; endpoints always index into `nodes`.
	pub fn links(&self) -> &[SimLink] {
		&self.state.links
	}

	/// Node at `index`, if live.
	pub fn node(&self, index: NodeIndex) -> Option<&SimNode> {
		self.state.nodes.get(index)
	}

	/// Index of the node with this id.
	pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
		self.state.index_of(id)
	}

	/// Node with this id, if live.
	pub fn node_by_id(&self, id: &str) -> Option<&SimNode> {
		self.index_of(id).and_then(|i| self.node(i))
	}

	/// Link with this key, if live.
	pub fn link_by_key(&self, key: &LinkKey) -> Option<&SimLink> {
		self.state.links.iter().find(|l| &l.key == key)
	}

	/// Both endpoints of a link.
	pub fn endpoints(&self, link: &SimLink) -> Option<(&SimNode, &SimNode)> {
		Some((self.node(link.source)?, self.node(link.target)?))
	}

	/// Current alpha.
	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	/// Clamped to `0..=1`.
	pub fn set_alpha(&mut self, alpha: f64) {
		self.alpha = alpha.clamp(0.0, 1.0);
	}

	/// Value alpha is cooling toward.
	pub fn alpha_target(&self) -> f64 {
		self.alpha_target
	}

	/// Clamped to `0..=1`. Raising it above `alpha_min` keeps the simulation running.
	pub fn set_alpha_target(&mut self, target: f64) {
		self.alpha_target = target.clamp(0.0, 1.0);
	}

	/// Resumes ticking without touching alpha.
	pub fn restart(&mut self) {
		self.stopped = false;
		self.ticks = 0;
	}

	/// Resets alpha to 1 so the layout animates back to rest.
	pub fn reheat(&mut self) {
		self.alpha = 1.0;
		self.restart();
	}

	/// Halts ticking until the next restart.
	pub fn stop(&mut self) {
		self.stopped = true;
	}

	/// True while alpha or its target is above `alpha_min` and not stopped.
	pub fn is_running(&self) -> bool {
		!self.stopped
			&& (self.alpha >= self.config.alpha_min || self.alpha_target >= self.config.alpha_min)
	}

	/// Opposite of `is_running`.
	pub fn is_settled(&self) -> bool {
		!self.is_running()
	}

	/// Replaces a named force, or adds it if the name is new.
	pub fn set_force(&mut self, name: &str, mut force: Box<dyn Force>) {
		force.initialize(&self.state.nodes, &self.state.links);
		match self.forces.iter_mut().find(|(n, _)| n == name) {
			Some(slot) => slot.1 = force,
			None => self.forces.push((name.to_string(), force)),
		}
	}

	/// Removes a named force; returns whether it existed.
	pub fn remove_force(&mut self, name: &str) -> bool {
		let before = self.forces.len();
		self.forces.retain(|(n, _)| n != name);
		self.forces.len() != before
	}

	/// Names of the installed forces, in application order.
	pub fn force_names(&self) -> impl Iterator<Item = &str> {
		self.forces.iter().map(|(n, _)| n.as_str())
	}

	fn initialize_forces(&mut self) {
		for (_, force) in &mut self.forces {
			force.initialize(&self.state.nodes, &self.state.links);
		}
	}

	/// Merges `data` into the live sets, keeping positions of known nodes.
	///
	/// Structural changes reheat the simulation; a no-op update leaves it
	/// exactly as it was.
	pub fn update_data(
		&mut self,
		data: &GraphData,
		derivers: &[Rc<dyn LinkDeriver>],
	) -> ReconcileReport {
		let report = reconcile::reconcile(&mut self.state, data, derivers, &mut self.rng);
		self.initialize_forces();
		if report.is_structural() {
			self.reheat();
		}
		report
	}

	/// Pins a node at `(x, y)`; it keeps pushing and pulling others.
	pub fn pin(&mut self, index: NodeIndex, x: f64, y: f64) -> bool {
		let Some(node) = self.state.nodes.get_mut(index) else {
			return false;
		};
		node.fx = Some(x);
		node.fy = Some(y);
		node.x = x;
		node.y = y;
		node.vx = 0.0;
		node.vy = 0.0;
		true
	}

	/// Releases a pinned node back into the simulation.
	pub fn unpin(&mut self, index: NodeIndex) -> bool {
		let Some(node) = self.state.nodes.get_mut(index) else {
			return false;
		};
		node.fx = None;
		node.fy = None;
		true
	}

	/// Advances one integration step of `dt` seconds (nominally 1/60).
	///
	/// Returns `false` without doing any work once settled.
	pub fn step(&mut self, dt: f64) -> bool {
		if !self.is_running() {
			return false;
		}

		let h = (dt * 60.0).clamp(0.25, 3.0);
		self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;
		let alpha = self.alpha;

		for (_, force) in &mut self.forces {
			force.apply(&mut self.state.nodes, &self.state.links, alpha);
		}

		let retain = (1.0 - self.config.velocity_decay).clamp(0.0, 1.0).powf(h);
		for node in &mut self.state.nodes {
			match node.fx {
				Some(fx) => {
					node.x = fx;
					node.vx = 0.0;
				}
				None => {
					node.vx *= retain;
					node.x += node.vx * h;
				}
			}
			match node.fy {
				Some(fy) => {
					node.y = fy;
					node.vy = 0.0;
				}
				None => {
					node.vy *= retain;
					node.y += node.vy * h;
				}
			}
		}

		self.ticks += 1;
		if self.config.cooldown_ticks.is_some_and(|limit| self.ticks >= limit) {
			self.stopped = true;
		}
		true
	}

	/// One tick at the nominal 60 fps step. Returns false when nothing ran.
	pub fn tick(&mut self) -> bool {
		self.step(1.0 / 60.0)
	}

	/// Runs the configured warmup ticks synchronously.
	pub fn warm_up(&mut self) {
		for _ in 0..self.config.warmup_ticks {
			if !self.tick() {
				break;
			}
		}
	}

	/// Runs at most `max_ticks_per_frame` steps for one animation frame.
	pub fn frame(&mut self, dt: f64) -> FrameStats {
		let was_running = self.is_running();
		let mut ticks = 0;
		while ticks < self.config.max_ticks_per_frame.max(1) && self.step(dt) {
			ticks += 1;
		}
		let settled = was_running && !self.is_running();
		if settled {
			debug!(
				"simulation settled (alpha {:.4}, {} nodes)",
				self.alpha,
				self.state.nodes.len()
			);
		}
		FrameStats { ticks, settled }
	}
}

#[cfg(target_arch = "wasm32")]
fn entropy() -> u64 {
	(js_sys::Math::random() * u64::MAX as f64) as u64
}

#[cfg(not(target_arch = "wasm32"))]
fn entropy() -> u64 {
	use std::time::{SystemTime, UNIX_EPOCH};

	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_nanos() as u64)
		.unwrap_or(0x5eed)
}
