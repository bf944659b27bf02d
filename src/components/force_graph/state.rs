//! Graph view state: simulation, camera, interaction and highlight.
//!
//! Created once when the component mounts, then driven by the animation
//! loop (`frame`) and the pointer handlers. Every method returns the events
//! it produced instead of calling back, so the caller can release its borrow
//! of the state before user code runs.

use std::rc::Rc;

use log::debug;

use super::forces::CollideForce;
use super::highlight::{HighlightState, HoverTarget};
use super::interaction::{Controls, GraphEvent, Interaction};
use super::options::ForceGraphOptions;
use super::reconcile::ReconcileReport;
use super::render::{Renderer, Scene};
use super::simulation::{SimNode, Simulation};
use super::surface::DrawContext;
use super::transform::{Bounds, ViewTransform};
use super::types::GraphData;

/// Offset of the tooltip from the pointer, in screen pixels.
const TOOLTIP_OFFSET: f64 = 12.0;

/// Label of the hovered entity and where to show it.
#[derive(Clone, Debug, PartialEq)]
pub struct Tooltip {
	/// Label text.
	pub text: String,
	/// Screen position.
	pub x: f64,
	/// Vertical counterpart of `x`.
	pub y: f64,
}

/// Everything a mounted graph view owns: simulation, transform, input and highlight.
pub struct ForceGraphState {
	sim: Simulation,
	options: Rc<ForceGraphOptions>,
	renderer: Renderer,
	/// Current pan and zoom.
	pub transform: ViewTransform,
	interaction: Interaction,
	highlight: HighlightState,
	tooltip: Option<Tooltip>,
	width: f64,
	height: f64,
	warmed_up: bool,
}

impl ForceGraphState {
	/// View of `width` x `height` screen pixels with an empty graph.
	pub fn new(options: Rc<ForceGraphOptions>, width: f64, height: f64) -> Self {
		let renderer = Renderer::new(options.clone(), options.scale.clone());
		let mut sim = Simulation::new(options.simulation.clone());
		if options.simulation.collide_radius.is_none() {
			let sizes = options.node_size.clone();
			sim.set_force(
				"collide",
				Box::new(CollideForce::new(
					Rc::new(move |node: &SimNode| sizes.get(node)),
					options.simulation.collide_strength,
				)),
			);
		}
		Self {
			sim,
			renderer,
			options,
			transform: ViewTransform::centered(width, height),
			interaction: Interaction::default(),
			highlight: HighlightState::default(),
			tooltip: None,
			width,
			height,
			warmed_up: false,
		}
	}

	/// The running simulation.
	pub fn simulation(&self) -> &Simulation {
		&self.sim
	}

	/// Options the view was built with.
	pub fn options(&self) -> &Rc<ForceGraphOptions> {
		&self.options
	}

	/// Label to show for the hovered entity.
	pub fn tooltip(&self) -> Option<&Tooltip> {
		self.tooltip.as_ref()
	}

	/// Viewport size in screen pixels.
	pub fn size(&self) -> (f64, f64) {
		(self.width, self.height)
	}

	fn controls(&mut self) -> (Controls<'_>, &mut Interaction) {
		(
			Controls {
				sim: &mut self.sim,
				transform: &mut self.transform,
				renderer: &self.renderer,
				options: &self.options,
			},
			&mut self.interaction,
		)
	}

	/// Merges new data into the running layout. Camera, positions of known
	/// nodes and the simulation instance all survive.
	pub fn update_data(&mut self, data: &GraphData) -> ReconcileReport {
		// Node indices held by interaction and highlight are about to go stale.
		let (mut c, interaction) = self.controls();
		interaction.cancel_press(&mut c);
		self.highlight.reset();
		self.tooltip = None;

		let report = self.sim.update_data(data, &self.options.derived_links);
		debug!(
			"graph now has {} nodes and {} links",
			self.sim.nodes().len(),
			self.sim.links().len()
		);
		report
	}

	/// Advances the simulation, refreshes hover, and draws one frame.
	pub fn frame(&mut self, dt: f64, ctx: &mut dyn DrawContext) -> Vec<GraphEvent> {
		let mut events = Vec::new();

		if !self.warmed_up && !self.sim.nodes().is_empty() {
			self.sim.warm_up();
			self.warmed_up = true;
		}
		if self.sim.frame(dt).settled {
			events.push(GraphEvent::EngineStop);
			if let Some(padding) = self.options.fit_on_settle {
				self.zoom_to_fit(padding);
			}
		}

		self.interaction.refresh_hover(
			&self.sim,
			&self.renderer,
			&self.transform,
			&self.options,
			&mut self.highlight,
			&mut events,
		);
		self.update_tooltip();
		self.highlight.tick(dt);

		let scene = Scene {
			nodes: self.sim.nodes(),
			links: self.sim.links(),
			transform: &self.transform,
			highlight: &self.highlight,
			width: self.width,
			height: self.height,
		};
		self.renderer.draw(&scene, ctx);
		events
	}

	fn update_tooltip(&mut self) {
		let text = match self.highlight.target() {
			Some(HoverTarget::Node(i)) => self.sim.node(i).and_then(|n| self.options.node_label.get(n)),
			Some(HoverTarget::Link(i)) => self
				.sim
				.links()
				.get(i)
				.and_then(|l| self.options.link_label.get(l)),
			None => None,
		};
		self.tooltip = match (text, self.interaction.pointer()) {
			(Some(text), Some((x, y))) if !text.is_empty() => Some(Tooltip {
				text,
				x: x + TOOLTIP_OFFSET,
				y: y + TOOLTIP_OFFSET,
			}),
			_ => None,
		};
	}

	/// Pointer pressed at screen position `(sx, sy)`.
	pub fn pointer_down(&mut self, sx: f64, sy: f64) {
		let (mut c, interaction) = self.controls();
		interaction.pointer_down(&mut c, sx, sy);
	}

	/// Pointer moved; returns hover and drag events to dispatch.
	pub fn pointer_move(&mut self, sx: f64, sy: f64) -> Vec<GraphEvent> {
		let mut events = Vec::new();
		let (mut c, interaction) = self.controls();
		interaction.pointer_move(&mut c, sx, sy, &mut events);
		if let Some(tooltip) = self.tooltip.as_mut() {
			tooltip.x = sx + TOOLTIP_OFFSET;
			tooltip.y = sy + TOOLTIP_OFFSET;
		}
		events
	}

	/// Pointer released; returns click and drag-end events to dispatch.
	pub fn pointer_up(&mut self) -> Vec<GraphEvent> {
		let mut events = Vec::new();
		let (mut c, interaction) = self.controls();
		interaction.pointer_up(&mut c, &mut events);
		events
	}

	/// Cancels hover and any press in progress.
	pub fn pointer_leave(&mut self) -> Vec<GraphEvent> {
		let mut events = Vec::new();
		let (mut c, interaction) = self.controls();
		interaction.pointer_leave(&mut c, &mut events);
		self.tooltip = None;
		events
	}

	/// Zooms around `(sx, sy)` when zooming is enabled.
	pub fn wheel(&mut self, sx: f64, sy: f64, delta_y: f64) {
		let (mut c, interaction) = self.controls();
		interaction.wheel(&mut c, sx, sy, delta_y);
	}

	/// Frames every positioned node with `padding` screen pixels around it.
	pub fn zoom_to_fit(&mut self, padding: f64) {
		let k = self.transform.k;
		let mut bounds = Bounds::empty();
		for node in self.sim.nodes() {
			if let Some((x, y)) = node.position() {
				bounds.include_circle(x, y, self.renderer.node_radius(node, k));
			}
		}
		self.transform.fit(&bounds, self.width, self.height, padding);
	}

	/// Keeps the world point at the viewport center fixed.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.transform.pan_by((width - self.width) / 2.0, (height - self.height) / 2.0);
		self.width = width;
		self.height = height;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::simulation::SimulationConfig;
	use crate::components::force_graph::surface::recording::RecordingContext;
	use crate::components::force_graph::types::{LinkRecord, NodeRecord};

	fn options() -> ForceGraphOptions {
		ForceGraphOptions {
			simulation: SimulationConfig {
				seed: Some(11),
				..SimulationConfig::default()
			},
			..ForceGraphOptions::default()
		}
	}

	fn placed() -> GraphData {
		GraphData {
			nodes: vec![
				NodeRecord::new("a").with("x", 0.0).with("y", 0.0).with("name", "Alpha"),
				NodeRecord::new("b").with("x", 60.0).with("y", 0.0),
			],
			links: vec![LinkRecord::new("a", "b")],
		}
	}

	fn state(options: ForceGraphOptions) -> ForceGraphState {
		let mut state = ForceGraphState::new(Rc::new(options), 400.0, 300.0);
		state.update_data(&placed());
		state
	}

	#[test]
	fn node_center_resolves_at_any_zoom() {
		for k in [0.1, 0.37, 1.0, 4.5, 10.0] {
			let mut state = state(options());
			state.sim.stop();
			state.transform.set_scale(k);
			let (sx, sy) = state.transform.world_to_screen(60.0, 0.0);
			state.pointer_move(sx, sy);

			let events = state.frame(0.0, &mut RecordingContext::default());
			let hovered = events.iter().find_map(|e| match e {
				GraphEvent::NodeHover { current: Some(n), .. } => Some(n.id.clone()),
				_ => None,
			});
			assert_eq!(hovered.as_deref(), Some("b"), "zoom {k}");
		}
	}

	#[test]
	fn tooltip_follows_label_and_clears_on_leave() {
		let mut state = state(options());
		state.sim.stop();
		let (sx, sy) = state.transform.world_to_screen(0.0, 0.0);
		state.pointer_move(sx, sy);
		state.frame(0.0, &mut RecordingContext::default());
		assert_eq!(
			state.tooltip(),
			Some(&Tooltip {
				text: "Alpha".to_string(),
				x: sx + TOOLTIP_OFFSET,
				y: sy + TOOLTIP_OFFSET,
			})
		);

		// b has no name, so no tooltip.
		let (sx, sy) = state.transform.world_to_screen(60.0, 0.0);
		state.pointer_move(sx, sy);
		state.frame(0.0, &mut RecordingContext::default());
		assert_eq!(state.tooltip(), None);

		state.pointer_move(200.0, 150.0);
		state.pointer_leave();
		assert_eq!(state.tooltip(), None);
	}

	#[test]
	fn engine_stop_fires_once_per_settle() {
		let mut state = state(options());
		let mut stops = 0;
		for _ in 0..400 {
			let events = state.frame(1.0 / 60.0, &mut RecordingContext::default());
			stops += events.iter().filter(|e| **e == GraphEvent::EngineStop).count();
		}
		assert_eq!(stops, 1);
		assert!(state.simulation().is_settled());

		let mut more = placed();
		more.nodes.push(NodeRecord::new("c"));
		state.update_data(&more);
		assert!(state.simulation().is_running());
	}

	#[test]
	fn identical_update_does_not_reheat() {
		let mut state = state(options());
		for _ in 0..400 {
			state.frame(1.0 / 60.0, &mut RecordingContext::default());
		}
		let before = state.simulation().nodes().to_vec();
		let report = state.update_data(&placed());
		assert!(!report.is_structural());
		assert!(state.simulation().is_settled());
		assert_eq!(state.simulation().nodes(), &before[..]);
	}

	#[test]
	fn warmup_runs_before_first_frame() {
		let mut state = state(ForceGraphOptions {
			simulation: SimulationConfig {
				seed: Some(11),
				warmup_ticks: 50,
				..SimulationConfig::default()
			},
			..ForceGraphOptions::default()
		});
		let alpha = state.simulation().alpha();
		state.frame(1.0 / 60.0, &mut RecordingContext::default());
		let decay = 1.0 - state.simulation().config().alpha_decay;
		assert!((state.simulation().alpha() - alpha * decay.powi(51)).abs() < 1e-9);
	}

	#[test]
	fn zoom_to_fit_frames_nodes() {
		let mut state = state(options());
		state.zoom_to_fit(20.0);
		// Nodes span x in [-4, 64]; the tighter axis is width: (400 - 40) / 68.
		assert!((state.transform.k - 360.0 / 68.0).abs() < 1e-9);
		let (cx, cy) = state.transform.world_to_screen(30.0, 0.0);
		assert!((cx - 200.0).abs() < 1e-9 && (cy - 150.0).abs() < 1e-9);
	}

	#[test]
	fn resize_keeps_center() {
		let mut state = state(options());
		let center = state.transform.screen_to_world(200.0, 150.0);
		state.resize(600.0, 500.0);
		assert_eq!(state.size(), (600.0, 500.0));
		assert_eq!(state.transform.screen_to_world(300.0, 250.0), center);
	}

	#[test]
	fn data_update_mid_drag_releases_the_node() {
		let mut state = state(options());
		let (sx, sy) = state.transform.world_to_screen(0.0, 0.0);
		state.pointer_down(sx, sy);
		state.pointer_move(sx + 40.0, sy);
		assert!(state.simulation().node_by_id("a").unwrap().is_pinned());

		state.update_data(&placed());
		assert!(!state.simulation().node_by_id("a").unwrap().is_pinned());
		assert!(state.pointer_up().is_empty());
	}
}
