//! Pointer and wheel handling: pan, zoom, node drag, hover and click.
//!
//! Handlers never call user callbacks directly. They push `GraphEvent`s,
//! which the caller dispatches once it no longer holds the graph state.

use log::debug;

use super::geometry;
use super::highlight::{HighlightState, HoverTarget};
use super::options::ForceGraphOptions;
use super::render::Renderer;
use super::simulation::{NodeIndex, SimLink, SimNode, Simulation};
use super::transform::ViewTransform;

/// Screen pixels a press may travel and still count as a click.
pub const CLICK_TOLERANCE_PX: f64 = 3.0;

/// Wheel delta to zoom exponent, per pixel of scroll.
const WHEEL_ZOOM_RATE: f64 = 0.002;

/// Something that happened to the graph, carrying a snapshot of the entity.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphEvent {
	/// Hovered node changed.
	NodeHover {
		/// Now under the pointer.
		current: Option<SimNode>,
		/// Under the pointer before this move.
		previous: Option<SimNode>,
	},
	/// Hovered link changed.
	LinkHover {
		/// Now under the pointer.
		current: Option<SimLink>,
		/// Under the pointer before this move.
		previous: Option<SimLink>,
	},
	/// A node was clicked without dragging.
	NodeClick(SimNode),
	/// A link was clicked.
	LinkClick(SimLink),
	/// World coordinates of the click.
	BackgroundClick(f64, f64),
	/// A node moved under the pointer.
	NodeDrag(SimNode),
	/// A drag was released.
	NodeDragEnd(SimNode),
	/// The simulation settled.
	EngineStop,
}

impl GraphEvent {
	/// Calls the matching callback, if one is set.
	pub fn dispatch(&self, options: &ForceGraphOptions) {
		match self {
			GraphEvent::NodeHover { current, previous } => {
				if let Some(f) = &options.on_node_hover {
					f(current.as_ref(), previous.as_ref());
				}
			}
			GraphEvent::LinkHover { current, previous } => {
				if let Some(f) = &options.on_link_hover {
					f(current.as_ref(), previous.as_ref());
				}
			}
			GraphEvent::NodeClick(node) => {
				if let Some(f) = &options.on_node_click {
					f(node);
				}
			}
			GraphEvent::LinkClick(link) => {
				if let Some(f) = &options.on_link_click {
					f(link);
				}
			}
			GraphEvent::BackgroundClick(x, y) => {
				if let Some(f) = &options.on_background_click {
					f(*x, *y);
				}
			}
			GraphEvent::NodeDrag(node) => {
				if let Some(f) = &options.on_node_drag {
					f(node);
				}
			}
			GraphEvent::NodeDragEnd(node) => {
				if let Some(f) = &options.on_node_drag_end {
					f(node);
				}
			}
			GraphEvent::EngineStop => {
				if let Some(f) = &options.on_engine_stop {
					f();
				}
			}
		}
	}
}

/// The parts of the graph an input handler may touch.
pub struct Controls<'a> {
	/// Simulation to pin, unpin and reheat.
	pub sim: &'a mut Simulation,
	/// View transform for panning and zooming.
	pub transform: &'a mut ViewTransform,
	/// Used for hit-testing with rendered radii.
	pub renderer: &'a Renderer,
	/// Callbacks and interaction toggles.
	pub options: &'a ForceGraphOptions,
}

/// Node or link under a screen position; nodes win over links.
pub fn hit_test(
	sim: &Simulation,
	renderer: &Renderer,
	transform: &ViewTransform,
	(sx, sy): (f64, f64),
) -> Option<HoverTarget> {
	let k = transform.k;
	let world = transform.screen_to_world(sx, sy);
	if let Some(idx) = geometry::node_at(sim.nodes(), world, |n| renderer.node_radius(n, k)) {
		return Some(HoverTarget::Node(idx));
	}
	geometry::link_at(sim.links(), sim.nodes(), world, renderer.scaled(k).link_hover)
		.map(HoverTarget::Link)
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Pressed {
	Node {
		index: NodeIndex,
		origin: (f64, f64),
	},
	Link(usize),
	Background {
		origin: (f64, f64),
	},
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Press {
	target: Pressed,
	/// Screen position of the press.
	start: (f64, f64),
	/// Moved past the click tolerance.
	dragging: bool,
}

/// Pointer state between events.
#[derive(Clone, Debug, Default)]
pub struct Interaction {
	press: Option<Press>,
	/// Last known pointer position in screen space.
	pointer: Option<(f64, f64)>,
}

impl Interaction {
	/// Index of the node being dragged.
	pub fn dragged_node(&self) -> Option<NodeIndex> {
		match self.press {
			Some(Press {
				target: Pressed::Node { index, .. },
				dragging: true,
				..
			}) => Some(index),
			_ => None,
		}
	}

	/// True while the background is being dragged.
	pub fn is_panning(&self) -> bool {
		matches!(
			self.press,
			Some(Press {
				target: Pressed::Background { .. },
				dragging: true,
				..
			})
		)
	}

	/// Last pointer position in screen pixels.
	pub fn pointer(&self) -> Option<(f64, f64)> {
		self.pointer
	}

	/// Node indices go stale when the node set is reconciled.
	pub fn cancel_press(&mut self, c: &mut Controls<'_>) {
		if let Some(index) = self.dragged_node() {
			c.sim.unpin(index);
			c.sim.set_alpha_target(c.sim.config().alpha_target);
		}
		self.press = None;
	}

	/// Starts a press on whatever lies under `(sx, sy)`.
	pub fn pointer_down(&mut self, c: &mut Controls<'_>, sx: f64, sy: f64) {
		self.pointer = Some((sx, sy));
		let hit = if c.options.enable_pointer_interaction {
			hit_test(c.sim, c.renderer, c.transform, (sx, sy))
		} else {
			None
		};
		let target = match hit {
			Some(HoverTarget::Node(index)) => match c.sim.node(index).and_then(SimNode::position) {
				Some(origin) => Pressed::Node { index, origin },
				None => return,
			},
			Some(HoverTarget::Link(i)) => Pressed::Link(i),
			None => Pressed::Background {
				origin: (c.transform.x, c.transform.y),
			},
		};
		self.press = Some(Press {
			target,
			start: (sx, sy),
			dragging: false,
		});
	}

	/// Drags, pans or refreshes hover depending on the current press.
	pub fn pointer_move(&mut self, c: &mut Controls<'_>, sx: f64, sy: f64, events: &mut Vec<GraphEvent>) {
		self.pointer = Some((sx, sy));
		let Some(press) = self.press.as_mut() else {
			return;
		};

		let (dx, dy) = (sx - press.start.0, sy - press.start.1);
		let starting = !press.dragging && dx.hypot(dy) > CLICK_TOLERANCE_PX;
		if starting {
			press.dragging = true;
		}
		if !press.dragging {
			return;
		}

		match press.target {
			Pressed::Node { index, origin } if c.options.enable_node_drag => {
				let k = c.transform.k;
				let (x, y) = (origin.0 + dx / k, origin.1 + dy / k);
				c.sim.pin(index, x, y);
				if starting {
					debug!("drag start on node {index}");
					let target = c.sim.config().drag_alpha_target;
					c.sim.set_alpha_target(target);
					c.sim.restart();
				}
				if let Some(node) = c.sim.node(index) {
					events.push(GraphEvent::NodeDrag(node.clone()));
				}
			}
			Pressed::Background { origin } if c.options.enable_pan_interaction => {
				c.transform.x = origin.0 + dx;
				c.transform.y = origin.1 + dy;
			}
			_ => {}
		}
	}

	/// Ends the press, emitting a click when the pointer stayed within the click tolerance.
	pub fn pointer_up(&mut self, c: &mut Controls<'_>, events: &mut Vec<GraphEvent>) {
		let Some(press) = self.press.take() else {
			return;
		};

		if press.dragging {
			if let Pressed::Node { index, .. } = press.target {
				if c.options.enable_node_drag {
					c.sim.unpin(index);
					c.sim.set_alpha_target(c.sim.config().alpha_target);
					if let Some(node) = c.sim.node(index) {
						events.push(GraphEvent::NodeDragEnd(node.clone()));
					}
				}
			}
			return;
		}

		match press.target {
			Pressed::Node { index, .. } => {
				if let Some(node) = c.sim.node(index) {
					events.push(GraphEvent::NodeClick(node.clone()));
				}
			}
			Pressed::Link(i) => {
				if let Some(link) = c.sim.links().get(i) {
					events.push(GraphEvent::LinkClick(link.clone()));
				}
			}
			Pressed::Background { .. } => {
				if c.options.enable_pointer_interaction {
					let (wx, wy) = c.transform.screen_to_world(press.start.0, press.start.1);
					events.push(GraphEvent::BackgroundClick(wx, wy));
				}
			}
		}
	}

	/// Pointer left the canvas: ends any drag or pan and forgets the pointer
	/// so the next hover refresh clears hover state.
	pub fn pointer_leave(&mut self, c: &mut Controls<'_>, events: &mut Vec<GraphEvent>) {
		if let Some(index) = self.dragged_node() {
			if c.options.enable_node_drag {
				c.sim.unpin(index);
				c.sim.set_alpha_target(c.sim.config().alpha_target);
				if let Some(node) = c.sim.node(index) {
					events.push(GraphEvent::NodeDragEnd(node.clone()));
				}
			}
		}
		self.press = None;
		self.pointer = None;
	}

	/// Zooms around the pointer. Positive `delta_y` zooms out.
	pub fn wheel(&mut self, c: &mut Controls<'_>, sx: f64, sy: f64, delta_y: f64) {
		if !c.options.enable_zoom_interaction || !delta_y.is_finite() {
			return;
		}
		c.transform.zoom_at(2f64.powf(-delta_y * WHEEL_ZOOM_RATE), sx, sy);
	}

	/// Re-resolves what is under the pointer. Call once per frame, so hover
	/// callbacks fire at most once per frame however many moves arrived.
	pub fn refresh_hover(
		&self,
		sim: &Simulation,
		renderer: &Renderer,
		transform: &ViewTransform,
		options: &ForceGraphOptions,
		highlight: &mut HighlightState,
		events: &mut Vec<GraphEvent>,
	) {
		// Hover sticks to the dragged node while the pointer runs ahead of it.
		if self.dragged_node().is_some() || self.is_panning() {
			return;
		}
		let current = match (self.pointer, options.enable_pointer_interaction) {
			(Some(pointer), true) => hit_test(sim, renderer, transform, pointer),
			_ => None,
		};
		let previous = highlight.target();
		if current == previous {
			return;
		}

		let node_of = |t: Option<HoverTarget>| match t {
			Some(HoverTarget::Node(i)) => sim.node(i).cloned(),
			_ => None,
		};
		let link_of = |t: Option<HoverTarget>| match t {
			Some(HoverTarget::Link(i)) => sim.links().get(i).cloned(),
			_ => None,
		};
		let (node_now, node_before) = (node_of(current), node_of(previous));
		if node_now != node_before {
			events.push(GraphEvent::NodeHover {
				current: node_now,
				previous: node_before,
			});
		}
		let (link_now, link_before) = (link_of(current), link_of(previous));
		if link_now != link_before {
			events.push(GraphEvent::LinkHover {
				current: link_now,
				previous: link_before,
			});
		}
		highlight.set_target(current, sim.links());
	}
}
