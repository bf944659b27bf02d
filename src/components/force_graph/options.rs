//! Options accepted by the graph view.
//!
//! Styling values are `Accessor`s: either a constant or a function of the
//! node/link. Callbacks are plain `Rc<dyn Fn>` so options can be cloned into
//! event handlers freely.

use std::fmt;
use std::rc::Rc;

use super::reconcile::LinkDeriver;
use super::scale::ScaleConfig;
use super::simulation::{SimLink, SimNode, SimulationConfig};
use super::surface::DrawContext;
use super::theme::Theme;

/// A constant, or a function of the entity being styled.
pub enum Accessor<E: ?Sized, T> {
	/// Same value for every entity.
	Value(T),
	/// Computed per entity.
	Func(Rc<dyn Fn(&E) -> T>),
}

impl<E: ?Sized, T: Clone> Accessor<E, T> {
	/// Wraps a closure.
	pub fn func(f: impl Fn(&E) -> T + 'static) -> Self {
		Accessor::Func(Rc::new(f))
	}

	/// Resolves the value for `entity`.
	pub fn get(&self, entity: &E) -> T {
		match self {
			Accessor::Value(value) => value.clone(),
			Accessor::Func(f) => f(entity),
		}
	}
}

impl<E: ?Sized, T: Clone> Clone for Accessor<E, T> {
	fn clone(&self) -> Self {
		match self {
			Accessor::Value(value) => Accessor::Value(value.clone()),
			Accessor::Func(f) => Accessor::Func(Rc::clone(f)),
		}
	}
}

impl<E: ?Sized, T> From<T> for Accessor<E, T> {
	fn from(value: T) -> Self {
		Accessor::Value(value)
	}
}

impl<E: ?Sized, T: fmt::Debug> fmt::Debug for Accessor<E, T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Accessor::Value(value) => f.debug_tuple("Value").field(value).finish(),
			Accessor::Func(_) => f.write_str("Func(..)"),
		}
	}
}

/// Where a custom draw hook runs relative to the default drawing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CanvasObjectMode {
	/// The hook draws instead of the default.
	#[default]
	Replace,
	/// The hook draws first, then the default.
	Before,
	/// The default draws first, then the hook.
	After,
}

/// Custom node drawing: `(node, ctx, zoom)`. The context is in world space.
pub type NodeDraw = Rc<dyn Fn(&SimNode, &mut dyn DrawContext, f64)>;
/// Custom link drawing: `(link, source, target, ctx, zoom)`.
pub type LinkDraw = Rc<dyn Fn(&SimLink, &SimNode, &SimNode, &mut dyn DrawContext, f64)>;
/// Overlay drawn after nodes and links: `(ctx, zoom)`.
pub type FrameHook = Rc<dyn Fn(&mut dyn DrawContext, f64)>;

/// Called with a snapshot of the node.
pub type NodeHandler = Rc<dyn Fn(&SimNode)>;
/// `(current, previous)`.
pub type NodeHoverHandler = Rc<dyn Fn(Option<&SimNode>, Option<&SimNode>)>;
/// Called with a snapshot of the link.
pub type LinkHandler = Rc<dyn Fn(&SimLink)>;
/// `(current, previous)`.
pub type LinkHoverHandler = Rc<dyn Fn(Option<&SimLink>, Option<&SimLink>)>;
/// World coordinates of the click.
pub type BackgroundHandler = Rc<dyn Fn(f64, f64)>;
/// Called once each time the simulation settles.
pub type EngineStopHandler = Rc<dyn Fn()>;

/// Everything the renderer needs to know about styling.
///
/// Only the palette-free basics are required; hooks default to absent and
/// colors default to the theme.
pub trait GraphStyle {
	/// Base colors.
	fn theme(&self) -> &Theme;

	/// Canvas fill behind the graph.
	fn background(&self) -> String {
		self.theme().background.to_css()
	}

	/// Explicit node color; `None` falls back to grouping, then the theme.
	fn node_color(&self, _node: &SimNode) -> Option<String> {
		None
	}

	/// Stroke color of a link.
	fn link_color(&self, _link: &SimLink) -> String {
		self.theme().link.to_css()
	}

	/// Node radius before zoom scaling.
	fn node_size(&self, _node: &SimNode) -> f64 {
		DEFAULT_NODE_SIZE
	}

	/// Link width before zoom scaling.
	fn link_width(&self, _link: &SimLink) -> f64 {
		1.0
	}

	/// Zero draws no arrow.
	fn arrow_length(&self, _link: &SimLink) -> f64 {
		0.0
	}

	/// Arrow tip position along the link, 0 at the source and 1 at the
	/// target's edge.
	fn arrow_position(&self) -> f64 {
		1.0
	}

	/// Payload field whose values pick palette colors.
	fn auto_color_key(&self) -> Option<&str> {
		None
	}

	/// Custom node drawing and how it combines with the default.
	fn node_object(&self) -> Option<(&NodeDraw, CanvasObjectMode)> {
		None
	}

	/// Custom link drawing and how it combines with the default.
	fn link_object(&self) -> Option<(&LinkDraw, CanvasObjectMode)> {
		None
	}

	/// Overlay drawn last, in world space.
	fn frame_post(&self) -> Option<&FrameHook> {
		None
	}
}

/// Node radius in world units when nothing else is configured.
pub const DEFAULT_NODE_SIZE: f64 = 4.0;

/// Configuration of a graph view.
#[derive(Clone)]
pub struct ForceGraphOptions {
	/// Canvas width in CSS pixels; `None` follows the container.
	pub width: Option<f64>,
	/// Canvas height; `None` follows the container.
	pub height: Option<f64>,
	/// Overrides the theme background.
	pub background_color: Option<String>,
	/// Tooltip text for a hovered node. Defaults to the `name` field.
	pub node_label: Accessor<SimNode, Option<String>>,
	/// Tooltip text for a hovered link.
	pub link_label: Accessor<SimLink, Option<String>>,
	/// Fixed node color; wins over auto-coloring.
	pub node_color: Option<Accessor<SimNode, String>>,
	/// Fixed link color.
	pub link_color: Option<Accessor<SimLink, String>>,
	/// Payload field to color nodes by when `node_color` is unset.
	pub node_auto_color_by: Option<String>,
	/// Node radius before zoom scaling.
	pub node_size: Accessor<SimNode, f64>,
	/// Screen pixels under the default `ScaleConfig`.
	pub link_width: Accessor<SimLink, f64>,
	/// Arrowhead length; zero draws none.
	pub link_arrow_length: Accessor<SimLink, f64>,
	/// Arrow tip position along the link, 0 at the source and 1 at the target.
	pub link_arrow_rel_pos: f64,
	/// Custom node drawing in world space.
	pub node_canvas_object: Option<NodeDraw>,
	/// Where `node_canvas_object` runs.
	pub node_canvas_object_mode: CanvasObjectMode,
	/// Custom link drawing in world space.
	pub link_canvas_object: Option<LinkDraw>,
	/// Where `link_canvas_object` runs.
	pub link_canvas_object_mode: CanvasObjectMode,
	/// Overlay drawn after nodes and links.
	pub on_render_frame_post: Option<FrameHook>,
	/// Clicks on a node that was not dragged.
	pub on_node_click: Option<NodeHandler>,
	/// Hover changes between nodes.
	pub on_node_hover: Option<NodeHoverHandler>,
	/// Clicks on a link.
	pub on_link_click: Option<LinkHandler>,
	/// Hover changes between links.
	pub on_link_hover: Option<LinkHoverHandler>,
	/// Clicks that hit neither a node nor a link.
	pub on_background_click: Option<BackgroundHandler>,
	/// Fires on every pointer move while a node is dragged.
	pub on_node_drag: Option<NodeHandler>,
	/// Fires once when a drag is released.
	pub on_node_drag_end: Option<NodeHandler>,
	/// Fires each time the layout settles.
	pub on_engine_stop: Option<EngineStopHandler>,
	/// Wheel zoom at the pointer.
	pub enable_zoom_interaction: bool,
	/// Dragging the background pans the view.
	pub enable_pan_interaction: bool,
	/// Nodes can be dragged and pinned while held.
	pub enable_node_drag: bool,
	/// Hover and click handling as a whole.
	pub enable_pointer_interaction: bool,
	/// Frame the whole graph with this padding each time the layout settles.
	pub fit_on_settle: Option<f64>,
	/// Force and cooling parameters.
	pub simulation: SimulationConfig,
	/// How sizes respond to zoom.
	pub scale: ScaleConfig,
	/// Colors used when no accessor overrides them.
	pub theme: Theme,
	/// Link generators run over the live nodes on every data update.
	pub derived_links: Vec<Rc<dyn LinkDeriver>>,
}

impl Default for ForceGraphOptions {
	fn default() -> Self {
		Self {
			width: None,
			height: None,
			background_color: None,
			node_label: Accessor::func(|node: &SimNode| node.text("name").map(str::to_string)),
			link_label: Accessor::func(|link: &SimLink| {
				link.payload.get("name").and_then(|v| v.as_str()).map(str::to_string)
			}),
			node_color: None,
			link_color: None,
			node_auto_color_by: None,
			node_size: Accessor::Value(DEFAULT_NODE_SIZE),
			link_width: Accessor::Value(1.0),
			link_arrow_length: Accessor::Value(0.0),
			link_arrow_rel_pos: 1.0,
			node_canvas_object: None,
			node_canvas_object_mode: CanvasObjectMode::Replace,
			link_canvas_object: None,
			link_canvas_object_mode: CanvasObjectMode::Replace,
			on_render_frame_post: None,
			on_node_click: None,
			on_node_hover: None,
			on_link_click: None,
			on_link_hover: None,
			on_background_click: None,
			on_node_drag: None,
			on_node_drag_end: None,
			on_engine_stop: None,
			enable_zoom_interaction: true,
			enable_pan_interaction: true,
			enable_node_drag: true,
			enable_pointer_interaction: true,
			fit_on_settle: None,
			simulation: SimulationConfig::default(),
			scale: ScaleConfig::default(),
			theme: Theme::default(),
			derived_links: Vec::new(),
		}
	}
}

impl GraphStyle for ForceGraphOptions {
	fn theme(&self) -> &Theme {
		&self.theme
	}

	fn background(&self) -> String {
		self.background_color
			.clone()
			.unwrap_or_else(|| self.theme.background.to_css())
	}

	fn node_color(&self, node: &SimNode) -> Option<String> {
		self.node_color.as_ref().map(|c| c.get(node))
	}

	fn link_color(&self, link: &SimLink) -> String {
		match &self.link_color {
			Some(color) => color.get(link),
			None => self.theme.link.to_css(),
		}
	}

	fn node_size(&self, node: &SimNode) -> f64 {
		self.node_size.get(node)
	}

	fn link_width(&self, link: &SimLink) -> f64 {
		self.link_width.get(link)
	}

	fn arrow_length(&self, link: &SimLink) -> f64 {
		self.link_arrow_length.get(link)
	}

	fn arrow_position(&self) -> f64 {
		self.link_arrow_rel_pos
	}

	fn auto_color_key(&self) -> Option<&str> {
		self.node_auto_color_by.as_deref()
	}

	fn node_object(&self) -> Option<(&NodeDraw, CanvasObjectMode)> {
		self.node_canvas_object
			.as_ref()
			.map(|hook| (hook, self.node_canvas_object_mode))
	}

	fn link_object(&self) -> Option<(&LinkDraw, CanvasObjectMode)> {
		self.link_canvas_object
			.as_ref()
			.map(|hook| (hook, self.link_canvas_object_mode))
	}

	fn frame_post(&self) -> Option<&FrameHook> {
		self.on_render_frame_post.as_ref()
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::components::force_graph::types::Payload;

	fn node(name: Option<&str>) -> SimNode {
		let mut payload = Payload::new();
		if let Some(name) = name {
			payload.insert("name".to_string(), json!(name));
		}
		SimNode::new("n".to_string(), payload, 0.0, 0.0)
	}

	#[test]
	fn accessor_value_and_func() {
		let fixed: Accessor<SimNode, f64> = 3.0.into();
		let sized = Accessor::func(|n: &SimNode| n.id.len() as f64);
		assert_eq!(fixed.get(&node(None)), 3.0);
		assert_eq!(sized.clone().get(&node(None)), 1.0);
	}

	#[test]
	fn defaults_fall_back_to_theme() {
		let options = ForceGraphOptions::default();
		assert_eq!(options.node_color(&node(None)), None);
		assert_eq!(options.background(), Theme::dark().background.to_css());
		assert_eq!(options.node_size(&node(None)), DEFAULT_NODE_SIZE);
		assert!(options.node_object().is_none());
		assert!(options.frame_post().is_none());
	}

	#[test]
	fn default_label_reads_name() {
		let options = ForceGraphOptions::default();
		assert_eq!(options.node_label.get(&node(Some("Alice"))), Some("Alice".to_string()));
		assert_eq!(options.node_label.get(&node(None)), None);
	}

	#[test]
	fn hooks_report_their_mode() {
		let options = ForceGraphOptions {
			node_canvas_object: Some(Rc::new(|_: &SimNode, _: &mut dyn DrawContext, _: f64| {})),
			node_canvas_object_mode: CanvasObjectMode::After,
			..ForceGraphOptions::default()
		};
		assert_eq!(options.node_object().map(|(_, mode)| mode), Some(CanvasObjectMode::After));
	}
}
