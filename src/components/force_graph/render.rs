//! Canvas rendering for the force graph.
//!
//! Rendering uses passes for correct z-ordering:
//! 1. Background (screen space)
//! 2. Links, with optional arrows (world space)
//! 3. Non-highlighted nodes, then highlighted nodes on top
//! 4. Post-frame overlay hook (world space)

use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use super::highlight::HighlightState;
use super::options::{CanvasObjectMode, GraphStyle};
use super::scale::{ScaleConfig, ScaledValues};
use super::simulation::{SimLink, SimNode};
use super::surface::DrawContext;
use super::transform::ViewTransform;

/// Smooths values that would otherwise cause abrupt visual changes.
fn smooth_step(t: f64) -> f64 {
	t * t * (3.0 - 2.0 * t)
}

/// Everything that changes from frame to frame.
pub struct Scene<'a> {
	/// Live nodes, indexed by link endpoints.
	pub nodes: &'a [SimNode],
	/// Live links.
	pub links: &'a [SimLink],
	/// Pan and zoom at draw time.
	pub transform: &'a ViewTransform,
	/// Per-node highlight, used for dimming and rings.
	pub highlight: &'a HighlightState,
	/// Canvas size in screen pixels.
	pub width: f64,
	/// Canvas height in screen pixels.
	pub height: f64,
}

/// Draws a scene with a fixed style.
pub struct Renderer {
	style: Rc<dyn GraphStyle>,
	scale: ScaleConfig,
	/// Palette slot per auto-color group, in first-seen order.
	groups: HashMap<String, usize>,
}

impl Renderer {
	/// Renderer drawing with `style`, sized per `scale`.
	pub fn new(style: Rc<dyn GraphStyle>, scale: ScaleConfig) -> Self {
		Self {
			style,
			scale,
			groups: HashMap::new(),
		}
	}

	/// Style the renderer was built with.
	pub fn style(&self) -> &dyn GraphStyle {
		self.style.as_ref()
	}

	/// Scale values at zoom `k`.
	pub fn scaled(&self, k: f64) -> ScaledValues<'_> {
		ScaledValues::new(&self.scale, k)
	}

	/// Rendered radius of a node in world units. Hit-testing uses this too.
	pub fn node_radius(&self, node: &SimNode, k: f64) -> f64 {
		self.scaled(k).node_radius(self.style.node_size(node))
	}

	/// Draws one frame: background, links, nodes, rings, then the post-frame hook.
	pub fn draw(&mut self, scene: &Scene<'_>, ctx: &mut dyn DrawContext) {
		let k = scene.transform.k;

		ctx.set_global_alpha(1.0);
		ctx.set_fill_style(&self.style.background());
		ctx.fill_rect(0.0, 0.0, scene.width, scene.height);

		ctx.save();
		ctx.translate(scene.transform.x, scene.transform.y);
		ctx.scale(k, k);

		let max_t = smooth_step(scene.highlight.max_intensity());
		self.draw_links(scene, ctx, max_t);
		self.draw_nodes(scene, ctx, max_t);

		ctx.set_global_alpha(1.0);
		if let Some(hook) = self.style.frame_post() {
			hook(ctx, k);
		}
		ctx.restore();
	}

	/// Opacity of an element with highlight `t` while the strongest highlight
	/// is `max_t`.
	fn alpha(&self, t: f64, max_t: f64) -> f64 {
		let dim = 1.0 - (1.0 - self.style.theme().dim_alpha) * max_t;
		dim + (1.0 - dim) * t
	}

	fn draw_links(&self, scene: &Scene<'_>, ctx: &mut dyn DrawContext, max_t: f64) {
		let k = scene.transform.k;
		let scale = self.scaled(k);

		for link in scene.links {
			let (Some(source), Some(target)) =
				(scene.nodes.get(link.source), scene.nodes.get(link.target))
			else {
				continue;
			};
			let (Some(a), Some(b)) = (source.position(), target.position()) else {
				continue;
			};

			let link_t = smooth_step(scene.highlight.link_intensity(link));
			ctx.set_global_alpha(self.alpha(link_t, max_t));

			let hook = self.style.link_object();
			if let Some((draw, CanvasObjectMode::Before)) = hook {
				draw(link, source, target, ctx, k);
			}
			if !matches!(hook, Some((_, CanvasObjectMode::Replace))) {
				let color = self.style.link_color(link);
				let width = scale.link_width(self.style.link_width(link)) * (1.0 + 0.4 * link_t);
				ctx.set_stroke_style(&color);
				ctx.set_line_width(width);
				ctx.begin_path();
				ctx.move_to(a.0, a.1);
				ctx.line_to(b.0, b.1);
				ctx.stroke();

				let length = scale.arrow_length(self.style.arrow_length(link));
				if length > 0.0 {
					let gaps = (self.node_radius(source, k), self.node_radius(target, k));
					self.draw_arrow(ctx, a, b, gaps, length, &color);
				}
			}
			if let Some((draw, CanvasObjectMode::After | CanvasObjectMode::Replace)) = hook {
				draw(link, source, target, ctx, k);
			}
		}
	}

	/// Arrow between the two node rims, placed by the style's arrow position.
	fn draw_arrow(
		&self,
		ctx: &mut dyn DrawContext,
		a: (f64, f64),
		b: (f64, f64),
		(source_gap, target_gap): (f64, f64),
		length: f64,
		color: &str,
	) {
		let (dx, dy) = (b.0 - a.0, b.1 - a.1);
		let dist = (dx * dx + dy * dy).sqrt();
		let span = dist - source_gap - target_gap;
		if span < length || dist < 0.001 {
			return;
		}
		let (ux, uy) = (dx / dist, dy / dist);

		let rel = self.style.arrow_position().clamp(0.0, 1.0);
		let tip = source_gap + length + (span - length) * rel;
		let (tip_x, tip_y) = (a.0 + ux * tip, a.1 + uy * tip);
		let (back_x, back_y) = (tip_x - ux * length, tip_y - uy * length);
		let (px, py) = (-uy * length * 0.5, ux * length * 0.5);

		ctx.set_fill_style(color);
		ctx.begin_path();
		ctx.move_to(tip_x, tip_y);
		ctx.line_to(back_x + px, back_y + py);
		ctx.line_to(back_x - px, back_y - py);
		ctx.close_path();
		ctx.fill();
	}

	fn draw_nodes(&mut self, scene: &Scene<'_>, ctx: &mut dyn DrawContext, max_t: f64) {
		// Non-highlighted first so highlighted nodes land on top.
		for lit in [false, true] {
			for (idx, node) in scene.nodes.iter().enumerate() {
				let node_t = scene.highlight.node_intensity(idx);
				if (node_t > 0.001) != lit {
					continue;
				}
				let Some((x, y)) = node.position() else {
					continue;
				};
				let radius = self.node_radius(node, scene.transform.k);
				if !(radius.is_finite() && radius > 0.0) {
					continue;
				}

				ctx.set_global_alpha(self.alpha(smooth_step(node_t), max_t));
				self.draw_node(node, (x, y), radius, scene.transform.k, ctx);

				let ring_t = smooth_step(scene.highlight.ring_intensity(idx));
				if ring_t > 0.01 {
					let scale = self.scaled(scene.transform.k);
					let ring = self.style.theme().ring.with_alpha(0.8 * ring_t);
					ctx.set_stroke_style(&ring.to_css());
					ctx.set_line_width(scale.ring_width);
					ctx.begin_path();
					ctx.arc(x, y, radius + scale.ring_offset);
					ctx.stroke();
				}
			}
		}
	}

	fn draw_node(
		&mut self,
		node: &SimNode,
		(x, y): (f64, f64),
		radius: f64,
		k: f64,
		ctx: &mut dyn DrawContext,
	) {
		let style = Rc::clone(&self.style);
		let hook = style.node_object();
		if let Some((draw, CanvasObjectMode::Before)) = hook {
			draw(node, ctx, k);
		}
		if !matches!(hook, Some((_, CanvasObjectMode::Replace))) {
			let color = self.node_color(node);
			ctx.set_fill_style(&color);
			ctx.begin_path();
			ctx.arc(x, y, radius);
			ctx.fill();
		}
		if let Some((draw, CanvasObjectMode::After | CanvasObjectMode::Replace)) = hook {
			draw(node, ctx, k);
		}
	}

	/// Explicit color, then auto-color group, then theme.
	pub fn node_color(&mut self, node: &SimNode) -> String {
		if let Some(color) = self.style.node_color(node) {
			return color;
		}
		let theme = self.style.theme();
		let group = self
			.style
			.auto_color_key()
			.and_then(|key| node.payload.get(key))
			.and_then(|value| match value {
				Value::Null => None,
				Value::String(s) => Some(s.clone()),
				other => Some(other.to_string()),
			});
		match group {
			Some(group) => {
				let next = self.groups.len();
				let slot = *self.groups.entry(group).or_insert(next);
				theme.palette.get(slot).to_css()
			}
			None => theme.node.to_css(),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::cell::Cell;

	use serde_json::json;

	use super::*;
	use crate::components::force_graph::highlight::HoverTarget;
	use crate::components::force_graph::options::{Accessor, ForceGraphOptions};
	use crate::components::force_graph::surface::recording::{Op, RecordingContext};
	use crate::components::force_graph::theme::Theme;
	use crate::components::force_graph::types::{LinkKey, LinkKind, Payload};

	fn node(id: &str, x: f64, y: f64) -> SimNode {
		SimNode::new(id.to_string(), Payload::new(), x, y)
	}

	fn link(source: usize, target: usize) -> SimLink {
		SimLink {
			key: LinkKey {
				source: source.to_string(),
				kind: LinkKind::Direct,
				target: target.to_string(),
			},
			source,
			target,
			payload: Payload::new(),
		}
	}

	fn render(options: ForceGraphOptions, nodes: &[SimNode], links: &[SimLink], k: f64) -> RecordingContext {
		let scale = options.scale.clone();
		let mut renderer = Renderer::new(Rc::new(options), scale);
		let highlight = HighlightState::default();
		let transform = ViewTransform { x: 10.0, y: 20.0, k };
		let scene = Scene {
			nodes,
			links,
			transform: &transform,
			highlight: &highlight,
			width: 300.0,
			height: 200.0,
		};
		let mut ctx = RecordingContext::default();
		renderer.draw(&scene, &mut ctx);
		ctx
	}

	#[test]
	fn clears_then_transforms_then_draws() {
		let nodes = [node("a", 0.0, 0.0), node("b", 30.0, 0.0)];
		let ctx = render(ForceGraphOptions::default(), &nodes, &[link(0, 1)], 2.0);

		let clear = ctx.position(&Op::FillRect(0.0, 0.0, 300.0, 200.0)).unwrap();
		let translate = ctx.position(&Op::Translate(10.0, 20.0)).unwrap();
		let scale = ctx.position(&Op::Scale(2.0, 2.0)).unwrap();
		let line = ctx.position(&Op::LineTo(30.0, 0.0)).unwrap();
		let first_node = ctx.position(&Op::Arc(0.0, 0.0, 4.0)).unwrap();
		assert!(clear < translate && translate < scale && scale < line && line < first_node);
		assert_eq!(ctx.ops.last(), Some(&Op::Restore));
	}

	#[test]
	fn line_widths_are_divided_by_zoom() {
		let nodes = [node("a", 0.0, 0.0), node("b", 30.0, 0.0)];
		let ctx = render(ForceGraphOptions::default(), &nodes, &[link(0, 1)], 4.0);
		assert!(ctx.ops.contains(&Op::LineWidth(0.25)));
	}

	#[test]
	fn skips_elements_without_positions() {
		let nodes = [node("a", 0.0, 0.0), node("b", f64::NAN, 5.0)];
		let links = [link(0, 1), link(0, 7)];
		let ctx = render(ForceGraphOptions::default(), &nodes, &links, 1.0);
		assert_eq!(ctx.arcs(), vec![(0.0, 0.0, 4.0)]);
		assert!(ctx.segments().is_empty());
	}

	#[test]
	fn replace_hook_suppresses_default_node() {
		let calls = Rc::new(Cell::new(0));
		let seen = Rc::clone(&calls);
		let options = ForceGraphOptions {
			node_canvas_object: Some(Rc::new(move |node: &SimNode, ctx: &mut dyn DrawContext, _: f64| {
				seen.set(seen.get() + 1);
				ctx.fill_text(&node.id, node.x, node.y);
			})),
			..ForceGraphOptions::default()
		};
		let ctx = render(options, &[node("a", 1.0, 2.0)], &[], 1.0);
		assert_eq!(calls.get(), 1);
		assert!(ctx.arcs().is_empty());
		assert!(ctx.ops.contains(&Op::FillText("a".to_string(), 1.0, 2.0)));
	}

	#[test]
	fn before_and_after_hooks_wrap_default_drawing() {
		let hook = |node: &SimNode, ctx: &mut dyn DrawContext, _: f64| ctx.fill_text(&node.id, 0.0, 0.0);
		for (mode, hook_first) in [(CanvasObjectMode::Before, true), (CanvasObjectMode::After, false)] {
			let options = ForceGraphOptions {
				node_canvas_object: Some(Rc::new(hook)),
				node_canvas_object_mode: mode,
				..ForceGraphOptions::default()
			};
			let ctx = render(options, &[node("a", 0.0, 0.0)], &[], 1.0);
			let text = ctx.position(&Op::FillText("a".to_string(), 0.0, 0.0)).unwrap();
			let arc = ctx.position(&Op::Arc(0.0, 0.0, 4.0)).unwrap();
			assert_eq!(text < arc, hook_first);
		}
	}

	#[test]
	fn link_hook_receives_resolved_endpoints() {
		let options = ForceGraphOptions {
			link_canvas_object: Some(Rc::new(
				|_: &SimLink, s: &SimNode, t: &SimNode, ctx: &mut dyn DrawContext, _: f64| {
					ctx.fill_text(&format!("{}>{}", s.id, t.id), 0.0, 0.0);
				},
			)),
			..ForceGraphOptions::default()
		};
		let nodes = [node("a", 0.0, 0.0), node("b", 30.0, 0.0)];
		let ctx = render(options, &nodes, &[link(0, 1)], 1.0);
		assert!(ctx.segments().is_empty());
		assert!(ctx.ops.contains(&Op::FillText("a>b".to_string(), 0.0, 0.0)));
	}

	#[test]
	fn post_frame_hook_runs_last_in_world_space() {
		let options = ForceGraphOptions {
			on_render_frame_post: Some(Rc::new(|ctx: &mut dyn DrawContext, k: f64| {
				ctx.fill_text("overlay", k, k);
			})),
			..ForceGraphOptions::default()
		};
		let ctx = render(options, &[node("a", 0.0, 0.0)], &[], 3.0);
		let overlay = ctx.position(&Op::FillText("overlay".to_string(), 3.0, 3.0)).unwrap();
		assert_eq!(overlay + 1, ctx.ops.len() - 1);
		assert!(ctx.position(&Op::Arc(0.0, 0.0, 4.0)).unwrap() < overlay);
	}

	#[test]
	fn arrows_sit_at_the_target_rim() {
		let options = ForceGraphOptions {
			link_arrow_length: Accessor::Value(6.0),
			..ForceGraphOptions::default()
		};
		let nodes = [node("a", 0.0, 0.0), node("b", 100.0, 0.0)];
		let ctx = render(options, &nodes, &[link(0, 1)], 1.0);
		assert!(ctx.ops.contains(&Op::ClosePath));
		assert!(ctx.ops.contains(&Op::MoveTo(96.0, 0.0)));
	}

	#[test]
	fn auto_color_groups_share_palette_slots() {
		let theme = Theme::dark();
		let options = ForceGraphOptions {
			node_auto_color_by: Some("team".to_string()),
			..ForceGraphOptions::default()
		};
		let mut nodes = vec![node("a", 0.0, 0.0), node("b", 10.0, 0.0), node("c", 20.0, 0.0), node("d", 30.0, 0.0)];
		for (n, team) in nodes.iter_mut().zip(["x", "y", "x"]) {
			n.payload.insert("team".to_string(), json!(team));
		}
		let ctx = render(options, &nodes, &[], 1.0);
		let fills: Vec<&Op> = ctx
			.ops
			.iter()
			.filter(|op| matches!(op, Op::FillStyle(_)))
			.skip(1)
			.collect();
		assert_eq!(fills[0], &Op::FillStyle(theme.palette.get(0).to_css()));
		assert_eq!(fills[1], &Op::FillStyle(theme.palette.get(1).to_css()));
		assert_eq!(fills[2], fills[0]);
		assert_eq!(fills[3], &Op::FillStyle(theme.node.to_css()));
	}

	#[test]
	fn highlight_dims_others_and_rings_hovered() {
		let options = ForceGraphOptions::default();
		let dim = options.theme.dim_alpha;
		let nodes = [node("a", 0.0, 0.0), node("b", 30.0, 0.0), node("c", 60.0, 60.0)];
		let links = [link(0, 1)];
		let mut highlight = HighlightState::default();
		highlight.set_target(Some(HoverTarget::Node(0)), &links);
		for _ in 0..120 {
			highlight.tick(1.0 / 60.0);
		}

		let scale = options.scale.clone();
		let mut renderer = Renderer::new(Rc::new(options), scale);
		let transform = ViewTransform::default();
		let scene = Scene {
			nodes: &nodes,
			links: &links,
			transform: &transform,
			highlight: &highlight,
			width: 100.0,
			height: 100.0,
		};
		let mut ctx = RecordingContext::default();
		renderer.draw(&scene, &mut ctx);

		// c is unlit and drawn first, dimmed.
		let alphas: Vec<f64> = ctx
			.ops
			.iter()
			.filter_map(|op| match op {
				Op::GlobalAlpha(a) => Some(*a),
				_ => None,
			})
			.collect();
		assert!(alphas.iter().any(|a| (a - dim).abs() < 0.01));
		let arcs = ctx.arcs();
		assert_eq!(arcs[0], (60.0, 60.0, 4.0));
		assert!(arcs.iter().any(|&(x, y, r)| (x, y) == (0.0, 0.0) && r > 4.0));
	}
}
