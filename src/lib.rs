//! netgraph: interactive force-directed network graphs in the browser.
//!
//! This crate provides a WASM graph view that lays out nodes with a force
//! simulation, merges data updates into the running layout, and supports
//! pan/zoom, dragging, hover highlighting and click callbacks.

use std::rc::Rc;

use leptos::prelude::*;
use leptos_meta::*;
use log::{Level, info, warn};
use serde::Deserialize;
use wasm_bindgen::JsCast;
use web_sys::{HtmlScriptElement, Window};

pub mod components;

pub use components::force_graph::{
	Accessor, CanvasObjectMode, Color, DrawContext, Endpoint, ForceGraph, ForceGraphOptions,
	GraphData, GraphError, GraphEvent, GraphFeed, GraphStyle, LinkDeriver, LinkKind, LinkRecord,
	NodeRecord, ReconcileReport, RelationshipLinks, SimLink, SimNode, Simulation,
	SimulationConfig, TagLinks, Theme, ViewTransform,
};

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("netgraph: logging initialized");
}

/// Page-level settings read from `<script id="graph-config">`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageConfig {
	simulation: SimulationConfig,
	theme: Option<Theme>,
	/// Field to color nodes by.
	color_by: Option<String>,
	/// Add links from `relationships` and `tags` node fields.
	derive_links: bool,
	/// Padding to frame the graph with once it settles.
	fit_padding: Option<f64>,
}

impl PageConfig {
	fn into_options(self) -> ForceGraphOptions {
		let mut options = ForceGraphOptions {
			simulation: self.simulation,
			node_auto_color_by: self.color_by,
			fit_on_settle: self.fit_padding,
			..ForceGraphOptions::default()
		};
		if let Some(theme) = self.theme {
			options.theme = theme;
		}
		if self.derive_links {
			options.derived_links = vec![Rc::new(RelationshipLinks), Rc::new(TagLinks)];
		}
		options
	}
}

/// Text content of a `<script>` element, if present.
fn script_text(id: &str) -> Option<String> {
	let window: Window = web_sys::window()?;
	let document = window.document()?;
	let element = document.get_element_by_id(id)?;
	let script: HtmlScriptElement = element.dyn_into().ok()?;
	script.text().ok()
}

/// Load graph data from a script element with id="graph-data".
/// Expected format: JSON with { nodes: [...], links: [...] }
fn load_graph_data() -> Option<GraphData> {
	let json_text = script_text("graph-data")?;

	match GraphData::from_json(&json_text) {
		Ok(data) => {
			info!(
				"netgraph: loaded {} nodes, {} links",
				data.nodes.len(),
				data.links.len()
			);
			Some(data)
		}
		Err(e) => {
			warn!("netgraph: failed to load graph data: {}", e);
			None
		}
	}
}

/// Load view settings from a script element with id="graph-config".
fn load_page_config() -> PageConfig {
	let Some(json_text) = script_text("graph-config") else {
		return PageConfig::default();
	};
	serde_json::from_str(&json_text).unwrap_or_else(|e| {
		warn!("netgraph: ignoring invalid graph config: {}", e);
		PageConfig::default()
	})
}

/// Main application component.
/// Loads graph data from DOM and renders the force-directed visualization.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let graph_data = load_graph_data().unwrap_or_default();
	let graph_signal = Signal::derive(move || graph_data.clone());
	let options = load_page_config().into_options();

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="dark" />
		<Title text="Network Graph" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<div class="fullscreen-graph">
			<ForceGraph data=graph_signal options=options fullscreen=true />
			<div class="graph-overlay">
				<h1>"Network"</h1>
				<p class="subtitle">"Drag nodes to reposition. Scroll to zoom. Drag background to pan."</p>
			</div>
		</div>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn page_config_fills_defaults() {
		let config: PageConfig =
			serde_json::from_str(r#"{"simulation": {"link_distance": 50}, "derive_links": true}"#).unwrap();
		let options = config.into_options();
		assert_eq!(options.simulation.link_distance, 50.0);
		assert_eq!(options.simulation.charge, -30.0);
		assert_eq!(options.derived_links.len(), 2);
		assert_eq!(options.theme, Theme::dark());
	}

	#[test]
	fn page_config_theme_and_grouping() {
		let config: PageConfig = serde_json::from_str(
			r##"{"theme": {"background": "#ffffff"}, "color_by": "group", "fit_padding": 24}"##,
		)
		.unwrap();
		let options = config.into_options();
		assert_eq!(options.theme.background, Color::rgb(255, 255, 255));
		assert_eq!(options.node_auto_color_by.as_deref(), Some("group"));
		assert_eq!(options.fit_on_settle, Some(24.0));
	}
}
