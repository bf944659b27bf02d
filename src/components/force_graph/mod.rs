//! Force-directed network graph component.
//!
//! Renders an interactive force-directed graph on an HTML canvas with:
//! - An alpha-cooled force simulation (link, charge, center and collision forces)
//! - Incremental data updates that keep existing node positions
//! - Pan, zoom, node dragging, hover and click callbacks
//! - Custom node/link drawing hooks and themed colors
//!
//! # Example
//!
//! ```ignore
//! use netgraph::{ForceGraph, ForceGraphOptions, GraphData, LinkRecord, NodeRecord};
//!
//! let data = GraphData {
//!     nodes: vec![NodeRecord::new("a").with("name", "Node A"), NodeRecord::new("b")],
//!     links: vec![LinkRecord::new("a", "b")],
//! };
//! let options = ForceGraphOptions {
//!     on_node_click: Some(Rc::new(|node: &SimNode| log::info!("clicked {}", node.id))),
//!     ..ForceGraphOptions::default()
//! };
//!
//! view! { <ForceGraph data=Signal::stored(data) options=options fullscreen=true /> }
//! ```

mod component;
pub mod error;
mod feed;
pub mod forces;
pub mod geometry;
pub mod highlight;
pub mod interaction;
pub mod options;
mod quadtree;
pub mod reconcile;
pub mod render;
pub mod scale;
pub mod simulation;
pub mod state;
pub mod surface;
pub mod theme;
pub mod transform;
pub mod types;

pub use component::ForceGraph;
pub use error::{GraphError, Result};
pub use feed::GraphFeed;
pub use interaction::GraphEvent;
pub use options::{Accessor, CanvasObjectMode, ForceGraphOptions, GraphStyle};
pub use reconcile::{LinkDeriver, ReconcileReport, RelationshipLinks, TagLinks};
pub use simulation::{SimLink, SimNode, Simulation, SimulationConfig};
pub use surface::DrawContext;
pub use theme::{Color, Theme};
pub use transform::ViewTransform;
pub use types::{Endpoint, GraphData, LinkKind, LinkRecord, NodeRecord};
