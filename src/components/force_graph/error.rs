//! Error types for the browser-facing edges of the graph view.
//!
//! The engine itself never fails: unresolved links are dropped and missing
//! positions are skipped. Errors only come from acquiring the drawing surface,
//! parsing supplied JSON, and feeding a view that has been torn down.

use thiserror::Error;

/// Errors surfaced by the graph view glue.
#[derive(Debug, Error)]
pub enum GraphError {
	/// The canvas 2D context could not be acquired.
	#[error("drawing surface unavailable: {0}")]
	SurfaceUnavailable(String),
	/// Supplied graph JSON could not be parsed.
	#[error("invalid graph data: {0}")]
	InvalidData(#[from] serde_json::Error),
	/// A data feed was used after its view was torn down.
	#[error("graph view has been torn down")]
	Detached,
}

/// Result alias for graph view operations.
pub type Result<T> = std::result::Result<T, GraphError>;
