//! Drawing surface abstraction.
//!
//! The renderer and draw hooks only see `DrawContext`, so rendering can be
//! exercised without a browser.

use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use super::error::{GraphError, Result};

/// The subset of the 2D canvas API the graph draws with.
///
/// Coordinates are in whatever space the current transform maps from; after
/// the renderer's `translate`/`scale` that is world space.
pub trait DrawContext {
	/// Pushes the drawing state.
	fn save(&mut self);
	/// Pops the drawing state.
	fn restore(&mut self);
	/// Moves the origin.
	fn translate(&mut self, x: f64, y: f64);
	/// Scales the axes.
	fn scale(&mut self, x: f64, y: f64);
	/// Fills an axis-aligned rectangle.
	fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64);
	/// CSS color.
	fn set_fill_style(&mut self, color: &str);
	/// CSS color.
	fn set_stroke_style(&mut self, color: &str);
	/// Stroke width in the current space.
	fn set_line_width(&mut self, width: f64);
	/// Opacity applied to everything drawn after.
	fn set_global_alpha(&mut self, alpha: f64);
	/// CSS font shorthand.
	fn set_font(&mut self, font: &str);
	/// Starts a new path.
	fn begin_path(&mut self);
	/// Starts a subpath at `(x, y)`.
	fn move_to(&mut self, x: f64, y: f64);
	/// Adds a straight segment to the path.
	fn line_to(&mut self, x: f64, y: f64);
	/// Full circle around `(x, y)`.
	fn arc(&mut self, x: f64, y: f64, radius: f64);
	/// Closes the current subpath.
	fn close_path(&mut self);
	/// Fills the current path.
	fn fill(&mut self);
	/// Strokes the current path.
	fn stroke(&mut self);
	/// Draws text with its baseline at `(x, y)`.
	fn fill_text(&mut self, text: &str, x: f64, y: f64);
}

// Canvas calls that return `Result` only fail on invalid arguments (for
// example a negative arc radius); a failed call draws nothing.
impl DrawContext for CanvasRenderingContext2d {
	fn save(&mut self) {
		CanvasRenderingContext2d::save(self);
	}

	fn restore(&mut self) {
		CanvasRenderingContext2d::restore(self);
	}

	fn translate(&mut self, x: f64, y: f64) {
		let _ = CanvasRenderingContext2d::translate(self, x, y);
	}

	fn scale(&mut self, x: f64, y: f64) {
		let _ = CanvasRenderingContext2d::scale(self, x, y);
	}

	fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
		CanvasRenderingContext2d::fill_rect(self, x, y, w, h);
	}

	fn set_fill_style(&mut self, color: &str) {
		self.set_fill_style_str(color);
	}

	fn set_stroke_style(&mut self, color: &str) {
		self.set_stroke_style_str(color);
	}

	fn set_line_width(&mut self, width: f64) {
		CanvasRenderingContext2d::set_line_width(self, width);
	}

	fn set_global_alpha(&mut self, alpha: f64) {
		CanvasRenderingContext2d::set_global_alpha(self, alpha);
	}

	fn set_font(&mut self, font: &str) {
		CanvasRenderingContext2d::set_font(self, font);
	}

	fn begin_path(&mut self) {
		CanvasRenderingContext2d::begin_path(self);
	}

	fn move_to(&mut self, x: f64, y: f64) {
		CanvasRenderingContext2d::move_to(self, x, y);
	}

	fn line_to(&mut self, x: f64, y: f64) {
		CanvasRenderingContext2d::line_to(self, x, y);
	}

	fn arc(&mut self, x: f64, y: f64, radius: f64) {
		let _ = CanvasRenderingContext2d::arc(self, x, y, radius.max(0.0), 0.0, std::f64::consts::TAU);
	}

	fn close_path(&mut self) {
		CanvasRenderingContext2d::close_path(self);
	}

	fn fill(&mut self) {
		CanvasRenderingContext2d::fill(self);
	}

	fn stroke(&mut self) {
		CanvasRenderingContext2d::stroke(self);
	}

	fn fill_text(&mut self, text: &str, x: f64, y: f64) {
		let _ = CanvasRenderingContext2d::fill_text(self, text, x, y);
	}
}

/// Gets the 2D rendering context of a canvas element.
pub fn acquire_context(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d> {
	canvas
		.get_context("2d")
		.map_err(|e| GraphError::SurfaceUnavailable(format!("{e:?}")))?
		.ok_or_else(|| GraphError::SurfaceUnavailable("no 2d context".to_string()))?
		.dyn_into::<CanvasRenderingContext2d>()
		.map_err(|_| GraphError::SurfaceUnavailable("context is not 2d".to_string()))
}
