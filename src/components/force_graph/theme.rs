//! Visual theming for the force graph.
//!
//! Colors deserialize from CSS strings, so a theme can be supplied as JSON
//! alongside the graph data.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// RGBA color representation.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub struct Color {
	/// Red channel.
	pub r: u8,
	/// Green channel.
	pub g: u8,
	/// Blue channel.
	pub b: u8,
	/// Alpha from 0 to 1.
	pub a: f64,
}

impl Color {
	/// Opaque color.
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 1.0 }
	}

	/// Color with explicit alpha.
	pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
		Self { r, g, b, a }
	}

	/// Same color with a different alpha.
	pub fn with_alpha(self, a: f64) -> Self {
		Self { a, ..self }
	}

	/// Linear interpolation between two colors
	pub fn lerp(self, other: Color, t: f64) -> Self {
		let t = t.clamp(0.0, 1.0);
		Self {
			r: (self.r as f64 * (1.0 - t) + other.r as f64 * t) as u8,
			g: (self.g as f64 * (1.0 - t) + other.g as f64 * t) as u8,
			b: (self.b as f64 * (1.0 - t) + other.b as f64 * t) as u8,
			a: self.a * (1.0 - t) + other.a * t,
		}
	}

	/// `#rrggbb` when opaque, `rgba(...)` otherwise.
	pub fn to_css(self) -> String {
		if (self.a - 1.0).abs() < 0.001 {
			format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
		} else {
			format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
		}
	}
}

/// A CSS color string that is neither `#rrggbb`, `#rgb` nor `rgb()`/`rgba()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownColor(pub String);

impl fmt::Display for UnknownColor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "unsupported color `{}`", self.0)
	}
}

impl FromStr for Color {
	type Err = UnknownColor;

	fn from_str(text: &str) -> Result<Self, Self::Err> {
		let s = text.trim();
		let unknown = || UnknownColor(text.to_string());

		if let Some(hex) = s.strip_prefix('#') {
			let channel = |range: std::ops::Range<usize>, repeat: bool| -> Result<u8, UnknownColor> {
				let digits = hex.get(range).ok_or_else(unknown)?;
				let value = u8::from_str_radix(digits, 16).map_err(|_| unknown())?;
				Ok(if repeat { value * 17 } else { value })
			};
			return match hex.len() {
				6 => Ok(Color::rgb(channel(0..2, false)?, channel(2..4, false)?, channel(4..6, false)?)),
				3 => Ok(Color::rgb(channel(0..1, true)?, channel(1..2, true)?, channel(2..3, true)?)),
				_ => Err(unknown()),
			};
		}

		let inner = s
			.strip_prefix("rgba(")
			.or_else(|| s.strip_prefix("rgb("))
			.and_then(|rest| rest.strip_suffix(')'))
			.ok_or_else(unknown)?;
		let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
		if !(3..=4).contains(&parts.len()) {
			return Err(unknown());
		}
		let channel = |i: usize| parts[i].parse::<u8>().map_err(|_| unknown());
		let a = match parts.get(3) {
			Some(a) => a.parse::<f64>().map_err(|_| unknown())?,
			None => 1.0,
		};
		Ok(Color::rgba(channel(0)?, channel(1)?, channel(2)?, a))
	}
}

impl TryFrom<String> for Color {
	type Error = UnknownColor;

	fn try_from(text: String) -> Result<Self, Self::Error> {
		text.parse()
	}
}

/// A curated color palette for nodes.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct NodePalette {
	/// Colors in order; lookups wrap around.
	pub colors: Vec<Color>,
}

impl NodePalette {
	/// Muted, harmonious palette - slate blues and teals (default)
	pub fn slate() -> Self {
		Self {
			colors: vec![
				Color::rgb(94, 129, 172),  // Steel blue
				Color::rgb(129, 161, 193), // Light steel
				Color::rgb(100, 148, 160), // Teal gray
				Color::rgb(136, 160, 175), // Cadet blue
				Color::rgb(108, 142, 173), // Air force blue
				Color::rgb(119, 158, 165), // Desaturated cyan
				Color::rgb(143, 163, 180), // Cool gray
				Color::rgb(122, 153, 168), // Dusty blue
			],
		}
	}

	/// Categorical palette for grouping by a payload field.
	pub fn categorical() -> Self {
		Self {
			colors: vec![
				Color::rgb(25, 118, 210),
				Color::rgb(123, 31, 162),
				Color::rgb(230, 81, 0),
				Color::rgb(46, 125, 50),
				Color::rgb(198, 40, 40),
				Color::rgb(0, 131, 143),
				Color::rgb(117, 117, 117),
				Color::rgb(69, 90, 100),
			],
		}
	}

	/// Wraps around; an empty palette yields mid gray.
	pub fn get(&self, index: usize) -> Color {
		if self.colors.is_empty() {
			return Color::rgb(128, 128, 128);
		}
		self.colors[index % self.colors.len()]
	}
}

/// Complete visual theme.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Theme {
	/// Canvas fill.
	pub background: Color,
	/// Node fill when no color accessor or grouping applies.
	pub node: Color,
	/// Default link stroke.
	pub link: Color,
	/// Hover ring around the hovered node.
	pub ring: Color,
	/// Opacity of elements outside the highlight set at full highlight.
	pub dim_alpha: f64,
	/// Used when nodes are auto-colored by a payload field.
	pub palette: NodePalette,
}

impl Theme {
	/// Dark theme with slate nodes (default).
	pub fn dark() -> Self {
		Self {
			background: Color::rgb(22, 27, 34),
			node: Color::rgb(94, 129, 172),
			link: Color::rgba(140, 160, 180, 0.5),
			ring: Color::rgb(255, 255, 255),
			dim_alpha: 0.3,
			palette: NodePalette::categorical(),
		}
	}

	/// Light theme for embedding in documents.
	pub fn light() -> Self {
		Self {
			background: Color::rgb(250, 250, 250),
			node: Color::rgb(69, 90, 100),
			link: Color::rgba(120, 130, 140, 0.6),
			ring: Color::rgb(30, 30, 30),
			dim_alpha: 0.25,
			palette: NodePalette::slate(),
		}
	}
}

impl Default for Theme {
	fn default() -> Self {
		Self::dark()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_css_colors() {
		assert_eq!("#1976d2".parse(), Ok(Color::rgb(25, 118, 210)));
		assert_eq!("#fff".parse(), Ok(Color::rgb(255, 255, 255)));
		assert_eq!("rgb(1, 2, 3)".parse(), Ok(Color::rgb(1, 2, 3)));
		assert_eq!("rgba(1,2,3,0.5)".parse(), Ok(Color::rgba(1, 2, 3, 0.5)));
		assert!("teal".parse::<Color>().is_err());
		assert!("#12345".parse::<Color>().is_err());
		assert!("rgb(300, 0, 0)".parse::<Color>().is_err());
	}

	#[test]
	fn css_output() {
		assert_eq!(Color::rgb(255, 0, 16).to_css(), "#ff0010");
		assert_eq!(Color::rgba(1, 2, 3, 0.25).to_css(), "rgba(1, 2, 3, 0.25)");
		assert_eq!(
			Color::rgb(0, 0, 0).lerp(Color::rgb(200, 100, 50), 0.5),
			Color::rgb(100, 50, 25)
		);
	}

	#[test]
	fn palette_wraps_and_survives_empty() {
		let palette = NodePalette::slate();
		assert_eq!(palette.get(0), palette.get(palette.colors.len()));
		assert_eq!(NodePalette { colors: vec![] }.get(3), Color::rgb(128, 128, 128));
	}

	#[test]
	fn theme_deserializes_partially() {
		let theme: Theme =
			serde_json::from_str(r##"{"background": "#000000", "palette": ["#ff0000"]}"##).unwrap();
		assert_eq!(theme.background, Color::rgb(0, 0, 0));
		assert_eq!(theme.palette.get(5), Color::rgb(255, 0, 0));
		assert_eq!(theme.node, Theme::dark().node);
		assert!(serde_json::from_str::<Theme>(r#"{"link": "nope"}"#).is_err());
	}
}
