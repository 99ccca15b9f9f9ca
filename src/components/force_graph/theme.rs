//! Colors and canvas theming.
//!
//! Per-item colors come from the style model; the theme only covers what the
//! style sheet does not: background, vignette and the selection/hover rings.

/// RGBA color representation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	pub r: u8,
	pub g: u8,
	pub b: u8,
	pub a: f64,
}

impl Color {
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 1.0 }
	}

	pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
		Self { r, g, b, a }
	}

	/// Build a color from hue (degrees), saturation and lightness in 0..1.
	pub fn from_hsl(hue: f64, saturation: f64, lightness: f64) -> Self {
		let h = hue.rem_euclid(360.0) / 60.0;
		let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
		let x = c * (1.0 - (h % 2.0 - 1.0).abs());
		let (r, g, b) = match h as u32 {
			0 => (c, x, 0.0),
			1 => (x, c, 0.0),
			2 => (0.0, c, x),
			3 => (0.0, x, c),
			4 => (x, 0.0, c),
			_ => (c, 0.0, x),
		};
		let m = lightness - c / 2.0;
		let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
		Self::rgb(channel(r), channel(g), channel(b))
	}

	/// Relative luminance in 0..1, used to pick readable text on a fill.
	pub fn luminance(self) -> f64 {
		(0.299 * self.r as f64 + 0.587 * self.g as f64 + 0.114 * self.b as f64) / 255.0
	}

	pub fn to_css(self) -> String {
		if (self.a - 1.0).abs() < 0.001 {
			format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
		} else {
			format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
		}
	}

	/// Parses a CSS color string.
	/// Supports hex (`#RGB`, `#RRGGBB`) and `rgb()`/`rgba()` functional notation.
	pub fn parse(color_str: &str) -> Option<Color> {
		let color_str = color_str.trim();
		if let Some(hex) = color_str.strip_prefix('#') {
			if !hex.is_ascii() {
				return None;
			}
			let channel = |s: &str| u8::from_str_radix(s, 16).ok();
			return match hex.len() {
				6 => Some(Color::rgb(
					channel(&hex[0..2])?,
					channel(&hex[2..4])?,
					channel(&hex[4..6])?,
				)),
				3 => {
					let expand = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
					Some(Color::rgb(expand(0)?, expand(1)?, expand(2)?))
				}
				_ => None,
			};
		}
		if color_str.starts_with("rgb") {
			let nums: Vec<&str> = color_str
				.trim_start_matches("rgba(")
				.trim_start_matches("rgb(")
				.trim_end_matches(')')
				.split(',')
				.collect();
			let r = nums.first()?.trim().parse().ok()?;
			let g = nums.get(1)?.trim().parse().ok()?;
			let b = nums.get(2)?.trim().parse().ok()?;
			let a = nums
				.get(3)
				.and_then(|s| s.trim().parse().ok())
				.unwrap_or(1.0);
			return Some(Color::rgba(r, g, b, a));
		}
		None
	}
}

/// Background style configuration.
#[derive(Clone, Debug)]
pub struct BackgroundStyle {
	/// Primary background color
	pub color: Color,
	/// Secondary color for gradients
	pub color_secondary: Color,
	/// Whether to use radial gradient
	pub use_gradient: bool,
	/// Vignette intensity (0.0 = none, 1.0 = strong)
	pub vignette: f64,
}

/// Rings drawn around selected and hovered items.
#[derive(Clone, Debug)]
pub struct RingStyle {
	pub selected: Color,
	pub hover: Color,
	/// Ring thickness in world units.
	pub width: f64,
}

/// Complete visual theme.
#[derive(Clone, Debug)]
pub struct Theme {
	pub name: &'static str,
	pub background: BackgroundStyle,
	pub ring: RingStyle,
}

impl Theme {
	/// Light canvas matching the default style sheet's dark relationship text.
	pub fn light() -> Self {
		Self {
			name: "light",
			background: BackgroundStyle {
				color: Color::rgb(244, 246, 249),
				color_secondary: Color::rgb(255, 255, 255),
				use_gradient: true,
				vignette: 0.0,
			},
			ring: RingStyle {
				selected: Color::rgba(111, 163, 228, 0.9),
				hover: Color::rgba(111, 163, 228, 0.5),
				width: 8.0,
			},
		}
	}

	/// Elegant dark theme with subtle effects
	pub fn midnight() -> Self {
		Self {
			name: "midnight",
			background: BackgroundStyle {
				color: Color::rgb(18, 20, 28),
				color_secondary: Color::rgb(25, 28, 38),
				use_gradient: true,
				vignette: 0.2,
			},
			ring: RingStyle {
				selected: Color::rgba(180, 200, 255, 0.9),
				hover: Color::rgba(180, 200, 255, 0.45),
				width: 8.0,
			},
		}
	}
}

impl Default for Theme {
	fn default() -> Self {
		Self::light()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_hex_and_functional_colors() {
		assert_eq!(Color::parse("#FFE081"), Some(Color::rgb(255, 224, 129)));
		assert_eq!(Color::parse("#fff"), Some(Color::rgb(255, 255, 255)));
		assert_eq!(Color::parse("rgba(1, 2, 3, 0.5)"), Some(Color::rgba(1, 2, 3, 0.5)));
		assert_eq!(Color::parse("teal"), None);
		assert_eq!(Color::parse("#12"), None);
	}

	#[test]
	fn hsl_primaries() {
		assert_eq!(Color::from_hsl(0.0, 1.0, 0.5), Color::rgb(255, 0, 0));
		assert_eq!(Color::from_hsl(120.0, 1.0, 0.5), Color::rgb(0, 255, 0));
		assert_eq!(Color::from_hsl(240.0, 1.0, 0.5), Color::rgb(0, 0, 255));
	}

	#[test]
	fn light_is_the_default_and_only_dark_themes_vignette() {
		assert_eq!(Theme::default().name, "light");
		assert_eq!(Theme::default().background.vignette, 0.0);
		assert!(Theme::midnight().background.vignette > 0.0);
	}
}
