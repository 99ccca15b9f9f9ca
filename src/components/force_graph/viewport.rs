//! Pan/zoom transform for the canvas.
//!
//! Screen coordinates are `world * k + (x, y)`. The scale is clamped to an
//! extent whose lower bound follows the graph: it always leaves room to fit
//! every rendered item on screen.

use super::geometry::Point;

/// Zoom limits and factors.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewportConfig {
	pub min_scale: f64,
	pub max_scale: f64,
	/// Fraction of the canvas left empty around a fitted graph.
	pub fit_padding: f64,
	/// The lower scale bound drops to this fraction of the fitting scale.
	pub min_scale_padding: f64,
	pub wheel_zoom_factor: f64,
	/// Factor applied by the zoom in/out controls.
	pub button_zoom_factor: f64,
}

impl Default for ViewportConfig {
	fn default() -> Self {
		Self {
			min_scale: 0.1,
			max_scale: 2.0,
			fit_padding: 0.05,
			min_scale_padding: 0.75,
			wheel_zoom_factor: 1.1,
			button_zoom_factor: 1.3,
		}
	}
}

/// Pan and zoom transform applied to the entire graph view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self { x: 0.0, y: 0.0, k: 1.0 }
	}
}

/// Axis-aligned world-space rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
	pub min: Point,
	pub max: Point,
}

impl Bounds {
	pub fn around(p: Point, radius: f64) -> Self {
		Self {
			min: p - Point::splat(radius),
			max: p + Point::splat(radius),
		}
	}

	pub fn include(&mut self, p: Point) {
		self.min = self.min.min(p);
		self.max = self.max.max(p);
	}

	pub fn union(self, other: Bounds) -> Self {
		let mut out = self;
		out.include(other.min);
		out.include(other.max);
		out
	}

	pub fn width(&self) -> f64 {
		self.max.x - self.min.x
	}

	pub fn height(&self) -> f64 {
		self.max.y - self.min.y
	}

	pub fn center(&self) -> Point {
		(self.min + self.max) / 2.0
	}
}

#[derive(Clone, Debug)]
pub struct Viewport {
	pub config: ViewportConfig,
	pub transform: ViewTransform,
	pub width: f64,
	pub height: f64,
	min_scale: f64,
}

impl Viewport {
	pub fn new(config: ViewportConfig, width: f64, height: f64) -> Self {
		Self {
			min_scale: config.min_scale,
			transform: ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 1.0,
			},
			config,
			width,
			height,
		}
	}

	pub fn min_scale(&self) -> f64 {
		self.min_scale
	}

	pub fn screen_to_world(&self, sx: f64, sy: f64) -> Point {
		Point::new(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	pub fn world_to_screen(&self, p: Point) -> Point {
		Point::new(
			p.x * self.transform.k + self.transform.x,
			p.y * self.transform.k + self.transform.y,
		)
	}

	/// Keep the canvas centre fixed across a resize.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.transform.x += (width - self.width) / 2.0;
		self.transform.y += (height - self.height) / 2.0;
		self.width = width;
		self.height = height;
	}

	pub fn pan(&mut self, dx: f64, dy: f64) {
		self.transform.x += dx;
		self.transform.y += dy;
	}

	/// Scale by `factor` keeping the world point under `(sx, sy)` in place.
	/// Returns false when the scale is already at the limit.
	pub fn zoom_at(&mut self, factor: f64, sx: f64, sy: f64) -> bool {
		let k = (self.transform.k * factor).clamp(self.min_scale, self.config.max_scale);
		if (k - self.transform.k).abs() < f64::EPSILON {
			return false;
		}
		let world = self.screen_to_world(sx, sy);
		self.transform.k = k;
		self.transform.x = sx - world.x * k;
		self.transform.y = sy - world.y * k;
		true
	}

	pub fn zoom_in(&mut self) -> bool {
		self.zoom_at(self.config.button_zoom_factor, self.width / 2.0, self.height / 2.0)
	}

	pub fn zoom_out(&mut self) -> bool {
		self.zoom_at(1.0 / self.config.button_zoom_factor, self.width / 2.0, self.height / 2.0)
	}

	pub fn is_at_max_scale(&self) -> bool {
		self.transform.k >= self.config.max_scale - f64::EPSILON
	}

	pub fn is_at_min_scale(&self) -> bool {
		self.transform.k <= self.min_scale + f64::EPSILON
	}

	/// Scale that fits `bounds` with padding, capped at the maximum scale.
	pub fn fit_scale(&self, bounds: &Bounds) -> f64 {
		let ratio = (bounds.width() / self.width).max(bounds.height() / self.height);
		if ratio <= 0.0 || !ratio.is_finite() {
			return self.config.max_scale;
		}
		((1.0 - self.config.fit_padding) / ratio).min(self.config.max_scale)
	}

	/// Lower the minimum scale so that `bounds` can always be fitted.
	pub fn update_scale_extent(&mut self, bounds: Option<&Bounds>) {
		self.min_scale = match bounds {
			Some(b) => self.config.min_scale.min(self.fit_scale(b) * self.config.min_scale_padding),
			None => self.config.min_scale,
		};
	}

	/// Centre `bounds` on the canvas at the fitting scale. Does nothing
	/// without bounds or with a zero-sized canvas.
	pub fn zoom_to_fit(&mut self, bounds: Option<&Bounds>) -> bool {
		let Some(bounds) = bounds else {
			return false;
		};
		if self.width <= 0.0 || self.height <= 0.0 {
			return false;
		}
		self.update_scale_extent(Some(bounds));
		let k = self.fit_scale(bounds);
		let c = bounds.center();
		self.transform = ViewTransform {
			x: self.width / 2.0 - c.x * k,
			y: self.height / 2.0 - c.y * k,
			k,
		};
		true
	}
}
