//! Geometry for captions and relationship arrows.
//!
//! Everything here is pure: positions come in, paths and caption lines come
//! out. Text width is supplied through [`TextMeasure`] so the same code runs
//! against a canvas context in the browser and a fixed-advance measurer in
//! tests.

mod arrows;
mod caption;
mod routing;

use glam::DVec2;

pub use arrows::{ArcArrow, ArrowPath, LoopArrow, PathSegment, StraightArrow};
pub use caption::{fit_caption, shorten_caption};
pub use routing::{RelationshipRouter, RoutingConfig, fan_out_deflections, loop_angles};

/// A 2D point or vector in world, screen or arrow-local space.
pub type Point = DVec2;

/// Map a point in an arrow's local frame (source at the origin, x axis along
/// `angle_deg`) to world coordinates.
pub fn to_world(local: Point, origin: Point, angle_deg: f64) -> Point {
	DVec2::from_angle(angle_deg.to_radians()).rotate(local) + origin
}

/// Inverse of [`to_world`].
pub fn to_local(world: Point, origin: Point, angle_deg: f64) -> Point {
	DVec2::from_angle(-angle_deg.to_radians()).rotate(world - origin)
}

/// Angle of the segment `from -> to` in degrees. Coincident points give 0
/// rather than an undefined direction.
pub fn angle_between(from: Point, to: Point) -> f64 {
	let d = to - from;
	if d.abs().max_element() < f64::EPSILON {
		0.0
	} else {
		d.y.atan2(d.x).to_degrees()
	}
}

/// Width of `text` at `font_size` pixels.
pub trait TextMeasure {
	fn measure(&self, text: &str, font_size: f64) -> f64;
}

/// Every character advances by a fixed fraction of the font size.
#[derive(Clone, Copy, Debug)]
pub struct FixedAdvanceMeasure {
	pub advance: f64,
}

impl Default for FixedAdvanceMeasure {
	fn default() -> Self {
		Self { advance: 0.6 }
	}
}

impl TextMeasure for FixedAdvanceMeasure {
	fn measure(&self, text: &str, font_size: f64) -> f64 {
		text.chars().count() as f64 * self.advance * font_size
	}
}

/// One fitted caption line inside a node circle.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptionLine {
	pub text: String,
	/// Vertical offset of the line's baseline from the node centre.
	pub baseline: f64,
	/// Whether the line ends in a removed remainder.
	pub truncated: bool,
}

/// Where a relationship caption is drawn relative to its shaft.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CaptionLayout {
	/// Over the shaft, which is wide enough to hold the text.
	Internal,
	/// Beside the shaft.
	#[default]
	External,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn local_frame_round_trips() {
		let origin = Point::new(10.0, -4.0);
		let world = to_world(Point::new(30.0, 5.0), origin, 135.0);
		let back = to_local(world, origin, 135.0);
		assert!((back.x - 30.0).abs() < 1e-9);
		assert!((back.y - 5.0).abs() < 1e-9);
	}

	#[test]
	fn quarter_turn_maps_local_x_to_world_y() {
		let world = to_world(Point::new(10.0, 0.0), Point::new(1.0, 2.0), 90.0);
		assert!(world.distance(Point::new(1.0, 12.0)) < 1e-9);
		assert!((angle_between(Point::new(1.0, 2.0), world) - 90.0).abs() < 1e-9);
	}

	#[test]
	fn coincident_points_have_zero_angle() {
		let p = Point::new(3.0, 3.0);
		assert_eq!(angle_between(p, p), 0.0);
		assert!((angle_between(Point::default(), Point::new(0.0, 1.0)) - 90.0).abs() < 1e-9);
	}
}
