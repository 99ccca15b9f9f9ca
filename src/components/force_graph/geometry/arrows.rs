//! Arrow paths in a relationship's local frame.
//!
//! The source node sits at the origin and the target at `(centre_distance, 0)`;
//! loops extend along the positive x axis. Callers rotate and translate with
//! [`to_world`](super::to_world).

use std::f64::consts::{PI, TAU};

use super::{Point, to_world};

const ARC_SAMPLES: usize = 24;

/// One drawable piece of an arrow shaft.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathSegment {
	Line { from: Point, to: Point },
	/// Canvas-style arc: angles in radians, increasing angle unless
	/// `anticlockwise`.
	Arc { center: Point, radius: f64, start: f64, end: f64, anticlockwise: bool },
}

impl PathSegment {
	/// The same segment in world space, given the frame's origin and x-axis
	/// direction in degrees.
	pub fn to_world(self, origin: Point, angle_deg: f64) -> PathSegment {
		match self {
			PathSegment::Line { from, to } => PathSegment::Line {
				from: to_world(from, origin, angle_deg),
				to: to_world(to, origin, angle_deg),
			},
			PathSegment::Arc { center, radius, start, end, anticlockwise } => {
				let turn = angle_deg.to_radians();
				PathSegment::Arc {
					center: to_world(center, origin, angle_deg),
					radius,
					start: start + turn,
					end: end + turn,
					anticlockwise,
				}
			}
		}
	}

	fn sample(&self, out: &mut Vec<Point>) {
		match *self {
			PathSegment::Line { from, to } => {
				out.push(from);
				out.push(to);
			}
			PathSegment::Arc { center, radius, start, end, anticlockwise } => {
				let sweep = arc_sweep(start, end, anticlockwise);
				for i in 0..=ARC_SAMPLES {
					let a = start + sweep * i as f64 / ARC_SAMPLES as f64;
					out.push(center + radius * Point::from_angle(a));
				}
			}
		}
	}
}

/// Signed sweep from `start` to `end` in the given direction.
fn arc_sweep(start: f64, end: f64, anticlockwise: bool) -> f64 {
	let forward = (end - start).rem_euclid(TAU);
	if anticlockwise { forward - TAU } else { forward }
}

fn head_triangle(base: Point, tip: Point, head_width: f64) -> Option<[Point; 3]> {
	let len = base.distance(tip);
	if len < f64::EPSILON {
		return None;
	}
	let side = ((tip - base) / len).perp() * (head_width / 2.0);
	Some([tip, base + side, base - side])
}

/// Arrow for a lone relationship, or the middle one of an odd fan.
#[derive(Clone, Debug, PartialEq)]
pub struct StraightArrow {
	pub start: f64,
	pub end: f64,
	pub shaft_length: f64,
	pub head_width: f64,
	pub head_height: f64,
}

impl StraightArrow {
	pub fn new(start_radius: f64, end_radius: f64, centre_distance: f64, head_width: f64, head_height: f64) -> Self {
		let start = start_radius;
		let end = centre_distance - end_radius;
		Self {
			start,
			end,
			shaft_length: (end - start - head_height).max(0.0),
			head_width,
			head_height,
		}
	}

	/// Endpoints overlap; nothing to draw.
	pub fn is_hidden(&self) -> bool {
		self.end - self.start <= 0.0
	}
}

/// Curved arrow for relationships fanned out of a node pair.
#[derive(Clone, Debug, PartialEq)]
pub struct ArcArrow {
	pub deflection: f64,
	pub start_point: Point,
	pub end_point: Point,
	pub tip: Point,
	pub center: Point,
	pub radius: f64,
	pub start_angle: f64,
	pub end_angle: f64,
	pub anticlockwise: bool,
	pub shaft_length: f64,
	pub head_width: f64,
	/// Set when the points are collinear and the arc degenerates to a line.
	pub flat: bool,
}

fn circumcenter(a: Point, b: Point, c: Point) -> Option<Point> {
	let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
	if d.abs() < 1e-9 {
		return None;
	}
	let (a2, b2, c2) = (a.x * a.x + a.y * a.y, b.x * b.x + b.y * b.y, c.x * c.x + c.y * c.y);
	let center = Point::new(
		(a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d,
		(a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d,
	);
	center.is_finite().then_some(center)
}

impl ArcArrow {
	/// `deflection` in degrees; positive bends towards positive local y.
	pub fn new(
		start_radius: f64,
		end_radius: f64,
		centre_distance: f64,
		deflection: f64,
		head_width: f64,
		head_height: f64,
	) -> Self {
		let d = centre_distance;
		let delta = deflection.to_radians();
		let (sin, cos) = delta.sin_cos();
		let start_point = Point::new(start_radius * cos, start_radius * sin);
		let end_point = Point::new(d - (end_radius + head_height) * cos, (end_radius + head_height) * sin);
		let tip = Point::new(d - end_radius * cos, end_radius * sin);
		let apex = Point::new(d / 2.0, d / 2.0 * (delta / 2.0).tan());

		match circumcenter(start_point, apex, end_point) {
			Some(center) => {
				let radius = center.distance(start_point);
				let angle_of = |p: Point| (p.y - center.y).atan2(p.x - center.x);
				let (start_angle, end_angle) = (angle_of(start_point), angle_of(end_point));
				let forward = (end_angle - start_angle).rem_euclid(TAU);
				let through_apex = (angle_of(apex) - start_angle).rem_euclid(TAU) < forward;
				let sweep = if through_apex { forward } else { TAU - forward };
				Self {
					deflection,
					start_point,
					end_point,
					tip,
					center,
					radius,
					start_angle,
					end_angle,
					anticlockwise: !through_apex,
					shaft_length: radius * sweep,
					head_width,
					flat: false,
				}
			}
			None => Self {
				deflection,
				start_point,
				end_point,
				tip,
				center: Point::default(),
				radius: 0.0,
				start_angle: 0.0,
				end_angle: 0.0,
				anticlockwise: false,
				shaft_length: start_point.distance(end_point),
				head_width,
				flat: true,
			},
		}
	}

	fn mid_angle(&self) -> f64 {
		self.start_angle + arc_sweep(self.start_angle, self.end_angle, self.anticlockwise) / 2.0
	}
}

/// Self-relationship drawn as a teardrop leaving and re-entering the node.
#[derive(Clone, Debug, PartialEq)]
pub struct LoopArrow {
	pub start_point: Point,
	pub leave_point: Point,
	pub return_point: Point,
	pub end_point: Point,
	pub tip: Point,
	pub center: Point,
	pub loop_radius: f64,
	pub half_spread: f64,
	pub shaft_length: f64,
	pub head_width: f64,
}

impl LoopArrow {
	/// `spread` is the angle between the outgoing and returning legs, in
	/// degrees.
	pub fn new(node_radius: f64, straight_length: f64, spread: f64, head_width: f64, head_height: f64) -> Self {
		let h = (spread / 2.0).to_radians();
		let (sin, cos) = h.sin_cos();
		let r3 = node_radius + straight_length;
		let center = Point::new(r3 / cos, 0.0);
		let loop_radius = r3 * h.tan();
		let on_leg = |dist: f64, side: f64| Point::new(dist * cos, side * dist * sin);
		let end_dist = (node_radius + head_height).min(r3);
		Self {
			start_point: on_leg(node_radius, -1.0),
			leave_point: on_leg(r3, -1.0),
			return_point: on_leg(r3, 1.0),
			end_point: on_leg(end_dist, 1.0),
			tip: on_leg(node_radius, 1.0),
			center,
			loop_radius,
			half_spread: h,
			shaft_length: straight_length + loop_radius * (PI + 2.0 * h) + (r3 - end_dist),
			head_width,
		}
	}
}

/// The routed shape of one relationship.
#[derive(Clone, Debug, PartialEq)]
pub enum ArrowPath {
	Straight(StraightArrow),
	Arc(ArcArrow),
	Loop(LoopArrow),
}

impl ArrowPath {
	pub fn shaft_length(&self) -> f64 {
		match self {
			ArrowPath::Straight(a) => a.shaft_length,
			ArrowPath::Arc(a) => a.shaft_length,
			ArrowPath::Loop(a) => a.shaft_length,
		}
	}

	/// Angular deflection from the pair's axis, in degrees.
	pub fn deflection(&self) -> f64 {
		match self {
			ArrowPath::Arc(a) => a.deflection,
			_ => 0.0,
		}
	}

	/// Where the caption is anchored.
	pub fn mid_shaft_point(&self) -> Point {
		match self {
			ArrowPath::Straight(a) => Point::new(a.start + a.shaft_length / 2.0, 0.0),
			ArrowPath::Arc(a) if a.flat => (a.start_point + a.end_point) / 2.0,
			ArrowPath::Arc(a) => a.center + a.radius * Point::from_angle(a.mid_angle()),
			ArrowPath::Loop(a) => Point::new(a.center.x + a.loop_radius, 0.0),
		}
	}

	/// Direction of travel at the caption anchor, in local radians.
	pub fn mid_shaft_angle(&self) -> f64 {
		match self {
			ArrowPath::Arc(a) if !a.flat => {
				let m = a.mid_angle();
				if a.anticlockwise { m - PI / 2.0 } else { m + PI / 2.0 }
			}
			ArrowPath::Arc(a) => (a.end_point.y - a.start_point.y).atan2(a.end_point.x - a.start_point.x),
			_ => 0.0,
		}
	}

	pub fn segments(&self) -> Vec<PathSegment> {
		match self {
			ArrowPath::Straight(a) if a.is_hidden() => Vec::new(),
			ArrowPath::Straight(a) => vec![PathSegment::Line {
				from: Point::new(a.start, 0.0),
				to: Point::new(a.start + a.shaft_length, 0.0),
			}],
			ArrowPath::Arc(a) if a.flat => vec![PathSegment::Line {
				from: a.start_point,
				to: a.end_point,
			}],
			ArrowPath::Arc(a) => vec![PathSegment::Arc {
				center: a.center,
				radius: a.radius,
				start: a.start_angle,
				end: a.end_angle,
				anticlockwise: a.anticlockwise,
			}],
			ArrowPath::Loop(a) => {
				let angle = PI / 2.0 + a.half_spread;
				vec![
					PathSegment::Line {
						from: a.start_point,
						to: a.leave_point,
					},
					PathSegment::Arc {
						center: a.center,
						radius: a.loop_radius,
						start: -angle,
						end: angle,
						anticlockwise: false,
					},
					PathSegment::Line {
						from: a.return_point,
						to: a.end_point,
					},
				]
			}
		}
	}

	pub fn head(&self) -> Option<[Point; 3]> {
		match self {
			ArrowPath::Straight(a) if a.is_hidden() => None,
			ArrowPath::Straight(a) => head_triangle(
				Point::new(a.end - a.head_height, 0.0),
				Point::new(a.end, 0.0),
				a.head_width,
			),
			ArrowPath::Arc(a) => head_triangle(a.end_point, a.tip, a.head_width),
			ArrowPath::Loop(a) => head_triangle(a.end_point, a.tip, a.head_width),
		}
	}

	/// Points along the shaft and head, for hit testing and bounds.
	pub fn sample_points(&self) -> Vec<Point> {
		let mut points = Vec::new();
		for segment in self.segments() {
			segment.sample(&mut points);
		}
		if let Some(head) = self.head() {
			points.extend(head);
		}
		points
	}

	/// Shortest distance from a local point to the drawn shaft.
	pub fn distance_to(&self, p: Point) -> f64 {
		let mut best = f64::INFINITY;
		for segment in self.segments() {
			let mut points = Vec::new();
			segment.sample(&mut points);
			for pair in points.windows(2) {
				best = best.min(distance_to_segment(p, pair[0], pair[1]));
			}
		}
		if let Some([tip, a, b]) = self.head() {
			let base = (a + b) / 2.0;
			best = best.min(distance_to_segment(p, base, tip));
		}
		best
	}
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
	let d = b - a;
	let len2 = d.length_squared();
	if len2 < f64::EPSILON {
		return p.distance(a);
	}
	let t = ((p - a).dot(d) / len2).clamp(0.0, 1.0);
	p.distance(a + t * d)
}
