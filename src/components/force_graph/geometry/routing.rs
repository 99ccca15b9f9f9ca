//! Relationship routing: fanning parallel relationships into arcs, placing
//! self-loops in free space, and fitting captions onto the resulting shafts.

use std::collections::{HashMap, HashSet};

use log::debug;

use super::arrows::{ArcArrow, ArrowPath, LoopArrow, StraightArrow};
use super::caption::shorten_caption;
use super::{CaptionLayout, Point, TextMeasure, angle_between};
use crate::components::force_graph::model::{Graph, NodeIdx, RelIdx, Relationship};
use crate::components::force_graph::style::{CaptionSubject, GraphStyle, interpolate};

/// Routing constants.
#[derive(Clone, Debug, PartialEq)]
pub struct RoutingConfig {
	/// Angular step between neighbouring relationships of one pair, degrees.
	pub deflection_step: f64,
	/// Upper bound on the spread of a whole pair, degrees.
	pub max_total_deflection: f64,
	/// Length of a loop's straight legs beyond the node border.
	pub loop_straight_length: f64,
	/// Angle between a loop's legs, degrees.
	pub loop_spread: f64,
	/// Arrow head width beyond the shaft width.
	pub head_extra: f64,
}

impl Default for RoutingConfig {
	fn default() -> Self {
		Self {
			deflection_step: 30.0,
			max_total_deflection: 150.0,
			loop_straight_length: 40.0,
			loop_spread: 30.0,
			head_extra: 6.0,
		}
	}
}

/// Style-derived sizes of one relationship.
#[derive(Clone, Copy, Debug, PartialEq)]
struct RelMetrics {
	shaft_width: f64,
	font_size: f64,
}

impl Default for RelMetrics {
	fn default() -> Self {
		Self {
			shaft_width: 1.0,
			font_size: 8.0,
		}
	}
}

/// What the router last measured for one relationship slot.
#[derive(Clone, Debug, PartialEq)]
struct Measured {
	id: String,
	ends: (NodeIdx, NodeIdx),
	caption: String,
	caption_length: f64,
	metrics: RelMetrics,
}

/// Deflections (degrees) for `count` relationships of one pair, symmetric
/// about zero. The step shrinks when the full fan would exceed `max_total`.
pub fn fan_out_deflections(count: usize, step: f64, max_total: f64) -> Vec<f64> {
	if count <= 1 {
		return vec![0.0; count];
	}
	let gaps = (count - 1) as f64;
	let step = if step * gaps > max_total { max_total / gaps } else { step };
	let middle = gaps / 2.0;
	(0..count).map(|i| step * (i as f64 - middle)).collect()
}

/// Directions (degrees) for `count` loops on a node whose other
/// relationships leave at `occupied`. Loops share the largest free gap.
pub fn loop_angles(occupied: &[f64], count: usize) -> Vec<f64> {
	if count == 0 {
		return Vec::new();
	}
	if occupied.is_empty() {
		let step = 360.0 / count as f64;
		return (0..count).map(|i| step * i as f64).collect();
	}
	let mut angles: Vec<f64> = occupied.iter().map(|a| a.rem_euclid(360.0)).collect();
	angles.sort_by(f64::total_cmp);
	let mut gap_start = angles[angles.len() - 1];
	let mut gap = angles[0] + 360.0 - gap_start;
	for pair in angles.windows(2) {
		if pair[1] - pair[0] > gap {
			gap_start = pair[0];
			gap = pair[1] - pair[0];
		}
	}
	(0..count)
		.map(|i| (gap_start + gap * (i + 1) as f64 / (count + 1) as f64).rem_euclid(360.0))
		.collect()
}

/// Keeps relationship geometry in step with node positions, recomputing
/// only pairs whose endpoints moved, or whose relationships were added,
/// removed or restyled, since the last layout.
#[derive(Debug, Default)]
pub struct RelationshipRouter {
	pub config: RoutingConfig,
	measured: HashMap<RelIdx, Measured>,
	last_positions: HashMap<NodeIdx, (f64, f64, f64)>,
	/// Endpoints of relationships that changed since the last layout.
	touched: HashSet<NodeIdx>,
	invalidated: bool,
}

impl RelationshipRouter {
	pub fn new(config: RoutingConfig) -> Self {
		Self {
			config,
			invalidated: true,
			..Default::default()
		}
	}

	/// Force a full layout on the next call.
	pub fn invalidate(&mut self) {
		self.invalidated = true;
	}

	/// Resolve caption text, caption size and shaft width from the style.
	/// Relationships that are new, gone or measure differently mark their
	/// endpoints for the next layout.
	pub fn measure_captions(&mut self, graph: &mut Graph, style: &GraphStyle, measure: &dyn TextMeasure) {
		let mut previous = std::mem::take(&mut self.measured);
		for idx in graph.relationship_indices() {
			let Some(rel) = graph.relationship_mut(idx) else {
				continue;
			};
			let resolved = style.for_relationship(rel);
			let metrics = RelMetrics {
				shaft_width: resolved.number("shaft-width").unwrap_or(1.0),
				font_size: resolved.number("font-size").unwrap_or(8.0),
			};
			let padding = resolved.number("padding").unwrap_or(3.0);
			let caption = interpolate(resolved.get("caption"), CaptionSubject::of_relationship(rel));
			rel.caption_length = measure.measure(&caption, metrics.font_size) + 2.0 * padding;
			rel.caption_height = metrics.font_size;
			rel.caption = caption;
			rel.caption_layout = if metrics.shaft_width > metrics.font_size && !rel.is_loop() {
				CaptionLayout::Internal
			} else {
				CaptionLayout::External
			};
			let current = Measured {
				id: rel.id.clone(),
				ends: (rel.source, rel.target),
				caption: rel.caption.clone(),
				caption_length: rel.caption_length,
				metrics,
			};
			if previous.remove(&idx).as_ref() != Some(&current) {
				self.touched.extend([rel.source, rel.target]);
			}
			self.measured.insert(idx, current);
		}
		for gone in previous.into_values() {
			self.touched.extend([gone.ends.0, gone.ends.1]);
		}
	}

	fn metrics(&self, idx: RelIdx) -> RelMetrics {
		self.measured.get(&idx).map(|m| m.metrics).unwrap_or_default()
	}

	/// Shaft width of a routed relationship.
	pub fn shaft_width(&self, idx: RelIdx) -> f64 {
		self.metrics(idx).shaft_width
	}

	fn moved_nodes(&self, graph: &Graph) -> HashSet<NodeIdx> {
		graph
			.nodes()
			.filter(|(idx, n)| self.invalidated || self.last_positions.get(idx) != Some(&(n.x, n.y, n.radius)))
			.map(|(idx, _)| idx)
			.collect()
	}

	/// Recompute arrows for every pair touching a node that moved and for
	/// pairs whose relationship set changed.
	pub fn layout(&mut self, graph: &mut Graph, measure: &dyn TextMeasure) {
		let moved = self.moved_nodes(graph);
		let touched = std::mem::take(&mut self.touched);
		if moved.is_empty() && touched.is_empty() {
			return;
		}
		let mut routed = 0;
		for pair in graph.grouped_relationships() {
			if pair.is_loop() {
				let node = pair.node_a;
				let neighbours_moved = graph
					.relationships_of(node)
					.into_iter()
					.filter_map(|r| graph.relationship(r))
					.any(|r| moved.contains(&r.other_end(node)));
				if moved.contains(&node) || touched.contains(&node) || neighbours_moved {
					routed += self.route_loops(graph, node, &pair.relationships, measure);
				}
			} else if moved.contains(&pair.node_a)
				|| moved.contains(&pair.node_b)
				|| (touched.contains(&pair.node_a) && touched.contains(&pair.node_b))
			{
				routed += self.route_pair(graph, pair.node_a, &pair.relationships, measure);
			}
		}
		if routed > 0 && self.invalidated {
			debug!("prop-graph: routed {} relationships", routed);
		}
		self.last_positions = graph.nodes().map(|(idx, n)| (idx, (n.x, n.y, n.radius))).collect();
		self.invalidated = false;
	}

	fn head_size(&self, metrics: RelMetrics) -> (f64, f64) {
		let head_width = metrics.shaft_width + self.config.head_extra;
		(head_width, head_width)
	}

	fn route_pair(&self, graph: &mut Graph, node_a: NodeIdx, rels: &[RelIdx], measure: &dyn TextMeasure) -> usize {
		let deflections = fan_out_deflections(
			rels.len(),
			self.config.deflection_step,
			self.config.max_total_deflection,
		);
		let mut routed = 0;
		for (&idx, &deflection) in rels.iter().zip(&deflections) {
			let Some(rel) = graph.relationship(idx) else {
				continue;
			};
			let (Some(source), Some(target)) = (graph.node(rel.source), graph.node(rel.target)) else {
				continue;
			};
			let (from, to) = (Point::new(source.x, source.y), Point::new(target.x, target.y));
			let (r1, r2) = (source.radius, target.radius);
			let deflection = if rel.source == node_a { deflection } else { -deflection };
			let metrics = self.metrics(idx);
			let (head_width, head_height) = self.head_size(metrics);
			let distance = from.distance(to);
			let arrow = if deflection == 0.0 {
				ArrowPath::Straight(StraightArrow::new(r1, r2, distance, head_width, head_height))
			} else {
				ArrowPath::Arc(ArcArrow::new(r1, r2, distance, deflection, head_width, head_height))
			};
			let angle = angle_between(from, to);
			if let Some(rel) = graph.relationship_mut(idx) {
				rel.natural_angle = angle;
				rel.centre_distance = distance;
				fit_short_caption(rel, &arrow, metrics, measure);
				rel.arrow = Some(arrow);
				routed += 1;
			}
		}
		routed
	}

	fn route_loops(&self, graph: &mut Graph, node: NodeIdx, loops: &[RelIdx], measure: &dyn TextMeasure) -> usize {
		let Some(centre) = graph.node(node).map(|n| (Point::new(n.x, n.y), n.radius)) else {
			return 0;
		};
		let occupied: Vec<f64> = graph
			.relationships_of(node)
			.into_iter()
			.filter_map(|r| graph.relationship(r))
			.filter(|r| !r.is_loop())
			.filter_map(|r| graph.node(r.other_end(node)))
			.map(|other| angle_between(centre.0, Point::new(other.x, other.y)))
			.collect();
		let angles = loop_angles(&occupied, loops.len());
		let mut routed = 0;
		for (&idx, &angle) in loops.iter().zip(&angles) {
			let metrics = self.metrics(idx);
			let (head_width, head_height) = self.head_size(metrics);
			let arrow = ArrowPath::Loop(LoopArrow::new(
				centre.1,
				self.config.loop_straight_length,
				self.config.loop_spread,
				head_width,
				head_height,
			));
			if let Some(rel) = graph.relationship_mut(idx) {
				rel.natural_angle = angle;
				rel.centre_distance = 0.0;
				fit_short_caption(rel, &arrow, metrics, measure);
				rel.arrow = Some(arrow);
				routed += 1;
			}
		}
		routed
	}
}

fn fit_short_caption(
	rel: &mut Relationship,
	arrow: &ArrowPath,
	metrics: RelMetrics,
	measure: &dyn TextMeasure,
) {
	let available = arrow.shaft_length();
	if rel.caption_length <= available {
		rel.short_caption = rel.caption.clone();
		rel.short_caption_length = rel.caption_length;
	} else {
		let (short, width) = shorten_caption(&rel.caption, available, metrics.font_size, measure);
		rel.short_caption = short;
		rel.short_caption_length = width;
	}
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;

	use super::*;
	use crate::components::force_graph::geometry::{FixedAdvanceMeasure, to_world};
	use crate::components::force_graph::model::tests::{node, rel};

	fn place(graph: &mut Graph, id: &str, x: f64, y: f64) {
		let idx = graph.find_node(id).unwrap();
		let n = graph.node_mut(idx).unwrap();
		n.x = x;
		n.y = y;
	}

	fn routed(graph: &mut Graph) -> RelationshipRouter {
		let mut router = RelationshipRouter::new(RoutingConfig::default());
		let measure = FixedAdvanceMeasure::default();
		router.measure_captions(graph, &GraphStyle::new(), &measure);
		router.layout(graph, &measure);
		router
	}

	fn world_mid(graph: &Graph, id: &str) -> Point {
		let r = graph.relationship(graph.find_relationship(id).unwrap()).unwrap();
		let source = graph.node(r.source).unwrap();
		to_world(
			r.arrow.as_ref().unwrap().mid_shaft_point(),
			Point::new(source.x, source.y),
			r.natural_angle,
		)
	}

	#[test]
	fn fan_out_is_symmetric_and_capped() {
		for count in 1..=12 {
			let d = fan_out_deflections(count, 30.0, 150.0);
			assert_eq!(d.len(), count);
			assert!(d.iter().sum::<f64>().abs() < 1e-9);
			let spread = d[count - 1] - d[0];
			assert!(spread <= 150.0 + 1e-9);
			if count % 2 == 1 {
				assert_eq!(d[count / 2], 0.0);
			}
		}
		assert_eq!(fan_out_deflections(2, 30.0, 150.0), vec![-15.0, 15.0]);
		assert_eq!(fan_out_deflections(7, 30.0, 150.0)[0], -75.0);
	}

	#[test]
	fn loops_take_the_largest_gap() {
		assert_eq!(loop_angles(&[0.0], 1), vec![180.0]);
		assert_eq!(loop_angles(&[], 2), vec![0.0, 180.0]);
		let two = loop_angles(&[0.0, 90.0], 1);
		assert!((two[0] - 225.0).abs() < 1e-9);
	}

	#[test]
	fn parallel_same_direction_relationships_do_not_coincide() {
		let mut graph = Graph::new();
		graph.add_nodes(&[node("X", &[]), node("Y", &[])]);
		graph
			.add_relationships(&[rel("r1", "X", "Y", "T"), rel("r2", "X", "Y", "T")])
			.unwrap();
		place(&mut graph, "Y", 200.0, 0.0);
		routed(&mut graph);
		let (a, b) = (world_mid(&graph, "r1"), world_mid(&graph, "r2"));
		assert!(a.distance(b) > 10.0);
		assert!(a.y * b.y < 0.0);
	}

	#[test]
	fn odd_fan_has_straight_middle() {
		let mut graph = Graph::new();
		graph.add_nodes(&[node("a", &[]), node("b", &[])]);
		graph
			.add_relationships(&[rel("1", "a", "b", "T"), rel("2", "b", "a", "T"), rel("3", "a", "b", "T")])
			.unwrap();
		place(&mut graph, "b", 0.0, 150.0);
		routed(&mut graph);
		let middle = graph.relationship(graph.find_relationship("2").unwrap()).unwrap();
		assert!(matches!(middle.arrow, Some(ArrowPath::Straight(_))));
		assert!((middle.natural_angle + 90.0).abs() < 1e-9);
	}

	#[test]
	fn self_loop_avoids_outgoing_relationship() {
		let mut graph = Graph::new();
		graph.add_nodes(&[node("Z", &[]), node("W", &[])]);
		graph
			.add_relationships(&[rel("out", "Z", "W", "T"), rel("self", "Z", "Z", "T")])
			.unwrap();
		place(&mut graph, "W", 120.0, 0.0);
		routed(&mut graph);
		let lp = graph.relationship(graph.find_relationship("self").unwrap()).unwrap();
		assert!((lp.natural_angle - 180.0).abs() < 1e-9);
		assert!(world_mid(&graph, "self").x < 0.0);
	}

	#[test]
	fn coincident_nodes_route_without_nan() {
		let mut graph = Graph::new();
		graph.add_nodes(&[node("a", &[]), node("b", &[])]);
		graph
			.add_relationships(&[rel("1", "a", "b", "T"), rel("2", "a", "b", "T")])
			.unwrap();
		routed(&mut graph);
		for (_, r) in graph.relationships() {
			let arrow = r.arrow.as_ref().unwrap();
			assert!(arrow.sample_points().iter().all(|p| p.is_finite()));
			assert!(r.natural_angle.is_finite());
		}
	}

	#[test]
	fn long_caption_is_shortened_to_shaft() {
		let mut graph = Graph::new();
		graph.add_nodes(&[node("a", &[]), node("b", &[])]);
		graph
			.add_relationships(&[rel("1", "a", "b", "A_VERY_LONG_RELATIONSHIP_TYPE")])
			.unwrap();
		place(&mut graph, "b", 100.0, 0.0);
		routed(&mut graph);
		let r = graph.relationship(graph.find_relationship("1").unwrap()).unwrap();
		assert_eq!(r.caption, "A_VERY_LONG_RELATIONSHIP_TYPE");
		assert!(r.short_caption.ends_with('\u{2026}'));
		assert!(r.short_caption_length < r.arrow.as_ref().unwrap().shaft_length());
	}

	#[test]
	fn unmoved_pairs_are_not_rerouted() {
		let mut graph = Graph::new();
		graph.add_nodes(&[node("a", &[]), node("b", &[]), node("c", &[])]);
		graph
			.add_relationships(&[rel("ab", "a", "b", "T"), rel("bc", "b", "c", "T")])
			.unwrap();
		place(&mut graph, "b", 100.0, 0.0);
		place(&mut graph, "c", 200.0, 0.0);
		let mut router = routed(&mut graph);
		let ab = graph.find_relationship("ab").unwrap();
		graph.relationship_mut(ab).unwrap().arrow = None;
		place(&mut graph, "c", 200.0, 50.0);
		router.layout(&mut graph, &FixedAdvanceMeasure::default());
		assert!(graph.relationship(ab).unwrap().arrow.is_none());
		let bc = graph.find_relationship("bc").unwrap();
		assert!(graph.relationship(bc).unwrap().natural_angle > 0.0);
	}

	#[test]
	fn new_relationship_reroutes_only_its_own_pair() {
		let mut graph = Graph::new();
		graph.add_nodes(&[node("x", &[]), node("y", &[]), node("a", &[]), node("b", &[])]);
		graph
			.add_relationships(&[rel("xy", "x", "y", "T"), rel("ab", "a", "b", "T")])
			.unwrap();
		place(&mut graph, "y", 100.0, 0.0);
		place(&mut graph, "a", 0.0, 100.0);
		place(&mut graph, "b", 100.0, 100.0);
		let mut router = routed(&mut graph);
		let (xy, ab) = (graph.find_relationship("xy").unwrap(), graph.find_relationship("ab").unwrap());
		graph.relationship_mut(xy).unwrap().arrow = None;

		graph.add_relationships(&[rel("ba", "b", "a", "T")]).unwrap();
		let measure = FixedAdvanceMeasure::default();
		router.measure_captions(&mut graph, &GraphStyle::new(), &measure);
		router.layout(&mut graph, &measure);

		assert!(graph.relationship(xy).unwrap().arrow.is_none());
		let ba = graph.find_relationship("ba").unwrap();
		assert!(matches!(graph.relationship(ab).unwrap().arrow, Some(ArrowPath::Arc(_))));
		assert!(matches!(graph.relationship(ba).unwrap().arrow, Some(ArrowPath::Arc(_))));
	}

	#[test]
	fn removed_relationship_straightens_the_survivor() {
		let mut graph = Graph::new();
		graph.add_nodes(&[node("a", &[]), node("b", &[])]);
		graph
			.add_relationships(&[rel("1", "a", "b", "T"), rel("2", "a", "b", "T")])
			.unwrap();
		place(&mut graph, "b", 100.0, 0.0);
		let mut router = routed(&mut graph);
		let one = graph.find_relationship("1").unwrap();
		assert!(matches!(graph.relationship(one).unwrap().arrow, Some(ArrowPath::Arc(_))));

		graph.remove_relationship(graph.find_relationship("2").unwrap());
		let measure = FixedAdvanceMeasure::default();
		router.measure_captions(&mut graph, &GraphStyle::new(), &measure);
		router.layout(&mut graph, &measure);
		assert!(matches!(graph.relationship(one).unwrap().arrow, Some(ArrowPath::Straight(_))));
	}

	proptest! {
		#[test]
		fn fan_out_stays_symmetric_within_the_cap(count in 2usize..40, step in 1.0f64..90.0, max_total in 10.0f64..360.0) {
			let d = fan_out_deflections(count, step, max_total);
			prop_assert_eq!(d.len(), count);
			for i in 0..count {
				prop_assert!((d[i] + d[count - 1 - i]).abs() < 1e-9);
			}
			prop_assert!(d[count - 1] - d[0] <= max_total + 1e-9);
			prop_assert!(d.windows(2).all(|w| w[1] > w[0]));
		}
	}
}
