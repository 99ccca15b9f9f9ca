//! Renderer variants.
//!
//! Each renderer draws one aspect of the scene. `on_graph_change` runs after
//! the graph or the style changed and caches whatever the renderer reads
//! from resolved styles; `on_tick` draws the current positions every frame.
//! Drawing goes through [`Surface`] so the passes can be checked without a
//! browser.

use std::collections::HashMap;
use std::f64::consts::PI;

use super::geometry::{CaptionLayout, PathSegment, Point, RelationshipRouter, to_world};
use super::model::{Graph, NodeIdx, RelIdx};
use super::state::{HighlightState, StyleCache};
use super::theme::Theme;

/// Drawing primitives in world coordinates.
pub trait Surface {
	fn set_alpha(&mut self, alpha: f64);
	fn fill_circle(&mut self, center: Point, radius: f64, color: &str);
	fn stroke_circle(&mut self, center: Point, radius: f64, color: &str, width: f64);
	fn stroke_path(&mut self, segments: &[PathSegment], color: &str, width: f64);
	fn fill_polygon(&mut self, points: &[Point], color: &str);
	/// Text centred horizontally on `at`, rotated by `rotation` radians.
	fn fill_text(&mut self, text: &str, at: Point, rotation: f64, font_size: f64, color: &str);
}

/// Everything a renderer may read.
pub struct Scene<'a> {
	pub graph: &'a Graph,
	pub styles: &'a StyleCache,
	pub highlight: &'a HighlightState,
	pub router: &'a RelationshipRouter,
	pub theme: &'a Theme,
}

impl Scene<'_> {
	/// Opacity of a node while something else is hovered.
	fn node_alpha(&self, idx: NodeIdx) -> f64 {
		let dim = self.highlight.max_intensity();
		let own = self.highlight.node_intensity(idx);
		1.0 - 0.5 * dim * (1.0 - own)
	}

	fn relationship_alpha(&self, source: NodeIdx, target: NodeIdx) -> f64 {
		let dim = self.highlight.max_intensity();
		let own = self.highlight.edge_intensity(source, target);
		1.0 - 0.6 * dim * (1.0 - own)
	}
}

pub trait Renderer {
	fn name(&self) -> &'static str;
	fn on_graph_change(&mut self, scene: &Scene<'_>);
	fn on_tick(&self, scene: &Scene<'_>, surface: &mut dyn Surface);
}

/// The fixed renderer list, in paint order.
pub fn default_renderers() -> Vec<Box<dyn Renderer>> {
	vec![
		Box::new(RelationshipArrow::default()),
		Box::new(RelationshipLabel::default()),
		Box::new(NodeRing::default()),
		Box::new(NodeOutline::default()),
		Box::new(NodeCaption::default()),
	]
}

#[derive(Clone, Debug, PartialEq)]
struct NodeFill {
	fill: String,
	border: String,
	border_width: f64,
}

/// Filled circle with border.
#[derive(Default)]
pub struct NodeOutline {
	fills: HashMap<NodeIdx, NodeFill>,
}

impl Renderer for NodeOutline {
	fn name(&self) -> &'static str {
		"node-outline"
	}

	fn on_graph_change(&mut self, scene: &Scene<'_>) {
		self.fills = scene
			.graph
			.nodes()
			.filter_map(|(idx, _)| {
				let style = scene.styles.node(idx)?;
				Some((
					idx,
					NodeFill {
						fill: style.get("color").to_string(),
						border: style.get("border-color").to_string(),
						border_width: style.number("border-width").unwrap_or(0.0),
					},
				))
			})
			.collect();
	}

	fn on_tick(&self, scene: &Scene<'_>, surface: &mut dyn Surface) {
		for (idx, node) in scene.graph.nodes() {
			let Some(fill) = self.fills.get(&idx) else {
				continue;
			};
			let center = Point::new(node.x, node.y);
			surface.set_alpha(scene.node_alpha(idx));
			surface.fill_circle(center, node.radius, &fill.fill);
			if fill.border_width > 0.0 {
				surface.stroke_circle(center, node.radius, &fill.border, fill.border_width);
			}
		}
		surface.set_alpha(1.0);
	}
}

/// Fitted caption lines inside the node circle.
#[derive(Default)]
pub struct NodeCaption {
	text: HashMap<NodeIdx, (String, f64)>,
}

impl Renderer for NodeCaption {
	fn name(&self) -> &'static str {
		"node-caption"
	}

	fn on_graph_change(&mut self, scene: &Scene<'_>) {
		self.text = scene
			.graph
			.nodes()
			.filter_map(|(idx, _)| {
				let style = scene.styles.node(idx)?;
				let color = style.get("text-color-internal").to_string();
				Some((idx, (color, style.number("font-size").unwrap_or(10.0))))
			})
			.collect();
	}

	fn on_tick(&self, scene: &Scene<'_>, surface: &mut dyn Surface) {
		for (idx, node) in scene.graph.nodes() {
			let Some((color, font_size)) = self.text.get(&idx) else {
				continue;
			};
			surface.set_alpha(scene.node_alpha(idx));
			for line in &node.caption {
				let at = Point::new(node.x, node.y + line.baseline);
				surface.fill_text(&line.text, at, 0.0, *font_size, color);
			}
		}
		surface.set_alpha(1.0);
	}
}

/// Selection and hover rings around nodes.
#[derive(Default)]
pub struct NodeRing {
	selected: String,
	hover: String,
	width: f64,
}

impl Renderer for NodeRing {
	fn name(&self) -> &'static str {
		"node-ring"
	}

	fn on_graph_change(&mut self, scene: &Scene<'_>) {
		self.selected = scene.theme.ring.selected.to_css();
		self.hover = scene.theme.ring.hover.to_css();
		self.width = scene.theme.ring.width;
	}

	fn on_tick(&self, scene: &Scene<'_>, surface: &mut dyn Surface) {
		for (idx, node) in scene.graph.nodes() {
			let center = Point::new(node.x, node.y);
			let radius = node.radius + self.width / 2.0;
			if node.selected {
				surface.stroke_circle(center, radius, &self.selected, self.width);
				continue;
			}
			let hover = scene.highlight.hover_ring_intensity(idx);
			if hover > 0.01 {
				surface.set_alpha(hover);
				surface.stroke_circle(center, radius, &self.hover, self.width);
				surface.set_alpha(1.0);
			}
		}
	}
}

/// Relationship shafts and heads.
#[derive(Default)]
pub struct RelationshipArrow {
	colors: HashMap<RelIdx, String>,
	selected: String,
	hover: String,
	ring_width: f64,
}

impl Renderer for RelationshipArrow {
	fn name(&self) -> &'static str {
		"relationship-arrow"
	}

	fn on_graph_change(&mut self, scene: &Scene<'_>) {
		self.colors = scene
			.graph
			.relationships()
			.filter_map(|(idx, _)| Some((idx, scene.styles.relationship(idx)?.get("color").to_string())))
			.collect();
		self.selected = scene.theme.ring.selected.to_css();
		self.hover = scene.theme.ring.hover.to_css();
		self.ring_width = scene.theme.ring.width;
	}

	fn on_tick(&self, scene: &Scene<'_>, surface: &mut dyn Surface) {
		for (idx, rel) in scene.graph.relationships() {
			let (Some(arrow), Some(color)) = (rel.arrow.as_ref(), self.colors.get(&idx)) else {
				continue;
			};
			let Some(source) = scene.graph.node(rel.source) else {
				continue;
			};
			let origin = Point::new(source.x, source.y);
			let segments: Vec<PathSegment> = arrow
				.segments()
				.into_iter()
				.map(|s| s.to_world(origin, rel.natural_angle))
				.collect();
			let shaft_width = scene.router.shaft_width(idx);
			let overlay = if rel.selected {
				Some(&self.selected)
			} else if scene.highlight.hovered_relationship() == Some(idx) {
				Some(&self.hover)
			} else {
				None
			};
			if let Some(ring) = overlay {
				surface.stroke_path(&segments, ring, shaft_width + self.ring_width);
			}
			surface.set_alpha(scene.relationship_alpha(rel.source, rel.target));
			surface.stroke_path(&segments, color, shaft_width);
			if let Some(head) = arrow.head() {
				let head = head.map(|p| to_world(p, origin, rel.natural_angle));
				surface.fill_polygon(&head, color);
			}
		}
		surface.set_alpha(1.0);
	}
}

#[derive(Clone, Debug, PartialEq)]
struct LabelStyle {
	font_size: f64,
	internal: String,
	external: String,
}

/// Relationship captions along the shaft.
#[derive(Default)]
pub struct RelationshipLabel {
	styles: HashMap<RelIdx, LabelStyle>,
}

impl Renderer for RelationshipLabel {
	fn name(&self) -> &'static str {
		"relationship-label"
	}

	fn on_graph_change(&mut self, scene: &Scene<'_>) {
		self.styles = scene
			.graph
			.relationships()
			.filter_map(|(idx, _)| {
				let style = scene.styles.relationship(idx)?;
				Some((
					idx,
					LabelStyle {
						font_size: style.number("font-size").unwrap_or(8.0),
						internal: style.get("text-color-internal").to_string(),
						external: style.get("text-color-external").to_string(),
					},
				))
			})
			.collect();
	}

	fn on_tick(&self, scene: &Scene<'_>, surface: &mut dyn Surface) {
		for (idx, rel) in scene.graph.relationships() {
			let (Some(arrow), Some(style)) = (rel.arrow.as_ref(), self.styles.get(&idx)) else {
				continue;
			};
			if rel.short_caption.is_empty() {
				continue;
			}
			let Some(source) = scene.graph.node(rel.source) else {
				continue;
			};
			let mut rotation = rel.natural_angle.to_radians() + arrow.mid_shaft_angle();
			if rotation.cos() < 0.0 {
				rotation += PI;
			}
			let mid = to_world(arrow.mid_shaft_point(), Point::new(source.x, source.y), rel.natural_angle);
			let (color, lift) = match rel.caption_layout {
				CaptionLayout::Internal => (&style.internal, -style.font_size * 0.35),
				CaptionLayout::External => (&style.external, scene.router.shaft_width(idx) / 2.0 + 2.0),
			};
			// Shift towards the text's local "up" so the baseline clears the shaft.
			let at = mid + lift * Point::new(rotation.sin(), -rotation.cos());
			surface.set_alpha(scene.relationship_alpha(rel.source, rel.target));
			surface.fill_text(&rel.short_caption, at, rotation, style.font_size, color);
		}
		surface.set_alpha(1.0);
	}
}
