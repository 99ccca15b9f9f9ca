//! Visualization state.
//!
//! [`Visualization`] owns everything one canvas shows: the graph model, the
//! style rules with their resolved snapshots, the force simulation, the
//! viewport, the relationship router and the hover highlight animation. The
//! component drives it once per animation frame and on every user action.

use std::collections::{HashMap, HashSet};

use log::{debug, info, warn};

use super::clock::Clock;
use super::error::GraphError;
use super::geometry::{
	Point, RelationshipRouter, RoutingConfig, TextMeasure, fit_caption, to_local, to_world,
};
use super::model::{Graph, Node, NodeIdx, RelIdx};
use super::renderers::{Renderer, Scene, Surface, default_renderers};
use super::simulation::{Simulation, SimulationConfig};
use super::style::{CaptionSubject, GraphStyle, ResolvedStyle, StyleSheet, interpolate};
use super::theme::Theme;
use super::types::{
	CanvasItem, GraphPayload, GraphStats, NeighbourResult, NodeItem, RelationshipRecord, VizItem,
};
use super::viewport::{Bounds, Viewport, ViewportConfig};

/// Alpha the layout is warmed to after a local change such as an expansion.
const NUDGE_ALPHA: f64 = 0.3;

/// Extra pick distance around a relationship shaft, in screen pixels.
const RELATIONSHIP_PICK_SLOP: f64 = 4.0;

/// Behaviour switches and the configs of the parts.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphConfig {
	/// Nodes shown from the initial payload; the rest are dropped.
	pub initial_node_display: usize,
	/// Neighbours rendered per expansion before a notice is shown.
	pub max_neighbours: usize,
	/// Fetch relationships between old and new nodes after an expansion.
	pub auto_complete_relationships: bool,
	pub zoom_to_fit_on_load: bool,
	pub hover_debounce_ms: f64,
	pub double_click_ms: f64,
	pub drag_tolerance_px: f64,
	pub simulation: SimulationConfig,
	pub routing: RoutingConfig,
	pub viewport: ViewportConfig,
}

impl Default for GraphConfig {
	fn default() -> Self {
		Self {
			initial_node_display: 300,
			max_neighbours: 100,
			auto_complete_relationships: true,
			zoom_to_fit_on_load: true,
			hover_debounce_ms: 200.0,
			double_click_ms: 250.0,
			drag_tolerance_px: 5.0,
			simulation: SimulationConfig::default(),
			routing: RoutingConfig::default(),
			viewport: ViewportConfig::default(),
		}
	}
}

/// Resolved style snapshots for the current graph, rebuilt on every graph or
/// style change.
#[derive(Clone, Debug, Default)]
pub struct StyleCache {
	nodes: HashMap<NodeIdx, ResolvedStyle>,
	relationships: HashMap<RelIdx, ResolvedStyle>,
}

impl StyleCache {
	pub fn node(&self, idx: NodeIdx) -> Option<&ResolvedStyle> {
		self.nodes.get(&idx)
	}

	pub fn relationship(&self, idx: RelIdx) -> Option<&ResolvedStyle> {
		self.relationships.get(&idx)
	}
}

/// Manages smooth highlight transitions with per-node intensity tracking.
///
/// Each node has its own intensity (0.0 to 1.0) that eases towards 1.0 while
/// it is in the active highlight set (the hovered node and its neighbours)
/// and decays back to 0.0 afterwards. A minimum hold time keeps the pointer
/// skirting the edge of a node from flashing its neighbourhood.
#[derive(Clone, Debug, Default)]
pub struct HighlightState {
	hovered_node: Option<NodeIdx>,
	hovered_relationship: Option<RelIdx>,
	target_set: HashSet<NodeIdx>,
	/// Nodes not in this map have intensity 0.
	node_intensity: HashMap<NodeIdx, f64>,
	hover_ring_intensity: HashMap<NodeIdx, f64>,
	/// Time remaining before fade-out can begin.
	hold_timer: HashMap<NodeIdx, f64>,
	cached_max: f64,
}

/// Seconds a highlight is held before it can fade out.
const MIN_HOLD_TIME: f64 = 0.12;

impl HighlightState {
	pub fn hovered_node(&self) -> Option<NodeIdx> {
		self.hovered_node
	}

	pub fn hovered_relationship(&self) -> Option<RelIdx> {
		self.hovered_relationship
	}

	/// Update the hovered node and recompute the target highlight set.
	pub fn set_hover(&mut self, node: Option<NodeIdx>, edges: &[(NodeIdx, NodeIdx)]) {
		if self.hovered_node == node {
			return;
		}
		self.hovered_node = node;
		self.target_set.clear();

		if let Some(idx) = node {
			self.target_set.insert(idx);
			for &(src, tgt) in edges {
				if src == idx {
					self.target_set.insert(tgt);
				} else if tgt == idx {
					self.target_set.insert(src);
				}
			}
			for &idx in &self.target_set {
				self.hold_timer.insert(idx, MIN_HOLD_TIME);
			}
		}
	}

	pub fn set_hovered_relationship(&mut self, rel: Option<RelIdx>) {
		self.hovered_relationship = rel;
	}

	/// Drop all state for a node that left the graph.
	pub fn forget(&mut self, idx: NodeIdx) {
		if self.hovered_node == Some(idx) {
			self.hovered_node = None;
		}
		self.target_set.remove(&idx);
		self.node_intensity.remove(&idx);
		self.hover_ring_intensity.remove(&idx);
		self.hold_timer.remove(&idx);
	}

	/// Animate intensities towards their targets with exponential smoothing:
	/// `value += (target - value) * (1 - e^(-speed * dt))`.
	pub fn tick(&mut self, dt: f64) {
		const FADE_IN_SPEED: f64 = 6.0; // ~150ms to 95%
		const FADE_OUT_SPEED: f64 = 4.0; // ~250ms to 95%

		let fade_in_factor = 1.0 - (-FADE_IN_SPEED * dt).exp();
		let fade_out_decay = (-FADE_OUT_SPEED * dt).exp();

		for &idx in &self.target_set {
			let intensity = self.node_intensity.entry(idx).or_insert(0.0);
			*intensity += (1.0 - *intensity) * fade_in_factor;
		}

		if let Some(idx) = self.hovered_node {
			let intensity = self.hover_ring_intensity.entry(idx).or_insert(0.0);
			*intensity += (1.0 - *intensity) * fade_in_factor;
		}

		let mut new_max: f64 = 0.0;

		self.hold_timer.retain(|idx, timer| {
			if self.target_set.contains(idx) {
				true
			} else {
				*timer -= dt;
				*timer > 0.0
			}
		});

		self.node_intensity.retain(|idx, intensity| {
			if !self.target_set.contains(idx) && self.hold_timer.get(idx).copied().unwrap_or(0.0) <= 0.0 {
				*intensity *= fade_out_decay;
			}
			new_max = new_max.max(*intensity);
			self.target_set.contains(idx) || *intensity > 0.005
		});

		self.hover_ring_intensity.retain(|idx, intensity| {
			if self.hovered_node == Some(*idx) {
				return true;
			}
			if self.hold_timer.get(idx).copied().unwrap_or(0.0) <= 0.0 {
				*intensity *= fade_out_decay;
			}
			*intensity > 0.005
		});

		self.cached_max = new_max;
	}

	pub fn node_intensity(&self, idx: NodeIdx) -> f64 {
		self.node_intensity.get(&idx).copied().unwrap_or(0.0)
	}

	pub fn hover_ring_intensity(&self, idx: NodeIdx) -> f64 {
		self.hover_ring_intensity.get(&idx).copied().unwrap_or(0.0)
	}

	/// Geometric mean of the endpoint intensities, so edges keep pace with
	/// their nodes.
	pub fn edge_intensity(&self, idx1: NodeIdx, idx2: NodeIdx) -> f64 {
		(self.node_intensity(idx1) * self.node_intensity(idx2)).sqrt()
	}

	/// Largest intensity of any node, used to dim everything else.
	pub fn max_intensity(&self) -> f64 {
		self.cached_max
	}
}

/// What lies under a screen position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hit {
	Node(NodeIdx),
	Relationship(RelIdx),
	Canvas,
}

/// Result of applying a neighbour answer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExpansionOutcome {
	pub added_nodes: Vec<NodeIdx>,
	pub added_relationships: Vec<RelIdx>,
	/// Message for the host when the data layer held back neighbours.
	pub notice: Option<String>,
}

/// Core visualization state: graph, style, physics, view and highlight.
///
/// Created once when the component mounts, then mutated each frame by the
/// animation loop and by the interaction controller.
pub struct Visualization {
	pub graph: Graph,
	pub style: GraphStyle,
	styles: StyleCache,
	pub simulation: Simulation,
	pub viewport: Viewport,
	pub router: RelationshipRouter,
	pub highlight: HighlightState,
	pub theme: Theme,
	pub config: GraphConfig,
	measure: Box<dyn TextMeasure>,
	renderers: Vec<Box<dyn Renderer>>,
	last_tick_ms: Option<f64>,
	fit_pending: bool,
}

impl Visualization {
	pub fn new(config: GraphConfig, theme: Theme, width: f64, height: f64, measure: Box<dyn TextMeasure>) -> Self {
		Self {
			graph: Graph::new(),
			style: GraphStyle::default(),
			styles: StyleCache::default(),
			simulation: Simulation::new(config.simulation.clone()),
			viewport: Viewport::new(config.viewport.clone(), width, height),
			router: RelationshipRouter::new(config.routing.clone()),
			highlight: HighlightState::default(),
			theme,
			config,
			measure,
			renderers: default_renderers(),
			last_tick_ms: None,
			fit_pending: false,
		}
	}

	pub fn styles(&self) -> &StyleCache {
		&self.styles
	}

	/// Replace the graph with `payload`, lay it out and fit it. Returns a
	/// status message when the payload was truncated.
	pub fn load(&mut self, payload: &GraphPayload, clock: &dyn Clock) -> Option<String> {
		self.graph = Graph::new();
		self.highlight = HighlightState::default();
		self.router.invalidate();

		let limit = self.config.initial_node_display;
		let shown = &payload.nodes[..payload.nodes.len().min(limit)];
		self.graph.add_nodes(shown);
		let (relationships, dropped) = partition_by_endpoints(&self.graph, &payload.relationships);
		if dropped > 0 && payload.nodes.len() <= limit {
			warn!("prop-graph: dropped {} relationships with missing endpoints", dropped);
		}
		if let Err(e) = self.graph.add_relationships(&relationships) {
			warn!("prop-graph: {}", e);
		}

		let all = self.graph.node_indices();
		self.simulation.place_new_nodes(&mut self.graph, &all, Point::default());
		self.update_graph();
		self.simulation.restart();
		self.simulation.precompute(&mut self.graph, clock);
		self.router.layout(&mut self.graph, self.measure.as_ref());
		info!(
			"prop-graph: loaded {} nodes, {} relationships",
			self.graph.node_count(),
			self.graph.relationship_count()
		);

		self.fit_pending = self.config.zoom_to_fit_on_load;
		self.fit_if_settled();

		(payload.nodes.len() > limit).then(|| {
			format!(
				"Not all return nodes are being displayed due to Initial Node Display setting. Only {} of {} nodes are being displayed",
				limit,
				payload.nodes.len()
			)
		})
	}

	/// Re-resolve every style, refit node captions, re-measure relationship
	/// captions and let the renderers rebuild their caches. Positions and the
	/// simulation are left alone.
	pub fn update_graph(&mut self) {
		let measure = self.measure.as_ref();
		self.styles = StyleCache::default();
		for idx in self.graph.node_indices() {
			let Some(node) = self.graph.node_mut(idx) else {
				continue;
			};
			let resolved = self.style.for_node(node);
			node.radius = resolved.number("diameter").map(|d| d / 2.0).unwrap_or(node.radius);
			let font_size = resolved.number("font-size").unwrap_or(10.0);
			let text = interpolate(resolved.get("caption"), CaptionSubject::of_node(node));
			node.caption = fit_caption(&text, node.radius, font_size, measure);
			self.styles.nodes.insert(idx, resolved);
		}
		for (idx, rel) in self.graph.relationships() {
			self.styles.relationships.insert(idx, self.style.for_relationship(rel));
		}
		self.router.measure_captions(&mut self.graph, &self.style, measure);
		self.router.layout(&mut self.graph, measure);

		let scene = Scene {
			graph: &self.graph,
			styles: &self.styles,
			highlight: &self.highlight,
			router: &self.router,
			theme: &self.theme,
		};
		for renderer in &mut self.renderers {
			renderer.on_graph_change(&scene);
		}
		let bounds = self.bounds();
		self.viewport.update_scale_extent(bounds.as_ref());
	}

	/// Apply a new style sheet without touching the layout.
	pub fn restyle(&mut self, sheet: &StyleSheet) {
		self.style.load_rules(sheet);
		self.update_graph();
	}

	pub fn import_grass(&mut self, text: &str) -> bool {
		if !self.style.import_grass(text) {
			return false;
		}
		self.update_graph();
		true
	}

	pub fn reset_style(&mut self) {
		self.style.reset_to_default();
		self.update_graph();
	}

	/// Advance one animation frame. Returns whether the simulation moved.
	pub fn on_tick(&mut self, now_ms: f64) -> bool {
		let dt = self.last_tick_ms.map(|last| (now_ms - last).max(0.0)).unwrap_or(16.0);
		self.last_tick_ms = Some(now_ms);
		let moved = self.simulation.frame(&mut self.graph);
		if moved {
			self.router.layout(&mut self.graph, self.measure.as_ref());
		}
		self.highlight.tick(dt / 1000.0);
		self.fit_if_settled();
		moved
	}

	fn fit_if_settled(&mut self) {
		if self.fit_pending && !self.simulation.is_running() {
			self.fit_pending = false;
			self.zoom_to_fit();
		}
	}

	/// World-space box around every node circle and relationship path.
	pub fn bounds(&self) -> Option<Bounds> {
		let mut bounds: Option<Bounds> = None;
		for (_, node) in self.graph.nodes() {
			let circle = Bounds::around(Point::new(node.x, node.y), node.radius);
			bounds = Some(bounds.map_or(circle, |b| b.union(circle)));
		}
		let mut bounds = bounds?;
		for (_, rel) in self.graph.relationships() {
			let (Some(arrow), Some(source)) = (rel.arrow.as_ref(), self.graph.node(rel.source)) else {
				continue;
			};
			let origin = Point::new(source.x, source.y);
			for p in arrow.sample_points() {
				bounds.include(to_world(p, origin, rel.natural_angle));
			}
		}
		Some(bounds)
	}

	pub fn zoom_to_fit(&mut self) -> bool {
		let bounds = self.bounds();
		let fitted = self.viewport.zoom_to_fit(bounds.as_ref());
		if fitted {
			info!("prop-graph: zoomed to fit (scale {:.3})", self.viewport.transform.k);
		}
		fitted
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.viewport.resize(width, height);
		let bounds = self.bounds();
		self.viewport.update_scale_extent(bounds.as_ref());
	}

	/// Topmost node under a screen position.
	pub fn node_at(&self, sx: f64, sy: f64) -> Option<NodeIdx> {
		let p = self.viewport.screen_to_world(sx, sy);
		self.graph
			.nodes()
			.filter(|(_, n)| Point::new(n.x, n.y).distance(p) <= n.radius)
			.map(|(idx, _)| idx)
			.last()
	}

	/// Relationship whose path passes within reach of a screen position.
	pub fn relationship_at(&self, sx: f64, sy: f64) -> Option<RelIdx> {
		let p = self.viewport.screen_to_world(sx, sy);
		let slop = RELATIONSHIP_PICK_SLOP / self.viewport.transform.k;
		self.graph
			.relationships()
			.filter_map(|(idx, rel)| {
				let arrow = rel.arrow.as_ref()?;
				let source = self.graph.node(rel.source)?;
				let local = to_local(p, Point::new(source.x, source.y), rel.natural_angle);
				let distance = arrow.distance_to(local);
				(distance <= self.router.shaft_width(idx) / 2.0 + slop).then_some((idx, distance))
			})
			.min_by(|a, b| a.1.total_cmp(&b.1))
			.map(|(idx, _)| idx)
	}

	/// Nodes win over relationships, which win over the canvas.
	pub fn hit(&self, sx: f64, sy: f64) -> Hit {
		if let Some(idx) = self.node_at(sx, sy) {
			Hit::Node(idx)
		} else if let Some(idx) = self.relationship_at(sx, sy) {
			Hit::Relationship(idx)
		} else {
			Hit::Canvas
		}
	}

	/// Run every renderer over the current positions.
	pub fn draw(&self, surface: &mut dyn Surface) {
		let scene = Scene {
			graph: &self.graph,
			styles: &self.styles,
			highlight: &self.highlight,
			router: &self.router,
			theme: &self.theme,
		};
		for renderer in &self.renderers {
			renderer.on_tick(&scene, surface);
		}
	}

	pub fn stats(&self) -> GraphStats {
		self.graph.stats()
	}

	pub fn node_item(&self, idx: NodeIdx) -> Option<NodeItem> {
		self.graph.node(idx).map(Node::to_item)
	}

	/// The item the host shows for `hit`.
	pub fn item(&self, hit: Hit) -> Option<VizItem> {
		match hit {
			Hit::Node(idx) => self.node_item(idx).map(VizItem::Node),
			Hit::Relationship(idx) => self.graph.relationship_item(idx).map(VizItem::Relationship),
			Hit::Canvas => Some(VizItem::Canvas(CanvasItem {
				node_count: self.graph.node_count(),
				relationship_count: self.graph.relationship_count(),
			})),
		}
	}

	/// Currently selected node or relationship.
	pub fn selection(&self) -> Option<Hit> {
		self.graph
			.nodes()
			.find(|(_, n)| n.selected)
			.map(|(idx, _)| Hit::Node(idx))
			.or_else(|| {
				self.graph
					.relationships()
					.find(|(_, r)| r.selected)
					.map(|(idx, _)| Hit::Relationship(idx))
			})
	}

	pub fn deselect_all(&mut self) {
		for idx in self.graph.node_indices() {
			if let Some(node) = self.graph.node_mut(idx) {
				node.selected = false;
			}
		}
		for idx in self.graph.relationship_indices() {
			if let Some(rel) = self.graph.relationship_mut(idx) {
				rel.selected = false;
			}
		}
	}

	/// Select `hit` alone. Selecting the canvas clears the selection.
	pub fn select(&mut self, hit: Hit) {
		self.deselect_all();
		match hit {
			Hit::Node(idx) => {
				if let Some(node) = self.graph.node_mut(idx) {
					node.selected = true;
				}
			}
			Hit::Relationship(idx) => {
				if let Some(rel) = self.graph.relationship_mut(idx) {
					rel.selected = true;
				}
			}
			Hit::Canvas => {}
		}
	}

	/// Highlight `node` and its neighbourhood.
	pub fn set_hover(&mut self, node: Option<NodeIdx>) {
		let edges: Vec<(NodeIdx, NodeIdx)> = self.graph.relationships().map(|(_, r)| (r.source, r.target)).collect();
		self.highlight.set_hover(node, &edges);
	}

	/// Pin a node where it is while the pointer is over it.
	pub fn hover_fix(&mut self, idx: NodeIdx) {
		if let Some(node) = self.graph.node_mut(idx) {
			if !node.is_pinned() {
				node.pin_here();
				node.hover_fixed = true;
			}
		}
	}

	/// Release a hover pin. Pins from drags or selection stay.
	pub fn hover_release(&mut self, idx: NodeIdx) {
		if let Some(node) = self.graph.node_mut(idx) {
			if node.hover_fixed {
				node.unpin();
				node.hover_fixed = false;
			}
		}
	}

	/// Move a dragged node and pin it at its new place.
	pub fn drag_node_to(&mut self, idx: NodeIdx, world: Point) {
		if let Some(node) = self.graph.node_mut(idx) {
			node.hover_fixed = false;
			node.x = world.x;
			node.y = world.y;
			node.pin_here();
		}
	}

	fn nudge(&mut self) {
		self.simulation.set_alpha(self.simulation.alpha().max(NUDGE_ALPHA));
	}

	/// Return a node to free movement and deselect it.
	pub fn unlock(&mut self, idx: NodeIdx) -> bool {
		let Some(node) = self.graph.node_mut(idx) else {
			return false;
		};
		node.unpin();
		node.hover_fixed = false;
		node.selected = false;
		self.nudge();
		true
	}

	/// Remove a node and its relationships.
	pub fn dismiss(&mut self, idx: NodeIdx) -> Option<Node> {
		let node = self.graph.remove_node(idx)?;
		self.highlight.forget(idx);
		self.update_graph();
		self.nudge();
		info!("prop-graph: dismissed node {}", node.id);
		Some(node)
	}

	/// Mark a node expanded before its neighbours arrive.
	pub fn mark_expanded(&mut self, idx: NodeIdx, expanded: bool) {
		if let Some(node) = self.graph.node_mut(idx) {
			node.expanded = expanded;
		}
	}

	/// Remove everything the expansion of `idx` introduced.
	pub fn collapse(&mut self, idx: NodeIdx) -> Vec<String> {
		self.mark_expanded(idx, false);
		let before: HashSet<NodeIdx> = self.graph.node_indices().into_iter().collect();
		let removed = self.graph.collapse_node(idx);
		for gone in before.into_iter().filter(|i| self.graph.node(*i).is_none()) {
			self.highlight.forget(gone);
		}
		if !removed.is_empty() {
			self.update_graph();
			self.nudge();
		}
		removed
	}

	/// Add the answer to an expansion of `origin`. New nodes are seeded around
	/// the origin's current position. Nothing is applied when a relationship
	/// references a node that neither the graph nor the answer contains.
	pub fn apply_expansion(&mut self, origin: NodeIdx, result: &NeighbourResult) -> Result<ExpansionOutcome, GraphError> {
		let centre = self
			.graph
			.node(origin)
			.map(|n| Point::new(n.x, n.y))
			.ok_or_else(|| GraphError::UnknownNode(format!("{origin:?}")))?;
		let incoming: HashSet<&str> = result.nodes.iter().map(|n| n.id.as_str()).collect();
		for rel in &result.relationships {
			for end in [&rel.start_node_id, &rel.end_node_id] {
				if self.graph.find_node(end).is_none() && !incoming.contains(end.as_str()) {
					return Err(GraphError::MissingEndpoint {
						relationship: rel.id.clone(),
						node: end.clone(),
					});
				}
			}
		}

		let added_nodes = self.graph.add_expanded_nodes(origin, &result.nodes)?;
		let added_relationships = self.graph.add_relationships(&result.relationships)?;
		self.simulation.place_new_nodes(&mut self.graph, &added_nodes, centre);
		self.update_graph();
		self.nudge();
		info!(
			"prop-graph: expansion added {} nodes, {} relationships",
			added_nodes.len(),
			added_relationships.len()
		);

		let max = self.config.max_neighbours;
		let notice = (result.all_neighbours_count > max).then(|| {
			format!(
				"Rendering was limited to {} of the node's total {} neighbours due to browser config maxNeighbours.",
				max, result.all_neighbours_count
			)
		});
		Ok(ExpansionOutcome {
			added_nodes,
			added_relationships,
			notice,
		})
	}

	/// Add auto-completed relationships between visible nodes. Relationships
	/// to nodes that are gone by now are skipped.
	pub fn apply_internal_relationships(&mut self, payload: &GraphPayload) -> usize {
		let (relationships, dropped) = partition_by_endpoints(&self.graph, &payload.relationships);
		if dropped > 0 {
			debug!("prop-graph: skipped {} internal relationships to removed nodes", dropped);
		}
		match self.graph.add_internal_relationships(&relationships) {
			Ok(added) if !added.is_empty() => {
				self.update_graph();
				added.len()
			}
			Ok(_) => 0,
			Err(e) => {
				warn!("prop-graph: {}", e);
				0
			}
		}
	}

	pub fn prune_internal_relationships(&mut self) -> usize {
		let pruned = self.graph.prune_internal_relationships();
		if pruned > 0 {
			self.update_graph();
		}
		pruned
	}
}

/// Split relationships into those whose endpoints are in `graph` and a count
/// of the rest.
fn partition_by_endpoints(graph: &Graph, records: &[RelationshipRecord]) -> (Vec<RelationshipRecord>, usize) {
	let (kept, dropped): (Vec<_>, Vec<_>) = records.iter().cloned().partition(|r| {
		graph.find_node(&r.start_node_id).is_some() && graph.find_node(&r.end_node_id).is_some()
	});
	(kept, dropped.len())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::clock::ManualClock;
	use crate::components::force_graph::geometry::FixedAdvanceMeasure;
	use crate::components::force_graph::model::tests::{node, rel};
	use crate::components::force_graph::renderers::tests::{Op, RecordingSurface};

	fn visualization() -> Visualization {
		Visualization::new(
			GraphConfig::default(),
			Theme::default(),
			800.0,
			600.0,
			Box::new(FixedAdvanceMeasure::default()),
		)
	}

	fn payload() -> GraphPayload {
		GraphPayload {
			nodes: vec![node("a", &["Person"]), node("b", &["Person"]), node("c", &["Movie"])],
			relationships: vec![rel("ab", "a", "b", "KNOWS"), rel("ac", "a", "c", "ACTED_IN")],
		}
	}

	fn loaded() -> Visualization {
		let mut vis = visualization();
		assert_eq!(vis.load(&payload(), &ManualClock::new(0.0)), None);
		vis
	}

	fn idx(vis: &Visualization, id: &str) -> NodeIdx {
		vis.graph.find_node(id).unwrap()
	}

	#[test]
	fn load_styles_and_lays_out() {
		let vis = loaded();
		assert_eq!(vis.graph.node_count(), 3);
		for (i, n) in vis.graph.nodes() {
			assert_eq!(n.radius, 25.0);
			assert!(n.x.is_finite() && n.y.is_finite());
			assert!(vis.styles().node(i).is_some());
		}
		assert!(vis.graph.relationships().all(|(_, r)| r.arrow.is_some()));
		let person = vis.styles().node(idx(&vis, "a")).unwrap().get("color").to_string();
		assert_eq!(vis.styles().node(idx(&vis, "b")).unwrap().get("color"), person);
	}

	#[test]
	fn initial_display_limit_truncates_with_notice() {
		let mut vis = visualization();
		vis.config.initial_node_display = 2;
		let notice = vis.load(&payload(), &ManualClock::new(0.0)).unwrap();
		assert!(notice.contains("Only 2 of 3 nodes"));
		assert_eq!(vis.graph.node_count(), 2);
		assert_eq!(vis.graph.relationship_count(), 1);
		assert!(vis.graph.is_consistent());
	}

	#[test]
	fn restyle_keeps_positions_and_temperature() {
		let mut vis = loaded();
		let before: Vec<(f64, f64)> = vis.graph.nodes().map(|(_, n)| (n.x, n.y)).collect();
		let alpha = vis.simulation.alpha();
		let sheet = StyleSheet {
			rules: [(
				"node".to_string(),
				[("diameter".to_string(), "80px".to_string())].into_iter().collect(),
			)]
			.into_iter()
			.collect(),
		};
		vis.restyle(&sheet);
		let after: Vec<(f64, f64)> = vis.graph.nodes().map(|(_, n)| (n.x, n.y)).collect();
		assert_eq!(before, after);
		assert_eq!(vis.simulation.alpha(), alpha);
		assert!(vis.graph.nodes().all(|(_, n)| n.radius == 40.0));
	}

	#[test]
	fn bad_grass_keeps_rules() {
		let mut vis = loaded();
		let revision = vis.style.revision();
		assert!(!vis.import_grass("node { color: red;"));
		assert_eq!(vis.style.revision(), revision);
	}

	#[test]
	fn expand_then_collapse_restores_graph() {
		let mut vis = loaded();
		let a = idx(&vis, "a");
		vis.mark_expanded(a, true);
		let result = NeighbourResult {
			nodes: vec![node("d", &["Person"])],
			relationships: vec![rel("ad", "a", "d", "KNOWS")],
			all_neighbours_count: 3,
		};
		let outcome = vis.apply_expansion(a, &result).unwrap();
		assert_eq!(outcome.added_nodes.len(), 1);
		assert_eq!(outcome.notice, None);
		let d = vis.graph.node(idx(&vis, "d")).unwrap();
		let origin = vis.graph.node(a).unwrap();
		assert!(Point::new(d.x, d.y).distance(Point::new(origin.x, origin.y)) > 0.0);

		assert_eq!(vis.collapse(a), vec!["d".to_string()]);
		assert!(vis.graph.find_relationship("ad").is_none());
		assert_eq!(vis.graph.node_count(), 3);
		assert_eq!(vis.graph.relationship_count(), 2);
		assert!(!vis.graph.node(a).unwrap().expanded);
	}

	#[test]
	fn expansion_leaves_unrelated_arrows_alone() {
		let mut vis = loaded();
		let ab = vis.graph.find_relationship("ab").unwrap();
		vis.graph.relationship_mut(ab).unwrap().arrow = None;
		let c = idx(&vis, "c");
		vis.apply_expansion(c, &NeighbourResult {
			nodes: vec![node("d", &[])],
			relationships: vec![rel("cd", "c", "d", "T")],
			all_neighbours_count: 1,
		})
		.unwrap();
		assert!(vis.graph.relationship(ab).unwrap().arrow.is_none());
		let cd = vis.graph.find_relationship("cd").unwrap();
		assert!(vis.graph.relationship(cd).unwrap().arrow.is_some());
	}

	#[test]
	fn expansion_with_dangling_relationship_is_rejected_whole() {
		let mut vis = loaded();
		let a = idx(&vis, "a");
		let result = NeighbourResult {
			nodes: vec![node("d", &[])],
			relationships: vec![rel("ad", "a", "d", "T"), rel("ax", "a", "x", "T")],
			all_neighbours_count: 2,
		};
		assert!(matches!(
			vis.apply_expansion(a, &result),
			Err(GraphError::MissingEndpoint { .. })
		));
		assert!(vis.graph.find_node("d").is_none());
	}

	#[test]
	fn neighbour_limit_notice() {
		let mut vis = loaded();
		vis.config.max_neighbours = 1;
		let a = idx(&vis, "a");
		let outcome = vis
			.apply_expansion(a, &NeighbourResult {
				nodes: vec![node("d", &[])],
				relationships: vec![rel("ad", "a", "d", "T")],
				all_neighbours_count: 5,
			})
			.unwrap();
		assert!(outcome.notice.unwrap().contains("limited to 1 of the node's total 5"));
	}

	#[test]
	fn internal_relationships_skip_removed_nodes() {
		let mut vis = loaded();
		let added = vis.apply_internal_relationships(&GraphPayload {
			nodes: Vec::new(),
			relationships: vec![rel("bc", "b", "c", "T"), rel("bz", "b", "z", "T")],
		});
		assert_eq!(added, 1);
		assert_eq!(vis.prune_internal_relationships(), 1);
		assert!(vis.graph.find_relationship("bc").is_none());
	}

	#[test]
	fn zoom_to_fit_is_idempotent() {
		let mut vis = loaded();
		assert!(vis.zoom_to_fit());
		let first = vis.viewport.transform;
		assert!(vis.zoom_to_fit());
		let second = vis.viewport.transform;
		assert!((first.k - second.k).abs() < 1e-12);
		assert!((first.x - second.x).abs() < 1e-9);
		assert!((first.y - second.y).abs() < 1e-9);
	}

	#[test]
	fn hit_testing_prefers_nodes() {
		let vis = loaded();
		let a = idx(&vis, "a");
		let n = vis.graph.node(a).unwrap();
		let s = vis.viewport.world_to_screen(Point::new(n.x, n.y));
		assert_eq!(vis.hit(s.x, s.y), Hit::Node(a));
		assert_eq!(vis.hit(-10_000.0, -10_000.0), Hit::Canvas);

		let ab = vis.graph.find_relationship("ab").unwrap();
		let r = vis.graph.relationship(ab).unwrap();
		let mid = to_world(r.arrow.as_ref().unwrap().mid_shaft_point(), Point::new(n.x, n.y), r.natural_angle);
		let s = vis.viewport.world_to_screen(mid);
		assert_eq!(vis.hit(s.x, s.y), Hit::Relationship(ab));
	}

	#[test]
	fn hover_fix_releases_unless_pinned_otherwise() {
		let mut vis = loaded();
		let a = idx(&vis, "a");
		vis.hover_fix(a);
		assert!(vis.graph.node(a).unwrap().is_pinned());
		vis.hover_release(a);
		assert!(!vis.graph.node(a).unwrap().is_pinned());

		vis.drag_node_to(a, Point::new(5.0, 5.0));
		vis.hover_fix(a);
		vis.hover_release(a);
		assert!(vis.graph.node(a).unwrap().is_pinned());
		assert!(vis.unlock(a));
		assert!(!vis.graph.node(a).unwrap().is_pinned());
	}

	#[test]
	fn dismiss_removes_node_and_relationships() {
		let mut vis = loaded();
		let a = idx(&vis, "a");
		vis.set_hover(Some(a));
		let gone = vis.dismiss(a).unwrap();
		assert_eq!(gone.id, "a");
		assert_eq!(vis.graph.relationship_count(), 0);
		assert_eq!(vis.highlight.hovered_node(), None);
		assert!(vis.graph.is_consistent());
	}

	#[test]
	fn selection_is_exclusive() {
		let mut vis = loaded();
		let a = idx(&vis, "a");
		let ab = vis.graph.find_relationship("ab").unwrap();
		vis.select(Hit::Node(a));
		vis.select(Hit::Relationship(ab));
		assert_eq!(vis.selection(), Some(Hit::Relationship(ab)));
		vis.select(Hit::Canvas);
		assert_eq!(vis.selection(), None);
	}

	#[test]
	fn highlight_fades_in_and_out() {
		let mut vis = loaded();
		let a = idx(&vis, "a");
		let b = idx(&vis, "b");
		let c = idx(&vis, "c");
		vis.set_hover(Some(a));
		for _ in 0..30 {
			vis.highlight.tick(1.0 / 60.0);
		}
		assert!(vis.highlight.node_intensity(b) > 0.9);
		assert!(vis.highlight.hover_ring_intensity(a) > 0.9);
		assert_eq!(vis.highlight.hover_ring_intensity(b), 0.0);
		vis.set_hover(None);
		for _ in 0..120 {
			vis.highlight.tick(1.0 / 60.0);
		}
		assert_eq!(vis.highlight.node_intensity(c), 0.0);
		assert!(vis.highlight.max_intensity() < 0.01);
	}

	#[test]
	fn draw_paints_every_element() {
		let vis = loaded();
		let mut surface = RecordingSurface::default();
		vis.draw(&mut surface);
		let fills = surface.ops.iter().filter(|op| matches!(op, Op::FillCircle { .. })).count();
		let shafts = surface.ops.iter().filter(|op| matches!(op, Op::StrokePath { .. })).count();
		let heads = surface.ops.iter().filter(|op| matches!(op, Op::FillPolygon { .. })).count();
		assert_eq!(fills, 3);
		assert_eq!(shafts, 2);
		assert_eq!(heads, 2);
		let first_circle = surface.ops.iter().position(|op| matches!(op, Op::FillCircle { .. }));
		let first_shaft = surface.ops.iter().position(|op| matches!(op, Op::StrokePath { .. }));
		assert!(first_shaft < first_circle);
	}

	#[test]
	fn selected_relationship_gets_overlay() {
		let mut vis = loaded();
		let ab = vis.graph.find_relationship("ab").unwrap();
		vis.select(Hit::Relationship(ab));
		let mut surface = RecordingSurface::default();
		vis.draw(&mut surface);
		let selected = vis.theme.ring.selected.to_css();
		assert!(
			surface
				.ops
				.iter()
				.any(|op| matches!(op, Op::StrokePath { color, .. } if *color == selected))
		);
	}

	#[test]
	fn fits_once_the_layout_settles() {
		let mut vis = loaded();
		let mut now = 0.0;
		while vis.simulation.is_running() && now < 60_000.0 {
			now += 16.0;
			vis.on_tick(now);
		}
		assert!(!vis.fit_pending);
		assert_ne!(vis.viewport.transform.k, 1.0);
		vis.viewport.pan(30.0, 0.0);
		let panned = vis.viewport.transform;
		vis.on_tick(now + 16.0);
		assert_eq!(vis.viewport.transform, panned);
	}
}
