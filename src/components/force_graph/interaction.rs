//! Pointer interaction.
//!
//! [`PointerFsm`] turns raw pointer events into gestures (drag, pan, click,
//! double-click) with explicit states; time is passed in so the
//! disambiguation runs without real timers. [`InteractionController`] applies
//! gestures to a [`Visualization`], reports items to the host and hands out
//! fetch requests for expansions, which the component runs asynchronously
//! and feeds back through the `complete_*` methods.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::{debug, info, warn};

use super::error::FetchError;
use super::geometry::Point;
use super::model::NodeIdx;
use super::state::{Hit, Visualization};
use super::style::StyleSheet;
use super::types::{ContextMenuItem, GraphPayload, GraphStats, NeighbourResult, VizItem};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerState {
	Idle,
	/// Pressed, not yet moved past the drag tolerance. `second` marks the
	/// second press of a potential double-click.
	PointerDown { target: Hit, start: Point, second: bool },
	/// Dragging a node, or panning when the target is not a node.
	Dragging { target: Hit, last: Point },
	/// Released on a node; becomes a click unless pressed again in time.
	PendingDoubleClick { target: Hit, deadline: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Gesture {
	DragStart { node: NodeIdx, from: Point },
	DragMove { node: NodeIdx, to: Point },
	DragEnd { node: NodeIdx },
	Pan { dx: f64, dy: f64 },
	Click(Hit),
	DoubleClick(NodeIdx),
}

/// Click, drag and double-click disambiguation in screen coordinates.
#[derive(Clone, Debug)]
pub struct PointerFsm {
	state: PointerState,
	tolerance: f64,
	double_click_ms: f64,
}

impl PointerFsm {
	pub fn new(tolerance: f64, double_click_ms: f64) -> Self {
		Self {
			state: PointerState::Idle,
			tolerance,
			double_click_ms,
		}
	}

	pub fn state(&self) -> PointerState {
		self.state
	}

	pub fn is_pressed(&self) -> bool {
		matches!(self.state, PointerState::PointerDown { .. } | PointerState::Dragging { .. })
	}

	/// Press on `target`. A pending click on another target, or one whose
	/// window has passed, is released first.
	pub fn down(&mut self, target: Hit, at: Point, now: f64) -> Option<Gesture> {
		let mut flushed = None;
		let second = match self.state {
			PointerState::PendingDoubleClick { target: pending, deadline } => {
				if pending == target && now <= deadline {
					true
				} else {
					flushed = Some(Gesture::Click(pending));
					false
				}
			}
			_ => false,
		};
		self.state = PointerState::PointerDown {
			target,
			start: at,
			second,
		};
		flushed
	}

	pub fn moved(&mut self, at: Point) -> Vec<Gesture> {
		match self.state {
			PointerState::PointerDown { target, start, .. } if start.distance(at) > self.tolerance => {
				self.state = PointerState::Dragging { target, last: at };
				match target {
					Hit::Node(node) => vec![
						Gesture::DragStart { node, from: start },
						Gesture::DragMove { node, to: at },
					],
					_ => vec![Gesture::Pan {
						dx: at.x - start.x,
						dy: at.y - start.y,
					}],
				}
			}
			PointerState::Dragging { target, last } => {
				self.state = PointerState::Dragging { target, last: at };
				match target {
					Hit::Node(node) => vec![Gesture::DragMove { node, to: at }],
					_ => vec![Gesture::Pan {
						dx: at.x - last.x,
						dy: at.y - last.y,
					}],
				}
			}
			_ => Vec::new(),
		}
	}

	/// Release. Clicks on nodes are held back for the double-click window;
	/// clicks elsewhere are reported at once.
	pub fn up(&mut self, now: f64) -> Option<Gesture> {
		match std::mem::replace(&mut self.state, PointerState::Idle) {
			PointerState::PointerDown {
				target: Hit::Node(node),
				second: true,
				..
			} => Some(Gesture::DoubleClick(node)),
			PointerState::PointerDown {
				target: target @ Hit::Node(_),
				..
			} => {
				self.state = PointerState::PendingDoubleClick {
					target,
					deadline: now + self.double_click_ms,
				};
				None
			}
			PointerState::PointerDown { target, .. } => Some(Gesture::Click(target)),
			PointerState::Dragging {
				target: Hit::Node(node),
				..
			} => Some(Gesture::DragEnd { node }),
			PointerState::Dragging { .. } | PointerState::Idle => None,
			pending @ PointerState::PendingDoubleClick { .. } => {
				self.state = pending;
				None
			}
		}
	}

	/// Fire a held-back click once its window has passed.
	pub fn poll(&mut self, now: f64) -> Option<Gesture> {
		if let PointerState::PendingDoubleClick { target, deadline } = self.state {
			if now > deadline {
				self.state = PointerState::Idle;
				return Some(Gesture::Click(target));
			}
		}
		None
	}

	/// The pointer left the canvas. Drags end, presses are dropped.
	pub fn cancel(&mut self) -> Option<Gesture> {
		match self.state {
			PointerState::Dragging {
				target: Hit::Node(node),
				..
			} => {
				self.state = PointerState::Idle;
				Some(Gesture::DragEnd { node })
			}
			PointerState::Dragging { .. } | PointerState::PointerDown { .. } => {
				self.state = PointerState::Idle;
				None
			}
			_ => None,
		}
	}
}

/// Trailing-edge debounce: only the last value scheduled within `delay`
/// comes out, `delay` after it was scheduled.
#[derive(Clone, Debug)]
pub struct Debouncer<T> {
	delay: f64,
	pending: Option<(T, f64)>,
}

impl<T> Debouncer<T> {
	pub fn new(delay: f64) -> Self {
		Self { delay, pending: None }
	}

	pub fn schedule(&mut self, value: T, now: f64) {
		self.pending = Some((value, now + self.delay));
	}

	pub fn poll(&mut self, now: f64) -> Option<T> {
		match &self.pending {
			Some((_, due)) if now >= *due => self.pending.take().map(|(value, _)| value),
			_ => None,
		}
	}

	pub fn cancel(&mut self) {
		self.pending = None;
	}

	pub fn is_pending(&self) -> bool {
		self.pending.is_some()
	}
}

/// Identifies one in-flight fetch for a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExpansionTicket {
	pub node: NodeIdx,
	generation: u64,
}

/// Hands out tickets and remembers which one is current per node, so that
/// answers arriving after a collapse or a newer request are dropped.
#[derive(Clone, Debug, Default)]
pub struct ExpansionTracker {
	current: HashMap<NodeIdx, u64>,
	next: u64,
}

impl ExpansionTracker {
	pub fn begin(&mut self, node: NodeIdx) -> ExpansionTicket {
		self.next += 1;
		self.current.insert(node, self.next);
		ExpansionTicket {
			node,
			generation: self.next,
		}
	}

	pub fn cancel(&mut self, node: NodeIdx) -> bool {
		self.current.remove(&node).is_some()
	}

	pub fn is_current(&self, ticket: &ExpansionTicket) -> bool {
		self.current.get(&ticket.node) == Some(&ticket.generation)
	}

	/// Retire `ticket`. Returns false when it was stale.
	pub fn finish(&mut self, ticket: &ExpansionTicket) -> bool {
		if !self.is_current(ticket) {
			return false;
		}
		self.current.remove(&ticket.node);
		true
	}

	pub fn in_flight(&self) -> usize {
		self.current.len()
	}

	/// Cancel every ticket whose node fails `keep`. Node indices are reused
	/// after removal, so tickets must not outlive their node.
	pub fn retain(&mut self, mut keep: impl FnMut(NodeIdx) -> bool) {
		self.current.retain(|node, _| keep(*node));
	}

	/// Cancel everything. Generations keep counting so old tickets stay stale.
	pub fn clear(&mut self) {
		self.current.clear();
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExpansionRequest {
	pub ticket: ExpansionTicket,
	pub node_id: String,
	pub current_neighbour_ids: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InternalRequest {
	pub ticket: ExpansionTicket,
	pub existing_node_ids: Vec<String>,
	pub new_node_ids: Vec<String>,
}

/// Work the component must run against the neighbour source.
#[derive(Clone, Debug, PartialEq)]
pub enum FetchRequest {
	Neighbours(ExpansionRequest),
	Internal(InternalRequest),
}

/// Host callbacks. Unset callbacks are skipped.
#[derive(Clone, Default)]
pub struct GraphCallbacks {
	pub on_item_select: Option<Rc<dyn Fn(VizItem)>>,
	pub on_item_mouse_over: Option<Rc<dyn Fn(VizItem)>>,
	pub on_graph_model_change: Option<Rc<dyn Fn(GraphStats)>>,
	pub update_style: Option<Rc<dyn Fn(StyleSheet)>>,
}

impl fmt::Debug for GraphCallbacks {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("GraphCallbacks")
			.field("on_item_select", &self.on_item_select.is_some())
			.field("on_item_mouse_over", &self.on_item_mouse_over.is_some())
			.field("on_graph_model_change", &self.on_graph_model_change.is_some())
			.field("update_style", &self.update_style.is_some())
			.finish()
	}
}

impl GraphCallbacks {
	pub fn item_select(&self, item: VizItem) {
		if let Some(cb) = &self.on_item_select {
			cb(item);
		}
	}

	pub fn item_mouse_over(&self, item: VizItem) {
		if let Some(cb) = &self.on_item_mouse_over {
			cb(item);
		}
	}

	pub fn graph_model_change(&self, stats: GraphStats) {
		if let Some(cb) = &self.on_graph_model_change {
			cb(stats);
		}
	}

	pub fn style_change(&self, sheet: StyleSheet) {
		if let Some(cb) = &self.update_style {
			cb(sheet);
		}
	}
}

/// Applies pointer gestures and controller commands to a visualization.
pub struct InteractionController {
	pub callbacks: GraphCallbacks,
	fsm: PointerFsm,
	mouse_over: Debouncer<VizItem>,
	expansions: ExpansionTracker,
	hovered: Hit,
	/// Grab point of the dragged node relative to the pointer, in world units.
	drag_offset: Point,
	viewport_moved: bool,
}

impl InteractionController {
	pub fn new(vis: &Visualization, callbacks: GraphCallbacks) -> Self {
		Self {
			callbacks,
			fsm: PointerFsm::new(vis.config.drag_tolerance_px, vis.config.double_click_ms),
			mouse_over: Debouncer::new(vis.config.hover_debounce_ms),
			expansions: ExpansionTracker::default(),
			hovered: Hit::Canvas,
			drag_offset: Point::default(),
			viewport_moved: false,
		}
	}

	pub fn pointer_state(&self) -> PointerState {
		self.fsm.state()
	}

	pub fn expansions_in_flight(&self) -> usize {
		self.expansions.in_flight()
	}

	/// Forget per-graph state after the visualization loaded a new graph.
	pub fn reset(&mut self) {
		self.fsm.cancel();
		self.mouse_over.cancel();
		self.expansions.clear();
		self.hovered = Hit::Canvas;
		self.viewport_moved = false;
	}

	/// Report the freshly loaded graph to the host.
	pub fn announce(&self, vis: &Visualization, status: Option<String>) {
		self.callbacks.graph_model_change(vis.stats());
		self.callbacks.style_change(vis.style.to_sheet());
		if let Some(status) = status {
			self.callbacks.item_mouse_over(VizItem::StatusItem(status));
		}
	}

	pub fn pointer_down(&mut self, vis: &mut Visualization, sx: f64, sy: f64, now: f64) -> Option<FetchRequest> {
		self.viewport_moved = false;
		let target = vis.hit(sx, sy);
		let flushed = self.fsm.down(target, Point::new(sx, sy), now);
		flushed.and_then(|g| self.apply(vis, g))
	}

	pub fn pointer_move(&mut self, vis: &mut Visualization, sx: f64, sy: f64, now: f64) -> Option<FetchRequest> {
		if !self.fsm.is_pressed() {
			let hit = vis.hit(sx, sy);
			self.hover(vis, hit, now);
			return None;
		}
		let mut request = None;
		for gesture in self.fsm.moved(Point::new(sx, sy)) {
			request = request.or(self.apply(vis, gesture));
		}
		request
	}

	pub fn pointer_up(&mut self, vis: &mut Visualization, now: f64) -> Option<FetchRequest> {
		self.fsm.up(now).and_then(|g| self.apply(vis, g))
	}

	pub fn pointer_leave(&mut self, vis: &mut Visualization) {
		if let Some(g) = self.fsm.cancel() {
			self.apply(vis, g);
		}
		self.hover(vis, Hit::Canvas, f64::NEG_INFINITY);
		self.mouse_over.cancel();
	}

	/// Zoom around the cursor.
	pub fn wheel(&mut self, vis: &mut Visualization, delta_y: f64, sx: f64, sy: f64) {
		let step = vis.viewport.config.wheel_zoom_factor;
		let factor = if delta_y > 0.0 { 1.0 / step } else { step };
		if vis.viewport.zoom_at(factor, sx, sy) && self.fsm.is_pressed() {
			self.viewport_moved = true;
		}
	}

	/// Timers: held-back clicks and the debounced mouse-over report.
	pub fn poll(&mut self, vis: &mut Visualization, now: f64) -> Option<FetchRequest> {
		if let Some(item) = self.mouse_over.poll(now) {
			self.callbacks.item_mouse_over(item);
		}
		self.fsm.poll(now).and_then(|g| self.apply(vis, g))
	}

	fn hover(&mut self, vis: &mut Visualization, hit: Hit, now: f64) {
		if hit == self.hovered {
			return;
		}
		match self.hovered {
			Hit::Node(idx) => {
				vis.hover_release(idx);
				vis.set_hover(None);
			}
			Hit::Relationship(_) => vis.highlight.set_hovered_relationship(None),
			Hit::Canvas => {}
		}
		match hit {
			Hit::Node(idx) => {
				vis.hover_fix(idx);
				vis.set_hover(Some(idx));
			}
			Hit::Relationship(idx) => vis.highlight.set_hovered_relationship(Some(idx)),
			Hit::Canvas => {}
		}
		self.hovered = hit;
		if now.is_finite() {
			if let Some(item) = vis.item(hit) {
				self.mouse_over.schedule(item, now);
			}
		}
	}

	fn apply(&mut self, vis: &mut Visualization, gesture: Gesture) -> Option<FetchRequest> {
		match gesture {
			Gesture::DragStart { node, from } => {
				if let Some(n) = vis.graph.node(node) {
					let grab = vis.viewport.screen_to_world(from.x, from.y);
					self.drag_offset = Point::new(n.x, n.y) - grab;
				}
				vis.simulation.start_drag();
				None
			}
			Gesture::DragMove { node, to } => {
				let world = vis.viewport.screen_to_world(to.x, to.y);
				vis.drag_node_to(node, world + self.drag_offset);
				None
			}
			Gesture::DragEnd { .. } => {
				vis.simulation.end_drag();
				None
			}
			Gesture::Pan { dx, dy } => {
				vis.viewport.pan(dx, dy);
				self.viewport_moved = true;
				None
			}
			Gesture::Click(hit) => {
				self.click(vis, hit);
				None
			}
			Gesture::DoubleClick(node) => self.toggle_expansion(vis, node),
		}
	}

	fn click(&mut self, vis: &mut Visualization, hit: Hit) {
		let already = vis.selection() == Some(hit);
		match hit {
			Hit::Canvas if self.viewport_moved => return,
			Hit::Canvas => vis.deselect_all(),
			_ if already => vis.deselect_all(),
			Hit::Node(idx) => {
				vis.select(hit);
				if let Some(node) = vis.graph.node_mut(idx) {
					node.hover_fixed = false;
				}
			}
			Hit::Relationship(_) => vis.select(hit),
		}
		let reported = if already || hit == Hit::Canvas { Hit::Canvas } else { hit };
		if let Some(item) = vis.item(reported) {
			self.callbacks.item_select(item);
		}
	}

	/// Expand a collapsed node or collapse an expanded one.
	pub fn toggle_expansion(&mut self, vis: &mut Visualization, node: NodeIdx) -> Option<FetchRequest> {
		let expanded = vis.graph.node(node)?.expanded;
		if expanded {
			self.collapse(vis, node);
			None
		} else {
			self.expand(vis, node).map(FetchRequest::Neighbours)
		}
	}

	pub fn expand(&mut self, vis: &mut Visualization, node: NodeIdx) -> Option<ExpansionRequest> {
		let node_id = vis.graph.node(node)?.id.clone();
		vis.mark_expanded(node, true);
		let ticket = self.expansions.begin(node);
		Some(ExpansionRequest {
			ticket,
			node_id,
			current_neighbour_ids: vis.graph.find_node_neighbour_ids(node),
		})
	}

	pub fn collapse(&mut self, vis: &mut Visualization, node: NodeIdx) {
		let revision = vis.style.revision();
		self.expansions.cancel(node);
		let removed = vis.collapse(node);
		info!("prop-graph: collapsed {} nodes", removed.len());
		self.forget_removed(vis);
		self.report_model_change(vis, revision);
	}

	/// Report the graph stats, and the style sheet when resolving styles
	/// added rules since `revision`.
	fn report_model_change(&self, vis: &Visualization, revision: u64) {
		self.callbacks.graph_model_change(vis.stats());
		if vis.style.revision() != revision {
			self.callbacks.style_change(vis.style.to_sheet());
		}
	}

	fn forget_removed(&mut self, vis: &Visualization) {
		self.expansions.retain(|idx| vis.graph.contains_node(idx));
		if let Hit::Node(idx) = self.hovered {
			if vis.graph.node(idx).is_none() {
				self.hovered = Hit::Canvas;
			}
		}
		if let Hit::Relationship(idx) = self.hovered {
			if vis.graph.relationship(idx).is_none() {
				self.hovered = Hit::Canvas;
			}
		}
	}

	/// Apply the answer to an expansion. A failed fetch counts as an empty
	/// answer; the node stays expanded. An answer that cannot be applied is
	/// reported and the node reverts to collapsed. Returns the follow-up
	/// request for auto-completed relationships, if any.
	pub fn complete_expansion(
		&mut self,
		vis: &mut Visualization,
		ticket: ExpansionTicket,
		result: Result<NeighbourResult, FetchError>,
	) -> Option<FetchRequest> {
		if !self.expansions.finish(&ticket) || vis.graph.node(ticket.node).is_none() {
			debug!("prop-graph: dropping stale expansion result");
			return None;
		}
		let result = match result {
			Ok(result) => result,
			Err(e) => {
				warn!("prop-graph: neighbour fetch failed: {}", e);
				self.callbacks
					.item_mouse_over(VizItem::StatusItem(format!("Failed to fetch neighbours: {e}")));
				NeighbourResult::default()
			}
		};
		let revision = vis.style.revision();
		let outcome = match vis.apply_expansion(ticket.node, &result) {
			Ok(outcome) => outcome,
			Err(e) => {
				warn!("prop-graph: rejected neighbours: {}", e);
				vis.mark_expanded(ticket.node, false);
				self.callbacks
					.item_mouse_over(VizItem::StatusItem(format!("Failed to apply neighbours: {e}")));
				self.callbacks.graph_model_change(vis.stats());
				return None;
			}
		};
		if let Some(notice) = outcome.notice {
			self.callbacks.item_mouse_over(VizItem::StatusItem(notice));
		}
		self.report_model_change(vis, revision);

		if !vis.config.auto_complete_relationships {
			vis.prune_internal_relationships();
			return None;
		}
		if outcome.added_nodes.is_empty() {
			return None;
		}
		let new_node_ids: Vec<String> = outcome
			.added_nodes
			.iter()
			.filter_map(|idx| vis.graph.node(*idx).map(|n| n.id.clone()))
			.collect();
		let existing_node_ids = vis
			.graph
			.node_ids()
			.into_iter()
			.filter(|id| !new_node_ids.contains(id))
			.collect();
		Some(FetchRequest::Internal(InternalRequest {
			ticket: self.expansions.begin(ticket.node),
			existing_node_ids,
			new_node_ids,
		}))
	}

	pub fn complete_internal(
		&mut self,
		vis: &mut Visualization,
		ticket: ExpansionTicket,
		result: Result<GraphPayload, FetchError>,
	) {
		if !self.expansions.finish(&ticket) {
			debug!("prop-graph: dropping stale internal relationships");
			return;
		}
		match result {
			Ok(payload) => {
				if vis.apply_internal_relationships(&payload) > 0 {
					self.callbacks.graph_model_change(vis.stats());
				}
			}
			Err(e) => warn!("prop-graph: internal relationship fetch failed: {}", e),
		}
	}

	/// Release a node's pin by id.
	pub fn unlock(&mut self, vis: &mut Visualization, node_id: &str) -> bool {
		vis.graph.find_node(node_id).is_some_and(|idx| vis.unlock(idx))
	}

	/// Remove a node by id.
	pub fn dismiss(&mut self, vis: &mut Visualization, node_id: &str) -> bool {
		let Some(idx) = vis.graph.find_node(node_id) else {
			return false;
		};
		let revision = vis.style.revision();
		self.expansions.cancel(idx);
		let removed = vis.dismiss(idx).is_some();
		self.forget_removed(vis);
		if removed {
			self.report_model_change(vis, revision);
		}
		removed
	}

	/// Apply a style sheet and report the resulting sheet.
	pub fn restyle(&mut self, vis: &mut Visualization, sheet: &StyleSheet) {
		vis.restyle(sheet);
		self.callbacks.style_change(vis.style.to_sheet());
	}

	pub fn import_grass(&mut self, vis: &mut Visualization, text: &str) -> bool {
		let applied = vis.import_grass(text);
		if applied {
			self.callbacks.style_change(vis.style.to_sheet());
		}
		applied
	}

	pub fn reset_style(&mut self, vis: &mut Visualization) {
		vis.reset_style();
		self.callbacks.style_change(vis.style.to_sheet());
	}

	/// The pointer is over an entry of the node context menu.
	pub fn context_menu_hover(&self, label: &str, content: &str, selection: &str) {
		self.callbacks.item_mouse_over(VizItem::ContextMenuItem(ContextMenuItem {
			label: label.to_string(),
			content: content.to_string(),
			selection: selection.to_string(),
		}));
	}
}
