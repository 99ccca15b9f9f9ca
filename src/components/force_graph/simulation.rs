//! Force-directed layout.
//!
//! A velocity Verlet style solver in the manner of d3-force: each tick cools
//! `alpha` towards `alpha_target`, accumulates velocity from charge, centring,
//! link and collision forces, applies friction and moves every unpinned node.
//! The simulation stops once `alpha` drops below `alpha_min`.

use std::f64::consts::TAU;

use log::debug;

use super::clock::Clock;
use super::geometry::Point;
use super::model::{Graph, NodeIdx};

/// Physics constants.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationConfig {
	/// Many-body strength; negative repels.
	pub charge: f64,
	/// Pull of the x/y centring forces towards the origin.
	pub center_strength: f64,
	/// Link length beyond the two node radii.
	pub link_distance: f64,
	/// Collision radius beyond the node radius.
	pub collide_padding: f64,
	/// Fraction of velocity lost per tick.
	pub velocity_decay: f64,
	pub alpha_min: f64,
	pub alpha_decay: f64,
	pub precompute_max_ticks: usize,
	pub precompute_budget_ms: f64,
	/// Temperature set when a drag starts.
	pub drag_alpha: f64,
	/// Temperature held for the duration of a drag.
	pub drag_alpha_target: f64,
	/// Additional ticks per animation frame while running.
	pub extra_ticks_per_frame: usize,
	/// Radius of the circle new nodes are seeded on.
	pub layout_radius: f64,
}

impl Default for SimulationConfig {
	fn default() -> Self {
		let alpha_min = 0.05;
		Self {
			charge: -400.0,
			center_strength: 0.03,
			link_distance: 45.0,
			collide_padding: 25.0,
			velocity_decay: 0.4,
			alpha_min,
			alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
			precompute_max_ticks: 300,
			precompute_budget_ms: 250.0,
			drag_alpha: 0.8,
			drag_alpha_target: 0.09,
			extra_ticks_per_frame: 1,
			layout_radius: 75.0,
		}
	}
}

/// Snapshot of one node's physics state, indexed densely during a tick.
#[derive(Clone, Copy)]
struct Body {
	x: f64,
	y: f64,
	vx: f64,
	vy: f64,
	radius: f64,
	fixed: Option<(f64, f64)>,
}

/// Per-tick working set, kept between ticks so a tick does not allocate
/// once the graph has stopped growing.
#[derive(Default)]
struct Scratch {
	indices: Vec<NodeIdx>,
	/// Dense body position by node index slot.
	slots: Vec<Option<usize>>,
	bodies: Vec<Body>,
	links: Vec<(usize, usize)>,
	degree: Vec<usize>,
}

impl Scratch {
	fn load(&mut self, graph: &Graph) {
		self.indices.clear();
		self.bodies.clear();
		self.links.clear();
		self.slots.clear();
		self.slots.resize(graph.node_bound(), None);
		for (idx, n) in graph.nodes() {
			self.slots[idx.index()] = Some(self.bodies.len());
			self.indices.push(idx);
			self.bodies.push(Body {
				x: n.x,
				y: n.y,
				vx: n.vx,
				vy: n.vy,
				radius: n.radius,
				fixed: n.fx.zip(n.fy),
			});
		}
		for (_, r) in graph.relationships() {
			if r.is_loop() {
				continue;
			}
			let slot = |idx: NodeIdx| self.slots.get(idx.index()).copied().flatten();
			if let (Some(s), Some(t)) = (slot(r.source), slot(r.target)) {
				self.links.push((s, t));
			}
		}
		self.degree.clear();
		self.degree.resize(self.bodies.len(), 0);
		for &(s, t) in &self.links {
			self.degree[s] += 1;
			self.degree[t] += 1;
		}
	}
}

pub struct Simulation {
	pub config: SimulationConfig,
	alpha: f64,
	alpha_target: f64,
	seed: u32,
	scratch: Scratch,
}

impl Simulation {
	pub fn new(config: SimulationConfig) -> Self {
		Self {
			config,
			alpha: 1.0,
			alpha_target: 0.0,
			seed: 1,
			scratch: Scratch::default(),
		}
	}

	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	pub fn alpha_target(&self) -> f64 {
		self.alpha_target
	}

	pub fn set_alpha(&mut self, alpha: f64) {
		self.alpha = alpha.clamp(0.0, 1.0);
	}

	pub fn is_running(&self) -> bool {
		self.alpha >= self.config.alpha_min
	}

	/// Reheat fully.
	pub fn restart(&mut self) {
		self.alpha = 1.0;
	}

	/// Reheat and hold warm while a node is dragged.
	pub fn start_drag(&mut self) {
		self.alpha_target = self.config.drag_alpha_target;
		self.alpha = self.alpha.max(self.config.drag_alpha);
	}

	/// Let the layout cool down after a drag.
	pub fn end_drag(&mut self) {
		self.alpha_target = 0.0;
	}

	/// Linear congruential generator for tie-breaking coincident nodes, so
	/// layouts are reproducible.
	fn jiggle(&mut self) -> f64 {
		self.seed = self.seed.wrapping_mul(1664525).wrapping_add(1013904223);
		(self.seed as f64 / u32::MAX as f64 - 0.5) * 1e-6
	}

	/// Advance one step.
	pub fn tick(&mut self, graph: &mut Graph) {
		self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;

		let mut scratch = std::mem::take(&mut self.scratch);
		scratch.load(graph);
		self.apply_links(&mut scratch.bodies, &scratch.links, &scratch.degree);
		self.apply_charge(&mut scratch.bodies);
		self.apply_centering(&mut scratch.bodies);
		self.apply_collisions(&mut scratch.bodies);

		let keep = 1.0 - self.config.velocity_decay;
		for (idx, body) in scratch.indices.iter().zip(&scratch.bodies) {
			let Some(node) = graph.node_mut(*idx) else {
				continue;
			};
			match body.fixed {
				Some((fx, fy)) => {
					node.x = fx;
					node.y = fy;
					node.vx = 0.0;
					node.vy = 0.0;
				}
				None => {
					node.vx = body.vx * keep;
					node.vy = body.vy * keep;
					node.x += node.vx;
					node.y += node.vy;
				}
			}
		}
		self.scratch = scratch;
	}

	fn apply_links(&mut self, bodies: &mut [Body], links: &[(usize, usize)], degree: &[usize]) {
		for &(s, t) in links {
			let (source, target) = (bodies[s], bodies[t]);
			let mut x = target.x + target.vx - source.x - source.vx;
			let mut y = target.y + target.vy - source.y - source.vy;
			if x == 0.0 {
				x = self.jiggle();
			}
			if y == 0.0 {
				y = self.jiggle();
			}
			let len = (x * x + y * y).sqrt();
			let distance = source.radius + target.radius + self.config.link_distance;
			let strength = 1.0 / degree[s].min(degree[t]).max(1) as f64;
			let pull = (len - distance) / len * self.alpha * strength;
			x *= pull;
			y *= pull;
			let bias = degree[s] as f64 / (degree[s] + degree[t]) as f64;
			bodies[t].vx -= x * bias;
			bodies[t].vy -= y * bias;
			bodies[s].vx += x * (1.0 - bias);
			bodies[s].vy += y * (1.0 - bias);
		}
	}

	fn apply_charge(&mut self, bodies: &mut [Body]) {
		let n = bodies.len();
		for i in 0..n {
			for j in 0..n {
				if i == j {
					continue;
				}
				let mut x = bodies[j].x - bodies[i].x;
				let mut y = bodies[j].y - bodies[i].y;
				let mut l = x * x + y * y;
				if x == 0.0 {
					x = self.jiggle();
					l += x * x;
				}
				if y == 0.0 {
					y = self.jiggle();
					l += y * y;
				}
				if l < 1.0 {
					l = l.sqrt();
				}
				let w = self.config.charge * self.alpha / l;
				bodies[i].vx += x * w;
				bodies[i].vy += y * w;
			}
		}
	}

	fn apply_centering(&self, bodies: &mut [Body]) {
		let k = self.config.center_strength * self.alpha;
		for body in bodies {
			body.vx -= body.x * k;
			body.vy -= body.y * k;
		}
	}

	fn apply_collisions(&mut self, bodies: &mut [Body]) {
		let n = bodies.len();
		let pad = self.config.collide_padding;
		for i in 0..n {
			for j in (i + 1)..n {
				let (a, b) = (bodies[i], bodies[j]);
				let (ra, rb) = (a.radius + pad, b.radius + pad);
				let r = ra + rb;
				let mut x = (a.x + a.vx) - (b.x + b.vx);
				let mut y = (a.y + a.vy) - (b.y + b.vy);
				let mut l = x * x + y * y;
				if l >= r * r {
					continue;
				}
				if x == 0.0 {
					x = self.jiggle();
					l += x * x;
				}
				if y == 0.0 {
					y = self.jiggle();
					l += y * y;
				}
				let len = l.sqrt();
				let push = (r - len) / len;
				x *= push;
				y *= push;
				let share = (rb * rb) / (ra * ra + rb * rb);
				bodies[i].vx += x * share;
				bodies[i].vy += y * share;
				bodies[j].vx -= x * (1.0 - share);
				bodies[j].vy -= y * (1.0 - share);
			}
		}
	}

	/// Per-frame step: ticks only while warm. Returns whether anything moved.
	pub fn frame(&mut self, graph: &mut Graph) -> bool {
		if !self.is_running() {
			return false;
		}
		for _ in 0..=self.config.extra_ticks_per_frame {
			self.tick(graph);
		}
		true
	}

	/// Run ticks synchronously, bounded by a tick cap and a wall-clock budget.
	/// Returns the number of ticks run.
	pub fn precompute(&mut self, graph: &mut Graph, clock: &dyn Clock) -> usize {
		let start = clock.now_ms();
		let mut ticks = 0;
		while ticks < self.config.precompute_max_ticks
			&& self.is_running()
			&& clock.now_ms() - start < self.config.precompute_budget_ms
		{
			self.tick(graph);
			ticks += 1;
		}
		debug!("prop-graph: precomputed {} ticks (alpha {:.3})", ticks, self.alpha);
		ticks
	}

	/// Seed nodes that have no position yet on a circle around `center`.
	/// Returns how many were placed.
	pub fn place_new_nodes(&self, graph: &mut Graph, nodes: &[NodeIdx], center: Point) -> usize {
		let unplaced: Vec<NodeIdx> = nodes
			.iter()
			.copied()
			.filter(|idx| graph.node(*idx).is_some_and(|n| !n.initial_position_calculated))
			.collect();
		let count = unplaced.len();
		let radius = self
			.config
			.layout_radius
			.max(count as f64 * (self.config.collide_padding * 2.0) / TAU);
		for (i, idx) in unplaced.iter().enumerate() {
			let angle = TAU * i as f64 / count as f64;
			if let Some(node) = graph.node_mut(*idx) {
				node.x = center.x + radius * angle.sin();
				node.y = center.y + radius * angle.cos();
				node.vx = 0.0;
				node.vy = 0.0;
				node.initial_position_calculated = true;
			}
		}
		count
	}
}

impl Default for Simulation {
	fn default() -> Self {
		Self::new(SimulationConfig::default())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::clock::ManualClock;
	use crate::components::force_graph::model::tests::{node, rel};

	fn graph_with(ids: &[&str]) -> Graph {
		let mut graph = Graph::new();
		let records: Vec<_> = ids.iter().map(|id| node(id, &[])).collect();
		graph.add_nodes(&records);
		graph
	}

	fn position(graph: &Graph, id: &str) -> Point {
		let n = graph.node(graph.find_node(id).unwrap()).unwrap();
		Point::new(n.x, n.y)
	}

	fn set(graph: &mut Graph, id: &str, x: f64, y: f64) {
		let idx = graph.find_node(id).unwrap();
		let n = graph.node_mut(idx).unwrap();
		n.x = x;
		n.y = y;
	}

	#[test]
	fn links_survive_index_holes_and_tick_buffers_are_reused() {
		let mut graph = graph_with(&["a", "b", "c"]);
		graph.add_relationships(&[rel("ac", "a", "c", "T")]).unwrap();
		graph.remove_node(graph.find_node("b").unwrap());
		set(&mut graph, "a", -300.0, 0.0);
		set(&mut graph, "c", 300.0, 0.0);
		let mut sim = Simulation::default();
		sim.config.charge = 0.0;
		sim.config.center_strength = 0.0;
		sim.tick(&mut graph);
		assert_eq!(sim.scratch.links, vec![(0, 1)]);
		let gap = position(&graph, "a").distance(position(&graph, "c"));
		assert!(gap < 600.0, "{gap}");

		let capacity = sim.scratch.bodies.capacity();
		sim.tick(&mut graph);
		assert_eq!(sim.scratch.bodies.capacity(), capacity);
		assert_eq!(sim.scratch.bodies.len(), 2);
	}

	#[test]
	fn default_decay_cools_in_about_three_hundred_ticks() {
		let mut sim = Simulation::default();
		let mut graph = Graph::new();
		let mut ticks = 0;
		while sim.is_running() {
			sim.tick(&mut graph);
			ticks += 1;
		}
		assert!((295..=305).contains(&ticks), "{ticks}");
	}

	#[test]
	fn unlinked_nodes_push_apart() {
		let mut graph = graph_with(&["a", "b"]);
		set(&mut graph, "a", -10.0, 0.0);
		set(&mut graph, "b", 10.0, 0.0);
		let mut sim = Simulation::default();
		for _ in 0..50 {
			sim.tick(&mut graph);
		}
		assert!(position(&graph, "a").distance(position(&graph, "b")) > 100.0);
	}

	#[test]
	fn linked_nodes_settle_near_link_distance() {
		let mut graph = graph_with(&["a", "b"]);
		graph.add_relationships(&[rel("r", "a", "b", "T")]).unwrap();
		set(&mut graph, "a", -400.0, 0.0);
		set(&mut graph, "b", 400.0, 0.0);
		let mut sim = Simulation::default();
		while sim.is_running() {
			sim.tick(&mut graph);
		}
		let d = position(&graph, "a").distance(position(&graph, "b"));
		assert!(d < 400.0, "{d}");
		assert!(d > 95.0, "{d}");
	}

	#[test]
	fn pinned_node_holds_position() {
		let mut graph = graph_with(&["a", "b"]);
		graph.add_relationships(&[rel("r", "a", "b", "T")]).unwrap();
		set(&mut graph, "a", 30.0, 40.0);
		set(&mut graph, "b", 300.0, 0.0);
		let a = graph.find_node("a").unwrap();
		graph.node_mut(a).unwrap().pin_here();
		let mut sim = Simulation::default();
		for _ in 0..100 {
			sim.tick(&mut graph);
		}
		assert_eq!(position(&graph, "a"), Point::new(30.0, 40.0));
	}

	#[test]
	fn coincident_nodes_separate_without_nan() {
		let mut graph = graph_with(&["a", "b", "c"]);
		let mut sim = Simulation::default();
		for _ in 0..20 {
			sim.tick(&mut graph);
		}
		for (_, n) in graph.nodes() {
			assert!(n.x.is_finite() && n.y.is_finite());
		}
		assert!(position(&graph, "a").distance(position(&graph, "b")) > 1.0);
	}

	#[test]
	fn drag_keeps_simulation_warm_until_release() {
		let mut graph = graph_with(&["a"]);
		let mut sim = Simulation::default();
		sim.start_drag();
		for _ in 0..1000 {
			sim.tick(&mut graph);
		}
		assert!(sim.is_running());
		sim.end_drag();
		for _ in 0..1000 {
			sim.tick(&mut graph);
		}
		assert!(!sim.is_running());
		assert!(!sim.frame(&mut graph));
	}

	#[test]
	fn precompute_respects_tick_cap_and_budget() {
		let mut graph = graph_with(&["a", "b"]);
		let mut sim = Simulation::new(SimulationConfig {
			precompute_max_ticks: 40,
			..Default::default()
		});
		assert_eq!(sim.precompute(&mut graph, &ManualClock::new(0.0)), 40);

		let mut sim = Simulation::default();
		let ticks = sim.precompute(&mut graph, &ManualClock::stepping(100.0));
		assert!(ticks <= 3, "{ticks}");
	}

	#[test]
	fn new_nodes_are_seeded_around_center_once() {
		let mut graph = graph_with(&["a", "b", "c", "d"]);
		let all = graph.node_indices();
		let sim = Simulation::default();
		let placed = sim.place_new_nodes(&mut graph, &all[..3], Point::new(100.0, 100.0));
		assert_eq!(placed, 3);
		for id in ["a", "b", "c"] {
			let d = position(&graph, id).distance(Point::new(100.0, 100.0));
			assert!((d - 75.0).abs() < 1e-9);
		}
		assert_ne!(position(&graph, "a"), position(&graph, "b"));
		assert_eq!(position(&graph, "d"), Point::default());
		assert_eq!(sim.place_new_nodes(&mut graph, &all, Point::default()), 1);
	}
}
