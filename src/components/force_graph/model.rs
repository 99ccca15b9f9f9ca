//! The in-memory graph model for the current view.
//!
//! Nodes and relationships live in a petgraph [`StableGraph`], addressed by
//! [`NodeIdx`]/[`RelIdx`]. Indices stay valid across removals of other
//! items but freed slots are reused, so callers must drop indices of removed
//! items. Every mutation leaves the graph consistent: no relationship
//! survives the removal of one of its endpoints.

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::Direction;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, NodeIndexable};

use super::error::GraphError;
use super::geometry::{ArrowPath, CaptionLayout, CaptionLine};
use super::types::{
	GraphStats, ItemStats, NodeItem, NodeRecord, Properties, RelationshipItem, RelationshipRecord,
	value_type_name,
};

pub type NodeIdx = NodeIndex;
pub type RelIdx = EdgeIndex;

/// Radius used until a style resolves the real diameter.
pub const DEFAULT_NODE_RADIUS: f64 = 25.0;

/// A node plus its visualization state.
#[derive(Clone, Debug)]
pub struct Node {
	pub id: String,
	pub element_id: String,
	pub labels: Vec<String>,
	pub properties: Properties,
	pub property_types: BTreeMap<String, String>,
	pub x: f64,
	pub y: f64,
	pub vx: f64,
	pub vy: f64,
	/// Pinned position. The simulation never moves a node while both are set.
	pub fx: Option<f64>,
	pub fy: Option<f64>,
	pub radius: f64,
	pub caption: Vec<CaptionLine>,
	pub selected: bool,
	pub expanded: bool,
	/// Pinned only because the pointer is hovering it.
	pub hover_fixed: bool,
	pub initial_position_calculated: bool,
}

impl Node {
	pub fn from_record(record: &NodeRecord) -> Self {
		Self {
			id: record.id.clone(),
			element_id: record.element_id.clone(),
			labels: record.labels.clone(),
			properties: record.properties.clone(),
			property_types: record.property_types.clone(),
			x: 0.0,
			y: 0.0,
			vx: 0.0,
			vy: 0.0,
			fx: None,
			fy: None,
			radius: DEFAULT_NODE_RADIUS,
			caption: Vec::new(),
			selected: false,
			expanded: false,
			hover_fixed: false,
			initial_position_calculated: false,
		}
	}

	pub fn is_pinned(&self) -> bool {
		self.fx.is_some() && self.fy.is_some()
	}

	pub fn pin_here(&mut self) {
		self.fx = Some(self.x);
		self.fy = Some(self.y);
	}

	pub fn unpin(&mut self) {
		self.fx = None;
		self.fy = None;
	}

	pub fn to_item(&self) -> NodeItem {
		NodeItem {
			id: self.id.clone(),
			element_id: self.element_id.clone(),
			labels: self.labels.clone(),
			properties: self.properties.clone(),
		}
	}
}

/// A relationship plus its derived routing geometry.
#[derive(Clone, Debug)]
pub struct Relationship {
	pub id: String,
	pub element_id: String,
	pub rel_type: String,
	pub properties: Properties,
	pub property_types: BTreeMap<String, String>,
	/// Mirrors the edge endpoints in the backing graph.
	pub source: NodeIdx,
	pub target: NodeIdx,
	/// Direction (degrees) of the arrow's local x axis in world space.
	pub natural_angle: f64,
	pub centre_distance: f64,
	pub caption: String,
	pub caption_length: f64,
	pub caption_height: f64,
	pub short_caption: String,
	pub short_caption_length: f64,
	pub caption_layout: CaptionLayout,
	pub arrow: Option<ArrowPath>,
	pub selected: bool,
	/// Added only to complete the picture between visible nodes.
	pub internal: bool,
}

impl Relationship {
	fn from_record(record: &RelationshipRecord, source: NodeIdx, target: NodeIdx) -> Self {
		Self {
			id: record.id.clone(),
			element_id: record.element_id.clone(),
			rel_type: record.rel_type.clone(),
			properties: record.properties.clone(),
			property_types: record.property_types.clone(),
			source,
			target,
			natural_angle: 0.0,
			centre_distance: 0.0,
			caption: String::new(),
			caption_length: 0.0,
			caption_height: 0.0,
			short_caption: String::new(),
			short_caption_length: 0.0,
			caption_layout: CaptionLayout::External,
			arrow: None,
			selected: false,
			internal: false,
		}
	}

	pub fn is_loop(&self) -> bool {
		self.source == self.target
	}

	pub fn touches(&self, node: NodeIdx) -> bool {
		self.source == node || self.target == node
	}

	pub fn other_end(&self, node: NodeIdx) -> NodeIdx {
		if self.source == node {
			self.target
		} else {
			self.source
		}
	}
}

/// All relationships between one unordered pair of nodes. `node_a` carries
/// the lower id so lookups do not depend on direction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodePair {
	pub node_a: NodeIdx,
	pub node_b: NodeIdx,
	pub relationships: Vec<RelIdx>,
}

impl NodePair {
	pub fn is_loop(&self) -> bool {
		self.node_a == self.node_b
	}
}

/// Canonical aggregate of live nodes and relationships with id lookup and
/// expansion provenance.
#[derive(Default)]
pub struct Graph {
	inner: StableGraph<Node, Relationship>,
	node_ids: HashMap<String, NodeIdx>,
	rel_ids: HashMap<String, RelIdx>,
	expansions: HashMap<NodeIdx, Vec<NodeIdx>>,
}

impl Graph {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn node_count(&self) -> usize {
		self.inner.node_count()
	}

	pub fn relationship_count(&self) -> usize {
		self.inner.edge_count()
	}

	pub fn node(&self, idx: NodeIdx) -> Option<&Node> {
		self.inner.node_weight(idx)
	}

	pub fn node_mut(&mut self, idx: NodeIdx) -> Option<&mut Node> {
		self.inner.node_weight_mut(idx)
	}

	pub fn relationship(&self, idx: RelIdx) -> Option<&Relationship> {
		self.inner.edge_weight(idx)
	}

	pub fn relationship_mut(&mut self, idx: RelIdx) -> Option<&mut Relationship> {
		self.inner.edge_weight_mut(idx)
	}

	pub fn find_node(&self, id: &str) -> Option<NodeIdx> {
		self.node_ids.get(id).copied()
	}

	pub fn find_relationship(&self, id: &str) -> Option<RelIdx> {
		self.rel_ids.get(id).copied()
	}

	pub fn contains_node(&self, idx: NodeIdx) -> bool {
		self.inner.contains_node(idx)
	}

	pub fn nodes(&self) -> impl Iterator<Item = (NodeIdx, &Node)> + '_ {
		self.inner
			.node_indices()
			.filter_map(move |idx| self.inner.node_weight(idx).map(|n| (idx, n)))
	}

	pub fn relationships(&self) -> impl Iterator<Item = (RelIdx, &Relationship)> + '_ {
		self.inner
			.edge_indices()
			.filter_map(move |idx| self.inner.edge_weight(idx).map(|r| (idx, r)))
	}

	/// One past the highest node index slot ever used.
	pub fn node_bound(&self) -> usize {
		self.inner.node_bound()
	}

	/// Snapshot of live node indices, for loops that mutate nodes.
	pub fn node_indices(&self) -> Vec<NodeIdx> {
		self.inner.node_indices().collect()
	}

	pub fn relationship_indices(&self) -> Vec<RelIdx> {
		self.inner.edge_indices().collect()
	}

	pub fn node_ids(&self) -> Vec<String> {
		self.nodes().map(|(_, n)| n.id.clone()).collect()
	}

	/// Add a node unless its id is already present. Returns the index of the
	/// node with that id and whether it was newly inserted.
	pub fn add_node(&mut self, record: &NodeRecord) -> (NodeIdx, bool) {
		if let Some(&idx) = self.node_ids.get(&record.id) {
			return (idx, false);
		}
		let idx = self.inner.add_node(Node::from_record(record));
		self.node_ids.insert(record.id.clone(), idx);
		(idx, true)
	}

	/// Add nodes, skipping ids already present. Returns the new indices.
	pub fn add_nodes(&mut self, records: &[NodeRecord]) -> Vec<NodeIdx> {
		records
			.iter()
			.filter_map(|r| match self.add_node(r) {
				(idx, true) => Some(idx),
				(_, false) => None,
			})
			.collect()
	}

	/// Add nodes introduced by expanding `origin` and record their provenance.
	pub fn add_expanded_nodes(
		&mut self,
		origin: NodeIdx,
		records: &[NodeRecord],
	) -> Result<Vec<NodeIdx>, GraphError> {
		if !self.inner.contains_node(origin) {
			return Err(GraphError::UnknownNode(format!("{origin:?}")));
		}
		let added = self.add_nodes(records);
		if !added.is_empty() {
			let children = self.expansions.entry(origin).or_default();
			for idx in &added {
				if !children.contains(idx) {
					children.push(*idx);
				}
			}
		}
		Ok(added)
	}

	fn resolve_endpoints(
		&self,
		records: &[RelationshipRecord],
	) -> Result<Vec<(NodeIdx, NodeIdx)>, GraphError> {
		records
			.iter()
			.map(|r| {
				let lookup = |id: &str| {
					self.find_node(id).ok_or_else(|| GraphError::MissingEndpoint {
						relationship: r.id.clone(),
						node: id.to_string(),
					})
				};
				Ok((lookup(&r.start_node_id)?, lookup(&r.end_node_id)?))
			})
			.collect()
	}

	/// Add explicitly returned relationships. Re-adding an existing id only
	/// confirms it (clears `internal`). All endpoints are validated before
	/// anything is inserted.
	pub fn add_relationships(
		&mut self,
		records: &[RelationshipRecord],
	) -> Result<Vec<RelIdx>, GraphError> {
		let endpoints = self.resolve_endpoints(records)?;
		let mut added = Vec::new();
		for (record, (source, target)) in records.iter().zip(endpoints) {
			if let Some(&existing) = self.rel_ids.get(&record.id) {
				if let Some(rel) = self.inner.edge_weight_mut(existing) {
					rel.internal = false;
				}
				continue;
			}
			let idx = self
				.inner
				.add_edge(source, target, Relationship::from_record(record, source, target));
			self.rel_ids.insert(record.id.clone(), idx);
			added.push(idx);
		}
		Ok(added)
	}

	/// Add relationships that only auto-complete the picture. Existing ids
	/// keep their current flag.
	pub fn add_internal_relationships(
		&mut self,
		records: &[RelationshipRecord],
	) -> Result<Vec<RelIdx>, GraphError> {
		let endpoints = self.resolve_endpoints(records)?;
		let mut added = Vec::new();
		for (record, (source, target)) in records.iter().zip(endpoints) {
			if self.rel_ids.contains_key(&record.id) {
				continue;
			}
			let mut rel = Relationship::from_record(record, source, target);
			rel.internal = true;
			let idx = self.inner.add_edge(source, target, rel);
			self.rel_ids.insert(record.id.clone(), idx);
			added.push(idx);
		}
		Ok(added)
	}

	/// Drop every relationship that is still internal-only.
	pub fn prune_internal_relationships(&mut self) -> usize {
		let internal: Vec<RelIdx> = self
			.relationships()
			.filter(|(_, r)| r.internal)
			.map(|(idx, _)| idx)
			.collect();
		for idx in &internal {
			self.remove_relationship(*idx);
		}
		internal.len()
	}

	pub fn remove_relationship(&mut self, idx: RelIdx) -> Option<Relationship> {
		let rel = self.inner.remove_edge(idx)?;
		self.rel_ids.remove(&rel.id);
		Some(rel)
	}

	/// Relationships touching `node` in either direction. A self-loop is
	/// listed once.
	pub fn relationships_of(&self, node: NodeIdx) -> Vec<RelIdx> {
		if !self.inner.contains_node(node) {
			return Vec::new();
		}
		let mut found: Vec<RelIdx> = self
			.inner
			.edges_directed(node, Direction::Outgoing)
			.chain(self.inner.edges_directed(node, Direction::Incoming))
			.map(|e| e.id())
			.collect();
		found.sort();
		found.dedup();
		found
	}

	/// Remove every relationship touching `node`.
	pub fn remove_connected_relationships(&mut self, node: NodeIdx) -> Vec<Relationship> {
		self.relationships_of(node)
			.into_iter()
			.filter_map(|idx| self.remove_relationship(idx))
			.collect()
	}

	/// Remove a node together with its relationships. Provenance pointing at
	/// the node is dropped; nodes it expanded stay but lose their origin.
	pub fn remove_node(&mut self, idx: NodeIdx) -> Option<Node> {
		if !self.inner.contains_node(idx) {
			return None;
		}
		self.remove_connected_relationships(idx);
		let node = self.inner.remove_node(idx)?;
		self.node_ids.remove(&node.id);
		self.expansions.remove(&idx);
		for children in self.expansions.values_mut() {
			children.retain(|c| *c != idx);
		}
		self.expansions.retain(|_, children| !children.is_empty());
		Some(node)
	}

	/// Remove the subtree introduced by expanding `origin`, depth first.
	/// Returns the ids of the removed nodes.
	pub fn collapse_node(&mut self, origin: NodeIdx) -> Vec<String> {
		let mut removed = Vec::new();
		let mut visited = HashSet::new();
		self.collapse_into(origin, &mut visited, &mut removed);
		removed
	}

	fn collapse_into(
		&mut self,
		origin: NodeIdx,
		visited: &mut HashSet<NodeIdx>,
		removed: &mut Vec<String>,
	) {
		if !visited.insert(origin) {
			return;
		}
		let Some(children) = self.expansions.remove(&origin) else {
			return;
		};
		for child in children {
			self.collapse_into(child, visited, removed);
			if let Some(node) = self.remove_node(child) {
				removed.push(node.id);
			}
		}
	}

	/// Group relationships by unordered node pair, in first-seen order.
	pub fn grouped_relationships(&self) -> Vec<NodePair> {
		let mut pairs: Vec<NodePair> = Vec::new();
		let mut lookup: HashMap<(NodeIdx, NodeIdx), usize> = HashMap::new();
		for (idx, rel) in self.relationships() {
			let (Some(source), Some(target)) = (self.node(rel.source), self.node(rel.target)) else {
				continue;
			};
			let key = if source.id <= target.id {
				(rel.source, rel.target)
			} else {
				(rel.target, rel.source)
			};
			match lookup.get(&key) {
				Some(&pos) => pairs[pos].relationships.push(idx),
				None => {
					lookup.insert(key, pairs.len());
					pairs.push(NodePair {
						node_a: key.0,
						node_b: key.1,
						relationships: vec![idx],
					});
				}
			}
		}
		pairs
	}

	/// Ids of nodes sharing a relationship with `node`, one entry per
	/// relationship.
	pub fn find_node_neighbour_ids(&self, node: NodeIdx) -> Vec<String> {
		self.relationships_of(node)
			.into_iter()
			.filter_map(|idx| self.relationship(idx))
			.filter_map(|r| self.node(r.other_end(node)).map(|n| n.id.clone()))
			.collect()
	}

	pub fn relationship_item(&self, idx: RelIdx) -> Option<RelationshipItem> {
		let rel = self.relationship(idx)?;
		Some(RelationshipItem {
			id: rel.id.clone(),
			element_id: rel.element_id.clone(),
			rel_type: rel.rel_type.clone(),
			start_node_id: self.node(rel.source)?.id.clone(),
			end_node_id: self.node(rel.target)?.id.clone(),
			properties: rel.properties.clone(),
		})
	}

	/// Label and type histograms.
	pub fn stats(&self) -> GraphStats {
		fn record(
			bucket: &mut ItemStats,
			properties: &Properties,
			types: &BTreeMap<String, String>,
		) {
			bucket.count += 1;
			for (key, value) in properties {
				let ty = types
					.get(key)
					.cloned()
					.unwrap_or_else(|| value_type_name(value).to_string());
				bucket.properties.entry(key.clone()).or_insert(ty);
			}
		}

		let mut stats = GraphStats::default();
		for (_, node) in self.nodes() {
			record(
				stats.labels.entry("*".into()).or_default(),
				&node.properties,
				&node.property_types,
			);
			for label in &node.labels {
				record(
					stats.labels.entry(label.clone()).or_default(),
					&node.properties,
					&node.property_types,
				);
			}
		}
		for (_, rel) in self.relationships() {
			record(
				stats.rel_types.entry("*".into()).or_default(),
				&rel.properties,
				&rel.property_types,
			);
			record(
				stats.rel_types.entry(rel.rel_type.clone()).or_default(),
				&rel.properties,
				&rel.property_types,
			);
		}
		stats
	}

	/// True when every relationship references live nodes that match its
	/// edge endpoints and every id map entry resolves.
	pub fn is_consistent(&self) -> bool {
		let endpoints_live = self.relationships().all(|(idx, r)| {
			self.inner.contains_node(r.source)
				&& self.inner.contains_node(r.target)
				&& self.inner.edge_endpoints(idx) == Some((r.source, r.target))
		});
		let node_map_live = self
			.node_ids
			.iter()
			.all(|(id, idx)| self.node(*idx).is_some_and(|n| &n.id == id));
		let rel_map_live = self
			.rel_ids
			.iter()
			.all(|(id, idx)| self.relationship(*idx).is_some_and(|r| &r.id == id));
		let provenance_live = self
			.expansions
			.iter()
			.all(|(o, c)| self.inner.contains_node(*o) && c.iter().all(|n| self.inner.contains_node(*n)));
		endpoints_live
			&& node_map_live
			&& rel_map_live
			&& provenance_live
			&& self.node_ids.len() == self.inner.node_count()
			&& self.rel_ids.len() == self.inner.edge_count()
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use proptest::prelude::*;

	use super::*;

	pub(crate) fn node(id: &str, labels: &[&str]) -> NodeRecord {
		NodeRecord {
			id: id.into(),
			labels: labels.iter().map(|l| l.to_string()).collect(),
			..Default::default()
		}
	}

	pub(crate) fn rel(id: &str, from: &str, to: &str, ty: &str) -> RelationshipRecord {
		RelationshipRecord {
			id: id.into(),
			start_node_id: from.into(),
			end_node_id: to.into(),
			rel_type: ty.into(),
			..Default::default()
		}
	}

	#[test]
	fn add_nodes_is_idempotent() {
		let mut graph = Graph::new();
		let first = graph.add_nodes(&[node("1", &["Person"]), node("1", &["Person"])]);
		let second = graph.add_nodes(&[node("1", &["Person"])]);
		assert_eq!(first.len(), 1);
		assert!(second.is_empty());
		assert_eq!(graph.node_count(), 1);
	}

	#[test]
	fn single_node_has_no_pairs() {
		let mut graph = Graph::new();
		graph.add_nodes(&[node("1", &["Person"])]);
		assert!(graph.grouped_relationships().is_empty());
	}

	#[test]
	fn relationship_with_missing_endpoint_fails_without_partial_insert() {
		let mut graph = Graph::new();
		graph.add_nodes(&[node("a", &[]), node("b", &[])]);
		let err = graph
			.add_relationships(&[rel("r1", "a", "b", "T"), rel("r2", "a", "zz", "T")])
			.unwrap_err();
		assert_eq!(
			err,
			GraphError::MissingEndpoint {
				relationship: "r2".into(),
				node: "zz".into()
			}
		);
		assert_eq!(graph.relationship_count(), 0);
	}

	#[test]
	fn external_confirmation_clears_internal_flag() {
		let mut graph = Graph::new();
		graph.add_nodes(&[node("a", &[]), node("b", &[])]);
		graph.add_internal_relationships(&[rel("r", "a", "b", "T")]).unwrap();
		let idx = graph.find_relationship("r").unwrap();
		assert!(graph.relationship(idx).unwrap().internal);
		let added = graph.add_relationships(&[rel("r", "a", "b", "T")]).unwrap();
		assert!(added.is_empty());
		assert!(!graph.relationship(idx).unwrap().internal);
		assert_eq!(graph.prune_internal_relationships(), 0);
	}

	#[test]
	fn prune_removes_only_internal_relationships() {
		let mut graph = Graph::new();
		graph.add_nodes(&[node("a", &[]), node("b", &[])]);
		graph.add_relationships(&[rel("x", "a", "b", "T")]).unwrap();
		graph.add_internal_relationships(&[rel("i", "b", "a", "T")]).unwrap();
		assert_eq!(graph.prune_internal_relationships(), 1);
		assert!(graph.find_relationship("x").is_some());
		assert!(graph.find_relationship("i").is_none());
		assert!(graph.is_consistent());
	}

	#[test]
	fn removing_node_leaves_no_dangling_relationship() {
		let mut graph = Graph::new();
		graph.add_nodes(&[node("a", &[]), node("b", &[]), node("c", &[])]);
		graph
			.add_relationships(&[
				rel("ab", "a", "b", "T"),
				rel("bc", "b", "c", "T"),
				rel("bb", "b", "b", "T"),
				rel("ca", "c", "a", "T"),
			])
			.unwrap();
		let b = graph.find_node("b").unwrap();
		graph.remove_node(b);
		assert!(graph.is_consistent());
		assert_eq!(graph.relationship_count(), 1);
		assert!(graph.relationships().all(|(_, r)| r.id == "ca"));
	}

	#[test]
	fn collapse_removes_exactly_the_expanded_subtree() {
		let mut graph = Graph::new();
		graph.add_nodes(&[node("A", &[]), node("U", &[])]);
		graph.add_relationships(&[rel("AU", "A", "U", "T")]).unwrap();
		let a = graph.find_node("A").unwrap();

		graph.add_expanded_nodes(a, &[node("B", &[])]).unwrap();
		graph.add_relationships(&[rel("AB", "A", "B", "T")]).unwrap();
		let b = graph.find_node("B").unwrap();
		graph.add_expanded_nodes(b, &[node("C", &[]), node("U", &[])]).unwrap();
		graph
			.add_relationships(&[rel("BC", "B", "C", "T"), rel("BU", "B", "U", "T")])
			.unwrap();

		let mut removed = graph.collapse_node(a);
		removed.sort();
		assert_eq!(removed, vec!["B".to_string(), "C".to_string()]);
		assert!(graph.find_node("A").is_some());
		assert!(graph.find_node("U").is_some());
		assert!(graph.find_relationship("AU").is_some());
		assert!(graph.find_relationship("AB").is_none());
		assert!(graph.find_relationship("BU").is_none());
		assert_eq!(graph.relationship_count(), 1);
		assert!(graph.is_consistent());
	}

	#[test]
	fn node_pairs_group_both_directions_with_lower_id_first() {
		let mut graph = Graph::new();
		graph.add_nodes(&[node("2", &[]), node("1", &[])]);
		graph
			.add_relationships(&[rel("a", "2", "1", "T"), rel("b", "1", "2", "T"), rel("c", "1", "1", "L")])
			.unwrap();
		let pairs = graph.grouped_relationships();
		assert_eq!(pairs.len(), 2);
		let one = graph.find_node("1").unwrap();
		assert_eq!(pairs[0].node_a, one);
		assert_eq!(pairs[0].relationships.len(), 2);
		assert!(pairs[1].is_loop());
	}

	#[test]
	fn neighbour_ids_cover_both_directions() {
		let mut graph = Graph::new();
		graph.add_nodes(&[node("a", &[]), node("b", &[]), node("c", &[])]);
		graph
			.add_relationships(&[rel("1", "a", "b", "T"), rel("2", "c", "a", "T")])
			.unwrap();
		let a = graph.find_node("a").unwrap();
		let mut ids = graph.find_node_neighbour_ids(a);
		ids.sort();
		assert_eq!(ids, vec!["b".to_string(), "c".to_string()]);
	}

	#[test]
	fn stats_count_labels_and_types() {
		let mut graph = Graph::new();
		let mut ada = node("a", &["Person", "Admin"]);
		ada.properties.insert("name".into(), serde_json::json!("Ada"));
		graph.add_nodes(&[ada, node("b", &["Person"])]);
		graph.add_relationships(&[rel("r", "a", "b", "KNOWS")]).unwrap();
		let stats = graph.stats();
		assert_eq!(stats.labels["*"].count, 2);
		assert_eq!(stats.labels["Person"].count, 2);
		assert_eq!(stats.labels["Admin"].properties["name"], "String");
		assert_eq!(stats.rel_types["KNOWS"].count, 1);
	}

	#[test]
	fn relationships_of_lists_loops_once() {
		let mut graph = Graph::new();
		graph.add_nodes(&[node("a", &[]), node("b", &[])]);
		graph
			.add_relationships(&[rel("aa", "a", "a", "L"), rel("ab", "a", "b", "T"), rel("ba", "b", "a", "T")])
			.unwrap();
		let a = graph.find_node("a").unwrap();
		assert_eq!(graph.relationships_of(a).len(), 3);
		let b = graph.find_node("b").unwrap();
		graph.remove_node(b);
		assert_eq!(graph.relationships_of(b), Vec::<RelIdx>::new());
		assert!(graph.is_consistent());
	}

	proptest! {
		#[test]
		fn any_removal_order_keeps_the_graph_consistent(
			edges in proptest::collection::vec((0usize..8, 0usize..8), 0..24),
			order in Just((0usize..8).collect::<Vec<_>>()).prop_shuffle(),
		) {
			let ids: Vec<String> = (0..8).map(|i| format!("n{i}")).collect();
			let records: Vec<NodeRecord> = ids.iter().map(|id| node(id, &[])).collect();
			let rels: Vec<RelationshipRecord> = edges
				.iter()
				.enumerate()
				.map(|(i, (a, b))| rel(&format!("r{i}"), &ids[*a], &ids[*b], "T"))
				.collect();

			let mut graph = Graph::new();
			prop_assert_eq!(graph.add_nodes(&records).len(), 8);
			prop_assert!(graph.add_nodes(&records).is_empty());
			graph.add_relationships(&rels).unwrap();
			prop_assert!(graph.add_relationships(&rels).unwrap().is_empty());
			prop_assert_eq!(graph.relationship_count(), rels.len());

			for i in order {
				let idx = graph.find_node(&ids[i]).unwrap();
				prop_assert!(graph.remove_node(idx).is_some());
				prop_assert!(graph.find_node(&ids[i]).is_none());
				prop_assert!(graph.is_consistent());
			}
			prop_assert_eq!(graph.node_count(), 0);
			prop_assert_eq!(graph.relationship_count(), 0);
		}
	}
}
