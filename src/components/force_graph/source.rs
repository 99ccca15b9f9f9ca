//! Where expansion data comes from.
//!
//! The visualization never queries a database itself; it asks a
//! [`NeighbourSource`] and applies whatever comes back. Futures are local
//! (`!Send`) because everything runs on the browser's UI thread.

use std::collections::HashSet;
use std::rc::Rc;

use futures_util::FutureExt;
use futures_util::future::{LocalBoxFuture, ready};

use super::error::FetchError;
use super::types::{GraphPayload, NeighbourResult};

pub type FetchFuture<T> = LocalBoxFuture<'static, Result<T, FetchError>>;

pub trait NeighbourSource {
	/// Neighbours of `node_id`. `current_neighbour_ids` are already on
	/// screen and may be left out of the answer.
	fn get_neighbours(&self, node_id: &str, current_neighbour_ids: &[String]) -> FetchFuture<NeighbourResult>;

	/// Relationships between `existing_node_ids` and `new_node_ids`, for
	/// completing the picture after an expansion.
	fn get_internal_relationships(
		&self,
		_existing_node_ids: &[String],
		_new_node_ids: &[String],
	) -> FetchFuture<GraphPayload> {
		ready(Ok(GraphPayload::default())).boxed_local()
	}
}

/// Answers every request with nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoNeighbours;

impl NeighbourSource for NoNeighbours {
	fn get_neighbours(&self, _node_id: &str, _current: &[String]) -> FetchFuture<NeighbourResult> {
		ready(Ok(NeighbourResult::default())).boxed_local()
	}
}

/// Serves neighbours out of a complete payload held in memory. Used when the
/// page embeds the whole data set and only a slice is displayed at first.
#[derive(Clone, Debug, Default)]
pub struct PayloadSource {
	payload: Rc<GraphPayload>,
	/// Most neighbours returned per request.
	pub max_neighbours: usize,
}

impl PayloadSource {
	pub fn new(payload: GraphPayload, max_neighbours: usize) -> Self {
		Self {
			payload: Rc::new(payload),
			max_neighbours,
		}
	}

	fn neighbours_now(&self, node_id: &str, current: &[String]) -> NeighbourResult {
		let current: HashSet<&str> = current.iter().map(String::as_str).collect();
		let mut neighbour_ids: Vec<&str> = Vec::new();
		for rel in &self.payload.relationships {
			let other = if rel.start_node_id == node_id {
				&rel.end_node_id
			} else if rel.end_node_id == node_id {
				&rel.start_node_id
			} else {
				continue;
			};
			if !neighbour_ids.contains(&other.as_str()) {
				neighbour_ids.push(other);
			}
		}
		let all_neighbours_count = neighbour_ids.len();
		let mut keep: Vec<&str> = current.iter().copied().filter(|id| neighbour_ids.contains(id)).collect();
		keep.extend(
			neighbour_ids
				.iter()
				.copied()
				.filter(|id| !current.contains(id))
				.take(self.max_neighbours),
		);
		keep.push(node_id);
		let nodes = self
			.payload
			.nodes
			.iter()
			.filter(|n| n.id != node_id && keep.contains(&n.id.as_str()))
			.cloned()
			.collect();
		let relationships = self
			.payload
			.relationships
			.iter()
			.filter(|r| (r.start_node_id == node_id || r.end_node_id == node_id))
			.filter(|r| keep.contains(&r.start_node_id.as_str()) && keep.contains(&r.end_node_id.as_str()))
			.cloned()
			.collect();
		NeighbourResult {
			nodes,
			relationships,
			all_neighbours_count,
		}
	}

	fn internal_now(&self, existing: &[String], new: &[String]) -> GraphPayload {
		let visible: HashSet<&str> = existing.iter().chain(new).map(String::as_str).collect();
		let fresh: HashSet<&str> = new.iter().map(String::as_str).collect();
		let relationships = self
			.payload
			.relationships
			.iter()
			.filter(|r| visible.contains(r.start_node_id.as_str()) && visible.contains(r.end_node_id.as_str()))
			.filter(|r| fresh.contains(r.start_node_id.as_str()) || fresh.contains(r.end_node_id.as_str()))
			.cloned()
			.collect();
		GraphPayload {
			nodes: Vec::new(),
			relationships,
		}
	}
}

impl NeighbourSource for PayloadSource {
	fn get_neighbours(&self, node_id: &str, current: &[String]) -> FetchFuture<NeighbourResult> {
		let result = self.neighbours_now(node_id, current);
		ready(Ok(result)).boxed_local()
	}

	fn get_internal_relationships(&self, existing: &[String], new: &[String]) -> FetchFuture<GraphPayload> {
		ready(Ok(self.internal_now(existing, new))).boxed_local()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::model::tests::{node, rel};

	fn payload() -> GraphPayload {
		GraphPayload {
			nodes: vec![node("a", &[]), node("b", &[]), node("c", &[]), node("d", &[])],
			relationships: vec![
				rel("ab", "a", "b", "T"),
				rel("ac", "a", "c", "T"),
				rel("ad", "d", "a", "T"),
				rel("bc", "b", "c", "T"),
			],
		}
	}

	#[test]
	fn neighbours_are_limited_and_counted() {
		let source = PayloadSource::new(payload(), 2);
		let result = source.get_neighbours("a", &[]).now_or_never().unwrap().unwrap();
		assert_eq!(result.all_neighbours_count, 3);
		assert_eq!(result.nodes.len(), 2);
		assert!(result.relationships.iter().all(|r| r.start_node_id == "a" || r.end_node_id == "a"));
		assert_eq!(result.relationships.len(), 2);
	}

	#[test]
	fn current_neighbours_are_kept_alongside_limit() {
		let source = PayloadSource::new(payload(), 1);
		let result = source
			.get_neighbours("a", &["d".to_string()])
			.now_or_never()
			.unwrap()
			.unwrap();
		let mut ids: Vec<_> = result.nodes.iter().map(|n| n.id.as_str()).collect();
		ids.sort();
		assert_eq!(ids, vec!["b", "d"]);
	}

	#[test]
	fn internal_relationships_touch_new_nodes_only() {
		let source = PayloadSource::new(payload(), 10);
		let found = source
			.get_internal_relationships(&["a".into(), "b".into()], &["c".into()])
			.now_or_never()
			.unwrap()
			.unwrap();
		let mut ids: Vec<_> = found.relationships.iter().map(|r| r.id.as_str()).collect();
		ids.sort();
		assert_eq!(ids, vec!["ac", "bc"]);
	}

	#[test]
	fn empty_provider_answers_immediately() {
		let result = NoNeighbours.get_neighbours("x", &[]).now_or_never().unwrap().unwrap();
		assert!(result.nodes.is_empty());
		let internal = NoNeighbours
			.get_internal_relationships(&[], &[])
			.now_or_never()
			.unwrap()
			.unwrap();
		assert!(internal.relationships.is_empty());
	}
}
