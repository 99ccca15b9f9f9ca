//! Records exchanged with the surrounding application: query payloads coming
//! in, selection/hover items and graph statistics going out.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Property map as delivered by the query layer.
pub type Properties = BTreeMap<String, Value>;

/// A node as returned by a query or a neighbour expansion.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeRecord {
	/// Session-stable identity.
	pub id: String,
	pub labels: Vec<String>,
	pub properties: Properties,
	/// Declared type name per property key (e.g. "String", "Integer").
	pub property_types: BTreeMap<String, String>,
	pub element_id: String,
}

/// A relationship as returned by a query or a neighbour expansion.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelationshipRecord {
	pub id: String,
	pub start_node_id: String,
	pub end_node_id: String,
	#[serde(rename = "type")]
	pub rel_type: String,
	pub properties: Properties,
	pub property_types: BTreeMap<String, String>,
	pub element_id: String,
}

/// Initial graph payload: everything a query returned.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GraphPayload {
	pub nodes: Vec<NodeRecord>,
	pub relationships: Vec<RelationshipRecord>,
}

/// Answer to a "get neighbours of node X" request.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NeighbourResult {
	pub nodes: Vec<NodeRecord>,
	pub relationships: Vec<RelationshipRecord>,
	/// Total neighbour count in the database, which may exceed `nodes.len()`
	/// when the data layer applied a limit.
	pub all_neighbours_count: usize,
}

/// Item reported through `on_item_select` / `on_item_mouse_over`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "item", rename_all = "kebab-case")]
pub enum VizItem {
	Node(NodeItem),
	Relationship(RelationshipItem),
	Canvas(CanvasItem),
	StatusItem(String),
	ContextMenuItem(ContextMenuItem),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeItem {
	pub id: String,
	pub element_id: String,
	pub labels: Vec<String>,
	pub properties: Properties,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipItem {
	pub id: String,
	pub element_id: String,
	#[serde(rename = "type")]
	pub rel_type: String,
	pub start_node_id: String,
	pub end_node_id: String,
	pub properties: Properties,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasItem {
	pub node_count: usize,
	pub relationship_count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ContextMenuItem {
	pub label: String,
	pub content: String,
	pub selection: String,
}

/// Count and property keys for one label or relationship type.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ItemStats {
	pub count: usize,
	/// Property key to declared type.
	pub properties: BTreeMap<String, String>,
}

/// Label/type histograms for legend and overview panels. The `*` bucket
/// holds totals.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
	pub labels: BTreeMap<String, ItemStats>,
	pub rel_types: BTreeMap<String, ItemStats>,
}

/// Render a property value the way captions and inspectors show it.
pub fn property_text(value: &Value) -> String {
	match value {
		Value::Null => String::new(),
		Value::String(s) => s.clone(),
		Value::Array(items) => items.iter().map(property_text).collect::<Vec<_>>().join(", "),
		other => other.to_string(),
	}
}

/// Best-effort type name for a property without a declared type.
pub fn value_type_name(value: &Value) -> &'static str {
	match value {
		Value::Null => "Null",
		Value::Bool(_) => "Boolean",
		Value::Number(n) if n.is_i64() || n.is_u64() => "Integer",
		Value::Number(_) => "Float",
		Value::String(_) => "String",
		Value::Array(_) => "List",
		Value::Object(_) => "Map",
	}
}
