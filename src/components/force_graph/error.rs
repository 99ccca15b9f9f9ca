//! Error types for graph mutation, style parsing and neighbour fetching.

use thiserror::Error;

/// A graph mutation was asked to do something that can only come from a
/// defect in the data layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
	#[error("relationship {relationship} references node {node}, which is not in the graph")]
	MissingEndpoint { relationship: String, node: String },
	#[error("node {0} is not in the graph")]
	UnknownNode(String),
}

/// Grass style text could not be parsed. Callers swallow this and keep the
/// rules they already had.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StyleError {
	#[error("malformed style text at offset {offset}")]
	Syntax { offset: usize },
	#[error("empty selector")]
	EmptySelector,
	#[error("unknown selector tag `{0}`")]
	UnknownTag(String),
}

/// The external data layer failed to answer a neighbour request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
	#[error("neighbour request rejected: {0}")]
	Rejected(String),
	#[error("neighbour request cancelled")]
	Cancelled,
}
