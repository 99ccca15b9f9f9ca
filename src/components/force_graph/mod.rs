//! Property-graph visualization component.
//!
//! Renders query results (labelled nodes, typed relationships) on an HTML
//! canvas with:
//! - Force-directed layout with a precomputed initial settle
//! - Curved parallel relationships, self-loops and rotated captions
//! - Pan, zoom, node dragging, hover and selection
//! - Neighbour expansion and collapse through a pluggable [`NeighbourSource`]
//! - Per-label styling from a selector stylesheet with GraSS import/export
//!
//! # Example
//!
//! ```ignore
//! use prop_graph::{GraphCanvas, GraphPayload, NodeRecord};
//!
//! let payload = GraphPayload {
//!     nodes: vec![NodeRecord { id: "1".into(), labels: vec!["Person".into()], ..Default::default() }],
//!     relationships: vec![],
//! };
//!
//! view! { <GraphCanvas payload=Signal::derive(move || payload.clone()) fullscreen=true /> }
//! ```

pub mod clock;
mod component;
pub mod error;
pub mod geometry;
pub mod interaction;
pub mod model;
mod render;
pub mod renderers;
pub mod simulation;
pub mod source;
pub mod state;
pub mod style;
pub mod theme;
pub mod types;
pub mod viewport;

pub use component::{BrowserClock, GraphCanvas, GraphHandle};
pub use error::{FetchError, GraphError, StyleError};
pub use interaction::GraphCallbacks;
pub use source::{NeighbourSource, NoNeighbours, PayloadSource};
pub use state::{GraphConfig, Visualization};
pub use style::{GraphStyle, StyleSheet};
pub use theme::Theme;
pub use types::{
	ContextMenuItem, GraphPayload, GraphStats, NeighbourResult, NodeItem, NodeRecord, RelationshipItem,
	RelationshipRecord, VizItem,
};
