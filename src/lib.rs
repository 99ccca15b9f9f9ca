//! prop-graph: Interactive property-graph visualization for query results.
//!
//! This crate provides a WASM-based graph visualization component that renders
//! labelled nodes and typed relationships with a force-directed layout,
//! pan/zoom, selection, neighbour expansion and stylesheet-driven styling.

use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use leptos_meta::*;
use log::{Level, info, warn};
use wasm_bindgen::JsCast;
use web_sys::{HtmlScriptElement, Window};

pub mod components;

pub use components::force_graph::{
	GraphCallbacks, GraphCanvas, GraphConfig, GraphHandle, GraphPayload, GraphStats, NeighbourSource, NodeRecord,
	PayloadSource, RelationshipRecord, Theme, VizItem,
};

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("prop-graph: logging initialized");
}

/// Load graph data from a script element with id="graph-data".
/// Expected format: JSON with { nodes: [...], relationships: [...] }
fn load_graph_data() -> Option<GraphPayload> {
	let window: Window = web_sys::window()?;
	let document = window.document()?;
	let element = document.get_element_by_id("graph-data")?;
	let script: HtmlScriptElement = element.dyn_into().ok()?;
	let json_text = script.text().ok()?;

	match serde_json::from_str::<GraphPayload>(&json_text) {
		Ok(data) => {
			info!(
				"prop-graph: loaded {} nodes, {} relationships",
				data.nodes.len(),
				data.relationships.len()
			);
			Some(data)
		}
		Err(e) => {
			warn!("prop-graph: failed to parse graph data: {}", e);
			None
		}
	}
}

/// One-line summary of a hovered or selected item for the overlay.
fn describe(item: &VizItem) -> String {
	match item {
		VizItem::Node(node) => format!("({}) {}", node.labels.join(":"), node.id),
		VizItem::Relationship(rel) => format!("[:{}] {} -> {}", rel.rel_type, rel.start_node_id, rel.end_node_id),
		VizItem::Canvas(canvas) => format!(
			"Displaying {} nodes, {} relationships",
			canvas.node_count, canvas.relationship_count
		),
		VizItem::StatusItem(status) => status.clone(),
		VizItem::ContextMenuItem(menu) => format!("{}: {}", menu.label, menu.content),
	}
}

/// Main application component.
/// Loads the payload from the DOM, shows the first slice of it and serves
/// expansions out of the rest.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let graph_data = load_graph_data().unwrap_or_default();
	let config = GraphConfig::default();
	let source: Rc<dyn NeighbourSource> = Rc::new(PayloadSource::new(graph_data.clone(), config.max_neighbours));
	let graph_signal = Signal::derive(move || graph_data.clone());

	let status = RwSignal::new(String::new());
	let stats = RwSignal::new(String::new());
	let callbacks = GraphCallbacks {
		on_item_mouse_over: Some(Rc::new(move |item: VizItem| status.set(describe(&item)))),
		on_item_select: Some(Rc::new(move |item: VizItem| status.set(describe(&item)))),
		on_graph_model_change: Some(Rc::new(move |s: GraphStats| {
			stats.set(format!(
				"{} labels, {} relationship types",
				s.labels.keys().filter(|k| *k != "*").count(),
				s.rel_types.keys().filter(|k| *k != "*").count()
			))
		})),
		update_style: None,
	};

	let handle: Rc<RefCell<Option<GraphHandle>>> = Rc::new(RefCell::new(None));
	let handle_assign = handle.clone();
	let assign: Rc<dyn Fn(web_sys::HtmlCanvasElement, GraphHandle)> =
		Rc::new(move |_canvas: web_sys::HtmlCanvasElement, h: GraphHandle| {
			*handle_assign.borrow_mut() = Some(h);
		});
	let (handle_in, handle_out, handle_fit) = (handle.clone(), handle.clone(), handle);

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="light" />
		<Title text="Property Graph" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<div class="fullscreen-graph">
			<GraphCanvas
				payload=graph_signal
				source=source
				callbacks=callbacks
				config=config
				assign_vis_element=assign
				fullscreen=true
			/>
			<div class="graph-overlay">
				<h1>"Property Graph"</h1>
				<p class="subtitle">
					"Double-click a node to expand it. Drag nodes to pin them. Scroll to zoom."
				</p>
				<p class="stats">{move || stats.get()}</p>
				<p class="status">{move || status.get()}</p>
			</div>
			<div class="zoom-controls">
				<button on:click=move |_| {
					if let Some(h) = handle_in.borrow().as_ref() {
						h.zoom_in();
					}
				}>"+"</button>
				<button on:click=move |_| {
					if let Some(h) = handle_out.borrow().as_ref() {
						h.zoom_out();
					}
				}>"-"</button>
				<button on:click=move |_| {
					if let Some(h) = handle_fit.borrow().as_ref() {
						h.zoom_to_fit();
					}
				}>"Fit"</button>
			</div>
		</div>
	}
}
