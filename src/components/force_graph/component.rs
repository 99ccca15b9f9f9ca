//! Leptos component wrapping the graph canvas.
//!
//! The component creates an HTML canvas element and wires up mouse/wheel event
//! handlers to the [`InteractionController`]. An animation loop runs via
//! `requestAnimationFrame`, advancing the simulation, firing pending timers and
//! rendering each frame. Neighbour fetches run on `spawn_local` and are fed
//! back into the controller when they resolve.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use leptos::prelude::*;
use log::{debug, info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::clock::Clock;
use super::interaction::{FetchRequest, GraphCallbacks, InteractionController, PointerState};
use super::render::{self, CanvasMeasure};
use super::source::{NeighbourSource, NoNeighbours};
use super::state::{GraphConfig, Hit, Visualization};
use super::style::StyleSheet;
use super::theme::Theme;
use super::types::GraphPayload;

/// Wall-clock time from the browser.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserClock;

impl Clock for BrowserClock {
	fn now_ms(&self) -> f64 {
		js_sys::Date::now()
	}
}

/// Visualization plus the controller that drives it.
struct GraphContext {
	vis: Visualization,
	controller: InteractionController,
}

/// State shared by the event handlers, the animation loop, pending fetches
/// and the host's [`GraphHandle`].
#[derive(Clone)]
struct Shared {
	context: Rc<RefCell<Option<GraphContext>>>,
	source: Rc<dyn NeighbourSource>,
	alive: Arc<AtomicBool>,
}

impl Shared {
	fn is_alive(&self) -> bool {
		self.alive.load(Ordering::Relaxed)
	}

	/// Run `f` on the live context. Does nothing after teardown or while the
	/// context is borrowed elsewhere, such as from inside a host callback.
	fn with<R>(&self, f: impl FnOnce(&mut GraphContext) -> R) -> Option<R> {
		if !self.is_alive() {
			return None;
		}
		let Ok(mut guard) = self.context.try_borrow_mut() else {
			warn!("prop-graph: graph is busy, dropping re-entrant call");
			return None;
		};
		guard.as_mut().map(f)
	}

	/// Like [`Shared::with`], then start whatever fetch the call asked for.
	fn dispatch(&self, f: impl FnOnce(&mut GraphContext) -> Option<FetchRequest>) {
		if let Some(request) = self.with(f).flatten() {
			spawn_fetch(self.clone(), request);
		}
	}
}

fn spawn_fetch(shared: Shared, request: FetchRequest) {
	spawn_local(async move {
		let next = match request {
			FetchRequest::Neighbours(req) => {
				let result = shared
					.source
					.get_neighbours(&req.node_id, &req.current_neighbour_ids)
					.await;
				shared
					.with(|c| c.controller.complete_expansion(&mut c.vis, req.ticket, result))
					.flatten()
			}
			FetchRequest::Internal(req) => {
				let result = shared
					.source
					.get_internal_relationships(&req.existing_node_ids, &req.new_node_ids)
					.await;
				shared.with(|c| c.controller.complete_internal(&mut c.vis, req.ticket, result));
				None
			}
		};
		if let Some(next) = next {
			spawn_fetch(shared, next);
		} else if !shared.is_alive() {
			debug!("prop-graph: fetch finished after teardown");
		}
	});
}

/// Controller the host uses for zoom buttons, style editing and node
/// commands. Calls after the component is gone do nothing.
#[derive(Clone)]
pub struct GraphHandle {
	shared: Shared,
}

impl GraphHandle {
	pub fn zoom_in(&self) -> bool {
		self.shared.with(|c| c.vis.viewport.zoom_in()).unwrap_or(false)
	}

	pub fn zoom_out(&self) -> bool {
		self.shared.with(|c| c.vis.viewport.zoom_out()).unwrap_or(false)
	}

	pub fn zoom_to_fit(&self) -> bool {
		self.shared.with(|c| c.vis.zoom_to_fit()).unwrap_or(false)
	}

	/// Whether the zoom buttons should be enabled, as (in, out).
	pub fn zoom_limits(&self) -> (bool, bool) {
		self.shared
			.with(|c| (!c.vis.viewport.is_at_max_scale(), !c.vis.viewport.is_at_min_scale()))
			.unwrap_or((false, false))
	}

	pub fn restyle(&self, sheet: &StyleSheet) {
		self.shared.with(|c| c.controller.restyle(&mut c.vis, sheet));
	}

	pub fn import_grass(&self, text: &str) -> bool {
		self.shared
			.with(|c| c.controller.import_grass(&mut c.vis, text))
			.unwrap_or(false)
	}

	pub fn export_grass(&self) -> Option<String> {
		self.shared.with(|c| c.vis.style.to_grass())
	}

	pub fn reset_style(&self) {
		self.shared.with(|c| c.controller.reset_style(&mut c.vis));
	}

	pub fn unlock(&self, node_id: &str) -> bool {
		self.shared
			.with(|c| c.controller.unlock(&mut c.vis, node_id))
			.unwrap_or(false)
	}

	pub fn dismiss(&self, node_id: &str) -> bool {
		self.shared
			.with(|c| c.controller.dismiss(&mut c.vis, node_id))
			.unwrap_or(false)
	}

	/// Expand or collapse a node, as a double-click would.
	pub fn toggle_expansion(&self, node_id: &str) {
		self.shared.dispatch(|c| {
			let idx = c.vis.graph.find_node(node_id)?;
			c.controller.toggle_expansion(&mut c.vis, idx)
		});
	}

	pub fn context_menu_hover(&self, label: &str, content: &str, selection: &str) {
		self.shared
			.with(|c| c.controller.context_menu_hover(label, content, selection));
	}
}

/// Renders an interactive property graph on a canvas element.
///
/// Pass the query result via the reactive `payload` signal; later values
/// replace the graph. Expansions ask `source` for neighbours. The component
/// sizes itself to its parent container by default; set `fullscreen = true`
/// to fill the viewport and resize automatically with the window. Explicit
/// `width`/`height` override automatic sizing.
#[component]
pub fn GraphCanvas(
	#[prop(into)] payload: Signal<GraphPayload>,
	#[prop(optional)] source: Option<Rc<dyn NeighbourSource>>,
	#[prop(optional)] callbacks: GraphCallbacks,
	#[prop(optional)] config: Option<GraphConfig>,
	#[prop(optional)] theme: Option<Theme>,
	/// Receives the canvas and a [`GraphHandle`] once the graph is mounted.
	#[prop(optional)]
	assign_vis_element: Option<Rc<dyn Fn(HtmlCanvasElement, GraphHandle)>>,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let shared = Shared {
		context: Rc::new(RefCell::new(None)),
		source: source.unwrap_or_else(|| Rc::new(NoNeighbours)),
		alive: Arc::new(AtomicBool::new(true)),
	};
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let (shared_init, animate_init, resize_cb_init) = (shared.clone(), animate.clone(), resize_cb.clone());

	let alive_cleanup = shared.alive.clone();
	on_cleanup(move || {
		alive_cleanup.store(false, Ordering::Relaxed);
	});

	Effect::new(move |_| {
		let payload = payload.get();
		let Some(canvas) = canvas_ref.get() else {
			return;
		};

		let reloaded = shared_init.with(|c| {
			let status = c.vis.load(&payload, &BrowserClock);
			c.controller.reset();
			c.controller.announce(&c.vis, status);
		});
		if reloaded.is_some() {
			return;
		}

		let canvas: HtmlCanvasElement = canvas.into();
		let window: Window = web_sys::window().unwrap();

		let (w, h) = if fullscreen {
			(
				window.inner_width().unwrap().as_f64().unwrap(),
				window.inner_height().unwrap().as_f64().unwrap(),
			)
		} else {
			(
				width.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_width() as f64)
						.unwrap_or(800.0)
				}),
				height.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_height() as f64)
						.unwrap_or(600.0)
				}),
			)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let ctx: CanvasRenderingContext2d = canvas
			.get_context("2d")
			.unwrap()
			.unwrap()
			.dyn_into()
			.unwrap();

		let mut vis = Visualization::new(
			config.clone().unwrap_or_default(),
			theme.clone().unwrap_or_default(),
			w,
			h,
			Box::new(CanvasMeasure::new(ctx.clone())),
		);
		let status = vis.load(&payload, &BrowserClock);
		let controller = InteractionController::new(&vis, callbacks.clone());
		controller.announce(&vis, status);
		*shared_init.context.borrow_mut() = Some(GraphContext { vis, controller });
		info!("prop-graph: canvas mounted at {}x{}", w, h);

		if let Some(assign) = &assign_vis_element {
			assign(canvas.clone(), GraphHandle {
				shared: shared_init.clone(),
			});
		}

		if fullscreen {
			let (shared_resize, canvas_resize) = (shared_init.clone(), canvas.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let win: Window = web_sys::window().unwrap();
				let (nw, nh) = (
					win.inner_width().unwrap().as_f64().unwrap(),
					win.inner_height().unwrap().as_f64().unwrap(),
				);
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				shared_resize.with(|c| c.vis.resize(nw, nh));
			}));
			if let Some(ref cb) = *resize_cb_init.borrow() {
				let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let (shared_anim, animate_inner, resize_teardown) =
			(shared_init.clone(), animate_init.clone(), resize_cb_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			let window: Window = web_sys::window().unwrap();
			if !shared_anim.is_alive() {
				if let Some(cb) = resize_teardown.borrow_mut().take() {
					let _ = window.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
				}
				shared_anim.context.borrow_mut().take();
				info!("prop-graph: animation loop stopped");
				return;
			}
			shared_anim.dispatch(|c| {
				let now = js_sys::Date::now();
				c.vis.on_tick(now);
				let request = c.controller.poll(&mut c.vis, now);
				render::render(&c.vis, &ctx);
				request
			});
			if let Some(ref cb) = *animate_inner.borrow() {
				let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let position = move |ev: &MouseEvent| -> Option<(f64, f64)> {
		let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
		let rect = canvas.get_bounding_client_rect();
		Some((ev.client_x() as f64 - rect.left(), ev.client_y() as f64 - rect.top()))
	};

	let shared_md = shared.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = position(&ev) else {
			return;
		};
		let now = js_sys::Date::now();
		shared_md.dispatch(|c| c.controller.pointer_down(&mut c.vis, x, y, now));
	};

	let shared_mm = shared.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = position(&ev) else {
			return;
		};
		let now = js_sys::Date::now();
		shared_mm.dispatch(|c| c.controller.pointer_move(&mut c.vis, x, y, now));

		let cursor = shared_mm.with(|c| {
			if matches!(c.controller.pointer_state(), PointerState::Dragging { .. }) {
				"grabbing"
			} else if c.vis.hit(x, y) != Hit::Canvas {
				"pointer"
			} else {
				"grab"
			}
		});
		if let (Some(cursor), Some(canvas)) = (cursor, canvas_ref.get()) {
			let canvas: HtmlCanvasElement = canvas.into();
			let _ = web_sys::HtmlElement::style(&canvas).set_property("cursor", cursor);
		}
	};

	let shared_mu = shared.clone();
	let on_mouseup = move |_: MouseEvent| {
		let now = js_sys::Date::now();
		shared_mu.dispatch(|c| c.controller.pointer_up(&mut c.vis, now));
	};

	let shared_ml = shared.clone();
	let on_mouseleave = move |_: MouseEvent| {
		shared_ml.with(|c| c.controller.pointer_leave(&mut c.vis));
	};

	let shared_wh = shared.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let mouse: &MouseEvent = &ev;
		let Some((x, y)) = position(mouse) else {
			return;
		};
		shared_wh.with(|c| c.controller.wheel(&mut c.vis, ev.delta_y(), x, y));
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="prop-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}
