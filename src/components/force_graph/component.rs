//! Leptos component wrapping the force-directed graph canvas.
//!
//! The component creates an HTML canvas element and wires mouse/wheel events
//! into `ForceGraphState`. An animation loop runs via `requestAnimationFrame`,
//! advancing the simulation and drawing each frame. Callbacks fire only after
//! the state borrow is released, so they may push new data or read the view.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use leptos::html::Canvas;
use leptos::prelude::*;
use log::{debug, error};
use wasm_bindgen::prelude::*;
use web_sys::{HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::feed::GraphFeed;
use super::interaction::GraphEvent;
use super::options::ForceGraphOptions;
use super::state::{ForceGraphState, Tooltip};
use super::surface::acquire_context;
use super::types::GraphData;

/// Size used until the canvas is measured.
const FALLBACK_SIZE: (f64, f64) = (800.0, 600.0);

type Listener = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

fn viewport_size(window: &Window) -> Option<(f64, f64)> {
	let width = window.inner_width().ok()?.as_f64()?;
	let height = window.inner_height().ok()?.as_f64()?;
	Some((width, height))
}

fn canvas_size(canvas: &HtmlCanvasElement, options: &ForceGraphOptions) -> (f64, f64) {
	let parent = canvas.parent_element();
	(
		options.width.unwrap_or_else(|| {
			parent
				.as_ref()
				.map(|p| p.client_width() as f64)
				.filter(|w| *w > 0.0)
				.unwrap_or(FALLBACK_SIZE.0)
		}),
		options.height.unwrap_or_else(|| {
			parent
				.as_ref()
				.map(|p| p.client_height() as f64)
				.filter(|h| *h > 0.0)
				.unwrap_or(FALLBACK_SIZE.1)
		}),
	)
}

/// Pointer position relative to the canvas.
fn local_point(canvas_ref: NodeRef<Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get_untracked()?;
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

fn dispatch(options: &ForceGraphOptions, events: Vec<GraphEvent>) {
	for event in &events {
		event.dispatch(options);
	}
}

fn sync_tooltip(tooltip: RwSignal<Option<Tooltip>>, current: Option<Tooltip>) {
	if tooltip.with_untracked(|shown| *shown != current) {
		tooltip.set(current);
	}
}

/// Renders an interactive force-directed graph on a canvas element.
///
/// Pass graph data via the reactive `data` signal; each change is merged into
/// the running layout rather than restarting it. Data can also be pushed
/// through a `GraphFeed`. The canvas sizes itself to its parent unless
/// `options.width`/`options.height` are set; `fullscreen = true` fills the
/// viewport and follows window resizes.
#[component]
pub fn ForceGraph(
	/// Graph data; each change is reconciled into the running layout.
	#[prop(into)]
	data: Signal<GraphData>,
	/// View, simulation and callback options.
	#[prop(optional)]
	options: Option<ForceGraphOptions>,
	/// Extra channel for pushing data from outside the component.
	#[prop(optional)]
	feed: Option<GraphFeed>,
	/// Fill the viewport and follow window resizes.
	#[prop(default = false)]
	fullscreen: bool,
) -> impl IntoView {
	let options = Rc::new(options.unwrap_or_default());
	let feed = feed.unwrap_or_default();
	let (width, height) = (
		options.width.unwrap_or(FALLBACK_SIZE.0),
		options.height.unwrap_or(FALLBACK_SIZE.1),
	);
	let state = Rc::new(RefCell::new(ForceGraphState::new(options.clone(), width, height)));

	let canvas_ref = NodeRef::<Canvas>::new();
	let tooltip = RwSignal::new(None::<Tooltip>);
	let alive = Arc::new(AtomicBool::new(true));
	let mounted = Rc::new(Cell::new(false));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Listener = Rc::new(RefCell::new(None));

	let (state_init, options_init, feed_init, alive_init) =
		(state.clone(), options.clone(), feed.clone(), alive.clone());
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		if mounted.replace(true) || !alive_init.load(Ordering::Relaxed) {
			return;
		}
		let Some(window) = web_sys::window() else {
			error!("no window; graph view stays idle");
			return;
		};

		let (w, h) = if fullscreen {
			viewport_size(&window).unwrap_or(FALLBACK_SIZE)
		} else {
			canvas_size(&canvas, &options_init)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);
		state_init.borrow_mut().resize(w, h);

		let mut ctx = match acquire_context(&canvas) {
			Ok(ctx) => ctx,
			Err(e) => {
				error!("{e}; graph view stays idle");
				return;
			}
		};
		feed_init.attach(Rc::downgrade(&state_init), alive_init.clone());

		if fullscreen {
			let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
			*resize_cb.borrow_mut() = Some(Closure::new(move || {
				let Some((nw, nh)) = web_sys::window().as_ref().and_then(viewport_size) else {
					return;
				};
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				state_resize.borrow_mut().resize(nw, nh);
			}));
			if let Some(ref cb) = *resize_cb.borrow() {
				let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let (state_anim, options_anim, feed_anim, alive_anim) = (
			state_init.clone(),
			options_init.clone(),
			feed_init.clone(),
			alive_init.clone(),
		);
		let (animate_inner, resize_inner) = (animate.clone(), resize_cb.clone());
		let mut last_frame: Option<f64> = None;
		*animate.borrow_mut() = Some(Closure::new(move |now: f64| {
			if !alive_anim.load(Ordering::Relaxed) {
				feed_anim.detach();
				if let (Some(win), Some(cb)) = (web_sys::window(), resize_inner.borrow_mut().take()) {
					let _ = win.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
				}
				// The closure can't drop itself while running.
				let animate = animate_inner.clone();
				wasm_bindgen_futures::spawn_local(async move {
					animate.borrow_mut().take();
				});
				debug!("graph view torn down");
				return;
			}

			feed_anim.flush();
			let dt = last_frame.map_or(1.0 / 60.0, |last| ((now - last) / 1000.0).clamp(0.0, 0.1));
			last_frame = Some(now);
			let (events, tip) = {
				let mut state = state_anim.borrow_mut();
				let events = state.frame(dt, &mut ctx);
				(events, state.tooltip().cloned())
			};
			sync_tooltip(tooltip, tip);
			dispatch(&options_anim, events);

			if let Some(ref cb) = *animate_inner.borrow() {
				if let Some(win) = web_sys::window() {
					let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
				}
			}
		}));
		if let Some(ref cb) = *animate.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let feed_data = feed.clone();
	Effect::new(move |_| {
		if let Err(e) = feed_data.push(data.get()) {
			debug!("graph data update skipped: {e}");
		}
	});

	// on_cleanup needs Send, so the loop does the actual teardown on its next frame.
	let alive_cleanup = alive.clone();
	on_cleanup(move || {
		alive_cleanup.store(false, Ordering::Relaxed);
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		if let Some((x, y)) = local_point(canvas_ref, &ev) {
			state_md.borrow_mut().pointer_down(x, y);
		}
	};

	let (state_mm, options_mm) = (state.clone(), options.clone());
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = local_point(canvas_ref, &ev) else {
			return;
		};
		let (events, tip) = {
			let mut state = state_mm.borrow_mut();
			let events = state.pointer_move(x, y);
			(events, state.tooltip().cloned())
		};
		sync_tooltip(tooltip, tip);
		dispatch(&options_mm, events);
	};

	let (state_mu, options_mu) = (state.clone(), options.clone());
	let on_mouseup = move |_: MouseEvent| {
		let events = state_mu.borrow_mut().pointer_up();
		dispatch(&options_mu, events);
	};

	let (state_ml, options_ml) = (state.clone(), options.clone());
	let on_mouseleave = move |_: MouseEvent| {
		let events = state_ml.borrow_mut().pointer_leave();
		tooltip.set(None);
		dispatch(&options_ml, events);
	};

	let (state_wh, options_wh) = (state.clone(), options.clone());
	let on_wheel = move |ev: WheelEvent| {
		if options_wh.enable_zoom_interaction {
			ev.prevent_default();
		}
		if let Some((x, y)) = local_point(canvas_ref, &ev) {
			state_wh.borrow_mut().wheel(x, y, ev.delta_y());
		}
	};

	view! {
		<div class="force-graph" style="position: relative; width: 100%; height: 100%;">
			<canvas
				node_ref=canvas_ref
				class="force-graph-canvas"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				on:wheel=on_wheel
				style="display: block; cursor: grab;"
			/>
			{move || {
				tooltip
					.get()
					.map(|tip| {
						view! {
							<div
								class="force-graph-tooltip"
								style=format!(
									"position: absolute; left: {}px; top: {}px; pointer-events: none;",
									tip.x,
									tip.y,
								)
							>
								{tip.text}
							</div>
						}
					})
			}}
		</div>
	}
}
