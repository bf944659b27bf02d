//! Pushing graph data into a mounted view from outside the component.
//!
//! A `GraphFeed` is a cheap handle shared between the caller and the
//! component. Data pushed before the view mounts is held and applied on
//! attach; data arriving after teardown is dropped.

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::{AbortHandle, Aborted, abortable};
use log::{debug, warn};

use super::error::{GraphError, Result};
use super::state::ForceGraphState;
use super::types::GraphData;

#[derive(Default)]
struct FeedInner {
	target: Option<Weak<RefCell<ForceGraphState>>>,
	/// Cleared by the owning component on teardown.
	alive: Option<Arc<AtomicBool>>,
	/// Latest data not yet reconciled, either because the view has not
	/// mounted or because its state was busy.
	pending: Option<GraphData>,
	detached: bool,
	tasks: HashMap<u64, AbortHandle>,
	next_task: u64,
}

/// Handle for feeding data into a graph view.
#[derive(Clone, Default)]
pub struct GraphFeed {
	inner: Rc<RefCell<FeedInner>>,
}

impl GraphFeed {
	/// Creates a feed not yet attached to any view.
	pub fn new() -> Self {
		Self::default()
	}

	/// Connects the feed to a view and applies any data pushed so far.
	/// Once `alive` is cleared the feed behaves as detached.
	pub(crate) fn attach(&self, state: Weak<RefCell<ForceGraphState>>, alive: Arc<AtomicBool>) {
		{
			let mut inner = self.inner.borrow_mut();
			if inner.detached {
				return;
			}
			inner.target = Some(state);
			inner.alive = Some(alive);
		}
		self.flush();
	}

	/// True once the owning view has been torn down or `detach` was called.
	pub fn is_detached(&self) -> bool {
		let inner = self.inner.borrow();
		inner.detached || inner.alive.as_ref().is_some_and(|alive| !alive.load(Ordering::Relaxed))
	}

	/// Reconciles `data` into the view.
	///
	/// Before the view mounts the data is kept and applied on attach; only
	/// the latest push survives. Fails with `Detached` once the view is gone.
	pub fn push(&self, data: GraphData) -> Result<()> {
		if self.is_detached() {
			self.detach();
		}
		let target = {
			let mut inner = self.inner.borrow_mut();
			if inner.detached {
				debug!(
					"dropping graph data ({} nodes) that arrived after teardown",
					data.nodes.len()
				);
				return Err(GraphError::Detached);
			}
			match &inner.target {
				Some(target) => target.clone(),
				None => {
					inner.pending = Some(data);
					return Ok(());
				}
			}
		};

		let Some(state) = target.upgrade() else {
			self.detach();
			debug!("dropping graph data for a view that no longer exists");
			return Err(GraphError::Detached);
		};
		match state.try_borrow_mut() {
			Ok(mut state) => {
				state.update_data(&data);
			}
			// Busy only when pushed from inside a draw hook.
			Err(_) => self.inner.borrow_mut().pending = Some(data),
		}
		Ok(())
	}

	/// Applies data held back by an earlier push.
	pub(crate) fn flush(&self) {
		let pending = self.inner.borrow_mut().pending.take();
		if let Some(data) = pending {
			let _ = self.push(data);
		}
	}

	/// Wraps a fetch so its result is pushed on completion and `detach`
	/// can abort it while in flight.
	pub fn track<F>(&self, fetch: F) -> impl Future<Output = ()> + 'static
	where
		F: Future<Output = Result<GraphData>> + 'static,
	{
		let (task, handle) = abortable(fetch);
		let id = {
			let mut inner = self.inner.borrow_mut();
			if inner.detached {
				handle.abort();
			}
			let id = inner.next_task;
			inner.next_task += 1;
			inner.tasks.insert(id, handle);
			id
		};

		let feed = self.clone();
		async move {
			let outcome = task.await;
			feed.inner.borrow_mut().tasks.remove(&id);
			match outcome {
				Ok(Ok(data)) => {
					let _ = feed.push(data);
				}
				Ok(Err(e)) => warn!("graph data fetch failed: {e}"),
				Err(Aborted) => debug!("graph data fetch {id} aborted"),
			}
		}
	}

	/// Runs `fetch` on the browser event loop. See [`GraphFeed::track`].
	pub fn spawn<F>(&self, fetch: F)
	where
		F: Future<Output = Result<GraphData>> + 'static,
	{
		wasm_bindgen_futures::spawn_local(self.track(fetch));
	}

	/// Aborts in-flight fetches and stops accepting data.
	pub fn detach(&self) {
		let tasks = {
			let mut inner = self.inner.borrow_mut();
			inner.detached = true;
			inner.target = None;
			inner.alive = None;
			inner.pending = None;
			std::mem::take(&mut inner.tasks)
		};
		if !tasks.is_empty() {
			debug!("aborting {} graph data fetches", tasks.len());
		}
		for handle in tasks.into_values() {
			handle.abort();
		}
	}
}
