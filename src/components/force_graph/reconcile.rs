//! Incremental merge of supplied graph data into the live simulation state.
//!
//! Known nodes keep their position and velocity; only their payload is
//! refreshed. Links are diffed by `LinkKey` so renderer and hover state that
//! refer to a link survive updates that do not touch it.

use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;
use std::rc::Rc;

use log::debug;
use rand::Rng;
use serde_json::Value;

use super::simulation::{SimLink, SimNode, SimulationState};
use super::types::{GraphData, LinkKey, LinkKind, LinkRecord, Payload, merge_payload};

const JITTER: f64 = 10.0;
const SPIRAL_RADIUS: f64 = 10.0;

/// Generates extra links from node payloads after nodes are reconciled.
///
/// Derivers only see nodes present in the live set, so a derived link whose
/// target was removed is dropped like any other unresolved link.
pub trait LinkDeriver {
	/// Appends derived links for `nodes` to `out`.
	fn derive(&self, nodes: &[SimNode], out: &mut Vec<LinkRecord>);
}

/// Links each node to the ids listed in its `relationships` field.
///
/// Entries may be bare ids or objects with an `id` (or `target`) field; the
/// other fields of an object entry become the link payload.
#[derive(Clone, Copy, Debug, Default)]
pub struct RelationshipLinks;

impl LinkDeriver for RelationshipLinks {
	fn derive(&self, nodes: &[SimNode], out: &mut Vec<LinkRecord>) {
		for node in nodes {
			let Some(Value::Array(entries)) = node.payload.get("relationships") else {
				continue;
			};
			for entry in entries {
				let (target, payload) = match entry {
					Value::Object(fields) => {
						let Some(target) = fields.get("id").or_else(|| fields.get("target")) else {
							continue;
						};
						let Some(target) = id_of(target) else {
							continue;
						};
						let payload: Payload = fields
							.iter()
							.filter(|(k, _)| !matches!(k.as_str(), "id" | "target"))
							.map(|(k, v)| (k.clone(), v.clone()))
							.collect();
						(target, payload)
					}
					other => match id_of(other) {
						Some(target) => (target, Payload::new()),
						None => continue,
					},
				};
				let mut link = LinkRecord::new(node.id.as_str(), target)
					.with_kind(LinkKind::Relationship);
				link.payload = payload;
				out.push(link);
			}
		}
	}
}

/// Links each node to the tag nodes named in its `tags` field.
#[derive(Clone, Copy, Debug, Default)]
pub struct TagLinks;

impl LinkDeriver for TagLinks {
	fn derive(&self, nodes: &[SimNode], out: &mut Vec<LinkRecord>) {
		for node in nodes {
			let Some(Value::Array(tags)) = node.payload.get("tags") else {
				continue;
			};
			out.extend(
				tags.iter()
					.filter_map(id_of)
					.map(|tag| LinkRecord::new(node.id.as_str(), tag).with_kind(LinkKind::Tag)),
			);
		}
	}
}

fn id_of(value: &Value) -> Option<String> {
	match value {
		Value::String(s) => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		_ => None,
	}
}

/// What a reconciliation pass changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
	/// New node ids.
	pub added_nodes: usize,
	/// Node ids absent from the update.
	pub removed_nodes: usize,
	/// Links new to the live set.
	pub added_links: usize,
	/// Links absent from the update.
	pub removed_links: usize,
	/// Links whose source or target did not resolve to a live node.
	pub dropped_links: usize,
}

impl ReconcileReport {
	/// Whether the node or link set changed shape.
	pub fn is_structural(&self) -> bool {
		self.added_nodes + self.removed_nodes + self.added_links + self.removed_links > 0
	}
}

/// Merges `data` into `state`.
pub(super) fn reconcile(
	state: &mut SimulationState,
	data: &GraphData,
	derivers: &[Rc<dyn LinkDeriver>],
	rng: &mut impl Rng,
) -> ReconcileReport {
	let mut report = ReconcileReport::default();

	// Duplicate ids collapse onto the first occurrence.
	let mut order: Vec<(&str, Payload)> = Vec::with_capacity(data.nodes.len());
	let mut seen: HashMap<&str, usize> = HashMap::with_capacity(data.nodes.len());
	for record in &data.nodes {
		match seen.get(record.id.as_str()) {
			Some(&slot) => merge_payload(&mut order[slot].1, &record.payload),
			None => {
				seen.insert(record.id.as_str(), order.len());
				order.push((record.id.as_str(), record.payload.clone()));
			}
		}
	}

	let anchor = state.centroid();
	let mut previous: Vec<Option<SimNode>> =
		std::mem::take(&mut state.nodes).into_iter().map(Some).collect();
	let mut nodes = Vec::with_capacity(order.len());
	let mut fresh = 0usize;
	for (id, payload) in order {
		let known = state
			.index
			.get(id)
			.and_then(|&i| previous.get_mut(i))
			.and_then(Option::take);
		match known {
			Some(mut node) => {
				node.payload = payload;
				nodes.push(node);
			}
			None => {
				nodes.push(spawn_node(id, payload, anchor, fresh, rng));
				fresh += 1;
			}
		}
	}
	report.added_nodes = fresh;
	report.removed_nodes = previous.iter().flatten().count();

	state.nodes = nodes;
	state.rebuild_index();

	let mut records: Vec<LinkRecord> = data.links.clone();
	for deriver in derivers {
		deriver.derive(&state.nodes, &mut records);
	}

	let old_keys: HashSet<LinkKey> = state.links.iter().map(|l| l.key.clone()).collect();
	let mut slots: HashMap<LinkKey, usize> = HashMap::with_capacity(records.len());
	let mut links: Vec<SimLink> = Vec::with_capacity(records.len());
	for record in records {
		let key = record.key();
		if let Some(&slot) = slots.get(&key) {
			merge_payload(&mut links[slot].payload, &record.payload);
			continue;
		}
		let (Some(source), Some(target)) = (
			state.index_of(record.source.id()),
			state.index_of(record.target.id()),
		) else {
			report.dropped_links += 1;
			continue;
		};
		if !old_keys.contains(&key) {
			report.added_links += 1;
		}
		slots.insert(key.clone(), links.len());
		links.push(SimLink {
			key,
			source,
			target,
			payload: record.payload,
		});
	}
	report.removed_links = old_keys.iter().filter(|k| !slots.contains_key(*k)).count();
	state.links = links;

	debug!(
		"reconciled graph: +{} -{} nodes, +{} -{} links, {} unresolved links dropped",
		report.added_nodes,
		report.removed_nodes,
		report.added_links,
		report.removed_links,
		report.dropped_links
	);
	report
}

/// Creates a node that has not been seen before.
///
/// Numeric `x`/`y` payload fields place it; `fx`/`fy` pin it. Otherwise it
/// starts near the current centroid, or on a spiral if nothing is placed yet.
fn spawn_node(
	id: &str,
	payload: Payload,
	anchor: Option<(f64, f64)>,
	nth: usize,
	rng: &mut impl Rng,
) -> SimNode {
	let number = |key: &str| payload.get(key).and_then(Value::as_f64).filter(|v| v.is_finite());
	let (fx, fy) = (number("fx"), number("fy"));

	let (x, y) = match (fx.or(number("x")), fy.or(number("y"))) {
		(Some(x), Some(y)) => (x, y),
		_ => match anchor {
			Some((cx, cy)) => (
				cx + rng.gen_range(-JITTER..JITTER),
				cy + rng.gen_range(-JITTER..JITTER),
			),
			None => {
				let radius = SPIRAL_RADIUS * (0.5 + nth as f64).sqrt();
				let angle = nth as f64 * PI * (3.0 - 5.0_f64.sqrt());
				(radius * angle.cos(), radius * angle.sin())
			}
		},
	};

	let mut node = SimNode::new(id.to_string(), payload, x, y);
	node.fx = fx;
	node.fy = fy;
	node
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;
	use rand::SeedableRng;
	use rand::rngs::SmallRng;
	use serde_json::json;

	use super::*;
	use crate::components::force_graph::types::NodeRecord;

	fn graph(ids: &[&str], links: &[(&str, &str)]) -> GraphData {
		GraphData {
			nodes: ids.iter().map(|id| NodeRecord::new(*id)).collect(),
			links: links.iter().map(|(s, t)| LinkRecord::new(*s, *t)).collect(),
		}
	}

	fn run(state: &mut SimulationState, data: &GraphData) -> ReconcileReport {
		reconcile(state, data, &[], &mut SmallRng::seed_from_u64(3))
	}

	fn positions(state: &SimulationState) -> Vec<(String, f64, f64, f64, f64)> {
		state
			.nodes()
			.iter()
			.map(|n| (n.id.clone(), n.x, n.y, n.vx, n.vy))
			.collect()
	}

	#[test]
	fn first_pass_adds_everything_on_a_spiral() {
		let mut state = SimulationState::default();
		let report = run(&mut state, &graph(&["a", "b", "c"], &[("a", "b")]));
		assert_eq!(report.added_nodes, 3);
		assert_eq!(report.added_links, 1);
		assert!(report.is_structural());

		let first = &state.nodes()[0];
		assert!((first.x.hypot(first.y) - SPIRAL_RADIUS * 0.5_f64.sqrt()).abs() < 1e-9);
		assert_ne!(state.nodes()[1].position(), state.nodes()[2].position());
	}

	#[test]
	fn unresolved_links_are_dropped() {
		let mut state = SimulationState::default();
		let report = run(&mut state, &graph(&["a"], &[("a", "ghost"), ("nobody", "a")]));
		assert_eq!(report.dropped_links, 2);
		assert!(state.links().is_empty());
	}

	#[test]
	fn removing_a_node_drops_incident_links() {
		let mut state = SimulationState::default();
		run(&mut state, &graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]));
		let report = run(&mut state, &graph(&["a", "c"], &[("a", "b"), ("b", "c")]));

		assert_eq!(report.removed_nodes, 1);
		assert_eq!(report.removed_links, 2);
		assert_eq!(report.dropped_links, 2);
		assert!(state.links().is_empty());
		assert_eq!(state.index_of("c"), Some(1));
	}

	#[test]
	fn known_nodes_keep_physics_state_and_take_new_payload() {
		let mut state = SimulationState::default();
		run(&mut state, &graph(&["a", "b"], &[]));
		state.nodes[0].vx = 2.5;
		let before = state.nodes[0].clone();

		let mut next = graph(&["b", "a"], &[]);
		next.nodes[1] = NodeRecord::new("a").with("name", "Alice");
		let report = run(&mut state, &next);

		assert!(!report.is_structural());
		let a = state.nodes().iter().find(|n| n.id == "a").unwrap();
		assert_eq!((a.x, a.y, a.vx), (before.x, before.y, 2.5));
		assert_eq!(a.payload["name"], json!("Alice"));
	}

	#[test]
	fn duplicate_ids_merge_payloads() {
		let mut state = SimulationState::default();
		let data = GraphData {
			nodes: vec![
				NodeRecord::new("a").with("name", "one").with("tags", json!(["x"])),
				NodeRecord::new("a").with("name", "two").with("tags", json!(["y"])),
			],
			links: vec![],
		};
		run(&mut state, &data);
		assert_eq!(state.nodes().len(), 1);
		assert_eq!(state.nodes()[0].payload["name"], json!("one"));
		assert_eq!(state.nodes()[0].payload["tags"], json!(["x", "y"]));
	}

	#[test]
	fn duplicate_links_collapse_by_key() {
		let mut state = SimulationState::default();
		let mut data = graph(&["a", "b"], &[("a", "b"), ("a", "b")]);
		data.links.push(LinkRecord::new("a", "b").with_kind(LinkKind::Tag));
		run(&mut state, &data);
		assert_eq!(state.links().len(), 2);
	}

	#[test]
	fn payload_coordinates_place_and_pin_new_nodes() {
		let mut state = SimulationState::default();
		let data = GraphData {
			nodes: vec![
				NodeRecord::new("a").with("x", 5.0).with("y", -5.0),
				NodeRecord::new("b").with("fx", 40.0).with("fy", 2.0),
			],
			links: vec![],
		};
		run(&mut state, &data);
		assert_eq!(state.nodes()[0].position(), Some((5.0, -5.0)));
		assert!(!state.nodes()[0].is_pinned());
		assert_eq!(state.nodes()[1].position(), Some((40.0, 2.0)));
		assert_eq!((state.nodes()[1].fx, state.nodes()[1].fy), (Some(40.0), Some(2.0)));
	}

	#[test]
	fn new_nodes_join_near_the_centroid() {
		let mut state = SimulationState::default();
		let data = GraphData {
			nodes: vec![
				NodeRecord::new("a").with("x", 100.0).with("y", 100.0),
				NodeRecord::new("b").with("x", 120.0).with("y", 100.0),
			],
			links: vec![],
		};
		run(&mut state, &data);
		let mut more = data.clone();
		more.nodes.push(NodeRecord::new("c"));
		run(&mut state, &more);

		let (x, y) = state.nodes()[2].position().unwrap();
		assert!((x - 110.0).abs() <= JITTER && (y - 100.0).abs() <= JITTER);
	}

	#[test]
	fn derived_links_follow_live_nodes() {
		let derivers: Vec<Rc<dyn LinkDeriver>> = vec![Rc::new(RelationshipLinks), Rc::new(TagLinks)];
		let mut rng = SmallRng::seed_from_u64(9);
		let mut state = SimulationState::default();
		let data = GraphData {
			nodes: vec![
				NodeRecord::new("ann")
					.with("relationships", json!(["bob", {"id": "cat", "role": "mentor"}, {"target": "ghost"}]))
					.with("tags", json!(["rust"])),
				NodeRecord::new("bob"),
				NodeRecord::new("cat"),
				NodeRecord::new("rust"),
			],
			links: vec![],
		};

		let report = reconcile(&mut state, &data, &derivers, &mut rng);
		assert_eq!(report.added_links, 3);
		assert_eq!(report.dropped_links, 1);
		let mentor = state
			.links()
			.iter()
			.find(|l| l.key.to_string() == "ann-relationship-cat")
			.unwrap();
		assert_eq!(mentor.payload["role"], json!("mentor"));

		let mut shrunk = data.clone();
		shrunk.nodes.retain(|n| n.id != "rust");
		let report = reconcile(&mut state, &shrunk, &derivers, &mut rng);
		assert_eq!(report.removed_links, 1);
		assert!(state.links().iter().all(|l| l.key.kind != LinkKind::Tag));
	}

	proptest! {
		#[test]
		fn node_count_matches_unique_ids(
			first in prop::collection::vec("[a-h]", 0..24),
			second in prop::collection::vec("[a-h]", 0..24),
		) {
			let mut state = SimulationState::default();
			for ids in [&first, &second] {
				let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
				run(&mut state, &graph(&refs, &[]));
				let unique: HashSet<&str> = refs.iter().copied().collect();
				prop_assert_eq!(state.nodes().len(), unique.len());
				prop_assert!(state.nodes().iter().all(|n| unique.contains(n.id.as_str())));
			}
		}

		#[test]
		fn identical_data_twice_is_a_no_op(
			ids in prop::collection::hash_set("[a-z]{1,3}", 1..16),
			link_picks in prop::collection::vec((0usize..16, 0usize..16), 0..24),
		) {
			let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
			let links: Vec<(&str, &str)> = link_picks
				.iter()
				.map(|&(s, t)| (ids[s % ids.len()], ids[t % ids.len()]))
				.collect();
			let data = graph(&ids, &links);

			let mut state = SimulationState::default();
			run(&mut state, &data);
			let before = positions(&state);
			let links_before = state.links().to_vec();
			let report = run(&mut state, &data);

			prop_assert!(!report.is_structural());
			prop_assert_eq!(positions(&state), before);
			prop_assert_eq!(state.links(), &links_before[..]);
		}

		#[test]
		fn adding_a_node_keeps_existing_positions(seed in any::<u64>()) {
			let ids: Vec<String> = (0..10).map(|i| format!("n{i}")).collect();
			let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
			let mut rng = SmallRng::seed_from_u64(seed);
			let mut state = SimulationState::default();
			reconcile(&mut state, &graph(&refs, &[]), &[], &mut rng);
			let before = positions(&state);

			let mut grown = refs.clone();
			grown.push("n10");
			let report = reconcile(&mut state, &graph(&grown, &[]), &[], &mut rng);

			prop_assert_eq!(report.added_nodes, 1);
			prop_assert_eq!(&positions(&state)[..10], &before[..]);
		}
	}
}
