//! Graph data records supplied by the caller.
//!
//! Records are loose on purpose: every field the engine does not know about
//! lands in a flattened JSON payload that is handed back verbatim to styling
//! and interaction callbacks.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::error::Result;

/// Opaque per-entity fields carried alongside the simulation state.
pub type Payload = Map<String, Value>;

/// A node record. Identity is `id`; everything else is payload.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct NodeRecord {
	/// Unique identifier. Numeric ids are accepted and stored as strings.
	#[serde(deserialize_with = "id_string")]
	pub id: String,
	/// Remaining fields of the record.
	#[serde(flatten)]
	pub payload: Payload,
}

impl NodeRecord {
	/// Record with an empty payload.
	pub fn new(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			payload: Payload::new(),
		}
	}

	/// Adds a payload field, builder style.
	pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
		self.payload.insert(key.to_string(), value.into());
		self
	}
}

/// One end of a link: either a bare id or an object carrying an `id` field.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Endpoint {
	/// A bare id.
	Id(#[serde(deserialize_with = "id_string")] String),
	/// An object with an `id` field, as produced by re-serialized data.
	Node {
		/// Node id.
		#[serde(deserialize_with = "id_string")]
		id: String,
	},
}

impl Endpoint {
	/// Node id this endpoint refers to.
	pub fn id(&self) -> &str {
		match self {
			Endpoint::Id(id) | Endpoint::Node { id } => id,
		}
	}
}

impl From<&str> for Endpoint {
	fn from(id: &str) -> Self {
		Endpoint::Id(id.to_string())
	}
}

impl From<String> for Endpoint {
	fn from(id: String) -> Self {
		Endpoint::Id(id)
	}
}

/// Closed set of link tags. Only used for styling and link identity.
#[derive(
	Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
	/// Supplied explicitly in the link list.
	#[default]
	Direct,
	/// Derived from a node's `relationships` field.
	Relationship,
	/// Derived from a node's `tags` field.
	Tag,
	/// Any tag outside the known set.
	#[serde(other)]
	Other,
}

impl LinkKind {
	/// Lowercase name, as used in link keys.
	pub fn as_str(self) -> &'static str {
		match self {
			LinkKind::Direct => "direct",
			LinkKind::Relationship => "relationship",
			LinkKind::Tag => "tag",
			LinkKind::Other => "other",
		}
	}
}

/// A link record between two node ids.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct LinkRecord {
	/// Source endpoint.
	pub source: Endpoint,
	/// Target endpoint.
	pub target: Endpoint,
	/// Serialized as `type`.
	#[serde(rename = "type", default)]
	pub kind: LinkKind,
	/// Remaining fields of the record.
	#[serde(flatten)]
	pub payload: Payload,
}

impl LinkRecord {
	/// Direct link between two endpoints.
	pub fn new(source: impl Into<Endpoint>, target: impl Into<Endpoint>) -> Self {
		Self {
			source: source.into(),
			target: target.into(),
			kind: LinkKind::Direct,
			payload: Payload::new(),
		}
	}

	/// Sets the link kind, builder style.
	pub fn with_kind(mut self, kind: LinkKind) -> Self {
		self.kind = kind;
		self
	}

	/// Identity used to diff links across updates.
	pub fn key(&self) -> LinkKey {
		LinkKey {
			source: self.source.id().to_string(),
			kind: self.kind,
			target: self.target.id().to_string(),
		}
	}
}

/// Composite identity of a link: source id, tag and target id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkKey {
	/// Source node id.
	pub source: String,
	/// Link kind.
	pub kind: LinkKind,
	/// Target node id.
	pub target: String,
}

impl fmt::Display for LinkKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}-{}-{}", self.source, self.kind.as_str(), self.target)
	}
}

/// Complete graph data: nodes and links.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct GraphData {
	/// Node records; duplicate ids are merged when reconciled.
	#[serde(default)]
	pub nodes: Vec<NodeRecord>,
	/// Links by source and target id.
	#[serde(default)]
	pub links: Vec<LinkRecord>,
}

impl GraphData {
	/// Parses `{ "nodes": [...], "links": [...] }`.
	pub fn from_json(text: &str) -> Result<Self> {
		Ok(serde_json::from_str(text)?)
	}
}

/// Merges `from` into `into`: first-seen scalars win, arrays merge by
/// order-preserving set union, objects merge recursively.
pub fn merge_payload(into: &mut Payload, from: &Payload) {
	for (key, value) in from {
		match into.get_mut(key) {
			Some(existing) => merge_value(existing, value),
			None => {
				into.insert(key.clone(), value.clone());
			}
		}
	}
}

fn merge_value(existing: &mut Value, incoming: &Value) {
	match (existing, incoming) {
		(Value::Array(items), Value::Array(more)) => {
			for item in more {
				if !items.contains(item) {
					items.push(item.clone());
				}
			}
		}
		(Value::Object(fields), Value::Object(more)) => merge_payload(fields, more),
		(slot @ Value::Null, value) => *slot = value.clone(),
		_ => {}
	}
}

fn id_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
	D: Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum RawId {
		Text(String),
		Number(serde_json::Number),
	}

	Ok(match RawId::deserialize(deserializer)? {
		RawId::Text(text) => text,
		RawId::Number(number) => number.to_string(),
	})
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn parses_payload_and_endpoint_variants() {
		let data = GraphData::from_json(
			r#"{
				"nodes": [{"id": "a", "name": "Alice", "tags": ["x"]}, {"id": 7}],
				"links": [
					{"source": "a", "target": 7, "type": "relationship", "weight": 2},
					{"source": {"id": "a", "x": 1.0}, "target": "7"}
				]
			}"#,
		)
		.unwrap();

		assert_eq!(data.nodes[0].payload["name"], json!("Alice"));
		assert_eq!(data.nodes[1].id, "7");
		assert_eq!(data.links[0].kind, LinkKind::Relationship);
		assert_eq!(data.links[0].target.id(), "7");
		assert_eq!(data.links[0].payload["weight"], json!(2));
		assert_eq!(data.links[1].source.id(), "a");
		assert_eq!(data.links[1].kind, LinkKind::Direct);
	}

	#[test]
	fn unknown_link_type_is_kept_as_other() {
		let data = GraphData::from_json(
			r#"{"nodes": [], "links": [{"source": "a", "target": "b", "type": "cites"}]}"#,
		)
		.unwrap();
		assert_eq!(data.links[0].kind, LinkKind::Other);
	}

	#[test]
	fn malformed_json_is_an_error() {
		assert!(GraphData::from_json("{\"nodes\": 3}").is_err());
	}

	#[test]
	fn merge_keeps_first_scalar_and_unions_arrays() {
		let mut first = NodeRecord::new("a")
			.with("name", "first")
			.with("tags", json!(["x", "y"]))
			.with("meta", json!({"team": "core"}))
			.payload;
		let second = NodeRecord::new("a")
			.with("name", "second")
			.with("tags", json!(["y", "z"]))
			.with("meta", json!({"team": "other", "floor": 3}))
			.with("email", "a@example.com")
			.payload;

		merge_payload(&mut first, &second);

		assert_eq!(first["name"], json!("first"));
		assert_eq!(first["tags"], json!(["x", "y", "z"]));
		assert_eq!(first["meta"], json!({"team": "core", "floor": 3}));
		assert_eq!(first["email"], json!("a@example.com"));
	}

	#[test]
	fn link_key_display() {
		let key = LinkRecord::new("a", "b").with_kind(LinkKind::Tag).key();
		assert_eq!(key.to_string(), "a-tag-b");
	}
}
