use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chord_id::ChordId;

/// The minimal identity of a ring member: its id plus the address needed to
/// reach it.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct NodeRef {
	pub id: ChordId,
	pub bind: String,
}

impl NodeRef {
	pub fn new(id: ChordId, bind: impl Into<String>) -> Self {
		NodeRef { id, bind: bind.into() }
	}
}

impl fmt::Display for NodeRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "<@{} {}>", self.id, self.bind)
	}
}

/// Identity plus the routing pointers of a node, as reported over the wire.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct NodeInfo {
	pub id: ChordId,
	pub bind: String,
	pub pred: Option<NodeRef>,
	pub succ: Option<NodeRef>,
}

impl NodeInfo {
	pub fn node_ref(&self) -> NodeRef {
		NodeRef::new(self.id, self.bind.clone())
	}
}

/// One row of a finger table snapshot: `[start, end)` is served by `node`.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct FingerEntryInfo {
	pub start: ChordId,
	pub end: ChordId,
	pub node: NodeRef,
}

impl fmt::Display for FingerEntryInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{},{},{}", self.start, self.end, self.node.id)
	}
}
