use serde::{Deserialize, Serialize};

use crate::chord_id::ChordId;
use crate::error::{Error, Result};
use crate::node::{FingerEntryInfo, NodeInfo, NodeRef};

/// Every call a node answers, whether it comes from a peer or an operator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Request {
	GetNodeInfo { include_finger_table: bool },
	FindPredecessor { id: ChordId },
	FindSuccessor { id: ChordId },
	ClosestPrecedingFinger { id: ChordId },
	SetPredecessorNode { node: NodeRef },
	SetSuccessorNode { node: NodeRef },
	Notify { node: NodeRef },
	JoinRing { introducer: String },
	UpdateFingerTable { node: NodeRef, i: usize, hops: u32 },

	// Debug triggers
	Stabilize,
	FixFingers,
}

impl Request {
	/// Short name used in logs and error context.
	pub fn name(&self) -> &'static str {
		match self {
			Request::GetNodeInfo { .. } => "get_node_info",
			Request::FindPredecessor { .. } => "find_predecessor",
			Request::FindSuccessor { .. } => "find_successor",
			Request::ClosestPrecedingFinger { .. } => "closest_preceding_finger",
			Request::SetPredecessorNode { .. } => "set_predecessor_node",
			Request::SetSuccessorNode { .. } => "set_successor_node",
			Request::Notify { .. } => "notify",
			Request::JoinRing { .. } => "join_ring",
			Request::UpdateFingerTable { .. } => "update_finger_table",
			Request::Stabilize => "stabilize",
			Request::FixFingers => "fix_fingers",
		}
	}
}

/// Identity and routing snapshot of a node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeReport {
	pub node: NodeInfo,
	pub finger_table: Option<Vec<FingerEntryInfo>>,
	/// Every node cached by the finger table, in ring order after the node.
	pub neighbours: Option<Vec<NodeRef>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Response {
	NodeInfo(NodeReport),
	Node { node: NodeRef },
	Stabilized { num_finger_table_entry_changes: usize },
	Empty,
	Error { msg: String },
}

impl Response {
	pub fn into_report(self) -> Result<NodeReport> {
		match self {
			Response::NodeInfo(report) => Ok(report),
			_ => Err(Error::UnexpectedResponse("get_node_info")),
		}
	}

	pub fn into_node(self, op: &'static str) -> Result<NodeRef> {
		match self {
			Response::Node { node } => Ok(node),
			_ => Err(Error::UnexpectedResponse(op)),
		}
	}

	pub fn into_changes(self) -> Result<usize> {
		match self {
			Response::Stabilized { num_finger_table_entry_changes } => Ok(num_finger_table_entry_changes),
			_ => Err(Error::UnexpectedResponse("stabilize")),
		}
	}

	pub fn into_empty(self, op: &'static str) -> Result<()> {
		match self {
			Response::Empty => Ok(()),
			_ => Err(Error::UnexpectedResponse(op)),
		}
	}
}
