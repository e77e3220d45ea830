use std::fmt::{self, Write};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::adaptor::ChordAdaptor;
use crate::chord::message::{NodeReport, Request, Response};
use crate::chord_id::ChordId;
use crate::error::Result;
use crate::node::NodeRef;

/// A client for the requests a node answers. Peers use it underneath their
/// remote proxies; operators use it to inspect and drive a node.
#[derive(Clone)]
pub struct AssociateClient {
	bind: String,
	adaptor: Arc<dyn ChordAdaptor>,
}

impl fmt::Debug for AssociateClient {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AssociateClient").field("bind", &self.bind).finish()
	}
}

impl AssociateClient {
	pub fn new(bind: impl Into<String>, adaptor: Arc<dyn ChordAdaptor>) -> Self {
		AssociateClient { bind: bind.into(), adaptor }
	}

	pub fn bind(&self) -> &str {
		&self.bind
	}

	async fn send_op(&self, request: Request) -> Result<Response> {
		debug!(to = %self.bind, op = request.name(), "sending request");
		self.adaptor.request(&self.bind, request).await
	}

	#[instrument(skip(self), fields(to = %self.bind))]
	pub async fn get_node_info(&self, include_finger_table: bool) -> Result<NodeReport> {
		self.send_op(Request::GetNodeInfo { include_finger_table }).await?.into_report()
	}

	pub async fn find_predecessor(&self, id: ChordId) -> Result<NodeRef> {
		self.send_op(Request::FindPredecessor { id }).await?.into_node("find_predecessor")
	}

	pub async fn find_successor(&self, id: ChordId) -> Result<NodeRef> {
		self.send_op(Request::FindSuccessor { id }).await?.into_node("find_successor")
	}

	pub async fn closest_preceding_finger(&self, id: ChordId) -> Result<NodeRef> {
		self.send_op(Request::ClosestPrecedingFinger { id })
			.await?
			.into_node("closest_preceding_finger")
	}

	pub async fn set_predecessor(&self, node: &NodeRef) -> Result<()> {
		self.send_op(Request::SetPredecessorNode { node: node.clone() })
			.await?
			.into_empty("set_predecessor_node")
	}

	pub async fn set_successor(&self, node: &NodeRef) -> Result<()> {
		self.send_op(Request::SetSuccessorNode { node: node.clone() })
			.await?
			.into_empty("set_successor_node")
	}

	pub async fn notify(&self, node: &NodeRef) -> Result<()> {
		self.send_op(Request::Notify { node: node.clone() }).await?.into_empty("notify")
	}

	pub async fn update_finger_table(&self, node: &NodeRef, i: usize, hops: u32) -> Result<()> {
		self.send_op(Request::UpdateFingerTable { node: node.clone(), i, hops })
			.await?
			.into_empty("update_finger_table")
	}

	/// Ask the node to join the ring known to `introducer`.
	#[instrument(skip(self), fields(to = %self.bind))]
	pub async fn join_ring(&self, introducer: &str) -> Result<()> {
		self.send_op(Request::JoinRing { introducer: introducer.to_string() })
			.await?
			.into_empty("join_ring")
	}

	/// Force one stabilization round; returns the number of changed fingers.
	pub async fn stabilize(&self) -> Result<usize> {
		self.send_op(Request::Stabilize).await?.into_changes()
	}

	pub async fn fix_fingers(&self) -> Result<()> {
		self.send_op(Request::FixFingers).await?.into_empty("fix_fingers")
	}

	/// A human readable dump of the node's routing state.
	pub async fn debug(&self) -> Result<String> {
		let report = self.get_node_info(true).await?;
		let mut out = String::new();
		let node = &report.node;
		let _ = writeln!(out, "node {} at {}", node.id, node.bind);
		match &node.pred {
			Some(pred) => {
				let _ = writeln!(out, "  pred {}", pred);
			}
			None => out.push_str("  pred none\n"),
		}
		match &node.succ {
			Some(succ) => {
				let _ = writeln!(out, "  succ {}", succ);
			}
			None => out.push_str("  succ none\n"),
		}
		for entry in report.finger_table.iter().flatten() {
			let _ = writeln!(out, "  [{}, {}) {}", entry.start, entry.end, entry.node);
		}
		Ok(out)
	}
}
