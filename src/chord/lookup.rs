use std::sync::Arc;

use tracing::{instrument, trace};

use super::{LocalNode, Node};
use crate::chord_id::ChordId;
use crate::error::{Error, Result};
use crate::interval::Interval;
use crate::node::NodeRef;

impl LocalNode {
	/// The finger that most closely precedes id, scanning from the widest
	/// finger down. Falls back to this node.
	pub fn closest_preceding_finger(&self, id: ChordId) -> Result<NodeRef> {
		let state = self.lock()?;
		let between = Interval::open(self.m, self.id, id);
		for (_, node) in state.finger_table.entries().rev() {
			if between.has(node.id) {
				return Ok(node.clone());
			}
		}
		Ok(self.node_ref())
	}

	/// Walk the ring towards id until reaching the node whose successor owns
	/// it. Each hop is a remote call unless it lands back on this node.
	pub(crate) async fn find_predecessor_node(self: &Arc<Self>, id: ChordId) -> Result<Node> {
		let mut cur = Node::Local(self.clone());
		for hop in 0..=self.max_hops {
			if cur.precedes(id, self.m).map_err(|e| e.during("find_predecessor", cur.id()))? {
				trace!(node = %self.id, %id, hop, pred = %cur.id(), "found predecessor");
				return Ok(cur);
			}
			let next = cur
				.closest_preceding_finger(id)
				.await
				.map_err(|e| e.during("closest_preceding_finger", cur.id()))?;
			cur = self.resolve(&next).await.map_err(|e| e.during("find_predecessor", next.id))?;
		}
		Err(Error::HopLimitExceeded {
			op: "find_predecessor",
			hops: self.max_hops,
		})
	}

	#[instrument(level = "debug", skip(self), fields(node = %self.id))]
	pub async fn find_predecessor(self: &Arc<Self>, id: ChordId) -> Result<NodeRef> {
		Ok(self.find_predecessor_node(id).await?.node_ref())
	}

	/// The node owning id: the successor of id's predecessor.
	#[instrument(level = "debug", skip(self), fields(node = %self.id))]
	pub async fn find_successor(self: &Arc<Self>, id: ChordId) -> Result<NodeRef> {
		let pred = self.find_predecessor_node(id).await?;
		pred.successor()?.ok_or(Error::NoSuccessor)
	}
}
