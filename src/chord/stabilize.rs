use std::sync::Arc;

use tracing::{debug, instrument};

use super::LocalNode;
use crate::chord_id::ChordId;
use crate::error::{Error, Result};
use crate::interval::Interval;
use crate::node::NodeRef;

impl LocalNode {
	/// One round of ring repair: adopt a closer successor if one has joined,
	/// notify the successor about this node, then refresh every finger.
	///
	/// Returns the number of finger table entries that changed.
	#[instrument(level = "debug", skip(self), fields(node = %self.id))]
	pub async fn stabilize(self: &Arc<Self>) -> Result<usize> {
		let succ = self.successor()?.ok_or(Error::NoSuccessor)?;
		let x = self
			.resolve(&succ)
			.await
			.map_err(|e| e.during("stabilize", succ.id))?
			.predecessor()?;

		let me = self.node_ref();
		let mut changes = 0;
		if let Some(x) = self.adopt_successor(x)? {
			changes += 1;
			self.resolve(&x).await?.set_predecessor(&me).await?;
		}

		let succ = self.successor()?.ok_or(Error::NoSuccessor)?;
		self.resolve(&succ)
			.await?
			.notify(&me)
			.await
			.map_err(|e| e.during("notify", succ.id))?;

		changes += self.fix_fingers().await?;
		debug!(node = %self.id, changes, "stabilized");
		Ok(changes)
	}

	/// Takes x as successor if it sits between this node and the current
	/// successor. Check and update happen under one lock.
	fn adopt_successor(&self, x: Option<NodeRef>) -> Result<Option<NodeRef>> {
		let x = match x {
			Some(x) => x,
			None => return Ok(None),
		};
		let mut state = self.lock()?;
		let succ = state.finger_table.successor().ok_or(Error::NoSuccessor)?.id;
		if !Interval::open(self.m, self.id, succ).has(x.id) {
			return Ok(None);
		}
		state.finger_table.set_node_at_entry(0, &x)?;
		Ok(Some(x))
	}

	/// n thinks it might be our predecessor.
	pub fn notify(&self, n: &NodeRef) -> Result<bool> {
		let mut state = self.lock()?;
		let accept = match &state.pred {
			None => true,
			Some(pred) => pred.id != n.id && Interval::new(self.m, pred.id, self.id).has(n.id),
		};
		if accept {
			debug!(node = %self.id, pred = %n, "notified of new predecessor");
			state.pred = Some(n.clone());
		}
		Ok(accept)
	}

	/// Recompute the successor of every finger start.
	#[instrument(level = "debug", skip(self), fields(node = %self.id))]
	pub async fn fix_fingers(self: &Arc<Self>) -> Result<usize> {
		let starts: Vec<ChordId> = self.finger_table()?.entries().map(|(e, _)| e.start).collect();
		let mut changes = 0;
		for (i, start) in starts.into_iter().enumerate() {
			let n = self
				.find_successor(start)
				.await
				.map_err(|e| e.during("fix_fingers", self.id))?;
			if self.set_finger(i, &n)? {
				changes += 1;
			}
		}
		Ok(changes)
	}
}
