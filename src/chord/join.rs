use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::{LocalNode, RemoteNode};
use crate::chord_id::ChordId;
use crate::error::{Error, Result};
use crate::finger_table::FingerTable;
use crate::interval::Interval;
use crate::node::NodeRef;

impl LocalNode {
	/// Enter the ring known to the node at `introducer`.
	///
	/// The finger table is built on a copy and only installed once every
	/// lookup succeeded, then the existing members are told about this node.
	#[instrument(skip(self), fields(node = %self.id))]
	pub async fn join(self: &Arc<Self>, introducer: &str) -> Result<()> {
		let introducer = RemoteNode::connect(introducer, self.adaptor.clone())
			.await
			.map_err(|e| e.during("join", self.id))?;
		if introducer.id() == self.id {
			return Err(Error::NodeIdConflict(self.id));
		}
		self.init_finger(&introducer)
			.await
			.map_err(|e| e.during("init_finger", self.id))?;
		self.update_others()
			.await
			.map_err(|e| e.during("update_others", self.id))?;

		info!(node = %self.id, via = %introducer.node_ref(), "joined ring");
		debug!("finger table after join:\n{}", self.finger_table()?);
		Ok(())
	}

	async fn init_finger(self: &Arc<Self>, introducer: &RemoteNode) -> Result<()> {
		let mut table = self.finger_table()?;
		let succ = introducer.find_successor(table.entry(0)?.start).await?;
		table.set_node_at_entry(0, &succ)?;

		let succ_node = self.resolve(&succ).await?;
		let pred = succ_node.predecessor()?.ok_or(Error::NoPredecessor)?;

		for i in 0..table.len() - 1 {
			let next_start = table.entry(i + 1)?.start;
			let served_by = table.node_at(i)?.id;
			if Interval::new(self.m, self.id, served_by).has(next_start) {
				table.replace_node_with_another_entry(i + 1, i)?;
			} else {
				let n = introducer.find_successor(next_start).await?;
				table.set_node_at_entry(i + 1, &n)?;
			}
		}

		// nothing outside this node changes until every lookup went through
		succ_node.set_predecessor(&self.node_ref()).await?;
		self.install(table, pred)
	}

	fn install(&self, table: FingerTable, pred: NodeRef) -> Result<()> {
		let mut state = self.lock()?;
		state.finger_table = table;
		state.pred = Some(pred);
		Ok(())
	}

	/// Tell every node whose finger i should now be this node.
	async fn update_others(self: &Arc<Self>) -> Result<()> {
		let me = self.node_ref();
		for i in 0..self.m.finger_count() {
			let target = self.id.sub(ChordId::pow(i as u32, self.m), self.m);
			let p = self.find_predecessor_node(target).await?;
			p.update_finger_table_entry(&me, i, 0).await?;
		}
		Ok(())
	}

	/// Adopt s as finger i if it is closer than the current one, then pass it
	/// on to the predecessor. The chain is cut after `max_hops` forwards.
	#[instrument(level = "debug", skip(self), fields(node = %self.id, s = %s.id))]
	pub async fn update_finger_table_entry(self: &Arc<Self>, s: &NodeRef, i: usize, hops: u32) -> Result<()> {
		if hops > self.max_hops {
			return Err(Error::HopLimitExceeded {
				op: "update_finger_table_entry",
				hops,
			});
		}
		let pred = match self.adopt_finger(s, i)? {
			Some(pred) => pred,
			None => return Ok(()),
		};
		if pred.id == self.id {
			return Ok(());
		}
		let pred = RemoteNode::connect(pred.bind, self.adaptor.clone())
			.await
			.map_err(|e| e.during("update_finger_table_entry", self.id))?;
		pred.update_finger_table_entry(s, i, hops + 1).await
	}

	/// Sets finger i to s when s lies in `(self, finger[i])`, returning the
	/// predecessor to forward to.
	fn adopt_finger(&self, s: &NodeRef, i: usize) -> Result<Option<NodeRef>> {
		let mut state = self.lock()?;
		let current = state.finger_table.node_at(i)?.id;
		if s.id == self.id || !Interval::open(self.m, self.id, current).has(s.id) {
			return Ok(None);
		}
		state.finger_table.set_node_at_entry(i, s)?;
		Ok(state.pred.clone())
	}
}
