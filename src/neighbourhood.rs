use std::collections::HashSet;

use crate::chord_id::ChordId;
use crate::error::{Error, Result};
use crate::node::NodeRef;

/// A group of nodes a local node knows about, kept sorted by id so that ring
/// neighbours can be found by position.
#[derive(Clone, Debug, Default)]
pub struct Neighbourhood {
	nodes: Vec<NodeRef>,
	ids: HashSet<ChordId>,
}

impl Neighbourhood {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_capacity(capacity: usize) -> Self {
		Neighbourhood {
			nodes: Vec::with_capacity(capacity),
			ids: HashSet::with_capacity(capacity),
		}
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn contains(&self, id: ChordId) -> bool {
		self.ids.contains(&id)
	}

	/// Insert a node. Ids must be unique.
	pub fn add(&mut self, node: NodeRef) -> Result<()> {
		if !self.ids.insert(node.id) {
			return Err(Error::NodeIdConflict(node.id));
		}
		let idx = self.nodes.partition_point(|n| n.id < node.id);
		self.nodes.insert(idx, node);
		Ok(())
	}

	pub fn remove(&mut self, id: ChordId) -> Option<NodeRef> {
		if !self.ids.remove(&id) {
			return None;
		}
		let idx = self.nodes.binary_search_by(|n| n.id.cmp(&id)).ok()?;
		Some(self.nodes.remove(idx))
	}

	/// Get the node for id together with the ids of its ring neighbours
	/// within this neighbourhood (predecessor, successor).
	pub fn get(&self, id: ChordId) -> Option<(&NodeRef, ChordId, ChordId)> {
		let idx = self.nodes.binary_search_by(|n| n.id.cmp(&id)).ok()?;
		let last = self.nodes.len() - 1;
		let pred = if idx == 0 { self.nodes[last].id } else { self.nodes[idx - 1].id };
		let succ = if idx == last { self.nodes[0].id } else { self.nodes[idx + 1].id };
		Some((&self.nodes[idx], pred, succ))
	}

	/// First known node strictly after id in ring order.
	pub fn successor_of(&self, id: ChordId) -> Option<&NodeRef> {
		let idx = self.nodes.partition_point(|n| n.id <= id);
		self.nodes.get(idx).or_else(|| self.nodes.first())
	}

	/// Last known node strictly before id in ring order.
	pub fn predecessor_of(&self, id: ChordId) -> Option<&NodeRef> {
		let idx = self.nodes.partition_point(|n| n.id < id);
		if idx == 0 {
			self.nodes.last()
		} else {
			self.nodes.get(idx - 1)
		}
	}

	/// All known nodes in ring order, starting after id.
	pub fn iter_from(&self, id: ChordId) -> impl Iterator<Item = &NodeRef> {
		let idx = self.nodes.partition_point(|n| n.id <= id);
		self.nodes[idx..].iter().chain(self.nodes[..idx].iter())
	}

	pub fn iter(&self) -> impl Iterator<Item = &NodeRef> {
		self.nodes.iter()
	}
}
