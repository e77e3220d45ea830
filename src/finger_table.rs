use std::collections::HashMap;
use std::fmt;

use crate::chord_id::{ChordId, Rank};
use crate::error::{Error, Result};
use crate::interval::Interval;
use crate::neighbourhood::Neighbourhood;
use crate::node::{FingerEntryInfo, NodeRef};

/// A cached node plus the number of finger entries pointing at it.
#[derive(Clone, Debug)]
struct Slot {
	node: NodeRef,
	refs: usize,
}

/// Finger k covers the keys in `[start_k, start_{k+1})`.
#[derive(Clone, Debug)]
pub struct FingerEntry {
	pub start: ChordId,
	pub interval: Interval,
	slot: usize,
}

/// The routing table of one local node.
///
/// Node references live in an arena of slots; entries hold slot indices and
/// every slot counts how many entries use it. A slot is released as soon as
/// its count drops to zero, except for the owner's own slot which lives as
/// long as the table.
#[derive(Clone, Debug)]
pub struct FingerTable {
	owner: ChordId,
	m: Rank,
	entries: Vec<FingerEntry>,
	slots: Vec<Option<Slot>>,
	free: Vec<usize>,
	neighbourhood: HashMap<ChordId, usize>,
}

impl FingerTable {
	/// Build the table of a node that only knows itself: every finger points
	/// back at the owner.
	pub fn new(owner: &NodeRef, m: Rank) -> Self {
		let fingers = m.finger_count();
		let mut table = FingerTable {
			owner: owner.id,
			m,
			entries: Vec::with_capacity(fingers),
			slots: Vec::with_capacity(fingers),
			free: Vec::new(),
			neighbourhood: HashMap::with_capacity(fingers),
		};
		let owner_slot = table.acquire(owner);
		if let Some(slot) = table.slots[owner_slot].as_mut() {
			slot.refs = fingers;
		}
		for k in 0..fingers {
			let start = owner.id.finger_start(k, m);
			let end = owner.id.finger_start(k + 1, m);
			table.entries.push(FingerEntry {
				start,
				interval: Interval::new(m, start, end),
				slot: owner_slot,
			});
		}
		table
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn owner(&self) -> ChordId {
		self.owner
	}

	pub fn entry(&self, i: usize) -> Result<&FingerEntry> {
		self.entries.get(i).ok_or(Error::FingerIndexOutOfRange {
			index: i,
			rank: self.m.bits(),
		})
	}

	/// The node currently serving finger i.
	pub fn node_at(&self, i: usize) -> Result<&NodeRef> {
		let entry = self.entry(i)?;
		self.slot_node(entry.slot)
	}

	/// The node serving finger 0, i.e. the successor of the owner.
	pub fn successor(&self) -> Option<&NodeRef> {
		self.node_at(0).ok()
	}

	pub fn entries(&self) -> impl DoubleEndedIterator<Item = (&FingerEntry, &NodeRef)> {
		self.entries
			.iter()
			.filter_map(|e| self.slot_node(e.slot).ok().map(|n| (e, n)))
	}

	/// Point finger i at n. Returns whether the entry changed.
	pub fn set_node_at_entry(&mut self, i: usize, n: &NodeRef) -> Result<bool> {
		let old_slot = self.entry(i)?.slot;
		if self.slot_node(old_slot)?.id == n.id {
			return Ok(false);
		}
		self.release(old_slot);
		let new_slot = self.acquire(n);
		self.entries[i].slot = new_slot;
		Ok(true)
	}

	/// Point finger i at an already cached node.
	pub fn set_id(&mut self, i: usize, id: ChordId) -> Result<bool> {
		let node = match self.get_node_by_id(id) {
			Some(node) => node.clone(),
			None => return Err(Error::NodeIdNotInNeighbourhood { index: i, id }),
		};
		self.set_node_at_entry(i, &node)
	}

	/// Copy the node of finger j into finger i.
	pub fn replace_node_with_another_entry(&mut self, i: usize, j: usize) -> Result<bool> {
		let id = self.node_at(j)?.id;
		self.set_id(i, id)
	}

	pub fn get_node_by_id(&self, id: ChordId) -> Option<&NodeRef> {
		let slot = *self.neighbourhood.get(&id)?;
		self.slot_node(slot).ok()
	}

	pub fn has_node(&self, id: ChordId) -> bool {
		self.neighbourhood.contains_key(&id)
	}

	/// Snapshot of every cached node, sorted for ring-order queries.
	pub fn neighbourhood(&self) -> Neighbourhood {
		let mut neighbourhood = Neighbourhood::with_capacity(self.neighbourhood.len());
		for slot in self.slots.iter().flatten() {
			// ids are unique in the index, so this cannot conflict
			let _ = neighbourhood.add(slot.node.clone());
		}
		neighbourhood
	}

	pub fn as_info(&self) -> Vec<FingerEntryInfo> {
		self.entries()
			.map(|(e, n)| FingerEntryInfo {
				start: e.start,
				end: e.interval.end,
				node: n.clone(),
			})
			.collect()
	}

	fn slot_node(&self, slot: usize) -> Result<&NodeRef> {
		match self.slots.get(slot) {
			Some(Some(s)) => Ok(&s.node),
			_ => Err(Error::NodeNotFound(self.owner)),
		}
	}

	/// Find or cache n, taking one reference on its slot.
	fn acquire(&mut self, n: &NodeRef) -> usize {
		if let Some(&slot) = self.neighbourhood.get(&n.id) {
			if let Some(s) = self.slots[slot].as_mut() {
				s.refs += 1;
			}
			return slot;
		}
		let slot = Slot { node: n.clone(), refs: 1 };
		let idx = match self.free.pop() {
			Some(idx) => {
				self.slots[idx] = Some(slot);
				idx
			}
			None => {
				self.slots.push(Some(slot));
				self.slots.len() - 1
			}
		};
		self.neighbourhood.insert(n.id, idx);
		idx
	}

	/// Drop one reference, evicting the node once nothing points at it.
	fn release(&mut self, slot: usize) {
		let evict = match self.slots[slot].as_mut() {
			Some(s) => {
				s.refs = s.refs.saturating_sub(1);
				s.refs == 0 && s.node.id != self.owner
			}
			None => false,
		};
		if evict {
			if let Some(s) = self.slots[slot].take() {
				self.neighbourhood.remove(&s.node.id);
				self.free.push(slot);
			}
		}
	}
}

impl fmt::Display for FingerTable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "{:<8}| {:<16}| Successor", "Start", "[Start, End)")?;
		for (entry, node) in self.entries() {
			writeln!(f, "{:<8}| {:<16}| {}", entry.start, entry.interval.to_string(), node)?;
		}
		Ok(())
	}
}
