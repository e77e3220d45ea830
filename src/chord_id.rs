use std::fmt;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::error::{Error, Result};

/// The bit-width of the ring. A ring of rank m holds the ids [0, 2^m) and
/// every node keeps m fingers.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Rank(u32);

impl Rank {
	/// Largest supported rank; ids are stored in a u64.
	pub const MAX: u32 = 64;

	pub fn new(m: u32) -> Result<Self> {
		if m == 0 || m > Self::MAX {
			return Err(Error::InvalidRank(m));
		}
		Ok(Rank(m))
	}

	pub fn bits(&self) -> u32 {
		self.0
	}

	/// Number of ids on the ring, 2^m.
	pub fn ring_size(&self) -> u128 {
		1u128 << self.0
	}

	/// Number of finger table entries, m.
	pub fn finger_count(&self) -> usize {
		self.0 as usize
	}

	pub fn contains(&self, id: u64) -> bool {
		(id as u128) < self.ring_size()
	}
}

impl TryFrom<u32> for Rank {
	type Error = Error;
	fn try_from(m: u32) -> Result<Self> {
		Rank::new(m)
	}
}

impl From<Rank> for u32 {
	fn from(rank: Rank) -> u32 {
		rank.0
	}
}

impl fmt::Display for Rank {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// A ChordId is a point around the chord ring. Ids are compared as plain
/// integers; ring order is expressed through [crate::interval::Interval].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChordId(u64);

impl ChordId {
	/// Creates an id, checking that it lies on a ring of rank m.
	pub fn new(id: u64, m: Rank) -> Result<Self> {
		if !m.contains(id) {
			return Err(Error::InvalidId { id, rank: m.bits() });
		}
		Ok(ChordId(id))
	}

	pub fn as_u64(&self) -> u64 {
		self.0
	}

	/// (self + other) mod 2^m
	pub fn add(&self, other: ChordId, m: Rank) -> ChordId {
		let sum = (self.0 as u128 + other.0 as u128) % m.ring_size();
		ChordId(sum as u64)
	}

	/// (self - other) mod 2^m, always non-negative.
	pub fn sub(&self, other: ChordId, m: Rank) -> ChordId {
		let size = m.ring_size();
		let lhs = self.0 as u128 % size;
		let rhs = other.0 as u128 % size;
		ChordId(((lhs + size - rhs) % size) as u64)
	}

	/// 2^k mod 2^m
	pub fn pow(k: u32, m: Rank) -> ChordId {
		if k >= m.bits() {
			return ChordId(0);
		}
		ChordId(1u64 << k)
	}

	/// Calculate the start of finger k for this id: self + 2^k mod 2^m.
	pub fn finger_start(&self, k: usize, m: Rank) -> ChordId {
		self.add(ChordId::pow(k as u32, m), m)
	}
}

impl From<u64> for ChordId {
	fn from(id: u64) -> Self {
		ChordId(id)
	}
}

impl From<ChordId> for u64 {
	fn from(id: ChordId) -> u64 {
		id.0
	}
}

impl fmt::Display for ChordId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Derive a node id from a key (usually the bind address): the first eight
/// bytes of its SHA-1 digest, big endian, reduced mod 2^m.
pub fn assign_id(key: &[u8], m: Rank) -> ChordId {
	let mut hasher = Sha1::new();
	hasher.update(key);
	let digest = hasher.finalize();
	let mut head = [0u8; 8];
	head.copy_from_slice(&digest[..8]);
	let raw = u64::from_be_bytes(head) as u128 % m.ring_size();
	ChordId(raw as u64)
}
