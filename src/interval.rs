use std::fmt;

use crate::chord_id::{ChordId, Rank};

/// Whether an interval boundary includes its endpoint.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Bound {
	Open,
	Closed,
}

/// An arc of the ring walking clockwise from `start` to `end`.
///
/// Both boundaries are configured independently and default to `[start, end)`.
/// When `start == end` the arc covers the whole ring; the endpoint itself is
/// only excluded when both sides are open, so `(x, x)` means "any id but x".
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Interval {
	m: Rank,
	pub start: ChordId,
	pub end: ChordId,
	left: Bound,
	right: Bound,
}

impl Interval {
	pub fn new(m: Rank, start: ChordId, end: ChordId) -> Self {
		Interval {
			m,
			start,
			end,
			left: Bound::Closed,
			right: Bound::Open,
		}
	}

	pub fn left_open(mut self) -> Self {
		self.left = Bound::Open;
		self
	}

	pub fn left_closed(mut self) -> Self {
		self.left = Bound::Closed;
		self
	}

	pub fn right_open(mut self) -> Self {
		self.right = Bound::Open;
		self
	}

	pub fn right_closed(mut self) -> Self {
		self.right = Bound::Closed;
		self
	}

	/// (start, end)
	pub fn open(m: Rank, start: ChordId, end: ChordId) -> Self {
		Interval::new(m, start, end).left_open()
	}

	/// (start, end]
	pub fn open_closed(m: Rank, start: ChordId, end: ChordId) -> Self {
		Interval::new(m, start, end).left_open().right_closed()
	}

	pub fn rank(&self) -> Rank {
		self.m
	}

	/// Tests if id lies on the arc.
	pub fn has(&self, id: ChordId) -> bool {
		if !self.m.contains(id.as_u64()) {
			return false;
		}
		let left = match self.left {
			Bound::Open => self.start < id,
			Bound::Closed => self.start <= id,
		};
		let right = match self.right {
			Bound::Open => id < self.end,
			Bound::Closed => id <= self.end,
		};
		if self.start < self.end {
			left && right
		} else {
			// crosses 0: [start, 2^m) united with [0, end)
			left || right
		}
	}
}

impl fmt::Display for Interval {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let l = match self.left {
			Bound::Open => "(",
			Bound::Closed => "[",
		};
		let r = match self.right {
			Bound::Open => ")",
			Bound::Closed => "]",
		};
		write!(f, "{}{}, {}{}", l, self.start, self.end, r)
	}
}
