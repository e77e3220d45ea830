//! Errors of the chord ring.

use crate::chord_id::ChordId;

/// A wrap `Result` contains ring errors.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
	#[error("node {0} is not known to the current local node")]
	NodeNotFound(ChordId),

	#[error("cannot set {index}th finger table entry to {id}: NodeID not found in the neighbourhood")]
	NodeIdNotInNeighbourhood { index: usize, id: ChordId },

	#[error("no successor node found")]
	NoSuccessor,

	#[error("no predecessor node found")]
	NoPredecessor,

	#[error("node id {0} already exists in the neighbourhood")]
	NodeIdConflict(ChordId),

	#[error("finger table index {index} out of range for rank {rank}")]
	FingerIndexOutOfRange { index: usize, rank: u32 },

	#[error("invalid rank {0}: must be between 1 and 64")]
	InvalidRank(u32),

	#[error("invalid id {id}: id must be between 0 and 2**{rank}")]
	InvalidId { id: u64, rank: u32 },

	#[error("{op} gave up after {hops} hops")]
	HopLimitExceeded { op: &'static str, hops: u32 },

	#[error(transparent)]
	Transport(#[from] std::io::Error),

	#[error("codec error: {0}")]
	Codec(#[from] serde_json::Error),

	#[error("message of {size} bytes exceeds the {limit} byte limit")]
	MessageTooLarge { size: usize, limit: usize },

	#[error("node at {bind} replied with an error: {msg}")]
	Remote { bind: String, msg: String },

	#[error("unexpected response to {0}")]
	UnexpectedResponse(&'static str),

	#[error("no node is listening on {0}")]
	UnknownNode(String),

	#[error("could not join the ring through any of {0:?}")]
	JoinFailed(Vec<String>),

	#[error("ring state lock poisoned")]
	LockPoisoned,

	#[error("{op} failed on node {node}: {source}")]
	Context {
		op: &'static str,
		node: ChordId,
		#[source]
		source: Box<Error>,
	},
}

impl Error {
	/// Wrap this error with the operation and node it surfaced from.
	pub fn during(self, op: &'static str, node: ChordId) -> Self {
		Error::Context { op, node, source: Box::new(self) }
	}
}

impl<T> From<std::sync::PoisonError<T>> for Error {
	fn from(_: std::sync::PoisonError<T>) -> Self {
		Error::LockPoisoned
	}
}
