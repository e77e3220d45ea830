use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::adaptor::ChordAdaptor;
use crate::chord_id::{ChordId, Rank};
use crate::error::{Error, Result};
use crate::finger_table::FingerTable;
use crate::interval::Interval;
use crate::node::{NodeInfo, NodeRef};

pub mod message;

mod join;
mod lookup;
mod remote;
mod stabilize;

use message::{NodeReport, Request, Response};
pub use remote::RemoteNode;

/// The mutable routing state of a local node. The successor is finger 0.
#[derive(Debug)]
struct RingState {
	pred: Option<NodeRef>,
	finger_table: FingerTable,
}

/// The node running in this process. It owns the authoritative routing state
/// and answers requests from peers through its adaptor.
///
/// Every read-modify-write of the state happens under one lock that is never
/// held across a network call.
pub struct LocalNode {
	id: ChordId,
	bind: String,
	m: Rank,
	max_hops: u32,
	state: Mutex<RingState>,
	adaptor: Arc<dyn ChordAdaptor>,
}

impl std::fmt::Debug for LocalNode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LocalNode")
			.field("id", &self.id)
			.field("bind", &self.bind)
			.field("m", &self.m)
			.finish()
	}
}

impl LocalNode {
	/// Creates a node alone on its own ring: its predecessor and every finger
	/// point back at itself.
	pub fn new(id: ChordId, bind: impl Into<String>, m: Rank, max_hops: u32, adaptor: Arc<dyn ChordAdaptor>) -> Result<Arc<Self>> {
		let id = ChordId::new(id.as_u64(), m)?;
		let me = NodeRef::new(id, bind);
		let state = RingState {
			pred: Some(me.clone()),
			finger_table: FingerTable::new(&me, m),
		};
		Ok(Arc::new(LocalNode {
			id,
			bind: me.bind,
			m,
			max_hops,
			state: Mutex::new(state),
			adaptor,
		}))
	}

	pub fn id(&self) -> ChordId {
		self.id
	}

	pub fn bind(&self) -> &str {
		&self.bind
	}

	pub fn rank(&self) -> Rank {
		self.m
	}

	pub fn node_ref(&self) -> NodeRef {
		NodeRef::new(self.id, self.bind.clone())
	}

	pub fn adaptor(&self) -> &Arc<dyn ChordAdaptor> {
		&self.adaptor
	}

	fn lock(&self) -> Result<MutexGuard<'_, RingState>> {
		Ok(self.state.lock()?)
	}

	pub fn predecessor(&self) -> Result<Option<NodeRef>> {
		Ok(self.lock()?.pred.clone())
	}

	pub fn successor(&self) -> Result<Option<NodeRef>> {
		Ok(self.lock()?.finger_table.successor().cloned())
	}

	pub fn set_predecessor(&self, n: NodeRef) -> Result<()> {
		debug!(node = %self.id, pred = %n, "set predecessor");
		self.lock()?.pred = Some(n);
		Ok(())
	}

	pub fn set_successor(&self, n: &NodeRef) -> Result<bool> {
		self.set_finger(0, n)
	}

	/// Point finger i at n, returning whether the entry changed.
	pub fn set_finger(&self, i: usize, n: &NodeRef) -> Result<bool> {
		self.lock()?.finger_table.set_node_at_entry(i, n)
	}

	/// A copy of the current finger table.
	pub fn finger_table(&self) -> Result<FingerTable> {
		Ok(self.lock()?.finger_table.clone())
	}

	pub fn info(&self) -> Result<NodeInfo> {
		let state = self.lock()?;
		Ok(self.info_of(&state))
	}

	fn info_of(&self, state: &RingState) -> NodeInfo {
		NodeInfo {
			id: self.id,
			bind: self.bind.clone(),
			pred: state.pred.clone(),
			succ: state.finger_table.successor().cloned(),
		}
	}

	pub fn report(&self, include_finger_table: bool) -> Result<NodeReport> {
		let state = self.lock()?;
		let node = self.info_of(&state);
		if !include_finger_table {
			return Ok(NodeReport { node, finger_table: None, neighbours: None });
		}
		let neighbours = state
			.finger_table
			.neighbourhood()
			.iter_from(self.id)
			.cloned()
			.collect();
		Ok(NodeReport {
			node,
			finger_table: Some(state.finger_table.as_info()),
			neighbours: Some(neighbours),
		})
	}

	/// Turn a reference into something that can be called: this node itself,
	/// or a proxy holding a fresh snapshot of the remote node.
	pub async fn resolve(self: &Arc<Self>, n: &NodeRef) -> Result<Node> {
		if n.id == self.id {
			return Ok(Node::Local(self.clone()));
		}
		let remote = RemoteNode::connect(n.bind.clone(), self.adaptor.clone()).await?;
		Ok(Node::Remote(remote))
	}

	fn check_id(&self, id: ChordId) -> Result<ChordId> {
		ChordId::new(id.as_u64(), self.m)
	}

	/// Answer one request. Failures are reported to the caller, never raised.
	pub async fn handle(self: &Arc<Self>, request: Request) -> Response {
		let op = request.name();
		debug!(node = %self.id, op, "handling request");
		match self.dispatch(request).await {
			Ok(response) => response,
			Err(e) => {
				warn!(node = %self.id, op, error = %e, "request failed");
				Response::Error { msg: e.to_string() }
			}
		}
	}

	async fn dispatch(self: &Arc<Self>, request: Request) -> Result<Response> {
		let response = match request {
			Request::GetNodeInfo { include_finger_table } => Response::NodeInfo(self.report(include_finger_table)?),
			Request::FindPredecessor { id } => Response::Node {
				node: self.find_predecessor(self.check_id(id)?).await?,
			},
			Request::FindSuccessor { id } => Response::Node {
				node: self.find_successor(self.check_id(id)?).await?,
			},
			Request::ClosestPrecedingFinger { id } => Response::Node {
				node: self.closest_preceding_finger(self.check_id(id)?)?,
			},
			Request::SetPredecessorNode { node } => {
				self.check_id(node.id)?;
				self.set_predecessor(node)?;
				Response::Empty
			}
			Request::SetSuccessorNode { node } => {
				self.check_id(node.id)?;
				self.set_successor(&node)?;
				Response::Empty
			}
			Request::Notify { node } => {
				self.check_id(node.id)?;
				self.notify(&node)?;
				Response::Empty
			}
			Request::JoinRing { introducer } => {
				self.join(&introducer).await?;
				Response::Empty
			}
			Request::UpdateFingerTable { node, i, hops } => {
				self.check_id(node.id)?;
				self.update_finger_table_entry(&node, i, hops).await?;
				Response::Empty
			}
			Request::Stabilize => Response::Stabilized {
				num_finger_table_entry_changes: self.stabilize().await?,
			},
			Request::FixFingers => {
				self.fix_fingers().await?;
				Response::Empty
			}
		};
		Ok(response)
	}
}

/// A ring participant: either the node in this process or a proxy for a
/// node reached through the adaptor.
#[derive(Clone, Debug)]
pub enum Node {
	Local(Arc<LocalNode>),
	Remote(RemoteNode),
}

impl Node {
	pub fn id(&self) -> ChordId {
		match self {
			Node::Local(n) => n.id(),
			Node::Remote(n) => n.id(),
		}
	}

	pub fn node_ref(&self) -> NodeRef {
		match self {
			Node::Local(n) => n.node_ref(),
			Node::Remote(n) => n.node_ref(),
		}
	}

	/// For a remote node this is the snapshot taken when it was resolved.
	pub fn successor(&self) -> Result<Option<NodeRef>> {
		match self {
			Node::Local(n) => n.successor(),
			Node::Remote(n) => Ok(n.successor().cloned()),
		}
	}

	pub fn predecessor(&self) -> Result<Option<NodeRef>> {
		match self {
			Node::Local(n) => n.predecessor(),
			Node::Remote(n) => Ok(n.predecessor().cloned()),
		}
	}

	/// Whether id falls in `(self, succ]`, i.e. this node's successor owns it.
	pub fn precedes(&self, id: ChordId, m: Rank) -> Result<bool> {
		let succ = self.successor()?.ok_or(Error::NoSuccessor)?;
		Ok(Interval::open_closed(m, self.id(), succ.id).has(id))
	}

	pub async fn closest_preceding_finger(&self, id: ChordId) -> Result<NodeRef> {
		match self {
			Node::Local(n) => n.closest_preceding_finger(id),
			Node::Remote(n) => n.closest_preceding_finger(id).await,
		}
	}

	pub async fn find_predecessor(&self, id: ChordId) -> Result<NodeRef> {
		match self {
			Node::Local(n) => n.find_predecessor(id).await,
			Node::Remote(n) => n.find_predecessor(id).await,
		}
	}

	pub async fn find_successor(&self, id: ChordId) -> Result<NodeRef> {
		match self {
			Node::Local(n) => n.find_successor(id).await,
			Node::Remote(n) => n.find_successor(id).await,
		}
	}

	pub async fn set_predecessor(&self, pred: &NodeRef) -> Result<()> {
		match self {
			Node::Local(n) => n.set_predecessor(pred.clone()),
			Node::Remote(n) => n.set_predecessor(pred).await,
		}
	}

	pub async fn set_successor(&self, succ: &NodeRef) -> Result<()> {
		match self {
			Node::Local(n) => n.set_successor(succ).map(|_| ()),
			Node::Remote(n) => n.set_successor(succ).await,
		}
	}

	pub async fn notify(&self, candidate: &NodeRef) -> Result<()> {
		match self {
			Node::Local(n) => n.notify(candidate).map(|_| ()),
			Node::Remote(n) => n.notify(candidate).await,
		}
	}

	pub async fn update_finger_table_entry(&self, s: &NodeRef, i: usize, hops: u32) -> Result<()> {
		match self {
			Node::Local(n) => n.update_finger_table_entry(s, i, hops).await,
			Node::Remote(n) => n.update_finger_table_entry(s, i, hops).await,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::adaptor::memory_adaptor::MemoryAdaptor;

	fn local(id: u64, m: u32) -> Arc<LocalNode> {
		let adaptor: Arc<dyn ChordAdaptor> = Arc::new(MemoryAdaptor::new());
		LocalNode::new(ChordId::from(id), format!("mem:{}", id), Rank::new(m).unwrap(), 128, adaptor).unwrap()
	}

	#[test]
	fn fresh_node_points_at_itself() {
		let node = local(3, 3);
		let info = node.info().unwrap();
		assert_eq!(info.pred.unwrap().id, ChordId::from(3));
		assert_eq!(info.succ.unwrap().id, ChordId::from(3));
		let ft = node.finger_table().unwrap();
		assert!(ft.entries().all(|(_, n)| n.id == ChordId::from(3)));
	}

	#[test]
	fn ids_off_the_ring_are_rejected() {
		let adaptor: Arc<dyn ChordAdaptor> = Arc::new(MemoryAdaptor::new());
		let err = LocalNode::new(ChordId::from(8), "mem:8", Rank::new(3).unwrap(), 128, adaptor).unwrap_err();
		assert!(matches!(err, Error::InvalidId { id: 8, rank: 3 }));
	}

	#[tokio::test]
	async fn report_lists_fingers_and_neighbours() {
		let node = local(1, 3);
		node.set_finger(0, &NodeRef::new(ChordId::from(2), "mem:2")).unwrap();
		node.set_finger(2, &NodeRef::new(ChordId::from(5), "mem:5")).unwrap();

		let report = node.report(true).unwrap();
		let fingers: Vec<String> = report.finger_table.unwrap().iter().map(|e| e.to_string()).collect();
		assert_eq!(fingers, vec!["2,3,2", "3,5,1", "5,1,5"]);
		let neighbours: Vec<u64> = report.neighbours.unwrap().iter().map(|n| n.id.as_u64()).collect();
		assert_eq!(neighbours, vec![2, 5, 1]);

		let brief = node.report(false).unwrap();
		assert!(brief.finger_table.is_none());
		assert_eq!(brief.node.succ.unwrap().id, ChordId::from(2));
	}

	#[tokio::test]
	async fn handle_reports_errors_as_responses() {
		let node = local(1, 3);
		match node.handle(Request::FindSuccessor { id: ChordId::from(9) }).await {
			Response::Error { msg } => assert!(msg.contains("invalid id 9")),
			other => panic!("unexpected {:?}", other),
		}
		match node.handle(Request::FindSuccessor { id: ChordId::from(6) }).await {
			Response::Node { node } => assert_eq!(node.id, ChordId::from(1)),
			other => panic!("unexpected {:?}", other),
		}
	}

	#[tokio::test]
	async fn node_payloads_off_the_ring_are_refused() {
		let node = local(1, 3);
		let stray = NodeRef::new(ChordId::from(12), "mem:12");
		let requests = vec![
			Request::SetPredecessorNode { node: stray.clone() },
			Request::SetSuccessorNode { node: stray.clone() },
			Request::Notify { node: stray.clone() },
			Request::UpdateFingerTable { node: stray, i: 0, hops: 0 },
		];
		for request in requests {
			match node.handle(request).await {
				Response::Error { msg } => assert!(msg.contains("invalid id 12")),
				other => panic!("unexpected {:?}", other),
			}
		}
		assert_eq!(node.predecessor().unwrap().unwrap().id, ChordId::from(1));
		assert!(node.finger_table().unwrap().entries().all(|(_, n)| n.id == ChordId::from(1)));
	}

	#[tokio::test]
	async fn resolve_returns_self_locally() {
		let node = local(4, 3);
		match node.resolve(&node.node_ref()).await.unwrap() {
			Node::Local(n) => assert_eq!(n.id(), ChordId::from(4)),
			Node::Remote(_) => panic!("resolved self as remote"),
		}
		let err = node.resolve(&NodeRef::new(ChordId::from(6), "mem:6")).await.unwrap_err();
		assert!(matches!(err, Error::UnknownNode(_)));
	}
}
