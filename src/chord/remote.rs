use std::sync::Arc;

use crate::adaptor::ChordAdaptor;
use crate::associate::AssociateClient;
use crate::chord_id::ChordId;
use crate::error::Result;
use crate::node::{NodeInfo, NodeRef};

/// A proxy for a node in another process.
///
/// The predecessor and successor are a snapshot taken by `connect`; they are
/// not refreshed afterwards. Connect again when freshness matters.
#[derive(Clone, Debug)]
pub struct RemoteNode {
	info: NodeInfo,
	client: AssociateClient,
}

impl RemoteNode {
	pub async fn connect(bind: impl Into<String>, adaptor: Arc<dyn ChordAdaptor>) -> Result<Self> {
		let client = AssociateClient::new(bind, adaptor);
		let info = client.get_node_info(false).await?.node;
		Ok(RemoteNode { info, client })
	}

	pub fn id(&self) -> ChordId {
		self.info.id
	}

	pub fn bind(&self) -> &str {
		&self.info.bind
	}

	pub fn node_ref(&self) -> NodeRef {
		self.info.node_ref()
	}

	pub fn info(&self) -> &NodeInfo {
		&self.info
	}

	pub fn predecessor(&self) -> Option<&NodeRef> {
		self.info.pred.as_ref()
	}

	pub fn successor(&self) -> Option<&NodeRef> {
		self.info.succ.as_ref()
	}

	pub async fn closest_preceding_finger(&self, id: ChordId) -> Result<NodeRef> {
		self.client.closest_preceding_finger(id).await
	}

	pub async fn find_predecessor(&self, id: ChordId) -> Result<NodeRef> {
		self.client.find_predecessor(id).await
	}

	pub async fn find_successor(&self, id: ChordId) -> Result<NodeRef> {
		self.client.find_successor(id).await
	}

	pub async fn set_predecessor(&self, n: &NodeRef) -> Result<()> {
		self.client.set_predecessor(n).await
	}

	pub async fn set_successor(&self, n: &NodeRef) -> Result<()> {
		self.client.set_successor(n).await
	}

	pub async fn notify(&self, n: &NodeRef) -> Result<()> {
		self.client.notify(n).await
	}

	pub async fn update_finger_table_entry(&self, s: &NodeRef, i: usize, hops: u32) -> Result<()> {
		self.client.update_finger_table(s, i, hops).await
	}
}
