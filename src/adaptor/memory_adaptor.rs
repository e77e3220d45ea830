use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::debug;

use super::ChordAdaptor;
use crate::chord::message::{Request, Response};
use crate::chord::LocalNode;
use crate::error::{Error, Result};

/// Connects nodes living in the same process. Messages still pass through
/// JSON so they look exactly like they would on a socket.
#[derive(Debug, Default)]
pub struct MemoryAdaptor {
	nodes: Mutex<HashMap<String, Weak<LocalNode>>>,
}

impl MemoryAdaptor {
	pub fn new() -> Self {
		Self::default()
	}

	fn lookup(&self, bind: &str) -> Result<Arc<LocalNode>> {
		let nodes = self.nodes.lock()?;
		nodes
			.get(bind)
			.and_then(Weak::upgrade)
			.ok_or_else(|| Error::UnknownNode(bind.to_string()))
	}
}

#[async_trait]
impl ChordAdaptor for MemoryAdaptor {
	async fn call(&self, bind: &str, request: Request) -> Result<Response> {
		let node = self.lookup(bind)?;
		let request: Request = serde_json::from_slice(&serde_json::to_vec(&request)?)?;
		let response = node.handle(request).await;
		Ok(serde_json::from_slice(&serde_json::to_vec(&response)?)?)
	}

	async fn listen(&self, node: Arc<LocalNode>) -> Result<Option<JoinHandle<()>>> {
		debug!(node = %node.id(), bind = node.bind(), "registered in memory");
		self.nodes.lock()?.insert(node.bind().to_string(), Arc::downgrade(&node));
		Ok(None)
	}
}
