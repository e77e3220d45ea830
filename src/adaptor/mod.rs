use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::chord::message::{Request, Response};
use crate::chord::LocalNode;
use crate::error::{Error, Result};

pub mod memory_adaptor;
pub mod tcp_adaptor;

/// Moves requests between nodes. `bind` is the address a node was created
/// with; what it means is up to the adaptor.
#[async_trait]
pub trait ChordAdaptor: Send + Sync + 'static {
	/// Deliver one request to the node at bind and wait for its answer.
	async fn call(&self, bind: &str, request: Request) -> Result<Response>;

	/// Start accepting requests for node. Returns the task serving them, if
	/// the adaptor needs one.
	async fn listen(&self, node: Arc<LocalNode>) -> Result<Option<JoinHandle<()>>>;

	/// Like `call`, but an error reported by the remote node becomes an `Err`.
	async fn request(&self, bind: &str, request: Request) -> Result<Response> {
		match self.call(bind, request).await? {
			Response::Error { msg } => Err(Error::Remote {
				bind: bind.to_string(),
				msg,
			}),
			response => Ok(response),
		}
	}
}
