use std::path::Path;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, instrument, warn};

use crate::adaptor::ChordAdaptor;
use crate::associate::AssociateClient;
use crate::chord::LocalNode;
use crate::config::Config;
use crate::error::{Error, Result};

/// The Chord itself. This struct acts like a builder in that it is created
/// and modified before being consumed by the start method which then
/// returns another type, ChordHandle.
pub struct Chord {
	config: Config,
	adaptor: Arc<dyn ChordAdaptor>,
}

impl Chord {
	pub fn new(config: Config, adaptor: Arc<dyn ChordAdaptor>) -> Self {
		Chord { config, adaptor }
	}

	/// Create a new chord node from a JSON config file.
	pub async fn from_file<P: AsRef<Path>>(path: P, adaptor: Arc<dyn ChordAdaptor>) -> Result<Self> {
		Ok(Chord::new(Config::from_file(path).await?, adaptor))
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Set if this chord will default to hosting if the join attempts fail
	pub fn set_join_or_host(&mut self, join_or_host: bool) {
		self.config.join_or_host = join_or_host;
	}

	/// Give the chord a list of addresses to try to join when it starts.
	pub fn set_join_list(&mut self, list: Vec<String>) {
		self.config.join_list = list;
	}

	/// Starts the node. This will take ownership of the Chord and return a
	/// ChordHandle.
	///
	/// If passed Some(address) that address is tried before the join list.
	/// The first introducer that lets the node join wins. If none does, the
	/// node only starts when `join_or_host` is set. With nothing to join, the
	/// node hosts a new ring.
	#[instrument(skip_all, fields(bind = %self.config.bind))]
	pub async fn start(self, join_addr: Option<String>) -> Result<ChordHandle> {
		let id = self.config.node_id()?;
		let node = LocalNode::new(
			id,
			self.config.bind.clone(),
			self.config.rank,
			self.config.max_hops,
			self.adaptor.clone(),
		)?;
		let listener_handle = self.adaptor.listen(node.clone()).await?;

		let mut join_list = Vec::new();
		if let Some(addr) = join_addr {
			join_list.push(addr);
		}
		join_list.extend(self.config.join_list.iter().cloned());

		if !join_list.is_empty() {
			let mut joined = false;
			for addr in join_list.iter() {
				match node.join(addr).await {
					Ok(()) => {
						joined = true;
						break;
					}
					Err(e) => warn!(%addr, error = %e, "join attempt failed"),
				}
			}
			if !joined {
				if !self.config.join_or_host {
					if let Some(handle) = listener_handle {
						handle.abort();
					}
					return Err(Error::JoinFailed(join_list));
				}
				info!("no introducer answered, hosting a new ring");
			}
		}

		let stabilizer_handle = if self.config.stabilization.disabled {
			None
		} else {
			Some(spawn_stabilizer(node.clone(), &self.config))
		};

		info!(node = %node.id(), bind = node.bind(), "chord node started");
		Ok(ChordHandle {
			node,
			adaptor: self.adaptor,
			listener_handle,
			stabilizer_handle,
		})
	}
}

fn spawn_stabilizer(node: Arc<LocalNode>, config: &Config) -> JoinHandle<()> {
	let run = config.stabilization.pick_interval();
	debug!(node = %node.id(), ?run, "stabilization scheduled");
	tokio::spawn(async move {
		let mut ticker = interval_at(Instant::now() + run, run);
		loop {
			ticker.tick().await;
			match node.stabilize().await {
				Ok(changes) => debug!(node = %node.id(), changes, "stabilization round done"),
				Err(e) => warn!(node = %node.id(), error = %e, "stabilization round failed"),
			}
		}
	})
}

/// A ChordHandle represents a started Chord node.
pub struct ChordHandle {
	node: Arc<LocalNode>,
	adaptor: Arc<dyn ChordAdaptor>,
	listener_handle: Option<JoinHandle<()>>,
	stabilizer_handle: Option<JoinHandle<()>>,
}

impl ChordHandle {
	pub fn node(&self) -> &Arc<LocalNode> {
		&self.node
	}

	/// Get a client that talks to this node through its adaptor.
	pub fn get_associate(&self) -> AssociateClient {
		AssociateClient::new(self.node.bind(), self.adaptor.clone())
	}

	/// Force the chord to stop
	pub async fn stop(self) {
		for handle in [self.listener_handle, self.stabilizer_handle].into_iter().flatten() {
			handle.abort();
			let _ = handle.await;
		}
		info!(node = %self.node.id(), "chord node stopped");
	}
}
