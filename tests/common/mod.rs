#![allow(dead_code)]

use std::sync::Arc;

use chord_ring::config::StabilizationConfig;
use chord_ring::{ChordAdaptor, ChordId, Config, LocalNode, MemoryAdaptor, Rank};

pub fn rank(m: u32) -> Rank {
	Rank::new(m).expect("valid rank")
}

pub fn memory_adaptor() -> Arc<dyn ChordAdaptor> {
	Arc::new(MemoryAdaptor::new())
}

pub fn memory_bind(id: u64) -> String {
	format!("mem:{}", id)
}

/// A node registered with the adaptor under `mem:<id>`.
pub async fn memory_node(adaptor: &Arc<dyn ChordAdaptor>, id: u64, m: u32) -> Arc<LocalNode> {
	let node = LocalNode::new(ChordId::from(id), memory_bind(id), rank(m), 128, adaptor.clone())
		.expect("nodes should be creatable");
	adaptor.listen(node.clone()).await.expect("memory listen cannot fail");
	node
}

/// Config for a node with an explicit id and no background stabilization.
pub fn config(bind: impl Into<String>, id: u64, m: u32) -> Config {
	let mut config = Config::new(bind, rank(m));
	config.id = Some(ChordId::from(id));
	config.stabilization = StabilizationConfig {
		disabled: true,
		..StabilizationConfig::default()
	};
	config
}

pub fn free_addr() -> String {
	let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind an ephemeral port");
	let addr = listener.local_addr().expect("local addr");
	addr.to_string()
}

pub fn finger_ids(node: &LocalNode) -> Vec<u64> {
	node.finger_table()
		.expect("finger table")
		.entries()
		.map(|(_, n)| n.id.as_u64())
		.collect()
}

pub fn finger_starts(node: &LocalNode) -> Vec<u64> {
	node.finger_table()
		.expect("finger table")
		.entries()
		.map(|(e, _)| e.start.as_u64())
		.collect()
}

pub fn pred_id(node: &LocalNode) -> Option<u64> {
	node.predecessor().expect("predecessor").map(|n| n.id.as_u64())
}

pub fn succ_id(node: &LocalNode) -> Option<u64> {
	node.successor().expect("successor").map(|n| n.id.as_u64())
}

/// The owner of key on a ring made of ids: the first id at or after key.
pub fn owner_of(key: u64, ids: &[u64]) -> u64 {
	let mut sorted = ids.to_vec();
	sorted.sort_unstable();
	sorted.iter().copied().find(|&id| id >= key).unwrap_or(sorted[0])
}

/// Every ordering of items.
pub fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
	if items.len() <= 1 {
		return vec![items.to_vec()];
	}
	let mut out = Vec::new();
	for i in 0..items.len() {
		let mut rest = items.to_vec();
		let head = rest.remove(i);
		for mut tail in permutations(&rest) {
			tail.insert(0, head.clone());
			out.push(tail);
		}
	}
	out
}
