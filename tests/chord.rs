mod common;

use std::sync::Arc;

use tokio::time::{sleep, Duration, Instant};

use chord_ring::config::StabilizationConfig;
use chord_ring::{Chord, ChordId, Error, LocalNode, Node, TCPAdaptor};

use common::{finger_ids, finger_starts, pred_id, succ_id};

#[derive(Clone, Copy, Debug)]
enum Op {
	Stabilize(usize),
	FixFingers(usize),
}

async fn run(nodes: &[Arc<LocalNode>], op: Op) {
	match op {
		Op::Stabilize(i) => {
			nodes[i].stabilize().await.expect("stabilize");
		}
		Op::FixFingers(i) => {
			nodes[i].fix_fingers().await.expect("fix fingers");
		}
	}
}

/// Nodes 0 and 1 on a rank 3 ring, with 0 joined through 1.
async fn joined_pair() -> Vec<Arc<LocalNode>> {
	let adaptor = common::memory_adaptor();
	let n0 = common::memory_node(&adaptor, 0, 3).await;
	let n1 = common::memory_node(&adaptor, 1, 3).await;
	n0.join(&common::memory_bind(1)).await.expect("join");
	vec![n0, n1]
}

fn assert_converged_pair(nodes: &[Arc<LocalNode>], order: &[Op]) {
	let (n0, n1) = (&nodes[0], &nodes[1]);
	assert_eq!(pred_id(n0), Some(1), "{:?}", order);
	assert_eq!(succ_id(n0), Some(1), "{:?}", order);
	assert_eq!(pred_id(n1), Some(0), "{:?}", order);
	assert_eq!(succ_id(n1), Some(0), "{:?}", order);
	assert_eq!(finger_ids(n0), vec![1, 0, 0], "{:?}", order);
	assert_eq!(finger_ids(n1), vec![0, 0, 0], "{:?}", order);
}

#[tokio::test]
async fn initial_finger_tables() {
	let adaptor = common::memory_adaptor();
	let n0 = common::memory_node(&adaptor, 0, 3).await;
	let n1 = common::memory_node(&adaptor, 1, 3).await;

	assert_eq!(finger_starts(&n0), vec![1, 2, 4]);
	assert_eq!(finger_starts(&n1), vec![2, 3, 5]);
	assert_eq!(finger_ids(&n0), vec![0, 0, 0]);
	assert_eq!(finger_ids(&n1), vec![1, 1, 1]);
	assert_eq!(pred_id(&n0), Some(0));
	assert_eq!(succ_id(&n1), Some(1));
}

#[tokio::test]
async fn join_links_both_nodes() {
	let nodes = joined_pair().await;
	assert_eq!(pred_id(&nodes[0]), Some(1));
	assert_eq!(succ_id(&nodes[0]), Some(1));
	assert_eq!(pred_id(&nodes[1]), Some(0));
	assert_eq!(finger_ids(&nodes[0]), vec![1, 1, 1]);
	assert_eq!(finger_ids(&nodes[1]), vec![0, 0, 0]);
}

#[tokio::test]
async fn two_nodes_converge_in_any_order() {
	let ops = [Op::Stabilize(0), Op::FixFingers(0), Op::Stabilize(1), Op::FixFingers(1)];
	let orders = common::permutations(&ops);
	assert_eq!(orders.len(), 24);

	for order in orders {
		let nodes = joined_pair().await;
		for op in order.iter() {
			run(&nodes, *op).await;
		}
		assert_converged_pair(&nodes, &order);

		// a converged ring stays put
		for node in nodes.iter() {
			assert_eq!(node.stabilize().await.expect("stabilize"), 0, "{:?}", order);
		}
		assert_converged_pair(&nodes, &order);
	}
}

#[tokio::test]
async fn lookups_agree_after_convergence() {
	let nodes = joined_pair().await;
	for node in nodes.iter() {
		node.stabilize().await.expect("stabilize");
	}
	for node in nodes.iter() {
		for key in 0..8 {
			let key_id = ChordId::from(key);
			let owner = node.find_successor(key_id).await.expect("find successor");
			assert_eq!(owner.id.as_u64(), common::owner_of(key, &[0, 1]), "key {}", key);
			let pred = node.find_predecessor(key_id).await.expect("find predecessor");
			assert_ne!(pred.id, owner.id, "key {}", key);
		}
	}
}

#[tokio::test]
async fn remote_proxy_answers_like_the_node() {
	let nodes = joined_pair().await;
	for node in nodes.iter() {
		node.stabilize().await.expect("stabilize");
	}
	let proxy = nodes[0].resolve(&nodes[1].node_ref()).await.expect("resolve");
	assert!(matches!(proxy, Node::Remote(_)));
	assert_eq!(proxy.predecessor().unwrap().unwrap().id.as_u64(), 0);
	assert_eq!(proxy.successor().unwrap().unwrap().id.as_u64(), 0);
	let owner = proxy.find_successor(ChordId::from(1)).await.expect("find successor");
	assert_eq!(owner.id.as_u64(), 1);
	let hop = proxy.closest_preceding_finger(ChordId::from(1)).await.expect("closest preceding finger");
	assert_eq!(hop.id.as_u64(), 0);
	let hop = proxy.closest_preceding_finger(ChordId::from(7)).await.expect("closest preceding finger");
	assert_eq!(hop.id.as_u64(), 1);
}

#[tokio::test]
async fn sequential_joins_form_a_ring() {
	let ids = [1u64, 5, 9, 12];
	let adaptor = common::memory_adaptor();
	let mut nodes = Vec::new();
	for &id in ids.iter() {
		let node = common::memory_node(&adaptor, id, 4).await;
		if id != ids[0] {
			node.join(&common::memory_bind(ids[0])).await.expect("join");
		}
		nodes.push(node);
	}

	for _ in 0..5 {
		for node in nodes.iter() {
			node.stabilize().await.expect("stabilize");
		}
	}

	for (i, node) in nodes.iter().enumerate() {
		let next = ids[(i + 1) % ids.len()];
		let prev = ids[(i + ids.len() - 1) % ids.len()];
		assert_eq!(succ_id(node), Some(next), "successor of {}", ids[i]);
		assert_eq!(pred_id(node), Some(prev), "predecessor of {}", ids[i]);

		let expected: Vec<u64> = finger_starts(node).iter().map(|&s| common::owner_of(s, &ids)).collect();
		assert_eq!(finger_ids(node), expected, "fingers of {}", ids[i]);

		for key in 0..16 {
			let owner = node.find_successor(ChordId::from(key)).await.expect("find successor");
			assert_eq!(owner.id.as_u64(), common::owner_of(key, &ids), "key {} from {}", key, ids[i]);
		}
	}

	for node in nodes.iter() {
		assert_eq!(node.stabilize().await.expect("stabilize"), 0);
	}
}

#[tokio::test]
async fn start_fails_without_introducer() {
	let adaptor = common::memory_adaptor();
	let chord = Chord::new(common::config("mem:3", 3, 3), adaptor.clone());
	let err = chord.start(Some("mem:ghost".to_string())).await.err().expect("start should fail");
	assert!(matches!(err, Error::JoinFailed(ref list) if list == &vec!["mem:ghost".to_string()]));

	let mut chord = Chord::new(common::config("mem:3", 3, 3), adaptor);
	chord.set_join_list(vec!["mem:ghost".to_string()]);
	chord.set_join_or_host(true);
	let handle = chord.start(None).await.expect("hosting fallback");
	assert_eq!(succ_id(handle.node()), Some(3));
	handle.stop().await;
}

#[tokio::test]
async fn background_stabilization_converges() {
	let adaptor = common::memory_adaptor();
	let fast = StabilizationConfig {
		disabled: false,
		period_ms: 20,
		jitter_ms: 10,
	};

	let mut c1 = common::config("mem:1", 1, 3);
	c1.stabilization = fast.clone();
	let h1 = Chord::new(c1, adaptor.clone()).start(None).await.expect("start 1");

	let mut c0 = common::config("mem:0", 0, 3);
	c0.stabilization = fast;
	let h0 = Chord::new(c0, adaptor.clone()).start(Some("mem:1".to_string())).await.expect("start 0");

	let deadline = Instant::now() + Duration::from_secs(5);
	while finger_ids(h0.node()) != vec![1, 0, 0] {
		assert!(Instant::now() < deadline, "ring did not converge: {:?}", finger_ids(h0.node()));
		sleep(Duration::from_millis(20)).await;
	}
	assert_eq!(pred_id(h1.node()), Some(0));

	let report = h1.get_associate().get_node_info(true).await.expect("node info");
	assert_eq!(report.node.succ.map(|n| n.id.as_u64()), Some(0));

	h0.stop().await;
	h1.stop().await;
}

#[tokio::test]
async fn two_nodes_over_tcp() {
	let adaptor: Arc<dyn chord_ring::ChordAdaptor> = Arc::new(TCPAdaptor::new());
	let (addr0, addr1) = (common::free_addr(), common::free_addr());

	let h1 = Chord::new(common::config(addr1.clone(), 1, 3), adaptor.clone())
		.start(None)
		.await
		.expect("start 1");
	let h0 = Chord::new(common::config(addr0.clone(), 0, 3), adaptor.clone())
		.start(Some(addr1.clone()))
		.await
		.expect("start 0");

	let a0 = h0.get_associate();
	let a1 = h1.get_associate();
	a0.stabilize().await.expect("stabilize 0");
	a1.fix_fingers().await.expect("fix fingers 1");
	assert_eq!(a0.stabilize().await.expect("stabilize 0"), 0);
	assert_eq!(a1.stabilize().await.expect("stabilize 1"), 0);

	let r0 = a0.get_node_info(true).await.expect("info 0");
	let r1 = a1.get_node_info(true).await.expect("info 1");
	assert_eq!(r0.node.pred.as_ref().map(|n| n.bind.clone()), Some(addr1.clone()));
	assert_eq!(r1.node.succ.as_ref().map(|n| n.bind.clone()), Some(addr0.clone()));
	let fingers: Vec<String> = r0.finger_table.unwrap().iter().map(|e| e.to_string()).collect();
	assert_eq!(fingers, vec!["1,2,1", "2,4,0", "4,0,0"]);
	let neighbours: Vec<u64> = r0.neighbours.unwrap().iter().map(|n| n.id.as_u64()).collect();
	assert_eq!(neighbours, vec![1, 0]);

	let owner = a1.find_successor(ChordId::from(6)).await.expect("find successor");
	assert_eq!(owner.id.as_u64(), 0);
	assert!(a1.debug().await.expect("debug").contains("pred <@0"));

	h0.stop().await;
	h1.stop().await;
}

#[tokio::test]
async fn remote_errors_carry_the_message() {
	let adaptor = common::memory_adaptor();
	let h = Chord::new(common::config("mem:2", 2, 3), adaptor).start(None).await.expect("start");
	let err = h.get_associate().find_successor(ChordId::from(200)).await.unwrap_err();
	match err {
		Error::Remote { bind, msg } => {
			assert_eq!(bind, "mem:2");
			assert!(msg.contains("invalid id 200"));
		}
		other => panic!("unexpected error {:?}", other),
	}
	h.stop().await;
}
