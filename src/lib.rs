//! Chord ring membership and routing: modular id arithmetic, finger tables,
//! lookup, join and stabilization, over a pluggable transport.

pub mod adaptor;
pub mod associate;
pub mod chord;
pub mod chord_id;
pub mod config;
pub mod error;
pub mod finger_table;
pub mod interval;
pub mod logging;
pub mod neighbourhood;
pub mod node;
pub mod server;

pub use adaptor::memory_adaptor::MemoryAdaptor;
pub use adaptor::tcp_adaptor::TCPAdaptor;
pub use adaptor::ChordAdaptor;
pub use chord::{LocalNode, Node, RemoteNode};
pub use chord_id::{assign_id, ChordId, Rank};
pub use config::Config;
pub use error::{Error, Result};
pub use server::{Chord, ChordHandle};
