use std::path::Path;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::chord_id::{assign_id, ChordId, Rank};
use crate::error::Result;

/// Everything needed to start a node.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
	/// Explicit ring id. When absent the id is derived from `bind`.
	#[serde(default)]
	pub id: Option<ChordId>,
	pub rank: Rank,
	pub bind: String,
	/// Introducers tried in order when starting.
	#[serde(default)]
	pub join_list: Vec<String>,
	/// Start a new ring when no introducer answers.
	#[serde(default)]
	pub join_or_host: bool,
	#[serde(default = "default_max_hops")]
	pub max_hops: u32,
	#[serde(default)]
	pub stabilization: StabilizationConfig,
	#[serde(default)]
	pub log: LogConfig,
}

fn default_max_hops() -> u32 {
	128
}

impl Config {
	pub fn new(bind: impl Into<String>, rank: Rank) -> Self {
		Config {
			id: None,
			rank,
			bind: bind.into(),
			join_list: Vec::new(),
			join_or_host: false,
			max_hops: default_max_hops(),
			stabilization: StabilizationConfig::default(),
			log: LogConfig::default(),
		}
	}

	pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
		let raw = fs::read_to_string(path).await?;
		Ok(serde_json::from_str(&raw)?)
	}

	pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		let raw = serde_json::to_string_pretty(self)?;
		fs::write(path, raw).await?;
		Ok(())
	}

	/// The configured id, or the hash of the bind address.
	pub fn node_id(&self) -> Result<ChordId> {
		match self.id {
			Some(id) => ChordId::new(id.as_u64(), self.rank),
			None => Ok(assign_id(self.bind.as_bytes(), self.rank)),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizationConfig {
	pub disabled: bool,
	pub period_ms: u64,
	pub jitter_ms: u64,
}

impl Default for StabilizationConfig {
	fn default() -> Self {
		StabilizationConfig {
			disabled: false,
			period_ms: 10_000,
			jitter_ms: 5_000,
		}
	}
}

impl StabilizationConfig {
	/// The period plus a random share of the jitter window, picked once per
	/// node so that nodes drift apart.
	pub fn pick_interval(&self) -> Duration {
		let jitter = if self.jitter_ms > 0 {
			rand::thread_rng().gen_range(0..self.jitter_ms)
		} else {
			0
		};
		Duration::from_millis(self.period_ms.saturating_add(jitter).max(1))
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
	/// Filter directive used when `RUST_LOG` is not set.
	pub level: String,
}

impl Default for LogConfig {
	fn default() -> Self {
		LogConfig { level: "info".to_string() }
	}
}
