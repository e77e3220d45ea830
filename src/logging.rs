use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Install a console subscriber. `RUST_LOG` takes precedence over the
/// configured level. Calling this again once a subscriber is set does nothing.
pub fn init_logging(config: &LogConfig) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
	let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
