use tracing_subscriber::EnvFilter;

use crate::config::LogLevel;

/// Install a global fmt subscriber. `RUST_LOG` wins over the configured level.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing(level: LogLevel) {
  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(format!("program_forge={}", level.as_filter())));

  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .try_init();
}
