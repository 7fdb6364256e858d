//! Tracing subscriber initialization shared by the binaries

use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the configured level applies.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));

    // A second init (tests, embedded use) is harmless
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
