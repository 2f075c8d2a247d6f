//! `tracing` subscriber setup for binaries and tests.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Installs a global fmt subscriber. `RUST_LOG` takes precedence over
/// `config.level`. Returns `false` when a subscriber was already installed.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = fmt().with_env_filter(filter).with_target(true);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.is_ok()
}
