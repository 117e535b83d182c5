//! Tracing subscriber initialisation
//!
//! The crate itself only emits `tracing` events; installing a subscriber is
//! the embedding application's choice. This helper wires up the standard fmt
//! subscriber driven by `RUST_LOG` (falling back to the configured level).

use crate::config::Config;

/// Initialise the global tracing subscriber. Call once at startup.
pub fn init(config: &Config) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .with_ansi(!config.environment.is_production())
        .init();
}
