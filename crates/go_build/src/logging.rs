// crates/go_build/src/logging.rs

//! Console logging on stderr, filtered by `RUST_LOG` (default `warn`).
//!
//! Records emitted through the `log` facade by the library crates are
//! forwarded by the subscriber's `tracing-log` bridge.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn";

pub fn init_cli() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    // A subscriber may already be installed when embedded in a test harness.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init();
}
