//! Tracing setup for binaries and tools embedding the remediator.

use tracing::Subscriber;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Compact stderr output filtered by `RUST_LOG` (default `warn`).
fn subscriber() -> impl Subscriber + Send + Sync + 'static {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
}

/// Installs the global subscriber.
///
/// ```bash
/// RUST_LOG=fleet_remediator=debug my-tool
/// ```
pub fn init() {
    subscriber().init();
}

/// Like [`init`], but returns `false` instead of panicking when a global
/// subscriber is already set (tests, embedding hosts).
pub fn try_init() -> bool {
    subscriber().try_init().is_ok()
}
