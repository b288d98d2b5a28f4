//! Diagnostic tracing for internloop.
//!
//! Tracing goes to stderr and is filtered by `RUST_LOG`. It is separate from
//! the per-attempt artifacts in `.ai/attempts/` (`io::attempt_log`), which are
//! always written regardless of the filter, and from the progress lines the
//! binary prints to stdout.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber.
///
/// Reads `RUST_LOG`, defaulting to `warn`. Compact format on stderr.
///
/// ```bash
/// RUST_LOG=internloop=debug internloop build
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
