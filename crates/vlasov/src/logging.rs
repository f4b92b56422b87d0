//! Subscriber setup for binaries.

use tracing_subscriber::{fmt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,vlasov_engine=info";

/// Initialize logging with a default filter.
///
/// Use the `RUST_LOG` environment variable to override [`DEFAULT_FILTER`].
/// Panics if a global subscriber is already installed.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    fmt().with_env_filter(filter).with_target(false).init();
}
