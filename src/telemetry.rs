use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,oneliner_bridge=debug";

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into())
}

/// Installs the global JSON subscriber.
///
/// # Panics
///
/// If a global subscriber is already installed.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(filter())
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// Like [`init_tracing`], but leaves an existing subscriber in place.
/// Returns whether this call installed one.
pub fn try_init_tracing() -> bool {
    tracing_subscriber::registry()
        .with(filter())
        .with(tracing_subscriber::fmt::layer().json().with_test_writer())
        .try_init()
        .is_ok()
}
