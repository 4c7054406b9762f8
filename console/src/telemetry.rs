//! Tracing subscriber setup

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy()
}

/// Install the global subscriber. Panics if one is already set.
pub fn init() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter())
        .init();
}

/// Install the global subscriber unless one is already set
pub fn try_init() -> bool {
    tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(filter())
        .try_init()
        .is_ok()
}
