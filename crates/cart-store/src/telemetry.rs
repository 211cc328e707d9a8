//! # Tracing Setup
//!
//! Subscriber installation for host apps embedding the cart store.
//! Filtering follows `RUST_LOG`, defaulting to `INFO`.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cart_core::{CartError, CartResult};

fn env_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy()
}

/// Install a human-readable subscriber.
///
/// Fails if a global subscriber is already set.
pub fn init_tracing() -> CartResult<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(env_filter())
        .try_init()
        .map_err(|e| CartError::Configuration(format!("tracing init failed: {e}")))
}

/// Install a JSON-lines subscriber, for device log collection.
pub fn init_json_tracing() -> CartResult<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(env_filter())
        .try_init()
        .map_err(|e| CartError::Configuration(format!("tracing init failed: {e}")))
}
