//! Opt-in logging for hosts.
//!
//! The bridge only emits `tracing` events; nothing is printed until the
//! host calls [`init`] (or `cvb_init_logging`).

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config;

static INIT: Once = Once::new();

/// Install a compact stderr subscriber.
///
/// The filter comes from `RUST_LOG`, falling back to the configured
/// `log_filter`. Only the first call has any effect, and an already
/// installed global subscriber is left alone.
pub fn init() {
    INIT.call_once(|| {
        let default_filter = config::current().log_filter;
        init_with_filter(&default_filter);
    });
}

fn init_with_filter(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init();

    if installed.is_ok() {
        tracing::info!(version = env!("CARGO_PKG_VERSION"), "cvbridge logging enabled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
    }
}
