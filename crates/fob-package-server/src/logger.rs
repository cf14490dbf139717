//! Logging setup.
//!
//! `RUST_LOG` is honoured when set. Otherwise the pipeline and the server log
//! at `info`, or at `debug` with `--verbose`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "fob_package=info,fob_package_server=info";
const VERBOSE_FILTER: &str = "fob_package=debug,fob_package_server=debug";

/// Install the global subscriber. Call once, before anything logs.
///
/// # Arguments
///
/// * `verbose` - Log at `debug`. Takes precedence over `RUST_LOG`.
/// * `no_color` - Disable ANSI colors even on a terminal.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_logger(verbose: bool, no_color: bool) {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color && should_use_colors())
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// `NO_COLOR` turns colors off.
pub fn should_use_colors() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}
