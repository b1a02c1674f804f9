use fforest_types::Verbosity;
use tracing_subscriber::EnvFilter;

/// Level used when `RUST_LOG` is unset: the explicit `--log-level`, else the
/// default of the experiment's verbosity.
pub fn default_level(log_level: Option<&str>, verbosity: Verbosity) -> &str {
    log_level.unwrap_or_else(|| verbosity.log_level())
}

/// Initialize structured logging with tracing-subscriber.
///
/// Uses the `RUST_LOG` env var if set, otherwise falls back to [`default_level`].
pub fn init(log_level: Option<&str>, verbosity: Verbosity) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(log_level, verbosity)));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}
