use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber.
///
/// Filter precedence: `RUST_LOG`, then `LOG_LEVEL`, then `default_level`.
/// A second call is a no-op.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_env("RUST_LOG")
        .or_else(|_| EnvFilter::try_from_env("LOG_LEVEL"))
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
