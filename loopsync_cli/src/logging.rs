use tracing_subscriber::EnvFilter;

/// Initialize structured logging.
///
/// Uses the `RUST_LOG` env var if set, otherwise logs at `info`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
