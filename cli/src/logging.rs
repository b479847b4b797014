use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` wins over `fallback`, which
/// wins over `info`. Calling this twice is harmless.
pub fn init(fallback: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(fallback.unwrap_or("info")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .ok();
}
