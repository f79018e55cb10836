use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. `RUST_LOG` wins over `verbose`.
/// Calling it twice is harmless.
pub fn init(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_target(false)
        .try_init();
}
