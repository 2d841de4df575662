use tracing_subscriber::{EnvFilter, fmt};

/// Installs the global subscriber. The filter is read from `RUST_LOG` and defaults to `info`.
/// Calling it more than once is harmless, only the first call installs anything.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
