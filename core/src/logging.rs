/// Tracing setup shared by the binaries
use tracing_subscriber::EnvFilter;

/// Log to stderr, filtered by `RUST_LOG` (falls back to `default_level`).
pub fn init(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
