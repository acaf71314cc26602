//! Logging setup for the CLI and server.

use tracing_subscriber::EnvFilter;

/// Initialize console logging.
///
/// Defaults to `info` and honors `RUST_LOG` overrides. Events go to stderr
/// so command output on stdout stays parseable.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(tracing::Level::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();
}
