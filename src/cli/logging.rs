//! Logging initialization

/// Initialize logging to stderr
///
/// Stdout is reserved for the run summary, so diagnostics go to stderr.
/// `RUST_LOG` overrides the default level; the debug flag raises the
/// default from `info` to `debug`.
pub fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(debug)
        .init();
}
