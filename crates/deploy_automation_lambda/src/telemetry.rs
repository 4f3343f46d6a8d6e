use tracing_subscriber::EnvFilter;

/// Installs JSON log output for CloudWatch. `RUST_LOG` overrides the default
/// `info` level.
pub fn init_logging() -> Result<(), lambda_runtime::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_target(false)
        .with_current_span(false)
        .try_init()
}
