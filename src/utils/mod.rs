pub mod build_info;

use tracing_subscriber::{fmt, EnvFilter};

pub const DEFAULT_LOG_DIRECTIVE: &str = "fintrack=info";

/// Builds the subscriber filter: `RUST_LOG` wins, then `directive`, then the default.
pub fn log_filter(directive: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive.unwrap_or(DEFAULT_LOG_DIRECTIVE)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE))
}

/// Installs the global fmt subscriber. Later calls are ignored.
pub fn init_tracing(directive: Option<&str>) {
    let _ = fmt()
        .with_env_filter(log_filter(directive))
        .with_writer(std::io::stderr)
        .try_init();
}
