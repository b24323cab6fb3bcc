// src/infra/logger.rs — Structured logging with tracing

use tracing_subscriber::{fmt, EnvFilter};

const LOG_ENV: &str = "REVBENCH_LOG";

/// REVBENCH_LOG takes precedence, then RUST_LOG, then the given default.
pub fn init_logging(default_level: &str) {
    fmt()
        .with_env_filter(resolve_filter(default_level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn resolve_filter(default_level: &str) -> EnvFilter {
    std::env::var(LOG_ENV)
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(default_level))
}
