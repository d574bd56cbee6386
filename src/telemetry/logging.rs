//! Logging configuration and initialization.
//!
//! RUST_LOG takes priority when set; otherwise the supplied config decides,
//! falling back to `info`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,
    /// Output format: pretty, compact, json
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Initializes the logging system.
pub fn init_logging(config: Option<&LogConfig>) {
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if let Some(cfg) = config {
        EnvFilter::new(normalize_level(&cfg.level))
    } else {
        EnvFilter::new("info")
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.map(|c| c.format.as_str()).unwrap_or("pretty") {
        "json" => tracing::subscriber::set_global_default(
            registry.with(tracing_subscriber::fmt::layer().json()),
        ),
        "compact" => tracing::subscriber::set_global_default(
            registry.with(tracing_subscriber::fmt::layer().compact()),
        ),
        _ => tracing::subscriber::set_global_default(
            registry.with(tracing_subscriber::fmt::layer()),
        ),
    };
    // A second init (e.g. in tests) keeps the first subscriber.
    let _ = result;
}

fn normalize_level(level: &str) -> &'static str {
    match level.to_lowercase().as_str() {
        "error" => "error",
        "warn" => "warn",
        "info" => "info",
        "debug" => "debug",
        "trace" => "trace",
        _ => "info",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_level() {
        assert_eq!(normalize_level("error"), "error");
        assert_eq!(normalize_level("DEBUG"), "debug");
        assert_eq!(normalize_level("unknown"), "info");
    }

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, "pretty");
    }
}
