//! Logging setup.
//!
//! Structured logging via the `tracing` crate. The engine itself only emits
//! spans and events; this module is the process-level initialization the
//! binary (or an embedding application) calls once at startup.

use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Whether logging is enabled (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text (default: text)
    #[serde(default = "default_format")]
    pub format: String,

    /// Enable colored output (text format only)
    #[serde(default = "default_true")]
    pub color: bool,

    /// Module-specific log levels
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            level: default_log_level(),
            format: default_format(),
            color: default_true(),
            modules: HashMap::new(),
        }
    }
}

/// Initialize the logging system. Events go to stderr so the binary's
/// stdout stays clean for report output.
///
/// The `ATTUNE_LOG` environment variable overrides the configured level
/// and module directives entirely.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), SyncError> {
    let config = config.cloned().unwrap_or_default();
    if !config.enabled {
        return Ok(());
    }

    let filter = build_env_filter(&config)?;
    let base = Registry::default().with(filter);

    let result = if config.format == "json" {
        base.with(
            fmt::layer()
                .json()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .try_init()
    } else {
        base.with(
            fmt::layer()
                .with_target(true)
                .with_ansi(config.color)
                .with_writer(std::io::stderr),
        )
        .try_init()
    };

    result.map_err(|e| SyncError::InvalidConfiguration(format!("failed to set subscriber: {}", e)))
}

fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter, SyncError> {
    if let Ok(env) = std::env::var("ATTUNE_LOG") {
        if !env.is_empty() {
            return EnvFilter::try_new(&env).map_err(|e| {
                SyncError::InvalidConfiguration(format!("invalid ATTUNE_LOG filter: {}", e))
            });
        }
    }

    let mut directives = config.level.clone();
    for (module, level) in &config.modules {
        directives.push_str(&format!(",{}={}", module, level));
    }
    EnvFilter::try_new(&directives)
        .map_err(|e| SyncError::InvalidConfiguration(format!("invalid log level: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = LoggingConfig::default();
        assert!(config.enabled);
        assert_eq!(config.level, "info");
        assert_eq!(config.format, "text");
    }

    #[test]
    fn module_directives_compose() {
        let mut config = LoggingConfig::default();
        config
            .modules
            .insert("attune::reconcile".to_string(), "debug".to_string());
        assert!(build_env_filter(&config).is_ok());
    }

    #[test]
    fn invalid_level_is_rejected() {
        let config = LoggingConfig {
            level: "shouting=loudly=always".to_string(),
            ..Default::default()
        };
        assert!(build_env_filter(&config).is_err());
    }
}
