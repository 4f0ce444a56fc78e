//! Structured logging.
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Log level configurable via config and environment (`RUST_LOG` wins)
//! - Written to stderr; stdout carries command output (`plan`)

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::composition::DeploymentMode;
use crate::config::{LogFormat, ObservabilityConfig};

/// Format used when none is configured.
pub fn default_format(mode: DeploymentMode) -> LogFormat {
    match mode {
        DeploymentMode::Development => LogFormat::Pretty,
        DeploymentMode::Production => LogFormat::Json,
    }
}

fn default_directives(level: &str) -> String {
    format!("edge_router={level},tower_http={level},sqlx=warn")
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(config: &ObservabilityConfig, mode: DeploymentMode) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.log_format.unwrap_or_else(|| default_format(mode)) {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_mode() {
        assert_eq!(default_format(DeploymentMode::Production), LogFormat::Json);
        assert_eq!(default_format(DeploymentMode::Development), LogFormat::Pretty);
    }

    #[test]
    fn directives_carry_level() {
        assert!(default_directives("debug").starts_with("edge_router=debug"));
    }
}
