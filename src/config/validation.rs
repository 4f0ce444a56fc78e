//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that every setting a component needs is present
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Reject insecure fallbacks such as an empty database password
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: StackConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::uri::Authority;

use crate::composition::DeploymentMode;
use crate::config::schema::{ServiceEndpoint, StackConfig};

/// The part of the stack a configuration is validated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    /// The edge router (`serve`).
    Router,
    /// Database access (`seed`, `wait-for database`).
    Database,
    /// API supervision (`supervise`).
    Supervisor,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{key} is required")]
    Missing { key: &'static str },

    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

fn missing(key: &'static str) -> ValidationError {
    ValidationError::Missing { key }
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ValidationError {
    ValidationError::Invalid {
        key,
        reason: reason.into(),
    }
}

/// Validate `config` for each of `components`.
pub fn validate_config(
    config: &StackConfig,
    components: &[Component],
) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.readiness.max_wait_secs == 0 {
        errors.push(invalid("READINESS_MAX_WAIT_SECS", "must be greater than zero"));
    }
    if config.readiness.probe_timeout_secs == 0 {
        errors.push(invalid("readiness.probe_timeout_secs", "must be greater than zero"));
    }

    for component in components {
        match component {
            Component::Router => validate_router(config, &mut errors),
            Component::Database => validate_database(config, &mut errors),
            Component::Supervisor => validate_supervisor(config, &mut errors),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_router(config: &StackConfig, errors: &mut Vec<ValidationError>) {
    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(invalid(
            "LISTEN_ADDR",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    let prefix = &config.routing.api_prefix;
    if !prefix.starts_with('/') || prefix.len() < 2 {
        errors.push(invalid("API_PREFIX", "must start with '/' and name a path segment"));
    } else if prefix.ends_with('/') || prefix.contains(['?', '#']) {
        errors.push(invalid("API_PREFIX", "must not end with '/' or contain '?' or '#'"));
    }

    match &config.api {
        Some(endpoint) => validate_endpoint(endpoint, "API_HOST", errors),
        None => errors.push(missing("API_HOST")),
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(invalid("CONNECT_TIMEOUT_SECS", "must be greater than zero"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(invalid("UPSTREAM_TIMEOUT_SECS", "must be greater than zero"));
    }

    match config.mode {
        DeploymentMode::Development => match &config.frontend.dev_server {
            Some(endpoint) => validate_endpoint(endpoint, "FRONTEND_HOST", errors),
            None => errors.push(missing("FRONTEND_HOST")),
        },
        DeploymentMode::Production => {
            let root = &config.frontend.static_root;
            if !root.is_dir() {
                errors.push(invalid(
                    "STATIC_ROOT",
                    format!("{} is not a directory", root.display()),
                ));
            } else if !root.join(&config.frontend.index_document).is_file() {
                errors.push(invalid(
                    "INDEX_DOCUMENT",
                    format!(
                        "{} not found under {}",
                        config.frontend.index_document,
                        root.display()
                    ),
                ));
            }
        }
    }

    let obs = &config.observability;
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(invalid(
            "METRICS_ADDR",
            format!("'{}' is not a socket address", obs.metrics_address),
        ));
    }
}

fn validate_endpoint(
    endpoint: &ServiceEndpoint,
    key: &'static str,
    errors: &mut Vec<ValidationError>,
) {
    if endpoint.host.trim().is_empty() {
        errors.push(missing(key));
        return;
    }
    if endpoint.port == 0 {
        errors.push(invalid(key, format!("{} has port 0", endpoint.name)));
    }
    if endpoint.authority().parse::<Authority>().is_err() {
        errors.push(invalid(key, format!("'{}' is not a valid host", endpoint.host)));
    }
}

fn validate_database(config: &StackConfig, errors: &mut Vec<ValidationError>) {
    let db = &config.database;

    if let Some(raw) = &db.url {
        match url::Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "postgres" | "postgresql" | "sqlite") => {}
            Ok(url) => errors.push(invalid(
                "DATABASE_URL",
                format!("unsupported scheme '{}'", url.scheme()),
            )),
            // Never echo the URL back: it may carry credentials.
            Err(e) => errors.push(invalid("DATABASE_URL", e.to_string())),
        }
        return;
    }

    if db.host.as_deref().map_or(true, |h| h.trim().is_empty()) {
        errors.push(missing("DB_HOST"));
    }
    if db.port == 0 {
        errors.push(invalid("DB_PORT", "must not be 0"));
    }
    if db.user.as_deref().map_or(true, |u| u.trim().is_empty()) {
        errors.push(missing("DB_USER"));
    }
    match db.password.as_deref() {
        None => errors.push(missing("DB_PASSWORD")),
        Some("") => errors.push(invalid("DB_PASSWORD", "must not be empty")),
        Some(_) => {}
    }
    if db.name.as_deref().map_or(true, |n| n.trim().is_empty()) {
        errors.push(missing("DB_NAME"));
    }
}

fn validate_supervisor(config: &StackConfig, errors: &mut Vec<ValidationError>) {
    if config.mode == DeploymentMode::Development && config.supervisor.watch.is_empty() {
        errors.push(missing("WATCH_PATHS"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router_config() -> StackConfig {
        let mut config = StackConfig::default();
        config.api = Some(ServiceEndpoint::new("api", "api", 8000));
        config.frontend.dev_server = Some(ServiceEndpoint::new("frontend", "frontend", 5173));
        config
    }

    #[test]
    fn accepts_complete_development_config() {
        assert!(validate_config(&router_config(), &[Component::Router]).is_ok());
    }

    #[test]
    fn reports_every_missing_router_setting() {
        let errors = validate_config(&StackConfig::default(), &[Component::Router]).unwrap_err();
        assert!(errors.contains(&missing("API_HOST")));
        assert!(errors.contains(&missing("FRONTEND_HOST")));
    }

    #[test]
    fn production_requires_static_root_with_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = router_config();
        config.mode = DeploymentMode::Production;
        config.frontend.static_root = dir.path().to_path_buf();

        let errors = validate_config(&config, &[Component::Router]).unwrap_err();
        assert!(matches!(errors[0], ValidationError::Invalid { key: "INDEX_DOCUMENT", .. }));

        std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        assert!(validate_config(&config, &[Component::Router]).is_ok());
    }

    #[test]
    fn rejects_malformed_prefix() {
        for prefix in ["api", "/", "/api/", "/api?x"] {
            let mut config = router_config();
            config.routing.api_prefix = prefix.to_string();
            let errors = validate_config(&config, &[Component::Router]).unwrap_err();
            assert!(
                errors
                    .iter()
                    .any(|e| matches!(e, ValidationError::Invalid { key: "API_PREFIX", .. })),
                "prefix {prefix:?} should be rejected"
            );
        }
    }

    #[test]
    fn database_requires_credentials_and_rejects_empty_password() {
        let mut config = StackConfig::default();
        let errors = validate_config(&config, &[Component::Database]).unwrap_err();
        assert_eq!(errors.len(), 4);

        config.database.host = Some("db".into());
        config.database.user = Some("app".into());
        config.database.name = Some("app".into());
        config.database.password = Some(String::new());
        let errors = validate_config(&config, &[Component::Database]).unwrap_err();
        assert_eq!(errors, vec![invalid("DB_PASSWORD", "must not be empty")]);

        config.database.password = Some("s3cret".into());
        assert!(validate_config(&config, &[Component::Database]).is_ok());
    }

    #[test]
    fn database_url_takes_precedence() {
        let mut config = StackConfig::default();
        config.database.url = Some("sqlite:///var/lib/app/app.db".into());
        assert!(validate_config(&config, &[Component::Database]).is_ok());

        config.database.url = Some("mysql://db/app".into());
        assert!(validate_config(&config, &[Component::Database]).is_err());
    }
}
