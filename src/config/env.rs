//! Environment overrides.
//!
//! Applies named key/value settings on top of the file configuration. The
//! variables are passed in explicitly so the process environment is read
//! exactly once, at startup, by the loader.

use std::collections::HashMap;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::loader::ConfigError;
use crate::config::schema::{LogFormat, ServiceEndpoint, StackConfig};
use crate::composition::DeploymentMode;

const DEFAULT_API_PORT: u16 = 8000;
const DEFAULT_FRONTEND_PORT: u16 = 5173;

/// Apply environment overrides to `config`.
///
/// Empty values are treated as unset, matching how Compose interpolates
/// undefined variables.
pub fn apply_env(
    config: &mut StackConfig,
    vars: &HashMap<String, String>,
) -> Result<(), ConfigError> {
    let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

    if let Some(mode) = parsed::<DeploymentMode>(vars, "STACK_MODE")? {
        config.mode = mode;
    }
    if let Some(addr) = get("LISTEN_ADDR") {
        config.listener.bind_address = addr.to_string();
    }
    if let Some(prefix) = get("API_PREFIX") {
        config.routing.api_prefix = prefix.to_string();
    }

    let api_port = parsed::<u16>(vars, "API_PORT")?;
    config.api = merge_endpoint(
        config.api.take(),
        "api",
        get("API_HOST"),
        api_port,
        DEFAULT_API_PORT,
    );

    let frontend_port = parsed::<u16>(vars, "FRONTEND_PORT")?;
    config.frontend.dev_server = merge_endpoint(
        config.frontend.dev_server.take(),
        "frontend",
        get("FRONTEND_HOST"),
        frontend_port,
        DEFAULT_FRONTEND_PORT,
    );
    if let Some(root) = get("STATIC_ROOT") {
        config.frontend.static_root = PathBuf::from(root);
    }
    if let Some(index) = get("INDEX_DOCUMENT") {
        config.frontend.index_document = index.to_string();
    }

    let db = &mut config.database;
    if let Some(url) = get("DATABASE_URL") {
        db.url = Some(url.to_string());
    }
    if let Some(host) = get("DB_HOST") {
        db.host = Some(host.to_string());
    }
    if let Some(port) = parsed::<u16>(vars, "DB_PORT")? {
        db.port = port;
    }
    if let Some(user) = get("DB_USER") {
        db.user = Some(user.to_string());
    }
    // Passwords are taken verbatim; surrounding whitespace may be significant.
    if let Some(password) = vars.get("DB_PASSWORD").filter(|v| !v.is_empty()) {
        db.password = Some(password.clone());
    }
    if let Some(name) = get("DB_NAME") {
        db.name = Some(name.to_string());
    }
    if let Some(path) = get("DB_VOLUME_PATH") {
        db.volume_path = Some(PathBuf::from(path));
    }
    if let Some(path) = get("DB_INIT_DIR") {
        db.init_dir = Some(PathBuf::from(path));
    }

    if let Some(secs) = parsed(vars, "UPSTREAM_TIMEOUT_SECS")? {
        config.timeouts.upstream_secs = secs;
    }
    if let Some(secs) = parsed(vars, "CONNECT_TIMEOUT_SECS")? {
        config.timeouts.connect_secs = secs;
    }
    if let Some(secs) = parsed(vars, "READINESS_MAX_WAIT_SECS")? {
        config.readiness.max_wait_secs = secs;
    }
    if let Some(secs) = parsed(vars, "SHUTDOWN_GRACE_SECS")? {
        config.shutdown.grace_period_secs = secs;
    }

    if let Some(level) = get("LOG_LEVEL") {
        config.observability.log_level = level.to_string();
    }
    if let Some(format) = parsed::<LogFormat>(vars, "LOG_FORMAT")? {
        config.observability.log_format = Some(format);
    }
    if let Some(enabled) = parsed::<bool>(vars, "METRICS_ENABLED")? {
        config.observability.metrics_enabled = enabled;
    }
    if let Some(addr) = get("METRICS_ADDR") {
        config.observability.metrics_address = addr.to_string();
    }

    if let Some(paths) = get("WATCH_PATHS") {
        config.supervisor.watch = paths
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .collect();
    }

    Ok(())
}

fn parsed<T>(vars: &HashMap<String, String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        None => Ok(None),
    }
}

fn merge_endpoint(
    current: Option<ServiceEndpoint>,
    name: &str,
    host: Option<&str>,
    port: Option<u16>,
    default_port: u16,
) -> Option<ServiceEndpoint> {
    match (current, host) {
        (Some(mut endpoint), host) => {
            if let Some(host) = host {
                endpoint.host = host.to_string();
            }
            if let Some(port) = port {
                endpoint.port = port;
            }
            Some(endpoint)
        }
        (None, Some(host)) => Some(ServiceEndpoint::new(name, host, port.unwrap_or(default_port))),
        (None, None) => None,
    }
}
