//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the stack.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::composition::DeploymentMode;

/// Root configuration for the stack.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StackConfig {
    /// Deployment mode, fixed for the lifetime of the process.
    pub mode: DeploymentMode,

    /// Listener configuration for the edge router.
    pub listener: ListenerConfig,

    /// Path routing settings.
    pub routing: RoutingConfig,

    /// API service endpoint.
    pub api: Option<ServiceEndpoint>,

    /// Frontend unit settings (dev server or static bundle).
    pub frontend: FrontendConfig,

    /// Database connection and volume settings.
    pub database: DatabaseConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Readiness gate settings.
    pub readiness: ReadinessConfig,

    /// Shutdown settings.
    pub shutdown: ShutdownConfig,

    /// API process supervision settings.
    pub supervisor: SupervisorConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:80").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:80".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Path prefix owned by the API service.
    pub api_prefix: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            api_prefix: "/api".to_string(),
        }
    }
}

/// A service addressed by a stable logical name on the internal network.
///
/// `host` is resolved on every new connection, so the endpoint survives
/// container restarts that change the underlying address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceEndpoint {
    /// Logical service name used in logs and plans.
    pub name: String,

    /// Host name (or address) on the internal network.
    pub host: String,

    /// Port the service listens on.
    pub port: u16,
}

impl ServiceEndpoint {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
        }
    }

    /// `host:port`, suitable for a URI authority.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.name, self.host, self.port)
    }
}

/// Frontend unit configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FrontendConfig {
    /// Live-reload dev server, used in development mode.
    pub dev_server: Option<ServiceEndpoint>,

    /// Root of the prebuilt static asset tree, used in production mode.
    pub static_root: PathBuf,

    /// Canonical entry document, relative to `static_root`.
    pub index_document: String,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            dev_server: None,
            static_root: PathBuf::from("/usr/share/edge-router/html"),
            index_document: "index.html".to_string(),
        }
    }
}

/// Database connection and persistence settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Full connection URL; takes precedence over the individual parts.
    pub url: Option<String>,

    pub host: Option<String>,

    pub port: u16,

    pub user: Option<String>,

    pub password: Option<String>,

    /// Database name.
    pub name: Option<String>,

    /// Durable data directory owned by the database.
    pub volume_path: Option<PathBuf>,

    /// Directory of `*.sql` scripts applied once on first start.
    pub init_dir: Option<PathBuf>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: None,
            port: 5432,
            user: None,
            password: None,
            name: None,
            volume_path: None,
            init_dir: None,
        }
    }
}

impl DatabaseConfig {
    /// Connection URL: `url` if set, otherwise assembled from the parts.
    ///
    /// Returns `None` when a required part is missing.
    pub fn connection_url(&self) -> Option<String> {
        if let Some(url) = &self.url {
            return Some(url.clone());
        }
        let (host, user, password, name) = (
            self.host.as_deref()?,
            self.user.as_deref()?,
            self.password.as_deref()?,
            self.name.as_deref()?,
        );

        let mut url = url::Url::parse("postgres://localhost").ok()?;
        url.set_host(Some(host)).ok()?;
        url.set_port(Some(self.port)).ok()?;
        url.set_username(user).ok()?;
        url.set_password(Some(password)).ok()?;
        url.set_path(name);
        Some(url.into())
    }

    /// `host:port` of the database server, if it is reached over the network.
    pub fn authority(&self) -> Option<String> {
        match &self.url {
            Some(raw) => {
                let url = url::Url::parse(raw).ok()?;
                let host = url.host_str()?;
                let port = url.port().unwrap_or(self.port);
                Some(format!("{host}:{port}"))
            }
            None => self.host.as_ref().map(|host| format!("{}:{}", host, self.port)),
        }
    }
}

/// Timeout configuration for upstream traffic.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed for an upstream to produce response headers, in seconds.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 60,
        }
    }
}

/// Readiness gate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Upper bound on the total wait, in seconds.
    pub max_wait_secs: u64,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay between attempts in milliseconds.
    pub max_delay_ms: u64,

    /// Timeout for a single probe attempt in seconds.
    pub probe_timeout_secs: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            max_wait_secs: 60,
            base_delay_ms: 250,
            max_delay_ms: 5000,
            probe_timeout_secs: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Time allowed for in-flight work to drain before forced termination.
    pub grace_period_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: 10,
        }
    }
}

/// API supervision settings (development mode only).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Paths watched for source changes.
    pub watch: Vec<PathBuf>,

    /// Quiet period after a change before restarting, in milliseconds.
    pub debounce_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            watch: vec![PathBuf::from("src")],
            debounce_ms: 300,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format. Derived from the mode when unset.
    pub log_format: Option<LogFormat>,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: None,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}
