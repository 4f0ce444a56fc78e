//! Readiness probes.
//!
//! # Responsibilities
//! - Describe what "ready" means for a dependency
//! - Run a single check attempt
//!
//! # Design Decisions
//! - TCP: the port accepts connections
//! - HTTP: a GET returns 2xx
//! - Database: a connection opens and `SELECT 1` succeeds
//! - Labels never include credentials

use axum::body::Body;
use axum::http::{Request, StatusCode, Uri};
use sqlx::Connection;
use tokio::net::TcpStream;

use crate::config::StackConfig;
use crate::http::proxy::HttpClient;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("connection failed: {0}")]
    Connect(#[from] std::io::Error),

    #[error("request failed: {0}")]
    Http(#[from] hyper_util::client::legacy::Error),

    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("database not ready: {0}")]
    Database(#[from] sqlx::Error),

    #[error("probe timed out")]
    Timeout,

    #[error("invalid probe target: {0}")]
    InvalidTarget(String),
}

/// A dependency check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Tcp { authority: String },
    Http { uri: Uri },
    Database { url: String },
}

impl Probe {
    /// Parse a `wait-for` target.
    ///
    /// Accepts `database`, `api`, `frontend` (resolved from `config`),
    /// `tcp://host:port`, or an `http://` URL.
    pub fn parse(target: &str, config: &StackConfig) -> Result<Self, ProbeError> {
        match target {
            "database" | "db" => config
                .database
                .connection_url()
                .map(|url| Probe::Database { url })
                .ok_or_else(|| {
                    ProbeError::InvalidTarget("database settings are incomplete".into())
                }),
            "api" => config
                .api
                .as_ref()
                .map(|endpoint| Probe::Tcp {
                    authority: endpoint.authority(),
                })
                .ok_or_else(|| ProbeError::InvalidTarget("no API endpoint configured".into())),
            "frontend" => config
                .frontend
                .dev_server
                .as_ref()
                .map(|endpoint| Probe::Tcp {
                    authority: endpoint.authority(),
                })
                .ok_or_else(|| {
                    ProbeError::InvalidTarget("no frontend dev server configured".into())
                }),
            other if other.starts_with("tcp://") => {
                let authority = &other["tcp://".len()..];
                let well_formed = authority
                    .rsplit_once(':')
                    .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
                if !well_formed {
                    return Err(ProbeError::InvalidTarget(format!(
                        "'{other}' must be tcp://host:port"
                    )));
                }
                Ok(Probe::Tcp {
                    authority: authority.to_string(),
                })
            }
            other if other.starts_with("http://") => other
                .parse::<Uri>()
                .map(|uri| Probe::Http { uri })
                .map_err(|e| ProbeError::InvalidTarget(e.to_string())),
            other => Err(ProbeError::InvalidTarget(format!("unknown target '{other}'"))),
        }
    }

    /// Human-readable target, safe to log.
    pub fn label(&self) -> String {
        match self {
            Probe::Tcp { authority } => format!("tcp://{authority}"),
            Probe::Http { uri } => uri.to_string(),
            Probe::Database { url } => match url::Url::parse(url) {
                Ok(mut parsed) => {
                    let _ = parsed.set_password(None);
                    parsed.to_string()
                }
                Err(_) => "database".to_string(),
            },
        }
    }

    /// Run one check attempt.
    pub async fn check(&self, client: &HttpClient) -> Result<(), ProbeError> {
        match self {
            Probe::Tcp { authority } => {
                TcpStream::connect(authority.as_str()).await?;
                Ok(())
            }
            Probe::Http { uri } => {
                let request = Request::builder()
                    .method("GET")
                    .uri(uri.clone())
                    .header("user-agent", "edge-router-readiness")
                    .body(Body::empty())
                    .map_err(|e| ProbeError::InvalidTarget(e.to_string()))?;
                let response = client.request(request).await?;
                if response.status().is_success() {
                    Ok(())
                } else {
                    Err(ProbeError::Status(response.status()))
                }
            }
            Probe::Database { url } => {
                sqlx::any::install_default_drivers();
                let mut conn = sqlx::AnyConnection::connect(url).await?;
                sqlx::query("SELECT 1").execute(&mut conn).await?;
                conn.close().await?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceEndpoint;

    #[test]
    fn parses_named_and_explicit_targets() {
        let mut config = StackConfig::default();
        config.api = Some(ServiceEndpoint::new("api", "api", 8000));
        config.database.host = Some("db".into());
        config.database.user = Some("app".into());
        config.database.password = Some("secret".into());
        config.database.name = Some("app".into());

        assert_eq!(
            Probe::parse("api", &config).unwrap(),
            Probe::Tcp {
                authority: "api:8000".into()
            }
        );
        assert_eq!(
            Probe::parse("tcp://db:5432", &config).unwrap(),
            Probe::Tcp {
                authority: "db:5432".into()
            }
        );
        assert!(matches!(
            Probe::parse("http://api:8000/health", &config).unwrap(),
            Probe::Http { .. }
        ));
        assert!(matches!(Probe::parse("database", &config).unwrap(), Probe::Database { .. }));

        assert!(Probe::parse("frontend", &config).is_err());
        assert!(Probe::parse("tcp://db", &config).is_err());
        assert!(Probe::parse("redis", &config).is_err());
    }

    #[test]
    fn database_label_hides_password() {
        let probe = Probe::Database {
            url: "postgres://app:hunter2@db:5432/app".into(),
        };
        let label = probe.label();
        assert!(!label.contains("hunter2"));
        assert!(label.contains("db:5432"));
    }

    #[tokio::test]
    async fn http_probe_requires_success_status() {
        use axum::{routing::get, Router};
        use std::time::Duration;

        let router = Router::new()
            .route("/ready", get(|| async { "ok" }))
            .route("/starting", get(|| async { StatusCode::SERVICE_UNAVAILABLE }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let client = crate::http::proxy::build_client(Duration::from_secs(1));
        let ready = Probe::Http {
            uri: format!("http://{addr}/ready").parse().unwrap(),
        };
        assert!(ready.check(&client).await.is_ok());

        let starting = Probe::Http {
            uri: format!("http://{addr}/starting").parse().unwrap(),
        };
        let err = starting.check(&client).await.unwrap_err();
        assert!(matches!(err, ProbeError::Status(StatusCode::SERVICE_UNAVAILABLE)));
    }
}
