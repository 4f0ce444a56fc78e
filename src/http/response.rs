//! Gateway failure responses.
//!
//! # Design Decisions
//! - Unreachable upstreams return 502 Bad Gateway
//! - Upstreams that do not answer in time return 504 Gateway Timeout
//! - Response bodies are fixed text: no upstream addresses or error details
//!   reach the client; the detail is logged with the request ID instead

use std::time::Duration;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

/// A failure talking to an upstream service.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("upstream unreachable: {0}")]
    Unreachable(#[source] hyper_util::client::legacy::Error),

    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    #[error("failed to build upstream request: {0}")]
    Request(#[from] axum::http::Error),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Unreachable(_) | GatewayError::Request(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Unreachable(_) => "unreachable",
            GatewayError::Timeout(_) => "timeout",
            GatewayError::Request(_) => "request",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match status {
            StatusCode::GATEWAY_TIMEOUT => "Gateway Timeout",
            _ => "Bad Gateway",
        };
        (status, [(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
    }
}
