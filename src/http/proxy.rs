//! Upstream forwarding.
//!
//! # Responsibilities
//! - Rewrite the request URI to the upstream's authority
//! - Forward method, path, query, end-to-end headers and the streaming body
//! - Return the upstream status, headers and body verbatim
//! - Hand protocol upgrades off to a byte tunnel
//!
//! # Design Decisions
//! - No retries: a failed call surfaces as a gateway failure
//! - Upstream hosts are resolved per connection by the connector, never cached
//! - The deadline covers connect + response headers, not body streaming

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::HOST;
use axum::http::uri::{Authority, InvalidUri, PathAndQuery, Scheme};
use axum::http::{HeaderValue, Request, Response, StatusCode, Uri, Version};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::ServiceEndpoint;
use crate::http::headers;
use crate::http::response::GatewayError;
use crate::http::upgrade;
use crate::routing::RouteTarget;

pub type HttpClient = Client<HttpConnector, Body>;

/// Build the shared upstream client.
pub fn build_client(connect_timeout: Duration) -> HttpClient {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(connect_timeout));
    connector.set_nodelay(true);

    Client::builder(TokioExecutor::new()).build(connector)
}

/// An upstream service the router forwards to.
#[derive(Debug, Clone)]
pub struct Upstream {
    name: String,
    target: RouteTarget,
    authority: Authority,
    allow_upgrade: bool,
}

impl Upstream {
    pub fn new(
        endpoint: &ServiceEndpoint,
        target: RouteTarget,
        allow_upgrade: bool,
    ) -> Result<Self, InvalidUri> {
        Ok(Self {
            name: endpoint.name.clone(),
            target,
            authority: endpoint.authority().parse()?,
            allow_upgrade,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> RouteTarget {
        self.target
    }

    /// `original` with its scheme and authority replaced by this upstream's.
    fn uri_for(&self, original: &Uri) -> Result<Uri, axum::http::Error> {
        let path_and_query = original
            .path_and_query()
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/"));

        Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
    }
}

/// Forwards requests to upstreams over a pooled client.
#[derive(Clone)]
pub struct Forwarder {
    client: HttpClient,
    timeout: Duration,
}

impl Forwarder {
    pub fn new(client: HttpClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub async fn forward(
        &self,
        upstream: &Upstream,
        mut request: Request<Body>,
        client_addr: SocketAddr,
    ) -> Result<Response<Body>, GatewayError> {
        let protocol = if upstream.allow_upgrade {
            headers::upgrade_protocol(request.headers())
        } else {
            None
        };
        let client_upgrade = protocol.as_ref().map(|_| hyper::upgrade::on(&mut request));

        let (parts, body) = request.into_parts();
        let mut forwarded_headers = parts.headers;

        // HTTP/2 clients carry the host in the URI instead of a Host header.
        if !forwarded_headers.contains_key(HOST) {
            if let Some(host) = parts
                .uri
                .authority()
                .and_then(|a| HeaderValue::from_str(a.as_str()).ok())
            {
                forwarded_headers.insert(HOST, host);
            }
        }
        headers::strip_hop_by_hop(&mut forwarded_headers);
        if let Some(protocol) = protocol {
            headers::set_upgrade(&mut forwarded_headers, protocol);
        }
        headers::append_forwarded(&mut forwarded_headers, client_addr);

        let mut outbound = Request::builder()
            .method(parts.method)
            .version(Version::HTTP_11)
            .uri(upstream.uri_for(&parts.uri)?)
            .body(body)?;
        *outbound.headers_mut() = forwarded_headers;

        let pending = self.client.request(outbound);
        let mut response = match tokio::time::timeout(self.timeout, pending).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(GatewayError::Unreachable(e)),
            Err(_) => return Err(GatewayError::Timeout(self.timeout)),
        };

        if response.status() == StatusCode::SWITCHING_PROTOCOLS {
            if let Some(client_upgrade) = client_upgrade {
                let upstream_upgrade = hyper::upgrade::on(&mut response);
                upgrade::spawn_tunnel(client_upgrade, upstream_upgrade, upstream.name.clone());
                let (parts, _) = response.into_parts();
                return Ok(Response::from_parts(parts, Body::empty()));
            }
        }

        let (mut parts, body) = response.into_parts();
        headers::strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}
