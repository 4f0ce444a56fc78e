//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    http::{HeaderMap, Method, Uri},
    response::Response,
    routing::{any, get},
    Json, Router,
};
use edge_router::composition::DeploymentMode;
use edge_router::config::{ServiceEndpoint, StackConfig};
use edge_router::{HttpServer, Shutdown};
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

/// Start a simple mock backend that returns a fixed response.
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let response_str = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            response.len(),
                            response
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start an API mock that echoes the request back as JSON.
pub async fn start_echo_api() -> SocketAddr {
    async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Value> {
        let headers: BTreeMap<String, String> = headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect();
        Json(json!({
            "method": method.as_str(),
            "uri": uri.to_string(),
            "headers": headers,
            "body": String::from_utf8_lossy(&body),
        }))
    }

    serve(Router::new().fallback(any(echo))).await
}

/// Start a frontend dev server mock with a websocket echo at `/ws`.
pub async fn start_dev_server() -> SocketAddr {
    async fn page() -> &'static str {
        "<html>dev server</html>"
    }

    async fn ws(upgrade: WebSocketUpgrade) -> Response {
        upgrade.on_upgrade(echo_socket)
    }

    async fn echo_socket(mut socket: WebSocket) {
        while let Some(Ok(msg)) = socket.recv().await {
            match msg {
                Message::Text(_) | Message::Binary(_) => {
                    if socket.send(msg).await.is_err() {
                        break;
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    }

    serve(Router::new().route("/ws", get(ws)).fallback(page)).await
}

async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// An address nothing listens on.
pub fn unused_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

fn endpoint(name: &str, addr: SocketAddr) -> ServiceEndpoint {
    ServiceEndpoint::new(name, addr.ip().to_string(), addr.port())
}

pub fn dev_config(api: SocketAddr, frontend: SocketAddr) -> StackConfig {
    let mut config = StackConfig::default();
    config.mode = DeploymentMode::Development;
    config.api = Some(endpoint("api", api));
    config.frontend.dev_server = Some(endpoint("frontend", frontend));
    config.timeouts.connect_secs = 1;
    config.timeouts.upstream_secs = 5;
    config.shutdown.grace_period_secs = 1;
    config
}

pub fn prod_config(api: SocketAddr, static_root: &Path) -> StackConfig {
    let mut config = StackConfig::default();
    config.mode = DeploymentMode::Production;
    config.api = Some(endpoint("api", api));
    config.frontend.static_root = static_root.to_path_buf();
    config.timeouts.connect_secs = 1;
    config.timeouts.upstream_secs = 5;
    config.shutdown.grace_period_secs = 1;
    config
}

/// Start the edge router on an ephemeral port.
pub async fn start_router(config: StackConfig) -> (SocketAddr, Shutdown) {
    let server = HttpServer::new(&config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new(Duration::from_secs(config.shutdown.grace_period_secs));
    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    // Let the server subscribe before the caller can trigger.
    tokio::task::yield_now().await;

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
