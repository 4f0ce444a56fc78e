//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Compile the mode's route table into concrete dispatch targets
//! - Create Axum Router with the edge handler
//! - Wire up middleware (tracing, request ID)
//! - Bind server to listener
//! - Drain in-flight requests on shutdown, bounded by the grace period

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::composition::{Composition, CompositionError, DeploymentMode, FrontendUnit};
use crate::config::StackConfig;
use crate::http::proxy::{build_client, Forwarder, Upstream};
use crate::http::request::{request_id, UuidRequestId};
use crate::http::static_files::StaticAssets;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::routing::{RouteTable, RouteTarget, RoutingError};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Composition(#[from] CompositionError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error("invalid upstream address for {name}: {source}")]
    InvalidUpstream {
        name: String,
        source: axum::http::uri::InvalidUri,
    },

    #[error("route target {target} has no implementation in {mode} mode")]
    ModeMismatch {
        target: RouteTarget,
        mode: DeploymentMode,
    },

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Where a matched route sends the request.
#[derive(Clone)]
enum Dispatch {
    Upstream(Arc<Upstream>),
    Static(StaticAssets),
}

impl Dispatch {
    fn label(&self) -> &'static str {
        match self {
            Dispatch::Upstream(upstream) => upstream.target().as_str(),
            Dispatch::Static(_) => RouteTarget::StaticAssets.as_str(),
        }
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    routes: Arc<RouteTable<Dispatch>>,
    forwarder: Forwarder,
}

/// HTTP server for the edge router.
pub struct HttpServer {
    router: Router,
    mode: DeploymentMode,
}

impl HttpServer {
    /// Create a server for the mode selected in `config`.
    pub fn new(config: &StackConfig) -> Result<Self, ServerError> {
        let composition = Composition::resolve(config)?;
        Self::from_composition(&composition, config)
    }

    pub fn from_composition(
        composition: &Composition,
        config: &StackConfig,
    ) -> Result<Self, ServerError> {
        let api = Arc::new(upstream(&composition.api, RouteTarget::Api, false)?);
        let frontend = match &composition.frontend {
            FrontendUnit::LiveReload { endpoint } => {
                let dev_server = upstream(endpoint, RouteTarget::FrontendDevServer, true)?;
                Dispatch::Upstream(Arc::new(dev_server))
            }
            FrontendUnit::StaticBundle { root, index_document } => {
                Dispatch::Static(StaticAssets::new(root, index_document))
            }
        };

        let mode = composition.mode;
        let routes = RouteTable::for_mode(mode, &composition.api_prefix)?.try_map(|target| {
            match (target, &frontend) {
                (RouteTarget::Api, _) => Ok(Dispatch::Upstream(api.clone())),
                (RouteTarget::FrontendDevServer, Dispatch::Upstream(_))
                | (RouteTarget::StaticAssets, Dispatch::Static(_)) => Ok(frontend.clone()),
                (target, _) => Err(ServerError::ModeMismatch { target, mode }),
            }
        })?;

        for rule in routes.rules() {
            tracing::debug!(
                prefix = rule.prefix(),
                target = rule.target().label(),
                "Route compiled"
            );
        }

        let client = build_client(Duration::from_secs(config.timeouts.connect_secs));
        let state = AppState {
            routes: Arc::new(routes),
            forwarder: Forwarder::new(client, Duration::from_secs(config.timeouts.upstream_secs)),
        };

        Ok(Self {
            router: Self::build_router(state),
            mode,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(edge_handler))
            .route("/", any(edge_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// Run the server until `shutdown` fires, then drain for at most its
    /// grace period.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), ServerError> {
        let mut stop = shutdown.subscribe();
        let grace_period = shutdown.grace_period();
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, mode = %self.mode, "Edge router listening");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let (drain_tx, drain_rx) = oneshot::channel::<()>();
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = drain_rx.await;
        });
        let mut task = tokio::spawn(server.into_future());

        tokio::select! {
            joined = &mut task => {
                joined??;
                return Ok(());
            }
            _ = stop.recv() => {}
        }

        tracing::info!(grace_period = ?grace_period, "Draining in-flight requests");
        let _ = drain_tx.send(());

        match tokio::time::timeout(grace_period, &mut task).await {
            Ok(joined) => joined??,
            Err(_) => {
                tracing::warn!("Grace period elapsed, closing remaining connections");
                task.abort();
            }
        }

        tracing::info!("Edge router stopped");
        Ok(())
    }
}

fn upstream(
    endpoint: &crate::config::ServiceEndpoint,
    target: RouteTarget,
    allow_upgrade: bool,
) -> Result<Upstream, ServerError> {
    Upstream::new(endpoint, target, allow_upgrade).map_err(|source| ServerError::InvalidUpstream {
        name: endpoint.name.clone(),
        source,
    })
}

/// Edge handler.
/// Resolves the route and either forwards upstream or serves static assets.
async fn edge_handler(
    State(state): State<AppState>,
    ConnectInfo(client_addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(request.headers()).to_string();
    let method = request.method().clone();

    let rule = state.routes.resolve(request.uri().path());
    let dispatch = rule.target();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %request.uri().path(),
        prefix = rule.prefix(),
        target = dispatch.label(),
        "Routing request"
    );

    let response = match dispatch {
        Dispatch::Upstream(upstream) => match state
            .forwarder
            .forward(upstream, request, client_addr)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    request_id = %request_id,
                    upstream = upstream.name(),
                    error = %e,
                    "Upstream request failed"
                );
                metrics::record_upstream_failure(dispatch.label(), e.kind());
                e.into_response()
            }
        },
        Dispatch::Static(assets) => assets.serve(request).await,
    };

    metrics::record_request(
        method.as_str(),
        response.status().as_u16(),
        dispatch.label(),
        start_time,
    );
    response
}
