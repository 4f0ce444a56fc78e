//! Edge routing tests: API forwarding, static assets, gateway failures.

use std::fs;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::Value;

mod common;

#[tokio::test]
async fn api_requests_are_forwarded_unchanged() {
    let api = common::start_echo_api().await;
    let frontend = common::start_dev_server().await;
    let (router, shutdown) = common::start_router(common::dev_config(api, frontend)).await;

    let res = common::client()
        .post(format!("http://{router}/api/items?page=2"))
        .header("authorization", "Bearer token-123")
        .header("x-custom", "kept")
        .body("{\"name\":\"widget\"}")
        .send()
        .await
        .expect("router unreachable");

    assert_eq!(res.status(), StatusCode::OK);
    let echoed: Value = res.json().await.unwrap();
    assert_eq!(echoed["method"], "POST");
    assert_eq!(echoed["uri"], "/api/items?page=2");
    assert_eq!(echoed["body"], "{\"name\":\"widget\"}");
    assert_eq!(echoed["headers"]["authorization"], "Bearer token-123");
    assert_eq!(echoed["headers"]["x-custom"], "kept");
    assert_eq!(echoed["headers"]["x-forwarded-for"], "127.0.0.1");
    assert_eq!(echoed["headers"]["host"], router.to_string());
    assert!(echoed["headers"]["x-request-id"].as_str().is_some_and(|id| !id.is_empty()));

    shutdown.trigger();
}

#[tokio::test]
async fn upstream_status_and_body_are_returned() {
    let api = common::start_mock_backend("{\"ok\":true}").await;
    let frontend = common::start_dev_server().await;
    let (router, shutdown) = common::start_router(common::dev_config(api, frontend)).await;

    let res = common::client()
        .get(format!("http://{router}/api/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "{\"ok\":true}");

    shutdown.trigger();
}

#[tokio::test]
async fn development_forwards_other_paths_to_dev_server() {
    let api = common::start_echo_api().await;
    let frontend = common::start_dev_server().await;
    let (router, shutdown) = common::start_router(common::dev_config(api, frontend)).await;
    let client = common::client();

    for path in ["/", "/dashboard/settings", "/apiary"] {
        let res = client.get(format!("http://{router}{path}")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK, "path {path}");
        assert_eq!(res.text().await.unwrap(), "<html>dev server</html>", "path {path}");
    }

    shutdown.trigger();
}

#[tokio::test]
async fn production_serves_files_and_falls_back_to_index() {
    let root = tempfile::tempdir().unwrap();
    fs::write(root.path().join("index.html"), "<html>app shell</html>").unwrap();
    fs::create_dir(root.path().join("assets")).unwrap();
    fs::write(root.path().join("assets/app.js"), "console.log('app')").unwrap();

    let api = common::start_echo_api().await;
    let (router, shutdown) = common::start_router(common::prod_config(api, root.path())).await;
    let client = common::client();

    let res = client.get(format!("http://{router}/assets/app.js")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "console.log('app')");

    let res = client.get(format!("http://{router}/dashboard/settings")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "<html>app shell</html>");

    let res = client.get(format!("http://{router}/api/users")).send().await.unwrap();
    let echoed: Value = res.json().await.unwrap();
    assert_eq!(echoed["uri"], "/api/users");

    shutdown.trigger();
}

#[tokio::test]
async fn unreachable_upstream_is_a_generic_bad_gateway() {
    let frontend = common::start_dev_server().await;
    let dead = common::unused_addr();
    let (router, shutdown) = common::start_router(common::dev_config(dead, frontend)).await;

    let res = common::client()
        .get(format!("http://{router}/api/users"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body = res.text().await.unwrap();
    assert_eq!(body, "Bad Gateway");
    assert!(!body.contains(&dead.port().to_string()));

    shutdown.trigger();
}

#[tokio::test]
async fn slow_upstream_is_a_gateway_timeout() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let api = listener.local_addr().unwrap();
    // Accepts connections but never answers.
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let frontend = common::start_dev_server().await;
    let mut config = common::dev_config(api, frontend);
    config.timeouts.upstream_secs = 1;
    let (router, shutdown) = common::start_router(config).await;

    let res = common::client()
        .get(format!("http://{router}/api/slow"))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(res.text().await.unwrap(), "Gateway Timeout");

    shutdown.trigger();
}

#[tokio::test]
async fn request_id_is_generated_or_propagated() {
    let api = common::start_echo_api().await;
    let frontend = common::start_dev_server().await;
    let (router, shutdown) = common::start_router(common::dev_config(api, frontend)).await;
    let client = common::client();

    let res = client
        .get(format!("http://{router}/api/x"))
        .header("x-request-id", "trace-abc")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "trace-abc");
    let echoed: Value = res.json().await.unwrap();
    assert_eq!(echoed["headers"]["x-request-id"], "trace-abc");

    let res = client.get(format!("http://{router}/api/x")).send().await.unwrap();
    let generated = res.headers()["x-request-id"].to_str().unwrap().to_string();
    assert_eq!(generated.len(), 36);

    shutdown.trigger();
}

#[tokio::test]
async fn shutdown_stops_accepting() {
    let api = common::start_echo_api().await;
    let frontend = common::start_dev_server().await;
    let (router, shutdown) = common::start_router(common::dev_config(api, frontend)).await;

    let res = common::client().get(format!("http://{router}/api/x")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(common::client().get(format!("http://{router}/api/x")).send().await.is_err());
}

#[tokio::test]
async fn drain_is_bounded_by_grace_period() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let api = listener.local_addr().unwrap();
    // Accepts connections but never answers.
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let frontend = common::start_dev_server().await;
    let mut config = common::dev_config(api, frontend);
    config.timeouts.upstream_secs = 30;
    config.shutdown.grace_period_secs = 1;

    let server = edge_router::HttpServer::new(&config).unwrap();
    let router_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let router = router_listener.local_addr().unwrap();
    let grace_period = Duration::from_secs(config.shutdown.grace_period_secs);
    let shutdown = edge_router::Shutdown::new(grace_period);
    let handle = tokio::spawn(server.run(router_listener, shutdown.clone()));

    let in_flight = tokio::spawn(async move {
        common::client().get(format!("http://{router}/api/slow")).send().await
    });
    tokio::time::sleep(Duration::from_millis(300)).await;

    let start = std::time::Instant::now();
    shutdown.trigger();
    let finished = tokio::time::timeout(Duration::from_secs(5), handle).await;

    assert!(finished.is_ok(), "server outlived its grace period");
    assert!(start.elapsed() >= Duration::from_millis(900));
    assert!(start.elapsed() < Duration::from_secs(3));
    in_flight.abort();
}
