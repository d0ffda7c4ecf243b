//! End-to-end tests driving a real server over the loopback interface.

use std::time::{Duration, Instant};

use axum::http::Method;
use routing_engine::http::middleware::recovery::recovery;
use routing_engine::{HttpResponseConfig, Route, ServerError, SHUTDOWN_GRACE_PERIOD};
use serde_json::{json, Value};

mod common;

async fn crash() -> &'static str {
    panic!("fake application crash")
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_millis(300)).await;
    "done"
}

async fn stuck() -> &'static str {
    tokio::time::sleep(Duration::from_secs(30)).await;
    "too late"
}

#[tokio::test]
async fn test_hello_scenario_over_network() {
    let mut server = common::hello_server();
    let base = common::start(&mut server).await;
    let client = common::client();

    let ok = client.get(format!("{base}/hello")).send().await.unwrap();
    assert_eq!(ok.status(), 200);
    assert_eq!(ok.json::<Value>().await.unwrap(), json!({ "message": "Hello" }));

    let not_allowed = client.post(format!("{base}/hello")).send().await.unwrap();
    assert_eq!(not_allowed.status(), 405);
    assert_eq!(
        not_allowed.json::<Value>().await.unwrap(),
        json!({ "code": 405, "cause": "method not allowed" })
    );

    let missing = client.get(format!("{base}/missing")).send().await.unwrap();
    assert_eq!(missing.status(), 404);
    assert_eq!(
        missing.json::<Value>().await.unwrap(),
        json!({ "code": 404, "cause": "resource not found" })
    );

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_health_and_metrics_endpoints() {
    let mut server = common::hello_server();
    let base = common::start(&mut server).await;
    let client = common::client();

    let health = client.get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(health.status(), 200);
    assert_eq!(health.json::<Value>().await.unwrap(), json!({ "status": "ok" }));

    let metrics = client.get(format!("{base}/metrics")).send().await.unwrap();
    assert_eq!(metrics.status(), 200);
    let text = metrics.text().await.unwrap();
    assert!(text.contains(r#"http_requests_total{path="/health"}"#));

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_recovery_keeps_server_serving() {
    let mut server = common::hello_server();
    server
        .add_route(Route::new("Crash", [Method::GET], "/crash", crash))
        .add_middleware(recovery());
    let base = common::start(&mut server).await;
    let client = common::client();

    let crashed = client.get(format!("{base}/crash")).send().await.unwrap();
    assert_eq!(crashed.status(), 500);
    assert_eq!(
        crashed.json::<Value>().await.unwrap(),
        json!({ "code": 500, "cause": "oops, something went wrong. we're looking into it" })
    );

    let after = client.get(format!("{base}/hello")).send().await.unwrap();
    assert_eq!(after.status(), 200);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_cors_preflight_over_network() {
    let mut server = common::hello_server();
    server.add_cors_handler(HttpResponseConfig {
        content_type: "application/json".into(),
        allow_origin: "*".into(),
        allow_methods: vec!["POST".into(), "GET".into(), "OPTIONS".into()],
        allow_headers: vec!["Accept".into(), "Content-Type".into()],
    });
    let base = common::start(&mut server).await;
    let client = common::client();

    let preflight = client
        .request(reqwest::Method::OPTIONS, format!("{base}/hello"))
        .send()
        .await
        .unwrap();
    assert_eq!(preflight.status(), 204);
    let headers = preflight.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-methods"], "POST,GET,OPTIONS");
    assert_eq!(headers["access-control-allow-headers"], "Accept,Content-Type");

    let get = client.get(format!("{base}/hello")).send().await.unwrap();
    assert_eq!(get.status(), 200);
    assert_eq!(get.headers()["access-control-allow-origin"], "*");

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_strict_slash_redirect_over_network() {
    let mut server = common::hello_server();
    server.strict_slash(true);
    let base = common::start(&mut server).await;

    let redirect = common::client()
        .get(format!("{base}/hello/"))
        .send()
        .await
        .unwrap();
    assert_eq!(redirect.status(), 301);
    assert_eq!(redirect.headers()["location"], "/hello");

    let followed = reqwest::get(format!("{base}/hello/")).await.unwrap();
    assert_eq!(followed.status(), 200);
    assert_eq!(
        followed.json::<Value>().await.unwrap(),
        json!({ "message": "Hello" })
    );

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_is_fast_when_idle() {
    let mut server = common::hello_server();
    let base = common::start(&mut server).await;
    common::client()
        .get(format!("{base}/hello"))
        .send()
        .await
        .unwrap();

    let started = Instant::now();
    server.stop().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));

    let refused = common::client().get(format!("{base}/hello")).send().await;
    assert!(refused.is_err());
}

#[tokio::test]
async fn test_stop_drains_in_flight_requests() {
    let mut server = common::hello_server();
    server.add_route(Route::new("Slow", [Method::GET], "/slow", slow));
    let base = common::start(&mut server).await;

    let pending = tokio::spawn(common::client().get(format!("{base}/slow")).send());
    common::wait_until(|| server.in_flight() == 1).await;

    server.stop().await.unwrap();

    let response = pending.await.unwrap().unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "done");
}

#[tokio::test]
async fn test_stop_reports_grace_period_overrun() {
    let mut server = common::hello_server();
    server
        .write_timeout(Duration::from_secs(60))
        .add_route(Route::new("Stuck", [Method::GET], "/stuck", stuck));
    let base = common::start(&mut server).await;

    let _pending = tokio::spawn(common::client().get(format!("{base}/stuck")).send());
    common::wait_until(|| server.in_flight() == 1).await;

    let started = Instant::now();
    let result = server.stop().await;
    assert!(matches!(result, Err(ServerError::ShutdownTimeout(_))));
    assert!(started.elapsed() >= SHUTDOWN_GRACE_PERIOD);
}

#[tokio::test]
async fn test_stop_without_start_is_ok() {
    let mut server = common::hello_server();
    server.stop().await.unwrap();
}
