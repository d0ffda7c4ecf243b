//! Shared utilities for integration tests.

use std::time::Duration;

use axum::{http::Method, Json};
use routing_engine::{Route, Server};
use serde_json::{json, Value};

pub async fn hello() -> Json<Value> {
    Json(json!({ "message": "Hello" }))
}

/// A server on an ephemeral loopback port with the `Hello` route.
pub fn hello_server() -> Server {
    let mut server = Server::new();
    server
        .bind_address("127.0.0.1:0")
        .add_route(Route::new("Hello", [Method::GET], "/hello", hello));
    server
}

/// Start `server` and return its base URL.
pub async fn start(server: &mut Server) -> String {
    let _signals = server.start().await.unwrap();
    let addr = server.local_addr().unwrap();
    format!("http://{addr}")
}

/// Client without connection pooling or redirects, so every request is
/// observed exactly as the server answered it.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

/// Poll `condition` until it holds or a second has passed.
#[allow(dead_code)]
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "condition not met in time");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
