//! Built-in liveness probe.
//!
//! Every [`RouteTable::new`](crate::routing::RouteTable::new) starts with a
//! `Health` route on `GET /health` answering `{"status":"ok"}` while the
//! server accepts requests.

use axum::{http::Method, Json};
use serde::Serialize;

use crate::routing::Route;

pub const HEALTH_ROUTE: &str = "Health";
pub const HEALTH_PATH: &str = "/health";

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
}

pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus { status: "ok" })
}

/// The `Health` route.
pub fn route() -> Route {
    Route::new(HEALTH_ROUTE, [Method::GET], HEALTH_PATH, health)
}
