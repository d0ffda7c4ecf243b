//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Emit one access log event per handled request
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` wins over the configured level

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request},
    http::{header, HeaderMap},
};
use tower::{service_fn, ServiceExt};
use tracing_subscriber::{
    layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter,
};

use crate::config::{LogFormat, LoggingConfig};
use crate::http::{boxed, HttpHandler};

/// Install the global subscriber.
///
/// Fails if a global subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    }
}

/// Wrap `inner` so each request it serves is logged once it completes.
pub fn access_log(name: impl Into<Arc<str>>, inner: HttpHandler) -> HttpHandler {
    let name: Arc<str> = name.into();

    boxed(service_fn(move |req: Request| {
        let name = Arc::clone(&name);
        let inner = inner.clone();
        async move {
            let ip = client_ip(&req);
            let method = req.method().clone();
            let uri = req.uri().clone();
            let user_agent = req
                .headers()
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();

            let start = Instant::now();
            let response = inner.oneshot(req).await?;
            let latency = start.elapsed();

            tracing::info!(
                client_ip = %ip,
                %method,
                %uri,
                route = %name,
                latency_us = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX),
                %user_agent,
                status = response.status().as_u16(),
                "{} {} {} {} {:?} {}",
                ip,
                method,
                uri,
                name,
                latency,
                user_agent
            );

            Ok(response)
        }
    }))
}

/// Best-effort client address: proxy headers first, then the peer.
fn client_ip(req: &Request) -> String {
    if let Some(ip) = forwarded_ip(req.headers()) {
        return ip;
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default()
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = real_ip {
        return Some(ip.to_string());
    }

    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, response::IntoResponse};
    use std::convert::Infallible;

    fn request() -> axum::http::request::Builder {
        Request::builder().uri("/hello?x=1")
    }

    #[test]
    fn test_client_ip_prefers_real_ip() {
        let req = request()
            .header("x-real-ip", "10.0.0.1")
            .header("x-forwarded-for", "10.0.0.2, 10.0.0.3")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&req), "10.0.0.1");
    }

    #[test]
    fn test_client_ip_first_forwarded_entry() {
        let req = request()
            .header("x-forwarded-for", "10.0.0.2, 10.0.0.3")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&req), "10.0.0.2");
    }

    #[test]
    fn test_client_ip_from_peer() {
        let mut req = request().body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 7], 4242))));
        assert_eq!(client_ip(&req), "192.168.1.7");
    }

    #[test]
    fn test_client_ip_unknown() {
        let req = request().body(Body::empty()).unwrap();
        assert_eq!(client_ip(&req), "");
    }

    #[tokio::test]
    async fn test_access_log_passes_response_through() {
        let inner = boxed(service_fn(|_req: Request| async move {
            Ok::<_, Infallible>((StatusCode::ACCEPTED, "queued").into_response())
        }));

        let response = access_log("Queue", inner)
            .oneshot(request().body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
