//! Crash recovery.
//!
//! Turns a panic anywhere below this layer into a `500` with the standard
//! error body. The faulting request fails; the serving loop keeps going.
//! Register it last so every other layer runs inside it.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::{from_fn, Next},
    response::{IntoResponse, Response},
};
use futures_util::FutureExt;

use super::Middleware;
use crate::http::ErrorResponse;

/// Cause reported to clients when a handler crashed.
pub const RECOVERY_CAUSE: &str = "oops, something went wrong. we're looking into it";

/// Middleware converting handler panics into `500` responses.
pub fn recovery() -> Middleware {
    Middleware::from_layer("recovery", from_fn(recover))
}

async fn recover(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();

    match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            tracing::error!(
                %method,
                %uri,
                panic = %panic_message(panic.as_ref()),
                "Handler crashed, request recovered"
            );
            ErrorResponse::new(StatusCode::INTERNAL_SERVER_ERROR, RECOVERY_CAUSE).into_response()
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{boxed, MiddlewareChain};
    use axum::body::Body;
    use std::convert::Infallible;
    use tower::{service_fn, ServiceExt};

    #[tokio::test]
    async fn test_panic_becomes_500() {
        let crashing = boxed(service_fn(|_req: Request| async move {
            if true {
                panic!("fake application crash");
            }
            Ok::<_, Infallible>(StatusCode::OK.into_response())
        }));

        let response = recovery()
            .apply(crashing)
            .oneshot(Request::builder().uri("/crash").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["code"], 500);
        assert_eq!(value["cause"], RECOVERY_CAUSE);
        assert!(value.get("debug").is_none());
    }

    #[tokio::test]
    async fn test_recovery_covers_earlier_middleware() {
        let mut chain = MiddlewareChain::new();
        chain.push(Middleware::from_layer(
            "exploding",
            from_fn(|_req: Request, _next: Next| async move {
                if true {
                    panic!("middleware crash");
                }
                StatusCode::OK.into_response()
            }),
        ));
        chain.push(recovery());

        let inner = boxed(service_fn(|_req: Request| async move {
            Ok::<_, Infallible>(StatusCode::OK.into_response())
        }));
        let response = chain
            .compose(inner)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_healthy_requests_untouched() {
        let inner = boxed(service_fn(|_req: Request| async move {
            Ok::<_, Infallible>((StatusCode::CREATED, "made").into_response())
        }));

        let response = recovery()
            .apply(inner)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
