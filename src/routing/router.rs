//! Route table compilation.
//!
//! # Responsibilities
//! - Turn a validated [`RouteTable`] into an immutable `axum::Router`
//! - Install the structured 404 / 405 / 403 responders
//! - Attach the always-on route layers (metrics, CORS method advertising)
//!
//! # Design Decisions
//! - Registration order is table order; the setup log mirrors it
//! - Deprecated routes stay registered so they answer 403 instead of 405
//! - The 405 fallback is set last because axum applies it only to the
//!   paths registered at that point

use std::collections::HashSet;

use axum::{
    handler::Handler,
    http::{header, StatusCode, Uri},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{get, on, on_service},
    Router,
};

use super::{matcher, RouteTable, RouterError};
use crate::http::{boxed, error, middleware::cors};
use crate::observability::{access_log, init_metrics, metrics_handler, track_metrics};

/// Path of the Prometheus scrape endpoint.
pub const METRICS_PATH: &str = "/metrics";

/// Compile `routes` into a dispatchable router.
///
/// With `strict_slash`, the trailing-slash variant of every pattern redirects
/// to the registered form; without it the variant is simply not found.
pub fn compile(routes: &RouteTable, strict_slash: bool) -> Result<Router, RouterError> {
    init_metrics();
    routes.validate()?;

    tracing::info!("add global handler 404 - not found");
    let mut router = Router::new().fallback(error::not_found);
    tracing::info!("add global handler 405 - method not allowed");

    let registered: HashSet<String> = routes
        .iter()
        .map(|route| matcher::shape(&route.pattern))
        .chain([METRICS_PATH.to_string()])
        .collect();

    for route in routes {
        let filter = route.method_filter()?;
        let methods = route.methods_display();

        let handler = if route.deprecated {
            tracing::warn!(
                "ignore mapping: {} ( {} {} ) deprecated",
                route.name,
                methods,
                route.pattern
            );
            boxed(error::deprecated.with_state(()))
        } else {
            access_log(route.name.as_str(), route.handler().clone())
        };

        router = router.route(&route.pattern, on_service(filter, handler));
        tracing::info!("add mapping: {} ( {} {} )", route.name, methods, route.pattern);

        if !strict_slash {
            continue;
        }
        if let Some(twin) = matcher::slash_twin(&route.pattern) {
            if !registered.contains(&matcher::shape(&twin)) {
                tracing::debug!(route = %route.name, twin = %twin, "Redirecting trailing-slash variant");
                router = router.route(&twin, on(filter, redirect_to_canonical));
            }
        }
    }

    let allowed = cors::allowed_methods(
        routes
            .iter()
            .map(|route| (route.pattern.as_str(), route.methods.as_slice())),
    );

    let router = router
        .route(METRICS_PATH, get(metrics_handler))
        .route_layer(from_fn(track_metrics))
        .route_layer(from_fn_with_state(allowed, cors::advertise_methods))
        .method_not_allowed_fallback(error::method_not_allowed);

    Ok(router)
}

/// Answer a trailing-slash variant with a permanent redirect.
async fn redirect_to_canonical(uri: Uri) -> Response {
    let mut location = matcher::toggle_trailing_slash(uri.path());
    if let Some(query) = uri.query() {
        location.push('?');
        location.push_str(query);
    }

    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
}
