//! CORS handling.
//!
//! Two pieces live here:
//! - [`preflight`]: the caller-configured middleware that answers `OPTIONS`
//!   requests itself and stamps origin/content-type headers on the rest.
//! - [`advertise_methods`]: the always-on route layer that advertises the
//!   methods registered for a matched pattern.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{MatchedPath, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    middleware::{from_fn, Next},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::Middleware;

/// Built-in CORS configurator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpResponseConfig {
    /// Response format, sent as `Content-Type`.
    pub content_type: String,

    /// Allowed request source, sent as `Access-Control-Allow-Origin`.
    pub allow_origin: String,

    /// Methods allowed on preflight, joined with `,`.
    pub allow_methods: Vec<String>,

    /// Headers allowed on preflight, joined with `,`.
    pub allow_headers: Vec<String>,
}

/// Header values resolved once when the middleware is created.
#[derive(Debug, Default)]
struct CorsHeaders {
    always: Vec<(HeaderName, HeaderValue)>,
    preflight: Vec<(HeaderName, HeaderValue)>,
}

impl CorsHeaders {
    fn from_config(config: &HttpResponseConfig) -> Self {
        let mut headers = Self::default();

        push_header(&mut headers.always, header::CONTENT_TYPE, &config.content_type);
        push_header(
            &mut headers.always,
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            &config.allow_origin,
        );
        push_header(
            &mut headers.preflight,
            header::ACCESS_CONTROL_ALLOW_METHODS,
            &config.allow_methods.join(","),
        );
        push_header(
            &mut headers.preflight,
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            &config.allow_headers.join(","),
        );

        headers
    }

    fn apply(list: &[(HeaderName, HeaderValue)], target: &mut HeaderMap) {
        for (name, value) in list {
            target.insert(name.clone(), value.clone());
        }
    }

    fn apply_missing(list: &[(HeaderName, HeaderValue)], target: &mut HeaderMap) {
        for (name, value) in list {
            fill_missing(target, name.clone(), value.clone());
        }
    }
}

// Headers stamped around a handler act as defaults: a value the handler set
// itself is kept.
fn fill_missing(target: &mut HeaderMap, name: HeaderName, value: HeaderValue) {
    target.entry(name).or_insert(value);
}

// Empty values are left unset.
fn push_header(list: &mut Vec<(HeaderName, HeaderValue)>, name: HeaderName, value: &str) {
    if value.is_empty() {
        return;
    }
    match HeaderValue::from_str(value) {
        Ok(v) => list.push((name, v)),
        Err(_) => tracing::warn!(header = %name, value, "Skipping invalid CORS header value"),
    }
}

/// Middleware answering CORS preflight requests.
///
/// `OPTIONS` requests get a `204 No Content` carrying the allowed methods and
/// headers, and never reach the wrapped handler. Other requests get the
/// configured content type and origin unless the handler set its own.
pub fn preflight(config: HttpResponseConfig) -> Middleware {
    let headers = Arc::new(CorsHeaders::from_config(&config));

    Middleware::from_layer(
        "cors_preflight",
        from_fn(move |req: Request, next: Next| {
            let headers = Arc::clone(&headers);
            async move {
                if req.method() == Method::OPTIONS {
                    let mut response = StatusCode::NO_CONTENT.into_response();
                    CorsHeaders::apply(&headers.always, response.headers_mut());
                    CorsHeaders::apply(&headers.preflight, response.headers_mut());
                    return response;
                }

                let mut response = next.run(req).await;
                CorsHeaders::apply_missing(&headers.always, response.headers_mut());
                response
            }
        }),
    )
}

/// Comma-joined methods per pattern, for patterns that accept `OPTIONS`.
pub(crate) type AllowedMethods = Arc<HashMap<String, HeaderValue>>;

/// Build the lookup used by [`advertise_methods`].
pub(crate) fn allowed_methods<'a, I>(routes: I) -> AllowedMethods
where
    I: IntoIterator<Item = (&'a str, &'a [Method])>,
{
    let mut by_pattern: HashMap<&str, Vec<&Method>> = HashMap::new();
    for (pattern, methods) in routes {
        let entry = by_pattern.entry(pattern).or_default();
        for method in methods {
            if !entry.contains(&method) {
                entry.push(method);
            }
        }
    }

    let advertised = by_pattern
        .into_iter()
        .filter(|(_, methods)| methods.contains(&&Method::OPTIONS))
        .filter_map(|(pattern, methods)| {
            let joined = methods
                .iter()
                .map(|m| m.as_str())
                .collect::<Vec<_>>()
                .join(",");
            HeaderValue::from_str(&joined)
                .ok()
                .map(|value| (pattern.to_string(), value))
        })
        .collect();

    Arc::new(advertised)
}

/// Route layer setting `Access-Control-Allow-Methods` from the route table.
pub(crate) async fn advertise_methods(
    State(allowed): State<AllowedMethods>,
    req: Request,
    next: Next,
) -> Response {
    let advertised = req
        .extensions()
        .get::<MatchedPath>()
        .and_then(|matched| allowed.get(matched.as_str()))
        .cloned();

    let mut response = next.run(req).await;
    if let Some(value) = advertised {
        fill_missing(response.headers_mut(), header::ACCESS_CONTROL_ALLOW_METHODS, value);
    }
    response
}
