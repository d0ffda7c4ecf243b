//! Middleware composition.
//!
//! A [`Middleware`] is a named handler transform. The server keeps them in a
//! [`MiddlewareChain`] and folds the chain around the compiled router in
//! registration order, so the last registered transform ends up outermost:
//!
//! ```text
//! register: m1, m2, m3
//! request  → m3 → m2 → m1 → router
//! response ← m3 ← m2 ← m1 ← router
//! ```
//!
//! Crash recovery therefore has to be registered last.

pub mod cors;
pub mod recovery;

use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

use axum::{extract::Request, response::Response};
use tower::{Layer, Service};

use crate::http::{boxed, HttpHandler};

type Transform = dyn Fn(HttpHandler) -> HttpHandler + Send + Sync;

/// A named handler transform.
#[derive(Clone)]
pub struct Middleware {
    name: String,
    transform: Arc<Transform>,
}

impl Middleware {
    /// Create a middleware from a plain handler transform.
    pub fn new<F>(name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(HttpHandler) -> HttpHandler + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            transform: Arc::new(transform),
        }
    }

    /// Create a middleware from a tower layer.
    ///
    /// Works with `axum::middleware::from_fn` as well as any layer whose
    /// service still answers with an infallible [`Response`].
    pub fn from_layer<L>(name: impl Into<String>, layer: L) -> Self
    where
        L: Layer<HttpHandler> + Send + Sync + 'static,
        L::Service: Service<Request, Response = Response, Error = Infallible>
            + Clone
            + Send
            + Sync
            + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        Self::new(name, move |inner| boxed(layer.layer(inner)))
    }

    /// Name used in registration logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wrap `inner` with this transform.
    pub fn apply(&self, inner: HttpHandler) -> HttpHandler {
        (self.transform)(inner)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware").field("name", &self.name).finish()
    }
}

/// Ordered list of middleware accumulated on a server.
#[derive(Debug, Clone, Default)]
pub struct MiddlewareChain {
    layers: Vec<Middleware>,
}

impl MiddlewareChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware. It will wrap everything registered before it.
    pub fn push(&mut self, middleware: Middleware) {
        tracing::info!(middleware = %middleware.name(), "add middleware {:?}", middleware.name());
        self.layers.push(middleware);
    }

    /// Fold the chain around `inner`, first registered innermost.
    pub fn compose(&self, inner: HttpHandler) -> HttpHandler {
        self.layers
            .iter()
            .fold(inner, |current, middleware| middleware.apply(current))
    }

    /// Names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(Middleware::name)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
