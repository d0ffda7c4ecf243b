//! HTTP edge subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (listener, timeouts, graceful shutdown)
//!     → middleware/ (caller transforms, last registered runs first)
//!     → routing engine (compiled axum Router)
//!     → route handler, or error.rs default responders
//!     → Send to client
//! ```

pub mod error;
pub mod middleware;
pub mod server;

use std::convert::Infallible;

use axum::{extract::Request, response::Response};
use tower::{util::BoxCloneSyncService, Service};

pub use error::ErrorResponse;
pub use middleware::{Middleware, MiddlewareChain};
pub use server::Server;

/// A type-erased request handler.
///
/// Routes, the compiled router and every middleware layer share this shape,
/// so transforms compose without knowing what they wrap.
pub type HttpHandler = BoxCloneSyncService<Request, Response, Infallible>;

/// Erase a service into an [`HttpHandler`].
pub fn boxed<S>(service: S) -> HttpHandler
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + Sync + 'static,
    S::Future: Send + 'static,
{
    BoxCloneSyncService::new(service)
}
