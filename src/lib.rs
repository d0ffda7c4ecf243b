//! HTTP routing engine.
//!
//! A route table, a request multiplexer built on axum, a middleware
//! composition mechanism and a server wrapper with graceful shutdown.
//!
//! ```text
//!     Client Request
//!     ──▶ net::listener ──▶ transport timeouts ──▶ middleware chain
//!                                                     │
//!                                                     ▼
//!                                           routing (compiled table)
//!                                                     │
//!                       404 / 405 / 403 ◀─────────────┼─────────────▶ route handler
//! ```

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::schema::EngineConfig;
pub use http::middleware::cors::HttpResponseConfig;
pub use http::server::{ServerError, SHUTDOWN_GRACE_PERIOD};
pub use http::{ErrorResponse, HttpHandler, Middleware, MiddlewareChain, Server};
pub use lifecycle::{Signal, SignalReceiver};
pub use routing::{Route, RouteTable, RouterError};
