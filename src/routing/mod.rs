//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route registration (any time before build):
//!     Route { name, methods, pattern, deprecated, handler }
//!     → route.rs (RouteTable, ordered)
//!
//! Route Compilation (at build):
//!     RouteTable
//!     → matcher.rs (pattern checks, collision shapes)
//!     → router.rs (fallbacks, access log, /metrics, route layers)
//!     → Freeze as immutable axum::Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at build, immutable afterwards
//! - Table order is match order for ambiguous patterns
//! - Collisions are rejected at compile instead of surfacing as matcher panics

pub mod matcher;
pub mod route;
pub mod router;

use axum::http::Method;
use thiserror::Error;

pub use matcher::PatternIssue;
pub use route::{Route, RouteTable};
pub use router::{compile, METRICS_PATH};

/// Configuration errors found while compiling a route table.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("route {name}: no methods given")]
    NoMethods { name: String },

    #[error("route {name}: method {method} is not supported")]
    UnsupportedMethod { name: String, method: Method },

    #[error("route {name}: pattern {pattern:?} {issue}")]
    MalformedPattern {
        name: String,
        pattern: String,
        issue: PatternIssue,
    },

    #[error("route name {0:?} registered more than once")]
    DuplicateName(String),

    #[error("route {name}: {method} {pattern} collides with route {existing}")]
    Conflict {
        name: String,
        existing: String,
        method: Method,
        pattern: String,
    },

    #[error("route {name}: pattern {pattern:?} is ambiguous with {existing_pattern:?} of route {existing}")]
    AmbiguousPattern {
        name: String,
        pattern: String,
        existing: String,
        existing_pattern: String,
    },
}
