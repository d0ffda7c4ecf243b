//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every request on a registered route:
//!     → logging.rs (access log event, after the handler)
//!     → metrics.rs (request counter, response time histogram)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → GET /metrics (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Metrics are cheap (atomic increments)
//! - The Prometheus recorder is installed lazily, once per process

pub mod logging;
pub mod metrics;

pub use self::logging::{access_log, init_tracing};
pub use self::metrics::{init_metrics, metrics_handler, track_metrics};
