//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind, local address)
//!     → axum::serve (HTTP/1.1, connection tasks)
//!     → connection.rs (in-flight request tracking)
//!     → Hand off to the compiled router
//! ```
//!
//! # Design Decisions
//! - Every request is tracked so stop() can report what is still draining
//! - Binding is separate from serving so port 0 can be resolved first

pub mod connection;
pub mod listener;

pub use connection::{RequestGuard, RequestTracker};
pub use listener::{bind, ListenerError};
