//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Server states (state.rs):
//!     Unconfigured → Configured → Built → Running → Draining → Stopped
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT/Ctrl-C → SignalReceiver handed back by Server::start
//!
//! Shutdown (shutdown.rs):
//!     Server::stop → trigger → stop accepting → drain in-flight → exit
//! ```
//!
//! # Design Decisions
//! - Signals are reported to the caller, which decides when to stop
//! - Shutdown has a bounded grace period; the serving task is then detached

pub mod shutdown;
pub mod signals;
pub mod state;

pub use shutdown::Shutdown;
pub use signals::{Signal, SignalReceiver};
pub use state::ServerState;
