//! Server state machine.
//!
//! # State Transitions
//! ```text
//! Unconfigured → Configured: setters, add_route, add_middleware
//! Configured   → Built:      build()
//! Built        → Configured: any further configuration
//! Built        → Running:    start()
//! Running      → Draining:   stop()
//! Draining     → Stopped:    in-flight requests drained or grace period over
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerState {
    #[default]
    Unconfigured,
    Configured,
    Built,
    Running,
    Draining,
    Stopped,
}

impl ServerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerState::Unconfigured => "unconfigured",
            ServerState::Configured => "configured",
            ServerState::Built => "built",
            ServerState::Running => "running",
            ServerState::Draining => "draining",
            ServerState::Stopped => "stopped",
        }
    }

    /// Whether configuration may still change.
    pub fn is_configurable(&self) -> bool {
        matches!(
            self,
            ServerState::Unconfigured | ServerState::Configured | ServerState::Built | ServerState::Stopped
        )
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
