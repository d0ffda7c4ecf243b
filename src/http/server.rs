//! HTTP server setup and lifecycle.
//!
//! # Responsibilities
//! - Own the route table and middleware chain until build
//! - Compile them into one dispatch unit
//! - Bind the listener and serve on a background task
//! - Apply transport timeouts and in-flight tracking
//! - Drain in-flight requests on stop, within a bounded grace period
//!
//! # Design Decisions
//! - Every method takes `&mut self`; a running server cannot be mutated
//!   concurrently
//! - Configuration changes after build invalidate the compiled unit; the
//!   next start rebuilds it
//! - A grace period overrun is reported, the serving task is detached

use std::net::SocketAddr;
use std::time::Duration;

use axum::{body::Body, extract::Request, ServiceExt as _};
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};
use tower::ServiceBuilder;
use tower_http::timeout::{TimeoutBody, TimeoutLayer};

use crate::config::ServerConfig;
use crate::http::middleware::cors::{self, HttpResponseConfig};
use crate::http::{boxed, HttpHandler, Middleware, MiddlewareChain};
use crate::lifecycle::{signals, ServerState, Shutdown, SignalReceiver};
use crate::net::{self, ListenerError, RequestTracker};
use crate::routing::{Route, RouteTable, RouterError};

/// How long [`Server::stop`] waits for in-flight requests.
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Errors raised while building, starting or stopping a server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Router(#[from] RouterError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("server is already running")]
    AlreadyRunning,

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("serving task failed: {0}")]
    Task(#[from] JoinError),

    #[error("requests still in flight after the {0:?} grace period")]
    ShutdownTimeout(Duration),
}

/// Handles of a started server.
struct Running {
    shutdown: Shutdown,
    task: JoinHandle<std::io::Result<()>>,
    local_addr: SocketAddr,
    tracker: RequestTracker,
}

impl Drop for Running {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// An HTTP server wrapping a route table and a middleware chain.
pub struct Server {
    bind_address: String,
    read_timeout: Duration,
    write_timeout: Duration,
    strict_slash: bool,
    routes: RouteTable,
    middleware: MiddlewareChain,
    handler: Option<HttpHandler>,
    state: ServerState,
    running: Option<Running>,
}

impl Server {
    /// Create an unconfigured server with default settings.
    pub fn new() -> Self {
        Self::from_parts(ServerConfig::default(), ServerState::Unconfigured)
    }

    /// Create a server from loaded configuration.
    pub fn with_config(config: ServerConfig) -> Self {
        Self::from_parts(config, ServerState::Configured)
    }

    /// Listen on `0.0.0.0:<port>` with 15 second read and write timeouts.
    pub fn default_server(port: u16, strict_slash: bool) -> Self {
        Self::with_config(ServerConfig::for_port(port, strict_slash))
    }

    fn from_parts(config: ServerConfig, state: ServerState) -> Self {
        Self {
            read_timeout: config.read_timeout(),
            write_timeout: config.write_timeout(),
            bind_address: config.bind_address,
            strict_slash: config.strict_slash,
            routes: RouteTable::new(),
            middleware: MiddlewareChain::new(),
            handler: None,
            state,
            running: None,
        }
    }

    /// Mark the compiled unit stale after a configuration change.
    fn configured(&mut self) -> &mut Self {
        if self.state.is_configurable() {
            self.state = ServerState::Configured;
            self.handler = None;
        }
        self
    }

    pub fn bind_address(&mut self, address: impl Into<String>) -> &mut Self {
        self.bind_address = address.into();
        self.configured()
    }

    pub fn read_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.read_timeout = timeout;
        self.configured()
    }

    pub fn write_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.write_timeout = timeout;
        self.configured()
    }

    pub fn strict_slash(&mut self, strict_slash: bool) -> &mut Self {
        self.strict_slash = strict_slash;
        self.configured()
    }

    /// Register a route on the server's table.
    pub fn add_route(&mut self, route: Route) -> &mut Self {
        self.routes.push(route);
        self.configured()
    }

    /// Register a middleware. The last one registered runs first.
    pub fn add_middleware(&mut self, middleware: Middleware) -> &mut Self {
        self.middleware.push(middleware);
        self.configured()
    }

    /// Register the CORS preflight handler.
    pub fn add_cors_handler(&mut self, config: HttpResponseConfig) -> &mut Self {
        self.add_middleware(cors::preflight(config))
    }

    /// Mutable access to the route table.
    pub fn routes_mut(&mut self) -> &mut RouteTable {
        self.configured();
        &mut self.routes
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    /// The compiled dispatch unit, once built.
    pub fn handler(&self) -> Option<&HttpHandler> {
        self.handler.as_ref()
    }

    /// Address the listener is bound to while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|running| running.local_addr)
    }

    /// Requests currently being handled.
    pub fn in_flight(&self) -> u64 {
        self.running
            .as_ref()
            .map_or(0, |running| running.tracker.count())
    }

    /// Compile the route table and fold the middleware chain around it.
    ///
    /// Replaces any previously built unit.
    pub fn build(&mut self) -> Result<&mut Self, ServerError> {
        if self.running.is_some() {
            return Err(ServerError::AlreadyRunning);
        }

        self.handler = Some(self.compile_unit()?);
        self.state = ServerState::Built;
        Ok(self)
    }

    fn compile_unit(&self) -> Result<HttpHandler, ServerError> {
        let router = self.routes.compile(self.strict_slash)?;
        Ok(self.middleware.compose(boxed(router)))
    }

    fn ensure_built(&mut self) -> Result<HttpHandler, ServerError> {
        if let (ServerState::Built, Some(handler)) = (self.state, &self.handler) {
            return Ok(handler.clone());
        }

        let handler = self.compile_unit()?;
        self.handler = Some(handler.clone());
        self.state = ServerState::Built;
        Ok(handler)
    }

    /// Transport concerns around the dispatch unit.
    ///
    /// The read timeout bounds waiting on the request body, the write timeout
    /// bounds the whole handling; either one expiring answers `408`.
    #[allow(deprecated)]
    fn transport(&self, unit: HttpHandler, tracker: &RequestTracker) -> HttpHandler {
        let read_timeout = self.read_timeout;

        boxed(
            ServiceBuilder::new()
                .layer(TimeoutLayer::new(self.write_timeout))
                .map_request(move |req: Request| {
                    req.map(|body| Body::new(TimeoutBody::new(read_timeout, body)))
                })
                .service(tracker.track_handler(unit)),
        )
    }

    /// Bind and serve on a background task.
    ///
    /// Returns a receiver for the first SIGINT / SIGTERM the process gets;
    /// the caller decides when to [`stop`](Self::stop).
    pub async fn start(&mut self) -> Result<SignalReceiver, ServerError> {
        if self.running.is_some() {
            return Err(ServerError::AlreadyRunning);
        }

        tracing::info!("starting server daemon");
        let unit = self.ensure_built()?;

        let listener = net::bind(&self.bind_address).await?;
        let local_addr = listener.local_addr().map_err(ServerError::Serve)?;

        let tracker = RequestTracker::new();
        let app = self.transport(unit, &tracker);
        let shutdown = Shutdown::new();
        let graceful = shutdown.triggered();

        let task = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(graceful)
            .await
        });

        tracing::info!(
            address = %local_addr,
            read_timeout = ?self.read_timeout,
            write_timeout = ?self.write_timeout,
            strict_slash = self.strict_slash,
            "Server running"
        );

        self.running = Some(Running {
            shutdown,
            task,
            local_addr,
            tracker,
        });
        self.state = ServerState::Running;

        Ok(signals::listen())
    }

    /// Stop accepting connections and drain in-flight requests.
    ///
    /// Returns [`ServerError::ShutdownTimeout`] when requests are still
    /// running after [`SHUTDOWN_GRACE_PERIOD`]. Stopping a server that is not
    /// running is a no-op.
    pub async fn stop(&mut self) -> Result<(), ServerError> {
        tracing::info!("stopping server daemon");

        let Some(mut running) = self.running.take() else {
            return Ok(());
        };

        self.state = ServerState::Draining;
        running.shutdown.trigger();
        tracing::info!(in_flight = running.tracker.count(), "Draining in-flight requests");

        let result = match tokio::time::timeout(SHUTDOWN_GRACE_PERIOD, &mut running.task).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(e))) => Err(ServerError::Serve(e)),
            Ok(Err(e)) => Err(ServerError::Task(e)),
            Err(_) => {
                tracing::warn!(
                    in_flight = running.tracker.count(),
                    grace_period = ?SHUTDOWN_GRACE_PERIOD,
                    "Grace period elapsed, abandoning in-flight requests"
                );
                Err(ServerError::ShutdownTimeout(SHUTDOWN_GRACE_PERIOD))
            }
        };

        self.state = ServerState::Stopped;
        result
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("bind_address", &self.bind_address)
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .field("strict_slash", &self.strict_slash)
            .field("routes", &self.routes.len())
            .field("middleware", &self.middleware.len())
            .field("state", &self.state)
            .finish()
    }
}
