//! Routing engine demo server.
//!
//! Serves a `Hello` route next to the built-in `/health` and `/metrics`
//! endpoints until SIGINT or SIGTERM, then drains and exits.

use std::path::PathBuf;
use std::process::ExitCode;

use axum::{http::Method, Json};
use clap::Parser;
use serde::Serialize;

use routing_engine::config::{load_config, EngineConfig, LogFormat, ServerConfig};
use routing_engine::http::middleware::recovery::recovery;
use routing_engine::observability::init_tracing;
use routing_engine::{Route, Server};

#[derive(Debug, Parser)]
#[command(name = "routing-engine")]
#[command(about = "HTTP routing engine demo server", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen on 0.0.0.0:<port> instead of the configured address.
    #[arg(short, long)]
    port: Option<u16>,

    /// Redirect trailing-slash variants of every route.
    #[arg(long)]
    strict_slash: bool,

    /// Log output format.
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

#[derive(Serialize)]
struct Message {
    message: &'static str,
}

async fn hello() -> Json<Message> {
    Json(Message { message: "Hello" })
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("routing-engine: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => EngineConfig::default(),
    };
    apply_overrides(&mut config.server, &cli);

    if let Err(e) = init_tracing(&config.server.logging) {
        eprintln!("routing-engine: failed to initialize logging: {e}");
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.server.bind_address,
        strict_slash = config.server.strict_slash,
        "routing-engine starting"
    );

    let mut server = Server::with_config(config.server);
    server.add_route(Route::new("Hello", [Method::GET], "/hello", hello));
    if let Some(cors) = config.cors {
        server.add_cors_handler(cors);
    }
    server.add_middleware(recovery());

    let mut signals = match server.start().await {
        Ok(signals) => signals,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start server");
            return ExitCode::FAILURE;
        }
    };

    if let Some(signal) = signals.recv().await {
        tracing::info!(%signal, "Shutting down");
    }

    if let Err(e) = server.stop().await {
        tracing::error!(error = %e, "Shutdown incomplete");
    }

    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}

fn apply_overrides(server: &mut ServerConfig, cli: &Cli) {
    if let Some(port) = cli.port {
        server.bind_address = format!("0.0.0.0:{port}");
    }
    if cli.strict_slash {
        server.strict_slash = true;
    }
    if let Some(format) = cli.log_format {
        server.logging.format = format;
    }
}
