//! Request inspector server.
//!
//! Serves an echo endpoint behind the inspection middleware: every request is
//! dumped and/or logged, then answered with the body the handler received.
//!
//! ```text
//!     Client Request
//!     ──────────────▶ request id ─▶ trace ─▶ timeout ─▶ inspect ─▶ echo handler
//!                                                          │
//!                                       ┌──────────────────┴──────────────┐
//!                                       ▼                                 ▼
//!                                 raw dump (stdout)            DiagnosticRecord (sink)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use request_inspector::config::{load_config, watcher, InspectorConfig};
use request_inspector::http::server::shutdown_signal;
use request_inspector::inspect::{build_sink, ConfigToggles, Inspector};
use request_inspector::observability::logging;
use request_inspector::HttpServer;

#[derive(Parser)]
#[command(name = "request-inspector")]
#[command(about = "Capture inbound HTTP requests for diagnostics", long_about = None)]
struct Cli {
    /// TOML configuration file, watched for toggle changes.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => InspectorConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability);

    tracing::info!("request-inspector v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        raw_dump = config.inspection.raw_dump,
        structured_log = config.inspection.structured_log,
        sink = ?config.inspection.sink,
        "Configuration loaded"
    );

    let toggles = Arc::new(ConfigToggles::new(config.inspection.clone()));
    let inspector = Inspector::new(build_sink(config.inspection.sink), toggles.clone());

    // Hot reload of inspection toggles
    let _watcher = match &cli.config {
        Some(path) => Some(watcher::watch(path, toggles)?),
        None => None,
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    let server = HttpServer::new(config, inspector);
    server.run(listener, shutdown_signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
