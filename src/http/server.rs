//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the echo handler
//! - Wire up middleware (request ID, tracing, timeout, inspection)
//! - Bind server to listener
//! - Graceful shutdown

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Bytes,
    http::{header, HeaderValue, Method, StatusCode, Uri},
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::InspectorConfig;
use crate::http::middleware::inspect_middleware;
use crate::http::request::X_REQUEST_ID;
use crate::inspect::Inspector;

/// HTTP server fronting the inspector.
pub struct HttpServer {
    router: Router,
    config: InspectorConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and inspector.
    pub fn new(config: InspectorConfig, inspector: Inspector) -> Self {
        let router = Self::build_router(&config, inspector);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &InspectorConfig, inspector: Inspector) -> Router {
        let x_request_id = header::HeaderName::from_static(X_REQUEST_ID);

        Router::new()
            .route("/{*path}", any(echo_handler))
            .route("/", any(echo_handler))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(x_request_id))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
                    .layer(middleware::from_fn_with_state(inspector, inspect_middleware)),
            )
    }

    /// The router, for serving it on a custom transport.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` completes.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            request_timeout_secs = self.config.timeouts.request_secs,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }
}

/// Echoes the body it receives, proving the body survived inspection.
async fn echo_handler(method: Method, uri: Uri, body: Bytes) -> Response {
    tracing::debug!(method = %method, path = %uri.path(), body_len = body.len(), "Echoing request body");

    let mut response = (StatusCode::OK, body).into_response();
    if let Ok(value) = HeaderValue::from_str(method.as_str()) {
        response.headers_mut().insert("x-echo-method", value);
    }
    response
}

/// Wait for shutdown signal (Ctrl+C).
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
