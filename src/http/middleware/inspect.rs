//! Inspection middleware.
//! Captures every request before it reaches the handler.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::http::request::request_id;
use crate::inspect::{InboundRequest, Inspector};

/// Run the inspector, then forward the request with its body restored.
///
/// Inspection failures are logged and never fail the request.
pub async fn inspect_middleware(
    State(inspector): State<Inspector>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let id = request_id(request.headers()).to_string();

    let mut inbound = InboundRequest::from_http(request, remote_addr);
    if let Err(e) = inspector.inspect(&mut inbound).await {
        tracing::warn!(request_id = %id, error = %e, "Request inspection failed");
    }

    next.run(inbound.into_http()).await
}
