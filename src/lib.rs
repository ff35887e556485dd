//! HTTP request inspection.
//!
//! Captures each inbound request (method, URL, protocol, headers, body,
//! connection metadata) for diagnostics without disturbing the request for
//! the rest of the pipeline. The body is a single-pass stream, so it is
//! buffered once, reencoded in its wire framing for the log, and handed back
//! to the request as a fresh, unread stream.

// Core subsystem
pub mod inspect;

// Serving layer
pub mod config;
pub mod http;

// Cross-cutting concerns
pub mod observability;

pub use config::InspectorConfig;
pub use http::HttpServer;
pub use inspect::{DiagnosticRecord, DiagnosticSink, InboundRequest, InspectError, Inspector};
