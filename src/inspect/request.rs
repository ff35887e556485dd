//! The request under inspection.
//!
//! # Responsibilities
//! - Hold the head of an in-flight request and its single body slot
//! - Make body ownership transfer explicit (`take_body` / `set_body`)
//! - Derive the connection metadata that ends up in the diagnostic record
//!
//! # Design Decisions
//! - "No body" is a distinct variant, never an empty buffer
//! - Metadata is computed from the request head on demand, never copied

use std::fmt;
use std::net::SocketAddr;

use axum::body::Body;
use axum::http::{header, request::Parts, HeaderMap, Method, Request, Uri, Version};

/// Body slot contents of an [`InboundRequest`].
pub enum RequestBody {
    /// No payload was sent. Distinct from a present but empty payload.
    Absent,
    /// A single-pass payload stream.
    Stream(Body),
}

impl RequestBody {
    /// Classify a body handed over by the serving layer.
    ///
    /// A body that already reports end-of-stream carries no payload, which is
    /// how HTTP/1.1 requests without `Content-Length` or `Transfer-Encoding`
    /// arrive from hyper.
    pub fn from_body(body: Body) -> Self {
        if http_body::Body::is_end_stream(&body) {
            RequestBody::Absent
        } else {
            RequestBody::Stream(body)
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, RequestBody::Absent)
    }

    /// Convert back into a body the serving layer can consume.
    pub fn into_body(self) -> Body {
        match self {
            RequestBody::Absent => Body::empty(),
            RequestBody::Stream(body) => body,
        }
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Absent => f.write_str("Absent"),
            RequestBody::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// One HTTP request in flight, as seen by the inspector.
#[derive(Debug)]
pub struct InboundRequest {
    parts: Parts,
    remote_addr: Option<SocketAddr>,
    body: Option<RequestBody>,
}

impl InboundRequest {
    /// Take over a request produced by the serving layer.
    pub fn from_http(request: Request<Body>, remote_addr: Option<SocketAddr>) -> Self {
        let (parts, body) = request.into_parts();
        Self::from_parts(parts, RequestBody::from_body(body), remote_addr)
    }

    pub fn from_parts(parts: Parts, body: RequestBody, remote_addr: Option<SocketAddr>) -> Self {
        Self {
            parts,
            remote_addr,
            body: Some(body),
        }
    }

    /// Hand the request back to the serving layer.
    ///
    /// An empty body slot is converted into an empty body.
    pub fn into_http(self) -> Request<Body> {
        let body = self.body.map(RequestBody::into_body).unwrap_or_else(Body::empty);
        Request::from_parts(self.parts, body)
    }

    /// Move the body out of the request, leaving the slot empty.
    pub fn take_body(&mut self) -> Option<RequestBody> {
        self.body.take()
    }

    /// Install a body, returning whatever occupied the slot before.
    pub fn set_body(&mut self, body: RequestBody) -> Option<RequestBody> {
        self.body.replace(body)
    }

    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn version(&self) -> Version {
        self.parts.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Full request URL as received.
    pub fn url(&self) -> String {
        self.parts.uri.to_string()
    }

    /// URL path without its leading slash.
    pub fn url_path(&self) -> &str {
        let path = self.parts.uri.path();
        path.strip_prefix('/').unwrap_or(path)
    }

    /// Request target as sent on the request line.
    pub fn request_uri(&self) -> String {
        match self.parts.uri.path_and_query() {
            Some(target) if self.parts.uri.authority().is_none() || self.parts.version >= Version::HTTP_2 => {
                target.as_str().to_string()
            }
            _ => self.parts.uri.to_string(),
        }
    }

    /// Protocol string, e.g. `HTTP/1.1`.
    pub fn protocol(&self) -> String {
        let (major, minor) = self.proto_version();
        format!("HTTP/{}.{}", major, minor)
    }

    pub fn proto_major(&self) -> u32 {
        self.proto_version().0
    }

    pub fn proto_minor(&self) -> u32 {
        self.proto_version().1
    }

    fn proto_version(&self) -> (u32, u32) {
        match self.parts.version {
            Version::HTTP_09 => (0, 9),
            Version::HTTP_10 => (1, 0),
            Version::HTTP_2 => (2, 0),
            Version::HTTP_3 => (3, 0),
            _ => (1, 1),
        }
    }

    /// Declared body length.
    ///
    /// `-1` means a body is present but its length is unknown (chunked or
    /// streamed), `0` means no body.
    pub fn content_length(&self) -> i64 {
        let declared = self
            .parts
            .headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok());

        match (declared, &self.body) {
            (Some(len), _) if !self.is_chunked() => len,
            (_, Some(RequestBody::Absent)) => 0,
            _ => -1,
        }
    }

    /// Transfer codings in the order they were applied.
    pub fn transfer_encoding(&self) -> Vec<String> {
        self.parts
            .headers
            .get_all(header::TRANSFER_ENCODING)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .map(|coding| coding.trim().to_ascii_lowercase())
            .filter(|coding| !coding.is_empty())
            .collect()
    }

    /// Whether the body uses chunked transfer framing.
    pub fn is_chunked(&self) -> bool {
        self.transfer_encoding()
            .first()
            .is_some_and(|coding| coding == "chunked")
    }

    /// Whether the connection closes after this request.
    pub fn close(&self) -> bool {
        let has_token = |token: &str| {
            self.parts
                .headers
                .get_all(header::CONNECTION)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .flat_map(|v| v.split(','))
                .any(|t| t.trim().eq_ignore_ascii_case(token))
        };

        match self.parts.version {
            Version::HTTP_09 | Version::HTTP_10 => !has_token("keep-alive"),
            Version::HTTP_11 => has_token("close"),
            _ => false,
        }
    }

    pub fn host(&self) -> String {
        if let Some(authority) = self.parts.uri.authority() {
            return authority.to_string();
        }
        self.parts
            .headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    /// Peer address of the connection, empty when unknown.
    pub fn remote_addr(&self) -> String {
        self.remote_addr.map(|addr| addr.to_string()).unwrap_or_default()
    }
}
