//! The structured diagnostic record.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::inspect::headers::HeaderEntry;
use crate::inspect::request::InboundRequest;

/// Structured capture of one request.
///
/// Serializes to a flat map keyed by the log field names (`HTTPMethod`,
/// `Header(1)`, `Body`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
    pub http_method: String,
    pub url_path: String,
    pub url: String,
    pub protocol: String,
    pub proto_major: u32,
    pub proto_minor: u32,
    pub content_length: i64,
    pub transfer_encoding: String,
    pub close: bool,
    pub host: String,
    pub remote_addr: String,
    pub request_uri: String,
    /// `None` when header collection failed.
    pub headers: Option<Vec<HeaderEntry>>,
    /// Reencoded body as text. `None` when body capture failed.
    pub body: Option<String>,
    /// Sub-steps that failed while building the record.
    pub capture_warnings: Vec<String>,
}

impl DiagnosticRecord {
    /// Metadata-only record; headers and body are attached afterwards.
    pub fn from_request(request: &InboundRequest) -> Self {
        Self {
            http_method: request.method().to_string(),
            url_path: request.url_path().to_string(),
            url: request.url(),
            protocol: request.protocol(),
            proto_major: request.proto_major(),
            proto_minor: request.proto_minor(),
            content_length: request.content_length(),
            transfer_encoding: request.transfer_encoding().join(","),
            close: request.close(),
            host: request.host(),
            remote_addr: request.remote_addr(),
            request_uri: request.request_uri(),
            headers: None,
            body: None,
            capture_warnings: Vec::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.capture_warnings.is_empty()
    }

    /// Header entries rendered as `name: value` lines.
    pub fn header_lines(&self) -> Vec<String> {
        self.headers
            .iter()
            .flatten()
            .map(HeaderEntry::line)
            .collect()
    }
}

impl Serialize for DiagnosticRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("HTTPMethod", &self.http_method)?;
        map.serialize_entry("URLPath", &self.url_path)?;
        map.serialize_entry("URL", &self.url)?;
        map.serialize_entry("Protocol", &self.protocol)?;
        map.serialize_entry("ProtoMajor", &self.proto_major)?;
        map.serialize_entry("ProtoMinor", &self.proto_minor)?;
        map.serialize_entry("ContentLength", &self.content_length)?;
        map.serialize_entry("Transfer-Encoding", &self.transfer_encoding)?;
        map.serialize_entry("Close", &self.close)?;
        map.serialize_entry("Host", &self.host)?;
        map.serialize_entry("RemoteAddr", &self.remote_addr)?;
        map.serialize_entry("RequestURI", &self.request_uri)?;
        for entry in self.headers.iter().flatten() {
            map.serialize_entry(&entry.label(), &entry.line())?;
        }
        if let Some(body) = &self.body {
            map.serialize_entry("Body", body)?;
        }
        if !self.capture_warnings.is_empty() {
            map.serialize_entry("CaptureWarnings", &self.capture_warnings)?;
        }
        map.end()
    }
}
