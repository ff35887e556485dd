//! Header flattening.

use axum::http::HeaderMap;
use serde::Serialize;

use crate::inspect::error::InspectError;

/// One header value, labeled by its position in the flattened list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderEntry {
    /// 1-based label. Only disambiguates repeated names.
    pub index: usize,
    pub name: String,
    pub value: String,
}

impl HeaderEntry {
    /// Record field name, e.g. `Header(3)`.
    pub fn label(&self) -> String {
        format!("Header({})", self.index)
    }

    /// Record field value, e.g. `accept: */*`.
    pub fn line(&self) -> String {
        format!("{}: {}", self.name, self.value)
    }
}

/// Result of flattening a header map.
#[derive(Debug, Default)]
pub struct CollectedHeaders {
    pub entries: Vec<HeaderEntry>,
    /// One per value that had to be rendered lossily.
    pub warnings: Vec<InspectError>,
}

/// Flatten a header map into labeled entries.
///
/// Values of one name keep their order. A value that is not valid UTF-8 is
/// kept with its invalid bytes replaced, and reported in `warnings`.
pub fn collect(headers: &HeaderMap) -> CollectedHeaders {
    let mut collected = CollectedHeaders {
        entries: Vec::with_capacity(headers.len()),
        warnings: Vec::new(),
    };

    for name in headers.keys() {
        for value in headers.get_all(name) {
            let bytes = value.as_bytes();
            if std::str::from_utf8(bytes).is_err() {
                collected.warnings.push(InspectError::Header {
                    name: name.to_string(),
                });
            }
            collected.entries.push(HeaderEntry {
                index: collected.entries.len() + 1,
                name: name.to_string(),
                value: String::from_utf8_lossy(bytes).into_owned(),
            });
        }
    }

    collected
}
