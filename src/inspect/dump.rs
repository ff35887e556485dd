//! Raw wire dump of a request.
//!
//! ```text
//! POST /upload HTTP/1.1\r\n
//! Host: example.com\r\n
//! Transfer-Encoding: chunked\r\n
//! content-type: text/plain\r\n
//! \r\n
//! 5\r\nhello\r\n0\r\n\r\n
//! ```

use axum::http::header;

use crate::inspect::error::InspectError;
use crate::inspect::reencode::reencode;
use crate::inspect::request::InboundRequest;

/// Render the request line, headers and body in wire format.
///
/// The body is read through its own duplicate and restored on the request.
pub async fn dump_request(request: &mut InboundRequest) -> Result<Vec<u8>, InspectError> {
    let body = reencode(request).await.map_err(InspectError::dump)?;

    let mut out = render_head(request);
    out.extend_from_slice(&body);
    Ok(out)
}

fn render_head(request: &InboundRequest) -> Vec<u8> {
    let mut head = String::new();
    head.push_str(&format!(
        "{} {} {}\r\n",
        request.method(),
        request.request_uri(),
        request.protocol()
    ));

    let host = request.host();
    if !host.is_empty() {
        head.push_str(&format!("Host: {}\r\n", host));
    }

    let codings = request.transfer_encoding();
    if !codings.is_empty() {
        head.push_str(&format!("Transfer-Encoding: {}\r\n", codings.join(",")));
    }

    let headers = request.headers();
    if request.close() && !headers.contains_key(header::CONNECTION) {
        head.push_str("Connection: close\r\n");
    }

    let mut names: Vec<_> = headers
        .keys()
        .filter(|name| {
            **name != header::HOST && **name != header::TRANSFER_ENCODING && **name != header::TRAILER
        })
        .collect();
    names.sort_by(|a, b| a.as_str().cmp(b.as_str()));

    let mut out = head.into_bytes();
    for name in names {
        for value in headers.get_all(name) {
            out.extend_from_slice(name.as_str().as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
    }
    out.extend_from_slice(b"\r\n");
    out
}
