//! Body reencoding.
//!
//! Rebuilds the bytes a client-side capture of the body would show: chunked
//! framing when the request declared `Transfer-Encoding: chunked`, the raw
//! payload otherwise.
//!
//! ```text
//! identity:  hello
//! chunked:   5\r\nhello\r\n0\r\n\r\n
//! ```

use std::io::{self, Write};

use axum::http::HeaderMap;

use crate::inspect::duplicate::{capture, duplicate, CapturedBody};
use crate::inspect::error::InspectError;
use crate::inspect::request::{InboundRequest, RequestBody};

/// Writer applying the chunked transfer coding.
///
/// Every non-empty `write` becomes one length-prefixed chunk. `finish` emits
/// the last chunk, the trailer section and the closing CRLF.
pub struct ChunkedEncoder<W: Write> {
    inner: W,
}

impl<W: Write> ChunkedEncoder<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Terminate the coding and return the underlying writer.
    pub fn finish(mut self, trailers: Option<&HeaderMap>) -> io::Result<W> {
        self.inner.write_all(b"0\r\n")?;
        if let Some(trailers) = trailers {
            for (name, value) in trailers {
                self.inner.write_all(name.as_str().as_bytes())?;
                self.inner.write_all(b": ")?;
                self.inner.write_all(value.as_bytes())?;
                self.inner.write_all(b"\r\n")?;
            }
        }
        self.inner.write_all(b"\r\n")?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for ChunkedEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // A zero-length chunk would terminate the coding early.
        if buf.is_empty() {
            return Ok(0);
        }
        write!(self.inner, "{:x}\r\n", buf.len())?;
        self.inner.write_all(buf)?;
        self.inner.write_all(b"\r\n")?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Serialize captured content in the given framing.
pub fn encode_body(body: &CapturedBody, chunked: bool) -> Result<Vec<u8>, InspectError> {
    let mut out = Vec::with_capacity(body.data().len() + 16);
    if chunked {
        let mut encoder = ChunkedEncoder::new(&mut out);
        encoder.write_all(body.data())?;
        encoder.finish(body.trailers())?;
    } else {
        out.extend_from_slice(body.data());
    }
    Ok(out)
}

/// Capture the request body in its wire framing and restore the body.
///
/// The request always ends up with an unread body equivalent to the one it
/// arrived with, whether or not reencoding succeeds. An absent body produces
/// an empty result and stays absent.
pub async fn reencode(request: &mut InboundRequest) -> Result<Vec<u8>, InspectError> {
    let Some(body) = request.take_body() else {
        return Ok(Vec::new());
    };

    let (restore, copy) = match duplicate(body).await {
        Ok(pair) => pair,
        Err(failure) => {
            request.set_body(RequestBody::Stream(failure.replay));
            return Err(failure.error);
        }
    };
    request.set_body(restore);

    let copy = match copy {
        RequestBody::Absent => return Ok(Vec::new()),
        RequestBody::Stream(copy) => copy,
    };

    // The copy is in memory; draining it again cannot fail mid-way.
    let captured = capture(copy).await.map_err(|failure| failure.error)?;
    encode_body(&captured, request.is_chunked())
}
