//! Body stream duplication.
//!
//! A request body can be read exactly once. Duplication drains it into memory
//! and hands back two independent streams over the same bytes.

use std::convert::Infallible;

use axum::body::Body;
use axum::http::HeaderMap;
use bytes::{Bytes, BytesMut};
use futures_util::stream;
use http_body::Frame;
use http_body_util::{BodyExt, StreamBody};

use crate::inspect::error::InspectError;
use crate::inspect::request::RequestBody;

/// Fully materialized body content.
#[derive(Debug, Clone)]
pub struct CapturedBody {
    data: Bytes,
    trailers: Option<HeaderMap>,
}

impl CapturedBody {
    pub fn new(data: Bytes, trailers: Option<HeaderMap>) -> Self {
        Self { data, trailers }
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn trailers(&self) -> Option<&HeaderMap> {
        self.trailers.as_ref()
    }

    /// A fresh, unread stream over the captured content.
    ///
    /// Every stream shares the backing storage but reads from its own cursor.
    pub fn to_body(&self) -> Body {
        match &self.trailers {
            None => Body::from(self.data.clone()),
            Some(trailers) => {
                let frames = vec![
                    Ok::<_, Infallible>(Frame::data(self.data.clone())),
                    Ok(Frame::trailers(trailers.clone())),
                ];
                Body::new(StreamBody::new(stream::iter(frames)))
            }
        }
    }
}

/// A drain that stopped early.
///
/// `replay` yields every byte read before the failure and then the failure
/// itself, so it can stand in for the consumed source.
pub struct ReadFailure {
    pub error: InspectError,
    pub replay: Body,
}

impl std::fmt::Debug for ReadFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadFailure").field("error", &self.error).finish_non_exhaustive()
    }
}

/// Drain a body stream into memory.
pub async fn capture(mut body: Body) -> Result<CapturedBody, ReadFailure> {
    let mut data = BytesMut::new();
    let mut trailers: Option<HeaderMap> = None;

    while let Some(frame) = body.frame().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                let error = InspectError::Read(err.to_string());
                let read = data.freeze();
                tracing::debug!(bytes_read = read.len(), error = %error, "Body stream failed while draining");
                let replay = Body::from_stream(stream::iter(vec![Ok(read), Err(err)]));
                return Err(ReadFailure { error, replay });
            }
        };

        match frame.into_data() {
            Ok(chunk) => data.extend_from_slice(&chunk),
            Err(frame) => {
                if let Ok(map) = frame.into_trailers() {
                    trailers.get_or_insert_with(HeaderMap::new).extend(map);
                }
            }
        }
    }

    Ok(CapturedBody::new(data.freeze(), trailers))
}

/// Split one single-use body into two independent bodies with identical content.
///
/// The "no body" marker is passed through on both sides without buffering.
/// The source is fully drained and must not be reused.
pub async fn duplicate(body: RequestBody) -> Result<(RequestBody, RequestBody), ReadFailure> {
    let body = match body {
        RequestBody::Absent => return Ok((RequestBody::Absent, RequestBody::Absent)),
        RequestBody::Stream(body) => body,
    };

    let captured = capture(body).await?;
    Ok((
        RequestBody::Stream(captured.to_body()),
        RequestBody::Stream(captured.to_body()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    async fn read_all(body: RequestBody) -> Bytes {
        match body {
            RequestBody::Absent => panic!("expected a stream"),
            RequestBody::Stream(body) => body.collect().await.unwrap().to_bytes(),
        }
    }

    #[tokio::test]
    async fn duplicates_yield_identical_bytes() {
        let source = Body::from_stream(stream::iter(vec![
            Ok::<_, std::io::Error>(Bytes::from_static(b"hel")),
            Ok(Bytes::from_static(b"lo")),
        ]));

        let (a, b) = duplicate(RequestBody::Stream(source)).await.unwrap();
        assert_eq!(read_all(a).await, Bytes::from_static(b"hello"));
        assert_eq!(read_all(b).await, Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn absent_body_stays_absent() {
        let (a, b) = duplicate(RequestBody::Absent).await.unwrap();
        assert!(a.is_absent());
        assert!(b.is_absent());
    }

    #[tokio::test]
    async fn present_empty_body_is_not_absent() {
        let (a, b) = duplicate(RequestBody::Stream(Body::from(Bytes::new()))).await.unwrap();
        assert!(!a.is_absent());
        assert!(read_all(b).await.is_empty());
    }

    #[tokio::test]
    async fn read_failure_replays_partial_content_then_error() {
        let source = Body::from_stream(stream::iter(vec![
            Ok(Bytes::from_static(b"par")),
            Err(std::io::Error::other("connection reset")),
        ]));

        let failure = duplicate(RequestBody::Stream(source)).await.unwrap_err();
        assert!(matches!(failure.error, InspectError::Read(ref msg) if msg.contains("connection reset")));

        let mut replay = failure.replay;
        let first = replay.frame().await.unwrap().unwrap().into_data().unwrap();
        assert_eq!(first, Bytes::from_static(b"par"));
        assert!(replay.frame().await.unwrap().is_err());
    }

    #[tokio::test]
    async fn trailers_survive_duplication() {
        let mut trailers = HeaderMap::new();
        trailers.insert("x-checksum", HeaderValue::from_static("abc123"));
        let frames = vec![
            Ok::<_, Infallible>(Frame::data(Bytes::from_static(b"payload"))),
            Ok(Frame::trailers(trailers)),
        ];
        let source = Body::new(StreamBody::new(stream::iter(frames)));

        let (restore, _) = duplicate(RequestBody::Stream(source)).await.unwrap();
        let RequestBody::Stream(restore) = restore else {
            panic!("expected a stream");
        };
        let collected = restore.collect().await.unwrap();
        assert_eq!(collected.trailers().unwrap()["x-checksum"], "abc123");
        assert_eq!(collected.to_bytes(), Bytes::from_static(b"payload"));
    }
}
