//! Request inspection orchestration.
//!
//! # Data Flow
//! ```text
//! InboundRequest
//!     → toggles resolved once per call
//!     → [raw dump]        dump.rs   → sink.emit_raw   (failure aborts the call)
//!     → [structured log]  headers.rs + reencode.rs
//!                         → DiagnosticRecord → sink.emit  (failures degrade the record)
//!     → request handed back with an unread body
//! ```

use std::sync::Arc;

use axum::http::HeaderMap;

use crate::inspect::dump::dump_request;
use crate::inspect::error::InspectError;
use crate::inspect::headers::{self, CollectedHeaders};
use crate::inspect::record::DiagnosticRecord;
use crate::inspect::reencode::reencode;
use crate::inspect::request::InboundRequest;
use crate::inspect::sink::DiagnosticSink;
use crate::inspect::toggles::{ToggleSource, Toggles};

/// Header collection step of the structured path.
pub type HeaderCollector = fn(&HeaderMap) -> Result<CollectedHeaders, InspectError>;

fn collect_headers(map: &HeaderMap) -> Result<CollectedHeaders, InspectError> {
    Ok(headers::collect(map))
}

/// Captures requests and hands the result to a sink.
///
/// Holds no per-request state; one instance serves all concurrent requests.
#[derive(Clone)]
pub struct Inspector {
    sink: Arc<dyn DiagnosticSink>,
    toggles: Arc<dyn ToggleSource>,
    collect_headers: HeaderCollector,
}

impl Inspector {
    pub fn new(sink: Arc<dyn DiagnosticSink>, toggles: Arc<dyn ToggleSource>) -> Self {
        Self {
            sink,
            toggles,
            collect_headers,
        }
    }

    /// Replace the header collection step.
    pub fn with_header_collector(mut self, collector: HeaderCollector) -> Self {
        self.collect_headers = collector;
        self
    }

    /// Inspect a request using the toggles currently in effect.
    pub async fn inspect(&self, request: &mut InboundRequest) -> Result<(), InspectError> {
        let toggles = self.toggles.resolve();
        self.inspect_with(request, toggles).await
    }

    /// Inspect a request with explicit toggle decisions.
    ///
    /// A failing raw dump aborts the call before the structured path runs.
    /// The structured path never fails; problems are carried in the record.
    pub async fn inspect_with(
        &self,
        request: &mut InboundRequest,
        toggles: Toggles,
    ) -> Result<(), InspectError> {
        if toggles.raw_dump {
            let dump = dump_request(request).await?;
            self.sink.emit_raw(&dump);
        }

        if toggles.structured_log {
            let record = self.capture(request).await;
            self.sink.emit(&record);
        }

        Ok(())
    }

    /// Build the diagnostic record for a request, restoring its body.
    pub async fn capture(&self, request: &mut InboundRequest) -> DiagnosticRecord {
        tracing::debug!(method = %request.method(), uri = %request.uri(), "Request inspection started");

        let mut record = DiagnosticRecord::from_request(request);

        match (self.collect_headers)(request.headers()) {
            Ok(collected) => {
                for warning in collected.warnings {
                    tracing::warn!(error = %warning, "Header value captured lossily");
                    record.capture_warnings.push(warning.to_string());
                }
                record.headers = Some(collected.entries);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Header capture failed");
                record.capture_warnings.push(e.to_string());
            }
        }

        match reencode(request).await {
            Ok(bytes) => record.body = Some(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) => {
                tracing::warn!(error = %e, "Body capture failed");
                record.capture_warnings.push(e.to_string());
            }
        }

        tracing::debug!(degraded = record.is_degraded(), "Request inspection finished");
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::request::RequestBody;
    use crate::inspect::sink::MemorySink;
    use axum::body::Body;
    use axum::http::{HeaderValue, Request};
    use bytes::Bytes;
    use futures_util::stream;
    use http_body_util::BodyExt;

    fn inspector(sink: &Arc<MemorySink>, toggles: Toggles) -> Inspector {
        Inspector::new(sink.clone(), Arc::new(toggles))
    }

    fn hello_request(chunked: bool) -> InboundRequest {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/greetings")
            .header("host", "example.com");
        builder = if chunked {
            builder.header("transfer-encoding", "chunked")
        } else {
            builder.header("content-length", "5")
        };
        InboundRequest::from_http(
            builder.body(Body::from("hello")).unwrap(),
            Some("127.0.0.1:50000".parse().unwrap()),
        )
    }

    async fn downstream_read(request: InboundRequest) -> Bytes {
        request.into_http().into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn identity_body_is_logged_and_restored() {
        let sink = Arc::new(MemorySink::new());
        let mut req = hello_request(false);

        inspector(&sink, Toggles { raw_dump: false, structured_log: true })
            .inspect(&mut req)
            .await
            .unwrap();

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].body.as_deref(), Some("hello"));
        assert_eq!(records[0].http_method, "POST");
        assert_eq!(records[0].url_path, "greetings");
        assert_eq!(records[0].content_length, 5);
        assert_eq!(records[0].headers.as_ref().unwrap().len(), 2);
        assert!(sink.raw_dumps().is_empty());

        assert_eq!(downstream_read(req).await, Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn chunked_body_is_logged_in_wire_form() {
        let sink = Arc::new(MemorySink::new());
        let mut req = hello_request(true);

        inspector(&sink, Toggles { raw_dump: false, structured_log: true })
            .inspect(&mut req)
            .await
            .unwrap();

        let records = sink.records();
        let record = &records[0];
        assert_eq!(record.body.as_deref(), Some("5\r\nhello\r\n0\r\n\r\n"));
        assert_eq!(record.transfer_encoding, "chunked");
        assert_eq!(record.content_length, -1);

        assert_eq!(downstream_read(req).await, Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn absent_body_logs_empty_and_stays_absent() {
        let sink = Arc::new(MemorySink::new());
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let mut req = InboundRequest::from_http(req, None);

        inspector(&sink, Toggles::ALL).inspect(&mut req).await.unwrap();

        assert_eq!(sink.records()[0].body.as_deref(), Some(""));
        assert!(req.body().unwrap().is_absent());
    }

    #[tokio::test]
    async fn raw_dump_only_reaches_console() {
        let sink = Arc::new(MemorySink::new());
        let mut req = hello_request(false);

        inspector(&sink, Toggles { raw_dump: true, structured_log: false })
            .inspect(&mut req)
            .await
            .unwrap();

        assert!(sink.records().is_empty());
        let dumps = sink.raw_dumps();
        assert_eq!(dumps.len(), 1);
        assert!(dumps[0].starts_with(b"POST /greetings HTTP/1.1\r\n"));
        assert!(dumps[0].ends_with(b"\r\n\r\nhello"));

        assert_eq!(downstream_read(req).await, Bytes::from_static(b"hello"));
    }

    fn failing_collector(_: &HeaderMap) -> Result<CollectedHeaders, InspectError> {
        Err(InspectError::Header { name: "x-blob".into() })
    }

    #[tokio::test]
    async fn header_failure_degrades_record() {
        let sink = Arc::new(MemorySink::new());
        let mut req = hello_request(false);

        let result = inspector(&sink, Toggles { raw_dump: false, structured_log: true })
            .with_header_collector(failing_collector)
            .inspect(&mut req)
            .await;
        assert!(result.is_ok());

        let records = sink.records();
        let record = &records[0];
        assert!(record.headers.is_none());
        assert_eq!(record.http_method, "POST");
        assert_eq!(record.host, "example.com");
        assert_eq!(record.capture_warnings.len(), 1);
        assert!(record.capture_warnings[0].contains("x-blob"));
        assert_eq!(record.body.as_deref(), Some("hello"));
        assert_eq!(downstream_read(req).await, Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn non_utf8_header_keeps_the_other_headers() {
        let sink = Arc::new(MemorySink::new());
        let req = Request::builder()
            .method("POST")
            .uri("/greetings")
            .header("host", "example.com")
            .header("accept", "*/*")
            .header("x-name", HeaderValue::from_bytes(b"caf\xe9").unwrap())
            .body(Body::from("hello"))
            .unwrap();
        let mut req = InboundRequest::from_http(req, None);

        inspector(&sink, Toggles::ALL).inspect(&mut req).await.unwrap();

        let records = sink.records();
        let record = &records[0];
        let lines = record.header_lines();
        assert_eq!(lines.len(), 3);
        assert!(lines.contains(&"host: example.com".to_string()));
        assert!(lines.contains(&"accept: */*".to_string()));
        assert_eq!(
            record.capture_warnings,
            vec!["header x-name has a value that is not valid UTF-8".to_string()]
        );
        assert_eq!(record.body.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn concurrent_inspections_keep_their_own_bodies() {
        let sink = Arc::new(MemorySink::new());
        let inspector = inspector(&sink, Toggles::ALL);

        let runs = (0..16).map(|i| {
            let inspector = inspector.clone();
            async move {
                let payload = format!("payload-{i}");
                let req = Request::builder()
                    .method("POST")
                    .uri(format!("/items/{i}"))
                    .header("content-length", payload.len())
                    .body(Body::from(payload.clone()))
                    .unwrap();
                let mut req = InboundRequest::from_http(req, None);
                inspector.inspect(&mut req).await.unwrap();
                assert_eq!(downstream_read(req).await, Bytes::from(payload));
            }
        });
        futures_util::future::join_all(runs).await;

        let records = sink.records();
        assert_eq!(records.len(), 16);
        assert_eq!(sink.raw_dumps().len(), 16);
        for record in &records {
            let id = record.url_path.trim_start_matches("items/");
            assert_eq!(record.body.as_deref(), Some(format!("payload-{id}").as_str()));
        }
    }

    #[tokio::test]
    async fn body_failure_degrades_record_and_restores_body() {
        let sink = Arc::new(MemorySink::new());
        let source = Body::from_stream(stream::iter(vec![
            Ok(Bytes::from_static(b"hel")),
            Err(std::io::Error::other("client reset")),
        ]));
        let req = Request::builder().method("PUT").uri("/upload").body(source).unwrap();
        let mut req = InboundRequest::from_http(req, None);

        inspector(&sink, Toggles { raw_dump: false, structured_log: true })
            .inspect(&mut req)
            .await
            .unwrap();

        let records = sink.records();
        let record = &records[0];
        assert!(record.body.is_none());
        assert!(record.headers.is_some());
        assert!(record.capture_warnings[0].contains("client reset"));
        assert!(matches!(req.body(), Some(RequestBody::Stream(_))));
    }

    #[tokio::test]
    async fn dump_failure_aborts_structured_log() {
        let sink = Arc::new(MemorySink::new());
        let source = Body::from_stream(stream::iter(vec![
            Ok(Bytes::from_static(b"x")),
            Err(std::io::Error::other("reset")),
        ]));
        let req = Request::builder().uri("/").body(source).unwrap();
        let mut req = InboundRequest::from_http(req, None);

        let err = inspector(&sink, Toggles::ALL).inspect(&mut req).await.unwrap_err();
        assert!(matches!(err, InspectError::Dump(_)));
        assert!(sink.raw_dumps().is_empty());
        assert!(sink.records().is_empty());
    }

    #[tokio::test]
    async fn disabled_toggles_touch_nothing() {
        let sink = Arc::new(MemorySink::new());
        let mut req = hello_request(false);

        inspector(&sink, Toggles::NONE).inspect(&mut req).await.unwrap();

        assert!(sink.records().is_empty());
        assert!(sink.raw_dumps().is_empty());
        assert_eq!(downstream_read(req).await, Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn both_paths_see_the_same_body() {
        let sink = Arc::new(MemorySink::new());
        let mut req = hello_request(true);

        inspector(&sink, Toggles::ALL).inspect(&mut req).await.unwrap();

        assert!(sink.raw_dumps()[0].ends_with(b"5\r\nhello\r\n0\r\n\r\n"));
        assert_eq!(sink.records()[0].body.as_deref(), Some("5\r\nhello\r\n0\r\n\r\n"));
        assert_eq!(downstream_read(req).await, Bytes::from_static(b"hello"));
    }
}
