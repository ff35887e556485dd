//! Diagnostic sinks.
//!
//! # Responsibilities
//! - Accept raw wire dumps (console output)
//! - Accept structured records (log events)
//!
//! # Design Decisions
//! - Sinks are shared by all in-flight inspections, so they take `&self`
//! - Sink failures are logged and dropped; they never reach the request path

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::SinkKind;
use crate::inspect::record::DiagnosticRecord;

/// Destination for inspection output.
pub trait DiagnosticSink: Send + Sync {
    /// Emit a structured record.
    fn emit(&self, record: &DiagnosticRecord);

    /// Emit a raw wire dump.
    fn emit_raw(&self, dump: &[u8]);
}

/// Build the sink selected in the configuration.
pub fn build_sink(kind: SinkKind) -> Arc<dyn DiagnosticSink> {
    match kind {
        SinkKind::Tracing => Arc::new(TracingSink),
        SinkKind::Json => Arc::new(JsonSink::stdout()),
    }
}

fn write_block(out: &mut impl Write, bytes: &[u8]) -> io::Result<()> {
    out.write_all(bytes)?;
    out.write_all(b"\n")?;
    out.flush()
}

fn write_stdout(bytes: &[u8]) {
    let stdout = io::stdout();
    if let Err(e) = write_block(&mut stdout.lock(), bytes) {
        tracing::warn!(error = %e, "Failed to write request dump to stdout");
    }
}

/// Records become `tracing` events, dumps go to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, record: &DiagnosticRecord) {
        let headers = header_fields(record);
        let warnings = (!record.capture_warnings.is_empty())
            .then(|| record.capture_warnings.join("; "));

        tracing::info!(
            "HTTPMethod" = %record.http_method,
            "URLPath" = %record.url_path,
            "URL" = %record.url,
            "Protocol" = %record.protocol,
            "ProtoMajor" = record.proto_major,
            "ProtoMinor" = record.proto_minor,
            "ContentLength" = record.content_length,
            "Transfer-Encoding" = %record.transfer_encoding,
            "Close" = record.close,
            "Host" = %record.host,
            "RemoteAddr" = %record.remote_addr,
            "RequestURI" = %record.request_uri,
            "Headers" = headers.as_deref(),
            "Body" = record.body.as_deref(),
            "CaptureWarnings" = warnings.as_deref(),
            "Request received"
        );
    }

    fn emit_raw(&self, dump: &[u8]) {
        write_stdout(dump);
    }
}

/// `Header(i)` fields as a JSON object, since event field names are static.
fn header_fields(record: &DiagnosticRecord) -> Option<String> {
    let entries = record.headers.as_ref()?;
    let fields: serde_json::Map<String, serde_json::Value> = entries
        .iter()
        .map(|entry| (entry.label(), serde_json::Value::String(entry.line())))
        .collect();
    serde_json::to_string(&fields).ok()
}

/// Records become JSON lines on the wrapped writer, dumps go to stdout.
pub struct JsonSink<W: Write + Send> {
    out: Mutex<W>,
}

impl JsonSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> DiagnosticSink for JsonSink<W> {
    fn emit(&self, record: &DiagnosticRecord) {
        let line = match serde_json::to_vec(record) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize diagnostic record");
                return;
            }
        };
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = write_block(&mut *out, &line) {
            tracing::warn!(error = %e, "Failed to write diagnostic record");
        }
    }

    fn emit_raw(&self, dump: &[u8]) {
        write_stdout(dump);
    }
}

/// Keeps everything it receives.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<DiagnosticRecord>>,
    dumps: Mutex<Vec<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<DiagnosticRecord> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn raw_dumps(&self) -> Vec<Vec<u8>> {
        self.dumps.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&self, record: &DiagnosticRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
    }

    fn emit_raw(&self, dump: &[u8]) {
        self.dumps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(dump.to_vec());
    }
}
