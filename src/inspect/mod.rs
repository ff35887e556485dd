//! Request inspection subsystem.
//!
//! # Data Flow
//! ```text
//! Request<Body> from the serving layer
//!     → request.rs    (InboundRequest: head + single body slot)
//!     → duplicate.rs  (drain once, two independent streams)
//!     → reencode.rs   (wire framing: identity or chunked)
//!     → headers.rs    (flattened, labeled header entries)
//!     → record.rs     (DiagnosticRecord)
//!     → sink.rs       (tracing / JSON / memory)
//! inspector.rs ties the steps together; dump.rs renders the raw wire form.
//! ```
//!
//! # Design Decisions
//! - The whole body is buffered once per inspection; no size cap
//! - The request always leaves with an unread body equivalent to the original
//! - Inspection is a side channel: callers log its errors and carry on

pub mod duplicate;
pub mod dump;
pub mod error;
pub mod headers;
pub mod inspector;
pub mod record;
pub mod reencode;
pub mod request;
pub mod sink;
pub mod toggles;

pub use duplicate::{duplicate, CapturedBody};
pub use dump::dump_request;
pub use error::InspectError;
pub use headers::{CollectedHeaders, HeaderEntry};
pub use inspector::{HeaderCollector, Inspector};
pub use record::DiagnosticRecord;
pub use reencode::{reencode, ChunkedEncoder};
pub use request::{InboundRequest, RequestBody};
pub use sink::{build_sink, DiagnosticSink, JsonSink, MemorySink, TracingSink};
pub use toggles::{ConfigToggles, ToggleSource, Toggles};
