//! Trace context propagation and span instrumentation for distributed
//! request chains.
//!
//! `tracelink` tracks a logical request as it crosses process boundaries. A
//! request is recorded as a tree of [`trace::Span`]s sharing one trace id;
//! the identity of the currently active span travels in-process through an
//! ambient [`Context`] and across the wire through a
//! [`propagation::TextMapPropagator`] that encodes it into a string-keyed
//! carrier (typically HTTP headers).
//!
//! There is intentionally no process-global tracer. A
//! [`trace::TracerProvider`] is built once at startup and handed to every
//! component that starts spans:
//!
//! ```
//! use tracelink::trace::{InMemorySpanExporter, SpanKind, TracerProvider};
//!
//! let exporter = InMemorySpanExporter::default();
//! let provider = TracerProvider::builder()
//!     .with_exporter(exporter.clone())
//!     .build();
//!
//! let tracer = provider.tracer("example");
//! let mut span = tracer
//!     .span_builder("doing_work")
//!     .with_kind(SpanKind::Internal)
//!     .start(&tracer);
//! // ... do work ...
//! span.end();
//!
//! assert_eq!(exporter.finished_spans().unwrap().len(), 1);
//! ```

pub mod context;
pub mod propagation;
pub mod status;
pub mod trace;

mod common;

pub use common::{Key, KeyValue, Value};
pub use context::{Context, ContextGuard, FutureContextExt, WithContext};
pub use status::{classify, ErrorKind, Status};
