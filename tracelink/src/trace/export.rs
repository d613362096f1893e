//! Span export: the boundary between recording spans and shipping them.

use crate::trace::{SpanContext, SpanId, SpanKind, TraceError, TraceResult};
use crate::{KeyValue, Status};
use std::borrow::Cow;
use std::fmt::Write;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// Everything recorded about one finished span.
#[derive(Clone, Debug)]
pub struct SpanData {
    /// Span identity.
    pub span_context: SpanContext,
    /// Span id of this span's parent, [`SpanId::INVALID`] for root spans.
    pub parent_span_id: SpanId,
    /// Relationship to the traced operation.
    pub span_kind: SpanKind,
    /// Operation name.
    pub name: Cow<'static, str>,
    /// Span start time.
    pub start_time: SystemTime,
    /// Span end time.
    pub end_time: SystemTime,
    /// Attributes in insertion order.
    pub attributes: Vec<KeyValue>,
    /// Final status.
    pub status: Status,
}

impl SpanData {
    /// Returns `true` for spans without a parent.
    pub fn is_root(&self) -> bool {
        self.parent_span_id == SpanId::INVALID
    }
}

/// Receives finished spans from a [`TracerProvider`].
///
/// Exporters must not block for long; they run on the thread that ended the
/// span.
///
/// [`TracerProvider`]: crate::trace::TracerProvider
pub trait SpanExporter: Send + Sync + std::fmt::Debug {
    /// Export a single finished span.
    fn export(&self, span: SpanData) -> TraceResult<()>;

    /// Flush any buffered state and release resources.
    fn shutdown(&self) -> TraceResult<()> {
        Ok(())
    }
}

/// A [`SpanExporter`] that stores finished spans in memory.
///
/// Primarily used in testing to assert on the spans a piece of
/// instrumentation produced. Cloning shares the underlying buffer.
///
/// # Examples
///
/// ```
/// use tracelink::trace::{InMemorySpanExporter, TracerProvider};
///
/// let exporter = InMemorySpanExporter::default();
/// let provider = TracerProvider::builder()
///     .with_exporter(exporter.clone())
///     .build();
///
/// drop(provider.tracer("app").start("work"));
///
/// for span in exporter.finished_spans().unwrap() {
///     println!("{}", span.name);
/// }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemorySpanExporter {
    spans: Arc<Mutex<Vec<SpanData>>>,
}

impl InMemorySpanExporter {
    /// Returns the finished spans this exporter has received so far.
    pub fn finished_spans(&self) -> TraceResult<Vec<SpanData>> {
        self.spans
            .lock()
            .map(|spans| spans.clone())
            .map_err(TraceError::from)
    }

    /// Clears the in-memory buffer.
    pub fn reset(&self) {
        let _ = self.spans.lock().map(|mut spans| spans.clear());
    }
}

impl SpanExporter for InMemorySpanExporter {
    fn export(&self, span: SpanData) -> TraceResult<()> {
        self.spans
            .lock()
            .map(|mut spans| spans.push(span))
            .map_err(TraceError::from)
    }

    fn shutdown(&self) -> TraceResult<()> {
        self.reset();
        Ok(())
    }
}

/// A [`SpanExporter`] that emits each finished span as a structured log
/// event, for demos and local debugging.
#[derive(Debug, Default)]
pub struct LoggingSpanExporter {
    _private: (),
}

impl LoggingSpanExporter {
    /// Create a new logging exporter.
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl SpanExporter for LoggingSpanExporter {
    fn export(&self, span: SpanData) -> TraceResult<()> {
        let duration = span
            .end_time
            .duration_since(span.start_time)
            .unwrap_or_default();
        let mut attributes = String::new();
        for kv in &span.attributes {
            if !attributes.is_empty() {
                attributes.push_str(", ");
            }
            let _ = write!(attributes, "{}={}", kv.key, kv.value);
        }

        tracing::info!(
            target: "tracelink::export",
            name = %span.name,
            trace_id = %span.span_context.trace_id(),
            span_id = %span.span_context.span_id(),
            parent_span_id = %span.parent_span_id,
            kind = ?span.span_kind,
            status = ?span.status,
            duration_us = duration.as_micros() as u64,
            %attributes,
            "span ended"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{TraceFlags, TraceId};

    fn sample_span(name: &'static str) -> SpanData {
        SpanData {
            span_context: SpanContext::new(
                TraceId::from(1u128),
                SpanId::from(1u64),
                TraceFlags::SAMPLED,
                false,
            ),
            parent_span_id: SpanId::INVALID,
            span_kind: SpanKind::Internal,
            name: Cow::Borrowed(name),
            start_time: SystemTime::now(),
            end_time: SystemTime::now(),
            attributes: Vec::new(),
            status: Status::Unset,
        }
    }

    #[test]
    fn in_memory_collects_and_resets() {
        let exporter = InMemorySpanExporter::default();
        exporter.export(sample_span("a")).unwrap();
        exporter.export(sample_span("b")).unwrap();

        let spans = exporter.finished_spans().unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].name, "a");

        exporter.reset();
        assert!(exporter.finished_spans().unwrap().is_empty());
    }

    #[test]
    fn clones_share_the_buffer() {
        let exporter = InMemorySpanExporter::default();
        let clone = exporter.clone();
        clone.export(sample_span("shared")).unwrap();

        assert_eq!(exporter.finished_spans().unwrap().len(), 1);
    }
}
