//! The recording half of a span's lifecycle.

use crate::trace::export::SpanData;
use crate::trace::provider::TracerProvider;
use crate::trace::SpanContext;
use crate::{KeyValue, Status};
use std::time::SystemTime;

/// The relationship between a span and the operation it describes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SpanKind {
    /// Outgoing-request side of a synchronous remote call.
    ///
    /// The parent of a `Client` span is often an `Internal` or `Server`
    /// span, and its child is the `Server` span of the callee.
    Client,

    /// Incoming-request side of a synchronous remote call.
    ///
    /// The parent of a `Server` span is often a remote `Client` span that
    /// was propagated in from the caller.
    Server,

    /// An operation internal to an application, with no remote parent or
    /// child. The default kind.
    Internal,
}

/// A single operation within a trace.
///
/// Spans are recorded between their start and their end; attributes and
/// status set after [`Span::end`] are silently dropped. A span is emitted
/// to the provider's exporter exactly once, on the first of either an
/// explicit `end` call or the drop of the last handle, so spans escape on
/// every exit path including unwinding.
#[derive(Debug)]
pub struct Span {
    span_context: SpanContext,
    data: Option<SpanData>,
    provider: TracerProvider,
}

impl Span {
    pub(crate) fn new(
        span_context: SpanContext,
        data: Option<SpanData>,
        provider: TracerProvider,
    ) -> Self {
        Span {
            span_context,
            data,
            provider,
        }
    }

    /// The immutable identity of this span.
    pub fn span_context(&self) -> &SpanContext {
        &self.span_context
    }

    /// Returns `true` while the span can still record changes.
    pub fn is_recording(&self) -> bool {
        self.data.is_some()
    }

    /// Set an attribute on this span.
    pub fn set_attribute(&mut self, attribute: KeyValue) {
        if let Some(data) = self.data.as_mut() {
            data.attributes.push(attribute);
        }
    }

    /// Replace the name given at start.
    pub fn update_name(&mut self, name: impl Into<std::borrow::Cow<'static, str>>) {
        if let Some(data) = self.data.as_mut() {
            data.name = name.into();
        }
    }

    /// Set the status of this span.
    ///
    /// Statuses only increase in priority: `Ok` cannot be overwritten and
    /// setting `Unset` never clears an existing status.
    pub fn set_status(&mut self, status: Status) {
        if let Some(data) = self.data.as_mut() {
            if status_priority(&status) > status_priority(&data.status) {
                data.status = status;
            }
        }
    }

    /// End this span, emitting it to the exporter.
    ///
    /// Calling `end` a second time is a no-op.
    pub fn end(&mut self) {
        self.ensure_ended_and_exported();
    }

    fn ensure_ended_and_exported(&mut self) {
        // Emission happens on the first end only. Skipped if the span was
        // never recording (sampled out or provider shut down).
        if let Some(mut data) = self.data.take() {
            data.end_time = SystemTime::now();
            self.provider.export(data);
        }
    }
}

impl Drop for Span {
    /// Exports span data on drop if the span has not been ended already.
    fn drop(&mut self) {
        self.ensure_ended_and_exported();
    }
}

fn status_priority(status: &Status) -> u8 {
    match status {
        Status::Unset => 0,
        Status::Error { .. } => 1,
        Status::Ok => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{InMemorySpanExporter, Tracer, TracerProvider};
    use crate::ErrorKind;

    fn test_tracer() -> (Tracer, InMemorySpanExporter) {
        let exporter = InMemorySpanExporter::default();
        let provider = TracerProvider::builder()
            .with_exporter(exporter.clone())
            .build();
        (provider.tracer("test"), exporter)
    }

    #[test]
    fn end_emits_exactly_once() {
        let (tracer, exporter) = test_tracer();

        let mut span = tracer.start("operation");
        span.end();
        span.end();
        drop(span);

        assert_eq!(exporter.finished_spans().unwrap().len(), 1);
    }

    #[test]
    fn drop_is_an_implicit_end() {
        let (tracer, exporter) = test_tracer();

        drop(tracer.start("operation"));

        let spans = exporter.finished_spans().unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].name, "operation");
    }

    #[test]
    fn emitted_even_when_unwinding() {
        let (tracer, exporter) = test_tracer();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _span = tracer.start("doomed");
            panic!("boom");
        }));

        assert!(result.is_err());
        assert_eq!(exporter.finished_spans().unwrap().len(), 1);
    }

    #[test]
    fn changes_after_end_are_dropped() {
        let (tracer, exporter) = test_tracer();

        let mut span = tracer.start("operation");
        span.set_attribute(KeyValue::new("before", true));
        span.end();
        span.set_attribute(KeyValue::new("after", true));
        span.set_status(Status::error(ErrorKind::Internal, "late"));

        let spans = exporter.finished_spans().unwrap();
        assert_eq!(spans[0].attributes, vec![KeyValue::new("before", true)]);
        assert_eq!(spans[0].status, Status::Unset);
    }

    #[test]
    fn status_cannot_downgrade() {
        let (tracer, exporter) = test_tracer();

        let mut span = tracer.start("operation");
        span.set_status(Status::Ok);
        span.set_status(Status::error(ErrorKind::Internal, "too late"));
        span.end();

        assert_eq!(exporter.finished_spans().unwrap()[0].status, Status::Ok);
    }
}
