//! The entry point of the span recording pipeline.

use crate::trace::export::{SpanData, SpanExporter};
use crate::trace::id_generator::{IdGenerator, RandomIdGenerator};
use crate::trace::{SpanId, TraceError, TraceId, TraceResult, Tracer};
use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Creates [`Tracer`]s and owns the export pipeline behind them.
///
/// There is intentionally no process-global provider: build one at startup
/// and hand clones to every component that starts spans. Clones are cheap
/// and share the same pipeline, so shutting one down shuts all of them
/// down.
///
/// # Examples
///
/// ```
/// use tracelink::trace::{LoggingSpanExporter, TracerProvider};
///
/// let provider = TracerProvider::builder()
///     .with_exporter(LoggingSpanExporter::new())
///     .build();
///
/// let tracer = provider.tracer("my_component");
/// drop(tracer.start("startup"));
///
/// provider.shutdown().unwrap();
/// ```
#[derive(Clone, Debug)]
pub struct TracerProvider {
    inner: Arc<TracerProviderInner>,
}

#[derive(Debug)]
struct TracerProviderInner {
    exporter: Option<Box<dyn SpanExporter>>,
    id_generator: Box<dyn IdGenerator>,
    is_shutdown: AtomicBool,
}

impl TracerProvider {
    /// Build a new provider from defaults.
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Create a tracer named after the instrumented component.
    pub fn tracer(&self, name: impl Into<Cow<'static, str>>) -> Tracer {
        Tracer::new(name.into(), self.clone())
    }

    /// Returns `true` if this provider has been shut down.
    pub fn is_shutdown(&self) -> bool {
        self.inner.is_shutdown.load(Ordering::Relaxed)
    }

    /// Shut down the pipeline.
    ///
    /// Spans ending after shutdown are silently dropped. Shutting down a
    /// second time is an error.
    pub fn shutdown(&self) -> TraceResult<()> {
        if self.inner.is_shutdown.swap(true, Ordering::Relaxed) {
            return Err(TraceError::AlreadyShutdown);
        }
        if let Some(exporter) = &self.inner.exporter {
            exporter.shutdown()?;
        }
        Ok(())
    }

    pub(crate) fn new_trace_id(&self) -> TraceId {
        self.inner.id_generator.new_trace_id()
    }

    pub(crate) fn new_span_id(&self) -> SpanId {
        self.inner.id_generator.new_span_id()
    }

    /// Hand a finished span to the exporter.
    ///
    /// Called from span teardown, possibly during unwinding, so failures
    /// are logged instead of propagated.
    pub(crate) fn export(&self, span: SpanData) {
        if self.is_shutdown() {
            return;
        }
        if let Some(exporter) = &self.inner.exporter {
            if let Err(err) = exporter.export(span) {
                warn!(
                    target: "tracelink",
                    error = %err,
                    "failed to export span"
                );
            }
        }
    }
}

/// Configuration for a new [`TracerProvider`].
#[derive(Debug, Default)]
pub struct Builder {
    exporter: Option<Box<dyn SpanExporter>>,
    id_generator: Option<Box<dyn IdGenerator>>,
}

impl Builder {
    /// The [`SpanExporter`] finished spans are handed to.
    ///
    /// Without an exporter the provider records spans and discards them on
    /// end.
    pub fn with_exporter<T: SpanExporter + 'static>(self, exporter: T) -> Self {
        Builder {
            exporter: Some(Box::new(exporter)),
            ..self
        }
    }

    /// The [`IdGenerator`] the provider should use to issue ids.
    pub fn with_id_generator<T: IdGenerator + 'static>(self, id_generator: T) -> Self {
        Builder {
            id_generator: Some(Box::new(id_generator)),
            ..self
        }
    }

    /// Create a new provider from this configuration.
    pub fn build(self) -> TracerProvider {
        TracerProvider {
            inner: Arc::new(TracerProviderInner {
                exporter: self.exporter,
                id_generator: self
                    .id_generator
                    .unwrap_or_else(|| Box::new(RandomIdGenerator::default())),
                is_shutdown: AtomicBool::new(false),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::InMemorySpanExporter;

    #[test]
    fn clones_share_one_pipeline() {
        let exporter = InMemorySpanExporter::default();
        let provider = TracerProvider::builder()
            .with_exporter(exporter.clone())
            .build();
        let clone = provider.clone();

        drop(clone.tracer("a").start("work"));

        assert_eq!(exporter.finished_spans().unwrap().len(), 1);
    }

    #[test]
    fn shutdown_drops_later_spans() {
        let exporter = InMemorySpanExporter::default();
        let provider = TracerProvider::builder()
            .with_exporter(exporter.clone())
            .build();
        let tracer = provider.tracer("test");

        provider.shutdown().unwrap();
        drop(tracer.start("too_late"));

        assert!(exporter.finished_spans().unwrap().is_empty());
        assert!(matches!(
            provider.shutdown(),
            Err(TraceError::AlreadyShutdown)
        ));
    }
}
