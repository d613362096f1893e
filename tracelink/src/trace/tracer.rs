//! Starting spans and wiring them to their parents.

use crate::trace::export::SpanData;
use crate::trace::provider::TracerProvider;
use crate::trace::{
    Span, SpanContext, SpanId, SpanKind, TraceContextExt, TraceFlags,
};
use crate::{Context, KeyValue};
use std::borrow::Cow;
use std::time::SystemTime;

/// Starts spans on behalf of one instrumented component.
///
/// Obtained from [`TracerProvider::tracer`]; cheap to clone.
#[derive(Clone, Debug)]
pub struct Tracer {
    name: Cow<'static, str>,
    provider: TracerProvider,
}

impl Tracer {
    pub(crate) fn new(name: Cow<'static, str>, provider: TracerProvider) -> Self {
        Tracer { name, provider }
    }

    /// The component name this tracer was created for.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Starts a new [`SpanBuilder`] for a span with the given name.
    pub fn span_builder(&self, name: impl Into<Cow<'static, str>>) -> SpanBuilder {
        SpanBuilder::from_name(name)
    }

    /// Starts a new span parented to this thread's current context.
    pub fn start(&self, name: impl Into<Cow<'static, str>>) -> Span {
        self.span_builder(name).start(self)
    }

    /// Starts a new span parented to the span in `parent_cx`, if any.
    pub fn start_with_context(&self, name: impl Into<Cow<'static, str>>, parent_cx: &Context) -> Span {
        self.span_builder(name).start_with_context(self, parent_cx)
    }

    /// Start a new span and execute the given closure with it as the active
    /// span, ending it when the closure returns.
    ///
    /// # Examples
    ///
    /// ```
    /// use tracelink::trace::{TraceContextExt, TracerProvider};
    /// use tracelink::KeyValue;
    ///
    /// let provider = TracerProvider::builder().build();
    /// let tracer = provider.tracer("app");
    ///
    /// tracer.in_span("doing_work", |cx| {
    ///     cx.span().set_attribute(KeyValue::new("step", 1i64));
    /// });
    /// ```
    pub fn in_span<T, F>(&self, name: impl Into<Cow<'static, str>>, f: F) -> T
    where
        F: FnOnce(Context) -> T,
    {
        let span = self.start(name);
        let cx = Context::current_with_span(span);
        let _guard = cx.clone().attach();
        let result = f(cx.clone());
        cx.span().end();
        result
    }

    pub(crate) fn build_with_context(&self, builder: SpanBuilder, parent_cx: &Context) -> Span {
        let parent = if builder.no_parent {
            None
        } else {
            parent_cx
                .has_span()
                .then(|| parent_cx.span().span_context().clone())
                .filter(SpanContext::is_valid)
        };

        let (trace_id, parent_span_id, trace_flags) = match &parent {
            Some(parent) => (parent.trace_id(), parent.span_id(), parent.trace_flags()),
            // Root span: a fresh trace, always sampled.
            None => (self.provider.new_trace_id(), SpanId::INVALID, TraceFlags::SAMPLED),
        };

        let span_context = SpanContext::new(trace_id, self.provider.new_span_id(), trace_flags, false);

        let data = (!self.provider.is_shutdown()).then(|| SpanData {
            span_context: span_context.clone(),
            parent_span_id,
            span_kind: builder.span_kind.unwrap_or(SpanKind::Internal),
            name: builder.name,
            start_time: SystemTime::now(),
            end_time: SystemTime::UNIX_EPOCH,
            attributes: builder.attributes.unwrap_or_default(),
            status: crate::Status::Unset,
        });

        Span::new(span_context, data, self.provider.clone())
    }
}

/// [`Span`] configuration, applied when the span starts.
///
/// ```
/// use tracelink::trace::{SpanKind, TracerProvider};
///
/// let provider = TracerProvider::builder().build();
/// let tracer = provider.tracer("app");
///
/// let span = tracer
///     .span_builder("fetch")
///     .with_kind(SpanKind::Client)
///     .start(&tracer);
/// drop(span);
/// ```
#[derive(Clone, Debug)]
pub struct SpanBuilder {
    /// Span name.
    pub name: Cow<'static, str>,
    /// Span kind, [`SpanKind::Internal`] if unset.
    pub span_kind: Option<SpanKind>,
    /// Attributes present from the start of the span.
    pub attributes: Option<Vec<KeyValue>>,
    /// Force the span to be the root of a new trace.
    pub no_parent: bool,
}

impl SpanBuilder {
    /// Create a new span builder from a span name.
    pub fn from_name(name: impl Into<Cow<'static, str>>) -> Self {
        SpanBuilder {
            name: name.into(),
            span_kind: None,
            attributes: None,
            no_parent: false,
        }
    }

    /// Specify the span kind.
    pub fn with_kind(self, span_kind: SpanKind) -> Self {
        SpanBuilder {
            span_kind: Some(span_kind),
            ..self
        }
    }

    /// Assign initial attributes.
    pub fn with_attributes<I>(self, attributes: I) -> Self
    where
        I: IntoIterator<Item = KeyValue>,
    {
        SpanBuilder {
            attributes: Some(attributes.into_iter().collect()),
            ..self
        }
    }

    /// Start a new trace regardless of any active span.
    pub fn with_no_parent(self) -> Self {
        SpanBuilder {
            no_parent: true,
            ..self
        }
    }

    /// Builds a span with this builder, parented to the current context.
    pub fn start(self, tracer: &Tracer) -> Span {
        Context::map_current(|cx| tracer.build_with_context(self, cx))
    }

    /// Builds a span with this builder, parented to `parent_cx`.
    pub fn start_with_context(self, tracer: &Tracer, parent_cx: &Context) -> Span {
        tracer.build_with_context(self, parent_cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{
        mark_span_as_active, InMemorySpanExporter, IncrementIdGenerator, TraceId,
    };
    use crate::Status;

    fn test_tracer() -> (Tracer, InMemorySpanExporter) {
        let exporter = InMemorySpanExporter::default();
        let provider = TracerProvider::builder()
            .with_exporter(exporter.clone())
            .with_id_generator(IncrementIdGenerator::new())
            .build();
        (provider.tracer("test"), exporter)
    }

    #[test]
    fn root_span_starts_a_new_trace() {
        let (tracer, exporter) = test_tracer();

        drop(tracer.start("root"));

        let spans = exporter.finished_spans().unwrap();
        assert_eq!(spans.len(), 1);
        assert!(spans[0].is_root());
        assert!(spans[0].span_context.is_valid());
        assert!(spans[0].span_context.trace_flags().is_sampled());
    }

    #[test]
    fn child_inherits_trace_and_parent_ids() {
        let (tracer, exporter) = test_tracer();

        let parent = tracer.start("parent");
        let parent_context = parent.span_context().clone();
        {
            let _guard = mark_span_as_active(parent);
            drop(tracer.start("child"));
        }

        let spans = exporter.finished_spans().unwrap();
        let child = spans.iter().find(|s| s.name == "child").unwrap();
        assert_eq!(child.span_context.trace_id(), parent_context.trace_id());
        assert_eq!(child.parent_span_id, parent_context.span_id());
        assert_ne!(child.span_context.span_id(), parent_context.span_id());
    }

    #[test]
    fn remote_parent_is_adopted() {
        let (tracer, exporter) = test_tracer();

        let remote = SpanContext::new(
            TraceId::from(0xabcdefu128),
            SpanId::from(0x1234u64),
            TraceFlags::SAMPLED,
            true,
        );
        let cx = Context::new().with_remote_span_context(remote.clone());
        drop(tracer.start_with_context("server_side", &cx));

        let spans = exporter.finished_spans().unwrap();
        assert_eq!(spans[0].span_context.trace_id(), remote.trace_id());
        assert_eq!(spans[0].parent_span_id, remote.span_id());
    }

    #[test]
    fn no_parent_ignores_active_span() {
        let (tracer, exporter) = test_tracer();

        let parent = tracer.start("parent");
        let parent_trace = parent.span_context().trace_id();
        {
            let _guard = mark_span_as_active(parent);
            drop(tracer.span_builder("detached").with_no_parent().start(&tracer));
        }

        let spans = exporter.finished_spans().unwrap();
        let detached = spans.iter().find(|s| s.name == "detached").unwrap();
        assert!(detached.is_root());
        assert_ne!(detached.span_context.trace_id(), parent_trace);
    }

    #[test]
    fn in_span_ends_the_span() {
        let (tracer, exporter) = test_tracer();

        let trace_id = tracer.in_span("scoped", |cx| {
            cx.span().set_attribute(KeyValue::new("step", 1i64));
            cx.span().set_status(Status::Ok);
            cx.span().span_context().trace_id()
        });

        let spans = exporter.finished_spans().unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].span_context.trace_id(), trace_id);
        assert_eq!(spans[0].status, Status::Ok);
        assert_eq!(spans[0].attributes, vec![KeyValue::new("step", 1i64)]);
    }

    #[test]
    fn builder_kind_and_attributes_are_recorded() {
        let (tracer, exporter) = test_tracer();

        drop(
            tracer
                .span_builder("outbound")
                .with_kind(SpanKind::Client)
                .with_attributes([KeyValue::new("http.method", "GET")])
                .start(&tracer),
        );

        let spans = exporter.finished_spans().unwrap();
        assert_eq!(spans[0].span_kind, SpanKind::Client);
        assert_eq!(spans[0].attributes, vec![KeyValue::new("http.method", "GET")]);
    }
}
