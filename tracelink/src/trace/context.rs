//! Context extensions for tracing: tying spans to the ambient [`Context`].

use crate::trace::{Span, SpanContext};
use crate::{classify, Context, ContextGuard, KeyValue, Status};
use std::error::Error;
use std::sync::{Mutex, OnceLock};
use tracing::warn;

static NOOP_SPAN: OnceLock<SynchronizedSpan> = OnceLock::new();

/// A reference to the currently active span in this context, holding either
/// a locally recorded span or the propagated identity of a remote one.
#[derive(Debug)]
pub(crate) struct SynchronizedSpan {
    /// Immutable span context, always available.
    span_context: SpanContext,
    /// Mutable span, present when the span is recorded locally.
    inner: Option<Mutex<Span>>,
}

impl SynchronizedSpan {
    pub(crate) fn from_span(span: Span) -> Self {
        SynchronizedSpan {
            span_context: span.span_context().clone(),
            inner: Some(Mutex::new(span)),
        }
    }

    pub(crate) fn from_span_context(span_context: SpanContext) -> Self {
        SynchronizedSpan {
            span_context,
            inner: None,
        }
    }

    pub(crate) fn span_context(&self) -> &SpanContext {
        &self.span_context
    }

    fn noop() -> &'static SynchronizedSpan {
        NOOP_SPAN.get_or_init(|| SynchronizedSpan::from_span_context(SpanContext::empty_context()))
    }
}

/// A reference to the span held by a context.
///
/// Operations that mutate the underlying span are no-ops when the context
/// carries only a remote span identity or no span at all.
#[derive(Debug)]
pub struct SpanRef<'a>(&'a SynchronizedSpan);

impl SpanRef<'_> {
    fn with_inner_mut<F: FnOnce(&mut Span)>(&self, f: F) {
        if let Some(ref inner) = self.0.inner {
            match inner.lock() {
                Ok(mut locked) => f(&mut locked),
                Err(err) => warn!(
                    target: "tracelink",
                    error = %err,
                    "span lock poisoned, operation dropped"
                ),
            }
        }
    }

    /// The identity of the referenced span.
    pub fn span_context(&self) -> &SpanContext {
        &self.0.span_context
    }

    /// Returns `true` if the referenced span records data locally.
    pub fn is_recording(&self) -> bool {
        self.0.inner.is_some()
    }

    /// Set an attribute on the referenced span.
    pub fn set_attribute(&self, attribute: KeyValue) {
        self.with_inner_mut(move |inner| inner.set_attribute(attribute))
    }

    /// Set the status of the referenced span.
    pub fn set_status(&self, status: Status) {
        self.with_inner_mut(move |inner| inner.set_status(status))
    }

    /// Replace the name of the referenced span.
    pub fn update_name(&self, name: impl Into<std::borrow::Cow<'static, str>>) {
        let name = name.into();
        self.with_inner_mut(move |inner| inner.update_name(name))
    }

    /// Record an error on the referenced span as an error status.
    pub fn record_error(&self, err: &dyn Error) {
        self.with_inner_mut(move |inner| {
            inner.set_status(classify(None, Some(err)));
        })
    }

    /// End the referenced span.
    pub fn end(&self) {
        self.with_inner_mut(|inner| inner.end())
    }
}

/// Methods for storing and retrieving trace data in a [`Context`].
pub trait TraceContextExt {
    /// Returns a clone of the current context with the included [`Span`].
    ///
    /// This is useful for building tracers.
    fn current_with_span(span: Span) -> Self;

    /// Returns a clone of this context with the included span.
    ///
    /// This is useful for building tracers.
    fn with_span(&self, span: Span) -> Self;

    /// Returns a reference to this context's span, or an invalid default
    /// span if it does not have one.
    fn span(&self) -> SpanRef<'_>;

    /// Used to see if a span has been marked as active.
    fn has_active_span(&self) -> bool;

    /// Returns a copy of this context with the span context included.
    ///
    /// This is useful for propagators extracting a span context from an
    /// incoming request.
    fn with_remote_span_context(&self, span_context: SpanContext) -> Self;
}

impl TraceContextExt for Context {
    fn current_with_span(span: Span) -> Self {
        Context::current_with_synchronized_span(SynchronizedSpan::from_span(span))
    }

    fn with_span(&self, span: Span) -> Self {
        self.with_synchronized_span(SynchronizedSpan::from_span(span))
    }

    fn span(&self) -> SpanRef<'_> {
        if let Some(span) = self.span.as_ref() {
            SpanRef(span)
        } else {
            SpanRef(SynchronizedSpan::noop())
        }
    }

    fn has_active_span(&self) -> bool {
        self.has_span()
    }

    fn with_remote_span_context(&self, span_context: SpanContext) -> Self {
        self.with_synchronized_span(SynchronizedSpan::from_span_context(span_context))
    }
}

/// Mark a given `Span` as active.
///
/// A span is active until the returned guard is dropped; while it is, spans
/// started on this thread parent to it. Prefer scoping the guard tightly
/// over holding it across unrelated work.
///
/// # Examples
///
/// ```
/// use tracelink::trace::{mark_span_as_active, TracerProvider};
/// use tracelink::Context;
///
/// let provider = TracerProvider::builder().build();
/// let tracer = provider.tracer("app");
///
/// let span = tracer.start("handle_request");
/// {
///     let _guard = mark_span_as_active(span);
///     // do work in the context of the request span...
/// }
/// assert!(!Context::current().has_span());
/// ```
#[must_use = "Dropping the guard detaches the context."]
pub fn mark_span_as_active(span: Span) -> ContextGuard {
    let cx = Context::current_with_span(span);
    cx.attach()
}

/// Executes a closure with a reference to this thread's current span.
///
/// # Examples
///
/// ```
/// use tracelink::trace::get_active_span;
/// use tracelink::KeyValue;
///
/// get_active_span(|span| {
///     span.set_attribute(KeyValue::new("request_count", 7i64));
/// });
/// ```
pub fn get_active_span<F, T>(f: F) -> T
where
    F: FnOnce(SpanRef<'_>) -> T,
{
    Context::map_current(|cx| f(cx.span()))
}
