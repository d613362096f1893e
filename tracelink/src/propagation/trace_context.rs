//! W3C Trace Context propagator.

use crate::propagation::{Extractor, Injector, TextMapPropagator};
use crate::trace::{SpanContext, SpanId, TraceContextExt, TraceFlags, TraceId};
use crate::Context;

const SUPPORTED_VERSION: u8 = 0;
const MAX_VERSION: u8 = 254;
const TRACEPARENT_HEADER: &str = "traceparent";

const TRACE_CONTEXT_HEADER_FIELDS: &[&str] = &[TRACEPARENT_HEADER];

/// Propagates span identity as a [W3C `traceparent`] header.
///
/// The value packs version, trace id, parent span id and flags into one
/// dash-separated lowercase-hex string:
///
/// `00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01`
///
/// Injection always writes version 0. Extraction accepts versions up to
/// 254, passing over fields a newer version may append, and masks the
/// flags down to the sampled bit. A missing or malformed header degrades
/// to "no parent": the extracted context comes back unchanged. The
/// optional `tracestate` companion header is not carried.
///
/// [W3C `traceparent`]: https://www.w3.org/TR/trace-context/
#[derive(Clone, Debug, Default)]
pub struct TraceContextPropagator {
    _private: (),
}

impl TraceContextPropagator {
    /// Create a new `TraceContextPropagator`.
    pub fn new() -> Self {
        TraceContextPropagator { _private: () }
    }

    /// Parse and validate the carrier's `traceparent` value.
    fn extract_span_context(&self, extractor: &dyn Extractor) -> Result<SpanContext, ()> {
        let header = extractor.get(TRACEPARENT_HEADER).unwrap_or("").trim();
        let parts = header.split_terminator('-').collect::<Vec<&str>>();
        if parts.len() < 4 {
            return Err(());
        }

        // Version 0 carries exactly four fields; later versions may append
        // more, which are passed over.
        let version = u8::from_str_radix(parts[0], 16).map_err(|_| ())?;
        if version > MAX_VERSION || version == 0 && parts.len() != 4 {
            return Err(());
        }

        // The ids must be lowercase on the wire; `from_hex` alone would
        // also admit uppercase.
        if parts[1..3]
            .iter()
            .any(|part| part.bytes().any(|b| b.is_ascii_uppercase()))
        {
            return Err(());
        }
        let trace_id = TraceId::from_hex(parts[1]).map_err(|_| ())?;
        let span_id = SpanId::from_hex(parts[2]).map_err(|_| ())?;

        let flags = u8::from_str_radix(parts[3], 16).map_err(|_| ())?;
        if version == 0 && flags > 2 {
            return Err(());
        }

        // Only the sampled bit is defined; anything else is dropped here.
        let trace_flags = TraceFlags::new(flags) & TraceFlags::SAMPLED;

        let span_context = SpanContext::new(trace_id, span_id, trace_flags, true);
        if span_context.is_valid() {
            Ok(span_context)
        } else {
            Err(())
        }
    }
}

impl TextMapPropagator for TraceContextPropagator {
    /// Writes the context's span identity into the carrier, skipping
    /// contexts without a valid span.
    fn inject_context(&self, cx: &Context, injector: &mut dyn Injector) {
        if !cx.has_span() {
            return;
        }
        let span = cx.span();
        let span_context = span.span_context();
        if span_context.is_valid() {
            let header_value = format!(
                "{:02x}-{}-{}-{:02x}",
                SUPPORTED_VERSION,
                span_context.trace_id(),
                span_context.span_id(),
                span_context.trace_flags() & TraceFlags::SAMPLED
            );
            injector.set(TRACEPARENT_HEADER, header_value);
        }
    }

    /// Reads the carrier and, when it holds a well-formed identity,
    /// derives a context from `cx` with that identity as a remote parent.
    /// Otherwise `cx` comes back unchanged.
    fn extract_with_context(&self, cx: &Context, extractor: &dyn Extractor) -> Context {
        self.extract_span_context(extractor)
            .map(|sc| cx.with_remote_span_context(sc))
            .unwrap_or_else(|_| cx.clone())
    }

    fn fields(&self) -> &[&'static str] {
        TRACE_CONTEXT_HEADER_FIELDS
    }
}
