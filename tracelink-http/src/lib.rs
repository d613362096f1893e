//! HTTP instrumentation for [`tracelink`].
//!
//! Bridges the propagation API to [`http`] header maps and wraps hyper's
//! client and server so every request carries, and every handler inherits,
//! the active trace context.

#[doc(no_inline)]
pub use bytes::Bytes;
#[doc(no_inline)]
pub use http::{Request, Response};

use tracelink::propagation::{Extractor, Injector};

mod client;
mod server;

pub use client::{HttpResult, TracedHttpClient};
pub use server::{serve, traced_service, HandlerResponse};

/// Errors from the HTTP transport layer.
pub type HttpError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Helper for injecting trace context into the headers of an outgoing HTTP
/// request.
pub struct HeaderInjector<'a>(pub &'a mut http::HeaderMap);

impl Injector for HeaderInjector<'_> {
    /// Set a key and value in the HeaderMap. Does nothing if the key or
    /// value are not valid inputs.
    fn set(&mut self, key: &str, value: String) {
        if let Ok(name) = http::header::HeaderName::from_bytes(key.as_bytes()) {
            if let Ok(val) = http::header::HeaderValue::from_str(&value) {
                self.0.insert(name, val);
            }
        }
    }
}

/// Helper for extracting trace context from the headers of an incoming HTTP
/// request.
pub struct HeaderExtractor<'a>(pub &'a http::HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    /// Get a value for a key from the HeaderMap. If the value is not valid
    /// ASCII, returns None.
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    /// Collect all the keys from the HeaderMap.
    fn keys(&self) -> Vec<&str> {
        self.0
            .keys()
            .map(|value| value.as_str())
            .collect::<Vec<_>>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracelink::propagation::{TextMapPropagator, TraceContextPropagator};
    use tracelink::trace::{SpanContext, SpanId, TraceContextExt, TraceFlags, TraceId};
    use tracelink::Context;

    #[test]
    fn http_headers_get() {
        let mut carrier = http::HeaderMap::new();
        HeaderInjector(&mut carrier).set("headerName", "value".to_string());

        assert_eq!(
            HeaderExtractor(&carrier).get("HEADERNAME"),
            Some("value"),
            "case insensitive extraction"
        )
    }

    #[test]
    fn http_headers_keys() {
        let mut carrier = http::HeaderMap::new();
        HeaderInjector(&mut carrier).set("headerName1", "value1".to_string());
        HeaderInjector(&mut carrier).set("headerName2", "value2".to_string());

        let extractor = HeaderExtractor(&carrier);
        let got = extractor.keys();
        assert_eq!(got.len(), 2);
        assert!(got.contains(&"headername1"));
        assert!(got.contains(&"headername2"));
    }

    #[test]
    fn invalid_header_values_are_dropped() {
        let mut carrier = http::HeaderMap::new();
        HeaderInjector(&mut carrier).set("bad value\n", "x".to_string());
        HeaderInjector(&mut carrier).set("key", "bad\nvalue".to_string());

        assert!(carrier.is_empty());
    }

    #[test]
    fn propagates_through_header_map() {
        let propagator = TraceContextPropagator::new();
        let cx = Context::new().with_remote_span_context(SpanContext::new(
            TraceId::from(0xdeadbeefu128),
            SpanId::from(0x42u64),
            TraceFlags::SAMPLED,
            false,
        ));

        let mut headers = http::HeaderMap::new();
        propagator.inject_context(&cx, &mut HeaderInjector(&mut headers));
        let extracted = propagator.extract(&HeaderExtractor(&headers));

        assert_eq!(
            extracted.span().span_context().trace_id(),
            TraceId::from(0xdeadbeefu128)
        );
        assert_eq!(
            extracted.span().span_context().span_id(),
            SpanId::from(0x42u64)
        );
    }
}
