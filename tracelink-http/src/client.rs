//! Traced HTTP client.

use crate::{HeaderInjector, HttpError};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use std::time::Duration;
use tracelink::propagation::{TextMapPropagator, TraceContextPropagator};
use tracelink::trace::{SpanKind, TraceContextExt, Tracer};
use tracelink::{classify, Context, KeyValue};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// The observed outcome of an HTTP request.
///
/// A status of `0` means no response was obtained at all: the connection
/// failed, timed out, or the URL never parsed. Callers can branch on the
/// status without handling a separate error channel; the failure detail
/// lives on the emitted span.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResult {
    /// Response status code, `0` if no response was obtained.
    pub status: u16,
    /// Response body, empty if no response was obtained.
    pub body: String,
}

impl HttpResult {
    fn absent() -> Self {
        HttpResult {
            status: 0,
            body: String::new(),
        }
    }

    /// Returns `true` for statuses in `[200, 400)`.
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

/// An HTTP client that wraps every request in a client span and injects the
/// trace context into the outgoing headers.
///
/// The request span parents to the caller's current context, so a client
/// used inside an active server span stitches the outgoing hop into the
/// incoming trace.
#[derive(Clone, Debug)]
pub struct TracedHttpClient {
    inner: Client<HttpConnector, Full<Bytes>>,
    propagator: TraceContextPropagator,
    tracer: Tracer,
    timeout: Duration,
}

impl TracedHttpClient {
    /// Create a client that reports its spans through `tracer`.
    pub fn new(tracer: Tracer) -> Self {
        TracedHttpClient {
            inner: Client::builder(TokioExecutor::new()).build_http(),
            propagator: TraceContextPropagator::new(),
            tracer,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Replace the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Perform a GET request against `url`.
    ///
    /// The request span is named after the URL path. Infallible at the
    /// call site: transport failures come back as an [`HttpResult`] with
    /// status `0` and an empty body, and are recorded on the request span.
    pub async fn get(&self, url: &str) -> HttpResult {
        let span = self
            .tracer
            .span_builder(request_path(url))
            .with_kind(SpanKind::Client)
            .with_attributes([
                KeyValue::new("http.method", "GET"),
                KeyValue::new("url.full", url.to_string()),
            ])
            .start(&self.tracer);
        let cx = Context::current_with_span(span);

        let result = match self.send(url, &cx).await {
            Ok((status, body)) => {
                cx.span().set_status(classify(Some(status), None));
                cx.span()
                    .set_attribute(KeyValue::new("http.response.status_code", i64::from(status)));
                HttpResult { status, body }
            }
            Err(err) => {
                cx.span().set_status(classify(None, Some(err.as_ref())));
                HttpResult::absent()
            }
        };
        cx.span().end();

        result
    }

    async fn send(&self, url: &str, cx: &Context) -> Result<(u16, String), HttpError> {
        let uri: hyper::Uri = url.parse()?;
        if let Some(scheme) = uri.scheme_str() {
            cx.span()
                .set_attribute(KeyValue::new("url.scheme", scheme.to_string()));
        }
        if let Some(host) = uri.host() {
            cx.span()
                .set_attribute(KeyValue::new("server.address", host.to_string()));
        }

        let mut req = hyper::Request::builder()
            .method(hyper::Method::GET)
            .uri(uri)
            .body(Full::new(Bytes::new()))?;
        self.propagator
            .inject_context(cx, &mut HeaderInjector(req.headers_mut()));

        let response = tokio::time::timeout(self.timeout, self.inner.request(req)).await??;
        let status = response.status().as_u16();
        let body = response.into_body().collect().await?.to_bytes();

        Ok((status, String::from_utf8_lossy(&body).into_owned()))
    }
}

/// Span name for a request: the URL path, or the raw input when it does
/// not parse (the send path then records the parse failure).
fn request_path(url: &str) -> String {
    url.parse::<hyper::Uri>()
        .map(|uri| uri.path().to_string())
        .unwrap_or_else(|_| url.to_string())
}
