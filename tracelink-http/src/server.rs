//! Traced HTTP server plumbing.

use crate::{HeaderExtractor, HttpError};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use tokio::net::TcpListener;
use tracelink::propagation::{TextMapPropagator, TraceContextPropagator};
use tracelink::trace::{SpanKind, TraceContextExt, Tracer};
use tracelink::{classify, FutureContextExt, KeyValue};
use tracing::{debug, warn};

/// The response type produced by traced handlers.
pub type HandlerResponse = Response<Full<Bytes>>;

type BoxedHandlerFuture = Pin<Box<dyn Future<Output = Result<HandlerResponse, Infallible>> + Send>>;

/// Wrap a request handler so every request runs under a server span.
///
/// For each request this extracts the remote parent from the incoming
/// headers, starts a server span under it (or a new trace when the headers
/// carry nothing usable), runs the handler with that span active, and
/// classifies the handler's response status onto the span before ending it.
///
/// The handler itself is infallible; failures are expressed as response
/// status codes and end up on the span through classification.
///
/// A handler that panics unwinds through the wrapper without producing a
/// response: the span still escapes via its drop backstop, but with an
/// unset status, and the connection is torn down by the serving task.
/// Handlers that can fail should say so with a status code instead.
pub fn traced_service<H, F>(
    tracer: Tracer,
    handler: H,
) -> impl Fn(Request<Incoming>) -> BoxedHandlerFuture + Clone
where
    H: Fn(Request<Incoming>) -> F + Clone + Send + Sync + 'static,
    F: Future<Output = HandlerResponse> + Send + 'static,
{
    move |req: Request<Incoming>| {
        let tracer = tracer.clone();
        let handler = handler.clone();

        Box::pin(async move {
            let parent_cx = TraceContextPropagator::new().extract(&HeaderExtractor(req.headers()));

            let span = tracer
                .span_builder(format!("{} {}", req.method(), req.uri().path()))
                .with_kind(SpanKind::Server)
                .with_attributes([
                    KeyValue::new("http.method", req.method().to_string()),
                    KeyValue::new("url.path", req.uri().path().to_string()),
                ])
                .start_with_context(&tracer, &parent_cx);
            let cx = parent_cx.with_span(span);

            let response = handler(req).with_context(cx.clone()).await;

            let status = response.status().as_u16();
            cx.span().set_status(classify(Some(status), None));
            cx.span()
                .set_attribute(KeyValue::new("http.response.status_code", i64::from(status)));
            cx.span().end();

            Ok(response)
        })
    }
}

/// Accept connections on `listener` and serve them with a traced handler.
///
/// Runs until the listener fails; each connection is served on its own
/// task so slow handlers do not stall the accept loop.
pub async fn serve<H, F>(listener: TcpListener, tracer: Tracer, handler: H) -> Result<(), HttpError>
where
    H: Fn(Request<Incoming>) -> F + Clone + Send + Sync + 'static,
    F: Future<Output = HandlerResponse> + Send + 'static,
{
    let service = service_fn(traced_service(tracer, handler));

    loop {
        let (stream, peer) = listener.accept().await?;
        debug!(target: "tracelink_http", %peer, "accepted connection");

        let service = service.clone();
        tokio::spawn(async move {
            if let Err(err) = auto::Builder::new(TokioExecutor::new())
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                warn!(target: "tracelink_http", error = %err, "connection error");
            }
        });
    }
}
