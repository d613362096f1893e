//! The load generator: the root of every demo trace.

use rand::Rng;
use std::time::Duration;
use tracelink::trace::{SpanKind, TraceContextExt, Tracer, TracerProvider};
use tracelink::{classify, Context, FutureContextExt, KeyValue};
use tracelink_http::TracedHttpClient;
use tracing::info;

const OPERATIONS: [&str; 4] = [
    "action=increment",
    "action=decrement",
    "action=get",
    "action=set",
];

/// Fire one request per `interval` at the frontend, forever.
///
/// Each tick opens a new root span, so every generated request becomes its
/// own trace through the chain. Ticks are serialized: a slow chain delays
/// the next tick rather than overlapping with it.
pub async fn run(provider: TracerProvider, frontend_url: String, interval: Duration) {
    let tracer = provider.tracer("loadgen");
    let client = TracedHttpClient::new(provider.tracer("loadgen"));
    let mut ticker = tokio::time::interval(interval);
    let mut request_count: i64 = 0;

    loop {
        ticker.tick().await;
        let operation = OPERATIONS[rand::rng().random_range(0..OPERATIONS.len())];
        tick(&tracer, &client, &frontend_url, operation, request_count).await;
        request_count += 1;
    }
}

/// Send one traced request at the frontend.
///
/// The root span is named after the operation query string and explicitly
/// parentless: each tick is its own trace, never a child of the previous
/// one.
pub async fn tick(
    tracer: &Tracer,
    client: &TracedHttpClient,
    frontend_url: &str,
    operation: &'static str,
    request_count: i64,
) {
    let span = tracer
        .span_builder(operation)
        .with_kind(SpanKind::Internal)
        .with_no_parent()
        .with_attributes([KeyValue::new("request_count", request_count)])
        .start(tracer);
    let cx = Context::current_with_span(span);

    let result = client
        .get(&format!("{frontend_url}?{operation}"))
        .with_context(cx.clone())
        .await;

    let code = (result.status != 0).then_some(result.status);
    cx.span().set_status(classify(code, None));
    cx.span().end();

    info!(
        target: "loadgen",
        request_count,
        operation,
        status = result.status,
        body = %result.body,
        "request completed"
    );
}
