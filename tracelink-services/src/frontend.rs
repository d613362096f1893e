//! The frontend service: relays requests to the backend.

use crate::{query_param, status_response, text_response};
use hyper::body::Incoming;
use hyper::Request;
use tokio::net::TcpListener;
use tracelink::trace::TracerProvider;
use tracelink_http::{serve, HandlerResponse, HttpError, TracedHttpClient};
use tracing::warn;

/// Serve `GET /frontend?action=<action>` on `listener` until it fails.
///
/// Each request is relayed to `backend_url` with the same action; a
/// backend response is mirrored back to the caller, status and body. A
/// request without an action fails fast with a 500 and never reaches the
/// backend, and an unreachable backend coarsens to a 500 with an empty
/// body. The trace records the finer-grained outcome in both cases.
pub async fn run(
    listener: TcpListener,
    provider: TracerProvider,
    backend_url: String,
) -> Result<(), HttpError> {
    let tracer = provider.tracer("frontend");
    let client = TracedHttpClient::new(provider.tracer("frontend"));
    serve(listener, tracer, move |req| {
        let client = client.clone();
        let backend_url = backend_url.clone();
        async move { handle(req, &client, &backend_url).await }
    })
    .await
}

/// Handle one frontend request.
pub async fn handle(
    req: Request<Incoming>,
    client: &TracedHttpClient,
    backend_url: &str,
) -> HandlerResponse {
    if req.uri().path() != "/frontend" {
        return status_response(404);
    }

    let action = match query_param(req.uri().query(), "action") {
        Some(action) => action,
        None => {
            warn!(target: "frontend", "request without action parameter");
            return status_response(500);
        }
    };

    let result = client.get(&format!("{backend_url}?action={action}")).await;
    if result.status == 0 {
        // No response from the backend at all.
        warn!(target: "frontend", "backend unreachable");
        return status_response(500);
    }

    text_response(result.status, result.body)
}
