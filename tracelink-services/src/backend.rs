//! The backend service: runs store commands on behalf of the frontend.

use crate::{query_param, status_response, text_response};
use hyper::body::Incoming;
use hyper::Request;
use tokio::net::TcpListener;
use tracelink::trace::TracerProvider;
use tracelink::{Context, FutureContextExt};
use tracelink_http::{serve, HandlerResponse, HttpError};
use tracelink_kv::{KvCommands, KvResult};
use tracing::warn;

/// The single key all demo commands operate on.
pub const STORE_KEY: &str = "backend_key";

/// The value stored by the `set` action.
pub const STORE_VALUE: &str = "42";

/// Serve `GET /backend?action={increment|decrement|get|set}` on
/// `listener` until it fails.
///
/// Store commands run on a separate task. The handler captures its current
/// context and pairs it with the task body, so the command's span lands in
/// the request's trace even though it executes elsewhere.
pub async fn run<K>(
    listener: TcpListener,
    provider: TracerProvider,
    kv: K,
) -> Result<(), HttpError>
where
    K: KvCommands + Clone + Send + Sync + 'static,
{
    let tracer = provider.tracer("backend");
    serve(listener, tracer, move |req| {
        let kv = kv.clone();
        async move { handle(req, kv).await }
    })
    .await
}

/// Handle one backend request.
pub async fn handle<K>(req: Request<Incoming>, kv: K) -> HandlerResponse
where
    K: KvCommands + Send + 'static,
{
    if req.uri().path() != "/backend" {
        return status_response(404);
    }

    let action = match query_param(req.uri().query(), "action") {
        Some(action) => action,
        None => {
            warn!(target: "backend", "request without action parameter");
            return status_response(500);
        }
    };

    // Hand the command to a worker task together with the current context;
    // the task boundary would otherwise sever the trace.
    let cx = Context::current();
    let task = tokio::spawn(async move { perform(&kv, &action) }.with_context(cx));

    match task.await {
        Ok(Ok(Some(body))) => text_response(200, body),
        Ok(Ok(None)) => {
            // Unknown action, or a `get` before anything was stored.
            warn!(target: "backend", "no result for request");
            status_response(500)
        }
        Ok(Err(err)) => {
            warn!(target: "backend", error = %err, "store command failed");
            status_response(500)
        }
        Err(err) => {
            warn!(target: "backend", error = %err, "store task failed");
            status_response(500)
        }
    }
}

fn perform<K: KvCommands>(kv: &K, action: &str) -> KvResult<Option<String>> {
    match action {
        "increment" => Ok(Some(kv.incr(STORE_KEY)?.to_string())),
        "decrement" => Ok(Some(kv.decr(STORE_KEY)?.to_string())),
        "get" => kv.get(STORE_KEY),
        "set" => {
            kv.set(STORE_KEY, STORE_VALUE)?;
            Ok(Some("OK".to_string()))
        }
        _ => Ok(None),
    }
}
