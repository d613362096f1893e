//! A small service chain demonstrating end-to-end trace propagation.
//!
//! Three processes form the chain: a load generator fires periodic
//! requests at the frontend, the frontend relays each request to the
//! backend, and the backend runs the requested command against a key-value
//! store. Every hop picks up the caller's trace context, so one load
//! generator tick shows up as a single trace spanning all three services.

use bytes::Bytes;
use http_body_util::Full;
use hyper::Response;
use tracelink_http::HandlerResponse;

pub mod backend;
pub mod config;
pub mod frontend;
pub mod loadgen;

/// Look up a single query-string parameter by name.
///
/// The query is a plain `name=value&name=value` list; values are taken
/// verbatim, no percent-decoding.
pub fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// A response with the given status and body.
pub fn text_response(status: u16, body: impl Into<Bytes>) -> HandlerResponse {
    Response::builder()
        .status(status)
        .body(Full::new(body.into()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

/// An empty-bodied response with the given status.
pub fn status_response(status: u16) -> HandlerResponse {
    text_response(status, Bytes::new())
}

/// Install a process-wide log subscriber, `RUST_LOG`-filterable.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
