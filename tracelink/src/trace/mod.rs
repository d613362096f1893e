//! The span API and the pieces that record, identify and export spans.
//!
//! A trace models a single logical request as a tree of [`Span`]s sharing
//! one [`TraceId`]. Spans are started from a [`Tracer`], which is obtained
//! from a [`TracerProvider`] built once at startup and passed to every
//! component that instruments work. Finished spans are handed to the
//! provider's [`SpanExporter`].
//!
//! ## Relationship between contexts and spans
//!
//! A [`Context`] optionally carries one active span. Starting a span does
//! not make it active; use [`TraceContextExt::with_span`] to derive a
//! context carrying it, or [`mark_span_as_active`] to additionally install
//! that context on the current thread:
//!
//! ```
//! use tracelink::trace::{mark_span_as_active, TracerProvider};
//! use tracelink::Context;
//!
//! let provider = TracerProvider::builder().build();
//! let tracer = provider.tracer("app");
//!
//! let parent = tracer.start("parent");
//! {
//!     let _guard = mark_span_as_active(parent);
//!     // Spans started here become children of `parent`.
//!     let child = tracer.start("child");
//!     drop(child);
//! }
//! assert!(!Context::current().has_span());
//! ```
//!
//! [`Context`]: crate::Context

use std::sync::PoisonError;
use thiserror::Error;

pub(crate) mod context;
mod export;
mod id_generator;
mod provider;
mod span;
mod span_context;
mod tracer;

pub use context::{get_active_span, mark_span_as_active, SpanRef, TraceContextExt};
pub use export::{InMemorySpanExporter, LoggingSpanExporter, SpanData, SpanExporter};
pub use id_generator::{IdGenerator, IncrementIdGenerator, RandomIdGenerator};
pub use provider::{Builder, TracerProvider};
pub use span::{Span, SpanKind};
pub use span_context::{SpanContext, SpanId, TraceFlags, TraceId};
pub use tracer::{SpanBuilder, Tracer};

/// Describe the result of operations in tracing API.
pub type TraceResult<T> = Result<T, TraceError>;

/// Errors returned by the trace API.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TraceError {
    /// Export failed with the error returned by the exporter.
    #[error("Exporter error: {0}")]
    ExportFailed(String),

    /// Operation on an already shut down provider.
    #[error("TracerProvider already shutdown")]
    AlreadyShutdown,

    /// Mutex lock poisoning.
    #[error("mutex lock poisoning for {0}")]
    LockPoisoned(&'static str),
}

impl<T> From<PoisonError<T>> for TraceError {
    fn from(_: PoisonError<T>) -> Self {
        TraceError::LockPoisoned("span data")
    }
}
