use crate::Context;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::Context as TaskContext;
use std::task::Poll;

pin_project! {
    /// A future paired with the context captured when it was created.
    ///
    /// The captured context is attached for the duration of every poll and
    /// detached afterwards, so spans started inside the future parent
    /// correctly even though the future may execute on another thread.
    #[derive(Clone, Debug)]
    pub struct WithContext<T> {
        #[pin]
        inner: T,
        cx: Context,
    }
}

impl<T: std::future::Future> std::future::Future for WithContext<T> {
    type Output = T::Output;

    fn poll(self: Pin<&mut Self>, task_cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let _guard = this.cx.clone().attach();

        this.inner.poll(task_cx)
    }
}

impl<F: std::future::Future> FutureContextExt for F {}

/// Extension trait for handing a context across an async boundary.
///
/// Submitting work to an executor is a message-passing boundary: the ambient
/// context does not follow the task implicitly, so the submitter must
/// capture it and pair it with the task body.
///
/// ```
/// use tracelink::{Context, FutureContextExt};
///
/// async fn traced_work() { /* spans started here see the captured parent */ }
///
/// # async fn demo() {
/// let task = traced_work().with_context(Context::current());
/// # drop(task);
/// # }
/// ```
pub trait FutureContextExt: Sized {
    /// Attaches the provided [`Context`] to this future.
    fn with_context(self, cx: Context) -> WithContext<Self> {
        WithContext { inner: self, cx }
    }

    /// Attaches the current [`Context`] to this future.
    fn with_current_context(self) -> WithContext<Self> {
        self.with_context(Context::current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{SpanContext, SpanId, TraceContextExt, TraceFlags, TraceId};

    fn remote_context(trace_id: u128) -> Context {
        Context::new().with_remote_span_context(SpanContext::new(
            TraceId::from(trace_id),
            SpanId::from(1u64),
            TraceFlags::SAMPLED,
            true,
        ))
    }

    #[tokio::test]
    async fn captured_context_visible_inside_future() {
        let seen = async {
            Context::map_current(|cx| cx.span().span_context().trace_id())
        }
        .with_context(remote_context(42))
        .await;

        assert_eq!(seen, TraceId::from(42u128));
        // Released after the future completes.
        assert!(!Context::current().has_span());
    }

    #[tokio::test]
    async fn context_restored_between_polls() {
        let handle = tokio::spawn(
            async {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                Context::map_current(|cx| cx.has_span())
            }
            .with_context(remote_context(7)),
        );

        assert!(handle.await.unwrap());
        assert!(!Context::current().has_span());
    }
}
