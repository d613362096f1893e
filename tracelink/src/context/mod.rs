//! Execution-scoped context propagation.
//!
//! A [`Context`] carries the identity of the currently active span along the
//! call chain. Within a thread, propagation is ambient: attaching a context
//! makes it the thread's current one until the returned [`ContextGuard`] is
//! dropped, which restores the previous context even when the enclosed code
//! panics. Across task or thread boundaries, propagation is explicit: the
//! submitter captures the current context as a value and re-installs it on
//! the executing side (see [`FutureContextExt`]).

use crate::trace::context::SynchronizedSpan;
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::warn;

mod future_ext;

pub use future_ext::{FutureContextExt, WithContext};

thread_local! {
    static CURRENT_CONTEXT: RefCell<ContextStack> = RefCell::new(ContextStack::default());
}

/// An immutable, execution-scoped handle to the currently active span.
///
/// Contexts are values: deriving a child context (for example via
/// [`with_span`]) creates a new context and never mutates the parent. The
/// empty context carries no span; spans started under it begin a new trace.
///
/// [`with_span`]: crate::trace::TraceContextExt::with_span
///
/// # Examples
///
/// ```
/// use tracelink::Context;
///
/// // No span is active by default.
/// assert!(!Context::current().has_span());
///
/// let cx = Context::new();
/// {
///     let _guard = cx.attach();
///     // `cx` is now this thread's current context...
/// }
/// // ...and the previous context is restored here.
/// ```
#[derive(Clone, Default)]
pub struct Context {
    pub(crate) span: Option<Arc<SynchronizedSpan>>,
}

impl Context {
    /// Creates an empty `Context`.
    pub fn new() -> Self {
        Context::default()
    }

    /// Returns a snapshot of the current thread's context.
    pub fn current() -> Self {
        Self::map_current(|cx| cx.clone())
    }

    /// Applies a function to the current context, returning its value.
    ///
    /// Avoids cloning the current context when only a lookup is needed.
    pub fn map_current<T>(f: impl FnOnce(&Context) -> T) -> T {
        CURRENT_CONTEXT.with(|cx| cx.borrow().map_current_cx(f))
    }

    /// Returns `true` if this context holds a span reference.
    pub fn has_span(&self) -> bool {
        self.span.is_some()
    }

    /// Replaces the current context on this thread with this context.
    ///
    /// Dropping the returned [`ContextGuard`] restores the previous context,
    /// on every exit path including unwinding. Guards dropped out of order
    /// are tolerated: a non-top guard clears its own slot and the stack is
    /// compacted when the top is popped.
    pub fn attach(self) -> ContextGuard {
        let pos = CURRENT_CONTEXT.with(|cx| cx.borrow_mut().push(self));

        ContextGuard {
            pos,
            _marker: PhantomData,
        }
    }

    pub(crate) fn with_synchronized_span(&self, value: SynchronizedSpan) -> Self {
        Context {
            span: Some(Arc::new(value)),
        }
    }

    pub(crate) fn current_with_synchronized_span(value: SynchronizedSpan) -> Self {
        // The only context state is the span slot, so deriving from the
        // current context reduces to replacing it.
        Context {
            span: Some(Arc::new(value)),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("Context");
        match &self.span {
            Some(span) => dbg.field("span", span.span_context()),
            None => dbg.field("span", &"None"),
        };
        dbg.finish()
    }
}

/// A guard that restores the prior context when dropped.
#[derive(Debug)]
pub struct ContextGuard {
    // Position of the replaced context in the thread's stack.
    pos: u16,
    // Relies on thread locals, must not cross threads.
    _marker: PhantomData<*const ()>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        if self.pos > ContextStack::BASE_POS && self.pos < ContextStack::OVERFLOW_POS {
            CURRENT_CONTEXT.with(|stack| stack.borrow_mut().pop_pos(self.pos));
        }
    }
}

/// Tracks the contexts attached to this thread.
///
/// The current context is kept out of the stack for cheap access; attached
/// predecessors are stored by position so that guards can be dropped out of
/// order without corrupting restoration.
struct ContextStack {
    current_cx: Context,
    stack: Vec<Option<Context>>,
}

impl ContextStack {
    const BASE_POS: u16 = 0;
    const OVERFLOW_POS: u16 = u16::MAX;

    #[inline]
    fn push(&mut self, cx: Context) -> u16 {
        // Position 0 is reserved for the always-present base context.
        let next_pos = self.stack.len() + 1;
        if next_pos >= ContextStack::OVERFLOW_POS.into() {
            warn!(
                target: "tracelink",
                limit = ContextStack::OVERFLOW_POS,
                "too many attached contexts, attach ignored"
            );
            return ContextStack::OVERFLOW_POS;
        }
        let previous = std::mem::replace(&mut self.current_cx, cx);
        self.stack.push(Some(previous));
        next_pos as u16
    }

    #[inline]
    fn pop_pos(&mut self, pos: u16) {
        let len = self.stack.len() as u16;
        if pos > len {
            warn!(
                target: "tracelink",
                position = pos,
                stack_length = len,
                "context guard dropped past the end of the stack"
            );
            return;
        }
        if pos == len {
            // Drop any slots vacated by earlier out-of-order drops, then
            // restore the nearest live predecessor.
            while let Some(None) = self.stack.last() {
                let _ = self.stack.pop();
            }
            if let Some(Some(previous)) = self.stack.pop() {
                self.current_cx = previous;
            }
        } else {
            // Out of order drop. The context this guard installed was saved
            // one slot up by the next attach; it is dead now, so vacate it.
            // Restoration happens when the top is popped.
            let _ = self.stack[pos as usize].take();
        }
    }

    #[inline]
    fn map_current_cx<T>(&self, f: impl FnOnce(&Context) -> T) -> T {
        f(&self.current_cx)
    }
}

impl Default for ContextStack {
    fn default() -> Self {
        ContextStack {
            current_cx: Context::default(),
            stack: Vec::with_capacity(8),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{SpanContext, SpanId, TraceContextExt, TraceFlags, TraceId};

    fn remote_context(trace_id: u128, span_id: u64) -> Context {
        Context::new().with_remote_span_context(SpanContext::new(
            TraceId::from(trace_id),
            SpanId::from(span_id),
            TraceFlags::SAMPLED,
            true,
        ))
    }

    fn current_trace_id() -> Option<TraceId> {
        Context::map_current(|cx| {
            cx.has_span().then(|| cx.span().span_context().trace_id())
        })
    }

    #[test]
    fn attach_and_restore() {
        assert_eq!(current_trace_id(), None);
        {
            let _guard = remote_context(1, 1).attach();
            assert_eq!(current_trace_id(), Some(TraceId::from(1u128)));
            {
                let _inner = remote_context(2, 2).attach();
                assert_eq!(current_trace_id(), Some(TraceId::from(2u128)));
            }
            assert_eq!(current_trace_id(), Some(TraceId::from(1u128)));
        }
        assert_eq!(current_trace_id(), None);
    }

    #[test]
    fn restore_on_panic() {
        let result = std::panic::catch_unwind(|| {
            let _guard = remote_context(7, 7).attach();
            panic!("boom");
        });
        assert!(result.is_err());
        assert_eq!(current_trace_id(), None);
    }

    #[test]
    fn out_of_order_guard_drop() {
        let outer = remote_context(1, 1).attach();
        let inner = remote_context(2, 2).attach();

        // Dropping the outer guard first must not restore anything yet.
        drop(outer);
        assert_eq!(current_trace_id(), Some(TraceId::from(2u128)));

        // Dropping the top guard restores to the base context, skipping the
        // vacated slot.
        drop(inner);
        assert_eq!(current_trace_id(), None);
    }

    #[test]
    fn interleaved_guard_drops_restore_live_predecessors() {
        let g1 = remote_context(1, 1).attach();
        let g2 = remote_context(2, 2).attach();
        let g3 = remote_context(3, 3).attach();

        // A lower guard's context dies without disturbing the top.
        drop(g1);
        assert_eq!(current_trace_id(), Some(TraceId::from(3u128)));

        // Popping the top restores the nearest live context, not a dead one.
        drop(g3);
        assert_eq!(current_trace_id(), Some(TraceId::from(2u128)));

        drop(g2);
        assert_eq!(current_trace_id(), None);
    }

    #[test]
    fn map_current_sees_attached_value() {
        let _guard = remote_context(9, 9).attach();
        let seen = Context::map_current(|cx| cx.span().span_context().span_id());
        assert_eq!(seen, SpanId::from(9u64));
    }
}
