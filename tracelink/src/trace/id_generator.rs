//! Trace and span id generation.

use crate::trace::{SpanId, TraceId};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Interface for generating span and trace ids.
pub trait IdGenerator: Send + Sync + fmt::Debug {
    /// Generate a new `TraceId`.
    fn new_trace_id(&self) -> TraceId;

    /// Generate a new `SpanId`.
    fn new_span_id(&self) -> SpanId;
}

/// Default [`IdGenerator`] using random ids.
#[derive(Clone, Debug, Default)]
pub struct RandomIdGenerator {
    _private: (),
}

impl IdGenerator for RandomIdGenerator {
    fn new_trace_id(&self) -> TraceId {
        CURRENT_RNG.with(|rng| {
            let mut rng = rng.borrow_mut();
            loop {
                // Zero ids are reserved as invalid and must never be issued.
                let candidate = TraceId::from(rng.random::<u128>());
                if candidate != TraceId::INVALID {
                    return candidate;
                }
            }
        })
    }

    fn new_span_id(&self) -> SpanId {
        CURRENT_RNG.with(|rng| {
            let mut rng = rng.borrow_mut();
            loop {
                let candidate = SpanId::from(rng.random::<u64>());
                if candidate != SpanId::INVALID {
                    return candidate;
                }
            }
        })
    }
}

thread_local! {
    /// Store random number generator for each thread.
    static CURRENT_RNG: RefCell<SmallRng> = RefCell::new(SmallRng::from_os_rng());
}

/// An [`IdGenerator`] that issues sequential ids, for deterministic tests.
#[derive(Debug, Default)]
pub struct IncrementIdGenerator {
    next: AtomicU64,
}

impl IncrementIdGenerator {
    /// Create a generator whose first issued id is `1`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for IncrementIdGenerator {
    fn new_trace_id(&self) -> TraceId {
        TraceId::from(u128::from(self.next.fetch_add(1, Ordering::Relaxed) + 1))
    }

    fn new_span_id(&self) -> SpanId {
        SpanId::from(self.next.fetch_add(1, Ordering::Relaxed) + 1)
    }
}
