//! Tracing decorator over the command surface.

use crate::commands::{KvCommands, KvResult};
use tracelink::trace::{SpanKind, Tracer};
use tracelink::{classify, KeyValue, Status};
use tracing::debug;

/// Generates one forwarding method per key-addressed command.
///
/// Every generated method funnels through [`TracedKvClient::traced`], so
/// the wrapping semantics live in exactly one place and adding a command
/// is a one-line change here plus its entry in the [`KvCommands`] trait.
/// The leading `key` is written without a type: it is always `&str` and
/// always recorded on the span as `db.key`.
macro_rules! traced_commands {
    ($($name:ident(key $(, $arg:ident: $ty:ty)*) -> $ret:ty;)+) => {
        $(
            fn $name(&self, key: &str $(, $arg: $ty)*) -> KvResult<$ret> {
                self.traced(
                    concat!("Kv.", stringify!($name)),
                    stringify!($name),
                    KeyValue::new("db.key", key.to_string()),
                    move |inner| inner.$name(key $(, $arg)*),
                )
            }
        )+
    };
}

/// A [`KvCommands`] decorator that records one client span per command.
///
/// The wrapper is observation only: results and errors pass through
/// unchanged, and the span outcome is derived from them. Connection-state
/// queries (`db_index`, `is_connected`) forward without a span.
#[derive(Clone, Debug)]
pub struct TracedKvClient<C> {
    inner: C,
    tracer: Tracer,
}

impl<C: KvCommands> TracedKvClient<C> {
    /// Wrap `inner`, reporting spans through `tracer`.
    pub fn new(inner: C, tracer: Tracer) -> Self {
        TracedKvClient { inner, tracer }
    }

    /// The wrapped client.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    fn traced<T>(
        &self,
        span_name: &'static str,
        operation: &'static str,
        detail: KeyValue,
        f: impl FnOnce(&C) -> KvResult<T>,
    ) -> KvResult<T> {
        let mut span = self
            .tracer
            .span_builder(span_name)
            .with_kind(SpanKind::Client)
            .with_attributes([
                KeyValue::new("db.system", "kv"),
                KeyValue::new("db.operation", operation),
                detail,
            ])
            .start(&self.tracer);

        let result = f(&self.inner);
        match &result {
            Ok(_) => span.set_status(Status::Ok),
            Err(err) => {
                debug!(target: "tracelink_kv", operation, error = %err, "command failed");
                span.set_status(classify(None, Some(err)));
            }
        }
        span.end();

        result
    }
}

impl<C: KvCommands> KvCommands for TracedKvClient<C> {
    traced_commands! {
        incr(key) -> i64;
        decr(key) -> i64;
        incr_by(key, delta: i64) -> i64;
        decr_by(key, delta: i64) -> i64;
        get(key) -> Option<String>;
        set(key, value: &str) -> ();
        set_ex(key, value: &str, ttl_secs: u64) -> ();
        get_set(key, value: &str) -> Option<String>;
        append(key, value: &str) -> u64;
        strlen(key) -> u64;
        del(key) -> bool;
        exists(key) -> bool;
        expire(key, ttl_secs: u64) -> bool;
        ttl(key) -> i64;
        persist(key) -> bool;
        rename(key, new_key: &str) -> ();
        hset(key, field: &str, value: &str) -> bool;
        hget(key, field: &str) -> Option<String>;
        hdel(key, field: &str) -> bool;
        hlen(key) -> u64;
        hkeys(key) -> Vec<String>;
        hgetall(key) -> Vec<(String, String)>;
        lpush(key, value: &str) -> u64;
        rpush(key, value: &str) -> u64;
        lpop(key) -> Option<String>;
        rpop(key) -> Option<String>;
        llen(key) -> u64;
        lrange(key, start: i64, stop: i64) -> Vec<String>;
        sadd(key, member: &str) -> bool;
        srem(key, member: &str) -> bool;
        scard(key) -> u64;
        sismember(key, member: &str) -> bool;
    }

    // Bulk and scan commands take no single key; they record a size or
    // pattern instead.

    fn mget(&self, keys: &[&str]) -> KvResult<Vec<Option<String>>> {
        self.traced(
            "Kv.mget",
            "mget",
            KeyValue::new("db.batch_size", keys.len() as i64),
            move |inner| inner.mget(keys),
        )
    }

    fn mset(&self, pairs: &[(&str, &str)]) -> KvResult<()> {
        self.traced(
            "Kv.mset",
            "mset",
            KeyValue::new("db.batch_size", pairs.len() as i64),
            move |inner| inner.mset(pairs),
        )
    }

    fn keys(&self, pattern: &str) -> KvResult<Vec<String>> {
        self.traced(
            "Kv.keys",
            "keys",
            KeyValue::new("db.pattern", pattern.to_string()),
            move |inner| inner.keys(pattern),
        )
    }

    fn db_index(&self) -> u32 {
        self.inner.db_index()
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }
}
