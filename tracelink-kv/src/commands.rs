//! The command surface of the key-value store.

use thiserror::Error;

/// Result type for key-value commands.
pub type KvResult<T> = Result<T, KvError>;

/// Errors returned by key-value commands.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum KvError {
    /// Operation applied to a key holding another kind of value.
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    /// Value at the key cannot be interpreted as an integer.
    #[error("value is not an integer or out of range")]
    NotAnInteger,

    /// The source key of a rename does not exist.
    #[error("no such key")]
    NoSuchKey,

    /// The connection to the store was lost or never established.
    #[error("connection to store lost: {0}")]
    ConnectionLost(String),
}

/// A command-style key-value client.
///
/// Every data operation is one self-contained call: a name, scalar
/// arguments, and a result. That uniformity is what lets a decorator wrap
/// the whole surface with one mechanism. `db_index` and `is_connected`
/// describe the connection rather than act on data and are exempt from
/// instrumentation.
///
/// Key lifecycle follows convention: writes create missing keys, reads of
/// missing keys return empty values, and expired keys behave as missing.
pub trait KvCommands {
    // Strings and counters

    /// Increment the integer value at `key` by one, creating it at `0`.
    fn incr(&self, key: &str) -> KvResult<i64>;

    /// Decrement the integer value at `key` by one, creating it at `0`.
    fn decr(&self, key: &str) -> KvResult<i64>;

    /// Increment the integer value at `key` by `delta`.
    fn incr_by(&self, key: &str, delta: i64) -> KvResult<i64>;

    /// Decrement the integer value at `key` by `delta`.
    fn decr_by(&self, key: &str, delta: i64) -> KvResult<i64>;

    /// Value at `key`, `None` if missing.
    fn get(&self, key: &str) -> KvResult<Option<String>>;

    /// Store `value` at `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> KvResult<()>;

    /// Store `value` at `key` with a time-to-live in seconds.
    fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> KvResult<()>;

    /// Store `value` at `key`, returning the previous value.
    fn get_set(&self, key: &str, value: &str) -> KvResult<Option<String>>;

    /// Append `value` to the string at `key`, returning the new length.
    fn append(&self, key: &str, value: &str) -> KvResult<u64>;

    /// Length of the string at `key`, `0` if missing.
    fn strlen(&self, key: &str) -> KvResult<u64>;

    /// Values for several keys at once, position-aligned with `keys`.
    fn mget(&self, keys: &[&str]) -> KvResult<Vec<Option<String>>>;

    /// Store several key-value pairs at once.
    fn mset(&self, pairs: &[(&str, &str)]) -> KvResult<()>;

    // Key lifecycle

    /// Remove `key`. Returns `true` if it existed.
    fn del(&self, key: &str) -> KvResult<bool>;

    /// Returns `true` if `key` exists.
    fn exists(&self, key: &str) -> KvResult<bool>;

    /// Set a time-to-live on an existing key. Returns `false` if missing.
    fn expire(&self, key: &str, ttl_secs: u64) -> KvResult<bool>;

    /// Remaining time-to-live in seconds: `-2` if the key is missing, `-1`
    /// if it has no expiry.
    fn ttl(&self, key: &str) -> KvResult<i64>;

    /// Clear the time-to-live of `key`. Returns `true` if one was cleared.
    fn persist(&self, key: &str) -> KvResult<bool>;

    /// Rename `key` to `new_key`, overwriting the destination.
    fn rename(&self, key: &str, new_key: &str) -> KvResult<()>;

    /// All keys matching a glob-style pattern (`*` and `?`).
    fn keys(&self, pattern: &str) -> KvResult<Vec<String>>;

    // Hashes

    /// Set `field` in the hash at `key`. Returns `true` if the field is new.
    fn hset(&self, key: &str, field: &str, value: &str) -> KvResult<bool>;

    /// Value of `field` in the hash at `key`.
    fn hget(&self, key: &str, field: &str) -> KvResult<Option<String>>;

    /// Remove `field` from the hash at `key`. Returns `true` if it existed.
    fn hdel(&self, key: &str, field: &str) -> KvResult<bool>;

    /// Number of fields in the hash at `key`.
    fn hlen(&self, key: &str) -> KvResult<u64>;

    /// Field names of the hash at `key`.
    fn hkeys(&self, key: &str) -> KvResult<Vec<String>>;

    /// All field-value pairs of the hash at `key`.
    fn hgetall(&self, key: &str) -> KvResult<Vec<(String, String)>>;

    // Lists

    /// Push `value` onto the head of the list at `key`, returning the new
    /// length.
    fn lpush(&self, key: &str, value: &str) -> KvResult<u64>;

    /// Push `value` onto the tail of the list at `key`, returning the new
    /// length.
    fn rpush(&self, key: &str, value: &str) -> KvResult<u64>;

    /// Pop from the head of the list at `key`.
    fn lpop(&self, key: &str) -> KvResult<Option<String>>;

    /// Pop from the tail of the list at `key`.
    fn rpop(&self, key: &str) -> KvResult<Option<String>>;

    /// Length of the list at `key`.
    fn llen(&self, key: &str) -> KvResult<u64>;

    /// Elements of the list at `key` between `start` and `stop` inclusive;
    /// negative indices count from the tail.
    fn lrange(&self, key: &str, start: i64, stop: i64) -> KvResult<Vec<String>>;

    // Sets

    /// Add `member` to the set at `key`. Returns `true` if it was new.
    fn sadd(&self, key: &str, member: &str) -> KvResult<bool>;

    /// Remove `member` from the set at `key`. Returns `true` if it existed.
    fn srem(&self, key: &str, member: &str) -> KvResult<bool>;

    /// Number of members in the set at `key`.
    fn scard(&self, key: &str) -> KvResult<u64>;

    /// Returns `true` if `member` is in the set at `key`.
    fn sismember(&self, key: &str, member: &str) -> KvResult<bool>;

    // Connection state, exempt from instrumentation

    /// The logical database this client operates on.
    fn db_index(&self) -> u32;

    /// Returns `true` while the client holds a usable connection.
    fn is_connected(&self) -> bool;
}
