//! Immutable span identity: trace id, span id and flags.

use std::fmt;
use std::num::ParseIntError;
use std::ops::{BitAnd, BitOr, Not};

/// Per-trace option bits carried alongside the ids.
///
/// Only the low `sampled` bit means anything to this crate; the rest of
/// the byte is preserved as received so it survives a propagation hop.
#[derive(Clone, Debug, Default, PartialEq, Eq, Copy, Hash)]
pub struct TraceFlags(u8);

impl TraceFlags {
    /// All bits clear.
    pub const NOT_SAMPLED: TraceFlags = TraceFlags(0x00);

    /// The `sampled` bit: the caller is recording this trace.
    pub const SAMPLED: TraceFlags = TraceFlags(0x01);

    /// Flags from a raw byte.
    pub const fn new(flags: u8) -> Self {
        TraceFlags(flags)
    }

    /// Returns `true` if the `sampled` bit is set.
    pub fn is_sampled(&self) -> bool {
        (*self & TraceFlags::SAMPLED) == TraceFlags::SAMPLED
    }

    /// These flags with the `sampled` bit forced to `sampled`.
    pub fn with_sampled(&self, sampled: bool) -> Self {
        if sampled {
            *self | TraceFlags::SAMPLED
        } else {
            *self & !TraceFlags::SAMPLED
        }
    }

    /// The raw byte.
    pub fn to_u8(self) -> u8 {
        self.0
    }
}

impl BitAnd for TraceFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl BitOr for TraceFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl Not for TraceFlags {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self(!self.0)
    }
}

impl fmt::LowerHex for TraceFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// The 128-bit identifier shared by every span of one trace.
///
/// All-zero is reserved as the invalid id.
#[derive(Clone, PartialEq, Eq, Copy, Hash, PartialOrd, Ord)]
pub struct TraceId(u128);

impl TraceId {
    /// The reserved all-zero id.
    pub const INVALID: TraceId = TraceId(0);

    /// A trace id from its big-endian bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        TraceId(u128::from_be_bytes(bytes))
    }

    /// This id as big-endian bytes.
    pub const fn to_bytes(self) -> [u8; 16] {
        self.0.to_be_bytes()
    }

    /// Parse an id from lowercase or uppercase hex.
    ///
    /// ```
    /// use tracelink::trace::TraceId;
    ///
    /// assert!(TraceId::from_hex("42").is_ok());
    /// assert!(TraceId::from_hex("nope").is_err());
    /// ```
    pub fn from_hex(hex: &str) -> Result<Self, ParseIntError> {
        u128::from_str_radix(hex, 16).map(TraceId)
    }
}

impl From<u128> for TraceId {
    fn from(value: u128) -> Self {
        TraceId(value)
    }
}

impl fmt::Debug for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{:032x}", self.0))
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{:032x}", self.0))
    }
}

impl fmt::LowerHex for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// The 64-bit identifier of a single span, unique within its trace.
///
/// All-zero is reserved as the invalid id.
#[derive(Clone, PartialEq, Eq, Copy, Hash, PartialOrd, Ord)]
pub struct SpanId(u64);

impl SpanId {
    /// The reserved all-zero id.
    pub const INVALID: SpanId = SpanId(0);

    /// A span id from its big-endian bytes.
    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        SpanId(u64::from_be_bytes(bytes))
    }

    /// This id as big-endian bytes.
    pub const fn to_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    /// Parse an id from lowercase or uppercase hex.
    pub fn from_hex(hex: &str) -> Result<Self, ParseIntError> {
        u64::from_str_radix(hex, 16).map(SpanId)
    }
}

impl From<u64> for SpanId {
    fn from(value: u64) -> Self {
        SpanId(value)
    }
}

impl fmt::Debug for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{:016x}", self.0))
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{:016x}", self.0))
    }
}

impl fmt::LowerHex for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// The part of a span that crosses the wire: ids, flags, and where the
/// pair came from.
///
/// A span context is pure identity. On the receiving side it only ever
/// serves as a parent reference (`is_remote` is `true` there); the remote
/// process never ends or mutates the span it names.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SpanContext {
    trace_id: TraceId,
    span_id: SpanId,
    trace_flags: TraceFlags,
    is_remote: bool,
}

impl SpanContext {
    /// The invalid span context: both ids zero, nothing set.
    pub fn empty_context() -> Self {
        SpanContext::new(TraceId::INVALID, SpanId::INVALID, TraceFlags::default(), false)
    }

    /// Construct a new `SpanContext`.
    pub fn new(
        trace_id: TraceId,
        span_id: SpanId,
        trace_flags: TraceFlags,
        is_remote: bool,
    ) -> Self {
        SpanContext {
            trace_id,
            span_id,
            trace_flags,
            is_remote,
        }
    }

    /// The trace this span belongs to.
    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// The span's own id.
    pub fn span_id(&self) -> SpanId {
        self.span_id
    }

    /// The propagated option bits.
    pub fn trace_flags(&self) -> TraceFlags {
        self.trace_flags
    }

    /// Returns `true` when both ids are non-zero.
    pub fn is_valid(&self) -> bool {
        self.trace_id != TraceId::INVALID && self.span_id != SpanId::INVALID
    }

    /// Returns `true` when this identity arrived from another process.
    pub fn is_remote(&self) -> bool {
        self.is_remote
    }

    /// Returns `true` if the `sampled` bit is set.
    pub fn is_sampled(&self) -> bool {
        self.trace_flags.is_sampled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_format_as_padded_hex() {
        assert_eq!(
            TraceId::from(1u128).to_string(),
            "00000000000000000000000000000001"
        );
        assert_eq!(SpanId::from(7u64).to_string(), "0000000000000007");

        let trace_id = TraceId::from_hex("0af7651916cd43dd8448eb211c80319c").unwrap();
        assert_eq!(format!("{trace_id:032x}"), "0af7651916cd43dd8448eb211c80319c");
        let span_id = SpanId::from_hex("00f067aa0ba902b7").unwrap();
        assert_eq!(format!("{span_id:016x}"), "00f067aa0ba902b7");
    }

    #[test]
    fn ids_round_trip_through_bytes_and_hex() {
        let trace_id = TraceId::from_hex("0af7651916cd43dd8448eb211c80319c").unwrap();
        assert_eq!(TraceId::from_bytes(trace_id.to_bytes()), trace_id);
        assert_eq!(TraceId::from_hex(&trace_id.to_string()), Ok(trace_id));

        let span_id = SpanId::from_hex("00f067aa0ba902b7").unwrap();
        assert_eq!(SpanId::from_bytes(span_id.to_bytes()), span_id);
        assert_eq!(SpanId::from_hex(&span_id.to_string()), Ok(span_id));

        assert!(TraceId::from_hex("not hex").is_err());
        assert!(SpanId::from_hex("").is_err());
    }

    #[test]
    fn validity_requires_both_ids() {
        assert!(!SpanContext::empty_context().is_valid());
        assert!(!SpanContext::new(TraceId::from(1u128), SpanId::INVALID, TraceFlags::default(), false).is_valid());
        assert!(!SpanContext::new(TraceId::INVALID, SpanId::from(1u64), TraceFlags::default(), false).is_valid());
        assert!(SpanContext::new(TraceId::from(1u128), SpanId::from(1u64), TraceFlags::default(), false).is_valid());
    }

    #[test]
    fn trace_flags_sampled() {
        assert!(TraceFlags::SAMPLED.is_sampled());
        assert!(!TraceFlags::default().is_sampled());
        assert!(TraceFlags::default().with_sampled(true).is_sampled());
        assert!(!TraceFlags::new(0xff).with_sampled(false).is_sampled());
    }
}
