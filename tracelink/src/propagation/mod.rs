//! Cross-process context propagation.
//!
//! A propagator writes the identity of the active span into, and reads it
//! back out of, a string-keyed carrier exchanged between processes (HTTP
//! headers, message metadata). Propagators never touch the carrier directly;
//! they go through the [`Injector`] and [`Extractor`] traits so any
//! string-map-like transport can participate.

use std::collections::HashMap;

mod trace_context;

pub use trace_context::TraceContextPropagator;

use crate::Context;

/// Write access to a carrier of string key/value pairs.
pub trait Injector {
    /// Add a key and value to the underlying data.
    fn set(&mut self, key: &str, value: String);
}

/// Read access to a carrier of string key/value pairs.
pub trait Extractor {
    /// Get a value for a key from the underlying data.
    fn get(&self, key: &str) -> Option<&str>;

    /// Collect all the keys from the underlying data.
    fn keys(&self) -> Vec<&str>;
}

impl<S: std::hash::BuildHasher> Injector for HashMap<String, String, S> {
    /// Set a key and value in the HashMap.
    fn set(&mut self, key: &str, value: String) {
        self.insert(key.to_lowercase(), value);
    }
}

impl<S: std::hash::BuildHasher> Extractor for HashMap<String, String, S> {
    /// Get a value for a key from the HashMap.
    fn get(&self, key: &str) -> Option<&str> {
        self.get(&key.to_lowercase()).map(|v| v.as_str())
    }

    /// Collect all the keys from the HashMap.
    fn keys(&self) -> Vec<&str> {
        self.keys().map(|k| k.as_str()).collect::<Vec<_>>()
    }
}

/// Encodes and decodes [`Context`] values as text into carriers.
pub trait TextMapPropagator: std::fmt::Debug {
    /// Encode the span identity of `cx` into the carrier.
    ///
    /// Carriers must only gain well-formed entries; if `cx` has no valid
    /// span the carrier is left untouched.
    fn inject_context(&self, cx: &Context, injector: &mut dyn Injector);

    /// Encode the span identity of the current context into the carrier.
    fn inject(&self, injector: &mut dyn Injector) {
        Context::map_current(|cx| self.inject_context(cx, injector))
    }

    /// Decode a remote span identity from the carrier, deriving the result
    /// from `cx`. A missing or malformed entry yields `cx` unchanged.
    fn extract_with_context(&self, cx: &Context, extractor: &dyn Extractor) -> Context;

    /// Decode a remote span identity from the carrier, deriving the result
    /// from the current context.
    fn extract(&self, extractor: &dyn Extractor) -> Context {
        Context::map_current(|cx| self.extract_with_context(cx, extractor))
    }

    /// The carrier keys this propagator reads and writes.
    fn fields(&self) -> &[&'static str];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_map_get_is_case_insensitive() {
        let mut carrier = HashMap::new();
        carrier.set("headerName", "value".to_string());

        assert_eq!(
            Extractor::get(&carrier, "HEADERNAME"),
            Some("value"),
            "case insensitive extraction"
        );
    }

    #[test]
    fn hash_map_keys_are_lowercased() {
        let mut carrier = HashMap::new();
        carrier.set("headerName1", "value1".to_string());
        carrier.set("headerName2", "value2".to_string());

        let got = Extractor::keys(&carrier);
        assert_eq!(got.len(), 2);
        assert!(got.contains(&"headername1"));
        assert!(got.contains(&"headername2"));
    }

    #[test]
    fn hash_map_get_missing_key() {
        let mut carrier = HashMap::new();
        carrier.set("headerName", "value".to_string());

        assert_eq!(Extractor::get(&carrier, "missing_key"), None);
    }
}
