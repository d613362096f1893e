//! Span status and the transport-outcome classification taxonomy.

use std::borrow::Cow;
use std::error::Error;
use std::fmt;

/// The outcome recorded on a finished span.
///
/// A span's status is set at most once before it ends; spans whose wrapped
/// operation never reported an outcome stay [`Status::Unset`].
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Status {
    /// The default status.
    #[default]
    Unset,

    /// The operation completed successfully.
    Ok,

    /// The operation failed.
    Error {
        /// Canonical classification of the failure.
        kind: ErrorKind,
        /// Human-readable detail, possibly empty.
        description: Cow<'static, str>,
    },
}

impl Status {
    /// Create a new error status with the given kind and description.
    pub fn error(kind: ErrorKind, description: impl Into<Cow<'static, str>>) -> Self {
        Status::Error {
            kind,
            description: description.into(),
        }
    }

    /// Returns `true` for [`Status::Error`] values.
    pub fn is_error(&self) -> bool {
        matches!(self, Status::Error { .. })
    }
}

/// Canonical error classifications.
///
/// Every transport outcome maps to exactly one of these; anything without an
/// explicit mapping falls back to [`ErrorKind::Unknown`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller supplied an invalid argument (HTTP 400).
    InvalidArgument,
    /// The caller is not authenticated (HTTP 401).
    Unauthenticated,
    /// The caller lacks permission (HTTP 403).
    PermissionDenied,
    /// The requested entity was not found (HTTP 404).
    NotFound,
    /// A quota or rate limit was exhausted (HTTP 429).
    ResourceExhausted,
    /// The remote side failed internally (HTTP 500).
    Internal,
    /// The operation is not implemented (HTTP 501).
    Unimplemented,
    /// The remote side is unavailable (HTTP 503).
    Unavailable,
    /// The operation timed out downstream (HTTP 504).
    DeadlineExceeded,
    /// Catch-all, including absent or unmapped status codes and transport
    /// failures that produced no code at all.
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ErrorKind::Unauthenticated => "UNAUTHENTICATED",
            ErrorKind::PermissionDenied => "PERMISSION_DENIED",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::ResourceExhausted => "RESOURCE_EXHAUSTED",
            ErrorKind::Internal => "INTERNAL",
            ErrorKind::Unimplemented => "UNIMPLEMENTED",
            ErrorKind::Unavailable => "UNAVAILABLE",
            ErrorKind::DeadlineExceeded => "DEADLINE_EXCEEDED",
            ErrorKind::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// Classify a transport outcome into a [`Status`].
///
/// Total and deterministic: every `(code, error)` combination yields exactly
/// one status and the function never panics. `code` of `None` or `0` means
/// no response was obtained; codes in `[200, 400)` are success; the explicit
/// table below covers the well-known error codes; everything else is
/// [`ErrorKind::Unknown`].
///
/// Lesser-used codes with no canonical kind keep their reason phrase as the
/// description instead of the error message, matching what a reader of the
/// trace needs to identify the response.
pub fn classify(code: Option<u16>, error: Option<&dyn Error>) -> Status {
    let message = error.map(|err| err.to_string()).unwrap_or_default();

    let code = match code {
        None | Some(0) => return Status::error(ErrorKind::Unknown, message),
        Some(code) => code,
    };

    if (200..400).contains(&code) {
        return Status::Ok;
    }

    match code {
        400 => Status::error(ErrorKind::InvalidArgument, message),
        401 => Status::error(ErrorKind::Unauthenticated, message),
        403 => Status::error(ErrorKind::PermissionDenied, message),
        404 => Status::error(ErrorKind::NotFound, message),
        429 => Status::error(ErrorKind::ResourceExhausted, message),
        500 => Status::error(ErrorKind::Internal, message),
        501 => Status::error(ErrorKind::Unimplemented, message),
        503 => Status::error(ErrorKind::Unavailable, message),
        504 => Status::error(ErrorKind::DeadlineExceeded, message),
        100 => Status::error(ErrorKind::Unknown, "Continue"),
        101 => Status::error(ErrorKind::Unknown, "Switching Protocols"),
        402 => Status::error(ErrorKind::Unknown, "Payment Required"),
        405 => Status::error(ErrorKind::Unknown, "Method Not Allowed"),
        406 => Status::error(ErrorKind::Unknown, "Not Acceptable"),
        407 => Status::error(ErrorKind::Unknown, "Proxy Authentication Required"),
        408 => Status::error(ErrorKind::Unknown, "Request Time-out"),
        409 => Status::error(ErrorKind::Unknown, "Conflict"),
        410 => Status::error(ErrorKind::Unknown, "Gone"),
        411 => Status::error(ErrorKind::Unknown, "Length Required"),
        412 => Status::error(ErrorKind::Unknown, "Precondition Failed"),
        413 => Status::error(ErrorKind::Unknown, "Request Entity Too Large"),
        414 => Status::error(ErrorKind::Unknown, "Request-URI Too Large"),
        415 => Status::error(ErrorKind::Unknown, "Unsupported Media Type"),
        416 => Status::error(ErrorKind::Unknown, "Requested Range Not Satisfiable"),
        417 => Status::error(ErrorKind::Unknown, "Expectation Failed"),
        502 => Status::error(ErrorKind::Unknown, "Bad Gateway"),
        505 => Status::error(ErrorKind::Unknown, "HTTP Version Not Supported"),
        _ => Status::error(ErrorKind::Unknown, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("connection refused")]
    struct FakeTransportError;

    #[test]
    fn success_range_is_ok() {
        for code in 200..400 {
            assert_eq!(classify(Some(code), None), Status::Ok, "code {code}");
        }
    }

    #[test]
    fn mapped_error_codes() {
        let cases = [
            (400, ErrorKind::InvalidArgument),
            (401, ErrorKind::Unauthenticated),
            (403, ErrorKind::PermissionDenied),
            (404, ErrorKind::NotFound),
            (429, ErrorKind::ResourceExhausted),
            (500, ErrorKind::Internal),
            (501, ErrorKind::Unimplemented),
            (503, ErrorKind::Unavailable),
            (504, ErrorKind::DeadlineExceeded),
        ];
        for (code, kind) in cases {
            match classify(Some(code), None) {
                Status::Error { kind: got, .. } => assert_eq!(got, kind, "code {code}"),
                other => panic!("code {code} classified as {other:?}"),
            }
        }
    }

    #[test]
    fn residual_codes_keep_reason_phrase() {
        assert_eq!(
            classify(Some(502), Some(&FakeTransportError)),
            Status::error(ErrorKind::Unknown, "Bad Gateway"),
        );
        assert_eq!(
            classify(Some(408), None),
            Status::error(ErrorKind::Unknown, "Request Time-out"),
        );
    }

    #[test]
    fn absent_code_uses_error_message() {
        assert_eq!(
            classify(None, Some(&FakeTransportError)),
            Status::error(ErrorKind::Unknown, "connection refused"),
        );
        assert_eq!(
            classify(Some(0), Some(&FakeTransportError)),
            Status::error(ErrorKind::Unknown, "connection refused"),
        );
    }

    #[test]
    fn total_over_all_codes() {
        // Never panics, and anything unmapped is Unknown.
        for code in 0..=u16::MAX {
            let status = classify(Some(code), None);
            if !(200..400).contains(&code) {
                assert!(status.is_error(), "code {code} must classify as an error");
            }
            match status {
                Status::Ok | Status::Error { .. } => {}
                Status::Unset => panic!("classify returned Unset for {code}"),
            }
        }
    }
}
