//! Error types for volley.

use thiserror::Error;

/// Main error type for all volley operations.
#[derive(Debug, Error)]
pub enum VolleyError {
    /// I/O error on the underlying channel.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Read deadline expired before a complete frame arrived.
    #[error("read timed out")]
    Timeout,

    /// Peer closed the connection.
    #[error("connection closed")]
    ConnectionClosed,

    /// Malformed frame or a violation of the framing rules.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A response arrived with a sequence id that does not match the
    /// in-flight request. The connection is no longer trustworthy.
    #[error("sequence id mismatch: expected {expected}, got {actual}")]
    SequenceMismatch { expected: u32, actual: u32 },

    /// Frame length prefix exceeds the configured maximum.
    #[error("frame of {size} bytes exceeds maximum {max}")]
    FrameTooLarge { size: u32, max: u32 },

    /// Invocation named a method with no binding on this connection.
    #[error("unknown method: {0}")]
    UnknownMethod(String),

    /// Invocation call kind disagrees with the kind fixed at binding time.
    #[error("call kind mismatch for method {0}")]
    CallKindMismatch(String),

    /// Handler-reported failure, surfaced to round-trip callers only.
    #[error("application error: {0}")]
    Application(String),

    /// JSON codec failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MsgPack encode failure.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack decode failure.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),
}

impl VolleyError {
    /// True for channel-level failures (I/O, timeout, closed peer).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            VolleyError::Io(_) | VolleyError::Timeout | VolleyError::ConnectionClosed
        )
    }

    /// True for framing-level failures. These terminate the connection.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            VolleyError::Protocol(_)
                | VolleyError::SequenceMismatch { .. }
                | VolleyError::FrameTooLarge { .. }
                | VolleyError::UnknownMethod(_)
                | VolleyError::CallKindMismatch(_)
        )
    }
}

/// Result type alias using VolleyError.
pub type Result<T> = std::result::Result<T, VolleyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy_predicates() {
        assert!(VolleyError::Timeout.is_transport());
        assert!(VolleyError::ConnectionClosed.is_transport());
        assert!(!VolleyError::Timeout.is_protocol());

        let seq = VolleyError::SequenceMismatch {
            expected: 1,
            actual: 2,
        };
        assert!(seq.is_protocol());
        assert!(!seq.is_transport());

        assert!(!VolleyError::Application("boom".into()).is_transport());
        assert!(!VolleyError::Application("boom".into()).is_protocol());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let err: VolleyError = io.into();
        assert!(err.is_transport());
    }
}
