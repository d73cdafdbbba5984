//! Frame structs with typed accessors.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Shape of a remote call, fixed at binding time.
///
/// Client and server must agree on the kind per method; a frame whose kind
/// disagrees with the server-side binding is a protocol violation, not a
/// recoverable per-call condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallKind {
    /// Fire-and-forget: the caller never reads a response.
    OneWay,
    /// Request/response: the caller blocks for a correlated response.
    RoundTrip,
}

/// Outcome carried by a [`Response`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultKind {
    /// Handler completed; payload is its result.
    Success,
    /// Handler failed; payload is the error message.
    ApplicationException,
    /// The server could not honor the invocation (unknown method, kind
    /// mismatch). The connection is closed after this is sent.
    ProtocolError,
}

/// A framed method invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    /// Bound method name.
    pub method: String,
    /// Call shape.
    pub kind: CallKind,
    /// Per-connection sequence id, client-assigned, monotonically
    /// increasing. Servers echo it back unmodified.
    pub seq: u32,
    /// Opaque argument payload.
    pub payload: Bytes,
}

impl Invocation {
    /// Create an invocation frame.
    pub fn new(method: impl Into<String>, kind: CallKind, seq: u32, payload: Bytes) -> Self {
        Self {
            method: method.into(),
            kind,
            seq,
            payload,
        }
    }

    /// True for fire-and-forget invocations.
    #[inline]
    pub fn is_one_way(&self) -> bool {
        self.kind == CallKind::OneWay
    }
}

/// A framed response. Never produced for one-way invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Sequence id echoed from the invocation.
    pub seq: u32,
    /// Outcome discriminator.
    pub result: ResultKind,
    /// Result bytes, or an error message for the non-success kinds.
    pub payload: Bytes,
}

impl Response {
    /// Successful response carrying a result payload.
    pub fn success(seq: u32, payload: Bytes) -> Self {
        Self {
            seq,
            result: ResultKind::Success,
            payload,
        }
    }

    /// Handler failure carrying its message.
    pub fn application_exception(seq: u32, message: &str) -> Self {
        Self {
            seq,
            result: ResultKind::ApplicationException,
            payload: Bytes::copy_from_slice(message.as_bytes()),
        }
    }

    /// Server-side protocol violation report.
    pub fn protocol_error(seq: u32, message: &str) -> Self {
        Self {
            seq,
            result: ResultKind::ProtocolError,
            payload: Bytes::copy_from_slice(message.as_bytes()),
        }
    }

    /// Error message carried by a non-success response.
    pub fn message(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}
