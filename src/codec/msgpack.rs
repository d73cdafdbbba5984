//! Compact binary codec using `rmp-serde`.
//!
//! Uses `to_vec_named` so frames serialize as maps with field names rather
//! than positional arrays, which keeps the format stable if frame fields
//! are ever reordered.

use crate::codec::Codec;
use crate::error::{Result, VolleyError};
use crate::protocol::{Invocation, Response};

/// MessagePack codec for compact structured frames.
pub struct MsgPackCodec;

impl Codec for MsgPackCodec {
    fn encode_invocation(&self, invocation: &Invocation) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(invocation)?)
    }

    fn decode_invocation(&self, body: &[u8]) -> Result<Invocation> {
        // Malformed input off the wire is a protocol violation, not a
        // backend serialization error.
        rmp_serde::from_slice(body)
            .map_err(|e| VolleyError::Protocol(format!("malformed MessagePack invocation: {e}")))
    }

    fn encode_response(&self, response: &Response) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(response)?)
    }

    fn decode_response(&self, body: &[u8]) -> Result<Response> {
        rmp_serde::from_slice(body)
            .map_err(|e| VolleyError::Protocol(format!("malformed MessagePack response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::protocol::CallKind;

    #[test]
    fn test_deterministic_encoding() {
        let inv = Invocation::new("f", CallKind::OneWay, 3, Bytes::from_static(b"p"));
        let a = MsgPackCodec.encode_invocation(&inv).unwrap();
        let b = MsgPackCodec.encode_invocation(&inv).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_garbage_decodes_as_protocol_error() {
        let err = MsgPackCodec.decode_invocation(&[0xc1]).unwrap_err();
        assert!(err.is_protocol(), "got {err:?}");

        let err = MsgPackCodec.decode_response(&[0xc1]).unwrap_err();
        assert!(err.is_protocol(), "got {err:?}");
    }
}
