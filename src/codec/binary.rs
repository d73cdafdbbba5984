//! Hand-rolled big-endian binary codec.
//!
//! Invocation body layout:
//! ```text
//! ┌──────┬──────────┬──────────┬─────────────┬──────┬─────────┐
//! │ Kind │ Seq      │ Name len │ Payload len │ Name │ Payload │
//! │ 1 B  │ 4 B u32  │ 2 B u16  │ 4 B u32     │  …   │    …    │
//! └──────┴──────────┴──────────┴─────────────┴──────┴─────────┘
//! ```
//!
//! Response body layout:
//! ```text
//! ┌──────┬──────────┬─────────────┬─────────┐
//! │ Kind │ Seq      │ Payload len │ Payload │
//! │ 1 B  │ 4 B u32  │ 4 B u32     │    …    │
//! └──────┴──────────┴─────────────┴─────────┘
//! ```
//!
//! All multi-byte integers are big endian. The kind byte doubles as a
//! frame-type discriminator, so an invocation body can never be mistaken
//! for a response body.

use bytes::Bytes;

use crate::codec::Codec;
use crate::error::{Result, VolleyError};
use crate::protocol::{CallKind, Invocation, Response, ResultKind};

/// Fixed part of an invocation body.
const INVOCATION_HEADER_SIZE: usize = 11;
/// Fixed part of a response body.
const RESPONSE_HEADER_SIZE: usize = 9;

/// Kind byte values on the wire.
mod kind {
    pub const CALL: u8 = 0x01;
    pub const REPLY: u8 = 0x02;
    pub const EXCEPTION: u8 = 0x03;
    pub const ONE_WAY: u8 = 0x04;
    pub const PROTOCOL_ERROR: u8 = 0x05;
}

/// Default codec: compact fixed-field binary frames.
pub struct BinaryCodec;

impl Codec for BinaryCodec {
    fn encode_invocation(&self, invocation: &Invocation) -> Result<Vec<u8>> {
        let name = invocation.method.as_bytes();
        let name_len = u16::try_from(name.len())
            .map_err(|_| VolleyError::Protocol("method name exceeds u16 length".to_string()))?;
        let payload_len = u32::try_from(invocation.payload.len())
            .map_err(|_| VolleyError::Protocol("payload exceeds u32 length".to_string()))?;

        let mut body =
            Vec::with_capacity(INVOCATION_HEADER_SIZE + name.len() + invocation.payload.len());
        body.push(match invocation.kind {
            CallKind::RoundTrip => kind::CALL,
            CallKind::OneWay => kind::ONE_WAY,
        });
        body.extend_from_slice(&invocation.seq.to_be_bytes());
        body.extend_from_slice(&name_len.to_be_bytes());
        body.extend_from_slice(&payload_len.to_be_bytes());
        body.extend_from_slice(name);
        body.extend_from_slice(&invocation.payload);
        Ok(body)
    }

    fn decode_invocation(&self, body: &[u8]) -> Result<Invocation> {
        if body.len() < INVOCATION_HEADER_SIZE {
            return Err(VolleyError::Protocol(format!(
                "invocation body of {} bytes is shorter than the fixed header",
                body.len()
            )));
        }
        let call_kind = match body[0] {
            kind::CALL => CallKind::RoundTrip,
            kind::ONE_WAY => CallKind::OneWay,
            other => {
                return Err(VolleyError::Protocol(format!(
                    "invalid invocation kind byte 0x{other:02x}"
                )))
            }
        };
        let seq = u32::from_be_bytes([body[1], body[2], body[3], body[4]]);
        let name_len = u16::from_be_bytes([body[5], body[6]]) as usize;
        let payload_len = u32::from_be_bytes([body[7], body[8], body[9], body[10]]) as usize;

        if body.len() != INVOCATION_HEADER_SIZE + name_len + payload_len {
            return Err(VolleyError::Protocol(format!(
                "invocation body length {} disagrees with declared lengths",
                body.len()
            )));
        }
        let name_end = INVOCATION_HEADER_SIZE + name_len;
        let method = std::str::from_utf8(&body[INVOCATION_HEADER_SIZE..name_end])
            .map_err(|_| VolleyError::Protocol("method name is not UTF-8".to_string()))?;

        Ok(Invocation::new(
            method,
            call_kind,
            seq,
            Bytes::copy_from_slice(&body[name_end..]),
        ))
    }

    fn encode_response(&self, response: &Response) -> Result<Vec<u8>> {
        let payload_len = u32::try_from(response.payload.len())
            .map_err(|_| VolleyError::Protocol("payload exceeds u32 length".to_string()))?;

        let mut body = Vec::with_capacity(RESPONSE_HEADER_SIZE + response.payload.len());
        body.push(match response.result {
            ResultKind::Success => kind::REPLY,
            ResultKind::ApplicationException => kind::EXCEPTION,
            ResultKind::ProtocolError => kind::PROTOCOL_ERROR,
        });
        body.extend_from_slice(&response.seq.to_be_bytes());
        body.extend_from_slice(&payload_len.to_be_bytes());
        body.extend_from_slice(&response.payload);
        Ok(body)
    }

    fn decode_response(&self, body: &[u8]) -> Result<Response> {
        if body.len() < RESPONSE_HEADER_SIZE {
            return Err(VolleyError::Protocol(format!(
                "response body of {} bytes is shorter than the fixed header",
                body.len()
            )));
        }
        let result = match body[0] {
            kind::REPLY => ResultKind::Success,
            kind::EXCEPTION => ResultKind::ApplicationException,
            kind::PROTOCOL_ERROR => ResultKind::ProtocolError,
            other => {
                return Err(VolleyError::Protocol(format!(
                    "invalid response kind byte 0x{other:02x}"
                )))
            }
        };
        let seq = u32::from_be_bytes([body[1], body[2], body[3], body[4]]);
        let payload_len = u32::from_be_bytes([body[5], body[6], body[7], body[8]]) as usize;

        if body.len() != RESPONSE_HEADER_SIZE + payload_len {
            return Err(VolleyError::Protocol(format!(
                "response body length {} disagrees with declared payload length",
                body.len()
            )));
        }

        Ok(Response {
            seq,
            result,
            payload: Bytes::copy_from_slice(&body[RESPONSE_HEADER_SIZE..]),
        })
    }
}
