//! Structured-text codec using `serde_json`.
//!
//! Useful when frames must be inspectable by humans or tooling on the wire.
//! The outer length prefix still delimits frames, so the JSON itself does
//! not need to be newline-framed.

use crate::codec::Codec;
use crate::error::{Result, VolleyError};
use crate::protocol::{Invocation, Response};

/// JSON codec for human-readable frames.
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode_invocation(&self, invocation: &Invocation) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(invocation)?)
    }

    fn decode_invocation(&self, body: &[u8]) -> Result<Invocation> {
        // Malformed input off the wire is a protocol violation, not a
        // backend serialization error.
        serde_json::from_slice(body)
            .map_err(|e| VolleyError::Protocol(format!("malformed JSON invocation: {e}")))
    }

    fn encode_response(&self, response: &Response) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(response)?)
    }

    fn decode_response(&self, body: &[u8]) -> Result<Response> {
        serde_json::from_slice(body)
            .map_err(|e| VolleyError::Protocol(format!("malformed JSON response: {e}")))
    }
}
