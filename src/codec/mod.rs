//! Codec implementations for frame bodies.
//!
//! A [`Codec`] turns [`Invocation`] and [`Response`] frames into body bytes
//! and back. The outer length prefix is applied by
//! [`crate::protocol`]'s framing helpers, so codecs never worry about
//! delimitation; they only define the body layout.
//!
//! Implementations are interchangeable behind the trait, but both ends of a
//! connection must use the same one. Feeding one codec's bytes to another
//! surfaces as a protocol error on decode, never as silent corruption.
//!
//! - [`BinaryCodec`] — hand-rolled big-endian fixed-field layout (default)
//! - [`JsonCodec`] — structured text via `serde_json`
//! - [`MsgPackCodec`] — compact binary via `rmp-serde`

mod binary;
mod json;
mod msgpack;

pub use binary::BinaryCodec;
pub use json::JsonCodec;
pub use msgpack::MsgPackCodec;

use crate::error::Result;
use crate::protocol::{Invocation, Response};

/// Deterministic, self-consistent frame body encoding.
///
/// Decoding malformed input is always an error, never partial success.
pub trait Codec: Send + Sync {
    /// Serialize an invocation frame body.
    fn encode_invocation(&self, invocation: &Invocation) -> Result<Vec<u8>>;

    /// Parse an invocation frame body.
    fn decode_invocation(&self, body: &[u8]) -> Result<Invocation>;

    /// Serialize a response frame body.
    fn encode_response(&self, response: &Response) -> Result<Vec<u8>>;

    /// Parse a response frame body.
    fn decode_response(&self, body: &[u8]) -> Result<Response>;
}
