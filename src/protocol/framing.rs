//! Length-prefixed outer framing.
//!
//! Every frame on the wire is a 4-byte big-endian length prefix followed by
//! a codec-encoded body. The prefix makes every codec self-delimiting
//! regardless of its body format; the body layout is entirely the codec's.
//!
//! The write helpers only append to the transport's output buffer. Whether
//! and when the bytes reach the channel is the caller's flush decision,
//! which is what allows back-to-back one-way frames to batch.

use crate::codec::Codec;
use crate::error::{Result, VolleyError};
use crate::protocol::{Invocation, Response};
use crate::transport::Transport;

/// Size of the outer length prefix.
pub const LENGTH_PREFIX_SIZE: usize = 4;

fn write_frame<T: Transport>(transport: &mut T, body: &[u8]) -> Result<()> {
    let len = u32::try_from(body.len())
        .map_err(|_| VolleyError::Protocol("frame body exceeds u32 length".to_string()))?;
    if len > transport.max_frame_size() {
        return Err(VolleyError::FrameTooLarge {
            size: len,
            max: transport.max_frame_size(),
        });
    }
    transport.write(&len.to_be_bytes());
    transport.write(body);
    Ok(())
}

/// Read one complete frame body, blocking until it is fully available.
///
/// EOF on the length prefix is a clean close and surfaces as
/// [`VolleyError::ConnectionClosed`]. EOF after the prefix means the peer
/// abandoned a frame mid-write, which is a protocol violation, not a clean
/// close.
pub async fn read_frame<T: Transport>(transport: &mut T) -> Result<Vec<u8>> {
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    transport.read_exact(&mut prefix).await?;
    let len = u32::from_be_bytes(prefix);
    if len > transport.max_frame_size() {
        return Err(VolleyError::FrameTooLarge {
            size: len,
            max: transport.max_frame_size(),
        });
    }
    let mut body = vec![0u8; len as usize];
    transport.read_exact(&mut body).await.map_err(|e| match e {
        VolleyError::ConnectionClosed => VolleyError::Protocol(format!(
            "connection closed mid-frame: expected {len} body bytes"
        )),
        other => other,
    })?;
    Ok(body)
}

/// Encode an invocation and append it to the transport's output buffer.
pub fn write_invocation<T: Transport>(
    transport: &mut T,
    codec: &dyn Codec,
    invocation: &Invocation,
) -> Result<()> {
    let body = codec.encode_invocation(invocation)?;
    write_frame(transport, &body)
}

/// Read and decode one invocation frame.
pub async fn read_invocation<T: Transport>(
    transport: &mut T,
    codec: &dyn Codec,
) -> Result<Invocation> {
    let body = read_frame(transport).await?;
    codec.decode_invocation(&body)
}

/// Encode a response and append it to the transport's output buffer.
pub fn write_response<T: Transport>(
    transport: &mut T,
    codec: &dyn Codec,
    response: &Response,
) -> Result<()> {
    let body = codec.encode_response(response)?;
    write_frame(transport, &body)
}

/// Read and decode one response frame.
pub async fn read_response<T: Transport>(
    transport: &mut T,
    codec: &dyn Codec,
) -> Result<Response> {
    let body = read_frame(transport).await?;
    codec.decode_response(&body)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::codec::BinaryCodec;
    use crate::protocol::CallKind;
    use crate::transport::{BufferedTransport, TransportConfig};

    #[tokio::test]
    async fn test_invocation_over_transport() {
        let (near, far) = tokio::io::duplex(1024);
        let mut writer = BufferedTransport::new(near);
        let mut reader = BufferedTransport::new(far);
        let codec = BinaryCodec;

        let sent = Invocation::new("echo", CallKind::RoundTrip, 5, Bytes::from_static(b"hi"));
        write_invocation(&mut writer, &codec, &sent).unwrap();
        writer.flush().await.unwrap();

        let got = read_invocation(&mut reader, &codec).await.unwrap();
        assert_eq!(got, sent);
    }

    #[tokio::test]
    async fn test_two_frames_one_flush() {
        let (near, far) = tokio::io::duplex(1024);
        let mut writer = BufferedTransport::new(near);
        let mut reader = BufferedTransport::new(far);
        let codec = BinaryCodec;

        let a = Invocation::new("fire", CallKind::OneWay, 1, Bytes::from_static(b"a"));
        let b = Invocation::new("fire", CallKind::OneWay, 2, Bytes::from_static(b"b"));
        write_invocation(&mut writer, &codec, &a).unwrap();
        write_invocation(&mut writer, &codec, &b).unwrap();
        writer.flush().await.unwrap();
        assert_eq!(writer.pending_bytes(), 0);

        // Physically contiguous on the wire, still two logical frames.
        assert_eq!(read_invocation(&mut reader, &codec).await.unwrap(), a);
        assert_eq!(read_invocation(&mut reader, &codec).await.unwrap(), b);
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected_on_read() {
        let (near, far) = tokio::io::duplex(1024);
        let mut writer = BufferedTransport::new(near);
        let mut reader = BufferedTransport::with_config(
            far,
            TransportConfig {
                max_frame_size: 16,
                ..TransportConfig::default()
            },
        );

        writer.write(&1024u32.to_be_bytes());
        writer.flush().await.unwrap();

        let err = read_frame(&mut reader).await.unwrap_err();
        assert!(matches!(err, VolleyError::FrameTooLarge { size: 1024, .. }));
    }

    #[tokio::test]
    async fn test_eof_at_prefix_boundary_is_clean_close() {
        let (near, far) = tokio::io::duplex(1024);
        let mut reader = BufferedTransport::new(far);
        drop(near);

        let err = read_frame(&mut reader).await.unwrap_err();
        assert!(matches!(err, VolleyError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_eof_mid_frame_is_protocol_error() {
        let (near, far) = tokio::io::duplex(1024);
        let mut writer = BufferedTransport::new(near);
        let mut reader = BufferedTransport::new(far);

        // Full prefix, then only 3 of the promised 8 body bytes.
        writer.write(&8u32.to_be_bytes());
        writer.write(b"par");
        writer.flush().await.unwrap();
        drop(writer);

        let err = read_frame(&mut reader).await.unwrap_err();
        assert!(err.is_protocol(), "got {err:?}");
    }

    #[tokio::test]
    async fn test_response_over_transport() {
        let (near, far) = tokio::io::duplex(1024);
        let mut writer = BufferedTransport::new(near);
        let mut reader = BufferedTransport::new(far);
        let codec = BinaryCodec;

        let sent = Response::success(9, Bytes::from_static(b"result"));
        write_response(&mut writer, &codec, &sent).unwrap();
        writer.flush().await.unwrap();

        let got = read_response(&mut reader, &codec).await.unwrap();
        assert_eq!(got, sent);
    }
}
