//! Client stub: one-way and round-trip call shapes.

use std::sync::Arc;

use bytes::Bytes;

use crate::codec::{BinaryCodec, Codec};
use crate::error::{Result, VolleyError};
use crate::protocol::{read_response, write_invocation, CallKind, Invocation, ResultKind};
use crate::transport::Transport;

/// Client stub over a buffered transport.
///
/// Every method exists in two shapes. [`RpcClient::send_only`] frames a
/// one-way invocation into the transport buffer and returns; it never
/// flushes and never reads. [`RpcClient::call`] frames a round-trip
/// invocation, flushes, and awaits the correlated response.
///
/// The stub assigns per-connection sequence ids, monotonically increasing
/// across both call shapes. A response whose sequence id does not match the
/// in-flight request means the connection can no longer be trusted; the
/// stub returns an error and the caller must close and reconnect.
///
/// The stub is a single-writer object: concurrent calls on one client
/// require external serialization, exactly as for the transport beneath it.
pub struct RpcClient<T> {
    transport: T,
    codec: Arc<dyn Codec>,
    next_seq: u32,
}

impl<T: Transport> RpcClient<T> {
    /// Create a stub with the default [`BinaryCodec`].
    pub fn new(transport: T) -> Self {
        Self::with_codec(transport, Arc::new(BinaryCodec))
    }

    /// Create a stub with an explicit codec. Must match the server's.
    pub fn with_codec(transport: T, codec: Arc<dyn Codec>) -> Self {
        Self {
            transport,
            codec,
            next_seq: 0,
        }
    }

    fn next_seq(&mut self) -> u32 {
        self.next_seq = self.next_seq.wrapping_add(1);
        self.next_seq
    }

    /// Frame a one-way invocation into the output buffer and return.
    ///
    /// Does not flush and does not allocate a response slot. The frame
    /// reaches the wire on the next explicit [`RpcClient::flush`] (or on
    /// a subsequent round-trip call's flush).
    pub fn send_only(&mut self, method: &str, args: impl Into<Bytes>) -> Result<()> {
        let seq = self.next_seq();
        let invocation = Invocation::new(method, CallKind::OneWay, seq, args.into());
        write_invocation(&mut self.transport, &*self.codec, &invocation)
    }

    /// Frame a round-trip invocation, flush, and await the response.
    pub async fn call(&mut self, method: &str, args: impl Into<Bytes>) -> Result<Bytes> {
        let seq = self.next_seq();
        let invocation = Invocation::new(method, CallKind::RoundTrip, seq, args.into());
        write_invocation(&mut self.transport, &*self.codec, &invocation)?;
        self.transport.flush().await?;

        let response = read_response(&mut self.transport, &*self.codec).await?;
        if response.seq != seq {
            return Err(VolleyError::SequenceMismatch {
                expected: seq,
                actual: response.seq,
            });
        }
        match response.result {
            ResultKind::Success => Ok(response.payload),
            ResultKind::ApplicationException => Err(VolleyError::Application(response.message())),
            ResultKind::ProtocolError => Err(VolleyError::Protocol(response.message())),
        }
    }

    /// Flush buffered invocations to the channel.
    pub async fn flush(&mut self) -> Result<()> {
        self.transport.flush().await
    }

    /// Bytes framed but not yet flushed.
    pub fn pending_bytes(&self) -> usize {
        self.transport.pending_bytes()
    }

    /// Get a reference to the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the underlying transport, e.g. to
    /// suspend or resume flushing on a
    /// [`SuspendableTransport`](crate::transport::SuspendableTransport).
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the stub, returning the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{read_invocation, write_response, Response};
    use crate::transport::{BufferedTransport, SuspendableTransport};

    type DuplexTransport = BufferedTransport<tokio::io::DuplexStream>;

    fn pair() -> (RpcClient<SuspendableTransport<DuplexTransport>>, DuplexTransport) {
        let (near, far) = tokio::io::duplex(4096);
        let client = RpcClient::new(SuspendableTransport::new(BufferedTransport::new(near)));
        (client, BufferedTransport::new(far))
    }

    #[tokio::test]
    async fn test_send_only_never_flushes() {
        let (mut client, _server) = pair();
        client.send_only("fire", Bytes::new()).unwrap();
        assert!(client.pending_bytes() > 0);
        client.send_only("fire", Bytes::new()).unwrap();
        // Still buffered; nothing was delivered.
        assert!(client.pending_bytes() > 0);
    }

    #[tokio::test]
    async fn test_suspended_send_only_deltas_are_equal() {
        let (mut client, _server) = pair();
        client.transport_mut().suspend_flush();

        let size0 = client.pending_bytes();
        client.send_only("oneWayRPC", Bytes::new()).unwrap();
        let size1 = client.pending_bytes();
        client.send_only("oneWayRPC", Bytes::new()).unwrap();
        let size2 = client.pending_bytes();

        assert!(size1 > size0);
        assert_eq!(size1 - size0, size2 - size1);
    }

    #[tokio::test]
    async fn test_call_flushes_and_correlates() {
        let (mut client, mut server) = pair();
        let codec = BinaryCodec;

        let server_task = tokio::spawn(async move {
            let inv = read_invocation(&mut server, &codec).await.unwrap();
            assert_eq!(inv.kind, CallKind::RoundTrip);
            let resp = Response::success(inv.seq, Bytes::from_static(b"pong"));
            write_response(&mut server, &codec, &resp).unwrap();
            server.flush().await.unwrap();
        });

        let out = client.call("ping", Bytes::from_static(b"ping")).await.unwrap();
        assert_eq!(&out[..], b"pong");
        assert_eq!(client.pending_bytes(), 0);
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_mismatched_seq_is_never_accepted() {
        let (mut client, mut server) = pair();
        let codec = BinaryCodec;

        let server_task = tokio::spawn(async move {
            let inv = read_invocation(&mut server, &codec).await.unwrap();
            let resp = Response::success(inv.seq + 99, Bytes::new());
            write_response(&mut server, &codec, &resp).unwrap();
            server.flush().await.unwrap();
        });

        let err = client.call("ping", Bytes::new()).await.unwrap_err();
        assert!(matches!(err, VolleyError::SequenceMismatch { .. }));
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_application_exception_raised_from_call() {
        let (mut client, mut server) = pair();
        let codec = BinaryCodec;

        let server_task = tokio::spawn(async move {
            let inv = read_invocation(&mut server, &codec).await.unwrap();
            let resp = Response::application_exception(inv.seq, "handler blew up");
            write_response(&mut server, &codec, &resp).unwrap();
            server.flush().await.unwrap();
        });

        let err = client.call("boom", Bytes::new()).await.unwrap_err();
        match err {
            VolleyError::Application(msg) => assert_eq!(msg, "handler blew up"),
            other => panic!("expected application error, got {other}"),
        }
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_sequence_ids_increase_across_both_shapes() {
        let (mut client, mut server) = pair();
        let codec = BinaryCodec;

        client.send_only("a", Bytes::new()).unwrap();
        client.send_only("b", Bytes::new()).unwrap();
        client.flush().await.unwrap();

        let first = read_invocation(&mut server, &codec).await.unwrap();
        let second = read_invocation(&mut server, &codec).await.unwrap();
        assert!(second.seq > first.seq);
    }
}
