//! Buffered transport over any async byte stream.

use std::future::Future;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, VolleyError};
use crate::transport::Transport;

/// Default maximum frame size accepted on decode (1 GB).
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 1_073_741_824;

/// Initial output buffer capacity.
const WRITE_BUF_CAPACITY: usize = 8 * 1024;

/// Configuration for a [`BufferedTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Deadline for each read. `None` blocks indefinitely.
    pub read_timeout: Option<Duration>,
    /// Largest frame accepted on decode.
    pub max_frame_size: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            read_timeout: None,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Output-buffered transport over an `AsyncRead + AsyncWrite` stream.
///
/// Writes accumulate in an owned buffer until [`Transport::flush`] pushes
/// them to the stream in one `write_all`. Dropping the transport discards
/// any unflushed bytes; nothing is flushed implicitly on close.
pub struct BufferedTransport<S> {
    inner: S,
    wbuf: BytesMut,
    config: TransportConfig,
}

impl<S> BufferedTransport<S> {
    /// Wrap a stream with default configuration.
    pub fn new(inner: S) -> Self {
        Self::with_config(inner, TransportConfig::default())
    }

    /// Wrap a stream with explicit configuration.
    pub fn with_config(inner: S, config: TransportConfig) -> Self {
        Self {
            inner,
            wbuf: BytesMut::with_capacity(WRITE_BUF_CAPACITY),
            config,
        }
    }

    /// Set the per-read deadline.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.config.read_timeout = timeout;
    }

    /// Get a reference to the underlying stream.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Consume the transport, discarding any unflushed bytes.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S> Transport for BufferedTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn write(&mut self, bytes: &[u8]) {
        self.wbuf.extend_from_slice(bytes);
    }

    fn pending_bytes(&self) -> usize {
        self.wbuf.len()
    }

    fn flush(&mut self) -> impl Future<Output = Result<()>> + Send {
        async move {
            if self.wbuf.is_empty() {
                return Ok(());
            }
            // Take the whole buffer so the transfer is one contiguous write.
            let out = self.wbuf.split();
            self.inner.write_all(&out).await?;
            self.inner.flush().await?;
            Ok(())
        }
    }

    fn read_exact<'a>(
        &'a mut self,
        buf: &'a mut [u8],
    ) -> impl Future<Output = Result<()>> + Send + 'a {
        async move {
            let read = self.inner.read_exact(buf);
            let result = match self.config.read_timeout {
                Some(deadline) => tokio::time::timeout(deadline, read)
                    .await
                    .map_err(|_| VolleyError::Timeout)?,
                None => read.await,
            };
            match result {
                Ok(_) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    Err(VolleyError::ConnectionClosed)
                }
                Err(e) => Err(e.into()),
            }
        }
    }

    fn max_frame_size(&self) -> u32 {
        self.config.max_frame_size
    }
}
