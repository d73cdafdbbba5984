//! Flush-suspending decorator.

use std::future::Future;

use crate::error::Result;
use crate::transport::Transport;

/// Wraps any [`Transport`] with a toggle that turns `flush` into a no-op.
///
/// While suspended, flushes return immediately without transferring or
/// clearing anything, so bytes accumulate across multiple flush attempts.
/// Resuming does not itself flush; the next explicit `flush` delivers the
/// whole backlog in one transfer. Used to observe batching and backpressure
/// behavior without racing the scheduler.
pub struct SuspendableTransport<T> {
    inner: T,
    suspended: bool,
}

impl<T: Transport> SuspendableTransport<T> {
    /// Wrap a transport; flushing starts out enabled.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            suspended: false,
        }
    }

    /// Make subsequent `flush` calls no-ops.
    pub fn suspend_flush(&mut self) {
        self.suspended = true;
    }

    /// Re-enable `flush`. Does not flush by itself.
    pub fn resume_flush(&mut self) {
        self.suspended = false;
    }

    /// Whether flush delivery is currently suspended.
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Get a reference to the wrapped transport.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Get a mutable reference to the wrapped transport.
    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Unwrap, discarding the suspension state.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Transport> Transport for SuspendableTransport<T> {
    fn write(&mut self, bytes: &[u8]) {
        self.inner.write(bytes);
    }

    fn pending_bytes(&self) -> usize {
        self.inner.pending_bytes()
    }

    fn flush(&mut self) -> impl Future<Output = Result<()>> + Send {
        async move {
            if self.suspended {
                return Ok(());
            }
            self.inner.flush().await
        }
    }

    fn read_exact<'a>(
        &'a mut self,
        buf: &'a mut [u8],
    ) -> impl Future<Output = Result<()>> + Send + 'a {
        self.inner.read_exact(buf)
    }

    fn max_frame_size(&self) -> u32 {
        self.inner.max_frame_size()
    }
}
