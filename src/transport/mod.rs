//! Buffered, flush-controlled byte transports.
//!
//! The [`Transport`] trait separates "logically sent" from "physically
//! sent": [`Transport::write`] only appends to an output buffer, and the
//! bytes reach the raw channel as one contiguous transfer when
//! [`Transport::flush`] runs. That split is what lets several one-way
//! invocations coalesce into a single channel write.
//!
//! Input is deliberately unbuffered; reads go straight to the raw channel.
//!
//! A single transport must not be written to concurrently. Callers mixing
//! one-way and round-trip calls on one connection serialize their own calls.

mod buffered;
mod suspend;

pub use buffered::{BufferedTransport, TransportConfig, DEFAULT_MAX_FRAME_SIZE};
pub use suspend::SuspendableTransport;

use std::future::Future;

use crate::error::Result;

/// An ordered byte channel with buffered writes and explicit flush.
pub trait Transport: Send {
    /// Append bytes to the output buffer. Never blocks and never touches
    /// the raw channel.
    fn write(&mut self, bytes: &[u8]);

    /// Current output buffer length. Observability only, not part of the
    /// wire protocol.
    fn pending_bytes(&self) -> usize;

    /// Transfer the whole output buffer to the raw channel, then clear it.
    fn flush(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Read exactly `buf.len()` bytes from the raw channel.
    ///
    /// Resolves with [`crate::VolleyError::Timeout`] if a configured read
    /// deadline expires and [`crate::VolleyError::ConnectionClosed`] if the
    /// peer closes first.
    fn read_exact<'a>(
        &'a mut self,
        buf: &'a mut [u8],
    ) -> impl Future<Output = Result<()>> + Send + 'a;

    /// Largest frame this transport will accept on decode.
    fn max_frame_size(&self) -> u32 {
        DEFAULT_MAX_FRAME_SIZE
    }
}
