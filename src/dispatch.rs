//! Per-connection dispatch loop.
//!
//! Each accepted connection runs one instance of [`run_connection`]:
//! read an invocation, look up the binding, invoke it, and — only for
//! round-trip invocations — write back a response and flush. One-way
//! handler outcomes are logged and dropped; there is no peer-facing channel
//! for them.
//!
//! Protocol violations (unknown method, call kind mismatch, malformed
//! frames) terminate the connection. For a round-trip violation a
//! best-effort protocol-error response is written first, so the caller
//! fails fast instead of timing out.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::codec::Codec;
use crate::error::{Result, VolleyError};
use crate::protocol::{read_invocation, write_response, CallKind, Invocation, Response};
use crate::service::Registry;
use crate::transport::Transport;

/// Run the dispatch loop until peer close, connection error, or shutdown.
///
/// The shutdown flag is checked between iterations; an in-flight read is
/// bounded only by the transport's read timeout, if one is configured.
pub(crate) async fn run_connection<T: Transport>(
    mut transport: T,
    codec: Arc<dyn Codec>,
    registry: Registry,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    loop {
        if *shutdown.borrow() {
            debug!("shutdown requested, worker exiting");
            return Ok(());
        }
        let invocation = match read_invocation(&mut transport, &*codec).await {
            Ok(invocation) => invocation,
            Err(VolleyError::ConnectionClosed) => {
                debug!("peer closed connection");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        dispatch_one(&mut transport, &*codec, &registry, invocation).await?;
    }
}

async fn dispatch_one<T: Transport>(
    transport: &mut T,
    codec: &dyn Codec,
    registry: &Registry,
    invocation: Invocation,
) -> Result<()> {
    let Some(entry) = registry.get(&invocation.method) else {
        warn!(method = %invocation.method, "invocation for unbound method");
        reject(transport, codec, &invocation, "unknown method").await;
        return Err(VolleyError::UnknownMethod(invocation.method));
    };

    if entry.kind != invocation.kind {
        warn!(
            method = %invocation.method,
            bound = ?entry.kind,
            received = ?invocation.kind,
            "call kind disagrees with binding"
        );
        reject(transport, codec, &invocation, "call kind mismatch").await;
        return Err(VolleyError::CallKindMismatch(invocation.method));
    }

    match invocation.kind {
        CallKind::OneWay => {
            // No response path exists; failures stop at the log.
            if let Err(e) = entry.handler.call(invocation.payload).await {
                warn!(method = %invocation.method, error = %e, "one-way handler failed");
            }
        }
        CallKind::RoundTrip => {
            let response = match entry.handler.call(invocation.payload).await {
                Ok(payload) => Response::success(invocation.seq, payload),
                Err(e) => Response::application_exception(invocation.seq, &e.to_string()),
            };
            write_response(transport, codec, &response)?;
            transport.flush().await?;
        }
    }
    Ok(())
}

/// Best-effort protocol-error response before the connection is dropped.
/// Only round-trip callers are listening, so one-way violations get nothing.
async fn reject<T: Transport>(
    transport: &mut T,
    codec: &dyn Codec,
    invocation: &Invocation,
    message: &str,
) {
    if invocation.kind != CallKind::RoundTrip {
        return;
    }
    let response = Response::protocol_error(invocation.seq, message);
    if write_response(transport, codec, &response).is_ok() {
        let _ = transport.flush().await;
    }
}
