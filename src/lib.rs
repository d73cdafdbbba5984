//! # volley
//!
//! A minimal RPC core for one-way (fire-and-forget) and round-trip
//! (request/response) calls over buffered, flush-controlled byte
//! transports.
//!
//! The hard property this crate gets right: [`transport::Transport::write`]
//! only buffers, and bytes reach the channel when the caller flushes. A
//! client can issue several one-way calls, have them coalesce into a single
//! network write, and still follow up with a round-trip call on the same
//! connection without desynchronizing the framing.
//!
//! ## Architecture
//!
//! - **Transport**: output-buffered byte channel with explicit flush and an
//!   optional flush-suspending decorator
//! - **Protocol**: invocation/response frames behind interchangeable codecs
//!   (binary, JSON, MessagePack)
//! - **Client stub**: `send_only` (never flushes, never reads) and `call`
//!   (flush, then await the correlated response)
//! - **Server runtime**: task-per-connection accept loop with lifecycle
//!   hooks and a readiness monitor
//!
//! ## Example
//!
//! ```ignore
//! use volley::{Registry, RpcClient, Server};
//! use volley::transport::BufferedTransport;
//!
//! #[tokio::main]
//! async fn main() -> volley::Result<()> {
//!     let handle = Server::builder()
//!         .bind("127.0.0.1:0")
//!         .service(|_conn: &volley::ConnectionInfo| {
//!             Registry::new()
//!                 .round_trip("echo", |payload| async move { Ok(payload) })
//!                 .one_way("notify", |_payload| async move { Ok(()) })
//!         })
//!         .start()
//!         .await?;
//!     handle.wait_until_listening().await;
//!
//!     let stream = tokio::net::TcpStream::connect(handle.local_addr()).await?;
//!     let mut client = RpcClient::new(BufferedTransport::new(stream));
//!     client.send_only("notify", &b"fired"[..])?;
//!     let reply = client.call("echo", &b"hello"[..]).await?;
//!     assert_eq!(&reply[..], b"hello");
//!
//!     handle.stop();
//!     handle.join().await;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod error;
pub mod protocol;
pub mod service;
pub mod sync;
pub mod transport;

mod client;
mod dispatch;
mod server;

pub use client::RpcClient;
pub use error::{Result, VolleyError};
pub use protocol::{CallKind, Invocation, Response, ResultKind};
pub use server::{Server, ServerBuilder, ServerHandle};
pub use service::{ConnectionInfo, Handler, Registry, ServiceFactory};
pub use sync::{Monitor, Readiness};
