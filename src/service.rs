//! Method bindings and per-connection service instantiation.
//!
//! A [`Registry`] maps method names to a call kind and a handler. The kind
//! is fixed at binding time; client and server must agree on it, and an
//! invocation whose kind disagrees with the binding is a protocol
//! violation.
//!
//! A [`ServiceFactory`] builds one registry per accepted connection, so
//! handlers can carry per-connection state. Releasing a handler is `Drop`.
//!
//! # Example
//!
//! ```ignore
//! let registry = Registry::new()
//!     .round_trip("echo", |payload| async move { Ok(payload) })
//!     .one_way("log", |payload| async move {
//!         tracing::info!(len = payload.len(), "log event");
//!         Ok(())
//!     });
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;

use bytes::Bytes;

use crate::error::Result;
use crate::protocol::CallKind;

/// Boxed future for handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A bound method implementation.
///
/// Handlers see the argument payload as opaque bytes; argument
/// serialization belongs to the layer above this core.
pub trait Handler: Send + Sync {
    /// Invoke the method with the invocation's payload.
    ///
    /// For round-trip bindings the returned bytes become the response
    /// payload and an error becomes an application exception. For one-way
    /// bindings the outcome is logged and dropped.
    fn call(&self, payload: Bytes) -> BoxFuture<'static, Result<Bytes>>;
}

struct FnHandler<F>(F);

impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Bytes) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Bytes>> + Send + 'static,
{
    fn call(&self, payload: Bytes) -> BoxFuture<'static, Result<Bytes>> {
        Box::pin((self.0)(payload))
    }
}

pub(crate) struct MethodEntry {
    pub(crate) kind: CallKind,
    pub(crate) handler: Box<dyn Handler>,
}

/// Mapping from method name to call kind and handler.
#[derive(Default)]
pub struct Registry {
    methods: HashMap<String, MethodEntry>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a round-trip method. The handler's result (or error) is sent
    /// back to the caller.
    pub fn round_trip<F, Fut>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(Bytes) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Bytes>> + Send + 'static,
    {
        self.methods.insert(
            name.to_string(),
            MethodEntry {
                kind: CallKind::RoundTrip,
                handler: Box::new(FnHandler(handler)),
            },
        );
        self
    }

    /// Bind a one-way method. The handler's outcome never reaches a peer.
    pub fn one_way<F, Fut>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(Bytes) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let wrapped = move |payload: Bytes| {
            let fut = handler(payload);
            async move { fut.await.map(|_| Bytes::new()) }
        };
        self.methods.insert(
            name.to_string(),
            MethodEntry {
                kind: CallKind::OneWay,
                handler: Box::new(FnHandler(wrapped)),
            },
        );
        self
    }

    /// Call kind fixed at binding time, if the method is bound.
    pub fn kind_of(&self, name: &str) -> Option<CallKind> {
        self.methods.get(name).map(|entry| entry.kind)
    }

    /// Number of bound methods.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// True if no methods are bound.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub(crate) fn get(&self, name: &str) -> Option<&MethodEntry> {
        self.methods.get(name)
    }
}

/// Addresses of an accepted connection, passed to the service factory and
/// the connection-accepted hook.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionInfo {
    /// Remote end of the accepted socket.
    pub peer_addr: SocketAddr,
    /// Local end of the accepted socket.
    pub local_addr: SocketAddr,
}

/// Builds one [`Registry`] per accepted connection.
pub trait ServiceFactory: Send + Sync + 'static {
    /// Instantiate the handlers for a new connection.
    fn create(&self, conn: &ConnectionInfo) -> Registry;
}

impl<F> ServiceFactory for F
where
    F: Fn(&ConnectionInfo) -> Registry + Send + Sync + 'static,
{
    fn create(&self, conn: &ConnectionInfo) -> Registry {
        self(conn)
    }
}
