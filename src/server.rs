//! Accepting server runtime.
//!
//! The server binds a TCP listener, signals readiness, then accepts
//! connections in a loop, spawning one dispatch task per connection. Two
//! lifecycle hooks are exposed as optional callback registrations:
//! `pre_serve` fires once the listener is bound and about to accept
//! (external code uses it to learn the bound address), and
//! `connection_accepted` fires synchronously for each connection before its
//! dispatch task starts. Both hooks also drive the shared [`Readiness`]
//! monitor, so waiters never race the listener setup.
//!
//! # Example
//!
//! ```ignore
//! let handle = Server::builder()
//!     .bind("127.0.0.1:0")
//!     .service(|_conn: &ConnectionInfo| {
//!         Registry::new().round_trip("echo", |payload| async move { Ok(payload) })
//!     })
//!     .start()
//!     .await?;
//!
//! handle.wait_until_listening().await;
//! let addr = handle.local_addr();
//! // ... connect clients ...
//! handle.stop();
//! handle.join().await;
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::codec::{BinaryCodec, Codec};
use crate::dispatch::run_connection;
use crate::error::Result;
use crate::service::{ConnectionInfo, Registry, ServiceFactory};
use crate::sync::{Monitor, Readiness};
use crate::transport::{BufferedTransport, TransportConfig};

type PreServeHook = Box<dyn Fn(SocketAddr) + Send + Sync>;
type AcceptedHook = Box<dyn Fn(&ConnectionInfo) + Send + Sync>;

#[derive(Default)]
struct EventHooks {
    pre_serve: Option<PreServeHook>,
    connection_accepted: Option<AcceptedHook>,
}

/// Builder for configuring and starting a [`Server`].
pub struct ServerBuilder {
    addr: String,
    codec: Arc<dyn Codec>,
    factory: Arc<dyn ServiceFactory>,
    transport_config: TransportConfig,
    hooks: EventHooks,
}

impl ServerBuilder {
    fn new() -> Self {
        Self {
            addr: "127.0.0.1:0".to_string(),
            codec: Arc::new(BinaryCodec),
            factory: Arc::new(|_conn: &ConnectionInfo| Registry::new()),
            transport_config: TransportConfig::default(),
            hooks: EventHooks::default(),
        }
    }

    /// Listen address. Defaults to `127.0.0.1:0` (ephemeral port).
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    /// Codec for every connection. Must match the clients'.
    pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    /// Service factory invoked once per accepted connection.
    pub fn service(mut self, factory: impl ServiceFactory) -> Self {
        self.factory = Arc::new(factory);
        self
    }

    /// Transport configuration applied to every connection.
    pub fn transport_config(mut self, config: TransportConfig) -> Self {
        self.transport_config = config;
        self
    }

    /// Register the pre-serve hook, fired once the listener is bound.
    pub fn on_pre_serve(mut self, hook: impl Fn(SocketAddr) + Send + Sync + 'static) -> Self {
        self.hooks.pre_serve = Some(Box::new(hook));
        self
    }

    /// Register the connection-accepted hook, fired synchronously before
    /// each connection's dispatch task starts.
    pub fn on_connection_accepted(
        mut self,
        hook: impl Fn(&ConnectionInfo) + Send + Sync + 'static,
    ) -> Self {
        self.hooks.connection_accepted = Some(Box::new(hook));
        self
    }

    /// Bind the listener and start the accept loop.
    pub async fn start(self) -> Result<ServerHandle> {
        Server::start(self).await
    }
}

/// Entry point for building a server.
pub struct Server;

impl Server {
    /// Create a server builder.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    async fn start(builder: ServerBuilder) -> Result<ServerHandle> {
        let listener = TcpListener::bind(&builder.addr).await?;
        let local_addr = listener.local_addr()?;
        let readiness = Arc::new(Monitor::new(Readiness::default()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // The listener is bound; connects from here on queue in the backlog
        // even before the accept loop polls.
        readiness.update(|r| r.listening = true);
        if let Some(hook) = &builder.hooks.pre_serve {
            hook(local_addr);
        }
        debug!(%local_addr, "listening");

        let accept_task = tokio::spawn(accept_loop(
            listener,
            local_addr,
            builder.codec,
            builder.factory,
            builder.transport_config,
            builder.hooks,
            readiness.clone(),
            shutdown_rx,
        ));

        Ok(ServerHandle {
            local_addr,
            readiness,
            shutdown: shutdown_tx,
            accept_task,
        })
    }
}

#[allow(clippy::too_many_arguments)]
async fn accept_loop(
    listener: TcpListener,
    local_addr: SocketAddr,
    codec: Arc<dyn Codec>,
    factory: Arc<dyn ServiceFactory>,
    transport_config: TransportConfig,
    hooks: EventHooks,
    readiness: Arc<Monitor<Readiness>>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let accepted = tokio::select! {
            changed = shutdown.changed() => {
                // A dropped sender counts as a stop request.
                if changed.is_err() || *shutdown.borrow() {
                    debug!("accept loop stopping");
                    return;
                }
                continue;
            }
            accepted = listener.accept() => accepted,
        };

        let (stream, peer_addr) = match accepted {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "accept failed");
                continue;
            }
        };

        let info = ConnectionInfo {
            peer_addr,
            local_addr,
        };
        // Hook and readiness update happen before dispatch begins.
        readiness.update(|r| r.accepted += 1);
        if let Some(hook) = &hooks.connection_accepted {
            hook(&info);
        }
        debug!(peer = %peer_addr, "connection accepted");

        let registry = factory.create(&info);
        let transport = BufferedTransport::with_config(stream, transport_config.clone());
        let codec = codec.clone();
        let worker_shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = run_connection(transport, codec, registry, worker_shutdown).await {
                // A worker failure ends its connection, never the server.
                error!(peer = %peer_addr, error = %e, "connection terminated");
            }
        });
    }
}

/// Handle to a running server.
pub struct ServerHandle {
    local_addr: SocketAddr,
    readiness: Arc<Monitor<Readiness>>,
    shutdown: watch::Sender<bool>,
    accept_task: JoinHandle<()>,
}

impl ServerHandle {
    /// The bound listen address (with the real port when bound to port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shared readiness monitor. Waiters and the server's hook-firing code
    /// synchronize through this same object.
    pub fn readiness(&self) -> Arc<Monitor<Readiness>> {
        self.readiness.clone()
    }

    /// Wait until the listener is bound and accepting.
    pub async fn wait_until_listening(&self) {
        self.readiness
            .wait_until(|r| r.listening.then_some(()))
            .await;
    }

    /// Wait until at least `n` connections have been accepted.
    pub async fn wait_for_accepted(&self, n: u64) {
        self.readiness
            .wait_until(|r| (r.accepted >= n).then_some(()))
            .await;
    }

    /// Connections accepted so far.
    pub fn accepted_count(&self) -> u64 {
        self.readiness.read(|r| r.accepted)
    }

    /// Stop accepting new connections and let workers finish their current
    /// dispatch iteration. Does not interrupt an in-flight blocking read.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Wait for the accept loop to exit. Call [`ServerHandle::stop`] first.
    pub async fn join(self) {
        let _ = self.accept_task.await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use bytes::Bytes;

    use super::*;
    use crate::client::RpcClient;
    use crate::transport::Transport;

    fn echo_service(_conn: &ConnectionInfo) -> Registry {
        Registry::new().round_trip("echo", |payload| async move { Ok(payload) })
    }

    async fn connect(handle: &ServerHandle) -> RpcClient<BufferedTransport<tokio::net::TcpStream>> {
        let stream = tokio::net::TcpStream::connect(handle.local_addr())
            .await
            .unwrap();
        RpcClient::new(BufferedTransport::new(stream))
    }

    #[tokio::test]
    async fn test_listening_before_any_connect() {
        let handle = Server::builder().service(echo_service).start().await.unwrap();
        handle.wait_until_listening().await;
        assert_ne!(handle.local_addr().port(), 0);

        let mut client = connect(&handle).await;
        let out = client.call("echo", Bytes::from_static(b"hi")).await.unwrap();
        assert_eq!(&out[..], b"hi");

        handle.stop();
        handle.join().await;
    }

    #[tokio::test]
    async fn test_hooks_fire_in_order() {
        let pre_serve_count = Arc::new(AtomicUsize::new(0));
        let accepted_count = Arc::new(AtomicUsize::new(0));

        let pre = pre_serve_count.clone();
        let acc = accepted_count.clone();
        let handle = Server::builder()
            .service(echo_service)
            .on_pre_serve(move |_addr| {
                pre.fetch_add(1, Ordering::SeqCst);
            })
            .on_connection_accepted(move |_info| {
                acc.fetch_add(1, Ordering::SeqCst);
            })
            .start()
            .await
            .unwrap();

        // pre_serve fires exactly once, at start.
        assert_eq!(pre_serve_count.load(Ordering::SeqCst), 1);
        assert_eq!(accepted_count.load(Ordering::SeqCst), 0);

        let _c1 = connect(&handle).await;
        let _c2 = connect(&handle).await;
        handle.wait_for_accepted(2).await;
        assert_eq!(accepted_count.load(Ordering::SeqCst), 2);
        assert_eq!(handle.accepted_count(), 2);

        handle.stop();
        handle.join().await;
    }

    #[tokio::test]
    async fn test_stop_refuses_new_connections() {
        let handle = Server::builder().service(echo_service).start().await.unwrap();
        handle.wait_until_listening().await;
        let addr = handle.local_addr();

        handle.stop();
        handle.join().await;

        // The listener is gone; a fresh connection cannot complete a call.
        let refused = async {
            let stream = tokio::net::TcpStream::connect(addr).await?;
            let mut transport = BufferedTransport::new(stream);
            transport.write(b"x");
            transport.flush().await?;
            let mut buf = [0u8; 1];
            transport.read_exact(&mut buf).await
        };
        let result = tokio::time::timeout(Duration::from_secs(1), refused).await;
        assert!(matches!(result, Err(_) | Ok(Err(_))));
    }

    #[tokio::test]
    async fn test_worker_failure_does_not_stop_server() {
        let handle = Server::builder().service(echo_service).start().await.unwrap();
        handle.wait_until_listening().await;

        // Terminate one connection with a protocol violation.
        let mut bad = connect(&handle).await;
        let err = bad.call("no_such_method", Bytes::new()).await.unwrap_err();
        assert!(err.is_protocol());

        // The server still serves new connections.
        let mut good = connect(&handle).await;
        let out = good.call("echo", Bytes::from_static(b"still up")).await.unwrap();
        assert_eq!(&out[..], b"still up");

        handle.stop();
        handle.join().await;
    }

    #[tokio::test]
    async fn test_per_connection_registry_instances() {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = created.clone();
        let handle = Server::builder()
            .service(move |_conn: &ConnectionInfo| {
                counter.fetch_add(1, Ordering::SeqCst);
                Registry::new().round_trip("echo", |payload| async move { Ok(payload) })
            })
            .start()
            .await
            .unwrap();

        let _c1 = connect(&handle).await;
        let _c2 = connect(&handle).await;
        handle.wait_for_accepted(2).await;
        assert_eq!(created.load(Ordering::SeqCst), 2);

        handle.stop();
        handle.join().await;
    }
}
