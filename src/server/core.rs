use log::{error, info, warn};
use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinError, JoinSet};

use crate::client::{SessionRegistry, handle_client};
use crate::error::ServerError;
use crate::server::context::ServerContext;

const LISTEN_BACKLOG: i32 = 1024;

/// Owns the control socket, the accept loop and the session registry.
pub struct Listener {
    listener: TcpListener,
    context: Arc<ServerContext>,
    registry: SessionRegistry,
}

enum Event {
    Shutdown,
    Accepted(io::Result<(TcpStream, SocketAddr)>),
    Finished(Result<(), JoinError>),
}

impl Listener {
    /// Binds the control socket described by `context.config`.
    pub async fn bind(context: Arc<ServerContext>) -> Result<Self, ServerError> {
        let listener =
            bind_control_socket(&context.config.bind_address, context.config.control_port).await?;
        let local = listener.local_addr()?;
        info!("Server bound to {}", local);

        Ok(Self {
            listener,
            context,
            registry: SessionRegistry::new(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn registry(&self) -> SessionRegistry {
        self.registry.clone()
    }

    /// Accepts clients until `shutdown` completes, then stops every session
    /// and waits for all of them to finish.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send,
    {
        let mut sessions = JoinSet::new();
        tokio::pin!(shutdown);

        info!(
            "Accepting connections on {} (passive ports {}-{})",
            self.listener.local_addr()?,
            self.context.config.data_port_min,
            self.context.config.data_port_max
        );

        loop {
            let event = tokio::select! {
                _ = &mut shutdown => Event::Shutdown,
                accepted = self.listener.accept() => Event::Accepted(accepted),
                Some(finished) = sessions.join_next(), if !sessions.is_empty() => {
                    Event::Finished(finished)
                }
            };

            match event {
                Event::Shutdown => break,
                Event::Accepted(Ok((stream, peer))) => {
                    let (id, signal) = self.registry.register(peer).await;
                    let registry = self.registry.clone();
                    let context = Arc::clone(&self.context);
                    sessions.spawn(async move {
                        handle_client(stream, peer, context, signal).await;
                        registry.deregister(id).await;
                    });
                    info!(
                        "Accepted client {} ({} active sessions)",
                        peer,
                        self.registry.len().await
                    );
                }
                Event::Accepted(Err(e)) => {
                    error!("Error accepting connection: {}", e);
                }
                Event::Finished(Err(e)) => {
                    error!("Session task failed: {}", e);
                }
                Event::Finished(Ok(())) => {}
            }
        }

        drop(self.listener);
        let signalled = self.registry.shutdown_all().await;
        info!("Shutting down, stopping {} sessions", signalled);

        while let Some(finished) = sessions.join_next().await {
            if let Err(e) = finished {
                error!("Session task failed during shutdown: {}", e);
            }
        }
        info!("Server stopped");
        Ok(())
    }
}

/// Binds the control socket. An empty address or `::` means every
/// interface: a dual-stack IPv6 wildcard first, then the IPv4 wildcard.
async fn bind_control_socket(bind_address: &str, port: u16) -> Result<TcpListener, ServerError> {
    let host = bind_address.trim();
    if host.is_empty() || host == "::" {
        let v6 = SocketAddr::from((Ipv6Addr::UNSPECIFIED, port));
        match bind_dual_stack(v6) {
            Ok(listener) => return Ok(listener),
            Err(e) => warn!("Cannot bind {}: {}; falling back to IPv4", v6, e),
        }
        let v4 = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        return TcpListener::bind(v4)
            .await
            .map_err(|source| ServerError::Bind {
                addr: v4.to_string(),
                source,
            });
    }

    TcpListener::bind((host, port))
        .await
        .map_err(|source| ServerError::Bind {
            addr: format!("{host}:{port}"),
            source,
        })
}

/// IPv6 listener that also accepts IPv4 clients, whatever the host's
/// `bindv6only` default is.
fn bind_dual_stack(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::IPV6, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_only_v6(false)?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&SockAddr::from(addr))?;
    socket.listen(LISTEN_BACKLOG)?;
    TcpListener::from_std(std::net::TcpListener::from(socket))
}
