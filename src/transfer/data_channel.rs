//! Module `data_channel`
//!
//! Lifecycle of the second TCP connection used by LIST, RETR and STOR.
//!
//! A `DataChannel` is created by PASV/EPSV (passive: the server listens on a
//! random port and a short-lived acceptor task waits for the client) or by
//! PORT/EPRT (active: the server connects out when a transfer starts). It is
//! consumed by exactly one transfer and never reused.

use log::{debug, info, warn};
use rand::Rng;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::ops::RangeInclusive;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::error::TransferError;
use crate::transfer::modes::{AddressFamily, TransferMode};

/// A negotiated, not yet opened data connection.
#[derive(Debug)]
pub struct DataChannel {
    mode: TransferMode,
    family: AddressFamily,
    endpoint: SocketAddr,
    pending: Pending,
}

#[derive(Debug)]
enum Pending {
    Connect,
    Accept(Acceptor),
}

/// The one-shot acceptor behind a passive channel.
///
/// Dropping it aborts the accept task, which closes the listening socket.
#[derive(Debug)]
struct Acceptor {
    ready: oneshot::Receiver<io::Result<TcpStream>>,
    task: JoinHandle<()>,
}

impl Drop for Acceptor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl DataChannel {
    /// Records an active-mode target; nothing is connected until `open`.
    pub fn active(target: SocketAddr) -> Self {
        Self {
            mode: TransferMode::Active,
            family: AddressFamily::of(&target.ip()),
            endpoint: target,
            pending: Pending::Connect,
        }
    }

    /// Binds a passive listener on a random port of `ports` and spawns the
    /// acceptor task that waits for the client's single connection.
    ///
    /// Must be called from within a tokio runtime.
    pub fn listen(
        bind_ip: IpAddr,
        ports: RangeInclusive<u16>,
        max_attempts: usize,
    ) -> Result<Self, TransferError> {
        let std_listener = bind_passive_listener(bind_ip, ports, max_attempts)?;
        std_listener
            .set_nonblocking(true)
            .map_err(TransferError::ListenerSetup)?;
        let endpoint = std_listener
            .local_addr()
            .map_err(TransferError::ListenerSetup)?;
        let listener = TcpListener::from_std(std_listener).map_err(TransferError::ListenerSetup)?;

        let (ready_tx, ready_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let accepted = listener.accept().await.map(|(stream, peer)| {
                debug!("Data connection accepted from {} on {}", peer, endpoint);
                stream
            });
            // The session may have dropped the channel already.
            let _ = ready_tx.send(accepted);
        });

        Ok(Self {
            mode: TransferMode::Passive,
            family: AddressFamily::of(&endpoint.ip()),
            endpoint,
            pending: Pending::Accept(Acceptor {
                ready: ready_rx,
                task,
            }),
        })
    }

    pub fn mode(&self) -> TransferMode {
        self.mode
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    /// The client target (active) or the local listening address (passive).
    pub fn endpoint(&self) -> SocketAddr {
        self.endpoint
    }

    /// Turns the negotiated channel into a connected stream.
    ///
    /// Active channels connect out within `connect_timeout`; passive ones
    /// wait up to `accept_timeout` for the acceptor's ready signal.
    pub async fn open(
        self,
        connect_timeout: Duration,
        accept_timeout: Duration,
    ) -> Result<TcpStream, TransferError> {
        let addr = self.endpoint;
        match self.pending {
            Pending::Connect => match timeout(connect_timeout, TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => {
                    info!("Connected out to data endpoint {}", addr);
                    Ok(stream)
                }
                Ok(Err(source)) => Err(TransferError::ConnectFailed { addr, source }),
                Err(_) => Err(TransferError::ConnectFailed {
                    addr,
                    source: io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
                }),
            },
            Pending::Accept(mut acceptor) => {
                match timeout(accept_timeout, &mut acceptor.ready).await {
                    Ok(Ok(Ok(stream))) => Ok(stream),
                    Ok(Ok(Err(e))) => Err(TransferError::AcceptFailed(e)),
                    Ok(Err(_)) => Err(TransferError::AcceptFailed(io::Error::other(
                        "acceptor exited without a connection",
                    ))),
                    Err(_) => {
                        warn!("No data connection on {} within {:?}", addr, accept_timeout);
                        Err(TransferError::AcceptTimeout(accept_timeout))
                    }
                }
            }
        }
    }
}

/// Draws random ports from `ports` until a listener binds, giving up after
/// `max_attempts` draws.
pub fn bind_passive_listener(
    ip: IpAddr,
    ports: RangeInclusive<u16>,
    max_attempts: usize,
) -> Result<std::net::TcpListener, TransferError> {
    let mut rng = rand::thread_rng();
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        let port = rng.gen_range(ports.clone());
        let addr = SocketAddr::new(ip, port);
        match std::net::TcpListener::bind(addr) {
            Ok(listener) => {
                debug!("Bound passive listener {} after {} attempts", addr, attempt);
                return Ok(listener);
            }
            Err(e) => {
                debug!("Failed to bind passive port {}: {}", addr, e);
                last_error = Some(e);
            }
        }
    }

    Err(TransferError::NoAvailablePort {
        attempts: max_attempts,
        last_error,
    })
}

/// Sends `payload` as the whole body of a transfer, then closes our side.
pub async fn send_payload(stream: &mut TcpStream, payload: &[u8]) -> Result<(), TransferError> {
    stream.write_all(payload).await.map_err(TransferError::Io)?;
    stream.flush().await.map_err(TransferError::Io)?;
    stream.shutdown().await.map_err(TransferError::Io)
}

/// Reads until the peer closes its send side.
pub async fn receive_payload(stream: &mut TcpStream) -> Result<Vec<u8>, TransferError> {
    let mut payload = Vec::new();
    stream
        .read_to_end(&mut payload)
        .await
        .map_err(TransferError::Io)?;
    Ok(payload)
}
