//! Registry of live sessions
//!
//! Maps a session id to the handle used to stop that session. The listener
//! registers each session on accept; the session task removes itself on
//! teardown, and shutdown drains the map and signals every entry.

use log::debug;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, oneshot};

pub type SessionId = u64;

#[derive(Debug)]
struct SessionHandle {
    peer: SocketAddr,
    shutdown: oneshot::Sender<()>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<SessionId, SessionHandle>>>,
    next_id: Arc<AtomicU64>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a session for `peer` and returns its id plus the receiver that
    /// fires when the server shuts down.
    pub async fn register(&self, peer: SocketAddr) -> (SessionId, oneshot::Receiver<()>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (shutdown, signal) = oneshot::channel();
        self.sessions
            .lock()
            .await
            .insert(id, SessionHandle { peer, shutdown });
        (id, signal)
    }

    /// Removes a session. Returns false if shutdown already drained it.
    pub async fn deregister(&self, id: SessionId) -> bool {
        self.sessions.lock().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Empties the registry and signals every session to stop. Returns the
    /// number of sessions signalled.
    pub async fn shutdown_all(&self) -> usize {
        let drained: Vec<(SessionId, SessionHandle)> =
            self.sessions.lock().await.drain().collect();
        let count = drained.len();
        for (id, handle) in drained {
            debug!("Signalling session {} ({}) to stop", id, handle.peer);
            // The session may be exiting on its own.
            let _ = handle.shutdown.send(());
        }
        count
    }
}
